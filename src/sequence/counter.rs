use crate::sequence::Persister;
use crate::storage::{SequenceState, StateStore, StoreError};
use log::{error, info};
use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::Arc;

/// The daily sequence.
///
/// Memory is the source of truth while the process runs; the store only
/// keeps the last value that was written successfully.
pub struct SequenceCounter {
    seq: Arc<AtomicI32>,
    persister: Persister,
}

impl SequenceCounter {
    /// Restores the last persisted value. A missing state file means a fresh
    /// install and starts from zero; every other load failure is returned.
    pub async fn open(
        store: Arc<dyn StateStore>,
        persist_queue: usize,
    ) -> Result<Self, StoreError> {
        let state = match store.load().await {
            Ok(state) => state,
            Err(err) if err.is_not_found() => {
                info!("no sequence state found, starting from zero: {}", err);

                let state = SequenceState::default();
                store.create(state).await?;
                state
            }
            Err(err) => return Err(err),
        };

        info!("sequence state loaded, seq={}", state.seq);

        let seq = Arc::new(AtomicI32::new(state.seq));
        let persister = Persister::start(store, Arc::clone(&seq), persist_queue);

        Ok(SequenceCounter { seq, persister })
    }

    /// Takes the next number. Each caller gets a distinct value; the write to
    /// disk happens in the background. The value holds at `i32::MAX` instead
    /// of wrapping negative.
    pub fn increment(&self) -> i32 {
        let next = match self
            .seq
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |seq| seq.checked_add(1))
        {
            Ok(previous) => previous + 1,
            Err(exhausted) => {
                error!("sequence exhausted, holding at seq={}", exhausted);
                exhausted
            }
        };

        self.persister.flush();

        next
    }

    /// Starts the day over. The in-memory reset holds even when the write
    /// fails.
    pub async fn reset(&self) {
        let previous = self.seq.swap(0, Ordering::SeqCst);

        info!("sequence reset, seq before reset={}", previous);

        if let Err(err) = self.persister.sync().await {
            error!("failed to persist sequence reset: {}", err);
        }
    }

    pub fn current(&self) -> i32 {
        self.seq.load(Ordering::SeqCst)
    }

    pub async fn shutdown(&self) {
        self.persister.shutdown().await;
    }
}
