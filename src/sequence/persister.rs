use crate::storage::{SequenceState, StateStore, StoreError};
use log::{debug, error, info, warn};
use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::mpsc::{channel, Receiver, Sender};
use tokio::sync::oneshot;

enum PersistRequest {
    Flush,
    Sync(oneshot::Sender<Result<(), StoreError>>),
    Shutdown(oneshot::Sender<()>),
}

/// Handle to the single task that writes the state file.
///
/// Every write snapshots the live value at the moment it runs, so queued
/// flush requests can be dropped when the queue is full without losing the
/// newest value.
pub struct Persister {
    tx: Sender<PersistRequest>,
}

impl Persister {
    pub fn start(store: Arc<dyn StateStore>, seq: Arc<AtomicI32>, capacity: usize) -> Self {
        let (tx, rx) = channel(capacity.max(1));

        tokio::spawn(PersistWriter { store, seq }.run(rx));

        Persister { tx }
    }

    /// Requests a background write; never waits.
    pub fn flush(&self) {
        match self.tx.try_send(PersistRequest::Flush) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                debug!("persist queue is full, flush coalesced");
            }
            Err(TrySendError::Closed(_)) => {
                warn!("persist writer stopped, flush dropped");
            }
        }
    }

    /// Writes the current value and waits for the outcome.
    pub async fn sync(&self) -> Result<(), StoreError> {
        let (ack_tx, ack_rx) = oneshot::channel();

        self.tx
            .send(PersistRequest::Sync(ack_tx))
            .await
            .map_err(|_| StoreError::WriterClosed)?;

        ack_rx.await.map_err(|_| StoreError::WriterClosed)?
    }

    /// Drains pending requests, writes the final value and stops the writer.
    pub async fn shutdown(&self) {
        let (ack_tx, ack_rx) = oneshot::channel();

        if self.tx.send(PersistRequest::Shutdown(ack_tx)).await.is_err() {
            return;
        }

        let _ = ack_rx.await;
    }
}

struct PersistWriter {
    store: Arc<dyn StateStore>,
    seq: Arc<AtomicI32>,
}

impl PersistWriter {
    async fn run(self, mut rx: Receiver<PersistRequest>) {
        while let Some(request) = rx.recv().await {
            match request {
                PersistRequest::Flush => {
                    if let Err(err) = self.write().await {
                        error!("background state write failed: {}", err);
                    }
                }
                PersistRequest::Sync(ack) => {
                    let _ = ack.send(self.write().await);
                }
                PersistRequest::Shutdown(ack) => {
                    rx.close();
                    self.drain(&mut rx).await;

                    match self.write().await {
                        Ok(()) => info!(
                            "persist writer stopped, seq={}",
                            self.seq.load(Ordering::SeqCst)
                        ),
                        Err(err) => error!("final state write failed: {}", err),
                    }

                    let _ = ack.send(());
                    return;
                }
            }
        }
    }

    // answers everything queued before the shutdown request
    async fn drain(&self, rx: &mut Receiver<PersistRequest>) {
        while let Some(request) = rx.recv().await {
            match request {
                PersistRequest::Flush => {}
                PersistRequest::Sync(ack) => {
                    let _ = ack.send(self.write().await);
                }
                PersistRequest::Shutdown(ack) => {
                    let _ = ack.send(());
                }
            }
        }
    }

    async fn write(&self) -> Result<(), StoreError> {
        let state = SequenceState::new(self.seq.load(Ordering::SeqCst));

        self.store.save(state).await
    }
}
