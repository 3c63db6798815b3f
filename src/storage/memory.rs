use crate::storage::{SequenceState, StateStore, StoreError};
use async_trait::async_trait;
use std::io;
use std::path::PathBuf;
use std::sync::Mutex;

/// In-memory store for tests; records every saved snapshot.
pub struct MemoryStore {
    initial: Option<SequenceState>,
    saved: Mutex<Vec<SequenceState>>,
    fail_writes: bool,
}

impl MemoryStore {
    pub fn new(initial: SequenceState) -> Self {
        MemoryStore {
            initial: Some(initial),
            saved: Mutex::new(Vec::new()),
            fail_writes: false,
        }
    }

    pub fn empty() -> Self {
        MemoryStore {
            initial: None,
            saved: Mutex::new(Vec::new()),
            fail_writes: false,
        }
    }

    pub fn unwritable() -> Self {
        MemoryStore {
            initial: None,
            saved: Mutex::new(Vec::new()),
            fail_writes: true,
        }
    }

    pub fn failing(initial: SequenceState) -> Self {
        MemoryStore {
            initial: Some(initial),
            saved: Mutex::new(Vec::new()),
            fail_writes: true,
        }
    }

    pub fn saved(&self) -> Vec<SequenceState> {
        self.saved.lock().unwrap().clone()
    }
}

#[async_trait]
impl StateStore for MemoryStore {
    async fn load(&self) -> Result<SequenceState, StoreError> {
        if let Some(last) = self.saved.lock().unwrap().last() {
            return Ok(*last);
        }

        self.initial.ok_or_else(|| StoreError::Read {
            path: PathBuf::from("memory"),
            source: io::Error::from(io::ErrorKind::NotFound),
        })
    }

    async fn save(&self, state: SequenceState) -> Result<(), StoreError> {
        if self.fail_writes {
            return Err(StoreError::Write {
                path: PathBuf::from("memory"),
                source: io::Error::other("disk full"),
            });
        }

        self.saved.lock().unwrap().push(state);

        Ok(())
    }
}
