use crate::storage::{DecodeError, SequenceState};
use async_trait::async_trait;
use log::{debug, warn};
use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs;
use tokio::io::AsyncWriteExt;

/// Durable home of the sequence state. Implementations only read and write
/// snapshots; the counter owns the live value.
#[async_trait]
pub trait StateStore: Send + Sync {
    async fn load(&self) -> Result<SequenceState, StoreError>;

    async fn save(&self, state: SequenceState) -> Result<(), StoreError>;

    /// Writes the very first state on a fresh install.
    async fn create(&self, state: SequenceState) -> Result<(), StoreError> {
        self.save(state).await
    }
}

pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        FileStore { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = OsString::from(self.path.as_os_str());
        name.push(".tmp");
        PathBuf::from(name)
    }

    fn write_error(&self, source: io::Error) -> StoreError {
        StoreError::Write {
            path: self.path.clone(),
            source,
        }
    }
}

#[async_trait]
impl StateStore for FileStore {
    async fn load(&self) -> Result<SequenceState, StoreError> {
        let content = fs::read_to_string(&self.path)
            .await
            .map_err(|source| StoreError::Read {
                path: self.path.clone(),
                source,
            })?;

        debug!("state file content: {}", content.trim_end());

        SequenceState::decode(&content).map_err(|source| StoreError::Decode {
            path: self.path.clone(),
            source,
        })
    }

    async fn save(&self, state: SequenceState) -> Result<(), StoreError> {
        let data = state.encode()?;
        let temp_path = self.temp_path();

        if let Err(err) = replace_file(&temp_path, &self.path, data.as_bytes()).await {
            remove_temp(&temp_path).await;
            return Err(self.write_error(err));
        }

        debug!("state saved, seq={}, path={}", state.seq, self.path.display());

        Ok(())
    }

    async fn create(&self, state: SequenceState) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .await
                    .map_err(|e| self.write_error(e))?;
            }
        }

        self.save(state).await
    }
}

// rename is atomic on the same filesystem, readers never see a half file
async fn replace_file(temp_path: &Path, path: &Path, data: &[u8]) -> io::Result<()> {
    let mut file = fs::File::create(temp_path).await?;
    file.write_all(data).await?;
    file.sync_all().await?;
    drop(file);

    fs::rename(temp_path, path).await
}

async fn remove_temp(temp_path: &Path) {
    match fs::remove_file(temp_path).await {
        Ok(()) => debug!("removed {} after failed write", temp_path.display()),
        Err(err) if err.kind() == io::ErrorKind::NotFound => {}
        Err(err) => warn!("failed to remove {}: {}", temp_path.display(), err),
    }
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("failed to read state file {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to decode state file {}: {source}", .path.display())]
    Decode {
        path: PathBuf,
        #[source]
        source: DecodeError,
    },
    #[error("failed to encode state: {0}")]
    Encode(#[from] serde_yaml::Error),
    #[error("failed to write state file {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("persistence writer is not running")]
    WriterClosed,
}

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::Read { source, .. } if source.kind() == io::ErrorKind::NotFound)
    }
}
