use crate::server::TicketFormat;
use log::info;
use serde::Deserialize;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const DEFAULT_SETTINGS_FILE: &str = "config/dayseq.toml";
pub const DEFAULT_STATE_FILE: &str = "config/biz.yaml";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub state_file: PathBuf,
    pub ticket_format: TicketFormat,
    pub persist_queue: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            state_file: PathBuf::from(DEFAULT_STATE_FILE),
            ticket_format: TicketFormat::default(),
            persist_queue: 16,
        }
    }
}

impl Settings {
    /// Reads `explicit` when given, otherwise the default settings file under
    /// `work_dir` if it exists.
    pub fn discover(work_dir: &Path, explicit: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            return Self::load(path);
        }

        let path = work_dir.join(DEFAULT_SETTINGS_FILE);
        if path.is_file() {
            return Self::load(&path);
        }

        Ok(Settings::default())
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let settings = Self::parse(&content).map_err(|err| err.at(path))?;

        info!("settings loaded from {}", path.display());

        Ok(settings)
    }

    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let settings: Settings = toml::from_str(content).map_err(|source| ConfigError::Parse {
            path: PathBuf::new(),
            source,
        })?;

        if settings.persist_queue == 0 {
            return Err(ConfigError::Invalid(String::from(
                "persist_queue must be at least 1",
            )));
        }

        Ok(settings)
    }

    pub fn state_path(&self, work_dir: &Path) -> PathBuf {
        work_dir.join(&self.state_file)
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read settings {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse settings {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid settings: {0}")]
    Invalid(String),
    #[error("can not get work directory: {0}")]
    WorkDir(#[source] io::Error),
}

impl ConfigError {
    fn at(self, path: &Path) -> Self {
        match self {
            ConfigError::Parse { source, .. } => ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            },
            other => other,
        }
    }
}
