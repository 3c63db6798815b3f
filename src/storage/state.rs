use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Durable representation of the daily sequence.
///
/// Unknown keys are ignored on decode, so a state file written by a newer
/// build still loads.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SequenceState {
    #[serde(default)]
    pub seq: i32,
}

impl SequenceState {
    pub const fn new(seq: i32) -> Self {
        SequenceState { seq }
    }

    pub fn encode(&self) -> Result<String, serde_yaml::Error> {
        serde_yaml::to_string(self)
    }

    pub fn decode(content: &str) -> Result<Self, DecodeError> {
        if content.trim().is_empty() {
            return Err(DecodeError::Empty);
        }

        let state: SequenceState = serde_yaml::from_str(content)?;

        if state.seq < 0 {
            return Err(DecodeError::Negative(state.seq));
        }

        Ok(state)
    }
}

#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("state file is empty")]
    Empty,
    #[error("invalid yaml: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("negative sequence value {0}")]
    Negative(i32),
}
