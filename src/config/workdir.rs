use crate::config::ConfigError;
use std::path::{Path, PathBuf};

/// Directory name of the checkout; running from anywhere below it still
/// resolves to the checkout root.
pub const PROJECT_MARKER: &str = "dayseq";

pub fn resolve_work_dir(override_dir: Option<PathBuf>) -> Result<PathBuf, ConfigError> {
    if let Some(dir) = override_dir {
        return Ok(dir);
    }

    let current = std::env::current_dir().map_err(ConfigError::WorkDir)?;

    Ok(truncate_at_marker(&current, PROJECT_MARKER))
}

pub fn truncate_at_marker(path: &Path, marker: &str) -> PathBuf {
    let mut result = PathBuf::new();

    for component in path.components() {
        result.push(component);

        if component.as_os_str() == marker {
            return result;
        }
    }

    path.to_path_buf()
}
