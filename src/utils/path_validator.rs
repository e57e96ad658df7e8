use crate::error::{ModManError, Result};
use std::path::{Path, PathBuf};

/// Validates module locations before they are handed to the desktop file browser.
pub struct PathValidator;

impl PathValidator {
    /// Canonicalises `path` into a directory that can be opened.
    ///
    /// A path to a file resolves to its parent directory.
    pub fn validate_location(path: impl AsRef<Path>) -> Result<PathBuf> {
        let path = path.as_ref();

        let dangerous = [';', '|', '&', '$', '`', '\n', '\r'];
        let path_str = path.to_string_lossy();
        if let Some(ch) = dangerous.iter().find(|c| path_str.contains(**c)) {
            return Err(ModManError::Config(format!(
                "Location contains dangerous character: '{}'",
                ch.escape_default()
            )));
        }

        let canonical = path.canonicalize().map_err(|e| {
            ModManError::Config(format!("Invalid location '{}': {e}", path.display()))
        })?;

        if canonical.is_dir() {
            return Ok(canonical);
        }

        canonical
            .parent()
            .filter(|parent| parent.is_dir())
            .map(Path::to_path_buf)
            .ok_or_else(|| {
                ModManError::Config(format!(
                    "Location '{}' is not a directory",
                    canonical.display()
                ))
            })
    }
}
