use crate::error::{ModManError, Result};
use crate::utils::path_validator::PathValidator;
use std::path::Path;
use std::process::{Command, Stdio};
use tracing::debug;

/// Opens a filesystem location in the desktop's file browser.
pub trait LocationOpener: Send + Sync {
    fn open(&self, location: &Path) -> Result<()>;
}

#[derive(Debug, Default)]
pub struct DesktopOpener;

impl DesktopOpener {
    fn program() -> &'static str {
        if cfg!(windows) {
            "explorer"
        } else if cfg!(target_os = "macos") {
            "open"
        } else {
            "xdg-open"
        }
    }
}

impl LocationOpener for DesktopOpener {
    fn open(&self, location: &Path) -> Result<()> {
        let directory = PathValidator::validate_location(location)?;
        let program = Self::program();
        debug!(program, directory = %directory.display(), "Opening location");

        let mut child = Command::new(program)
            .arg(&directory)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| {
                ModManError::Execution(format!("Failed to launch '{program}': {e}"))
            })?;

        // The browser outlives us; reap the launcher without blocking.
        std::thread::spawn(move || {
            let _ = child.wait();
        });
        Ok(())
    }
}
