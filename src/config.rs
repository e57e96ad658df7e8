use crate::error::{ModManError, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable naming a configuration file when `--config` is absent.
pub const CONFIG_ENV: &str = "PSMODMAN_CONFIG";

#[derive(Debug, Clone, PartialEq, Deserialize, Default)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub host: HostSettings,
    pub gallery: GallerySettings,
    pub runtime: RuntimeSettings,
}

/// How to launch the command host.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HostSettings {
    pub program: String,
    pub args: Vec<String>,
    pub execution_policy: Option<String>,
}

impl Default for HostSettings {
    fn default() -> Self {
        Self {
            program: "pwsh".to_string(),
            args: vec![
                "-NoLogo".to_string(),
                "-NoProfile".to_string(),
                "-NonInteractive".to_string(),
            ],
            execution_policy: cfg!(windows).then(|| "Unrestricted".to_string()),
        }
    }
}

/// Repository the scripts query and install from.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GallerySettings {
    pub repository: String,
    pub trust_repository: bool,
    pub scope: String,
    /// Modules whose presence hides their `<name>.*` submodules.
    pub umbrellas: Vec<String>,
}

impl Default for GallerySettings {
    fn default() -> Self {
        Self {
            repository: "PSGallery".to_string(),
            trust_repository: true,
            scope: "CurrentUser".to_string(),
            umbrellas: vec!["Az".to_string(), "Microsoft.Graph".to_string()],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RuntimeSettings {
    /// Capacity of the diagnostic event channel.
    pub event_buffer: usize,
    /// Pause between a finished update and the follow-up refresh.
    pub settle_delay_ms: u64,
    /// Ensure PSResourceGet is installed and imported before each command.
    pub provision: bool,
}

impl Default for RuntimeSettings {
    fn default() -> Self {
        Self {
            event_buffer: 256,
            settle_delay_ms: 1000,
            provision: true,
        }
    }
}

impl RuntimeSettings {
    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }
}

impl Settings {
    /// Loads settings from `explicit`, then `$PSMODMAN_CONFIG`, else defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let path = explicit
            .map(Path::to_path_buf)
            .or_else(|| std::env::var_os(CONFIG_ENV).map(PathBuf::from));

        let settings = match path {
            Some(path) => Self::from_file(&path)?,
            None => Self::default(),
        };
        settings.validate()?;
        Ok(settings)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ModManError::Config(format!("Failed to read '{}': {e}", path.display()))
        })?;
        let settings: Settings = toml::from_str(&content)?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        if self.host.program.trim().is_empty() {
            return Err(ModManError::Config("host.program cannot be empty".into()));
        }
        if self.gallery.repository.trim().is_empty() {
            return Err(ModManError::Config(
                "gallery.repository cannot be empty".into(),
            ));
        }
        if !matches!(self.gallery.scope.as_str(), "CurrentUser" | "AllUsers") {
            return Err(ModManError::Config(format!(
                "gallery.scope must be 'CurrentUser' or 'AllUsers', got '{}'",
                self.gallery.scope
            )));
        }
        if self.gallery.umbrellas.iter().any(|u| u.trim().is_empty()) {
            return Err(ModManError::Config(
                "gallery.umbrellas cannot contain empty names".into(),
            ));
        }
        if self.runtime.event_buffer == 0 {
            return Err(ModManError::Config(
                "runtime.event_buffer must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn defaults_match_gallery_conventions() {
        let settings = Settings::default();
        assert_eq!(settings.host.program, "pwsh");
        assert_eq!(settings.gallery.repository, "PSGallery");
        assert_eq!(settings.gallery.umbrellas, vec!["Az", "Microsoft.Graph"]);
        assert_eq!(settings.runtime.settle_delay(), Duration::from_secs(1));
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("psmodman.toml");
        fs::write(
            &path,
            r#"
[host]
program = "/opt/microsoft/powershell/7/pwsh"

[runtime]
settle_delay_ms = 0
"#,
        )
        .unwrap();

        let settings = Settings::load(Some(&path)).unwrap();
        assert_eq!(settings.host.program, "/opt/microsoft/powershell/7/pwsh");
        assert_eq!(settings.host.args, HostSettings::default().args);
        assert_eq!(settings.runtime.settle_delay_ms, 0);
        assert_eq!(settings.runtime.event_buffer, 256);
        assert_eq!(settings.gallery, GallerySettings::default());
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("psmodman.toml");
        fs::write(&path, "[gallery]\nrepo = \"PSGallery\"\n").unwrap();
        assert!(matches!(
            Settings::load(Some(&path)),
            Err(ModManError::Toml(_))
        ));
    }

    #[test]
    fn invalid_values_are_rejected() {
        let mut settings = Settings::default();
        settings.runtime.event_buffer = 0;
        assert!(matches!(settings.validate(), Err(ModManError::Config(_))));

        let mut settings = Settings::default();
        settings.gallery.scope = "Machine".into();
        assert!(matches!(settings.validate(), Err(ModManError::Config(_))));

        let mut settings = Settings::default();
        settings.host.program = "  ".into();
        assert!(matches!(settings.validate(), Err(ModManError::Config(_))));
    }

    #[test]
    fn missing_file_is_a_config_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("absent.toml");
        assert!(matches!(
            Settings::load(Some(&path)),
            Err(ModManError::Config(_))
        ));
    }
}
