use jiff::Timestamp;
use jiff::tz::TimeZone;
use std::fmt;
use std::path::PathBuf;

/// A module with a newer version available in the repository.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PendingUpdate {
    pub name: String,
    pub current_version: String,
    pub new_version: String,
    pub published_date: Option<Timestamp>,
    pub release_notes: Option<String>,
}

impl PendingUpdate {
    /// Text shown in the release notes details view.
    pub fn release_notes_text(&self) -> &str {
        match self.release_notes.as_deref() {
            Some(notes) if !notes.trim().is_empty() => notes,
            _ => "No release notes available.",
        }
    }
}

/// A module installed on this machine.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct InstalledModule {
    pub name: String,
    pub version: String,
    pub author: Option<String>,
    pub installed_date: Option<Timestamp>,
    pub location: Option<PathBuf>,
    pub project_uri: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Severity {
    Error,
    Warning,
    Verbose,
    Info,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Severity::Error => "Error",
            Severity::Warning => "Warning",
            Severity::Verbose => "Verbose",
            Severity::Info => "Info",
        };
        f.write_str(label)
    }
}

/// One line of streamed diagnostic output, stamped when it was emitted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiagnosticEvent {
    pub timestamp: Timestamp,
    pub severity: Severity,
    pub message: String,
}

impl DiagnosticEvent {
    pub fn now(severity: Severity, message: impl Into<String>) -> Self {
        Self {
            timestamp: Timestamp::now(),
            severity,
            message: message.into(),
        }
    }

    /// Renders the event as `HH:MM:SS: Severity: message` in local time.
    pub fn render(&self) -> String {
        let clock = self
            .timestamp
            .to_zoned(TimeZone::system())
            .strftime("%H:%M:%S");
        format!("{}: {}: {}", clock, self.severity, self.message)
    }
}

/// Formats an optional timestamp for tables, blank when unset.
pub fn format_date(timestamp: Option<Timestamp>) -> String {
    timestamp
        .map(|ts| {
            ts.to_zoned(TimeZone::system())
                .strftime("%Y-%m-%d %H:%M")
                .to_string()
        })
        .unwrap_or_default()
}
