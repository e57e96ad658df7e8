use thiserror::Error;

#[derive(Error, Debug)]
pub enum ModManError {
    #[error("Command execution failed: {0}")]
    Execution(String),

    #[error("Command host '{program}' could not be started: {reason}")]
    HostUnavailable { program: String, reason: String },

    #[error("Command host exited before the command completed (exit code {code})")]
    HostExited { code: i32 },

    #[error("Command host protocol error: {0}")]
    Protocol(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Operation cancelled by user")]
    UserCancelled,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ModManError>;
