use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "psmodman",
    about = "PowerShell module manager - check, list and update gallery modules",
    version,
    author
)]
pub struct Cli {
    /// Path to a TOML settings file (defaults to $PSMODMAN_CONFIG)
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// PowerShell executable to run commands with (overrides the settings file)
    #[arg(long = "host", global = true, value_name = "PROGRAM")]
    pub host_program: Option<String>,

    /// Enable verbose output for debugging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Write the diagnostic log to this file when the command finishes
    #[arg(long, global = true, value_name = "FILE")]
    pub save_log: Option<PathBuf>,

    /// Do not echo diagnostic log entries while commands run
    #[arg(short, long, global = true)]
    pub quiet_log: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Check the gallery for newer versions of installed modules
    Check,

    /// List installed modules
    List,

    /// Update modules from the gallery
    Update {
        /// Module names or glob patterns (e.g. "Az.*")
        #[arg(value_name = "NAME")]
        names: Vec<String>,

        /// Update every module with a pending update
        #[arg(short, long, conflicts_with = "names")]
        all: bool,

        /// Review each pending update before applying
        #[arg(short, long, conflicts_with = "all")]
        interactive: bool,
    },

    /// Show release notes of a pending update
    Notes {
        #[arg(value_name = "NAME")]
        name: String,
    },

    /// Open an installed module's folder in the file browser
    Open {
        #[arg(value_name = "NAME")]
        name: String,
    },
}
