//! CLI command definitions.
//!
//! This module defines the structure of all CLI subcommands.

use std::path::PathBuf;

use clap::{Args, Subcommand};

/// Serve command arguments.
#[derive(Debug, Args)]
pub struct ServeCommand {
    /// Address to listen on (overrides `server.bind`)
    #[arg(short, long, value_name = "ADDR")]
    pub bind: Option<String>,
}

/// Arguments shared by commands that print stored data.
#[derive(Debug, Args)]
pub struct OutputArgs {
    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,
}

/// Configuration commands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Show the configuration file path
    Path,

    /// Validate configuration
    Validate {
        /// Path to configuration file to validate
        file: Option<PathBuf>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serve_command_debug() {
        let cmd = ServeCommand {
            bind: Some("0.0.0.0:9000".to_string()),
        };
        let debug_str = format!("{cmd:?}");
        assert!(debug_str.contains("bind"));
        assert!(debug_str.contains("0.0.0.0:9000"));
    }

    #[test]
    fn test_config_command_debug() {
        let cmd = ConfigCommand::Validate {
            file: Some(PathBuf::from("/tmp/config.toml")),
        };
        let debug_str = format!("{cmd:?}");
        assert!(debug_str.contains("Validate"));
        assert!(debug_str.contains("config.toml"));
    }
}
