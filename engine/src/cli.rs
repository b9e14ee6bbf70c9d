//! CLI interface for drover
//!
//! This module provides the command-line interface using clap's derive API.
//! It defines all commands and global flags.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Drover plugin protocol tool
///
/// Hosts signed plugin endpoints and sends signed requests to them.
#[derive(Parser, Debug)]
#[command(name = "drover")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Set log level (error, warn, info, debug, trace)
    #[arg(long, global = true, value_name = "LEVEL")]
    pub log: Option<String>,

    /// Specify alternate configuration file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Serve the values from the [static] config section as a plugin
    Serve {
        /// Which capability to serve
        #[arg(value_enum)]
        kind: ServeKind,

        /// Address to listen on (overrides server.bind)
        #[arg(long, value_name = "ADDR")]
        bind: Option<String>,
    },

    /// Send a signed request to a plugin and print the result
    Call {
        /// Which capability to call
        #[arg(value_enum)]
        capability: CapabilityKind,

        /// Plugin endpoint (overrides client.endpoint)
        #[arg(long, value_name = "URL")]
        endpoint: Option<String>,

        /// JSON request file, or - for stdin
        #[arg(long, short, value_name = "FILE", default_value = "-")]
        input: String,

        /// Ask the plugin to encrypt its response
        #[arg(long)]
        encrypt: bool,
    },
}

/// Capabilities served by `drover serve`
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum ServeKind {
    /// Environment variables
    Env,
    /// Registry credentials
    Registry,
}

/// Capabilities reachable with `drover call`
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum CapabilityKind {
    Admission,
    Config,
    Environ,
    Registry,
    Secret,
    Validator,
    Webhook,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serve_parsing() {
        let cli = Cli::parse_from(["drover", "serve", "env"]);
        if let Command::Serve { kind, bind } = cli.command {
            assert_eq!(kind, ServeKind::Env);
            assert!(bind.is_none());
        } else {
            panic!("Expected Serve command");
        }
        assert!(!cli.json);
        assert!(cli.log.is_none());
        assert!(cli.config.is_none());
    }

    #[test]
    fn test_global_flags() {
        let cli = Cli::parse_from(["drover", "--json", "--log", "debug", "serve", "registry"]);
        assert!(cli.json);
        assert_eq!(cli.log, Some("debug".to_string()));
    }

    #[test]
    fn test_call_parsing() {
        let cli = Cli::parse_from([
            "drover",
            "call",
            "validator",
            "--endpoint",
            "http://localhost:3000",
            "--input",
            "request.json",
            "--encrypt",
        ]);
        if let Command::Call {
            capability,
            endpoint,
            input,
            encrypt,
        } = cli.command
        {
            assert_eq!(capability, CapabilityKind::Validator);
            assert_eq!(endpoint.as_deref(), Some("http://localhost:3000"));
            assert_eq!(input, "request.json");
            assert!(encrypt);
        } else {
            panic!("Expected Call command");
        }
    }

    #[test]
    fn test_call_defaults_to_stdin() {
        let cli = Cli::parse_from(["drover", "call", "webhook"]);
        if let Command::Call { input, encrypt, .. } = cli.command {
            assert_eq!(input, "-");
            assert!(!encrypt);
        } else {
            panic!("Expected Call command");
        }
    }

    #[test]
    fn test_unknown_capability_rejected() {
        assert!(Cli::try_parse_from(["drover", "call", "billing"]).is_err());
    }
}
