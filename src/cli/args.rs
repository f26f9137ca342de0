//! Command line argument parsing
//!
//! This module handles CLI argument parsing with subcommands:
//! - `run`: Execute one action request read from a file or stdin
//! - `show-config`: Show the resolved configuration and discovery hierarchy
//! - `check`: Check that the configured backends are usable

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

#[derive(Debug, PartialEq)]
pub enum ExecutionMode {
    Run(RunConfig),
    ShowConfig { config_override: Option<PathBuf> },
    Check { config_override: Option<PathBuf> },
}

/// Where the request JSON comes from
#[derive(Debug, Clone, PartialEq)]
pub enum RequestInput {
    Stdin,
    File(PathBuf),
}

#[derive(Debug, PartialEq)]
pub struct RunConfig {
    pub input: RequestInput,
    pub config_override: Option<PathBuf>,
    pub verbose: bool,
}

#[derive(Debug, Parser)]
#[command(name = "actx")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(
    about = "Execute filesystem, command, container, remote-shell and script actions from JSON requests"
)]
#[command(long_about = None)]
#[command(arg_required_else_help = true)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Execute one action request and print its result
    Run {
        /// Request JSON file (`-` or absent reads stdin)
        file: Option<PathBuf>,
        /// Configuration file path
        #[arg(short = 'c', long = "config")]
        config: Option<PathBuf>,
        /// Enable verbose output
        #[arg(short = 'v', long = "verbose")]
        verbose: bool,
    },
    /// Show configuration discovery information
    ShowConfig {
        /// Configuration file path
        #[arg(short = 'c', long = "config")]
        config: Option<PathBuf>,
    },
    /// Check interpreter and container daemon availability
    Check {
        /// Configuration file path
        #[arg(short = 'c', long = "config")]
        config: Option<PathBuf>,
    },
}

impl Args {
    pub fn parse() -> Self {
        Parser::parse()
    }

    pub fn mode(&self) -> Result<ExecutionMode, String> {
        match &self.command {
            Some(Commands::Run {
                file,
                config,
                verbose,
            }) => Ok(ExecutionMode::Run(RunConfig {
                input: Self::detect_input(file.as_deref()),
                config_override: config.clone(),
                verbose: *verbose,
            })),
            Some(Commands::ShowConfig { config }) => Ok(ExecutionMode::ShowConfig {
                config_override: config.clone(),
            }),
            Some(Commands::Check { config }) => Ok(ExecutionMode::Check {
                config_override: config.clone(),
            }),
            None => Err(
                "No command specified. Use 'actx --help' to see available commands.".to_string(),
            ),
        }
    }

    fn detect_input(file: Option<&Path>) -> RequestInput {
        match file {
            None => RequestInput::Stdin,
            Some(path) if path.as_os_str() == "-" => RequestInput::Stdin,
            Some(path) => RequestInput::File(path.to_path_buf()),
        }
    }
}
