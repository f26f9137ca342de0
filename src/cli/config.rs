//! Configuration discovery and loading
//!
//! This module handles the configuration discovery hierarchy:
//! 1. Explicit override: `--config <file>`
//! 2. Current directory: ./actx.toml or ./.actx/config.toml
//! 3. User config: ~/.actx/config.toml
//! 4. System config: /etc/actx/config.toml
//! 5. Built-in defaults

use crate::env;
use crate::executor::ExecutorConfig;
use std::env as std_env;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Configuration discovery system
pub struct ConfigDiscovery;

impl ConfigDiscovery {
    /// Load the override if given, otherwise the first discovered file,
    /// otherwise defaults.
    pub fn load(
        config_override: Option<&Path>,
    ) -> Result<ExecutorConfig, Box<dyn std::error::Error>> {
        if let Some(path) = config_override {
            info!("Loading configuration override from: {:?}", path);
            return ExecutorConfig::from_toml_file(path);
        }
        Self::discover_config()
    }

    /// Discover and load configuration using the hierarchy
    pub fn discover_config() -> Result<ExecutorConfig, Box<dyn std::error::Error>> {
        if let Some(config_path) = Self::find_config_file() {
            info!("Loading configuration from: {:?}", config_path);
            return ExecutorConfig::from_toml_file(config_path);
        }

        debug!("No configuration file found, using defaults");
        Ok(ExecutorConfig::default())
    }

    /// Find configuration file using discovery hierarchy
    pub fn find_config_file() -> Option<PathBuf> {
        Self::find_in(&Self::get_config_candidates())
    }

    fn find_in(candidates: &[PathBuf]) -> Option<PathBuf> {
        for candidate in candidates {
            debug!("Checking for config file: {:?}", candidate);
            if candidate.is_file() {
                return Some(candidate.clone());
            }
        }
        None
    }

    /// Configuration file candidates in priority order
    pub fn get_config_candidates() -> Vec<PathBuf> {
        let current_dir = std_env::current_dir().ok();
        Self::candidates_for(current_dir.as_deref(), Self::get_home_dir().as_deref())
    }

    fn candidates_for(current_dir: Option<&Path>, home_dir: Option<&Path>) -> Vec<PathBuf> {
        let mut candidates = Vec::new();

        if let Some(dir) = current_dir {
            candidates.push(env::local_config_file_path(dir));
            candidates.push(env::config_file_path(dir));
        }

        if let Some(home) = home_dir {
            candidates.push(env::config_file_path(home));
        }

        #[cfg(unix)]
        candidates.push(PathBuf::from(env::SYSTEM_CONFIG_FILE));

        candidates
    }

    /// Get home directory path
    fn get_home_dir() -> Option<PathBuf> {
        std_env::var("HOME")
            .ok()
            .or_else(|| std_env::var("USERPROFILE").ok())
            .map(PathBuf::from)
    }

    /// Show configuration discovery information for debugging
    pub fn show_discovery_info(config_override: Option<&Path>) {
        println!("Configuration Discovery Hierarchy:");
        println!();

        if let Some(path) = config_override {
            println!("  0. {:?} - OVERRIDE", path);
        }

        let candidates = Self::get_config_candidates();
        for (i, candidate) in candidates.iter().enumerate() {
            let status = if candidate.exists() {
                if candidate.is_file() {
                    "EXISTS"
                } else {
                    "NOT A FILE"
                }
            } else {
                "NOT FOUND"
            };

            println!("  {}. {:?} - {}", i + 1, candidate, status);
        }

        println!();
        match (config_override, Self::find_in(&candidates)) {
            (Some(path), _) => println!("Active configuration: {:?}", path),
            (None, Some(found)) => println!("Active configuration: {:?}", found),
            (None, None) => println!("Active configuration: Built-in defaults"),
        }
    }
}
