//! CLI argument definitions for topoagent-daemon.
//!
//! Uses `clap` v4 derive macros to parse command-line arguments.

use std::path::PathBuf;

use clap::Parser;

use topoagent_core::config::AgentConfig;

/// topoagent topology daemon.
///
/// Runs the enabled topology checks, batches their output and hands
/// encoded payloads to the transport queue.
#[derive(Parser, Debug)]
#[command(name = "topoagent-daemon")]
#[command(version, about, long_about = None)]
pub struct DaemonCli {
    /// Path to topoagent.toml configuration file.
    #[arg(short, long, default_value = "/etc/topoagent/topoagent.toml")]
    pub config: PathBuf,

    /// Override log level (trace, debug, info, warn, error).
    ///
    /// Takes precedence over the config file and environment variables.
    #[arg(long)]
    pub log_level: Option<String>,

    /// Override log format (json, pretty).
    ///
    /// Takes precedence over the config file and environment variables.
    #[arg(long)]
    pub log_format: Option<String>,

    /// Validate configuration file and exit without starting the daemon.
    #[arg(long)]
    pub validate: bool,

    /// Override PID file path (takes precedence over config file).
    #[arg(long)]
    pub pid_file: Option<String>,

    /// Override the hostname reported in intake messages.
    #[arg(long)]
    pub hostname: Option<String>,
}

impl DaemonCli {
    /// Apply command-line overrides on top of the loaded configuration.
    ///
    /// The caller is expected to re-validate the configuration afterwards.
    pub fn apply_overrides(&self, config: &mut AgentConfig) {
        if let Some(level) = &self.log_level {
            config.general.log_level = level.clone();
        }
        if let Some(format) = &self.log_format {
            config.general.log_format = format.clone();
        }
        if let Some(pid_file) = &self.pid_file {
            config.general.pid_file = pid_file.clone();
        }
        if let Some(hostname) = &self.hostname {
            config.general.hostname = hostname.clone();
        }
    }
}
