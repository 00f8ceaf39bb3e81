//! netmatch-server configuration
//!
//! Command-line flags (with environment fallbacks) override the TOML config
//! file, which overrides compiled defaults.

use clap::Parser;
use netmatch_common::config::{resolve_data_folder, TomlConfig};
use std::path::PathBuf;
use std::time::Duration;

use crate::services::invoker::{ProcessInvoker, DEFAULT_MAX_CONCURRENT, DEFAULT_TIMEOUT};

pub const DEFAULT_PORT: u16 = 3001;
pub const DEFAULT_BIND: &str = "127.0.0.1";
pub const DEFAULT_SCORER_PROGRAM: &str = "python";
pub const DEFAULT_SCORER_SCRIPT: &str = "Agents/main.py";

/// Command-line arguments for netmatch-server
#[derive(Parser, Debug, Clone, Default)]
#[command(name = "netmatch-server")]
#[command(about = "Networking submission intake and match orchestration service")]
#[command(version)]
pub struct Args {
    /// Port to listen on
    #[arg(short, long, env = "NETMATCH_PORT")]
    pub port: Option<u16>,

    /// Address to bind to
    #[arg(long, env = "NETMATCH_BIND")]
    pub bind: Option<String>,

    /// Folder holding the submission snapshot (env: NETMATCH_DATA_FOLDER)
    #[arg(short, long)]
    pub data_folder: Option<PathBuf>,

    /// TOML config file (env: NETMATCH_CONFIG)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Scoring unit executable
    #[arg(long, env = "NETMATCH_SCORER_PROGRAM")]
    pub scorer_program: Option<String>,

    /// Scoring unit argument placed before --action (repeatable)
    #[arg(long = "scorer-arg", allow_hyphen_values = true)]
    pub scorer_args: Vec<String>,

    /// Scoring unit working directory
    #[arg(long, env = "NETMATCH_SCORER_WORKING_DIR")]
    pub scorer_working_dir: Option<PathBuf>,

    /// Seconds before a running scoring call is killed
    #[arg(long, env = "NETMATCH_SCORER_TIMEOUT_SECS")]
    pub scorer_timeout_secs: Option<u64>,

    /// Maximum concurrently running scoring calls
    #[arg(long, env = "NETMATCH_SCORER_MAX_CONCURRENT")]
    pub scorer_max_concurrent: Option<usize>,
}

/// Scoring unit launch settings
#[derive(Debug, Clone, PartialEq)]
pub struct ScorerSettings {
    pub program: String,
    pub args: Vec<String>,
    pub working_dir: Option<PathBuf>,
    pub timeout: Duration,
    pub max_concurrent: usize,
}

/// Resolved server configuration
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub bind: String,
    pub port: u16,
    pub data_folder: PathBuf,
    pub log_level: String,
    pub scorer: ScorerSettings,
}

impl Config {
    /// Merge CLI/env arguments over the TOML file and compiled defaults
    pub fn resolve(args: &Args, toml_config: &TomlConfig) -> Self {
        let scorer = &toml_config.scorer;

        let scorer_args = if !args.scorer_args.is_empty() {
            args.scorer_args.clone()
        } else {
            scorer
                .args
                .clone()
                .unwrap_or_else(|| vec![DEFAULT_SCORER_SCRIPT.to_string()])
        };

        Self {
            bind: args
                .bind
                .clone()
                .or_else(|| toml_config.bind_address.clone())
                .unwrap_or_else(|| DEFAULT_BIND.to_string()),
            port: args.port.or(toml_config.port).unwrap_or(DEFAULT_PORT),
            data_folder: resolve_data_folder(args.data_folder.as_deref(), toml_config),
            log_level: toml_config.logging.level.clone(),
            scorer: ScorerSettings {
                program: args
                    .scorer_program
                    .clone()
                    .or_else(|| scorer.program.clone())
                    .unwrap_or_else(|| DEFAULT_SCORER_PROGRAM.to_string()),
                args: scorer_args,
                working_dir: args
                    .scorer_working_dir
                    .clone()
                    .or_else(|| scorer.working_dir.clone()),
                timeout: args
                    .scorer_timeout_secs
                    .or(scorer.timeout_secs)
                    .map(Duration::from_secs)
                    .unwrap_or(DEFAULT_TIMEOUT),
                max_concurrent: args
                    .scorer_max_concurrent
                    .or(scorer.max_concurrent)
                    .unwrap_or(DEFAULT_MAX_CONCURRENT),
            },
        }
    }

    /// `host:port` listen address
    pub fn listen_address(&self) -> String {
        format!("{}:{}", self.bind, self.port)
    }

    /// Build the process invoker described by the scorer settings
    pub fn invoker(&self) -> ProcessInvoker {
        let invoker = ProcessInvoker::new(self.scorer.program.clone(), self.scorer.args.clone())
            .with_timeout(self.scorer.timeout)
            .with_max_concurrent(self.scorer.max_concurrent);
        match &self.scorer.working_dir {
            Some(dir) => invoker.with_working_dir(dir.clone()),
            None => invoker,
        }
    }
}
