use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use serde::Deserialize;

use super::types::SessionConfig;
use crate::error_handling::types::ConfigError;
use crate::inspection::{create_matcher, create_replacer, Pipeline};
use crate::logger::{LogSink, ProcessLogger};
use crate::network::dial::{default_tls_connector, RemoteTarget};
use crate::session_management::monitor::DEFAULT_STATS_INTERVAL;

pub const DEFAULT_LOCAL_ADDR: &str = ":9999";
pub const DEFAULT_REMOTE_ADDR: &str = "127.0.0.1:8000";

/// Command line of the relay.
///
/// Every option can also be given through its `TCPPROXY_*` environment
/// variable, or through a TOML file passed with `--config`. Values given on
/// the command line or in the environment win over the file.
#[derive(Parser, Debug, Clone, Default)]
#[command(name = "tcp-relay")]
#[command(about = "An inspectable TCP relay with optional TLS unwrapping")]
pub struct Args {
    /// TOML file with default values for the options below
    #[arg(short = 'c', long = "config", env = "TCPPROXY_CONFIG")]
    pub config_file: Option<PathBuf>,

    /// local address
    #[arg(short, long, env = "TCPPROXY_LOCALADDR")]
    pub local: Option<String>,

    /// remote(destination) address
    #[arg(short, long, env = "TCPPROXY_REMOTEADDR")]
    pub remote: Option<String>,

    /// disable nagles algorithm
    #[arg(short = 'n', long = "no-nagles", env = "TCPPROXY_DISABLE_NAGLES")]
    pub no_nagles: bool,

    /// remote connection with TLS exposed unencrypted locally
    #[arg(long = "unwrap-tls", env = "TCPPROXY_UNWRAP_TLS")]
    pub unwrap_tls: bool,

    /// match regex (in the form `regex`)
    #[arg(long = "match", env = "TCPPROXY_MATCH")]
    pub match_pattern: Option<String>,

    /// replace regex (in the form `regex~replacer`)
    #[arg(long, env = "TCPPROXY_REPLACE")]
    pub replace: Option<String>,

    /// display server actions
    #[arg(short, long, env = "TCPPROXY_DEBUG")]
    pub debug: bool,

    /// display server actions and all tcp data
    #[arg(short = 'V', long, env = "TCPPROXY_VERBOSE")]
    pub verbose: bool,

    /// output binary data hexadecimal
    #[arg(long, env = "TCPPROXY_OUTPUT_HEX")]
    pub hex: bool,

    /// period of the per-session stats report (e.g. `30s`, `2m`)
    #[arg(long, env = "TCPPROXY_STATS_INTERVAL")]
    pub stats_interval: Option<String>,
}

/// Same settings as [`Args`], read from a TOML file.
#[derive(Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub local: Option<String>,
    pub remote: Option<String>,
    pub no_nagles: bool,
    pub unwrap_tls: bool,
    #[serde(rename = "match")]
    pub match_pattern: Option<String>,
    pub replace: Option<String>,
    pub debug: bool,
    pub verbose: bool,
    pub hex: bool,
    pub stats_interval: Option<String>,
}

impl FileConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }
}

/// Resolved application configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub local: String,
    pub remote: String,
    pub no_nagles: bool,
    pub unwrap_tls: bool,
    pub match_pattern: String,
    pub replace: String,
    pub debug: bool,
    pub verbose: bool,
    pub hex: bool,
    pub stats_interval: Duration,
}

impl Config {
    /// Parses the process arguments and environment, then merges the file
    /// given with `--config`, if any.
    pub fn from_args() -> Result<Self, ConfigError> {
        Self::from_parsed(Args::parse())
    }

    pub fn from_parsed(args: Args) -> Result<Self, ConfigError> {
        let file = match &args.config_file {
            Some(path) => FileConfig::from_file(path)?,
            None => FileConfig::default(),
        };
        Self::merge(args, file)
    }

    /// Command line over file over defaults. Switches are on if either side
    /// turns them on.
    pub fn merge(args: Args, file: FileConfig) -> Result<Self, ConfigError> {
        let stats_interval = match args.stats_interval.or(file.stats_interval) {
            Some(s) => parse_duration(&s)?,
            None => DEFAULT_STATS_INTERVAL,
        };
        let verbose = args.verbose || file.verbose;

        Ok(Self {
            local: args
                .local
                .or(file.local)
                .unwrap_or_else(|| DEFAULT_LOCAL_ADDR.to_string()),
            remote: args
                .remote
                .or(file.remote)
                .unwrap_or_else(|| DEFAULT_REMOTE_ADDR.to_string()),
            no_nagles: args.no_nagles || file.no_nagles,
            unwrap_tls: args.unwrap_tls || file.unwrap_tls,
            match_pattern: args.match_pattern.or(file.match_pattern).unwrap_or_default(),
            replace: args.replace.or(file.replace).unwrap_or_default(),
            debug: args.debug || file.debug || verbose,
            verbose,
            hex: args.hex || file.hex,
            stats_interval,
        })
    }

    /// Resolves addresses, compiles the inspection stages and builds the
    /// configuration shared by every session.
    pub async fn session_config(&self) -> Result<SessionConfig, ConfigError> {
        let local_addr = resolve(&self.local).await?;
        let remote_addr = resolve(&self.remote).await?;

        let remote = if self.unwrap_tls {
            let connector = default_tls_connector()
                .map_err(|e| ConfigError::Tls(e.to_string()))?;
            RemoteTarget::Tls {
                address: self.remote.clone(),
                connector,
            }
        } else {
            RemoteTarget::Plain(remote_addr)
        };

        let match_sink: Arc<dyn LogSink> = Arc::new(ProcessLogger);
        let pipeline = Pipeline::new(
            create_matcher(&self.match_pattern, match_sink),
            create_replacer(&self.replace),
        );

        Ok(SessionConfig {
            local_addr,
            remote_addr,
            remote,
            no_delay: self.no_nagles,
            output_hex: self.hex,
            debug: self.debug,
            verbose: self.verbose,
            pipeline,
            stats_interval: self.stats_interval,
        })
    }
}

/// Accepts humantime strings (`30s`, `1m30s`) or a bare number of seconds.
pub fn parse_duration(s: &str) -> Result<Duration, ConfigError> {
    if let Ok(d) = humantime::parse_duration(s) {
        return Ok(d);
    }
    s.trim()
        .parse::<u64>()
        .map(Duration::from_secs)
        .map_err(|_| ConfigError::BadDuration(format!("invalid duration '{}'", s)))
}

/// Turns `:port` into `0.0.0.0:port`, leaving other forms untouched.
pub fn normalize_addr(addr: &str) -> String {
    if addr.starts_with(':') {
        format!("0.0.0.0{}", addr)
    } else {
        addr.to_string()
    }
}

/// First socket address `addr` resolves to.
pub async fn resolve(addr: &str) -> Result<SocketAddr, ConfigError> {
    let normalized = normalize_addr(addr);
    let first = tokio::net::lookup_host(normalized.as_str())
        .await
        .map_err(|e| ConfigError::BadAddress(format!("failed to resolve {}: {}", addr, e)))?
        .next();
    first.ok_or_else(|| ConfigError::BadAddress(format!("{} resolved to no address", addr)))
}
