//! Command line and environment configuration.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, ValueEnum};

use crate::domain::ConfigError;
use crate::infra::LogFormat;

/// Default Tendermint peer-to-peer port
pub const DEFAULT_PEER_PORT: u16 = 26656;

/// How metric refreshes are scheduled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum RefreshMode {
    /// Refresh every metric while serving each scrape
    #[default]
    Scrape,
    /// Refresh every metric on its own fixed interval
    Interval,
}

/// Raw command line flags.
///
/// Every flag can also be set through the environment (a `.env` file is
/// honoured by the binary).
#[derive(Debug, Clone, Parser)]
#[command(name = "cosmos-node-exporter", version, about)]
pub struct Cli {
    /// The address to listen on for HTTP requests
    #[arg(long, env = "LISTEN_ADDRESS", default_value = ":8080")]
    pub listen_address: String,

    /// Path to the node's address book
    #[arg(
        long,
        env = "ADDRBOOK_PATH",
        default_value = "/root/.gaia/config/addrbook.json"
    )]
    pub config_path: PathBuf,

    /// Host of the exposed REST API
    #[arg(long, env = "APP_HOST", default_value = "127.0.0.1")]
    pub app_host: String,

    /// Port of the exposed REST API
    #[arg(long, env = "APP_PORT", default_value = ":1317")]
    pub app_port: String,

    /// When to refresh metrics
    #[arg(long, env = "REFRESH_MODE", value_enum, default_value_t = RefreshMode::Scrape)]
    pub refresh_mode: RefreshMode,

    /// Seconds between refreshes in interval mode
    #[arg(long, env = "REFRESH_INTERVAL_SECS", default_value_t = 5)]
    pub refresh_interval_secs: u64,

    /// Timeout of a single REST API request, in seconds
    #[arg(long, env = "REQUEST_TIMEOUT_SECS", default_value_t = 10)]
    pub request_timeout_secs: u64,

    /// Remote port identifying peer connections
    #[arg(long, env = "PEER_PORT", default_value_t = DEFAULT_PEER_PORT)]
    pub peer_port: u16,

    /// Also export the size of the latest validator set
    #[arg(long, env = "TRACK_VALIDATORS")]
    pub track_validators: bool,

    /// Log output format
    #[arg(long, env = "LOG_FORMAT", value_enum, default_value_t = LogFormat::Pretty)]
    pub log_format: LogFormat,
}

/// Validated exporter configuration
#[derive(Debug, Clone)]
pub struct ExporterConfig {
    pub listen_address: SocketAddr,
    pub address_book_path: PathBuf,
    pub api_base_url: String,
    pub refresh_mode: RefreshMode,
    pub refresh_interval: Duration,
    pub request_timeout: Duration,
    pub peer_port: u16,
    pub track_validators: bool,
    pub log_format: LogFormat,
}

impl TryFrom<Cli> for ExporterConfig {
    type Error = ConfigError;

    fn try_from(cli: Cli) -> Result<Self, Self::Error> {
        if cli.refresh_interval_secs == 0 {
            return Err(ConfigError::InvalidValue {
                key: "refresh-interval-secs".to_string(),
                message: "must be greater than zero".to_string(),
            });
        }
        if cli.request_timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                key: "request-timeout-secs".to_string(),
                message: "must be greater than zero".to_string(),
            });
        }

        Ok(Self {
            listen_address: parse_listen_address(&cli.listen_address)?,
            address_book_path: cli.config_path,
            api_base_url: api_base_url(&cli.app_host, &cli.app_port)?,
            refresh_mode: cli.refresh_mode,
            refresh_interval: Duration::from_secs(cli.refresh_interval_secs),
            request_timeout: Duration::from_secs(cli.request_timeout_secs),
            peer_port: cli.peer_port,
            track_validators: cli.track_validators,
            log_format: cli.log_format,
        })
    }
}

impl ExporterConfig {
    /// Parse flags and environment into a validated configuration
    pub fn from_args() -> Result<Self, ConfigError> {
        Self::try_from(Cli::parse())
    }
}

/// Parse a listen address. A bare `:port` binds every interface.
pub fn parse_listen_address(raw: &str) -> Result<SocketAddr, ConfigError> {
    let invalid = |message: String| ConfigError::InvalidValue {
        key: "listen-address".to_string(),
        message,
    };

    if let Some(port) = raw.strip_prefix(':') {
        let port: u16 = port
            .parse()
            .map_err(|_| invalid(format!("invalid port in {raw:?}")))?;
        return Ok(SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), port));
    }

    raw.parse()
        .map_err(|_| invalid(format!("{raw:?} is not a socket address")))
}

/// Build the REST API base URL. The port may be given with or without a
/// leading colon.
pub fn api_base_url(host: &str, port: &str) -> Result<String, ConfigError> {
    let port = port.strip_prefix(':').unwrap_or(port);
    port.parse::<u16>().map_err(|_| ConfigError::InvalidValue {
        key: "app-port".to_string(),
        message: format!("{port:?} is not a port number"),
    })?;

    if host.is_empty() {
        return Err(ConfigError::InvalidValue {
            key: "app-host".to_string(),
            message: "must not be empty".to_string(),
        });
    }

    // Bare IPv6 literals need brackets inside a URL
    let host = if host.contains(':') && !host.starts_with('[') {
        format!("[{host}]")
    } else {
        host.to_string()
    };

    Ok(format!("http://{host}:{port}"))
}
