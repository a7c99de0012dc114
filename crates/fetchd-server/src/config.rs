use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::bail;
use clap::{Parser, ValueEnum};
use fetchd_core::app::DispatchMode;
use fetchd_core::impls::DEFAULT_FETCH_TIMEOUT;

use crate::telemetry::{LogConfig, LogFormat};

/// Where request records are kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StorageKind {
    Memory,
    Sqlite,
}

/// Which fetch client answers submitted requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ClientKind {
    /// Real outbound HTTP.
    Http,
    /// Answers 200 without touching the network.
    Mock,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum DispatchKind {
    /// Fetch inside the request handler and return the response.
    Sync,
    /// Queue the fetch for the worker pool and return 202.
    Async,
}

/// Runtime configuration for the `fetchd` binary.
///
/// Every flag falls back to a `FETCHD_*` environment variable; a `.env` file in
/// the working directory is loaded first.
#[derive(Parser, Debug, Clone)]
#[command(name = "fetchd", version, about = "HTTP fetch gateway with a request store")]
pub struct CliArgs {
    /// TCP port to listen on (all interfaces).
    #[arg(long, env = "FETCHD_PORT", default_value_t = 8080)]
    pub port: u16,

    #[arg(long, env = "FETCHD_STORAGE", value_enum, default_value_t = StorageKind::Memory)]
    pub storage: StorageKind,

    /// SQLite database file, used with `--storage sqlite`.
    #[arg(long, env = "FETCHD_DATABASE", default_value = "fetchd.db")]
    pub database: PathBuf,

    #[arg(long, env = "FETCHD_DISPATCH", value_enum, default_value_t = DispatchKind::Sync)]
    pub dispatch: DispatchKind,

    #[arg(long, env = "FETCHD_CLIENT", value_enum, default_value_t = ClientKind::Http)]
    pub client: ClientKind,

    /// Timeout in seconds for outbound fetches and for each SQLite operation.
    #[arg(long, env = "FETCHD_TIMEOUT", default_value_t = DEFAULT_FETCH_TIMEOUT.as_secs())]
    pub timeout: u64,

    /// Number of workers in async dispatch mode.
    #[arg(long, env = "FETCHD_POOL", default_value_t = 5)]
    pub pool: usize,

    #[arg(long, env = "FETCHD_LOG_FORMAT", value_enum, default_value_t = LogFormat::default())]
    pub log_format: LogFormat,

    /// `EnvFilter` directive, e.g. `info` or `fetchd_core=debug`.
    #[arg(long, env = "FETCHD_LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub storage: StorageKind,
    pub database: PathBuf,
    pub dispatch: DispatchMode,
    pub client: ClientKind,
    pub timeout: Duration,
    pub log: LogConfig,
}

impl TryFrom<CliArgs> for ServerConfig {
    type Error = anyhow::Error;

    fn try_from(args: CliArgs) -> Result<Self, Self::Error> {
        let Some(pool_size) = NonZeroUsize::new(args.pool) else {
            bail!("FETCHD_POOL must be greater than 0");
        };
        if args.timeout == 0 {
            bail!("FETCHD_TIMEOUT must be greater than 0");
        }

        let dispatch = match args.dispatch {
            DispatchKind::Sync => DispatchMode::Sync,
            DispatchKind::Async => DispatchMode::Async { pool_size },
        };

        Ok(Self {
            port: args.port,
            storage: args.storage,
            database: args.database,
            dispatch,
            client: args.client,
            timeout: Duration::from_secs(args.timeout),
            log: LogConfig {
                format: args.log_format,
                level: args.log_level,
            },
        })
    }
}
