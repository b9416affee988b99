use crate::service::{DEFAULT_DAY_OFFSET_SECONDS, default_day_offset};
use crate::store::{DEFAULT_SNAPSHOT_EVERY_OPS, StoreOptions};
use chrono::FixedOffset;
use clap::Parser;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;

/// Server configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    /// Address to listen on
    pub host: IpAddr,

    /// Port to listen on
    pub port: u16,

    /// Directory holding the JSON snapshot; `None` keeps everything in memory
    pub data_dir: Option<PathBuf>,

    /// Committed writes between two snapshots
    pub snapshot_every_ops: u64,

    /// UTC offset of the calendar day used by the "today" workout listing
    pub day_offset: FixedOffset,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: 8080,
            data_dir: None,
            snapshot_every_ops: DEFAULT_SNAPSHOT_EVERY_OPS,
            day_offset: default_day_offset(),
        }
    }
}

impl AppConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn host(mut self, host: IpAddr) -> Self {
        self.host = host;
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.data_dir = Some(dir.into());
        self
    }

    pub fn snapshot_every_ops(mut self, ops: u64) -> Self {
        self.snapshot_every_ops = ops.max(1);
        self
    }

    pub fn day_offset(mut self, offset: FixedOffset) -> Self {
        self.day_offset = offset;
        self
    }

    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    pub fn store_options(&self) -> StoreOptions {
        StoreOptions {
            data_dir: self.data_dir.clone(),
            snapshot_every_ops: self.snapshot_every_ops,
        }
    }
}

#[derive(Debug, Parser)]
#[command(name = "fitsync")]
#[command(about = "Exercise catalog, routine and workout log backend")]
pub struct Cli {
    #[arg(long, env = "FITSYNC_HOST", default_value = "127.0.0.1")]
    pub host: IpAddr,

    #[arg(long, env = "FITSYNC_PORT", default_value_t = 8080)]
    pub port: u16,

    /// Snapshot directory; omit to run without persistence
    #[arg(long, env = "FITSYNC_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    #[arg(long, env = "FITSYNC_SNAPSHOT_EVERY", default_value_t = DEFAULT_SNAPSHOT_EVERY_OPS)]
    pub snapshot_every: u64,

    /// UTC offset in minutes that decides where a workout day starts
    #[arg(
        long,
        env = "FITSYNC_DAY_OFFSET_MINUTES",
        default_value_t = DEFAULT_DAY_OFFSET_SECONDS / 60,
        value_parser = clap::value_parser!(i32).range(-1439..=1439),
        allow_negative_numbers = true
    )]
    pub day_offset_minutes: i32,
}

impl From<Cli> for AppConfig {
    fn from(cli: Cli) -> Self {
        let config = AppConfig::new()
            .host(cli.host)
            .port(cli.port)
            .snapshot_every_ops(cli.snapshot_every)
            .day_offset(
                FixedOffset::east_opt(cli.day_offset_minutes * 60).unwrap_or_else(default_day_offset),
            );
        match cli.data_dir {
            Some(dir) => config.data_dir(dir),
            None => config,
        }
    }
}
