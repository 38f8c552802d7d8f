use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{bail, Result};

use crate::scheduler::SweepIntervals;
use crate::store::DbConfig;

/// Which repository backend the process uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Memory,
    Postgres,
}

impl FromStr for StoreBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "memory" => Ok(Self::Memory),
            "postgres" => Ok(Self::Postgres),
            other => bail!("unknown OQS_STORE '{other}', expected 'memory' or 'postgres'"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub listen_addr: SocketAddr,
    pub log_level: String,
    pub dev_mode: bool,
    pub store: StoreBackend,
    pub database: DbConfig,
    pub sweeps: SweepIntervals,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let listen_addr = std::env::var("OQS_LISTEN_ADDR")
            .unwrap_or_else(|_| "127.0.0.1:8080".to_string())
            .parse()?;

        let log_level = std::env::var("OQS_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let dev_mode = std::env::var("OQS_DEV")
            .map(|v| v == "1" || v.to_lowercase() == "true")
            .unwrap_or(false);

        let store = std::env::var("OQS_STORE")
            .unwrap_or_else(|_| "memory".to_string())
            .parse()?;

        let database = DbConfig::from_env();

        let defaults = SweepIntervals::default();
        let sweeps = SweepIntervals {
            timeouts: secs_from_env("OQS_TIMEOUT_SWEEP_SECS", defaults.timeouts)?,
            deployment_start: secs_from_env("OQS_START_SWEEP_SECS", defaults.deployment_start)?,
            relationships: secs_from_env("OQS_RELATIONSHIP_SWEEP_SECS", defaults.relationships)?,
        };

        Ok(Self {
            listen_addr,
            log_level,
            dev_mode,
            store,
            database,
            sweeps,
        })
    }
}

fn secs_from_env(key: &str, default: Duration) -> Result<Duration> {
    let Ok(raw) = std::env::var(key) else {
        return Ok(default);
    };
    let secs: u64 = raw.trim().parse()?;
    if secs == 0 {
        bail!("{key} must be at least 1 second");
    }
    Ok(Duration::from_secs(secs))
}
