//! Server configuration, read from `CHAIRTIME_*` environment variables.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Secret used when `CHAIRTIME_JWT_SECRET` is unset. Development only.
const DEV_JWT_SECRET: &str = "chairtime-dev-secret-not-for-production";

#[derive(Debug, Clone)]
pub struct Config {
    pub bind: String,
    pub port: u16,
    /// Directory holding `chairtime.wal`.
    pub data_dir: PathBuf,
    /// Prometheus exporter port; disabled when `None`.
    pub metrics_port: Option<u16>,
    /// WAL appends before the compactor rewrites the log.
    pub compact_threshold: u64,
    /// Upper bound on a single storage round trip.
    pub storage_timeout: Duration,
    pub jwt_secret: String,
    /// Identified-booking deployment mode.
    pub booking_requires_login: bool,
    /// Seed default hours and catalog into an empty store.
    pub seed: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0".into(),
            port: 8080,
            data_dir: PathBuf::from("./data"),
            metrics_port: None,
            compact_threshold: 1000,
            storage_timeout: Duration::from_millis(5000),
            jwt_secret: DEV_JWT_SECRET.into(),
            booking_requires_login: false,
            seed: true,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable source. Unparseable values keep the
    /// default and are reported with a warning.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        let jwt_secret = match lookup("CHAIRTIME_JWT_SECRET").filter(|s| !s.is_empty()) {
            Some(secret) => secret,
            None => {
                tracing::warn!(
                    "CHAIRTIME_JWT_SECRET not set, using the development secret; do not run this in production"
                );
                defaults.jwt_secret
            }
        };

        Self {
            bind: lookup("CHAIRTIME_BIND").unwrap_or(defaults.bind),
            port: parsed(&lookup, "CHAIRTIME_PORT", defaults.port),
            data_dir: lookup("CHAIRTIME_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.data_dir),
            metrics_port: lookup("CHAIRTIME_METRICS_PORT").and_then(|raw| {
                raw.parse()
                    .inspect_err(|_| {
                        tracing::warn!(value = %raw, "invalid CHAIRTIME_METRICS_PORT, metrics disabled")
                    })
                    .ok()
            }),
            compact_threshold: parsed(&lookup, "CHAIRTIME_COMPACT_THRESHOLD", defaults.compact_threshold),
            storage_timeout: Duration::from_millis(parsed(
                &lookup,
                "CHAIRTIME_STORAGE_TIMEOUT_MS",
                defaults.storage_timeout.as_millis() as u64,
            )),
            jwt_secret,
            booking_requires_login: parsed(
                &lookup,
                "CHAIRTIME_BOOKING_REQUIRES_LOGIN",
                defaults.booking_requires_login,
            ),
            seed: parsed(&lookup, "CHAIRTIME_SEED", defaults.seed),
        }
    }

    pub fn wal_path(&self) -> PathBuf {
        self.data_dir.join("chairtime.wal")
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.bind, self.port)
    }
}

fn parsed<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T {
    match lookup(key) {
        None => default,
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            tracing::warn!(key, value = %raw, "unparseable value, using default");
            default
        }),
    }
}
