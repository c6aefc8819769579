//! Immutable configuration, built once at startup and shared read-only thereafter.

use std::net::SocketAddr;
use std::time::Duration;

/// Default standby-connection TTL, in seconds, matching the original `shootback` default.
pub const DEFAULT_SPARE_SLAVER_TTL_SECS: u64 = 600;

/// Default standby pool cap, matching the original `shootback` default.
pub const DEFAULT_MAX_SPARE_COUNT: usize = 5;

/// Configuration for one slaver process. Built once (typically from CLI arguments) and
/// handed by reference/`Arc` to the codec and pool controller; never mutated afterward.
/// Changing the secret requires constructing a new `Config` and restarting the process.
#[derive(Debug, Clone)]
pub struct Config {
    pub master_addr: SocketAddr,
    pub target_addr: SocketAddr,
    pub secret: String,
    pub spare_slaver_ttl: Duration,
    pub max_spare_count: usize,
}

impl Config {
    pub fn new(
        master_addr: SocketAddr,
        target_addr: SocketAddr,
        secret: impl Into<String>,
    ) -> Config {
        Config {
            master_addr,
            target_addr,
            secret: secret.into(),
            spare_slaver_ttl: Duration::from_secs(DEFAULT_SPARE_SLAVER_TTL_SECS),
            max_spare_count: DEFAULT_MAX_SPARE_COUNT,
        }
    }

    pub fn with_spare_slaver_ttl(mut self, ttl: Duration) -> Config {
        self.spare_slaver_ttl = ttl;
        self
    }

    pub fn with_max_spare_count(mut self, max_spare_count: usize) -> Config {
        self.max_spare_count = max_spare_count;
        self
    }
}
