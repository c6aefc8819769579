//! Supervision loop: keeps the standby pool topped up to `maxSpareCount`, backing off on
//! master-dial failure and gently rate-limiting itself while saturated.

use std::sync::Arc;
use std::time::Duration;

use slog::{info, o, warn};
use tokio::net::TcpStream;

use crate::bridge::SocketBridge;
use crate::codec::Codec;
use crate::config::Config;
use crate::error::ControllerError;
use crate::session;
use crate::state::PoolState;

const DEFAULT_SPARE_DELAY: f64 = 0.1;
const MAX_ERR_DELAY: u64 = 15;

/// Next backoff after a failed master dial: ramps linearly from 0 up to `MAX_ERR_DELAY`,
/// then holds there until a successful dial resets it to 0.
fn next_err_delay(err_delay: u64) -> u64 {
    if err_delay < MAX_ERR_DELAY {
        err_delay + 1
    } else {
        err_delay
    }
}

/// Next delay while the standby pool stays saturated: converges geometrically toward
/// `DEFAULT_SPARE_DELAY` from whatever value the last drain-and-refill left it at (0 as soon
/// as the pool had room). Repeated saturation slows the poll rate instead of busy-looping;
/// any room in the pool resets it to 0 so refill reacts immediately.
fn next_spare_delay(spare_delay: f64) -> f64 {
    (spare_delay + DEFAULT_SPARE_DELAY) / 2.0
}

/// Maintains the standby connection pool and promotes connections into working sessions.
pub struct PoolController {
    config: Arc<Config>,
    codec: Arc<Codec>,
    state: Arc<PoolState>,
    bridge: Arc<SocketBridge>,
    logger: slog::Logger,
}

impl PoolController {
    pub fn new(config: Config, logger: slog::Logger) -> PoolController {
        let codec = Codec::new(config.secret.clone());
        PoolController {
            config: Arc::new(config),
            codec: Arc::new(codec),
            state: Arc::new(PoolState::new()),
            bridge: Arc::new(SocketBridge::new()),
            logger,
        }
    }

    /// Runs the supervision loop forever. Only a process signal (outside this crate) ends
    /// it; no error path here terminates the controller.
    pub async fn run(&self) -> ! {
        let mut err_delay: u64 = 0;
        let mut spare_delay: f64 = DEFAULT_SPARE_DELAY;

        loop {
            if self.state.spare_len() >= self.config.max_spare_count {
                tokio::time::sleep(Duration::from_secs_f64(spare_delay)).await;
                spare_delay = next_spare_delay(spare_delay);
                continue;
            }
            spare_delay = 0.0;

            match self.dial_and_spawn().await {
                Ok(()) => {
                    err_delay = 0;
                }
                Err(e) => {
                    warn!(self.logger, "standby dial failed"; "error" => %e, "backoff_secs" => err_delay);
                    tokio::time::sleep(Duration::from_secs(err_delay)).await;
                    err_delay = next_err_delay(err_delay);
                }
            }
        }
    }

    async fn dial_and_spawn(&self) -> Result<(), ControllerError> {
        let stream = TcpStream::connect(self.config.master_addr)
            .await
            .map_err(ControllerError::DialMaster)?;

        let local_addr = stream.local_addr().map_err(ControllerError::DialMaster)?;

        self.state.insert_spare(local_addr);
        info!(self.logger, "dialed master, standing by"; "master" => local_addr.to_string(), "standby" => self.state.spare_len());

        let config = self.config.clone();
        let codec = self.codec.clone();
        let state = self.state.clone();
        let bridge = self.bridge.clone();
        let logger = self.logger.new(o!());

        tokio::spawn(async move {
            session::run(local_addr, stream, config, codec, state, bridge, logger).await;
        });

        Ok(())
    }
}
