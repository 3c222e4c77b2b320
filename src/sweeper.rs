//! Periodic removal of expired token records.
//!
//! Expired tokens never validate, so the sweep is storage hygiene only. A
//! failed pass is logged and the next tick tries again.

use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{error, info};

use crate::token::{Principal, TokenError, TokenService};

/// Default sweep cadence: once a day.
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(86_400);

pub struct ExpirySweeper<P> {
    tokens: Arc<TokenService<P>>,
    interval: Duration,
}

impl<P> ExpirySweeper<P>
where
    P: Principal + Send + Sync + 'static,
{
    pub fn new(tokens: Arc<TokenService<P>>) -> Self {
        Self {
            tokens,
            interval: DEFAULT_INTERVAL,
        }
    }

    /// Zero is raised to one second.
    #[must_use]
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = if interval.is_zero() {
            Duration::from_secs(1)
        } else {
            interval
        };
        self
    }

    #[must_use]
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// One pass.
    ///
    /// # Errors
    /// Returns the store failure, if any.
    pub async fn run_once(&self) -> Result<u64, TokenError> {
        let removed = self.tokens.clear_expired().await?;
        info!(removed, "expired tokens swept");
        Ok(removed)
    }

    /// Sweep now, then every `interval`, until the task is aborted.
    pub fn spawn(self) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            loop {
                if let Err(err) = self.run_once().await {
                    error!("token sweep failed: {err}");
                }

                sleep(self.interval).await;
            }
        })
    }
}
