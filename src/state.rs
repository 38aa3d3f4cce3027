//! Shared application state for the edge router.
//!
//! - **Rate limiter**: the one process-wide mutable store
//! - **Middleware chain**: the configured pipeline every guarded route runs
//! - **Backend client**: the Session Relay's HTTP client
//!
//! # Structured Concurrency
//!
//! The expired-record sweep runs on a background task managed with
//! `tokio_util::task::TaskTracker` and `CancellationToken`. Call `shutdown()`
//! to stop it before the process exits.

use std::sync::Arc;
use std::time::Instant;

use tokio::time::interval;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, trace};

use crate::clock::{Clock, SystemClock};
use crate::config::Config;
use crate::error::AppResult;
use crate::metrics;
use crate::middleware::{MiddlewareChain, RateLimiter, RuleTable};
use crate::relay::BackendClient;
use crate::session_cookie::SessionCookiePolicy;

/// Cloned into every handler; all shared parts sit behind `Arc`.
///
/// ```rust,ignore
/// let state = AppState::new(config)?;
/// // ... serve ...
/// state.shutdown().await;
/// ```
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub limiter: Arc<RateLimiter>,
    pub chain: Arc<MiddlewareChain>,
    pub backend: BackendClient,
    pub cookies: SessionCookiePolicy,
    /// Timestamp when the application started
    pub started_at: Instant,
    task_tracker: TaskTracker,
    cancellation_token: CancellationToken,
}

impl AppState {
    /// Build the state and start the sweep task. Requires a Tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns `AppError::ConfigError` if the backend client cannot be built.
    pub fn new(config: Config) -> AppResult<Self> {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Same as [`AppState::new`] with an injected rate-limit clock.
    pub fn with_clock(config: Config, clock: Arc<dyn Clock>) -> AppResult<Self> {
        let backend = BackendClient::new(config.backend_url.clone(), config.backend_timeout)?;
        let limiter = Arc::new(RateLimiter::with_clock(RuleTable::default(), clock));
        let chain = Arc::new(MiddlewareChain::new(&config, limiter.clone()));
        let cookies = SessionCookiePolicy::new(config.mode);

        let state = Self {
            config: Arc::new(config),
            limiter,
            chain,
            backend,
            cookies,
            started_at: Instant::now(),
            task_tracker: TaskTracker::new(),
            cancellation_token: CancellationToken::new(),
        };

        state.spawn_sweep_task();

        Ok(state)
    }

    /// Periodically drop rate-limit records whose window has closed.
    ///
    /// The sweep shares the limiter's per-key locking with `check`, so it
    /// never observes a record mid-update.
    fn spawn_sweep_task(&self) {
        let limiter = self.limiter.clone();
        let period = self.config.rate_limit_sweep_interval;
        let cancel = self.cancellation_token.clone();

        self.task_tracker.spawn(async move {
            let mut ticker = interval(period);
            ticker.tick().await; // Skip the first immediate tick

            loop {
                tokio::select! {
                    biased;

                    _ = cancel.cancelled() => {
                        debug!("Rate limit sweep task received cancellation signal");
                        break;
                    }
                    _ = ticker.tick() => {
                        let removed = limiter.sweep();
                        let remaining = limiter.len();
                        metrics::set_rate_limit_records(remaining);
                        trace!(removed, remaining, "Rate limit records swept");
                    }
                }
            }

            debug!("Rate limit sweep task shutting down");
        });
    }

    /// Gracefully shutdown all background tasks.
    ///
    /// 1. Signals all tasks to stop via cancellation token
    /// 2. Closes the task tracker (prevents new tasks)
    /// 3. Waits for all tasks to complete
    pub async fn shutdown(&self) {
        info!("Initiating graceful shutdown of background tasks");

        self.cancellation_token.cancel();
        self.task_tracker.close();
        self.task_tracker.wait().await;

        info!("All background tasks have completed");
    }

    /// Get the application uptime in seconds.
    pub fn uptime_seconds(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }
}
