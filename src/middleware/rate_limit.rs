//! Per-client, per-route fixed-window rate limiting.
//!
//! # Algorithm
//!
//! Each `(client, path)` pair owns a [`RateLimitRecord`]. The first request
//! opens a window of `rule.window` and counts 1. Requests inside the window
//! increment the count; once it exceeds `rule.max_requests` the request is
//! throttled with `retry_after = ceil(remaining_ms / 1000)`. The first request
//! observed after the window end replaces the record with a fresh window.
//!
//! This is a fixed window, not a sliding one: a client may send
//! `2 × max_requests` across a window boundary without being throttled.
//!
//! # Rule Selection
//!
//! Exact path match, then the first prefix match in declaration order, then
//! the default rule.
//!
//! # Concurrency
//!
//! Records live in a `DashMap`. Increment-and-compare happens while holding
//! the shard lock for the key, and [`RateLimiter::sweep`] removes expired
//! records through the same locks.
//!
//! # Response Headers
//!
//! Every checked request gets `X-RateLimit-Limit`, `X-RateLimit-Remaining`
//! and `X-RateLimit-Reset` (RFC 3339). `Retry-After` is added when throttled.

use std::sync::Arc;

use axum::http::{HeaderMap, HeaderValue, header};
use chrono::{DateTime, SecondsFormat, TimeDelta, Utc};
use dashmap::DashMap;
use tracing::{debug, warn};

use crate::clock::{Clock, SystemClock};
use crate::error::AppError;
use crate::metrics;

pub const LIMIT_HEADER: &str = "x-ratelimit-limit";
pub const REMAINING_HEADER: &str = "x-ratelimit-remaining";
pub const RESET_HEADER: &str = "x-ratelimit-reset";

/// Quota for requests whose path matches `path`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitRule {
    pub path: String,
    pub max_requests: u32,
    pub window: TimeDelta,
}

impl RateLimitRule {
    pub fn new(path: impl Into<String>, max_requests: u32, window_ms: i64) -> Self {
        Self {
            path: path.into(),
            max_requests,
            window: TimeDelta::milliseconds(window_ms),
        }
    }
}

/// Ordered rule table with a default.
#[derive(Debug, Clone)]
pub struct RuleTable {
    rules: Vec<RateLimitRule>,
    default: RateLimitRule,
}

impl RuleTable {
    pub fn new(rules: Vec<RateLimitRule>, default: RateLimitRule) -> Self {
        Self { rules, default }
    }

    /// Exactly one rule applies to every path.
    pub fn select(&self, path: &str) -> &RateLimitRule {
        self.rules
            .iter()
            .find(|rule| rule.path == path)
            .or_else(|| self.rules.iter().find(|rule| path.starts_with(&rule.path)))
            .unwrap_or(&self.default)
    }
}

impl Default for RuleTable {
    /// Login 5/min, register 3/hour, everything else 60/min.
    fn default() -> Self {
        Self::new(
            vec![
                RateLimitRule::new("/api/auth/login", 5, 60_000),
                RateLimitRule::new("/api/auth/register", 3, 3_600_000),
            ],
            RateLimitRule::new("default", 60, 60_000),
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitRecord {
    pub count: u32,
    pub window_expires_at: DateTime<Utc>,
}

impl RateLimitRecord {
    fn open(now: DateTime<Utc>, rule: &RateLimitRule) -> Self {
        Self {
            count: 1,
            window_expires_at: now
                .checked_add_signed(rule.window)
                .unwrap_or(DateTime::<Utc>::MAX_UTC),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitOutcome {
    Allowed,
    Throttled { retry_after: u64 },
}

/// Result of one check, with the telemetry the caller must expose.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitDecision {
    pub outcome: RateLimitOutcome,
    pub limit: u32,
    pub remaining: u32,
    pub reset_at: DateTime<Utc>,
}

impl RateLimitDecision {
    pub fn is_allowed(&self) -> bool {
        self.outcome == RateLimitOutcome::Allowed
    }

    pub fn apply_headers(&self, headers: &mut HeaderMap) {
        headers.insert(LIMIT_HEADER, HeaderValue::from(self.limit));
        headers.insert(REMAINING_HEADER, HeaderValue::from(self.remaining));
        let reset = self.reset_at.to_rfc3339_opts(SecondsFormat::Millis, true);
        if let Ok(value) = HeaderValue::from_str(&reset) {
            headers.insert(RESET_HEADER, value);
        }
        if let RateLimitOutcome::Throttled { retry_after } = self.outcome {
            headers.insert(header::RETRY_AFTER, HeaderValue::from(retry_after));
        }
    }

    /// Convert a throttled decision into its fault.
    pub fn into_result(self) -> Result<Self, AppError> {
        match self.outcome {
            RateLimitOutcome::Allowed => Ok(self),
            RateLimitOutcome::Throttled { retry_after } => Err(AppError::RateLimited { retry_after }),
        }
    }
}

type RateLimitKey = (String, String);

/// In-memory fixed-window counter store.
///
/// Construct once per process and share it by `Arc`.
pub struct RateLimiter {
    rules: RuleTable,
    records: DashMap<RateLimitKey, RateLimitRecord>,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimiter")
            .field("rules", &self.rules)
            .field("records", &self.records.len())
            .finish()
    }
}

impl RateLimiter {
    pub fn new(rules: RuleTable) -> Self {
        Self::with_clock(rules, Arc::new(SystemClock))
    }

    pub fn with_clock(rules: RuleTable, clock: Arc<dyn Clock>) -> Self {
        Self {
            rules,
            records: DashMap::new(),
            clock,
        }
    }

    /// Count one request from `client` on `path`.
    pub fn check(&self, client: &str, path: &str) -> RateLimitDecision {
        let rule = self.rules.select(path);
        let now = self.clock.now();

        let mut opened = false;
        let record = {
            let mut entry = self
                .records
                .entry((client.to_string(), path.to_string()))
                .or_insert_with(|| {
                    opened = true;
                    RateLimitRecord::open(now, rule)
                });
            let record = entry.value_mut();
            if !opened {
                if now > record.window_expires_at {
                    *record = RateLimitRecord::open(now, rule);
                } else {
                    record.count = record.count.saturating_add(1);
                }
            }
            *record
        };

        let outcome = if record.count > rule.max_requests {
            let remaining_ms = (record.window_expires_at - now).num_milliseconds();
            let retry_after = u64::try_from(remaining_ms).unwrap_or(0).div_ceil(1000);
            warn!(
                client,
                path,
                count = record.count,
                limit = rule.max_requests,
                retry_after,
                "Rate limit exceeded"
            );
            metrics::record_rate_limited(path);
            RateLimitOutcome::Throttled { retry_after }
        } else {
            RateLimitOutcome::Allowed
        };

        RateLimitDecision {
            outcome,
            limit: rule.max_requests,
            remaining: rule.max_requests.saturating_sub(record.count),
            reset_at: record.window_expires_at,
        }
    }

    /// Drop every record whose window has ended. Returns how many were removed.
    pub fn sweep(&self) -> usize {
        let now = self.clock.now();
        let before = self.records.len();
        self.records.retain(|_, record| now <= record.window_expires_at);
        let removed = before.saturating_sub(self.records.len());
        if removed > 0 {
            debug!(removed, remaining = self.records.len(), "Swept expired rate-limit records");
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
