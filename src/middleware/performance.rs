//! Response timing.
//!
//! [`PerformanceMonitor::begin`] starts a monotonic timer; the returned
//! [`Timing`] handle sets `X-Response-Time`, records the duration histogram
//! and warns about slow requests when finished.

use std::time::{Duration, Instant};

use axum::http::{HeaderMap, HeaderValue, StatusCode};
use tracing::warn;

use crate::metrics;

pub const RESPONSE_TIME_HEADER: &str = "x-response-time";

#[derive(Debug, Clone, Copy)]
pub struct PerformanceMonitor {
    slow_threshold: Duration,
}

impl PerformanceMonitor {
    pub fn new(slow_threshold: Duration) -> Self {
        Self { slow_threshold }
    }

    pub fn begin(&self, method: &str, path: &str) -> Timing {
        Timing {
            started: Instant::now(),
            slow_threshold: self.slow_threshold,
            method: method.to_string(),
            path: path.to_string(),
        }
    }
}

#[derive(Debug)]
#[must_use = "a timing handle must be finished"]
pub struct Timing {
    started: Instant,
    slow_threshold: Duration,
    method: String,
    path: String,
}

impl Timing {
    pub fn finish(self, status: StatusCode, headers: Option<&mut HeaderMap>) -> Duration {
        let elapsed = self.started.elapsed();
        let millis = elapsed.as_secs_f64() * 1000.0;
        let formatted = format!("{millis:.2}ms");

        if let Some(headers) = headers
            && let Ok(value) = HeaderValue::from_str(&formatted)
        {
            headers.insert(RESPONSE_TIME_HEADER, value);
        }

        metrics::record_request_duration(
            &self.method,
            &self.path,
            status.as_u16(),
            elapsed.as_secs_f64(),
        );

        if elapsed > self.slow_threshold {
            warn!(
                method = %self.method,
                path = %self.path,
                status = status.as_u16(),
                duration = %formatted,
                threshold_ms = u64::try_from(self.slow_threshold.as_millis()).unwrap_or(u64::MAX),
                "Slow request detected"
            );
        }

        elapsed
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_sets_response_time_header() {
        let monitor = PerformanceMonitor::new(Duration::from_secs(1));
        let mut headers = HeaderMap::new();
        monitor
            .begin("GET", "/api/products")
            .finish(StatusCode::OK, Some(&mut headers));

        let value = headers[RESPONSE_TIME_HEADER].to_str().unwrap();
        assert!(value.ends_with("ms"));
        let number: f64 = value.trim_end_matches("ms").parse().unwrap();
        assert!(number >= 0.0);
        // two decimal places
        assert_eq!(value.trim_end_matches("ms").split('.').nth(1).unwrap().len(), 2);
    }

    #[test]
    fn test_slow_request_still_finishes() {
        let monitor = PerformanceMonitor::new(Duration::ZERO);
        let timing = monitor.begin("GET", "/slow");
        std::thread::sleep(Duration::from_millis(2));
        let elapsed = timing.finish(StatusCode::OK, None);
        assert!(elapsed >= Duration::from_millis(2));
    }
}
