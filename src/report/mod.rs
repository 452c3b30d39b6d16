//! Gesture status reporting.
//!
//! Each classified gesture becomes one HTTP PUT of a small JSON body to the
//! status endpoint. Delivery never fails the caller: transport faults are
//! logged, retried according to `RetryPolicy`, and counted in `ReporterStats`.
//!
//! Two delivery modes exist:
//! - `Blocking`: the PUT runs on the caller's thread (the frame consumer).
//! - `Queued`: labels go into a bounded queue drained by one worker thread.
//!   A full queue drops the newest label instead of blocking frame processing.
//!   On shutdown the backlog is drained for at most `drain_timeout`.

mod payload;
mod reporter;
mod retry;
mod transport;

pub use payload::{encode, PayloadStyle};
pub use reporter::{GestureReporter, ReporterStats, StatsSnapshot};
pub use retry::RetryPolicy;
pub use transport::{StatusTransport, UreqTransport};

use std::time::Duration;

/// Endpoint the deployed dashboard reads from.
pub const DEFAULT_STATUS_URL: &str =
    "https://pose-detection-8bab0.firebaseio.com/pose-detection.json";

/// Content type the deployed backend has always been sent. Not `application/json`.
pub const DEFAULT_CONTENT_TYPE: &str = "json";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DeliveryMode {
    Blocking,
    Queued { capacity: usize },
}

impl DeliveryMode {
    pub const DEFAULT_QUEUE_CAPACITY: usize = 32;
}

impl Default for DeliveryMode {
    fn default() -> Self {
        DeliveryMode::Queued {
            capacity: Self::DEFAULT_QUEUE_CAPACITY,
        }
    }
}

/// What counts as a delivered status update.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ResponsePolicy {
    /// Any HTTP response is accepted; only transport faults are failures.
    Ignore,
    /// Non-2xx responses are failures and are retried.
    #[default]
    Check,
}

impl ResponsePolicy {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "ignore" => Some(ResponsePolicy::Ignore),
            "check" => Some(ResponsePolicy::Check),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReporterSettings {
    pub url: String,
    pub content_type: String,
    pub timeout: Duration,
    pub delivery: DeliveryMode,
    pub response_policy: ResponsePolicy,
    pub retry: RetryPolicy,
    pub payload_style: PayloadStyle,
    /// Upper bound on draining the queue at shutdown.
    pub drain_timeout: Duration,
}

impl Default for ReporterSettings {
    fn default() -> Self {
        Self {
            url: DEFAULT_STATUS_URL.to_string(),
            content_type: DEFAULT_CONTENT_TYPE.to_string(),
            timeout: Duration::from_secs(5),
            delivery: DeliveryMode::default(),
            response_policy: ResponsePolicy::default(),
            retry: RetryPolicy::default(),
            payload_style: PayloadStyle::default(),
            drain_timeout: Duration::from_secs(2),
        }
    }
}
