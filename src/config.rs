use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use url::Url;

use crate::report::{
    DeliveryMode, PayloadStyle, ReporterSettings, ResponsePolicy, RetryPolicy,
    DEFAULT_CONTENT_TYPE, DEFAULT_STATUS_URL,
};

const DEFAULT_TIMEOUT_MS: u64 = 5_000;
const DEFAULT_MAX_RETRIES: u32 = 2;
const DEFAULT_BACKOFF_MS: u64 = 200;
const DEFAULT_MAX_BACKOFF_MS: u64 = 2_000;
const DEFAULT_DRAIN_TIMEOUT_MS: u64 = 2_000;

#[derive(Debug, Deserialize, Default)]
struct RelayConfigFile {
    status: Option<StatusConfigFile>,
    delivery: Option<DeliveryConfigFile>,
    retry: Option<RetryConfigFile>,
}

#[derive(Debug, Deserialize, Default)]
struct StatusConfigFile {
    url: Option<String>,
    content_type: Option<String>,
    timeout_ms: Option<u64>,
    payload_style: Option<String>,
    response_policy: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct DeliveryConfigFile {
    mode: Option<String>,
    queue_capacity: Option<usize>,
    drain_timeout_ms: Option<u64>,
}

#[derive(Debug, Deserialize, Default)]
struct RetryConfigFile {
    max_retries: Option<u32>,
    backoff_ms: Option<u64>,
    max_backoff_ms: Option<u64>,
}

/// Status reporting configuration.
///
/// Sources, later wins: built-in defaults, the JSON file named by
/// `GESTURE_RELAY_CONFIG`, then `GESTURE_*` environment variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayConfig {
    pub reporter: ReporterSettings,
}

impl RelayConfig {
    pub fn load() -> Result<Self> {
        let config_path = std::env::var("GESTURE_RELAY_CONFIG").ok();
        let file_cfg = match config_path.as_deref() {
            Some(path) => Some(read_config_file(Path::new(path))?),
            None => None,
        };
        let mut cfg = Self::from_file(file_cfg.unwrap_or_default())?;
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn from_file(file: RelayConfigFile) -> Result<Self> {
        let status = file.status.unwrap_or_default();
        let delivery = file.delivery.unwrap_or_default();
        let retry = file.retry.unwrap_or_default();

        let payload_style = match status.payload_style.as_deref() {
            Some(style) => PayloadStyle::parse(style)
                .ok_or_else(|| anyhow!("payload_style must be 'legacy' or 'uniform'"))?,
            None => PayloadStyle::default(),
        };
        let response_policy = match status.response_policy.as_deref() {
            Some(policy) => ResponsePolicy::parse(policy)
                .ok_or_else(|| anyhow!("response_policy must be 'ignore' or 'check'"))?,
            None => ResponsePolicy::default(),
        };
        let drain_timeout = Duration::from_millis(
            delivery
                .drain_timeout_ms
                .unwrap_or(DEFAULT_DRAIN_TIMEOUT_MS),
        );
        let delivery = parse_delivery(
            delivery.mode.as_deref().unwrap_or("queued"),
            delivery
                .queue_capacity
                .unwrap_or(DeliveryMode::DEFAULT_QUEUE_CAPACITY),
        )?;

        Ok(Self {
            reporter: ReporterSettings {
                url: status
                    .url
                    .unwrap_or_else(|| DEFAULT_STATUS_URL.to_string()),
                content_type: status
                    .content_type
                    .unwrap_or_else(|| DEFAULT_CONTENT_TYPE.to_string()),
                timeout: Duration::from_millis(status.timeout_ms.unwrap_or(DEFAULT_TIMEOUT_MS)),
                delivery,
                response_policy,
                retry: RetryPolicy {
                    max_retries: retry.max_retries.unwrap_or(DEFAULT_MAX_RETRIES),
                    base_delay: Duration::from_millis(
                        retry.backoff_ms.unwrap_or(DEFAULT_BACKOFF_MS),
                    ),
                    max_delay: Duration::from_millis(
                        retry.max_backoff_ms.unwrap_or(DEFAULT_MAX_BACKOFF_MS),
                    ),
                },
                payload_style,
                drain_timeout,
            },
        })
    }

    fn apply_env(&mut self) -> Result<()> {
        let reporter = &mut self.reporter;
        if let Ok(url) = std::env::var("GESTURE_STATUS_URL") {
            if !url.trim().is_empty() {
                reporter.url = url;
            }
        }
        if let Ok(content_type) = std::env::var("GESTURE_CONTENT_TYPE") {
            if !content_type.trim().is_empty() {
                reporter.content_type = content_type;
            }
        }
        if let Ok(timeout) = std::env::var("GESTURE_TIMEOUT_MS") {
            let ms: u64 = timeout
                .parse()
                .map_err(|_| anyhow!("GESTURE_TIMEOUT_MS must be an integer number of milliseconds"))?;
            reporter.timeout = Duration::from_millis(ms);
        }
        if let Ok(retries) = std::env::var("GESTURE_MAX_RETRIES") {
            reporter.retry.max_retries = retries
                .parse()
                .map_err(|_| anyhow!("GESTURE_MAX_RETRIES must be a non-negative integer"))?;
        }
        if let Ok(mode) = std::env::var("GESTURE_DELIVERY") {
            let capacity = match reporter.delivery {
                DeliveryMode::Queued { capacity } => capacity,
                DeliveryMode::Blocking => DeliveryMode::DEFAULT_QUEUE_CAPACITY,
            };
            reporter.delivery = parse_delivery(&mode, capacity)?;
        }
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        let reporter = &self.reporter;
        let url = Url::parse(&reporter.url)
            .map_err(|e| anyhow!("invalid status url {}: {}", reporter.url, e))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(anyhow!(
                "status url must be http(s), got scheme '{}'",
                url.scheme()
            ));
        }
        if reporter.content_type.trim().is_empty() {
            return Err(anyhow!("content_type must not be empty"));
        }
        if reporter.timeout.is_zero() {
            return Err(anyhow!("timeout must be greater than zero"));
        }
        if let DeliveryMode::Queued { capacity: 0 } = reporter.delivery {
            return Err(anyhow!("queue_capacity must be greater than zero"));
        }
        if reporter.retry.base_delay > reporter.retry.max_delay {
            return Err(anyhow!("backoff_ms must not exceed max_backoff_ms"));
        }
        if reporter.content_type != "application/json" {
            log::debug!(
                "status content type is '{}' (not application/json)",
                reporter.content_type
            );
        }
        Ok(())
    }
}

fn parse_delivery(mode: &str, capacity: usize) -> Result<DeliveryMode> {
    match mode.trim().to_ascii_lowercase().as_str() {
        "blocking" => Ok(DeliveryMode::Blocking),
        "queued" => Ok(DeliveryMode::Queued { capacity }),
        other => Err(anyhow!(
            "delivery mode must be 'blocking' or 'queued' (got '{}')",
            other
        )),
    }
}

fn read_config_file(path: &Path) -> Result<RelayConfigFile> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("failed to read config file {}: {}", path.display(), e))?;
    let cfg = serde_json::from_str(&raw)
        .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?;
    Ok(cfg)
}
