use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, SyncSender, TrySendError};
use std::sync::{Arc, OnceLock};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};

use super::payload::encode;
use super::retry::RetryPolicy;
use super::transport::{StatusTransport, UreqTransport};
use super::{DeliveryMode, ReporterSettings, ResponsePolicy};
use crate::error::RelayError;
use crate::gesture::GestureLabel;

/// Delivery counters shared between the reporter and its worker.
#[derive(Debug, Default)]
pub struct ReporterStats {
    sent: AtomicU64,
    failed: AtomicU64,
    dropped: AtomicU64,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub sent: u64,
    pub failed: u64,
    pub dropped: u64,
}

impl ReporterStats {
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            sent: self.sent.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
        }
    }
}

/// Sends classified gestures to the status endpoint.
pub struct GestureReporter {
    dispatch: Dispatch,
    stats: Arc<ReporterStats>,
}

enum Dispatch {
    Blocking(Delivery),
    Queued {
        tx: Option<SyncSender<GestureLabel>>,
        worker: Option<JoinHandle<()>>,
        /// Set once on close; labels still queued past it are dropped.
        drain_deadline: Arc<OnceLock<Instant>>,
        drain_timeout: Duration,
    },
}

struct Delivery {
    transport: Box<dyn StatusTransport>,
    settings: ReporterSettings,
    stats: Arc<ReporterStats>,
}

impl GestureReporter {
    /// Reporter backed by the `ureq` transport.
    pub fn new(settings: ReporterSettings) -> Result<Self> {
        let transport = UreqTransport::new(settings.timeout);
        Self::with_transport(settings, Box::new(transport))
    }

    pub fn with_transport(
        settings: ReporterSettings,
        transport: Box<dyn StatusTransport>,
    ) -> Result<Self> {
        let stats = Arc::new(ReporterStats::default());
        let mode = settings.delivery;
        let drain_timeout = settings.drain_timeout;
        let delivery = Delivery {
            transport,
            settings,
            stats: stats.clone(),
        };
        let dispatch = match mode {
            DeliveryMode::Blocking => Dispatch::Blocking(delivery),
            DeliveryMode::Queued { capacity } => {
                let (tx, rx) = mpsc::sync_channel::<GestureLabel>(capacity);
                let drain_deadline = Arc::new(OnceLock::new());
                let worker_deadline = drain_deadline.clone();
                let worker = std::thread::Builder::new()
                    .name("status-reporter".to_string())
                    .spawn(move || {
                        for label in rx {
                            delivery.drain_or_deliver(label, worker_deadline.get().copied());
                        }
                    })
                    .context("spawn status reporter thread")?;
                Dispatch::Queued {
                    tx: Some(tx),
                    worker: Some(worker),
                    drain_deadline,
                    drain_timeout,
                }
            }
        };
        Ok(Self { dispatch, stats })
    }

    /// Report one gesture. Never fails; delivery problems are logged and counted.
    pub fn report(&self, label: GestureLabel) {
        match &self.dispatch {
            Dispatch::Blocking(delivery) => delivery.deliver(label, &delivery.settings.retry),
            Dispatch::Queued { tx: Some(tx), .. } => match tx.try_send(label) {
                Ok(()) => {}
                Err(TrySendError::Full(label)) => {
                    self.stats.dropped.fetch_add(1, Ordering::Relaxed);
                    log::warn!("status queue full, dropping {}", label);
                }
                Err(TrySendError::Disconnected(label)) => {
                    self.stats.dropped.fetch_add(1, Ordering::Relaxed);
                    log::warn!("status worker gone, dropping {}", label);
                }
            },
            Dispatch::Queued { tx: None, .. } => {
                self.stats.dropped.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// Drain queued updates and stop the worker.
    ///
    /// Queued labels get one attempt each until `drain_timeout` runs out; the
    /// rest are counted as dropped. The in-flight request is left to finish.
    pub fn shutdown(mut self) -> StatsSnapshot {
        self.close();
        self.stats.snapshot()
    }

    fn close(&mut self) {
        let Dispatch::Queued {
            tx,
            worker,
            drain_deadline,
            drain_timeout,
        } = &mut self.dispatch
        else {
            return;
        };
        let Some(handle) = worker.take() else {
            return;
        };
        let _ = drain_deadline.set(Instant::now() + *drain_timeout);
        drop(tx.take());
        if handle.join().is_err() {
            log::error!("status reporter thread panicked");
        }
        let dropped = self.stats.dropped.load(Ordering::Relaxed);
        if dropped > 0 {
            log::warn!("{} status update(s) dropped", dropped);
        }
    }
}

impl Drop for GestureReporter {
    fn drop(&mut self) {
        self.close();
    }
}

impl Delivery {
    /// Worker-side delivery. Once closing, each label gets a single attempt
    /// and nothing is sent after the deadline.
    fn drain_or_deliver(&self, label: GestureLabel, deadline: Option<Instant>) {
        match deadline {
            None => self.deliver(label, &self.settings.retry),
            Some(deadline) if Instant::now() < deadline => {
                self.deliver(label, &RetryPolicy::none())
            }
            Some(_) => {
                self.stats.dropped.fetch_add(1, Ordering::Relaxed);
                log::debug!("drain deadline passed, dropping {}", label);
            }
        }
    }

    fn deliver(&self, label: GestureLabel, retry: &RetryPolicy) {
        let body = encode(label, self.settings.payload_style);
        match retry.run(|_| self.attempt(&body)) {
            Ok(status) => {
                self.stats.sent.fetch_add(1, Ordering::Relaxed);
                log::debug!("status {} delivered (http {})", label, status);
            }
            Err((err, attempts)) => {
                self.stats.failed.fetch_add(1, Ordering::Relaxed);
                log::warn!(
                    "status {} not delivered after {} attempt(s): {}",
                    label,
                    attempts,
                    err
                );
            }
        }
    }

    fn attempt(&self, body: &str) -> Result<u16, RelayError> {
        let status = self
            .transport
            .put(&self.settings.url, &self.settings.content_type, body)?;
        match self.settings.response_policy {
            ResponsePolicy::Ignore => Ok(status),
            ResponsePolicy::Check if (200..300).contains(&status) => Ok(status),
            ResponsePolicy::Check => Err(RelayError::TransportFault(format!(
                "endpoint answered http {}",
                status
            ))),
        }
    }
}
