mod replay;
mod scripted;

pub use replay::ReplayEngine;
pub use scripted::{posed_person, ScriptedEngine};

use std::time::{Duration, Instant};

use anyhow::{anyhow, Result};

use super::{Flow, FrameHandler, PipelineConfig, RunSummary, StopSignal};
use crate::keypoints::KeypointFrame;

/// Engines here never hold rendered pixels.
fn reject_image_sinks(engine: &str, config: &PipelineConfig) -> Result<()> {
    let sinks = config.sinks.image_sinks();
    if sinks.is_empty() {
        return Ok(());
    }
    Err(anyhow!(
        "{} engine has no rendered frames; unsupported output: {}",
        engine,
        sinks.join(", ")
    ))
}

/// Paces deliveries to `fps_max`, optionally dropping frames to stay real-time.
struct Pacer {
    interval: Option<Duration>,
    real_time: bool,
    next_due: Option<Instant>,
}

impl Pacer {
    fn new(config: &PipelineConfig) -> Result<Self> {
        let interval = match config.fps_max {
            Some(fps) => Some(
                Duration::try_from_secs_f64(1.0 / fps)
                    .map_err(|_| anyhow!("fps_max {} has no usable frame interval", fps))?,
            ),
            None => None,
        };
        Ok(Self {
            interval,
            real_time: config.process_real_time,
            next_due: None,
        })
    }

    /// Wait for the next slot. Returns false when the frame should be dropped.
    fn admit(&mut self) -> bool {
        let Some(interval) = self.interval else {
            return true;
        };
        let now = Instant::now();
        let Some(due) = self.next_due else {
            self.next_due = Some(now + interval);
            return true;
        };
        if self.real_time {
            self.next_due = Some(due + interval);
            if now > due + interval {
                return false;
            }
        } else {
            self.next_due = Some(due.max(now) + interval);
        }
        if now < due {
            std::thread::sleep(due - now);
        }
        true
    }
}

/// Hands frames to the output stage and keeps the run counters.
struct Dispatcher<'a> {
    output: &'a mut dyn FrameHandler,
    stop: &'a StopSignal,
    pacer: Pacer,
    people_max: Option<u32>,
    summary: RunSummary,
}

impl<'a> Dispatcher<'a> {
    fn new(
        output: &'a mut dyn FrameHandler,
        stop: &'a StopSignal,
        config: &PipelineConfig,
    ) -> Result<Self> {
        Ok(Self {
            output,
            stop,
            pacer: Pacer::new(config)?,
            people_max: config.number_people_max,
            summary: RunSummary::default(),
        })
    }

    fn deliver(&mut self, mut frame: KeypointFrame) -> Flow {
        if self.stop.is_stopped() {
            self.summary.stopped_early = true;
            return Flow::Stop;
        }
        if !self.pacer.admit() {
            self.summary.frames_skipped += 1;
            return Flow::Continue;
        }
        if let Some(max) = self.people_max {
            frame.people.truncate(max as usize);
        }
        self.summary.frames_delivered += 1;
        self.summary.people_seen += frame.people.len() as u64;
        let flow = self.output.on_frame(&frame);
        if flow == Flow::Stop {
            self.summary.stopped_early = true;
        }
        flow
    }

    fn skip(&mut self) {
        self.summary.frames_skipped += 1;
    }

    fn finish(self) -> RunSummary {
        self.summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unpaced_admits_everything() {
        let mut pacer = Pacer::new(&PipelineConfig::default()).unwrap();
        assert!((0..100).all(|_| pacer.admit()));
    }

    #[test]
    fn paced_delivery_waits_between_frames() {
        let config = PipelineConfig {
            fps_max: Some(100.0),
            ..PipelineConfig::default()
        };
        let mut pacer = Pacer::new(&config).unwrap();
        let started = Instant::now();
        for _ in 0..4 {
            assert!(pacer.admit());
        }
        assert!(started.elapsed() >= Duration::from_millis(25));
    }

    #[test]
    fn real_time_drops_late_frames() {
        let config = PipelineConfig {
            fps_max: Some(100.0),
            process_real_time: true,
            ..PipelineConfig::default()
        };
        let mut pacer = Pacer::new(&config).unwrap();
        assert!(pacer.admit());
        std::thread::sleep(Duration::from_millis(50));
        assert!(!pacer.admit());
    }

    #[test]
    fn unusable_rate_is_an_error_not_a_panic() {
        for fps in [1e-30, 0.0, -5.0] {
            let config = PipelineConfig {
                fps_max: Some(fps),
                ..PipelineConfig::default()
            };
            assert!(Pacer::new(&config).is_err(), "fps_max {} accepted", fps);
        }
    }
}
