//! Output-stage consumer: classify, report, display.
//!
//! States: `Running -> Stopping -> Stopped`. A user abort or any fault other
//! than a malformed person moves the consumer to `Stopping` and raises the
//! pipeline stop signal. Frames arriving after that are refused and the
//! consumer settles in `Stopped`.

use std::panic::{self, AssertUnwindSafe};

use crate::display::{DisplayEvent, FrameDisplay};
use crate::error::RelayError;
use crate::gesture::{ArmHeights, GestureLabel};
use crate::keypoints::{KeypointFrame, PersonKeypoints};
use crate::pipeline::{Flow, FrameHandler, StopSignal};
use crate::report::{GestureReporter, StatsSnapshot};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConsumerState {
    Running,
    Stopping,
    Stopped,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ConsumerStats {
    pub frames: u64,
    pub empty_frames: u64,
    pub classified: u64,
    pub invalid: u64,
    pub refused: u64,
}

pub struct FrameConsumer {
    state: ConsumerState,
    /// Taken and shut down by `finish`.
    reporter: Option<GestureReporter>,
    final_status: StatsSnapshot,
    display: Option<Box<dyn FrameDisplay>>,
    stop: StopSignal,
    stats: ConsumerStats,
    last_label: Option<GestureLabel>,
}

enum Step {
    Continue,
    Abort,
}

impl FrameConsumer {
    pub fn new(reporter: GestureReporter, stop: StopSignal) -> Self {
        Self {
            state: ConsumerState::Running,
            reporter: Some(reporter),
            final_status: StatsSnapshot::default(),
            display: None,
            stop,
            stats: ConsumerStats::default(),
            last_label: None,
        }
    }

    pub fn with_display(mut self, display: Box<dyn FrameDisplay>) -> Self {
        self.display = Some(display);
        self
    }

    pub fn state(&self) -> ConsumerState {
        self.state
    }

    pub fn stats(&self) -> ConsumerStats {
        self.stats
    }

    pub fn last_label(&self) -> Option<GestureLabel> {
        self.last_label
    }

    /// Live delivery counters, or the drained totals once finished.
    pub fn status_stats(&self) -> StatsSnapshot {
        match &self.reporter {
            Some(reporter) => reporter.stats(),
            None => self.final_status,
        }
    }

    /// Process one delivered frame and return the resulting state.
    pub fn consume(&mut self, frame: &KeypointFrame) -> ConsumerState {
        if self.state != ConsumerState::Running {
            self.stats.refused += 1;
            self.state = ConsumerState::Stopped;
            return self.state;
        }
        self.stats.frames += 1;

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| self.process(frame)))
            .unwrap_or_else(|payload| Err(RelayError::PipelineFault(panic_message(&*payload))));

        match outcome {
            Ok(Step::Continue) => {}
            Ok(Step::Abort) => {
                log::info!("user abort requested, stopping pipeline");
                self.begin_stop();
            }
            Err(err) => {
                log::error!("frame {} failed: {}", frame.index, err);
                self.begin_stop();
            }
        }
        self.state
    }

    /// Settle in `Stopped` and drain the reporter; the pipeline has delivered
    /// its last frame.
    pub fn finish(&mut self) {
        self.state = ConsumerState::Stopped;
        if let Some(reporter) = self.reporter.take() {
            self.final_status = reporter.shutdown();
        }
        let reported = self.final_status;
        log::info!(
            "consumer finished: frames={} classified={} invalid={} empty={} status_sent={} status_failed={} status_dropped={}",
            self.stats.frames,
            self.stats.classified,
            self.stats.invalid,
            self.stats.empty_frames,
            reported.sent,
            reported.failed,
            reported.dropped
        );
    }

    fn begin_stop(&mut self) {
        self.state = ConsumerState::Stopping;
        self.stop.stop();
    }

    fn process(&mut self, frame: &KeypointFrame) -> Result<Step, RelayError> {
        let label = match frame.first_person() {
            None => {
                self.stats.empty_frames += 1;
                None
            }
            Some(person) => self.classify_and_report(frame, person)?,
        };

        if let Some(heatmaps) = frame.heatmaps {
            log::debug!(
                "pose heatmaps size: [{}, {}, {}]",
                heatmaps.channels,
                heatmaps.height,
                heatmaps.width
            );
        }

        if let Some(display) = self.display.as_mut() {
            let event = display
                .show(frame, label)
                .map_err(|e| RelayError::PipelineFault(format!("display: {:#}", e)))?;
            if event == DisplayEvent::Abort {
                return Ok(Step::Abort);
            }
        }
        Ok(Step::Continue)
    }

    fn classify_and_report(
        &mut self,
        frame: &KeypointFrame,
        person: &PersonKeypoints,
    ) -> Result<Option<GestureLabel>, RelayError> {
        let heights = match ArmHeights::from_person(person) {
            Ok(heights) => heights,
            Err(err) if err.is_frame_local() => {
                self.stats.invalid += 1;
                log::warn!("frame {} skipped: {}", frame.index, err);
                return Ok(None);
            }
            Err(err) => return Err(err),
        };
        log::debug!(
            "frame {}: y2={:.1} y3={:.1} y4={:.1} y5={:.1} y6={:.1} y7={:.1}",
            frame.index,
            heights.right[0],
            heights.right[1],
            heights.right[2],
            heights.left[0],
            heights.left[1],
            heights.left[2]
        );
        let label = heights.label();
        self.stats.classified += 1;
        self.last_label = Some(label);
        log::info!("frame {}: {}", frame.index, label.action_text());
        if let Some(reporter) = &self.reporter {
            reporter.report(label);
        }
        Ok(Some(label))
    }
}

impl FrameHandler for FrameConsumer {
    fn on_frame(&mut self, frame: &KeypointFrame) -> Flow {
        match self.consume(frame) {
            ConsumerState::Running => Flow::Continue,
            ConsumerState::Stopping | ConsumerState::Stopped => Flow::Stop,
        }
    }

    fn on_finish(&mut self) {
        self.finish();
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        format!("panic: {}", s)
    } else if let Some(s) = payload.downcast_ref::<String>() {
        format!("panic: {}", s)
    } else {
        "panic in frame handler".to_string()
    }
}
