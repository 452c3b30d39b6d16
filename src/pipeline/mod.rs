//! Pose pipeline seam.
//!
//! Keypoint detection, decoding and scheduling belong to a pose engine. This
//! module defines what the rest of the crate needs from one:
//!
//! - `PoseEngine`: configure from a `PipelineConfig`, then run, delivering one
//!   `KeypointFrame` per processed input frame to the output handler.
//! - `FrameHandler`: the output-stage callback. Invoked sequentially, never
//!   concurrently, on the engine's output thread.
//! - `StopSignal`: shared stop request. Checked by the engine before each
//!   delivery; an in-flight frame always completes.
//!
//! Engines shipped here replay keypoints that were already detected
//! (`ReplayEngine`) or come from memory (`ScriptedEngine`).

mod config;
mod engines;
mod flags;
mod registry;
mod sinks;

pub use config::{
    FrameRange, HeatmapSelection, InputSource, KeypointScale, OutputSinks, PipelineConfig,
    PoseModel, RenderMode, Resolution,
};
pub use engines::{posed_person, ReplayEngine, ScriptedEngine};
pub use flags::PipelineFlags;
pub use registry::EngineRegistry;
pub use sinks::{JsonSink, OutputSink};

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{anyhow, Result};

use crate::keypoints::KeypointFrame;

/// Whether the engine should keep delivering frames.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Stop,
}

/// Output-stage callback registered with the pipeline.
pub trait FrameHandler {
    fn on_frame(&mut self, frame: &KeypointFrame) -> Flow;

    /// Called once after the last delivery, whatever ended the run.
    fn on_finish(&mut self) {}
}

/// Shared stop request.
#[derive(Clone, Debug, Default)]
pub struct StopSignal(Arc<AtomicBool>);

impl StopSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Counters returned by an engine run.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RunSummary {
    pub frames_delivered: u64,
    pub frames_skipped: u64,
    pub people_seen: u64,
    pub stopped_early: bool,
    pub elapsed: Duration,
}

/// A pose-estimation engine.
pub trait PoseEngine: Send {
    fn name(&self) -> &'static str;

    /// Accept or reject the configuration. Rejections are fatal startup errors.
    fn configure(&mut self, config: &PipelineConfig) -> Result<()>;

    /// Deliver frames to `output` until end of stream, `Flow::Stop`, or `stop`.
    fn run(&mut self, output: &mut dyn FrameHandler, stop: &StopSignal) -> Result<RunSummary>;
}

/// A configured engine plus its output stage.
pub struct Pipeline {
    engine: Box<dyn PoseEngine>,
    sinks: Vec<Box<dyn OutputSink>>,
    handler: Option<Box<dyn FrameHandler>>,
    stop: StopSignal,
}

impl Pipeline {
    /// Configure `engine` and build the output sinks named in `config`.
    pub fn configure(mut engine: Box<dyn PoseEngine>, config: &PipelineConfig) -> Result<Self> {
        engine.configure(config)?;
        let mut sinks: Vec<Box<dyn OutputSink>> = Vec::new();
        if let Some(dir) = &config.sinks.write_json {
            sinks.push(Box::new(JsonSink::create(dir)?));
        }
        log::info!(
            "pipeline configured: engine={} input={} model={} net_resolution={} multi_thread={}",
            engine.name(),
            config.input,
            config.pose_model.name(),
            config.net_resolution,
            config.multi_thread
        );
        Ok(Self {
            engine,
            sinks,
            handler: None,
            stop: StopSignal::new(),
        })
    }

    /// Stop capability handed to the output handler.
    pub fn stop_signal(&self) -> StopSignal {
        self.stop.clone()
    }

    pub fn set_output_handler(&mut self, handler: Box<dyn FrameHandler>) {
        self.handler = Some(handler);
    }

    /// Run until the engine finishes. Blocks the calling thread.
    pub fn exec(&mut self) -> Result<RunSummary> {
        let mut handler = self
            .handler
            .take()
            .ok_or_else(|| anyhow!("no output handler registered"))?;
        let started = Instant::now();
        let result = {
            let mut stage = OutputStage {
                sinks: &mut self.sinks,
                handler: handler.as_mut(),
                stop: &self.stop,
            };
            self.engine.run(&mut stage, &self.stop)
        };
        handler.on_finish();
        let mut summary = result?;
        summary.elapsed = started.elapsed();
        Ok(summary)
    }
}

/// Sinks first, then the user handler.
struct OutputStage<'a> {
    sinks: &'a mut [Box<dyn OutputSink>],
    handler: &'a mut dyn FrameHandler,
    stop: &'a StopSignal,
}

impl FrameHandler for OutputStage<'_> {
    fn on_frame(&mut self, frame: &KeypointFrame) -> Flow {
        for sink in self.sinks.iter_mut() {
            if let Err(e) = sink.write(frame) {
                log::error!("output sink {} failed: {:#}", sink.name(), e);
                self.stop.stop();
                return Flow::Stop;
            }
        }
        let flow = self.handler.on_frame(frame);
        if flow == Flow::Stop {
            self.stop.stop();
        }
        flow
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keypoints::{Keypoint, PersonKeypoints};

    struct Counting {
        seen: Vec<u64>,
        stop_at: Option<u64>,
        finished: Arc<AtomicBool>,
    }

    impl FrameHandler for Counting {
        fn on_frame(&mut self, frame: &KeypointFrame) -> Flow {
            self.seen.push(frame.index);
            if Some(frame.index) == self.stop_at {
                Flow::Stop
            } else {
                Flow::Continue
            }
        }

        fn on_finish(&mut self) {
            self.finished.store(true, Ordering::SeqCst);
        }
    }

    fn frames(n: u64) -> Vec<KeypointFrame> {
        (0..n)
            .map(|i| {
                let person = PersonKeypoints::new(vec![Keypoint::default(); 25]);
                KeypointFrame::new(i, "scripted", vec![person])
            })
            .collect()
    }

    #[test]
    fn exec_without_handler_fails() {
        let engine = ScriptedEngine::new(frames(1));
        let mut pipeline =
            Pipeline::configure(Box::new(engine), &PipelineConfig::default()).unwrap();
        assert!(pipeline.exec().is_err());
    }

    #[test]
    fn handler_stop_ends_run_and_raises_signal() -> Result<()> {
        let finished = Arc::new(AtomicBool::new(false));
        let engine = ScriptedEngine::new(frames(10));
        let mut pipeline = Pipeline::configure(Box::new(engine), &PipelineConfig::default())?;
        pipeline.set_output_handler(Box::new(Counting {
            seen: Vec::new(),
            stop_at: Some(3),
            finished: finished.clone(),
        }));
        let stop = pipeline.stop_signal();

        let summary = pipeline.exec()?;

        assert_eq!(summary.frames_delivered, 4);
        assert!(summary.stopped_early);
        assert!(stop.is_stopped());
        assert!(finished.load(Ordering::SeqCst));
        Ok(())
    }

    #[test]
    fn json_sink_writes_every_frame() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let mut config = PipelineConfig::default();
        config.sinks.write_json = Some(dir.path().join("out"));

        let mut pipeline =
            Pipeline::configure(Box::new(ScriptedEngine::new(frames(3))), &config)?;
        pipeline.set_output_handler(Box::new(Counting {
            seen: Vec::new(),
            stop_at: None,
            finished: Arc::new(AtomicBool::new(false)),
        }));
        pipeline.exec()?;

        let written = std::fs::read_dir(dir.path().join("out"))?.count();
        assert_eq!(written, 3);
        Ok(())
    }
}
