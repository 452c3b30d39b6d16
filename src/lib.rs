//! Gesture relay
//!
//! Classifies the arm posture of the first detected person in each pose
//! frame and reports it to a remote status endpoint.
//!
//! # Flow
//!
//! A `pipeline::PoseEngine` produces `KeypointFrame`s and hands them, one at
//! a time, to the output stage. The output stage writes any configured sinks
//! and then calls the `consumer::FrameConsumer`, which:
//!
//! 1. Classifies person 0 with `gesture::classify` (shoulder, elbow and wrist
//!    heights of both arms).
//! 2. Sends the label to the status endpoint through `report::GestureReporter`.
//! 3. Shows the frame on the `display::FrameDisplay`, if enabled.
//!
//! A user abort or a fault stops the pipeline; a malformed person only skips
//! its frame.
//!
//! # Module Structure
//!
//! - `keypoints`: frame and per-person keypoint types, OpenPose JSON codec
//! - `gesture`: arm-raise classifier and gesture labels
//! - `report`: payload encoding, HTTP transport, retry and delivery queue
//! - `pipeline`: engine seam, flags, replay and scripted engines, sinks
//! - `consumer`: per-frame state machine tying the above together
//! - `config`: status endpoint configuration (JSON file + environment)

pub mod config;
pub mod consumer;
pub mod display;
pub mod error;
pub mod gesture;
pub mod keypoints;
pub mod pipeline;
pub mod report;

pub use config::RelayConfig;
pub use consumer::{ConsumerState, ConsumerStats, FrameConsumer};
pub use display::{AbortFlag, ConsoleDisplay, DisplayEvent, FrameDisplay};
pub use error::RelayError;
pub use gesture::{classify, GestureLabel};
pub use keypoints::{joint, Keypoint, KeypointFrame, PersonKeypoints};
pub use pipeline::{
    EngineRegistry, Flow, FrameHandler, Pipeline, PipelineConfig, PipelineFlags, PoseEngine,
    RunSummary, StopSignal,
};
pub use report::{GestureReporter, ReporterSettings};
