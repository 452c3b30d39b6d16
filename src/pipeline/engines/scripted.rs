use anyhow::Result;

use super::{reject_image_sinks, Dispatcher};
use crate::gesture::GestureLabel;
use crate::keypoints::{joint, Keypoint, KeypointFrame, OutputImage, PersonKeypoints};
use crate::pipeline::{Flow, FrameHandler, PipelineConfig, PoseEngine, RunSummary, StopSignal};

const BODY_25_JOINTS: usize = 25;
const DEMO_BLOCK: u64 = 10;

/// Delivers frames held in memory. Used for demos and tests.
pub struct ScriptedEngine {
    frames: Vec<KeypointFrame>,
    config: PipelineConfig,
}

impl ScriptedEngine {
    pub fn new(frames: Vec<KeypointFrame>) -> Self {
        Self {
            frames,
            config: PipelineConfig::default(),
        }
    }

    /// `count` frames cycling through every gesture in blocks of ten, the last
    /// frame of each block with nobody in view.
    pub fn demo_cycle(count: u64) -> Self {
        let frames = (0..count)
            .map(|index| {
                let label = GestureLabel::ALL[((index / DEMO_BLOCK) % 4) as usize];
                let people = if index % DEMO_BLOCK == DEMO_BLOCK - 1 {
                    Vec::new()
                } else {
                    vec![posed_person(label)]
                };
                let mut frame = KeypointFrame::new(index, "scripted", people);
                frame.output_image = Some(OutputImage {
                    width: 640,
                    height: 480,
                });
                frame
            })
            .collect();
        Self::new(frames)
    }
}

/// A BODY_25 person whose arms are placed to produce `label`.
pub fn posed_person(label: GestureLabel) -> PersonKeypoints {
    const RAISED: [f32; 3] = [200.0, 150.0, 100.0];
    const LOWERED: [f32; 3] = [200.0, 250.0, 300.0];

    let (right, left) = match label {
        GestureLabel::BothHandsUp => (RAISED, RAISED),
        GestureLabel::LeftHandUp => (LOWERED, RAISED),
        GestureLabel::RightHandUp => (RAISED, LOWERED),
        GestureLabel::BothHandsDown => (LOWERED, LOWERED),
    };
    let mut joints = vec![Keypoint::new(320.0, 240.0, 0.8); BODY_25_JOINTS];
    for (i, y) in right.into_iter().enumerate() {
        joints[joint::RIGHT_SHOULDER + i] = Keypoint::new(270.0, y, 0.8);
    }
    for (i, y) in left.into_iter().enumerate() {
        joints[joint::LEFT_SHOULDER + i] = Keypoint::new(370.0, y, 0.8);
    }
    PersonKeypoints::new(joints)
}

impl PoseEngine for ScriptedEngine {
    fn name(&self) -> &'static str {
        "scripted"
    }

    fn configure(&mut self, config: &PipelineConfig) -> Result<()> {
        reject_image_sinks(self.name(), config)?;
        self.config = config.clone();
        Ok(())
    }

    fn run(&mut self, output: &mut dyn FrameHandler, stop: &StopSignal) -> Result<RunSummary> {
        let range = self.config.frames;
        let mut dispatcher = Dispatcher::new(output, stop, &self.config)?;
        for (position, frame) in self.frames.iter().enumerate() {
            let position = position as u64;
            if range.is_past_end(position) {
                break;
            }
            if !range.contains(position) {
                continue;
            }
            if dispatcher.deliver(frame.clone()) == Flow::Stop {
                break;
            }
        }
        Ok(dispatcher.finish())
    }
}
