//! Per-frame keypoint data delivered by a pose engine.
//!
//! - `Keypoint`: one detected landmark `(x, y, confidence)` in image coordinates.
//! - `PersonKeypoints`: one person's landmarks, indexed by joint id.
//! - `KeypointFrame`: everything the output stage sees for one processed frame.
//!
//! Frames are created by the engine, handed to the output handler by reference,
//! and dropped afterwards. Nothing here is persisted except through the optional
//! `write_json` sink, which uses the OpenPose JSON layout implemented below.

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};

/// Joint ids shared by the BODY_25, COCO and MPI body models.
pub mod joint {
    pub const RIGHT_SHOULDER: usize = 2;
    pub const RIGHT_ELBOW: usize = 3;
    pub const RIGHT_WRIST: usize = 4;
    pub const LEFT_SHOULDER: usize = 5;
    pub const LEFT_ELBOW: usize = 6;
    pub const LEFT_WRIST: usize = 7;
}

/// A single detected landmark. Smaller `y` is higher in the image.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Keypoint {
    pub x: f32,
    pub y: f32,
    pub confidence: f32,
}

impl Keypoint {
    pub const fn new(x: f32, y: f32, confidence: f32) -> Self {
        Self { x, y, confidence }
    }
}

/// One person's keypoints in joint-id order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PersonKeypoints {
    joints: Vec<Keypoint>,
}

impl PersonKeypoints {
    pub fn new(joints: Vec<Keypoint>) -> Self {
        Self { joints }
    }

    /// Build from a flat `[x0, y0, c0, x1, y1, c1, ...]` array.
    pub fn from_flat(values: &[f32]) -> Result<Self> {
        if values.len() % 3 != 0 {
            return Err(anyhow!(
                "keypoint array length {} is not a multiple of 3",
                values.len()
            ));
        }
        let joints = values
            .chunks_exact(3)
            .map(|c| Keypoint::new(c[0], c[1], c[2]))
            .collect();
        Ok(Self { joints })
    }

    pub fn to_flat(&self) -> Vec<f32> {
        self.joints
            .iter()
            .flat_map(|k| [k.x, k.y, k.confidence])
            .collect()
    }

    pub fn joint(&self, id: usize) -> Option<&Keypoint> {
        self.joints.get(id)
    }

    pub fn joints(&self) -> &[Keypoint] {
        &self.joints
    }

    pub fn len(&self) -> usize {
        self.joints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.joints.is_empty()
    }
}

/// Shape of the heatmap tensor `[channels, height, width]`, when the engine emits one.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HeatmapShape {
    pub channels: usize,
    pub height: usize,
    pub width: usize,
}

/// Rendered output image produced by the engine (pose overlay).
///
/// Pixel data stays with the engine; the output stage only sees the geometry.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OutputImage {
    pub width: u32,
    pub height: u32,
}

/// Everything the output stage receives for one processed input frame.
#[derive(Clone, Debug, Default)]
pub struct KeypointFrame {
    /// Zero-based index of the frame within the input stream.
    pub index: u64,
    /// Name of the input the frame came from (file name, camera id).
    pub source: String,
    pub people: Vec<PersonKeypoints>,
    pub heatmaps: Option<HeatmapShape>,
    pub output_image: Option<OutputImage>,
}

impl KeypointFrame {
    pub fn new(index: u64, source: impl Into<String>, people: Vec<PersonKeypoints>) -> Self {
        Self {
            index,
            source: source.into(),
            people,
            heatmaps: None,
            output_image: None,
        }
    }

    pub fn first_person(&self) -> Option<&PersonKeypoints> {
        self.people.first()
    }

    pub fn is_empty(&self) -> bool {
        self.people.is_empty()
    }

    /// Parse one OpenPose `*_keypoints.json` document.
    pub fn from_openpose_json(index: u64, source: &str, json: &str) -> Result<Self> {
        let doc: OpenPoseDocument = serde_json::from_str(json)
            .with_context(|| format!("invalid keypoint json in {}", source))?;
        let people = doc
            .people
            .iter()
            .map(|p| PersonKeypoints::from_flat(&p.pose_keypoints_2d))
            .collect::<Result<Vec<_>>>()
            .with_context(|| format!("malformed person entry in {}", source))?;
        Ok(Self::new(index, source, people))
    }

    /// Serialize in the OpenPose `*_keypoints.json` layout (body keypoints only).
    pub fn to_openpose_json(&self) -> Result<String> {
        let doc = OpenPoseDocument {
            version: OPENPOSE_JSON_VERSION,
            people: self
                .people
                .iter()
                .map(|p| OpenPosePerson {
                    person_id: vec![-1],
                    pose_keypoints_2d: p.to_flat(),
                })
                .collect(),
        };
        Ok(serde_json::to_string(&doc)?)
    }
}

const OPENPOSE_JSON_VERSION: f32 = 1.3;

#[derive(Debug, Serialize, Deserialize)]
struct OpenPoseDocument {
    #[serde(default)]
    version: f32,
    #[serde(default)]
    people: Vec<OpenPosePerson>,
}

#[derive(Debug, Serialize, Deserialize)]
struct OpenPosePerson {
    #[serde(default)]
    person_id: Vec<i64>,
    #[serde(default)]
    pose_keypoints_2d: Vec<f32>,
}
