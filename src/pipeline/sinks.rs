use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::keypoints::KeypointFrame;

/// Per-frame output written before the frame reaches the output handler.
pub trait OutputSink: Send {
    fn name(&self) -> &'static str;
    fn write(&mut self, frame: &KeypointFrame) -> Result<()>;
}

/// Writes each frame as `<name>_keypoints.json` in the OpenPose layout.
pub struct JsonSink {
    dir: PathBuf,
}

impl JsonSink {
    pub fn create(dir: &Path) -> Result<Self> {
        fs::create_dir_all(dir)
            .with_context(|| format!("create write_json directory {}", dir.display()))?;
        Ok(Self {
            dir: dir.to_path_buf(),
        })
    }
}

impl OutputSink for JsonSink {
    fn name(&self) -> &'static str {
        "write_json"
    }

    fn write(&mut self, frame: &KeypointFrame) -> Result<()> {
        let path = self.dir.join(output_name(frame));
        let json = frame.to_openpose_json()?;
        fs::write(&path, json).with_context(|| format!("write {}", path.display()))
    }
}

/// File sources keep their stem; cameras and in-memory sources use the frame index.
fn output_name(frame: &KeypointFrame) -> String {
    let source = Path::new(&frame.source);
    let stem = source
        .extension()
        .and_then(|_| source.file_stem())
        .and_then(|s| s.to_str())
        .map(|s| s.trim_end_matches("_keypoints"))
        .filter(|s| !s.is_empty());
    match stem {
        Some(stem) => format!("{}_keypoints.json", stem),
        None => format!("{:012}_keypoints.json", frame.index),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_follow_the_source_file() {
        let frame = KeypointFrame::new(4, "clips/take1_000004_keypoints.json", vec![]);
        assert_eq!(output_name(&frame), "take1_000004_keypoints.json");

        let frame = KeypointFrame::new(4, "frame.png", vec![]);
        assert_eq!(output_name(&frame), "frame_keypoints.json");
    }

    #[test]
    fn unnamed_frames_use_the_index() {
        let frame = KeypointFrame::new(42, "", vec![]);
        assert_eq!(output_name(&frame), "000000000042_keypoints.json");

        let frame = KeypointFrame::new(7, "scripted", vec![]);
        assert_eq!(output_name(&frame), "000000000007_keypoints.json");
    }
}
