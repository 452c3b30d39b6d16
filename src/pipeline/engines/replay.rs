//! Replays keypoints that OpenPose already detected.
//!
//! Input is a directory of `*_keypoints.json` files as written by
//! `--write_json`, one file per frame, processed in file-name order. With
//! multi-threading enabled a producer thread reads and parses files ahead of
//! the output stage through a small bounded channel.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::mpsc;

use anyhow::{anyhow, Context, Result};

use super::{reject_image_sinks, Dispatcher};
use crate::keypoints::KeypointFrame;
use crate::pipeline::{
    Flow, FrameHandler, FrameRange, InputSource, PipelineConfig, PoseEngine, RunSummary,
    StopSignal,
};

const PREFETCH_FRAMES: usize = 8;

enum Produced {
    Frame(KeypointFrame),
    Unreadable(PathBuf, anyhow::Error),
}

pub struct ReplayEngine {
    dir: Option<PathBuf>,
    config: PipelineConfig,
}

impl ReplayEngine {
    pub fn new() -> Self {
        Self {
            dir: None,
            config: PipelineConfig::default(),
        }
    }
}

impl Default for ReplayEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl PoseEngine for ReplayEngine {
    fn name(&self) -> &'static str {
        "replay"
    }

    fn configure(&mut self, config: &PipelineConfig) -> Result<()> {
        let dir = match &config.input {
            InputSource::ImageDir(dir) => dir.clone(),
            other => {
                return Err(anyhow!(
                    "replay engine reads keypoint json directories (--image-dir); {} needs a detecting engine",
                    other
                ))
            }
        };
        if !dir.is_dir() {
            return Err(anyhow!("image_dir {} is not a directory", dir.display()));
        }
        reject_image_sinks(self.name(), config)?;
        if config.frame_flip || config.frame_rotate != 0 {
            log::warn!("frame_flip/frame_rotate ignored: keypoints are replayed as recorded");
        }
        if config.heatmaps.any() {
            log::warn!("heatmaps requested but keypoint json carries none");
        }
        self.dir = Some(dir);
        self.config = config.clone();
        Ok(())
    }

    fn run(&mut self, output: &mut dyn FrameHandler, stop: &StopSignal) -> Result<RunSummary> {
        let dir = self
            .dir
            .clone()
            .ok_or_else(|| anyhow!("replay engine not configured"))?;
        let files = select(keypoint_files(&dir)?, self.config.frames);
        log::info!("replaying {} keypoint file(s) from {}", files.len(), dir.display());

        let mut dispatcher = Dispatcher::new(output, stop, &self.config)?;
        if self.config.multi_thread {
            let (tx, rx) = mpsc::sync_channel::<Produced>(PREFETCH_FRAMES);
            let producer_stop = stop.clone();
            let producer = std::thread::Builder::new()
                .name("keypoint-producer".to_string())
                .spawn(move || {
                    for (index, path) in files {
                        if producer_stop.is_stopped() {
                            break;
                        }
                        if tx.send(read_frame(index, path)).is_err() {
                            break;
                        }
                    }
                })
                .context("spawn keypoint producer thread")?;
            for produced in rx.iter() {
                if handle(&mut dispatcher, produced) == Flow::Stop {
                    break;
                }
            }
            // Dropping the receiver unblocks a producer waiting on a full channel.
            drop(rx);
            producer
                .join()
                .map_err(|_| anyhow!("keypoint producer thread panicked"))?;
        } else {
            for (index, path) in files {
                if handle(&mut dispatcher, read_frame(index, path)) == Flow::Stop {
                    break;
                }
            }
        }
        Ok(dispatcher.finish())
    }
}

fn handle(dispatcher: &mut Dispatcher<'_>, produced: Produced) -> Flow {
    match produced {
        Produced::Frame(frame) => dispatcher.deliver(frame),
        Produced::Unreadable(path, err) => {
            log::warn!("skipping {}: {:#}", path.display(), err);
            dispatcher.skip();
            Flow::Continue
        }
    }
}

fn read_frame(index: u64, path: PathBuf) -> Produced {
    let source = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let parsed = fs::read_to_string(&path)
        .with_context(|| format!("read {}", path.display()))
        .and_then(|json| KeypointFrame::from_openpose_json(index, &source, &json));
    match parsed {
        Ok(frame) => Produced::Frame(frame),
        Err(err) => Produced::Unreadable(path, err),
    }
}

/// `*.json` files in `dir`, sorted by name.
fn keypoint_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir).with_context(|| format!("read directory {}", dir.display()))? {
        let path = entry?.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == "json") {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

fn select(files: Vec<PathBuf>, range: FrameRange) -> Vec<(u64, PathBuf)> {
    files
        .into_iter()
        .enumerate()
        .map(|(i, path)| (i as u64, path))
        .take_while(|(i, _)| !range.is_past_end(*i))
        .filter(|(i, _)| range.contains(*i))
        .collect()
}
