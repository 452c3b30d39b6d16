use std::fmt;
use std::path::PathBuf;

use anyhow::{anyhow, Result};

/// Where frames come from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InputSource {
    /// Directory of images, or of `*_keypoints.json` files for replay.
    ImageDir(PathBuf),
    Video(PathBuf),
    IpCamera(String),
    FlirCamera { index: Option<u32> },
    /// `None` selects the first available webcam.
    Webcam { index: Option<u32> },
}

impl fmt::Display for InputSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InputSource::ImageDir(path) => write!(f, "image_dir:{}", path.display()),
            InputSource::Video(path) => write!(f, "video:{}", path.display()),
            InputSource::IpCamera(url) => write!(f, "ip_camera:{}", url),
            InputSource::FlirCamera { index: None } => f.write_str("flir:all"),
            InputSource::FlirCamera { index: Some(i) } => write!(f, "flir:{}", i),
            InputSource::Webcam { index: None } => f.write_str("webcam:auto"),
            InputSource::Webcam { index: Some(i) } => write!(f, "webcam:{}", i),
        }
    }
}

/// `WxH` where either side may be `-1` (derive from the other side or the input).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Resolution {
    pub width: i32,
    pub height: i32,
}

impl Resolution {
    pub const AUTO: Resolution = Resolution {
        width: -1,
        height: -1,
    };

    pub fn parse(value: &str) -> Result<Self> {
        let (w, h) = value
            .trim()
            .split_once('x')
            .ok_or_else(|| anyhow!("resolution '{}' must look like WIDTHxHEIGHT", value))?;
        let parse_side = |side: &str| -> Result<i32> {
            let n: i32 = side
                .trim()
                .parse()
                .map_err(|_| anyhow!("resolution '{}' has a non-integer side", value))?;
            if n == 0 || n < -1 {
                return Err(anyhow!(
                    "resolution '{}': sides must be positive or -1",
                    value
                ));
            }
            Ok(n)
        };
        Ok(Self {
            width: parse_side(w)?,
            height: parse_side(h)?,
        })
    }

    /// Every explicit side is a multiple of `n`.
    pub fn is_multiple_of(&self, n: i32) -> bool {
        [self.width, self.height]
            .iter()
            .all(|side| *side == -1 || side % n == 0)
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Body pose model.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PoseModel {
    Body25,
    Coco,
    Mpi,
    Mpi4Layers,
    Body25B,
    Body135,
}

impl PoseModel {
    pub fn parse(value: &str) -> Result<Self> {
        match value {
            "BODY_25" => Ok(PoseModel::Body25),
            "COCO" => Ok(PoseModel::Coco),
            "MPI" => Ok(PoseModel::Mpi),
            "MPI_4_layers" => Ok(PoseModel::Mpi4Layers),
            "BODY_25B" => Ok(PoseModel::Body25B),
            "BODY_135" => Ok(PoseModel::Body135),
            other => Err(anyhow!("unknown model_pose '{}'", other)),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            PoseModel::Body25 => "BODY_25",
            PoseModel::Coco => "COCO",
            PoseModel::Mpi => "MPI",
            PoseModel::Mpi4Layers => "MPI_4_layers",
            PoseModel::Body25B => "BODY_25B",
            PoseModel::Body135 => "BODY_135",
        }
    }

    pub fn keypoint_count(&self) -> usize {
        match self {
            PoseModel::Body25 | PoseModel::Body25B => 25,
            PoseModel::Coco => 18,
            PoseModel::Mpi | PoseModel::Mpi4Layers => 15,
            PoseModel::Body135 => 135,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RenderMode {
    Auto,
    None,
    Cpu,
    Gpu,
}

impl RenderMode {
    pub fn from_flag(render_pose: i32) -> Result<Self> {
        match render_pose {
            -1 => Ok(RenderMode::Auto),
            0 => Ok(RenderMode::None),
            1 => Ok(RenderMode::Cpu),
            2 => Ok(RenderMode::Gpu),
            other => Err(anyhow!("render_pose must be -1, 0, 1 or 2 (got {})", other)),
        }
    }
}

/// Coordinate space of the delivered keypoints.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KeypointScale {
    InputResolution,
    OutputResolution,
    NetOutputResolution,
    ZeroToOne,
    PlusMinusOne,
}

impl KeypointScale {
    pub fn from_flag(keypoint_scale: i32) -> Result<Self> {
        match keypoint_scale {
            0 => Ok(KeypointScale::InputResolution),
            1 => Ok(KeypointScale::OutputResolution),
            2 => Ok(KeypointScale::NetOutputResolution),
            3 => Ok(KeypointScale::ZeroToOne),
            4 => Ok(KeypointScale::PlusMinusOne),
            other => Err(anyhow!("keypoint_scale must be in 0..=4 (got {})", other)),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct HeatmapSelection {
    pub parts: bool,
    pub background: bool,
    pub pafs: bool,
}

impl HeatmapSelection {
    pub fn any(&self) -> bool {
        self.parts || self.background || self.pafs
    }
}

/// Which input frames are processed: `first, first+step, ...` up to `last`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FrameRange {
    pub first: u64,
    pub step: u64,
    pub last: Option<u64>,
}

impl Default for FrameRange {
    fn default() -> Self {
        Self {
            first: 0,
            step: 1,
            last: None,
        }
    }
}

impl FrameRange {
    pub fn contains(&self, index: u64) -> bool {
        index >= self.first
            && (index - self.first) % self.step == 0
            && self.last.map_or(true, |last| index <= last)
    }

    pub fn is_past_end(&self, index: u64) -> bool {
        self.last.is_some_and(|last| index > last)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OutputSinks {
    pub write_json: Option<PathBuf>,
    pub write_images: Option<PathBuf>,
    pub write_images_format: String,
    pub write_video: Option<PathBuf>,
    pub udp: Option<(String, u16)>,
}

impl Default for OutputSinks {
    fn default() -> Self {
        Self {
            write_json: None,
            write_images: None,
            write_images_format: "png".to_string(),
            write_video: None,
            udp: None,
        }
    }
}

impl OutputSinks {
    /// Sinks that need rendered pixels, which only a detecting engine has.
    pub fn image_sinks(&self) -> Vec<&'static str> {
        let mut names = Vec::new();
        if self.write_images.is_some() {
            names.push("write_images");
        }
        if self.write_video.is_some() {
            names.push("write_video");
        }
        if self.udp.is_some() {
            names.push("udp");
        }
        names
    }
}

/// Everything the pose engine is started with.
#[derive(Clone, Debug, PartialEq)]
pub struct PipelineConfig {
    pub input: InputSource,
    pub camera_resolution: Resolution,
    pub output_resolution: Resolution,
    pub net_resolution: Resolution,
    pub face_net_resolution: Resolution,
    pub hand_net_resolution: Resolution,
    pub pose_model: PoseModel,
    pub model_folder: PathBuf,
    pub num_gpu: i32,
    pub num_gpu_start: i32,
    pub scale_number: u32,
    pub scale_gap: f32,
    pub render_mode: RenderMode,
    pub render_threshold: f32,
    pub alpha_pose: f32,
    pub number_people_max: Option<u32>,
    pub keypoint_scale: KeypointScale,
    pub heatmaps: HeatmapSelection,
    pub frames: FrameRange,
    pub frame_flip: bool,
    pub frame_rotate: u16,
    pub process_real_time: bool,
    pub fps_max: Option<f64>,
    pub multi_thread: bool,
    pub sinks: OutputSinks,
    pub display: bool,
    pub log_level: log::LevelFilter,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            input: InputSource::Webcam { index: None },
            camera_resolution: Resolution::AUTO,
            output_resolution: Resolution::AUTO,
            net_resolution: Resolution {
                width: -1,
                height: 368,
            },
            face_net_resolution: Resolution {
                width: 368,
                height: 368,
            },
            hand_net_resolution: Resolution {
                width: 368,
                height: 368,
            },
            pose_model: PoseModel::Body25,
            model_folder: PathBuf::from("models/"),
            num_gpu: -1,
            num_gpu_start: 0,
            scale_number: 1,
            scale_gap: 0.25,
            render_mode: RenderMode::Auto,
            render_threshold: 0.05,
            alpha_pose: 0.6,
            number_people_max: None,
            keypoint_scale: KeypointScale::InputResolution,
            heatmaps: HeatmapSelection::default(),
            frames: FrameRange::default(),
            frame_flip: false,
            frame_rotate: 0,
            process_real_time: false,
            fps_max: None,
            multi_thread: true,
            sinks: OutputSinks::default(),
            display: true,
            log_level: log::LevelFilter::Info,
        }
    }
}

/// Map the 0..=255 priority threshold (lower shows more) onto a log filter.
pub(crate) fn level_from_priority(priority: i32) -> Result<log::LevelFilter> {
    match priority {
        0 => Ok(log::LevelFilter::Trace),
        1 => Ok(log::LevelFilter::Debug),
        2 | 3 => Ok(log::LevelFilter::Info),
        4 => Ok(log::LevelFilter::Warn),
        5..=254 => Ok(log::LevelFilter::Error),
        255 => Ok(log::LevelFilter::Off),
        other => Err(anyhow!("Wrong logging_level value {} (expected 0..=255)", other)),
    }
}
