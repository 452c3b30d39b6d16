use std::path::PathBuf;
use std::time::Duration;

use anyhow::{anyhow, Result};
use clap::Args;

use super::config::{
    level_from_priority, FrameRange, HeatmapSelection, InputSource, KeypointScale, OutputSinks,
    PipelineConfig, PoseModel, RenderMode, Resolution,
};

/// Pose pipeline flags. Names and defaults follow the OpenPose demo flags.
#[derive(Args, Debug, Clone)]
pub struct PipelineFlags {
    /// Disable the visual display.
    #[arg(long, alias = "no_display")]
    pub no_display: bool,

    /// Log priority threshold: 0 shows everything, 255 shows nothing.
    #[arg(long, default_value_t = 3, allow_negative_numbers = true)]
    pub logging_level: i32,

    /// Read frames from a directory (images, or `*_keypoints.json` for replay).
    #[arg(long, default_value = "")]
    pub image_dir: String,

    /// Read frames from a video file.
    #[arg(long, default_value = "")]
    pub video: String,

    /// Read frames from an IP camera URL.
    #[arg(long, default_value = "")]
    pub ip_camera: String,

    /// Webcam index; -1 picks the first available one.
    #[arg(long, default_value_t = -1, allow_negative_numbers = true)]
    pub camera: i32,

    /// Use FLIR/Point Grey cameras.
    #[arg(long)]
    pub flir_camera: bool,

    /// FLIR camera index; -1 uses all of them.
    #[arg(long, default_value_t = -1, allow_negative_numbers = true)]
    pub flir_camera_index: i32,

    #[arg(long, default_value = "-1x-1", allow_hyphen_values = true)]
    pub camera_resolution: String,

    #[arg(long, default_value = "-1x-1", allow_hyphen_values = true)]
    pub output_resolution: String,

    /// Network input resolution, multiples of 16.
    #[arg(long, default_value = "-1x368", allow_hyphen_values = true)]
    pub net_resolution: String,

    #[arg(long, default_value = "368x368", allow_hyphen_values = true)]
    pub face_net_resolution: String,

    #[arg(long, default_value = "368x368", allow_hyphen_values = true)]
    pub hand_net_resolution: String,

    /// BODY_25, COCO, MPI, MPI_4_layers, BODY_25B or BODY_135.
    #[arg(long, default_value = "BODY_25")]
    pub model_pose: String,

    #[arg(long, default_value = "models/")]
    pub model_folder: PathBuf,

    #[arg(long, default_value_t = -1, allow_negative_numbers = true)]
    pub num_gpu: i32,

    #[arg(long, default_value_t = 0)]
    pub num_gpu_start: i32,

    #[arg(long, default_value_t = 1)]
    pub scale_number: u32,

    #[arg(long, default_value_t = 0.25)]
    pub scale_gap: f32,

    /// -1 auto, 0 none, 1 CPU, 2 GPU.
    #[arg(long, default_value_t = -1, allow_negative_numbers = true)]
    pub render_pose: i32,

    #[arg(long, default_value_t = 0.05)]
    pub render_threshold: f32,

    #[arg(long, default_value_t = 0.6)]
    pub alpha_pose: f32,

    /// Maximum people per frame; -1 means no limit.
    #[arg(long, default_value_t = -1, allow_negative_numbers = true)]
    pub number_people_max: i32,

    #[arg(long, default_value_t = 0)]
    pub keypoint_scale: i32,

    #[arg(long)]
    pub heatmaps_add_parts: bool,

    #[arg(long)]
    pub heatmaps_add_bkg: bool,

    #[arg(long = "heatmaps-add-pafs", alias = "heatmaps_add_PAFs")]
    pub heatmaps_add_pafs: bool,

    #[arg(long, default_value_t = 0)]
    pub frame_first: u64,

    #[arg(long, default_value_t = 1)]
    pub frame_step: u64,

    /// Last frame to process; -1 runs to the end of the input.
    #[arg(long, default_value_t = -1, allow_negative_numbers = true)]
    pub frame_last: i64,

    #[arg(long)]
    pub frame_flip: bool,

    /// 0, 90, 180 or 270.
    #[arg(long, default_value_t = 0)]
    pub frame_rotate: u16,

    /// Drop frames to keep up with the input rate.
    #[arg(long)]
    pub process_real_time: bool,

    /// Maximum processing rate; -1 means unlimited.
    #[arg(long, default_value_t = -1.0, allow_negative_numbers = true)]
    pub fps_max: f64,

    /// Run every stage on one thread.
    #[arg(long)]
    pub disable_multi_thread: bool,

    /// Directory for per-frame keypoint JSON.
    #[arg(long, default_value = "")]
    pub write_json: String,

    /// Deprecated alias of --write-json.
    #[arg(long, default_value = "")]
    pub write_keypoint: String,

    #[arg(long, default_value = "")]
    pub write_images: String,

    #[arg(long, default_value = "png")]
    pub write_images_format: String,

    #[arg(long, default_value = "")]
    pub write_video: String,

    #[arg(long, default_value = "")]
    pub udp_host: String,

    #[arg(long, default_value = "")]
    pub udp_port: String,
}

impl PipelineFlags {
    /// Validate flags and translate them into the engine start contract.
    pub fn to_config(&self) -> Result<PipelineConfig> {
        let log_level = level_from_priority(self.logging_level)?;

        let net_resolution = Resolution::parse(&self.net_resolution)?;
        let face_net_resolution = Resolution::parse(&self.face_net_resolution)?;
        let hand_net_resolution = Resolution::parse(&self.hand_net_resolution)?;
        for (name, res) in [
            ("net_resolution", net_resolution),
            ("face_net_resolution", face_net_resolution),
            ("hand_net_resolution", hand_net_resolution),
        ] {
            if !res.is_multiple_of(16) {
                return Err(anyhow!("{} {} must be a multiple of 16", name, res));
            }
        }

        if self.scale_number == 0 {
            return Err(anyhow!("scale_number must be at least 1"));
        }
        if self.frame_step == 0 {
            return Err(anyhow!("frame_step must be at least 1"));
        }
        let last = match self.frame_last {
            -1 => None,
            n if n < 0 => return Err(anyhow!("frame_last must be -1 or a frame index")),
            n => Some(n as u64),
        };
        if let Some(last) = last {
            if last < self.frame_first {
                return Err(anyhow!(
                    "frame_last ({}) is before frame_first ({})",
                    last,
                    self.frame_first
                ));
            }
        }
        if ![0, 90, 180, 270].contains(&self.frame_rotate) {
            return Err(anyhow!("frame_rotate must be 0, 90, 180 or 270"));
        }
        let number_people_max = match self.number_people_max {
            -1 => None,
            n if n > 0 => Some(n as u32),
            n => return Err(anyhow!("number_people_max must be -1 or positive (got {})", n)),
        };
        let fps_max = match self.fps_max {
            f if f == -1.0 => None,
            f if f > 0.0 && Duration::try_from_secs_f64(1.0 / f).is_ok() => Some(f),
            f if f > 0.0 => return Err(anyhow!("fps_max {} is too small to pace frames", f)),
            f => return Err(anyhow!("fps_max must be -1 or positive (got {})", f)),
        };

        Ok(PipelineConfig {
            input: self.producer()?,
            camera_resolution: Resolution::parse(&self.camera_resolution)?,
            output_resolution: Resolution::parse(&self.output_resolution)?,
            net_resolution,
            face_net_resolution,
            hand_net_resolution,
            pose_model: PoseModel::parse(&self.model_pose)?,
            model_folder: self.model_folder.clone(),
            num_gpu: self.num_gpu,
            num_gpu_start: self.num_gpu_start,
            scale_number: self.scale_number,
            scale_gap: self.scale_gap,
            render_mode: RenderMode::from_flag(self.render_pose)?,
            render_threshold: self.render_threshold,
            alpha_pose: self.alpha_pose,
            number_people_max,
            keypoint_scale: KeypointScale::from_flag(self.keypoint_scale)?,
            heatmaps: HeatmapSelection {
                parts: self.heatmaps_add_parts,
                background: self.heatmaps_add_bkg,
                pafs: self.heatmaps_add_pafs,
            },
            frames: FrameRange {
                first: self.frame_first,
                step: self.frame_step,
                last,
            },
            frame_flip: self.frame_flip,
            frame_rotate: self.frame_rotate,
            process_real_time: self.process_real_time,
            fps_max,
            multi_thread: !self.disable_multi_thread,
            sinks: self.sinks()?,
            display: !self.no_display,
            log_level,
        })
    }

    /// Input selection priority: image_dir, video, ip_camera, flir_camera, webcam.
    fn producer(&self) -> Result<InputSource> {
        if !self.image_dir.is_empty() {
            return Ok(InputSource::ImageDir(PathBuf::from(&self.image_dir)));
        }
        if !self.video.is_empty() {
            return Ok(InputSource::Video(PathBuf::from(&self.video)));
        }
        if !self.ip_camera.is_empty() {
            return Ok(InputSource::IpCamera(self.ip_camera.clone()));
        }
        if self.flir_camera {
            return Ok(InputSource::FlirCamera {
                index: optional_index("flir_camera_index", self.flir_camera_index)?,
            });
        }
        Ok(InputSource::Webcam {
            index: optional_index("camera", self.camera)?,
        })
    }

    fn sinks(&self) -> Result<OutputSinks> {
        let mut write_json = non_empty_path(&self.write_json);
        if !self.write_keypoint.is_empty() {
            log::warn!(
                "Flag `write_keypoint` is deprecated and will eventually be removed. Please, use `write_json` instead."
            );
            if write_json.is_none() {
                write_json = non_empty_path(&self.write_keypoint);
            }
        }
        let udp = match (self.udp_host.is_empty(), self.udp_port.is_empty()) {
            (true, true) => None,
            (false, false) => {
                let port: u16 = self
                    .udp_port
                    .parse()
                    .map_err(|_| anyhow!("udp_port '{}' is not a port number", self.udp_port))?;
                Some((self.udp_host.clone(), port))
            }
            _ => return Err(anyhow!("udp_host and udp_port must be set together")),
        };
        Ok(OutputSinks {
            write_json,
            write_images: non_empty_path(&self.write_images),
            write_images_format: self.write_images_format.clone(),
            write_video: non_empty_path(&self.write_video),
            udp,
        })
    }
}

fn optional_index(name: &str, value: i32) -> Result<Option<u32>> {
    match value {
        -1 => Ok(None),
        n if n >= 0 => Ok(Some(n as u32)),
        n => Err(anyhow!("{} must be -1 or an index (got {})", name, n)),
    }
}

fn non_empty_path(value: &str) -> Option<PathBuf> {
    (!value.trim().is_empty()).then(|| PathBuf::from(value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct TestCli {
        #[command(flatten)]
        flags: PipelineFlags,
    }

    fn parse(args: &[&str]) -> PipelineFlags {
        let mut argv = vec!["gesture_relay"];
        argv.extend_from_slice(args);
        TestCli::try_parse_from(argv).unwrap().flags
    }

    #[test]
    fn defaults_translate_to_default_config() {
        let config = parse(&[]).to_config().unwrap();
        assert_eq!(config, PipelineConfig::default());
    }

    #[test]
    fn image_dir_wins_over_other_inputs() {
        let config = parse(&["--image-dir", "frames/", "--video", "a.mp4", "--camera", "2"])
            .to_config()
            .unwrap();
        assert_eq!(config.input, InputSource::ImageDir(PathBuf::from("frames/")));

        let config = parse(&["--video", "a.mp4", "--ip-camera", "rtsp://cam"])
            .to_config()
            .unwrap();
        assert_eq!(config.input, InputSource::Video(PathBuf::from("a.mp4")));

        let config = parse(&["--flir-camera", "--camera", "1"]).to_config().unwrap();
        assert_eq!(config.input, InputSource::FlirCamera { index: None });

        let config = parse(&["--camera", "1"]).to_config().unwrap();
        assert_eq!(config.input, InputSource::Webcam { index: Some(1) });
    }

    #[test]
    fn display_and_threading_switches() {
        let config = parse(&["--no-display", "--disable-multi-thread"])
            .to_config()
            .unwrap();
        assert!(!config.display);
        assert!(!config.multi_thread);
        assert!(!parse(&["--no_display"]).to_config().unwrap().display);
    }

    #[test]
    fn rejects_out_of_range_values() {
        assert!(parse(&["--logging-level", "256"]).to_config().is_err());
        assert!(parse(&["--net-resolution", "-1x360"]).to_config().is_err());
        assert!(parse(&["--render-pose", "3"]).to_config().is_err());
        assert!(parse(&["--keypoint-scale", "5"]).to_config().is_err());
        assert!(parse(&["--frame-rotate", "45"]).to_config().is_err());
        assert!(parse(&["--frame-step", "0"]).to_config().is_err());
        assert!(parse(&["--frame-first", "5", "--frame-last", "2"])
            .to_config()
            .is_err());
        assert!(parse(&["--model-pose", "HAND"]).to_config().is_err());
        assert!(parse(&["--udp-host", "127.0.0.1"]).to_config().is_err());
        assert!(parse(&["--fps-max", "0"]).to_config().is_err());
        assert!(parse(&["--fps-max", "1e-30"]).to_config().is_err());
        assert!(parse(&["--fps-max", "NaN"]).to_config().is_err());
    }

    #[test]
    fn output_sinks_and_deprecated_alias() {
        let config = parse(&["--write-keypoint", "old/", "--udp-host", "h", "--udp-port", "9"])
            .to_config()
            .unwrap();
        assert_eq!(config.sinks.write_json, Some(PathBuf::from("old/")));
        assert_eq!(config.sinks.udp, Some(("h".to_string(), 9)));
        assert_eq!(config.sinks.image_sinks(), vec!["udp"]);

        let config = parse(&["--write-json", "new/", "--write-keypoint", "old/"])
            .to_config()
            .unwrap();
        assert_eq!(config.sinks.write_json, Some(PathBuf::from("new/")));
    }

    #[test]
    fn frame_range_and_rate() {
        let config = parse(&[
            "--frame-first",
            "10",
            "--frame-step",
            "2",
            "--frame-last",
            "20",
            "--fps-max",
            "15",
            "--number-people-max",
            "1",
        ])
        .to_config()
        .unwrap();
        assert_eq!(
            config.frames,
            FrameRange {
                first: 10,
                step: 2,
                last: Some(20)
            }
        );
        assert_eq!(config.fps_max, Some(15.0));
        assert_eq!(config.number_people_max, Some(1));
    }
}
