use std::sync::{Arc, Mutex};
use std::time::Duration;

use gesture_relay::error::RelayError;
use gesture_relay::pipeline::{posed_person, InputSource, ReplayEngine, ScriptedEngine};
use gesture_relay::report::{
    DeliveryMode, ReporterSettings, RetryPolicy, StatusTransport, UreqTransport,
};
use gesture_relay::{
    ConsumerState, FrameConsumer, GestureLabel, GestureReporter, KeypointFrame, Pipeline,
    PersonKeypoints, PipelineConfig, StopSignal,
};

#[derive(Clone, Default)]
struct Recorder {
    puts: Arc<Mutex<Vec<(String, String)>>>,
}

impl Recorder {
    fn bodies(&self) -> Vec<String> {
        self.puts
            .lock()
            .unwrap()
            .iter()
            .map(|(_, body)| body.clone())
            .collect()
    }
}

impl StatusTransport for Recorder {
    fn put(&self, _url: &str, content_type: &str, body: &str) -> Result<u16, RelayError> {
        self.puts
            .lock()
            .unwrap()
            .push((content_type.to_string(), body.to_string()));
        Ok(200)
    }
}

fn settings() -> ReporterSettings {
    ReporterSettings {
        delivery: DeliveryMode::Blocking,
        retry: RetryPolicy::none(),
        ..ReporterSettings::default()
    }
}

/// BODY_25 person with the given heights for joints 2..=7, everything else at 0.
fn person_with_arms(right: [f32; 3], left: [f32; 3]) -> PersonKeypoints {
    let mut flat = vec![0.0f32; 25 * 3];
    for (i, y) in right.iter().chain(left.iter()).enumerate() {
        let joint = 2 + i;
        flat[joint * 3] = 100.0;
        flat[joint * 3 + 1] = *y;
        flat[joint * 3 + 2] = 0.9;
    }
    PersonKeypoints::from_flat(&flat).unwrap()
}

fn run_frames(frames: Vec<KeypointFrame>, recorder: &Recorder) -> gesture_relay::RunSummary {
    let config = PipelineConfig {
        display: false,
        ..PipelineConfig::default()
    };
    let mut pipeline = Pipeline::configure(Box::new(ScriptedEngine::new(frames)), &config).unwrap();
    let reporter =
        GestureReporter::with_transport(settings(), Box::new(recorder.clone())).unwrap();
    pipeline.set_output_handler(Box::new(FrameConsumer::new(
        reporter,
        pipeline.stop_signal(),
    )));
    pipeline.exec().unwrap()
}

#[test]
fn reports_each_scenario_with_deployed_payloads() {
    let raised = [10.0, 5.0, 0.0];
    let lowered = [0.0, 5.0, 10.0];
    let frames = vec![
        KeypointFrame::new(0, "cam", vec![person_with_arms(raised, raised)]),
        KeypointFrame::new(1, "cam", vec![person_with_arms(raised, lowered)]),
        KeypointFrame::new(2, "cam", vec![person_with_arms(lowered, raised)]),
        KeypointFrame::new(3, "cam", vec![person_with_arms(lowered, lowered)]),
    ];
    let recorder = Recorder::default();

    let summary = run_frames(frames, &recorder);

    assert_eq!(summary.frames_delivered, 4);
    assert!(!summary.stopped_early);
    assert_eq!(
        recorder.bodies(),
        vec![
            r#"{"Id":1,"Action":"Both hands up"}"#,
            r#"{"Id":3,"Name":"right hand up"}"#,
            r#"{"Id":2,"Action":"left hand up"}"#,
            r#"{"Id":4,"Action":"both hands down"}"#,
        ]
    );
    assert!(recorder
        .puts
        .lock()
        .unwrap()
        .iter()
        .all(|(content_type, _)| content_type == "json"));
}

#[test]
fn only_first_person_is_classified() {
    let frames = vec![KeypointFrame::new(
        0,
        "cam",
        vec![
            posed_person(GestureLabel::BothHandsDown),
            posed_person(GestureLabel::BothHandsUp),
        ],
    )];
    let recorder = Recorder::default();

    run_frames(frames, &recorder);

    assert_eq!(
        recorder.bodies(),
        vec![r#"{"Id":4,"Action":"both hands down"}"#]
    );
}

#[test]
fn frames_without_people_send_nothing() {
    let frames = (0..5).map(|i| KeypointFrame::new(i, "cam", vec![])).collect();
    let recorder = Recorder::default();

    let summary = run_frames(frames, &recorder);

    assert_eq!(summary.frames_delivered, 5);
    assert!(recorder.bodies().is_empty());
}

#[test]
fn demo_cycle_reports_every_occupied_frame() {
    let recorder = Recorder::default();
    let config = PipelineConfig {
        display: false,
        ..PipelineConfig::default()
    };
    let mut pipeline =
        Pipeline::configure(Box::new(ScriptedEngine::demo_cycle(40)), &config).unwrap();
    let reporter =
        GestureReporter::with_transport(settings(), Box::new(recorder.clone())).unwrap();
    pipeline.set_output_handler(Box::new(FrameConsumer::new(
        reporter,
        pipeline.stop_signal(),
    )));

    pipeline.exec().unwrap();

    let bodies = recorder.bodies();
    assert_eq!(bodies.len(), 36);
    assert!(bodies[0].starts_with(r#"{"Id":1,"#));
    assert!(bodies[35].starts_with(r#"{"Id":4,"#));
}

#[test]
fn replayed_keypoint_directory_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let labels = [GestureLabel::RightHandUp, GestureLabel::LeftHandUp];
    for (i, label) in labels.iter().enumerate() {
        let frame = KeypointFrame::new(i as u64, "", vec![posed_person(*label)]);
        std::fs::write(
            dir.path().join(format!("run_{:012}_keypoints.json", i)),
            frame.to_openpose_json().unwrap(),
        )
        .unwrap();
    }
    let config = PipelineConfig {
        input: InputSource::ImageDir(dir.path().to_path_buf()),
        display: false,
        ..PipelineConfig::default()
    };
    let recorder = Recorder::default();
    let mut pipeline = Pipeline::configure(Box::new(ReplayEngine::new()), &config).unwrap();
    let reporter =
        GestureReporter::with_transport(settings(), Box::new(recorder.clone())).unwrap();
    pipeline.set_output_handler(Box::new(FrameConsumer::new(
        reporter,
        pipeline.stop_signal(),
    )));

    let summary = pipeline.exec().unwrap();

    assert_eq!(summary.frames_delivered, 2);
    assert_eq!(
        recorder.bodies(),
        vec![
            r#"{"Id":3,"Name":"right hand up"}"#,
            r#"{"Id":2,"Action":"left hand up"}"#,
        ]
    );
}

#[test]
fn unreachable_endpoint_does_not_stop_the_consumer() {
    let settings = ReporterSettings {
        url: "http://127.0.0.1:9/pose.json".to_string(),
        timeout: Duration::from_millis(500),
        ..settings()
    };
    let transport = UreqTransport::new(settings.timeout);
    let reporter = GestureReporter::with_transport(settings, Box::new(transport)).unwrap();
    let stop = StopSignal::new();
    let mut consumer = FrameConsumer::new(reporter, stop.clone());

    for i in 0..3 {
        let frame = KeypointFrame::new(i, "cam", vec![posed_person(GestureLabel::BothHandsUp)]);
        assert_eq!(consumer.consume(&frame), ConsumerState::Running);
    }

    assert!(!stop.is_stopped());
    assert_eq!(consumer.stats().classified, 3);
    assert_eq!(consumer.status_stats().failed, 3);
    assert_eq!(consumer.status_stats().sent, 0);
}
