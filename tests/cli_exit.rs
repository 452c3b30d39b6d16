use std::process::{Command, Output};

const FATAL_STATUS: i32 = 255;

fn gesture_relay(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_gesture_relay"))
        .args(args)
        .env_remove("GESTURE_RELAY_CONFIG")
        .env_remove("GESTURE_STATUS_URL")
        .env_remove("GESTURE_DELIVERY")
        .env_remove("GESTURE_ENGINE")
        .env("RUST_LOG", "error")
        .output()
        .expect("run gesture_relay")
}

#[test]
fn completed_run_exits_zero() {
    let out = gesture_relay(&["--engine", "scripted", "--no-display", "--demo-frames", "0"]);
    assert_eq!(out.status.code(), Some(0), "{:?}", out);

    let out = gesture_relay(&["--list-engines"]);
    assert_eq!(out.status.code(), Some(0));
    let listed = String::from_utf8_lossy(&out.stdout);
    assert_eq!(listed.lines().collect::<Vec<_>>(), vec!["replay", "scripted"]);
}

#[test]
fn invalid_flag_values_exit_255() {
    for args in [
        &["--fps-max", "1e-30"][..],
        &["--logging-level", "300"][..],
        &["--net-resolution", "-1x360"][..],
    ] {
        let out = gesture_relay(args);
        assert_eq!(out.status.code(), Some(FATAL_STATUS), "{:?} -> {:?}", args, out);
    }
}

#[test]
fn startup_failures_exit_255() {
    let out = gesture_relay(&[
        "--engine",
        "replay",
        "--no-display",
        "--image-dir",
        "/nonexistent/keypoints",
    ]);
    assert_eq!(out.status.code(), Some(FATAL_STATUS), "{:?}", out);

    let out = gesture_relay(&["--engine", "openpose", "--no-display"]);
    assert_eq!(out.status.code(), Some(FATAL_STATUS), "{:?}", out);

    let out = Command::new(env!("CARGO_BIN_EXE_gesture_relay"))
        .args(["--engine", "scripted", "--no-display", "--demo-frames", "0"])
        .env_remove("GESTURE_RELAY_CONFIG")
        .env("GESTURE_STATUS_URL", "ftp://status.example.com/pose.json")
        .env("RUST_LOG", "error")
        .output()
        .expect("run gesture_relay");
    assert_eq!(out.status.code(), Some(FATAL_STATUS), "{:?}", out);
}
