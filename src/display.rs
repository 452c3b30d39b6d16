//! Display step of the output stage.
//!
//! There is no GUI window. The console display keeps one spinner line on
//! stderr showing the latest frame and gesture, and treats Ctrl-C as the
//! user-abort key.

use std::io::IsTerminal;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

use crate::gesture::GestureLabel;
use crate::keypoints::KeypointFrame;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DisplayEvent {
    Continue,
    Abort,
}

/// Shows processed frames and reports user-abort input.
pub trait FrameDisplay {
    fn show(&mut self, frame: &KeypointFrame, label: Option<GestureLabel>)
        -> Result<DisplayEvent>;
}

/// User-abort latch, set from a signal handler and polled by the display.
#[derive(Clone, Debug, Default)]
pub struct AbortFlag(Arc<AtomicBool>);

impl AbortFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn raise(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_raised(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Route Ctrl-C to this flag.
    pub fn install_ctrlc(&self) -> Result<()> {
        let flag = self.clone();
        ctrlc::set_handler(move || flag.raise())?;
        Ok(())
    }
}

/// Spinner-line display on stderr.
pub struct ConsoleDisplay {
    spinner: Option<ProgressBar>,
    abort: AbortFlag,
}

impl ConsoleDisplay {
    pub fn new(abort: AbortFlag) -> Self {
        Self::with_tty(abort, std::io::stderr().is_terminal())
    }

    pub fn with_tty(abort: AbortFlag, is_tty: bool) -> Self {
        let spinner = is_tty.then(|| {
            let spinner = ProgressBar::new_spinner();
            spinner.set_draw_target(ProgressDrawTarget::stderr());
            spinner.enable_steady_tick(Duration::from_millis(120));
            let style = ProgressStyle::with_template("{spinner} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner());
            spinner.set_style(style);
            spinner
        });
        Self { spinner, abort }
    }
}

impl FrameDisplay for ConsoleDisplay {
    fn show(
        &mut self,
        frame: &KeypointFrame,
        label: Option<GestureLabel>,
    ) -> Result<DisplayEvent> {
        let line = render_line(frame, label);
        match &self.spinner {
            Some(spinner) => spinner.set_message(line),
            None => log::debug!("{}", line),
        }
        if self.abort.is_raised() {
            return Ok(DisplayEvent::Abort);
        }
        Ok(DisplayEvent::Continue)
    }
}

impl Drop for ConsoleDisplay {
    fn drop(&mut self) {
        if let Some(spinner) = self.spinner.take() {
            spinner.finish_and_clear();
        }
    }
}

fn render_line(frame: &KeypointFrame, label: Option<GestureLabel>) -> String {
    let mut line = format!(
        "frame {} [{}] people={}",
        frame.index,
        frame.source,
        frame.people.len()
    );
    if let Some(image) = frame.output_image {
        line.push_str(&format!(" {}x{}", image.width, image.height));
    }
    match label {
        Some(label) => line.push_str(&format!(" gesture={}", label)),
        None => line.push_str(" gesture=-"),
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keypoints::OutputImage;

    #[test]
    fn abort_flag_is_reported_after_raise() -> Result<()> {
        let abort = AbortFlag::new();
        let mut display = ConsoleDisplay::with_tty(abort.clone(), false);
        let frame = KeypointFrame::new(0, "cam", vec![]);

        assert_eq!(display.show(&frame, None)?, DisplayEvent::Continue);
        abort.raise();
        assert_eq!(display.show(&frame, None)?, DisplayEvent::Abort);
        Ok(())
    }

    #[test]
    fn line_names_frame_and_gesture() {
        let mut frame = KeypointFrame::new(12, "clip_000012_keypoints.json", vec![]);
        frame.output_image = Some(OutputImage {
            width: 640,
            height: 480,
        });
        let line = render_line(&frame, Some(GestureLabel::RightHandUp));
        assert_eq!(
            line,
            "frame 12 [clip_000012_keypoints.json] people=0 640x480 gesture=RightHandUp"
        );
    }
}
