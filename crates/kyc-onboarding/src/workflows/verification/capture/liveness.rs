//! Advisory liveness prompts.
//!
//! The monitor cycles through head-movement prompts and reports whether a face is in
//! frame. It never verifies that the prompted motion happened: a live photo is accepted
//! on the first frame with any detected face, whichever prompt is showing.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use super::device::{FaceDetector, StreamProbe};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LivenessPrompt {
    LookStraight,
    Blink,
    TurnLeft,
    TurnRight,
    Smile,
}

impl LivenessPrompt {
    pub const fn instruction(self) -> &'static str {
        match self {
            LivenessPrompt::LookStraight => "Look straight at the camera",
            LivenessPrompt::Blink => "Blink slowly",
            LivenessPrompt::TurnLeft => "Turn your head left",
            LivenessPrompt::TurnRight => "Turn your head right",
            LivenessPrompt::Smile => "Smile",
        }
    }

    pub const fn next(self) -> Self {
        match self {
            LivenessPrompt::LookStraight => LivenessPrompt::Blink,
            LivenessPrompt::Blink => LivenessPrompt::TurnLeft,
            LivenessPrompt::TurnLeft => LivenessPrompt::TurnRight,
            LivenessPrompt::TurnRight => LivenessPrompt::Smile,
            LivenessPrompt::Smile => LivenessPrompt::LookStraight,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LivenessState {
    pub prompt: LivenessPrompt,
    pub face_detected: bool,
    pub polls: u64,
    pub stream_closed: bool,
}

impl LivenessState {
    fn initial() -> Self {
        Self {
            prompt: LivenessPrompt::LookStraight,
            face_detected: false,
            polls: 0,
            stream_closed: false,
        }
    }
}

/// Background face-presence poll bound to one camera stream.
///
/// Stops by itself once the stream is released; dropping the monitor cancels the poll.
pub struct LivenessMonitor {
    state: watch::Receiver<LivenessState>,
    task: JoinHandle<()>,
}

impl LivenessMonitor {
    pub(super) fn spawn(
        probe: StreamProbe,
        detector: Arc<dyn FaceDetector>,
        period: Duration,
    ) -> Self {
        let (sender, state) = watch::channel(LivenessState::initial());

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            let mut prompt = LivenessPrompt::LookStraight;
            let mut polls = 0;

            loop {
                ticker.tick().await;
                polls += 1;

                let Ok(frame) = probe.grab() else {
                    sender.send_modify(|state| {
                        state.stream_closed = true;
                        state.face_detected = false;
                    });
                    break;
                };

                let face_detected = frame
                    .as_ref()
                    .and_then(|frame| detector.detect(frame))
                    .is_some();
                let update = LivenessState {
                    prompt,
                    face_detected,
                    polls,
                    stream_closed: false,
                };
                if sender.send(update).is_err() {
                    break;
                }
                prompt = prompt.next();
            }
        });

        Self { state, task }
    }

    pub fn state(&self) -> LivenessState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<LivenessState> {
        self.state.clone()
    }

    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }

    pub fn stop(self) {}
}

impl Drop for LivenessMonitor {
    fn drop(&mut self) {
        self.task.abort();
    }
}
