use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tracing::debug;

use super::super::domain::{BiometricKind, DocumentSide, SubjectId};
use super::authenticator::{credential_token, PlatformAuthenticator};
use super::liveness::LivenessMonitor;
use super::{ArtifactKind, CaptureError, CapturedArtifact};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CameraFacing {
    /// Front camera, for selfies and liveness.
    User,
    /// Rear camera, for documents.
    Environment,
}

/// Encoded still grabbed from a live stream.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub width: u32,
    pub height: u32,
    pub media_type: mime::Mime,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FaceDetection {
    pub confidence: f32,
}

/// Hardware camera port. Opening a stream may prompt the user for permission.
pub trait CameraDevice: Send + Sync {
    fn open(&self, facing: CameraFacing) -> Result<Box<dyn FrameSource>, CaptureError>;
}

/// A running camera stream. `stop` must release the underlying hardware.
pub trait FrameSource: Send {
    fn grab(&mut self) -> Result<Option<Frame>, CaptureError>;
    fn stop(&mut self);
}

/// Pretrained face detector port.
pub trait FaceDetector: Send + Sync {
    fn detect(&self, frame: &Frame) -> Option<FaceDetection>;
}

#[derive(Debug, Clone, Copy)]
pub struct CaptureSettings {
    pub authenticator_timeout: Duration,
    pub face_poll_interval: Duration,
}

impl Default for CaptureSettings {
    fn default() -> Self {
        Self {
            authenticator_timeout: Duration::from_secs(60),
            face_poll_interval: Duration::from_secs(1),
        }
    }
}

struct ActiveStream {
    id: u64,
    facing: CameraFacing,
    source: Box<dyn FrameSource>,
}

type StreamSlot = Arc<Mutex<Option<ActiveStream>>>;

fn lock_slot(slot: &StreamSlot) -> MutexGuard<'_, Option<ActiveStream>> {
    // A panic inside a frame source must not keep the camera running.
    slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn stop_stream(mut stream: ActiveStream) {
    debug!(stream = stream.id, facing = ?stream.facing, "stopping camera stream");
    stream.source.stop();
}

/// Scoped ownership of the active camera stream.
///
/// Dropping the handle stops the stream, so teardown happens on every exit path. A
/// handle whose stream was superseded by a newer acquisition reports `StreamClosed`.
pub struct StreamHandle {
    id: u64,
    slot: StreamSlot,
}

impl StreamHandle {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn is_active(&self) -> bool {
        lock_slot(&self.slot)
            .as_ref()
            .is_some_and(|stream| stream.id == self.id)
    }

    pub fn grab(&self) -> Result<Option<Frame>, CaptureError> {
        grab_from(&self.slot, self.id)
    }

    /// Explicit release; equivalent to dropping the handle.
    pub fn release(self) {}

    pub(super) fn probe(&self) -> StreamProbe {
        StreamProbe {
            id: self.id,
            slot: self.slot.clone(),
        }
    }
}

impl Drop for StreamHandle {
    fn drop(&mut self) {
        let mut guard = lock_slot(&self.slot);
        if guard.as_ref().is_some_and(|stream| stream.id == self.id) {
            if let Some(stream) = guard.take() {
                stop_stream(stream);
            }
        }
    }
}

/// Non-owning view used by background pollers; never keeps a stream alive.
#[derive(Clone)]
pub(super) struct StreamProbe {
    id: u64,
    slot: StreamSlot,
}

impl StreamProbe {
    pub(super) fn grab(&self) -> Result<Option<Frame>, CaptureError> {
        grab_from(&self.slot, self.id)
    }
}

fn grab_from(slot: &StreamSlot, id: u64) -> Result<Option<Frame>, CaptureError> {
    let mut guard = lock_slot(slot);
    match guard.as_mut() {
        Some(stream) if stream.id == id => stream.source.grab(),
        _ => Err(CaptureError::StreamClosed),
    }
}

/// Acquires capture input and turns it into uploadable artifacts.
///
/// At most one camera stream is active at a time: acquiring a new stream stops the
/// previous one before the new one is opened.
pub struct MediaCaptureAdapter {
    camera: Arc<dyn CameraDevice>,
    detector: Arc<dyn FaceDetector>,
    authenticator: Arc<dyn PlatformAuthenticator>,
    settings: CaptureSettings,
    slot: StreamSlot,
    next_stream: AtomicU64,
}

impl MediaCaptureAdapter {
    pub fn new(
        camera: Arc<dyn CameraDevice>,
        detector: Arc<dyn FaceDetector>,
        authenticator: Arc<dyn PlatformAuthenticator>,
        settings: CaptureSettings,
    ) -> Self {
        Self {
            camera,
            detector,
            authenticator,
            settings,
            slot: Arc::new(Mutex::new(None)),
            next_stream: AtomicU64::new(1),
        }
    }

    pub fn acquire_stream(&self, facing: CameraFacing) -> Result<StreamHandle, CaptureError> {
        let mut guard = lock_slot(&self.slot);
        if let Some(previous) = guard.take() {
            stop_stream(previous);
        }

        let source = self.camera.open(facing)?;
        let id = self.next_stream.fetch_add(1, Ordering::Relaxed);
        debug!(stream = id, ?facing, "camera stream started");
        *guard = Some(ActiveStream { id, facing, source });

        Ok(StreamHandle {
            id,
            slot: self.slot.clone(),
        })
    }

    pub fn has_active_stream(&self) -> bool {
        lock_slot(&self.slot).is_some()
    }

    /// Grab the current frame of a document stream as-is.
    pub fn capture_document(
        &self,
        handle: &StreamHandle,
        side: DocumentSide,
    ) -> Result<CapturedArtifact, CaptureError> {
        let frame = handle.grab()?.ok_or(CaptureError::NothingCaptured)?;
        Ok(CapturedArtifact::new(
            ArtifactKind::Document(side),
            frame.media_type,
            frame.bytes,
        ))
    }

    /// Grab a frame and accept it as soon as any face is detected in it.
    ///
    /// Used for both the face photo and the live photo. The liveness prompts shown while
    /// the stream runs are advisory only; they do not gate this capture.
    pub fn capture_face(
        &self,
        handle: &StreamHandle,
        kind: BiometricKind,
    ) -> Result<CapturedArtifact, CaptureError> {
        let frame = handle.grab()?.ok_or(CaptureError::NothingCaptured)?;
        if self.detector.detect(&frame).is_none() {
            return Err(CaptureError::NothingCaptured);
        }
        Ok(CapturedArtifact::new(
            ArtifactKind::Biometric(kind),
            frame.media_type,
            frame.bytes,
        ))
    }

    /// Start the advisory face-presence poll for a stream. Dropping the monitor cancels it.
    pub fn watch_liveness(&self, handle: &StreamHandle) -> LivenessMonitor {
        LivenessMonitor::spawn(
            handle.probe(),
            self.detector.clone(),
            self.settings.face_poll_interval,
        )
    }

    /// Run a platform-authenticator ceremony and derive a credential token from it.
    pub async fn capture_fingerprint(
        &self,
        subject: &SubjectId,
    ) -> Result<CapturedArtifact, CaptureError> {
        let challenge = uuid::Uuid::new_v4();
        let ceremony = self
            .authenticator
            .get_assertion(subject, challenge.as_bytes());
        let assertion = tokio::time::timeout(self.settings.authenticator_timeout, ceremony)
            .await
            .map_err(|_| CaptureError::TimedOut)??
            .ok_or(CaptureError::NothingCaptured)?;

        let payload = serde_json::json!({
            "credentialToken": credential_token(&assertion),
            "capturedAt": chrono::Utc::now(),
        });
        Ok(CapturedArtifact::new(
            ArtifactKind::Biometric(BiometricKind::Fingerprint),
            mime::APPLICATION_JSON,
            payload.to_string().into_bytes(),
        ))
    }
}
