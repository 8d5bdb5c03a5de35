//! Media capture: exclusive camera streams, face and liveness capture, platform
//! authenticator ceremonies, and artifact upload to blob storage.

mod authenticator;
mod device;
mod liveness;
mod storage;

pub use authenticator::{credential_token, AuthenticatorAssertion, PlatformAuthenticator};
pub use device::{
    CameraDevice, CameraFacing, CaptureSettings, FaceDetection, FaceDetector, Frame,
    FrameSource, MediaCaptureAdapter, StreamHandle,
};
pub use liveness::{LivenessMonitor, LivenessPrompt, LivenessState};
pub use storage::{
    artifact_prefix, owned_by, ArtifactUploader, BlobStore, FileBlobStore, InMemoryBlobStore,
    StorageError,
};

use mime::Mime;

use super::domain::{BiometricKind, DocumentSide};

/// What a captured artifact represents; decides its storage namespace and name prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    Document(DocumentSide),
    Biometric(BiometricKind),
}

impl ArtifactKind {
    pub const fn namespace(self) -> &'static str {
        match self {
            ArtifactKind::Document(_) => "documents",
            ArtifactKind::Biometric(_) => "biometrics",
        }
    }

    pub const fn slug(self) -> &'static str {
        match self {
            ArtifactKind::Document(side) => side.label(),
            ArtifactKind::Biometric(kind) => kind.label(),
        }
    }
}

/// Content produced by a capture, held only until it is uploaded.
#[derive(Debug, Clone, PartialEq)]
pub struct CapturedArtifact {
    pub kind: ArtifactKind,
    pub media_type: Mime,
    pub bytes: Vec<u8>,
}

impl CapturedArtifact {
    pub fn new(kind: ArtifactKind, media_type: Mime, bytes: Vec<u8>) -> Self {
        Self {
            kind,
            media_type,
            bytes,
        }
    }

    /// Parse a declared content type; only images (and JSON credential tokens) are accepted.
    pub fn from_upload(
        kind: ArtifactKind,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> Result<Self, CaptureError> {
        let media_type: Mime = content_type
            .parse()
            .map_err(|_| CaptureError::UnsupportedMedia(content_type.to_string()))?;
        let accepted = media_type.type_() == mime::IMAGE
            || (kind == ArtifactKind::Biometric(BiometricKind::Fingerprint)
                && media_type.subtype() == mime::JSON);
        if !accepted {
            return Err(CaptureError::UnsupportedMedia(content_type.to_string()));
        }
        if bytes.is_empty() {
            return Err(CaptureError::NothingCaptured);
        }
        Ok(Self::new(kind, media_type, bytes))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    #[error("capture unavailable, please check permissions")]
    PermissionDenied,
    #[error("capture unavailable: {0}")]
    DeviceUnavailable(String),
    #[error("nothing captured")]
    NothingCaptured,
    #[error("capture stream is no longer active")]
    StreamClosed,
    #[error("capture timed out")]
    TimedOut,
    #[error("unsupported media type '{0}'")]
    UnsupportedMedia(String),
}

impl CaptureError {
    /// Permission problems are not worth retrying; everything else is user-paced.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, CaptureError::PermissionDenied)
    }
}
