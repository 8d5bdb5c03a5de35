use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Identifier of the person being verified.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SubjectId(pub String);

impl SubjectId {
    /// Filesystem-safe, collision-free rendition used when namespacing drafts and
    /// artifacts. ASCII letters, digits and `-` pass through; every other byte,
    /// `_` included, becomes `_xx` (lowercase hex), so distinct ids never share a
    /// namespace.
    pub fn namespace(&self) -> String {
        if self.0.is_empty() {
            return "_".to_string();
        }
        let mut encoded = String::with_capacity(self.0.len());
        for byte in self.0.bytes() {
            if byte.is_ascii_alphanumeric() || byte == b'-' {
                encoded.push(char::from(byte));
            } else {
                encoded.push_str(&format!("_{byte:02x}"));
            }
        }
        encoded
    }
}

impl fmt::Display for SubjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Opaque storage reference (path or URL) of an uploaded artifact.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ArtifactRef(pub String);

impl ArtifactRef {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ArtifactRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentType {
    Passport,
    NationalId,
    DriversLicense,
}

impl DocumentType {
    pub const fn label(self) -> &'static str {
        match self {
            DocumentType::Passport => "passport",
            DocumentType::NationalId => "national_id",
            DocumentType::DriversLicense => "drivers_license",
        }
    }

    /// Passports are a single page; every card-style document has a back side.
    pub const fn requires_back(self) -> bool {
        !matches!(self, DocumentType::Passport)
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "passport" => Some(Self::Passport),
            "national_id" | "national-id" | "id_card" => Some(Self::NationalId),
            "drivers_license" | "drivers-license" | "driver_license" => {
                Some(Self::DriversLicense)
            }
            _ => None,
        }
    }
}

/// Personal details typed into the first wizard step. Values stay raw until validated.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PersonalInfo {
    pub first_name: String,
    pub last_name: String,
    pub date_of_birth: Option<NaiveDate>,
    pub address: String,
    pub country: String,
    pub zip_code: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentSide {
    Front,
    Back,
}

impl DocumentSide {
    pub const fn label(self) -> &'static str {
        match self {
            DocumentSide::Front => "front",
            DocumentSide::Back => "back",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "front" => Some(Self::Front),
            "back" => Some(Self::Back),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DocumentArtifacts {
    pub front: Option<ArtifactRef>,
    pub back: Option<ArtifactRef>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BiometricKind {
    Face,
    Fingerprint,
    LivePhoto,
}

impl BiometricKind {
    pub const ALL: [BiometricKind; 3] = [
        BiometricKind::Face,
        BiometricKind::Fingerprint,
        BiometricKind::LivePhoto,
    ];

    pub const fn label(self) -> &'static str {
        match self {
            BiometricKind::Face => "face",
            BiometricKind::Fingerprint => "fingerprint",
            BiometricKind::LivePhoto => "live_photo",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "face" => Some(Self::Face),
            "fingerprint" => Some(Self::Fingerprint),
            "live_photo" | "livePhoto" => Some(Self::LivePhoto),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BiometricArtifacts {
    pub face: Option<ArtifactRef>,
    pub fingerprint: Option<ArtifactRef>,
    pub live_photo: Option<ArtifactRef>,
}

impl BiometricArtifacts {
    pub fn get(&self, kind: BiometricKind) -> Option<&ArtifactRef> {
        match kind {
            BiometricKind::Face => self.face.as_ref(),
            BiometricKind::Fingerprint => self.fingerprint.as_ref(),
            BiometricKind::LivePhoto => self.live_photo.as_ref(),
        }
    }

    pub fn set(&mut self, kind: BiometricKind, artifact: ArtifactRef) {
        let slot = match kind {
            BiometricKind::Face => &mut self.face,
            BiometricKind::Fingerprint => &mut self.fingerprint,
            BiometricKind::LivePhoto => &mut self.live_photo,
        };
        *slot = Some(artifact);
    }
}

/// In-progress wizard state for one verification attempt.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct VerificationDraft {
    pub personal_info: PersonalInfo,
    pub document_type: Option<DocumentType>,
    pub document_artifacts: DocumentArtifacts,
    pub biometric_artifacts: BiometricArtifacts,
    pub step_index: usize,
    /// Latest corroboration of the front page, carried into the record at submission.
    pub corroboration: Option<CorroborationResult>,
}

impl VerificationDraft {
    /// Personal fields a document can be compared against.
    pub fn claimed_fields(&self) -> ClaimedFields {
        ClaimedFields::from(&self.personal_info)
    }

    /// Record a document page. Swapping the front page invalidates the previous corroboration.
    pub fn attach_document(&mut self, side: DocumentSide, artifact: ArtifactRef) {
        match side {
            DocumentSide::Front => {
                self.document_artifacts.front = Some(artifact);
                self.corroboration = None;
            }
            DocumentSide::Back => self.document_artifacts.back = Some(artifact),
        }
    }
}

/// Field keys that corroboration knows how to compare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ClaimField {
    FirstName,
    LastName,
    DateOfBirth,
    Address,
    Country,
}

impl ClaimField {
    pub const fn key(self) -> &'static str {
        match self {
            ClaimField::FirstName => "firstName",
            ClaimField::LastName => "lastName",
            ClaimField::DateOfBirth => "dateOfBirth",
            ClaimField::Address => "address",
            ClaimField::Country => "country",
        }
    }
}

/// User-claimed values keyed by field; blank values are omitted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClaimedFields(BTreeMap<ClaimField, String>);

impl ClaimedFields {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, field: ClaimField, value: impl Into<String>) -> Self {
        self.insert(field, value);
        self
    }

    pub fn insert(&mut self, field: ClaimField, value: impl Into<String>) {
        let value = value.into();
        if !value.trim().is_empty() {
            self.0.insert(field, value);
        }
    }

    pub fn get(&self, field: ClaimField) -> Option<&str> {
        self.0.get(&field).map(String::as_str)
    }
}

impl From<&PersonalInfo> for ClaimedFields {
    fn from(info: &PersonalInfo) -> Self {
        let mut claimed = ClaimedFields::new();
        claimed.insert(ClaimField::FirstName, info.first_name.clone());
        claimed.insert(ClaimField::LastName, info.last_name.clone());
        if let Some(dob) = info.date_of_birth {
            claimed.insert(ClaimField::DateOfBirth, dob.format("%Y-%m-%d").to_string());
        }
        claimed.insert(ClaimField::Address, info.address.clone());
        claimed.insert(ClaimField::Country, info.country.clone());
        claimed
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CorroborationStatus {
    Verified,
    NeedsReview,
}

impl CorroborationStatus {
    pub const fn label(self) -> &'static str {
        match self {
            CorroborationStatus::Verified => "verified",
            CorroborationStatus::NeedsReview => "needs_review",
        }
    }
}

/// Outcome of one OCR cross-check; produced once per front-page upload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CorroborationResult {
    pub extracted_fields: BTreeMap<String, String>,
    pub match_score: f64,
    pub status: CorroborationStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationStatus {
    Pending,
    Verified,
    NeedsReview,
    Rejected,
}

impl VerificationStatus {
    pub const fn label(self) -> &'static str {
        match self {
            VerificationStatus::Pending => "pending",
            VerificationStatus::Verified => "verified",
            VerificationStatus::NeedsReview => "needs_review",
            VerificationStatus::Rejected => "rejected",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(pub String);

impl RecordId {
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Durable verification record created from a complete draft.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationRecord {
    pub id: RecordId,
    pub subject_id: SubjectId,
    pub document_type: DocumentType,
    pub form_snapshot: VerificationDraft,
    pub ocr_data: BTreeMap<String, String>,
    pub match_score: Option<f64>,
    pub status: VerificationStatus,
    pub created_at: DateTime<Utc>,
}

impl VerificationRecord {
    pub fn status_view(&self) -> VerificationStatusView {
        VerificationStatusView {
            record_id: self.id.clone(),
            subject_id: self.subject_id.clone(),
            document_type: self.document_type.label(),
            status: self.status.label(),
            match_score: self.match_score,
            corroboration: self
                .form_snapshot
                .corroboration
                .as_ref()
                .map(|result| result.status.label()),
            created_at: self.created_at,
        }
    }
}

/// Sanitized record representation returned to callers; omits the form snapshot.
#[derive(Debug, Clone, Serialize)]
pub struct VerificationStatusView {
    pub record_id: RecordId,
    pub subject_id: SubjectId,
    pub document_type: &'static str,
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub match_score: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub corroboration: Option<&'static str>,
    pub created_at: DateTime<Utc>,
}
