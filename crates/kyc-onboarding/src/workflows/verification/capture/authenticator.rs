use async_trait::async_trait;
use sha2::{Digest, Sha256};

use super::super::domain::SubjectId;
use super::CaptureError;

/// Result of a platform-authenticator (WebAuthn) assertion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatorAssertion {
    pub credential_id: Vec<u8>,
    pub authenticator_data: Vec<u8>,
    pub signature: Vec<u8>,
}

/// Platform authenticator port. `Ok(None)` means the user dismissed the ceremony.
#[async_trait]
pub trait PlatformAuthenticator: Send + Sync {
    async fn get_assertion(
        &self,
        subject: &SubjectId,
        challenge: &[u8],
    ) -> Result<Option<AuthenticatorAssertion>, CaptureError>;
}

/// Hex SHA-256 over credential id then authenticator data. The signature is not kept.
pub fn credential_token(assertion: &AuthenticatorAssertion) -> String {
    let mut hasher = Sha256::new();
    hasher.update(&assertion.credential_id);
    hasher.update(&assertion.authenticator_data);
    hex::encode(hasher.finalize())
}
