use serde::{Deserialize, Serialize};

pub const DEFAULT_VERIFIED_THRESHOLD: f64 = 0.7;

/// Corroboration policy. A score must be strictly above the threshold to verify.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CorroborationConfig {
    pub verified_threshold: f64,
}

impl Default for CorroborationConfig {
    fn default() -> Self {
        Self {
            verified_threshold: DEFAULT_VERIFIED_THRESHOLD,
        }
    }
}
