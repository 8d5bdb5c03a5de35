use std::collections::BTreeMap;

use super::super::domain::{ClaimField, ClaimedFields, CorroborationResult, CorroborationStatus};
use super::config::CorroborationConfig;
use super::extract::FieldExtractor;

/// Share of comparable fields whose values agree, in `[0, 1]`.
///
/// A field is comparable when it was both extracted and claimed. Values agree when
/// either one, lowercased, contains the other. No comparable fields scores zero.
pub fn match_score(extracted: &BTreeMap<ClaimField, String>, claimed: &ClaimedFields) -> f64 {
    let mut comparable = 0usize;
    let mut matches = 0usize;

    for (field, found) in extracted {
        let Some(claim) = claimed.get(*field) else {
            continue;
        };
        comparable += 1;

        let found = found.trim().to_lowercase();
        let claim = claim.trim().to_lowercase();
        if found.contains(&claim) || claim.contains(&found) {
            matches += 1;
        }
    }

    if comparable == 0 {
        0.0
    } else {
        matches as f64 / comparable as f64
    }
}

pub fn classify(score: f64, config: &CorroborationConfig) -> CorroborationStatus {
    if score > config.verified_threshold {
        CorroborationStatus::Verified
    } else {
        CorroborationStatus::NeedsReview
    }
}

/// Pure corroboration over already-recognized text.
pub fn corroborate_text(
    text: &str,
    claimed: &ClaimedFields,
    extractor: &FieldExtractor,
    config: &CorroborationConfig,
) -> CorroborationResult {
    let extracted = extractor.extract(text);
    let match_score = match_score(&extracted, claimed);

    CorroborationResult {
        extracted_fields: extracted
            .into_iter()
            .map(|(field, value)| (field.key().to_string(), value))
            .collect(),
        match_score,
        status: classify(match_score, config),
    }
}
