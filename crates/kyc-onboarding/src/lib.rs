//! Identity-verification onboarding: a gated multi-step wizard with persisted drafts,
//! media capture, OCR corroboration of documents and submission into pending records.

pub mod config;
pub mod error;
pub mod telemetry;
pub mod workflows;
