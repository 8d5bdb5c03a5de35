use std::collections::BTreeMap;

use serde::Serialize;

use super::super::domain::ArtifactRef;

/// Field-level validation failures keyed by form field name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<&'static str, String>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single(field: &'static str, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.insert(field, message);
        errors
    }

    pub fn insert(&mut self, field: &'static str, message: impl Into<String>) {
        self.0.entry(field).or_insert_with(|| message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    pub fn fields(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.0.keys().copied()
    }

    pub fn merge(&mut self, other: FieldErrors) {
        for (field, message) in other.0 {
            self.insert(field, message);
        }
    }

    pub fn into_result(self) -> Result<(), FieldErrors> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

pub(crate) fn min_length(
    errors: &mut FieldErrors,
    field: &'static str,
    label: &str,
    value: &str,
    min: usize,
) {
    let length = value.trim().chars().count();
    if length == 0 {
        errors.insert(field, format!("{label} is required"));
    } else if length < min {
        errors.insert(
            field,
            format!("{label} must be at least {min} characters"),
        );
    }
}

pub(crate) fn required_text(errors: &mut FieldErrors, field: &'static str, message: &str, value: &str) {
    if value.trim().is_empty() {
        errors.insert(field, message);
    }
}

pub(crate) fn required<T>(
    errors: &mut FieldErrors,
    field: &'static str,
    message: &str,
    value: Option<&T>,
) {
    if value.is_none() {
        errors.insert(field, message);
    }
}

pub(crate) fn required_artifact(
    errors: &mut FieldErrors,
    field: &'static str,
    message: &str,
    artifact: Option<&ArtifactRef>,
) {
    match artifact {
        Some(reference) if !reference.as_str().trim().is_empty() => {}
        _ => errors.insert(field, message),
    }
}
