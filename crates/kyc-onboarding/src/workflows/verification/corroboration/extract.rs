use std::collections::BTreeMap;

use super::super::domain::ClaimField;

/// Labels that introduce one field's value on a document line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldLabel {
    pub field: ClaimField,
    pub labels: Vec<String>,
}

impl FieldLabel {
    pub fn new(field: ClaimField, labels: &[&str]) -> Self {
        Self {
            field,
            labels: labels.iter().map(|label| label.to_lowercase()).collect(),
        }
    }
}

/// Case-insensitive line-label extractor over raw OCR text.
///
/// A line containing a label has that label removed; the remainder, trimmed of
/// whitespace and separator punctuation, is the value. The first line that yields a
/// non-empty value wins for each field. Values are lowercased.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldExtractor {
    labels: Vec<FieldLabel>,
}

impl Default for FieldExtractor {
    fn default() -> Self {
        Self::new(vec![
            FieldLabel::new(ClaimField::FirstName, &["first name", "given name"]),
            FieldLabel::new(ClaimField::Country, &["country", "nationality"]),
        ])
    }
}

impl FieldExtractor {
    pub fn new(labels: Vec<FieldLabel>) -> Self {
        Self { labels }
    }

    pub fn labels(&self) -> &[FieldLabel] {
        &self.labels
    }

    pub fn extract(&self, text: &str) -> BTreeMap<ClaimField, String> {
        let mut extracted = BTreeMap::new();

        for line in text.lines() {
            let lowered = line.to_lowercase();
            for entry in &self.labels {
                if extracted.contains_key(&entry.field) {
                    continue;
                }
                let value = entry
                    .labels
                    .iter()
                    .filter(|label| lowered.contains(label.as_str()))
                    .map(|label| strip_label(&lowered, label))
                    .find(|value| !value.is_empty());
                if let Some(value) = value {
                    extracted.insert(entry.field, value);
                }
            }
        }

        extracted
    }
}

fn strip_label(line: &str, label: &str) -> String {
    line.replacen(label, "", 1)
        .trim_matches(|ch: char| ch.is_whitespace() || matches!(ch, ':' | '-' | '/' | '|'))
        .to_string()
}
