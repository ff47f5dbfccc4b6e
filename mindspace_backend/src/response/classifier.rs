//! Maps the model's free-form mood label onto a [`CanonicalMood`].
//!
//! Matching is substring-based over an ordered keyword table and the first
//! hit wins. The order is the tie-break policy: a label mentioning both
//! "stress" and "calm" resolves to `stressed` because the stress keywords
//! are checked first.

use serde_json::Value;

use super::splitter::StructuredPayload;
use crate::mood::CanonicalMood;

pub const PRIMARY_MOOD_FIELD: &str = "user_mood_analysis";
pub const FALLBACK_MOOD_FIELD: &str = "mental_state_detected";

pub const MOOD_KEYWORDS: &[(&str, CanonicalMood)] = &[
    ("stressed", CanonicalMood::Stressed),
    ("stress", CanonicalMood::Stressed),
    ("calm", CanonicalMood::Calm),
    ("peaceful", CanonicalMood::Calm),
    ("relaxed", CanonicalMood::Calm),
    ("sad", CanonicalMood::Sad),
    ("depressed", CanonicalMood::Sad),
    ("down", CanonicalMood::Sad),
    ("anxious", CanonicalMood::Anxious),
    ("anxiety", CanonicalMood::Anxious),
    ("worried", CanonicalMood::Anxious),
    ("nervous", CanonicalMood::Anxious),
    ("happy", CanonicalMood::Happy),
    ("joy", CanonicalMood::Happy),
    ("excited", CanonicalMood::Happy),
    ("positive", CanonicalMood::Happy),
    ("neutral", CanonicalMood::Neutral),
    ("normal", CanonicalMood::Neutral),
    ("okay", CanonicalMood::Neutral),
];

pub fn classify_mood(payload: Option<&StructuredPayload>) -> Option<CanonicalMood> {
    let label = mood_label(payload?)?;
    classify_label(label)
}

/// First-match-wins keyword lookup on a lower-cased label.
pub fn classify_label(label: &str) -> Option<CanonicalMood> {
    let lowered = label.to_lowercase();
    MOOD_KEYWORDS
        .iter()
        .find(|(keyword, _)| lowered.contains(keyword))
        .map(|(_, mood)| *mood)
}

// The primary field wins whenever it holds anything meaningful; a value that
// is present but not a string is a malformed payload, not a reason to look
// at the fallback.
fn mood_label(payload: &StructuredPayload) -> Option<&str> {
    let value = [PRIMARY_MOOD_FIELD, FALLBACK_MOOD_FIELD]
        .into_iter()
        .filter_map(|field| payload.get(field))
        .find(|value| is_meaningful(value))?;

    match value {
        Value::String(label) => Some(label.as_str()),
        other => {
            tracing::warn!("Mood field has non-string value: {}", other);
            None
        }
    }
}

fn is_meaningful(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(number) => number.as_f64().map(|n| n != 0.0).unwrap_or(true),
        Value::String(text) => !text.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn payload(value: Value) -> StructuredPayload {
        match value {
            Value::Object(map) => map,
            other => panic!("expected object, got {other}"),
        }
    }

    #[test]
    fn classifies_primary_field() {
        let stressed = payload(json!({"user_mood_analysis": "Stressed"}));
        assert_eq!(classify_mood(Some(&stressed)), Some(CanonicalMood::Stressed));

        let happy = payload(json!({"user_mood_analysis": "Happy"}));
        assert_eq!(classify_mood(Some(&happy)), Some(CanonicalMood::Happy));
    }

    #[test]
    fn absent_payload_is_unclassified() {
        assert_eq!(classify_mood(None), None);
        assert_eq!(classify_mood(Some(&payload(json!({})))), None);
    }

    #[test]
    fn falls_back_to_mental_state_field() {
        let p = payload(json!({"mental_state_detected": "Worried about exams"}));
        assert_eq!(classify_mood(Some(&p)), Some(CanonicalMood::Anxious));

        let empty_primary = payload(json!({
            "user_mood_analysis": "",
            "mental_state_detected": "Relaxed"
        }));
        assert_eq!(classify_mood(Some(&empty_primary)), Some(CanonicalMood::Calm));
    }

    #[test]
    fn primary_field_takes_priority() {
        let p = payload(json!({
            "user_mood_analysis": "Depressed",
            "mental_state_detected": "Happy"
        }));
        assert_eq!(classify_mood(Some(&p)), Some(CanonicalMood::Sad));
    }

    #[test]
    fn earlier_keywords_win_on_overlap() {
        assert_eq!(
            classify_label("calm but stressed"),
            Some(CanonicalMood::Stressed)
        );
        assert_eq!(
            classify_label("sad and anxious"),
            Some(CanonicalMood::Sad)
        );
    }

    #[test]
    fn unknown_or_malformed_labels_are_unclassified() {
        assert_eq!(classify_label("Furious"), None);

        let numeric = payload(json!({"user_mood_analysis": 3}));
        assert_eq!(classify_mood(Some(&numeric)), None);

        let nested = payload(json!({"user_mood_analysis": {"label": "Happy"}}));
        assert_eq!(classify_mood(Some(&nested)), None);
    }
}
