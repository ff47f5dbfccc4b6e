//! Narrow extraction of the model's crisis flag.
//!
//! The upstream payload encodes booleans as quoted strings, so the flag is
//! asserted only by the exact string `"true"`. A JSON `true`, `"True"`, or
//! any other value reads as not asserted. Nothing is inferred from prose.

use serde_json::Value;

use super::splitter::{payload_from_raw, StructuredPayload};

pub const CRISIS_FIELD: &str = "crisis_detected";
const CRISIS_ASSERTED: &str = "true";

pub fn detect_crisis(payload: Option<&StructuredPayload>) -> bool {
    matches!(
        payload.and_then(|p| p.get(CRISIS_FIELD)),
        Some(Value::String(flag)) if flag == CRISIS_ASSERTED
    )
}

/// Same rule applied to a whole reply, for callers that only hold raw text.
pub fn detect_crisis_in_raw(raw: &str) -> bool {
    detect_crisis(payload_from_raw(raw).as_ref())
}
