//! Separates the human-readable part of a model reply from the sentiment
//! payload the persona prompt asks the model to append.
//!
//! The split is a heuristic: the first `{` or code fence after some leading
//! prose is taken as the start of the payload. A brace that genuinely belongs
//! to the prose will make the payload unparsable, which downstream treats as
//! "no classification".

use serde_json::{Map, Value};

pub type StructuredPayload = Map<String, Value>;

const FENCE: &str = "```";

#[derive(Debug, Clone, PartialEq)]
pub struct SplitResponse {
    pub display_text: String,
    pub structured_payload: Option<StructuredPayload>,
}

/// Byte offset of the first payload delimiter (`{` or a code fence), if any.
pub fn find_payload_start(raw: &str) -> Option<usize> {
    match (raw.find('{'), raw.find(FENCE)) {
        (Some(brace), Some(fence)) => Some(brace.min(fence)),
        (brace, fence) => brace.or(fence),
    }
}

pub fn split_response(raw: &str) -> SplitResponse {
    match find_payload_start(raw) {
        Some(start) if start > 0 => {
            let structured_payload = parse_payload(&raw[start..]);
            if structured_payload.is_none() {
                tracing::debug!("Reply had a payload delimiter at {} but no parsable object", start);
            }
            SplitResponse {
                display_text: raw[..start].trim().to_string(),
                structured_payload,
            }
        }
        _ => SplitResponse {
            display_text: raw.trim().to_string(),
            structured_payload: None,
        },
    }
}

/// Best-effort payload extraction from the text starting at a delimiter.
///
/// Tries, in order: the whole (unfenced) fragment, the first JSON value with
/// trailing text ignored, and the outermost `{ ... }` slice. Only objects
/// count; never fails outward.
pub fn parse_payload(fragment: &str) -> Option<StructuredPayload> {
    let unfenced = strip_fence(fragment).trim();
    if unfenced.is_empty() {
        return None;
    }

    if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(unfenced) {
        return Some(map);
    }

    if let Some(Ok(Value::Object(map))) = serde_json::Deserializer::from_str(unfenced)
        .into_iter::<Value>()
        .next()
    {
        return Some(map);
    }

    let start = unfenced.find('{')?;
    let end = unfenced.rfind('}')?;
    if end <= start {
        return None;
    }

    match serde_json::from_str::<Value>(&unfenced[start..=end]) {
        Ok(Value::Object(map)) => Some(map),
        Ok(_) => None,
        Err(e) => {
            tracing::debug!("Structured payload is malformed: {}", e);
            None
        }
    }
}

/// Payload search over an entire reply, including a payload at index 0.
pub fn payload_from_raw(raw: &str) -> Option<StructuredPayload> {
    let start = find_payload_start(raw)?;
    parse_payload(&raw[start..])
}

fn strip_fence(fragment: &str) -> &str {
    let trimmed = fragment.trim_start();
    let Some(rest) = trimmed.strip_prefix(FENCE) else {
        return fragment;
    };
    let rest = rest
        .strip_prefix("json")
        .or_else(|| rest.strip_prefix("JSON"))
        .unwrap_or(rest);
    match rest.find(FENCE) {
        Some(end) => &rest[..end],
        None => rest,
    }
}
