pub mod classifier;
pub mod crisis;
pub mod sanitize;
pub mod splitter;

use serde::{Deserialize, Serialize};

use crate::mood::CanonicalMood;
use splitter::StructuredPayload;

/// Shown in place of a reply when the backend call fails.
pub const APOLOGY_TEXT: &str = "Sorry, I am having trouble responding right now.";

/// Raw text of one backend reply. Consumed by [`ResponseProcessor`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AiResponseEnvelope {
    pub raw_text: String,
}

impl AiResponseEnvelope {
    pub fn new(raw_text: impl Into<String>) -> Self {
        Self {
            raw_text: raw_text.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParsedAiResponse {
    pub display_text: String,
    pub structured_payload: Option<StructuredPayload>,
    pub mood: Option<CanonicalMood>,
    pub is_crisis: bool,
}

impl ParsedAiResponse {
    /// Degraded result used for backend failures.
    pub fn apology() -> Self {
        Self {
            display_text: APOLOGY_TEXT.to_string(),
            structured_payload: None,
            mood: None,
            is_crisis: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SupportType {
    Emotional,
    Practical,
    Crisis,
}

impl SupportType {
    pub fn as_str(self) -> &'static str {
        match self {
            SupportType::Emotional => "emotional",
            SupportType::Practical => "practical",
            SupportType::Crisis => "crisis",
        }
    }
}

/// Tag a reply for presentation. Crisis always wins; otherwise the user's own
/// wording decides between practical and emotional support.
pub fn classify_support(user_message: &str, is_crisis: bool) -> SupportType {
    if is_crisis {
        return SupportType::Crisis;
    }
    let lowered = user_message.to_lowercase();
    if ["how", "what should", "help me"]
        .iter()
        .any(|cue| lowered.contains(cue))
    {
        SupportType::Practical
    } else {
        SupportType::Emotional
    }
}

#[derive(Debug, Clone)]
pub struct ResponseProcessor {
    strip_artifacts: bool,
}

impl Default for ResponseProcessor {
    fn default() -> Self {
        Self::new(true)
    }
}

impl ResponseProcessor {
    pub fn new(strip_artifacts: bool) -> Self {
        Self { strip_artifacts }
    }

    pub fn process_envelope(&self, envelope: AiResponseEnvelope) -> ParsedAiResponse {
        self.process(&envelope.raw_text)
    }

    /// Split the reply, then classify mood and crisis from the same payload.
    pub fn process(&self, raw_text: &str) -> ParsedAiResponse {
        let split = splitter::split_response(raw_text);
        let payload = split.structured_payload.as_ref();

        let mood = classifier::classify_mood(payload);
        let is_crisis = crisis::detect_crisis(payload);

        let display_text = if self.strip_artifacts {
            sanitize::strip_transcript_artifacts(&split.display_text)
        } else {
            split.display_text
        };

        tracing::debug!(
            "Processed reply: payload={} mood={:?} crisis={}",
            payload.is_some(),
            mood,
            is_crisis
        );

        ParsedAiResponse {
            display_text,
            structured_payload: split.structured_payload,
            mood,
            is_crisis,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hello_there_roundtrip_yields_calm() {
        let parsed = ResponseProcessor::default()
            .process("Hello there!\n\n{\"user_mood_analysis\":\"Calm\"}");
        assert_eq!(parsed.display_text, "Hello there!");
        assert!(parsed.structured_payload.is_some());
        assert_eq!(parsed.mood, Some(CanonicalMood::Calm));
        assert!(!parsed.is_crisis);
    }

    #[test]
    fn reply_without_payload_is_neutral_passthrough() {
        let parsed = ResponseProcessor::default().process("Just checking in.");
        assert_eq!(parsed.display_text, "Just checking in.");
        assert_eq!(parsed.mood, None);
        assert!(!parsed.is_crisis);
        assert!(parsed.structured_payload.is_none());
    }

    #[test]
    fn crisis_reply_with_nested_analysis() {
        let raw = "I'm very concerned about what you're sharing. Please reach out to a crisis helpline immediately.\n\n{\n  \"mental_state_detected\": \"Sad\",\n  \"user_mood_analysis\": \"Depressed\",\n  \"sentiment_emotion_analysis\": {\n    \"tone\": \"Negative\",\n    \"stress_level\": \"High\"\n  },\n  \"crisis_detected\": \"true\"\n}";
        let parsed = ResponseProcessor::default().process_envelope(AiResponseEnvelope::new(raw));
        assert_eq!(parsed.mood, Some(CanonicalMood::Sad));
        assert!(parsed.is_crisis);
        assert!(!parsed.display_text.contains("crisis_detected"));
    }

    #[test]
    fn malformed_payload_degrades_to_no_classification() {
        let parsed = ResponseProcessor::default()
            .process("Keep going, you're doing great.\n{\"user_mood_analysis\": Happy}");
        assert_eq!(parsed.display_text, "Keep going, you're doing great.");
        assert_eq!(parsed.mood, None);
        assert!(!parsed.is_crisis);
    }

    #[test]
    fn artifact_stripping_can_be_disabled() {
        let raw = "04:06 PM See you at 10:30 tomorrow. practical\n{\"user_mood_analysis\": \"Okay\"}";
        let kept = ResponseProcessor::new(false).process(raw);
        assert_eq!(kept.display_text, "04:06 PM See you at 10:30 tomorrow. practical");
        assert_eq!(kept.mood, Some(CanonicalMood::Neutral));

        let stripped = ResponseProcessor::new(true).process(raw);
        assert_eq!(stripped.display_text, "See you at 10:30 tomorrow.");
    }

    #[test]
    fn default_cleanup_keeps_times_in_the_reply() {
        let parsed = ResponseProcessor::default().process(
            "Your counselling slot is at 10:30 tomorrow, see you then.\n\n{\"user_mood_analysis\": \"Calm\"}",
        );
        assert_eq!(
            parsed.display_text,
            "Your counselling slot is at 10:30 tomorrow, see you then."
        );
        assert_eq!(parsed.mood, Some(CanonicalMood::Calm));
    }

    #[test]
    fn support_type_prefers_crisis_then_practical_cues() {
        assert_eq!(classify_support("How do I sleep better?", true), SupportType::Crisis);
        assert_eq!(classify_support("How do I sleep better?", false), SupportType::Practical);
        assert_eq!(classify_support("Please help me plan", false), SupportType::Practical);
        assert_eq!(classify_support("I feel lonely", false), SupportType::Emotional);
    }

    #[test]
    fn apology_is_never_a_crisis() {
        let apology = ParsedAiResponse::apology();
        assert_eq!(apology.display_text, APOLOGY_TEXT);
        assert_eq!(apology.mood, None);
        assert!(!apology.is_crisis);
    }
}
