//! One chat turn end to end, plus the transcript the chat surface renders.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::bus::{MoodChangeEvent, MoodChangeSource};
use crate::llm_client::CompanionBackend;
use crate::mood::CanonicalMood;
use crate::response::{classify_support, ParsedAiResponse, ResponseProcessor, SupportType};

pub const GREETING_TEXT: &str = "Hello! I'm your personal AI mental health assistant. \
I'm here to listen, understand, and provide personalized support. \
I can also notice your mood from our conversation and adjust the theme to match. \
How are you feeling today?";

#[derive(Debug, Clone)]
pub struct ChatReply {
    pub user_message: String,
    pub parsed: ParsedAiResponse,
    pub support: SupportType,
    /// The backend call failed and `parsed` is the apology fallback.
    pub degraded: bool,
    pub received_at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct Companion {
    backend: Arc<dyn CompanionBackend>,
    processor: ResponseProcessor,
}

impl Companion {
    pub fn new(backend: Arc<dyn CompanionBackend>, processor: ResponseProcessor) -> Self {
        Self { backend, processor }
    }

    /// Ask the backend and process its reply. Never fails: backend errors
    /// become the apology reply with no mood and no crisis flag.
    pub async fn respond(&self, user_message: &str) -> ChatReply {
        let (parsed, degraded) = match self.backend.generate(user_message).await {
            Ok(envelope) => (self.processor.process_envelope(envelope), false),
            Err(e) => {
                tracing::error!("Generative backend call failed: {:#}", e);
                (ParsedAiResponse::apology(), true)
            }
        };

        let support = classify_support(user_message, parsed.is_crisis);
        if parsed.is_crisis {
            tracing::warn!("Backend flagged the latest message as a crisis");
        }

        ChatReply {
            user_message: user_message.to_string(),
            parsed,
            support,
            degraded,
            received_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageSender {
    User,
    Assistant,
}

#[derive(Debug, Clone, Serialize)]
pub struct TranscriptMessage {
    pub id: Uuid,
    pub sender: MessageSender,
    pub text: String,
    pub timestamp: DateTime<Utc>,
    pub support_type: Option<SupportType>,
    pub detected_mood: Option<CanonicalMood>,
}

impl TranscriptMessage {
    fn new(sender: MessageSender, text: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            sender,
            text: text.into(),
            timestamp: Utc::now(),
            support_type: None,
            detected_mood: None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ChatTranscript {
    messages: Vec<TranscriptMessage>,
}

impl ChatTranscript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> &[TranscriptMessage] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Record an outgoing message. The very first message of a conversation
    /// is preceded by the greeting.
    pub fn push_user(&mut self, text: &str) -> &TranscriptMessage {
        if self.messages.is_empty() {
            let mut greeting = TranscriptMessage::new(MessageSender::Assistant, GREETING_TEXT);
            greeting.detected_mood = Some(CanonicalMood::Neutral);
            self.messages.push(greeting);
        }
        self.push(TranscriptMessage::new(MessageSender::User, text))
    }

    pub fn push_reply(&mut self, reply: &ChatReply) -> &TranscriptMessage {
        let mut message = TranscriptMessage::new(MessageSender::Assistant, reply.parsed.display_text.clone());
        if !reply.degraded {
            message.support_type = Some(reply.support);
            message.detected_mood = reply.parsed.mood;
        }
        self.push(message)
    }

    /// Assistant-side notice for a mood the model detected.
    pub fn push_mood_notice(&mut self, event: &MoodChangeEvent) -> Option<&TranscriptMessage> {
        if event.source != MoodChangeSource::Detected {
            return None;
        }
        let mut notice = TranscriptMessage::new(MessageSender::Assistant, mood_notice_text(event.new_mood));
        notice.support_type = Some(SupportType::Emotional);
        notice.detected_mood = Some(event.new_mood);
        Some(self.push(notice))
    }

    fn push(&mut self, message: TranscriptMessage) -> &TranscriptMessage {
        self.messages.push(message);
        &self.messages[self.messages.len() - 1]
    }
}

pub fn mood_notice_text(mood: CanonicalMood) -> String {
    format!(
        "I detected your mood as \"{}\" and adjusted the theme colors to match. \
         The interface now reflects your emotional state.",
        mood
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::response::{AiResponseEnvelope, APOLOGY_TEXT};
    use async_trait::async_trait;

    struct ScriptedBackend {
        reply: Option<&'static str>,
    }

    #[async_trait]
    impl CompanionBackend for ScriptedBackend {
        async fn generate(&self, _user_message: &str) -> anyhow::Result<AiResponseEnvelope> {
            match self.reply {
                Some(text) => Ok(AiResponseEnvelope::new(text)),
                None => anyhow::bail!("connection refused"),
            }
        }
    }

    fn companion(reply: Option<&'static str>) -> Companion {
        Companion::new(Arc::new(ScriptedBackend { reply }), ResponseProcessor::default())
    }

    #[tokio::test]
    async fn successful_reply_is_processed() {
        let reply = companion(Some(
            "That sounds like a lot. Let's take it one step at a time.\n\n{\"user_mood_analysis\": \"Stressed\", \"crisis_detected\": \"false\"}",
        ))
        .respond("How do I handle three deadlines?")
        .await;

        assert!(!reply.degraded);
        assert_eq!(reply.parsed.display_text, "That sounds like a lot. Let's take it one step at a time.");
        assert_eq!(reply.parsed.mood, Some(CanonicalMood::Stressed));
        assert_eq!(reply.support, SupportType::Practical);
    }

    #[tokio::test]
    async fn backend_failure_becomes_apology() {
        let reply = companion(None).respond("hello").await;
        assert!(reply.degraded);
        assert_eq!(reply.parsed.display_text, APOLOGY_TEXT);
        assert_eq!(reply.parsed.mood, None);
        assert!(!reply.parsed.is_crisis);
    }

    #[tokio::test]
    async fn crisis_flag_sets_support_type() {
        let reply = companion(Some(
            "Please contact a crisis line now.\n{\"user_mood_analysis\": \"Sad\", \"crisis_detected\": \"true\"}",
        ))
        .respond("I can't go on")
        .await;
        assert!(reply.parsed.is_crisis);
        assert_eq!(reply.support, SupportType::Crisis);
    }

    #[tokio::test]
    async fn transcript_greets_once_and_records_reply() {
        let mut transcript = ChatTranscript::new();
        transcript.push_user("hi");
        transcript.push_user("still there?");
        assert_eq!(transcript.len(), 3);
        assert_eq!(transcript.messages()[0].text, GREETING_TEXT);
        assert_eq!(transcript.messages()[0].sender, MessageSender::Assistant);

        let reply = companion(Some("Yes, I'm here.\n{\"user_mood_analysis\": \"Neutral\"}"))
            .respond("still there?")
            .await;
        let message = transcript.push_reply(&reply);
        assert_eq!(message.text, "Yes, I'm here.");
        assert_eq!(message.detected_mood, Some(CanonicalMood::Neutral));
        assert_eq!(message.support_type, Some(SupportType::Emotional));
    }

    #[test]
    fn mood_notice_only_for_detected_changes() {
        let mut transcript = ChatTranscript::new();
        let selected = MoodChangeEvent {
            new_mood: CanonicalMood::Happy,
            previous_mood: Some(CanonicalMood::Calm),
            source: MoodChangeSource::UserSelection,
        };
        assert!(transcript.push_mood_notice(&selected).is_none());

        let detected = MoodChangeEvent {
            source: MoodChangeSource::Detected,
            ..selected
        };
        let notice = transcript.push_mood_notice(&detected).expect("notice");
        assert!(notice.text.contains("\"happy\""));
        assert_eq!(notice.detected_mood, Some(CanonicalMood::Happy));
    }
}
