//! The closed set of moods the application recognizes.
//!
//! Anything coming from outside (the generative backend, persisted storage,
//! user input) has to pass through [`parse_mood`] or the keyword classifier
//! before it can become a [`CanonicalMood`]; unknown strings never flow
//! further as if they were valid.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CanonicalMood {
    Happy,
    Calm,
    Sad,
    Anxious,
    Stressed,
    Neutral,
}

impl CanonicalMood {
    pub const ALL: [CanonicalMood; 6] = [
        CanonicalMood::Happy,
        CanonicalMood::Calm,
        CanonicalMood::Sad,
        CanonicalMood::Anxious,
        CanonicalMood::Stressed,
        CanonicalMood::Neutral,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            CanonicalMood::Happy => "happy",
            CanonicalMood::Calm => "calm",
            CanonicalMood::Sad => "sad",
            CanonicalMood::Anxious => "anxious",
            CanonicalMood::Stressed => "stressed",
            CanonicalMood::Neutral => "neutral",
        }
    }

    pub fn emoji(self) -> &'static str {
        match self {
            CanonicalMood::Happy => "😊",
            CanonicalMood::Calm => "😌",
            CanonicalMood::Sad => "😢",
            CanonicalMood::Anxious => "😰",
            CanonicalMood::Stressed => "😫",
            CanonicalMood::Neutral => "😐",
        }
    }
}

impl Default for CanonicalMood {
    fn default() -> Self {
        CanonicalMood::Calm
    }
}

impl fmt::Display for CanonicalMood {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Validated constructor: accepts only the six canonical names.
pub fn parse_mood(raw: &str) -> Option<CanonicalMood> {
    let normalized = raw.trim().to_ascii_lowercase();
    CanonicalMood::ALL
        .into_iter()
        .find(|mood| mood.as_str() == normalized)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownMood(pub String);

impl fmt::Display for UnknownMood {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown mood '{}'", self.0)
    }
}

impl std::error::Error for UnknownMood {}

impl FromStr for CanonicalMood {
    type Err = UnknownMood;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_mood(s).ok_or_else(|| UnknownMood(s.to_string()))
    }
}
