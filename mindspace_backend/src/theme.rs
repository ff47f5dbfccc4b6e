//! Fixed visual token sets, one per mood.

use std::sync::{Arc, Mutex};

use serde::Serialize;

use crate::bus::{MoodChannel, Subscription};
use crate::mood::CanonicalMood;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ThemeDescriptor {
    pub primary_color: &'static str,
    pub secondary_color: &'static str,
    pub accent_color: &'static str,
    pub gradient: &'static str,
    pub muted_text_color: &'static str,
    pub background_gradient: &'static str,
}

const HAPPY: ThemeDescriptor = ThemeDescriptor {
    primary_color: "rgb(255, 193, 7)",
    secondary_color: "rgb(255, 152, 0)",
    accent_color: "rgb(255, 235, 59)",
    gradient: "linear-gradient(135deg, rgb(255, 193, 7) 0%, rgb(255, 152, 0) 100%)",
    muted_text_color: "rgb(251, 140, 0)",
    background_gradient: "linear-gradient(135deg, rgb(255, 248, 225) 0%, rgb(255, 243, 205) 100%)",
};

const CALM: ThemeDescriptor = ThemeDescriptor {
    primary_color: "rgb(33, 150, 243)",
    secondary_color: "rgb(0, 188, 212)",
    accent_color: "rgb(129, 199, 221)",
    gradient: "linear-gradient(135deg, rgb(33, 150, 243) 0%, rgb(0, 188, 212) 100%)",
    muted_text_color: "rgb(3, 169, 244)",
    background_gradient: "linear-gradient(135deg, rgb(227, 242, 253) 0%, rgb(207, 232, 252) 100%)",
};

const SAD: ThemeDescriptor = ThemeDescriptor {
    primary_color: "rgb(103, 58, 183)",
    secondary_color: "rgb(63, 81, 181)",
    accent_color: "rgb(159, 168, 218)",
    gradient: "linear-gradient(135deg, rgb(103, 58, 183) 0%, rgb(63, 81, 181) 100%)",
    muted_text_color: "rgb(92, 107, 192)",
    background_gradient: "linear-gradient(135deg, rgb(237, 231, 246) 0%, rgb(225, 217, 240) 100%)",
};

const ANXIOUS: ThemeDescriptor = ThemeDescriptor {
    primary_color: "rgb(76, 175, 80)",
    secondary_color: "rgb(0, 150, 136)",
    accent_color: "rgb(165, 214, 167)",
    gradient: "linear-gradient(135deg, rgb(76, 175, 80) 0%, rgb(0, 150, 136) 100%)",
    muted_text_color: "rgb(26, 169, 133)",
    background_gradient: "linear-gradient(135deg, rgb(232, 245, 233) 0%, rgb(200, 230, 201) 100%)",
};

const STRESSED: ThemeDescriptor = ThemeDescriptor {
    primary_color: "rgb(255, 138, 128)",
    secondary_color: "rgb(255, 171, 145)",
    accent_color: "rgb(255, 204, 188)",
    gradient: "linear-gradient(135deg, rgb(255, 138, 128) 0%, rgb(255, 171, 145) 100%)",
    muted_text_color: "rgb(255, 112, 67)",
    background_gradient: "linear-gradient(135deg, rgb(255, 243, 237) 0%, rgb(255, 235, 225) 100%)",
};

const NEUTRAL: ThemeDescriptor = ThemeDescriptor {
    primary_color: "rgb(158, 158, 158)",
    secondary_color: "rgb(189, 189, 189)",
    accent_color: "rgb(224, 224, 224)",
    gradient: "linear-gradient(135deg, rgb(158, 158, 158) 0%, rgb(189, 189, 189) 100%)",
    muted_text_color: "rgb(117, 117, 117)",
    background_gradient: "linear-gradient(135deg, rgb(250, 250, 250) 0%, rgb(245, 245, 245) 100%)",
};

pub fn resolve(mood: CanonicalMood) -> &'static ThemeDescriptor {
    match mood {
        CanonicalMood::Happy => &HAPPY,
        CanonicalMood::Calm => &CALM,
        CanonicalMood::Sad => &SAD,
        CanonicalMood::Anxious => &ANXIOUS,
        CanonicalMood::Stressed => &STRESSED,
        CanonicalMood::Neutral => &NEUTRAL,
    }
}

impl ThemeDescriptor {
    /// Custom-property pairs in the order a stylesheet would declare them.
    pub fn css_variables(&self) -> [(&'static str, &'static str); 6] {
        [
            ("--mood-primary", self.primary_color),
            ("--mood-secondary", self.secondary_color),
            ("--mood-accent", self.accent_color),
            ("--mood-gradient", self.gradient),
            ("--mood-text-light", self.muted_text_color),
            ("--mood-background", self.background_gradient),
        ]
    }

    pub fn fields(&self) -> [&'static str; 6] {
        self.css_variables().map(|(_, value)| value)
    }
}

/// Parse the `rgb(r, g, b)` color strings used by the theme table.
pub fn rgb_components(color: &str) -> Option<(u8, u8, u8)> {
    let inner = color.trim().strip_prefix("rgb(")?.strip_suffix(')')?;
    let mut parts = inner.split(',').map(|part| part.trim().parse::<u8>());
    let r = parts.next()?.ok()?;
    let g = parts.next()?.ok()?;
    let b = parts.next()?.ok()?;
    if parts.next().is_some() {
        return None;
    }
    Some((r, g, b))
}

/// The applied theme of one surface, kept current by a channel subscription.
#[derive(Clone)]
pub struct ThemeState {
    active: Arc<Mutex<(CanonicalMood, &'static ThemeDescriptor)>>,
}

impl ThemeState {
    pub fn new(initial: CanonicalMood) -> Self {
        Self {
            active: Arc::new(Mutex::new((initial, resolve(initial)))),
        }
    }

    pub fn apply(&self, mood: CanonicalMood) {
        let mut active = self
            .active
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *active = (mood, resolve(mood));
        tracing::debug!("Applied {} theme (primary {})", mood, active.1.primary_color);
    }

    pub fn active(&self) -> (CanonicalMood, &'static ThemeDescriptor) {
        *self
            .active
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn attach(&self, channel: &MoodChannel) -> Subscription {
        let state = self.clone();
        channel.subscribe(move |event| state.apply(event.new_mood))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::MoodChangeSource;

    #[test]
    fn every_mood_has_a_complete_descriptor() {
        for mood in CanonicalMood::ALL {
            let theme = resolve(mood);
            for value in theme.fields() {
                assert!(!value.trim().is_empty(), "{mood} has an empty token");
            }
        }
    }

    #[test]
    fn descriptors_are_distinct() {
        let primaries: std::collections::HashSet<_> = CanonicalMood::ALL
            .into_iter()
            .map(|mood| resolve(mood).primary_color)
            .collect();
        assert_eq!(primaries.len(), 6);
    }

    #[test]
    fn solid_colors_parse_as_rgb() {
        for mood in CanonicalMood::ALL {
            let theme = resolve(mood);
            assert!(rgb_components(theme.primary_color).is_some());
            assert!(rgb_components(theme.muted_text_color).is_some());
        }
        assert_eq!(rgb_components("rgb(1, 2, 3)"), Some((1, 2, 3)));
        assert_eq!(rgb_components("rgb(1, 2)"), None);
        assert_eq!(rgb_components("#ffffff"), None);
    }

    #[test]
    fn theme_state_follows_channel() {
        let channel = MoodChannel::new(Some(CanonicalMood::Calm));
        let theme = ThemeState::new(CanonicalMood::Calm);
        let sub = theme.attach(&channel);

        channel.publish(CanonicalMood::Stressed, MoodChangeSource::Detected);
        let (mood, descriptor) = theme.active();
        assert_eq!(mood, CanonicalMood::Stressed);
        assert_eq!(descriptor, resolve(CanonicalMood::Stressed));

        sub.unsubscribe();
        channel.publish(CanonicalMood::Happy, MoodChangeSource::Detected);
        assert_eq!(theme.active().0, CanonicalMood::Stressed);
    }
}
