use mindspace_backend::bus::{MoodChangeEvent, MoodChangeSource};
use mindspace_backend::theme::resolve;

use super::render::paint;

/// Two-line "mood updated" banner for a change the model detected.
/// Manual selections get no banner.
pub fn mood_banner(event: &MoodChangeEvent) -> Option<String> {
    if event.source != MoodChangeSource::Detected {
        return None;
    }
    let theme = resolve(event.new_mood);
    let arrow = match event.previous_mood {
        Some(previous) => format!("{} → {}", previous.emoji(), event.new_mood.emoji()),
        None => event.new_mood.emoji().to_string(),
    };
    Some(format!(
        "{}  {}\n{}",
        arrow,
        paint("Mood Updated", theme.primary_color),
        paint(&format!("AI detected: {}", event.new_mood), theme.muted_text_color)
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use mindspace_backend::mood::CanonicalMood;

    #[test]
    fn banner_shows_transition_for_detected_change() {
        let banner = mood_banner(&MoodChangeEvent {
            new_mood: CanonicalMood::Happy,
            previous_mood: Some(CanonicalMood::Sad),
            source: MoodChangeSource::Detected,
        })
        .expect("banner");
        assert!(banner.starts_with("😢 → 😊"));
        assert!(banner.contains("AI detected: happy"));
    }

    #[test]
    fn no_banner_for_manual_selection() {
        assert!(mood_banner(&MoodChangeEvent {
            new_mood: CanonicalMood::Calm,
            previous_mood: None,
            source: MoodChangeSource::UserSelection,
        })
        .is_none());
    }
}
