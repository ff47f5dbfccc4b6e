use mindspace_backend::companion::{MessageSender, TranscriptMessage};
use mindspace_backend::mood::CanonicalMood;
use mindspace_backend::response::SupportType;
use mindspace_backend::session::SessionRecord;
use mindspace_backend::theme::{rgb_components, ThemeDescriptor};

const RESET: &str = "\x1b[0m";

/// Wrap `text` in a 24-bit foreground color taken from a theme token.
/// Tokens that are not plain `rgb(...)` leave the text uncolored.
pub fn paint(text: &str, color: &str) -> String {
    match rgb_components(color) {
        Some((r, g, b)) => format!("\x1b[38;2;{};{};{}m{}{}", r, g, b, text, RESET),
        None => text.to_string(),
    }
}

pub fn header(record: &SessionRecord, theme: &ThemeDescriptor) -> String {
    let title = format!(
        "MindSpace  {} {}  [{}]",
        record.current_mood.emoji(),
        record.current_mood,
        record.current_page
    );
    let subtitle = format!(
        "{} · streak {}d · level {} · lang {}",
        record.user_profile.name,
        record.user_profile.streak_days,
        record.user_profile.level,
        record.language_preference
    );
    format!(
        "{}\n{}",
        paint(&title, theme.primary_color),
        paint(&subtitle, theme.muted_text_color)
    )
}

pub fn theme_table(mood: CanonicalMood, theme: &ThemeDescriptor) -> String {
    let mut out = format!("Theme for {} {}\n", mood.emoji(), mood);
    for (name, value) in theme.css_variables() {
        out.push_str(&format!("  {:<18} {}\n", name, paint(value, value)));
    }
    out
}

pub fn message(msg: &TranscriptMessage, theme: &ThemeDescriptor) -> String {
    let time = msg.timestamp.format("%H:%M");
    match msg.sender {
        MessageSender::User => format!("[{}] you: {}", time, msg.text),
        MessageSender::Assistant => {
            let marker = if msg.support_type == Some(SupportType::Crisis) {
                "🚨 "
            } else {
                ""
            };
            let label = paint("mindspace", theme.primary_color);
            let mut line = format!("[{}] {}{}: {}", time, marker, label, msg.text);
            if let Some(support) = msg.support_type {
                line.push_str(&paint(&format!("  ({})", support.as_str()), theme.muted_text_color));
            }
            line
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mindspace_backend::theme::resolve;

    #[test]
    fn paint_uses_truecolor_escape() {
        let painted = paint("hi", "rgb(33, 150, 243)");
        assert_eq!(painted, "\x1b[38;2;33;150;243mhi\x1b[0m");
    }

    #[test]
    fn gradients_are_left_plain() {
        let theme = resolve(CanonicalMood::Calm);
        assert_eq!(paint("x", theme.gradient), "x");
    }

    #[test]
    fn theme_table_lists_every_variable() {
        let table = theme_table(CanonicalMood::Happy, resolve(CanonicalMood::Happy));
        for name in ["--mood-primary", "--mood-background", "--mood-text-light"] {
            assert!(table.contains(name), "missing {name}");
        }
    }
}
