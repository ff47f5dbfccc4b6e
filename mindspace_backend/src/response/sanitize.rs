use std::sync::OnceLock;

use regex_lite::Regex;

const TIMESTAMP_ARTIFACT: &str = r"(?i)\b\d{1,2}:\d{2}\s*(?:AM|PM)\b";
const TRAILING_SUPPORT_LABEL: &str = r"(?i)\s+(emotional|practical|crisis)\s*$";

fn timestamp_artifact() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(TIMESTAMP_ARTIFACT).ok()).as_ref()
}

fn trailing_support_label() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(TRAILING_SUPPORT_LABEL).ok())
        .as_ref()
}

/// Remove chat-transcript debris the model sometimes echoes into its reply:
/// `04:06 PM`-style stamps and a dangling support-type label at the end.
pub fn strip_transcript_artifacts(text: &str) -> String {
    let mut cleaned = text.to_string();

    if let Some(re) = timestamp_artifact() {
        cleaned = re.replace_all(&cleaned, "").trim().to_string();
    }

    if let Some(re) = trailing_support_label() {
        cleaned = re.replace(&cleaned, "").trim().to_string();
    }

    cleaned
}
