use std::io::Read;

use anyhow::{Context, Result};
use mindspace_backend::config::AppConfig;
use mindspace_backend::response::crisis::detect_crisis_in_raw;
use mindspace_backend::response::ResponseProcessor;
use mindspace_backend::theme;
use serde::Serialize;
use tracing_subscriber::EnvFilter;

#[derive(Serialize)]
struct ProbeReport<'a> {
    display_text: &'a str,
    structured_payload: Option<&'a serde_json::Map<String, serde_json::Value>>,
    mood: Option<&'static str>,
    is_crisis: bool,
    crisis_anywhere_in_raw: bool,
    theme: Option<&'static theme::ThemeDescriptor>,
}

/// Run one raw backend reply (file argument or stdin) through the response
/// pipeline and print what the app would do with it.
fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("warn,mindspace_backend=debug")),
        )
        .init();

    let raw = match std::env::args().nth(1) {
        Some(path) => std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read reply from {}", path))?,
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("failed to read reply from stdin")?;
            buf
        }
    };

    let config = AppConfig::load();
    let parsed = ResponseProcessor::new(config.strip_transcript_artifacts).process(&raw);

    let report = ProbeReport {
        display_text: &parsed.display_text,
        structured_payload: parsed.structured_payload.as_ref(),
        mood: parsed.mood.map(|mood| mood.as_str()),
        is_crisis: parsed.is_crisis,
        crisis_anywhere_in_raw: detect_crisis_in_raw(&raw),
        theme: parsed.mood.map(theme::resolve),
    };

    println!(
        "{}",
        serde_json::to_string_pretty(&report).context("failed to render report")?
    );
    Ok(())
}
