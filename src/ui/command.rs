use mindspace_backend::mood::CanonicalMood;
use mindspace_backend::session::Page;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Login,
    Signup,
    Logout,
    Mood(CanonicalMood),
    Page(Page),
    Language(String),
    Rename(String),
    Profile,
    Theme,
    History,
    Help,
    Quit,
    Chat(String),
    Empty,
    Invalid(String),
}

pub const HELP_TEXT: &str = "\
Commands:
  /login              log in (lands on the dashboard)
  /signup             create an account (lands on the mood selector)
  /logout             end the session
  /mood <mood>        pick a mood: happy, calm, sad, anxious, stressed, neutral
  /page <page>        navigate, e.g. dashboard, chat, journal
  /lang <code>        set the language preference
  /name <name>        set the profile name
  /profile            show the profile
  /theme              show the active theme tokens
  /history            reprint the conversation
  /quit               exit
Anything else is sent to the assistant.";

pub fn parse_command(line: &str) -> Command {
    let line = line.trim();
    if line.is_empty() {
        return Command::Empty;
    }
    let Some(rest) = line.strip_prefix('/') else {
        return Command::Chat(line.to_string());
    };

    let (name, arg) = match rest.split_once(char::is_whitespace) {
        Some((name, arg)) => (name, arg.trim()),
        None => (rest, ""),
    };

    match name.to_ascii_lowercase().as_str() {
        "login" => Command::Login,
        "signup" => Command::Signup,
        "logout" => Command::Logout,
        "mood" => match arg.parse::<CanonicalMood>() {
            Ok(mood) => Command::Mood(mood),
            Err(e) => Command::Invalid(e.to_string()),
        },
        "page" | "go" => match Page::parse(arg) {
            Some(page) => Command::Page(page),
            None => Command::Invalid(format!("unknown page '{}'", arg)),
        },
        "lang" | "language" if !arg.is_empty() => Command::Language(arg.to_string()),
        "name" if !arg.is_empty() => Command::Rename(arg.to_string()),
        "profile" => Command::Profile,
        "theme" => Command::Theme,
        "history" => Command::History,
        "help" | "?" => Command::Help,
        "quit" | "exit" => Command::Quit,
        _ => Command::Invalid(format!("unknown command '{}', try /help", line)),
    }
}
