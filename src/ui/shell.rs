use anyhow::{Context, Result};
use flume::{unbounded, Receiver, Sender};
use tokio::io::{AsyncBufReadExt, BufReader};

use mindspace_backend::bus::{MoodChangeEvent, Subscription};
use mindspace_backend::companion::{ChatReply, ChatTranscript};
use mindspace_backend::runtime::MindspaceRuntime;
use mindspace_backend::session::{
    ForcedLogoutReason, Page, SessionEvent, SessionState, SessionValidity,
};

use super::banner::mood_banner;
use super::command::{parse_command, Command, HELP_TEXT};
use super::render;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Quit,
}

/// Channel handler that hands mood changes to the shell loop.
fn forward_mood(tx: Sender<MoodChangeEvent>) -> impl Fn(&MoodChangeEvent) + Send + Sync + 'static {
    move |event: &MoodChangeEvent| {
        if tx.send(*event).is_err() {
            tracing::debug!("Mood change arrived after the shell closed");
        }
    }
}

/// Line-oriented front end. Owns the runtime, so every session and mood
/// write happens on this task.
pub struct Shell {
    runtime: MindspaceRuntime,
    transcript: ChatTranscript,
    session_rx: Receiver<SessionEvent>,
    mood_rx: Receiver<MoodChangeEvent>,
    reply_tx: Sender<ChatReply>,
    reply_rx: Receiver<ChatReply>,
    awaiting_reply: bool,
    _mood_subscription: Subscription,
}

impl Shell {
    pub fn new(runtime: MindspaceRuntime, session_rx: Receiver<SessionEvent>) -> Self {
        let (mood_tx, mood_rx) = unbounded();
        let mood_subscription = runtime.mood_channel().subscribe(forward_mood(mood_tx));
        let (reply_tx, reply_rx) = unbounded();
        Self {
            runtime,
            transcript: ChatTranscript::new(),
            session_rx,
            mood_rx,
            reply_tx,
            reply_rx,
            awaiting_reply: false,
            _mood_subscription: mood_subscription,
        }
    }

    pub async fn run(mut self) -> Result<()> {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        let mut revalidate = tokio::time::interval(self.runtime.revalidate_interval());
        // The first tick fires immediately; startup already revalidated.
        revalidate.tick().await;

        let session_rx = self.session_rx.clone();
        let mood_rx = self.mood_rx.clone();
        let reply_rx = self.reply_rx.clone();

        self.show_surface();

        loop {
            tokio::select! {
                line = lines.next_line() => {
                    let Some(line) = line.context("Failed to read from stdin")? else {
                        break;
                    };
                    if self.handle_line(&line) == Flow::Quit {
                        break;
                    }
                }
                _ = revalidate.tick() => {
                    tracing::debug!("Periodic session revalidation");
                    self.runtime.revalidate();
                }
                Ok(reply) = reply_rx.recv_async() => self.on_reply(reply),
                Ok(event) = mood_rx.recv_async() => self.on_mood_changed(event),
                Ok(event) = session_rx.recv_async() => self.on_session_event(event),
            }
        }

        tracing::info!("Shell closed");
        Ok(())
    }

    fn handle_line(&mut self, line: &str) -> Flow {
        let command = parse_command(line);
        let logged_in = self.runtime.session().state() == SessionState::LoggedIn;

        match command {
            Command::Empty => {}
            Command::Quit => return Flow::Quit,
            Command::Help => println!("{}", HELP_TEXT),
            Command::Invalid(reason) => println!("{}", reason),
            Command::Login | Command::Signup if logged_in => {
                println!("Already logged in. Use /logout to switch accounts.");
            }
            Command::Login => {
                self.runtime.login();
                self.show_surface();
            }
            Command::Signup => {
                self.runtime.signup();
                self.show_surface();
            }
            Command::Language(code) => {
                self.runtime.set_language(code);
                println!("Language set to {}", self.runtime.record().language_preference);
            }
            _ if !logged_in => println!("Please /login or /signup first."),
            Command::Logout => {
                self.runtime.logout();
                self.transcript = ChatTranscript::new();
                self.show_surface();
            }
            Command::Mood(mood) => {
                self.runtime.select_mood(mood);
                self.show_surface();
            }
            Command::Page(page) => {
                self.runtime.navigate(page);
                self.show_surface();
            }
            Command::Rename(name) => {
                self.runtime.update_profile(|profile| profile.name = name);
                println!("Profile name set to {}", self.runtime.record().user_profile.name);
            }
            Command::Profile => self.show_profile(),
            Command::Theme => {
                let (mood, theme) = self.runtime.theme().active();
                print!("{}", render::theme_table(mood, theme));
            }
            Command::History => {
                let (_, theme) = self.runtime.theme().active();
                for message in self.transcript.messages() {
                    println!("{}", render::message(message, theme));
                }
            }
            Command::Chat(text) => self.send_chat(text),
        }
        Flow::Continue
    }

    fn send_chat(&mut self, text: String) {
        if self.awaiting_reply {
            println!("Still waiting for the last reply...");
            return;
        }
        self.runtime.navigate(Page::Chat);

        let (_, theme) = self.runtime.theme().active();
        let greet = self.transcript.is_empty();
        self.transcript.push_user(&text);
        if greet {
            if let Some(greeting) = self.transcript.messages().first() {
                println!("{}", render::message(greeting, theme));
            }
        }

        self.awaiting_reply = true;
        let companion = self.runtime.companion();
        let reply_tx = self.reply_tx.clone();
        tokio::spawn(async move {
            let reply = companion.respond(&text).await;
            if reply_tx.send(reply).is_err() {
                tracing::debug!("Reply arrived after the shell closed");
            }
        });
    }

    fn on_reply(&mut self, reply: ChatReply) {
        self.awaiting_reply = false;
        let (_, theme) = self.runtime.theme().active();
        let message = self.transcript.push_reply(&reply);
        println!("{}", render::message(message, theme));
        self.runtime.apply_response(&reply.parsed);
    }

    fn on_mood_changed(&mut self, event: MoodChangeEvent) {
        let Some(banner) = mood_banner(&event) else {
            return;
        };
        println!("{}", banner);
        let (_, theme) = self.runtime.theme().active();
        if let Some(notice) = self.transcript.push_mood_notice(&event) {
            println!("{}", render::message(notice, theme));
        }
    }

    fn on_session_event(&mut self, event: SessionEvent) {
        match event {
            SessionEvent::ForcedLogout { reason } => {
                let why = match reason {
                    ForcedLogoutReason::Expired => "Your session has expired.",
                    ForcedLogoutReason::Corrupted => "Your session could not be verified.",
                };
                println!("{} Please log in again.", why);
                self.transcript = ChatTranscript::new();
                self.show_surface();
            }
        }
    }

    fn show_profile(&self) {
        let profile = &self.runtime.record().user_profile;
        println!(
            "{}: streak {} days, level {}, plant {}%, {} health {}%",
            profile.name,
            profile.streak_days,
            profile.level,
            profile.plant_growth,
            profile.pet_type,
            profile.pet_health
        );
    }

    fn show_surface(&self) {
        let record = self.runtime.record();
        if record.state() == SessionState::LoggedOut {
            println!("Welcome to MindSpace. Type /login, /signup or /help.");
            return;
        }
        let (_, theme) = self.runtime.theme().active();
        println!("{}", render::header(record, theme));
        if let SessionValidity::Valid { expires_at } = self.runtime.session().validity() {
            println!("Session valid until {}", expires_at.format("%Y-%m-%d %H:%M UTC"));
        }
        if record.current_page == Page::MoodSelector {
            let choices: Vec<String> = mindspace_backend::mood::CanonicalMood::ALL
                .iter()
                .map(|mood| format!("{} {}", mood.emoji(), mood))
                .collect();
            println!("How are you feeling? /mood <{}>", choices.join(" | "));
        }
    }
}
