use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use flume::Sender;

use crate::bus::{MoodChangeSource, MoodChannel, Subscription};
use crate::companion::Companion;
use crate::config::AppConfig;
use crate::database::SessionDatabase;
use crate::http_client::build_http_client_with_timeout;
use crate::llm_client::{CompanionBackend, GeminiClient};
use crate::mood::CanonicalMood;
use crate::response::{ParsedAiResponse, ResponseProcessor};
use crate::session::clock::{Clock, SystemClock};
use crate::session::storage::{KeyValueStore, MemoryKvStore};
use crate::session::{Page, SessionEvent, SessionRecord, SessionStore, SessionValidity, UserProfile};
use crate::theme::ThemeState;

/// The application core: the one owner of the session and of mood writes.
///
/// Every mood change goes through here so the persisted mood, the channel and
/// the applied theme can never disagree.
pub struct MindspaceRuntime {
    pub config: AppConfig,
    session: SessionStore,
    mood_channel: MoodChannel,
    theme: ThemeState,
    companion: Companion,
    _theme_subscription: Subscription,
}

pub struct MindspaceRuntimeBuilder {
    config: AppConfig,
    storage: Option<Arc<dyn KeyValueStore>>,
    clock: Option<Arc<dyn Clock>>,
    backend: Option<Arc<dyn CompanionBackend>>,
    session_events: Option<Sender<SessionEvent>>,
}

impl MindspaceRuntimeBuilder {
    pub fn new(config: AppConfig) -> Self {
        Self {
            config,
            storage: None,
            clock: None,
            backend: None,
            session_events: None,
        }
    }

    pub fn with_storage(mut self, storage: Arc<dyn KeyValueStore>) -> Self {
        self.storage = Some(storage);
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn with_backend(mut self, backend: Arc<dyn CompanionBackend>) -> Self {
        self.backend = Some(backend);
        self
    }

    pub fn with_session_events(mut self, events: Sender<SessionEvent>) -> Self {
        self.session_events = Some(events);
        self
    }

    pub fn build(self) -> Result<MindspaceRuntime> {
        let config = self.config;

        let storage = match self.storage {
            Some(storage) => storage,
            None => open_storage(&config),
        };
        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock));
        let backend = match self.backend {
            Some(backend) => backend,
            None => {
                let http = build_http_client_with_timeout(Some(Duration::from_secs(
                    config.request_timeout_secs,
                )))
                .context("Failed to build HTTP client for the generative backend")?;
                if config.llm_api_key.as_deref().map_or(true, str::is_empty) {
                    tracing::warn!(
                        "No API key configured (set GEMINI_API_KEY); chat replies will fall back to an apology"
                    );
                }
                Arc::new(GeminiClient::from_config(&config, http)) as Arc<dyn CompanionBackend>
            }
        };

        let mut session = SessionStore::new(
            storage,
            clock,
            config.session_ttl(),
            config.default_language.clone(),
        );
        if let Some(events) = self.session_events {
            session = session.with_events(events);
        }
        let record = session.load();

        let mood_channel = MoodChannel::new(Some(record.current_mood));
        let theme = ThemeState::new(record.current_mood);
        let theme_subscription = theme.attach(&mood_channel);

        let companion = Companion::new(
            backend,
            ResponseProcessor::new(config.strip_transcript_artifacts),
        );

        tracing::info!(
            "Runtime ready (state {:?}, page {}, mood {})",
            record.state(),
            record.current_page,
            record.current_mood
        );

        Ok(MindspaceRuntime {
            config,
            session,
            mood_channel,
            theme,
            companion,
            _theme_subscription: theme_subscription,
        })
    }
}

fn open_storage(config: &AppConfig) -> Arc<dyn KeyValueStore> {
    match SessionDatabase::new(&config.database_path) {
        Ok(db) => Arc::new(db),
        Err(e) => {
            tracing::warn!(
                "Session database at '{}' unavailable ({:#}); session will not survive restart",
                config.database_path,
                e
            );
            Arc::new(MemoryKvStore::new())
        }
    }
}

impl MindspaceRuntime {
    /// Build with default storage, clock and backend, then run the startup
    /// session check.
    pub fn bootstrap(config: AppConfig, session_events: Sender<SessionEvent>) -> Result<Self> {
        let mut runtime = MindspaceRuntimeBuilder::new(config)
            .with_session_events(session_events)
            .build()?;
        runtime.revalidate();
        Ok(runtime)
    }

    pub fn record(&self) -> &SessionRecord {
        self.session.record()
    }

    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    pub fn mood_channel(&self) -> &MoodChannel {
        &self.mood_channel
    }

    pub fn theme(&self) -> &ThemeState {
        &self.theme
    }

    /// Cheap handle for running a chat turn off the owner's task.
    pub fn companion(&self) -> Companion {
        self.companion.clone()
    }

    pub fn revalidate_interval(&self) -> Duration {
        self.config.revalidate_interval()
    }

    pub fn revalidate(&mut self) -> SessionValidity {
        self.session.revalidate()
    }

    pub fn login(&mut self) -> bool {
        self.session.login()
    }

    pub fn signup(&mut self) -> bool {
        self.session.signup()
    }

    pub fn logout(&mut self) {
        self.session.logout();
    }

    pub fn navigate(&mut self, page: Page) {
        self.session.navigate(page);
    }

    pub fn set_language(&mut self, language: impl Into<String>) {
        self.session.set_language(language);
    }

    pub fn update_profile<F>(&mut self, update: F)
    where
        F: FnOnce(&mut UserProfile),
    {
        self.session.update_profile(update);
    }

    /// Mood picked on the selector surface. Lands on the dashboard either way.
    pub fn select_mood(&mut self, mood: CanonicalMood) -> bool {
        let changed = self.change_mood(mood, MoodChangeSource::UserSelection);
        self.session.navigate(Page::Dashboard);
        changed
    }

    /// Feed a processed reply's mood into the single mood path. A reply with
    /// no usable mood leaves everything untouched.
    pub fn apply_response(&mut self, parsed: &ParsedAiResponse) -> bool {
        match parsed.mood {
            Some(mood) => self.change_mood(mood, MoodChangeSource::Detected),
            None => false,
        }
    }

    fn change_mood(&mut self, mood: CanonicalMood, source: MoodChangeSource) -> bool {
        let persisted = self.session.set_mood(mood);
        let published = self.mood_channel.publish(mood, source);
        if persisted || published {
            tracing::info!("Mood is now {} ({:?})", mood, source);
        }
        published
    }
}
