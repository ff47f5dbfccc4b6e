//! Persisted session state: authentication, navigation, mood and profile.
//!
//! [`SessionStore`] is the only writer of these fields. Every mutation goes
//! to the in-memory record first and is then written through to a
//! [`KeyValueStore`]; write failures are logged and otherwise ignored, so the
//! in-memory record stays authoritative for the life of the process.
//!
//! Validity is a two-state machine. `LoggedOut -> LoggedIn` only through
//! [`SessionStore::login`] / [`SessionStore::signup`]; `LoggedIn -> LoggedOut`
//! through [`SessionStore::logout`] or an expiry/corruption finding in
//! [`SessionStore::load`] or [`SessionStore::revalidate`].

pub mod clock;
pub mod storage;

use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};
use flume::Sender;
use serde::{Deserialize, Serialize};

use crate::mood::{parse_mood, CanonicalMood};
use clock::Clock;
use storage::KeyValueStore;

pub const KEY_IS_LOGGED_IN: &str = "mindspace.is_logged_in";
pub const KEY_LOGIN_TIMESTAMP: &str = "mindspace.login_timestamp";
pub const KEY_CURRENT_PAGE: &str = "mindspace.current_page";
pub const KEY_CURRENT_MOOD: &str = "mindspace.current_mood";
pub const KEY_LANGUAGE: &str = "mindspace.language";
pub const KEY_USER_PROFILE: &str = "mindspace.user_profile";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Page {
    Landing,
    Login,
    Signup,
    MoodSelector,
    Dashboard,
    Chat,
    PeerSupport,
    Appointments,
    Journal,
    Tests,
    Games,
    Goals,
    Admin,
}

impl Page {
    pub const ALL: [Page; 13] = [
        Page::Landing,
        Page::Login,
        Page::Signup,
        Page::MoodSelector,
        Page::Dashboard,
        Page::Chat,
        Page::PeerSupport,
        Page::Appointments,
        Page::Journal,
        Page::Tests,
        Page::Games,
        Page::Goals,
        Page::Admin,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Page::Landing => "landing",
            Page::Login => "login",
            Page::Signup => "signup",
            Page::MoodSelector => "mood-selector",
            Page::Dashboard => "dashboard",
            Page::Chat => "chat",
            Page::PeerSupport => "peer-support",
            Page::Appointments => "appointments",
            Page::Journal => "journal",
            Page::Tests => "tests",
            Page::Games => "games",
            Page::Goals => "goals",
            Page::Admin => "admin",
        }
    }

    pub fn parse(raw: &str) -> Option<Page> {
        let normalized = raw.trim().to_ascii_lowercase();
        Page::ALL
            .into_iter()
            .find(|page| page.as_str() == normalized)
    }
}

impl Default for Page {
    fn default() -> Self {
        Page::Login
    }
}

impl std::fmt::Display for Page {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    #[serde(default = "default_profile_name")]
    pub name: String,
    #[serde(default)]
    pub streak_days: u32,
    #[serde(default)]
    pub level: u32,
    #[serde(default)]
    pub plant_growth: u8,
    #[serde(default)]
    pub pet_health: u8,
    #[serde(default = "default_pet_type")]
    pub pet_type: String,
}

fn default_profile_name() -> String {
    "Alex".to_string()
}

fn default_pet_type() -> String {
    "cat".to_string()
}

impl Default for UserProfile {
    fn default() -> Self {
        Self {
            name: default_profile_name(),
            streak_days: 7,
            level: 3,
            plant_growth: 65,
            pet_health: 80,
            pet_type: default_pet_type(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub is_logged_in: bool,
    /// Epoch milliseconds of the last successful login.
    pub login_timestamp: Option<i64>,
    pub current_page: Page,
    pub current_mood: CanonicalMood,
    pub language_preference: String,
    pub user_profile: UserProfile,
}

impl Default for SessionRecord {
    fn default() -> Self {
        Self::logged_out("en")
    }
}

impl SessionRecord {
    pub fn logged_out(language: &str) -> Self {
        Self {
            is_logged_in: false,
            login_timestamp: None,
            current_page: Page::default(),
            current_mood: CanonicalMood::default(),
            language_preference: language.to_string(),
            user_profile: UserProfile::default(),
        }
    }

    pub fn state(&self) -> SessionState {
        if self.is_logged_in {
            SessionState::LoggedIn
        } else {
            SessionState::LoggedOut
        }
    }

    pub fn login_time(&self) -> Option<DateTime<Utc>> {
        self.login_timestamp
            .and_then(|ms| Utc.timestamp_millis_opt(ms).single())
    }

    fn clear_login(&mut self) {
        self.is_logged_in = false;
        self.login_timestamp = None;
        self.current_page = Page::default();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    LoggedOut,
    LoggedIn,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionValidity {
    LoggedOut,
    Valid { expires_at: DateTime<Utc> },
    Expired,
    /// Logged in without a usable login timestamp.
    Corrupted,
}

impl SessionValidity {
    fn logout_reason(self) -> Option<ForcedLogoutReason> {
        match self {
            SessionValidity::Expired => Some(ForcedLogoutReason::Expired),
            SessionValidity::Corrupted => Some(ForcedLogoutReason::Corrupted),
            SessionValidity::LoggedOut | SessionValidity::Valid { .. } => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ForcedLogoutReason {
    Expired,
    Corrupted,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    ForcedLogout { reason: ForcedLogoutReason },
}

/// Partial update merged by [`SessionStore::save`]. `None` leaves a field
/// untouched; `login_timestamp: Some(None)` clears the timestamp.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionPatch {
    pub is_logged_in: Option<bool>,
    pub login_timestamp: Option<Option<i64>>,
    pub current_page: Option<Page>,
    pub current_mood: Option<CanonicalMood>,
    pub language_preference: Option<String>,
    pub user_profile: Option<UserProfile>,
}

impl SessionPatch {
    pub fn mood(mood: CanonicalMood) -> Self {
        Self {
            current_mood: Some(mood),
            ..Self::default()
        }
    }

    pub fn page(page: Page) -> Self {
        Self {
            current_page: Some(page),
            ..Self::default()
        }
    }

    pub fn language(language: impl Into<String>) -> Self {
        Self {
            language_preference: Some(language.into()),
            ..Self::default()
        }
    }

    pub fn profile(profile: UserProfile) -> Self {
        Self {
            user_profile: Some(profile),
            ..Self::default()
        }
    }
}

pub fn check_validity(record: &SessionRecord, now: DateTime<Utc>, ttl: Duration) -> SessionValidity {
    if !record.is_logged_in {
        return SessionValidity::LoggedOut;
    }
    let Some(logged_in_at) = record.login_time() else {
        return SessionValidity::Corrupted;
    };
    // A stamp so close to the end of representable time that the expiry
    // cannot be computed is as unusable as a missing one.
    let Some(expires_at) = logged_in_at.checked_add_signed(ttl) else {
        return SessionValidity::Corrupted;
    };
    // A timestamp ahead of the clock counts as fresh rather than corrupted.
    if now > expires_at {
        SessionValidity::Expired
    } else {
        SessionValidity::Valid { expires_at }
    }
}

pub struct SessionStore {
    storage: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
    ttl: Duration,
    default_language: String,
    record: SessionRecord,
    events: Option<Sender<SessionEvent>>,
}

impl SessionStore {
    pub fn new(
        storage: Arc<dyn KeyValueStore>,
        clock: Arc<dyn Clock>,
        ttl: Duration,
        default_language: impl Into<String>,
    ) -> Self {
        let default_language = default_language.into();
        Self {
            storage,
            clock,
            ttl,
            record: SessionRecord::logged_out(&default_language),
            default_language,
            events: None,
        }
    }

    /// Deliver forced-logout notices to the application shell.
    pub fn with_events(mut self, events: Sender<SessionEvent>) -> Self {
        self.events = Some(events);
        self
    }

    pub fn record(&self) -> &SessionRecord {
        &self.record
    }

    pub fn state(&self) -> SessionState {
        self.record.state()
    }

    pub fn validity(&self) -> SessionValidity {
        check_validity(&self.record, self.clock.now(), self.ttl)
    }

    /// Read persisted fields into the in-memory record.
    ///
    /// An expired or corrupted login is cleared (in memory and in storage)
    /// and the returned record is logged out. Mood, language and profile are
    /// kept because they outlive sessions.
    pub fn load(&mut self) -> SessionRecord {
        let mut record = self.read_persisted();

        let validity = check_validity(&record, self.clock.now(), self.ttl);
        if let Some(reason) = validity.logout_reason() {
            tracing::warn!("Persisted session is {:?}; starting logged out", reason);
            record.clear_login();
            self.clear_persisted_login();
        }

        tracing::info!(
            "Session loaded: state={:?} page={} mood={}",
            record.state(),
            record.current_page,
            record.current_mood
        );
        self.record = record.clone();
        record
    }

    /// Merge `patch` into the record and write the touched fields through.
    pub fn save(&mut self, patch: SessionPatch) {
        if let Some(is_logged_in) = patch.is_logged_in {
            self.record.is_logged_in = is_logged_in;
            self.write(KEY_IS_LOGGED_IN, Some(is_logged_in.to_string()));
        }
        if let Some(login_timestamp) = patch.login_timestamp {
            self.record.login_timestamp = login_timestamp;
            self.write(KEY_LOGIN_TIMESTAMP, login_timestamp.map(|ms| ms.to_string()));
        }
        if let Some(page) = patch.current_page {
            self.record.current_page = page;
            self.write(KEY_CURRENT_PAGE, Some(page.as_str().to_string()));
        }
        if let Some(mood) = patch.current_mood {
            self.record.current_mood = mood;
            self.write(KEY_CURRENT_MOOD, Some(mood.as_str().to_string()));
        }
        if let Some(language) = patch.language_preference {
            self.write(KEY_LANGUAGE, Some(language.clone()));
            self.record.language_preference = language;
        }
        if let Some(profile) = patch.user_profile {
            match serde_json::to_string(&profile) {
                Ok(json) => self.write(KEY_USER_PROFILE, Some(json)),
                Err(e) => tracing::warn!("Failed to serialize user profile: {}", e),
            }
            self.record.user_profile = profile;
        }
    }

    /// Re-run the expiry check against the in-memory record, forcing a
    /// logout (and notifying the shell) when the session is no longer valid.
    pub fn revalidate(&mut self) -> SessionValidity {
        let validity = self.validity();
        if let Some(reason) = validity.logout_reason() {
            tracing::warn!("Session revalidation failed ({:?}); forcing logout", reason);
            self.record.clear_login();
            self.clear_persisted_login();
            if let Some(events) = &self.events {
                if events.send(SessionEvent::ForcedLogout { reason }).is_err() {
                    tracing::debug!("No listener for forced-logout notice");
                }
            }
        }
        validity
    }

    /// Returns false (and leaves the running session untouched) when
    /// already logged in.
    pub fn login(&mut self) -> bool {
        self.start_session(Page::Dashboard)
    }

    /// First login of a new account lands on the mood selector.
    pub fn signup(&mut self) -> bool {
        self.start_session(Page::MoodSelector)
    }

    fn start_session(&mut self, landing: Page) -> bool {
        if self.state() == SessionState::LoggedIn {
            tracing::debug!("Already logged in; keeping the current session");
            return false;
        }
        let now = self.clock.now().timestamp_millis();
        self.save(SessionPatch {
            is_logged_in: Some(true),
            login_timestamp: Some(Some(now)),
            current_page: Some(landing),
            ..SessionPatch::default()
        });
        tracing::info!("Session started, landing on {}", landing);
        true
    }

    pub fn logout(&mut self) {
        self.record.clear_login();
        self.clear_persisted_login();
        tracing::info!("Logged out");
    }

    /// Returns whether the mood actually changed.
    pub fn set_mood(&mut self, mood: CanonicalMood) -> bool {
        if self.record.current_mood == mood {
            return false;
        }
        self.save(SessionPatch::mood(mood));
        true
    }

    pub fn navigate(&mut self, page: Page) {
        if self.record.current_page != page {
            self.save(SessionPatch::page(page));
        }
    }

    pub fn set_language(&mut self, language: impl Into<String>) {
        self.save(SessionPatch::language(language));
    }

    pub fn update_profile<F>(&mut self, update: F)
    where
        F: FnOnce(&mut UserProfile),
    {
        let mut profile = self.record.user_profile.clone();
        update(&mut profile);
        self.save(SessionPatch::profile(profile));
    }

    fn clear_persisted_login(&self) {
        self.write(KEY_IS_LOGGED_IN, None);
        self.write(KEY_LOGIN_TIMESTAMP, None);
        self.write(KEY_CURRENT_PAGE, None);
    }

    fn write(&self, key: &str, value: Option<String>) {
        let result = match &value {
            Some(value) => self.storage.set(key, value),
            None => self.storage.remove(key),
        };
        if let Err(e) = result {
            tracing::warn!("Session storage write for '{}' failed: {}", key, e);
        }
    }

    fn read(&self, key: &str) -> Option<String> {
        match self.storage.get(key) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!("Session storage read for '{}' failed, using default: {}", key, e);
                None
            }
        }
    }

    fn read_persisted(&self) -> SessionRecord {
        let mut record = SessionRecord::logged_out(&self.default_language);

        if let Some(raw) = self.read(KEY_IS_LOGGED_IN) {
            record.is_logged_in = raw.trim() == "true";
        }

        if let Some(raw) = self.read(KEY_LOGIN_TIMESTAMP) {
            match raw.trim().parse::<i64>() {
                Ok(ms) => record.login_timestamp = Some(ms),
                Err(_) => tracing::warn!("Ignoring unparsable login timestamp '{}'", raw),
            }
        }

        if let Some(raw) = self.read(KEY_CURRENT_PAGE) {
            match Page::parse(&raw) {
                Some(page) => record.current_page = page,
                None => tracing::warn!("Ignoring unknown persisted page '{}'", raw),
            }
        }

        if let Some(raw) = self.read(KEY_CURRENT_MOOD) {
            match parse_mood(&raw) {
                Some(mood) => record.current_mood = mood,
                None => tracing::warn!("Ignoring unknown persisted mood '{}'", raw),
            }
        }

        if let Some(raw) = self.read(KEY_LANGUAGE) {
            if !raw.trim().is_empty() {
                record.language_preference = raw;
            }
        }

        if let Some(raw) = self.read(KEY_USER_PROFILE) {
            match serde_json::from_str::<UserProfile>(&raw) {
                Ok(profile) => record.user_profile = profile,
                Err(e) => tracing::warn!("Ignoring corrupt user profile blob: {}", e),
            }
        }

        record
    }
}
