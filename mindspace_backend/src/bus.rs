//! In-process mood notification channel.
//!
//! Publishing is synchronous: every handler registered when `publish` runs
//! is called in registration order before `publish` returns. There is no
//! queue, so a handler added afterwards never sees earlier events. The
//! handler list is snapshotted before delivery, which lets handlers
//! subscribe or unsubscribe while an event is in flight.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use serde::{Deserialize, Serialize};

use crate::mood::CanonicalMood;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MoodChangeSource {
    UserSelection,
    Detected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoodChangeEvent {
    pub new_mood: CanonicalMood,
    pub previous_mood: Option<CanonicalMood>,
    pub source: MoodChangeSource,
}

type Handler = Arc<dyn Fn(&MoodChangeEvent) + Send + Sync>;

struct ChannelInner {
    current: Option<CanonicalMood>,
    handlers: Vec<(u64, Handler)>,
}

#[derive(Clone)]
pub struct MoodChannel {
    inner: Arc<Mutex<ChannelInner>>,
    next_id: Arc<AtomicU64>,
}

impl Default for MoodChannel {
    fn default() -> Self {
        Self::new(None)
    }
}

impl MoodChannel {
    /// `current` seeds the known mood so the first publish of the same value
    /// is already a no-op.
    pub fn new(current: Option<CanonicalMood>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(ChannelInner {
                current,
                handlers: Vec::new(),
            })),
            next_id: Arc::new(AtomicU64::new(1)),
        }
    }

    // A poisoned lock only means a handler panicked mid-delivery; the
    // handler list itself is still consistent.
    fn lock(&self) -> MutexGuard<'_, ChannelInner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn current(&self) -> Option<CanonicalMood> {
        self.lock().current
    }

    pub fn subscriber_count(&self) -> usize {
        self.lock().handlers.len()
    }

    pub fn subscribe<F>(&self, handler: F) -> Subscription
    where
        F: Fn(&MoodChangeEvent) + Send + Sync + 'static,
    {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.lock().handlers.push((id, Arc::new(handler)));
        Subscription {
            id,
            channel: self.clone(),
        }
    }

    fn remove(&self, id: u64) -> bool {
        let mut inner = self.lock();
        let before = inner.handlers.len();
        inner.handlers.retain(|(handler_id, _)| *handler_id != id);
        inner.handlers.len() != before
    }

    /// Deliver a mood change to every current subscriber.
    ///
    /// Returns `false` without notifying anyone when `new_mood` is already
    /// the known mood.
    pub fn publish(&self, new_mood: CanonicalMood, source: MoodChangeSource) -> bool {
        let (event, handlers) = {
            let mut inner = self.lock();
            if inner.current == Some(new_mood) {
                return false;
            }
            let event = MoodChangeEvent {
                new_mood,
                previous_mood: inner.current,
                source,
            };
            inner.current = Some(new_mood);
            let handlers: Vec<Handler> = inner
                .handlers
                .iter()
                .map(|(_, handler)| handler.clone())
                .collect();
            (event, handlers)
        };

        tracing::debug!(
            "Publishing mood change {:?} -> {} to {} subscriber(s)",
            event.previous_mood,
            event.new_mood,
            handlers.len()
        );

        for handler in handlers {
            handler(&event);
        }
        true
    }
}

/// Handle returned by [`MoodChannel::subscribe`]. Dropping it does not
/// unsubscribe; call [`Subscription::unsubscribe`].
pub struct Subscription {
    id: u64,
    channel: MoodChannel,
}

impl Subscription {
    pub fn unsubscribe(self) -> bool {
        self.channel.remove(self.id)
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recorder(channel: &MoodChannel) -> (Arc<Mutex<Vec<CanonicalMood>>>, Subscription) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let subscription = channel.subscribe(move |event| {
            sink.lock().expect("recorder lock").push(event.new_mood);
        });
        (seen, subscription)
    }

    #[test]
    fn same_mood_twice_delivers_once() {
        let channel = MoodChannel::default();
        let (seen, _sub) = recorder(&channel);

        assert!(channel.publish(CanonicalMood::Sad, MoodChangeSource::Detected));
        assert!(!channel.publish(CanonicalMood::Sad, MoodChangeSource::Detected));

        assert_eq!(*seen.lock().expect("lock"), vec![CanonicalMood::Sad]);
    }

    #[test]
    fn seeded_mood_is_a_noop() {
        let channel = MoodChannel::new(Some(CanonicalMood::Calm));
        let (seen, _sub) = recorder(&channel);
        assert!(!channel.publish(CanonicalMood::Calm, MoodChangeSource::UserSelection));
        assert!(seen.lock().expect("lock").is_empty());
    }

    #[test]
    fn subscribers_receive_in_registration_order() {
        let channel = MoodChannel::default();
        let order = Arc::new(Mutex::new(Vec::new()));

        let first = order.clone();
        let _a = channel.subscribe(move |_| first.lock().expect("lock").push("theme"));
        let second = order.clone();
        let _b = channel.subscribe(move |_| second.lock().expect("lock").push("banner"));

        channel.publish(CanonicalMood::Happy, MoodChangeSource::Detected);
        assert_eq!(*order.lock().expect("lock"), vec!["theme", "banner"]);
    }

    #[test]
    fn late_subscriber_misses_earlier_events() {
        let channel = MoodChannel::default();
        channel.publish(CanonicalMood::Anxious, MoodChangeSource::Detected);

        let (seen, _sub) = recorder(&channel);
        assert!(seen.lock().expect("lock").is_empty());

        channel.publish(CanonicalMood::Calm, MoodChangeSource::Detected);
        assert_eq!(*seen.lock().expect("lock"), vec![CanonicalMood::Calm]);
    }

    #[test]
    fn unsubscribe_stops_delivery() {
        let channel = MoodChannel::default();
        let (seen, sub) = recorder(&channel);
        assert_eq!(channel.subscriber_count(), 1);

        assert!(sub.unsubscribe());
        assert_eq!(channel.subscriber_count(), 0);

        channel.publish(CanonicalMood::Stressed, MoodChangeSource::Detected);
        assert!(seen.lock().expect("lock").is_empty());
    }

    #[test]
    fn event_carries_previous_mood_and_source() {
        let channel = MoodChannel::new(Some(CanonicalMood::Neutral));
        let captured = Arc::new(Mutex::new(None));
        let sink = captured.clone();
        let _sub = channel.subscribe(move |event| {
            *sink.lock().expect("lock") = Some(*event);
        });

        channel.publish(CanonicalMood::Happy, MoodChangeSource::UserSelection);
        let event = (*captured.lock().expect("lock")).expect("event delivered");
        assert_eq!(event.previous_mood, Some(CanonicalMood::Neutral));
        assert_eq!(event.new_mood, CanonicalMood::Happy);
        assert_eq!(event.source, MoodChangeSource::UserSelection);
    }

    #[test]
    fn handler_may_subscribe_during_delivery() {
        let channel = MoodChannel::default();
        let inner_channel = channel.clone();
        let added = Arc::new(Mutex::new(Vec::new()));
        let added_sink = added.clone();
        let _sub = channel.subscribe(move |_| {
            let sub = inner_channel.subscribe(|_| {});
            added_sink.lock().expect("lock").push(sub);
        });

        channel.publish(CanonicalMood::Sad, MoodChangeSource::Detected);
        assert_eq!(channel.subscriber_count(), 2);
    }
}
