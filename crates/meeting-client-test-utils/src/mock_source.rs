//! Event source that counts subscriptions and cancellations.
//!
//! Wraps a real [`EventChannel`] so delivery behaves exactly as in
//! production, and can be told to refuse the Nth subscription to exercise
//! partial activation failure. A one-shot cancel hook lets tests run code
//! in the middle of a deactivation, standing in for another thread.

use meeting_client::channel::{EventChannel, EventHandler, EventSource, SubscriptionHandle};
use meeting_client::errors::ChannelError;
use meeting_client::events::{EventKind, RuntimeEvent};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex};

#[derive(Debug, Default)]
struct Counters {
    subscribe_calls: usize,
    subscribed: HashMap<EventKind, usize>,
    cancelled: HashMap<EventKind, usize>,
}

type Hook = Box<dyn FnOnce() + Send>;

#[derive(Default)]
struct CancelHook(Mutex<Option<Hook>>);

impl fmt::Debug for CancelHook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CancelHook")
            .field("armed", &self.0.lock().unwrap().is_some())
            .finish()
    }
}

/// Counting wrapper around [`EventChannel`].
#[derive(Debug, Clone)]
pub struct CountingEventSource {
    channel: EventChannel,
    counters: Arc<Mutex<Counters>>,
    cancel_hook: Arc<CancelHook>,
    fail_at: Option<usize>,
}

impl Default for CountingEventSource {
    fn default() -> Self {
        Self {
            channel: EventChannel::new(),
            counters: Arc::new(Mutex::new(Counters::default())),
            cancel_hook: Arc::new(CancelHook::default()),
            fail_at: None,
        }
    }
}

impl CountingEventSource {
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Source whose `n`th subscribe call (1-based) fails with `Closed`.
    #[must_use]
    pub fn failing_at(n: usize) -> Arc<Self> {
        Arc::new(Self {
            fail_at: Some(n),
            ..Self::default()
        })
    }

    /// Run `hook` right after the next effective cancellation.
    pub fn on_next_cancel(&self, hook: impl FnOnce() + Send + 'static) {
        *self.cancel_hook.0.lock().unwrap() = Some(Box::new(hook));
    }

    /// The underlying channel.
    #[must_use]
    pub fn channel(&self) -> &EventChannel {
        &self.channel
    }

    /// Deliver `event` to current subscribers. Returns handlers invoked.
    pub fn deliver(&self, event: &RuntimeEvent) -> usize {
        self.channel.deliver(event)
    }

    /// Deliver several events in order.
    pub fn deliver_all(&self, events: &[RuntimeEvent]) {
        for event in events {
            self.channel.deliver(event);
        }
    }

    /// Live subscriptions for `kind`.
    #[must_use]
    pub fn subscriber_count(&self, kind: EventKind) -> usize {
        self.channel.subscriber_count(kind)
    }

    /// Successful subscriptions ever made for `kind`.
    #[must_use]
    pub fn subscribe_count(&self, kind: EventKind) -> usize {
        let counters = self.counters.lock().unwrap();
        counters.subscribed.get(&kind).copied().unwrap_or(0)
    }

    /// Effective cancellations for `kind`.
    #[must_use]
    pub fn cancel_count(&self, kind: EventKind) -> usize {
        let counters = self.counters.lock().unwrap();
        counters.cancelled.get(&kind).copied().unwrap_or(0)
    }

    /// Effective cancellations across the session event kinds.
    #[must_use]
    pub fn session_cancel_count(&self) -> usize {
        EventKind::SESSION
            .iter()
            .map(|kind| self.cancel_count(*kind))
            .sum()
    }

    /// Live subscriptions across the session event kinds.
    #[must_use]
    pub fn session_subscriber_count(&self) -> usize {
        EventKind::SESSION
            .iter()
            .map(|kind| self.subscriber_count(*kind))
            .sum()
    }
}

impl EventSource for CountingEventSource {
    fn subscribe(
        &self,
        kind: EventKind,
        handler: EventHandler,
    ) -> Result<SubscriptionHandle, ChannelError> {
        {
            let mut counters = self.counters.lock().unwrap();
            counters.subscribe_calls += 1;
            if self.fail_at == Some(counters.subscribe_calls) {
                return Err(ChannelError::Closed);
            }
        }

        let inner = self.channel.subscribe(kind, handler)?;
        *self
            .counters
            .lock()
            .unwrap()
            .subscribed
            .entry(kind)
            .or_default() += 1;

        let counters = Arc::clone(&self.counters);
        let cancel_hook = Arc::clone(&self.cancel_hook);
        Ok(SubscriptionHandle::new(kind, move || {
            inner.cancel();
            *counters.lock().unwrap().cancelled.entry(kind).or_default() += 1;

            let hook = cancel_hook.0.lock().unwrap().take();
            if let Some(hook) = hook {
                hook();
            }
        }))
    }
}
