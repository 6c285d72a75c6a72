//! Event channel adapter.
//!
//! Wraps the runtime's notification source into a typed subscription API:
//! [`EventSource::subscribe`] registers one handler for one [`EventKind`] and
//! returns a [`SubscriptionHandle`]; [`SubscriptionHandle::cancel`] removes
//! it again.
//!
//! # Delivery
//!
//! - Every subscription fires independently; several handlers may share a
//!   kind and run in registration order.
//! - Events are delivered in the order the runtime produced them. The
//!   adapter never reorders or coalesces.
//! - Handlers run outside the registry lock, so a handler may cancel its own
//!   (or any other) subscription while it runs.
//!
//! [`spawn_event_pump`] moves events from a runtime queue into an
//! [`EventChannel`] on its own task, so delivery is asynchronous relative to
//! whoever issues commands.

use crate::errors::ChannelError;
use crate::events::{EventKind, RuntimeEvent};
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError, Weak};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace};

/// Callback invoked for each delivered event of the subscribed kind.
pub type EventHandler = Arc<dyn Fn(&RuntimeEvent) + Send + Sync>;

/// A source of runtime events that handlers can subscribe to.
pub trait EventSource: Send + Sync {
    /// Register `handler` for events of `kind`.
    ///
    /// # Errors
    ///
    /// Returns `ChannelError::Closed` if the source no longer delivers events.
    fn subscribe(
        &self,
        kind: EventKind,
        handler: EventHandler,
    ) -> Result<SubscriptionHandle, ChannelError>;
}

type Canceller = Box<dyn FnOnce() + Send>;

/// Cancellable registration returned by [`EventSource::subscribe`].
///
/// Cancelling is idempotent: the first call unregisters the handler, later
/// calls do nothing. Dropping a handle does NOT cancel it; the owner decides
/// when a subscription ends.
pub struct SubscriptionHandle {
    kind: EventKind,
    canceller: Mutex<Option<Canceller>>,
}

impl SubscriptionHandle {
    /// Create a handle that runs `cancel` the first time it is cancelled.
    pub fn new(kind: EventKind, cancel: impl FnOnce() + Send + 'static) -> Self {
        Self {
            kind,
            canceller: Mutex::new(Some(Box::new(cancel))),
        }
    }

    /// Event kind this handle is registered for.
    #[must_use]
    pub fn kind(&self) -> EventKind {
        self.kind
    }

    /// Unregister the handler. No-op if already cancelled.
    pub fn cancel(&self) {
        let canceller = self
            .canceller
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();

        if let Some(cancel) = canceller {
            cancel();
        }
    }

    /// Whether [`cancel`](Self::cancel) has run.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.canceller
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_none()
    }
}

impl fmt::Debug for SubscriptionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubscriptionHandle")
            .field("kind", &self.kind)
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

struct Registration {
    id: u64,
    kind: EventKind,
    handler: EventHandler,
}

#[derive(Default)]
struct Registry {
    next_id: u64,
    closed: bool,
    registrations: Vec<Registration>,
}

impl Registry {
    fn remove(&mut self, id: u64) -> bool {
        let before = self.registrations.len();
        self.registrations.retain(|r| r.id != id);
        before != self.registrations.len()
    }
}

/// In-process event source fed by the runtime bridge.
///
/// Cloning yields another handle to the same registry.
#[derive(Clone, Default)]
pub struct EventChannel {
    registry: Arc<Mutex<Registry>>,
}

impl EventChannel {
    /// Create an open channel with no subscribers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn registry(&self) -> std::sync::MutexGuard<'_, Registry> {
        self.registry.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Deliver one event to every handler subscribed to its kind.
    ///
    /// Returns the number of handlers invoked.
    pub fn deliver(&self, event: &RuntimeEvent) -> usize {
        let kind = event.kind();
        let handlers: Vec<EventHandler> = self
            .registry()
            .registrations
            .iter()
            .filter(|r| r.kind == kind)
            .map(|r| Arc::clone(&r.handler))
            .collect();

        trace!(
            target: "mc_client.channel",
            kind = %kind,
            handlers = handlers.len(),
            "Delivering event"
        );

        for handler in &handlers {
            handler(event);
        }

        handlers.len()
    }

    /// Stop accepting subscriptions and drop every registered handler.
    pub fn close(&self) {
        let mut registry = self.registry();
        if !registry.closed {
            registry.closed = true;
            let dropped = registry.registrations.len();
            registry.registrations.clear();
            debug!(
                target: "mc_client.channel",
                dropped_handlers = dropped,
                "Event channel closed"
            );
        }
    }

    /// Whether [`close`](Self::close) has been called.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.registry().closed
    }

    /// Number of live subscriptions for `kind`.
    #[must_use]
    pub fn subscriber_count(&self, kind: EventKind) -> usize {
        self.registry()
            .registrations
            .iter()
            .filter(|r| r.kind == kind)
            .count()
    }
}

impl fmt::Debug for EventChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let registry = self.registry();
        f.debug_struct("EventChannel")
            .field("closed", &registry.closed)
            .field("registrations", &registry.registrations.len())
            .finish()
    }
}

impl EventSource for EventChannel {
    fn subscribe(
        &self,
        kind: EventKind,
        handler: EventHandler,
    ) -> Result<SubscriptionHandle, ChannelError> {
        let id = {
            let mut registry = self.registry();
            if registry.closed {
                return Err(ChannelError::Closed);
            }
            let id = registry.next_id;
            registry.next_id += 1;
            registry.registrations.push(Registration { id, kind, handler });
            id
        };

        let registry: Weak<Mutex<Registry>> = Arc::downgrade(&self.registry);
        Ok(SubscriptionHandle::new(kind, move || {
            if let Some(registry) = registry.upgrade() {
                let removed = registry
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .remove(id);
                trace!(
                    target: "mc_client.channel",
                    kind = %kind,
                    removed,
                    "Subscription cancelled"
                );
            }
        }))
    }
}

/// Spawn the task that feeds runtime events into `channel`.
///
/// The pump stops when `cancel_token` fires or the runtime side of `events`
/// is dropped; either way the channel is closed afterwards so that later
/// subscriptions fail instead of silently never firing.
pub fn spawn_event_pump(
    channel: EventChannel,
    mut events: mpsc::Receiver<RuntimeEvent>,
    cancel_token: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!(target: "mc_client.channel", "Event pump started");
        let mut delivered: u64 = 0;

        loop {
            tokio::select! {
                () = cancel_token.cancelled() => {
                    debug!(target: "mc_client.channel", "Event pump received cancellation signal");
                    break;
                }

                event = events.recv() => {
                    match event {
                        Some(event) => {
                            channel.deliver(&event);
                            delivered += 1;
                        }
                        None => {
                            debug!(target: "mc_client.channel", "Runtime event queue closed");
                            break;
                        }
                    }
                }
            }
        }

        channel.close();
        info!(
            target: "mc_client.channel",
            events_delivered = delivered,
            "Event pump stopped"
        );
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::events::VideoTile;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn recording_handler(log: &Arc<Mutex<Vec<String>>>, label: &str) -> EventHandler {
        let log = Arc::clone(log);
        let label = label.to_string();
        Arc::new(move |event: &RuntimeEvent| {
            log.lock()
                .unwrap()
                .push(format!("{label}:{}", event.kind()));
        })
    }

    #[test]
    fn test_subscribe_and_deliver() {
        let channel = EventChannel::new();
        let log = Arc::new(Mutex::new(Vec::new()));

        let _handle = channel
            .subscribe(EventKind::AttendeeJoin, recording_handler(&log, "h1"))
            .unwrap();

        assert_eq!(channel.deliver(&RuntimeEvent::attendee_join("a1", "p#A")), 1);
        // Other kinds are not routed to this handler
        assert_eq!(channel.deliver(&RuntimeEvent::attendee_leave("a1")), 0);

        assert_eq!(*log.lock().unwrap(), vec!["h1:attendee_join"]);
    }

    #[test]
    fn test_multiple_subscriptions_fire_in_registration_order() {
        let channel = EventChannel::new();
        let log = Arc::new(Mutex::new(Vec::new()));

        let _h1 = channel
            .subscribe(EventKind::AttendeeMute, recording_handler(&log, "first"))
            .unwrap();
        let _h2 = channel
            .subscribe(EventKind::AttendeeMute, recording_handler(&log, "second"))
            .unwrap();

        channel.deliver(&RuntimeEvent::attendee_mute("a1"));

        assert_eq!(
            *log.lock().unwrap(),
            vec!["first:attendee_mute", "second:attendee_mute"]
        );
        assert_eq!(channel.subscriber_count(EventKind::AttendeeMute), 2);
    }

    #[test]
    fn test_cancel_is_idempotent() {
        let channel = EventChannel::new();
        let count = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&count);

        let handle = channel
            .subscribe(
                EventKind::VideoTileAdd,
                Arc::new(move |_: &RuntimeEvent| {
                    counter.fetch_add(1, Ordering::SeqCst);
                }),
            )
            .unwrap();

        channel.deliver(&RuntimeEvent::VideoTileAdd(VideoTile::remote(1)));
        handle.cancel();
        handle.cancel();
        assert!(handle.is_cancelled());

        channel.deliver(&RuntimeEvent::VideoTileAdd(VideoTile::remote(2)));
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert_eq!(channel.subscriber_count(EventKind::VideoTileAdd), 0);
    }

    #[test]
    fn test_cancel_only_removes_own_registration() {
        let channel = EventChannel::new();
        let log = Arc::new(Mutex::new(Vec::new()));

        let h1 = channel
            .subscribe(EventKind::AttendeeLeave, recording_handler(&log, "h1"))
            .unwrap();
        let _h2 = channel
            .subscribe(EventKind::AttendeeLeave, recording_handler(&log, "h2"))
            .unwrap();

        h1.cancel();
        channel.deliver(&RuntimeEvent::attendee_leave("a1"));

        assert_eq!(*log.lock().unwrap(), vec!["h2:attendee_leave"]);
    }

    #[test]
    fn test_handler_may_cancel_during_delivery() {
        let channel = EventChannel::new();
        let slot: Arc<Mutex<Option<SubscriptionHandle>>> = Arc::new(Mutex::new(None));
        let slot_in_handler = Arc::clone(&slot);

        let handle = channel
            .subscribe(
                EventKind::MeetingEnd,
                Arc::new(move |_: &RuntimeEvent| {
                    if let Some(handle) = slot_in_handler.lock().unwrap().as_ref() {
                        handle.cancel();
                    }
                }),
            )
            .unwrap();
        *slot.lock().unwrap() = Some(handle);

        assert_eq!(channel.deliver(&RuntimeEvent::MeetingEnd), 1);
        assert_eq!(channel.deliver(&RuntimeEvent::MeetingEnd), 0);
    }

    #[test]
    fn test_subscribe_after_close_fails() {
        let channel = EventChannel::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        let handle = channel
            .subscribe(EventKind::AttendeeJoin, recording_handler(&log, "h"))
            .unwrap();

        channel.close();
        assert!(channel.is_closed());

        let result = channel.subscribe(EventKind::AttendeeJoin, recording_handler(&log, "h"));
        assert_eq!(result.unwrap_err(), ChannelError::Closed);

        // Cancelling a handle whose channel closed is still a no-op
        handle.cancel();
        assert_eq!(channel.deliver(&RuntimeEvent::attendee_join("a1", "p#A")), 0);
    }

    #[test]
    fn test_cancel_after_channel_dropped() {
        let channel = EventChannel::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        let handle = channel
            .subscribe(EventKind::AttendeeJoin, recording_handler(&log, "h"))
            .unwrap();

        drop(channel);
        handle.cancel();
        assert!(handle.is_cancelled());
    }

    #[tokio::test]
    async fn test_event_pump_delivers_in_order_and_closes() {
        let channel = EventChannel::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        let _join = channel
            .subscribe(EventKind::AttendeeJoin, recording_handler(&log, "j"))
            .unwrap();
        let _leave = channel
            .subscribe(EventKind::AttendeeLeave, recording_handler(&log, "l"))
            .unwrap();

        let (tx, rx) = mpsc::channel(8);
        let pump = spawn_event_pump(channel.clone(), rx, CancellationToken::new());

        tx.send(RuntimeEvent::attendee_join("a1", "p#A")).await.unwrap();
        tx.send(RuntimeEvent::attendee_leave("a1")).await.unwrap();
        tx.send(RuntimeEvent::attendee_join("a2", "p#B")).await.unwrap();
        drop(tx);

        pump.await.unwrap();

        assert_eq!(
            *log.lock().unwrap(),
            vec!["j:attendee_join", "l:attendee_leave", "j:attendee_join"]
        );
        assert!(channel.is_closed());
    }

    #[tokio::test]
    async fn test_event_pump_stops_on_cancellation() {
        let channel = EventChannel::new();
        let (_tx, rx) = mpsc::channel::<RuntimeEvent>(8);
        let cancel_token = CancellationToken::new();

        let pump = spawn_event_pump(channel.clone(), rx, cancel_token.clone());
        cancel_token.cancel();
        pump.await.unwrap();

        assert!(channel.is_closed());
    }
}
