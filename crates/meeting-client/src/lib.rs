//! Meeting Client Library
//!
//! The client side of a conferencing app: it receives an unordered,
//! asynchronous stream of membership, media and error events from an
//! external conferencing runtime and keeps a consistent, renderable snapshot
//! of who is in the meeting, who is muted, whose video is visible and who is
//! screen-sharing.
//!
//! # Architecture
//!
//! ```text
//! MeetingClient (app shell: phase, controls, app-level subscriptions)
//! ├── JoinOrchestrator (credentials -> activation -> join command)
//! │   └── JoinCredentialsProvider (HttpJoinClient in production)
//! ├── SessionController (Idle <-> Active, one subscription per event kind)
//! │   └── EventSource (EventChannel fed by the runtime via the event pump)
//! ├── MeetingStateStore (snapshot + change notification)
//! └── CommandSink (fire-and-forget commands back to the runtime)
//! ```
//!
//! # Key Design Decisions
//!
//! - **Round-trip state**: commands never touch the snapshot; their effect is
//!   only visible once the runtime echoes the matching event
//! - **Idempotent transitions**: redelivered or reordered events converge on
//!   the same snapshot
//! - **Generations**: every join attempt gets a generation; events and join
//!   responses carrying a stale generation are ignored
//! - **Scoped subscriptions**: activation is all-or-nothing and deactivation
//!   releases every handle, including on drop
//!
//! # Modules
//!
//! - [`channel`] - Typed event subscription over the runtime notification source
//! - [`commands`] - Runtime command sink
//! - [`store`] - Meeting snapshot and transition functions
//! - [`session`] - Subscription lifecycle controller
//! - [`join`] - One-shot join flow
//! - [`client`] - Top-level client composing all of the above
//! - [`services`] - Join credential collaborator
//! - [`alerts`] - User-facing error reporting
//! - [`config`] - Configuration from environment
//! - [`errors`] - Error types with user-facing messages

pub mod alerts;
pub mod bridge;
pub mod channel;
pub mod client;
pub mod commands;
pub mod config;
pub mod errors;
pub mod events;
pub mod join;
pub mod observability;
pub mod services;
pub mod session;
pub mod store;
