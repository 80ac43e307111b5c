//! Conversation sessions
//!
//! - `orchestrator` - submit a message, poll its job, fetch the reply
//! - `registry` - thread id -> handle map with per-thread submission guards
//! - `state` - polling bounds
//! - `events` / `event_bus` - lifecycle events for logging and subscribers

mod event_bus;
mod events;
mod orchestrator;
mod registry;
mod state;

pub use event_bus::SessionEventBus;
pub use events::SessionEvent;
pub use orchestrator::{Reply, SessionOrchestrator};
pub use registry::{ThreadHandle, ThreadRegistry, TurnGuard};
pub use state::{PollConfig, DEFAULT_MAX_WAIT, DEFAULT_POLL_INTERVAL};
