//! Lisa core library
//!
//! Turns a user utterance into a rendered assistant reply:
//! - `session` - thread registry, message submission, and job polling
//! - `assistant` - the remote assistant-job service and its implementations
//! - `render` - reply classification into text, tables, and images
//! - `schematics` - saved image folders
//! - `config` - TOML + environment configuration

pub mod assistant;
pub mod config;
pub mod error;
pub mod render;
pub mod schematics;
pub mod session;

pub use assistant::{AssistantService, ImageAttachment, ReplyPayload};
pub use config::LisaConfig;
pub use error::{SessionError, SessionResult};
pub use render::{RenderDispatcher, RenderInstruction};
pub use session::{Reply, SessionOrchestrator, ThreadRegistry};
