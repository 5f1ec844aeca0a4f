//! Chat Registry Library
//!
//! A chat server's connection table owned by a single tokio actor. Callers
//! submit closures instead of taking a lock; the actor runs them one at a time
//! against the registry it owns.

pub mod actor;
mod api;
mod client;
pub mod config;
pub mod constants;
mod error;
mod registry;
pub mod structured_logging;
pub mod types;

pub use actor::{Operation, OwnerHandle};
pub use api::ChatRegistry;
pub use client::{ChannelClient, ClientHandle};
pub use config::RegistryConfig;
pub use error::{RegistryError, WriteError};
pub use registry::Registry;
pub use types::{ActorState, ActorStats, BroadcastReport, ChatMessage, ClientId};
