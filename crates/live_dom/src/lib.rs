//! The live tree and everything that mutates it: the node arena, the id
//! registry, per-delta application, and batch coordination.

mod arena;
mod config;
mod coordinator;
mod debug;
mod dom;
mod engine;
mod error;
mod registry;

pub use crate::arena::{ElementData, NodeHandle, NodeKind, NodeRecord};
pub use crate::config::{ConfigError, DEFAULT_BOOLEAN_ATTRIBUTES, EngineConfig};
pub use crate::coordinator::{BatchCoordinator, DeltaStats, ReplySink};
pub use crate::dom::LiveDom;
pub use crate::engine::{Applied, DeltaEngine, SkipReason};
pub use crate::error::{ApplyError, DomError};
pub use crate::registry::NodeRegistry;
