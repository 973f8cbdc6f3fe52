//! Value model for the delta protocol: content subtrees, delta operations,
//! batches and acknowledgments, plus their JSON wire form.

mod batch;
mod delta;
mod types;
mod wire;

pub use crate::batch::{Ack, Batch};
pub use crate::delta::{Attributes, ClassDelta, Delta, NodeUpdate};
pub use crate::types::{Fragment, VNode};
pub use crate::wire::WireError;

pub use core_types::{NodeId, Origin, RequestId};
