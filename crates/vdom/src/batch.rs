use core_types::{Origin, RequestId};
use serde::{Deserialize, Serialize};

use crate::delta::Delta;
use crate::wire::{OneOrMany, WireError};

/// Ordered deltas sharing one request identity.
///
/// Created by a producer, consumed exactly once by the coordinator, discarded
/// once its acknowledgment has been sent.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawBatch")]
pub struct Batch {
    pub id: RequestId,
    pub deltas: Vec<Delta>,
    /// Who receives the acknowledgment; `None` means the configured default.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub origin: Option<Origin>,
}

#[derive(Deserialize)]
struct RawBatch {
    id: RequestId,
    deltas: OneOrMany<Delta>,
    #[serde(default)]
    origin: Option<Origin>,
}

impl From<RawBatch> for Batch {
    fn from(raw: RawBatch) -> Self {
        Batch {
            id: raw.id,
            deltas: raw.deltas.into(),
            origin: raw.origin,
        }
    }
}

impl Batch {
    pub fn new(id: impl Into<RequestId>, deltas: Vec<Delta>) -> Self {
        Batch {
            id: id.into(),
            deltas,
            origin: None,
        }
    }

    pub fn from_origin(mut self, origin: impl Into<Origin>) -> Self {
        self.origin = Some(origin.into());
        self
    }

    /// The origin to acknowledge, falling back to `default`.
    pub fn reply_origin(&self, default: &str) -> Origin {
        self.origin.clone().unwrap_or_else(|| Origin::new(default))
    }

    pub fn from_json(json: &str) -> Result<Self, WireError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Decodes either one batch or an array of batches.
    pub fn many_from_json(json: &str) -> Result<Vec<Self>, WireError> {
        let batches: OneOrMany<Batch> = serde_json::from_str(json)?;
        Ok(batches.into())
    }
}

/// Acknowledgment sent back to a batch's origin.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "WireAck", try_from = "WireAck")]
pub struct Ack {
    pub reply_id: RequestId,
    pub success: bool,
    /// Why the batch was aborted; only present on failures.
    pub error: Option<String>,
}

const REPLY_ACTION: &str = "reply";

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireAck {
    action: String,
    reply_id: RequestId,
    success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl From<Ack> for WireAck {
    fn from(ack: Ack) -> Self {
        WireAck {
            action: REPLY_ACTION.to_string(),
            reply_id: ack.reply_id,
            success: ack.success,
            error: ack.error,
        }
    }
}

impl TryFrom<WireAck> for Ack {
    type Error = String;

    fn try_from(wire: WireAck) -> Result<Self, Self::Error> {
        if wire.action != REPLY_ACTION {
            return Err(format!("expected action \"reply\", got {:?}", wire.action));
        }
        Ok(Ack {
            reply_id: wire.reply_id,
            success: wire.success,
            error: wire.error,
        })
    }
}

impl Ack {
    pub fn success(reply_id: RequestId) -> Self {
        Ack {
            reply_id,
            success: true,
            error: None,
        }
    }

    pub fn failure(reply_id: RequestId, error: impl Into<String>) -> Self {
        Ack {
            reply_id,
            success: false,
            error: Some(error.into()),
        }
    }

    pub fn to_json(&self) -> Result<String, WireError> {
        Ok(serde_json::to_string(self)?)
    }
}
