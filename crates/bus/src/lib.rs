use core_types::Origin;
use live_dom::{DeltaStats, ReplySink};
use std::collections::HashMap;
use std::sync::mpsc::{self, Receiver, Sender};
use vdom::{Ack, Batch, VNode};

const LOG_TARGET: &str = "bus";

#[derive(Debug)]
pub enum DeltaCommand {
    // Producer -> engine
    ApplyBatch(Batch),
    // Route acks for `origin` to `replies` from now on
    Subscribe {
        origin: Origin,
        replies: Sender<Ack>,
    },
    // Inspection, answered between batches
    Snapshot {
        reply: Sender<VNode>,
    },
    Stats {
        reply: Sender<DeltaStats>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeltaEvent {
    // Ack for an origin nobody subscribed to
    Reply { origin: Origin, ack: Ack },
    // Engine -> host, once every command sender is gone
    Stopped { stats: DeltaStats },
}

pub struct Bus {
    pub cmd_tx: Sender<DeltaCommand>,
    pub evt_rx: Receiver<DeltaEvent>,
    pub evt_tx: Sender<DeltaEvent>, // shareable for runtimes
}

impl Bus {
    /// Wires a fresh bus; the command receiver goes to the engine runtime.
    pub fn new() -> (Bus, Receiver<DeltaCommand>) {
        let (cmd_tx, cmd_rx) = mpsc::channel();
        let (evt_tx, evt_rx) = mpsc::channel();
        (
            Bus {
                cmd_tx,
                evt_rx,
                evt_tx,
            },
            cmd_rx,
        )
    }
}

/// Delivers acknowledgments to the outlet registered for their origin.
///
/// Origins without a route fall through to the event channel when one is
/// set; otherwise the ack is logged and dropped. A route whose receiver has
/// hung up is forgotten.
#[derive(Default)]
pub struct ReplyRouter {
    routes: HashMap<Origin, Sender<Ack>>,
    fallback: Option<Sender<DeltaEvent>>,
}

impl ReplyRouter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_fallback(mut self, events: Sender<DeltaEvent>) -> Self {
        self.fallback = Some(events);
        self
    }

    /// Registers (or replaces) the outlet for `origin`.
    pub fn route(&mut self, origin: Origin, replies: Sender<Ack>) {
        if self.routes.insert(origin.clone(), replies).is_some() {
            log::debug!(target: LOG_TARGET, "replaced reply route for {origin}");
        }
    }

    pub fn has_route(&self, origin: &Origin) -> bool {
        self.routes.contains_key(origin)
    }

    /// Forwards `event` to the fallback outlet, if any.
    pub fn notify(&self, event: DeltaEvent) {
        if let Some(events) = &self.fallback {
            let _ = events.send(event);
        }
    }
}

impl ReplySink for ReplyRouter {
    fn send_reply(&mut self, origin: &Origin, ack: Ack) {
        let ack = match self.routes.get(origin) {
            Some(replies) => match replies.send(ack) {
                Ok(()) => return,
                Err(mpsc::SendError(ack)) => {
                    log::warn!(target: LOG_TARGET, "reply route for {origin} is closed");
                    self.routes.remove(origin);
                    ack
                }
            },
            None => ack,
        };

        let reply_id = ack.reply_id.clone();
        let delivered = match &self.fallback {
            Some(events) => events
                .send(DeltaEvent::Reply {
                    origin: origin.clone(),
                    ack,
                })
                .is_ok(),
            None => false,
        };
        if !delivered {
            log::warn!(target: LOG_TARGET, "dropping reply {reply_id} for unknown origin {origin}");
        }
    }
}
