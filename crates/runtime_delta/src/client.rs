use bus::DeltaCommand;
use core_types::{Origin, RequestId};
use live_dom::DeltaStats;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::Duration;
use thiserror::Error;
use vdom::{Ack, Batch, Delta, VNode};

use crate::LOG_TARGET;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClientError {
    #[error("the delta runtime has stopped")]
    Disconnected,
    #[error("no reply to request {0} before the timeout")]
    Timeout(RequestId),
    #[error("request {0} is already pending")]
    DuplicateRequest(RequestId),
}

#[derive(Default)]
struct Pending {
    waiters: Mutex<HashMap<RequestId, Sender<Ack>>>,
    closed: AtomicBool,
}

impl Pending {
    fn waiters(&self) -> MutexGuard<'_, HashMap<RequestId, Sender<Ack>>> {
        self.waiters.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Producer handle: submits batches under one origin and resolves their
/// acknowledgments by request id.
pub struct DeltaClient {
    origin: Origin,
    cmd_tx: Sender<DeltaCommand>,
    pending: Arc<Pending>,
    next_id: AtomicU64,
}

impl DeltaClient {
    /// Subscribes `origin` on the runtime and starts the reply pump.
    pub fn connect(
        cmd_tx: Sender<DeltaCommand>,
        origin: impl Into<Origin>,
    ) -> Result<Self, ClientError> {
        let origin = origin.into();
        let (ack_tx, ack_rx) = mpsc::channel();
        cmd_tx
            .send(DeltaCommand::Subscribe {
                origin: origin.clone(),
                replies: ack_tx,
            })
            .map_err(|_| ClientError::Disconnected)?;

        let pending = Arc::new(Pending::default());
        let pump = Arc::clone(&pending);
        let pump_origin = origin.clone();
        thread::spawn(move || pump_replies(&pump_origin, &ack_rx, &pump));

        Ok(DeltaClient {
            origin,
            cmd_tx,
            pending,
            next_id: AtomicU64::new(1),
        })
    }

    pub fn origin(&self) -> &Origin {
        &self.origin
    }

    /// Submits `deltas` as one batch under a freshly allocated numeric id.
    pub fn submit(&self, deltas: Vec<Delta>) -> Result<PendingReply, ClientError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.submit_batch(Batch::new(id, deltas))
    }

    /// Submits a prepared batch; its origin is overwritten with this client's.
    pub fn submit_batch(&self, mut batch: Batch) -> Result<PendingReply, ClientError> {
        batch.origin = Some(self.origin.clone());
        let id = batch.id.clone();
        let (tx, rx) = mpsc::channel();
        {
            let mut waiters = self.pending.waiters();
            if waiters.contains_key(&id) {
                return Err(ClientError::DuplicateRequest(id));
            }
            if self.pending.closed.load(Ordering::Acquire) {
                return Err(ClientError::Disconnected);
            }
            waiters.insert(id.clone(), tx);
        }

        if self.cmd_tx.send(DeltaCommand::ApplyBatch(batch)).is_err() {
            self.pending.waiters().remove(&id);
            return Err(ClientError::Disconnected);
        }
        log::trace!(target: LOG_TARGET, "{} submitted request {id}", self.origin);
        Ok(PendingReply { id, rx })
    }

    /// Materialized copy of the live tree, taken between batches.
    pub fn snapshot(&self) -> Result<VNode, ClientError> {
        let (reply, rx) = mpsc::channel();
        self.cmd_tx
            .send(DeltaCommand::Snapshot { reply })
            .map_err(|_| ClientError::Disconnected)?;
        rx.recv().map_err(|_| ClientError::Disconnected)
    }

    pub fn stats(&self) -> Result<DeltaStats, ClientError> {
        let (reply, rx) = mpsc::channel();
        self.cmd_tx
            .send(DeltaCommand::Stats { reply })
            .map_err(|_| ClientError::Disconnected)?;
        rx.recv().map_err(|_| ClientError::Disconnected)
    }

    pub fn pending_count(&self) -> usize {
        self.pending.waiters().len()
    }
}

fn pump_replies(origin: &Origin, acks: &Receiver<Ack>, pending: &Pending) {
    while let Ok(ack) = acks.recv() {
        let waiter = pending.waiters().remove(&ack.reply_id);
        match waiter {
            // Fails only if the PendingReply was dropped.
            Some(tx) => {
                let _ = tx.send(ack);
            }
            None => log::warn!(
                target: LOG_TARGET,
                "{origin} got reply {} with no pending request",
                ack.reply_id
            ),
        }
    }
    pending.closed.store(true, Ordering::Release);
    let orphaned = std::mem::take(&mut *pending.waiters());
    if !orphaned.is_empty() {
        log::warn!(
            target: LOG_TARGET,
            "{origin}: runtime stopped with {} requests unanswered",
            orphaned.len()
        );
    }
}

/// Acknowledgment of one submitted batch, resolved by the reply pump.
///
/// There is no cancellation: dropping this only discards the result.
#[derive(Debug)]
pub struct PendingReply {
    id: RequestId,
    rx: Receiver<Ack>,
}

impl PendingReply {
    pub fn id(&self) -> &RequestId {
        &self.id
    }

    /// Blocks until the acknowledgment arrives.
    pub fn wait(self) -> Result<Ack, ClientError> {
        self.rx.recv().map_err(|_| ClientError::Disconnected)
    }

    /// Like [`PendingReply::wait`], giving up after `timeout`. May be retried.
    pub fn wait_timeout(&self, timeout: Duration) -> Result<Ack, ClientError> {
        self.rx.recv_timeout(timeout).map_err(|err| match err {
            RecvTimeoutError::Timeout => ClientError::Timeout(self.id.clone()),
            RecvTimeoutError::Disconnected => ClientError::Disconnected,
        })
    }

    /// The acknowledgment, if it has already arrived.
    pub fn try_get(&self) -> Option<Ack> {
        self.rx.try_recv().ok()
    }
}
