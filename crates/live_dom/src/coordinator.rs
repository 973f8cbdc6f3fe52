use crate::config::EngineConfig;
use crate::dom::LiveDom;
use crate::engine::{Applied, DeltaEngine};
use core_types::Origin;
use vdom::{Ack, Batch};

const LOG_TARGET: &str = "live_dom.coordinator";

/// Destination for acknowledgments, addressed by origin.
pub trait ReplySink {
    fn send_reply(&mut self, origin: &Origin, ack: Ack);
}

impl ReplySink for Vec<(Origin, Ack)> {
    fn send_reply(&mut self, origin: &Origin, ack: Ack) {
        self.push((origin.clone(), ack));
    }
}

/// Running totals for one coordinator's lifetime.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DeltaStats {
    pub batches: u64,
    pub batches_failed: u64,
    /// Every delta of every batch, whether or not it ran.
    pub deltas_received: u64,
    pub deltas_applied: u64,
    pub deltas_skipped: u64,
}

/// Applies whole batches in order and acknowledges each exactly once.
pub struct BatchCoordinator {
    engine: DeltaEngine,
    stats: DeltaStats,
    log_delta_updates: bool,
    default_origin: String,
}

impl BatchCoordinator {
    pub fn new(config: &EngineConfig) -> Self {
        BatchCoordinator {
            engine: DeltaEngine::new(config),
            stats: DeltaStats::default(),
            log_delta_updates: config.log_delta_updates,
            default_origin: config.default_origin.clone(),
        }
    }

    pub fn stats(&self) -> DeltaStats {
        self.stats
    }

    /// Applies `batch` and sends its acknowledgment to the batch origin.
    pub fn handle_batch(&mut self, dom: &mut LiveDom, batch: Batch, sink: &mut dyn ReplySink) {
        let origin = batch.reply_origin(&self.default_origin);
        let ack = self.apply_batch(dom, &batch);
        sink.send_reply(&origin, ack);
    }

    /// Applies every delta of `batch` in order, stopping at the first fatal
    /// one, and returns the acknowledgment to send.
    pub fn apply_batch(&mut self, dom: &mut LiveDom, batch: &Batch) -> Ack {
        self.stats.batches += 1;
        self.stats.deltas_received += batch.deltas.len() as u64;
        if self.log_delta_updates {
            log::info!(
                target: LOG_TARGET,
                "update {} total deltas {} (batch {} from {:?}, {} deltas)",
                self.stats.batches,
                self.stats.deltas_received,
                batch.id,
                batch.origin.as_ref().map(Origin::as_str),
                batch.deltas.len(),
            );
        }

        for (position, delta) in batch.deltas.iter().enumerate() {
            match self.engine.apply(dom, delta) {
                Ok(Applied::Skipped(_)) => self.stats.deltas_skipped += 1,
                Ok(Applied::Done | Applied::Unchanged) => self.stats.deltas_applied += 1,
                Err(err) => {
                    self.stats.batches_failed += 1;
                    log::error!(
                        target: LOG_TARGET,
                        "batch {} aborted at delta {position}/{}: {err}",
                        batch.id,
                        batch.deltas.len(),
                    );
                    return Ack::failure(batch.id.clone(), err.to_string());
                }
            }
        }
        Ack::success(batch.id.clone())
    }
}

impl Default for BatchCoordinator {
    fn default() -> Self {
        BatchCoordinator::new(&EngineConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_types::RequestId;
    use vdom::{Delta, VNode};

    #[test]
    fn acknowledges_default_origin_once() {
        let mut dom = LiveDom::new();
        let mut coordinator = BatchCoordinator::default();
        let mut replies = Vec::new();
        coordinator.handle_batch(
            &mut dom,
            Batch::new(1u64, vec![Delta::insert("body", 0, VNode::element("p").with_id("x"))]),
            &mut replies,
        );
        assert_eq!(
            replies,
            [(Origin::from("app"), Ack::success(RequestId::Number(1)))]
        );
    }

    #[test]
    fn configured_default_origin_is_used() {
        let config = EngineConfig {
            default_origin: "main".to_string(),
            ..Default::default()
        };
        let mut coordinator = BatchCoordinator::new(&config);
        let mut replies = Vec::new();
        coordinator.handle_batch(&mut LiveDom::new(), Batch::new("a", Vec::new()), &mut replies);
        coordinator.handle_batch(
            &mut LiveDom::new(),
            Batch::new("b", Vec::new()).from_origin("worker"),
            &mut replies,
        );
        let origins: Vec<&str> = replies.iter().map(|(o, _)| o.as_str()).collect();
        assert_eq!(origins, ["main", "worker"]);
    }

    #[test]
    fn counts_applied_skipped_and_failed() {
        let mut dom = LiveDom::new();
        let mut coordinator = BatchCoordinator::default();
        let ack = coordinator.apply_batch(
            &mut dom,
            &Batch::new(
                1u64,
                vec![
                    Delta::insert("body", 0, VNode::element("p").with_id("x")),
                    Delta::remove("nope"),
                    Delta::move_to("x", "body", 0),
                ],
            ),
        );
        assert!(ack.success);
        let ack = coordinator.apply_batch(
            &mut dom,
            &Batch::new(2u64, vec![Delta::replace_child("body", "missing", "x"), Delta::remove("x")]),
        );
        assert!(!ack.success);
        assert!(ack.error.as_deref().unwrap_or_default().contains("missing"));
        assert!(dom.get("x").is_some(), "deltas after the failure must not run");

        assert_eq!(
            coordinator.stats(),
            DeltaStats {
                batches: 2,
                batches_failed: 1,
                deltas_received: 5,
                deltas_applied: 2,
                deltas_skipped: 1,
            }
        );
    }
}
