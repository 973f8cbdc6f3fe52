//! Engine-owning worker thread and the producer-side client that talks to it.

mod client;

pub use crate::client::{ClientError, DeltaClient, PendingReply};

use bus::{DeltaCommand, DeltaEvent, ReplyRouter};
use live_dom::{BatchCoordinator, EngineConfig, LiveDom};
use std::sync::mpsc::Receiver;
use std::thread::{self, JoinHandle};

const LOG_TARGET: &str = "runtime_delta";

/// Spawns the thread that owns `dom` and applies batches in arrival order.
///
/// Runs until every command sender is dropped, then hands the tree back
/// through the join handle.
pub fn start_delta_runtime(
    mut dom: LiveDom,
    config: EngineConfig,
    cmd_rx: Receiver<DeltaCommand>,
    mut router: ReplyRouter,
) -> JoinHandle<LiveDom> {
    thread::spawn(move || {
        let mut coordinator = BatchCoordinator::new(&config);
        log::debug!(target: LOG_TARGET, "delta runtime started ({} nodes)", dom.len());

        while let Ok(cmd) = cmd_rx.recv() {
            match cmd {
                DeltaCommand::ApplyBatch(batch) => {
                    coordinator.handle_batch(&mut dom, batch, &mut router);
                }
                DeltaCommand::Subscribe { origin, replies } => {
                    router.route(origin, replies);
                }
                DeltaCommand::Snapshot { reply } => match dom.to_vnode(dom.root()) {
                    Ok(tree) => {
                        let _ = reply.send(tree);
                    }
                    Err(err) => log::error!(target: LOG_TARGET, "snapshot failed: {err}"),
                },
                DeltaCommand::Stats { reply } => {
                    let _ = reply.send(coordinator.stats());
                }
            }
        }

        let stats = coordinator.stats();
        log::debug!(target: LOG_TARGET, "delta runtime stopped: {stats:?}");
        router.notify(DeltaEvent::Stopped { stats });
        dom
    })
}
