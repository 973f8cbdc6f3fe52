use bus::{Bus, DeltaCommand, DeltaEvent, ReplyRouter};
use live_dom::{EngineConfig, LiveDom};
use runtime_delta::{ClientError, DeltaClient, start_delta_runtime};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;
use vdom::{Ack, Batch, Delta, NodeUpdate, RequestId, VNode};

const WAIT: Duration = Duration::from_secs(5);

fn list() -> LiveDom {
    LiveDom::from_vnode(
        &VNode::element("ul")
            .with_id("p")
            .with_child(VNode::element("li").with_id("a"))
            .with_child(VNode::element("li").with_id("b")),
    )
    .unwrap()
}

#[test]
fn client_round_trip() {
    let (bus, cmd_rx) = Bus::new();
    let runtime = start_delta_runtime(list(), EngineConfig::default(), cmd_rx, ReplyRouter::new());
    let client = DeltaClient::connect(bus.cmd_tx.clone(), "app").unwrap();

    let first = client
        .submit(vec![
            Delta::insert("p", 0, VNode::element("li").with_id("x")),
            Delta::move_to("x", "p", 2),
        ])
        .unwrap();
    let ack = first.wait_timeout(WAIT).unwrap();
    assert_eq!(ack, Ack::success(first.id().clone()));

    let failed = client
        .submit(vec![Delta::replace_child("p", "missing", "a")])
        .unwrap();
    let ack = failed.wait_timeout(WAIT).unwrap();
    assert!(!ack.success);
    assert_ne!(failed.id(), first.id());

    let tree = client.snapshot().unwrap();
    let ids: Vec<String> = tree
        .children()
        .iter()
        .filter_map(|c| c.id().map(ToString::to_string))
        .collect();
    assert_eq!(ids, ["a", "b", "x"]);

    let stats = client.stats().unwrap();
    assert_eq!(stats.batches, 2);
    assert_eq!(stats.batches_failed, 1);
    assert_eq!(client.pending_count(), 0);

    drop(client);
    drop(bus);
    let dom = runtime.join().unwrap();
    assert_eq!(dom.child_ids("p"), ["a", "b", "x"]);
}

#[test]
fn acks_reach_their_own_origin() {
    let (bus, cmd_rx) = Bus::new();
    let runtime = start_delta_runtime(list(), EngineConfig::default(), cmd_rx, ReplyRouter::new());
    let main = DeltaClient::connect(bus.cmd_tx.clone(), "app").unwrap();
    let worker = DeltaClient::connect(bus.cmd_tx.clone(), "worker").unwrap();

    // Same request id from two origins: each client gets its own ack.
    let from_main = main.submit_batch(Batch::new("same", vec![Delta::remove("a")])).unwrap();
    let from_worker = worker
        .submit_batch(Batch::new("same", vec![Delta::remove("b")]))
        .unwrap();
    assert!(from_main.wait_timeout(WAIT).unwrap().success);
    assert!(from_worker.wait_timeout(WAIT).unwrap().success);

    drop((main, worker, bus));
    assert!(runtime.join().unwrap().child_ids("p").is_empty());
}

#[test]
fn concurrent_producers_each_get_every_ack() {
    let (bus, cmd_rx) = Bus::new();
    let runtime = start_delta_runtime(
        LiveDom::from_vnode(&VNode::element("div").with_id("root")).unwrap(),
        EngineConfig::default(),
        cmd_rx,
        ReplyRouter::new(),
    );

    let producers: Vec<_> = (0..4)
        .map(|worker| {
            let cmd_tx = bus.cmd_tx.clone();
            thread::spawn(move || {
                let client = DeltaClient::connect(cmd_tx, format!("worker-{worker}").as_str()).unwrap();
                let replies: Vec<_> = (0..25)
                    .map(|i| {
                        client
                            .submit(vec![Delta::insert(
                                "root",
                                usize::MAX,
                                VNode::element("span").with_id(format!("w{worker}-{i}")),
                            )])
                            .unwrap()
                    })
                    .collect();
                replies
                    .into_iter()
                    .map(|reply| reply.wait_timeout(WAIT).unwrap())
                    .filter(|ack| ack.success)
                    .count()
            })
        })
        .collect();

    for producer in producers {
        assert_eq!(producer.join().unwrap(), 25);
    }
    drop(bus);
    let dom = runtime.join().unwrap();
    assert_eq!(dom.child_ids("root").len(), 100);
}

#[test]
fn unrouted_origins_surface_as_events() {
    let (bus, cmd_rx) = Bus::new();
    let router = ReplyRouter::new().with_fallback(bus.evt_tx.clone());
    let runtime = start_delta_runtime(list(), EngineConfig::default(), cmd_rx, router);

    bus.cmd_tx
        .send(DeltaCommand::ApplyBatch(Batch::new(
            7u64,
            vec![Delta::update(NodeUpdate::on("a").cls(["on"], Vec::<String>::new()))],
        )))
        .unwrap();
    let Bus {
        cmd_tx,
        evt_rx,
        evt_tx,
    } = bus;
    drop((cmd_tx, evt_tx));

    assert_eq!(
        evt_rx.recv_timeout(WAIT).unwrap(),
        DeltaEvent::Reply {
            origin: "app".into(),
            ack: Ack::success(RequestId::Number(7)),
        }
    );
    assert!(matches!(
        evt_rx.recv_timeout(WAIT).unwrap(),
        DeltaEvent::Stopped { stats } if stats.batches == 1
    ));
    let dom = runtime.join().unwrap();
    assert!(dom.get("a").and_then(|r| r.element()).unwrap().has_class("on"));
}

#[test]
fn stopped_runtime_reports_disconnect() {
    let (cmd_tx, cmd_rx) = mpsc::channel();
    let client = DeltaClient::connect(cmd_tx, "app").unwrap();
    drop(cmd_rx);
    assert_eq!(
        client.submit(vec![Delta::remove("a")]).map(|_| ()),
        Err(ClientError::Disconnected)
    );
    assert_eq!(client.snapshot().map(|_| ()), Err(ClientError::Disconnected));
}

#[test]
fn wait_timeout_expires_without_a_reply() {
    // Nothing drains the command channel, so no ack ever arrives.
    let (cmd_tx, _cmd_rx) = mpsc::channel();
    let client = DeltaClient::connect(cmd_tx, "app").unwrap();
    let reply = client.submit(Vec::new()).unwrap();
    assert_eq!(
        reply.wait_timeout(Duration::from_millis(20)),
        Err(ClientError::Timeout(reply.id().clone()))
    );
    assert_eq!(reply.try_get(), None);

    let _held = client.submit_batch(Batch::new("dup", Vec::new())).unwrap();
    assert_eq!(
        client.submit_batch(Batch::new("dup", Vec::new())).map(|_| ()),
        Err(ClientError::DuplicateRequest(RequestId::from("dup")))
    );
    assert_eq!(client.pending_count(), 2);
}
