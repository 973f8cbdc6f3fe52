use live_dom::{BatchCoordinator, DeltaStats, EngineConfig, LiveDom};
use serde_json::json;
use vdom::{Ack, Batch, Delta, Origin, RequestId, VNode};

fn two_item_list() -> LiveDom {
    LiveDom::from_vnode(
        &VNode::element("ul")
            .with_id("p")
            .with_child(VNode::element("li").with_id("a"))
            .with_child(VNode::element("li").with_id("b")),
    )
    .unwrap()
}

fn batch(value: serde_json::Value) -> Batch {
    serde_json::from_value(value).unwrap()
}

#[test]
fn insert_then_move_acknowledges_once() {
    let mut dom = two_item_list();
    let mut coordinator = BatchCoordinator::default();
    let mut replies = Vec::new();
    coordinator.handle_batch(
        &mut dom,
        batch(json!({
            "id": "r1",
            "deltas": [
                {"action": "insertNode", "parentId": "p", "index": 0, "content": {"id": "x", "tag": "li"}},
                {"action": "moveNode", "id": "x", "parentId": "p", "index": 2}
            ]
        })),
        &mut replies,
    );

    assert_eq!(dom.child_ids("p"), ["a", "b", "x"]);
    assert_eq!(replies.len(), 1);
    let (origin, ack) = &replies[0];
    assert_eq!(origin, &Origin::from("app"));
    assert_eq!(
        serde_json::to_value(ack).unwrap(),
        json!({"action": "reply", "replyId": "r1", "success": true})
    );
}

#[test]
fn missing_from_id_aborts_before_success() {
    let mut dom = two_item_list();
    let mut coordinator = BatchCoordinator::default();
    let mut replies = Vec::new();
    coordinator.handle_batch(
        &mut dom,
        batch(json!({
            "id": 9,
            "origin": "worker",
            "deltas": [
                {"action": "removeNode", "id": "a"},
                {"action": "replaceChild", "parentId": "p", "fromId": "missing", "toId": "b"},
                {"action": "removeNode", "id": "b"}
            ]
        })),
        &mut replies,
    );

    // Earlier deltas stay applied; later ones never run.
    assert_eq!(dom.child_ids("p"), ["b"]);
    let (origin, ack) = &replies[0];
    assert_eq!(origin.as_str(), "worker");
    assert_eq!(ack.reply_id, RequestId::Number(9));
    assert!(!ack.success);
    assert!(ack.error.as_deref().is_some_and(|e| e.starts_with("replaceChild aborted")));
}

#[test]
fn tolerated_misses_still_succeed() {
    let mut dom = two_item_list();
    let before = dom.outline(usize::MAX);
    let mut coordinator = BatchCoordinator::default();
    let ack = coordinator.apply_batch(
        &mut dom,
        &batch(json!({
            "id": 1,
            "deltas": [
                {"action": "removeNode", "id": "ghost"},
                {"action": "focusNode", "id": "ghost"},
                {"action": "updateVtext", "id": "ghost", "value": "x"},
                {"id": "ghost", "cls": {"add": ["on"]}}
            ]
        })),
    );
    assert_eq!(ack, Ack::success(RequestId::Number(1)));
    assert_eq!(dom.outline(usize::MAX), before);
    assert_eq!(coordinator.stats().deltas_skipped, 4);
}

#[test]
fn batches_apply_in_arrival_order() {
    let mut dom = two_item_list();
    let mut coordinator = BatchCoordinator::default();
    let mut replies = Vec::new();
    let batches = Batch::many_from_json(
        r#"[
            {"id": 1, "deltas": {"action": "insertNode", "parentId": "p", "index": 9, "content": {"id": "c", "tag": "li"}}},
            {"id": 2, "deltas": [{"action": "moveNode", "id": "c", "parentId": "p", "index": 0}]},
            {"id": 3, "deltas": [{"action": "updateNode", "id": "c", "attributes": {"title": "first"}}]}
        ]"#,
    )
    .unwrap();
    for batch in batches {
        coordinator.handle_batch(&mut dom, batch, &mut replies);
    }
    assert_eq!(dom.child_ids("p"), ["c", "a", "b"]);
    let element = dom.get("c").and_then(|r| r.element()).unwrap();
    assert_eq!(element.attr("title"), Some("first"));
    let ids: Vec<RequestId> = replies.into_iter().map(|(_, ack)| ack.reply_id).collect();
    assert_eq!(ids, [1u64, 2, 3].map(RequestId::from));
    assert_eq!(
        coordinator.stats(),
        DeltaStats {
            batches: 3,
            batches_failed: 0,
            deltas_received: 3,
            deltas_applied: 3,
            deltas_skipped: 0,
        }
    );
}

#[test]
fn summary_logging_does_not_change_results() {
    let config = EngineConfig {
        log_delta_updates: true,
        ..Default::default()
    };
    let mut dom = two_item_list();
    let mut coordinator = BatchCoordinator::new(&config);
    let ack = coordinator.apply_batch(&mut dom, &Batch::new(5u64, vec![Delta::remove("a")]));
    assert!(ack.success);
    assert_eq!(dom.child_ids("p"), ["b"]);
}

struct Lcg {
    state: u64,
}

impl Lcg {
    fn new(seed: u64) -> Self {
        Self { state: seed }
    }

    fn next_u64(&mut self) -> u64 {
        self.state = self
            .state
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        self.state
    }

    fn gen_range(&mut self, upper: usize) -> usize {
        if upper == 0 {
            return 0;
        }
        (self.next_u64() >> 32) as usize % upper
    }
}

fn seed_count() -> usize {
    if let Ok(value) = std::env::var("DELTADOM_FUZZ_SEEDS")
        && let Ok(parsed) = value.parse::<usize>()
        && parsed > 0
    {
        return parsed;
    }
    64
}

#[test]
fn randomized_moves_and_inserts() {
    let base = 0x5eed_d0d0_u64;
    for offset in 0..seed_count() as u64 {
        let seed = base.wrapping_add(offset);
        let mut rng = Lcg::new(seed);
        let mut dom = LiveDom::from_vnode(&VNode::element("div").with_id("p")).unwrap();
        let mut coordinator = BatchCoordinator::default();
        let mut next_id = 0usize;

        for step in 0..40u64 {
            let count = dom.child_ids("p").len();
            if count == 0 || rng.gen_range(3) == 0 {
                let index = rng.gen_range(count + 3);
                let id = format!("n{next_id}");
                next_id += 1;
                let ack = coordinator.apply_batch(
                    &mut dom,
                    &Batch::new(step, vec![Delta::insert("p", index, VNode::element("span").with_id(id.as_str()))]),
                );
                assert!(ack.success, "seed {seed:#x} step {step}: {ack:?}");
                let landed = dom.child_ids("p").iter().position(|c| *c == id);
                assert_eq!(landed, Some(index.min(count)), "seed {seed:#x} step {step}");
            } else {
                let ids = dom.child_ids("p");
                let id = ids[rng.gen_range(ids.len())].clone();
                let index = rng.gen_range(count + 2);
                let once = Delta::move_to(id.as_str(), "p", index);
                coordinator.apply_batch(&mut dom, &Batch::new(step, vec![once.clone()]));
                let after_once = dom.child_ids("p");
                let ack = coordinator.apply_batch(&mut dom, &Batch::new(step, vec![once]));
                assert!(ack.success);
                assert_eq!(dom.child_ids("p"), after_once, "seed {seed:#x} step {step}: move not idempotent");
                let landed = after_once.iter().position(|c| *c == id);
                assert_eq!(landed, Some(index.min(count - 1)), "seed {seed:#x} step {step}");
            }
        }
        assert_eq!(coordinator.stats().batches_failed, 0);
    }
}
