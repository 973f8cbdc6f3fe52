use criterion::{BatchSize, Criterion, black_box, criterion_group, criterion_main};
use live_dom::{BatchCoordinator, LiveDom};
use vdom::{Attributes, Batch, Delta, NodeUpdate, VNode};

const SMALL_ITEMS: usize = 64;
const LARGE_ITEMS: usize = 5_000;

fn make_list(items: usize) -> LiveDom {
    let mut root = VNode::element("ul").with_id("list");
    for i in 0..items {
        root = root.with_child(
            VNode::element("li")
                .with_id(format!("item-{i}"))
                .with_class("row")
                .with_child(VNode::text(format!("row {i}"))),
        );
    }
    LiveDom::from_vnode(&root).expect("bench list should build")
}

/// Rotates the list by moving every item to the front, then touches each one.
fn make_reorder_batch(items: usize) -> Batch {
    let mut deltas = Vec::with_capacity(items * 2);
    for i in 0..items {
        deltas.push(Delta::move_to(format!("item-{i}"), "list", 0));
    }
    for i in 0..items {
        deltas.push(Delta::update(
            NodeUpdate::on(format!("item-{i}"))
                .attributes(Attributes::default().set("data-pos", i.to_string()))
                .cls(["moved"], ["row"]),
        ));
    }
    Batch::new(1u64, deltas)
}

fn make_churn_batch(items: usize) -> Batch {
    let mut deltas = Vec::with_capacity(items * 2);
    for i in 0..items {
        deltas.push(Delta::insert(
            "list",
            i,
            VNode::element("li").with_id(format!("new-{i}")),
        ));
        deltas.push(Delta::remove(format!("item-{i}")));
    }
    Batch::new(2u64, deltas)
}

fn bench_reorder(c: &mut Criterion, name: &str, items: usize) {
    let batch = make_reorder_batch(items);
    c.bench_function(name, |b| {
        b.iter_batched(
            || (make_list(items), BatchCoordinator::default()),
            |(mut dom, mut coordinator)| {
                let ack = coordinator.apply_batch(&mut dom, black_box(&batch));
                black_box(ack);
            },
            BatchSize::LargeInput,
        );
    });
}

fn bench_reorder_small(c: &mut Criterion) {
    bench_reorder(c, "bench_reorder_small", SMALL_ITEMS);
}

fn bench_reorder_large(c: &mut Criterion) {
    bench_reorder(c, "bench_reorder_large", LARGE_ITEMS);
}

fn bench_insert_remove_churn(c: &mut Criterion) {
    let batch = make_churn_batch(LARGE_ITEMS);
    c.bench_function("bench_insert_remove_churn", |b| {
        b.iter_batched(
            || (make_list(LARGE_ITEMS), BatchCoordinator::default()),
            |(mut dom, mut coordinator)| {
                let ack = coordinator.apply_batch(&mut dom, black_box(&batch));
                black_box(ack);
            },
            BatchSize::LargeInput,
        );
    });
}

fn bench_decode_batch(c: &mut Criterion) {
    let json = serde_json::to_string(&make_reorder_batch(LARGE_ITEMS)).expect("bench batch should encode");
    c.bench_function("bench_decode_batch", |b| {
        b.iter(|| {
            let batch = Batch::from_json(black_box(&json));
            black_box(batch.expect("bench batch should decode").deltas.len());
        });
    });
}

criterion_group!(
    benches,
    bench_reorder_small,
    bench_reorder_large,
    bench_insert_remove_churn,
    bench_decode_batch,
);
criterion_main!(benches);
