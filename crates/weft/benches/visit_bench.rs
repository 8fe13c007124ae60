// Criterion benchmarks for the visit engine and the encode mapper.
//
// Run:
//   cargo bench -p weft

use criterion::{criterion_group, criterion_main, Criterion};

use weft::arcfilter::AnyArcFilter;
use weft::encode::{encode, EncodeMapper, EncodeType, ENCODE_LABELS, ENCODE_WEIGHTS};
use weft::fst::MutableFst;
use weft::queue::{FifoQueue, LifoQueue};
use weft::vector::VectorFst;
use weft::visit::{visit, CopyVisitor};
use weft::{Arc, StateId, TropicalWeight, Weight};

type W = TropicalWeight;

/// A ladder automaton: each state has two arcs forward, one skipping a
/// state, with small deterministic weights.
fn ladder(n: usize) -> VectorFst<W> {
    let mut fst = VectorFst::new();
    for _ in 0..n {
        fst.add_state();
    }
    fst.set_start(0);
    fst.set_final((n - 1) as StateId, W::one());
    for i in 0..n - 1 {
        let s = i as StateId;
        fst.add_arc(s, Arc::new(1, 1, W::new((i % 7) as f32), s + 1));
        if i + 2 < n {
            fst.add_arc(s, Arc::new(2, 2, W::new((i % 3) as f32), s + 2));
        }
    }
    fst
}

fn bench_copy_visit(c: &mut Criterion) {
    let fst = ladder(10_000);

    c.bench_function("copy_visit_fifo_10k", |b| {
        b.iter(|| {
            let mut out = VectorFst::<W>::new();
            let mut visitor = CopyVisitor::new(&mut out);
            let mut queue = FifoQueue::new();
            visit(&fst, &mut visitor, &mut queue, &AnyArcFilter, false);
            out
        })
    });

    c.bench_function("copy_visit_lifo_10k", |b| {
        b.iter(|| {
            let mut out = VectorFst::<W>::new();
            let mut visitor = CopyVisitor::new(&mut out);
            let mut queue = LifoQueue::new();
            visit(&fst, &mut visitor, &mut queue, &AnyArcFilter, false);
            out
        })
    });
}

fn bench_encode(c: &mut Criterion) {
    let fst = ladder(10_000);

    c.bench_function("encode_labels_weights_10k", |b| {
        b.iter(|| {
            let mut work = fst.clone();
            let mapper =
                EncodeMapper::<W>::new(ENCODE_LABELS | ENCODE_WEIGHTS, EncodeType::Encode);
            encode(&mut work, &mapper);
            work
        })
    });
}

criterion_group!(benches, bench_copy_visit, bench_encode);
criterion_main!(benches);
