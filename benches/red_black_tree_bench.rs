use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};
use probe_containers::RedBlackTree;
use std::time::Duration;

const N: usize = 100_000;

fn lcg(mut s: u64) -> impl Iterator<Item = u64> {
    std::iter::from_fn(move || {
        s = s.wrapping_mul(6364136223846793005).wrapping_add(1);
        Some(s)
    })
}

fn filled(seed: u64) -> (RedBlackTree<u64>, Vec<u64>) {
    let mut t = RedBlackTree::new();
    let values: Vec<u64> = lcg(seed).take(N).collect();
    for v in &values {
        let _ = t.insert(*v);
    }
    (t, values)
}

fn bench_insert(c: &mut Criterion) {
    c.bench_function("rbtree::insert_random_100k", |b| {
        b.iter_batched(
            RedBlackTree::<u64>::new,
            |mut t| {
                for v in lcg(1).take(N) {
                    let _ = t.insert(v);
                }
                black_box(t)
            },
            BatchSize::SmallInput,
        )
    });
    c.bench_function("rbtree::insert_ascending_100k", |b| {
        b.iter_batched(
            RedBlackTree::<u64>::new,
            |mut t| {
                for v in 0..N as u64 {
                    t.insert(v).unwrap();
                }
                black_box(t)
            },
            BatchSize::SmallInput,
        )
    });
}

fn bench_lookup(c: &mut Criterion) {
    c.bench_function("rbtree::contains_hit_10k_on_100k", |b| {
        let (t, values) = filled(7);
        let qs: Vec<u64> = values.iter().step_by(10).copied().collect();
        b.iter(|| {
            for q in &qs {
                black_box(t.contains(q));
            }
        })
    });
}

fn bench_remove(c: &mut Criterion) {
    c.bench_function("rbtree::remove_every_10th_of_100k", |b| {
        b.iter_batched(
            || filled(5),
            |(mut t, values)| {
                for v in values.iter().step_by(10) {
                    black_box(t.remove(v));
                }
                black_box(t)
            },
            BatchSize::SmallInput,
        )
    });
}

fn bench_traverse(c: &mut Criterion) {
    c.bench_function("rbtree::visit_in_order_100k", |b| {
        let (t, _) = filled(9);
        b.iter(|| {
            let mut sum = 0u64;
            t.visit_in_order(|v| sum = sum.wrapping_add(*v));
            black_box(sum)
        })
    });
}

fn bench_config() -> Criterion {
    Criterion::default()
        .sample_size(12)
        .measurement_time(Duration::from_secs(5))
        .warm_up_time(Duration::from_secs(1))
}

criterion_group! {
    name = benches;
    config = bench_config();
    targets = bench_insert, bench_lookup, bench_remove, bench_traverse
}
criterion_main!(benches);
