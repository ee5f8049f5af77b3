use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use trace_trees::{AnyTree, Engine, TreeConfig, TreeKind};

/// Keys `0..num_nodes` ordered so that a plain BST built from them is
/// perfectly balanced: the middle first, then the middles of each half.
fn balanced_order(num_nodes: usize) -> Vec<i32> {
    let mut order = Vec::with_capacity(num_nodes);
    let mut ranges = std::collections::VecDeque::from([(0, num_nodes)]);
    while let Some((low, high)) = ranges.pop_front() {
        if low >= high {
            continue;
        }
        let mid = low + (high - low) / 2;
        order.push(mid as i32);
        ranges.push_back((low, mid));
        ranges.push_back((mid + 1, high));
    }
    order
}

/// Helper to bench a function on every engine.
/// It creates a group for the given name and closure and runs it for
/// various sizes and engines before finishing the group. Every iteration
/// works on a fresh clone so mutations don't pile up.
fn bench_helper(c: &mut Criterion, name: &str, f: impl Fn(&mut AnyTree<i32>, i32)) {
    let mut group = c.benchmark_group(name);

    for num_levels in [3, 7, 11] {
        let num_nodes = 2usize.pow(num_levels) - 1;
        let largest_element_in_tree = num_nodes as i32 - 1;
        let keys = balanced_order(num_nodes);

        for kind in TreeKind::ALL {
            let mut tree = TreeConfig::new(kind).build().unwrap();
            for &key in &keys {
                tree.insert(key);
            }
            let id = BenchmarkId::new(kind.name(), largest_element_in_tree);

            group.bench_function(id, |b| {
                b.iter_custom(|iters| {
                    let mut time = std::time::Duration::ZERO;
                    for _ in 0..iters {
                        let mut tree = black_box(tree.clone());
                        let instant = std::time::Instant::now();
                        f(&mut tree, black_box(largest_element_in_tree));
                        time += instant.elapsed();
                    }
                    time
                })
            });
        }
    }

    group.finish();
}

pub fn criterion_benchmark(c: &mut Criterion) {
    bench_helper(c, "search", |tree, i| {
        let _trace = black_box(tree.search(&i));
    });
    bench_helper(c, "delete", |tree, i| {
        let _trace = black_box(tree.delete(&i));
    });

    bench_helper(c, "insert", |tree, i| {
        let _trace = black_box(tree.insert(i + 1));
    });

    bench_helper(c, "search-miss", |tree, i| {
        let _trace = black_box(tree.search(&(i + 1)));
    });
    bench_helper(c, "delete-miss", |tree, i| {
        let _trace = black_box(tree.delete(&(i + 1)));
    });

    bench_helper(c, "snapshot", |tree, _| {
        let _snapshot = black_box(tree.snapshot());
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
