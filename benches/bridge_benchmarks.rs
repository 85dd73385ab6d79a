//! Benchmarks for the bridge hot paths.
//!
//! - binding into a registry crowded with dead contexts (prune cost)
//! - script-to-native calls through the trampoline
//! - compiling and running a script node's catalog
//!
//! ```bash
//! cargo bench --bench bridge_benchmarks
//! ```

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use std::hint::black_box;
use tinybridge::scene::SceneHandle;
use tinybridge::{Bridge, NodeConfig, ScriptContext, ScriptNode};

fn bind_benchmarks(c: &mut Criterion) {
    let mut group = c.benchmark_group("bind");

    for dead in [0usize, 10, 100] {
        group.bench_with_input(BenchmarkId::new("after_dead_contexts", dead), &dead, |b, &dead| {
            b.iter(|| {
                let bridge = Bridge::new();
                for _ in 0..dead {
                    let mut ctx = ScriptContext::new(&bridge);
                    ctx.bind_function("value(): int", || 1).unwrap();
                }
                let mut ctx = ScriptContext::new(&bridge);
                ctx.bind_function("value(): int", || 2).unwrap();
                black_box(bridge.registry_count())
            });
        });
    }

    group.finish();
}

fn call_benchmarks(c: &mut Criterion) {
    let mut group = c.benchmark_group("call");

    let bridge = Bridge::new();
    let mut ctx = ScriptContext::new(&bridge);
    ctx.bind_function("add(int, int): int", |a: i64, b: i64| a + b).unwrap();
    ctx.compile(
        "func sum(n: int): int {
            var total = 0
            var i = 0
            while i < n { total = add(total, i); i = i + 1 }
            return total
        }",
    )
    .unwrap();

    for n in [10i64, 1000] {
        group.throughput(Throughput::Elements(n as u64));
        group.bench_with_input(BenchmarkId::new("native_in_loop", n), &n, |b, &n| {
            b.iter(|| black_box(ctx.call_function::<i64, _>("sum", (black_box(n),))));
        });
    }

    group.finish();
}

fn node_benchmarks(c: &mut Criterion) {
    let source = r#"
        func main() {
            var i = 0
            while i < 20 {
                pos(scale(Label("item", "bigFont.fnt"), 0.5), i * 10, 0)
                i = i + 1
            }
        }
    "#;

    c.bench_function("script_node_create", |b| {
        let scene = SceneHandle::default();
        let bridge = Bridge::new();
        let config = NodeConfig::default();
        b.iter(|| black_box(ScriptNode::create(&scene, &bridge, source, &config).unwrap()));
    });
}

criterion_group!(benches, bind_benchmarks, call_benchmarks, node_benchmarks);
criterion_main!(benches);
