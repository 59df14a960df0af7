//! Performance benchmarks for the broadcast hub.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use newscast::{Hub, HubConfig, ItemInput};

fn news(i: usize) -> ItemInput {
    ItemInput::new(format!("story {}", i), "body text", "General", "Wire")
}

fn create_hub() -> Hub {
    Hub::with_config(HubConfig {
        item_buffer_size: 4096,
        ..Default::default()
    })
    .unwrap()
}

/// Benchmark publish cost with varying numbers of live subscribers
fn bench_publish_fanout(c: &mut Criterion) {
    let mut group = c.benchmark_group("publish_fanout");

    for subscribers in [0, 1, 10, 100] {
        group.bench_with_input(
            BenchmarkId::new("subscribers", subscribers),
            &subscribers,
            |b, &n| {
                let hub = create_hub();
                let mut streams: Vec<_> = (0..n).map(|_| hub.subscribe_to_items().unwrap()).collect();

                let mut i = 0;
                b.iter(|| {
                    black_box(hub.publish(news(i)).unwrap());
                    i += 1;
                    // Keep tap queues from filling up
                    for stream in streams.iter_mut() {
                        while let Ok(Some(item)) = stream.try_recv() {
                            black_box(item);
                        }
                    }
                });
            },
        );
    }

    group.finish();
}

/// Benchmark subscribe + full replay with varying backlog sizes
fn bench_subscribe_replay(c: &mut Criterion) {
    let mut group = c.benchmark_group("subscribe_replay");

    for backlog in [10, 1_000, 10_000] {
        group.bench_with_input(BenchmarkId::new("backlog", backlog), &backlog, |b, &n| {
            let hub = create_hub();
            for i in 0..n {
                hub.publish(news(i)).unwrap();
            }

            b.iter(|| {
                let mut stream = hub.subscribe_to_items().unwrap();
                for _ in 0..n {
                    black_box(stream.try_recv().unwrap());
                }
                stream.cancel();
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_publish_fanout, bench_subscribe_replay);
criterion_main!(benches);
