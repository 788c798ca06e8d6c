//! Command-layer throughput.
//!
//! Every case goes through `CommandHandler::dispatch`, so argument checks,
//! kind checks and the storage contract are all on the measured path.

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use nimbuskv::commands::CommandHandler;
use nimbuskv::storage::StorageEngine;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

fn handler() -> CommandHandler {
    CommandHandler::new(Arc::new(StorageEngine::new()))
}

fn args(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn bench_strings(c: &mut Criterion) {
    let commands = handler();
    for i in 0..100_000 {
        commands.dispatch("SET", &args(&[&format!("key:{}", i), "value"]));
    }

    let mut group = c.benchmark_group("strings");
    group.throughput(Throughput::Elements(1));

    group.bench_function("set_small", |b| {
        let mut i = 0u64;
        b.iter(|| {
            black_box(commands.dispatch("SET", &args(&[&format!("new:{}", i), "small_value"])));
            i += 1;
        });
    });

    group.bench_function("set_1kb", |b| {
        let value = "x".repeat(1024);
        let mut i = 0u64;
        b.iter(|| {
            black_box(commands.dispatch("SET", &args(&[&format!("big:{}", i), &value])));
            i += 1;
        });
    });

    group.bench_function("get_existing", |b| {
        let mut i = 0u64;
        b.iter(|| {
            black_box(commands.dispatch("GET", &args(&[&format!("key:{}", i % 100_000)])));
            i += 1;
        });
    });

    group.bench_function("get_missing", |b| {
        let mut i = 0u64;
        b.iter(|| {
            black_box(commands.dispatch("GET", &args(&[&format!("missing:{}", i)])));
            i += 1;
        });
    });

    group.finish();
}

fn bench_lists(c: &mut Criterion) {
    let commands = handler();

    let mut group = c.benchmark_group("lists");
    group.throughput(Throughput::Elements(1));

    // LPUSH takes the store-wide lock, so this is the worst case
    group.bench_function("lpush_then_lpop", |b| {
        b.iter(|| {
            black_box(commands.dispatch("LPUSH", &args(&["queue", "job"])));
            black_box(commands.dispatch("LPOP", &args(&["queue"])));
        });
    });

    group.bench_function("lpush_many_keys", |b| {
        let mut i = 0u64;
        b.iter(|| {
            black_box(commands.dispatch("LPUSH", &args(&[&format!("list:{}", i % 1000), "v"])));
            i += 1;
        });
    });

    group.finish();
}

fn bench_hashes(c: &mut Criterion) {
    let commands = handler();
    for field in 0..32 {
        commands.dispatch("HSET", &args(&["user:1", &format!("field:{}", field), "value"]));
    }

    let mut group = c.benchmark_group("hashes");
    group.throughput(Throughput::Elements(1));

    group.bench_function("hset", |b| {
        let mut i = 0u64;
        b.iter(|| {
            black_box(commands.dispatch("HSET", &args(&["user:2", &format!("f:{}", i % 64), "v"])));
            i += 1;
        });
    });

    group.bench_function("hkeys_32_fields", |b| {
        b.iter(|| black_box(commands.dispatch("HKEYS", &args(&["user:1"]))));
    });

    group.finish();
}

fn bench_keys(c: &mut Criterion) {
    let commands = handler();
    for i in 0..1_000 {
        commands.dispatch("SET", &args(&[&format!("user:{}", i), "data"]));
        commands.dispatch("SET", &args(&[&format!("session:{}", i), "data"]));
        commands.dispatch("SET", &args(&[&format!("cache:{}", i), "data"]));
    }

    let mut group = c.benchmark_group("keys");

    group.bench_function("keys_pattern", |b| {
        b.iter(|| black_box(commands.dispatch("KEYS", &args(&["user:*"]))));
    });

    group.bench_function("keys_all", |b| {
        b.iter(|| black_box(commands.dispatch("KEYS", &args(&["*"]))));
    });

    group.finish();
}

fn bench_concurrent(c: &mut Criterion) {
    let mut group = c.benchmark_group("concurrent");
    group.measurement_time(Duration::from_secs(10));

    group.bench_function("4_threads_set_get", |b| {
        b.iter(|| {
            let commands = handler();
            let handles: Vec<_> = (0..4)
                .map(|t| {
                    let commands = commands.clone();
                    thread::spawn(move || {
                        for i in 0..10_000 {
                            let key = format!("key:{}:{}", t, i);
                            commands.dispatch("SET", &args(&[&key, "value"]));
                            commands.dispatch("GET", &args(&[&key]));
                        }
                    })
                })
                .collect();

            for handle in handles {
                handle.join().unwrap();
            }
        });
    });

    group.bench_function("4_threads_lpush_one_key", |b| {
        b.iter(|| {
            let commands = handler();
            let handles: Vec<_> = (0..4)
                .map(|_| {
                    let commands = commands.clone();
                    thread::spawn(move || {
                        for _ in 0..1_000 {
                            commands.dispatch("LPUSH", &args(&["shared", "v"]));
                        }
                    })
                })
                .collect();

            for handle in handles {
                handle.join().unwrap();
            }
            black_box(commands.dispatch("LLEN", &args(&["shared"])));
        });
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_strings,
    bench_lists,
    bench_hashes,
    bench_keys,
    bench_concurrent,
);

criterion_main!(benches);
