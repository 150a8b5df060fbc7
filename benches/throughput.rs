//! Throughput Benchmark for shardcache
//!
//! This benchmark measures the performance of the cache engine and the
//! command line parser under various workloads.

use bytes::Bytes;
use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use shardcache::protocol::parse_command;
use shardcache::storage::{CacheEngine, EngineConfig};
use std::sync::Arc;
use std::time::Duration;

/// Benchmark SET operations
fn bench_set(c: &mut Criterion) {
    let engine = Arc::new(CacheEngine::default());

    let mut group = c.benchmark_group("set");
    group.throughput(Throughput::Elements(1));

    group.bench_function("set_small", |b| {
        let mut i = 0u64;
        let value = Bytes::from("small_value");
        b.iter(|| {
            let key = format!("key:{}", i);
            engine.set(&key, value.clone(), 0, 0).unwrap();
            i += 1;
        });
    });

    group.bench_function("set_medium", |b| {
        let mut i = 0u64;
        let value = Bytes::from("x".repeat(1024)); // 1KB value
        b.iter(|| {
            let key = format!("key:{}", i);
            engine.set(&key, value.clone(), 0, 0).unwrap();
            i += 1;
        });
    });

    group.bench_function("set_large", |b| {
        let mut i = 0u64;
        let value = vec![b'x'; 64 * 1024]; // 64KB value, copied on store
        b.iter(|| {
            let key = format!("key:{}", i);
            engine.set_from_slice(&key, &value, 0, 0).unwrap();
            i += 1;
        });
    });

    group.finish();
}

/// Benchmark GET operations
fn bench_get(c: &mut Criterion) {
    let engine = Arc::new(CacheEngine::default());

    // Pre-populate with data
    for i in 0..100_000 {
        let key = format!("key:{}", i);
        let value = Bytes::from(format!("value:{}", i));
        engine.set(&key, value, 0, 0).unwrap();
    }

    let mut group = c.benchmark_group("get");
    group.throughput(Throughput::Elements(1));

    group.bench_function("get_existing", |b| {
        let mut i = 0u64;
        b.iter(|| {
            let key = format!("key:{}", i % 100_000);
            black_box(engine.get(&key).unwrap());
            i += 1;
        });
    });

    group.bench_function("get_missing", |b| {
        let mut i = 0u64;
        b.iter(|| {
            let key = format!("missing:{}", i);
            black_box(engine.get(&key).unwrap());
            i += 1;
        });
    });

    group.finish();
}

/// Benchmark mixed workload (80% reads, 20% writes)
fn bench_mixed(c: &mut Criterion) {
    let engine = Arc::new(CacheEngine::default());

    // Pre-populate
    for i in 0..10_000 {
        let key = format!("key:{}", i);
        let value = Bytes::from(format!("value:{}", i));
        engine.set(&key, value, 0, 0).unwrap();
    }

    let mut group = c.benchmark_group("mixed");
    group.throughput(Throughput::Elements(1));

    group.bench_function("80_read_20_write", |b| {
        let mut i = 0u64;
        b.iter(|| {
            if i % 5 == 0 {
                // 20% writes
                let key = format!("new:{}", i);
                engine.set(&key, Bytes::from("value"), 0, 0).unwrap();
            } else {
                // 80% reads
                let key = format!("key:{}", i % 10_000);
                black_box(engine.get(&key).unwrap());
            }
            i += 1;
        });
    });

    group.finish();
}

/// Benchmark TTL updates and LRU eviction
fn bench_ttl_and_eviction(c: &mut Criterion) {
    let mut group = c.benchmark_group("ttl");
    group.throughput(Throughput::Elements(1));

    group.bench_function("touch_existing", |b| {
        let engine = CacheEngine::default();
        for i in 0..10_000 {
            engine
                .set(&format!("touch:{}", i), Bytes::from("value"), 60, 0)
                .unwrap();
        }

        let mut i = 0u64;
        b.iter(|| {
            let key = format!("touch:{}", i % 10_000);
            black_box(engine.touch(&key, 3600).unwrap());
            i += 1;
        });
    });

    // Every insert past the first 64 evicts the least recently used entry
    group.bench_function("set_evicting", |b| {
        let engine = CacheEngine::new(EngineConfig {
            shards: 1,
            shard_capacity: 64,
        });

        let mut i = 0u64;
        b.iter(|| {
            let key = format!("evict:{}", i);
            engine.set(&key, Bytes::from("value"), 0, 0).unwrap();
            i += 1;
        });
    });

    group.finish();
}

/// Benchmark command line parsing
fn bench_parse(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse");
    group.throughput(Throughput::Elements(1));

    group.bench_function("parse_get", |b| {
        b.iter(|| black_box(parse_command(black_box(b"get user:1234")).unwrap()));
    });

    group.bench_function("parse_set", |b| {
        b.iter(|| black_box(parse_command(black_box(b"set user:1234 7 3600 512 noreply")).unwrap()));
    });

    group.finish();
}

/// Benchmark concurrent access
fn bench_concurrent(c: &mut Criterion) {
    use std::thread;

    let mut group = c.benchmark_group("concurrent");
    group.measurement_time(Duration::from_secs(10));

    group.bench_function("4_threads_mixed", |b| {
        b.iter(|| {
            let engine = Arc::new(CacheEngine::default());
            let handles: Vec<_> = (0..4)
                .map(|t| {
                    let engine = Arc::clone(&engine);
                    thread::spawn(move || {
                        for i in 0..10_000 {
                            let key = format!("key:{}:{}", t, i);
                            engine.set(&key, Bytes::from("value"), 0, 0).unwrap();
                            engine.get(&key).unwrap();
                        }
                    })
                })
                .collect();

            for handle in handles {
                handle.join().unwrap();
            }

            black_box(engine.len());
        });
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_set,
    bench_get,
    bench_mixed,
    bench_ttl_and_eviction,
    bench_parse,
    bench_concurrent,
);

criterion_main!(benches);
