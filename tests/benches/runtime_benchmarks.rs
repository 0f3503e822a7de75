//! # Wallet Background Benchmarks
//!
//! | Component | Path measured |
//! |-----------|---------------|
//! | ObservableStore | merge + synchronous fan-out to N listeners |
//! | SubscriptionBroker | canonical signature + ordered delivery to N subscribers |
//! | MigrationRunner | oldest persisted envelope to the current schema |

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use serde_json::json;
use shared_bus::{ObservableStore, SubscriptionBroker};
use shared_types::{AccountsState, AddressOnNetwork, MainState, NetworkId, StatePatch};
use wb_01_state_migration::wallet_migrations;

fn accounts(count: usize) -> AccountsState {
    AccountsState {
        tracked: (0..count)
            .map(|i| AddressOnNetwork::new(format!("0x{i:040x}"), NetworkId::default()))
            .collect(),
    }
}

// ============================================================================
// ObservableStore
// ============================================================================

fn bench_store_update(c: &mut Criterion) {
    let mut group = c.benchmark_group("store-update-state");

    for listeners in [1usize, 10, 100] {
        let store = ObservableStore::new(MainState::default());
        let seen = Arc::new(AtomicUsize::new(0));
        for _ in 0..listeners {
            let seen = Arc::clone(&seen);
            store.on(move |state: &MainState| {
                seen.fetch_add(state.accounts.tracked.len(), Ordering::Relaxed);
            });
        }
        let patch = accounts(20);

        group.throughput(Throughput::Elements(listeners as u64));
        group.bench_with_input(BenchmarkId::new("listeners", listeners), &patch, |b, patch| {
            b.iter(|| store.update_state(StatePatch::accounts(black_box(patch.clone()))))
        });
    }

    group.finish();
}

// ============================================================================
// SubscriptionBroker
// ============================================================================

fn bench_broker_publish(c: &mut Criterion) {
    let mut group = c.benchmark_group("broker-publish");
    let params = json!({ "network": "ethereum", "address": "0x00000000000000000000000000000000000000a1" });
    let payload = json!({ "event": "updated", "kind": "collections", "upserted": 3 });

    for subscribers in [1usize, 10, 100] {
        let broker = SubscriptionBroker::new();
        for i in 0..subscribers {
            broker.register("/nfts/", &params, format!("tab-{i}"), |payload| {
                black_box(payload);
                Ok(())
            });
        }

        group.throughput(Throughput::Elements(subscribers as u64));
        group.bench_function(BenchmarkId::new("subscribers", subscribers), |b| {
            b.iter(|| black_box(broker.publish("/nfts/", &params, &payload)))
        });
    }

    group.finish();
}

// ============================================================================
// MigrationRunner
// ============================================================================

fn bench_migration(c: &mut Criterion) {
    let mut group = c.benchmark_group("migration");
    let Ok(runner) = wallet_migrations() else {
        return;
    };

    for addresses in [1usize, 100] {
        let legacy = json!({
            "version": 1,
            "state": {
                "accounts": {
                    "addresses": (0..addresses).map(|i| format!("0x{i:040x}")).collect::<Vec<_>>()
                },
                "transactions": { "records": [] },
                "networks": { "selected": "ethereum", "known": [] }
            }
        });

        group.bench_with_input(BenchmarkId::new("v1_to_current", addresses), &legacy, |b, raw| {
            b.iter(|| black_box(runner.migrate(Some(raw)).is_ok()))
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_store_update,
    bench_broker_publish,
    bench_migration
);
criterion_main!(benches);
