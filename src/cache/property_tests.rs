//! Property-Based Tests for Cache Module
//!
//! Uses proptest to check the engine's accounting and expiry guarantees over
//! arbitrary operation sequences.

use proptest::prelude::*;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use crate::cache::{estimate_size, make_key, CacheEngine};
use crate::clock::ManualClock;
use crate::config::CacheLimits;
use crate::storage::{MemoryStorage, StorageAdapter};

// == Test Configuration ==
const TEST_LIMITS: CacheLimits = CacheLimits {
    max_size: 4_096,
    soft_threshold: 2_048,
};

// == Strategies ==
/// Small key space so operations collide often
fn key_strategy() -> impl Strategy<Value = String> {
    (0u8..8).prop_map(|i| make_key("song_info", &[&i]))
}

fn value_strategy() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9 _%]{0,300}"
}

#[derive(Debug, Clone)]
enum CacheOp {
    Set { key: String, value: String, ttl_ms: u64 },
    Get { key: String },
    Remove { key: String },
    Advance { ms: i64 },
}

fn cache_op_strategy() -> impl Strategy<Value = CacheOp> {
    prop_oneof![
        4 => (key_strategy(), value_strategy(), 1u64..5_000)
            .prop_map(|(key, value, ttl_ms)| CacheOp::Set { key, value, ttl_ms }),
        3 => key_strategy().prop_map(|key| CacheOp::Get { key }),
        1 => key_strategy().prop_map(|key| CacheOp::Remove { key }),
        2 => (0i64..3_000).prop_map(|ms| CacheOp::Advance { ms }),
    ]
}

fn new_engine() -> (CacheEngine, ManualClock) {
    let clock = ManualClock::new(0);
    let engine =
        CacheEngine::with_clock(MemoryStorage::new(), TEST_LIMITS, Arc::new(clock.clone()));
    (engine, clock)
}

/// Sum of the stored sizes of every indexed key.
fn live_size(engine: &CacheEngine) -> u64 {
    let index = engine.index();
    index
        .keys
        .iter()
        .filter_map(|k| engine.storage().get(k))
        .map(|raw| estimate_size(&raw))
        .sum()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    // Storing then reading before the TTL elapses returns the same value.
    #[test]
    fn prop_roundtrip_storage(key in key_strategy(), value in value_strategy()) {
        let (mut engine, _) = new_engine();

        engine.set(&key, &value, Duration::from_secs(60));

        prop_assert_eq!(engine.get::<String>(&key), Some(value));
    }

    // With nothing touching the medium behind the engine's back, the index
    // total is exact after every operation and stays under the hard cap.
    #[test]
    fn prop_total_size_tracks_live_entries(ops in prop::collection::vec(cache_op_strategy(), 1..60)) {
        let (mut engine, clock) = new_engine();

        for op in ops {
            match op {
                CacheOp::Set { key, value, ttl_ms } => {
                    engine.set(&key, &value, Duration::from_millis(ttl_ms));
                }
                CacheOp::Get { key } => {
                    let _ = engine.get::<String>(&key);
                }
                CacheOp::Remove { key } => engine.remove(&key),
                CacheOp::Advance { ms } => clock.advance(ms),
            }

            let index = engine.index();
            prop_assert_eq!(index.total_size, live_size(&engine));
            prop_assert!(index.total_size <= TEST_LIMITS.max_size);
        }
    }

    // Reads never return data older than its TTL.
    #[test]
    fn prop_never_returns_expired(
        key in key_strategy(),
        value in value_strategy(),
        ttl_ms in 1u64..10_000,
        wait_ms in 0u64..20_000,
    ) {
        let (mut engine, clock) = new_engine();

        engine.set(&key, &value, Duration::from_millis(ttl_ms));
        clock.advance(wait_ms as i64);

        let read = engine.get::<String>(&key);
        if wait_ms > ttl_ms {
            prop_assert!(read.is_none());
        } else {
            prop_assert_eq!(read, Some(value));
        }
    }

    // After a sweep only unexpired entries remain and the total is exact.
    #[test]
    fn prop_sweep_reconciles(
        entries in prop::collection::vec((key_strategy(), 1u64..5_000), 1..20),
        wait_ms in 0i64..5_000,
    ) {
        let (mut engine, clock) = new_engine();
        for (key, ttl_ms) in &entries {
            engine.set(key, "v", Duration::from_millis(*ttl_ms));
        }
        clock.advance(wait_ms);

        let report = engine.cleanup_expired();
        let stats = engine.stats();

        prop_assert_eq!(stats.expired_count(), 0);
        prop_assert_eq!(stats.count, report.live);
        prop_assert_eq!(engine.index().total_size, stats.total_size);
    }

    // Distinct logical identities never share a key.
    #[test]
    fn prop_keys_are_injective(
        a in ("[a-z_%]{0,6}", prop::collection::vec("[a-z0-9_%]{0,6}", 0..4)),
        b in ("[a-z_%]{0,6}", prop::collection::vec("[a-z0-9_%]{0,6}", 0..4)),
    ) {
        let render = |(kind, args): &(String, Vec<String>)| {
            let args: Vec<&dyn std::fmt::Display> =
                args.iter().map(|a| a as &dyn std::fmt::Display).collect();
            make_key(kind, &args)
        };

        prop_assert_eq!(render(&a) == render(&b), a == b);
    }
}

// == Eviction Order ==
proptest! {
    #![proptest_config(ProptestConfig::with_cases(50))]

    // Forced eviction removes entries strictly oldest-first: every survivor
    // was written no earlier than every evicted entry.
    #[test]
    fn prop_eviction_is_oldest_first(sizes in prop::collection::vec(10usize..400, 2..30)) {
        let (mut engine, clock) = new_engine();
        let mut written_at = HashMap::new();

        for (i, size) in sizes.iter().enumerate() {
            let key = make_key("chunk", &[&i]);
            engine.set(&key, &"x".repeat(*size), Duration::from_secs(3600));
            written_at.insert(key, i);
            clock.advance(1);
        }

        let live: Vec<usize> = written_at
            .iter()
            .filter(|(k, _)| engine.storage().get(k).is_some())
            .map(|(_, i)| *i)
            .collect();
        let gone: Vec<usize> = written_at
            .iter()
            .filter(|(k, _)| engine.storage().get(k).is_none())
            .map(|(_, i)| *i)
            .collect();

        if let (Some(oldest_live), Some(newest_gone)) = (live.iter().min(), gone.iter().max()) {
            prop_assert!(newest_gone < oldest_live);
        }
        // The most recent write always lands
        prop_assert!(live.contains(&(sizes.len() - 1)));
    }
}
