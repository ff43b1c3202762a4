//! Process-wide simulation counters.
//! Cheap enough to bump from inside the tick; read via [`snapshot`].
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, OnceLock};

static TICKS: AtomicU64 = AtomicU64::new(0);
static LEVEL_UPS: AtomicU64 = AtomicU64::new(0);
static DUELS: AtomicU64 = AtomicU64::new(0);
static CRITICAL_STRIKES: AtomicU64 = AtomicU64::new(0);
static ITEM_DROPS: AtomicU64 = AtomicU64::new(0);

static EVENT_COUNTERS: OnceLock<Mutex<HashMap<String, u64>>> = OnceLock::new();

pub fn record_tick() {
    TICKS.fetch_add(1, Ordering::Relaxed);
}

pub fn record_level_up() {
    LEVEL_UPS.fetch_add(1, Ordering::Relaxed);
}

pub fn record_duel() {
    DUELS.fetch_add(1, Ordering::Relaxed);
}

pub fn record_critical_strike() {
    CRITICAL_STRIKES.fetch_add(1, Ordering::Relaxed);
}

pub fn record_item_drop() {
    ITEM_DROPS.fetch_add(1, Ordering::Relaxed);
}

fn event_counters() -> MutexGuard<'static, HashMap<String, u64>> {
    EVENT_COUNTERS
        .get_or_init(|| Mutex::new(HashMap::new()))
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Count one firing of a world event. Returns the running total for it.
pub fn record_event(name: &str) -> u64 {
    let mut guard = event_counters();
    let counter = guard.entry(name.to_string()).or_default();
    *counter = counter.saturating_add(1);
    *counter
}

pub fn event_counters_snapshot() -> HashMap<String, u64> {
    event_counters().clone()
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub ticks: u64,
    pub level_ups: u64,
    pub duels: u64,
    pub critical_strikes: u64,
    pub item_drops: u64,
    pub events: HashMap<String, u64>,
}

pub fn snapshot() -> Snapshot {
    Snapshot {
        ticks: TICKS.load(Ordering::Relaxed),
        level_ups: LEVEL_UPS.load(Ordering::Relaxed),
        duels: DUELS.load(Ordering::Relaxed),
        critical_strikes: CRITICAL_STRIKES.load(Ordering::Relaxed),
        item_drops: ITEM_DROPS.load(Ordering::Relaxed),
        events: event_counters_snapshot(),
    }
}
