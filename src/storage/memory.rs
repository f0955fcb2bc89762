use dashmap::DashMap;
use serde_json::Value;

/// The in-process tier.
///
/// Synchronous, unconditional overwrites, no failure mode, no eviction: the
/// map grows for the lifetime of the process. A key present here is trusted
/// to be current without further I/O; absence implies nothing about the
/// slower tiers.
///
/// Each slot records the coordinator's write counter at the time it was
/// written. A background refresh captures that version when it is scheduled
/// and applies its result only if the slot is unchanged, so a slow refresh
/// cannot clobber a newer write.
pub struct MemoryCache {
    slots: DashMap<String, Slot>,
}

#[derive(Debug, Clone)]
struct Slot {
    value: Value,
    version: u64,
}

impl MemoryCache {
    #[must_use]
    pub fn new() -> Self {
        Self {
            slots: DashMap::new(),
        }
    }

    pub fn set(&self, key: &str, value: Value, version: u64) {
        self.slots.insert(key.to_string(), Slot { value, version });
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<Value> {
        self.slots.get(key).map(|slot| slot.value.clone())
    }

    /// Write counter recorded when the key was last set.
    #[must_use]
    pub fn version(&self, key: &str) -> Option<u64> {
        self.slots.get(key).map(|slot| slot.version)
    }

    #[must_use]
    pub fn has(&self, key: &str) -> bool {
        self.slots.contains_key(key)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn clear(&self) {
        self.slots.clear();
    }
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::new()
    }
}
