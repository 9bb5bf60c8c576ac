use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use crate::containers::ContainerExecFile;
use crate::resources::ApiResources;

/// The kinds of values the store holds. A tagged enum instead of a
/// downcast: asking for the wrong kind yields a miss, never a silently
/// wrong value.
#[derive(Clone)]
pub enum StateValue {
    ApiResources(Arc<ApiResources>),
    ExecFile(Arc<ContainerExecFile>),
}

struct StateEntry {
    value: StateValue,
    expiry: Option<Instant>,
}

/// Process-wide keyed cache with optional per-entry TTL. Expiry is checked
/// on read: an expired entry is deleted and reported absent.
pub struct StateStore {
    entries: Mutex<HashMap<String, StateEntry>>,
}

impl Default for StateStore {
    fn default() -> Self {
        Self::new()
    }
}

impl StateStore {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn put(&self, key: &str, value: StateValue) {
        let mut entries = self.entries.lock().expect("state store lock poisoned");
        entries.insert(
            key.to_string(),
            StateEntry {
                value,
                expiry: None,
            },
        );
    }

    pub fn put_ttl(&self, key: &str, value: StateValue, ttl: Duration) {
        let mut entries = self.entries.lock().expect("state store lock poisoned");
        entries.insert(
            key.to_string(),
            StateEntry {
                value,
                expiry: Some(Instant::now() + ttl),
            },
        );
    }

    pub fn get(&self, key: &str) -> Option<StateValue> {
        let mut entries = self.entries.lock().expect("state store lock poisoned");
        let expired = match entries.get(key) {
            Some(entry) => entry
                .expiry
                .map_or(false, |expiry| expiry <= Instant::now()),
            None => return None,
        };
        if expired {
            entries.remove(key);
            return None;
        }
        entries.get(key).map(|entry| entry.value.clone())
    }

    pub fn get_api_resources(&self, key: &str) -> Option<Arc<ApiResources>> {
        match self.get(key) {
            Some(StateValue::ApiResources(value)) => Some(value),
            _ => None,
        }
    }

    pub fn get_exec_file(&self, key: &str) -> Option<Arc<ContainerExecFile>> {
        match self.get(key) {
            Some(StateValue::ExecFile(value)) => Some(value),
            _ => None,
        }
    }
}
