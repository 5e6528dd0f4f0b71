//! Entity registry: stable per-process records in first-seen order

use crate::window::RollingWindow;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Identity of a monitored entity. Derived from the process name, so
/// same-named processes share one record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityKey(String);

impl EntityKey {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EntityKey {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

/// Rolling history of the four sampled metrics for one entity
#[derive(Debug, Clone, PartialEq)]
pub struct EntityRecord {
    pub cpu: RollingWindow<f64>,
    pub mem: RollingWindow<f64>,
    pub net_sent: RollingWindow<u64>,
    pub net_recv: RollingWindow<u64>,
}

impl EntityRecord {
    pub fn new(capacity: usize) -> Self {
        Self {
            cpu: RollingWindow::new(capacity),
            mem: RollingWindow::new(capacity),
            net_sent: RollingWindow::new(capacity),
            net_recv: RollingWindow::new(capacity),
        }
    }

    /// Append one sample to each series
    pub fn record(&mut self, cpu: f64, mem: f64, sent: u64, recv: u64) {
        self.cpu.push(cpu);
        self.mem.push(mem);
        self.net_sent.push(sent);
        self.net_recv.push(recv);
    }

    /// Number of samples held (all four series move in lockstep)
    pub fn len(&self) -> usize {
        self.cpu.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cpu.is_empty()
    }
}

/// Owns every `EntityRecord` for the session. Records are never removed.
#[derive(Debug, Clone)]
pub struct EntityRegistry {
    capacity: usize,
    index: HashMap<EntityKey, usize>,
    entries: Vec<(EntityKey, EntityRecord)>,
}

impl EntityRegistry {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            index: HashMap::new(),
            entries: Vec::new(),
        }
    }

    pub fn get_or_create(&mut self, key: &EntityKey) -> &mut EntityRecord {
        let slot = match self.index.get(key) {
            Some(&slot) => slot,
            None => {
                let slot = self.entries.len();
                self.entries.push((key.clone(), EntityRecord::new(self.capacity)));
                self.index.insert(key.clone(), slot);
                slot
            }
        };
        &mut self.entries[slot].1
    }

    pub fn get(&self, key: &EntityKey) -> Option<&EntityRecord> {
        self.index.get(key).map(|&slot| &self.entries[slot].1)
    }

    pub fn contains(&self, key: &EntityKey) -> bool {
        self.index.contains_key(key)
    }

    /// Records in first-seen order
    pub fn iter(&self) -> impl Iterator<Item = (&EntityKey, &EntityRecord)> + '_ {
        self.entries.iter().map(|(key, record)| (key, record))
    }

    pub fn keys(&self) -> impl Iterator<Item = &EntityKey> + '_ {
        self.entries.iter().map(|(key, _)| key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
