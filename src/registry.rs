//! Diagnostic bookkeeping of live buffers.
//!
//! Nothing here is needed for correctness: buffers free themselves when
//! their owner drops them. The registry only answers "what is alive right
//! now" for debugging leaks in host scripts.

use chrono::{DateTime, Utc};
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Stable handle for a registered buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BufferId(pub u64);

/// Where a buffer's pixels came from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BufferOrigin {
    File(PathBuf),
    Blank,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryEntry {
    pub id: BufferId,
    pub width: u32,
    pub height: u32,
    pub origin: BufferOrigin,
    pub created: DateTime<Utc>,
}

#[derive(Debug, Default)]
pub struct BufferRegistry {
    next_id: u64,
    live: BTreeMap<BufferId, RegistryEntry>,
}

impl BufferRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, width: u32, height: u32, origin: BufferOrigin) -> BufferId {
        let id = BufferId(self.next_id);
        self.next_id += 1;
        debug!("registered buffer {} ({}x{}, {:?})", id.0, width, height, origin);
        self.live.insert(
            id,
            RegistryEntry {
                id,
                width,
                height,
                origin,
                created: Utc::now(),
            },
        );
        id
    }

    /// Forget `id`. Returns whether it was still live; releasing twice is a no-op.
    pub fn release(&mut self, id: BufferId) -> bool {
        let removed = self.live.remove(&id).is_some();
        if removed {
            debug!("released buffer {}", id.0);
        }
        removed
    }

    pub fn is_live(&self, id: BufferId) -> bool {
        self.live.contains_key(&id)
    }

    pub fn live_count(&self) -> usize {
        self.live.len()
    }

    /// Live entries in creation order
    pub fn snapshot(&self) -> Vec<RegistryEntry> {
        self.live.values().cloned().collect()
    }
}
