//! # Content Snapshots
//!
//! The first-observed text of each file, kept as the "before" side of a diff.
//! A snapshot is recorded once per path and never overwritten.

use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use log::debug;

pub trait SnapshotStore: Send + Sync {
    fn get(&self, path: &Path) -> Option<String>;

    /// Records `content` unless the path already has a snapshot.
    /// Returns true if this call recorded it.
    fn set_if_absent(&self, path: &Path, content: String) -> bool;

    fn contains(&self, path: &Path) -> bool {
        self.get(path).is_some()
    }
}

#[derive(Default)]
struct Entries {
    map: HashMap<PathBuf, String>,
    order: VecDeque<PathBuf>,
}

/// Process-wide in-memory store with an optional size cap.
///
/// When capped, the oldest snapshot is evicted to make room.
#[derive(Default)]
pub struct MemorySnapshotStore {
    entries: Mutex<Entries>,
    max_entries: Option<usize>,
}

impl MemorySnapshotStore {
    pub fn new(max_entries: Option<usize>) -> Self {
        Self {
            entries: Mutex::new(Entries::default()),
            max_entries: max_entries.filter(|&n| n > 0),
        }
    }

    pub fn len(&self) -> usize {
        self.lock().map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Entries> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl SnapshotStore for MemorySnapshotStore {
    fn get(&self, path: &Path) -> Option<String> {
        self.lock().map.get(path).cloned()
    }

    fn set_if_absent(&self, path: &Path, content: String) -> bool {
        let mut entries = self.lock();
        if entries.map.contains_key(path) {
            return false;
        }
        if let Some(max) = self.max_entries {
            while entries.map.len() >= max {
                let Some(oldest) = entries.order.pop_front() else {
                    break;
                };
                debug!("Evicting snapshot for {}", oldest.display());
                entries.map.remove(&oldest);
            }
        }
        entries.order.push_back(path.to_path_buf());
        entries.map.insert(path.to_path_buf(), content);
        debug!("Captured snapshot for {}", path.display());
        true
    }
}
