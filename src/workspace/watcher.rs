//! Watches workspace roots and republishes on-disk changes as
//! [`WorkspaceEvent::FileChanged`].

use std::path::PathBuf;

use log::{debug, warn};
use notify::event::ModifyKind;
use notify::{Config, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::broadcast;

use super::WorkspaceEvent;

pub struct FileWatcher {
    // Dropping the watcher stops the OS subscription.
    _watcher: RecommendedWatcher,
}

impl FileWatcher {
    pub fn new(
        roots: &[PathBuf],
        events: broadcast::Sender<WorkspaceEvent>,
    ) -> Result<Self, notify::Error> {
        let mut watcher = RecommendedWatcher::new(
            move |res: Result<notify::Event, notify::Error>| match res {
                Ok(event) => {
                    for path in changed_files(event) {
                        debug!("File changed on disk: {}", path.display());
                        let _ = events.send(WorkspaceEvent::FileChanged(path));
                    }
                }
                Err(e) => warn!("File watcher error: {}", e),
            },
            Config::default(),
        )?;
        for root in roots {
            watcher.watch(root, RecursiveMode::Recursive)?;
        }
        Ok(Self { _watcher: watcher })
    }
}

/// Paths of regular files whose content changed or that appeared.
fn changed_files(event: notify::Event) -> Vec<PathBuf> {
    match event.kind {
        EventKind::Create(_)
        | EventKind::Modify(ModifyKind::Data(_))
        | EventKind::Modify(ModifyKind::Any) => {
            event.paths.into_iter().filter(|p| !p.is_dir()).collect()
        }
        _ => Vec::new(),
    }
}
