//! Development filesystem-change watcher.
//!
//! Polls a recursive snapshot of a directory tree and cancels the supplied
//! token on the first create, modify or delete beneath it. One-shot: the
//! task exits after firing. Used only to request graceful worker shutdown
//! during development; it is not part of the scheduling contract.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Default poll interval for the change watcher.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);

#[derive(Debug, PartialEq, Eq)]
struct EntryStamp {
    modified: Option<SystemTime>,
    len: u64,
}

fn collect(dir: &Path, out: &mut HashMap<PathBuf, EntryStamp>) {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        let Ok(meta) = entry.metadata() else {
            continue;
        };
        if meta.is_dir() {
            collect(&path, out);
        } else {
            out.insert(
                path,
                EntryStamp {
                    modified: meta.modified().ok(),
                    len: meta.len(),
                },
            );
        }
    }
}

fn snapshot(root: &Path) -> HashMap<PathBuf, EntryStamp> {
    let mut entries = HashMap::new();
    collect(root, &mut entries);
    entries
}

/// Spawn the watcher task. Cancelling `token` externally also stops it.
pub fn spawn_change_watcher(
    root: PathBuf,
    interval: Duration,
    token: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let baseline = snapshot(&root);
        info!(path = %root.display(), files = baseline.len(), "watching for changes");

        let mut ticker = tokio::time::interval(interval);
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = token.cancelled() => return,
                _ = ticker.tick() => {}
            }

            if snapshot(&root) != baseline {
                info!(path = %root.display(), "change detected; requesting worker shutdown");
                token.cancel();
                return;
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn change_fires_the_token_once() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("existing.txt"), b"before").unwrap();

        let token = CancellationToken::new();
        let handle = spawn_change_watcher(
            dir.path().to_path_buf(),
            Duration::from_millis(20),
            token.clone(),
        );

        tokio::time::sleep(Duration::from_millis(60)).await;
        assert!(!token.is_cancelled());

        std::fs::write(dir.path().join("new.txt"), b"after").unwrap();

        tokio::time::timeout(Duration::from_secs(2), token.cancelled())
            .await
            .expect("watcher did not fire");
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn modification_in_a_subdirectory_is_seen() {
        let dir = tempfile::tempdir().unwrap();
        let sub = dir.path().join("nested");
        std::fs::create_dir(&sub).unwrap();
        std::fs::write(sub.join("file.txt"), b"v1").unwrap();

        let token = CancellationToken::new();
        let handle = spawn_change_watcher(
            dir.path().to_path_buf(),
            Duration::from_millis(20),
            token.clone(),
        );

        tokio::time::sleep(Duration::from_millis(60)).await;
        std::fs::write(sub.join("file.txt"), b"version two").unwrap();

        tokio::time::timeout(Duration::from_secs(2), token.cancelled())
            .await
            .expect("watcher did not fire");
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn external_cancellation_stops_the_task() {
        let dir = tempfile::tempdir().unwrap();
        let token = CancellationToken::new();
        let handle = spawn_change_watcher(
            dir.path().to_path_buf(),
            Duration::from_millis(20),
            token.clone(),
        );

        token.cancel();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("watcher task did not exit")
            .unwrap();
    }
}
