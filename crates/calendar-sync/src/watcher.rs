//! Debounced watcher over the credential file's directory.
//!
//! Filesystem events for `google-credentials.json` are funneled through a
//! channel to a drain thread, which waits out write bursts before handing
//! a single coalesced change to the service. Removal is reported
//! immediately. If the platform cannot watch the directory the feature
//! degrades to explicit imports only; it never takes the host down.

use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::ffi::OsString;
use std::path::Path;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

/// What happened to the credential file, after coalescing a burst.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialFileChange {
    /// The file was deleted or renamed away.
    Removed,
    /// The file was created, rewritten, or renamed into place.
    Updated,
}

/// Owns the OS watch handle and the drain thread. Stop it (or drop it)
/// to release both.
pub struct CredentialWatcher {
    watcher: Option<RecommendedWatcher>,
    thread: Option<thread::JoinHandle<()>>,
}

impl CredentialWatcher {
    /// Watch `dir` for changes to `file_name` and invoke `handler` with
    /// each debounced change. The handler runs on the drain thread;
    /// invocations never overlap.
    pub fn spawn<F>(
        dir: &Path,
        file_name: &str,
        debounce: Duration,
        handler: F,
    ) -> notify::Result<Self>
    where
        F: Fn(CredentialFileChange) + Send + 'static,
    {
        let (tx, rx) = mpsc::channel::<CredentialFileChange>();
        let target: OsString = file_name.into();

        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
            let event = match res {
                Ok(event) => event,
                Err(e) => {
                    tracing::warn!("Credential watcher event error: {}", e);
                    return;
                }
            };

            let change = match event.kind {
                EventKind::Remove(_) => CredentialFileChange::Removed,
                EventKind::Create(_) | EventKind::Modify(_) => CredentialFileChange::Updated,
                _ => return,
            };

            let touches_credentials = event
                .paths
                .iter()
                .any(|path| path.file_name().is_some_and(|name| name == target));
            if touches_credentials {
                let _ = tx.send(change);
            }
        })?;

        watcher.watch(dir, RecursiveMode::NonRecursive)?;
        tracing::debug!("Watching {} for credential changes", dir.display());

        let thread = thread::spawn(move || drain_loop(rx, debounce, handler));

        Ok(CredentialWatcher {
            watcher: Some(watcher),
            thread: Some(thread),
        })
    }

    /// Release the OS watch handle and wait for the drain thread to exit.
    pub fn stop(&mut self) {
        // Dropping the watcher drops the channel sender, which ends the
        // drain loop.
        self.watcher.take();
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                tracing::warn!("Credential watcher thread panicked during shutdown");
            }
        }
    }
}

impl Drop for CredentialWatcher {
    fn drop(&mut self) {
        self.stop();
    }
}

fn drain_loop<F>(
    rx: mpsc::Receiver<CredentialFileChange>,
    debounce: Duration,
    handler: F,
) where
    F: Fn(CredentialFileChange),
{
    while let Ok(mut change) = rx.recv() {
        if change == CredentialFileChange::Updated {
            // Let a write-in-progress finish, then collapse the burst
            // into whatever happened last.
            thread::sleep(debounce);
            while let Ok(later) = rx.try_recv() {
                change = later;
            }
        }
        handler(change);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::sync::mpsc::RecvTimeoutError;
    use tempfile::TempDir;

    const FILE: &str = "google-credentials.json";

    fn wait_for(
        rx: &mpsc::Receiver<CredentialFileChange>,
        expected: CredentialFileChange,
    ) -> bool {
        let deadline = std::time::Instant::now() + Duration::from_secs(5);
        loop {
            let remaining = deadline.saturating_duration_since(std::time::Instant::now());
            match rx.recv_timeout(remaining) {
                Ok(change) if change == expected => return true,
                Ok(_) => continue,
                Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => {
                    return false;
                }
            }
        }
    }

    #[test]
    fn reports_updates_and_removal() {
        let dir = TempDir::new().unwrap();
        let (tx, rx) = mpsc::channel();
        let mut watcher = CredentialWatcher::spawn(
            dir.path(),
            FILE,
            Duration::from_millis(50),
            move |change| {
                let _ = tx.send(change);
            },
        )
        .unwrap();

        let path = dir.path().join(FILE);
        fs::write(&path, "{}").unwrap();
        assert!(wait_for(&rx, CredentialFileChange::Updated));

        fs::remove_file(&path).unwrap();
        assert!(wait_for(&rx, CredentialFileChange::Removed));

        watcher.stop();
    }

    #[test]
    fn ignores_unrelated_files() {
        let dir = TempDir::new().unwrap();
        let (tx, rx) = mpsc::channel();
        let _watcher = CredentialWatcher::spawn(
            dir.path(),
            FILE,
            Duration::from_millis(50),
            move |change| {
                let _ = tx.send(change);
            },
        )
        .unwrap();

        fs::write(dir.path().join("notes.txt"), "hello").unwrap();
        assert_eq!(
            rx.recv_timeout(Duration::from_millis(500)),
            Err(RecvTimeoutError::Timeout)
        );
    }

    #[test]
    fn stop_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let mut watcher =
            CredentialWatcher::spawn(dir.path(), FILE, Duration::from_millis(50), |_| {})
                .unwrap();
        watcher.stop();
        watcher.stop();
    }
}
