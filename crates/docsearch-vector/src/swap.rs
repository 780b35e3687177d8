//! Serialized rebuilds of a store directory.
//!
//! A rebuild holds an advisory lock on `.<name>.lock` next to the store for
//! its whole duration, writes into a staging directory beside the target, and
//! then swaps it in with two renames. The renames run under an exclusive lock
//! on `.<name>.gate`, which readers hold shared while they load and query, so
//! a reader sees the old store or the new one, never a mix.
//!
//! Lock files are left in place. The OS drops the locks when the holder exits,
//! so a leftover file from a crashed process does not block anyone.

use std::fs::{self, File, OpenOptions, TryLockError};
use std::path::{Path, PathBuf};

use tempfile::TempDir;
use tracing::{debug, info, warn};
use uuid::Uuid;

use docsearch_core::error::{Error, Result};

/// Exclusive rebuild lock on a store path. Released on drop.
#[derive(Debug)]
pub struct StoreLock {
    path: PathBuf,
    _file: File,
}

impl StoreLock {
    /// Take the lock or fail with [`Error::StoreBusy`] if another rebuild holds it.
    pub fn acquire(store: &Path) -> Result<Self> {
        let (path, file) = open_lock_file(store, "lock")?;
        match file.try_lock() {
            Ok(()) => {
                debug!("Acquired store lock {}", path.display());
                Ok(Self { path, _file: file })
            }
            Err(TryLockError::WouldBlock) => {
                Err(Error::StoreBusy { store: store.to_path_buf(), lock: path })
            }
            Err(TryLockError::Error(e)) => Err(e.into()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Shared hold on a store's gate. While any `ReadLock` is alive, no swap or
/// removal of that store can complete.
#[derive(Debug)]
pub struct ReadLock {
    _file: File,
}

impl ReadLock {
    /// Blocks while a swap is in progress.
    pub fn acquire(store: &Path) -> Result<Self> {
        let (_, file) = open_lock_file(store, "gate")?;
        file.lock_shared()?;
        Ok(Self { _file: file })
    }
}

/// Exclusive hold on the gate for the duration of a swap or removal.
struct WriteGate {
    _file: File,
}

impl WriteGate {
    fn acquire(store: &Path) -> Result<Self> {
        let (path, file) = open_lock_file(store, "gate")?;
        file.lock()?;
        debug!("Holding store gate {}", path.display());
        Ok(Self { _file: file })
    }
}

/// Fresh staging directory on the same filesystem as `store`. Removed on drop
/// unless it has been swapped into place.
pub fn staging_dir(store: &Path) -> Result<TempDir> {
    let parent = parent_dir(store);
    fs::create_dir_all(&parent)?;
    let dir = tempfile::Builder::new()
        .prefix(&format!(".{}.staging-", store_name(store)))
        .tempdir_in(&parent)?;
    Ok(dir)
}

/// Replace `store` with the contents of `staging`.
pub fn swap_into_place(staging: TempDir, store: &Path) -> Result<()> {
    let backup = parent_dir(store).join(format!(".{}.old-{}", store_name(store), Uuid::new_v4()));
    let gate = WriteGate::acquire(store)?;
    let had_previous = store.exists();
    if had_previous {
        fs::rename(store, &backup)?;
    }
    if let Err(e) = fs::rename(staging.path(), store) {
        if had_previous {
            if let Err(restore) = fs::rename(&backup, store) {
                warn!("Failed to restore previous store from {}: {}", backup.display(), restore);
            }
        }
        return Err(e.into());
    }
    drop(gate);
    // the staging path no longer exists; dropping the handle is a no-op
    drop(staging);
    if had_previous {
        info!("Replacing previous vector store at {}", store.display());
        if let Err(e) = fs::remove_dir_all(&backup) {
            warn!("Failed to remove old store {}: {}", backup.display(), e);
        }
    }
    Ok(())
}

/// Delete `store` if it exists. Returns whether anything was removed.
pub fn remove_store(store: &Path) -> Result<bool> {
    if !store.exists() {
        return Ok(false);
    }
    let _gate = WriteGate::acquire(store)?;
    if !store.exists() {
        return Ok(false);
    }
    fs::remove_dir_all(store)?;
    info!("Removed vector store at {}", store.display());
    Ok(true)
}

fn open_lock_file(store: &Path, kind: &str) -> Result<(PathBuf, File)> {
    let parent = parent_dir(store);
    fs::create_dir_all(&parent)?;
    let path = parent.join(format!(".{}.{kind}", store_name(store)));
    let file = OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(false)
        .open(&path)?;
    Ok((path, file))
}

fn parent_dir(store: &Path) -> PathBuf {
    match store.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

fn store_name(store: &Path) -> String {
    store
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "vector_store".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn second_lock_is_busy_until_first_drops() {
        let tmp = tempfile::tempdir().unwrap();
        let store = tmp.path().join("store");
        let first = StoreLock::acquire(&store).unwrap();
        assert!(first.path().ends_with(".store.lock"));
        assert!(matches!(StoreLock::acquire(&store), Err(Error::StoreBusy { .. })));
        drop(first);
        assert!(StoreLock::acquire(&store).is_ok());
    }

    #[test]
    fn leftover_lock_file_without_a_holder_does_not_block() {
        let tmp = tempfile::tempdir().unwrap();
        let store = tmp.path().join("store");
        // what a crashed rebuild leaves behind
        fs::write(tmp.path().join(".store.lock"), "").unwrap();
        let lock = StoreLock::acquire(&store).unwrap();
        assert!(lock.path().exists());
    }

    #[test]
    fn swap_replaces_previous_contents() {
        let tmp = tempfile::tempdir().unwrap();
        let store = tmp.path().join("store");
        fs::create_dir_all(&store).unwrap();
        fs::write(store.join("old.txt"), "old").unwrap();

        let staging = staging_dir(&store).unwrap();
        fs::write(staging.path().join("new.txt"), "new").unwrap();
        swap_into_place(staging, &store).unwrap();

        assert!(store.join("new.txt").exists());
        assert!(!store.join("old.txt").exists());
        let dirs: Vec<_> = fs::read_dir(tmp.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.path().is_dir())
            .collect();
        assert_eq!(dirs.len(), 1, "no backup or staging dirs left behind");
    }

    #[test]
    fn swap_waits_for_readers() {
        let tmp = tempfile::tempdir().unwrap();
        let store = tmp.path().join("store");
        fs::create_dir_all(&store).unwrap();
        fs::write(store.join("old.txt"), "old").unwrap();
        let staging = staging_dir(&store).unwrap();
        fs::write(staging.path().join("new.txt"), "new").unwrap();

        let reader = ReadLock::acquire(&store).unwrap();
        let (done_tx, done_rx) = mpsc::channel();
        let swapper = {
            let store = store.clone();
            thread::spawn(move || {
                swap_into_place(staging, &store).unwrap();
                done_tx.send(()).unwrap();
            })
        };

        let early = done_rx.recv_timeout(Duration::from_millis(200));
        assert!(early.is_err(), "swap ran under a reader");
        assert!(store.join("old.txt").exists());
        drop(reader);
        done_rx.recv_timeout(Duration::from_secs(10)).unwrap();
        swapper.join().unwrap();
        assert!(store.join("new.txt").exists());
    }

    #[test]
    fn remove_store_is_a_no_op_when_absent() {
        let tmp = tempfile::tempdir().unwrap();
        let store = tmp.path().join("store");
        assert!(!remove_store(&store).unwrap());
        fs::create_dir_all(&store).unwrap();
        assert!(remove_store(&store).unwrap());
        assert!(!store.exists());
    }
}
