//! Filesystem backend: one JSON file per key under a root directory.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use crate::logging::{debug, info};

use super::error::BackendError;
use super::key::Key;
use super::lock::{FileLock, LockMode, LockOptions};

/// File extension of record files.
const RECORD_EXT: &str = "json";

/// Subdirectory (of the root) holding per-key lock files.
const LOCK_DIR: &str = ".locks";

/// Tunables for [`FsBackend`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackendOptions {
    pub lock: LockOptions,
    /// fsync record files and the root directory on every write.
    pub sync: bool,
}

impl Default for BackendOptions {
    fn default() -> Self {
        Self {
            lock: LockOptions::default(),
            sync: true,
        }
    }
}

/// Locked file primitives over a storage root.
///
/// Layout:
///
/// ```text
/// <root>/<key>.json         record
/// <root>/.locks/<key>.lock  advisory lock for <key>
/// <root>/.<random>.tmp      in-flight atomic write
/// ```
///
/// Locks are taken on the sidecar lock file, never on the record. Records are
/// replaced by renaming a fully written temp file over them, so the inode a
/// waiting locker holds is never swapped out underneath it.
#[derive(Debug, Clone)]
pub struct FsBackend {
    root: PathBuf,
    lock_dir: PathBuf,
    options: BackendOptions,
}

impl FsBackend {
    /// Open (creating if needed) a storage root.
    pub fn open(root: impl AsRef<Path>, options: BackendOptions) -> Result<Self, BackendError> {
        let root = root.as_ref();
        fs::create_dir_all(root).map_err(|e| BackendError::io(root, e))?;
        let root = root.canonicalize().map_err(|e| BackendError::io(root, e))?;

        let lock_dir = root.join(LOCK_DIR);
        fs::create_dir_all(&lock_dir).map_err(|e| BackendError::io(&lock_dir, e))?;

        info!(root = %root.display(), sync = options.sync, "opened storage root");

        Ok(Self {
            root,
            lock_dir,
            options,
        })
    }

    /// The canonical storage root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// A new random key. Not checked against existing records.
    pub fn generate_key(&self) -> Key {
        Key::generate()
    }

    /// Path of the record file for `key`.
    pub fn path_for(&self, key: &Key) -> PathBuf {
        self.root.join(format!("{}.{}", key, RECORD_EXT))
    }

    fn lock_path(&self, key: &Key) -> PathBuf {
        self.lock_dir.join(format!("{}.lock", key))
    }

    /// Whether a record file exists for `key`.
    pub fn exists(&self, key: &Key) -> bool {
        self.path_for(key).is_file()
    }

    /// Read the full record under a shared lock.
    pub fn read_locked(&self, key: &Key) -> Result<Vec<u8>, BackendError> {
        self.ensure_exists(key)?;
        let _guard = self.lock(key, LockMode::Shared)?;
        let bytes = self.read_record(key)?;
        debug!(key = %key, bytes = bytes.len(), "record read");
        Ok(bytes)
    }

    /// Replace the record under an exclusive lock.
    ///
    /// The new contents are written to a temp file and renamed over the
    /// record, so readers and crash recovery only ever see a whole file.
    pub fn write_locked(&self, key: &Key, bytes: &[u8]) -> Result<(), BackendError> {
        let _guard = self.lock(key, LockMode::Exclusive)?;
        self.write_atomic(key, bytes, true)?;
        debug!(key = %key, bytes = bytes.len(), "record written");
        Ok(())
    }

    /// Write a new record under an exclusive lock, failing with
    /// [`BackendError::AlreadyExists`] instead of replacing an existing one.
    pub fn create_locked(&self, key: &Key, bytes: &[u8]) -> Result<(), BackendError> {
        let _guard = self.lock(key, LockMode::Exclusive)?;
        self.write_atomic(key, bytes, false)?;
        debug!(key = %key, bytes = bytes.len(), "record created");
        Ok(())
    }

    /// Read, transform, and write back a record under one exclusive lock.
    ///
    /// `mutate` receives the current bytes and returns the replacement bytes
    /// plus a value handed back to the caller. If it fails nothing is written.
    pub fn read_modify_write_locked<T, E, F>(&self, key: &Key, mutate: F) -> Result<T, E>
    where
        F: FnOnce(&[u8]) -> Result<(Vec<u8>, T), E>,
        E: From<BackendError>,
    {
        self.ensure_exists(key)?;
        let _guard = self.lock(key, LockMode::Exclusive)?;

        let current = self.read_record(key)?;
        let (next, output) = mutate(&current)?;
        self.write_atomic(key, &next, true)?;

        debug!(key = %key, before = current.len(), after = next.len(), "record rewritten");
        Ok(output)
    }

    /// Remove the record under an exclusive lock.
    ///
    /// The lock file stays behind: other callers may already hold it open,
    /// and a fresh lock file for a rewritten key would not exclude them.
    pub fn delete(&self, key: &Key) -> Result<(), BackendError> {
        self.ensure_exists(key)?;
        let _guard = self.lock(key, LockMode::Exclusive)?;

        let path = self.path_for(key);
        fs::remove_file(&path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => BackendError::NotFound(key.to_string()),
            _ => BackendError::io(&path, e),
        })?;

        self.sync_root()?;
        debug!(key = %key, "record deleted");
        Ok(())
    }

    fn ensure_exists(&self, key: &Key) -> Result<(), BackendError> {
        if self.exists(key) {
            Ok(())
        } else {
            Err(BackendError::NotFound(key.to_string()))
        }
    }

    fn lock(&self, key: &Key, mode: LockMode) -> Result<FileLock, BackendError> {
        let path = self.lock_path(key);
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)
            .map_err(|e| BackendError::io(&path, e))?;
        FileLock::acquire(file, &path, key, mode, &self.options.lock)
    }

    /// Caller must hold the key's lock.
    fn read_record(&self, key: &Key) -> Result<Vec<u8>, BackendError> {
        let path = self.path_for(key);
        fs::read(&path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => BackendError::NotFound(key.to_string()),
            _ => BackendError::io(&path, e),
        })
    }

    /// Caller must hold the key's exclusive lock.
    fn write_atomic(&self, key: &Key, bytes: &[u8], clobber: bool) -> Result<(), BackendError> {
        let path = self.path_for(key);

        let mut tmp = tempfile::Builder::new()
            .prefix(".")
            .suffix(".tmp")
            .tempfile_in(&self.root)
            .map_err(|e| BackendError::io(&self.root, e))?;

        tmp.write_all(bytes)
            .and_then(|()| tmp.flush())
            .map_err(|e| BackendError::io(tmp.path(), e))?;
        if self.options.sync {
            tmp.as_file()
                .sync_all()
                .map_err(|e| BackendError::io(tmp.path(), e))?;
        }

        let persisted = if clobber {
            tmp.persist(&path)
        } else {
            tmp.persist_noclobber(&path)
        };
        // A failed persist drops (and removes) the temp file.
        persisted.map_err(|e| match e.error.kind() {
            io::ErrorKind::AlreadyExists if !clobber => BackendError::AlreadyExists(key.to_string()),
            _ => BackendError::io(&path, e.error),
        })?;

        self.sync_root()
    }

    fn sync_root(&self) -> Result<(), BackendError> {
        if !self.options.sync {
            return Ok(());
        }
        #[cfg(unix)]
        {
            File::open(&self.root)
                .and_then(|dir| dir.sync_all())
                .map_err(|e| BackendError::io(&self.root, e))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tempfile::TempDir;

    fn backend(dir: &TempDir) -> anyhow::Result<FsBackend> {
        Ok(FsBackend::open(
            dir.path().join("store"),
            BackendOptions {
                lock: LockOptions {
                    timeout: Duration::from_millis(100),
                    poll_interval: Duration::from_millis(5),
                },
                sync: false,
            },
        )?)
    }

    fn stray_temp_files(backend: &FsBackend) -> anyhow::Result<Vec<String>> {
        let mut names = Vec::new();
        for entry in fs::read_dir(backend.root())? {
            let name = entry?.file_name().to_string_lossy().into_owned();
            if name.ends_with(".tmp") {
                names.push(name);
            }
        }
        Ok(names)
    }

    #[test]
    fn test_open_creates_root_and_lock_dir() -> anyhow::Result<()> {
        let dir = TempDir::new()?;
        let backend = backend(&dir)?;
        assert!(backend.root().is_dir());
        assert!(backend.root().join(LOCK_DIR).is_dir());
        Ok(())
    }

    #[test]
    fn test_path_for_stays_under_root() -> anyhow::Result<()> {
        let dir = TempDir::new()?;
        let backend = backend(&dir)?;
        let key = Key::parse("doc-1")?;
        let path = backend.path_for(&key);
        assert_eq!(path.parent(), Some(backend.root()));
        assert_eq!(path.file_name().and_then(|n| n.to_str()), Some("doc-1.json"));
        Ok(())
    }

    #[test]
    fn test_write_then_read() -> anyhow::Result<()> {
        let dir = TempDir::new()?;
        let backend = backend(&dir)?;
        let key = backend.generate_key();

        assert!(!backend.exists(&key));
        backend.write_locked(&key, b"{\"a\":1}")?;
        assert!(backend.exists(&key));
        assert_eq!(backend.read_locked(&key)?, b"{\"a\":1}");

        backend.write_locked(&key, b"{\"a\":2}")?;
        assert_eq!(backend.read_locked(&key)?, b"{\"a\":2}");
        assert!(stray_temp_files(&backend)?.is_empty());
        Ok(())
    }

    #[test]
    fn test_read_missing_is_not_found_and_leaves_no_lock_file() -> anyhow::Result<()> {
        let dir = TempDir::new()?;
        let backend = backend(&dir)?;
        let key = backend.generate_key();

        assert!(matches!(backend.read_locked(&key), Err(BackendError::NotFound(_))));
        assert!(!backend.lock_path(&key).exists());
        Ok(())
    }

    #[test]
    fn test_create_does_not_clobber() -> anyhow::Result<()> {
        let dir = TempDir::new()?;
        let backend = backend(&dir)?;
        let key = backend.generate_key();

        backend.create_locked(&key, b"first")?;
        let second = backend.create_locked(&key, b"second");
        assert!(matches!(second, Err(BackendError::AlreadyExists(_))));
        assert_eq!(backend.read_locked(&key)?, b"first");
        assert!(stray_temp_files(&backend)?.is_empty());
        Ok(())
    }

    #[test]
    fn test_read_modify_write_applies_mutation() -> anyhow::Result<()> {
        let dir = TempDir::new()?;
        let backend = backend(&dir)?;
        let key = backend.generate_key();
        backend.create_locked(&key, b"1")?;

        let previous: usize = backend.read_modify_write_locked(&key, |current| {
            let mut next = current.to_vec();
            next.extend_from_slice(b"2");
            Ok::<_, BackendError>((next, current.len()))
        })?;

        assert_eq!(previous, 1);
        assert_eq!(backend.read_locked(&key)?, b"12");
        Ok(())
    }

    #[test]
    fn test_failed_mutation_writes_nothing() -> anyhow::Result<()> {
        let dir = TempDir::new()?;
        let backend = backend(&dir)?;
        let key = backend.generate_key();
        backend.create_locked(&key, b"original")?;

        let result: Result<(), BackendError> = backend.read_modify_write_locked(&key, |_| {
            Err(BackendError::NotFound("simulated".to_string()))
        });

        assert!(result.is_err());
        assert_eq!(backend.read_locked(&key)?, b"original");
        Ok(())
    }

    #[test]
    fn test_read_modify_write_missing_is_not_found() -> anyhow::Result<()> {
        let dir = TempDir::new()?;
        let backend = backend(&dir)?;
        let key = backend.generate_key();

        let result: Result<(), BackendError> =
            backend.read_modify_write_locked(&key, |current| Ok((current.to_vec(), ())));
        assert!(matches!(result, Err(BackendError::NotFound(_))));
        assert!(!backend.exists(&key));
        Ok(())
    }

    #[test]
    fn test_delete_removes_record_and_keeps_lock() -> anyhow::Result<()> {
        let dir = TempDir::new()?;
        let backend = backend(&dir)?;
        let key = backend.generate_key();
        backend.create_locked(&key, b"x")?;
        assert!(backend.lock_path(&key).exists());

        backend.delete(&key)?;
        assert!(!backend.exists(&key));
        assert!(backend.lock_path(&key).exists());
        assert!(matches!(backend.delete(&key), Err(BackendError::NotFound(_))));
        Ok(())
    }

    #[test]
    fn test_rewritten_key_still_excludes_earlier_openers() -> anyhow::Result<()> {
        let dir = TempDir::new()?;
        let backend = backend(&dir)?;
        let key = Key::parse("reused")?;
        backend.write_locked(&key, b"v1")?;

        // Opened before the delete, locked only after the key is written again.
        let early = OpenOptions::new()
            .read(true)
            .write(true)
            .open(backend.lock_path(&key))?;

        backend.delete(&key)?;
        backend.write_locked(&key, b"v2")?;

        let _held = backend.lock(&key, LockMode::Exclusive)?;
        assert!(fs2::FileExt::try_lock_exclusive(&early).is_err());
        assert!(fs2::FileExt::try_lock_shared(&early).is_err());
        Ok(())
    }

    #[test]
    fn test_held_exclusive_lock_times_out_reader() -> anyhow::Result<()> {
        let dir = TempDir::new()?;
        let backend = backend(&dir)?;
        let key = backend.generate_key();
        backend.create_locked(&key, b"x")?;

        let _held = backend.lock(&key, LockMode::Exclusive)?;
        let result = backend.read_locked(&key);
        assert!(matches!(result, Err(BackendError::LockTimeout { .. })));
        Ok(())
    }

    #[test]
    fn test_reads_record_without_lock_file() -> anyhow::Result<()> {
        let dir = TempDir::new()?;
        let backend = backend(&dir)?;
        let key = Key::parse("legacy")?;
        fs::write(backend.path_for(&key), b"{}")?;

        assert_eq!(backend.read_locked(&key)?, b"{}");
        Ok(())
    }
}
