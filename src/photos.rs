//! Keyed blob store for captured photos.
//!
//! The core treats photo content as opaque bytes behind generated string
//! keys; compression and thumbnailing belong to the capture front-end.

use anyhow::{anyhow, Context, Result};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// Upper bound enforced by the capture front-end, not by the store itself.
pub const MAX_PHOTOS_PER_ITEM: usize = 3;

const KEY_PREFIX: &str = "photo_";

// Disambiguates captures landing on the same nanosecond.
static CAPTURE_SEQ: AtomicU64 = AtomicU64::new(0);

/// Directory-backed blob store, one file per key.
pub struct PhotoStore {
    dir: PathBuf,
}

impl PhotoStore {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    /// Store bytes under a freshly generated key and return it.
    pub fn put(&self, item_id: &str, bytes: &[u8]) -> Result<String> {
        let key = next_key(item_id);
        std::fs::create_dir_all(&self.dir)
            .with_context(|| format!("create photo dir {}", self.dir.display()))?;
        let path = self.dir.join(&key);
        std::fs::write(&path, bytes).with_context(|| format!("write {}", path.display()))?;
        tracing::debug!(key = %key, bytes = bytes.len(), "photo stored");
        Ok(key)
    }

    pub fn read(&self, key: &str) -> Result<Vec<u8>> {
        let path = self.checked_path(key)?;
        std::fs::read(&path).with_context(|| format!("read {}", path.display()))
    }

    /// Delete a blob; a missing key is not an error.
    pub fn delete(&self, key: &str) -> Result<()> {
        let path = self.checked_path(key)?;
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err).with_context(|| format!("remove {}", path.display())),
        }
    }

    /// Delete every stored photo blob. Returns how many were removed.
    pub fn clear_all(&self) -> Result<usize> {
        let entries = match std::fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(0),
            Err(err) => {
                return Err(err).with_context(|| format!("list {}", self.dir.display()));
            }
        };
        let mut removed = 0;
        for entry in entries {
            let entry = entry.with_context(|| format!("list {}", self.dir.display()))?;
            let name = entry.file_name();
            if name.to_string_lossy().starts_with(KEY_PREFIX) {
                std::fs::remove_file(entry.path())
                    .with_context(|| format!("remove {}", entry.path().display()))?;
                removed += 1;
            }
        }
        Ok(removed)
    }

    // Keys are opaque but they are also file names; anything resembling a
    // path component escape is rejected.
    fn checked_path(&self, key: &str) -> Result<PathBuf> {
        if !key.starts_with(KEY_PREFIX)
            || key.contains('/')
            || key.contains('\\')
            || key.contains("..")
        {
            return Err(anyhow!("invalid photo key `{key}`"));
        }
        Ok(self.dir.join(key))
    }
}

/// `photo_<item>_<unix-nanos>_<seq>`: unique within a session, never
/// interpreted beyond the prefix.
fn next_key(item_id: &str) -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_nanos())
        .unwrap_or_default();
    let seq = CAPTURE_SEQ.fetch_add(1, Ordering::Relaxed);
    format!("{KEY_PREFIX}{item_id}_{nanos}_{seq}")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_store() -> (tempfile::TempDir, PhotoStore) {
        let dir = tempfile::tempdir().expect("create temp dir");
        let store = PhotoStore::new(dir.path().join("photos"));
        (dir, store)
    }

    #[test]
    fn put_read_delete_cycle() {
        let (_dir, store) = temp_store();
        let key = store.put("seg_01", b"jpeg bytes").expect("put");
        assert!(key.starts_with("photo_seg_01_"));
        assert_eq!(store.read(&key).expect("read"), b"jpeg bytes");

        store.delete(&key).expect("delete");
        assert!(store.read(&key).is_err());
        // Idempotent: deleting again is fine.
        store.delete(&key).expect("second delete");
    }

    #[test]
    fn keys_are_unique_within_a_session() {
        let (_dir, store) = temp_store();
        let a = store.put("seg_01", b"a").expect("put");
        let b = store.put("seg_01", b"b").expect("put");
        assert_ne!(a, b);
        assert_eq!(store.read(&a).expect("read"), b"a");
        assert_eq!(store.read(&b).expect("read"), b"b");
    }

    #[test]
    fn clear_all_removes_every_blob() {
        let (_dir, store) = temp_store();
        store.put("seg_01", b"a").expect("put");
        store.put("ase_02", b"b").expect("put");
        assert_eq!(store.clear_all().expect("clear"), 2);
        assert_eq!(store.clear_all().expect("clear again"), 0);
    }

    #[test]
    fn traversal_keys_are_rejected() {
        let (_dir, store) = temp_store();
        assert!(store.read("../form.json").is_err());
        assert!(store.delete("photo_../../etc").is_err());
        assert!(store.read("not_a_photo_key").is_err());
    }
}
