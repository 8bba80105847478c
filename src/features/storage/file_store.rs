//! Checksum-gated file persistence with a durable id counter.
//!
//! Two artifacts live on disk: the data file (the raw payload, newline
//! terminated) and a small metadata file `{"id": .., "checksum": ..}`. The
//! payload is cached in memory; `read` never touches the disk.

use crate::core::{ReminderError, Result};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::sync::Mutex;

/// Payload reported for a store that has never been written
pub const EMPTY_COLLECTION: &[u8] = b"[]";

const TERMINATOR: u8 = b'\n';

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
struct Metadata {
    /// Last id handed out
    #[serde(default)]
    id: u64,
    /// Hex SHA-256 of the last payload written to the data file
    #[serde(default)]
    checksum: String,
}

#[derive(Debug, Default)]
struct StoreState {
    meta: Metadata,
    cache: Vec<u8>,
}

pub struct FileStore {
    data_path: PathBuf,
    meta_path: PathBuf,
    state: Mutex<StoreState>,
}

impl FileStore {
    pub fn new(data_path: impl Into<PathBuf>, meta_path: impl Into<PathBuf>) -> Self {
        FileStore {
            data_path: data_path.into(),
            meta_path: meta_path.into(),
            state: Mutex::new(StoreState::default()),
        }
    }

    pub fn data_path(&self) -> &Path {
        &self.data_path
    }

    pub fn meta_path(&self) -> &Path {
        &self.meta_path
    }

    /// Open (or create) both files and load them into memory.
    ///
    /// The stored checksum is always reconciled against the data actually on
    /// disk, so a crash between the metadata and data writes heals here.
    pub async fn start(&self) -> Result<()> {
        let meta_bytes = read_or_create(&self.meta_path).await?;
        let mut meta: Metadata = if meta_bytes.iter().all(u8::is_ascii_whitespace) {
            Metadata::default()
        } else {
            serde_json::from_slice(&meta_bytes).map_err(|e| {
                ReminderError::format(
                    format!("could not parse metadata file {}", self.meta_path.display()),
                    e,
                )
            })?
        };

        let data = read_or_create(&self.data_path).await?;
        let actual = checksum(&data);
        if meta.checksum.is_empty() {
            debug!("no stored checksum, computed one over {} byte(s)", data.len());
        } else if meta.checksum != actual {
            warn!(
                "stored checksum does not match {}, recomputing",
                self.data_path.display()
            );
        }
        meta.checksum = actual;

        info!(
            "file store started: {} ({} byte(s), last id {})",
            self.data_path.display(),
            data.len(),
            meta.id
        );

        let mut state = self.state.lock().await;
        state.meta = meta;
        state.cache = data;
        Ok(())
    }

    /// Current cached payload.
    pub async fn read(&self) -> Vec<u8> {
        let state = self.state.lock().await;
        if state.cache.is_empty() {
            EMPTY_COLLECTION.to_vec()
        } else {
            state.cache.clone()
        }
    }

    /// Persist `payload` unless its checksum matches the last write.
    ///
    /// Returns the number of bytes written, `0` when the write was skipped.
    pub async fn write(&self, payload: &[u8]) -> Result<usize> {
        let mut bytes = Vec::with_capacity(payload.len() + 1);
        bytes.extend_from_slice(payload);
        bytes.push(TERMINATOR);

        let sum = checksum(&bytes);
        let mut state = self.state.lock().await;
        if state.meta.checksum == sum {
            return Ok(0);
        }

        let meta = Metadata {
            id: state.meta.id,
            checksum: sum,
        };
        self.write_meta(&meta).await?;
        // in-memory checksum only moves once the data itself is on disk
        let written = write_atomic(&self.data_path, &bytes).await?;
        state.meta = meta;
        state.cache = bytes;
        Ok(written)
    }

    /// Length of the cached payload.
    pub async fn size(&self) -> usize {
        let state = self.state.lock().await;
        if state.cache.is_empty() {
            EMPTY_COLLECTION.len()
        } else {
            state.cache.len()
        }
    }

    /// Allocate the next id and persist the counter before handing it out.
    pub async fn generate_id(&self) -> Result<u64> {
        let mut state = self.state.lock().await;
        state.meta.id += 1;
        let id = state.meta.id;
        self.write_meta(&state.meta).await?;
        Ok(id)
    }

    pub async fn last_id(&self) -> u64 {
        self.state.lock().await.meta.id
    }

    pub async fn checksum(&self) -> String {
        self.state.lock().await.meta.checksum.clone()
    }

    /// Flush both artifacts unconditionally.
    pub async fn stop(&self) -> Result<()> {
        info!("shutting down the file store");
        let state = self.state.lock().await;
        self.write_meta(&state.meta).await?;
        write_atomic(&self.data_path, &state.cache).await?;
        info!("file store was successfully shut down");
        Ok(())
    }

    async fn write_meta(&self, meta: &Metadata) -> Result<()> {
        let mut bytes = serde_json::to_vec(meta)
            .map_err(|e| ReminderError::format("could not encode metadata", e))?;
        bytes.push(TERMINATOR);
        write_atomic(&self.meta_path, &bytes).await?;
        Ok(())
    }
}

/// Hex SHA-256 digest of `bytes`
pub fn checksum(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

async fn read_or_create(path: &Path) -> Result<Vec<u8>> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(|e| {
            ReminderError::io(format!("could not create directory {}", parent.display()), e)
        })?;
    }

    let mut file = tokio::fs::OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .open(path)
        .await
        .map_err(|e| {
            ReminderError::io(format!("could not open or create {}", path.display()), e)
        })?;

    let mut bytes = Vec::new();
    file.read_to_end(&mut bytes)
        .await
        .map_err(|e| ReminderError::io(format!("could not read {}", path.display()), e))?;
    Ok(bytes)
}

/// Replace `path` via a sibling temp file and rename.
async fn write_atomic(path: &Path, bytes: &[u8]) -> Result<usize> {
    let tmp_name = format!(
        ".{}.tmp-{}",
        path.file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("store"),
        std::process::id()
    );
    let tmp_path = path
        .parent()
        .map(|p| p.join(&tmp_name))
        .unwrap_or_else(|| PathBuf::from(&tmp_name));

    let write_err = |e: std::io::Error| ReminderError::io(format!("could not write {}", tmp_path.display()), e);
    let mut file = tokio::fs::File::create(&tmp_path).await.map_err(write_err)?;
    file.write_all(bytes).await.map_err(write_err)?;
    // contents must be on disk before the rename can expose them
    file.sync_all().await.map_err(write_err)?;
    drop(file);

    tokio::fs::rename(&tmp_path, path)
        .await
        .map_err(|e| ReminderError::io(format!("could not replace {}", path.display()), e))?;
    sync_parent(path).await?;

    debug!("wrote {} byte(s) to {}", bytes.len(), path.display());
    Ok(bytes.len())
}

/// Persist the directory entry created by a rename.
#[cfg(unix)]
async fn sync_parent(path: &Path) -> Result<()> {
    let parent = match path.parent().filter(|p| !p.as_os_str().is_empty()) {
        Some(parent) => parent,
        None => Path::new("."),
    };
    let dir = tokio::fs::File::open(parent)
        .await
        .map_err(|e| ReminderError::io(format!("could not open {}", parent.display()), e))?;
    dir.sync_all()
        .await
        .map_err(|e| ReminderError::io(format!("could not sync {}", parent.display()), e))
}

#[cfg(not(unix))]
async fn sync_parent(_path: &Path) -> Result<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn paths(dir: &Path) -> (PathBuf, PathBuf) {
        (dir.join("db.json"), dir.join(".db.config.json"))
    }

    #[tokio::test]
    async fn test_start_creates_missing_files() {
        let dir = tempdir().unwrap();
        let (data, meta) = paths(dir.path());
        let store = FileStore::new(&data, &meta);

        store.start().await.unwrap();

        assert!(data.exists());
        assert!(meta.exists());
        assert_eq!(store.read().await, b"[]".to_vec());
        assert_eq!(store.size().await, 2);
        assert_eq!(store.last_id().await, 0);
    }

    #[tokio::test]
    async fn test_identical_write_is_skipped() {
        let dir = tempdir().unwrap();
        let (data, meta) = paths(dir.path());
        let store = FileStore::new(&data, &meta);
        store.start().await.unwrap();

        let first = store.write(br#"[{"id":1}]"#).await.unwrap();
        assert_eq!(first, br#"[{"id":1}]"#.len() + 1);
        let checksum_after_first = store.checksum().await;

        // tamper with the file; a skipped write must not touch it
        tokio::fs::write(&data, b"sentinel").await.unwrap();
        let second = store.write(br#"[{"id":1}]"#).await.unwrap();
        assert_eq!(second, 0);
        assert_eq!(tokio::fs::read(&data).await.unwrap(), b"sentinel".to_vec());
        assert_eq!(store.checksum().await, checksum_after_first);
    }

    #[tokio::test]
    async fn test_write_replaces_file_without_leaving_temp_files() {
        let dir = tempdir().unwrap();
        let (data, meta) = paths(dir.path());
        let store = FileStore::new(&data, &meta);
        store.start().await.unwrap();

        store.write(br#"[{"id":1}]"#).await.unwrap();
        store.write(br#"[{"id":1},{"id":2}]"#).await.unwrap();

        assert_eq!(
            tokio::fs::read(&data).await.unwrap(),
            b"[{\"id\":1},{\"id\":2}]\n".to_vec()
        );
        let mut entries = tokio::fs::read_dir(dir.path()).await.unwrap();
        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await.unwrap() {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
        names.sort();
        assert_eq!(names, vec![".db.config.json", "db.json"]);
    }

    #[tokio::test]
    async fn test_write_refreshes_cache_and_metadata() {
        let dir = tempdir().unwrap();
        let (data, meta) = paths(dir.path());
        let store = FileStore::new(&data, &meta);
        store.start().await.unwrap();

        store.write(b"[1,2]").await.unwrap();

        assert_eq!(store.read().await, b"[1,2]\n".to_vec());
        assert_eq!(store.size().await, 6);
        assert_eq!(tokio::fs::read(&data).await.unwrap(), b"[1,2]\n".to_vec());

        let raw_meta = tokio::fs::read_to_string(&meta).await.unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&raw_meta).unwrap();
        assert_eq!(parsed["checksum"], checksum(b"[1,2]\n"));
        assert!(raw_meta.ends_with('\n'));
    }

    #[tokio::test]
    async fn test_generated_ids_survive_restart() {
        let dir = tempdir().unwrap();
        let (data, meta) = paths(dir.path());

        let store = FileStore::new(&data, &meta);
        store.start().await.unwrap();
        assert_eq!(store.generate_id().await.unwrap(), 1);
        assert_eq!(store.generate_id().await.unwrap(), 2);
        drop(store);

        // no write or stop happened; the counter must still be durable
        let reopened = FileStore::new(&data, &meta);
        reopened.start().await.unwrap();
        assert_eq!(reopened.generate_id().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_legacy_metadata_without_checksum() {
        let dir = tempdir().unwrap();
        let (data, meta) = paths(dir.path());
        tokio::fs::write(&data, b"[{\"id\":4}]\n").await.unwrap();
        tokio::fs::write(&meta, b"{\"id\":4}\n").await.unwrap();

        let store = FileStore::new(&data, &meta);
        store.start().await.unwrap();

        assert_eq!(store.last_id().await, 4);
        assert_eq!(store.checksum().await, checksum(b"[{\"id\":4}]\n"));
        assert_eq!(store.write(b"[{\"id\":4}]").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_stale_checksum_is_healed_on_start() {
        let dir = tempdir().unwrap();
        let (data, meta) = paths(dir.path());
        // metadata claims a payload that never reached the data file
        tokio::fs::write(&data, b"[]\n").await.unwrap();
        let stale = format!("{{\"id\":2,\"checksum\":\"{}\"}}\n", checksum(b"[{\"id\":2}]\n"));
        tokio::fs::write(&meta, stale).await.unwrap();

        let store = FileStore::new(&data, &meta);
        store.start().await.unwrap();

        let written = store.write(b"[{\"id\":2}]").await.unwrap();
        assert!(written > 0);
        assert_eq!(
            tokio::fs::read(&data).await.unwrap(),
            b"[{\"id\":2}]\n".to_vec()
        );
    }

    #[tokio::test]
    async fn test_malformed_metadata_is_format_error() {
        let dir = tempdir().unwrap();
        let (data, meta) = paths(dir.path());
        tokio::fs::write(&meta, b"{not json").await.unwrap();

        let store = FileStore::new(&data, &meta);
        let err = store.start().await.unwrap_err();
        assert!(matches!(err, ReminderError::Format { .. }));
    }

    #[tokio::test]
    async fn test_start_fails_when_path_is_a_directory() {
        let dir = tempdir().unwrap();
        let data = dir.path().join("db.json");
        tokio::fs::create_dir(&data).await.unwrap();

        let store = FileStore::new(&data, dir.path().join("meta.json"));
        let err = store.start().await.unwrap_err();
        assert!(matches!(err, ReminderError::Io { .. }));
    }

    #[tokio::test]
    async fn test_stop_flushes_both_files() {
        let dir = tempdir().unwrap();
        let (data, meta) = paths(dir.path());
        let store = FileStore::new(&data, &meta);
        store.start().await.unwrap();
        store.write(b"[7]").await.unwrap();

        tokio::fs::remove_file(&data).await.unwrap();
        tokio::fs::remove_file(&meta).await.unwrap();
        store.stop().await.unwrap();

        assert_eq!(tokio::fs::read(&data).await.unwrap(), b"[7]\n".to_vec());
        let parsed: serde_json::Value =
            serde_json::from_slice(&tokio::fs::read(&meta).await.unwrap()).unwrap();
        assert_eq!(parsed["checksum"], checksum(b"[7]\n"));
    }
}
