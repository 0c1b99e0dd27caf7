use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::warn;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("persisted state at `{path}` is not readable: {source}")]
    Read { path: PathBuf, source: io::Error },
    #[error("persisted state at `{path}` is corrupt: {source}")]
    Corrupt { path: PathBuf, source: serde_json::Error },
    #[error("state serialization for `{path}` failed: {source}")]
    Serialize { path: PathBuf, source: serde_json::Error },
    #[error("state write to `{path}` failed: {source}")]
    Write { path: PathBuf, source: io::Error },
}

/// One persisted namespace backed by a single JSON file.
///
/// `save` never leaves a partially written canonical file behind: the new
/// contents go to a sibling temp file, are forced to stable storage, and then
/// replace the canonical path with one atomic rename. If anything fails
/// before the rename the prior contents remain authoritative and the temp
/// file is removed best-effort. Saves within one process are serialized by a
/// per-namespace gate so interleaved dialog steps for different users cannot
/// corrupt each other's write.
pub struct JsonStore {
    path: PathBuf,
    write_gate: Mutex<()>,
}

impl JsonStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), write_gate: Mutex::new(()) }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the namespace, returning the default value when no file has
    /// been persisted yet.
    pub fn load<T>(&self) -> Result<T, StoreError>
    where
        T: DeserializeOwned + Default,
    {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(source) if source.kind() == io::ErrorKind::NotFound => return Ok(T::default()),
            Err(source) => return Err(StoreError::Read { path: self.path.clone(), source }),
        };

        serde_json::from_str(&raw)
            .map_err(|source| StoreError::Corrupt { path: self.path.clone(), source })
    }

    /// Reads the namespace, treating unreadable or corrupt contents as empty.
    /// The failure is logged for the operator and never reaches an end user.
    pub fn load_or_default<T>(&self) -> T
    where
        T: DeserializeOwned + Default,
    {
        match self.load() {
            Ok(value) => value,
            Err(error) => {
                warn!(path = %self.path.display(), error = %error, "discarding unreadable namespace");
                T::default()
            }
        }
    }

    /// Durably and atomically replaces the namespace contents.
    pub async fn save<T>(&self, value: &T) -> Result<(), StoreError>
    where
        T: Serialize,
    {
        let _guard = self.write_gate.lock().await;

        let payload = serde_json::to_vec_pretty(value)
            .map_err(|source| StoreError::Serialize { path: self.path.clone(), source })?;

        let tmp = self.temp_path();
        if let Err(source) = write_and_swap(&tmp, &self.path, &payload) {
            let _ = fs::remove_file(&tmp);
            return Err(StoreError::Write { path: self.path.clone(), source });
        }
        Ok(())
    }

    fn temp_path(&self) -> PathBuf {
        let mut raw = self.path.as_os_str().to_owned();
        raw.push(".tmp");
        PathBuf::from(raw)
    }
}

fn write_and_swap(tmp: &Path, canonical: &Path, payload: &[u8]) -> io::Result<()> {
    if let Some(parent) = canonical.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let mut file = File::create(tmp)?;
    file.write_all(payload)?;
    file.sync_all()?;

    // Advisory cross-process lock held across the rename where the platform
    // has one; absence degrades to process-local serialization only.
    let _lock = take_advisory_lock(file);
    fs::rename(tmp, canonical)?;
    Ok(())
}

#[cfg(unix)]
fn take_advisory_lock(file: File) -> Option<nix::fcntl::Flock<File>> {
    nix::fcntl::Flock::lock(file, nix::fcntl::FlockArg::LockExclusive).ok()
}

#[cfg(not(unix))]
fn take_advisory_lock(file: File) -> File {
    file
}
