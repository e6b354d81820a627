//! Per-profile author identity.
//!
//! The identity is a pseudonymous token: a random integer below
//! [`AUTHOR_ID_UPPER_BOUND`] written in decimal. It is stored once in a small
//! JSON key/value file and never changes afterwards. Two profiles may draw the
//! same number; nothing resolves that.

use std::{
    collections::BTreeMap,
    fs, io,
    path::{Path, PathBuf},
    sync::{Mutex, PoisonError},
};
use tracing::{info, warn};

pub const AUTHOR_ID_KEY: &str = "authorID";
pub const AUTHOR_ID_UPPER_BOUND: u32 = 100_000;

const STORAGE_FILE: &str = "storage.json";

/// String key/value storage persisted as a single JSON object.
#[derive(Debug, Clone)]
pub struct LocalStorage {
    path: PathBuf,
}

impl LocalStorage {
    pub fn open(dir: impl AsRef<Path>) -> Self {
        Self {
            path: dir.as_ref().join(STORAGE_FILE),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn get_item(&self, key: &str) -> io::Result<Option<String>> {
        Ok(self.load()?.remove(key))
    }

    pub fn set_item(&self, key: &str, value: &str) -> io::Result<()> {
        let mut items = self.load()?;
        items.insert(key.to_string(), value.to_string());

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_vec_pretty(&items)?)?;
        fs::rename(&tmp, &self.path)
    }

    fn load(&self) -> io::Result<BTreeMap<String, String>> {
        let raw = match fs::read(&self.path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(err) => return Err(err),
        };

        match serde_json::from_slice(&raw) {
            Ok(items) => Ok(items),
            Err(err) => {
                warn!("ignoring unreadable storage file {}: {}", self.path.display(), err);
                Ok(BTreeMap::new())
            }
        }
    }
}

/// Lazily creates and then serves the author identity. Shared by every view.
#[derive(Debug)]
pub struct IdentityStore {
    storage: Option<LocalStorage>,
    cached: Mutex<Option<String>>,
}

impl IdentityStore {
    pub fn new(storage: LocalStorage) -> Self {
        Self {
            storage: Some(storage),
            cached: Mutex::new(None),
        }
    }

    /// Store without persistence: the identity lives as long as the process.
    pub fn in_memory() -> Self {
        Self {
            storage: None,
            cached: Mutex::new(None),
        }
    }

    pub fn from_dir(dir: Option<PathBuf>) -> Self {
        match dir {
            Some(dir) => Self::new(LocalStorage::open(dir)),
            None => Self::in_memory(),
        }
    }

    /// Returns the stored identity, generating and persisting one on first use.
    ///
    /// Storage failures never surface: the store logs them and falls back to a
    /// generated identity that is kept for the rest of the process, so two
    /// calls in one session always agree.
    pub fn get_or_create_author_id(&self) -> String {
        let mut cached = self.cached.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(id) = cached.as_ref() {
            return id.clone();
        }

        let id = match &self.storage {
            Some(storage) => load_or_create(storage),
            None => generate_author_id(),
        };
        *cached = Some(id.clone());
        id
    }
}

fn load_or_create(storage: &LocalStorage) -> String {
    match storage.get_item(AUTHOR_ID_KEY) {
        Ok(Some(id)) if !id.is_empty() => return id,
        Ok(_) => {}
        Err(err) => {
            warn!(
                "could not read {}: {}; using an unpersisted author id",
                storage.path().display(),
                err
            );
            return generate_author_id();
        }
    }

    let id = generate_author_id();
    match storage.set_item(AUTHOR_ID_KEY, &id) {
        Ok(()) => info!("generated author id {}", id),
        Err(err) => warn!(
            "could not persist author id to {}: {}",
            storage.path().display(),
            err
        ),
    }
    id
}

pub fn generate_author_id() -> String {
    rand::random_range(0..AUTHOR_ID_UPPER_BOUND).to_string()
}
