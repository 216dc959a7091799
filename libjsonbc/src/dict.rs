//! Key dictionary: the mapping between object key names and integer ids.
//!
//! Containers never store key strings. Each distinct name is assigned a
//! small positive id by a [`KeyStore`], and objects store the ids as
//! ascending deltas. The [`KeyDictionary`] service sits in front of a store
//! and keeps a bidirectional cache that is filled lazily and never
//! invalidated: once a name has an id, that pairing holds for the lifetime
//! of the store.
//!
//! Two stores are provided:
//!
//! - [`MemoryStore`]: process-local, ids assigned from 1.
//! - [`FileStore`]: one name per line, the 1-based line number is the id.

use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::{Error, Result};

/// Backing storage for key ids.
///
/// `get_or_insert` must be an atomic insert-or-select: concurrent callers
/// asking for the same new name converge on one id. Ids must be `>= 1`.
pub trait KeyStore: Send + Sync {
    /// Return the id for `name`, assigning a new one if it has none.
    fn get_or_insert(&self, name: &str) -> Result<i32>;

    /// Return the name for `id`, if one was ever assigned.
    fn lookup(&self, id: i32) -> Result<Option<String>>;

    /// Return the id for `name` without assigning one.
    fn find(&self, name: &str) -> Result<Option<i32>>;

    /// Make every assignment so far durable.
    fn flush(&self) -> Result<()> {
        Ok(())
    }
}

#[derive(Default)]
struct Names {
    by_id: Vec<String>,
    by_name: HashMap<String, i32>,
}

impl Names {
    fn lookup(&self, id: i32) -> Option<String> {
        let index = usize::try_from(id).ok()?.checked_sub(1)?;
        self.by_id.get(index).cloned()
    }

    fn push(&mut self, name: &str) -> Result<i32> {
        let id = i32::try_from(self.by_id.len() + 1)
            .map_err(|_| Error::limit("number of dictionary keys", i32::MAX as usize))?;
        self.by_id.push(name.to_string());
        self.by_name.insert(name.to_string(), id);
        Ok(id)
    }
}

/// In-memory key store.
#[derive(Default)]
pub struct MemoryStore {
    names: Mutex<Names>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyStore for MemoryStore {
    fn get_or_insert(&self, name: &str) -> Result<i32> {
        let mut names = self.names.lock();
        if let Some(&id) = names.by_name.get(name) {
            return Ok(id);
        }
        names.push(name)
    }

    fn lookup(&self, id: i32) -> Result<Option<String>> {
        Ok(self.names.lock().lookup(id))
    }

    fn find(&self, name: &str) -> Result<Option<i32>> {
        Ok(self.names.lock().by_name.get(name).copied())
    }
}

/// Key store persisted as a newline-delimited file of names.
///
/// Line `n` (1-based) holds the name whose id is `n`. The whole file is
/// loaded at open; new names are appended and flushed as they are assigned.
/// Names containing a newline cannot be stored.
///
/// Only one process should have a given file open for writing at a time.
pub struct FileStore {
    path: PathBuf,
    inner: Mutex<FileInner>,
}

struct FileInner {
    names: Names,
    file: File,
}

impl FileStore {
    /// Open (or create) the store at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let mut file = OpenOptions::new()
            .read(true)
            .append(true)
            .create(true)
            .open(&path)?;

        let mut content = String::new();
        file.read_to_string(&mut content).map_err(|e| {
            if e.kind() == std::io::ErrorKind::InvalidData {
                Error::malformed(format!("{} is not valid UTF-8", path.display()))
            } else {
                Error::Io(e)
            }
        })?;

        let mut names = Names::default();
        if !content.is_empty() {
            let body = content.strip_suffix('\n').unwrap_or(&content);
            for (line, name) in body.split('\n').enumerate() {
                if names.by_name.contains_key(name) {
                    return Err(Error::malformed(format!(
                        "{}:{}: duplicate key {:?}",
                        path.display(),
                        line + 1,
                        name
                    )));
                }
                names.push(name)?;
            }
            // Terminate a dangling last line so the next name gets its own.
            if !content.ends_with('\n') {
                file.write_all(b"\n")?;
                file.flush()?;
            }
        }

        tracing::debug!(path = %path.display(), keys = names.by_id.len(), "Loaded key dictionary file");

        Ok(FileStore {
            path,
            inner: Mutex::new(FileInner { names, file }),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl KeyStore for FileStore {
    fn get_or_insert(&self, name: &str) -> Result<i32> {
        let mut inner = self.inner.lock();
        if let Some(&id) = inner.names.by_name.get(name) {
            return Ok(id);
        }
        if name.contains('\n') {
            return Err(Error::malformed(format!(
                "key {:?} contains a newline and cannot be stored",
                name
            )));
        }
        inner.file.write_all(format!("{}\n", name).as_bytes())?;
        inner.file.flush()?;
        inner.names.push(name)
    }

    fn lookup(&self, id: i32) -> Result<Option<String>> {
        Ok(self.inner.lock().names.lookup(id))
    }

    fn find(&self, name: &str) -> Result<Option<i32>> {
        Ok(self.inner.lock().names.by_name.get(name).copied())
    }

    fn flush(&self) -> Result<()> {
        let inner = self.inner.lock();
        inner.file.sync_data()?;
        Ok(())
    }
}

#[derive(Default)]
struct Cache {
    by_id: HashMap<i32, Arc<str>>,
    by_name: HashMap<Arc<str>, i32>,
}

impl Cache {
    fn insert(&mut self, id: i32, name: Arc<str>) {
        self.by_name.insert(Arc::clone(&name), id);
        self.by_id.insert(id, name);
    }
}

/// The key dictionary service.
///
/// Wraps a [`KeyStore`] with a bidirectional cache. Share it between threads
/// behind an `Arc`; the cache is guarded by a read-write lock and the store
/// provides its own synchronization.
pub struct KeyDictionary {
    store: Box<dyn KeyStore>,
    cache: RwLock<Cache>,
}

impl KeyDictionary {
    /// Start the service over `store`.
    pub fn open(store: impl KeyStore + 'static) -> Self {
        tracing::debug!("Opened key dictionary");
        KeyDictionary {
            store: Box::new(store),
            cache: RwLock::new(Cache::default()),
        }
    }

    /// A dictionary over a fresh [`MemoryStore`].
    pub fn in_memory() -> Self {
        Self::open(MemoryStore::new())
    }

    /// A dictionary over the [`FileStore`] at `path`.
    pub fn open_file(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self::open(FileStore::open(path)?))
    }

    /// Flush the store and shut the service down.
    pub fn close(self) -> Result<()> {
        self.store.flush()?;
        tracing::debug!(cached = self.cache.read().by_id.len(), "Closed key dictionary");
        Ok(())
    }

    /// Return the id for `name`, assigning one if needed.
    pub fn id_for(&self, name: &str) -> Result<i32> {
        if let Some(&id) = self.cache.read().by_name.get(name) {
            return Ok(id);
        }

        let id = self.store.get_or_insert(name)?;
        if id < 1 {
            return Err(Error::DictionaryLookupFailure(id));
        }
        tracing::trace!(name, id, "Key dictionary cache miss");
        self.cache.write().insert(id, Arc::from(name));
        Ok(id)
    }

    /// Return the name for `id`.
    ///
    /// An id with no name is a [`Error::DictionaryLookupFailure`].
    pub fn name_for(&self, id: i32) -> Result<Arc<str>> {
        if let Some(name) = self.cache.read().by_id.get(&id) {
            return Ok(Arc::clone(name));
        }

        let name: Arc<str> = match self.store.lookup(id)? {
            Some(name) => Arc::from(name),
            None => {
                tracing::debug!(id, "Key id has no name");
                return Err(Error::DictionaryLookupFailure(id));
            }
        };
        self.cache.write().insert(id, Arc::clone(&name));
        Ok(name)
    }

    /// Return the id for `name` if it already has one. Never assigns.
    pub fn find_id(&self, name: &str) -> Result<Option<i32>> {
        if let Some(&id) = self.cache.read().by_name.get(name) {
            return Ok(Some(id));
        }

        match self.store.find(name)? {
            Some(id) if id >= 1 => {
                self.cache.write().insert(id, Arc::from(name));
                Ok(Some(id))
            }
            Some(id) => Err(Error::DictionaryLookupFailure(id)),
            None => Ok(None),
        }
    }
}

impl std::fmt::Debug for KeyDictionary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyDictionary")
            .field("cached", &self.cache.read().by_id.len())
            .finish()
    }
}
