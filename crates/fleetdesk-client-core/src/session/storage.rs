//! Durable string slots the credential store writes to
//!
//! In the browser this is `localStorage`, on native it is a json file. Tests
//! and short lived tools use [`MemoryStore`]

use std::{
    collections::HashMap,
    fmt::Debug,
    sync::{Arc, Mutex},
};

/// Minimal key value interface over a durable store
///
/// Writes may fail (quota, permissions, disk full), reads may not. A read
/// that cannot be served is reported as a missing value
pub trait KeyValueStore: Debug + Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str) -> anyhow::Result<()>;
    fn remove(&self, key: &str) -> anyhow::Result<()>;

    /// Applies `ops` in order, stopping at the first failure
    ///
    /// Backends that pay per write should override this to persist once
    fn apply(&self, ops: &[StoreOp<'_>]) -> anyhow::Result<()> {
        for op in ops {
            match op {
                StoreOp::Set(key, value) => self.set(key, value)?,
                StoreOp::Remove(key) => self.remove(key)?,
            }
        }
        Ok(())
    }
}

/// One step of a [`KeyValueStore::apply`] batch
#[derive(Clone, Copy, PartialEq, Eq)]
pub enum StoreOp<'a> {
    Set(&'a str, &'a str),
    Remove(&'a str),
}

impl Debug for StoreOp<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Values are credentials
        match self {
            Self::Set(key, _) => write!(f, "Set({key:?}, ..)"),
            Self::Remove(key) => write!(f, "Remove({key:?})"),
        }
    }
}

#[derive(Default, Clone)]
pub struct MemoryStore {
    values: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of slots currently holding a value
    pub fn len(&self) -> usize {
        self.values.lock().expect("mutex poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Debug for MemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Values are credentials
        f.debug_struct("MemoryStore")
            .field("len", &self.len())
            .finish()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values.lock().expect("mutex poisoned").get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> anyhow::Result<()> {
        self.values
            .lock()
            .expect("mutex poisoned")
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> anyhow::Result<()> {
        self.values.lock().expect("mutex poisoned").remove(key);
        Ok(())
    }
}

#[cfg(not(target_arch = "wasm32"))]
pub use file::FileStore;

#[cfg(not(target_arch = "wasm32"))]
mod file {
    use anyhow::Context as _;
    use std::{
        collections::BTreeMap,
        fs,
        path::{Path, PathBuf},
        sync::Mutex,
    };
    use tracing::warn;

    use super::{KeyValueStore, StoreOp};

    /// Keeps every slot in a single json object on disk
    ///
    /// The whole file is rewritten on each change by writing a sibling temp
    /// file and renaming it over the original, so a crash never leaves a half
    /// written file behind. [`KeyValueStore::apply`] rewrites it once per batch
    pub struct FileStore {
        path: PathBuf,
        values: Mutex<BTreeMap<String, String>>,
    }

    impl FileStore {
        /// Opens (or prepares to create) the store at `path`. An unreadable or
        /// corrupt file is treated as empty
        #[tracing::instrument]
        pub fn open(path: impl Into<PathBuf> + std::fmt::Debug) -> Self {
            let path = path.into();
            let values = match fs::read_to_string(&path) {
                Ok(contents) => serde_json::from_str(&contents).unwrap_or_else(|e| {
                    warn!(?e, ?path, "session file is corrupt, starting empty");
                    BTreeMap::new()
                }),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
                Err(e) => {
                    warn!(?e, ?path, "unable to read session file, starting empty");
                    BTreeMap::new()
                }
            };
            Self {
                path,
                values: Mutex::new(values),
            }
        }

        pub fn path(&self) -> &Path {
            &self.path
        }

        fn persist(&self, values: &BTreeMap<String, String>) -> anyhow::Result<()> {
            if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent)
                    .with_context(|| format!("failed to create directory: {parent:?}"))?;
            }
            let contents =
                serde_json::to_string_pretty(values).context("failed to serialize session")?;
            let tmp_path = self.path.with_extension("tmp");
            fs::write(&tmp_path, contents)
                .with_context(|| format!("failed to write file: {tmp_path:?}"))?;
            fs::rename(&tmp_path, &self.path)
                .with_context(|| format!("failed to replace file: {:?}", self.path))
        }

        fn update<F>(&self, f: F) -> anyhow::Result<()>
        where
            F: FnOnce(&mut BTreeMap<String, String>),
        {
            let mut guard = self.values.lock().expect("mutex poisoned");
            let mut updated = guard.clone();
            f(&mut updated);
            self.persist(&updated)?;
            *guard = updated;
            Ok(())
        }
    }

    impl std::fmt::Debug for FileStore {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.debug_struct("FileStore")
                .field("path", &self.path)
                .finish_non_exhaustive()
        }
    }

    impl KeyValueStore for FileStore {
        fn get(&self, key: &str) -> Option<String> {
            self.values.lock().expect("mutex poisoned").get(key).cloned()
        }

        fn set(&self, key: &str, value: &str) -> anyhow::Result<()> {
            self.update(|values| {
                values.insert(key.to_string(), value.to_string());
            })
        }

        fn remove(&self, key: &str) -> anyhow::Result<()> {
            if self.get(key).is_none() {
                return Ok(());
            }
            self.update(|values| {
                values.remove(key);
            })
        }

        fn apply(&self, ops: &[StoreOp<'_>]) -> anyhow::Result<()> {
            self.update(|values| {
                for op in ops {
                    match *op {
                        StoreOp::Set(key, value) => {
                            values.insert(key.to_string(), value.to_string());
                        }
                        StoreOp::Remove(key) => {
                            values.remove(key);
                        }
                    }
                }
            })
        }
    }

}

#[cfg(target_arch = "wasm32")]
pub use web::LocalStorageStore;

#[cfg(target_arch = "wasm32")]
mod web {
    use anyhow::anyhow;

    use super::KeyValueStore;

    /// Backed by the browser's `window.localStorage`
    ///
    /// The storage handle is looked up on every call because `web_sys::Storage`
    /// is not `Send`
    #[derive(Debug, Default, Clone, Copy)]
    pub struct LocalStorageStore;

    fn local_storage() -> anyhow::Result<web_sys::Storage> {
        web_sys::window()
            .ok_or_else(|| anyhow!("no global window"))?
            .local_storage()
            .map_err(|e| anyhow!("local storage not accessible: {e:?}"))?
            .ok_or_else(|| anyhow!("local storage not available"))
    }

    impl KeyValueStore for LocalStorageStore {
        fn get(&self, key: &str) -> Option<String> {
            local_storage().ok()?.get_item(key).ok()?
        }

        fn set(&self, key: &str, value: &str) -> anyhow::Result<()> {
            local_storage()?
                .set_item(key, value)
                .map_err(|e| anyhow!("failed to write {key} to local storage: {e:?}"))
        }

        fn remove(&self, key: &str) -> anyhow::Result<()> {
            local_storage()?
                .remove_item(key)
                .map_err(|e| anyhow!("failed to remove {key} from local storage: {e:?}"))
        }
    }
}
