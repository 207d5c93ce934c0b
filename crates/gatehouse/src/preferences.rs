//! Persisted client preferences.
//!
//! Preferences survive logout and are stored apart from session evidence.
//! The only one Gatehouse itself writes is [`PREFERRED_LOCALE_KEY`].

use std::collections::{BTreeMap, HashMap};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use gatehouse_protocol::{Codec, JsonCodec};

use crate::PreferenceError;

/// Key under which the profile's locale is remembered.
pub const PREFERRED_LOCALE_KEY: &str = "preferred_locale";

/// String key/value storage that outlives a session.
pub trait PreferenceStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, PreferenceError>;

    fn set(&self, key: &str, value: &str) -> Result<(), PreferenceError>;
}

// ---------------------------------------------------------------------------
// MemoryPreferences
// ---------------------------------------------------------------------------

/// Preferences that live as long as the process.
#[derive(Debug, Default)]
pub struct MemoryPreferences {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryPreferences {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PreferenceStore for MemoryPreferences {
    fn get(&self, key: &str) -> Result<Option<String>, PreferenceError> {
        let values = self.values.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(values.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), PreferenceError> {
        self.values
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), value.to_string());
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// FilePreferences
// ---------------------------------------------------------------------------

/// Preferences kept in a JSON object on disk.
///
/// Every `set` rewrites the whole file. A missing file reads as empty.
pub struct FilePreferences {
    path: PathBuf,
    codec: JsonCodec,
    write_lock: Mutex<()>,
}

impl FilePreferences {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            codec: JsonCodec,
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> Result<BTreeMap<String, String>, PreferenceError> {
        let bytes = match std::fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(source) => {
                return Err(PreferenceError::Io {
                    path: self.path.clone(),
                    source,
                });
            }
        };
        self.codec
            .decode(&bytes)
            .map_err(|source| PreferenceError::Format {
                path: self.path.clone(),
                source,
            })
    }
}

impl PreferenceStore for FilePreferences {
    fn get(&self, key: &str) -> Result<Option<String>, PreferenceError> {
        Ok(self.read_all()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), PreferenceError> {
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);

        let mut values = self.read_all()?;
        values.insert(key.to_string(), value.to_string());
        let bytes = self
            .codec
            .encode(&values)
            .map_err(|source| PreferenceError::Format {
                path: self.path.clone(),
                source,
            })?;

        let io = |source: std::io::Error| PreferenceError::Io {
            path: self.path.clone(),
            source,
        };
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir).map_err(io)?;
        }
        std::fs::write(&self.path, bytes).map_err(io)
    }
}
