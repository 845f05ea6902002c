//! Stable per-device identity.
//!
//! The student id and the resolved display name must survive reloads so a
//! rejoin updates the existing participant entry instead of minting a new
//! one. Values are generated once and persisted through a small key-value
//! store; the file-backed implementation is a JSON map on disk.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;

use thiserror::Error;
use tracing::warn;
use uuid::Uuid;

pub const DEVICE_ID_KEY: &str = "classcast.device_id";
pub const DISPLAY_NAME_KEY: &str = "classcast.display_name";

#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("identity store io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("identity store corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),
}

/// Local key-value persistence with get-or-create semantics. The same key
/// must yield the same value across reloads on the same device.
pub trait IdentityStore: Send + Sync {
    fn get_or_create(
        &self,
        key: &str,
        generate: &dyn Fn() -> String,
    ) -> Result<String, IdentityError>;
}

/// The identity a student client presents to every session.
#[derive(Debug, Clone)]
pub struct StudentIdentity {
    pub id: String,
    pub name: String,
}

/// Resolve (and persist, first time through) this device's identity.
/// `profile_name` comes from local profile data when the embedding app has
/// one; otherwise a placeholder is generated once and kept stable.
pub fn resolve_identity(
    store: &dyn IdentityStore,
    profile_name: Option<&str>,
) -> Result<StudentIdentity, IdentityError> {
    let id = store.get_or_create(DEVICE_ID_KEY, &|| Uuid::new_v4().to_string())?;
    let name = match profile_name {
        Some(name) if !name.trim().is_empty() => name.trim().to_string(),
        _ => store.get_or_create(DISPLAY_NAME_KEY, &placeholder_name)?,
    };
    Ok(StudentIdentity { id, name })
}

fn placeholder_name() -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!("Student-{}", &suffix[..4])
}

/// JSON map on disk. Writes rewrite the whole file; the map holds a handful
/// of keys, so that stays cheap.
pub struct FileIdentityStore {
    path: PathBuf,
    cache: Mutex<Option<HashMap<String, String>>>,
}

impl FileIdentityStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        FileIdentityStore {
            path: path.into(),
            cache: Mutex::new(None),
        }
    }

    fn load(&self) -> Result<HashMap<String, String>, IdentityError> {
        match std::fs::read_to_string(&self.path) {
            Ok(raw) => Ok(serde_json::from_str(&raw)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(HashMap::new()),
            Err(e) => Err(e.into()),
        }
    }

    fn persist(&self, map: &HashMap<String, String>) -> Result<(), IdentityError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, serde_json::to_string_pretty(map)?)?;
        Ok(())
    }
}

impl IdentityStore for FileIdentityStore {
    fn get_or_create(
        &self,
        key: &str,
        generate: &dyn Fn() -> String,
    ) -> Result<String, IdentityError> {
        let mut guard = self.cache.lock().unwrap_or_else(|poisoned| {
            warn!("Identity cache lock poisoned, recovering");
            poisoned.into_inner()
        });
        if guard.is_none() {
            *guard = Some(self.load()?);
        }
        let map = guard.as_mut().unwrap();
        if let Some(value) = map.get(key) {
            return Ok(value.clone());
        }
        let value = generate();
        map.insert(key.to_string(), value.clone());
        self.persist(map)?;
        Ok(value)
    }
}

/// Non-persistent store for tests and throwaway clients.
pub struct MemoryIdentityStore {
    map: Mutex<HashMap<String, String>>,
}

impl MemoryIdentityStore {
    pub fn new() -> Self {
        MemoryIdentityStore {
            map: Mutex::new(HashMap::new()),
        }
    }
}

impl Default for MemoryIdentityStore {
    fn default() -> Self {
        Self::new()
    }
}

impl IdentityStore for MemoryIdentityStore {
    fn get_or_create(
        &self,
        key: &str,
        generate: &dyn Fn() -> String,
    ) -> Result<String, IdentityError> {
        let mut map = self.map.lock().expect("identity map lock");
        Ok(map.entry(key.to_string()).or_insert_with(generate).clone())
    }
}
