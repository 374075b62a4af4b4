use serde::{de::DeserializeOwned, Serialize};
use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tauri::Manager;

use crate::services::hotkeys::{is_valid_binding, DEFAULT_BINDING};
use crate::services::presets::{WindowSize, DEFAULT_PRESET};

const CONFIG_FILE: &str = "config.json";

pub const KEY_HOTKEY: &str = "defaultKeyCombination";
pub const KEY_WINDOW_SIZE: &str = "windowSize";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to encode config value '{key}': {source}")]
    Encode {
        key: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to resolve app data directory: {0}")]
    DataDir(String),
}

/// Durable key/value store for user configuration.
///
/// Values are returned as stored; validation belongs to the caller.
pub trait ConfigStore: Send {
    fn get_value(&self, key: &str) -> Option<Value>;
    /// Returns only after the value has reached durable storage.
    fn set_value(&self, key: &str, value: Value) -> Result<(), ConfigError>;
}

/// Typed read that treats a missing or mistyped value as absent.
pub fn get_or<T: DeserializeOwned>(store: &dyn ConfigStore, key: &str, default: T) -> T {
    let Some(value) = store.get_value(key) else {
        return default;
    };
    match serde_json::from_value(value) {
        Ok(parsed) => parsed,
        Err(err) => {
            log::warn!("Ignoring malformed config value '{key}': {err}");
            default
        }
    }
}

pub fn set<T: Serialize>(store: &dyn ConfigStore, key: &str, value: &T) -> Result<(), ConfigError> {
    let value = serde_json::to_value(value).map_err(|source| ConfigError::Encode {
        key: key.to_string(),
        source,
    })?;
    store.set_value(key, value)
}

/// Persisted configuration after validation against defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Configuration {
    pub hotkey_binding: String,
    pub window_size: WindowSize,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            hotkey_binding: DEFAULT_BINDING.to_string(),
            window_size: DEFAULT_PRESET.size(),
        }
    }
}

impl Configuration {
    pub fn load(store: &dyn ConfigStore) -> Self {
        let defaults = Self::default();

        let stored_binding: String = get_or(store, KEY_HOTKEY, defaults.hotkey_binding.clone());
        let hotkey_binding = if is_valid_binding(&stored_binding) {
            stored_binding
        } else {
            log::warn!("Stored hotkey '{stored_binding}' is not a valid accelerator; using default");
            defaults.hotkey_binding
        };

        let stored_size: WindowSize = get_or(store, KEY_WINDOW_SIZE, defaults.window_size);
        let window_size = if stored_size.is_usable() {
            stored_size
        } else {
            log::warn!(
                "Stored window size {}x{} is unusable; using default",
                stored_size.width,
                stored_size.height
            );
            defaults.window_size
        };

        Self {
            hotkey_binding,
            window_size,
        }
    }
}

/// JSON file store: one flat object, rewritten atomically on every `set`.
pub struct JsonFileStore {
    path: PathBuf,
    state: Mutex<Map<String, Value>>,
}

impl JsonFileStore {
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let state = read_object(&path);
        Self {
            path,
            state: Mutex::new(state),
        }
    }

    pub fn in_app_data_dir(app: &tauri::AppHandle) -> Result<Self, ConfigError> {
        let dir = app
            .path()
            .app_data_dir()
            .map_err(|e| ConfigError::DataDir(e.to_string()))?;
        Ok(Self::open(dir.join(CONFIG_FILE)))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write_snapshot(&self, snapshot: &Map<String, Value>) -> Result<(), ConfigError> {
        let io_err = |source| ConfigError::Io {
            path: self.path.clone(),
            source,
        };

        let serialized =
            serde_json::to_string_pretty(snapshot).map_err(|source| ConfigError::Encode {
                key: "*".to_string(),
                source,
            })?;

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(io_err)?;
        }

        let tmp_path = self.path.with_extension("json.tmp");
        fs::write(&tmp_path, serialized).map_err(io_err)?;
        fs::rename(&tmp_path, &self.path).map_err(io_err)
    }
}

impl ConfigStore for JsonFileStore {
    fn get_value(&self, key: &str) -> Option<Value> {
        self.state.lock().ok()?.get(key).cloned()
    }

    fn set_value(&self, key: &str, value: Value) -> Result<(), ConfigError> {
        // Held across the write so readers never observe a value that is not on disk yet.
        let mut state = match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let previous = state.insert(key.to_string(), value);
        if let Err(err) = self.write_snapshot(&state) {
            match previous {
                Some(old) => state.insert(key.to_string(), old),
                None => state.remove(key),
            };
            return Err(err);
        }
        Ok(())
    }
}

fn read_object(path: &Path) -> Map<String, Value> {
    let Ok(contents) = fs::read_to_string(path) else {
        return Map::new();
    };
    match serde_json::from_str::<Value>(&contents) {
        Ok(Value::Object(map)) => map,
        Ok(_) => {
            log::warn!("{} does not hold a JSON object; starting empty", path.display());
            Map::new()
        }
        Err(err) => {
            log::warn!("{} is not valid JSON ({err}); starting empty", path.display());
            Map::new()
        }
    }
}
