//! Process-wide balancer settings.
//!
//! The state is one JSON object: a few global keys (`enabled_balancers`,
//! `auto_select_quality`, `preferred_voice`) plus one object per balancer.
//! Every mutation is written through to a [`KeyValueStore`] right away.
//!
//! # Merge contract
//!
//! [`SettingsStore::load`] and [`SettingsStore::update`] merge **one level
//! deep** (see [`merge_one_level`]): updating `{"kodik": {"token": "x"}}`
//! keeps the other `kodik` fields, but anything nested below a balancer
//! object is replaced wholesale.

use std::collections::BTreeMap;
use std::sync::{Arc, PoisonError, RwLock};

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::store::KeyValueStore;
use crate::util::merge_one_level;

/// Key the settings object is persisted under.
pub const SETTINGS_KEY: &str = "balancers_settings";

const GLOBAL_KEYS: [&str; 3] = ["enabled_balancers", "auto_select_quality", "preferred_voice"];

/// Compiled-in defaults.
pub fn defaults() -> Value {
    json!({
        "enabled_balancers": ["svetacdn", "allohacdn", "videodb"],
        "auto_select_quality": "1080p",
        "preferred_voice": "Дубляж",
        "filmix": { "enabled": false, "token": "", "priority": 1, "apiUrl": "" },
        "svetacdn": { "enabled": true, "priority": 2, "apiUrl": "" },
        "kinopub": { "enabled": false, "token": "", "device_id": "", "priority": 3, "apiUrl": "" },
        "kodik": { "enabled": false, "token": "", "priority": 2, "apiUrl": "" },
        "rezka": { "enabled": false, "priority": 2, "apiUrl": "" },
        "videodb": { "enabled": true, "priority": 2, "apiUrl": "" },
        "vibix": { "enabled": false, "token": "", "priority": 2, "apiUrl": "" }
    })
}

/// Per-balancer record inside the settings object.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalancerSettings {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub device_id: Option<String>,
    #[serde(default)]
    pub priority: i64,
    #[serde(default, rename = "apiUrl", alias = "api_url")]
    pub api_url: Option<String>,
}

/// Typed, read-only view of the settings object.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Settings {
    pub enabled_balancers: Vec<String>,
    pub auto_select_quality: String,
    pub preferred_voice: String,
    pub balancers: BTreeMap<String, BalancerSettings>,
}

impl Settings {
    /// Build the typed view, skipping fields that have the wrong shape.
    pub fn from_value(value: &Value) -> Self {
        let Some(map) = value.as_object() else {
            return Self::default();
        };

        let enabled_balancers = map
            .get("enabled_balancers")
            .and_then(Value::as_array)
            .map(|names| {
                names
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        let text = |key: &str| {
            map.get(key)
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string()
        };

        let mut balancers = BTreeMap::new();
        for (name, entry) in map {
            if GLOBAL_KEYS.contains(&name.as_str()) || !entry.is_object() {
                continue;
            }
            match serde_json::from_value::<BalancerSettings>(entry.clone()) {
                Ok(parsed) => {
                    balancers.insert(name.clone(), parsed);
                }
                Err(e) => tracing::warn!("Ignoring malformed settings for {}: {}", name, e),
            }
        }

        Self {
            enabled_balancers,
            auto_select_quality: text("auto_select_quality"),
            preferred_voice: text("preferred_voice"),
            balancers,
        }
    }

    /// Settings for `name`, or an all-default record.
    pub fn balancer(&self, name: &str) -> BalancerSettings {
        self.balancers.get(name).cloned().unwrap_or_default()
    }
}

/// Settings state with write-through persistence.
pub struct SettingsStore {
    state: RwLock<Value>,
    store: Arc<dyn KeyValueStore>,
}

impl SettingsStore {
    /// A store holding the defaults. Nothing is read until [`Self::load`].
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            state: RwLock::new(defaults()),
            store,
        }
    }

    /// [`Self::new`] followed by [`Self::load`].
    pub fn open(store: Arc<dyn KeyValueStore>) -> Self {
        let settings = Self::new(store);
        settings.load();
        settings
    }

    /// Merge the persisted state over the current one.
    ///
    /// A missing or unreadable entry leaves the state untouched.
    pub fn load(&self) -> Value {
        match self.store.get(SETTINGS_KEY) {
            Ok(Some(persisted)) if persisted.is_object() => {
                let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
                merge_one_level(&mut state, persisted);
            }
            Ok(Some(_)) => tracing::warn!("Persisted settings are not an object, using defaults"),
            Ok(None) => tracing::debug!("No persisted settings, using defaults"),
            Err(e) => tracing::warn!("Failed to load settings: {}", e),
        }
        self.get()
    }

    /// Deep copy of the current state.
    pub fn get(&self) -> Value {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn snapshot(&self) -> Settings {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        Settings::from_value(&state)
    }

    /// Merge `partial` into the state, persist, and return the new copy.
    pub fn update(&self, partial: Value) -> Value {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        merge_one_level(&mut state, partial);
        self.persist(&state);
        state.clone()
    }

    /// Assign `value` at a dot-separated path, creating objects on the way.
    ///
    /// `set("kinopub.device_id", json!("tv-1"))`. Intermediate values that are
    /// not objects are replaced by empty objects.
    pub fn set(&self, path: &str, value: Value) -> Value {
        let keys: Vec<&str> = path.split('.').collect();
        let Some(leaf) = keys.last() else {
            return self.get();
        };
        if leaf.is_empty() {
            tracing::warn!("Ignoring settings update with empty path");
            return self.get();
        }

        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        let current = std::mem::take(&mut *state);
        *state = assign(current, &keys, value);

        self.persist(&state);
        state.clone()
    }

    fn persist(&self, state: &Value) {
        if let Err(e) = self.store.set(SETTINGS_KEY, state) {
            tracing::warn!("Failed to persist settings: {}", e);
        }
    }
}

/// `node` with `value` stored under `keys`. Non-object nodes on the way
/// become empty objects.
fn assign(node: Value, keys: &[&str], value: Value) -> Value {
    let Some((key, rest)) = keys.split_first() else {
        return value;
    };
    let mut map = match node {
        Value::Object(map) => map,
        _ => Map::new(),
    };
    let child = map.remove(*key).unwrap_or(Value::Null);
    map.insert((*key).to_string(), assign(child, rest, value));
    Value::Object(map)
}
