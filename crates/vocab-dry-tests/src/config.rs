// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! In-memory config store fake for testing without filesystem I/O.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

use serde::Serialize;
use vocab_app_core::config::{ConfigError, ConfigStore};

/// In-memory implementation of [`ConfigStore`] for testing.
///
/// Clones share the same blobs, so a test can hand one handle to a
/// [`ConfigService`](vocab_app_core::config::ConfigService) and inspect the
/// other.
///
/// # Example
///
/// ```
/// use vocab_dry_tests::InMemoryConfigStore;
/// use vocab_app_core::config::ConfigService;
/// use vocab_app_core::settings::{EngineSettings, ENGINE_SETTINGS_KEY};
///
/// let store = InMemoryConfigStore::new();
/// let service = ConfigService::new(store.clone());
///
/// let settings: EngineSettings = service.load_or_init(ENGINE_SETTINGS_KEY).unwrap();
/// assert_eq!(settings, EngineSettings::default());
/// assert_eq!(store.save_count(), 1);
/// assert!(store.contains_key(ENGINE_SETTINGS_KEY));
/// ```
#[derive(Clone, Default)]
pub struct InMemoryConfigStore {
    inner: Arc<Mutex<Inner>>,
}

#[derive(Default)]
struct Inner {
    blobs: BTreeMap<String, Vec<u8>>,
    load_count: usize,
    save_count: usize,
    fail_on_load: bool,
    fail_on_save: bool,
}

impl InMemoryConfigStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store holding `value` as JSON under `key`.
    ///
    /// # Panics
    ///
    /// Panics if `value` cannot be encoded as JSON.
    #[allow(clippy::expect_used)]
    pub fn with_json<T: Serialize>(key: &str, value: &T) -> Self {
        let store = Self::new();
        let blob = serde_json::to_vec(value).expect("fixture value encodes as JSON");
        store.lock().blobs.insert(key.to_owned(), blob);
        store
    }

    /// Create a store holding raw bytes under `key` (e.g. a malformed blob).
    pub fn with_raw(key: &str, blob: &[u8]) -> Self {
        let store = Self::new();
        store.lock().blobs.insert(key.to_owned(), blob.to_vec());
        store
    }

    /// Make every `load_raw` fail.
    pub fn set_fail_on_load(&self, fail: bool) {
        self.lock().fail_on_load = fail;
    }

    /// Make every `save_raw` fail.
    pub fn set_fail_on_save(&self, fail: bool) {
        self.lock().fail_on_save = fail;
    }

    /// `load_raw` attempts so far, failed ones included.
    pub fn load_count(&self) -> usize {
        self.lock().load_count
    }

    /// `save_raw` attempts so far, failed ones included.
    pub fn save_count(&self) -> usize {
        self.lock().save_count
    }

    /// Whether a blob is stored under `key`.
    pub fn contains_key(&self, key: &str) -> bool {
        self.lock().blobs.contains_key(key)
    }

    /// The blob stored under `key`, decoded as a JSON value.
    pub fn json(&self, key: &str) -> Option<serde_json::Value> {
        let inner = self.lock();
        let blob = inner.blobs.get(key)?;
        serde_json::from_slice(blob).ok()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl ConfigStore for InMemoryConfigStore {
    fn load_raw(&self, key: &str) -> Result<Vec<u8>, ConfigError> {
        let mut inner = self.lock();
        inner.load_count += 1;
        if inner.fail_on_load {
            return Err(ConfigError::Other("simulated load failure".into()));
        }
        inner.blobs.get(key).cloned().ok_or(ConfigError::NotFound)
    }

    fn save_raw(&self, key: &str, data: &[u8]) -> Result<(), ConfigError> {
        let mut inner = self.lock();
        inner.save_count += 1;
        if inner.fail_on_save {
            return Err(ConfigError::Other("simulated save failure".into()));
        }
        inner.blobs.insert(key.to_owned(), data.to_vec());
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use vocab_app_core::config::ConfigService;
    use vocab_app_core::settings::{EngineSettings, ToolPrefs, ENGINE_SETTINGS_KEY, TOOL_PREFS_KEY};

    #[test]
    fn stored_settings_are_not_overwritten_by_defaults() {
        let custom = EngineSettings {
            application: "gfw".into(),
            ..EngineSettings::default()
        };
        let store = InMemoryConfigStore::with_json(ENGINE_SETTINGS_KEY, &custom);
        let service = ConfigService::new(store.clone());
        let loaded: EngineSettings = service.load_or_init(ENGINE_SETTINGS_KEY).unwrap();
        assert_eq!(loaded.application, "gfw");
        assert_eq!(store.save_count(), 0);
    }

    #[test]
    fn malformed_blob_is_reported_with_its_key() {
        let store = InMemoryConfigStore::with_raw(TOOL_PREFS_KEY, b"{not json");
        let service = ConfigService::new(store.clone());
        let err = service.load_or_init::<ToolPrefs>(TOOL_PREFS_KEY).unwrap_err();
        assert!(matches!(err, ConfigError::Malformed { ref key, .. } if key == TOOL_PREFS_KEY));
        assert_eq!(store.save_count(), 0);
    }

    #[test]
    fn failure_switches_surface_as_other() {
        let store = InMemoryConfigStore::new();
        store.set_fail_on_save(true);
        assert!(matches!(store.save_raw("k", b"1"), Err(ConfigError::Other(_))));
        store.set_fail_on_save(false);
        store.save_raw("k", b"1").unwrap();
        store.set_fail_on_load(true);
        assert!(matches!(store.load_raw("k"), Err(ConfigError::Other(_))));
        assert_eq!(store.save_count(), 2);
        assert_eq!(store.load_count(), 1);
    }

    #[test]
    fn saved_blobs_decode_as_json() {
        let store = InMemoryConfigStore::new();
        ConfigService::new(store.clone())
            .save(TOOL_PREFS_KEY, &ToolPrefs::default())
            .unwrap();
        let value = store.json(TOOL_PREFS_KEY).unwrap();
        assert_eq!(value["engine"]["application"], "rw");
    }
}
