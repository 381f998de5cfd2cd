// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! In-memory document store.
//!
//! [`MemoryStore`] implements every store port over shared in-process maps.
//! It backs the command-line tool (via [`Snapshot`] import/export) and the
//! test suites.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::{
    Actor, Favourite, FavouriteFilter, FavouriteId, FavouriteStore, NewFavourite, Resource,
    ResourceKey, ResourceStore, ResourceType, StoreError, Vocabulary, VocabularyKey,
    VocabularyStore,
};

/// In-memory store for vocabularies, resources and favourites.
///
/// Cloning yields another handle onto the same maps, so one store can be
/// shared by an engine and by the test that inspects it. Each port call holds
/// the internal mutex for its whole duration, which gives the per-document
/// atomic read-modify-write the engine relies on; nothing spans two calls.
///
/// # Invariants
///
/// - Listings are returned in key order.
/// - Favourite ids are assigned monotonically starting at 1 and never reused.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<MemoryInner>>,
}

#[derive(Default)]
struct MemoryInner {
    vocabularies: BTreeMap<VocabularyKey, Vocabulary>,
    resources: BTreeMap<ResourceKey, Resource>,
    favourites: BTreeMap<FavouriteId, Favourite>,
    next_favourite: FavouriteId,
}

/// Serializable image of a [`MemoryStore`].
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Snapshot {
    /// All vocabulary documents.
    #[serde(default)]
    pub vocabularies: Vec<Vocabulary>,
    /// All resource documents.
    #[serde(default)]
    pub resources: Vec<Resource>,
    /// All favourites.
    #[serde(default)]
    pub favourites: Vec<Favourite>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store holding the documents of `snapshot`.
    ///
    /// Later documents win when the snapshot repeats a key.
    pub fn from_snapshot(snapshot: Snapshot) -> Self {
        let next_favourite = snapshot
            .favourites
            .iter()
            .map(|f| f.id)
            .max()
            .unwrap_or(0);
        let inner = MemoryInner {
            vocabularies: snapshot
                .vocabularies
                .into_iter()
                .map(|v| (v.key(), v))
                .collect(),
            resources: snapshot
                .resources
                .into_iter()
                .map(|r| (r.key(), r))
                .collect(),
            favourites: snapshot.favourites.into_iter().map(|f| (f.id, f)).collect(),
            next_favourite,
        };
        Self {
            inner: Arc::new(Mutex::new(inner)),
        }
    }

    /// Export every document, in key order.
    pub fn snapshot(&self) -> Snapshot {
        let inner = self.lock();
        Snapshot {
            vocabularies: inner.vocabularies.values().cloned().collect(),
            resources: inner.resources.values().cloned().collect(),
            favourites: inner.favourites.values().cloned().collect(),
        }
    }

    /// Number of stored vocabularies, across applications.
    pub fn vocabulary_count(&self) -> usize {
        self.lock().vocabularies.len()
    }

    /// Number of stored resources.
    pub fn resource_count(&self) -> usize {
        self.lock().resources.len()
    }

    /// Number of stored favourites.
    pub fn favourite_count(&self) -> usize {
        self.lock().favourites.len()
    }

    fn lock(&self) -> MutexGuard<'_, MemoryInner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl VocabularyStore for MemoryStore {
    fn get_vocabulary(
        &self,
        name: &str,
        application: &str,
    ) -> Result<Option<Vocabulary>, StoreError> {
        let key = VocabularyKey::new(name, application);
        Ok(self.lock().vocabularies.get(&key).cloned())
    }

    fn create_vocabulary(
        &self,
        actor: &Actor,
        key: &VocabularyKey,
    ) -> Result<Vocabulary, StoreError> {
        let mut inner = self.lock();
        if inner.vocabularies.contains_key(key) {
            return Err(StoreError::Duplicate(format!("vocabulary {key}")));
        }
        let vocabulary = Vocabulary::new(key, Some(actor.id.clone()), Utc::now());
        inner.vocabularies.insert(key.clone(), vocabulary.clone());
        Ok(vocabulary)
    }

    fn save_vocabulary(&self, vocabulary: &Vocabulary) -> Result<Vocabulary, StoreError> {
        self.lock()
            .vocabularies
            .insert(vocabulary.key(), vocabulary.clone());
        Ok(vocabulary.clone())
    }

    fn list_vocabularies(
        &self,
        application: &str,
        limit: Option<usize>,
    ) -> Result<Vec<Vocabulary>, StoreError> {
        let inner = self.lock();
        Ok(inner
            .vocabularies
            .values()
            .filter(|v| v.application == application)
            .take(limit.unwrap_or(usize::MAX))
            .cloned()
            .collect())
    }
}

impl ResourceStore for MemoryStore {
    fn get_resource(&self, key: &ResourceKey) -> Result<Option<Resource>, StoreError> {
        Ok(self.lock().resources.get(key).cloned())
    }

    fn create_resource(&self, key: &ResourceKey) -> Result<Resource, StoreError> {
        let mut inner = self.lock();
        if inner.resources.contains_key(key) {
            return Err(StoreError::Duplicate(format!("resource {key}")));
        }
        let resource = Resource::new(key);
        inner.resources.insert(key.clone(), resource.clone());
        Ok(resource)
    }

    fn save_resource(&self, resource: &Resource) -> Result<Resource, StoreError> {
        self.lock()
            .resources
            .insert(resource.key(), resource.clone());
        Ok(resource.clone())
    }

    fn delete_resource(&self, key: &ResourceKey) -> Result<(), StoreError> {
        self.lock()
            .resources
            .remove(key)
            .map(|_| ())
            .ok_or_else(|| StoreError::Missing(format!("resource {key}")))
    }

    fn get_resources(
        &self,
        kind: ResourceType,
        ids: &[String],
    ) -> Result<Vec<Resource>, StoreError> {
        let inner = self.lock();
        Ok(inner
            .resources
            .values()
            .filter(|r| r.kind == kind && ids.contains(&r.id))
            .cloned()
            .collect())
    }

    fn find_by_vocabulary(&self, key: &VocabularyKey) -> Result<Vec<Resource>, StoreError> {
        let inner = self.lock();
        Ok(inner
            .resources
            .values()
            .filter(|r| r.vocabulary_position(key).is_some())
            .cloned()
            .collect())
    }
}

impl FavouriteStore for MemoryStore {
    fn insert_favourite(&self, favourite: NewFavourite) -> Result<Favourite, StoreError> {
        let mut inner = self.lock();
        inner.next_favourite += 1;
        let stored = Favourite {
            id: inner.next_favourite,
            user_id: favourite.user_id,
            application: favourite.application,
            resource_type: favourite.resource_type,
            resource_id: favourite.resource_id,
            created_at: Utc::now(),
        };
        inner.favourites.insert(stored.id, stored.clone());
        Ok(stored)
    }

    fn get_favourite(&self, id: FavouriteId) -> Result<Option<Favourite>, StoreError> {
        Ok(self.lock().favourites.get(&id).cloned())
    }

    fn find_favourites(&self, filter: &FavouriteFilter) -> Result<Vec<Favourite>, StoreError> {
        let inner = self.lock();
        Ok(inner
            .favourites
            .values()
            .filter(|f| filter.matches(f))
            .cloned()
            .collect())
    }

    fn remove_favourite(&self, id: FavouriteId) -> Result<Option<Favourite>, StoreError> {
        Ok(self.lock().favourites.remove(&id))
    }
}
