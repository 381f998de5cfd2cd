// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Relationship create/delete/update protocol.
//!
//! Each operation touches two documents that the stores persist
//! independently. The protocol is:
//!
//! 1. Acquire the vocabulary key, then the resource key (when writer
//!    serialization is on). Every mutating path uses this order.
//! 2. Read both documents and cross-check the relationship from both sides.
//!    Every rejection happens here, before anything is written.
//! 3. Write the vocabulary side.
//! 4. Write the resource side (or reap the resource when its last
//!    attachment went away).
//!
//! If step 4 fails, the vocabulary document is restored to its pre-step-3
//! state (when compensation is on). Only a failure of that restore leaves the
//! two sides disagreeing, and it is reported as
//! [`RelationshipError::Diverged`].

use chrono::Utc;
use tracing::{debug, info, warn};
use vocab_app_core::settings::EngineSettings;
use vocab_store::{
    Actor, Resource, ResourceAttachment, ResourceKey, ResourceRef, ResourceStore, StoreError,
    Tags, Vocabulary, VocabularyAttachment, VocabularyKey, VocabularyStore,
};

use crate::error::{RelationshipError, Violation, ViolationKind};
use crate::locks::{KeyGuard, KeyedLocks};
use crate::lookup::{check_relationship, locate, vocabulary_side};

/// Coordinates relationship writes across a vocabulary store and a resource store.
///
/// The engine is `Sync` whenever its stores are; share it by reference across
/// worker threads.
pub struct RelationshipEngine<V, R> {
    pub(crate) vocabularies: V,
    pub(crate) resources: R,
    settings: EngineSettings,
    vocabulary_locks: KeyedLocks<VocabularyKey>,
    resource_locks: KeyedLocks<ResourceKey>,
}

/// Locks held for the duration of one operation.
pub(crate) struct WriteGuard<'a> {
    _vocabulary: Option<KeyGuard<'a, VocabularyKey>>,
    _resources: Vec<KeyGuard<'a, ResourceKey>>,
}

impl<V, R> RelationshipEngine<V, R> {
    /// Engine with default settings.
    pub fn new(vocabularies: V, resources: R) -> Self {
        Self::with_settings(vocabularies, resources, EngineSettings::default())
    }

    /// Engine with explicit settings.
    pub fn with_settings(vocabularies: V, resources: R, settings: EngineSettings) -> Self {
        Self {
            vocabularies,
            resources,
            settings,
            vocabulary_locks: KeyedLocks::new(),
            resource_locks: KeyedLocks::new(),
        }
    }

    /// Active settings.
    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    /// Application every vocabulary is scoped to.
    pub fn application(&self) -> &str {
        &self.settings.application
    }

    /// Vocabulary store handle.
    pub fn vocabulary_store(&self) -> &V {
        &self.vocabularies
    }

    /// Resource store handle.
    pub fn resource_store(&self) -> &R {
        &self.resources
    }

    pub(crate) fn vocabulary_key(&self, name: &str) -> VocabularyKey {
        VocabularyKey::new(name, self.settings.application.clone())
    }

    /// Acquire the vocabulary key, then the resource keys in ascending order.
    pub(crate) fn serialize<'a>(
        &'a self,
        vocabulary: Option<&VocabularyKey>,
        resources: &[&ResourceKey],
    ) -> WriteGuard<'a> {
        if !self.settings.serialize_writers {
            return WriteGuard {
                _vocabulary: None,
                _resources: Vec::new(),
            };
        }
        let vocabulary = vocabulary.map(|key| self.vocabulary_locks.lock(key.clone()));
        let mut ordered = resources.to_vec();
        ordered.sort();
        ordered.dedup();
        let resources = ordered
            .into_iter()
            .map(|key| self.resource_locks.lock(key.clone()))
            .collect();
        WriteGuard {
            _vocabulary: vocabulary,
            _resources: resources,
        }
    }
}

impl<V, R> RelationshipEngine<V, R>
where
    V: VocabularyStore,
    R: ResourceStore,
{
    /// Tag a resource with a vocabulary.
    ///
    /// Missing vocabulary and resource documents are created first
    /// (get-or-create). Returns the saved resource.
    ///
    /// # Errors
    ///
    /// - [`RelationshipError::RelationshipDuplicated`] when the resource already
    ///   records the vocabulary; nothing is written.
    /// - [`RelationshipError::ConsistencyViolation`] when only the vocabulary
    ///   records the resource; nothing is written and a resource document
    ///   created by this call is removed again.
    /// - [`RelationshipError::Store`] / [`RelationshipError::Diverged`] on
    ///   store failure.
    pub fn create_relationship(
        &self,
        actor: &Actor,
        vocabulary: &str,
        dataset: &str,
        resource: &ResourceRef,
        tags: Tags,
    ) -> Result<Resource, RelationshipError> {
        let vocabulary_key = self.vocabulary_key(vocabulary);
        let resource_key = resource.in_dataset(dataset);
        let _guard = self.serialize(Some(&vocabulary_key), &[&resource_key]);

        debug!(vocabulary = %vocabulary_key, resource = %resource_key, "checking entities");
        let mut vocabulary = match self
            .vocabularies
            .get_vocabulary(&vocabulary_key.name, &vocabulary_key.application)?
        {
            Some(found) => found,
            None => {
                debug!(vocabulary = %vocabulary_key, "vocabulary does not exist, creating it");
                self.vocabularies.create_vocabulary(actor, &vocabulary_key)?
            }
        };
        let (mut resource, fresh) = match self.resources.get_resource(&resource_key)? {
            Some(found) => (found, false),
            None => {
                debug!(resource = %resource_key, "resource does not exist, creating it");
                (self.resources.create_resource(&resource_key)?, true)
            }
        };

        if check_relationship(&resource, &vocabulary).is_some() {
            return Err(RelationshipError::RelationshipDuplicated {
                vocabulary: vocabulary.id,
                resource: resource_key,
            });
        }
        if vocabulary_side(&vocabulary, &resource_key).is_some() {
            warn!(vocabulary = %vocabulary.id, resource = %resource_key, "dangling vocabulary-side record");
            if fresh {
                self.discard_fresh(&resource_key);
            }
            return Err(RelationshipError::ConsistencyViolation(Violation {
                vocabulary: vocabulary.id,
                resource: resource_key,
                kind: ViolationKind::DanglingVocabularySide,
            }));
        }

        let before = vocabulary.clone();
        vocabulary
            .resources
            .push(ResourceAttachment::new(&resource_key, tags.clone()));
        vocabulary.touch(Utc::now());
        debug!(vocabulary = %vocabulary.id, resource = %resource_key, "relationship in vocabulary");
        if let Err(err) = self.vocabularies.save_vocabulary(&vocabulary) {
            if fresh {
                self.discard_fresh(&resource_key);
            }
            return Err(err.into());
        }

        resource
            .vocabularies
            .push(VocabularyAttachment::new(&vocabulary_key, tags));
        debug!(vocabulary = %vocabulary.id, resource = %resource_key, "relationship in resource");
        match self.resources.save_resource(&resource) {
            Ok(saved) => {
                info!(vocabulary = %vocabulary.id, resource = %resource_key, actor = %actor.id, "relationship created");
                Ok(saved)
            }
            Err(err) => Err(self.compensate(&before, &resource_key, fresh, err)),
        }
    }

    /// Remove the relationship between a vocabulary and a resource.
    ///
    /// When the resource has no attachment left it is deleted (orphan reap).
    /// Returns the last known state of the resource.
    ///
    /// # Errors
    ///
    /// - [`RelationshipError::VocabularyNotFound`],
    ///   [`RelationshipError::ResourceNotFound`],
    ///   [`RelationshipError::RelationshipNotFound`], checked in that order.
    /// - [`RelationshipError::ConsistencyViolation`] when only one side records
    ///   the relationship.
    /// - [`RelationshipError::Store`] / [`RelationshipError::Diverged`] on
    ///   store failure.
    pub fn delete_relationship(
        &self,
        actor: &Actor,
        vocabulary: &str,
        dataset: &str,
        resource: &ResourceRef,
    ) -> Result<Resource, RelationshipError> {
        let vocabulary_key = self.vocabulary_key(vocabulary);
        let resource_key = resource.in_dataset(dataset);
        let _guard = self.serialize(Some(&vocabulary_key), &[&resource_key]);

        let (mut vocabulary, mut resource) = self.load_pair(&vocabulary_key, &resource_key)?;
        let positions = locate(&vocabulary, &resource)?;

        let before = vocabulary.clone();
        vocabulary.resources.remove(positions.vocabulary);
        vocabulary.touch(Utc::now());
        debug!(vocabulary = %vocabulary.id, resource = %resource_key, "deleting from vocabulary");
        self.vocabularies.save_vocabulary(&vocabulary)?;

        resource.vocabularies.remove(positions.resource);
        debug!(vocabulary = %vocabulary.id, resource = %resource_key, "deleting from resource");
        let written = if resource.is_orphan() {
            debug!(resource = %resource_key, "deleting the resource, it has no vocabulary left");
            self.resources.delete_resource(&resource_key)
        } else {
            self.resources.save_resource(&resource).map(|_| ())
        };
        match written {
            Ok(()) => {
                info!(vocabulary = %vocabulary.id, resource = %resource_key, actor = %actor.id, reaped = resource.is_orphan(), "relationship deleted");
                Ok(resource)
            }
            Err(err) => Err(self.compensate(&before, &resource_key, false, err)),
        }
    }

    /// Replace the tags of an existing relationship on both sides.
    ///
    /// # Errors
    ///
    /// Same as [`delete_relationship`](Self::delete_relationship).
    pub fn update_relationship_tags(
        &self,
        actor: &Actor,
        vocabulary: &str,
        dataset: &str,
        resource: &ResourceRef,
        tags: Tags,
    ) -> Result<Resource, RelationshipError> {
        let vocabulary_key = self.vocabulary_key(vocabulary);
        let resource_key = resource.in_dataset(dataset);
        let _guard = self.serialize(Some(&vocabulary_key), &[&resource_key]);

        let (mut vocabulary, mut resource) = self.load_pair(&vocabulary_key, &resource_key)?;
        let positions = locate(&vocabulary, &resource)?;

        let on_vocabulary = &vocabulary.resources[positions.vocabulary].tags;
        let on_resource = &resource.vocabularies[positions.resource].tags;
        if on_vocabulary != on_resource {
            warn!(vocabulary = %vocabulary.id, resource = %resource_key, "tag sets disagreed before update, overwriting both");
        }

        let before = vocabulary.clone();
        vocabulary.resources[positions.vocabulary].tags = tags.clone();
        vocabulary.touch(Utc::now());
        debug!(vocabulary = %vocabulary.id, resource = %resource_key, "tags to vocabulary");
        self.vocabularies.save_vocabulary(&vocabulary)?;

        resource.vocabularies[positions.resource].tags = tags;
        debug!(vocabulary = %vocabulary.id, resource = %resource_key, "tags to resource");
        match self.resources.save_resource(&resource) {
            Ok(saved) => {
                info!(vocabulary = %vocabulary.id, resource = %resource_key, actor = %actor.id, "relationship tags updated");
                Ok(saved)
            }
            Err(err) => Err(self.compensate(&before, &resource_key, false, err)),
        }
    }

    /// Load both documents of a relationship, failing on absence.
    fn load_pair(
        &self,
        vocabulary_key: &VocabularyKey,
        resource_key: &ResourceKey,
    ) -> Result<(Vocabulary, Resource), RelationshipError> {
        debug!(vocabulary = %vocabulary_key, resource = %resource_key, "checking entities");
        let vocabulary = self
            .vocabularies
            .get_vocabulary(&vocabulary_key.name, &vocabulary_key.application)?
            .ok_or_else(|| RelationshipError::VocabularyNotFound {
                name: vocabulary_key.name.clone(),
            })?;
        let resource = self.resources.get_resource(resource_key)?.ok_or_else(|| {
            RelationshipError::ResourceNotFound {
                resource: resource_key.clone(),
            }
        })?;
        Ok((vocabulary, resource))
    }

    /// Undo the vocabulary-side write after the resource-side write failed.
    fn compensate(
        &self,
        before: &Vocabulary,
        resource: &ResourceKey,
        fresh: bool,
        source: StoreError,
    ) -> RelationshipError {
        warn!(vocabulary = %before.id, resource = %resource, error = %source, "resource-side write failed after vocabulary-side write");
        if !self.settings.compensate_partial_writes {
            return RelationshipError::Store(source);
        }
        match self.vocabularies.save_vocabulary(before) {
            Ok(_) => {
                info!(vocabulary = %before.id, resource = %resource, "vocabulary side restored");
                if fresh {
                    self.discard_fresh(resource);
                }
                RelationshipError::Store(source)
            }
            Err(compensation) => {
                warn!(vocabulary = %before.id, resource = %resource, error = %compensation, "vocabulary restore failed, documents diverged");
                RelationshipError::Diverged {
                    vocabulary: before.id.clone(),
                    resource: resource.clone(),
                    source,
                    compensation,
                }
            }
        }
    }

    /// Remove an empty resource this operation created before it failed.
    fn discard_fresh(&self, resource: &ResourceKey) {
        if let Err(err) = self.resources.delete_resource(resource) {
            warn!(resource = %resource, error = %err, "could not remove resource created by a failed operation");
        }
    }
}
