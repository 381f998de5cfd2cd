// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Vocabulary/resource document model and store ports.
//!
//! `vocab-store` defines the two denormalized document kinds that together
//! encode the vocabulary ⇄ resource relationship ([`Vocabulary`] and
//! [`Resource`]), the one-sided [`Favourite`] bookmark, and the synchronous
//! store ports the relationship engine consumes. [`MemoryStore`] implements
//! every port in-process.
//!
//! # Absence Semantics
//!
//! Lookups return `Ok(None)` for missing documents; absence is **not** an
//! error. Error variants are reserved for conflicts on create, removal of
//! documents that are already gone, backend outages and codec failures.
//!
//! # Determinism
//!
//! Every listing API returns documents in key order. Attachment lists keep
//! insertion order; tag sets are sorted. [`fingerprint`] hashes the canonical
//! CBOR form of a document, so two documents with equal fingerprints are
//! byte-for-byte identical.
#![forbid(unsafe_code)]

mod digest;
mod memory;
mod model;

pub use digest::{fingerprint, DocumentHash};
pub use memory::{MemoryStore, Snapshot};
pub use model::{
    Actor, Favourite, FavouriteFilter, FavouriteId, NewFavourite, Resource, ResourceAttachment,
    ResourceKey, ResourceRef, ResourceType, Role, Tags, UnknownResourceType, Vocabulary,
    VocabularyAttachment, VocabularyKey, VocabularyStatus,
};

/// Errors surfaced by store implementations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// A create targeted a key that is already occupied.
    #[error("[STORE_DUPLICATE] {0} already exists")]
    Duplicate(String),
    /// A removal targeted a document that does not exist.
    #[error("[STORE_MISSING] {0} does not exist")]
    Missing(String),
    /// The backend rejected or could not complete the request.
    #[error("[STORE_UNAVAILABLE] {0}")]
    Unavailable(String),
    /// A document could not be encoded or decoded.
    #[error("[STORE_CODEC] {0}")]
    Codec(String),
}

/// Storage port for [`Vocabulary`] documents, keyed by (name, application).
///
/// Each call is an independent, per-document atomic operation. The port makes
/// no promise about ordering between calls issued by different writers; the
/// relationship engine layers its own arbitration on top.
pub trait VocabularyStore {
    /// Fetch a vocabulary by name within an application.
    fn get_vocabulary(
        &self,
        name: &str,
        application: &str,
    ) -> Result<Option<Vocabulary>, StoreError>;

    /// Create an empty vocabulary owned by `actor`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Duplicate`] when the key is already taken.
    fn create_vocabulary(
        &self,
        actor: &Actor,
        key: &VocabularyKey,
    ) -> Result<Vocabulary, StoreError>;

    /// Persist the full document, replacing any stored copy.
    fn save_vocabulary(&self, vocabulary: &Vocabulary) -> Result<Vocabulary, StoreError>;

    /// List vocabularies of an application in name order, optionally capped.
    fn list_vocabularies(
        &self,
        application: &str,
        limit: Option<usize>,
    ) -> Result<Vec<Vocabulary>, StoreError>;
}

/// Storage port for [`Resource`] documents, keyed by (dataset, type, id).
pub trait ResourceStore {
    /// Fetch a resource by key.
    fn get_resource(&self, key: &ResourceKey) -> Result<Option<Resource>, StoreError>;

    /// Create a resource with no vocabulary attachments.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Duplicate`] when the key is already taken.
    fn create_resource(&self, key: &ResourceKey) -> Result<Resource, StoreError>;

    /// Persist the full document, replacing any stored copy.
    fn save_resource(&self, resource: &Resource) -> Result<Resource, StoreError>;

    /// Remove a resource document.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Missing`] when nothing is stored under `key`.
    fn delete_resource(&self, key: &ResourceKey) -> Result<(), StoreError>;

    /// Batch lookup of resources of one type by id, across datasets.
    fn get_resources(
        &self,
        kind: ResourceType,
        ids: &[String],
    ) -> Result<Vec<Resource>, StoreError>;

    /// Every resource carrying an attachment for the vocabulary under `key`,
    /// in key order.
    fn find_by_vocabulary(&self, key: &VocabularyKey) -> Result<Vec<Resource>, StoreError>;
}

/// Storage port for [`Favourite`] bookmarks.
pub trait FavouriteStore {
    /// Store a new favourite, assigning its id and creation time.
    fn insert_favourite(&self, favourite: NewFavourite) -> Result<Favourite, StoreError>;

    /// Fetch a favourite by id.
    fn get_favourite(&self, id: FavouriteId) -> Result<Option<Favourite>, StoreError>;

    /// Return every favourite matching `filter`, in id order.
    fn find_favourites(&self, filter: &FavouriteFilter) -> Result<Vec<Favourite>, StoreError>;

    /// Remove a favourite, returning it when it existed.
    fn remove_favourite(&self, id: FavouriteId) -> Result<Option<Favourite>, StoreError>;
}
