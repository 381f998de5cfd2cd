// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
#![allow(dead_code)]

use vocab_app_core::settings::EngineSettings;
use vocab_dry_tests::FlakyStore;
use vocab_engine::RelationshipEngine;
use vocab_store::{
    fingerprint, DocumentHash, MemoryStore, Resource, ResourceKey, ResourceStore, Vocabulary,
    VocabularyStore,
};

/// Application used by every engine built here.
pub const APP: &str = "rw";

pub type MemoryEngine = RelationshipEngine<MemoryStore, MemoryStore>;
pub type FlakyEngine = RelationshipEngine<FlakyStore, FlakyStore>;

/// Engine over one shared in-memory store, plus a handle for inspection.
pub fn memory_engine() -> (MemoryStore, MemoryEngine) {
    let store = MemoryStore::new();
    let engine = RelationshipEngine::new(store.clone(), store.clone());
    (store, engine)
}

/// Engine scoped to `application` over an existing store.
pub fn engine_for(store: &MemoryStore, application: &str) -> MemoryEngine {
    RelationshipEngine::with_settings(
        store.clone(),
        store.clone(),
        EngineSettings {
            application: application.into(),
            ..EngineSettings::default()
        },
    )
}

/// Engine over one shared flaky store with the given settings.
pub fn flaky_engine(settings: EngineSettings) -> (FlakyStore, FlakyEngine) {
    let store = FlakyStore::new();
    let engine = RelationshipEngine::with_settings(store.clone(), store.clone(), settings);
    (store, engine)
}

pub fn vocabulary<S: VocabularyStore>(store: &S, name: &str) -> Option<Vocabulary> {
    store.get_vocabulary(name, APP).unwrap()
}

pub fn resource<S: ResourceStore>(store: &S, key: &ResourceKey) -> Option<Resource> {
    store.get_resource(key).unwrap()
}

/// Fingerprints of one vocabulary and one resource document (`None` when absent).
pub fn hashes<S: VocabularyStore + ResourceStore>(
    store: &S,
    name: &str,
    key: &ResourceKey,
) -> (Option<DocumentHash>, Option<DocumentHash>) {
    (
        vocabulary(store, name).map(|v| fingerprint(&v).unwrap()),
        resource(store, key).map(|r| fingerprint(&r).unwrap()),
    )
}
