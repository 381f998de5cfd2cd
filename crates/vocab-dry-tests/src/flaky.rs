// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Store wrapper that fails chosen writes on demand.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

use vocab_store::{
    Actor, MemoryStore, Resource, ResourceKey, ResourceStore, ResourceType, StoreError,
    Vocabulary, VocabularyKey, VocabularyStore,
};

/// Write operations a [`FlakyStore`] can be told to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum WriteOp {
    /// `VocabularyStore::create_vocabulary`.
    CreateVocabulary,
    /// `VocabularyStore::save_vocabulary`.
    SaveVocabulary,
    /// `ResourceStore::create_resource`.
    CreateResource,
    /// `ResourceStore::save_resource`.
    SaveResource,
    /// `ResourceStore::delete_resource`.
    DeleteResource,
}

#[derive(Debug, Clone, Copy)]
struct Rule {
    /// Calls to let through before failing.
    skip: usize,
    /// Keep failing after the first failure.
    sticky: bool,
}

#[derive(Default)]
struct Inner {
    rules: BTreeMap<WriteOp, Rule>,
    calls: BTreeMap<WriteOp, usize>,
    failures: BTreeMap<WriteOp, usize>,
}

/// [`MemoryStore`] whose writes fail with [`StoreError::Unavailable`] on demand.
///
/// Reads always pass through. Clones share both the documents and the failure
/// plan.
///
/// # Example
///
/// ```
/// use vocab_dry_tests::{FlakyStore, WriteOp};
/// use vocab_store::{ResourceKey, ResourceStore, ResourceType};
///
/// let store = FlakyStore::new();
/// store.fail_nth(WriteOp::CreateResource, 2);
/// let key = |id: &str| ResourceKey::new("ds1", ResourceType::Widget, id);
/// assert!(store.create_resource(&key("a")).is_ok());
/// assert!(store.create_resource(&key("b")).is_err());
/// assert!(store.create_resource(&key("c")).is_ok());
/// assert_eq!(store.calls(WriteOp::CreateResource), 3);
/// ```
#[derive(Clone, Default)]
pub struct FlakyStore {
    docs: MemoryStore,
    plan: Arc<Mutex<Inner>>,
}

impl FlakyStore {
    /// Empty store with no failures planned.
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap an existing store; the wrapper shares its documents.
    pub fn wrap(docs: MemoryStore) -> Self {
        Self {
            docs,
            plan: Arc::default(),
        }
    }

    /// The wrapped store, for inspection that bypasses the failure plan.
    pub fn docs(&self) -> &MemoryStore {
        &self.docs
    }

    /// Fail only the `n`-th `op` call from now on (1-based).
    pub fn fail_nth(&self, op: WriteOp, n: usize) {
        self.lock().rules.insert(
            op,
            Rule {
                skip: n.saturating_sub(1),
                sticky: false,
            },
        );
    }

    /// Fail every `op` call from now on.
    pub fn fail_always(&self, op: WriteOp) {
        self.lock().rules.insert(
            op,
            Rule {
                skip: 0,
                sticky: true,
            },
        );
    }

    /// Drop every planned failure.
    pub fn heal(&self) {
        self.lock().rules.clear();
    }

    /// Attempted `op` calls, failed ones included.
    pub fn calls(&self, op: WriteOp) -> usize {
        self.lock().calls.get(&op).copied().unwrap_or(0)
    }

    /// `op` calls that were failed on purpose.
    pub fn failures(&self, op: WriteOp) -> usize {
        self.lock().failures.get(&op).copied().unwrap_or(0)
    }

    fn check(&self, op: WriteOp) -> Result<(), StoreError> {
        let mut inner = self.lock();
        *inner.calls.entry(op).or_default() += 1;
        let Some(rule) = inner.rules.get_mut(&op) else {
            return Ok(());
        };
        if rule.skip > 0 {
            rule.skip -= 1;
            return Ok(());
        }
        if !rule.sticky {
            inner.rules.remove(&op);
        }
        *inner.failures.entry(op).or_default() += 1;
        Err(StoreError::Unavailable(format!("injected {op:?} failure")))
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.plan.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl VocabularyStore for FlakyStore {
    fn get_vocabulary(
        &self,
        name: &str,
        application: &str,
    ) -> Result<Option<Vocabulary>, StoreError> {
        self.docs.get_vocabulary(name, application)
    }

    fn create_vocabulary(
        &self,
        actor: &Actor,
        key: &VocabularyKey,
    ) -> Result<Vocabulary, StoreError> {
        self.check(WriteOp::CreateVocabulary)?;
        self.docs.create_vocabulary(actor, key)
    }

    fn save_vocabulary(&self, vocabulary: &Vocabulary) -> Result<Vocabulary, StoreError> {
        self.check(WriteOp::SaveVocabulary)?;
        self.docs.save_vocabulary(vocabulary)
    }

    fn list_vocabularies(
        &self,
        application: &str,
        limit: Option<usize>,
    ) -> Result<Vec<Vocabulary>, StoreError> {
        self.docs.list_vocabularies(application, limit)
    }
}

impl ResourceStore for FlakyStore {
    fn get_resource(&self, key: &ResourceKey) -> Result<Option<Resource>, StoreError> {
        self.docs.get_resource(key)
    }

    fn create_resource(&self, key: &ResourceKey) -> Result<Resource, StoreError> {
        self.check(WriteOp::CreateResource)?;
        self.docs.create_resource(key)
    }

    fn save_resource(&self, resource: &Resource) -> Result<Resource, StoreError> {
        self.check(WriteOp::SaveResource)?;
        self.docs.save_resource(resource)
    }

    fn delete_resource(&self, key: &ResourceKey) -> Result<(), StoreError> {
        self.check(WriteOp::DeleteResource)?;
        self.docs.delete_resource(key)
    }

    fn get_resources(
        &self,
        kind: ResourceType,
        ids: &[String],
    ) -> Result<Vec<Resource>, StoreError> {
        self.docs.get_resources(kind, ids)
    }

    fn find_by_vocabulary(&self, key: &VocabularyKey) -> Result<Vec<Resource>, StoreError> {
        self.docs.find_by_vocabulary(key)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn key(id: &str) -> ResourceKey {
        ResourceKey::new("ds1", ResourceType::Dataset, id)
    }

    #[test]
    fn sticky_failure_holds_until_healed() {
        let store = FlakyStore::new();
        store.fail_always(WriteOp::CreateResource);
        assert!(store.create_resource(&key("a")).is_err());
        assert!(store.create_resource(&key("a")).is_err());
        store.heal();
        assert!(store.create_resource(&key("a")).is_ok());
        assert_eq!(store.failures(WriteOp::CreateResource), 2);
        assert_eq!(store.calls(WriteOp::CreateResource), 3);
    }

    #[test]
    fn failed_writes_do_not_reach_the_documents() {
        let store = FlakyStore::new();
        let resource = store.create_resource(&key("a")).unwrap();
        store.fail_nth(WriteOp::DeleteResource, 1);
        assert!(matches!(
            store.delete_resource(&resource.key()),
            Err(StoreError::Unavailable(_))
        ));
        assert!(store.docs().get_resource(&key("a")).unwrap().is_some());
    }

    #[test]
    fn plans_are_per_operation() {
        let store = FlakyStore::new();
        store.fail_always(WriteOp::SaveVocabulary);
        let resource = store.create_resource(&key("a")).unwrap();
        assert!(store.save_resource(&resource).is_ok());
        assert_eq!(store.failures(WriteOp::SaveResource), 0);
    }
}
