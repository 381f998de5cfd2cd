// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Whole-store check of the two-sided relationship invariant.

use std::collections::BTreeMap;

use vocab_store::{MemoryStore, ResourceKey, Tags, VocabularyKey};

/// Every way in which the stored documents break the mirror invariant.
///
/// For each vocabulary attachment `V -> R (tags)` there must be exactly one
/// resource attachment `R -> V (tags)`, and the other way round; a stored
/// resource must carry at least one attachment. An empty result means the
/// store is consistent. Messages are human-readable and sorted.
pub fn mirror_violations(store: &MemoryStore) -> Vec<String> {
    let snapshot = store.snapshot();
    let mut forward: BTreeMap<(VocabularyKey, ResourceKey), Vec<Tags>> = BTreeMap::new();
    let mut backward: BTreeMap<(VocabularyKey, ResourceKey), Vec<Tags>> = BTreeMap::new();

    for vocabulary in &snapshot.vocabularies {
        for attachment in &vocabulary.resources {
            forward
                .entry((vocabulary.key(), attachment.key()))
                .or_default()
                .push(attachment.tags.clone());
        }
    }
    let mut problems = Vec::new();
    for resource in &snapshot.resources {
        if resource.is_orphan() {
            problems.push(format!("{} is stored without attachments", resource.key()));
        }
        for attachment in &resource.vocabularies {
            backward
                .entry((attachment.key(), resource.key()))
                .or_default()
                .push(attachment.tags.clone());
        }
    }

    for ((vocabulary, resource), tags) in &forward {
        match backward.get(&(vocabulary.clone(), resource.clone())) {
            None => problems.push(format!("`{vocabulary}` -> {resource} has no mirror")),
            Some(mirror) if mirror != tags => problems.push(format!(
                "`{vocabulary}` -> {resource} tags {tags:?} mirrored as {mirror:?}"
            )),
            Some(_) if tags.len() > 1 => {
                problems.push(format!("`{vocabulary}` -> {resource} recorded {} times", tags.len()));
            }
            Some(_) => {}
        }
    }
    for (vocabulary, resource) in backward.keys() {
        if !forward.contains_key(&(vocabulary.clone(), resource.clone())) {
            problems.push(format!("{resource} -> `{vocabulary}` has no mirror"));
        }
    }
    problems.sort();
    problems
}
