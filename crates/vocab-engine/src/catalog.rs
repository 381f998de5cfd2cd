// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Read-side queries, explicit vocabulary creation and consistency audits.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;
use tracing::{debug, info, warn};
use vocab_store::{
    Actor, Resource, ResourceKey, ResourceRef, ResourceStore, ResourceType, Tags, Vocabulary,
    VocabularyAttachment, VocabularyStore,
};

use crate::engine::RelationshipEngine;
use crate::error::{RelationshipError, Violation, ViolationKind};

/// Tag query: vocabulary name to the tags requested from it.
///
/// An empty tag set matches every attachment of that vocabulary.
pub type TagQuery = BTreeMap<String, Tags>;

/// One resource matched by [`RelationshipEngine::find_resources`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaggedResource {
    /// Matched resource.
    pub resource: ResourceKey,
    /// Matching vocabularies with the tags they apply, in name order.
    pub vocabularies: Vec<VocabularyAttachment>,
}

/// Split a comma-separated list, trimming entries and dropping empty ones.
pub fn parse_id_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_owned)
        .collect()
}

/// Comma-separated tags as a tag set.
pub fn parse_tag_list(raw: &str) -> Tags {
    parse_id_list(raw).into_iter().collect()
}

impl<V, R> RelationshipEngine<V, R>
where
    V: VocabularyStore,
    R: ResourceStore,
{
    /// Resource view, optionally narrowed to one vocabulary's attachment.
    pub fn resource_vocabularies(
        &self,
        dataset: &str,
        resource: &ResourceRef,
        vocabulary: Option<&str>,
    ) -> Result<Option<Resource>, RelationshipError> {
        let key = resource.in_dataset(dataset);
        let Some(mut found) = self.resources.get_resource(&key)? else {
            return Ok(None);
        };
        if let Some(name) = vocabulary {
            let wanted = self.vocabulary_key(name);
            found.vocabularies.retain(|a| a.refers_to(&wanted));
        }
        Ok(Some(found))
    }

    /// Resources of `kind` tagged by the queried vocabularies.
    ///
    /// A resource matches a vocabulary when their attachment shares at least
    /// one tag with the requested set. Vocabularies that do not exist match
    /// nothing. Results are ordered by resource key.
    ///
    /// # Errors
    ///
    /// [`RelationshipError::EmptyQuery`] when `query` names no vocabulary.
    pub fn find_resources(
        &self,
        kind: ResourceType,
        query: &TagQuery,
    ) -> Result<Vec<TaggedResource>, RelationshipError> {
        if query.is_empty() {
            return Err(RelationshipError::EmptyQuery);
        }
        let mut matched: BTreeMap<ResourceKey, Vec<VocabularyAttachment>> = BTreeMap::new();
        for (name, wanted) in query {
            let Some(vocabulary) = self
                .vocabularies
                .get_vocabulary(name, self.application())?
            else {
                debug!(vocabulary = %name, "queried vocabulary does not exist");
                continue;
            };
            for attachment in vocabulary.resources.iter().filter(|a| a.kind == kind) {
                if !wanted.is_empty() && attachment.tags.is_disjoint(wanted) {
                    continue;
                }
                matched
                    .entry(attachment.key())
                    .or_default()
                    .push(VocabularyAttachment::new(
                        &vocabulary.key(),
                        attachment.tags.clone(),
                    ));
            }
        }
        Ok(matched
            .into_iter()
            .map(|(resource, vocabularies)| TaggedResource {
                resource,
                vocabularies,
            })
            .collect())
    }

    /// Batch lookup of resources of `kind` by id, across datasets.
    pub fn resources_by_ids(
        &self,
        kind: ResourceType,
        ids: &[String],
    ) -> Result<Vec<Resource>, RelationshipError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        Ok(self.resources.get_resources(kind, ids)?)
    }

    /// Vocabulary by name in the configured application.
    pub fn vocabulary(&self, name: &str) -> Result<Option<Vocabulary>, RelationshipError> {
        Ok(self
            .vocabularies
            .get_vocabulary(name, self.application())?)
    }

    /// Vocabularies of the configured application, in name order.
    pub fn list_vocabularies(
        &self,
        limit: Option<usize>,
    ) -> Result<Vec<Vocabulary>, RelationshipError> {
        Ok(self
            .vocabularies
            .list_vocabularies(self.application(), limit)?)
    }

    /// Create an empty vocabulary.
    ///
    /// # Errors
    ///
    /// [`RelationshipError::VocabularyDuplicated`] when the name is taken.
    pub fn create_vocabulary(
        &self,
        actor: &Actor,
        name: &str,
    ) -> Result<Vocabulary, RelationshipError> {
        let key = self.vocabulary_key(name);
        let _guard = self.serialize(Some(&key), &[]);
        if self
            .vocabularies
            .get_vocabulary(&key.name, &key.application)?
            .is_some()
        {
            return Err(RelationshipError::VocabularyDuplicated {
                name: name.to_owned(),
            });
        }
        let created = self.vocabularies.create_vocabulary(actor, &key)?;
        info!(vocabulary = %key, actor = %actor.id, "vocabulary created");
        Ok(created)
    }

    /// Cross-check every relationship of one vocabulary from both sides.
    ///
    /// Reports records present on one side only, tag mismatches, attachments
    /// pointing at missing resources and repeated records.
    ///
    /// # Errors
    ///
    /// [`RelationshipError::VocabularyNotFound`] when the vocabulary does not exist.
    pub fn audit_vocabulary(&self, name: &str) -> Result<Vec<Violation>, RelationshipError> {
        let key = self.vocabulary_key(name);
        let _guard = self.serialize(Some(&key), &[]);
        let vocabulary = self
            .vocabularies
            .get_vocabulary(&key.name, &key.application)?
            .ok_or_else(|| RelationshipError::VocabularyNotFound {
                name: name.to_owned(),
            })?;

        let mut violations = Vec::new();
        let mut seen = BTreeSet::new();
        for attachment in &vocabulary.resources {
            let resource_key = attachment.key();
            let violation = |kind| Violation {
                vocabulary: vocabulary.id.clone(),
                resource: resource_key.clone(),
                kind,
            };
            if !seen.insert(resource_key.clone()) {
                violations.push(violation(ViolationKind::DuplicateRecord));
                continue;
            }
            let Some(resource) = self.resources.get_resource(&resource_key)? else {
                violations.push(violation(ViolationKind::MissingResource));
                continue;
            };
            violations.extend(
                compare(&vocabulary, &resource, &resource_key)
                    .into_iter()
                    .map(violation),
            );
        }
        for resource in self.resources.find_by_vocabulary(&key)? {
            let resource_key = resource.key();
            if !seen.contains(&resource_key) {
                violations.push(Violation {
                    vocabulary: vocabulary.id.clone(),
                    resource: resource_key,
                    kind: ViolationKind::DanglingResourceSide,
                });
            }
        }
        report(&key.to_string(), &violations);
        Ok(violations)
    }

    /// Cross-check every relationship of one resource from both sides.
    ///
    /// Only records of the configured application's vocabularies are checked.
    ///
    /// # Errors
    ///
    /// [`RelationshipError::ResourceNotFound`] when the resource does not exist.
    pub fn audit_resource(
        &self,
        dataset: &str,
        resource: &ResourceRef,
    ) -> Result<Vec<Violation>, RelationshipError> {
        let resource_key = resource.in_dataset(dataset);
        let _guard = self.serialize(None, &[&resource_key]);
        let resource = self
            .resources
            .get_resource(&resource_key)?
            .ok_or_else(|| RelationshipError::ResourceNotFound {
                resource: resource_key.clone(),
            })?;

        let mut violations = Vec::new();
        let mut seen = BTreeSet::new();
        let application = self.application();
        for attachment in resource
            .vocabularies
            .iter()
            .filter(|a| a.application == application)
        {
            let violation = |kind| Violation {
                vocabulary: attachment.id.clone(),
                resource: resource_key.clone(),
                kind,
            };
            if !seen.insert(attachment.id.as_str()) {
                violations.push(violation(ViolationKind::DuplicateRecord));
                continue;
            }
            let Some(vocabulary) = self
                .vocabularies
                .get_vocabulary(&attachment.id, self.application())?
            else {
                violations.push(violation(ViolationKind::MissingVocabulary));
                continue;
            };
            violations.extend(
                compare(&vocabulary, &resource, &resource_key)
                    .into_iter()
                    .map(violation),
            );
        }
        report(&resource_key.to_string(), &violations);
        Ok(violations)
    }
}

/// Disagreement between the two records of one relationship, if any.
fn compare(
    vocabulary: &Vocabulary,
    resource: &Resource,
    resource_key: &ResourceKey,
) -> Option<ViolationKind> {
    let on_vocabulary = vocabulary.resource_attachment(resource_key);
    let on_resource = resource.vocabulary_attachment(&vocabulary.key());
    match (on_vocabulary, on_resource) {
        (Some(v), Some(r)) if v.tags != r.tags => Some(ViolationKind::TagMismatch {
            vocabulary: v.tags.clone(),
            resource: r.tags.clone(),
        }),
        (Some(_), None) => Some(ViolationKind::DanglingVocabularySide),
        (None, Some(_)) => Some(ViolationKind::DanglingResourceSide),
        _ => None,
    }
}

fn report(subject: &str, violations: &[Violation]) {
    if violations.is_empty() {
        debug!(subject, "audit clean");
    } else {
        for violation in violations {
            warn!(subject, %violation, "consistency violation");
        }
    }
}
