// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Pure attachment lookups shared by every relationship operation.

use vocab_store::{Resource, ResourceAttachment, ResourceKey, Vocabulary, VocabularyAttachment};

use crate::error::{RelationshipError, Violation, ViolationKind};

/// The resource's record of `vocabulary`, if it has one.
///
/// This is the duplicate/existence check: create rejects on `Some`,
/// delete and update require it.
pub fn check_relationship<'r>(
    resource: &'r Resource,
    vocabulary: &Vocabulary,
) -> Option<&'r VocabularyAttachment> {
    resource.vocabulary_attachment(&vocabulary.key())
}

/// The vocabulary's record of the resource under `key`, if it has one.
pub fn vocabulary_side<'v>(
    vocabulary: &'v Vocabulary,
    key: &ResourceKey,
) -> Option<&'v ResourceAttachment> {
    vocabulary.resource_attachment(key)
}

/// Positions of one relationship's record on each side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Positions {
    /// Index into `Vocabulary::resources`.
    pub vocabulary: usize,
    /// Index into `Resource::vocabularies`.
    pub resource: usize,
}

/// Locate the relationship on both sides independently and cross-check them.
///
/// # Errors
///
/// - [`RelationshipError::RelationshipNotFound`] when neither side records it.
/// - [`RelationshipError::ConsistencyViolation`] when exactly one side does.
pub fn locate(vocabulary: &Vocabulary, resource: &Resource) -> Result<Positions, RelationshipError> {
    let key = resource.key();
    let on_vocabulary = vocabulary.resource_position(&key);
    let on_resource = resource.vocabulary_position(&vocabulary.key());
    let kind = match (on_vocabulary, on_resource) {
        (Some(vocabulary), Some(resource)) => {
            return Ok(Positions {
                vocabulary,
                resource,
            })
        }
        (None, None) => {
            return Err(RelationshipError::RelationshipNotFound {
                vocabulary: vocabulary.id.clone(),
                resource: key,
            })
        }
        (Some(_), None) => ViolationKind::DanglingVocabularySide,
        (None, Some(_)) => ViolationKind::DanglingResourceSide,
    };
    Err(RelationshipError::ConsistencyViolation(Violation {
        vocabulary: vocabulary.id.clone(),
        resource: key,
        kind,
    }))
}
