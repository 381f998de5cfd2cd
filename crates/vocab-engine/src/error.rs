// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Error taxonomy of the relationship engine.

use std::fmt;

use vocab_store::{ResourceKey, StoreError, Tags};

/// Client-facing class of a failure, for the (external) routing layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The request cannot be honoured as sent.
    BadRequest,
    /// A referenced entity or relationship does not exist.
    NotFound,
    /// The stored documents disagree with each other.
    Conflict,
    /// Storage failure.
    Internal,
}

impl Outcome {
    /// HTTP status conventionally used for this outcome.
    pub const fn status_code(self) -> u16 {
        match self {
            Self::BadRequest => 400,
            Self::NotFound => 404,
            Self::Conflict => 409,
            Self::Internal => 500,
        }
    }
}

/// How the two sides of one relationship disagree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViolationKind {
    /// The vocabulary records the resource; the resource does not record the vocabulary.
    DanglingVocabularySide,
    /// The resource records the vocabulary; the vocabulary does not record the resource.
    DanglingResourceSide,
    /// Both sides record the relationship with different tags.
    TagMismatch {
        /// Tags on the vocabulary side.
        vocabulary: Tags,
        /// Tags on the resource side.
        resource: Tags,
    },
    /// The vocabulary records a resource document that does not exist.
    MissingResource,
    /// The resource records a vocabulary document that does not exist.
    MissingVocabulary,
    /// One side holds more than one record for the same counterpart.
    DuplicateRecord,
}

impl fmt::Display for ViolationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DanglingVocabularySide => f.write_str("recorded by the vocabulary only"),
            Self::DanglingResourceSide => f.write_str("recorded by the resource only"),
            Self::TagMismatch {
                vocabulary,
                resource,
            } => write!(f, "tags differ: vocabulary {vocabulary:?}, resource {resource:?}"),
            Self::MissingResource => f.write_str("resource document is missing"),
            Self::MissingVocabulary => f.write_str("vocabulary document is missing"),
            Self::DuplicateRecord => f.write_str("recorded more than once"),
        }
    }
}

/// One disagreement between a vocabulary and a resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    /// Vocabulary id.
    pub vocabulary: String,
    /// Resource key.
    pub resource: ResourceKey,
    /// What disagrees.
    pub kind: ViolationKind,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "`{}` ⇄ {}: {}", self.vocabulary, self.resource, self.kind)
    }
}

/// Errors returned by relationship and catalog operations.
///
/// Every variant except [`Store`](Self::Store) and [`Diverged`](Self::Diverged)
/// is raised before the operation persists anything.
#[derive(Debug, thiserror::Error)]
pub enum RelationshipError {
    /// Create requested for a relationship that already exists.
    #[error("relationship between vocabulary `{vocabulary}` and {resource} already exists")]
    RelationshipDuplicated {
        /// Vocabulary id.
        vocabulary: String,
        /// Resource key.
        resource: ResourceKey,
    },
    /// The referenced vocabulary does not exist.
    #[error("vocabulary `{name}` not found")]
    VocabularyNotFound {
        /// Vocabulary name.
        name: String,
    },
    /// The referenced resource does not exist.
    #[error("resource {resource} not found")]
    ResourceNotFound {
        /// Resource key.
        resource: ResourceKey,
    },
    /// Both documents exist but are not attached to each other.
    #[error("relationship between vocabulary `{vocabulary}` and {resource} not found")]
    RelationshipNotFound {
        /// Vocabulary id.
        vocabulary: String,
        /// Resource key.
        resource: ResourceKey,
    },
    /// The two sides of the relationship disagree.
    #[error("consistency violation: {0}")]
    ConsistencyViolation(Violation),
    /// Explicit vocabulary creation for a name that is taken.
    #[error("vocabulary `{name}` already exists")]
    VocabularyDuplicated {
        /// Vocabulary name.
        name: String,
    },
    /// A tag query that names no vocabulary.
    #[error("tag query names no vocabulary")]
    EmptyQuery,
    /// Store failure. When raised by the second write of a relationship
    /// operation with compensation enabled, the first write has been undone.
    #[error(transparent)]
    Store(#[from] StoreError),
    /// The second write failed and undoing the first one failed too; the two
    /// documents now disagree.
    #[error(
        "vocabulary `{vocabulary}` and {resource} diverged: {source}; compensation failed: {compensation}"
    )]
    Diverged {
        /// Vocabulary id.
        vocabulary: String,
        /// Resource key.
        resource: ResourceKey,
        /// Failure of the resource-side write.
        source: StoreError,
        /// Failure of the vocabulary-side restore.
        compensation: StoreError,
    },
}

impl RelationshipError {
    /// Client-facing class of this error.
    pub const fn outcome(&self) -> Outcome {
        match self {
            Self::RelationshipDuplicated { .. }
            | Self::VocabularyDuplicated { .. }
            | Self::EmptyQuery => Outcome::BadRequest,
            Self::VocabularyNotFound { .. }
            | Self::ResourceNotFound { .. }
            | Self::RelationshipNotFound { .. } => Outcome::NotFound,
            Self::ConsistencyViolation(_) => Outcome::Conflict,
            Self::Store(_) | Self::Diverged { .. } => Outcome::Internal,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vocab_store::ResourceType;

    fn key() -> ResourceKey {
        ResourceKey::new("ds1", ResourceType::Dataset, "r1")
    }

    #[test]
    fn outcomes_follow_client_contract() {
        let dup = RelationshipError::RelationshipDuplicated {
            vocabulary: "species".into(),
            resource: key(),
        };
        assert_eq!(dup.outcome().status_code(), 400);
        let missing = RelationshipError::ResourceNotFound { resource: key() };
        assert_eq!(missing.outcome().status_code(), 404);
        let violation = RelationshipError::ConsistencyViolation(Violation {
            vocabulary: "species".into(),
            resource: key(),
            kind: ViolationKind::DanglingVocabularySide,
        });
        assert_eq!(violation.outcome().status_code(), 409);
        let store = RelationshipError::from(StoreError::Unavailable("down".into()));
        assert_eq!(store.outcome().status_code(), 500);
    }

    #[test]
    fn violation_message_names_both_documents() {
        let v = Violation {
            vocabulary: "species".into(),
            resource: key(),
            kind: ViolationKind::DanglingResourceSide,
        };
        assert_eq!(v.to_string(), "`species` ⇄ ds1/dataset/r1: recorded by the resource only");
    }
}
