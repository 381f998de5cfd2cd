// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Vocabulary ⇄ resource relationship consistency engine.
//!
//! A relationship between a vocabulary and a resource is stored twice: the
//! [`Vocabulary`](vocab_store::Vocabulary) lists the resource with its tags,
//! and the [`Resource`](vocab_store::Resource) lists the vocabulary with the
//! same tags. [`RelationshipEngine`] keeps those two records in step:
//!
//! - every precondition is checked from both sides before anything is written;
//! - the vocabulary side is always written first;
//! - a failed resource-side write undoes the vocabulary-side write;
//! - concurrent writers on the same vocabulary or resource are serialized
//!   in a fixed lock order.
//!
//! Read-side queries and consistency audits live on the same engine
//! ([`catalog`]); [`FavouriteService`] handles the one-sided bookmarks.
//!
//! # Example
//!
//! ```
//! use vocab_engine::RelationshipEngine;
//! use vocab_store::{Actor, MemoryStore, ResourceRef, ResourceType, Tags};
//!
//! let store = MemoryStore::new();
//! let engine = RelationshipEngine::new(store.clone(), store);
//! let actor = Actor::user("u1");
//! let widget = ResourceRef::new(ResourceType::Widget, "w1");
//! let tags: Tags = ["forest".to_owned()].into_iter().collect();
//!
//! let resource = engine
//!     .create_relationship(&actor, "biome", "ds1", &widget, tags)
//!     .unwrap();
//! assert_eq!(resource.vocabularies.len(), 1);
//! ```
#![forbid(unsafe_code)]

pub mod catalog;
mod engine;
mod error;
mod favourites;
mod locks;
mod lookup;

pub use catalog::{parse_id_list, parse_tag_list, TagQuery, TaggedResource};
pub use engine::RelationshipEngine;
pub use error::{Outcome, RelationshipError, Violation, ViolationKind};
pub use favourites::{FavouriteError, FavouriteService};
pub use locks::{KeyGuard, KeyedLocks};
pub use lookup::{check_relationship, locate, vocabulary_side, Positions};
