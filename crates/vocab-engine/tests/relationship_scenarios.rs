// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! End-to-end create/update/delete walkthroughs over the in-memory store.

#![allow(missing_docs)]
#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use common::{engine_for, hashes, memory_engine, resource, vocabulary};
use vocab_dry_tests::{dataset, layer, mirror_violations, tags, user, widget};
use vocab_engine::{Outcome, RelationshipError};
use vocab_store::{
    ResourceAttachment, ResourceKey, ResourceRef, ResourceStore, ResourceType,
    VocabularyAttachment, VocabularyKey, VocabularyStore,
};

fn r1() -> ResourceKey {
    ResourceKey::new("ds1", ResourceType::Dataset, "r1")
}

// =============================================================================
// Scenarios A-E: one relationship through its whole life
// =============================================================================

#[test]
fn lifecycle_of_one_relationship() {
    let (store, engine) = memory_engine();
    let actor = user("u1");

    // A: create on empty stores.
    let created = engine
        .create_relationship(&actor, "species", "ds1", &dataset("r1"), tags(&["mammal"]))
        .unwrap();
    assert_eq!(
        created.vocabularies,
        vec![VocabularyAttachment::new(
            &VocabularyKey::new("species", "rw"),
            tags(&["mammal"]),
        )]
    );
    let species = vocabulary(&store, "species").expect("vocabulary created lazily");
    assert_eq!(
        species.resources,
        vec![ResourceAttachment::new(&r1(), tags(&["mammal"]))]
    );
    assert_eq!(species.user_id.as_deref(), Some("u1"));

    // B: repeat is a duplicate and changes nothing.
    let before = hashes(&store, "species", &r1());
    let err = engine
        .create_relationship(&actor, "species", "ds1", &dataset("r1"), tags(&["mammal"]))
        .unwrap_err();
    assert!(matches!(err, RelationshipError::RelationshipDuplicated { .. }));
    assert_eq!(err.outcome(), Outcome::BadRequest);
    assert_eq!(hashes(&store, "species", &r1()), before);
    assert_eq!(store.vocabulary_count(), 1);
    assert_eq!(store.resource_count(), 1);

    // C: retag overwrites both sides.
    let updated = engine
        .update_relationship_tags(
            &actor,
            "species",
            "ds1",
            &dataset("r1"),
            tags(&["mammal", "endangered"]),
        )
        .unwrap();
    assert_eq!(updated.vocabularies[0].tags, tags(&["endangered", "mammal"]));
    let species = vocabulary(&store, "species").unwrap();
    assert_eq!(species.resources[0].tags, tags(&["mammal", "endangered"]));

    // D: deleting the last attachment reaps the resource.
    let last = engine
        .delete_relationship(&actor, "species", "ds1", &dataset("r1"))
        .unwrap();
    assert!(last.vocabularies.is_empty());
    assert!(resource(&store, &r1()).is_none());
    assert!(vocabulary(&store, "species").unwrap().resources.is_empty());

    // E: deleting again finds no resource.
    let err = engine
        .delete_relationship(&actor, "species", "ds1", &dataset("r1"))
        .unwrap_err();
    assert!(matches!(err, RelationshipError::ResourceNotFound { .. }));
    assert_eq!(err.outcome().status_code(), 404);
    assert!(mirror_violations(&store).is_empty());
}

// =============================================================================
// Preconditions of delete/update
// =============================================================================

#[test]
fn delete_checks_vocabulary_then_resource_then_relationship() {
    let (store, engine) = memory_engine();
    let actor = user("u1");

    let err = engine
        .delete_relationship(&actor, "species", "ds1", &dataset("r1"))
        .unwrap_err();
    assert!(matches!(err, RelationshipError::VocabularyNotFound { ref name } if name == "species"));

    engine
        .create_relationship(&actor, "species", "ds1", &dataset("r1"), tags(&["a"]))
        .unwrap();
    engine
        .create_relationship(&actor, "habitat", "ds1", &dataset("r2"), tags(&["b"]))
        .unwrap();

    let before = hashes(&store, "habitat", &r1());
    let err = engine
        .update_relationship_tags(&actor, "habitat", "ds1", &dataset("r1"), tags(&["c"]))
        .unwrap_err();
    assert!(matches!(err, RelationshipError::RelationshipNotFound { .. }));
    assert_eq!(hashes(&store, "habitat", &r1()), before);

    let err = engine
        .delete_relationship(&actor, "species", "ds1", &dataset("r3"))
        .unwrap_err();
    assert!(matches!(err, RelationshipError::ResourceNotFound { .. }));
}

// =============================================================================
// Shared resources
// =============================================================================

#[test]
fn deleting_one_of_several_attachments_keeps_the_resource() {
    let (store, engine) = memory_engine();
    let actor = user("u1");
    let key = ResourceKey::new("ds1", ResourceType::Layer, "l1");

    engine
        .create_relationship(&actor, "species", "ds1", &layer("l1"), tags(&["a"]))
        .unwrap();
    engine
        .create_relationship(&actor, "habitat", "ds1", &layer("l1"), tags(&["b"]))
        .unwrap();
    assert_eq!(resource(&store, &key).unwrap().vocabularies.len(), 2);

    let remaining = engine
        .delete_relationship(&actor, "species", "ds1", &layer("l1"))
        .unwrap();
    assert_eq!(remaining.vocabularies.len(), 1);
    assert_eq!(remaining.vocabularies[0].id, "habitat");
    assert_eq!(resource(&store, &key).unwrap(), remaining);
    assert!(mirror_violations(&store).is_empty());
}

#[test]
fn resources_are_scoped_by_dataset_and_kind() {
    let (store, engine) = memory_engine();
    let actor = user("u1");

    engine
        .create_relationship(&actor, "species", "ds1", &widget("x"), tags(&["a"]))
        .unwrap();
    engine
        .create_relationship(&actor, "species", "ds2", &widget("x"), tags(&["a"]))
        .unwrap();
    engine
        .create_relationship(&actor, "species", "ds1", &layer("x"), tags(&["a"]))
        .unwrap();

    assert_eq!(store.resource_count(), 3);
    assert_eq!(vocabulary(&store, "species").unwrap().resources.len(), 3);
    assert!(mirror_violations(&store).is_empty());
}

#[test]
fn route_parameters_resolve_to_the_most_specific_resource() {
    let (store, engine) = memory_engine();
    let actor = user("u1");

    let by_layer = ResourceRef::resolve("ds1", Some("l1"), Some("w1"));
    let by_widget = ResourceRef::resolve("ds1", None, Some("w1"));
    let by_dataset = ResourceRef::resolve("ds1", None, None);
    for target in [&by_layer, &by_widget, &by_dataset] {
        engine
            .create_relationship(&actor, "species", "ds1", target, tags(&["a"]))
            .unwrap();
    }

    let kinds: Vec<_> = store.snapshot().resources.iter().map(|r| r.kind).collect();
    assert_eq!(
        kinds,
        [ResourceType::Dataset, ResourceType::Layer, ResourceType::Widget]
    );
    assert!(resource(&store, &ResourceKey::new("ds1", ResourceType::Dataset, "ds1")).is_some());
}

#[test]
fn empty_tag_sets_are_valid_relationships() {
    let (store, engine) = memory_engine();
    let actor = user("u1");

    engine
        .create_relationship(&actor, "species", "ds1", &dataset("r1"), tags(&[]))
        .unwrap();
    engine
        .update_relationship_tags(&actor, "species", "ds1", &dataset("r1"), tags(&[]))
        .unwrap();
    assert!(vocabulary(&store, "species").unwrap().resources[0].tags.is_empty());
    assert!(mirror_violations(&store).is_empty());
}

#[test]
fn every_write_refreshes_the_vocabulary_timestamp() {
    let (store, engine) = memory_engine();
    let actor = user("u1");

    engine
        .create_relationship(&actor, "species", "ds1", &dataset("r1"), tags(&["a"]))
        .unwrap();
    let first = vocabulary(&store, "species").unwrap().updated_at;
    engine
        .update_relationship_tags(&actor, "species", "ds1", &dataset("r1"), tags(&["b"]))
        .unwrap();
    let second = vocabulary(&store, "species").unwrap();
    assert!(second.updated_at >= first);
    assert!(second.updated_at >= second.created_at);
}

// =============================================================================
// Applications sharing one store
// =============================================================================

#[test]
fn same_named_vocabularies_in_other_applications_do_not_collide() {
    let (store, rw) = memory_engine();
    let gfw = engine_for(&store, "gfw");
    assert_eq!(gfw.settings().application, "gfw");
    let actor = user("u1");

    rw.create_relationship(&actor, "species", "ds1", &dataset("r1"), tags(&["mammal"]))
        .unwrap();
    let shared = gfw
        .create_relationship(&actor, "species", "ds1", &dataset("r1"), tags(&["bird"]))
        .unwrap();
    let owners: Vec<_> = shared
        .vocabularies
        .iter()
        .map(|a| a.application.as_str())
        .collect();
    assert_eq!(owners, ["rw", "gfw"]);
    assert!(mirror_violations(&store).is_empty());

    let err = gfw
        .create_relationship(&actor, "species", "ds1", &dataset("r1"), tags(&[]))
        .unwrap_err();
    assert!(matches!(err, RelationshipError::RelationshipDuplicated { .. }));

    let remaining = gfw
        .delete_relationship(&actor, "species", "ds1", &dataset("r1"))
        .unwrap();
    assert_eq!(
        remaining.vocabularies,
        vec![VocabularyAttachment::new(
            &VocabularyKey::new("species", "rw"),
            tags(&["mammal"]),
        )]
    );
    let gfw_species = gfw
        .vocabulary_store()
        .get_vocabulary("species", "gfw")
        .unwrap()
        .unwrap();
    assert!(gfw_species.resources.is_empty());
    assert!(gfw.resource_store().get_resource(&r1()).unwrap().is_some());

    assert!(rw.audit_vocabulary("species").unwrap().is_empty());
    assert!(rw.audit_resource("ds1", &dataset("r1")).unwrap().is_empty());
    assert!(mirror_violations(&store).is_empty());
}
