// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Small constructors that keep test bodies readable.

use vocab_store::{Actor, ResourceRef, ResourceType, Tags};

/// Tag set from string literals.
pub fn tags(items: &[&str]) -> Tags {
    items.iter().map(|t| (*t).to_owned()).collect()
}

/// Reference to the dataset itself as a resource.
pub fn dataset(id: &str) -> ResourceRef {
    ResourceRef::new(ResourceType::Dataset, id)
}

/// Reference to a layer.
pub fn layer(id: &str) -> ResourceRef {
    ResourceRef::new(ResourceType::Layer, id)
}

/// Reference to a widget.
pub fn widget(id: &str) -> ResourceRef {
    ResourceRef::new(ResourceType::Widget, id)
}

/// Regular user actor.
pub fn user(id: &str) -> Actor {
    Actor::user(id)
}

/// Admin actor.
pub fn admin(id: &str) -> Actor {
    Actor::admin(id)
}
