// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Document model: vocabularies, resources, their attachment records, and
//! favourites.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Tag set carried by an attachment record (sorted, duplicate-free).
pub type Tags = BTreeSet<String>;

/// Kind of platform entity a [`Resource`] represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceType {
    /// A dataset (also the scope other resources live under).
    Dataset,
    /// A map layer belonging to a dataset.
    Layer,
    /// A widget belonging to a dataset.
    Widget,
}

impl ResourceType {
    /// Every resource type, in canonical order.
    pub const ALL: [Self; 3] = [Self::Dataset, Self::Layer, Self::Widget];

    /// Lowercase wire name.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Dataset => "dataset",
            Self::Layer => "layer",
            Self::Widget => "widget",
        }
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when parsing a string that names no [`ResourceType`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown resource type: {0:?}")]
pub struct UnknownResourceType(pub String);

impl FromStr for ResourceType {
    type Err = UnknownResourceType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s.trim())
            .ok_or_else(|| UnknownResourceType(s.to_owned()))
    }
}

/// Caller-side reference to a resource, before the dataset scope is applied.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceRef {
    /// Resource kind.
    pub kind: ResourceType,
    /// Resource id within its kind.
    pub id: String,
}

impl ResourceRef {
    /// Build a reference from parts.
    pub fn new(kind: ResourceType, id: impl Into<String>) -> Self {
        Self {
            kind,
            id: id.into(),
        }
    }

    /// Resolve the addressed resource from route-style parameters.
    ///
    /// A layer takes precedence over a widget; with neither, the dataset
    /// itself is the tagged resource.
    pub fn resolve(dataset: &str, layer: Option<&str>, widget: Option<&str>) -> Self {
        match (layer, widget) {
            (Some(layer), _) => Self::new(ResourceType::Layer, layer),
            (None, Some(widget)) => Self::new(ResourceType::Widget, widget),
            (None, None) => Self::new(ResourceType::Dataset, dataset),
        }
    }

    /// Scope this reference to a dataset, producing the document key.
    pub fn in_dataset(&self, dataset: impl Into<String>) -> ResourceKey {
        ResourceKey {
            dataset: dataset.into(),
            kind: self.kind,
            id: self.id.clone(),
        }
    }
}

/// Identity of a [`Resource`] document.
///
/// Ordering is (dataset, kind, id); stores list resources in this order and
/// the engine acquires resource locks in this order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ResourceKey {
    /// Dataset scope.
    pub dataset: String,
    /// Resource kind.
    #[serde(rename = "type")]
    pub kind: ResourceType,
    /// Resource id.
    pub id: String,
}

impl ResourceKey {
    /// Build a key from parts.
    pub fn new(dataset: impl Into<String>, kind: ResourceType, id: impl Into<String>) -> Self {
        Self {
            dataset: dataset.into(),
            kind,
            id: id.into(),
        }
    }
}

impl fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.dataset, self.kind, self.id)
    }
}

/// Identity of a [`Vocabulary`] document.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct VocabularyKey {
    /// Vocabulary name (doubles as its id).
    pub name: String,
    /// Owning application (tenant namespace).
    pub application: String,
}

impl VocabularyKey {
    /// Build a key from parts.
    pub fn new(name: impl Into<String>, application: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            application: application.into(),
        }
    }
}

impl fmt::Display for VocabularyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.application, self.name)
    }
}

/// A vocabulary's copy of one relationship: "this resource carries me".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceAttachment {
    /// Resource id.
    pub id: String,
    /// Dataset scope of the resource.
    pub dataset: String,
    /// Resource kind.
    #[serde(rename = "type")]
    pub kind: ResourceType,
    /// Tags applied through this relationship.
    pub tags: Tags,
}

impl ResourceAttachment {
    /// Record pointing at `key` with `tags`.
    pub fn new(key: &ResourceKey, tags: Tags) -> Self {
        Self {
            id: key.id.clone(),
            dataset: key.dataset.clone(),
            kind: key.kind,
            tags,
        }
    }

    /// Key of the resource this record points at.
    pub fn key(&self) -> ResourceKey {
        ResourceKey::new(self.dataset.clone(), self.kind, self.id.clone())
    }

    /// Whether this record points at `key`.
    pub fn refers_to(&self, key: &ResourceKey) -> bool {
        self.kind == key.kind && self.id == key.id && self.dataset == key.dataset
    }
}

/// A resource's copy of one relationship: "this vocabulary tags me".
///
/// Vocabulary names are only unique within an application, so the record
/// carries both halves of the [`VocabularyKey`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VocabularyAttachment {
    /// Vocabulary id.
    pub id: String,
    /// Application owning the vocabulary.
    pub application: String,
    /// Tags applied through this relationship.
    pub tags: Tags,
}

impl VocabularyAttachment {
    /// Record pointing at the vocabulary under `key` with `tags`.
    pub fn new(key: &VocabularyKey, tags: Tags) -> Self {
        Self {
            id: key.name.clone(),
            application: key.application.clone(),
            tags,
        }
    }

    /// Key of the vocabulary this record points at.
    pub fn key(&self) -> VocabularyKey {
        VocabularyKey::new(self.id.clone(), self.application.clone())
    }

    /// Whether this record points at `key`.
    pub fn refers_to(&self, key: &VocabularyKey) -> bool {
        self.id == key.name && self.application == key.application
    }
}

/// Publication state of a vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VocabularyStatus {
    /// Visible to consumers.
    #[default]
    Published,
    /// Hidden from consumers.
    Unpublished,
}

/// Controlled vocabulary and the resources it tags.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vocabulary {
    /// Vocabulary id (its name).
    pub id: String,
    /// Owning application.
    pub application: String,
    /// Resource attachments, at most one per resource key.
    pub resources: Vec<ResourceAttachment>,
    /// Creator, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    /// Publication state.
    #[serde(default)]
    pub status: VocabularyStatus,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Time of the last attachment change.
    pub updated_at: DateTime<Utc>,
}

impl Vocabulary {
    /// Empty vocabulary stamped with `now`.
    pub fn new(key: &VocabularyKey, user_id: Option<String>, now: DateTime<Utc>) -> Self {
        Self {
            id: key.name.clone(),
            application: key.application.clone(),
            resources: Vec::new(),
            user_id,
            status: VocabularyStatus::default(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Document key.
    pub fn key(&self) -> VocabularyKey {
        VocabularyKey::new(self.id.clone(), self.application.clone())
    }

    /// Position of the record pointing at `key`, if any.
    pub fn resource_position(&self, key: &ResourceKey) -> Option<usize> {
        self.resources.iter().position(|r| r.refers_to(key))
    }

    /// Record pointing at `key`, if any.
    pub fn resource_attachment(&self, key: &ResourceKey) -> Option<&ResourceAttachment> {
        self.resources.iter().find(|r| r.refers_to(key))
    }

    /// Refresh `updated_at`.
    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = now;
    }
}

/// A tagged platform entity and the vocabularies attached to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resource {
    /// Dataset scope.
    pub dataset: String,
    /// Resource kind.
    #[serde(rename = "type")]
    pub kind: ResourceType,
    /// Resource id.
    pub id: String,
    /// Vocabulary attachments, at most one per vocabulary key.
    pub vocabularies: Vec<VocabularyAttachment>,
}

impl Resource {
    /// Resource with no attachments.
    pub fn new(key: &ResourceKey) -> Self {
        Self {
            dataset: key.dataset.clone(),
            kind: key.kind,
            id: key.id.clone(),
            vocabularies: Vec::new(),
        }
    }

    /// Document key.
    pub fn key(&self) -> ResourceKey {
        ResourceKey::new(self.dataset.clone(), self.kind, self.id.clone())
    }

    /// Position of the record pointing at `key`, if any.
    pub fn vocabulary_position(&self, key: &VocabularyKey) -> Option<usize> {
        self.vocabularies.iter().position(|v| v.refers_to(key))
    }

    /// Record pointing at `key`, if any.
    pub fn vocabulary_attachment(&self, key: &VocabularyKey) -> Option<&VocabularyAttachment> {
        self.vocabularies.iter().find(|v| v.refers_to(key))
    }

    /// A resource with no attachments left is an orphan and gets reaped.
    pub fn is_orphan(&self) -> bool {
        self.vocabularies.is_empty()
    }
}

/// Caller role, as asserted by the (external) authentication layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    /// Regular user.
    #[default]
    User,
    /// Administrator; may act on other users' favourites.
    Admin,
}

/// Identity performing an operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    /// User id.
    pub id: String,
    /// Role.
    #[serde(default)]
    pub role: Role,
}

impl Actor {
    /// Regular user.
    pub fn user(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            role: Role::User,
        }
    }

    /// Administrator.
    pub fn admin(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            role: Role::Admin,
        }
    }

    /// Whether the actor holds the admin role.
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// Favourite identifier, assigned by the store.
pub type FavouriteId = u64;

/// One-sided bookmark of a resource by a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Favourite {
    /// Store-assigned id.
    pub id: FavouriteId,
    /// Owning user.
    pub user_id: String,
    /// Application the bookmark belongs to.
    pub application: String,
    /// Bookmarked resource kind.
    pub resource_type: ResourceType,
    /// Bookmarked resource id.
    pub resource_id: String,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

/// Favourite fields supplied by the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewFavourite {
    /// Owning user.
    pub user_id: String,
    /// Application the bookmark belongs to.
    pub application: String,
    /// Bookmarked resource kind.
    pub resource_type: ResourceType,
    /// Bookmarked resource id.
    pub resource_id: String,
}

/// Favourite query.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FavouriteFilter {
    /// Owning user.
    pub user_id: String,
    /// Restrict to one application.
    pub application: Option<String>,
    /// Restrict to these resource kinds (`None` = any).
    pub resource_types: Option<BTreeSet<ResourceType>>,
}

impl FavouriteFilter {
    /// Whether `favourite` satisfies every clause.
    pub fn matches(&self, favourite: &Favourite) -> bool {
        favourite.user_id == self.user_id
            && self
                .application
                .as_ref()
                .is_none_or(|app| *app == favourite.application)
            && self
                .resource_types
                .as_ref()
                .is_none_or(|types| types.contains(&favourite.resource_type))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn key() -> ResourceKey {
        ResourceKey::new("ds1", ResourceType::Layer, "l1")
    }

    #[test]
    fn resolve_prefers_layer_then_widget_then_dataset() {
        assert_eq!(
            ResourceRef::resolve("ds1", Some("l1"), Some("w1")),
            ResourceRef::new(ResourceType::Layer, "l1")
        );
        assert_eq!(
            ResourceRef::resolve("ds1", None, Some("w1")),
            ResourceRef::new(ResourceType::Widget, "w1")
        );
        assert_eq!(
            ResourceRef::resolve("ds1", None, None),
            ResourceRef::new(ResourceType::Dataset, "ds1")
        );
    }

    #[test]
    fn resource_type_parses_wire_names() {
        for kind in ResourceType::ALL {
            assert_eq!(kind.as_str().parse::<ResourceType>().unwrap(), kind);
        }
        assert!("table".parse::<ResourceType>().is_err());
    }

    #[test]
    fn attachment_matches_all_three_key_parts() {
        let record = ResourceAttachment::new(&key(), Tags::new());
        assert!(record.refers_to(&key()));
        assert!(!record.refers_to(&ResourceKey::new("ds2", ResourceType::Layer, "l1")));
        assert!(!record.refers_to(&ResourceKey::new("ds1", ResourceType::Widget, "l1")));
        assert!(!record.refers_to(&ResourceKey::new("ds1", ResourceType::Layer, "l2")));
    }

    #[test]
    fn vocabulary_records_are_scoped_by_application() {
        let mut resource = Resource::new(&key());
        resource.vocabularies.push(VocabularyAttachment::new(
            &VocabularyKey::new("species", "gfw"),
            Tags::new(),
        ));
        assert_eq!(
            resource.vocabulary_position(&VocabularyKey::new("species", "gfw")),
            Some(0)
        );
        assert!(resource
            .vocabulary_attachment(&VocabularyKey::new("species", "rw"))
            .is_none());
    }

    #[test]
    fn vocabulary_serializes_with_wire_field_names() {
        let mut vocab = Vocabulary::new(&VocabularyKey::new("species", "rw"), None, Utc::now());
        vocab
            .resources
            .push(ResourceAttachment::new(&key(), Tags::from(["mammal".to_owned()])));
        let json = serde_json::to_value(&vocab).unwrap();
        assert_eq!(json["resources"][0]["type"], "layer");
        assert_eq!(json["status"], "published");
        assert!(json.get("user_id").is_none());
    }

    #[test]
    fn favourite_filter_applies_type_clause() {
        let fav = Favourite {
            id: 1,
            user_id: "u1".into(),
            application: "rw".into(),
            resource_type: ResourceType::Widget,
            resource_id: "w1".into(),
            created_at: Utc::now(),
        };
        let mut filter = FavouriteFilter {
            user_id: "u1".into(),
            ..FavouriteFilter::default()
        };
        assert!(filter.matches(&fav));
        filter.resource_types = Some(BTreeSet::from([ResourceType::Dataset]));
        assert!(!filter.matches(&fav));
        filter.resource_types = Some(BTreeSet::from([ResourceType::Widget]));
        assert!(filter.matches(&fav));
    }
}
