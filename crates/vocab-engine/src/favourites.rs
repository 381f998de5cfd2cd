// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Per-user resource bookmarks.
//!
//! Favourites are one-sided records: nothing mirrors them, so none of the
//! relationship protocol applies.

use std::collections::BTreeSet;

use tracing::info;
use vocab_store::{
    Actor, Favourite, FavouriteFilter, FavouriteId, FavouriteStore, NewFavourite, ResourceType,
    StoreError,
};

use crate::error::Outcome;

/// Errors returned by [`FavouriteService`].
#[derive(Debug, thiserror::Error)]
pub enum FavouriteError {
    /// The request is missing a required value.
    #[error("bad request: {0}")]
    BadRequest(String),
    /// The favourite does not exist or belongs to someone else.
    #[error("favourite {0} not found")]
    FavouriteNotFound(FavouriteId),
    /// Store failure.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl FavouriteError {
    /// Client-facing class of this error.
    pub const fn outcome(&self) -> Outcome {
        match self {
            Self::BadRequest(_) => Outcome::BadRequest,
            Self::FavouriteNotFound(_) => Outcome::NotFound,
            Self::Store(_) => Outcome::Internal,
        }
    }
}

/// Favourite operations scoped to one application.
pub struct FavouriteService<S> {
    store: S,
    application: String,
}

impl<S: FavouriteStore> FavouriteService<S> {
    /// Service over `store` for `application`.
    pub fn new(store: S, application: impl Into<String>) -> Self {
        Self {
            store,
            application: application.into(),
        }
    }

    /// Bookmark a resource for the actor.
    ///
    /// # Errors
    ///
    /// [`FavouriteError::BadRequest`] when `resource_id` is blank.
    pub fn create(
        &self,
        actor: &Actor,
        kind: ResourceType,
        resource_id: &str,
    ) -> Result<Favourite, FavouriteError> {
        let resource_id = resource_id.trim();
        if resource_id.is_empty() {
            return Err(FavouriteError::BadRequest("resource id is required".into()));
        }
        let favourite = self.store.insert_favourite(NewFavourite {
            user_id: actor.id.clone(),
            application: self.application.clone(),
            resource_type: kind,
            resource_id: resource_id.to_owned(),
        })?;
        info!(favourite = favourite.id, user = %actor.id, resource = %resource_id, "favourite created");
        Ok(favourite)
    }

    /// The actor's favourites in this application, optionally restricted to some types.
    pub fn list(
        &self,
        actor: &Actor,
        kinds: Option<BTreeSet<ResourceType>>,
    ) -> Result<Vec<Favourite>, FavouriteError> {
        Ok(self.store.find_favourites(&FavouriteFilter {
            user_id: actor.id.clone(),
            application: Some(self.application.clone()),
            resource_types: kinds,
        })?)
    }

    /// Every favourite of `user_id` in the service's application, of any type.
    ///
    /// # Errors
    ///
    /// [`FavouriteError::BadRequest`] when `user_id` is blank.
    pub fn find_by_user(&self, user_id: &str) -> Result<Vec<Favourite>, FavouriteError> {
        let user_id = user_id.trim();
        if user_id.is_empty() {
            return Err(FavouriteError::BadRequest("user id is required".into()));
        }
        Ok(self.store.find_favourites(&FavouriteFilter {
            user_id: user_id.to_owned(),
            application: Some(self.application.clone()),
            resource_types: None,
        })?)
    }

    /// Fetch a favourite owned by the actor (or any favourite, for admins).
    pub fn get(&self, actor: &Actor, id: FavouriteId) -> Result<Favourite, FavouriteError> {
        self.store
            .get_favourite(id)?
            .filter(|f| visible_to(actor, f))
            .ok_or(FavouriteError::FavouriteNotFound(id))
    }

    /// Remove a favourite owned by the actor (or any favourite, for admins).
    pub fn delete(&self, actor: &Actor, id: FavouriteId) -> Result<Favourite, FavouriteError> {
        self.get(actor, id)?;
        let removed = self
            .store
            .remove_favourite(id)?
            .ok_or(FavouriteError::FavouriteNotFound(id))?;
        info!(favourite = id, user = %actor.id, "favourite deleted");
        Ok(removed)
    }
}

fn visible_to(actor: &Actor, favourite: &Favourite) -> bool {
    actor.is_admin() || favourite.user_id == actor.id
}
