// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Shared test doubles and fixtures for the vocabulary crates.
//!
//! # Modules
//!
//! - [`config`] - In-memory config store fake for testing without filesystem
//! - [`flaky`] - Store wrapper that fails chosen writes
//! - [`fixtures`] - Tag sets, resource references and actors
//! - [`mirror`] - Whole-store check of the two-sided relationship invariant
#![forbid(unsafe_code)]

pub mod config;
pub mod fixtures;
pub mod flaky;
pub mod mirror;

pub use config::InMemoryConfigStore;
pub use fixtures::{admin, dataset, layer, tags, user, widget};
pub use flaky::{FlakyStore, WriteOp};
pub use mirror::mirror_violations;
