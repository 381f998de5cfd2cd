// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Shared application services for vocabulary tools (config, settings).

pub mod config;
pub mod settings;
