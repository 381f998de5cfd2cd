// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Typed settings shared by the relationship engine and its tools.

use serde::{Deserialize, Serialize};

/// Config key for [`EngineSettings`].
pub const ENGINE_SETTINGS_KEY: &str = "engine";
/// Config key for [`ToolPrefs`].
pub const TOOL_PREFS_KEY: &str = "vocabctl";

/// Knobs of the relationship engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    /// Application (tenant) every vocabulary and favourite is scoped to.
    pub application: String,
    /// Serialize writers per vocabulary and per resource document.
    pub serialize_writers: bool,
    /// Restore the vocabulary side when the resource-side write fails.
    pub compensate_partial_writes: bool,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            application: "rw".to_owned(),
            serialize_writers: true,
            compensate_partial_writes: true,
        }
    }
}

/// Preferences of the `vocabctl` command-line tool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolPrefs {
    /// Snapshot file holding the document state.
    pub data_path: String,
    /// Default log level (`error`, `warn`, `info`, `debug`, `trace`).
    pub log_level: String,
    /// Engine settings used by the tool.
    pub engine: EngineSettings,
}

impl Default for ToolPrefs {
    fn default() -> Self {
        Self {
            data_path: "vocab-data.json".to_owned(),
            log_level: "info".to_owned(),
            engine: EngineSettings::default(),
        }
    }
}
