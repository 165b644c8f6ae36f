//! Server configuration
//!
//! Settings arrive from three places: command-line flags, the client's
//! `initializationOptions`, and later `workspace/didChangeConfiguration`
//! notifications. All of them deserialize into [`ServerSettings`]; the
//! analysis engine only ever sees the [`AnalysisSettings`] subset.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Key under which editors usually nest this server's settings.
pub const SETTINGS_SECTION: &str = "kamailio";

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("settings must be a JSON object, got {0}")]
    NotAnObject(&'static str),
    #[error("invalid settings: {0}")]
    Invalid(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServerSettings {
    /// Publish diagnostics at all.
    pub diagnostics_enabled: bool,
    /// Hint on `#` line comments.
    #[serde(alias = "enableDeprecatedCommentHint")]
    pub deprecated_comment_hints_enabled: bool,
    /// Report parser error nodes. Off by default: the grammar still produces
    /// spurious errors on valid scripts.
    pub syntax_errors_enabled: bool,
    /// Root of a Kamailio source checkout, used for module documentation.
    pub kamailio_source_path: Option<PathBuf>,
    /// Cookbook JSON file with keyword and core documentation.
    pub cookbook_path: Option<PathBuf>,
    pub log_level: Option<String>,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            diagnostics_enabled: true,
            deprecated_comment_hints_enabled: false,
            syntax_errors_enabled: false,
            kamailio_source_path: None,
            cookbook_path: None,
            log_level: None,
        }
    }
}

/// Flags read by the diagnostic rules.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AnalysisSettings {
    pub deprecated_comment_hints_enabled: bool,
    pub syntax_errors_enabled: bool,
}

impl AnalysisSettings {
    /// Every optional rule switched on.
    pub fn all() -> Self {
        Self {
            deprecated_comment_hints_enabled: true,
            syntax_errors_enabled: true,
        }
    }
}

impl ServerSettings {
    /// Parses a settings payload from the client.
    ///
    /// Accepts either the settings object itself or an object holding it under
    /// the `kamailio` key. `null` yields the defaults.
    pub fn from_value(value: &Value) -> Result<Self, SettingsError> {
        let settings = match value {
            Value::Null => return Ok(Self::default()),
            Value::Object(map) => match map.get(SETTINGS_SECTION) {
                Some(section @ Value::Object(_)) => section,
                _ => value,
            },
            Value::Bool(_) => return Err(SettingsError::NotAnObject("a boolean")),
            Value::Number(_) => return Err(SettingsError::NotAnObject("a number")),
            Value::String(_) => return Err(SettingsError::NotAnObject("a string")),
            Value::Array(_) => return Err(SettingsError::NotAnObject("an array")),
        };
        Ok(Self::deserialize(settings)?)
    }

    /// Fills paths the client left unset from `fallback`, typically the
    /// command line.
    pub fn with_fallback(mut self, fallback: &ServerSettings) -> Self {
        if self.kamailio_source_path.is_none() {
            self.kamailio_source_path = fallback.kamailio_source_path.clone();
        }
        if self.cookbook_path.is_none() {
            self.cookbook_path = fallback.cookbook_path.clone();
        }
        if self.log_level.is_none() {
            self.log_level = fallback.log_level.clone();
        }
        self
    }

    pub fn analysis(&self) -> AnalysisSettings {
        AnalysisSettings {
            deprecated_comment_hints_enabled: self.deprecated_comment_hints_enabled,
            syntax_errors_enabled: self.syntax_errors_enabled,
        }
    }
}
