//! # Backend configuration: Firebase project settings from the environment
//!
//! Caspian talks to one Firebase project. The five project values are read
//! from the process environment once at startup (the server loads `.env` with
//! `dotenvy` first):
//!
//! | Variable | Field | Required |
//! |----------|-------|----------|
//! | `FIREBASE_API_KEY` | [`api_key`](BackendConfig::api_key) | yes |
//! | `FIREBASE_AUTH_DOMAIN` | [`auth_domain`](BackendConfig::auth_domain) | yes |
//! | `FIREBASE_PROJECT_ID` | [`project_id`](BackendConfig::project_id) | yes |
//! | `FIREBASE_STORAGE_BUCKET` | [`storage_bucket`](BackendConfig::storage_bucket) | no, defaults to `<project-id>.appspot.com` |
//! | `FIREBASE_APP_ID` | [`app_id`](BackendConfig::app_id) | yes |
//! | `CASPIAN_NOTE_FORMAT` | [`note_format`](BackendConfig::note_format) | no, `plain` or `rich` (default `plain`) |
//!
//! Missing values fail fast with [`ConfigError::Missing`] instead of surfacing
//! later as an opaque request failure.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::editor::NoteFormat;

pub const API_KEY_VAR: &str = "FIREBASE_API_KEY";
pub const AUTH_DOMAIN_VAR: &str = "FIREBASE_AUTH_DOMAIN";
pub const PROJECT_ID_VAR: &str = "FIREBASE_PROJECT_ID";
pub const STORAGE_BUCKET_VAR: &str = "FIREBASE_STORAGE_BUCKET";
pub const APP_ID_VAR: &str = "FIREBASE_APP_ID";
pub const NOTE_FORMAT_VAR: &str = "CASPIAN_NOTE_FORMAT";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("{0} not set")]
    Missing(&'static str),

    #[error("invalid value {value:?} for {var}")]
    Invalid { var: &'static str, value: String },
}

/// Firebase project settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendConfig {
    pub api_key: String,
    pub auth_domain: String,
    pub project_id: String,
    pub storage_bucket: String,
    pub app_id: String,
    #[serde(default)]
    pub note_format: NoteFormat,
}

impl BackendConfig {
    /// Read the configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Read the configuration through `lookup`. Empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |var: &'static str| lookup(var).filter(|v| !v.trim().is_empty());
        let required = |var: &'static str| get(var).ok_or(ConfigError::Missing(var));

        let project_id = required(PROJECT_ID_VAR)?;
        let storage_bucket =
            get(STORAGE_BUCKET_VAR).unwrap_or_else(|| format!("{project_id}.appspot.com"));
        let note_format = match get(NOTE_FORMAT_VAR) {
            None => NoteFormat::default(),
            Some(value) => value.parse().map_err(|_| ConfigError::Invalid {
                var: NOTE_FORMAT_VAR,
                value,
            })?,
        };

        Ok(Self {
            api_key: required(API_KEY_VAR)?,
            auth_domain: required(AUTH_DOMAIN_VAR)?,
            project_id,
            storage_bucket,
            app_id: required(APP_ID_VAR)?,
            note_format,
        })
    }

    /// Root of the Firestore REST documents API for this project.
    pub fn firestore_documents_url(&self) -> String {
        format!(
            "https://firestore.googleapis.com/v1/projects/{}/databases/(default)/documents",
            self.project_id
        )
    }

    /// Root of the Firebase Storage REST API for this project's bucket.
    pub fn storage_bucket_url(&self) -> String {
        format!(
            "https://firebasestorage.googleapis.com/v0/b/{}/o",
            self.storage_bucket
        )
    }
}
