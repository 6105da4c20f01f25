//! Validation and lifecycle of the Google OAuth client-secret file.
//!
//! Everything here fails closed: malformed JSON, unreadable files, and
//! missing fields all come back as a [`CredentialState`] with a
//! human-readable reason, never as an error the caller must handle.

use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;

/// Well-known filename of the credential bundle, expected next to the app.
pub const CREDENTIAL_FILE_NAME: &str = "google-credentials.json";

/// How many ancestor directories auto-discovery climbs through.
const AUTO_DISCOVER_DEPTH: usize = 5;

pub(crate) const MISSING_MESSAGE: &str =
    "Add google-credentials.json next to the app to import upcoming events.";
const UNREADABLE_MESSAGE: &str =
    "We couldn't read google-credentials.json. Choose the file again.";
const SAVE_FAILED_MESSAGE: &str =
    "We couldn't save google-credentials.json. Try picking the file again.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialStatus {
    Missing,
    Valid,
    Invalid,
}

/// Current verdict on the credential file, plus the message shown for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialState {
    pub status: CredentialStatus,
    pub message: String,
}

impl CredentialState {
    pub fn missing(message: impl Into<String>) -> Self {
        CredentialState {
            status: CredentialStatus::Missing,
            message: message.into(),
        }
    }

    pub fn valid(message: impl Into<String>) -> Self {
        CredentialState {
            status: CredentialStatus::Valid,
            message: message.into(),
        }
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        CredentialState {
            status: CredentialStatus::Invalid,
            message: message.into(),
        }
    }
}

/// Owns the canonical credential path and the OAuth token cache directory.
pub struct CredentialStore {
    app_dir: PathBuf,
    credentials_path: PathBuf,
    token_dir: PathBuf,
}

impl CredentialStore {
    pub fn new(app_dir: impl Into<PathBuf>, token_dir: impl Into<PathBuf>) -> Self {
        let app_dir = app_dir.into();
        let token_dir = token_dir.into();

        if let Err(e) = fs::create_dir_all(&app_dir) {
            tracing::warn!("Failed to create app directory {}: {}", app_dir.display(), e);
        }
        if let Err(e) = fs::create_dir_all(&token_dir) {
            tracing::warn!(
                "Failed to create token directory {}: {}",
                token_dir.display(),
                e
            );
        }

        let credentials_path = app_dir.join(CREDENTIAL_FILE_NAME);
        CredentialStore {
            app_dir,
            credentials_path,
            token_dir,
        }
    }

    pub fn app_dir(&self) -> &Path {
        &self.app_dir
    }

    pub fn credentials_path(&self) -> &Path {
        &self.credentials_path
    }

    pub fn token_dir(&self) -> &Path {
        &self.token_dir
    }

    /// Validate the canonical credential file. When it is absent, tries
    /// auto-discovery before settling on `Missing`.
    pub fn validate(&self) -> CredentialState {
        if !self.credentials_path.exists() {
            if let Some(state) = self.try_auto_discover() {
                return state;
            }
            return CredentialState::missing(MISSING_MESSAGE);
        }
        self.validate_canonical()
    }

    fn validate_canonical(&self) -> CredentialState {
        match fs::read_to_string(&self.credentials_path) {
            Ok(json) => match validate_credential_json(&json) {
                Ok(()) => CredentialState::valid(
                    "google-credentials.json looks good. Run an import to continue.",
                ),
                Err(message) => CredentialState::invalid(message),
            },
            Err(e) => {
                tracing::error!("Failed to validate google-credentials.json: {}", e);
                CredentialState::invalid(UNREADABLE_MESSAGE)
            }
        }
    }

    /// Copy an external credential file into the canonical location.
    ///
    /// The source content is validated in memory first; nothing is
    /// written unless it passes. A successful import wipes cached tokens
    /// so the new client secret forces re-authorization.
    pub fn import(&self, source: &Path, cancel: &CancellationToken) -> CredentialState {
        if source.as_os_str().is_empty() || !source.is_file() {
            return CredentialState::missing(
                "We couldn't find that google-credentials.json file.",
            );
        }

        if cancel.is_cancelled() {
            return CredentialState::invalid(SAVE_FAILED_MESSAGE);
        }

        let json = match fs::read_to_string(source) {
            Ok(json) => json,
            Err(e) => {
                tracing::error!("Failed to import google-credentials.json: {}", e);
                return CredentialState::invalid(SAVE_FAILED_MESSAGE);
            }
        };

        if let Err(message) = validate_credential_json(&json) {
            return CredentialState::invalid(message);
        }

        if cancel.is_cancelled() {
            return CredentialState::invalid(SAVE_FAILED_MESSAGE);
        }

        if let Err(e) = fs::write(&self.credentials_path, &json) {
            tracing::error!("Failed to save google-credentials.json: {}", e);
            return CredentialState::invalid(SAVE_FAILED_MESSAGE);
        }

        self.clear_cached_tokens();
        CredentialState::valid("Credentials saved. Run an import to sign in with Google.")
    }

    /// Look for a credential file near the app directory and adopt it.
    ///
    /// An invalid candidate is reported but never copied, so a stale bad
    /// file cannot mask a later correct manual import.
    fn try_auto_discover(&self) -> Option<CredentialState> {
        let candidate = self.find_candidate()?;

        let json = match fs::read_to_string(&candidate) {
            Ok(json) => json,
            Err(e) => {
                tracing::error!(
                    "Failed to auto-import {}: {}",
                    candidate.display(),
                    e
                );
                return Some(CredentialState::invalid(UNREADABLE_MESSAGE));
            }
        };

        if let Err(message) = validate_credential_json(&json) {
            return Some(CredentialState::invalid(message));
        }

        if let Err(e) = fs::write(&self.credentials_path, &json) {
            tracing::error!("Failed to adopt discovered credential file: {}", e);
            return Some(CredentialState::invalid(UNREADABLE_MESSAGE));
        }
        self.clear_cached_tokens();

        Some(CredentialState::valid(
            "google-credentials.json found. Run an import to continue.",
        ))
    }

    fn find_candidate(&self) -> Option<PathBuf> {
        let mut dir: Option<&Path> = Some(self.app_dir.as_path());
        for _ in 0..AUTO_DISCOVER_DEPTH {
            let current = dir?;
            let exact = current.join(CREDENTIAL_FILE_NAME);
            if exact.is_file() {
                return Some(exact);
            }
            if let Some(alternate) = alternate_in(current) {
                return Some(alternate);
            }
            dir = current.parent();
        }
        None
    }

    /// Delete and recreate the token cache directory. Failures are logged
    /// and swallowed; a leftover cache only costs an extra sign-in prompt.
    pub fn clear_cached_tokens(&self) {
        if self.token_dir.exists() {
            if let Err(e) = fs::remove_dir_all(&self.token_dir) {
                tracing::error!("Failed to clear Google OAuth token cache: {}", e);
            }
        }
        if let Err(e) = fs::create_dir_all(&self.token_dir) {
            tracing::error!("Failed to recreate Google OAuth token directory: {}", e);
        }
    }
}

/// Find a renamed/backup variant such as `google-credentials.json (1)` or
/// `google-credentials.json.bak` in `dir`.
fn alternate_in(dir: &Path) -> Option<PathBuf> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            tracing::error!(
                "Failed to enumerate potential credential files in {}: {}",
                dir.display(),
                e
            );
            return None;
        }
    };

    for entry in entries.flatten() {
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let name = match path.file_name().and_then(|n| n.to_str()) {
            Some(name) => name.to_ascii_lowercase(),
            None => continue,
        };
        if name.starts_with(CREDENTIAL_FILE_NAME) {
            return Some(path);
        }
    }
    None
}

/// Shape-check a credential bundle: an `installed` or `web` client section
/// with a non-blank id and secret and at least one redirect URI.
pub(crate) fn validate_credential_json(json: &str) -> Result<(), String> {
    let value: Value = match serde_json::from_str(json) {
        Ok(value) => value,
        Err(e) => {
            tracing::warn!("Invalid google-credentials.json: {}", e);
            return Err(
                "google-credentials.json isn't valid JSON. Download a fresh file and try again."
                    .to_string(),
            );
        }
    };

    let section = value
        .get("installed")
        .or_else(|| value.get("web"))
        .and_then(Value::as_object)
        .ok_or_else(|| {
            "The credential file must include an \"installed\" client configuration.".to_string()
        })?;

    let client_id = section.get("client_id").and_then(Value::as_str).unwrap_or("");
    let client_secret = section
        .get("client_secret")
        .and_then(Value::as_str)
        .unwrap_or("");
    if client_id.trim().is_empty() || client_secret.trim().is_empty() {
        return Err("The credential file is missing the client ID or secret.".to_string());
    }

    let redirect_uris = section.get("redirect_uris").and_then(Value::as_array);
    match redirect_uris {
        Some(uris) if !uris.is_empty() => Ok(()),
        _ => Err("The credential file is missing redirect URIs.".to_string()),
    }
}
