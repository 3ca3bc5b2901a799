//! OAuth client credentials loaded from a local secrets file.
//!
//! # Purpose
//! Reads the `{API_USER, API_PASS}` JSON document once at startup and exposes
//! it as immutable [`Credentials`].
//!
//! # Security considerations
//! - The client secret is never rendered by `Debug` and must not be logged.
use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

/// Client id/secret pair for the client-credentials grant.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    client_id: String,
    client_secret: String,
}

impl Credentials {
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
        }
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    pub fn client_secret(&self) -> &str {
        &self.client_secret
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Error)]
pub enum CredentialsError {
    #[error("read credentials file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("parse credentials file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("credentials file {path} has an empty {field}")]
    Empty { path: String, field: &'static str },
}

#[derive(Deserialize)]
struct CredentialsFile {
    #[serde(rename = "API_USER")]
    api_user: String,
    #[serde(rename = "API_PASS")]
    api_pass: String,
}

/// Load credentials from a JSON file of the form `{"API_USER": .., "API_PASS": ..}`.
///
/// # Errors
/// - `CredentialsError::Io` if the file cannot be read.
/// - `CredentialsError::Parse` if the document is not the expected shape.
/// - `CredentialsError::Empty` if either value is blank.
pub fn load_credentials(path: impl AsRef<Path>) -> Result<Credentials, CredentialsError> {
    let path = path.as_ref();
    let display = path.display().to_string();
    let contents = std::fs::read_to_string(path).map_err(|source| CredentialsError::Io {
        path: display.clone(),
        source,
    })?;
    let file: CredentialsFile =
        serde_json::from_str(&contents).map_err(|source| CredentialsError::Parse {
            path: display.clone(),
            source,
        })?;
    if file.api_user.trim().is_empty() {
        return Err(CredentialsError::Empty {
            path: display,
            field: "API_USER",
        });
    }
    if file.api_pass.is_empty() {
        return Err(CredentialsError::Empty {
            path: display,
            field: "API_PASS",
        });
    }
    Ok(Credentials::new(file.api_user, file.api_pass))
}
