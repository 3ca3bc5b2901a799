//! OAuth client-credentials token lifecycle.
//!
//! # Purpose and responsibility
//! Acquires the bearer token the gateway presents to the identity API and keeps
//! it fresh for the lifetime of the process.
//!
//! # Key invariants and assumptions
//! - Exactly one live token exists; readers load it through an `ArcSwap`
//!   pointer and never observe a partially written value.
//! - At most one acquisition is in flight. Renewals take `renew_lock` before
//!   calling the token endpoint.
//! - A failed renewal keeps the previous token. The next attempt is the next
//!   tick of the renewal task.
//!
//! # Security considerations
//! - Token values and client secrets are never logged or rendered by `Debug`.
use crate::credentials::Credentials;
use crate::observability;
use arc_swap::ArcSwap;
use chrono::{DateTime, Utc};
use reqwest::StatusCode;
use serde::Deserialize;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("token endpoint returned status {0}")]
    Status(u16),
    #[error("token response has no access_token or token string")]
    MissingToken,
    #[error("decode token response: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("token request failed: {0}")]
    Http(#[from] reqwest::Error),
}

/// Bearer credential snapshot.
#[derive(Clone, PartialEq, Eq)]
pub struct Token {
    value: String,
    acquired_at: DateTime<Utc>,
    ttl: Option<Duration>,
}

impl Token {
    pub fn new(value: impl Into<String>, ttl: Option<Duration>) -> Self {
        Self {
            value: value.into(),
            acquired_at: Utc::now(),
            ttl,
        }
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn acquired_at(&self) -> DateTime<Utc> {
        self.acquired_at
    }

    pub fn ttl(&self) -> Option<Duration> {
        self.ttl
    }

    /// Expiry reported by the token endpoint, if it sent `expires_in`.
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        let ttl = chrono::Duration::from_std(self.ttl?).ok()?;
        self.acquired_at.checked_add_signed(ttl)
    }
}

impl std::fmt::Debug for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Token")
            .field("value", &"<redacted>")
            .field("acquired_at", &self.acquired_at)
            .field("ttl", &self.ttl)
            .finish()
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    #[serde(default)]
    access_token: Option<serde_json::Value>,
    #[serde(default)]
    token: Option<serde_json::Value>,
    #[serde(default)]
    expires_in: Option<serde_json::Value>,
}

impl TokenResponse {
    fn into_token(self) -> Result<Token, AuthError> {
        let value = [self.access_token.as_ref(), self.token.as_ref()]
            .into_iter()
            .flatten()
            .find_map(|candidate| candidate.as_str().filter(|value| !value.is_empty()))
            .ok_or(AuthError::MissingToken)?;
        let ttl = self.expires_in.as_ref().and_then(|expires_in| {
            expires_in
                .as_u64()
                .or_else(|| expires_in.as_str().and_then(|raw| raw.parse().ok()))
                .map(Duration::from_secs)
        });
        Ok(Token::new(value, ttl))
    }
}

/// Run one client-credentials grant against `token_url`.
///
/// # Errors
/// - `AuthError::Status` for any non-200 response.
/// - `AuthError::MissingToken` if neither `access_token` nor `token` is a
///   non-empty string.
/// - `AuthError::Decode` for a malformed JSON body.
/// - `AuthError::Http` for transport failures and timeouts.
pub async fn acquire_token(
    client: &reqwest::Client,
    token_url: &str,
    credentials: &Credentials,
) -> Result<Token, AuthError> {
    let response = client
        .post(token_url)
        .basic_auth(credentials.client_id(), Some(credentials.client_secret()))
        .form(&[("grant_type", "client_credentials")])
        .send()
        .await?;
    let status = response.status();
    if status != StatusCode::OK {
        return Err(AuthError::Status(status.as_u16()));
    }
    let body = response.bytes().await?;
    let parsed: TokenResponse = serde_json::from_slice(&body)?;
    parsed.into_token()
}

/// Shared owner of the upstream bearer token.
pub struct TokenManager {
    client: reqwest::Client,
    token_url: String,
    credentials: Credentials,
    current: ArcSwap<Token>,
    renew_lock: Mutex<()>,
    renewal_failures: AtomicU64,
}

impl TokenManager {
    /// Acquire the first token and return a manager holding it.
    ///
    /// # Errors
    /// Propagates the `AuthError` from the initial grant; the process is not
    /// usable without a token.
    pub async fn bootstrap(
        client: reqwest::Client,
        token_url: impl Into<String>,
        credentials: Credentials,
    ) -> Result<Arc<Self>, AuthError> {
        let token_url = token_url.into();
        let token = acquire_token(&client, &token_url, &credentials).await?;
        tracing::info!(
            ttl_secs = token.ttl().map(|ttl| ttl.as_secs()),
            "acquired upstream access token"
        );
        Ok(Arc::new(Self::from_token(
            client,
            token_url,
            credentials,
            token,
        )))
    }

    /// Build a manager around an already acquired token.
    pub fn from_token(
        client: reqwest::Client,
        token_url: impl Into<String>,
        credentials: Credentials,
        token: Token,
    ) -> Self {
        Self {
            client,
            token_url: token_url.into(),
            credentials,
            current: ArcSwap::from_pointee(token),
            renew_lock: Mutex::new(()),
            renewal_failures: AtomicU64::new(0),
        }
    }

    /// Latest token value. Never waits on I/O.
    pub fn current_token(&self) -> String {
        self.current.load().value.clone()
    }

    pub fn snapshot(&self) -> Arc<Token> {
        self.current.load_full()
    }

    /// Renewal attempts that failed since startup.
    pub fn renewal_failures(&self) -> u64 {
        self.renewal_failures.load(Ordering::Relaxed)
    }

    /// Acquire a fresh token and swap it in.
    ///
    /// On failure the current token is left untouched and the failure is
    /// counted.
    pub async fn renew(&self) -> Result<(), AuthError> {
        let _guard = self.renew_lock.lock().await;
        match acquire_token(&self.client, &self.token_url, &self.credentials).await {
            Ok(token) => {
                self.current.store(Arc::new(token));
                metrics::counter!(observability::TOKEN_RENEWALS_TOTAL, "outcome" => "success")
                    .increment(1);
                Ok(())
            }
            Err(err) => {
                self.renewal_failures.fetch_add(1, Ordering::Relaxed);
                metrics::counter!(observability::TOKEN_RENEWALS_TOTAL, "outcome" => "failure")
                    .increment(1);
                Err(err)
            }
        }
    }

    /// Spawn the periodic renewal task. The first renewal runs one `interval`
    /// after this call.
    pub fn start_auto_renew(self: &Arc<Self>, interval: Duration) -> JoinHandle<()> {
        let manager = Arc::clone(self);
        tokio::spawn(async move {
            let start = tokio::time::Instant::now() + interval;
            let mut ticker = tokio::time::interval_at(start, interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                match manager.renew().await {
                    Ok(()) => tracing::info!("renewed upstream access token"),
                    Err(err) => tracing::warn!(
                        error = %err,
                        failures = manager.renewal_failures(),
                        "token renewal failed; keeping previous token"
                    ),
                }
            }
        })
    }
}

impl std::fmt::Debug for TokenManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenManager")
            .field("token_url", &self.token_url)
            .field("current", &self.current.load_full())
            .field("renewal_failures", &self.renewal_failures())
            .finish()
    }
}
