//! HTTP attribute source over the persons v4 identity API.
//!
//! # Security considerations
//! - Subject ids are validated by the HTTP layer before they are placed in a
//!   URL path.
//! - Upstream bodies are never copied into errors or logs.
use crate::auth::TokenManager;
use crate::observability;
use crate::upstream::{
    AttributeSource, BASIC_ENDPOINT, BasicProfile, MEMBERSHIPS_ENDPOINT, UpstreamError,
    UpstreamResult,
};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::sync::Arc;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ValueField {
    value: Option<String>,
}

impl ValueField {
    fn into_string(self) -> String {
        self.value.unwrap_or_default()
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct PersonDocument {
    basic: BasicDocument,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct BasicDocument {
    net_id: ValueField,
    preferred_first_name: ValueField,
    first_name: ValueField,
    middle_name: ValueField,
    surname: ValueField,
    byu_internal_email: ValueField,
    student_email_address: ValueField,
    personal_email: ValueField,
    primary_affiliation: ValueField,
}

impl From<BasicDocument> for BasicProfile {
    fn from(doc: BasicDocument) -> Self {
        BasicProfile {
            net_id: doc.net_id.into_string(),
            preferred_first_name: doc.preferred_first_name.into_string(),
            first_name: doc.first_name.into_string(),
            middle_name: doc.middle_name.into_string(),
            surname: doc.surname.into_string(),
            byu_internal_email: doc.byu_internal_email.into_string(),
            student_email_address: doc.student_email_address.into_string(),
            personal_email: doc.personal_email.into_string(),
            primary_affiliation: doc.primary_affiliation.into_string(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct MembershipsDocument {
    values: Vec<MembershipEntry>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct MembershipEntry {
    group_id: ValueField,
}

/// Authenticated client for `persons/v4`.
#[derive(Clone)]
pub struct IdentityClient {
    client: reqwest::Client,
    base_url: String,
    tokens: Arc<TokenManager>,
}

impl IdentityClient {
    /// `base_url` is the API root, e.g. `https://api.byu.edu/byuapi`.
    pub fn new(client: reqwest::Client, base_url: impl Into<String>, tokens: Arc<TokenManager>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            tokens,
        }
    }

    fn person_url(&self, subject_id: &str) -> String {
        format!("{}/persons/v4/{}", self.base_url, subject_id)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        endpoint: &'static str,
        url: String,
    ) -> UpstreamResult<T> {
        let result = self.fetch(endpoint, url).await;
        let outcome = match &result {
            Ok(_) => "ok",
            Err(UpstreamError::NotFound { .. }) => "not_found",
            Err(UpstreamError::Unauthorized { .. }) => "unauthorized",
            Err(_) => "error",
        };
        metrics::counter!(
            observability::UPSTREAM_REQUESTS_TOTAL,
            "endpoint" => endpoint,
            "outcome" => outcome
        )
        .increment(1);
        result
    }

    async fn fetch<T: DeserializeOwned>(
        &self,
        endpoint: &'static str,
        url: String,
    ) -> UpstreamResult<T> {
        let response = self
            .client
            .get(url)
            .bearer_auth(self.tokens.current_token())
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|source| UpstreamError::Http { endpoint, source })?;
        match response.status() {
            StatusCode::OK => {}
            StatusCode::NOT_FOUND => return Err(UpstreamError::NotFound { endpoint }),
            status @ (StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) => {
                return Err(UpstreamError::Unauthorized {
                    endpoint,
                    status: status.as_u16(),
                });
            }
            status => {
                return Err(UpstreamError::Status {
                    endpoint,
                    status: status.as_u16(),
                });
            }
        }
        let body = response
            .bytes()
            .await
            .map_err(|source| UpstreamError::Http { endpoint, source })?;
        serde_json::from_slice(&body).map_err(|source| UpstreamError::Decode { endpoint, source })
    }
}

#[async_trait]
impl AttributeSource for IdentityClient {
    async fn basic_profile(&self, subject_id: &str) -> UpstreamResult<BasicProfile> {
        let doc: PersonDocument = self
            .get_json(BASIC_ENDPOINT, self.person_url(subject_id))
            .await?;
        Ok(doc.basic.into())
    }

    async fn group_memberships(&self, subject_id: &str) -> UpstreamResult<Vec<String>> {
        let url = format!("{}/group_memberships", self.person_url(subject_id));
        let doc: MembershipsDocument = self.get_json(MEMBERSHIPS_ENDPOINT, url).await?;
        Ok(doc
            .values
            .into_iter()
            .map(|entry| entry.group_id.into_string())
            .filter(|group| !group.is_empty())
            .collect())
    }
}

impl std::fmt::Debug for IdentityClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdentityClient")
            .field("base_url", &self.base_url)
            .finish()
    }
}
