//! HTTP API request/response types.
//!
//! # Purpose
//! Defines payload shapes for the gateway endpoints and OpenAPI schema
//! generation. The `Person` bundle itself lives in `crate::person`.
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

/// Query string shared by every attribute endpoint.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SubjectQuery {
    /// BYU id or net id of the subject.
    #[serde(rename = "byuId")]
    pub byu_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct HealthStatus {
    pub status: String,
    /// RFC 3339 time the current upstream token was issued.
    pub token_acquired_at: Option<String>,
    pub renewal_failures: u64,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
    pub request_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PrimaryAffiliationResponse {
    pub edu_person_primary_affiliation: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AffiliationResponse {
    pub edu_person_affiliation: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ScopedAffiliationResponse {
    pub edu_person_scoped_affiliation: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct NameResponse {
    pub name: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PreferredFirstNameResponse {
    pub preferred_first_name: String,
}

/// Bundle served by `/api/eduPersonAll`.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EduPersonAllResponse {
    pub name: String,
    pub preferred_first_name: String,
    pub edu_person_primary_affiliation: String,
    pub edu_person_affiliation: Vec<String>,
    pub edu_person_scoped_affiliation: Vec<String>,
}
