//! eduPerson attribute handlers.
//!
//! # Purpose and responsibility
//! Validates the `byuId` query parameter, runs the aggregator and serializes
//! either the full `Person` or a single attribute of it.
//!
//! # Key invariants and assumptions
//! - Validation happens before any upstream call.
//! - Every endpoint derives its value from the same aggregated `Person`.
use crate::api::error::{ApiError, api_validation_error};
use crate::api::types::{
    AffiliationResponse, EduPersonAllResponse, ErrorResponse, NameResponse,
    PreferredFirstNameResponse, PrimaryAffiliationResponse, ScopedAffiliationResponse,
    SubjectQuery,
};
use crate::app::AppState;
use crate::person::Person;
use axum::Json;
use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};

pub const MAX_SUBJECT_ID_LEN: usize = 64;

/// Check a subject id before it is placed in an upstream URL path.
///
/// Accepts 1 to 64 ASCII alphanumerics, `-`, `_` or `.`. An id made only of
/// dots is rejected.
pub fn validate_subject_id(raw: Option<&str>) -> Result<&str, ApiError> {
    let subject_id = match raw {
        Some(value) if !value.is_empty() => value,
        _ => return Err(api_validation_error("missing byuId parameter")),
    };
    if subject_id.len() > MAX_SUBJECT_ID_LEN {
        return Err(api_validation_error("byuId is too long"));
    }
    let allowed = |c: char| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.');
    if !subject_id.chars().all(allowed) || subject_id.chars().all(|c| c == '.') {
        return Err(api_validation_error("byuId contains invalid characters"));
    }
    Ok(subject_id)
}

/// Query extraction is taken as a `Result` so an undecodable query string
/// (for example a repeated `byuId`) still gets the JSON error body.
type SubjectParams = Result<Query<SubjectQuery>, QueryRejection>;

async fn load_person(state: &AppState, params: SubjectParams) -> Result<Person, ApiError> {
    let Query(query) = params.map_err(|rejection| {
        tracing::debug!(error = %rejection.body_text(), "rejected query string");
        api_validation_error("malformed query string")
    })?;
    let subject_id = validate_subject_id(query.byu_id.as_deref())?;
    Ok(state.aggregator.aggregate(subject_id).await?)
}

#[utoipa::path(
    get,
    path = "/api/eduPerson",
    tag = "person",
    params(SubjectQuery),
    responses(
        (status = 200, description = "Full eduPerson attribute bundle", body = Person),
        (status = 400, description = "Missing or malformed byuId", body = ErrorResponse),
        (status = 404, description = "Unknown subject", body = ErrorResponse),
        (status = 500, description = "Upstream or token failure", body = ErrorResponse)
    )
)]
/// Return every eduPerson attribute for a subject.
///
/// # Errors
/// - 400 if `byuId` is missing or malformed.
/// - 404 if the upstream does not know the subject.
/// - 500 on upstream or token failure.
pub(crate) async fn edu_person(
    State(state): State<AppState>,
    query: SubjectParams,
) -> Result<Json<Person>, ApiError> {
    load_person(&state, query).await.map(Json)
}

#[utoipa::path(
    get,
    path = "/api/eduPersonPrimaryAffiliation",
    tag = "person",
    params(SubjectQuery),
    responses(
        (status = 200, description = "Primary affiliation, empty when none", body = PrimaryAffiliationResponse),
        (status = 400, description = "Missing or malformed byuId", body = ErrorResponse),
        (status = 404, description = "Unknown subject", body = ErrorResponse),
        (status = 500, description = "Upstream or token failure", body = ErrorResponse)
    )
)]
pub(crate) async fn primary_affiliation(
    State(state): State<AppState>,
    query: SubjectParams,
) -> Result<Json<PrimaryAffiliationResponse>, ApiError> {
    let person = load_person(&state, query).await?;
    Ok(Json(PrimaryAffiliationResponse {
        edu_person_primary_affiliation: primary_label(&person),
    }))
}

#[utoipa::path(
    get,
    path = "/api/eduPersonAffiliation",
    tag = "person",
    params(SubjectQuery),
    responses(
        (status = 200, description = "Affiliations in priority order", body = AffiliationResponse),
        (status = 400, description = "Missing or malformed byuId", body = ErrorResponse),
        (status = 404, description = "Unknown subject", body = ErrorResponse),
        (status = 500, description = "Upstream or token failure", body = ErrorResponse)
    )
)]
pub(crate) async fn affiliation(
    State(state): State<AppState>,
    query: SubjectParams,
) -> Result<Json<AffiliationResponse>, ApiError> {
    let person = load_person(&state, query).await?;
    Ok(Json(AffiliationResponse {
        edu_person_affiliation: affiliation_labels(&person),
    }))
}

#[utoipa::path(
    get,
    path = "/api/eduPersonScopedAffiliation",
    tag = "person",
    params(SubjectQuery),
    responses(
        (status = 200, description = "Realm-scoped affiliations", body = ScopedAffiliationResponse),
        (status = 400, description = "Missing or malformed byuId", body = ErrorResponse),
        (status = 404, description = "Unknown subject", body = ErrorResponse),
        (status = 500, description = "Upstream or token failure", body = ErrorResponse)
    )
)]
pub(crate) async fn scoped_affiliation(
    State(state): State<AppState>,
    query: SubjectParams,
) -> Result<Json<ScopedAffiliationResponse>, ApiError> {
    let person = load_person(&state, query).await?;
    Ok(Json(ScopedAffiliationResponse {
        edu_person_scoped_affiliation: person.scoped_affiliations,
    }))
}

#[utoipa::path(
    get,
    path = "/api/name",
    tag = "person",
    params(SubjectQuery),
    responses(
        (status = 200, description = "Display name", body = NameResponse),
        (status = 400, description = "Missing or malformed byuId", body = ErrorResponse),
        (status = 404, description = "Unknown subject", body = ErrorResponse),
        (status = 500, description = "Upstream or token failure", body = ErrorResponse)
    )
)]
pub(crate) async fn name(
    State(state): State<AppState>,
    query: SubjectParams,
) -> Result<Json<NameResponse>, ApiError> {
    let person = load_person(&state, query).await?;
    Ok(Json(NameResponse { name: person.name }))
}

#[utoipa::path(
    get,
    path = "/api/preferredFirstName",
    tag = "person",
    params(SubjectQuery),
    responses(
        (status = 200, description = "Preferred first name", body = PreferredFirstNameResponse),
        (status = 400, description = "Missing or malformed byuId", body = ErrorResponse),
        (status = 404, description = "Unknown subject", body = ErrorResponse),
        (status = 500, description = "Upstream or token failure", body = ErrorResponse)
    )
)]
pub(crate) async fn preferred_first_name(
    State(state): State<AppState>,
    query: SubjectParams,
) -> Result<Json<PreferredFirstNameResponse>, ApiError> {
    let person = load_person(&state, query).await?;
    Ok(Json(PreferredFirstNameResponse {
        preferred_first_name: person.preferred_first_name,
    }))
}

#[utoipa::path(
    get,
    path = "/api/eduPersonAll",
    tag = "person",
    params(SubjectQuery),
    responses(
        (status = 200, description = "Name and eduPerson affiliation attributes", body = EduPersonAllResponse),
        (status = 400, description = "Missing or malformed byuId", body = ErrorResponse),
        (status = 404, description = "Unknown subject", body = ErrorResponse),
        (status = 500, description = "Upstream or token failure", body = ErrorResponse)
    )
)]
/// Return the `eduPerson*`-keyed attributes together with the names.
pub(crate) async fn edu_person_all(
    State(state): State<AppState>,
    query: SubjectParams,
) -> Result<Json<EduPersonAllResponse>, ApiError> {
    let person = load_person(&state, query).await?;
    Ok(Json(EduPersonAllResponse {
        edu_person_primary_affiliation: primary_label(&person),
        edu_person_affiliation: affiliation_labels(&person),
        edu_person_scoped_affiliation: person.scoped_affiliations,
        name: person.name,
        preferred_first_name: person.preferred_first_name,
    }))
}

fn primary_label(person: &Person) -> String {
    person
        .primary_affiliation
        .map(|category| category.as_str().to_string())
        .unwrap_or_default()
}

fn affiliation_labels(person: &Person) -> Vec<String> {
    person
        .affiliations
        .iter()
        .map(|category| category.as_str().to_string())
        .collect()
}
