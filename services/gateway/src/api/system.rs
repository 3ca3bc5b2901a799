//! Help, health and API description handlers.
//!
//! # Key invariants and assumptions
//! - These endpoints never call the upstream and never fail.
//!
//! # Security considerations
//! - Health reports only the token issue time and failure count, never the
//!   token itself.
use crate::api::openapi::ApiDoc;
use crate::api::types::HealthStatus;
use crate::app::AppState;
use axum::Json;
use axum::extract::State;
use axum::response::Html;
use utoipa::OpenApi;

const HELP_PAGE: &str = r#"<!DOCTYPE html>
<html>
<head>
    <title>InCommon attribute gateway</title>
</head>
<body>
    <h1>InCommon attribute gateway</h1>
    <p>Every attribute endpoint takes a <code>byuId</code> query parameter.</p>
    <ul>
        <li><code>GET /api/eduPerson?byuId=</code> all eduPerson attributes</li>
        <li><code>GET /api/eduPersonPrimaryAffiliation?byuId=</code></li>
        <li><code>GET /api/eduPersonAffiliation?byuId=</code></li>
        <li><code>GET /api/eduPersonScopedAffiliation?byuId=</code></li>
        <li><code>GET /api/name?byuId=</code></li>
        <li><code>GET /api/preferredFirstName?byuId=</code></li>
        <li><code>GET /api/eduPersonAll?byuId=</code> names and eduPerson affiliations</li>
        <li><code>GET /api/health</code> service and token status</li>
        <li><code>GET /api/openapi.json</code> OpenAPI description</li>
    </ul>
</body>
</html>
"#;

#[utoipa::path(
    get,
    path = "/api/help",
    tag = "system",
    responses(
        (status = 200, description = "Static usage page", content_type = "text/html", body = String)
    )
)]
pub(crate) async fn help() -> Html<&'static str> {
    Html(HELP_PAGE)
}

#[utoipa::path(
    get,
    path = "/api/health",
    tag = "system",
    responses(
        (status = 200, description = "Gateway health and token status", body = HealthStatus)
    )
)]
/// Report liveness and the state of the upstream token.
///
/// # What it does
/// Returns `ok` with the issue time of the current token and the number of
/// failed renewals. Both are read from memory.
pub(crate) async fn health(State(state): State<AppState>) -> Json<HealthStatus> {
    let (token_acquired_at, renewal_failures) = match &state.tokens {
        Some(tokens) => (
            Some(tokens.snapshot().acquired_at().to_rfc3339()),
            tokens.renewal_failures(),
        ),
        None => (None, 0),
    };
    Json(HealthStatus {
        status: "ok".to_string(),
        token_acquired_at,
        renewal_failures,
    })
}

pub(crate) async fn openapi() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
