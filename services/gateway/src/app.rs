//! Gateway HTTP application wiring.
//!
//! # Purpose
//! Builds the Axum router, configures tracing middleware, and defines the
//! shared state injected into handlers.
use crate::api;
use crate::auth::TokenManager;
use crate::observability;
use crate::person::PersonAggregator;
use axum::Router;
use axum::routing::get;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

#[derive(Clone)]
pub struct AppState {
    pub aggregator: Arc<PersonAggregator>,
    /// Absent when the attribute source does not need an upstream token.
    pub tokens: Option<Arc<TokenManager>>,
}

pub fn build_router(state: AppState) -> Router {
    let trace_layer = TraceLayer::new_for_http().make_span_with(observability::request_span);

    Router::new()
        .route("/api/eduPerson", get(api::person::edu_person))
        .route(
            "/api/eduPersonPrimaryAffiliation",
            get(api::person::primary_affiliation),
        )
        .route("/api/eduPersonAffiliation", get(api::person::affiliation))
        .route(
            "/api/eduPersonScopedAffiliation",
            get(api::person::scoped_affiliation),
        )
        .route("/api/name", get(api::person::name))
        .route(
            "/api/preferredFirstName",
            get(api::person::preferred_first_name),
        )
        .route("/api/eduPersonAll", get(api::person::edu_person_all))
        .route("/api/help", get(api::system::help))
        .route("/api/health", get(api::system::health))
        .route("/api/openapi.json", get(api::system::openapi))
        .layer(trace_layer)
        .with_state(state)
}
