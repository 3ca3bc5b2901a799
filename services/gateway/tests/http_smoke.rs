mod common;

use async_trait::async_trait;
use axum::http::StatusCode;
use common::{read_json, read_text};
use gateway::app::{AppState, build_router};
use gateway::person::PersonAggregator;
use gateway::upstream::{
    AttributeSource, BASIC_ENDPOINT, BasicProfile, StaticAttributeSource, UpstreamError,
    UpstreamResult,
};
use http_helpers::get_request;
use incommon_affiliation::{AffiliationClassifier, ClassificationTables};
use std::sync::Arc;
use tower::ServiceExt;

const STAFF_ALUM: &str = "123456789";
const NO_GROUPS: &str = "987654321";
const CONTRACTOR: &str = "555000111";

fn fixtures() -> StaticAttributeSource {
    StaticAttributeSource::new()
        .with_subject(
            STAFF_ALUM,
            BasicProfile {
                net_id: "jdoe".to_string(),
                preferred_first_name: "Janie".to_string(),
                first_name: "Jane".to_string(),
                middle_name: "Q".to_string(),
                surname: "Doe".to_string(),
                byu_internal_email: "jane_doe@byu.edu".to_string(),
                student_email_address: "".to_string(),
                personal_email: "jane@example.com".to_string(),
                primary_affiliation: "staff".to_string(),
            },
            ["GRADUATED ALUMNI", "FULL TIME STAFF", "CHESS CLUB"],
        )
        .with_subject(
            NO_GROUPS,
            BasicProfile {
                net_id: "".to_string(),
                first_name: "Sam".to_string(),
                ..BasicProfile::default()
            },
            Vec::<String>::new(),
        )
        .with_subject(
            CONTRACTOR,
            BasicProfile {
                net_id: "cwork".to_string(),
                first_name: "Casey".to_string(),
                surname: "Worker".to_string(),
                primary_affiliation: "contractor".to_string(),
                ..BasicProfile::default()
            },
            Vec::<String>::new(),
        )
}

fn app_with_source(
    source: Arc<dyn AttributeSource>,
) -> axum::routing::RouterIntoService<axum::body::Body, ()> {
    let classifier =
        AffiliationClassifier::new(ClassificationTables::byu_default(), "byu.edu").expect("realm");
    let state = AppState {
        aggregator: Arc::new(PersonAggregator::new(source, classifier)),
        tokens: None,
    };
    build_router(state).into_service()
}

fn app() -> (
    axum::routing::RouterIntoService<axum::body::Body, ()>,
    StaticAttributeSource,
) {
    let source = fixtures();
    (app_with_source(Arc::new(source.clone())), source)
}

#[tokio::test]
async fn edu_person_returns_full_bundle() {
    let (app, _) = app();
    let response = app
        .oneshot(get_request(&format!("/api/eduPerson?byuId={STAFF_ALUM}")))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json(response).await;
    assert_eq!(
        body,
        serde_json::json!({
            "netId": "jdoe",
            "netIdScoped": "jdoe@byu.edu",
            "emailAddresses": ["jane_doe@byu.edu", "jane@example.com"],
            "primaryAffiliation": "staff",
            "affiliations": ["staff", "alum", "member", "affiliate", "employee"],
            "scopedAffiliations": [
                "staff@byu.edu",
                "alum@byu.edu",
                "member@byu.edu",
                "affiliate@byu.edu",
                "employee@byu.edu"
            ],
            "name": "Jane Q Doe",
            "preferredFirstName": "Janie"
        })
    );
}

#[tokio::test]
async fn subject_without_memberships_has_empty_affiliations() {
    let (app, _) = app();
    let response = app
        .oneshot(get_request(&format!("/api/eduPerson?byuId={NO_GROUPS}")))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json(response).await;
    assert_eq!(body["affiliations"], serde_json::json!([]));
    assert_eq!(body["scopedAffiliations"], serde_json::json!([]));
    assert_eq!(body["primaryAffiliation"], "");
    assert_eq!(body["netIdScoped"], "");
    assert_eq!(body["name"], "Sam");
}

#[tokio::test]
async fn missing_or_malformed_byu_id_is_rejected_before_lookup() {
    let (app, source) = app();
    for uri in [
        "/api/eduPerson",
        "/api/eduPerson?byuId=",
        "/api/eduPerson?byuId=..%2Fadmin",
        "/api/eduPerson?netId=jdoe",
        "/api/name",
        "/api/eduPersonAffiliation?byuId=a%20b",
    ] {
        let response = app
            .clone()
            .oneshot(get_request(uri))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "uri {uri}");
        let body = read_json(response).await;
        assert_eq!(body["code"], "validation_error");
    }
    assert_eq!(source.lookups(), 0);
}

#[tokio::test]
async fn undecodable_query_gets_json_validation_error() {
    let (app, source) = app();
    for uri in [
        "/api/eduPerson?byuId=123456789&byuId=987654321",
        "/api/eduPersonAll?byuId=1&byuId=2",
    ] {
        let response = app
            .clone()
            .oneshot(get_request(uri))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "uri {uri}");
        let content_type = response
            .headers()
            .get("content-type")
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default()
            .to_string();
        assert!(content_type.starts_with("application/json"), "uri {uri}");
        let body = read_json(response).await;
        assert_eq!(body["code"], "validation_error");
    }
    assert_eq!(source.lookups(), 0);
}

#[tokio::test]
async fn edu_person_all_returns_keyed_bundle() {
    let (app, _) = app();
    let response = app
        .oneshot(get_request(&format!("/api/eduPersonAll?byuId={STAFF_ALUM}")))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        read_json(response).await,
        serde_json::json!({
            "name": "Jane Q Doe",
            "preferredFirstName": "Janie",
            "eduPersonPrimaryAffiliation": "staff",
            "eduPersonAffiliation": ["staff", "alum", "member", "affiliate", "employee"],
            "eduPersonScopedAffiliation": [
                "staff@byu.edu",
                "alum@byu.edu",
                "member@byu.edu",
                "affiliate@byu.edu",
                "employee@byu.edu"
            ]
        })
    );
}

#[tokio::test]
async fn unknown_subject_is_not_found() {
    let (app, _) = app();
    let response = app
        .oneshot(get_request("/api/eduPerson?byuId=000000000"))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = read_json(response).await;
    assert_eq!(body["code"], "not_found");
}

#[tokio::test]
async fn single_attribute_endpoints() {
    let (app, _) = app();
    let cases = [
        (
            format!("/api/eduPersonPrimaryAffiliation?byuId={STAFF_ALUM}"),
            serde_json::json!({"eduPersonPrimaryAffiliation": "staff"}),
        ),
        (
            format!("/api/eduPersonAffiliation?byuId={STAFF_ALUM}"),
            serde_json::json!({
                "eduPersonAffiliation": ["staff", "alum", "member", "affiliate", "employee"]
            }),
        ),
        (
            format!("/api/eduPersonScopedAffiliation?byuId={CONTRACTOR}"),
            serde_json::json!({"eduPersonScopedAffiliation": ["contractor@byu.edu"]}),
        ),
        (
            format!("/api/name?byuId={CONTRACTOR}"),
            serde_json::json!({"name": "Casey Worker"}),
        ),
        (
            format!("/api/preferredFirstName?byuId={STAFF_ALUM}"),
            serde_json::json!({"preferredFirstName": "Janie"}),
        ),
        (
            format!("/api/eduPersonPrimaryAffiliation?byuId={NO_GROUPS}"),
            serde_json::json!({"eduPersonPrimaryAffiliation": ""}),
        ),
    ];
    for (uri, expected) in cases {
        let response = app
            .clone()
            .oneshot(get_request(&uri))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK, "uri {uri}");
        assert_eq!(read_json(response).await, expected, "uri {uri}");
    }
}

struct BrokenSource {
    error: fn() -> UpstreamError,
}

#[async_trait]
impl AttributeSource for BrokenSource {
    async fn basic_profile(&self, _subject_id: &str) -> UpstreamResult<BasicProfile> {
        Err((self.error)())
    }

    async fn group_memberships(&self, _subject_id: &str) -> UpstreamResult<Vec<String>> {
        Ok(vec!["FULL TIME STAFF".to_string()])
    }
}

#[tokio::test]
async fn upstream_and_token_failures_are_opaque_500s() {
    let failures: [fn() -> UpstreamError; 2] = [
        || UpstreamError::Unauthorized {
            endpoint: BASIC_ENDPOINT,
            status: 401,
        },
        || UpstreamError::Status {
            endpoint: BASIC_ENDPOINT,
            status: 502,
        },
    ];
    for error in failures {
        let app = app_with_source(Arc::new(BrokenSource { error }));
        let response = app
            .oneshot(get_request("/api/eduPerson?byuId=123456789"))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = read_json(response).await;
        assert_eq!(body["code"], "internal");
        let message = body["message"].as_str().expect("message");
        assert!(!message.contains("401") && !message.contains("502"));
    }
}

#[tokio::test]
async fn help_page_is_html() {
    let (app, source) = app();
    let response = app
        .oneshot(get_request("/api/help"))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    let content_type = response
        .headers()
        .get("content-type")
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_string();
    assert!(content_type.starts_with("text/html"));
    let body = read_text(response).await;
    assert!(body.contains("/api/eduPerson?byuId="));
    assert_eq!(source.lookups(), 0);
}

#[tokio::test]
async fn health_without_token_manager() {
    let (app, _) = app();
    let response = app
        .oneshot(get_request("/api/health"))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json(response).await;
    assert_eq!(body["status"], "ok");
    assert!(body["token_acquired_at"].is_null());
    assert_eq!(body["renewal_failures"], 0);
}

#[tokio::test]
async fn openapi_document_is_served() {
    let (app, _) = app();
    let response = app
        .oneshot(get_request("/api/openapi.json"))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json(response).await;
    assert_eq!(body["info"]["title"], "incommon-gateway");
    assert!(body["paths"]["/api/eduPerson"]["get"].is_object());
}

#[tokio::test]
async fn unknown_route_is_404() {
    let (app, _) = app();
    let response = app
        .oneshot(get_request("/api/eduPersonEntitlement?byuId=123456789"))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
