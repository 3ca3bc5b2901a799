//! Person assembly from an attribute source and the affiliation classifier.
//!
//! # Purpose and responsibility
//! Fetches a subject's profile and memberships concurrently, classifies the
//! memberships and returns one normalized `Person`.
//!
//! # Key invariants and assumptions
//! - Either both upstream reads succeed and a complete `Person` is returned,
//!   or an error is returned. No partial record escapes.
//! - `scoped_affiliations[i] == affiliations[i] + "@" + realm`.
//! - `Person` values are built per call and never cached.
use crate::observability;
use crate::upstream::{AttributeSource, BASIC_ENDPOINT, BasicProfile, UpstreamError};
use incommon_affiliation::{AffiliationCategory, AffiliationClassifier};
use serde::{Serialize, Serializer};
use std::sync::Arc;
use thiserror::Error;
use utoipa::ToSchema;

/// eduPerson attribute bundle returned to callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Person {
    pub net_id: String,
    /// `netId@realm`, empty when `netId` is empty.
    pub net_id_scoped: String,
    pub email_addresses: Vec<String>,
    /// Serialized as `""` when the subject has no affiliation.
    #[serde(serialize_with = "serialize_primary")]
    #[schema(value_type = String, example = "staff")]
    pub primary_affiliation: Option<AffiliationCategory>,
    #[schema(value_type = Vec<String>, example = json!(["staff", "member", "employee"]))]
    pub affiliations: Vec<AffiliationCategory>,
    pub scoped_affiliations: Vec<String>,
    pub name: String,
    pub preferred_first_name: String,
}

fn serialize_primary<S>(value: &Option<AffiliationCategory>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(value.map(AffiliationCategory::as_str).unwrap_or(""))
}

#[derive(Debug, Error)]
pub enum AggregateError {
    #[error("subject {subject_id} not found")]
    NotFound { subject_id: String },
    #[error("upstream rejected the access token while reading subject {subject_id}: {source}")]
    Auth {
        subject_id: String,
        #[source]
        source: UpstreamError,
    },
    #[error("upstream failure while reading subject {subject_id}: {source}")]
    Upstream {
        subject_id: String,
        #[source]
        source: UpstreamError,
    },
}

impl AggregateError {
    fn from_upstream(subject_id: &str, err: UpstreamError) -> Self {
        let subject_id = subject_id.to_string();
        match err {
            UpstreamError::NotFound {
                endpoint: BASIC_ENDPOINT,
            } => AggregateError::NotFound { subject_id },
            UpstreamError::Unauthorized { .. } => AggregateError::Auth {
                subject_id,
                source: err,
            },
            other => AggregateError::Upstream {
                subject_id,
                source: other,
            },
        }
    }

    pub fn subject_id(&self) -> &str {
        match self {
            AggregateError::NotFound { subject_id }
            | AggregateError::Auth { subject_id, .. }
            | AggregateError::Upstream { subject_id, .. } => subject_id,
        }
    }

    /// Failing upstream call, if the error came from one.
    pub fn upstream(&self) -> Option<&UpstreamError> {
        match self {
            AggregateError::NotFound { .. } => None,
            AggregateError::Auth { source, .. } | AggregateError::Upstream { source, .. } => {
                Some(source)
            }
        }
    }

    fn outcome(&self) -> &'static str {
        match self {
            AggregateError::NotFound { .. } => "not_found",
            AggregateError::Auth { .. } => "auth_error",
            AggregateError::Upstream { .. } => "upstream_error",
        }
    }
}

/// Joins an attribute source and a classifier into `Person` records.
#[derive(Clone)]
pub struct PersonAggregator {
    source: Arc<dyn AttributeSource>,
    classifier: Arc<AffiliationClassifier>,
}

impl PersonAggregator {
    pub fn new(source: Arc<dyn AttributeSource>, classifier: AffiliationClassifier) -> Self {
        Self {
            source,
            classifier: Arc::new(classifier),
        }
    }

    pub fn realm(&self) -> &str {
        self.classifier.realm()
    }

    /// Fetch and assemble the `Person` for `subject_id`.
    ///
    /// # Errors
    /// - `AggregateError::NotFound` if the basic profile lookup reports the
    ///   subject as unknown. A 404 from the memberships endpoint alone is an
    ///   upstream failure.
    /// - `AggregateError::Auth` if the upstream rejected the access token.
    /// - `AggregateError::Upstream` for any other upstream failure.
    pub async fn aggregate(&self, subject_id: &str) -> Result<Person, AggregateError> {
        // A memberships 404 must not short-circuit: the profile result decides
        // whether the subject exists.
        let memberships = async {
            match self.source.group_memberships(subject_id).await {
                Err(err @ UpstreamError::NotFound { .. }) => Ok(Err(err)),
                other => other.map(Ok),
            }
        };
        let result = tokio::try_join!(self.source.basic_profile(subject_id), memberships)
            .and_then(|(profile, memberships)| memberships.map(|groups| (profile, groups)));
        let outcome = match result {
            Ok((profile, memberships)) => Ok(self.assemble(profile, &memberships)),
            Err(err) => Err(AggregateError::from_upstream(subject_id, err)),
        };
        let label = match &outcome {
            Ok(_) => "ok",
            Err(err) => err.outcome(),
        };
        metrics::counter!(observability::PERSON_REQUESTS_TOTAL, "outcome" => label).increment(1);
        outcome
    }

    /// Build a `Person` from already fetched attributes.
    pub fn assemble(&self, profile: BasicProfile, memberships: &[String]) -> Person {
        let hint = Some(profile.primary_affiliation.trim()).filter(|hint| !hint.is_empty());
        let classification = self.classifier.classify(memberships, hint);

        let net_id = profile.net_id.trim().to_string();
        let net_id_scoped = if net_id.is_empty() {
            String::new()
        } else {
            format!("{}@{}", net_id, self.classifier.realm())
        };
        let name = [&profile.first_name, &profile.middle_name, &profile.surname]
            .into_iter()
            .flat_map(|part| part.split_whitespace())
            .collect::<Vec<_>>()
            .join(" ");
        let email_addresses = [
            profile.byu_internal_email,
            profile.student_email_address,
            profile.personal_email,
        ]
        .into_iter()
        .map(|email| email.trim().to_string())
        .filter(|email| !email.is_empty())
        .collect();

        Person {
            net_id,
            net_id_scoped,
            email_addresses,
            primary_affiliation: classification.primary,
            affiliations: classification.affiliations,
            scoped_affiliations: classification.scoped,
            name,
            preferred_first_name: profile.preferred_first_name.trim().to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::upstream::{MEMBERSHIPS_ENDPOINT, StaticAttributeSource, UpstreamResult};
    use async_trait::async_trait;
    use incommon_affiliation::ClassificationTables;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn classifier() -> AffiliationClassifier {
        AffiliationClassifier::new(ClassificationTables::byu_default(), "byu.edu").expect("realm")
    }

    fn jane() -> BasicProfile {
        BasicProfile {
            net_id: "jdoe".to_string(),
            preferred_first_name: "Janie".to_string(),
            first_name: "Jane".to_string(),
            middle_name: "".to_string(),
            surname: "Doe".to_string(),
            byu_internal_email: "jane_doe@byu.edu".to_string(),
            student_email_address: "".to_string(),
            personal_email: "jane@example.com".to_string(),
            primary_affiliation: "".to_string(),
        }
    }

    fn aggregator(source: StaticAttributeSource) -> PersonAggregator {
        PersonAggregator::new(Arc::new(source), classifier())
    }

    #[tokio::test]
    async fn aggregates_profile_and_memberships() {
        let source = StaticAttributeSource::new().with_subject(
            "123456789",
            jane(),
            ["FULL TIME STAFF", "GRADUATED ALUMNI"],
        );
        let person = aggregator(source).aggregate("123456789").await.expect("person");
        assert_eq!(person.net_id, "jdoe");
        assert_eq!(person.net_id_scoped, "jdoe@byu.edu");
        assert_eq!(person.name, "Jane Doe");
        assert_eq!(person.preferred_first_name, "Janie");
        assert_eq!(
            person.email_addresses,
            vec!["jane_doe@byu.edu", "jane@example.com"]
        );
        assert_eq!(person.primary_affiliation, Some(AffiliationCategory::Staff));
        assert_eq!(
            person.scoped_affiliations,
            vec![
                "staff@byu.edu",
                "alum@byu.edu",
                "member@byu.edu",
                "affiliate@byu.edu",
                "employee@byu.edu"
            ]
        );
    }

    #[test]
    fn name_collapses_empty_and_extra_whitespace() {
        let profile = BasicProfile {
            first_name: "  Mary ".to_string(),
            middle_name: "Ann  Lee".to_string(),
            surname: "".to_string(),
            ..BasicProfile::default()
        };
        let person = aggregator(StaticAttributeSource::new()).assemble(profile, &[]);
        assert_eq!(person.name, "Mary Ann Lee");
        assert_eq!(person.net_id_scoped, "");
        assert!(person.email_addresses.is_empty());
    }

    #[test]
    fn email_order_is_internal_student_personal() {
        let profile = BasicProfile {
            byu_internal_email: "internal@byu.edu".to_string(),
            student_email_address: "student@byu.edu".to_string(),
            personal_email: "me@example.com".to_string(),
            ..BasicProfile::default()
        };
        let person = aggregator(StaticAttributeSource::new()).assemble(profile, &[]);
        assert_eq!(
            person.email_addresses,
            vec!["internal@byu.edu", "student@byu.edu", "me@example.com"]
        );
    }

    #[test]
    fn primary_hint_feeds_pass_through_categories() {
        let profile = BasicProfile {
            primary_affiliation: "library-walk-in".to_string(),
            ..jane()
        };
        let person = aggregator(StaticAttributeSource::new()).assemble(profile, &[]);
        assert_eq!(person.affiliations, vec![AffiliationCategory::LibraryWalkIn]);
        assert_eq!(person.scoped_affiliations, vec!["library-walk-in@byu.edu"]);
    }

    #[test]
    fn empty_primary_serializes_as_empty_string() {
        let person = aggregator(StaticAttributeSource::new()).assemble(jane(), &[]);
        let json = serde_json::to_value(&person).expect("serialize");
        assert_eq!(json["primaryAffiliation"], "");
        assert_eq!(json["affiliations"], serde_json::json!([]));
        assert_eq!(json["netIdScoped"], "jdoe@byu.edu");
        assert_eq!(json["emailAddresses"][0], "jane_doe@byu.edu");
    }

    #[tokio::test]
    async fn unknown_subject_is_not_found() {
        let err = aggregator(StaticAttributeSource::new())
            .aggregate("000000000")
            .await
            .unwrap_err();
        assert!(matches!(err, AggregateError::NotFound { .. }));
        assert_eq!(err.subject_id(), "000000000");
        assert!(err.upstream().is_none());
    }

    struct FailingMemberships {
        status: u16,
        profile_calls: AtomicUsize,
    }

    #[async_trait]
    impl AttributeSource for FailingMemberships {
        async fn basic_profile(&self, _subject_id: &str) -> UpstreamResult<BasicProfile> {
            tokio::time::sleep(Duration::from_millis(20)).await;
            self.profile_calls.fetch_add(1, Ordering::SeqCst);
            Ok(jane())
        }

        async fn group_memberships(&self, _subject_id: &str) -> UpstreamResult<Vec<String>> {
            if self.status == 401 || self.status == 403 {
                Err(UpstreamError::Unauthorized {
                    endpoint: MEMBERSHIPS_ENDPOINT,
                    status: self.status,
                })
            } else {
                Err(UpstreamError::Status {
                    endpoint: MEMBERSHIPS_ENDPOINT,
                    status: self.status,
                })
            }
        }
    }

    #[tokio::test]
    async fn rejected_token_maps_to_auth_error() {
        let source = Arc::new(FailingMemberships {
            status: 401,
            profile_calls: AtomicUsize::new(0),
        });
        let aggregator = PersonAggregator::new(source, classifier());
        let err = aggregator.aggregate("123456789").await.unwrap_err();
        assert!(matches!(err, AggregateError::Auth { .. }));
        assert_eq!(err.upstream().and_then(UpstreamError::status), Some(401));
    }

    #[tokio::test]
    async fn upstream_failure_fails_fast_without_partial_person() {
        let source = Arc::new(FailingMemberships {
            status: 502,
            profile_calls: AtomicUsize::new(0),
        });
        let aggregator = PersonAggregator::new(source.clone(), classifier());
        let err = aggregator.aggregate("123456789").await.unwrap_err();
        assert!(matches!(err, AggregateError::Upstream { .. }));
        assert_eq!(err.upstream().map(UpstreamError::endpoint), Some(MEMBERSHIPS_ENDPOINT));
        // try_join! drops the slower profile future once memberships fails.
        assert_eq!(source.profile_calls.load(Ordering::SeqCst), 0);
    }

    struct MissingMemberships {
        profile_found: bool,
    }

    #[async_trait]
    impl AttributeSource for MissingMemberships {
        async fn basic_profile(&self, _subject_id: &str) -> UpstreamResult<BasicProfile> {
            tokio::time::sleep(Duration::from_millis(20)).await;
            if self.profile_found {
                Ok(jane())
            } else {
                Err(UpstreamError::NotFound {
                    endpoint: BASIC_ENDPOINT,
                })
            }
        }

        async fn group_memberships(&self, _subject_id: &str) -> UpstreamResult<Vec<String>> {
            Err(UpstreamError::NotFound {
                endpoint: MEMBERSHIPS_ENDPOINT,
            })
        }
    }

    #[tokio::test]
    async fn memberships_404_for_known_profile_is_upstream_error() {
        let aggregator = PersonAggregator::new(
            Arc::new(MissingMemberships {
                profile_found: true,
            }),
            classifier(),
        );
        let err = aggregator.aggregate("123456789").await.unwrap_err();
        assert!(matches!(err, AggregateError::Upstream { .. }), "{err:?}");
        assert_eq!(err.upstream().map(UpstreamError::endpoint), Some(MEMBERSHIPS_ENDPOINT));
        assert_eq!(err.upstream().and_then(UpstreamError::status), Some(404));
    }

    #[tokio::test]
    async fn unknown_subject_is_not_found_when_memberships_answer_first() {
        let aggregator = PersonAggregator::new(
            Arc::new(MissingMemberships {
                profile_found: false,
            }),
            classifier(),
        );
        let err = aggregator.aggregate("000000000").await.unwrap_err();
        assert!(matches!(err, AggregateError::NotFound { .. }), "{err:?}");
    }
}
