//! In-memory attribute source for tests and local runs.
use crate::upstream::{
    AttributeSource, BASIC_ENDPOINT, BasicProfile, MEMBERSHIPS_ENDPOINT, UpstreamError,
    UpstreamResult,
};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

#[derive(Debug, Clone)]
struct SubjectRecord {
    profile: BasicProfile,
    memberships: Vec<String>,
}

/// Fixed subject table. Clones share the lookup counter.
#[derive(Debug, Clone, Default)]
pub struct StaticAttributeSource {
    subjects: HashMap<String, SubjectRecord>,
    lookups: Arc<AtomicUsize>,
}

impl StaticAttributeSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_subject<I, S>(mut self, subject_id: &str, profile: BasicProfile, memberships: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.insert(subject_id, profile, memberships);
        self
    }

    pub fn insert<I, S>(&mut self, subject_id: &str, profile: BasicProfile, memberships: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.subjects.insert(
            subject_id.to_string(),
            SubjectRecord {
                profile,
                memberships: memberships.into_iter().map(Into::into).collect(),
            },
        );
    }

    /// Number of `AttributeSource` calls served so far.
    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }

    fn record(&self, subject_id: &str, endpoint: &'static str) -> UpstreamResult<&SubjectRecord> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        self.subjects
            .get(subject_id)
            .ok_or(UpstreamError::NotFound { endpoint })
    }
}

#[async_trait]
impl AttributeSource for StaticAttributeSource {
    async fn basic_profile(&self, subject_id: &str) -> UpstreamResult<BasicProfile> {
        self.record(subject_id, BASIC_ENDPOINT)
            .map(|record| record.profile.clone())
    }

    async fn group_memberships(&self, subject_id: &str) -> UpstreamResult<Vec<String>> {
        self.record(subject_id, MEMBERSHIPS_ENDPOINT)
            .map(|record| record.memberships.clone())
    }
}
