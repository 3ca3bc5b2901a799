//! Attribute sources for subject profiles and group memberships.
//!
//! # Purpose
//! Defines the `AttributeSource` contract the aggregator reads from, with an
//! HTTP implementation over the identity API and an in-memory one.
//!
//! # Key invariants and assumptions
//! - Absent upstream fields decode as empty strings; the source never invents
//!   values.
//! - Implementations return `UpstreamError::NotFound` for unknown subjects and
//!   never partial records.
pub mod identity;
pub mod memory;

use async_trait::async_trait;
use thiserror::Error;

pub use identity::IdentityClient;
pub use memory::StaticAttributeSource;

pub const BASIC_ENDPOINT: &str = "basic";
pub const MEMBERSHIPS_ENDPOINT: &str = "group_memberships";

/// Flat view of a subject's basic profile.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BasicProfile {
    pub net_id: String,
    pub preferred_first_name: String,
    pub first_name: String,
    pub middle_name: String,
    pub surname: String,
    pub byu_internal_email: String,
    pub student_email_address: String,
    pub personal_email: String,
    /// Upstream primary-affiliation value, used only as a classification hint.
    pub primary_affiliation: String,
}

#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("subject not found at {endpoint}")]
    NotFound { endpoint: &'static str },
    #[error("{endpoint} rejected the access token with status {status}")]
    Unauthorized { endpoint: &'static str, status: u16 },
    #[error("{endpoint} returned status {status}")]
    Status { endpoint: &'static str, status: u16 },
    #[error("decode {endpoint} response: {source}")]
    Decode {
        endpoint: &'static str,
        #[source]
        source: serde_json::Error,
    },
    #[error("{endpoint} request failed: {source}")]
    Http {
        endpoint: &'static str,
        #[source]
        source: reqwest::Error,
    },
}

impl UpstreamError {
    pub fn endpoint(&self) -> &'static str {
        match self {
            UpstreamError::NotFound { endpoint }
            | UpstreamError::Unauthorized { endpoint, .. }
            | UpstreamError::Status { endpoint, .. }
            | UpstreamError::Decode { endpoint, .. }
            | UpstreamError::Http { endpoint, .. } => endpoint,
        }
    }

    /// HTTP status returned by the upstream, when there was one.
    pub fn status(&self) -> Option<u16> {
        match self {
            UpstreamError::NotFound { .. } => Some(404),
            UpstreamError::Unauthorized { status, .. } | UpstreamError::Status { status, .. } => {
                Some(*status)
            }
            UpstreamError::Decode { .. } => None,
            UpstreamError::Http { source, .. } => source.status().map(|status| status.as_u16()),
        }
    }
}

pub type UpstreamResult<T> = Result<T, UpstreamError>;

/// Read-only source of subject attributes.
///
/// A relational backend would fill `BasicProfile` from a profile row and the
/// membership list from membership rows.
#[async_trait]
pub trait AttributeSource: Send + Sync {
    async fn basic_profile(&self, subject_id: &str) -> UpstreamResult<BasicProfile>;
    async fn group_memberships(&self, subject_id: &str) -> UpstreamResult<Vec<String>>;
}
