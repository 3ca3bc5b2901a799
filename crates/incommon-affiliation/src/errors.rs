use thiserror::Error;

#[derive(Debug, Error)]
pub enum AffiliationError {
    #[error("unknown affiliation category: {0}")]
    UnknownCategory(String),
    #[error("category {0} is pass-through only and cannot have a membership table")]
    PassThroughCategory(String),
    #[error("invalid realm: {0:?}")]
    InvalidRealm(String),
    #[error("read affiliation tables {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("parse affiliation tables: {0}")]
    Parse(#[from] serde_yaml::Error),
}

pub type AffiliationResult<T> = Result<T, AffiliationError>;
