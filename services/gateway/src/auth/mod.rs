//! Upstream authentication.
//!
//! # Purpose
//! Owns the OAuth client-credentials bearer token used for every call to the
//! identity API.
pub mod token;

pub use token::{AuthError, Token, TokenManager, acquire_token};
