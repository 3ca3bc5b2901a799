//! Gateway HTTP API module.
//!
//! # Purpose
//! Exposes the eduPerson attribute handlers, system endpoints, and the shared
//! error and payload types.
pub mod error;
pub mod openapi;
pub mod person;
pub mod system;
pub mod types;
