//! InCommon eduPerson attribute gateway library crate.
//!
//! # Purpose
//! Exposes the token lifecycle, attribute sources, person aggregation and the
//! HTTP surface for use by the binary and integration tests.
//!
//! # Notes
//! Request flow: `api` handlers validate input and call
//! `person::PersonAggregator`, which reads from an `upstream::AttributeSource`
//! and classifies memberships with `incommon_affiliation`.
pub mod api;
pub mod app;
pub mod auth;
pub mod config;
pub mod credentials;
pub mod observability;
pub mod person;
pub mod upstream;
