//! eduPerson affiliation classification shared by the attribute gateway.
//!
//! # Purpose
//! Maps an unordered set of raw group-membership strings onto the fixed
//! eduPerson affiliation vocabulary, derives realm-scoped variants, and picks a
//! single primary affiliation.
//!
//! # How it fits
//! The gateway service fetches raw memberships from the upstream identity API
//! and hands them to [`AffiliationClassifier`]. This crate performs no I/O.
//!
//! # Key invariants
//! - Affiliations are always emitted in [`AffiliationCategory::PRIORITY`] order.
//! - `scoped[i] == affiliations[i] + "@" + realm` for every index.
//! - The primary affiliation is the first present category, if any.
//! - Classification does not depend on input order or duplicates.
//!
//! # Examples
//! ```rust
//! use incommon_affiliation::{AffiliationCategory, AffiliationClassifier, ClassificationTables};
//!
//! let classifier = AffiliationClassifier::new(ClassificationTables::byu_default(), "byu.edu")
//!     .expect("realm");
//! let result = classifier.classify(["FULL TIME STAFF", "GRADUATED ALUMNI"], None);
//! assert_eq!(result.primary, Some(AffiliationCategory::Staff));
//! assert_eq!(result.scoped[0], "staff@byu.edu");
//! ```
//!
//! # Common pitfalls
//! - `contractor` and `library-walk-in` have no membership tables; they only
//!   appear when the caller passes them as the upstream primary-affiliation hint.

mod category;
mod classifier;
mod errors;
mod tables;

pub use category::AffiliationCategory;
pub use classifier::{AffiliationClassifier, Classification};
pub use errors::{AffiliationError, AffiliationResult};
pub use tables::{ClassificationTables, MembershipTable};
