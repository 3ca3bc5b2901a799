use crate::AffiliationError;
use serde::{Deserialize, Serialize};

/// eduPerson affiliation vocabulary.
///
/// Declaration order is the classification priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AffiliationCategory {
    Faculty,
    Staff,
    Student,
    Alum,
    Member,
    Affiliate,
    Employee,
    Contractor,
    LibraryWalkIn,
}

impl AffiliationCategory {
    /// Canonical ordering for affiliations, scoped affiliations and primary
    /// affiliation tie-breaking.
    pub const PRIORITY: [AffiliationCategory; 9] = [
        AffiliationCategory::Faculty,
        AffiliationCategory::Staff,
        AffiliationCategory::Student,
        AffiliationCategory::Alum,
        AffiliationCategory::Member,
        AffiliationCategory::Affiliate,
        AffiliationCategory::Employee,
        AffiliationCategory::Contractor,
        AffiliationCategory::LibraryWalkIn,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            AffiliationCategory::Faculty => "faculty",
            AffiliationCategory::Staff => "staff",
            AffiliationCategory::Student => "student",
            AffiliationCategory::Alum => "alum",
            AffiliationCategory::Member => "member",
            AffiliationCategory::Affiliate => "affiliate",
            AffiliationCategory::Employee => "employee",
            AffiliationCategory::Contractor => "contractor",
            AffiliationCategory::LibraryWalkIn => "library-walk-in",
        }
    }

    /// Categories that are never derived from membership tables.
    pub fn is_pass_through(self) -> bool {
        matches!(
            self,
            AffiliationCategory::Contractor | AffiliationCategory::LibraryWalkIn
        )
    }

    /// Realm-qualified form, e.g. `staff@byu.edu`.
    pub fn scoped(self, realm: &str) -> String {
        format!("{}@{}", self.as_str(), realm)
    }
}

impl std::fmt::Display for AffiliationCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for AffiliationCategory {
    type Err = AffiliationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        AffiliationCategory::PRIORITY
            .into_iter()
            .find(|category| category.as_str() == value)
            .ok_or_else(|| AffiliationError::UnknownCategory(value.to_string()))
    }
}
