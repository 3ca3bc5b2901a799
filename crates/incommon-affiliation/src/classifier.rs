use crate::{AffiliationCategory, AffiliationError, AffiliationResult, ClassificationTables};
use std::collections::HashSet;

/// Result of classifying one subject's memberships.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Classification {
    /// Present categories in priority order.
    pub affiliations: Vec<AffiliationCategory>,
    /// `affiliations[i]` suffixed with `@realm`.
    pub scoped: Vec<String>,
    /// First present category, if any.
    pub primary: Option<AffiliationCategory>,
}

impl Classification {
    pub fn is_empty(&self) -> bool {
        self.affiliations.is_empty()
    }
}

/// Pure mapping from raw group memberships to eduPerson affiliations.
#[derive(Debug, Clone)]
pub struct AffiliationClassifier {
    tables: ClassificationTables,
    realm: String,
}

impl AffiliationClassifier {
    /// Create a classifier scoped to `realm` (for example `byu.edu`).
    ///
    /// # Errors
    /// - `AffiliationError::InvalidRealm` if the realm is empty or contains `@`
    ///   or whitespace.
    pub fn new(tables: ClassificationTables, realm: impl Into<String>) -> AffiliationResult<Self> {
        let realm = realm.into();
        if realm.is_empty() || realm.contains('@') || realm.chars().any(char::is_whitespace) {
            return Err(AffiliationError::InvalidRealm(realm));
        }
        Ok(Self { tables, realm })
    }

    pub fn realm(&self) -> &str {
        &self.realm
    }

    pub fn tables(&self) -> &ClassificationTables {
        &self.tables
    }

    /// Classify a set of raw memberships.
    ///
    /// `primary_hint` is the upstream primary-affiliation value, if the source
    /// provides one. Only `contractor` and `library-walk-in` are taken from it;
    /// every other category comes from the membership tables.
    pub fn classify<I, S>(&self, memberships: I, primary_hint: Option<&str>) -> Classification
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let memberships: Vec<S> = memberships.into_iter().collect();
        let unique: HashSet<&str> = memberships.iter().map(|group| group.as_ref()).collect();

        let hinted = primary_hint
            .and_then(|hint| hint.trim().parse::<AffiliationCategory>().ok())
            .filter(|category| category.is_pass_through());

        let mut affiliations = Vec::new();
        for category in AffiliationCategory::PRIORITY {
            let present = match self.tables.table(category) {
                // OR over every membership; no early exit so the result cannot
                // depend on iteration order.
                Some(table) => unique
                    .iter()
                    .fold(false, |acc, group| acc | table.contains(group)),
                None => hinted == Some(category),
            };
            if present {
                affiliations.push(category);
            }
        }

        let scoped = affiliations
            .iter()
            .map(|category| category.scoped(&self.realm))
            .collect();
        let primary = affiliations.first().copied();
        Classification {
            affiliations,
            scoped,
            primary,
        }
    }
}
