use crate::{AffiliationCategory, AffiliationError, AffiliationResult};
use std::collections::{BTreeMap, HashSet};
use std::path::Path;

const BYU_FACULTY: &[&str] = &[
    "FULL TIME FACULTY",
    "CES PERSONNEL",
    "ROTC",
    "POST DOC",
    "VISITING FACULTY",
    "VISITING SCHOLAR",
    "PART TIME FACULTY",
    "AFFILIATE FACULTY",
];

const BYU_STAFF: &[&str] = &[
    "FULL TIME STAFF",
    "PART TIME STAFF",
    "Part Time Contract",
    "PSP",
    "PURCHASING",
    "TRAVEL SERVICES",
    "COOPERATING PROF",
    "LDS PHILANTHROPIES",
    "LDS SOC SERV",
    "CES COMMISSIONERS OFFICE",
    "EVENING SCHOOL INSTRUCTOR",
    "INDEPENDENT STUDY INSTRUCTOR",
    "SALT LAKE CENTER INSTRUCTOR",
    "CONTINUING ED CONTRACT",
];

const BYU_STUDENT: &[&str] = &[
    "aerstd",
    "FULL TIME STUDENT FRESHMAN",
    "FULL TIME STUDENT SOPHOMORE",
    "FULL TIME STUDENT JUNIOR",
    "FULL TIME STUDENT SENIOR",
    "BGS",
    "MASTERS PROGRAM",
    "DOCTORATE PROGRAM",
    "PART TIME STUDENT",
    "POST BACCALAUREATE NON DEGREE",
    "AUDIT",
    "CONCURRENT ENROLLMENT",
    "ACADEMIC EXCHANGE",
    "ELC",
    "EVENING SCHOOL",
    "INDEPENDENT STUDY",
    "SALT LAKE CENTER STUDENT",
    "VISITING STUDENT",
];

const BYU_ALUM: &[&str] = &["GRADUATED ALUMNI", "FORMER STD--24 COMPLETED HRS"];

const BYU_AFFILIATE: &[&str] = &[
    "RETIREE",
    "CRB",
    "RETIREE SPOUSE",
    "SURVIVING SPOUSE",
    "SURVIVING SPOUSE SP",
    "BYU BENEFITTED",
    "AFFILIATE FACULTY",
    "GRADUATED ALUMNI",
    "EMPLOYEE SPOUSE",
    "EMPLOYEE DEPENDENT",
    "SEMINARIES AND INSTITUTES",
    "PRESIDENTS LEADERSHIP COUNCIL",
    "BYU WARDS AND STAKES",
    "SERVICE REPRESENTATIVES",
    "MTC_Branch",
    "MTC VOLUNTEER",
    "WELLS FARGO",
    "BEEHIVE CLOTHING",
    "RETIREE DEPENDENT",
    "STUDENT SPOUSE",
    "STUDENT DEPENDENT",
    "FORMER STD--24 COMPLETED HRS",
    "FULL TIME MISSIONARIES",
    "FRIENDS OF THE LIBRARY",
    "DONOR",
    "NASGuest",
    "CONTRACT WORKER",
];

/// Raw group memberships that imply one affiliation category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MembershipTable {
    category: AffiliationCategory,
    groups: HashSet<String>,
}

impl MembershipTable {
    pub fn new<I, S>(category: AffiliationCategory, groups: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            category,
            groups: groups.into_iter().map(Into::into).collect(),
        }
    }

    pub fn category(&self) -> AffiliationCategory {
        self.category
    }

    /// Exact, case-sensitive membership test.
    pub fn contains(&self, group: &str) -> bool {
        self.groups.contains(group)
    }

    pub fn groups(&self) -> impl Iterator<Item = &str> {
        self.groups.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

/// Prioritized `(category, member-set)` pairs driving classification.
///
/// # Invariants
/// - At most one table per category; tables are kept in priority order.
/// - Pass-through categories (`contractor`, `library-walk-in`) never have a table.
#[derive(Debug, Clone)]
pub struct ClassificationTables {
    tables: Vec<MembershipTable>,
}

impl ClassificationTables {
    /// Build from arbitrary tables, merging duplicates per category.
    pub fn new(tables: Vec<MembershipTable>) -> AffiliationResult<Self> {
        let mut merged: BTreeMap<AffiliationCategory, HashSet<String>> = BTreeMap::new();
        for table in tables {
            if table.category.is_pass_through() {
                return Err(AffiliationError::PassThroughCategory(
                    table.category.to_string(),
                ));
            }
            merged.entry(table.category).or_default().extend(table.groups);
        }
        // BTreeMap iteration follows the enum's declaration (priority) order.
        let tables = merged
            .into_iter()
            .map(|(category, groups)| MembershipTable { category, groups })
            .collect();
        Ok(Self { tables })
    }

    /// Tables used by the BYU deployment.
    ///
    /// `member` is faculty ∪ staff ∪ student and `employee` is faculty ∪ staff.
    pub fn byu_default() -> Self {
        let faculty = BYU_FACULTY.iter().copied();
        let staff = BYU_STAFF.iter().copied();
        let student = BYU_STUDENT.iter().copied();
        Self {
            tables: vec![
                MembershipTable::new(AffiliationCategory::Faculty, faculty.clone()),
                MembershipTable::new(AffiliationCategory::Staff, staff.clone()),
                MembershipTable::new(AffiliationCategory::Student, student.clone()),
                MembershipTable::new(AffiliationCategory::Alum, BYU_ALUM.iter().copied()),
                MembershipTable::new(
                    AffiliationCategory::Member,
                    faculty.clone().chain(staff.clone()).chain(student),
                ),
                MembershipTable::new(AffiliationCategory::Affiliate, BYU_AFFILIATE.iter().copied()),
                MembershipTable::new(AffiliationCategory::Employee, faculty.chain(staff)),
            ],
        }
    }

    /// Parse tables from YAML of the form `category: [group, ...]`.
    ///
    /// When `member` is omitted it is derived from faculty, staff and student.
    pub fn from_yaml_str(contents: &str) -> AffiliationResult<Self> {
        let raw: BTreeMap<String, Vec<String>> = serde_yaml::from_str(contents)?;
        let mut tables = Vec::with_capacity(raw.len() + 1);
        for (key, groups) in raw {
            let category: AffiliationCategory = key.parse()?;
            tables.push(MembershipTable::new(category, groups));
        }

        let has_member = tables
            .iter()
            .any(|table| table.category == AffiliationCategory::Member);
        if !has_member {
            let member_groups: Vec<String> = tables
                .iter()
                .filter(|table| {
                    matches!(
                        table.category,
                        AffiliationCategory::Faculty
                            | AffiliationCategory::Staff
                            | AffiliationCategory::Student
                    )
                })
                .flat_map(|table| table.groups.iter().cloned())
                .collect();
            tables.push(MembershipTable::new(
                AffiliationCategory::Member,
                member_groups,
            ));
        }
        Self::new(tables)
    }

    pub fn from_yaml_file(path: impl AsRef<Path>) -> AffiliationResult<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| AffiliationError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_yaml_str(&contents)
    }

    pub fn tables(&self) -> &[MembershipTable] {
        &self.tables
    }

    pub fn table(&self, category: AffiliationCategory) -> Option<&MembershipTable> {
        self.tables.iter().find(|table| table.category == category)
    }
}

impl Default for ClassificationTables {
    fn default() -> Self {
        Self::byu_default()
    }
}
