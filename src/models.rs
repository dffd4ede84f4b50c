use std::collections::BTreeSet;
use std::fmt;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ValidationError;

pub const MIN_GRADE: f64 = 0.0;
pub const MAX_GRADE: f64 = 10.0;

/// Normalized record identifier. Every id crossing into the engine is trimmed
/// once here so lookups never depend on how the ledger happened to type it.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct Id(String);

impl Id {
    pub fn new(raw: impl AsRef<str>) -> Self {
        Self(raw.as_ref().trim().to_string())
    }

    pub fn parse(field: &'static str, raw: &str) -> Result<Self, ValidationError> {
        let id = Self::new(raw);
        if id.0.is_empty() {
            return Err(ValidationError::Identifier { field });
        }
        Ok(id)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Id {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for Id {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl From<i64> for Id {
    fn from(value: i64) -> Self {
        Self(value.to_string())
    }
}

impl From<Uuid> for Id {
    fn from(value: Uuid) -> Self {
        Self(value.to_string())
    }
}

impl From<Id> for String {
    fn from(value: Id) -> Self {
        value.0
    }
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Grading period. Terms 1-4 are bimesters, term 5 is the final recovery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Term(u8);

impl Term {
    pub const LAST_BIMESTER: Term = Term(4);
    pub const RECOVERY: Term = Term(5);

    pub fn new(number: u8) -> Result<Self, ValidationError> {
        if (1..=5).contains(&number) {
            Ok(Self(number))
        } else {
            Err(ValidationError::Term(number))
        }
    }

    pub fn number(self) -> u8 {
        self.0
    }

    pub fn is_recovery(self) -> bool {
        self.0 == 5
    }

    pub(crate) fn index(self) -> usize {
        usize::from(self.0 - 1)
    }
}

impl TryFrom<u8> for Term {
    type Error = ValidationError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Term> for u8 {
    fn from(value: Term) -> Self {
        value.0
    }
}

/// Number of bimesters a partial average is computed over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct TermLimit(u8);

impl TermLimit {
    pub const FULL_YEAR: TermLimit = TermLimit(4);

    pub fn new(limit: u8) -> Result<Self, ValidationError> {
        if (1..=4).contains(&limit) {
            Ok(Self(limit))
        } else {
            Err(ValidationError::TermLimit(limit))
        }
    }

    pub fn get(self) -> u8 {
        self.0
    }

    pub fn is_full_year(self) -> bool {
        self.0 == 4
    }

    pub fn terms(self) -> impl Iterator<Item = Term> {
        (1..=self.0).map(Term)
    }
}

impl TryFrom<u8> for TermLimit {
    type Error = ValidationError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<TermLimit> for u8 {
    fn from(value: TermLimit) -> Self {
        value.0
    }
}

pub fn validate_grade(field: &'static str, value: f64) -> Result<f64, ValidationError> {
    if value.is_finite() && (MIN_GRADE..=MAX_GRADE).contains(&value) {
        Ok(value)
    } else {
        Err(ValidationError::GradeValue { field, value })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradeEntry {
    pub student_id: Id,
    pub subject_id: Id,
    pub term: Term,
    pub value: Option<f64>,
}

impl GradeEntry {
    pub fn new(
        student_id: impl Into<Id>,
        subject_id: impl Into<Id>,
        term: u8,
        value: Option<f64>,
    ) -> Result<Self, ValidationError> {
        let student_id = student_id.into();
        let subject_id = subject_id.into();
        if student_id.as_str().is_empty() {
            return Err(ValidationError::Identifier { field: "student_id" });
        }
        if subject_id.as_str().is_empty() {
            return Err(ValidationError::Identifier { field: "subject_id" });
        }
        let term = Term::new(term)?;
        let value = value.map(|v| validate_grade("value", v)).transpose()?;

        Ok(Self {
            student_id,
            subject_id,
            term,
            value,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AcademicYearConfig {
    pub year: i32,
    pub b1_end: Option<NaiveDate>,
    pub b2_end: Option<NaiveDate>,
    pub b3_end: Option<NaiveDate>,
    pub b4_end: Option<NaiveDate>,
    pub rec_start: Option<NaiveDate>,
    pub rec_end: Option<NaiveDate>,
}

impl AcademicYearConfig {
    /// Drops any date whose year falls outside 2000..=2100.
    pub fn normalized(self) -> Self {
        let keep = |date: Option<NaiveDate>| date.filter(|d| (2000..=2100).contains(&d.year()));
        Self {
            year: self.year,
            b1_end: keep(self.b1_end),
            b2_end: keep(self.b2_end),
            b3_end: keep(self.b3_end),
            b4_end: keep(self.b4_end),
            rec_start: keep(self.rec_start),
            rec_end: keep(self.rec_end),
        }
    }

    pub fn bimester_ends(&self) -> [Option<NaiveDate>; 4] {
        [self.b1_end, self.b2_end, self.b3_end, self.b4_end]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Periodicity {
    Annual,
    Semester,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subject {
    pub id: Id,
    pub name: String,
    pub year: i32,
    pub periodicity: Periodicity,
    pub sub_area_id: Option<Id>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubArea {
    pub id: Id,
    pub name: String,
    pub knowledge_area_id: Id,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeArea {
    pub id: Id,
    pub name: String,
    pub formation_type_id: Id,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchoolClass {
    pub id: Id,
    pub name: String,
    pub year: i32,
    pub subject_ids: BTreeSet<Id>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum StudentStatus {
    #[default]
    Active,
    Transferred,
    Dropped,
}

impl StudentStatus {
    pub fn label(self) -> &'static str {
        match self {
            StudentStatus::Active => "Active",
            StudentStatus::Transferred => "Transferred",
            StudentStatus::Dropped => "Dropped",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Student {
    pub id: Id,
    pub name: String,
    pub registration_number: Option<String>,
    pub class_id: Id,
    pub status: StudentStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SubjectStatus {
    Approved,
    Retained,
    InProgress,
}

impl SubjectStatus {
    pub fn label(self) -> &'static str {
        match self {
            SubjectStatus::Approved => "Approved",
            SubjectStatus::Retained => "Retained",
            SubjectStatus::InProgress => "In progress",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubjectResult {
    pub subject_id: Id,
    pub subject_name: String,
    pub term_limit: TermLimit,
    pub partial_average: f64,
    /// `None` on the full-year view while a bimester is still missing and
    /// no deadline has closed the subject.
    pub final_average: Option<f64>,
    pub recovered: bool,
    pub status: SubjectStatus,
    /// A grade in 1..=term_limit is missing.
    pub incomplete: bool,
    /// A grade is missing and the deadline of its bimester has passed.
    pub deadline_missed: bool,
    /// Final recovery can still change the result.
    pub recovery_open: bool,
    /// At least one grade (terms 1-5) is recorded.
    pub evaluated: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OverallOutcome {
    Approved,
    Failed,
    Pending,
}

impl OverallOutcome {
    pub fn label(self) -> &'static str {
        match self {
            OverallOutcome::Approved => "Approved",
            OverallOutcome::Failed => "Failed",
            OverallOutcome::Pending => "Pending",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudentOutcome {
    pub student_id: Id,
    pub count_above_threshold: usize,
    pub count_below_threshold: usize,
    pub overall: OverallOutcome,
    pub retained_or_pending_subjects: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum GroupKey {
    Named(Id),
    Unclassified,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupStat {
    pub group_key: GroupKey,
    pub group_name: String,
    pub average: f64,
    pub count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_trimmed_and_compare_across_sources() {
        assert_eq!(Id::new("  42 "), Id::from(42_i64));
        assert_eq!(Id::from(String::from("abc")), Id::from("abc"));
        assert!(Id::parse("class_id", "   ").is_err());
    }

    #[test]
    fn term_limit_rejects_out_of_range() {
        assert_eq!(TermLimit::new(0), Err(ValidationError::TermLimit(0)));
        assert_eq!(TermLimit::new(5), Err(ValidationError::TermLimit(5)));
        let limit = TermLimit::new(3).unwrap();
        let terms: Vec<u8> = limit.terms().map(Term::number).collect();
        assert_eq!(terms, vec![1, 2, 3]);
    }

    #[test]
    fn grade_entry_rejects_out_of_range_values() {
        assert!(GradeEntry::new("s1", "m1", 1, Some(10.0)).is_ok());
        assert!(GradeEntry::new("s1", "m1", 5, None).is_ok());
        assert_eq!(
            GradeEntry::new("s1", "m1", 6, Some(5.0)),
            Err(ValidationError::Term(6))
        );
        let err = GradeEntry::new("s1", "m1", 2, Some(10.5)).unwrap_err();
        assert_eq!(
            err,
            ValidationError::GradeValue {
                field: "value",
                value: 10.5
            }
        );
        assert!(GradeEntry::new("s1", "m1", 2, Some(f64::NAN)).is_err());
        assert!(GradeEntry::new(" ", "m1", 2, Some(1.0)).is_err());
    }

    #[test]
    fn normalization_drops_out_of_range_dates() {
        let config = AcademicYearConfig {
            year: 2026,
            b1_end: NaiveDate::from_ymd_opt(1999, 12, 31),
            b2_end: NaiveDate::from_ymd_opt(2026, 6, 30),
            b3_end: NaiveDate::from_ymd_opt(2101, 1, 1),
            ..Default::default()
        }
        .normalized();

        assert_eq!(config.b1_end, None);
        assert_eq!(config.b2_end, NaiveDate::from_ymd_opt(2026, 6, 30));
        assert_eq!(config.b3_end, None);
    }
}
