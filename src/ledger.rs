use std::collections::BTreeMap;

use crate::catalog::Catalog;
use crate::engine::Deadlines;
use crate::models::{AcademicYearConfig, GradeEntry, Id, Student, Term};

/// Recorded grades of one (student, subject) pair, indexed by term.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TermGrades {
    values: [Option<f64>; 5],
}

impl TermGrades {
    /// Later entries for the same term replace earlier ones.
    pub fn from_entries<'a>(entries: impl IntoIterator<Item = &'a GradeEntry>) -> Self {
        let mut grades = Self::default();
        for entry in entries {
            grades.set(entry.term, entry.value);
        }
        grades
    }

    pub fn set(&mut self, term: Term, value: Option<f64>) {
        self.values[term.index()] = value;
    }

    pub fn get(&self, term: Term) -> Option<f64> {
        self.values[term.index()]
    }

    pub fn recovery(&self) -> Option<f64> {
        self.get(Term::RECOVERY)
    }

    pub fn has_any(&self) -> bool {
        self.values.iter().any(Option::is_some)
    }
}

/// Read-only view of the grade ledger keyed by (student, subject).
#[derive(Debug, Clone, Default)]
pub struct GradeBook {
    grades: BTreeMap<(Id, Id), TermGrades>,
}

impl GradeBook {
    pub fn from_entries<'a>(entries: impl IntoIterator<Item = &'a GradeEntry>) -> Self {
        let mut book = Self::default();
        for entry in entries {
            book.upsert(entry);
        }
        book
    }

    pub fn upsert(&mut self, entry: &GradeEntry) {
        self.grades
            .entry((entry.student_id.clone(), entry.subject_id.clone()))
            .or_default()
            .set(entry.term, entry.value);
    }

    pub fn grades_for(&self, student_id: &Id, subject_id: &Id) -> TermGrades {
        self.grades
            .get(&(student_id.clone(), subject_id.clone()))
            .copied()
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.grades.len()
    }

    pub fn is_empty(&self) -> bool {
        self.grades.is_empty()
    }
}

/// Everything the engine needs for one academic year, as handed over by the
/// grade ledger.
#[derive(Debug, Clone, Default)]
pub struct SchoolSnapshot {
    pub year: i32,
    pub catalog: Catalog,
    pub students: Vec<Student>,
    pub grades: GradeBook,
    pub calendar: Option<AcademicYearConfig>,
}

impl SchoolSnapshot {
    pub fn deadlines(&self) -> Deadlines {
        Deadlines::from_config(self.calendar.as_ref())
    }
}
