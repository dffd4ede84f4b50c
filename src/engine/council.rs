use chrono::NaiveDateTime;
use serde::Serialize;
use tracing::{debug, instrument};

use super::outcome::compute_student_outcome;
use super::compute_subject_result;
use crate::error::ValidationError;
use crate::filters::{status_matches, SubjectFilter};
use crate::ledger::SchoolSnapshot;
use crate::models::{
    Id, SchoolClass, Student, StudentOutcome, StudentStatus, Subject, SubjectResult, TermLimit,
};
use crate::sorting;

#[derive(Debug, Clone, PartialEq)]
pub struct CouncilQuery {
    pub class_id: Id,
    pub term_limit: TermLimit,
    pub status: Option<StudentStatus>,
    pub subjects: SubjectFilter,
    pub min_above: Option<usize>,
    pub min_below: Option<usize>,
}

impl CouncilQuery {
    pub fn new(class_id: Id, term_limit: TermLimit) -> Self {
        Self {
            class_id,
            term_limit,
            status: Some(StudentStatus::Active),
            subjects: SubjectFilter::default(),
            min_above: None,
            min_below: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CouncilRow {
    pub student: Student,
    pub results: Vec<SubjectResult>,
    pub outcome: StudentOutcome,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CouncilBoard {
    pub class: SchoolClass,
    pub term_limit: TermLimit,
    pub subjects: Vec<Subject>,
    pub rows: Vec<CouncilRow>,
}

/// Builds the class council board: one row per matching student, sorted by
/// name, with a result for every subject in scope.
#[instrument(skip_all, fields(class = %query.class_id, term_limit = query.term_limit.get()))]
pub fn evaluate_class(
    snapshot: &SchoolSnapshot,
    query: &CouncilQuery,
    now: NaiveDateTime,
) -> Result<CouncilBoard, ValidationError> {
    let catalog = &snapshot.catalog;
    let class = catalog
        .class(&query.class_id)
        .ok_or_else(|| ValidationError::UnknownId {
            field: "class_id",
            id: query.class_id.to_string(),
        })?;

    let subjects: Vec<&Subject> = catalog
        .subjects_of_class(class)
        .into_iter()
        .filter(|s| query.subjects.matches(catalog, s))
        .collect();
    let deadlines = snapshot.deadlines();

    let mut rows: Vec<CouncilRow> = snapshot
        .students
        .iter()
        .filter(|s| s.class_id == class.id && status_matches(query.status, s.status))
        .map(|student| {
            let results: Vec<SubjectResult> = subjects
                .iter()
                .map(|subject| {
                    let grades = snapshot.grades.grades_for(&student.id, &subject.id);
                    compute_subject_result(subject, &grades, query.term_limit, &deadlines, now)
                })
                .collect();
            let outcome = compute_student_outcome(&student.id, &results);
            CouncilRow {
                student: student.clone(),
                results,
                outcome,
            }
        })
        .filter(|row| {
            query
                .min_above
                .map_or(true, |min| row.outcome.count_above_threshold >= min)
                && query
                    .min_below
                    .map_or(true, |min| row.outcome.count_below_threshold >= min)
        })
        .collect();

    rows.sort_by(|a, b| {
        sorting::compare_names(&a.student.name, &b.student.name)
            .then_with(|| a.student.id.cmp(&b.student.id))
    });

    debug!(
        students = rows.len(),
        subjects = subjects.len(),
        "council board evaluated"
    );

    Ok(CouncilBoard {
        class: class.clone(),
        term_limit: query.term_limit,
        subjects: subjects.into_iter().cloned().collect(),
        rows,
    })
}
