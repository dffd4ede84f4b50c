use std::collections::BTreeSet;

use chrono::NaiveDateTime;
use serde::Serialize;
use tracing::{debug, instrument};

use super::compute_subject_result;
use super::hierarchy::{aggregate_hierarchy, Cohort, Contribution, HierarchyReport};
use crate::error::ValidationError;
use crate::filters::{status_matches, ViewFilters};
use crate::ledger::SchoolSnapshot;
use crate::models::{Id, SchoolClass, Student, Subject, Term, TermLimit};
use crate::sorting;

/// Which value a (student, subject) pair contributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AnalyticsView {
    /// Final average up to the term limit, recovery included on the full year.
    Accumulated(TermLimit),
    /// Raw grade of a single bimester.
    Bimester(Term),
}

impl AnalyticsView {
    pub fn bimester(number: u8) -> Result<Self, ValidationError> {
        let limit = TermLimit::new(number).map_err(|_| ValidationError::Term(number))?;
        Ok(Self::Bimester(Term::new(limit.get())?))
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AnalyticsReport {
    pub view: AnalyticsView,
    pub subjects: Vec<Subject>,
    pub students: usize,
    pub hierarchy: HierarchyReport,
}

/// Subjects of the year that pass the filter, annual before semester.
pub fn scoped_subjects<'a>(snapshot: &'a SchoolSnapshot, filters: &ViewFilters) -> Vec<&'a Subject> {
    let mut subjects: Vec<&Subject> = snapshot
        .catalog
        .subjects_for_year(filters.year)
        .into_iter()
        .filter(|s| filters.subjects.matches(&snapshot.catalog, s))
        .collect();
    subjects.sort_by(|a, b| sorting::compare_by_periodicity(a, b));
    subjects
}

pub fn collect_contributions(
    snapshot: &SchoolSnapshot,
    students: &[&Student],
    subjects: &[&Subject],
    view: AnalyticsView,
    now: NaiveDateTime,
) -> Vec<Contribution> {
    let deadlines = snapshot.deadlines();
    let mut contributions = Vec::new();

    for student in students {
        for subject in subjects {
            let grades = snapshot.grades.grades_for(&student.id, &subject.id);
            let value = match view {
                AnalyticsView::Accumulated(limit) => grades
                    .has_any()
                    .then(|| compute_subject_result(subject, &grades, limit, &deadlines, now))
                    .and_then(|result| result.final_average),
                AnalyticsView::Bimester(term) => grades.get(term),
            };
            if let Some(value) = value {
                contributions.push(Contribution {
                    student_id: student.id.clone(),
                    subject_id: subject.id.clone(),
                    value,
                });
            }
        }
    }
    contributions
}

#[instrument(skip_all, fields(year = filters.year))]
pub fn analyze(
    snapshot: &SchoolSnapshot,
    filters: &ViewFilters,
    view: AnalyticsView,
    now: NaiveDateTime,
) -> AnalyticsReport {
    let subjects = scoped_subjects(snapshot, filters);
    let subject_ids: BTreeSet<Id> = subjects.iter().map(|s| s.id.clone()).collect();

    let classes: Vec<&SchoolClass> = snapshot
        .catalog
        .classes_for_year(filters.year)
        .into_iter()
        .filter(|c| filters.class_id.as_ref().map_or(true, |id| &c.id == id))
        .collect();
    let class_ids: BTreeSet<&Id> = classes.iter().map(|c| &c.id).collect();

    let students: Vec<&Student> = snapshot
        .students
        .iter()
        .filter(|s| class_ids.contains(&s.class_id) && status_matches(filters.status, s.status))
        .collect();

    let contributions = collect_contributions(snapshot, &students, &subjects, view, now);
    debug!(
        subjects = subjects.len(),
        students = students.len(),
        contributions = contributions.len(),
        "analytics scope resolved"
    );

    let cohort = Cohort {
        classes: &classes,
        students: &students,
        subject_ids: &subject_ids,
        grades: &snapshot.grades,
    };
    let hierarchy = aggregate_hierarchy(&snapshot.catalog, &cohort, &contributions);

    AnalyticsReport {
        view,
        subjects: subjects.into_iter().cloned().collect(),
        students: students.len(),
        hierarchy,
    }
}
