use chrono::NaiveDateTime;
use serde::Serialize;

use super::compute_subject_result;
use super::recovery::{points_target, RecoveryTarget};
use crate::ledger::SchoolSnapshot;
use crate::models::{AcademicYearConfig, StudentStatus, SubjectStatus, Term, TermLimit};
use crate::sorting;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct YearSummary {
    pub year: i32,
    pub students: usize,
    pub active: usize,
    pub transferred: usize,
    pub dropped: usize,
    pub classes: usize,
    pub subjects: usize,
    pub calendar: Option<AcademicYearConfig>,
}

pub fn year_summary(snapshot: &SchoolSnapshot) -> YearSummary {
    let classes = snapshot.catalog.classes_for_year(snapshot.year);
    let in_year: Vec<_> = snapshot
        .students
        .iter()
        .filter(|s| classes.iter().any(|c| c.id == s.class_id))
        .collect();
    let count = |status: StudentStatus| in_year.iter().filter(|s| s.status == status).count();

    YearSummary {
        year: snapshot.year,
        students: in_year.len(),
        active: count(StudentStatus::Active),
        transferred: count(StudentStatus::Transferred),
        dropped: count(StudentStatus::Dropped),
        classes: classes.len(),
        subjects: snapshot.catalog.subjects_for_year(snapshot.year).len(),
        calendar: snapshot.calendar.clone(),
    }
}

/// One grade sheet line: a student's full year in one subject.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GradeSheetRow {
    pub registration_number: Option<String>,
    pub student_name: String,
    pub class_name: String,
    pub subject_name: String,
    pub bimesters: [Option<f64>; 4],
    pub recovery_score: Option<f64>,
    pub annual_average: f64,
    pub final_average: Option<f64>,
    pub status: SubjectStatus,
    pub target: RecoveryTarget,
}

/// Rows for every (student, subject) pair of the year with at least one
/// recorded grade, ordered by class, student and subject.
pub fn grade_sheet(snapshot: &SchoolSnapshot, now: NaiveDateTime) -> Vec<GradeSheetRow> {
    let deadlines = snapshot.deadlines();
    let catalog = &snapshot.catalog;
    let mut rows = Vec::new();

    for class in catalog.classes_for_year(snapshot.year) {
        let mut students: Vec<_> = snapshot
            .students
            .iter()
            .filter(|s| s.class_id == class.id)
            .collect();
        students.sort_by(|a, b| sorting::compare_names(&a.name, &b.name).then_with(|| a.id.cmp(&b.id)));

        for student in students {
            for subject in catalog.subjects_of_class(class) {
                let grades = snapshot.grades.grades_for(&student.id, &subject.id);
                if !grades.has_any() {
                    continue;
                }
                let result =
                    compute_subject_result(subject, &grades, TermLimit::FULL_YEAR, &deadlines, now);

                let mut bimesters = [None; 4];
                for (slot, term) in bimesters.iter_mut().zip(TermLimit::FULL_YEAR.terms()) {
                    *slot = grades.get(term);
                }

                rows.push(GradeSheetRow {
                    registration_number: student.registration_number.clone(),
                    student_name: student.name.clone(),
                    class_name: class.name.clone(),
                    subject_name: subject.name.clone(),
                    bimesters,
                    recovery_score: grades.get(Term::RECOVERY),
                    annual_average: result.partial_average,
                    final_average: result.final_average,
                    status: result.status,
                    target: points_target(result.partial_average),
                });
            }
        }
    }
    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::fixtures::{at, calendar, catalog};
    use crate::ledger::GradeBook;
    use crate::models::{GradeEntry, Id, Student};

    fn snapshot() -> SchoolSnapshot {
        let entries = vec![
            GradeEntry::new("s1", "mat", 1, Some(7.0)).unwrap(),
            GradeEntry::new("s1", "mat", 2, Some(5.0)).unwrap(),
            GradeEntry::new("s1", "mat", 3, Some(6.0)).unwrap(),
            GradeEntry::new("s1", "mat", 4, Some(4.0)).unwrap(),
            GradeEntry::new("s1", "mat", 5, Some(7.0)).unwrap(),
            GradeEntry::new("s1", "bio", 1, Some(9.0)).unwrap(),
        ];
        let student = |id: &str, status| Student {
            id: Id::from(id),
            name: id.to_string(),
            registration_number: Some(format!("RA-{id}")),
            class_id: Id::from("c1"),
            status,
        };
        SchoolSnapshot {
            year: 2026,
            catalog: catalog(),
            students: vec![
                student("s1", StudentStatus::Active),
                student("s2", StudentStatus::Dropped),
            ],
            grades: GradeBook::from_entries(&entries),
            calendar: Some(calendar()),
        }
    }

    #[test]
    fn summary_counts_by_status() {
        let summary = year_summary(&snapshot());
        assert_eq!(summary.students, 2);
        assert_eq!(summary.active, 1);
        assert_eq!(summary.dropped, 1);
        assert_eq!(summary.classes, 3);
        assert_eq!(summary.subjects, 5);
    }

    #[test]
    fn grade_sheet_carries_both_recovery_presentations() {
        let rows = grade_sheet(&snapshot(), at(2026, 12, 20));
        assert_eq!(rows.len(), 2);

        let bio = &rows[0];
        assert_eq!(bio.subject_name, "BIOLOGIA");
        assert_eq!(bio.bimesters, [Some(9.0), None, None, None]);
        assert_eq!(bio.status, SubjectStatus::Retained);

        let mat = &rows[1];
        assert!((mat.annual_average - 5.5).abs() < 1e-9);
        assert!((mat.final_average.unwrap() - 6.1).abs() < 1e-9);
        assert_eq!(mat.recovery_score, Some(7.0));
        assert!((mat.target.required_score.unwrap() - 6.5).abs() < 1e-9);
        assert_eq!(mat.status, SubjectStatus::Approved);
    }
}
