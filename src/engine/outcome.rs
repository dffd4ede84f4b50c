use crate::models::{Id, OverallOutcome, StudentOutcome, SubjectResult, SubjectStatus};

use super::COUNCIL_MARK;

pub const PENDING_MARKER: &str = " (P)";

/// Rolls a student's subject results into one outcome.
///
/// A subject whose grade is missing past its deadline makes the whole student
/// `Pending` and is listed with the pending marker. Otherwise a subject
/// retained on the full-year view makes the student `Failed`. Partial views
/// never fail a student on averages alone. Subjects without a final average
/// count on neither side of the council mark.
pub fn compute_student_outcome(student_id: &Id, results: &[SubjectResult]) -> StudentOutcome {
    let mut count_above_threshold = 0;
    let mut count_below_threshold = 0;
    let mut pending = false;
    let mut failed = false;
    let mut listed = Vec::new();

    for result in results {
        match result.final_average {
            Some(value) if value >= COUNCIL_MARK => count_above_threshold += 1,
            Some(_) => count_below_threshold += 1,
            None => {}
        }

        if result.deadline_missed {
            pending = true;
            listed.push(format!("{}{}", result.subject_name, PENDING_MARKER));
        } else if result.status == SubjectStatus::Retained && result.term_limit.is_full_year() {
            failed = true;
            listed.push(result.subject_name.clone());
        }
    }

    let overall = if pending {
        OverallOutcome::Pending
    } else if failed {
        OverallOutcome::Failed
    } else {
        OverallOutcome::Approved
    };

    StudentOutcome {
        student_id: student_id.clone(),
        count_above_threshold,
        count_below_threshold,
        overall,
        retained_or_pending_subjects: listed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TermLimit;

    fn result(name: &str, final_average: f64, status: SubjectStatus) -> SubjectResult {
        SubjectResult {
            subject_id: Id::from(name),
            subject_name: name.to_string(),
            term_limit: TermLimit::FULL_YEAR,
            partial_average: final_average,
            final_average: Some(final_average),
            recovered: false,
            status,
            incomplete: false,
            deadline_missed: false,
            recovery_open: false,
            evaluated: true,
        }
    }

    #[test]
    fn all_approved() {
        let outcome = compute_student_outcome(
            &Id::from("s1"),
            &[
                result("ARTE", 8.0, SubjectStatus::Approved),
                result("FÍSICA", 6.0, SubjectStatus::Approved),
            ],
        );
        assert_eq!(outcome.overall, OverallOutcome::Approved);
        assert_eq!(outcome.count_above_threshold, 2);
        assert_eq!(outcome.count_below_threshold, 0);
        assert!(outcome.retained_or_pending_subjects.is_empty());
    }

    #[test]
    fn retained_subject_fails_student_but_counts_above_five() {
        let outcome = compute_student_outcome(
            &Id::from("s1"),
            &[
                result("ARTE", 8.0, SubjectStatus::Approved),
                result("QUÍMICA", 5.5, SubjectStatus::Retained),
                result("FÍSICA", 2.0, SubjectStatus::Retained),
            ],
        );
        assert_eq!(outcome.overall, OverallOutcome::Failed);
        assert_eq!(outcome.count_above_threshold, 2);
        assert_eq!(outcome.count_below_threshold, 1);
        assert_eq!(outcome.retained_or_pending_subjects, vec!["QUÍMICA", "FÍSICA"]);
    }

    #[test]
    fn pending_takes_priority_over_failure() {
        let mut missing = result("HISTÓRIA", 1.5, SubjectStatus::Retained);
        missing.deadline_missed = true;
        missing.incomplete = true;

        let outcome = compute_student_outcome(
            &Id::from("s1"),
            &[result("FÍSICA", 2.0, SubjectStatus::Retained), missing],
        );
        assert_eq!(outcome.overall, OverallOutcome::Pending);
        assert_eq!(
            outcome.retained_or_pending_subjects,
            vec!["FÍSICA".to_string(), "HISTÓRIA (P)".to_string()]
        );
    }

    #[test]
    fn partial_view_does_not_fail_on_low_average() {
        let mut low = result("INGLÊS", 3.0, SubjectStatus::Retained);
        low.term_limit = TermLimit::new(2).unwrap();

        let outcome = compute_student_outcome(&Id::from("s1"), &[low]);
        assert_eq!(outcome.overall, OverallOutcome::Approved);
        assert_eq!(outcome.count_below_threshold, 1);
        assert!(outcome.retained_or_pending_subjects.is_empty());
    }

    #[test]
    fn undefined_average_is_not_counted() {
        let mut open = result("BIOLOGIA", 0.0, SubjectStatus::InProgress);
        open.final_average = None;
        open.incomplete = true;

        let outcome = compute_student_outcome(
            &Id::from("s1"),
            &[open, result("ARTE", 7.0, SubjectStatus::Approved)],
        );
        assert_eq!(outcome.overall, OverallOutcome::Approved);
        assert_eq!(outcome.count_above_threshold, 1);
        assert_eq!(outcome.count_below_threshold, 0);
    }

    #[test]
    fn no_subjects_is_approved() {
        let outcome = compute_student_outcome(&Id::from("s1"), &[]);
        assert_eq!(outcome.overall, OverallOutcome::Approved);
    }
}
