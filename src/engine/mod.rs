//! Academic performance computation.
//!
//! Every function here is pure: grades, deadlines and the evaluation instant
//! `now` come in as arguments and nothing reads a clock or touches storage.

pub mod analytics;
pub mod bimester;
pub mod council;
pub mod deadline;
pub mod export;
pub mod hierarchy;
pub mod outcome;
pub mod recovery;

use chrono::NaiveDateTime;

use crate::ledger::TermGrades;
use crate::models::{Subject, SubjectResult, SubjectStatus, TermLimit};

pub use deadline::Deadlines;

/// Minimum final average for a subject to be approved.
pub const PASS_MARK: f64 = 6.0;
/// Split point for the council's above/below counts.
pub const COUNCIL_MARK: f64 = 5.0;
/// Below this annual average no recovery is offered.
pub const RECOVERY_FLOOR: f64 = 3.0;

pub fn compute_subject_result(
    subject: &Subject,
    grades: &TermGrades,
    limit: TermLimit,
    deadlines: &Deadlines,
    now: NaiveDateTime,
) -> SubjectResult {
    let partial = bimester::partial_average(grades, limit);

    let recovery = if limit.is_full_year() {
        recovery::resolve(partial.value, grades.recovery())
    } else {
        recovery::Recovery {
            final_average: partial.value,
            recovered: false,
        }
    };

    // A full-year average with a gap is only defined once the gap closes the
    // subject.
    let computable = !(limit.is_full_year() && partial.incomplete());
    let candidate = computable.then_some(recovery.final_average);
    let classification = deadline::classify(candidate, &partial, limit, deadlines, now);
    let final_average = candidate.or_else(|| {
        (classification.status == SubjectStatus::Retained).then_some(recovery.final_average)
    });

    let recovery_open = limit.is_full_year()
        && grades.recovery().is_none()
        && recovery::eligible_for_recovery(partial.value)
        && !deadlines.recovery_passed(now);

    SubjectResult {
        subject_id: subject.id.clone(),
        subject_name: subject.name.clone(),
        term_limit: limit,
        partial_average: partial.value,
        final_average,
        recovered: recovery.recovered && final_average.is_some(),
        status: classification.status,
        incomplete: partial.incomplete(),
        deadline_missed: classification.deadline_missed,
        recovery_open,
        evaluated: grades.has_any(),
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use chrono::{NaiveDate, NaiveDateTime};

    use crate::ledger::TermGrades;
    use crate::models::{AcademicYearConfig, Term};

    pub use crate::catalog::fixtures::{catalog, subject};

    pub fn grades(values: &[(u8, f64)]) -> TermGrades {
        let mut grades = TermGrades::default();
        for (term, value) in values {
            grades.set(Term::new(*term).unwrap(), Some(*value));
        }
        grades
    }

    pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    pub fn at(y: i32, m: u32, d: u32) -> NaiveDateTime {
        date(y, m, d).and_hms_opt(12, 0, 0).unwrap()
    }

    pub fn calendar() -> AcademicYearConfig {
        AcademicYearConfig {
            year: 2026,
            b1_end: Some(date(2026, 4, 30)),
            b2_end: Some(date(2026, 7, 10)),
            b3_end: Some(date(2026, 9, 30)),
            b4_end: Some(date(2026, 12, 10)),
            rec_start: Some(date(2026, 12, 14)),
            rec_end: Some(date(2026, 12, 18)),
        }
    }
}
