use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;

use super::bimester::PartialAverage;
use super::PASS_MARK;
use crate::models::{AcademicYearConfig, SubjectStatus, Term, TermLimit};

/// Bimester and recovery deadlines, each closing at 23:59:59 of its date.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Deadlines {
    pub bimesters: [Option<NaiveDateTime>; 4],
    pub recovery: Option<NaiveDateTime>,
}

impl Deadlines {
    pub fn none() -> Self {
        Self::default()
    }

    /// A missing year configuration means no deadline can be considered passed.
    pub fn from_config(config: Option<&AcademicYearConfig>) -> Self {
        let Some(config) = config else {
            return Self::none();
        };
        Self {
            bimesters: config.bimester_ends().map(|date| date.and_then(end_of_day)),
            recovery: config.rec_end.and_then(end_of_day),
        }
    }

    pub fn bimester_passed(&self, term: Term, now: NaiveDateTime) -> bool {
        if term.is_recovery() {
            return self.recovery_passed(now);
        }
        self.bimesters[term.index()].is_some_and(|deadline| now > deadline)
    }

    pub fn recovery_passed(&self, now: NaiveDateTime) -> bool {
        self.recovery.is_some_and(|deadline| now > deadline)
    }
}

fn end_of_day(date: NaiveDate) -> Option<NaiveDateTime> {
    date.and_hms_opt(23, 59, 59)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Classification {
    pub status: SubjectStatus,
    pub deadline_missed: bool,
}

/// `final_average` is `None` when the average cannot be computed yet, which
/// never approves a subject.
pub fn classify(
    final_average: Option<f64>,
    partial: &PartialAverage,
    limit: TermLimit,
    deadlines: &Deadlines,
    now: NaiveDateTime,
) -> Classification {
    let deadline_missed = partial
        .missing_terms
        .iter()
        .any(|term| deadlines.bimester_passed(*term, now));

    let mut status = if final_average.is_some_and(|value| value >= PASS_MARK) {
        SubjectStatus::Approved
    } else if !partial.incomplete() || deadline_missed {
        SubjectStatus::Retained
    } else {
        SubjectStatus::InProgress
    };

    // Past the last bimester a gap in the year closes the subject whatever
    // the average says.
    if limit.is_full_year()
        && partial.incomplete()
        && deadlines.bimester_passed(Term::LAST_BIMESTER, now)
    {
        status = SubjectStatus::Retained;
    }

    Classification {
        status,
        deadline_missed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn at(y: i32, m: u32, d: u32, h: u32) -> NaiveDateTime {
        date(y, m, d).and_hms_opt(h, 0, 0).unwrap()
    }

    fn config() -> AcademicYearConfig {
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

    fn partial(value: f64, missing: &[u8]) -> PartialAverage {
        PartialAverage {
            value,
            missing_terms: missing.iter().map(|t| Term::new(*t).unwrap()).collect(),
        }
    }

    #[test]
    fn deadline_closes_at_end_of_day() {
        let deadlines = Deadlines::from_config(Some(&config()));
        let first = Term::new(1).unwrap();
        assert!(!deadlines.bimester_passed(first, at(2026, 4, 30, 23)));
        assert!(deadlines.bimester_passed(first, at(2026, 5, 1, 0)));
    }

    #[test]
    fn missing_config_never_passes() {
        let deadlines = Deadlines::from_config(None);
        let result = classify(
            Some(1.0),
            &partial(1.0, &[3, 4]),
            TermLimit::FULL_YEAR,
            &deadlines,
            at(2030, 1, 1, 0),
        );
        assert_eq!(result.status, SubjectStatus::InProgress);
        assert!(!result.deadline_missed);
    }

    #[test]
    fn complete_and_below_pass_mark_is_retained() {
        let deadlines = Deadlines::from_config(Some(&config()));
        let result = classify(
            Some(5.9),
            &partial(5.9, &[]),
            TermLimit::new(2).unwrap(),
            &deadlines,
            at(2026, 5, 2, 0),
        );
        assert_eq!(result.status, SubjectStatus::Retained);
    }

    #[test]
    fn gap_within_deadline_stays_in_progress() {
        let deadlines = Deadlines::from_config(Some(&config()));
        let result = classify(
            Some(3.0),
            &partial(3.0, &[2]),
            TermLimit::new(2).unwrap(),
            &deadlines,
            at(2026, 7, 1, 12),
        );
        assert_eq!(result.status, SubjectStatus::InProgress);
        assert!(!result.deadline_missed);
    }

    #[test]
    fn gap_past_its_deadline_is_retained_and_flagged() {
        let deadlines = Deadlines::from_config(Some(&config()));
        let result = classify(
            Some(0.75),
            &partial(0.75, &[3, 4]),
            TermLimit::FULL_YEAR,
            &deadlines,
            at(2026, 10, 15, 9),
        );
        assert_eq!(result.status, SubjectStatus::Retained);
        assert!(result.deadline_missed);
    }

    #[test]
    fn full_year_gap_after_last_deadline_overrides_passing_average() {
        let deadlines = Deadlines::from_config(Some(&config()));
        let result = classify(
            Some(7.5),
            &partial(7.5, &[4]),
            TermLimit::FULL_YEAR,
            &deadlines,
            at(2026, 12, 11, 8),
        );
        assert_eq!(result.status, SubjectStatus::Retained);
        assert!(result.deadline_missed);
    }

    #[test]
    fn passing_partial_view_is_approved_even_with_gap() {
        let deadlines = Deadlines::from_config(Some(&config()));
        let result = classify(
            Some(6.5),
            &partial(6.5, &[3]),
            TermLimit::new(3).unwrap(),
            &deadlines,
            at(2026, 10, 2, 8),
        );
        assert_eq!(result.status, SubjectStatus::Approved);
        assert!(result.deadline_missed);
    }

    #[test]
    fn undefined_average_is_never_approved() {
        let deadlines = Deadlines::from_config(Some(&config()));
        let open = classify(
            None,
            &partial(6.75, &[4]),
            TermLimit::FULL_YEAR,
            &deadlines,
            at(2026, 11, 2, 8),
        );
        assert_eq!(open.status, SubjectStatus::InProgress);

        let closed = classify(
            None,
            &partial(6.75, &[4]),
            TermLimit::FULL_YEAR,
            &deadlines,
            at(2026, 12, 11, 8),
        );
        assert_eq!(closed.status, SubjectStatus::Retained);
    }
}
