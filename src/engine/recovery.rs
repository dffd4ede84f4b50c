//! Final recovery rules.
//!
//! Two presentations of the same rule set are kept side by side: the weighted
//! blend used for council and analytics, and the points target printed on
//! grade sheets. Both derive from the same annual average.

use serde::Serialize;

use super::{PASS_MARK, RECOVERY_FLOOR};

pub const ANNUAL_WEIGHT: f64 = 6.0;
pub const RECOVERY_WEIGHT: f64 = 4.0;
pub const POINTS_TO_PASS: f64 = 24.0;
pub const RECOVERY_TARGET_SUM: f64 = 12.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Recovery {
    pub final_average: f64,
    pub recovered: bool,
}

/// Weighted blend `(MG * 6 + RF * 4) / 10`.
///
/// Applies only when `3.0 <= MG < 6.0` and a recovery score exists; any other
/// case keeps the annual average untouched.
pub fn resolve(annual_average: f64, recovery_score: Option<f64>) -> Recovery {
    match recovery_score {
        Some(score) if eligible_for_recovery(annual_average) => Recovery {
            final_average: weighted_final(annual_average, score),
            recovered: true,
        },
        _ => Recovery {
            final_average: annual_average,
            recovered: false,
        },
    }
}

pub fn weighted_final(annual_average: f64, recovery_score: f64) -> f64 {
    (annual_average * ANNUAL_WEIGHT + recovery_score * RECOVERY_WEIGHT)
        / (ANNUAL_WEIGHT + RECOVERY_WEIGHT)
}

pub fn eligible_for_recovery(annual_average: f64) -> bool {
    (RECOVERY_FLOOR..PASS_MARK).contains(&annual_average)
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RecoveryTarget {
    /// Sum of the four bimesters.
    pub points: f64,
    pub needed_points: f64,
    /// `None` when the student already passed or sits below the recovery floor.
    pub required_score: Option<f64>,
}

pub fn points_target(annual_average: f64) -> RecoveryTarget {
    let points = annual_average * 4.0;
    RecoveryTarget {
        points,
        needed_points: (POINTS_TO_PASS - points).max(0.0),
        required_score: eligible_for_recovery(annual_average)
            .then(|| RECOVERY_TARGET_SUM - annual_average),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn passing_average_ignores_recovery_score() {
        let recovery = resolve(6.0, Some(2.0));
        assert!(!recovery.recovered);
        assert!(close(recovery.final_average, 6.0));
    }

    #[test]
    fn blends_sixty_forty() {
        let recovery = resolve(5.5, Some(7.0));
        assert!(recovery.recovered);
        assert!(close(recovery.final_average, 6.1));
    }

    #[test]
    fn missing_recovery_score_keeps_average() {
        let recovery = resolve(4.0, None);
        assert!(!recovery.recovered);
        assert!(close(recovery.final_average, 4.0));
    }

    #[test]
    fn below_floor_gets_no_recovery() {
        let recovery = resolve(2.99, Some(10.0));
        assert!(!recovery.recovered);
        assert!(close(recovery.final_average, 2.99));

        let at_floor = resolve(3.0, Some(10.0));
        assert!(at_floor.recovered);
        assert!(close(at_floor.final_average, 5.8));
    }

    #[test]
    fn points_target_matches_grade_sheet() {
        let target = points_target(5.5);
        assert!(close(target.points, 22.0));
        assert!(close(target.needed_points, 2.0));
        assert!(close(target.required_score.unwrap(), 6.5));

        let passed = points_target(7.0);
        assert!(close(passed.needed_points, 0.0));
        assert_eq!(passed.required_score, None);

        assert_eq!(points_target(2.5).required_score, None);
    }
}
