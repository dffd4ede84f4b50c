use serde::Serialize;

use crate::ledger::TermGrades;
use crate::models::{Term, TermLimit};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PartialAverage {
    pub value: f64,
    pub missing_terms: Vec<Term>,
}

impl PartialAverage {
    pub fn incomplete(&self) -> bool {
        !self.missing_terms.is_empty()
    }
}

/// Sum of terms 1..=limit divided by the limit itself. A missing term adds
/// nothing to the sum and is reported in `missing_terms`.
pub fn partial_average(grades: &TermGrades, limit: TermLimit) -> PartialAverage {
    let mut sum = 0.0;
    let mut missing_terms = Vec::new();

    for term in limit.terms() {
        match grades.get(term) {
            Some(value) => sum += value,
            None => missing_terms.push(term),
        }
    }

    PartialAverage {
        value: sum / f64::from(limit.get()),
        missing_terms,
    }
}
