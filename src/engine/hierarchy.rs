use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;
use tracing::debug;

use super::PASS_MARK;
use crate::catalog::Catalog;
use crate::ledger::GradeBook;
use crate::models::{GroupKey, GroupStat, Id, SchoolClass, Student, Term, TermLimit};
use crate::sorting;

pub const UNCLASSIFIED_AREA: &str = "Unclassified";
pub const GENERAL_SUB_AREA: &str = "General";

/// One evaluated value of one student in one subject.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Contribution {
    pub student_id: Id,
    pub subject_id: Id,
    pub value: f64,
}

/// Students, classes and subjects the evolution series is computed over.
#[derive(Debug, Clone, Copy)]
pub struct Cohort<'a> {
    pub classes: &'a [&'a SchoolClass],
    pub students: &'a [&'a Student],
    pub subject_ids: &'a BTreeSet<Id>,
    pub grades: &'a GradeBook,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassSeries {
    pub class_id: Id,
    pub class_name: String,
    /// Average of recorded grades per bimester; `None` where nothing was recorded.
    pub points: [Option<f64>; 4],
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HierarchyReport {
    pub subject_stats: Vec<GroupStat>,
    pub sub_area_stats: Vec<GroupStat>,
    pub area_stats: Vec<GroupStat>,
    /// `None` when nothing was evaluated.
    pub global_average: Option<f64>,
    /// Fraction in [0, 1]; `None` when nothing was evaluated.
    pub pass_rate: Option<f64>,
    pub evaluated: usize,
    pub class_evolution: Vec<ClassSeries>,
}

impl HierarchyReport {
    pub fn top_subjects(&self, n: usize) -> &[GroupStat] {
        top_n(&self.subject_stats, n)
    }

    pub fn top_sub_areas(&self, n: usize) -> &[GroupStat] {
        top_n(&self.sub_area_stats, n)
    }
}

pub fn top_n(stats: &[GroupStat], n: usize) -> &[GroupStat] {
    &stats[..n.min(stats.len())]
}

#[derive(Default)]
struct Accumulator {
    sum: f64,
    count: usize,
    name: String,
}

fn add(groups: &mut BTreeMap<GroupKey, Accumulator>, key: GroupKey, name: &str, value: f64) {
    let entry = groups.entry(key).or_insert_with(|| Accumulator {
        name: name.to_string(),
        ..Default::default()
    });
    entry.sum += value;
    entry.count += 1;
}

/// Descending by average; ties broken by name then key so output is stable.
fn into_ranked(groups: BTreeMap<GroupKey, Accumulator>) -> Vec<GroupStat> {
    let mut stats: Vec<GroupStat> = groups
        .into_iter()
        .filter(|(_, acc)| acc.count > 0)
        .map(|(key, acc)| GroupStat {
            group_key: key,
            group_name: acc.name,
            average: acc.sum / acc.count as f64,
            count: acc.count,
        })
        .collect();

    stats.sort_by(|a, b| {
        b.average
            .partial_cmp(&a.average)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.group_name.cmp(&b.group_name))
            .then_with(|| a.group_key.cmp(&b.group_key))
    });
    stats
}

pub fn aggregate_hierarchy(
    catalog: &Catalog,
    cohort: &Cohort<'_>,
    contributions: &[Contribution],
) -> HierarchyReport {
    let mut subjects = BTreeMap::new();
    let mut sub_areas = BTreeMap::new();
    let mut areas = BTreeMap::new();
    let mut sum = 0.0;
    let mut passed = 0usize;

    for contribution in contributions {
        sum += contribution.value;
        if contribution.value >= PASS_MARK {
            passed += 1;
        }

        let subject = catalog.subject(&contribution.subject_id);
        let subject_name = subject
            .map(|s| s.name.as_str())
            .unwrap_or(contribution.subject_id.as_str());
        add(
            &mut subjects,
            GroupKey::Named(contribution.subject_id.clone()),
            subject_name,
            contribution.value,
        );

        let placement = subject.map(|s| catalog.placement(s)).unwrap_or_default();
        match placement.sub_area {
            Some(sa) => add(&mut sub_areas, GroupKey::Named(sa.id.clone()), &sa.name, contribution.value),
            None => add(&mut sub_areas, GroupKey::Unclassified, GENERAL_SUB_AREA, contribution.value),
        }
        match placement.area {
            Some(a) => add(&mut areas, GroupKey::Named(a.id.clone()), &a.name, contribution.value),
            None => add(&mut areas, GroupKey::Unclassified, UNCLASSIFIED_AREA, contribution.value),
        }
    }

    let evaluated = contributions.len();
    let (global_average, pass_rate) = if evaluated > 0 {
        (
            Some(sum / evaluated as f64),
            Some(passed as f64 / evaluated as f64),
        )
    } else {
        (None, None)
    };

    let report = HierarchyReport {
        subject_stats: into_ranked(subjects),
        sub_area_stats: into_ranked(sub_areas),
        area_stats: into_ranked(areas),
        global_average,
        pass_rate,
        evaluated,
        class_evolution: class_evolution(cohort),
    };
    debug!(
        evaluated,
        subjects = report.subject_stats.len(),
        classes = report.class_evolution.len(),
        "hierarchy aggregated"
    );
    report
}

/// Per-class bimester averages from recorded grades only. Classes with no
/// recorded grade at all are left out; the rest come in natural name order.
pub fn class_evolution(cohort: &Cohort<'_>) -> Vec<ClassSeries> {
    let mut series: Vec<ClassSeries> = cohort
        .classes
        .iter()
        .filter_map(|class| {
            let members: Vec<&Student> = cohort
                .students
                .iter()
                .copied()
                .filter(|s| s.class_id == class.id)
                .collect();

            let mut points = [None; 4];
            for (slot, term) in points.iter_mut().zip(TermLimit::FULL_YEAR.terms()) {
                *slot = bimester_average(cohort, &members, term);
            }

            points.iter().any(Option::is_some).then(|| ClassSeries {
                class_id: class.id.clone(),
                class_name: class.name.clone(),
                points,
            })
        })
        .collect();

    series.sort_by(|a, b| {
        sorting::compare_natural(&a.class_name, &b.class_name)
            .then_with(|| a.class_id.cmp(&b.class_id))
    });
    series
}

fn bimester_average(cohort: &Cohort<'_>, members: &[&Student], term: Term) -> Option<f64> {
    let mut sum = 0.0;
    let mut count = 0usize;
    for student in members {
        for subject_id in cohort.subject_ids {
            if let Some(value) = cohort.grades.grades_for(&student.id, subject_id).get(term) {
                sum += value;
                count += 1;
            }
        }
    }
    (count > 0).then(|| sum / count as f64)
}
