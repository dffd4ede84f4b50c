use std::collections::BTreeMap;

use crate::models::{Id, KnowledgeArea, SchoolClass, SubArea, Subject};
use crate::sorting;

/// Curriculum lookups: subjects, their sub-area and knowledge area, and classes.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    subjects: BTreeMap<Id, Subject>,
    sub_areas: BTreeMap<Id, SubArea>,
    areas: BTreeMap<Id, KnowledgeArea>,
    classes: BTreeMap<Id, SchoolClass>,
}

/// Where a subject sits in the knowledge-area hierarchy. Either level may be
/// absent when the subject is unclassified or a link is dangling.
#[derive(Debug, Clone, Copy, Default)]
pub struct Placement<'a> {
    pub sub_area: Option<&'a SubArea>,
    pub area: Option<&'a KnowledgeArea>,
}

impl Catalog {
    pub fn new(
        subjects: Vec<Subject>,
        sub_areas: Vec<SubArea>,
        areas: Vec<KnowledgeArea>,
        classes: Vec<SchoolClass>,
    ) -> Self {
        Self {
            subjects: subjects.into_iter().map(|s| (s.id.clone(), s)).collect(),
            sub_areas: sub_areas.into_iter().map(|s| (s.id.clone(), s)).collect(),
            areas: areas.into_iter().map(|a| (a.id.clone(), a)).collect(),
            classes: classes.into_iter().map(|c| (c.id.clone(), c)).collect(),
        }
    }

    pub fn subject(&self, id: &Id) -> Option<&Subject> {
        self.subjects.get(id)
    }

    pub fn class(&self, id: &Id) -> Option<&SchoolClass> {
        self.classes.get(id)
    }

    pub fn placement(&self, subject: &Subject) -> Placement<'_> {
        let sub_area = subject
            .sub_area_id
            .as_ref()
            .and_then(|id| self.sub_areas.get(id));
        let area = sub_area.and_then(|sa| self.areas.get(&sa.knowledge_area_id));
        Placement { sub_area, area }
    }

    /// Classes of a year in natural name order.
    pub fn classes_for_year(&self, year: i32) -> Vec<&SchoolClass> {
        let mut classes: Vec<&SchoolClass> =
            self.classes.values().filter(|c| c.year == year).collect();
        classes.sort_by(|a, b| sorting::compare_natural(&a.name, &b.name).then_with(|| a.id.cmp(&b.id)));
        classes
    }

    pub fn subjects_for_year(&self, year: i32) -> Vec<&Subject> {
        self.subjects.values().filter(|s| s.year == year).collect()
    }

    /// Subjects offered to a class, in display order. Unknown ids are skipped.
    pub fn subjects_of_class(&self, class: &SchoolClass) -> Vec<&Subject> {
        let mut subjects: Vec<&Subject> = class
            .subject_ids
            .iter()
            .filter_map(|id| self.subjects.get(id))
            .collect();
        subjects.sort_by(|a, b| sorting::compare_subjects(a, b));
        subjects
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use std::collections::BTreeSet;

    use super::*;
    use crate::models::Periodicity;

    pub fn subject(id: &str, name: &str, sub_area: Option<&str>) -> Subject {
        Subject {
            id: Id::from(id),
            name: name.to_string(),
            year: 2026,
            periodicity: Periodicity::Annual,
            sub_area_id: sub_area.map(Id::from),
        }
    }

    /// Two formations, two areas, three sub-areas and one unclassified subject.
    pub fn catalog() -> Catalog {
        let subjects = vec![
            subject("mat", "MATEMÁTICA", Some("sa-mat")),
            subject("fis", "FÍSICA", Some("sa-nat")),
            subject("bio", "BIOLOGIA", Some("sa-nat")),
            subject("por", "LÍNGUA PORTUGUESA", Some("sa-lin")),
            subject("pv", "PROJETO DE VIDA", None),
        ];
        let sub_areas = vec![
            SubArea {
                id: Id::from("sa-mat"),
                name: "Matemática".to_string(),
                knowledge_area_id: Id::from("a-exatas"),
            },
            SubArea {
                id: Id::from("sa-nat"),
                name: "Ciências da Natureza".to_string(),
                knowledge_area_id: Id::from("a-exatas"),
            },
            SubArea {
                id: Id::from("sa-lin"),
                name: "Linguagens".to_string(),
                knowledge_area_id: Id::from("a-humanas"),
            },
        ];
        let areas = vec![
            KnowledgeArea {
                id: Id::from("a-exatas"),
                name: "Exatas".to_string(),
                formation_type_id: Id::from("fgb"),
            },
            KnowledgeArea {
                id: Id::from("a-humanas"),
                name: "Humanas".to_string(),
                formation_type_id: Id::from("ifp"),
            },
        ];
        let all: BTreeSet<Id> = ["mat", "fis", "bio", "por", "pv"]
            .into_iter()
            .map(Id::from)
            .collect();
        let classes = vec![
            SchoolClass {
                id: Id::from("c1"),
                name: "1º A".to_string(),
                year: 2026,
                subject_ids: all.clone(),
            },
            SchoolClass {
                id: Id::from("c2"),
                name: "10º A".to_string(),
                year: 2026,
                subject_ids: all.clone(),
            },
            SchoolClass {
                id: Id::from("c3"),
                name: "2º A".to_string(),
                year: 2026,
                subject_ids: all,
            },
        ];
        Catalog::new(subjects, sub_areas, areas, classes)
    }
}
