use serde::{Deserialize, Serialize};

use crate::catalog::Catalog;
use crate::models::{Id, StudentStatus, Subject};

/// Hierarchical subject scope. `None` / empty means "all" at that level.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubjectFilter {
    pub formation_id: Option<Id>,
    pub area_id: Option<Id>,
    pub sub_area_ids: Vec<Id>,
    pub subject_id: Option<Id>,
}

impl SubjectFilter {
    pub fn is_hierarchical(&self) -> bool {
        self.formation_id.is_some() || self.area_id.is_some() || !self.sub_area_ids.is_empty()
    }

    /// A subject without a sub-area only matches when no hierarchy level is
    /// selected, since it belongs to no area or formation.
    pub fn matches(&self, catalog: &Catalog, subject: &Subject) -> bool {
        if let Some(id) = &self.subject_id {
            if &subject.id != id {
                return false;
            }
        }
        if !self.is_hierarchical() {
            return true;
        }

        let placement = catalog.placement(subject);
        let Some(sub_area) = placement.sub_area else {
            return false;
        };

        if !self.sub_area_ids.is_empty() && !self.sub_area_ids.contains(&sub_area.id) {
            return false;
        }
        if let Some(area_id) = &self.area_id {
            if &sub_area.knowledge_area_id != area_id {
                return false;
            }
        }
        if let Some(formation_id) = &self.formation_id {
            if placement.area.map(|a| &a.formation_type_id) != Some(formation_id) {
                return false;
            }
        }
        true
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewFilters {
    pub year: i32,
    pub status: Option<StudentStatus>,
    pub class_id: Option<Id>,
    pub subjects: SubjectFilter,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FilterKey {
    Year,
    Status,
    Class,
    Formation,
    Area,
    SubArea,
    Subject,
}

/// Clears every filter that depends on `changed`. A year change drops the
/// class; each curriculum level drops the levels below it.
pub fn reset_dependents(mut filters: ViewFilters, changed: FilterKey) -> ViewFilters {
    match changed {
        FilterKey::Year => {
            filters.class_id = None;
        }
        FilterKey::Formation => {
            filters.subjects.area_id = None;
            filters.subjects.sub_area_ids.clear();
            filters.subjects.subject_id = None;
        }
        FilterKey::Area => {
            filters.subjects.sub_area_ids.clear();
            filters.subjects.subject_id = None;
        }
        FilterKey::SubArea => {
            filters.subjects.subject_id = None;
        }
        FilterKey::Status | FilterKey::Class | FilterKey::Subject => {}
    }
    filters
}

pub fn status_matches(filter: Option<StudentStatus>, status: StudentStatus) -> bool {
    filter.map_or(true, |wanted| wanted == status)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::fixtures::catalog;

    fn full_filters() -> ViewFilters {
        ViewFilters {
            year: 2026,
            status: Some(StudentStatus::Active),
            class_id: Some(Id::from("c1")),
            subjects: SubjectFilter {
                formation_id: Some(Id::from("fgb")),
                area_id: Some(Id::from("a-exatas")),
                sub_area_ids: vec![Id::from("sa-nat")],
                subject_id: Some(Id::from("fis")),
            },
        }
    }

    #[test]
    fn formation_change_cascades_down() {
        let filters = reset_dependents(full_filters(), FilterKey::Formation);
        assert_eq!(filters.subjects.formation_id, Some(Id::from("fgb")));
        assert_eq!(filters.subjects.area_id, None);
        assert!(filters.subjects.sub_area_ids.is_empty());
        assert_eq!(filters.subjects.subject_id, None);
        assert_eq!(filters.class_id, Some(Id::from("c1")));
    }

    #[test]
    fn sub_area_change_only_drops_subject() {
        let filters = reset_dependents(full_filters(), FilterKey::SubArea);
        assert_eq!(filters.subjects.area_id, Some(Id::from("a-exatas")));
        assert_eq!(filters.subjects.sub_area_ids, vec![Id::from("sa-nat")]);
        assert_eq!(filters.subjects.subject_id, None);
    }

    #[test]
    fn year_change_drops_class() {
        let filters = reset_dependents(full_filters(), FilterKey::Year);
        assert_eq!(filters.class_id, None);
        assert_eq!(filters.subjects, full_filters().subjects);
    }

    #[test]
    fn hierarchical_filter_excludes_unclassified_subjects() {
        let catalog = catalog();
        let pv = catalog.subject(&Id::from("pv")).unwrap();
        let bio = catalog.subject(&Id::from("bio")).unwrap();
        let por = catalog.subject(&Id::from("por")).unwrap();

        assert!(SubjectFilter::default().matches(&catalog, pv));

        let by_formation = SubjectFilter {
            formation_id: Some(Id::from("fgb")),
            ..Default::default()
        };
        assert!(!by_formation.matches(&catalog, pv));
        assert!(by_formation.matches(&catalog, bio));
        assert!(!by_formation.matches(&catalog, por));

        let by_sub_area = SubjectFilter {
            sub_area_ids: vec![Id::from("sa-lin")],
            ..Default::default()
        };
        assert!(by_sub_area.matches(&catalog, por));
        assert!(!by_sub_area.matches(&catalog, bio));
    }
}
