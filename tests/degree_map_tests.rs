/// Unit tests for the degree-plan progress map
/// Tests semester bucketing, elective placement and status collapsing
use kardex_ingest::degree_map::{build_degree_map, map_status, ELECTIVE_SEMESTER};
use kardex_ingest::models::{MapStatus, Plan};
use kardex_ingest::plan_registry::{CatalogCourse, PlanDefinition, PlanRegistry};
use std::collections::HashMap;
use uuid::Uuid;

fn plan() -> Plan {
    Plan {
        id: Uuid::new_v4(),
        version: "2182".to_string(),
        name: "Ingeniería en Sistemas de Información".to_string(),
        total_credits: 393,
        suggested_terms: 9,
        social_service_credits: None,
        professional_practice_credits: None,
    }
}

fn course(code: &str, axis: Option<&str>) -> CatalogCourse {
    CatalogCourse {
        code: code.to_string(),
        name: format!("Course {}", code),
        credits: 6,
        axis: axis.map(str::to_string),
    }
}

fn statuses(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
    pairs
        .iter()
        .map(|(code, status)| (code.to_string(), status.to_string()))
        .collect()
}

fn raw(values: &[&str]) -> Vec<String> {
    values.iter().map(|s| s.to_string()).collect()
}

#[cfg(test)]
mod status_tests {
    use super::*;

    #[test]
    fn in_progress_beats_everything() {
        assert_eq!(map_status(&raw(&["FAILED", "ENROLLED"])), MapStatus::InProgress);
        assert_eq!(map_status(&raw(&["PASSED", "ENROLLED"])), MapStatus::InProgress);
    }

    #[test]
    fn approved_beats_withdrawn_and_failed() {
        assert_eq!(
            map_status(&raw(&["FAILED", "WITHDRAWN", "PASSED"])),
            MapStatus::Approved
        );
        assert_eq!(map_status(&raw(&["ACCREDITED"])), MapStatus::Approved);
        assert_eq!(map_status(&raw(&["aprobada"])), MapStatus::Approved);
    }

    #[test]
    fn withdrawn_beats_failed() {
        assert_eq!(map_status(&raw(&["FAILED", "WITHDRAWN"])), MapStatus::Withdrawn);
        assert_eq!(map_status(&raw(&["FAILED"])), MapStatus::Failed);
    }

    #[test]
    fn unknown_or_empty_is_not_taken() {
        assert_eq!(map_status(&[]), MapStatus::NotTaken);
        assert_eq!(map_status(&raw(&["UNGRADED"])), MapStatus::NotTaken);
    }
}

#[cfg(test)]
mod bucketing_tests {
    use super::*;

    fn definition() -> PlanDefinition {
        PlanDefinition {
            version: "2182".to_string(),
            name: "ISI".to_string(),
            courses: vec![
                course("04110", None),
                course("04101", None),
                course("04140", Some("E")),
                course("04200", None),
                course("04120", None),
            ],
            suggested_semesters: HashMap::from([
                ("04110".to_string(), 1),
                ("04101".to_string(), 1),
                ("04120".to_string(), 2),
            ]),
        }
    }

    #[test]
    fn electives_land_in_semester_zero_listed_last() {
        let map = build_degree_map(&plan(), &definition(), &[]);
        let semesters: Vec<u32> = map.semesters.iter().map(|s| s.semester).collect();
        assert_eq!(semesters, vec![1, 2, ELECTIVE_SEMESTER]);

        let electives = map.semesters.last().unwrap();
        assert_eq!(electives.courses.len(), 1);
        assert_eq!(electives.courses[0].code, "04140");
    }

    #[test]
    fn unmapped_mandatory_courses_are_left_out() {
        let map = build_degree_map(&plan(), &definition(), &[]);
        assert!(map
            .semesters
            .iter()
            .flat_map(|s| &s.courses)
            .all(|c| c.code != "04200"));
    }

    #[test]
    fn courses_are_sorted_by_code() {
        let map = build_degree_map(&plan(), &definition(), &[]);
        let first: Vec<&str> = map.semesters[0]
            .courses
            .iter()
            .map(|c| c.code.as_str())
            .collect();
        assert_eq!(first, vec!["04101", "04110"]);
    }

    #[test]
    fn recorded_statuses_are_merged() {
        let recorded = statuses(&[
            ("04110", "FAILED"),
            ("04110", "PASSED"),
            ("04120", "ENROLLED"),
        ]);
        let map = build_degree_map(&plan(), &definition(), &recorded);

        let find = |code: &str| {
            map.semesters
                .iter()
                .flat_map(|s| &s.courses)
                .find(|c| c.code == code)
                .map(|c| c.status)
                .unwrap()
        };
        assert_eq!(find("04110"), MapStatus::Approved);
        assert_eq!(find("04120"), MapStatus::InProgress);
        assert_eq!(find("04101"), MapStatus::NotTaken);
    }

    #[test]
    fn header_comes_from_the_stored_plan() {
        let map = build_degree_map(&plan(), &definition(), &[]);
        assert_eq!(map.plan_version, "2182");
        assert_eq!(map.plan_name, "Ingeniería en Sistemas de Información");
        assert_eq!(map.total_suggested_semesters, 9);
    }
}

#[cfg(test)]
mod builtin_plan_tests {
    use super::*;

    #[test]
    fn isi_2182_map_puts_free_electives_last() {
        let registry = PlanRegistry::builtin().unwrap();
        let definition = registry.get("2182").unwrap();
        let map = build_degree_map(&plan(), definition, &statuses(&[("04140", "PASSED")]));

        let electives = map.semesters.last().unwrap();
        assert_eq!(electives.semester, ELECTIVE_SEMESTER);
        let elective = electives
            .courses
            .iter()
            .find(|c| c.code == "04140")
            .unwrap();
        assert_eq!(elective.status, MapStatus::Approved);

        let numbered: Vec<u32> = map.semesters.iter().map(|s| s.semester).collect();
        let mut sorted = numbered[..numbered.len() - 1].to_vec();
        sorted.sort_unstable();
        assert_eq!(&numbered[..numbered.len() - 1], sorted.as_slice());
    }

    #[test]
    fn unknown_plan_version_is_unsupported() {
        let registry = PlanRegistry::builtin().unwrap();
        assert!(registry.get("9999").is_err());
    }
}
