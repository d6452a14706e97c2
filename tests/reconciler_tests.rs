/// Unit tests for credit reconciliation and the student read models
use bigdecimal::BigDecimal;
use kardex_ingest::db_storage::CreditRow;
use kardex_ingest::models::{HistoryStatus, PayloadSummary, Plan, Student, ACTIVE};
use kardex_ingest::reconciler::{
    extract_averages, payload_approved_credits, resolve_total, sum_approved_credits,
};
use kardex_ingest::summary::{build_summary, history_status};
use serde_json::json;
use std::str::FromStr;
use uuid::Uuid;

fn summary(value: serde_json::Value) -> PayloadSummary {
    serde_json::from_value(value).unwrap()
}

fn row(status: &str, grade: Option<f64>, credits: i32) -> CreditRow {
    CreditRow {
        grade,
        status: status.to_string(),
        credits,
    }
}

#[cfg(test)]
mod credit_tests {
    use super::*;

    #[test]
    fn only_approved_lines_count() {
        let rows = vec![
            row("PASSED", Some(85.0), 8),
            row("ACCREDITED", None, 6),
            row("FAILED", Some(40.0), 8),
            row("WITHDRAWN", Some(90.0), 4),
            row("ENROLLED", None, 5),
        ];
        assert_eq!(sum_approved_credits(&rows), 14);
    }

    #[test]
    fn printed_total_wins_over_computed() {
        let printed = summary(json!({ "creditos": { "APR": 120 } }));
        let from_payload = payload_approved_credits(Some(&printed));
        assert_eq!(from_payload, Some(120));
        assert_eq!(resolve_total(115, from_payload), 120);
    }

    #[test]
    fn lowercase_key_and_numeric_strings_are_accepted() {
        let printed = summary(json!({ "creditos": { "apr": " 98.6 " } }));
        assert_eq!(payload_approved_credits(Some(&printed)), Some(99));
    }

    #[test]
    fn credit_sum_saturates_instead_of_overflowing() {
        let rows = vec![
            row("PASSED", Some(90.0), i32::MAX),
            row("PASSED", Some(90.0), 1),
        ];
        assert_eq!(sum_approved_credits(&rows), i32::MAX);
    }

    #[test]
    fn out_of_range_printed_figure_is_ignored() {
        let huge = summary(json!({ "creditos": { "APR": 1e12 } }));
        assert_eq!(payload_approved_credits(Some(&huge)), None);
        let negative = summary(json!({ "creditos": { "APR": -5 } }));
        assert_eq!(payload_approved_credits(Some(&negative)), None);
        assert_eq!(resolve_total(115, payload_approved_credits(Some(&huge))), 115);
    }

    #[test]
    fn null_uppercase_key_falls_through_to_lowercase() {
        let printed = summary(json!({ "creditos": { "APR": null, "apr": 120 } }));
        assert_eq!(payload_approved_credits(Some(&printed)), Some(120));
    }

    #[test]
    fn missing_figure_falls_back_to_computed() {
        assert_eq!(payload_approved_credits(None), None);
        let empty = summary(json!({ "creditos": { "APR": "" } }));
        assert_eq!(payload_approved_credits(Some(&empty)), None);
        assert_eq!(resolve_total(115, None), 115);
    }
}

#[cfg(test)]
mod average_tests {
    use super::*;

    #[test]
    fn general_and_latest_period_are_extracted() {
        let printed = summary(json!({
            "promedios": {
                "kardex": 87.5,
                "2023-2": 80.0,
                "2024-1": 91.25,
                "2023-1": 99.0,
                "otro": 10.0
            }
        }));
        let averages = extract_averages(Some(&printed));
        assert_eq!(averages.general, Some(87.5));
        assert_eq!(averages.latest_period, Some(91.25));
    }

    #[test]
    fn uppercase_general_key_is_accepted() {
        let printed = summary(json!({ "promedios": { "KARDEX": 75.0 } }));
        let averages = extract_averages(Some(&printed));
        assert_eq!(averages.general, Some(75.0));
        assert_eq!(averages.latest_period, None);
    }

    #[test]
    fn null_general_key_falls_through_to_uppercase() {
        let printed = summary(json!({ "promedios": { "kardex": null, "KARDEX": 80.0 } }));
        assert_eq!(extract_averages(Some(&printed)).general, Some(80.0));
    }

    #[test]
    fn absent_summary_has_no_averages() {
        let averages = extract_averages(None);
        assert_eq!(averages.general, None);
        assert_eq!(averages.latest_period, None);
    }
}

#[cfg(test)]
mod summary_tests {
    use super::*;

    fn student(credits: i32) -> Student {
        Student {
            id: Uuid::new_v4(),
            folio: "219200123".to_string(),
            given_name: "ANA MARÍA".to_string(),
            paternal_surname: "LÓPEZ".to_string(),
            maternal_surname: None,
            email: "a219200123@unison.mx".to_string(),
            academic_status: ACTIVE.to_string(),
            plan_id: Uuid::new_v4(),
            english_level: Some(4.0),
            total_credits: credits,
            general_average: BigDecimal::from_str("88.40").ok(),
            period_average: None,
        }
    }

    fn plan() -> Plan {
        Plan {
            id: Uuid::new_v4(),
            version: "2182".to_string(),
            name: "ISI".to_string(),
            total_credits: 400,
            suggested_terms: 9,
            social_service_credits: Some(280),
            professional_practice_credits: Some(300),
        }
    }

    #[test]
    fn progress_and_milestones() {
        let result = build_summary(&student(290), Some(&plan()));
        assert_eq!(result.name, "ANA MARÍA LÓPEZ");
        assert_eq!(result.total_credits, 400);
        assert!((result.progress_percent - 72.5).abs() < 1e-9);
        assert!(result.social_service_enabled);
        assert!(!result.professional_practice_enabled);
        assert_eq!(result.english_level, 4.0);
    }

    #[test]
    fn previous_average_defaults_to_general() {
        let result = build_summary(&student(10), Some(&plan()));
        assert!((result.general_average - 88.4).abs() < 1e-9);
        assert!((result.previous_average - 88.4).abs() < 1e-9);
    }

    #[test]
    fn missing_plan_uses_current_credits() {
        let result = build_summary(&student(50), None);
        assert_eq!(result.total_credits, 50);
        assert!((result.progress_percent - 100.0).abs() < 1e-9);
        assert!(!result.social_service_enabled);
    }

    #[test]
    fn history_statuses_collapse() {
        assert_eq!(history_status("PASSED"), HistoryStatus::Passed);
        assert_eq!(history_status("PARTIALLY_ACCREDITED"), HistoryStatus::Passed);
        assert_eq!(history_status("FAILED"), HistoryStatus::Failed);
        assert_eq!(history_status("WITHDRAWN"), HistoryStatus::Dropped);
        assert_eq!(history_status("ENROLLED"), HistoryStatus::InProgress);
        assert_eq!(history_status("whatever"), HistoryStatus::NotTaken);
    }

    #[test]
    fn legacy_history_statuses_collapse() {
        assert_eq!(history_status("APROBADA"), HistoryStatus::Passed);
        assert_eq!(history_status("ACREDITADA"), HistoryStatus::Passed);
        assert_eq!(history_status("REPROBADA"), HistoryStatus::Failed);
        assert_eq!(history_status("BAJA_VOLUNTARIA"), HistoryStatus::Dropped);
        assert_eq!(history_status("INSCRITO"), HistoryStatus::InProgress);
        assert_eq!(history_status("SIN_CALIFICACION"), HistoryStatus::NotTaken);
    }
}
