//! Approved-credit and average reconciliation.
//!
//! The approved-credit total is computed from the stored transcript lines and
//! compared with the figure printed on the transcript summary. The printed
//! figure wins when present; a mismatch is only logged.

use crate::classifier::counts_as_approved;
use crate::db_storage::{self, CreditRow};
use crate::errors::AppError;
use crate::models::PayloadSummary;
use bigdecimal::BigDecimal;
use regex::Regex;
use serde_json::Value;
use sqlx::PgConnection;
use std::collections::BTreeMap;
use std::str::FromStr;
use std::sync::LazyLock;
use uuid::Uuid;

static PERIOD_LABEL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{4})-(\d)$").expect("period label pattern is valid"));

/// Sum of credits of every line that counts as approved.
///
/// Accumulated in `i64` and clamped to `0..=i32::MAX`.
pub fn sum_approved_credits(rows: &[CreditRow]) -> i32 {
    let total: i64 = rows
        .iter()
        .filter(|row| counts_as_approved(&row.status, row.grade))
        .map(|row| i64::from(row.credits))
        .sum();

    i32::try_from(total.max(0)).unwrap_or_else(|_| {
        tracing::warn!("Approved credit sum {} exceeds the storable range", total);
        i32::MAX
    })
}

/// First of `keys` whose value is present and not `null`.
fn first_non_null<'a>(map: &'a BTreeMap<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .filter_map(|key| map.get(*key))
        .find(|value| !value.is_null())
}

/// Approved-credit figure from the summary block (`APR`, then `apr`).
///
/// Accepts JSON numbers and numeric strings; fractional values are rounded.
/// Figures outside `0..=i32::MAX` are treated as absent.
pub fn payload_approved_credits(summary: Option<&PayloadSummary>) -> Option<i32> {
    let raw = first_non_null(&summary?.creditos, &["APR", "apr"])?;
    let rounded = numeric_value(raw)?.round();
    if !(0.0..=f64::from(i32::MAX)).contains(&rounded) {
        tracing::warn!("Ignoring out-of-range approved-credit figure {}", rounded);
        return None;
    }
    Some(rounded as i32)
}

fn numeric_value(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) if !s.trim().is_empty() => s.trim().parse::<f64>().ok(),
        _ => None,
    }
    .filter(|v| v.is_finite())
}

/// Picks the authoritative total: the printed figure when present.
pub fn resolve_total(computed: i32, from_payload: Option<i32>) -> i32 {
    match from_payload {
        Some(printed) => {
            if printed != computed {
                tracing::warn!(
                    "Approved credits differ between transcript summary ({}) and stored lines ({})",
                    printed,
                    computed
                );
            }
            printed
        }
        None => computed,
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Averages {
    /// "kardex"/"KARDEX" entry.
    pub general: Option<f64>,
    /// Entry of the latest `YYYY-C` period.
    pub latest_period: Option<f64>,
}

pub fn extract_averages(summary: Option<&PayloadSummary>) -> Averages {
    let Some(summary) = summary else {
        return Averages::default();
    };
    let promedios = &summary.promedios;

    let general = first_non_null(promedios, &["kardex", "KARDEX"]).and_then(Value::as_f64);

    let latest_period = promedios
        .iter()
        .filter_map(|(key, value)| {
            let caps = PERIOD_LABEL.captures(key)?;
            let year: i32 = caps[1].parse().ok()?;
            let cycle: i32 = caps[2].parse().ok()?;
            Some(((year, cycle), value.as_f64()?))
        })
        .max_by_key(|(period, _)| *period)
        .map(|(_, value)| value);

    Averages {
        general,
        latest_period,
    }
}

fn to_decimal(value: f64) -> Option<BigDecimal> {
    BigDecimal::from_str(&value.to_string())
        .ok()
        .map(|d| d.round(2))
}

/// Totals written back to the student.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReconciledTotals {
    pub computed_credits: i32,
    pub total_credits: i32,
    pub averages: Averages,
}

/// Recomputes and stores the student's approved credits and averages.
pub async fn reconcile_student(
    conn: &mut PgConnection,
    student_id: Uuid,
    summary: Option<&PayloadSummary>,
) -> Result<ReconciledTotals, AppError> {
    let rows = db_storage::credit_rows(&mut *conn, student_id).await?;
    let computed_credits = sum_approved_credits(&rows);
    let total_credits = resolve_total(computed_credits, payload_approved_credits(summary));
    let averages = extract_averages(summary);

    db_storage::update_student_totals(
        conn,
        student_id,
        total_credits,
        averages.general.and_then(to_decimal),
        averages.latest_period.and_then(to_decimal),
    )
    .await?;

    tracing::debug!(
        "Reconciled student {}: computed {} credits, stored {}",
        student_id,
        computed_credits,
        total_credits
    );

    Ok(ReconciledTotals {
        computed_credits,
        total_credits,
        averages,
    })
}
