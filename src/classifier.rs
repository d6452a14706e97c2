//! Transcript line classification.
//!
//! A line is classified by walking [`RULES`] in order; the first rule whose
//! predicate matches decides the status and which grade is kept.

use crate::models::PayloadLine;
use std::fmt;
use std::str::FromStr;

/// Grades strictly above this value pass.
pub const PASSING_THRESHOLD: f64 = 60.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AcademicStatus {
    Withdrawn,
    PartiallyAccredited,
    Accredited,
    Enrolled,
    Passed,
    Failed,
    Ungraded,
}

impl AcademicStatus {
    pub const ALL: [AcademicStatus; 7] = [
        AcademicStatus::Withdrawn,
        AcademicStatus::PartiallyAccredited,
        AcademicStatus::Accredited,
        AcademicStatus::Enrolled,
        AcademicStatus::Passed,
        AcademicStatus::Failed,
        AcademicStatus::Ungraded,
    ];

    /// Stored representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            AcademicStatus::Withdrawn => "WITHDRAWN",
            AcademicStatus::PartiallyAccredited => "PARTIALLY_ACCREDITED",
            AcademicStatus::Accredited => "ACCREDITED",
            AcademicStatus::Enrolled => "ENROLLED",
            AcademicStatus::Passed => "PASSED",
            AcademicStatus::Failed => "FAILED",
            AcademicStatus::Ungraded => "UNGRADED",
        }
    }
}

impl fmt::Display for AcademicStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AcademicStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_uppercase();
        AcademicStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == upper)
            .ok_or_else(|| format!("unknown academic status: {}", s))
    }
}

/// Which numeric grade a rule keeps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GradeSource {
    /// Extraordinary grade if present, else ordinary.
    Best,
    None,
}

/// The fields of a transcript line the classifier looks at, normalised.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LineFields {
    pub ordinary: Option<f64>,
    pub extraordinary: Option<f64>,
    /// Primary flag, upper-cased and trimmed.
    pub primary_flag: String,
    /// Secondary flag, upper-cased and trimmed.
    pub secondary_flag: String,
    pub withdrawals: i32,
}

impl LineFields {
    pub fn from_line(line: &PayloadLine) -> Self {
        Self {
            ordinary: line.ord,
            extraordinary: line.reg,
            primary_flag: normalize_flag(line.e1.as_deref()),
            secondary_flag: normalize_flag(line.e2.as_deref()),
            withdrawals: line.bajas.unwrap_or(0),
        }
    }

    fn best_grade(&self) -> Option<f64> {
        self.extraordinary.or(self.ordinary)
    }

    fn has_grade(&self) -> bool {
        self.ordinary.is_some() || self.extraordinary.is_some()
    }

    fn passes(&self) -> bool {
        match self.ordinary {
            Some(ord) if ord > PASSING_THRESHOLD => true,
            _ => self
                .extraordinary
                .map(|reg| reg > PASSING_THRESHOLD)
                .unwrap_or(false),
        }
    }
}

fn normalize_flag(flag: Option<&str>) -> String {
    flag.unwrap_or_default().trim().to_uppercase()
}

/// One entry of the priority list.
pub struct Rule {
    pub name: &'static str,
    pub matches: fn(&LineFields) -> bool,
    pub status: AcademicStatus,
    pub grade: GradeSource,
}

/// Ordered decision list; the first match wins.
pub const RULES: &[Rule] = &[
    Rule {
        name: "withdrawal",
        matches: |f| f.withdrawals > 0 || f.secondary_flag == "BV",
        status: AcademicStatus::Withdrawn,
        grade: GradeSource::Best,
    },
    Rule {
        name: "partial_accreditation",
        matches: |f| {
            (f.primary_flag.starts_with("PAR") && f.secondary_flag.contains("ACRED"))
                || f.secondary_flag.contains("PARC.ACRED")
        },
        status: AcademicStatus::PartiallyAccredited,
        grade: GradeSource::None,
    },
    Rule {
        name: "accreditation",
        matches: |f| f.primary_flag.contains("ACRED") || f.secondary_flag.contains("ACRED"),
        status: AcademicStatus::Accredited,
        grade: GradeSource::None,
    },
    Rule {
        name: "active_section",
        matches: |f| f.secondary_flag == "1" || f.secondary_flag == "2",
        status: AcademicStatus::Enrolled,
        grade: GradeSource::None,
    },
    Rule {
        name: "approved_without_grade",
        matches: |f| !f.has_grade() && f.secondary_flag == "A",
        status: AcademicStatus::Passed,
        grade: GradeSource::None,
    },
    Rule {
        name: "passing_grade",
        matches: |f| f.has_grade() && f.passes(),
        status: AcademicStatus::Passed,
        grade: GradeSource::Best,
    },
    Rule {
        name: "failing_grade",
        matches: |f| f.has_grade(),
        status: AcademicStatus::Failed,
        grade: GradeSource::Best,
    },
];

/// Status and resolved grade of a transcript line.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Classification {
    pub status: AcademicStatus,
    pub grade: Option<f64>,
}

pub fn classify_fields(fields: &LineFields) -> Classification {
    RULES
        .iter()
        .find(|rule| (rule.matches)(fields))
        .map(|rule| Classification {
            status: rule.status,
            grade: match rule.grade {
                GradeSource::Best => fields.best_grade(),
                GradeSource::None => None,
            },
        })
        .unwrap_or(Classification {
            status: AcademicStatus::Ungraded,
            grade: None,
        })
}

pub fn classify(line: &PayloadLine) -> Classification {
    classify_fields(&LineFields::from_line(line))
}

/// Whether a stored line contributes its credits to the approved total.
///
/// Works on the raw stored text so rows written under older status names
/// still count.
pub fn counts_as_approved(status: &str, grade: Option<f64>) -> bool {
    let status = status.trim().to_uppercase();
    if status.is_empty() && grade.is_none() {
        return false;
    }

    const NOT_APPROVED: [&str; 8] = [
        "WITHDRAWN",
        "ENROLLED",
        "UNGRADED",
        "FAILED",
        "BAJA_VOLUNTARIA",
        "INSCRITO",
        "SIN_CALIFICACION",
        "REPROBADA",
    ];
    if NOT_APPROVED.contains(&status.as_str()) {
        return false;
    }

    matches!(
        status.as_str(),
        "ACCREDITED" | "PARTIALLY_ACCREDITED" | "PASSED" | "APROBADA"
    ) || status.contains("ACRED")
        || grade.map(|g| g > PASSING_THRESHOLD).unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rule_names_are_unique_and_ordered() {
        let names: Vec<_> = RULES.iter().map(|r| r.name).collect();
        assert_eq!(
            names,
            vec![
                "withdrawal",
                "partial_accreditation",
                "accreditation",
                "active_section",
                "approved_without_grade",
                "passing_grade",
                "failing_grade",
            ]
        );
    }

    #[test]
    fn status_round_trips_through_text() {
        for status in AcademicStatus::ALL {
            assert_eq!(status.as_str().parse::<AcademicStatus>().unwrap(), status);
        }
        assert!("APROBADA".parse::<AcademicStatus>().is_err());
    }
}
