//! Canonical course codes and term labels.
//!
//! Course codes on the transcript come with their leading zeros stripped
//! ("123", "4110") while the catalog uses 5-digit codes ("00123", "04110").
//! Terms arrive either as an explicit `YYYY-C` label or as a compact
//! 4-digit code where `ABCD` means year `2000 + 10*A + C`, cycle `D`.

use crate::errors::AppError;
use crate::models::PayloadLine;

const COURSE_CODE_WIDTH: usize = 5;

/// Canonicalizes a raw course code.
///
/// Non-digits are dropped. Codes shorter than 5 digits lose their leading
/// zeros and are then left-padded to exactly 5; longer codes pass through.
pub fn normalize_course_code(raw: &str) -> Result<String, AppError> {
    let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        return Err(AppError::InvalidCourseCode(raw.to_string()));
    }

    if digits.len() >= COURSE_CODE_WIDTH {
        return Ok(digits);
    }

    let significant = digits.trim_start_matches('0');
    Ok(format!("{:0>width$}", significant, width = COURSE_CODE_WIDTH))
}

/// A decoded academic term.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TermCode {
    pub year: i32,
    pub cycle: i32,
    pub label: String,
}

/// Decodes a compact 4-digit term code: `"2241"` → 2024-1.
pub fn decode_term_code(raw: &str) -> Result<TermCode, AppError> {
    let code = raw.trim();
    let digits: Vec<i32> = code
        .chars()
        .map(|c| c.to_digit(10).map(|d| d as i32))
        .collect::<Option<Vec<_>>>()
        .filter(|d| d.len() == 4)
        .ok_or_else(|| AppError::InvalidTermCode(raw.to_string()))?;

    let year = 2000 + 10 * digits[0] + digits[2];
    let cycle = digits[3];
    Ok(TermCode {
        year,
        cycle,
        label: format!("{}-{}", year, cycle),
    })
}

/// Parses an explicit `YYYY-C` label. The label is kept verbatim.
pub fn parse_term_label(raw: &str) -> Result<TermCode, AppError> {
    let label = raw.trim();
    let invalid = || AppError::InvalidTermCode(raw.to_string());

    let (year, cycle) = label.split_once('-').ok_or_else(invalid)?;
    if year.len() != 4
        || cycle.len() != 1
        || !year.chars().all(|c| c.is_ascii_digit())
        || !cycle.chars().all(|c| c.is_ascii_digit())
    {
        return Err(invalid());
    }

    Ok(TermCode {
        year: year.parse().map_err(|_| invalid())?,
        cycle: cycle.parse().map_err(|_| invalid())?,
        label: label.to_string(),
    })
}

/// Resolves the term of a transcript line; an explicit `periodo` wins over `cic`.
pub fn term_for_line(line: &PayloadLine) -> Result<TermCode, AppError> {
    match line.periodo.as_deref().map(str::trim) {
        Some(label) if !label.is_empty() => parse_term_label(label),
        _ => decode_term_code(&line.cic),
    }
}

/// Collapses runs of whitespace and trims.
pub fn collapse_whitespace(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Given name and surnames split from "GIVEN NAMES PATERNAL MATERNAL".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameParts {
    pub given: String,
    pub paternal: String,
    pub maternal: String,
}

/// The last two tokens are the surnames; everything before is the given name.
/// A single-token name is kept whole as the given name.
pub fn split_full_name(full: &str) -> NameParts {
    let mut tokens: Vec<&str> = full.split_whitespace().collect();
    if tokens.len() < 2 {
        return NameParts {
            given: collapse_whitespace(full),
            paternal: String::new(),
            maternal: String::new(),
        };
    }

    let maternal = tokens.pop().unwrap_or_default().to_string();
    let paternal = tokens.pop().unwrap_or_default().to_string();
    NameParts {
        given: tokens.join(" "),
        paternal,
        maternal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pads_short_codes() {
        assert_eq!(normalize_course_code("0123").unwrap(), "00123");
        assert_eq!(normalize_course_code("123").unwrap(), "00123");
        assert_eq!(normalize_course_code("00123").unwrap(), "00123");
        assert_eq!(normalize_course_code(" 4110 ").unwrap(), "04110");
    }

    #[test]
    fn long_codes_pass_through() {
        assert_eq!(normalize_course_code("43002").unwrap(), "43002");
        assert_eq!(normalize_course_code("0043002").unwrap(), "0043002");
    }

    #[test]
    fn all_zero_code_pads_to_zeros() {
        assert_eq!(normalize_course_code("0").unwrap(), "00000");
    }

    #[test]
    fn code_without_digits_fails() {
        assert!(matches!(
            normalize_course_code("ABC"),
            Err(AppError::InvalidCourseCode(_))
        ));
        assert!(normalize_course_code("").is_err());
    }

    #[test]
    fn decodes_compact_terms() {
        let term = decode_term_code("2222").unwrap();
        assert_eq!((term.year, term.cycle, term.label.as_str()), (2022, 2, "2022-2"));

        let term = decode_term_code("2241").unwrap();
        assert_eq!((term.year, term.cycle, term.label.as_str()), (2024, 1, "2024-1"));
    }

    #[test]
    fn rejects_malformed_compact_terms() {
        for bad in ["", "224", "22411", "22a1", "2024-1"] {
            assert!(
                matches!(decode_term_code(bad), Err(AppError::InvalidTermCode(_))),
                "{bad}"
            );
        }
    }

    #[test]
    fn explicit_label_wins_over_cic() {
        let line = PayloadLine {
            codigo: "4110".to_string(),
            cic: "2222".to_string(),
            periodo: Some("2025-1".to_string()),
            ..Default::default()
        };
        assert_eq!(term_for_line(&line).unwrap().label, "2025-1");

        let line = PayloadLine {
            periodo: Some("  ".to_string()),
            ..line
        };
        assert_eq!(term_for_line(&line).unwrap().label, "2022-2");
    }

    #[test]
    fn splits_names_on_last_two_tokens() {
        let parts = split_full_name("  MARIA  JOSE LOPEZ   GARCIA ");
        assert_eq!(parts.given, "MARIA JOSE");
        assert_eq!(parts.paternal, "LOPEZ");
        assert_eq!(parts.maternal, "GARCIA");

        let parts = split_full_name("CHER");
        assert_eq!(parts.given, "CHER");
        assert!(parts.paternal.is_empty());
    }
}
