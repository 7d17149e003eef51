//! Strict, mutually exclusive date parsers.
//!
//! Each parser accepts exactly one lexical shape and returns `None` for
//! anything else — it must never fall through into a different format.
//! [`parse_date`] runs all of them and treats more than one match as a
//! programming error (the parser set is no longer disjoint).

use chrono::NaiveDate;

fn all_ascii_digits(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

/// `"20081231"` — exactly 8 digits, no separators.
pub fn parse_date_yyyymmdd(text: &str) -> Option<NaiveDate> {
    let s = text.trim();
    if s.len() != 8 || !all_ascii_digits(s) {
        return None;
    }
    let year: i32 = s[0..4].parse().ok()?;
    let month: u32 = s[4..6].parse().ok()?;
    let day: u32 = s[6..8].parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, day)
}

/// `"2024-01-15"` — exactly `YYYY-MM-DD`, hyphens only.
pub fn parse_date_iso(text: &str) -> Option<NaiveDate> {
    let s = text.trim();
    if !is_plain_iso_shape(s) {
        return None;
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()
}

fn is_plain_iso_shape(s: &str) -> bool {
    let b = s.as_bytes();
    b.len() == 10
        && b[0..4].iter().all(|c| c.is_ascii_digit())
        && b[4] == b'-'
        && b[5..7].iter().all(|c| c.is_ascii_digit())
        && b[7] == b'-'
        && b[8..10].iter().all(|c| c.is_ascii_digit())
}

/// `"2025-01-02+01:00"`, `"2025-01-02-05:00"`, or `"2025-01-02Z"` — an ISO
/// date with a timezone offset or `Z` suffix. The timezone is discarded;
/// only the date part is retained.
pub fn parse_date_iso_offset(text: &str) -> Option<NaiveDate> {
    let s = text.trim();
    if s.len() < 11 || !is_plain_iso_shape(&s[0..10]) {
        return None;
    }
    let rest = &s[10..];
    let has_valid_suffix = rest == "Z"
        || (rest.len() == 6
            && (rest.as_bytes()[0] == b'+' || rest.as_bytes()[0] == b'-')
            && rest.as_bytes()[1..3].iter().all(|c| c.is_ascii_digit())
            && rest.as_bytes()[3] == b':'
            && rest.as_bytes()[4..6].iter().all(|c| c.is_ascii_digit()));
    if !has_valid_suffix {
        return None;
    }
    NaiveDate::parse_from_str(&s[0..10], "%Y-%m-%d").ok()
}

const DATE_PARSERS: &[(&str, fn(&str) -> Option<NaiveDate>)] = &[
    ("yyyymmdd", parse_date_yyyymmdd),
    ("iso", parse_date_iso),
    ("iso_offset", parse_date_iso_offset),
];

/// Runs every date parser and accepts exactly one match.
///
/// - No match: logs a warning, returns `Ok(None)` — the field becomes
///   absent, the notice is still saved (`UnparseableValue` in the error
///   handling design).
/// - Exactly one match: `Ok(Some(date))`.
/// - More than one match: `Err` — the parser set is no longer disjoint.
pub fn parse_date(text: &str, field_name: &str) -> Result<Option<NaiveDate>, crate::error::TedError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }

    let mut matches: Vec<(&'static str, NaiveDate)> = Vec::new();
    for (name, parser) in DATE_PARSERS {
        if let Some(d) = parser(trimmed) {
            matches.push((name, d));
        }
    }

    match matches.len() {
        0 => {
            tracing::warn!(field = field_name, value = trimmed, "no date parser matched");
            Ok(None)
        }
        1 => Ok(Some(matches[0].1)),
        _ => Err(crate::error::TedError::AmbiguousParse {
            raw: trimmed.to_string(),
            matches: matches.iter().map(|(n, _)| *n).collect(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn yyyymmdd_matches_only_its_own_format() {
        assert_eq!(
            parse_date_yyyymmdd("20081231"),
            NaiveDate::from_ymd_opt(2008, 12, 31)
        );
        assert!(parse_date_yyyymmdd("2008-12-31").is_none());
        assert!(parse_date_yyyymmdd("20081232").is_none());
    }

    #[test]
    fn iso_matches_only_its_own_format() {
        assert_eq!(parse_date_iso("2024-01-15"), NaiveDate::from_ymd_opt(2024, 1, 15));
        assert!(parse_date_iso("20240115").is_none());
        assert!(parse_date_iso("2024-01-15+01:00").is_none());
    }

    #[test]
    fn iso_offset_discards_timezone() {
        assert_eq!(
            parse_date_iso_offset("2025-01-02+01:00"),
            NaiveDate::from_ymd_opt(2025, 1, 2)
        );
        assert_eq!(
            parse_date_iso_offset("2025-01-02-05:00"),
            NaiveDate::from_ymd_opt(2025, 1, 2)
        );
        assert_eq!(
            parse_date_iso_offset("2025-01-02Z"),
            NaiveDate::from_ymd_opt(2025, 1, 2)
        );
        assert!(parse_date_iso_offset("2025-01-02").is_none());
    }

    #[test]
    fn aggregator_returns_none_on_empty() {
        assert_eq!(parse_date("", "pub_date").unwrap(), None);
        assert_eq!(parse_date("   ", "pub_date").unwrap(), None);
    }

    #[test]
    fn aggregator_returns_none_and_warns_on_garbage() {
        assert_eq!(parse_date("not a date", "pub_date").unwrap(), None);
    }

    #[test]
    fn aggregator_picks_the_single_matching_format() {
        assert_eq!(
            parse_date("20240115", "pub_date").unwrap(),
            NaiveDate::from_ymd_opt(2024, 1, 15)
        );
        assert_eq!(
            parse_date("2024-01-15", "pub_date").unwrap(),
            NaiveDate::from_ymd_opt(2024, 1, 15)
        );
        assert_eq!(
            parse_date("2024-01-15Z", "pub_date").unwrap(),
            NaiveDate::from_ymd_opt(2024, 1, 15)
        );
    }

    #[test]
    fn each_parser_is_strict_per_testable_property_8() {
        let samples = ["20240115", "2024-01-15", "2024-01-15Z", "2024-01-15+02:00"];
        for sample in samples {
            let hits = DATE_PARSERS
                .iter()
                .filter(|(_, parser)| parser(sample).is_some())
                .count();
            assert_eq!(hits, 1, "expected exactly one parser to match {sample:?}");
        }
    }
}
