//! Strict monetary-literal parsers.
//!
//! Each parser accepts exactly one lexical shape found in TED notices and
//! returns `None` for everything else. [`parse_monetary_value`] is the
//! aggregator the loader actually calls; it combines the subset of these
//! parsers that is pairwise disjoint (see the module-level note on
//! `parse_float_dot_decimal_1`, which is deliberately left out).

fn digits(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

/// `"885,72"` — digits, comma, exactly 2 decimal digits.
pub fn parse_float_comma_decimal(s: &str) -> Option<f64> {
    let s = s.trim();
    let (whole, frac) = s.split_once(',')?;
    if frac.len() != 2 || !digits(whole) || !digits(frac) {
        return None;
    }
    format!("{whole}.{frac}").parse().ok()
}

/// `"72,8"` — digits, comma, exactly 1 decimal digit.
pub fn parse_float_comma_decimal_1(s: &str) -> Option<f64> {
    let s = s.trim();
    let (whole, frac) = s.split_once(',')?;
    if frac.len() != 1 || !digits(whole) || !digits(frac) {
        return None;
    }
    format!("{whole}.{frac}").parse().ok()
}

/// `"40,0000"` — digits, comma, exactly 4 decimal digits.
pub fn parse_float_comma_decimal_4(s: &str) -> Option<f64> {
    let s = s.trim();
    let (whole, frac) = s.split_once(',')?;
    if frac.len() != 4 || !digits(whole) || !digits(frac) {
        return None;
    }
    format!("{whole}.{frac}").parse().ok()
}

/// `"1234.56"` or `"1234"` — digits with an optional dot and any number of
/// trailing decimal digits. Deliberately *not* limited to 2 decimal
/// places: that's the ground-truth shape, and it is the reason
/// `parse_float_dot_decimal_1` (exactly 1 decimal digit) is never wired
/// into the aggregator below — this parser already matches that shape too,
/// and including both would make the parser set ambiguous.
pub fn parse_float_dot_decimal(s: &str) -> Option<f64> {
    let s = s.trim();
    match s.split_once('.') {
        None => digits(s).then(|| s.parse().ok()).flatten(),
        Some((whole, frac)) => {
            (digits(whole) && digits(frac)).then(|| s.parse().ok()).flatten()
        }
    }
}

/// `"979828.1"` — digits, dot, exactly 1 decimal digit. Strictly subsumed
/// by [`parse_float_dot_decimal`]; kept only as a standalone utility, never
/// wired into [`parse_monetary_value`].
pub fn parse_float_dot_decimal_1(s: &str) -> Option<f64> {
    let s = s.trim();
    let (whole, frac) = s.split_once('.')?;
    if frac.len() != 1 || !digits(whole) || !digits(frac) {
        return None;
    }
    s.parse().ok()
}

fn space_grouped_whole(s: &str) -> Option<String> {
    let groups: Vec<&str> = s.split(' ').collect();
    if groups.is_empty() || groups.iter().any(|g| g.is_empty()) {
        return None;
    }
    if !digits(groups[0]) || groups[0].len() > 3 {
        return None;
    }
    for g in &groups[1..] {
        if g.len() != 3 || !digits(g) {
            return None;
        }
    }
    Some(groups.concat())
}

/// `"10 760 400"`, `"1 234,56"`, `"1 234.56"` — space-grouped thousands
/// with an optional 2-digit decimal part (comma or dot). Requires at least
/// one space.
pub fn parse_float_space_thousands(s: &str) -> Option<f64> {
    let s = s.trim();
    if !s.contains(' ') {
        return None;
    }
    let (int_part, frac) = match s.rsplit_once(|c| c == ',' || c == '.') {
        Some((before, after)) if after.len() == 2 && digits(after) => (before, Some(after)),
        _ => (s, None),
    };
    let whole = space_grouped_whole(int_part)?;
    match frac {
        Some(f) => format!("{whole}.{f}").parse().ok(),
        None => whole.parse().ok(),
    }
}

/// `"56 146,820"` — space-grouped thousands, comma decimal, exactly 3
/// decimal digits.
pub fn parse_float_space_thousands_comma_3(s: &str) -> Option<f64> {
    parse_space_thousands_comma_n(s, 3)
}

/// `"264 886,8600"` — space-grouped thousands, comma decimal, exactly 4
/// decimal digits.
pub fn parse_float_space_thousands_comma_4(s: &str) -> Option<f64> {
    parse_space_thousands_comma_n(s, 4)
}

fn parse_space_thousands_comma_n(s: &str, n: usize) -> Option<f64> {
    let s = s.trim();
    if !s.contains(' ') {
        return None;
    }
    let (int_part, frac) = s.rsplit_once(',')?;
    if frac.len() != n || !digits(frac) {
        return None;
    }
    let whole = space_grouped_whole(int_part)?;
    format!("{whole}.{frac}").parse().ok()
}

/// `"1 011  606,51"` — single-space thousands groups except a double
/// space immediately before the final group, comma decimal with exactly 2
/// digits. An archival artifact of inconsistent TED whitespace.
pub fn parse_float_doublespace_thousands(s: &str) -> Option<f64> {
    let s = s.trim();
    let (int_part, frac) = s.rsplit_once(',')?;
    if frac.len() != 2 || !digits(frac) {
        return None;
    }
    let (head, last_group) = int_part.rsplit_once("  ")?;
    if last_group.len() != 3 || !digits(last_group) {
        return None;
    }
    let whole = if head.is_empty() {
        return None;
    } else {
        space_grouped_whole(head)? + last_group
    };
    format!("{whole}.{frac}").parse().ok()
}

/// `"600,000"` or `"1,234,567"` — comma as thousands separator, no
/// decimal part, 1-3 groups of exactly 3 digits after the leading group.
pub fn parse_int_comma_thousands(s: &str) -> Option<f64> {
    let s = s.trim();
    let groups: Vec<&str> = s.split(',').collect();
    if groups.len() < 2 || groups.len() > 4 {
        return None;
    }
    if !digits(groups[0]) || groups[0].is_empty() || groups[0].len() > 3 {
        return None;
    }
    for g in &groups[1..] {
        if g.len() != 3 || !digits(g) {
            return None;
        }
    }
    groups.concat().parse().ok()
}

/// `"Value: 10 760 400  EUR."` — a free-text EUR value announcement seen
/// in a handful of legacy notices.
pub fn parse_monetary_value_space_thousands_eur(s: &str) -> Option<f64> {
    let s = s.trim();
    let inner = s
        .strip_prefix("Value:")
        .or_else(|| s.strip_prefix("value:"))?
        .trim_start();
    let inner = inner.strip_suffix('.')?;
    let inner = inner
        .strip_suffix("EUR")
        .or_else(|| inner.strip_suffix("eur"))?
        .trim_end();
    let inner = inner.trim_end_matches(' ');
    if inner.contains(',') {
        let (whole, frac) = inner.rsplit_once(',')?;
        let whole = space_grouped_whole(whole)?;
        format!("{whole}.{frac}").parse().ok()
    } else {
        space_grouped_whole(inner)?.parse().ok()
    }
}

/// `(parser name, function)` pairs combined by [`parse_monetary_value`].
/// `parse_float_dot_decimal_1` is intentionally excluded — see its doc
/// comment.
const MONETARY_PARSERS: &[(&str, fn(&str) -> Option<f64>)] = &[
    ("comma_decimal", parse_float_comma_decimal),
    ("comma_decimal_1", parse_float_comma_decimal_1),
    ("comma_decimal_4", parse_float_comma_decimal_4),
    ("dot_decimal", parse_float_dot_decimal),
    ("space_thousands", parse_float_space_thousands),
    ("space_thousands_comma_3", parse_float_space_thousands_comma_3),
    ("space_thousands_comma_4", parse_float_space_thousands_comma_4),
    ("doublespace_thousands", parse_float_doublespace_thousands),
    ("int_comma_thousands", parse_int_comma_thousands),
    ("value_space_thousands_eur", parse_monetary_value_space_thousands_eur),
];

/// Runs every wired monetary parser and accepts exactly one match.
pub fn parse_monetary_value(
    value_str: &str,
    field_name: &str,
) -> Result<Option<f64>, crate::error::TedError> {
    let trimmed = value_str.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }

    let mut matches: Vec<(&'static str, f64)> = Vec::new();
    for (name, parser) in MONETARY_PARSERS {
        if let Some(v) = parser(trimmed) {
            matches.push((name, v));
        }
    }

    match matches.len() {
        0 => {
            tracing::warn!(field = field_name, value = trimmed, "no monetary parser matched");
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
    fn comma_decimal_basic() {
        assert_eq!(parse_float_comma_decimal("885,72"), Some(885.72));
        assert!(parse_float_comma_decimal("885,7").is_none());
    }

    #[test]
    fn dot_decimal_accepts_any_decimal_width() {
        assert_eq!(parse_float_dot_decimal("1234.56"), Some(1234.56));
        assert_eq!(parse_float_dot_decimal("1234"), Some(1234.0));
        assert_eq!(parse_float_dot_decimal("1234.5"), Some(1234.5));
    }

    #[test]
    fn space_thousands_basic() {
        assert_eq!(parse_float_space_thousands("10 760 400"), Some(10_760_400.0));
        assert_eq!(parse_float_space_thousands("1 234,56"), Some(1234.56));
        assert_eq!(parse_float_space_thousands("1 234.56"), Some(1234.56));
        assert!(parse_float_space_thousands("1234").is_none());
    }

    #[test]
    fn space_thousands_comma_3_and_4() {
        assert_eq!(parse_float_space_thousands_comma_3("56 146,820"), Some(56146.820));
        assert_eq!(
            parse_float_space_thousands_comma_4("264 886,8600"),
            Some(264886.8600)
        );
    }

    #[test]
    fn doublespace_thousands_basic() {
        assert_eq!(
            parse_float_doublespace_thousands("1 011  606,51"),
            Some(1_011_606.51)
        );
        assert_eq!(parse_float_doublespace_thousands("336  256,12"), Some(336_256.12));
    }

    #[test]
    fn int_comma_thousands_basic() {
        assert_eq!(parse_int_comma_thousands("600,000"), Some(600_000.0));
        assert_eq!(parse_int_comma_thousands("1,234,567"), Some(1_234_567.0));
    }

    #[test]
    fn value_space_thousands_eur_basic() {
        assert_eq!(
            parse_monetary_value_space_thousands_eur("Value: 10 760 400  EUR."),
            Some(10_760_400.0)
        );
    }

    #[test]
    fn dot_decimal_1_is_subsumed_and_excluded_from_aggregator() {
        assert_eq!(parse_float_dot_decimal_1("979828.1"), Some(979828.1));
        assert!(
            !MONETARY_PARSERS.iter().any(|(name, _)| *name == "dot_decimal_1"),
            "dot_decimal_1 must not be wired: it overlaps with dot_decimal"
        );
    }

    #[test]
    fn aggregator_picks_single_match() {
        assert_eq!(
            parse_monetary_value("50000,00", "awarded_value").unwrap(),
            Some(50000.0)
        );
        assert_eq!(
            parse_monetary_value("10 760 400", "awarded_value").unwrap(),
            Some(10_760_400.0)
        );
    }

    #[test]
    fn aggregator_returns_none_for_garbage() {
        assert_eq!(parse_monetary_value("not a number", "x").unwrap(), None);
        assert_eq!(parse_monetary_value("", "x").unwrap(), None);
    }

    #[test]
    fn wired_parsers_are_pairwise_disjoint_on_sample_corpus() {
        let samples = [
            "885,72", "72,8", "40,0000", "1234.56", "1234", "10 760 400", "1 234,56",
            "56 146,820", "264 886,8600", "1 011  606,51", "600,000", "1,234,567",
            "Value: 10 760 400  EUR.",
        ];
        for sample in samples {
            let hits = MONETARY_PARSERS
                .iter()
                .filter(|(_, parser)| parser(sample).is_some())
                .count();
            assert_eq!(hits, 1, "expected exactly one parser to match {sample:?}");
        }
    }
}
