//! Parser for optional integer-valued text nodes (e.g. "number of tenders
//! received"). Accepts plain integers and whole-number decimals like
//! `"3.0"`; anything else warns and returns `None`.

pub fn parse_optional_int(text: &str, field_name: &str) -> Option<i64> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(n) = trimmed.parse::<i64>() {
        return Some(n);
    }

    if let Some((whole, frac)) = trimmed.split_once('.') {
        if !whole.is_empty()
            && whole.bytes().all(|b| b.is_ascii_digit() || b == b'-')
            && !frac.is_empty()
            && frac.bytes().all(|b| b == b'0')
        {
            if let Ok(n) = whole.parse::<i64>() {
                return Some(n);
            }
        }
    }

    tracing::warn!(field = field_name, value = trimmed, "unparseable integer value");
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_integer() {
        assert_eq!(parse_optional_int("3", "tenders_received"), Some(3));
    }

    #[test]
    fn parses_whole_number_decimal() {
        assert_eq!(parse_optional_int("3.0", "tenders_received"), Some(3));
        assert_eq!(parse_optional_int("3.00", "tenders_received"), Some(3));
    }

    #[test]
    fn rejects_fractional_decimal() {
        assert_eq!(parse_optional_int("3.5", "tenders_received"), None);
    }

    #[test]
    fn rejects_garbage() {
        assert_eq!(parse_optional_int("three", "tenders_received"), None);
    }

    #[test]
    fn empty_is_absent_not_a_warning_case() {
        assert_eq!(parse_optional_int("", "tenders_received"), None);
        assert_eq!(parse_optional_int("   ", "tenders_received"), None);
    }
}
