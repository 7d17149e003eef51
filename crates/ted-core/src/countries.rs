//! ISO 3166-1 alpha-2 country-code-to-name lookup, plus an overlay for a
//! small set of codes that predate the current standard but still appear
//! in older TED notices.

/// Codes seen in TED archives that are not current ISO 3166-1 entries.
const HISTORICAL: &[(&str, &str)] = &[("AN", "Netherlands Antilles")];

/// A working subset of ISO 3166-1 alpha-2, covering EU/EEA member states
/// and the countries that appear routinely as contractor or buyer
/// nationalities in TED notices.
const ISO_3166: &[(&str, &str)] = &[
    ("AT", "Austria"),
    ("BE", "Belgium"),
    ("BG", "Bulgaria"),
    ("HR", "Croatia"),
    ("CY", "Cyprus"),
    ("CZ", "Czechia"),
    ("DK", "Denmark"),
    ("EE", "Estonia"),
    ("FI", "Finland"),
    ("FR", "France"),
    ("DE", "Germany"),
    ("GR", "Greece"),
    ("HU", "Hungary"),
    ("IE", "Ireland"),
    ("IT", "Italy"),
    ("LV", "Latvia"),
    ("LT", "Lithuania"),
    ("LU", "Luxembourg"),
    ("MT", "Malta"),
    ("NL", "Netherlands"),
    ("PL", "Poland"),
    ("PT", "Portugal"),
    ("RO", "Romania"),
    ("SK", "Slovakia"),
    ("SI", "Slovenia"),
    ("ES", "Spain"),
    ("SE", "Sweden"),
    ("GB", "United Kingdom"),
    ("IS", "Iceland"),
    ("LI", "Liechtenstein"),
    ("NO", "Norway"),
    ("CH", "Switzerland"),
    ("US", "United States"),
    ("CA", "Canada"),
    ("JP", "Japan"),
    ("CN", "China"),
    ("AU", "Australia"),
    ("NZ", "New Zealand"),
    ("TR", "Turkey"),
    ("UA", "Ukraine"),
    ("RS", "Serbia"),
    ("ME", "Montenegro"),
    ("MK", "North Macedonia"),
    ("AL", "Albania"),
    ("BA", "Bosnia and Herzegovina"),
    ("XK", "Kosovo"),
    ("MD", "Moldova"),
    ("GE", "Georgia"),
    ("AM", "Armenia"),
    ("AZ", "Azerbaijan"),
    ("IL", "Israel"),
    ("IN", "India"),
    ("KR", "South Korea"),
    ("BR", "Brazil"),
    ("ZA", "South Africa"),
];

/// Looks up the human-readable name for an ISO 3166-1 alpha-2 code
/// (case-sensitive, expects an already-uppercased code). Checks the
/// historical overlay first since it covers codes the current standard no
/// longer assigns.
pub fn country_name(code: &str) -> Option<&'static str> {
    HISTORICAL
        .iter()
        .chain(ISO_3166.iter())
        .find(|(c, _)| *c == code)
        .map(|(_, name)| *name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_member_state_resolves() {
        assert_eq!(country_name("DE"), Some("Germany"));
    }

    #[test]
    fn historical_an_overlay_resolves() {
        assert_eq!(country_name("AN"), Some("Netherlands Antilles"));
    }

    #[test]
    fn unknown_code_is_none() {
        assert_eq!(country_name("ZZ"), None);
    }

    #[test]
    fn uk_itself_is_not_the_normalized_form_but_still_a_valid_lookup_of_gb() {
        // UK->GB normalization happens at the loader boundary, not here;
        // this module only resolves whatever code it's given.
        assert_eq!(country_name("GB"), Some("United Kingdom"));
        assert_eq!(country_name("UK"), None);
    }
}
