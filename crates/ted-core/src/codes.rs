//! Code normalization for procurement data.
//!
//! Maps legacy TED dialect codes and newer eForms coded values (procedure
//! types, authority types, contract nature codes) to canonical eForms
//! codes (lowercase, hyphenated). The legacy-to-canonical mappings follow
//! the official OP-TED ted-xml-data-converter tables.

use crate::record::CodelistEntry;

/// Legacy numeric/letter authority-type codes (R2.0.7/R2.0.8), mapped to
/// canonical eForms codes. `None` means the code has no eForms equivalent.
fn legacy_numeric_authority_type(code: &str) -> Option<Option<&'static str>> {
    Some(match code {
        "1" => Some("cga"),
        "3" => Some("ra"),
        "4" => None, // "Utilities entity" — not a buyer-legal-type concept
        "5" => Some("eu-ins-bod-ag"),
        "6" => Some("body-pl"),
        "8" => None,
        "9" => None, // "Not applicable"
        "N" => Some("cga"),
        "R" => Some("body-pl-ra"),
        "Z" => None,
        _ => return None,
    })
}

/// TED v2 R2.0.9 uppercase symbolic authority-type codes.
fn legacy_symbolic_authority_type(code: &str) -> Option<Option<&'static str>> {
    Some(match code {
        "MINISTRY" => Some("cga"),
        "NATIONAL_AGENCY" => Some("cga"),
        "REGIONAL_AUTHORITY" => Some("ra"),
        "REGIONAL_AGENCY" => Some("body-pl-ra"),
        "BODY_PUBLIC" => Some("body-pl"),
        "EU_INSTITUTION" => Some("eu-ins-bod-ag"),
        "OTHER" => None,
        _ => return None,
    })
}

fn authority_type_description(code: &str) -> Option<&'static str> {
    Some(match code {
        "cga" => "Central government authority",
        "ra" => "Regional authority",
        "eu-ins-bod-ag" => "EU institution, body or agency",
        "body-pl" => "Body governed by public law",
        "body-pl-cga" => "Body governed by public law, controlled by a central government authority",
        "body-pl-la" => "Body governed by public law, controlled by a local authority",
        "body-pl-ra" => "Body governed by public law, controlled by a regional authority",
        "la" => "Local authority",
        "def-cont" => "Defence contractor",
        "int-org" => "International organisation",
        "pub-undert" => "Public undertaking",
        _ => return None,
    })
}

/// Three-stage lookup: legacy numeric/letter → legacy symbolic → canonical
/// pass-through. Unknown codes log a warning and return `None`.
pub fn normalize_authority_type(raw_code: Option<&str>) -> Option<CodelistEntry> {
    let raw_code = raw_code?;

    let canonical = if let Some(mapped) = legacy_numeric_authority_type(raw_code) {
        mapped?
    } else if let Some(mapped) = legacy_symbolic_authority_type(raw_code) {
        mapped?
    } else if authority_type_description(raw_code).is_some() {
        raw_code
    } else {
        tracing::warn!(raw_code, "unknown authority type code");
        return None;
    };

    Some(CodelistEntry::new(
        canonical,
        authority_type_description(canonical).map(str::to_string),
    ))
}

/// Legacy numeric contract-nature codes (R2.0.7/R2.0.8 `NC_CONTRACT_NATURE`).
fn legacy_numeric_contract_nature(code: &str) -> Option<&'static str> {
    Some(match code {
        "1" => "works",
        "2" => "supplies",
        "4" => "services",
        _ => return None,
    })
}

/// TED v2 R2.0.9 uppercase contract-nature codes (`TYPE_CONTRACT` `CTYPE`).
fn legacy_symbolic_contract_nature(code: &str) -> Option<&'static str> {
    Some(match code {
        "WORKS" => "works",
        "SUPPLIES" => "supplies",
        "SERVICES" => "services",
        _ => return None,
    })
}

const CONTRACT_NATURE_CODES: &[&str] = &["works", "supplies", "services", "combined"];

pub fn normalize_contract_nature(raw_code: Option<&str>) -> Option<String> {
    let raw_code = raw_code?;

    if let Some(canonical) = legacy_numeric_contract_nature(raw_code) {
        return Some(canonical.to_string());
    }
    if let Some(canonical) = legacy_symbolic_contract_nature(raw_code) {
        return Some(canonical.to_string());
    }
    if CONTRACT_NATURE_CODES.contains(&raw_code) {
        return Some(raw_code.to_string());
    }

    tracing::warn!(raw_code, "unknown contract nature code");
    None
}

/// `(canonical code or none, accelerated)`. In eForms, "accelerated" is a
/// separate boolean flag, not a procedure-type variant; legacy dialects
/// fold it into the code itself, so the legacy tables split it back out.
fn legacy_numeric_procedure_type(code: &str) -> Option<(Option<&'static str>, bool)> {
    Some(match code {
        "1" => (Some("open"), false),
        "2" => (Some("restricted"), false),
        "3" => (Some("restricted"), true),
        "4" => (Some("neg-w-call"), false),
        "6" => (Some("neg-w-call"), true),
        "9" => (None, false), // "Not applicable"
        "A" => (None, false), // direct awards, not convertible
        "B" => (Some("neg-w-call"), false),
        "C" => (Some("comp-dial"), false),
        "G" => (Some("innovation"), false),
        "T" => (Some("neg-wo-call"), false),
        "V" => (Some("neg-wo-call"), false),
        "N" => (None, false),
        "Z" => (None, false),
        _ => return None,
    })
}

fn legacy_symbolic_procedure_type(code: &str) -> Option<(Option<&'static str>, bool)> {
    Some(match code {
        "OPEN" => (Some("open"), false),
        "RESTRICTED" => (Some("restricted"), false),
        "ACCELERATED_RESTRICTED" => (Some("restricted"), true),
        "COMPETITIVE_NEGOTIATION" => (Some("neg-w-call"), false),
        "NEGOTIATED_WITH_COMPETITION" => (Some("neg-w-call"), false),
        "ACCELERATED_NEGOTIATED" => (Some("neg-w-call"), true),
        "COMPETITIVE_DIALOGUE" => (Some("comp-dial"), false),
        "INNOVATION_PARTNERSHIP" => (Some("innovation"), false),
        "AWARD_CONTRACT_WITHOUT_CALL" => (Some("neg-wo-call"), false),
        "NEGOTIATED_WITH_PRIOR_CALL" => (Some("neg-w-call"), false),
        "AWARD_CONTRACT_WITH_PRIOR_PUBLICATION" => (Some("neg-w-call"), false),
        "AWARD_CONTRACT_WITHOUT_PUBLICATION" => (Some("neg-wo-call"), false),
        "NEGOTIATED_WITHOUT_PUBLICATION" => (Some("neg-wo-call"), false),
        "INVOLVING_NEGOTIATION" => (None, false),
        _ => return None,
    })
}

fn procedure_type_description(code: &str) -> Option<&'static str> {
    Some(match code {
        "open" => "Open procedure",
        "restricted" => "Restricted procedure",
        "neg-w-call" => "Negotiated with prior call for competition",
        "comp-dial" => "Competitive dialogue",
        "innovation" => "Innovation partnership",
        "neg-wo-call" => "Negotiated without prior call for competition",
        "oth-single" => "Other single stage procedure",
        "oth-mult" => "Other multiple stage procedure",
        "comp-tend" => "Competitive tendering (Regulation 1370/2007)",
        _ => return None,
    })
}

/// Returns `(entry, accelerated)`. `raw_code == "unpublished"` is a known
/// sentinel meaning no procedure type was disclosed; it normalizes to
/// `(None, false)` without a warning.
pub fn normalize_procedure_type(
    raw_code: Option<&str>,
    description: Option<&str>,
) -> (Option<CodelistEntry>, bool) {
    let raw_code = match raw_code {
        Some(c) if c != "unpublished" => c,
        _ => return (None, false),
    };

    let (canonical, accelerated) = if let Some(r) = legacy_numeric_procedure_type(raw_code) {
        r
    } else if let Some(r) = legacy_symbolic_procedure_type(raw_code) {
        r
    } else if procedure_type_description(raw_code).is_some() {
        (Some(raw_code), false)
    } else {
        tracing::warn!(raw_code, "unknown procedure type code");
        return (None, false);
    };

    match canonical {
        None => (None, false),
        Some(canonical) => {
            let entry_description = description
                .map(str::to_string)
                .or_else(|| procedure_type_description(canonical).map(str::to_string));
            (Some(CodelistEntry::new(canonical, entry_description)), accelerated)
        }
    }
}
