use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A closed-vocabulary code with an optional human-readable description.
///
/// Used for CPV codes, procedure types, and authority types alike: the
/// loader only needs the `code` to drive a lookup-table upsert, the
/// description is carried along opportunistically.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodelistEntry {
    pub code: String,
    pub description: Option<String>,
}

impl CodelistEntry {
    pub fn new(code: impl Into<String>, description: Option<String>) -> Self {
        Self {
            code: code.into(),
            description,
        }
    }
}

/// An identifier attached to an organization (e.g. a national business
/// registry number). `scheme` names the identifier's issuing authority or
/// format; it is optional because several legacy dialects omit it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identifier {
    pub scheme: Option<String>,
    pub value: String,
}

/// A buyer or contractor. The same nominal type serves both relational
/// roles; only `identifiers` is dropped when the loader persists it as an
/// `organizations` row (identifiers live in their own table).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Organization {
    pub official_name: String,
    pub address: Option<String>,
    pub town: Option<String>,
    pub postal_code: Option<String>,
    pub country_code: Option<String>,
    pub nuts_code: Option<String>,
    pub identifiers: Vec<Identifier>,
}

impl Organization {
    /// The structural identity tuple used for deduplication. `NULL`
    /// (`None`) fields are treated as equal to one another by the schema's
    /// unique index, so two organizations differing only in which optional
    /// field is `None` vs `Some("")` would already be distinct after
    /// trimming empties to `None` upstream.
    pub fn identity_tuple(&self) -> (&str, Option<&str>, Option<&str>, Option<&str>, Option<&str>, Option<&str>) {
        (
            self.official_name.as_str(),
            self.address.as_deref(),
            self.town.as_deref(),
            self.postal_code.as_deref(),
            self.country_code.as_deref(),
            self.nuts_code.as_deref(),
        )
    }
}

/// Identifies the source notice. `doc_id` must be present and globally
/// unique; it is the loader's idempotency key.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Document {
    pub doc_id: String,
    pub edition: Option<String>,
    pub version: Option<String>,
    pub reception_id: Option<String>,
    pub official_journal_ref: Option<String>,
    pub publication_date: Option<NaiveDate>,
    pub dispatch_date: Option<NaiveDate>,
    pub source_country: Option<String>,
    pub contact_point: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub url_general: Option<String>,
    pub buyer_url: Option<String>,
    pub buyer_authority_type: Option<CodelistEntry>,
    pub buyer_main_activity_code: Option<String>,
}

/// One procurement contract, always owned exclusively by a single notice.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Contract {
    pub title: String,
    pub short_description: Option<String>,
    pub main_cpv_code: Option<CodelistEntry>,
    pub cpv_codes: Vec<CodelistEntry>,
    pub nuts_code: Option<String>,
    pub contract_nature_code: Option<String>,
    pub procedure_type: Option<CodelistEntry>,
    pub accelerated: bool,
    pub framework_agreement: bool,
    pub eu_funded: bool,
    pub estimated_value: Option<f64>,
    pub estimated_value_currency: Option<String>,
}

/// One award within a contract (one per lot, at minimum one per notice).
/// No-award placeholder lots never reach this type; the dialect parsers
/// drop them before constructing a `Notice`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Award {
    pub award_title: Option<String>,
    pub contract_number: Option<String>,
    pub awarded_value: Option<f64>,
    pub awarded_value_currency: Option<String>,
    pub tenders_received: Option<i64>,
    pub award_date: Option<NaiveDate>,
    pub lot_number: Option<String>,
    pub contract_start_date: Option<NaiveDate>,
    pub contract_end_date: Option<NaiveDate>,
    pub contractors: Vec<Organization>,
}

/// The top-level parser output contract: one per published award notice.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Notice {
    pub document: Document,
    pub buyer: Organization,
    pub contract: Contract,
    pub awards: Vec<Award>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_tuple_distinguishes_missing_vs_present_field() {
        let a = Organization {
            official_name: "Acme".into(),
            town: Some("Berlin".into()),
            ..Default::default()
        };
        let b = Organization {
            official_name: "Acme".into(),
            town: None,
            ..Default::default()
        };
        assert_ne!(a.identity_tuple(), b.identity_tuple());
    }

    #[test]
    fn identity_tuple_equal_for_same_fields() {
        let a = Organization {
            official_name: "Acme".into(),
            country_code: Some("DE".into()),
            ..Default::default()
        };
        let b = a.clone();
        assert_eq!(a.identity_tuple(), b.identity_tuple());
    }
}
