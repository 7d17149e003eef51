//! The transactional, idempotent loader: the only component that mutates
//! persistent state. `save` operates within a caller-provided transaction;
//! [`Loader::save_archive`] is the entry point the orchestrator actually
//! calls, wrapping one transaction around every notice in an archive.

use std::collections::{HashMap, HashSet};

use rusqlite::{params, Transaction};

use crate::db::DbPool;
use crate::error::{Result, TedError};
use crate::record::{CodelistEntry, Notice, Organization};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    Saved,
    Duplicate,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ArchiveReport {
    pub saved: usize,
    pub skipped: usize,
}

pub struct Loader {
    pool: DbPool,
}

impl Loader {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Runs every notice through [`save`] inside one transaction scoped to
    /// the whole archive. Any error aborts the transaction; already-saved
    /// notices from an earlier, separately-committed archive are untouched.
    pub fn save_archive(&self, notices: &[Notice]) -> Result<ArchiveReport> {
        let mut conn = self.pool.get().map_err(|e| TedError::Pool(e.to_string()))?;
        let tx = conn.transaction()?;

        let mut report = ArchiveReport::default();
        for notice in notices {
            match save(&tx, notice)? {
                SaveOutcome::Saved => report.saved += 1,
                SaveOutcome::Duplicate => report.skipped += 1,
            }
        }

        tx.commit()?;
        tracing::info!(saved = report.saved, skipped = report.skipped, "archive persisted");
        Ok(report)
    }
}

/// `save(tx, notice) -> { saved } | { saved: false, reason: duplicate }`.
///
/// Procedure (§4.5): duplicate check, country normalization, lookup
/// upserts, buyer upsert, document insert, contract insert, CPV junction,
/// per-award inserts, and a final multi-row `award_contractors` insert.
pub fn save(tx: &Transaction, notice: &Notice) -> Result<SaveOutcome> {
    if document_exists(tx, &notice.document.doc_id)? {
        return Ok(SaveOutcome::Duplicate);
    }

    let buyer_country = normalize_country_code(notice.buyer.country_code.as_deref());
    let source_country = normalize_country_code(notice.document.source_country.as_deref());
    let contractor_countries: Vec<Option<String>> = notice
        .awards
        .iter()
        .flat_map(|a| a.contractors.iter())
        .map(|c| normalize_country_code(c.country_code.as_deref()))
        .collect();

    let mut countries: HashSet<String> = HashSet::new();
    countries.extend(buyer_country.iter().cloned());
    countries.extend(source_country.iter().cloned());
    countries.extend(contractor_countries.into_iter().flatten());
    for code in &countries {
        upsert_country(tx, code)?;
    }

    if let Some(authority_type) = &notice.document.buyer_authority_type {
        upsert_lookup(tx, "authority_types", authority_type)?;
    }
    if let Some(procedure_type) = &notice.contract.procedure_type {
        upsert_lookup(tx, "procedure_types", procedure_type)?;
    }

    let mut cpv_by_code: HashMap<&str, Option<&str>> = HashMap::new();
    if let Some(main) = &notice.contract.main_cpv_code {
        cpv_by_code.insert(main.code.as_str(), main.description.as_deref());
    }
    for cpv in &notice.contract.cpv_codes {
        cpv_by_code
            .entry(cpv.code.as_str())
            .or_insert(cpv.description.as_deref());
    }
    for (code, description) in &cpv_by_code {
        upsert_cpv(tx, code, *description)?;
    }

    let mut buyer = notice.buyer.clone();
    buyer.country_code = buyer_country;
    let buyer_id = upsert_organization(tx, &buyer)?;
    upsert_identifiers(tx, buyer_id, &buyer.identifiers)?;

    insert_document(tx, notice, &source_country, buyer_id)?;
    let contract_id = insert_contract(tx, notice)?;

    for code in cpv_by_code.keys() {
        tx.execute(
            "INSERT OR IGNORE INTO contract_cpv_codes (contract_id, cpv_code) VALUES (?1, ?2)",
            params![contract_id, code],
        )?;
    }

    let mut award_contractor_pairs: Vec<(i64, i64)> = Vec::new();
    for award in &notice.awards {
        let award_id = insert_award(tx, contract_id, award)?;

        let mut seen_for_award: HashSet<i64> = HashSet::new();
        for contractor in &award.contractors {
            let mut normalized = contractor.clone();
            normalized.country_code = normalize_country_code(contractor.country_code.as_deref());
            let org_id = upsert_organization(tx, &normalized)?;
            upsert_identifiers(tx, org_id, &normalized.identifiers)?;
            if seen_for_award.insert(org_id) {
                award_contractor_pairs.push((award_id, org_id));
            }
        }
    }

    for (award_id, org_id) in &award_contractor_pairs {
        tx.execute(
            "INSERT OR IGNORE INTO award_contractors (award_id, organization_id) VALUES (?1, ?2)",
            params![award_id, org_id],
        )?;
    }

    Ok(SaveOutcome::Saved)
}

/// `UK -> GB`, `1A -> null`, uppercase. Applied at the loader boundary, not
/// by the dialect parsers.
fn normalize_country_code(raw: Option<&str>) -> Option<String> {
    let raw = raw?.trim();
    if raw.is_empty() {
        return None;
    }
    let upper = raw.to_uppercase();
    match upper.as_str() {
        "UK" => Some("GB".to_string()),
        "1A" => None,
        _ => Some(upper),
    }
}

fn document_exists(tx: &Transaction, doc_id: &str) -> Result<bool> {
    let count: i64 = tx.query_row(
        "SELECT COUNT(*) FROM documents WHERE doc_id = ?1",
        params![doc_id],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

fn upsert_country(tx: &Transaction, code: &str) -> Result<()> {
    let name = crate::countries::country_name(code);
    tx.execute(
        "INSERT INTO countries (code, name) VALUES (?1, ?2)
         ON CONFLICT(code) DO UPDATE SET name = COALESCE(excluded.name, countries.name)",
        params![code, name],
    )?;
    Ok(())
}

fn upsert_cpv(tx: &Transaction, code: &str, description: Option<&str>) -> Result<()> {
    tx.execute(
        "INSERT INTO cpv_codes (code, description) VALUES (?1, ?2)
         ON CONFLICT(code) DO UPDATE SET description = COALESCE(excluded.description, cpv_codes.description)",
        params![code, description],
    )?;
    Ok(())
}

/// Generic `ON CONFLICT (code) DO UPDATE SET description = COALESCE(...)`
/// upsert shared by `authority_types` and `procedure_types`; both have the
/// identical `(code, description)` shape.
fn upsert_lookup(tx: &Transaction, table: &'static str, entry: &CodelistEntry) -> Result<()> {
    let sql = format!(
        "INSERT INTO {table} (code, description) VALUES (?1, ?2)
         ON CONFLICT(code) DO UPDATE SET description = COALESCE(excluded.description, {table}.description)"
    );
    tx.execute(&sql, params![entry.code, entry.description])?;
    Ok(())
}

/// Upserts on the structural identity tuple; `official_name` is
/// overwritten on conflict (latest-wins, see the design notes on this
/// policy). Returns the organization's surrogate id either way.
fn upsert_organization(tx: &Transaction, org: &Organization) -> Result<i64> {
    tx.query_row(
        "INSERT INTO organizations (official_name, address, town, postal_code, country_code, nuts_code)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)
         ON CONFLICT (
             official_name,
             COALESCE(address, ''), COALESCE(town, ''), COALESCE(postal_code, ''),
             COALESCE(country_code, ''), COALESCE(nuts_code, '')
         )
         DO UPDATE SET official_name = excluded.official_name
         RETURNING id",
        params![
            org.official_name,
            org.address,
            org.town,
            org.postal_code,
            org.country_code,
            org.nuts_code,
        ],
        |row| row.get(0),
    )
    .map_err(TedError::from)
}

fn upsert_identifiers(tx: &Transaction, org_id: i64, identifiers: &[crate::record::Identifier]) -> Result<()> {
    for ident in identifiers {
        tx.execute(
            "INSERT OR IGNORE INTO organization_identifiers (organization_id, scheme, identifier)
             VALUES (?1, ?2, ?3)",
            params![org_id, ident.scheme, ident.value],
        )?;
    }
    Ok(())
}

fn insert_document(
    tx: &Transaction,
    notice: &Notice,
    source_country: &Option<String>,
    buyer_organization_id: i64,
) -> Result<()> {
    let doc = &notice.document;
    tx.execute(
        "INSERT INTO documents (
            doc_id, edition, version, reception_id, official_journal_ref,
            publication_date, dispatch_date, source_country, contact_point,
            phone, email, url_general, buyer_url, buyer_authority_type_code,
            buyer_main_activity_code, buyer_organization_id
         ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)",
        params![
            doc.doc_id,
            doc.edition,
            doc.version,
            doc.reception_id,
            doc.official_journal_ref,
            doc.publication_date.map(|d| d.to_string()),
            doc.dispatch_date.map(|d| d.to_string()),
            source_country,
            doc.contact_point,
            doc.phone,
            doc.email,
            doc.url_general,
            doc.buyer_url,
            doc.buyer_authority_type.as_ref().map(|e| e.code.as_str()),
            doc.buyer_main_activity_code,
            buyer_organization_id,
        ],
    )?;
    Ok(())
}

fn insert_contract(tx: &Transaction, notice: &Notice) -> Result<i64> {
    let c = &notice.contract;
    tx.query_row(
        "INSERT INTO contracts (
            document_id, title, short_description, main_cpv_code, nuts_code,
            contract_nature_code, procedure_type_code, accelerated,
            framework_agreement, eu_funded, estimated_value, estimated_value_currency
         ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
         RETURNING id",
        params![
            notice.document.doc_id,
            c.title,
            c.short_description,
            c.main_cpv_code.as_ref().map(|e| e.code.as_str()),
            c.nuts_code,
            c.contract_nature_code,
            c.procedure_type.as_ref().map(|e| e.code.as_str()),
            c.accelerated as i64,
            c.framework_agreement as i64,
            c.eu_funded as i64,
            c.estimated_value,
            c.estimated_value_currency,
        ],
        |row| row.get(0),
    )
    .map_err(TedError::from)
}

fn insert_award(tx: &Transaction, contract_id: i64, award: &crate::record::Award) -> Result<i64> {
    tx.query_row(
        "INSERT INTO awards (
            contract_id, award_title, contract_number, awarded_value,
            awarded_value_currency, tenders_received, award_date, lot_number,
            contract_start_date, contract_end_date
         ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
         RETURNING id",
        params![
            contract_id,
            award.award_title,
            award.contract_number,
            award.awarded_value,
            award.awarded_value_currency,
            award.tenders_received,
            award.award_date.map(|d| d.to_string()),
            award.lot_number,
            award.contract_start_date.map(|d| d.to_string()),
            award.contract_end_date.map(|d| d.to_string()),
        ],
        |row| row.get(0),
    )
    .map_err(TedError::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::create_memory_pool;
    use crate::record::{Award, Contract, Document, Identifier};

    fn notice(doc_id: &str, contractor_name: &str, contractor_country: &str) -> Notice {
        Notice {
            document: Document {
                doc_id: doc_id.to_string(),
                source_country: Some("DE".into()),
                ..Default::default()
            },
            buyer: Organization {
                official_name: "Test Body".into(),
                country_code: Some("DE".into()),
                ..Default::default()
            },
            contract: Contract {
                title: "Test".into(),
                main_cpv_code: Some(CodelistEntry::new("45000000", None)),
                ..Default::default()
            },
            awards: vec![Award {
                awarded_value: Some(50000.0),
                awarded_value_currency: Some("EUR".into()),
                contractors: vec![Organization {
                    official_name: contractor_name.to_string(),
                    country_code: Some(contractor_country.to_string()),
                    nuts_code: Some("DE212".into()),
                    identifiers: vec![Identifier {
                        scheme: Some("national".into()),
                        value: "HRB123".into(),
                    }],
                    ..Default::default()
                }],
                ..Default::default()
            }],
        }
    }

    fn row_count(tx: &Transaction, table: &str) -> i64 {
        tx.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |r| r.get(0))
            .unwrap()
    }

    #[test]
    fn s1_single_award_single_contractor() {
        let pool = create_memory_pool().unwrap();
        let mut conn = pool.get().unwrap();
        let tx = conn.transaction().unwrap();

        let n = notice("12345-2024", "GmbH", "DE");
        assert_eq!(save(&tx, &n).unwrap(), SaveOutcome::Saved);

        assert_eq!(row_count(&tx, "documents"), 1);
        assert_eq!(row_count(&tx, "contracts"), 1);
        assert_eq!(row_count(&tx, "awards"), 1);
        assert_eq!(row_count(&tx, "organizations"), 2);
        assert_eq!(row_count(&tx, "contract_cpv_codes"), 1);
        assert_eq!(row_count(&tx, "award_contractors"), 1);
        assert_eq!(row_count(&tx, "countries"), 1);
    }

    #[test]
    fn s2_reimport_same_notice_is_duplicate() {
        let pool = create_memory_pool().unwrap();
        let mut conn = pool.get().unwrap();
        let tx = conn.transaction().unwrap();

        let n = notice("12345-2024", "GmbH", "DE");
        assert_eq!(save(&tx, &n).unwrap(), SaveOutcome::Saved);
        assert_eq!(save(&tx, &n).unwrap(), SaveOutcome::Duplicate);
        assert_eq!(row_count(&tx, "documents"), 1);
        assert_eq!(row_count(&tx, "awards"), 1);
    }

    #[test]
    fn s3_shared_contractor_across_notices_dedupes_organization() {
        let pool = create_memory_pool().unwrap();
        let mut conn = pool.get().unwrap();
        let tx = conn.transaction().unwrap();

        save(&tx, &notice("A-2024", "Shared GmbH", "DE")).unwrap();
        save(&tx, &notice("B-2024", "Shared GmbH", "DE")).unwrap();

        assert_eq!(row_count(&tx, "documents"), 2);
        // buyer (shared, identical) + 1 contractor = 2 organizations total.
        assert_eq!(row_count(&tx, "organizations"), 2);
        assert_eq!(row_count(&tx, "award_contractors"), 2);
    }

    #[test]
    fn s4_uk_normalizes_to_gb() {
        let pool = create_memory_pool().unwrap();
        let mut conn = pool.get().unwrap();
        let tx = conn.transaction().unwrap();

        let mut n = notice("UK-2024", "UK Ltd", "uk");
        n.document.source_country = Some("UK".into());
        n.buyer.country_code = Some("UK".into());
        save(&tx, &n).unwrap();

        let codes: Vec<String> = tx
            .prepare("SELECT code FROM countries")
            .unwrap()
            .query_map([], |r| r.get(0))
            .unwrap()
            .collect::<rusqlite::Result<_>>()
            .unwrap();
        assert_eq!(codes, vec!["GB".to_string()]);
    }

    #[test]
    fn s6_cpv_description_carries_forward() {
        let pool = create_memory_pool().unwrap();
        let mut conn = pool.get().unwrap();
        let tx = conn.transaction().unwrap();

        let mut a = notice("A-2024", "X", "DE");
        a.contract.main_cpv_code = Some(CodelistEntry::new("45000000", Some("Construction work".into())));
        save(&tx, &a).unwrap();

        let mut b = notice("B-2024", "Y", "DE");
        b.contract.main_cpv_code = Some(CodelistEntry::new("45000000", None));
        save(&tx, &b).unwrap();

        let description: Option<String> = tx
            .query_row(
                "SELECT description FROM cpv_codes WHERE code = '45000000'",
                [],
                |r| r.get(0),
            )
            .unwrap();
        assert_eq!(description.as_deref(), Some("Construction work"));
    }

    #[test]
    fn cpv_intra_contract_dedup() {
        let pool = create_memory_pool().unwrap();
        let mut conn = pool.get().unwrap();
        let tx = conn.transaction().unwrap();

        let mut n = notice("C-2024", "X", "DE");
        n.contract.main_cpv_code = Some(CodelistEntry::new("45000000", None));
        n.contract.cpv_codes = vec![
            CodelistEntry::new("45000000", None),
            CodelistEntry::new("45000000", None),
        ];
        save(&tx, &n).unwrap();

        assert_eq!(row_count(&tx, "contract_cpv_codes"), 1);
    }

    #[test]
    fn s5_multi_lot_contract_two_awards_two_contractors() {
        let pool = create_memory_pool().unwrap();
        let mut conn = pool.get().unwrap();
        let tx = conn.transaction().unwrap();

        let mut n = notice("MULTI-2024", "Lot One Co", "DE");
        n.awards.push(Award {
            awarded_value: Some(75000.0),
            awarded_value_currency: Some("EUR".into()),
            lot_number: Some("2".into()),
            contractors: vec![Organization {
                official_name: "Lot Two Co".into(),
                country_code: Some("FR".into()),
                ..Default::default()
            }],
            ..Default::default()
        });
        save(&tx, &n).unwrap();

        assert_eq!(row_count(&tx, "contracts"), 1);
        assert_eq!(row_count(&tx, "awards"), 2);
        assert_eq!(row_count(&tx, "organizations"), 3); // buyer + 2 distinct contractors
        assert_eq!(row_count(&tx, "award_contractors"), 2);
    }

    #[test]
    fn organizations_with_differing_identity_are_not_deduped() {
        let pool = create_memory_pool().unwrap();
        let mut conn = pool.get().unwrap();
        let tx = conn.transaction().unwrap();

        save(&tx, &notice("A-2024", "Acme", "DE")).unwrap();
        save(&tx, &notice("B-2024", "Acme", "FR")).unwrap();

        // Two distinct contractors (differing country) + 2 buyers (same
        // identity tuple, deduped to 1) = 3 organizations.
        assert_eq!(row_count(&tx, "organizations"), 3);
    }
}
