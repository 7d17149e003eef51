use crate::error::Result;

/// Monotonic version string for the persisted schema shape.
pub const SCHEMA_VERSION: &str = "1.0.0";

// ---------------------------------------------------------------------------
// DDL
// ---------------------------------------------------------------------------

/// Full DDL for every table and index in the normalized procurement schema.
///
/// All tables use `CREATE TABLE IF NOT EXISTS` so that `run_migrations` is
/// idempotent and safe to call on an already-initialised database.
///
/// Organization identity ("nulls compare equal") is enforced by a unique
/// index over `COALESCE(field, '')` expressions rather than the bare
/// columns: plain SQLite unique constraints treat two `NULL`s as distinct,
/// which is the opposite of what the structural-identity invariant in the
/// data model requires. The same `COALESCE` expression list is used as the
/// `ON CONFLICT` target in the loader's upsert statement.
pub const CREATE_TABLES: &str = "
-- -------------------------------------------------------------------------
-- lookup tables
-- -------------------------------------------------------------------------
CREATE TABLE IF NOT EXISTS cpv_codes (
    code        TEXT NOT NULL PRIMARY KEY,
    description TEXT
);

CREATE TABLE IF NOT EXISTS procedure_types (
    code        TEXT NOT NULL PRIMARY KEY,
    description TEXT
);

CREATE TABLE IF NOT EXISTS authority_types (
    code        TEXT NOT NULL PRIMARY KEY,
    description TEXT
);

CREATE TABLE IF NOT EXISTS countries (
    code        TEXT NOT NULL PRIMARY KEY,
    name        TEXT
);

-- -------------------------------------------------------------------------
-- organizations
-- -------------------------------------------------------------------------
CREATE TABLE IF NOT EXISTS organizations (
    id            INTEGER NOT NULL PRIMARY KEY AUTOINCREMENT,
    official_name TEXT    NOT NULL,
    address       TEXT,
    town          TEXT,
    postal_code   TEXT,
    country_code  TEXT    REFERENCES countries(code),
    nuts_code     TEXT
);

CREATE UNIQUE INDEX IF NOT EXISTS uq_organizations_identity
    ON organizations (
        official_name,
        COALESCE(address, ''),
        COALESCE(town, ''),
        COALESCE(postal_code, ''),
        COALESCE(country_code, ''),
        COALESCE(nuts_code, '')
    );

CREATE TABLE IF NOT EXISTS organization_identifiers (
    organization_id INTEGER NOT NULL REFERENCES organizations(id) ON DELETE CASCADE,
    scheme          TEXT,
    identifier      TEXT    NOT NULL,
    PRIMARY KEY (scheme, identifier, organization_id)
);

-- -------------------------------------------------------------------------
-- documents
-- -------------------------------------------------------------------------
CREATE TABLE IF NOT EXISTS documents (
    doc_id                     TEXT NOT NULL PRIMARY KEY,
    edition                    TEXT,
    version                    TEXT,
    reception_id               TEXT,
    official_journal_ref       TEXT,
    publication_date           TEXT,
    dispatch_date              TEXT,
    source_country             TEXT    REFERENCES countries(code),
    contact_point              TEXT,
    phone                      TEXT,
    email                      TEXT,
    url_general                TEXT,
    buyer_url                  TEXT,
    buyer_authority_type_code  TEXT    REFERENCES authority_types(code),
    buyer_main_activity_code   TEXT,
    buyer_organization_id      INTEGER NOT NULL REFERENCES organizations(id)
);

CREATE INDEX IF NOT EXISTS idx_documents_buyer_organization_id
    ON documents (buyer_organization_id);

-- -------------------------------------------------------------------------
-- contracts
-- -------------------------------------------------------------------------
CREATE TABLE IF NOT EXISTS contracts (
    id                    INTEGER NOT NULL PRIMARY KEY AUTOINCREMENT,
    document_id           TEXT    NOT NULL REFERENCES documents(doc_id) ON DELETE CASCADE,
    title                 TEXT    NOT NULL,
    short_description     TEXT,
    main_cpv_code         TEXT    REFERENCES cpv_codes(code),
    nuts_code             TEXT,
    contract_nature_code  TEXT,
    procedure_type_code   TEXT    REFERENCES procedure_types(code),
    accelerated           INTEGER NOT NULL DEFAULT 0,
    framework_agreement   INTEGER NOT NULL DEFAULT 0,
    eu_funded             INTEGER NOT NULL DEFAULT 0,
    estimated_value       REAL,
    estimated_value_currency TEXT
);

CREATE INDEX IF NOT EXISTS idx_contracts_document_id
    ON contracts (document_id);

CREATE TABLE IF NOT EXISTS contract_cpv_codes (
    contract_id INTEGER NOT NULL REFERENCES contracts(id) ON DELETE CASCADE,
    cpv_code    TEXT    NOT NULL REFERENCES cpv_codes(code),
    PRIMARY KEY (contract_id, cpv_code)
);

-- -------------------------------------------------------------------------
-- awards
-- -------------------------------------------------------------------------
CREATE TABLE IF NOT EXISTS awards (
    id                      INTEGER NOT NULL PRIMARY KEY AUTOINCREMENT,
    contract_id             INTEGER NOT NULL REFERENCES contracts(id) ON DELETE CASCADE,
    award_title             TEXT,
    contract_number         TEXT,
    awarded_value           REAL,
    awarded_value_currency  TEXT,
    tenders_received        INTEGER,
    award_date              TEXT,
    lot_number              TEXT,
    contract_start_date     TEXT,
    contract_end_date       TEXT
);

CREATE INDEX IF NOT EXISTS idx_awards_contract_id
    ON awards (contract_id);

CREATE TABLE IF NOT EXISTS award_contractors (
    award_id        INTEGER NOT NULL REFERENCES awards(id) ON DELETE CASCADE,
    organization_id INTEGER NOT NULL REFERENCES organizations(id),
    PRIMARY KEY (award_id, organization_id)
);
";

// ---------------------------------------------------------------------------
// Migration runner
// ---------------------------------------------------------------------------

/// Initialise (or upgrade) the database schema.
///
/// This function is **idempotent**: it is safe to call on a database that
/// has already been initialised.
///
/// Steps performed:
/// 1. Enable WAL journal mode for better concurrent read performance.
/// 2. Enable foreign-key enforcement.
/// 3. Execute the full `CREATE TABLE / INDEX IF NOT EXISTS` DDL.
pub fn run_migrations(conn: &rusqlite::Connection) -> Result<()> {
    conn.execute_batch("PRAGMA journal_mode = WAL;")?;
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.execute_batch(CREATE_TABLES)?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
