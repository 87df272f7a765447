// 📚 Citations - Rule code → legal authority
//
// Citation lookup is a side channel: it runs after the violations are final
// and a failed lookup only degrades the citation status of one violation.
// The audit itself never fails because of it.
//
// Sources:
// - StaticCitationTable: built-in FCRA / Metro-2 anchors (always available)
// - SqliteCitationStore: operator-maintained table, loaded from CSV

use crate::error::CitationError;
use crate::violation::{RuleCode, RuleFamily, Violation};
use anyhow::{Context, Result};
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Mutex;
use tracing::warn;

// ============================================================================
// CITATION
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Citation {
    pub anchor_id: String,
    pub source_document: String,

    #[serde(default)]
    pub page_range: Option<String>,

    pub statute: String,
}

impl Citation {
    pub fn new(
        anchor_id: impl Into<String>,
        source_document: impl Into<String>,
        statute: impl Into<String>,
    ) -> Self {
        Citation {
            anchor_id: anchor_id.into(),
            source_document: source_document.into(),
            page_range: None,
            statute: statute.into(),
        }
    }

    pub fn with_pages(self, page_range: impl Into<String>) -> Self {
        Citation {
            page_range: Some(page_range.into()),
            ..self
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "status", content = "reason", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CitationStatus {
    /// Not looked up yet
    #[default]
    Pending,
    Resolved,

    /// The source has no entry for this rule code
    Missing,

    /// The source could not answer
    Failed(String),
}

// ============================================================================
// CITATION SOURCE
// ============================================================================

/// Maps a rule code to its citation
pub trait CitationSource: Send + Sync {
    fn lookup(&self, rule_code: RuleCode) -> Result<Citation, CitationError>;
}

/// Look up a citation and attach it, degrading instead of failing
pub fn enrich(violation: Violation, source: &dyn CitationSource) -> Violation {
    match source.lookup(violation.rule_code) {
        Ok(citation) => violation.with_citation(Some(citation), CitationStatus::Resolved),
        Err(CitationError::NotFound(_)) => violation.with_citation(None, CitationStatus::Missing),
        Err(e) => {
            warn!(rule_code = %violation.rule_code, error = %e, "citation lookup failed");
            violation.with_citation(None, CitationStatus::Failed(e.to_string()))
        }
    }
}

/// Entries checked first, falling through to another source
pub struct LayeredCitations<'a> {
    pub overrides: &'a BTreeMap<RuleCode, Citation>,
    pub fallback: &'a dyn CitationSource,
}

impl CitationSource for LayeredCitations<'_> {
    fn lookup(&self, rule_code: RuleCode) -> Result<Citation, CitationError> {
        match self.overrides.get(&rule_code) {
            Some(citation) => Ok(citation.clone()),
            None => self.fallback.lookup(rule_code),
        }
    }
}

// ============================================================================
// STATIC TABLE
// ============================================================================

const FCRA: &str = "Fair Credit Reporting Act, 15 U.S.C. §1681 et seq.";
const CRRG: &str = "Credit Reporting Resource Guide (Metro 2 Format)";

#[derive(Debug, Clone, Default)]
pub struct StaticCitationTable {
    entries: BTreeMap<RuleCode, Citation>,
}

impl StaticCitationTable {
    pub fn new(entries: BTreeMap<RuleCode, Citation>) -> Self {
        StaticCitationTable { entries }
    }

    /// Built-in citation for every rule code
    pub fn standard() -> Self {
        let entries = RuleCode::ALL
            .iter()
            .map(|code| (*code, standard_citation(*code)))
            .collect();
        StaticCitationTable { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl CitationSource for StaticCitationTable {
    fn lookup(&self, rule_code: RuleCode) -> Result<Citation, CitationError> {
        self.entries
            .get(&rule_code)
            .cloned()
            .ok_or(CitationError::NotFound(rule_code))
    }
}

fn standard_citation(code: RuleCode) -> Citation {
    match code {
        RuleCode::DofdMissing
        | RuleCode::DofdNotZeroFilled
        | RuleCode::DofdModifiedAfterLock
        | RuleCode::StatusRegressionReaging
        | RuleCode::DebtBuyerDofdChanged => {
            Citation::new("FCRA-623-A5", FCRA, "15 U.S.C. §1681s-2(a)(5)")
        }
        RuleCode::ObsoleteReporting | RuleCode::PublicRecordObsolete => {
            Citation::new("FCRA-605-A", FCRA, "15 U.S.C. §1681c(a)")
        }
        RuleCode::DofdBeforeDateOpened | RuleCode::DofdHistoryMismatch => {
            Citation::new("CRRG-FIELD-25", CRRG, "15 U.S.C. §1681s-2(a)(5)")
        }
        RuleCode::CollectorMissingOriginalCreditor
        | RuleCode::DoubleBalance
        | RuleCode::OwnershipConflict => {
            Citation::new("CRRG-K1-K2", CRRG, "15 U.S.C. §1681s-2(a)(1)(A)")
        }
        RuleCode::HistoryProhibitedForFurnisher
        | RuleCode::HistoryMissingForDebtBuyer
        | RuleCode::InvalidHistorySymbol
        | RuleCode::HistoryExceedsAccountAge
        | RuleCode::LadderInversion
        | RuleCode::HistoryStatusConflict => {
            Citation::new("CRRG-FIELD-18", CRRG, "15 U.S.C. §1681s-2(a)(2)")
        }
        RuleCode::InvalidFieldCode | RuleCode::UnrecognizedFieldCode | RuleCode::ObsoleteFieldCode => {
            Citation::new("CRRG-BASE-SEGMENT", CRRG, "15 U.S.C. §1681s-2(a)(1)(A)")
        }
        _ => match code.family() {
            RuleFamily::Balance => {
                Citation::new("CRRG-FIELD-21", CRRG, "15 U.S.C. §1681s-2(a)(2)")
            }
            RuleFamily::Identity | RuleFamily::PublicRecord | RuleFamily::Inquiry => {
                Citation::new("FCRA-607-B", FCRA, "15 U.S.C. §1681e(b)")
            }
            _ => Citation::new("FCRA-623-A1", FCRA, "15 U.S.C. §1681s-2(a)(1)(A)"),
        },
    }
}

// ============================================================================
// SQLITE STORE
// ============================================================================

/// One row of a citation CSV
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CitationRecord {
    pub rule_code: String,
    pub anchor_id: String,
    pub source_document: String,

    #[serde(default)]
    pub page_range: Option<String>,

    pub statute: String,
}

impl CitationRecord {
    pub fn into_entry(self) -> Result<(RuleCode, Citation)> {
        let code = RuleCode::from_str_code(self.rule_code.trim())
            .with_context(|| format!("Unknown rule code in citation table: {}", self.rule_code))?;
        let citation = Citation {
            anchor_id: self.anchor_id,
            source_document: self.source_document,
            page_range: self.page_range.filter(|p| !p.trim().is_empty()),
            statute: self.statute,
        };
        Ok((code, citation))
    }
}

pub fn load_csv(csv_path: &Path) -> Result<Vec<CitationRecord>> {
    let mut rdr = csv::Reader::from_path(csv_path)
        .with_context(|| format!("Failed to open citation CSV {}", csv_path.display()))?;

    let mut records = Vec::new();
    for result in rdr.deserialize() {
        let record: CitationRecord = result.context("Failed to deserialize citation row")?;
        records.push(record);
    }
    Ok(records)
}

/// Citation table kept in SQLite
///
/// The connection sits behind a mutex so the store can be shared across
/// threads as a `CitationSource`.
pub struct SqliteCitationStore {
    conn: Mutex<Connection>,
}

impl SqliteCitationStore {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open citation store {}", path.display()))?;
        Self::from_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        setup_database(&conn)?;
        Ok(SqliteCitationStore {
            conn: Mutex::new(conn),
        })
    }

    fn connection(&self) -> Result<std::sync::MutexGuard<'_, Connection>, CitationError> {
        self.conn.lock().map_err(|_| CitationError::Poisoned)
    }

    /// Insert or replace the citation for one rule code
    pub fn upsert(&self, rule_code: RuleCode, citation: &Citation) -> Result<(), CitationError> {
        let conn = self.connection()?;
        conn.execute(
            "INSERT INTO citations (rule_code, anchor_id, source_document, page_range, statute)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(rule_code) DO UPDATE SET
                anchor_id = excluded.anchor_id,
                source_document = excluded.source_document,
                page_range = excluded.page_range,
                statute = excluded.statute",
            params![
                rule_code.as_str(),
                citation.anchor_id,
                citation.source_document,
                citation.page_range,
                citation.statute,
            ],
        )?;
        Ok(())
    }

    /// Load a CSV file into the store, returning the number of rows written
    pub fn import_csv(&self, csv_path: &Path) -> Result<usize> {
        let records = load_csv(csv_path)?;
        let mut imported = 0;
        for record in records {
            let (code, citation) = record.into_entry()?;
            self.upsert(code, &citation)
                .with_context(|| format!("Failed to store citation for {}", code))?;
            imported += 1;
        }
        Ok(imported)
    }

    pub fn count(&self) -> Result<usize, CitationError> {
        let conn = self.connection()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM citations", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}

impl CitationSource for SqliteCitationStore {
    fn lookup(&self, rule_code: RuleCode) -> Result<Citation, CitationError> {
        let conn = self.connection()?;
        let citation = conn
            .query_row(
                "SELECT anchor_id, source_document, page_range, statute
                 FROM citations WHERE rule_code = ?1",
                params![rule_code.as_str()],
                |row| {
                    Ok(Citation {
                        anchor_id: row.get(0)?,
                        source_document: row.get(1)?,
                        page_range: row.get(2)?,
                        statute: row.get(3)?,
                    })
                },
            )
            .optional()?;
        citation.ok_or(CitationError::NotFound(rule_code))
    }
}

pub fn setup_database(conn: &Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS citations (
            rule_code TEXT PRIMARY KEY,
            anchor_id TEXT NOT NULL,
            source_document TEXT NOT NULL,
            page_range TEXT,
            statute TEXT NOT NULL,
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP
        )",
        [],
    )
    .context("Failed to create citations table")?;
    Ok(())
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::Bureau;
    use crate::violation::{Evidence, Severity};
    use std::io::Write;

    fn violation(code: RuleCode) -> Violation {
        Violation::new(
            code,
            Severity::High,
            "r-1",
            Bureau::Experian,
            "test",
            Evidence::Identity {
                field: "ssn".to_string(),
                detail: None,
            },
        )
    }

    struct BrokenSource;

    impl CitationSource for BrokenSource {
        fn lookup(&self, _rule_code: RuleCode) -> Result<Citation, CitationError> {
            Err(CitationError::Poisoned)
        }
    }

    #[test]
    fn test_standard_table_covers_every_code() {
        let table = StaticCitationTable::standard();
        assert_eq!(table.len(), RuleCode::ALL.len());

        let citation = table.lookup(RuleCode::DofdModifiedAfterLock).unwrap();
        assert_eq!(citation.statute, "15 U.S.C. §1681s-2(a)(5)");
    }

    #[test]
    fn test_enrich_statuses() {
        let resolved = enrich(violation(RuleCode::SsnMissing), &StaticCitationTable::standard());
        assert_eq!(resolved.citation_status, CitationStatus::Resolved);
        assert!(resolved.citation.is_some());

        let missing = enrich(violation(RuleCode::SsnMissing), &StaticCitationTable::default());
        assert_eq!(missing.citation_status, CitationStatus::Missing);
        assert!(missing.citation.is_none());

        let failed = enrich(violation(RuleCode::SsnMissing), &BrokenSource);
        assert!(matches!(failed.citation_status, CitationStatus::Failed(_)));
        assert_eq!(failed.severity, Severity::High);
    }

    #[test]
    fn test_layered_overrides_win() {
        let mut overrides = BTreeMap::new();
        overrides.insert(
            RuleCode::SsnMissing,
            Citation::new("LOCAL-1", "Local policy", "n/a").with_pages("3-4"),
        );
        let fallback = StaticCitationTable::standard();
        let layered = LayeredCitations {
            overrides: &overrides,
            fallback: &fallback,
        };

        assert_eq!(layered.lookup(RuleCode::SsnMissing).unwrap().anchor_id, "LOCAL-1");
        assert_eq!(
            layered.lookup(RuleCode::DoubleBalance).unwrap().anchor_id,
            "CRRG-K1-K2"
        );
    }

    #[test]
    fn test_sqlite_store_round_trip() {
        let store = SqliteCitationStore::open_in_memory().unwrap();
        assert!(matches!(
            store.lookup(RuleCode::DoubleBalance),
            Err(CitationError::NotFound(RuleCode::DoubleBalance))
        ));

        let citation = Citation::new("CRRG-K1", CRRG, "15 U.S.C. §1681s-2(a)(1)(A)").with_pages("6-12");
        store.upsert(RuleCode::DoubleBalance, &citation).unwrap();
        store.upsert(RuleCode::DoubleBalance, &citation).unwrap();

        assert_eq!(store.count().unwrap(), 1);
        assert_eq!(store.lookup(RuleCode::DoubleBalance).unwrap(), citation);
    }

    #[test]
    fn test_import_csv() {
        let dir = std::env::temp_dir().join(format!("credit-audit-citations-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("citations.csv");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "rule_code,anchor_id,source_document,page_range,statute").unwrap();
        writeln!(file, "SSN_MISSING,ID-1,Policy,,15 U.S.C. §1681e(b)").unwrap();
        writeln!(file, "DOUBLE_BALANCE,K1,CRRG,6-12,15 U.S.C. §1681s-2(a)(1)(A)").unwrap();
        drop(file);

        let store = SqliteCitationStore::open_in_memory().unwrap();
        assert_eq!(store.import_csv(&path).unwrap(), 2);
        assert_eq!(store.lookup(RuleCode::SsnMissing).unwrap().page_range, None);
        assert_eq!(
            store.lookup(RuleCode::DoubleBalance).unwrap().page_range,
            Some("6-12".to_string())
        );

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_unknown_rule_code_in_csv_is_rejected() {
        let record = CitationRecord {
            rule_code: "NOT_A_RULE".to_string(),
            anchor_id: "x".to_string(),
            source_document: "x".to_string(),
            page_range: None,
            statute: "x".to_string(),
        };
        assert!(record.into_entry().is_err());
    }
}
