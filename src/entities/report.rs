// 📄 Normalized Report - One bureau, one consumer, one snapshot
// Produced by the parsing layer, owned read-only by the audit engine

use crate::entities::account::Account;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

// ============================================================================
// BUREAU
// ============================================================================

/// Consumer reporting agency. Declaration order is the canonical order used
/// wherever reports must be processed independently of input order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Bureau {
    Equifax,
    Experian,
    #[serde(rename = "TRANSUNION")]
    TransUnion,
}

impl Bureau {
    pub fn as_str(&self) -> &'static str {
        match self {
            Bureau::Equifax => "EQUIFAX",
            Bureau::Experian => "EXPERIAN",
            Bureau::TransUnion => "TRANSUNION",
        }
    }
}

impl fmt::Display for Bureau {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// CONSUMER IDENTITY
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConsumerIdentity {
    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub also_known_as: Vec<String>,

    #[serde(default)]
    pub ssn_last4: Option<String>,

    #[serde(default)]
    pub date_of_birth: Option<NaiveDate>,

    #[serde(default)]
    pub addresses: Vec<String>,
}

// ============================================================================
// INQUIRIES
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InquiryKind {
    Hard,
    Soft,
}

impl Default for InquiryKind {
    fn default() -> Self {
        InquiryKind::Hard
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Inquiry {
    pub creditor_name: String,

    #[serde(default)]
    pub date: Option<NaiveDate>,

    #[serde(default)]
    pub kind: InquiryKind,
}

// ============================================================================
// PUBLIC RECORDS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PublicRecordKind {
    Chapter7Bankruptcy,
    Chapter11Bankruptcy,
    Chapter13Bankruptcy,
    CivilJudgment,
    TaxLien,
    Other,
}

impl PublicRecordKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PublicRecordKind::Chapter7Bankruptcy => "Chapter 7 Bankruptcy",
            PublicRecordKind::Chapter11Bankruptcy => "Chapter 11 Bankruptcy",
            PublicRecordKind::Chapter13Bankruptcy => "Chapter 13 Bankruptcy",
            PublicRecordKind::CivilJudgment => "Civil Judgment",
            PublicRecordKind::TaxLien => "Tax Lien",
            PublicRecordKind::Other => "Other",
        }
    }

    pub fn is_bankruptcy(&self) -> bool {
        matches!(
            self,
            PublicRecordKind::Chapter7Bankruptcy
                | PublicRecordKind::Chapter11Bankruptcy
                | PublicRecordKind::Chapter13Bankruptcy
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublicRecord {
    pub kind: PublicRecordKind,

    #[serde(default)]
    pub court: Option<String>,

    #[serde(default)]
    pub reference_number: Option<String>,

    #[serde(default)]
    pub filing_date: Option<NaiveDate>,

    #[serde(default)]
    pub resolved_date: Option<NaiveDate>,
}

// ============================================================================
// NORMALIZED REPORT
// ============================================================================

/// One bureau's report for one consumer at one point in time.
///
/// `report_date` is optional only so that a structurally incomplete report
/// can still be deserialized and rejected with a precise error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedReport {
    pub report_id: String,
    pub bureau: Bureau,

    #[serde(default)]
    pub report_date: Option<NaiveDate>,

    #[serde(default)]
    pub consumer: ConsumerIdentity,

    #[serde(default)]
    pub accounts: Vec<Account>,

    #[serde(default)]
    pub inquiries: Vec<Inquiry>,

    #[serde(default)]
    pub public_records: Vec<PublicRecord>,
}

impl NormalizedReport {
    pub fn new(report_id: impl Into<String>, bureau: Bureau, report_date: NaiveDate) -> Self {
        NormalizedReport {
            report_id: report_id.into(),
            bureau,
            report_date: Some(report_date),
            consumer: ConsumerIdentity::default(),
            accounts: Vec::new(),
            inquiries: Vec::new(),
            public_records: Vec::new(),
        }
    }

    /// SHA-256 of the report's JSON form
    ///
    /// Every map in the report is ordered, so the digest is stable across runs.
    pub fn input_digest(&self) -> Result<String, serde_json::Error> {
        let bytes = serde_json::to_vec(self)?;
        let mut hasher = Sha256::new();
        hasher.update(&bytes);
        Ok(format!("{:x}", hasher.finalize()))
    }
}

// ============================================================================
// TESTS
// ============================================================================
