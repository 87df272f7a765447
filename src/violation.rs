// ⚠️ Violations - Immutable findings produced by the audit
//
// A Violation is a pure output: built once by a rule, sorted, enriched with a
// citation, then handed to downstream consumers who may only read it.
// Evidence is a closed set of shapes, one per rule family, so consumers can
// match exhaustively instead of probing a free-form map.

use crate::attributes::FieldName;
use crate::citation::{Citation, CitationStatus};
use crate::coexistence::Coexistence;
use crate::entities::Bureau;
use crate::schema::{SchemaErrorCode, ValidationMode};
use crate::temporal::DelinquencyState;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// SEVERITY
// ============================================================================

/// Ordered LOW < MEDIUM < HIGH < CRITICAL
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub const ALL: [Severity; 4] = [
        Severity::Low,
        Severity::Medium,
        Severity::High,
        Severity::Critical,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "LOW",
            Severity::Medium => "MEDIUM",
            Severity::High => "HIGH",
            Severity::Critical => "CRITICAL",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// RULE CODES
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RuleFamily {
    Schema,
    Lifecycle,
    Temporal,
    Sequence,
    Balance,
    Furnisher,
    Identity,
    PublicRecord,
    Inquiry,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RuleCode {
    // Field schema
    InvalidFieldCode,
    UnrecognizedFieldCode,
    ObsoleteFieldCode,

    // Delinquency lifecycle
    DofdMissing,
    DofdNotZeroFilled,
    DofdModifiedAfterLock,
    StatusRegressionReaging,
    DebtBuyerDofdChanged,
    DofdBeforeDateOpened,
    ObsoleteReporting,

    // Dates
    DateClosedBeforeOpened,
    DateOpenedAfterReport,
    DateReportedAfterReport,

    // Payment history
    HistoryProhibitedForFurnisher,
    HistoryMissingForDebtBuyer,
    InvalidHistorySymbol,
    HistoryExceedsAccountAge,
    LadderInversion,
    HistoryStatusConflict,
    DofdHistoryMismatch,

    // Balances
    PaidStatusWithBalance,
    TransferredWithBalance,
    NegativeBalance,
    CollectionBalanceExceedsOriginal,
    BalanceExceedsCreditLimit,

    // Furnisher duties
    CollectorMissingOriginalCreditor,
    DoubleBalance,
    OwnershipConflict,

    // Identity
    ConsumerNameMissing,
    SsnMissing,
    DateOfBirthMissing,
    AddressMissing,
    AccountOpenedBeforeBirth,

    // Public records
    PublicRecordNotReportable,
    PublicRecordObsolete,
    PublicRecordMissingFilingDate,

    // Inquiries
    InquiryObsolete,
    InquiryDateAfterReport,
    DuplicateInquiry,
}

impl RuleCode {
    pub const ALL: [RuleCode; 39] = [
        RuleCode::InvalidFieldCode,
        RuleCode::UnrecognizedFieldCode,
        RuleCode::ObsoleteFieldCode,
        RuleCode::DofdMissing,
        RuleCode::DofdNotZeroFilled,
        RuleCode::DofdModifiedAfterLock,
        RuleCode::StatusRegressionReaging,
        RuleCode::DebtBuyerDofdChanged,
        RuleCode::DofdBeforeDateOpened,
        RuleCode::ObsoleteReporting,
        RuleCode::DateClosedBeforeOpened,
        RuleCode::DateOpenedAfterReport,
        RuleCode::DateReportedAfterReport,
        RuleCode::HistoryProhibitedForFurnisher,
        RuleCode::HistoryMissingForDebtBuyer,
        RuleCode::InvalidHistorySymbol,
        RuleCode::HistoryExceedsAccountAge,
        RuleCode::LadderInversion,
        RuleCode::HistoryStatusConflict,
        RuleCode::DofdHistoryMismatch,
        RuleCode::PaidStatusWithBalance,
        RuleCode::TransferredWithBalance,
        RuleCode::NegativeBalance,
        RuleCode::CollectionBalanceExceedsOriginal,
        RuleCode::BalanceExceedsCreditLimit,
        RuleCode::CollectorMissingOriginalCreditor,
        RuleCode::DoubleBalance,
        RuleCode::OwnershipConflict,
        RuleCode::ConsumerNameMissing,
        RuleCode::SsnMissing,
        RuleCode::DateOfBirthMissing,
        RuleCode::AddressMissing,
        RuleCode::AccountOpenedBeforeBirth,
        RuleCode::PublicRecordNotReportable,
        RuleCode::PublicRecordObsolete,
        RuleCode::PublicRecordMissingFilingDate,
        RuleCode::InquiryObsolete,
        RuleCode::InquiryDateAfterReport,
        RuleCode::DuplicateInquiry,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RuleCode::InvalidFieldCode => "INVALID_FIELD_CODE",
            RuleCode::UnrecognizedFieldCode => "UNRECOGNIZED_FIELD_CODE",
            RuleCode::ObsoleteFieldCode => "OBSOLETE_FIELD_CODE",
            RuleCode::DofdMissing => "DOFD_MISSING",
            RuleCode::DofdNotZeroFilled => "DOFD_NOT_ZERO_FILLED",
            RuleCode::DofdModifiedAfterLock => "DOFD_MODIFIED_AFTER_LOCK",
            RuleCode::StatusRegressionReaging => "STATUS_REGRESSION_REAGING",
            RuleCode::DebtBuyerDofdChanged => "DEBT_BUYER_DOFD_CHANGED",
            RuleCode::DofdBeforeDateOpened => "DOFD_BEFORE_DATE_OPENED",
            RuleCode::ObsoleteReporting => "OBSOLETE_REPORTING",
            RuleCode::DateClosedBeforeOpened => "DATE_CLOSED_BEFORE_OPENED",
            RuleCode::DateOpenedAfterReport => "DATE_OPENED_AFTER_REPORT",
            RuleCode::DateReportedAfterReport => "DATE_REPORTED_AFTER_REPORT",
            RuleCode::HistoryProhibitedForFurnisher => "HISTORY_PROHIBITED_FOR_FURNISHER",
            RuleCode::HistoryMissingForDebtBuyer => "HISTORY_MISSING_FOR_DEBT_BUYER",
            RuleCode::InvalidHistorySymbol => "INVALID_HISTORY_SYMBOL",
            RuleCode::HistoryExceedsAccountAge => "HISTORY_EXCEEDS_ACCOUNT_AGE",
            RuleCode::LadderInversion => "LADDER_INVERSION",
            RuleCode::HistoryStatusConflict => "HISTORY_STATUS_CONFLICT",
            RuleCode::DofdHistoryMismatch => "DOFD_HISTORY_MISMATCH",
            RuleCode::PaidStatusWithBalance => "PAID_STATUS_WITH_BALANCE",
            RuleCode::TransferredWithBalance => "TRANSFERRED_WITH_BALANCE",
            RuleCode::NegativeBalance => "NEGATIVE_BALANCE",
            RuleCode::CollectionBalanceExceedsOriginal => "COLLECTION_BALANCE_EXCEEDS_ORIGINAL",
            RuleCode::BalanceExceedsCreditLimit => "BALANCE_EXCEEDS_CREDIT_LIMIT",
            RuleCode::CollectorMissingOriginalCreditor => "COLLECTOR_MISSING_ORIGINAL_CREDITOR",
            RuleCode::DoubleBalance => "DOUBLE_BALANCE",
            RuleCode::OwnershipConflict => "OWNERSHIP_CONFLICT",
            RuleCode::ConsumerNameMissing => "CONSUMER_NAME_MISSING",
            RuleCode::SsnMissing => "SSN_MISSING",
            RuleCode::DateOfBirthMissing => "DATE_OF_BIRTH_MISSING",
            RuleCode::AddressMissing => "ADDRESS_MISSING",
            RuleCode::AccountOpenedBeforeBirth => "ACCOUNT_OPENED_BEFORE_BIRTH",
            RuleCode::PublicRecordNotReportable => "PUBLIC_RECORD_NOT_REPORTABLE",
            RuleCode::PublicRecordObsolete => "PUBLIC_RECORD_OBSOLETE",
            RuleCode::PublicRecordMissingFilingDate => "PUBLIC_RECORD_MISSING_FILING_DATE",
            RuleCode::InquiryObsolete => "INQUIRY_OBSOLETE",
            RuleCode::InquiryDateAfterReport => "INQUIRY_DATE_AFTER_REPORT",
            RuleCode::DuplicateInquiry => "DUPLICATE_INQUIRY",
        }
    }

    pub fn from_str_code(code: &str) -> Option<RuleCode> {
        RuleCode::ALL.iter().copied().find(|c| c.as_str() == code)
    }

    pub fn family(&self) -> RuleFamily {
        match self {
            RuleCode::InvalidFieldCode
            | RuleCode::UnrecognizedFieldCode
            | RuleCode::ObsoleteFieldCode => RuleFamily::Schema,

            RuleCode::DofdMissing
            | RuleCode::DofdNotZeroFilled
            | RuleCode::DofdModifiedAfterLock
            | RuleCode::StatusRegressionReaging
            | RuleCode::DebtBuyerDofdChanged
            | RuleCode::DofdBeforeDateOpened
            | RuleCode::ObsoleteReporting => RuleFamily::Lifecycle,

            RuleCode::DateClosedBeforeOpened
            | RuleCode::DateOpenedAfterReport
            | RuleCode::DateReportedAfterReport => RuleFamily::Temporal,

            RuleCode::HistoryProhibitedForFurnisher
            | RuleCode::HistoryMissingForDebtBuyer
            | RuleCode::InvalidHistorySymbol
            | RuleCode::HistoryExceedsAccountAge
            | RuleCode::LadderInversion
            | RuleCode::HistoryStatusConflict
            | RuleCode::DofdHistoryMismatch => RuleFamily::Sequence,

            RuleCode::PaidStatusWithBalance
            | RuleCode::TransferredWithBalance
            | RuleCode::NegativeBalance
            | RuleCode::CollectionBalanceExceedsOriginal
            | RuleCode::BalanceExceedsCreditLimit => RuleFamily::Balance,

            RuleCode::CollectorMissingOriginalCreditor
            | RuleCode::DoubleBalance
            | RuleCode::OwnershipConflict => RuleFamily::Furnisher,

            RuleCode::ConsumerNameMissing
            | RuleCode::SsnMissing
            | RuleCode::DateOfBirthMissing
            | RuleCode::AddressMissing
            | RuleCode::AccountOpenedBeforeBirth => RuleFamily::Identity,

            RuleCode::PublicRecordNotReportable
            | RuleCode::PublicRecordObsolete
            | RuleCode::PublicRecordMissingFilingDate => RuleFamily::PublicRecord,

            RuleCode::InquiryObsolete
            | RuleCode::InquiryDateAfterReport
            | RuleCode::DuplicateInquiry => RuleFamily::Inquiry,
        }
    }
}

impl RuleCode {
    /// Severity a rule reports at unless the finding itself says otherwise
    pub fn default_severity(&self) -> Severity {
        match self {
            RuleCode::DofdModifiedAfterLock
            | RuleCode::StatusRegressionReaging
            | RuleCode::DebtBuyerDofdChanged
            | RuleCode::HistoryExceedsAccountAge => Severity::Critical,

            RuleCode::DofdMissing
            | RuleCode::DofdBeforeDateOpened
            | RuleCode::ObsoleteReporting
            | RuleCode::DateClosedBeforeOpened
            | RuleCode::HistoryProhibitedForFurnisher
            | RuleCode::LadderInversion
            | RuleCode::PaidStatusWithBalance
            | RuleCode::TransferredWithBalance
            | RuleCode::DoubleBalance
            | RuleCode::ConsumerNameMissing
            | RuleCode::AccountOpenedBeforeBirth
            | RuleCode::PublicRecordNotReportable
            | RuleCode::PublicRecordObsolete => Severity::High,

            RuleCode::InvalidFieldCode
            | RuleCode::ObsoleteFieldCode
            | RuleCode::DofdNotZeroFilled
            | RuleCode::DateOpenedAfterReport
            | RuleCode::InvalidHistorySymbol
            | RuleCode::HistoryStatusConflict
            | RuleCode::NegativeBalance
            | RuleCode::CollectionBalanceExceedsOriginal
            | RuleCode::CollectorMissingOriginalCreditor
            | RuleCode::OwnershipConflict
            | RuleCode::SsnMissing
            | RuleCode::PublicRecordMissingFilingDate
            | RuleCode::InquiryDateAfterReport => Severity::Medium,

            RuleCode::UnrecognizedFieldCode
            | RuleCode::DateReportedAfterReport
            | RuleCode::HistoryMissingForDebtBuyer
            | RuleCode::DofdHistoryMismatch
            | RuleCode::BalanceExceedsCreditLimit
            | RuleCode::DateOfBirthMissing
            | RuleCode::AddressMissing
            | RuleCode::InquiryObsolete
            | RuleCode::DuplicateInquiry => Severity::Low,
        }
    }
}

impl fmt::Display for RuleCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// EVIDENCE
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Evidence {
    Schema {
        field: FieldName,
        raw_value: String,
        corrected_value: Option<String>,
        error_code: SchemaErrorCode,
        mode: ValidationMode,
    },

    /// A date compared against a reference date
    Temporal {
        field: String,
        reported: Option<NaiveDate>,
        reference_field: String,
        reference: Option<NaiveDate>,
        delta_days: Option<i64>,
    },

    /// One step of the delinquency state machine
    Lifecycle {
        as_of: NaiveDate,
        from_state: DelinquencyState,
        to_state: DelinquencyState,
        status: String,
        locked_dofd: Option<NaiveDate>,
        reported_dofd: Option<NaiveDate>,
    },

    Sequence {
        length: usize,
        allowed_length: Option<usize>,
        position: Option<usize>,
        symbols: Vec<String>,
    },

    Balance {
        current_balance: f64,
        reference_field: String,
        reference_amount: Option<f64>,
    },

    Ownership {
        classification: Coexistence,
        original_creditor: String,
        collector: String,
        original_creditor_balance: f64,
        collector_balance: f64,
        escalate: bool,
        demand_documentation: bool,
    },

    Identity {
        field: String,
        detail: Option<String>,
    },

    /// Public record or inquiry
    Record {
        record_type: String,
        date: Option<NaiveDate>,
        window_years: Option<u32>,
        counterpart: Option<String>,
    },

    CrossBureau {
        field: String,
        tolerance: Option<String>,
        spread: Option<String>,
    },
}

// ============================================================================
// VIOLATION
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Violation {
    pub rule_code: RuleCode,
    pub severity: Severity,
    pub report_id: String,
    pub bureau: Bureau,

    /// None for report-level findings (identity, inquiries, public records)
    pub account_id: Option<String>,
    pub creditor_name: Option<String>,

    pub description: String,
    pub expected: Option<String>,
    pub actual: Option<String>,
    pub evidence: Evidence,

    pub citation: Option<Citation>,
    pub citation_status: CitationStatus,
}

impl Violation {
    pub fn new(
        rule_code: RuleCode,
        severity: Severity,
        report_id: impl Into<String>,
        bureau: Bureau,
        description: impl Into<String>,
        evidence: Evidence,
    ) -> Self {
        Violation {
            rule_code,
            severity,
            report_id: report_id.into(),
            bureau,
            account_id: None,
            creditor_name: None,
            description: description.into(),
            expected: None,
            actual: None,
            evidence,
            citation: None,
            citation_status: CitationStatus::Pending,
        }
    }

    pub fn for_account(self, account_id: impl Into<String>, creditor_name: impl Into<String>) -> Self {
        Violation {
            account_id: Some(account_id.into()),
            creditor_name: Some(creditor_name.into()),
            ..self
        }
    }

    pub fn with_values(self, expected: impl Into<String>, actual: impl Into<String>) -> Self {
        Violation {
            expected: Some(expected.into()),
            actual: Some(actual.into()),
            ..self
        }
    }

    /// Raise severity to at least `severity`. Never lowers it.
    pub fn escalate(self, severity: Severity) -> Self {
        Violation {
            severity: self.severity.max(severity),
            ..self
        }
    }

    pub fn with_citation(self, citation: Option<Citation>, citation_status: CitationStatus) -> Self {
        Violation {
            citation,
            citation_status,
            ..self
        }
    }

    /// Canonical ordering key: account id, rule code, then description as a tie-break
    pub fn sort_key(&self) -> (Option<&str>, &'static str, &str) {
        (
            self.account_id.as_deref(),
            self.rule_code.as_str(),
            self.description.as_str(),
        )
    }
}

/// Stable sort into canonical order
pub fn sort_violations(violations: &mut [Violation]) {
    violations.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn identity_violation(code: RuleCode, severity: Severity) -> Violation {
        Violation::new(
            code,
            severity,
            "r-1",
            Bureau::Equifax,
            "test",
            Evidence::Identity {
                field: "name".to_string(),
                detail: None,
            },
        )
    }

    #[test]
    fn test_severity_order() {
        assert!(Severity::Low < Severity::Medium);
        assert!(Severity::High < Severity::Critical);
    }

    #[test]
    fn test_escalate_never_downgrades() {
        let v = identity_violation(RuleCode::SsnMissing, Severity::High);
        assert_eq!(v.clone().escalate(Severity::Low).severity, Severity::High);
        assert_eq!(v.escalate(Severity::Critical).severity, Severity::Critical);
    }

    #[test]
    fn test_rule_codes_unique_and_parseable() {
        let mut seen = std::collections::BTreeSet::new();
        for code in RuleCode::ALL {
            assert!(seen.insert(code.as_str()), "duplicate code {}", code);
            assert_eq!(RuleCode::from_str_code(code.as_str()), Some(code));
        }
    }

    #[test]
    fn test_rule_code_serde_matches_as_str() {
        for code in RuleCode::ALL {
            let json = serde_json::to_string(&code).unwrap();
            assert_eq!(json, format!("\"{}\"", code.as_str()));
        }
    }

    #[test]
    fn test_sort_puts_report_level_first() {
        let mut violations = vec![
            identity_violation(RuleCode::NegativeBalance, Severity::Low).for_account("bbbb", "B"),
            identity_violation(RuleCode::DofdMissing, Severity::Low).for_account("aaaa", "A"),
            identity_violation(RuleCode::SsnMissing, Severity::Low),
            identity_violation(RuleCode::DateClosedBeforeOpened, Severity::Low).for_account("aaaa", "A"),
        ];
        sort_violations(&mut violations);

        let keys: Vec<(Option<&str>, &str)> = violations
            .iter()
            .map(|v| (v.account_id.as_deref(), v.rule_code.as_str()))
            .collect();
        assert_eq!(
            keys,
            vec![
                (None, "SSN_MISSING"),
                (Some("aaaa"), "DATE_CLOSED_BEFORE_OPENED"),
                (Some("aaaa"), "DOFD_MISSING"),
                (Some("bbbb"), "NEGATIVE_BALANCE"),
            ]
        );
    }

    #[test]
    fn test_evidence_is_tagged() {
        let evidence = Evidence::Sequence {
            length: 7,
            allowed_length: Some(6),
            position: None,
            symbols: vec![],
        };
        let json = serde_json::to_value(&evidence).unwrap();
        assert_eq!(json["kind"], "sequence");
        assert_eq!(json["allowed_length"], 6);
    }
}
