// 📅 Payment-History Guardrail - The 24-month profile
//
// The profile is a fixed-alphabet sequence, newest month first:
//   ["0", "0", "1", "2", "3", "L", ...]
//    ^ report month
//
// Checks run in a fixed order:
//   (a) reporter types that must never carry a profile
//   (b) debt buyers with an ownership gap that should carry one
//   (c) every symbol belongs to the alphabet
//   (d) the profile is not longer than the account is old
//   (e) the delinquency ladder is not skipped

use crate::attributes::{code_table, FieldName, COLLECTION_AGENCY_TYPE, DEBT_BUYER_TYPE};
use crate::violation::{RuleCode, Severity};
use chrono::{Datelike, Months, NaiveDate};
use serde::{Deserialize, Serialize};

/// Account types that must not report a payment history
pub const HISTORY_PROHIBITED_TYPES: &[&str] = &[COLLECTION_AGENCY_TYPE];

/// Maximum profile length a bureau prints
pub const MAX_HISTORY_LENGTH: usize = 24;

// ============================================================================
// OPTIONS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GuardrailOptions {
    /// Months of slack allowed on top of the account age
    pub grace_months: u32,

    /// Also flag multi-level drops ("6" then "1") without a return to current
    pub flag_downward_ladder: bool,
}

impl Default for GuardrailOptions {
    fn default() -> Self {
        GuardrailOptions {
            grace_months: 3,
            flag_downward_ladder: false,
        }
    }
}

// ============================================================================
// ISSUES
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HistoryIssue {
    ProhibitedForReporter {
        account_type: String,
        length: usize,
    },
    MissingForDebtBuyer,
    InvalidSymbol {
        position: usize,
        symbol: String,
    },
    ExceedsAccountAge {
        length: usize,
        months_open: u32,
        allowed: usize,
        excess: usize,
    },
    LadderInversion {
        position: usize,
        from: String,
        to: String,
    },
}

impl HistoryIssue {
    pub fn rule_code(&self) -> RuleCode {
        match self {
            HistoryIssue::ProhibitedForReporter { .. } => RuleCode::HistoryProhibitedForFurnisher,
            HistoryIssue::MissingForDebtBuyer => RuleCode::HistoryMissingForDebtBuyer,
            HistoryIssue::InvalidSymbol { .. } => RuleCode::InvalidHistorySymbol,
            HistoryIssue::ExceedsAccountAge { .. } => RuleCode::HistoryExceedsAccountAge,
            HistoryIssue::LadderInversion { .. } => RuleCode::LadderInversion,
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            HistoryIssue::ProhibitedForReporter { .. } => Severity::High,
            HistoryIssue::MissingForDebtBuyer => Severity::Low,
            HistoryIssue::InvalidSymbol { .. } => Severity::Medium,
            HistoryIssue::ExceedsAccountAge { .. } => Severity::Critical,
            HistoryIssue::LadderInversion { .. } => Severity::High,
        }
    }

    pub fn describe(&self) -> String {
        match self {
            HistoryIssue::ProhibitedForReporter { account_type, length } => format!(
                "Account type {} may not report a payment history, found {} months",
                account_type, length
            ),
            HistoryIssue::MissingForDebtBuyer => {
                "Debt buyer with a gap in the ownership chain reports no payment history".to_string()
            }
            HistoryIssue::InvalidSymbol { position, symbol } => format!(
                "Payment history symbol '{}' at position {} is not a valid code",
                symbol, position
            ),
            HistoryIssue::ExceedsAccountAge {
                length,
                months_open,
                excess,
                ..
            } => format!(
                "Payment history has {} months but the account has been open {} months ({} excess)",
                length, months_open, excess
            ),
            HistoryIssue::LadderInversion { position, from, to } => format!(
                "Payment history jumps from '{}' to '{}' at position {} without passing the levels between",
                from, to, position
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct HistoryValidation {
    pub issues: Vec<HistoryIssue>,
    pub months_open: Option<u32>,
    pub allowed_length: Option<usize>,
}

impl HistoryValidation {
    pub fn is_valid(&self) -> bool {
        self.issues.is_empty()
    }
}

// ============================================================================
// SYMBOL HELPERS
// ============================================================================

/// Numeric delinquency level of a symbol: "0"/"E" are level 0, "1".."6" their number
///
/// Non-numeric symbols (no data, collection, charge-off...) have no level and
/// break the ladder.
pub fn delinquency_level(symbol: &str) -> Option<u8> {
    match symbol.trim() {
        "0" | "E" => Some(0),
        s => s.parse::<u8>().ok().filter(|n| (1..=6).contains(n)),
    }
}

/// Whole months from `from` to `to` (0 when `to` is earlier)
pub fn whole_months_between(from: NaiveDate, to: NaiveDate) -> u32 {
    let mut months = (to.year() - from.year()) * 12 + to.month() as i32 - from.month() as i32;
    if to.day() < from.day() {
        months -= 1;
    }
    months.max(0) as u32
}

// ============================================================================
// GUARDRAIL
// ============================================================================

/// Validate one payment-history profile
pub fn validate(
    sequence: &[String],
    date_opened: Option<NaiveDate>,
    report_date: NaiveDate,
    account_type_code: &str,
    has_ownership_gap: bool,
    options: &GuardrailOptions,
) -> HistoryValidation {
    let mut result = HistoryValidation::default();
    let account_type = account_type_code.trim().to_uppercase();

    // (a)
    if !sequence.is_empty() && HISTORY_PROHIBITED_TYPES.contains(&account_type.as_str()) {
        result.issues.push(HistoryIssue::ProhibitedForReporter {
            account_type: account_type.clone(),
            length: sequence.len(),
        });
    }

    // (b)
    if sequence.is_empty() && account_type == DEBT_BUYER_TYPE && has_ownership_gap {
        result.issues.push(HistoryIssue::MissingForDebtBuyer);
    }

    // (c)
    let alphabet = code_table(FieldName::PaymentHistory);
    for (position, symbol) in sequence.iter().enumerate() {
        if !alphabet.is_member(symbol.trim()) {
            result.issues.push(HistoryIssue::InvalidSymbol {
                position,
                symbol: symbol.clone(),
            });
        }
    }

    // (d)
    if let Some(opened) = date_opened {
        let months_open = whole_months_between(opened, report_date);
        let allowed =
            (months_open.saturating_add(options.grace_months) as usize).min(MAX_HISTORY_LENGTH);
        result.months_open = Some(months_open);
        result.allowed_length = Some(allowed);

        if sequence.len() > allowed {
            result.issues.push(HistoryIssue::ExceedsAccountAge {
                length: sequence.len(),
                months_open,
                allowed,
                excess: sequence.len() - allowed,
            });
        }
    }

    // (e)
    result.issues.extend(ladder_inversions(sequence, options.flag_downward_ladder));

    result
}

/// Adjacent numeric levels that skip more than one step
///
/// A level-0 symbol between two buckets is a return to current and restarts
/// the ladder, so "0" followed by anything is never an inversion.
pub fn ladder_inversions(sequence: &[String], flag_downward: bool) -> Vec<HistoryIssue> {
    sequence
        .windows(2)
        .enumerate()
        .filter_map(|(i, pair)| {
            let from = delinquency_level(&pair[0])?;
            let to = delinquency_level(&pair[1])?;

            let upward = from >= 1 && to > from + 1;
            let downward = flag_downward && to >= 1 && from > to + 1;

            (upward || downward).then(|| HistoryIssue::LadderInversion {
                position: i + 1,
                from: pair[0].trim().to_string(),
                to: pair[1].trim().to_string(),
            })
        })
        .collect()
}

/// DOFD implied by the profile
///
/// Scans oldest → newest for the first numeric delinquency. A level-N symbol
/// in month M means the missed payment was due N months before M.
pub fn implied_dofd(sequence: &[String], report_date: NaiveDate) -> Option<NaiveDate> {
    let (index, level) = sequence
        .iter()
        .enumerate()
        .rev()
        .find_map(|(i, s)| delinquency_level(s).filter(|l| *l >= 1).map(|l| (i, l)))?;

    let report_month = NaiveDate::from_ymd_opt(report_date.year(), report_date.month(), 1)?;
    report_month.checked_sub_months(Months::new(index as u32 + level as u32))
}

// ============================================================================
// TESTS
// ============================================================================
