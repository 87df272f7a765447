// 🤝 Ownership Coexistence - Original creditor vs. downstream collector
//
// The same debt often appears twice: once from the original creditor (OC)
// and once from the collector or debt buyer it was handed to. Only one of
// them may carry the balance.
//
//   OC balance | Collector balance | Result
//   -----------+-------------------+------------------------
//        0     |        > 0        | VALID_COEXISTENCE
//      > 0     |        > 0        | DOUBLE_BALANCE_VIOLATION
//      > 0     |          0        | OWNERSHIP_CONFLICT
//        0     |          0        | RESOLVED

use crate::attributes::{COLLECTION_AGENCY_TYPE, DEBT_BUYER_TYPE};
use crate::deduplication::name_similarity;
use crate::entities::{Account, FurnisherType};
use crate::violation::Severity;
use serde::{Deserialize, Serialize};

/// Minimum name similarity for a collector's original-creditor field to
/// point at an OC tradeline on the same report
pub const PAIRING_SIMILARITY: f64 = 0.85;

// ============================================================================
// FURNISHER ROLE
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FurnisherRole {
    OriginalCreditor,
    Collector,
    DebtBuyer,
}

impl FurnisherRole {
    pub fn is_downstream(&self) -> bool {
        matches!(self, FurnisherRole::Collector | FurnisherRole::DebtBuyer)
    }
}

/// Which tier decided the role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RoleSignal {
    TypeCode,
    AssignmentSegment,
    StatusText,
    Default,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleAssignment {
    pub role: FurnisherRole,
    pub signal: RoleSignal,
}

impl RoleAssignment {
    fn new(role: FurnisherRole, signal: RoleSignal) -> Self {
        RoleAssignment { role, signal }
    }
}

/// Determine the furnisher role, first matching tier wins:
/// 1. explicit furnisher type or account type code (48 / 0C)
/// 2. assignment segments (K2 purchased-from, K1 original creditor)
/// 3. legacy free-text payment status
///
/// With no signal at all the account is treated as an original creditor.
pub fn determine_role(account: &Account, account_type_code: &str) -> RoleAssignment {
    match account.furnisher_type {
        Some(FurnisherType::OriginalCreditor) => {
            return RoleAssignment::new(FurnisherRole::OriginalCreditor, RoleSignal::TypeCode)
        }
        Some(FurnisherType::CollectionAgency) => {
            return RoleAssignment::new(FurnisherRole::Collector, RoleSignal::TypeCode)
        }
        Some(FurnisherType::DebtBuyer) => {
            return RoleAssignment::new(FurnisherRole::DebtBuyer, RoleSignal::TypeCode)
        }
        Some(FurnisherType::Unknown) | None => {}
    }

    match account_type_code.trim().to_uppercase().as_str() {
        COLLECTION_AGENCY_TYPE => {
            return RoleAssignment::new(FurnisherRole::Collector, RoleSignal::TypeCode)
        }
        DEBT_BUYER_TYPE => {
            return RoleAssignment::new(FurnisherRole::DebtBuyer, RoleSignal::TypeCode)
        }
        _ => {}
    }

    if has_text(&account.purchased_from) {
        return RoleAssignment::new(FurnisherRole::DebtBuyer, RoleSignal::AssignmentSegment);
    }
    if has_text(&account.original_creditor) {
        return RoleAssignment::new(FurnisherRole::Collector, RoleSignal::AssignmentSegment);
    }

    if let Some(role) = role_from_status_text(&account.payment_status_text) {
        return RoleAssignment::new(role, RoleSignal::StatusText);
    }

    RoleAssignment::new(FurnisherRole::OriginalCreditor, RoleSignal::Default)
}

/// "Transferred" / "sold" describe the OC side of a handoff
fn role_from_status_text(text: &str) -> Option<FurnisherRole> {
    let text = text.to_lowercase();
    if text.contains("debt buyer") || text.contains("purchased") {
        Some(FurnisherRole::DebtBuyer)
    } else if text.contains("collection") {
        Some(FurnisherRole::Collector)
    } else if text.contains("transferred") || text.contains("sold") {
        Some(FurnisherRole::OriginalCreditor)
    } else {
        None
    }
}

fn has_text(value: &Option<String>) -> bool {
    value.as_deref().map_or(false, |v| !v.trim().is_empty())
}

/// Name of the creditor a downstream account came from (K1, else K2)
pub fn upstream_creditor_name(account: &Account) -> Option<&str> {
    [&account.original_creditor, &account.purchased_from]
        .into_iter()
        .filter_map(|v| v.as_deref())
        .map(str::trim)
        .find(|v| !v.is_empty())
}

// ============================================================================
// PAIRING
// ============================================================================

/// Pair every downstream account with the OC tradeline it came from
///
/// Returns one entry per account: for downstream accounts, the index of the
/// best-matching OC account (highest similarity, lowest index on ties).
pub fn pair_accounts(accounts: &[Account], roles: &[RoleAssignment]) -> Vec<Option<usize>> {
    accounts
        .iter()
        .zip(roles)
        .enumerate()
        .map(|(i, (account, assignment))| {
            if !assignment.role.is_downstream() {
                return None;
            }
            let upstream = upstream_creditor_name(account)?;

            let mut best: Option<(usize, f64)> = None;
            for (j, (candidate, candidate_role)) in accounts.iter().zip(roles).enumerate() {
                if j == i || candidate_role.role != FurnisherRole::OriginalCreditor {
                    continue;
                }
                let score = name_similarity(upstream, &candidate.creditor_name);
                if score < PAIRING_SIMILARITY {
                    continue;
                }
                if best.map_or(true, |(_, s)| score > s) {
                    best = Some((j, score));
                }
            }
            best.map(|(j, _)| j)
        })
        .collect()
}

// ============================================================================
// CLASSIFICATION
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Coexistence {
    ValidCoexistence,
    DoubleBalanceViolation,
    OwnershipConflict,
    Resolved,
    SingleTradeline,
}

impl Coexistence {
    pub fn as_str(&self) -> &'static str {
        match self {
            Coexistence::ValidCoexistence => "VALID_COEXISTENCE",
            Coexistence::DoubleBalanceViolation => "DOUBLE_BALANCE_VIOLATION",
            Coexistence::OwnershipConflict => "OWNERSHIP_CONFLICT",
            Coexistence::Resolved => "RESOLVED",
            Coexistence::SingleTradeline => "SINGLE_TRADELINE",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoexistenceResult {
    pub classification: Coexistence,

    /// None when the classification is not a violation
    pub severity: Option<Severity>,

    /// Always set for double balances
    pub escalate: bool,

    /// Chain of title should be demanded from the collector
    pub demand_documentation: bool,

    pub original_creditor_balance: Option<f64>,
    pub collector_balance: Option<f64>,
}

impl CoexistenceResult {
    pub fn is_violation(&self) -> bool {
        self.severity.is_some()
    }
}

pub fn classify(
    original_creditor: Option<&Account>,
    collector: Option<&Account>,
) -> CoexistenceResult {
    let (Some(oc), Some(collector)) = (original_creditor, collector) else {
        return CoexistenceResult {
            classification: Coexistence::SingleTradeline,
            severity: None,
            escalate: false,
            demand_documentation: false,
            original_creditor_balance: original_creditor.map(|a| a.current_balance),
            collector_balance: collector.map(|a| a.current_balance),
        };
    };

    let (classification, severity, escalate, demand_documentation) =
        match (oc.has_balance(), collector.has_balance()) {
            (false, true) => (Coexistence::ValidCoexistence, None, false, false),
            (true, true) => (
                Coexistence::DoubleBalanceViolation,
                Some(Severity::High),
                true,
                false,
            ),
            (true, false) => (
                Coexistence::OwnershipConflict,
                Some(Severity::Medium),
                false,
                true,
            ),
            (false, false) => (Coexistence::Resolved, None, false, false),
        };

    CoexistenceResult {
        classification,
        severity,
        escalate,
        demand_documentation,
        original_creditor_balance: Some(oc.current_balance),
        collector_balance: Some(collector.current_balance),
    }
}

// ============================================================================
// TESTS
// ============================================================================
