// 💳 Account Entity - One tradeline as reported by one bureau
//
// "Account data is a VALUE (one snapshot), the fingerprint is IDENTITY"
//
// Problem solved:
// - The same tradeline shows up in every monthly snapshot and at every bureau
// - There is no shared database key between bureaus or between snapshots
// - Identity = digest(normalized creditor name + account-number digits)

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

// ============================================================================
// FURNISHER TYPE
// ============================================================================

/// Who is furnishing the tradeline to the bureau.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FurnisherType {
    /// The creditor that extended the credit
    OriginalCreditor,

    /// Third-party collection agency or attorney
    CollectionAgency,

    /// Purchaser of charged-off debt
    DebtBuyer,

    /// Parser could not tell
    Unknown,
}

impl FurnisherType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FurnisherType::OriginalCreditor => "Original Creditor",
            FurnisherType::CollectionAgency => "Collection Agency",
            FurnisherType::DebtBuyer => "Debt Buyer",
            FurnisherType::Unknown => "Unknown",
        }
    }

    /// Collection agencies and debt buyers both sit downstream of the original creditor
    pub fn is_downstream(&self) -> bool {
        matches!(self, FurnisherType::CollectionAgency | FurnisherType::DebtBuyer)
    }
}

impl Default for FurnisherType {
    fn default() -> Self {
        FurnisherType::Unknown
    }
}

// ============================================================================
// ACCOUNT (TRADELINE)
// ============================================================================

/// One tradeline inside a normalized bureau report.
///
/// Raw code fields are kept exactly as the parser produced them; the audit
/// engine validates and coerces them, it never rewrites the account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    // ========================================================================
    // FURNISHER
    // ========================================================================
    /// Creditor / furnisher name as printed on the report
    pub creditor_name: String,

    /// Account number as reported (usually masked, e.g. "XXXX1234")
    #[serde(default)]
    pub account_number: String,

    /// Explicit furnisher classification, when the parser could tell
    #[serde(default)]
    pub furnisher_type: Option<FurnisherType>,

    // ========================================================================
    // RAW METRO-2 CODES (validated by the schema layer)
    // ========================================================================
    #[serde(default)]
    pub account_type_code: String,

    #[serde(default)]
    pub account_status: String,

    /// Legacy free-text payment status ("Collection account", "Transferred/sold")
    #[serde(default)]
    pub payment_status_text: String,

    #[serde(default)]
    pub ecoa: String,

    #[serde(default)]
    pub portfolio_type: String,

    // ========================================================================
    // ASSIGNMENT SEGMENTS
    // ========================================================================
    /// K1 segment: original creditor name reported by a collector
    #[serde(default)]
    pub original_creditor: Option<String>,

    /// K2 segment: entity the debt was purchased from
    #[serde(default)]
    pub purchased_from: Option<String>,

    /// Set by the parser when a gap exists in the chain of ownership
    #[serde(default)]
    pub has_ownership_gap: bool,

    // ========================================================================
    // DATES
    // ========================================================================
    #[serde(default)]
    pub date_opened: Option<NaiveDate>,

    #[serde(default)]
    pub date_closed: Option<NaiveDate>,

    #[serde(default)]
    pub date_reported: Option<NaiveDate>,

    /// None means empty / zero-filled on the report
    #[serde(default)]
    pub date_of_first_delinquency: Option<NaiveDate>,

    // ========================================================================
    // BALANCES
    // ========================================================================
    #[serde(default)]
    pub current_balance: f64,

    #[serde(default)]
    pub high_credit: Option<f64>,

    #[serde(default)]
    pub credit_limit: Option<f64>,

    /// Payment-history profile, newest month first (max 24 symbols)
    #[serde(default)]
    pub payment_history: Vec<String>,
}

impl Account {
    /// Minimal account, mostly useful for fixtures
    pub fn new(creditor_name: impl Into<String>, account_number: impl Into<String>) -> Self {
        Account {
            creditor_name: creditor_name.into(),
            account_number: account_number.into(),
            furnisher_type: None,
            account_type_code: String::new(),
            account_status: String::new(),
            payment_status_text: String::new(),
            ecoa: String::new(),
            portfolio_type: String::new(),
            original_creditor: None,
            purchased_from: None,
            has_ownership_gap: false,
            date_opened: None,
            date_closed: None,
            date_reported: None,
            date_of_first_delinquency: None,
            current_balance: 0.0,
            high_credit: None,
            credit_limit: None,
            payment_history: Vec::new(),
        }
    }

    /// Compute the cross-snapshot fingerprint
    ///
    /// NOTE: this is IDENTITY for one bureau's view of a tradeline.
    /// Bureaus mask account numbers differently, so cross-bureau identity
    /// goes through the matcher instead.
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(normalize_name(&self.creditor_name).as_bytes());
        hasher.update(b"|");
        hasher.update(self.account_digits().as_bytes());
        format!("{:x}", hasher.finalize())
    }

    /// Short account id used in audit output (first 16 hex chars of the fingerprint)
    pub fn account_id(&self) -> String {
        self.fingerprint()[..16].to_string()
    }

    /// Visible digits of the account number ("XXXX-1234" → "1234")
    pub fn account_digits(&self) -> String {
        self.account_number.chars().filter(|c| c.is_ascii_digit()).collect()
    }

    /// Trailing visible digits, stopping at the first mask character from the right
    pub fn visible_suffix(&self) -> String {
        let suffix: String = self
            .account_number
            .chars()
            .rev()
            .take_while(|c| c.is_ascii_digit())
            .collect();
        suffix.chars().rev().collect()
    }

    pub fn has_balance(&self) -> bool {
        self.current_balance > BALANCE_EPSILON
    }

    pub fn is_closed(&self) -> bool {
        self.date_closed.is_some()
    }
}

/// Balances below a cent are treated as zero
pub const BALANCE_EPSILON: f64 = 0.005;

/// Corporate suffixes that carry no identity
const NAME_STOPWORDS: &[&str] = &[
    "INC", "LLC", "LTD", "CORP", "CORPORATION", "CO", "NA", "N", "A", "THE", "COMPANY",
];

/// Normalize a creditor name for comparison
///
/// Uppercases, turns punctuation into spaces, drops corporate suffixes.
/// "Capital One, N.A." → "CAPITAL ONE"
pub fn normalize_name(name: &str) -> String {
    let cleaned: String = name
        .to_uppercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect();

    cleaned
        .split_whitespace()
        .filter(|w| !NAME_STOPWORDS.contains(w))
        .collect::<Vec<_>>()
        .join(" ")
}

// ============================================================================
// TESTS
// ============================================================================
