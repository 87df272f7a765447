// 🏛️ Semantic Layer - Metro-2 Code Registry
// Every field class has one canonical alphabet, one legacy coercion table,
// and a list of codes that are well-formed but retired.
//
// The tables are static data: loaded with the binary, shared without locks.

use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// FIELD CLASSES
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FieldName {
    AccountStatus,
    Ecoa,
    PortfolioType,
    PaymentHistory,
    AccountType,
}

impl FieldName {
    pub const ALL: [FieldName; 5] = [
        FieldName::AccountStatus,
        FieldName::Ecoa,
        FieldName::PortfolioType,
        FieldName::PaymentHistory,
        FieldName::AccountType,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FieldName::AccountStatus => "account_status",
            FieldName::Ecoa => "ecoa",
            FieldName::PortfolioType => "portfolio_type",
            FieldName::PaymentHistory => "payment_history",
            FieldName::AccountType => "account_type",
        }
    }
}

impl fmt::Display for FieldName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// CODE DEFINITIONS
// ============================================================================

/// One canonical code inside a field's alphabet
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CodeDefinition {
    pub code: &'static str,
    pub description: &'static str,

    /// Retired by the format but still technically well-formed
    pub obsolete: bool,
}

const fn code(code: &'static str, description: &'static str) -> CodeDefinition {
    CodeDefinition { code, description, obsolete: false }
}

const fn retired(code: &'static str, description: &'static str) -> CodeDefinition {
    CodeDefinition { code, description, obsolete: true }
}

const ACCOUNT_STATUS_CODES: &[CodeDefinition] = &[
    code("05", "Account transferred"),
    code("11", "Current account"),
    code("13", "Paid or closed account / zero balance"),
    code("61", "Paid in full, was a voluntary surrender"),
    code("62", "Paid in full, was a collection account"),
    code("63", "Paid in full, was a repossession"),
    code("64", "Paid in full, was a charge-off"),
    code("65", "Paid in full, a foreclosure was started"),
    code("71", "30-59 days past the due date"),
    code("78", "60-89 days past the due date"),
    code("80", "90-119 days past the due date"),
    code("82", "120-149 days past the due date"),
    code("83", "150-179 days past the due date"),
    code("84", "180 days or more past the due date"),
    code("88", "Claim filed with government for insured portion of balance"),
    code("89", "Deed received in lieu of foreclosure"),
    code("93", "Assigned to internal or external collections"),
    code("94", "Foreclosure completed"),
    code("95", "Voluntary surrender"),
    code("96", "Merchandise was repossessed"),
    code("97", "Unpaid balance reported as a loss (charge-off)"),
    code("DA", "Delete entire account"),
    code("DF", "Delete entire account due to confirmed fraud"),
];

const ACCOUNT_STATUS_COERCIONS: &[(&str, &str)] = &[
    ("current", "11"),
    ("pays as agreed", "11"),
    ("paid as agreed", "11"),
    ("open", "11"),
    ("paid", "13"),
    ("closed", "13"),
    ("paid, closed", "13"),
    ("paid/closed", "13"),
    ("transferred", "05"),
    ("transferred/sold", "05"),
    ("sold", "05"),
    ("30 days late", "71"),
    ("30 days past due", "71"),
    ("60 days late", "78"),
    ("60 days past due", "78"),
    ("90 days late", "80"),
    ("90 days past due", "80"),
    ("120 days late", "82"),
    ("120 days past due", "82"),
    ("150 days late", "83"),
    ("150 days past due", "83"),
    ("180 days late", "84"),
    ("180 days past due", "84"),
    ("collection", "93"),
    ("collection account", "93"),
    ("in collections", "93"),
    ("foreclosure", "94"),
    ("voluntary surrender", "95"),
    ("repossession", "96"),
    ("charge off", "97"),
    ("charged off", "97"),
    ("charge-off", "97"),
    ("paid collection", "62"),
    ("paid charge off", "64"),
    ("paid charge-off", "64"),
    ("paid repossession", "63"),
];

const ECOA_CODES: &[CodeDefinition] = &[
    code("1", "Individual"),
    code("2", "Joint contractual liability"),
    code("3", "Authorized user"),
    retired("4", "Joint (retired)"),
    code("5", "Co-maker"),
    retired("6", "On behalf of another person (retired)"),
    code("7", "Maker"),
    code("T", "Association terminated"),
    code("W", "Business / commercial"),
    code("X", "Consumer deceased"),
    code("Z", "Delete consumer"),
];

const ECOA_COERCIONS: &[(&str, &str)] = &[
    ("individual", "1"),
    ("joint", "2"),
    ("joint account", "2"),
    ("authorized user", "3"),
    ("co-maker", "5"),
    ("comaker", "5"),
    ("co-signer", "5"),
    ("cosigner", "5"),
    ("maker", "7"),
    ("terminated", "T"),
    ("business", "W"),
    ("deceased", "X"),
];

const PORTFOLIO_TYPE_CODES: &[CodeDefinition] = &[
    code("C", "Line of credit"),
    code("I", "Installment"),
    code("M", "Mortgage"),
    code("O", "Open"),
    code("R", "Revolving"),
];

const PORTFOLIO_TYPE_COERCIONS: &[(&str, &str)] = &[
    ("line of credit", "C"),
    ("installment", "I"),
    ("mortgage", "M"),
    ("open", "O"),
    ("open account", "O"),
    ("revolving", "R"),
    ("credit card", "R"),
];

const PAYMENT_HISTORY_CODES: &[CodeDefinition] = &[
    code("0", "Current"),
    code("1", "30-59 days past due"),
    code("2", "60-89 days past due"),
    code("3", "90-119 days past due"),
    code("4", "120-149 days past due"),
    code("5", "150-179 days past due"),
    code("6", "180 days or more past due"),
    code("B", "No payment history prior to this month"),
    code("D", "No payment history reported this month"),
    code("E", "Zero balance and current"),
    code("G", "Collection"),
    code("H", "Foreclosure completed"),
    code("J", "Voluntary surrender"),
    code("K", "Repossession"),
    code("L", "Charge-off"),
];

const PAYMENT_HISTORY_COERCIONS: &[(&str, &str)] = &[
    ("ok", "0"),
    ("c", "0"),
    ("30", "1"),
    ("60", "2"),
    ("90", "3"),
    ("120", "4"),
    ("150", "5"),
    ("180", "6"),
    ("-", "D"),
    ("nd", "D"),
    ("col", "G"),
    ("fc", "H"),
    ("vs", "J"),
    ("repo", "K"),
    ("co", "L"),
];

const ACCOUNT_TYPE_CODES: &[CodeDefinition] = &[
    code("00", "Auto"),
    code("01", "Unsecured"),
    code("07", "Charge account"),
    code("12", "Education loan"),
    code("15", "Line of credit"),
    code("18", "Credit card"),
    code("26", "Conventional real estate mortgage"),
    code("48", "Collection agency / attorney"),
    code("0C", "Debt buyer account"),
    code("77", "Returned check"),
    code("89", "Home equity line of credit"),
];

const ACCOUNT_TYPE_COERCIONS: &[(&str, &str)] = &[
    ("auto loan", "00"),
    ("unsecured", "01"),
    ("charge account", "07"),
    ("student loan", "12"),
    ("education", "12"),
    ("line of credit", "15"),
    ("credit card", "18"),
    ("mortgage", "26"),
    ("collection", "48"),
    ("collection agency", "48"),
    ("debt buyer", "0C"),
    ("returned check", "77"),
    ("home equity", "89"),
];

/// Account type code furnished by collection agencies
pub const COLLECTION_AGENCY_TYPE: &str = "48";

/// Account type code furnished by debt buyers
pub const DEBT_BUYER_TYPE: &str = "0C";

// ============================================================================
// CODE TABLE
// ============================================================================

/// Alphabet + coercion table for one field class
#[derive(Debug, Clone, Copy)]
pub struct CodeTable {
    pub field: FieldName,
    codes: &'static [CodeDefinition],
    coercions: &'static [(&'static str, &'static str)],
}

impl CodeTable {
    /// Look up a canonical code (exact match, codes are upper case)
    pub fn lookup(&self, value: &str) -> Option<&'static CodeDefinition> {
        self.codes.iter().find(|c| c.code == value)
    }

    pub fn is_member(&self, value: &str) -> bool {
        self.lookup(value).is_some()
    }

    /// Map a legacy / free-text value to its canonical code
    ///
    /// Matching is case-insensitive on the trimmed value.
    pub fn coerce(&self, value: &str) -> Option<&'static str> {
        let key = value.trim().to_lowercase();
        self.coercions
            .iter()
            .find(|(legacy, _)| *legacy == key)
            .map(|(_, canonical)| *canonical)
    }

    pub fn codes(&self) -> &'static [CodeDefinition] {
        self.codes
    }

    pub fn coercions(&self) -> &'static [(&'static str, &'static str)] {
        self.coercions
    }

    pub fn obsolete_codes(&self) -> impl Iterator<Item = &'static CodeDefinition> {
        self.codes.iter().filter(|c| c.obsolete)
    }
}

static TABLES: [CodeTable; 5] = [
    CodeTable {
        field: FieldName::AccountStatus,
        codes: ACCOUNT_STATUS_CODES,
        coercions: ACCOUNT_STATUS_COERCIONS,
    },
    CodeTable {
        field: FieldName::Ecoa,
        codes: ECOA_CODES,
        coercions: ECOA_COERCIONS,
    },
    CodeTable {
        field: FieldName::PortfolioType,
        codes: PORTFOLIO_TYPE_CODES,
        coercions: PORTFOLIO_TYPE_COERCIONS,
    },
    CodeTable {
        field: FieldName::PaymentHistory,
        codes: PAYMENT_HISTORY_CODES,
        coercions: PAYMENT_HISTORY_COERCIONS,
    },
    CodeTable {
        field: FieldName::AccountType,
        codes: ACCOUNT_TYPE_CODES,
        coercions: ACCOUNT_TYPE_COERCIONS,
    },
];

/// Code table for a field class
pub fn code_table(field: FieldName) -> &'static CodeTable {
    match field {
        FieldName::AccountStatus => &TABLES[0],
        FieldName::Ecoa => &TABLES[1],
        FieldName::PortfolioType => &TABLES[2],
        FieldName::PaymentHistory => &TABLES[3],
        FieldName::AccountType => &TABLES[4],
    }
}

// ============================================================================
// ACCOUNT STATUS
// ============================================================================

/// Typed Metro-2 account status, built from a schema-validated code
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum AccountStatus {
    Transferred,
    Current,
    PaidClosed,
    PaidWasSurrender,
    PaidWasCollection,
    PaidWasRepossession,
    PaidWasChargeOff,
    PaidWasForeclosure,
    Late30,
    Late60,
    Late90,
    Late120,
    Late150,
    Late180,
    GovernmentClaim,
    DeedInLieu,
    Collection,
    ForeclosureCompleted,
    VoluntarySurrender,
    Repossession,
    ChargeOff,
    DeleteAccount,
    DeleteFraud,
}

/// Coarse grouping used when comparing statuses across bureaus
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StatusClass {
    Current,
    Paid,
    Delinquent,
    Derogatory,
    PaidDerogatory,
    Transferred,
    Deleted,
}

impl AccountStatus {
    pub fn from_code(code: &str) -> Option<Self> {
        let status = match code {
            "05" => AccountStatus::Transferred,
            "11" => AccountStatus::Current,
            "13" => AccountStatus::PaidClosed,
            "61" => AccountStatus::PaidWasSurrender,
            "62" => AccountStatus::PaidWasCollection,
            "63" => AccountStatus::PaidWasRepossession,
            "64" => AccountStatus::PaidWasChargeOff,
            "65" => AccountStatus::PaidWasForeclosure,
            "71" => AccountStatus::Late30,
            "78" => AccountStatus::Late60,
            "80" => AccountStatus::Late90,
            "82" => AccountStatus::Late120,
            "83" => AccountStatus::Late150,
            "84" => AccountStatus::Late180,
            "88" => AccountStatus::GovernmentClaim,
            "89" => AccountStatus::DeedInLieu,
            "93" => AccountStatus::Collection,
            "94" => AccountStatus::ForeclosureCompleted,
            "95" => AccountStatus::VoluntarySurrender,
            "96" => AccountStatus::Repossession,
            "97" => AccountStatus::ChargeOff,
            "DA" => AccountStatus::DeleteAccount,
            "DF" => AccountStatus::DeleteFraud,
            _ => return None,
        };
        Some(status)
    }

    pub fn code(&self) -> &'static str {
        match self {
            AccountStatus::Transferred => "05",
            AccountStatus::Current => "11",
            AccountStatus::PaidClosed => "13",
            AccountStatus::PaidWasSurrender => "61",
            AccountStatus::PaidWasCollection => "62",
            AccountStatus::PaidWasRepossession => "63",
            AccountStatus::PaidWasChargeOff => "64",
            AccountStatus::PaidWasForeclosure => "65",
            AccountStatus::Late30 => "71",
            AccountStatus::Late60 => "78",
            AccountStatus::Late90 => "80",
            AccountStatus::Late120 => "82",
            AccountStatus::Late150 => "83",
            AccountStatus::Late180 => "84",
            AccountStatus::GovernmentClaim => "88",
            AccountStatus::DeedInLieu => "89",
            AccountStatus::Collection => "93",
            AccountStatus::ForeclosureCompleted => "94",
            AccountStatus::VoluntarySurrender => "95",
            AccountStatus::Repossession => "96",
            AccountStatus::ChargeOff => "97",
            AccountStatus::DeleteAccount => "DA",
            AccountStatus::DeleteFraud => "DF",
        }
    }

    /// Current or paid/closed: the DOFD field must be zero-filled
    pub fn requires_zero_filled_dofd(&self) -> bool {
        matches!(self, AccountStatus::Current | AccountStatus::PaidClosed)
    }

    /// Any delinquent or derogatory status: the DOFD field must be present
    pub fn requires_dofd(&self) -> bool {
        self.is_late() || self.is_major_derogatory() || self.is_paid_derogatory()
    }

    pub fn is_late(&self) -> bool {
        matches!(
            self,
            AccountStatus::Late30
                | AccountStatus::Late60
                | AccountStatus::Late90
                | AccountStatus::Late120
                | AccountStatus::Late150
                | AccountStatus::Late180
        )
    }

    /// Charge-off, collection, and the loss statuses that behave like them
    pub fn is_major_derogatory(&self) -> bool {
        matches!(
            self,
            AccountStatus::GovernmentClaim
                | AccountStatus::DeedInLieu
                | AccountStatus::Collection
                | AccountStatus::ForeclosureCompleted
                | AccountStatus::VoluntarySurrender
                | AccountStatus::Repossession
                | AccountStatus::ChargeOff
        )
    }

    pub fn is_paid_derogatory(&self) -> bool {
        matches!(
            self,
            AccountStatus::PaidWasSurrender
                | AccountStatus::PaidWasCollection
                | AccountStatus::PaidWasRepossession
                | AccountStatus::PaidWasChargeOff
                | AccountStatus::PaidWasForeclosure
        )
    }

    /// Statuses that lock the DOFD value for the rest of the account's life
    pub fn locks_dofd(&self) -> bool {
        self.is_major_derogatory() || self.is_paid_derogatory()
    }

    /// Paid in any form: a positive balance contradicts the status
    pub fn is_paid(&self) -> bool {
        matches!(self, AccountStatus::PaidClosed) || self.is_paid_derogatory()
    }

    pub fn class(&self) -> StatusClass {
        match self {
            AccountStatus::Current => StatusClass::Current,
            AccountStatus::PaidClosed => StatusClass::Paid,
            AccountStatus::Transferred => StatusClass::Transferred,
            AccountStatus::DeleteAccount | AccountStatus::DeleteFraud => StatusClass::Deleted,
            s if s.is_late() => StatusClass::Delinquent,
            s if s.is_paid_derogatory() => StatusClass::PaidDerogatory,
            _ => StatusClass::Derogatory,
        }
    }
}

impl fmt::Display for AccountStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl TryFrom<String> for AccountStatus {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        AccountStatus::from_code(value.trim())
            .ok_or_else(|| format!("unknown account status code: {}", value))
    }
}

impl From<AccountStatus> for String {
    fn from(status: AccountStatus) -> Self {
        status.code().to_string()
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_status_code_round_trips_through_enum() {
        for def in code_table(FieldName::AccountStatus).codes() {
            let status = AccountStatus::from_code(def.code)
                .unwrap_or_else(|| panic!("no enum variant for {}", def.code));
            assert_eq!(status.code(), def.code);
        }
    }

    #[test]
    fn test_coercion_targets_are_canonical() {
        for field in FieldName::ALL {
            let table = code_table(field);
            for (legacy, canonical) in table.coercions() {
                assert!(
                    table.is_member(canonical),
                    "{}: coercion '{}' targets unknown code '{}'",
                    field,
                    legacy,
                    canonical
                );
            }
        }
    }

    #[test]
    fn test_coerce_is_case_insensitive() {
        let table = code_table(FieldName::AccountStatus);
        assert_eq!(table.coerce("  Charged Off "), Some("97"));
        assert_eq!(table.coerce("CURRENT"), Some("11"));
        assert_eq!(table.coerce("bogus"), None);
    }

    #[test]
    fn test_obsolete_ecoa_codes() {
        let obsolete: Vec<&str> = code_table(FieldName::Ecoa)
            .obsolete_codes()
            .map(|c| c.code)
            .collect();
        assert_eq!(obsolete, vec!["4", "6"]);
    }

    #[test]
    fn test_status_predicates() {
        assert!(AccountStatus::Current.requires_zero_filled_dofd());
        assert!(AccountStatus::Late60.requires_dofd());
        assert!(AccountStatus::ChargeOff.locks_dofd());
        assert!(AccountStatus::Collection.locks_dofd());
        assert!(AccountStatus::PaidWasChargeOff.is_paid());
        assert!(!AccountStatus::Late30.locks_dofd());
        assert!(!AccountStatus::Transferred.requires_dofd());
    }

    #[test]
    fn test_status_class() {
        assert_eq!(AccountStatus::Late90.class(), StatusClass::Delinquent);
        assert_eq!(AccountStatus::ChargeOff.class(), StatusClass::Derogatory);
        assert_eq!(AccountStatus::PaidWasCollection.class(), StatusClass::PaidDerogatory);
        assert_eq!(AccountStatus::DeleteFraud.class(), StatusClass::Deleted);
    }

    #[test]
    fn test_status_serde_uses_codes() {
        let json = serde_json::to_string(&AccountStatus::ChargeOff).unwrap();
        assert_eq!(json, "\"97\"");
        let parsed: AccountStatus = serde_json::from_str("\"93\"").unwrap();
        assert_eq!(parsed, AccountStatus::Collection);
        assert!(serde_json::from_str::<AccountStatus>("\"XX\"").is_err());
    }
}
