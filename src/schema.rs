// 📐 Shape Layer - Field Schema Validation
// Validates raw Metro-2 field values against the canonical code alphabets
//
// Four modes per field class:
//   STRICT   - anything outside the canonical set is an ERROR
//   COERCE   - legacy/free-text values are mapped through the coercion table first (default)
//   WARN     - unknown values are accepted but flagged
//   DISABLED - no validation at all
//
// Obsolete codes are a separate failure class: they pass membership but are still reported.

use crate::attributes::{code_table, AccountStatus, FieldName};
use crate::entities::Account;
use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// MODES & OUTCOMES
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ValidationMode {
    Strict,
    #[default]
    Coerce,
    Warn,
    Disabled,
}

impl ValidationMode {
    pub fn name(&self) -> &str {
        match self {
            ValidationMode::Strict => "STRICT",
            ValidationMode::Coerce => "COERCE",
            ValidationMode::Warn => "WARN",
            ValidationMode::Disabled => "DISABLED",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ValidationLevel {
    Ok,
    Warning,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SchemaErrorCode {
    EmptyValue,
    UnknownCode,
    ObsoleteCode,
}

impl SchemaErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            SchemaErrorCode::EmptyValue => "EMPTY_VALUE",
            SchemaErrorCode::UnknownCode => "UNKNOWN_CODE",
            SchemaErrorCode::ObsoleteCode => "OBSOLETE_CODE",
        }
    }
}

impl fmt::Display for SchemaErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// VALIDATION RESULT
// ============================================================================

/// Outcome of validating one raw field value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldValidation {
    pub field: FieldName,
    pub raw_value: String,
    pub mode: ValidationMode,
    pub valid: bool,
    pub level: ValidationLevel,

    /// Canonical code the raw value was mapped to (COERCE only)
    pub corrected_value: Option<String>,

    pub error_code: Option<SchemaErrorCode>,
}

impl FieldValidation {
    fn ok(field: FieldName, raw: &str, mode: ValidationMode) -> Self {
        FieldValidation {
            field,
            raw_value: raw.to_string(),
            mode,
            valid: true,
            level: ValidationLevel::Ok,
            corrected_value: None,
            error_code: None,
        }
    }

    fn flagged(
        field: FieldName,
        raw: &str,
        mode: ValidationMode,
        valid: bool,
        level: ValidationLevel,
        error_code: SchemaErrorCode,
    ) -> Self {
        FieldValidation {
            field,
            raw_value: raw.to_string(),
            mode,
            valid,
            level,
            corrected_value: None,
            error_code: Some(error_code),
        }
    }

    /// Canonical code this value resolves to, if any
    ///
    /// WARN-mode acceptances of unknown values resolve to nothing: the
    /// value was let through, it did not become canonical.
    pub fn canonical(&self) -> Option<&str> {
        if let Some(corrected) = &self.corrected_value {
            return Some(corrected);
        }
        let trimmed = self.raw_value.trim();
        if self.valid && code_table(self.field).is_member(trimmed) {
            Some(trimmed)
        } else {
            None
        }
    }

    pub fn is_obsolete(&self) -> bool {
        self.error_code == Some(SchemaErrorCode::ObsoleteCode)
    }

    pub fn was_coerced(&self) -> bool {
        self.corrected_value.is_some()
    }
}

/// Validate one field value
///
/// Pure function of (field, value, mode) and the static code tables.
pub fn validate(field: FieldName, raw_value: &str, mode: ValidationMode) -> FieldValidation {
    if mode == ValidationMode::Disabled {
        return FieldValidation::ok(field, raw_value, mode);
    }

    let table = code_table(field);
    let trimmed = raw_value.trim();

    if trimmed.is_empty() {
        let (valid, level) = match mode {
            ValidationMode::Warn => (true, ValidationLevel::Warning),
            _ => (false, ValidationLevel::Error),
        };
        return FieldValidation::flagged(
            field,
            raw_value,
            mode,
            valid,
            level,
            SchemaErrorCode::EmptyValue,
        );
    }

    // Membership first: canonical codes pass in every mode
    if let Some(def) = table.lookup(trimmed) {
        if def.obsolete {
            return FieldValidation::flagged(
                field,
                raw_value,
                mode,
                true,
                ValidationLevel::Warning,
                SchemaErrorCode::ObsoleteCode,
            );
        }
        return FieldValidation::ok(field, raw_value, mode);
    }

    match mode {
        ValidationMode::Coerce => {
            let upper = trimmed.to_uppercase();
            let corrected = table
                .lookup(&upper)
                .map(|def| def.code)
                .or_else(|| table.coerce(trimmed));

            match corrected {
                Some(canonical) => {
                    let mut result = FieldValidation::ok(field, raw_value, mode);
                    result.corrected_value = Some(canonical.to_string());
                    if table.lookup(canonical).map(|d| d.obsolete).unwrap_or(false) {
                        result.level = ValidationLevel::Warning;
                        result.error_code = Some(SchemaErrorCode::ObsoleteCode);
                    }
                    result
                }
                None => FieldValidation::flagged(
                    field,
                    raw_value,
                    mode,
                    false,
                    ValidationLevel::Error,
                    SchemaErrorCode::UnknownCode,
                ),
            }
        }
        ValidationMode::Warn => FieldValidation::flagged(
            field,
            raw_value,
            mode,
            true,
            ValidationLevel::Warning,
            SchemaErrorCode::UnknownCode,
        ),
        ValidationMode::Strict | ValidationMode::Disabled => FieldValidation::flagged(
            field,
            raw_value,
            mode,
            false,
            ValidationLevel::Error,
            SchemaErrorCode::UnknownCode,
        ),
    }
}

// ============================================================================
// FIELD MODES
// ============================================================================

/// Validation mode per field class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FieldModes {
    #[serde(default)]
    pub account_status: ValidationMode,
    #[serde(default)]
    pub ecoa: ValidationMode,
    #[serde(default)]
    pub portfolio_type: ValidationMode,
    #[serde(default)]
    pub payment_history: ValidationMode,
    #[serde(default)]
    pub account_type: ValidationMode,
}

impl FieldModes {
    /// Same mode for every field class
    pub fn uniform(mode: ValidationMode) -> Self {
        FieldModes {
            account_status: mode,
            ecoa: mode,
            portfolio_type: mode,
            payment_history: mode,
            account_type: mode,
        }
    }

    pub fn mode(&self, field: FieldName) -> ValidationMode {
        match field {
            FieldName::AccountStatus => self.account_status,
            FieldName::Ecoa => self.ecoa,
            FieldName::PortfolioType => self.portfolio_type,
            FieldName::PaymentHistory => self.payment_history,
            FieldName::AccountType => self.account_type,
        }
    }
}

// ============================================================================
// RESOLVED ACCOUNT FIELDS
// ============================================================================

/// Every coded field of one account after validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedFields {
    pub account_status: FieldValidation,
    pub ecoa: FieldValidation,
    pub portfolio_type: FieldValidation,
    pub account_type: FieldValidation,

    /// One validation per payment-history symbol, same order as reported
    pub payment_history: Vec<FieldValidation>,
}

impl ResolvedFields {
    pub fn status(&self) -> Option<AccountStatus> {
        self.account_status.canonical().and_then(AccountStatus::from_code)
    }

    /// Account type code after coercion, falling back to the raw value
    pub fn account_type_code(&self) -> String {
        self.account_type
            .canonical()
            .map(str::to_string)
            .unwrap_or_else(|| self.account_type.raw_value.trim().to_uppercase())
    }

    pub fn portfolio_type_code(&self) -> Option<&str> {
        self.portfolio_type.canonical()
    }

    /// Payment-history symbols with coercions applied; unresolvable symbols stay raw
    pub fn history_symbols(&self) -> Vec<String> {
        self.payment_history
            .iter()
            .map(|v| {
                v.canonical()
                    .map(str::to_string)
                    .unwrap_or_else(|| v.raw_value.trim().to_string())
            })
            .collect()
    }

    /// Single-valued field validations (payment history is per symbol)
    pub fn scalar_fields(&self) -> [&FieldValidation; 4] {
        [
            &self.account_status,
            &self.ecoa,
            &self.portfolio_type,
            &self.account_type,
        ]
    }
}

// ============================================================================
// SCHEMA VALIDATOR
// ============================================================================

#[derive(Debug, Clone, Default)]
pub struct SchemaValidator {
    modes: FieldModes,
}

impl SchemaValidator {
    pub fn new(modes: FieldModes) -> Self {
        SchemaValidator { modes }
    }

    pub fn modes(&self) -> &FieldModes {
        &self.modes
    }

    /// Validate one value with the configured mode for its field class
    pub fn validate(&self, field: FieldName, raw_value: &str) -> FieldValidation {
        validate(field, raw_value, self.modes.mode(field))
    }

    /// Validate every coded field of an account
    pub fn validate_account(&self, account: &Account) -> ResolvedFields {
        ResolvedFields {
            account_status: self.validate_status(account),
            ecoa: self.validate(FieldName::Ecoa, &account.ecoa),
            portfolio_type: self.validate(FieldName::PortfolioType, &account.portfolio_type),
            account_type: self.validate(FieldName::AccountType, &account.account_type_code),
            payment_history: account
                .payment_history
                .iter()
                .map(|symbol| self.validate(FieldName::PaymentHistory, symbol))
                .collect(),
        }
    }

    /// Account status falls back to the legacy free-text status when the code is blank
    fn validate_status(&self, account: &Account) -> FieldValidation {
        if account.account_status.trim().is_empty() && !account.payment_status_text.trim().is_empty()
        {
            return self.validate(FieldName::AccountStatus, &account.payment_status_text);
        }
        self.validate(FieldName::AccountStatus, &account.account_status)
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attributes::code_table;

    #[test]
    fn test_canonical_code_passes_every_mode() {
        for mode in [
            ValidationMode::Strict,
            ValidationMode::Coerce,
            ValidationMode::Warn,
            ValidationMode::Disabled,
        ] {
            let result = validate(FieldName::AccountStatus, "97", mode);
            assert!(result.valid, "mode {}", mode.name());
            assert_eq!(result.level, ValidationLevel::Ok);
            assert_eq!(result.error_code, None);
        }
    }

    #[test]
    fn test_strict_rejects_free_text() {
        let result = validate(FieldName::AccountStatus, "Charged Off", ValidationMode::Strict);
        assert!(!result.valid);
        assert_eq!(result.level, ValidationLevel::Error);
        assert_eq!(result.error_code, Some(SchemaErrorCode::UnknownCode));
        assert_eq!(result.canonical(), None);
    }

    #[test]
    fn test_coerce_maps_free_text() {
        let result = validate(FieldName::AccountStatus, "Charged Off", ValidationMode::Coerce);
        assert!(result.valid);
        assert_eq!(result.corrected_value.as_deref(), Some("97"));
        assert_eq!(result.canonical(), Some("97"));
        assert!(result.was_coerced());
    }

    #[test]
    fn test_coerce_uppercases_lowercase_codes() {
        let result = validate(FieldName::PaymentHistory, "l", ValidationMode::Coerce);
        assert_eq!(result.canonical(), Some("L"));
    }

    #[test]
    fn test_coerce_unknown_value_is_error() {
        let result = validate(FieldName::Ecoa, "spouse", ValidationMode::Coerce);
        assert!(!result.valid);
        assert_eq!(result.error_code, Some(SchemaErrorCode::UnknownCode));
    }

    #[test]
    fn test_warn_accepts_but_flags() {
        let result = validate(FieldName::PortfolioType, "Q", ValidationMode::Warn);
        assert!(result.valid);
        assert_eq!(result.level, ValidationLevel::Warning);
        assert_eq!(result.error_code, Some(SchemaErrorCode::UnknownCode));
        assert_eq!(result.canonical(), None);
    }

    #[test]
    fn test_disabled_skips_everything() {
        let result = validate(FieldName::Ecoa, "", ValidationMode::Disabled);
        assert!(result.valid);
        assert_eq!(result.error_code, None);
    }

    #[test]
    fn test_empty_value() {
        let strict = validate(FieldName::Ecoa, "  ", ValidationMode::Strict);
        assert!(!strict.valid);
        assert_eq!(strict.error_code, Some(SchemaErrorCode::EmptyValue));

        let warn = validate(FieldName::Ecoa, "", ValidationMode::Warn);
        assert!(warn.valid);
        assert_eq!(warn.level, ValidationLevel::Warning);
    }

    #[test]
    fn test_obsolete_code_passes_membership_but_is_flagged() {
        let result = validate(FieldName::Ecoa, "4", ValidationMode::Strict);
        assert!(result.valid);
        assert!(result.is_obsolete());
        assert_eq!(result.level, ValidationLevel::Warning);
        assert_eq!(result.canonical(), Some("4"));
    }

    #[test]
    fn test_coercion_round_trip_passes_strict() {
        for field in FieldName::ALL {
            for (legacy, _) in code_table(field).coercions() {
                let coerced = validate(field, legacy, ValidationMode::Coerce);
                let canonical = coerced
                    .canonical()
                    .unwrap_or_else(|| panic!("{} '{}' did not coerce", field, legacy))
                    .to_string();

                let strict = validate(field, &canonical, ValidationMode::Strict);
                assert!(strict.valid, "{} '{}' → '{}' fails STRICT", field, legacy, canonical);
                assert_eq!(strict.level, ValidationLevel::Ok);
            }
        }
    }

    #[test]
    fn test_validate_account_uses_field_modes() {
        let mut modes = FieldModes::default();
        modes.ecoa = ValidationMode::Strict;
        let validator = SchemaValidator::new(modes);

        let mut account = Account::new("DISCOVER", "XXXX1111");
        account.account_status = "charged off".to_string();
        account.ecoa = "individual".to_string();
        account.payment_history = vec!["OK".to_string(), "30".to_string(), "Z".to_string()];

        let fields = validator.validate_account(&account);
        assert_eq!(fields.status(), Some(AccountStatus::ChargeOff));
        assert!(!fields.ecoa.valid);
        assert_eq!(fields.history_symbols(), vec!["0", "1", "Z"]);
    }

    #[test]
    fn test_status_falls_back_to_free_text() {
        let validator = SchemaValidator::default();
        let mut account = Account::new("MIDLAND", "1");
        account.payment_status_text = "Collection account".to_string();

        let fields = validator.validate_account(&account);
        assert_eq!(fields.status(), Some(AccountStatus::Collection));
    }
}
