// ⚙️ Audit Configuration - Every tunable, explicit at construction time
//
// Rule logic never reads the environment or a global: everything that may
// vary between deployments is in this struct, and its digest is stamped into
// every AuditResult so a result can always be tied back to its settings.

use crate::citation::Citation;
use crate::deduplication::{CrossBureauMatcher, MatchWeights, DEFAULT_MATCH_THRESHOLD};
use crate::error::ConfigError;
use crate::payment_history::GuardrailOptions;
use crate::reconciliation::{DiscrepancyRules, DiscrepancyTolerances};
use crate::schema::{FieldModes, SchemaValidator};
use crate::violation::RuleCode;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuditConfig {
    /// STRICT / COERCE / WARN / DISABLED per field class
    pub validation_modes: FieldModes,

    /// Minimum combined score for a cross-bureau match (default: 0.80)
    pub match_threshold: f64,
    pub match_weights: MatchWeights,
    pub tolerances: DiscrepancyTolerances,

    /// Years a delinquency may be reported after the DOFD (default: 7)
    pub reporting_window_years: u32,

    pub bankruptcy_window_years: u32,
    pub public_record_window_years: u32,

    /// Months an inquiry may stay on file (default: 24)
    pub inquiry_retention_months: u32,

    pub history: GuardrailOptions,

    /// Allowed gap between reported and history-implied DOFD
    pub dofd_history_tolerance_months: u32,

    /// Statutory citations that take precedence over the citation source
    pub citations: BTreeMap<RuleCode, Citation>,
}

impl Default for AuditConfig {
    fn default() -> Self {
        AuditConfig {
            validation_modes: FieldModes::default(),
            match_threshold: DEFAULT_MATCH_THRESHOLD,
            match_weights: MatchWeights::default(),
            tolerances: DiscrepancyTolerances::default(),
            reporting_window_years: 7,
            bankruptcy_window_years: 10,
            public_record_window_years: 7,
            inquiry_retention_months: 24,
            history: GuardrailOptions::default(),
            dofd_history_tolerance_months: 2,
            citations: BTreeMap::new(),
        }
    }
}

impl AuditConfig {
    /// Load and validate configuration from a JSON file
    ///
    /// Missing keys fall back to their defaults.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {:?}", path.as_ref()))?;

        let config: AuditConfig =
            serde_json::from_str(&content).context("Failed to parse config JSON")?;

        config
            .validate()
            .with_context(|| format!("Invalid config file: {:?}", path.as_ref()))?;

        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.match_threshold > 0.0 && self.match_threshold <= 1.0) {
            return Err(ConfigError::InvalidThreshold(self.match_threshold));
        }

        let weights = self.match_weights;
        let total = weights.total();
        let non_negative =
            weights.name >= 0.0 && weights.account_number >= 0.0 && weights.date_opened >= 0.0;
        if !non_negative || (total - 1.0).abs() > 1e-6 {
            return Err(ConfigError::InvalidWeights(total));
        }

        for (field, years) in [
            ("reporting_window_years", self.reporting_window_years),
            ("bankruptcy_window_years", self.bankruptcy_window_years),
            ("public_record_window_years", self.public_record_window_years),
            ("inquiry_retention_months", self.inquiry_retention_months),
        ] {
            if years == 0 {
                return Err(ConfigError::NonPositive { field });
            }
        }

        if self.tolerances.balance < 0.0 {
            return Err(ConfigError::Negative {
                field: "tolerances.balance",
                value: self.tolerances.balance,
            });
        }
        for (field, days) in [
            ("tolerances.dofd_days", self.tolerances.dofd_days),
            ("tolerances.date_opened_days", self.tolerances.date_opened_days),
        ] {
            if days < 0 {
                return Err(ConfigError::Negative {
                    field,
                    value: days as f64,
                });
            }
        }

        Ok(())
    }

    /// SHA-256 of the canonical JSON form
    pub fn digest(&self) -> Result<String, serde_json::Error> {
        let bytes = serde_json::to_vec(self)?;
        let mut hasher = Sha256::new();
        hasher.update(&bytes);
        Ok(format!("{:x}", hasher.finalize()))
    }

    pub fn schema_validator(&self) -> SchemaValidator {
        SchemaValidator::new(self.validation_modes)
    }

    pub fn matcher(&self) -> CrossBureauMatcher {
        CrossBureauMatcher::new(self.match_threshold, self.match_weights)
    }

    pub fn discrepancy_rules(&self) -> DiscrepancyRules {
        DiscrepancyRules::new(self.tolerances, self.schema_validator())
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::ValidationMode;

    #[test]
    fn test_default_config_is_valid() {
        let config = AuditConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.reporting_window_years, 7);
        assert_eq!(config.history.grace_months, 3);
        assert!(!config.history.flag_downward_ladder);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let json = r#"{
            "validation_modes": {"account_status": "STRICT"},
            "match_threshold": 0.9,
            "history": {"flag_downward_ladder": true}
        }"#;
        let config: AuditConfig = serde_json::from_str(json).unwrap();

        assert_eq!(config.validation_modes.account_status, ValidationMode::Strict);
        assert_eq!(config.validation_modes.ecoa, ValidationMode::Coerce);
        assert_eq!(config.match_threshold, 0.9);
        assert!(config.history.flag_downward_ladder);
        assert_eq!(config.history.grace_months, 3);
        assert_eq!(config.inquiry_retention_months, 24);
    }

    #[test]
    fn test_invalid_threshold_rejected() {
        let config = AuditConfig {
            match_threshold: 0.0,
            ..AuditConfig::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::InvalidThreshold(0.0)));
    }

    #[test]
    fn test_weights_must_sum_to_one() {
        let config = AuditConfig {
            match_weights: MatchWeights {
                name: 0.5,
                account_number: 0.5,
                date_opened: 0.5,
            },
            ..AuditConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::InvalidWeights(_))));
    }

    #[test]
    fn test_zero_window_rejected() {
        let config = AuditConfig {
            reporting_window_years: 0,
            ..AuditConfig::default()
        };
        assert_eq!(
            config.validate(),
            Err(ConfigError::NonPositive {
                field: "reporting_window_years"
            })
        );
    }

    #[test]
    fn test_digest_tracks_changes() {
        let a = AuditConfig::default();
        let b = AuditConfig {
            reporting_window_years: 8,
            ..AuditConfig::default()
        };
        assert_eq!(a.digest().unwrap(), AuditConfig::default().digest().unwrap());
        assert_ne!(a.digest().unwrap(), b.digest().unwrap());
    }

    #[test]
    fn test_inline_citations_parse() {
        let json = r#"{
            "citations": {
                "SSN_MISSING": {
                    "anchor_id": "LOCAL-7",
                    "source_document": "Compliance manual",
                    "statute": "15 U.S.C. §1681e(b)"
                }
            }
        }"#;
        let config: AuditConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.citations[&RuleCode::SsnMissing].anchor_id, "LOCAL-7");
    }

    #[test]
    fn test_from_file_reports_path() {
        let err = AuditConfig::from_file("/nonexistent/credit-audit.json").unwrap_err();
        assert!(format!("{:#}", err).contains("Failed to read config file"));
    }
}
