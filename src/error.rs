// ❌ Errors - Only structural problems are errors
//
// A bad field value is a FieldValidation, a contradiction in the data is a
// Violation. What remains here is input the engine cannot audit at all, a
// configuration it refuses to run with, and the citation side channel.

use crate::entities::Bureau;
use crate::violation::RuleCode;
use thiserror::Error;

/// The input did not meet the structural contract: the audit call cannot run.
#[derive(Error, Debug)]
pub enum AuditError {
    #[error("cannot audit: no reports supplied")]
    NoReports,

    #[error("cannot audit: more than one report for bureau {bureau}")]
    DuplicateBureau { bureau: Bureau },

    #[error("cannot audit: {bureau} report has no report_id")]
    MissingReportId { bureau: Bureau },

    #[error("cannot audit: report {report_id} ({bureau}) has no report_date")]
    MissingReportDate { report_id: String, bureau: Bureau },

    #[error("cannot audit: report {report_id} ({bureau}) has no accounts")]
    NoAccounts { report_id: String, bureau: Bureau },

    #[error("cannot audit: report {report_id} could not be digested: {source}")]
    Digest {
        report_id: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
}

impl AuditError {
    /// Required input field that was missing, for upstream correction
    pub fn missing_field(&self) -> Option<&'static str> {
        match self {
            AuditError::NoReports => Some("reports"),
            AuditError::MissingReportId { .. } => Some("report_id"),
            AuditError::MissingReportDate { .. } => Some("report_date"),
            AuditError::NoAccounts { .. } => Some("accounts"),
            _ => None,
        }
    }
}

/// Configuration rejected at construction time
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("match threshold must be in (0, 1], got {0}")]
    InvalidThreshold(f64),

    #[error("match weights must be non-negative and sum to 1, got {0}")]
    InvalidWeights(f64),

    #[error("{field} must be greater than zero")]
    NonPositive { field: &'static str },

    #[error("{field} must not be negative, got {value}")]
    Negative { field: &'static str, value: f64 },

    #[error("configuration could not be digested: {0}")]
    Digest(String),
}

/// Citation lookup failure (never fails an audit)
#[derive(Error, Debug)]
pub enum CitationError {
    #[error("no citation for rule {0}")]
    NotFound(RuleCode),

    #[error("citation store error: {0}")]
    Store(#[from] rusqlite::Error),

    #[error("citation store lock poisoned")]
    Poisoned,
}
