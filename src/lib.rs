// Credit Audit - Core Library
// FCRA / Metro-2 compliance audit engine over normalized credit reports

pub mod entities;        // Normalized report, account, inquiry, public record
pub mod attributes;      // Metro-2 code registry
pub mod schema;          // Field schema validation (STRICT / COERCE / WARN / DISABLED)
pub mod temporal;        // Delinquency state machine, DOFD timeline
pub mod payment_history; // Payment-history guardrail
pub mod coexistence;     // OC / collector coexistence classifier
pub mod violation;       // Violations, severities, rule codes, evidence
pub mod rules;           // Single-account and report rule set
pub mod deduplication;   // Cross-bureau account matcher
pub mod reconciliation;  // Cross-bureau discrepancy rules
pub mod citation;        // Statutory citation sources
pub mod config;          // Audit configuration
pub mod error;           // Structural and configuration errors
pub mod audit;           // Audit orchestrator

// Re-export commonly used types
pub use entities::{
    Account, Bureau, ConsumerIdentity, FurnisherType, Inquiry, InquiryKind, NormalizedReport,
    PublicRecord, PublicRecordKind,
};
pub use attributes::{AccountStatus, FieldName};
pub use schema::{FieldModes, FieldValidation, SchemaValidator, ValidationLevel, ValidationMode};
pub use temporal::{
    DelinquencySnapshot, DelinquencyState, DelinquencyStateMachine, SnapshotEvent,
    SnapshotHistory,
};
pub use payment_history::{GuardrailOptions, HistoryIssue, HistoryValidation};
pub use coexistence::{classify, Coexistence, CoexistenceResult, FurnisherRole};
pub use violation::{Evidence, RuleCode, RuleFamily, Severity, Violation};
pub use rules::{AccountRule, AuditedAccount, ReportContext, ReportRule, RuleSet};
pub use deduplication::{CrossBureauMatcher, MatchWeights, MatchedGroup};
pub use reconciliation::{CrossBureauDiscrepancy, DiscrepancyField, DiscrepancyTolerances};
pub use citation::{
    Citation, CitationSource, CitationStatus, SqliteCitationStore, StaticCitationTable,
};
pub use config::AuditConfig;
pub use error::{AuditError, CitationError, ConfigError};
pub use audit::{AuditEngine, AuditInput, AuditResult, AuditSummary, RULE_CATALOG_VERSION};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
