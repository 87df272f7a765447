// 🧾 Audit Orchestrator - Reports in, one immutable AuditResult per bureau out
//
// Pipeline:
//   structural checks → per-report rule evaluation → cross-bureau matching
//   → discrepancy rules → canonical sort → citation enrichment
//
// Everything here is a pure function of (reports, history, config, rule set).
// Re-running the same input yields byte-identical JSON.

use crate::citation::{enrich, CitationSource, LayeredCitations, StaticCitationTable};
use crate::config::AuditConfig;
use crate::deduplication::CrossBureauMatcher;
use crate::entities::{Bureau, NormalizedReport};
use crate::error::{AuditError, ConfigError};
use crate::reconciliation::{CrossBureauDiscrepancy, DiscrepancyRules};
use crate::rules::{ReportContext, RuleSet};
use crate::schema::SchemaValidator;
use crate::temporal::SnapshotHistory;
use crate::violation::{sort_violations, Evidence, Severity, Violation};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Bumped whenever a rule is added, removed or changes meaning
pub const RULE_CATALOG_VERSION: &str = "1.0.0";

/// Namespace for name-based audit ids
const AUDIT_NAMESPACE: Uuid = Uuid::from_u128(0x5c0e_a1d7_3b44_4f0e_9a61_c2d8_70f3_be19);

// ============================================================================
// INPUT / OUTPUT
// ============================================================================

/// Everything one audit call needs from the caller
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuditInput {
    /// At most one report per bureau
    pub reports: Vec<NormalizedReport>,

    /// Prior snapshots per account, keyed by fingerprint or account id
    #[serde(default)]
    pub history: SnapshotHistory,
}

impl AuditInput {
    pub fn new(reports: Vec<NormalizedReport>) -> Self {
        AuditInput {
            reports,
            history: SnapshotHistory::new(),
        }
    }

    pub fn with_history(self, history: SnapshotHistory) -> Self {
        AuditInput { history, ..self }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditSummary {
    pub total_accounts: usize,
    pub clean_accounts: usize,
    pub violation_count: usize,

    /// Every severity is present, zero or not
    pub by_severity: BTreeMap<Severity, usize>,

    pub discrepancy_count: usize,
    pub has_critical: bool,

    /// Findings flagged for external escalation review
    pub escalation_count: usize,
}

/// The sole output of an audit, one per (report, bureau)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditResult {
    pub audit_id: Uuid,
    pub report_id: String,
    pub bureau: Bureau,
    pub report_date: NaiveDate,
    pub rule_catalog_version: String,
    pub config_digest: String,

    /// Sorted by (account id, rule code); report-level findings first
    pub violations: Vec<Violation>,

    /// Sorted by (group id, field)
    pub discrepancies: Vec<CrossBureauDiscrepancy>,

    pub clean_account_ids: Vec<String>,
    pub summary: AuditSummary,
}

impl AuditResult {
    pub fn violations_for<'a>(&'a self, account_id: &'a str) -> impl Iterator<Item = &'a Violation> {
        self.violations
            .iter()
            .filter(move |v| v.account_id.as_deref() == Some(account_id))
    }

    pub fn is_clean(&self) -> bool {
        self.violations.is_empty() && self.discrepancies.is_empty()
    }
}

// ============================================================================
// ENGINE
// ============================================================================

pub struct AuditEngine {
    config: AuditConfig,
    config_digest: String,
    rules: RuleSet,
    citations: Box<dyn CitationSource>,
    validator: SchemaValidator,
    matcher: CrossBureauMatcher,
    discrepancy_rules: DiscrepancyRules,
}

impl AuditEngine {
    /// Build an engine; the configuration is validated here, never later
    pub fn new(
        config: AuditConfig,
        rules: RuleSet,
        citations: Box<dyn CitationSource>,
    ) -> Result<Self, AuditError> {
        config.validate()?;
        let config_digest = config
            .digest()
            .map_err(|e| ConfigError::Digest(e.to_string()))?;

        Ok(AuditEngine {
            validator: config.schema_validator(),
            matcher: config.matcher(),
            discrepancy_rules: config.discrepancy_rules(),
            config,
            config_digest,
            rules,
            citations,
        })
    }

    /// Default configuration, every built-in rule, built-in citations
    pub fn standard() -> Result<Self, AuditError> {
        AuditEngine::new(
            AuditConfig::default(),
            RuleSet::standard(),
            Box::new(StaticCitationTable::standard()),
        )
    }

    pub fn config(&self) -> &AuditConfig {
        &self.config
    }

    pub fn config_digest(&self) -> &str {
        &self.config_digest
    }

    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    /// Audit every report, matching accounts across bureaus
    ///
    /// Results come back in bureau order whatever order the reports were given in.
    pub fn audit(&self, input: &AuditInput) -> Result<Vec<AuditResult>, AuditError> {
        if input.reports.is_empty() {
            warn!("audit rejected: no reports supplied");
            return Err(AuditError::NoReports);
        }

        let mut by_bureau: BTreeMap<Bureau, (&NormalizedReport, NaiveDate)> = BTreeMap::new();
        for report in &input.reports {
            let report_date = check_structure(report)?;
            if by_bureau.insert(report.bureau, (report, report_date)).is_some() {
                warn!(bureau = %report.bureau, "audit rejected: duplicate bureau");
                return Err(AuditError::DuplicateBureau {
                    bureau: report.bureau,
                });
            }
        }

        let reports: BTreeMap<Bureau, &NormalizedReport> =
            by_bureau.iter().map(|(b, (r, _))| (*b, *r)).collect();
        let report_list: Vec<&NormalizedReport> = reports.values().copied().collect();

        let groups = self.matcher.match_reports(&report_list);
        let discrepancies = self.discrepancy_rules.find_discrepancies(&groups, &reports);
        debug!(
            groups = groups.len(),
            discrepancies = discrepancies.len(),
            "cross-bureau matching complete"
        );

        by_bureau
            .values()
            .map(|(report, report_date)| {
                let violations = self.evaluate(report, *report_date, &input.history);
                let involved: Vec<CrossBureauDiscrepancy> = discrepancies
                    .iter()
                    .filter(|d| d.involves(report.bureau))
                    .cloned()
                    .collect();
                self.assemble(report, *report_date, violations, involved)
            })
            .collect()
    }

    /// Audit one report on its own (no cross-bureau checks)
    pub fn audit_report(
        &self,
        report: &NormalizedReport,
        history: &SnapshotHistory,
    ) -> Result<AuditResult, AuditError> {
        let report_date = check_structure(report)?;
        let violations = self.evaluate(report, report_date, history);
        self.assemble(report, report_date, violations, Vec::new())
    }

    fn evaluate(
        &self,
        report: &NormalizedReport,
        report_date: NaiveDate,
        history: &SnapshotHistory,
    ) -> Vec<Violation> {
        let ctx = ReportContext::build(report, report_date, &self.config, &self.validator, history);
        let violations = self.rules.evaluate(&ctx);
        debug!(
            report_id = %report.report_id,
            bureau = %report.bureau,
            accounts = ctx.accounts.len(),
            violations = violations.len(),
            "report evaluated"
        );
        violations
    }

    fn assemble(
        &self,
        report: &NormalizedReport,
        report_date: NaiveDate,
        mut violations: Vec<Violation>,
        discrepancies: Vec<CrossBureauDiscrepancy>,
    ) -> Result<AuditResult, AuditError> {
        sort_violations(&mut violations);

        let citations = LayeredCitations {
            overrides: &self.config.citations,
            fallback: self.citations.as_ref(),
        };
        let violations: Vec<Violation> = violations
            .into_iter()
            .map(|v| enrich(v, &citations))
            .collect();

        let clean_account_ids = clean_accounts(report, &violations, &discrepancies);
        let summary = summarize(report, &violations, &discrepancies, clean_account_ids.len());

        let input_digest = report.input_digest().map_err(|source| AuditError::Digest {
            report_id: report.report_id.clone(),
            source,
        })?;
        let audit_id = Uuid::new_v5(
            &AUDIT_NAMESPACE,
            format!("{}|{}|{}", input_digest, RULE_CATALOG_VERSION, self.config_digest).as_bytes(),
        );

        info!(
            %audit_id,
            report_id = %report.report_id,
            bureau = %report.bureau,
            violations = summary.violation_count,
            discrepancies = summary.discrepancy_count,
            clean = summary.clean_accounts,
            critical = summary.has_critical,
            "audit complete"
        );

        Ok(AuditResult {
            audit_id,
            report_id: report.report_id.clone(),
            bureau: report.bureau,
            report_date,
            rule_catalog_version: RULE_CATALOG_VERSION.to_string(),
            config_digest: self.config_digest.clone(),
            violations,
            discrepancies,
            clean_account_ids,
            summary,
        })
    }
}

// ============================================================================
// HELPERS
// ============================================================================

/// Reject input that cannot be audited; returns the report date
fn check_structure(report: &NormalizedReport) -> Result<NaiveDate, AuditError> {
    let rejected = if report.report_id.trim().is_empty() {
        Err(AuditError::MissingReportId {
            bureau: report.bureau,
        })
    } else if let Some(date) = report.report_date {
        if report.accounts.is_empty() {
            Err(AuditError::NoAccounts {
                report_id: report.report_id.clone(),
                bureau: report.bureau,
            })
        } else {
            Ok(date)
        }
    } else {
        Err(AuditError::MissingReportDate {
            report_id: report.report_id.clone(),
            bureau: report.bureau,
        })
    };

    if let Err(e) = &rejected {
        warn!(error = %e, "audit rejected");
    }
    rejected
}

/// Accounts with no violation and no cross-bureau discrepancy, sorted by id
fn clean_accounts(
    report: &NormalizedReport,
    violations: &[Violation],
    discrepancies: &[CrossBureauDiscrepancy],
) -> Vec<String> {
    let flagged: BTreeSet<&str> = violations
        .iter()
        .filter_map(|v| v.account_id.as_deref())
        .chain(
            discrepancies
                .iter()
                .filter_map(|d| d.account_ids.get(&report.bureau).map(String::as_str)),
        )
        .collect();

    report
        .accounts
        .iter()
        .map(|a| a.account_id())
        .filter(|id| !flagged.contains(id.as_str()))
        .collect::<BTreeSet<String>>()
        .into_iter()
        .collect()
}

fn summarize(
    report: &NormalizedReport,
    violations: &[Violation],
    discrepancies: &[CrossBureauDiscrepancy],
    clean_accounts: usize,
) -> AuditSummary {
    let mut by_severity: BTreeMap<Severity, usize> =
        Severity::ALL.iter().map(|s| (*s, 0)).collect();
    for violation in violations {
        *by_severity.entry(violation.severity).or_insert(0) += 1;
    }

    let escalation_count = violations
        .iter()
        .filter(|v| matches!(v.evidence, Evidence::Ownership { escalate: true, .. }))
        .count();

    AuditSummary {
        total_accounts: report.accounts.len(),
        clean_accounts,
        violation_count: violations.len(),
        by_severity,
        discrepancy_count: discrepancies.len(),
        has_critical: violations.iter().any(|v| v.severity == Severity::Critical),
        escalation_count,
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::citation::{Citation, CitationStatus};
    use crate::entities::Account;
    use crate::error::CitationError;
    use crate::violation::RuleCode;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn account(creditor: &str, number: &str, balance: f64) -> Account {
        let mut account = Account::new(creditor, number);
        account.account_type_code = "18".to_string();
        account.account_status = "11".to_string();
        account.ecoa = "1".to_string();
        account.portfolio_type = "R".to_string();
        account.date_opened = Some(date(2021, 3, 15));
        account.current_balance = balance;
        account.credit_limit = Some(5000.0);
        account.payment_history = vec!["0".to_string(); 12];
        account
    }

    fn report(id: &str, bureau: Bureau, accounts: Vec<Account>) -> NormalizedReport {
        let mut report = NormalizedReport::new(id, bureau, date(2024, 6, 1));
        report.consumer.name = "JANE Q CONSUMER".to_string();
        report.consumer.ssn_last4 = Some("1234".to_string());
        report.consumer.date_of_birth = Some(date(1985, 2, 10));
        report.consumer.addresses = vec!["12 MAIN ST".to_string()];
        report.accounts = accounts;
        report
    }

    struct FailingCitations;

    impl CitationSource for FailingCitations {
        fn lookup(&self, _rule_code: RuleCode) -> Result<Citation, CitationError> {
            Err(CitationError::Poisoned)
        }
    }

    #[test]
    fn test_no_reports_is_structural_error() {
        let engine = AuditEngine::standard().unwrap();
        let err = engine.audit(&AuditInput::default()).unwrap_err();
        assert!(matches!(err, AuditError::NoReports));
    }

    #[test]
    fn test_missing_report_date_names_the_report() {
        let engine = AuditEngine::standard().unwrap();
        let mut r = report("rpt-1", Bureau::Experian, vec![account("CHASE", "XXXX1234", 10.0)]);
        r.report_date = None;

        let err = engine.audit(&AuditInput::new(vec![r])).unwrap_err();
        match err {
            AuditError::MissingReportDate { report_id, bureau } => {
                assert_eq!(report_id, "rpt-1");
                assert_eq!(bureau, Bureau::Experian);
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_report_without_accounts_rejected() {
        let engine = AuditEngine::standard().unwrap();
        let r = report("rpt-1", Bureau::Equifax, Vec::new());
        let err = engine.audit_report(&r, &SnapshotHistory::new()).unwrap_err();
        assert_eq!(err.missing_field(), Some("accounts"));
    }

    #[test]
    fn test_duplicate_bureau_rejected() {
        let engine = AuditEngine::standard().unwrap();
        let a = report("rpt-1", Bureau::Equifax, vec![account("CHASE", "XXXX1234", 10.0)]);
        let b = report("rpt-2", Bureau::Equifax, vec![account("CHASE", "XXXX1234", 10.0)]);
        let err = engine.audit(&AuditInput::new(vec![a, b])).unwrap_err();
        assert!(matches!(err, AuditError::DuplicateBureau { bureau: Bureau::Equifax }));
    }

    #[test]
    fn test_invalid_config_rejected_at_construction() {
        let config = AuditConfig {
            match_threshold: 1.5,
            ..AuditConfig::default()
        };
        let result = AuditEngine::new(
            config,
            RuleSet::standard(),
            Box::new(StaticCitationTable::standard()),
        );
        assert!(matches!(
            result,
            Err(AuditError::Config(ConfigError::InvalidThreshold(_)))
        ));
    }

    #[test]
    fn test_clean_report_summary() {
        let engine = AuditEngine::standard().unwrap();
        let r = report("rpt-1", Bureau::TransUnion, vec![account("CHASE", "XXXX1234", 10.0)]);
        let result = engine.audit_report(&r, &SnapshotHistory::new()).unwrap();

        assert!(result.is_clean());
        assert_eq!(result.clean_account_ids, vec![r.accounts[0].account_id()]);
        assert_eq!(result.summary.total_accounts, 1);
        assert_eq!(result.summary.by_severity.len(), 4);
        assert!(!result.summary.has_critical);
        assert_eq!(result.rule_catalog_version, RULE_CATALOG_VERSION);
    }

    #[test]
    fn test_violations_sorted_and_cited() {
        let engine = AuditEngine::standard().unwrap();
        let mut paid = account("ZETA BANK", "XXXX0002", 300.0);
        paid.account_status = "13".to_string();
        let mut negative = account("ALPHA BANK", "XXXX0001", -40.0);
        negative.date_closed = Some(date(2020, 1, 1));
        let mut r = report("rpt-1", Bureau::Equifax, vec![paid, negative]);
        r.consumer.ssn_last4 = None;

        let result = engine.audit_report(&r, &SnapshotHistory::new()).unwrap();

        assert_eq!(result.violations[0].rule_code, RuleCode::SsnMissing);
        assert!(result.violations[0].account_id.is_none());
        let keys: Vec<_> = result.violations.iter().map(|v| v.sort_key()).collect();
        let mut sorted = keys.clone();
        sorted.sort();
        assert_eq!(keys, sorted);

        assert!(result
            .violations
            .iter()
            .all(|v| v.citation_status == CitationStatus::Resolved && v.citation.is_some()));
        assert!(result.clean_account_ids.is_empty());
    }

    #[test]
    fn test_citation_failure_degrades() {
        let engine = AuditEngine::new(
            AuditConfig::default(),
            RuleSet::standard(),
            Box::new(FailingCitations),
        )
        .unwrap();
        let r = report("rpt-1", Bureau::Equifax, vec![account("CHASE", "XXXX1234", -5.0)]);

        let result = engine.audit_report(&r, &SnapshotHistory::new()).unwrap();
        assert_eq!(result.violations.len(), 1);
        assert!(matches!(
            result.violations[0].citation_status,
            CitationStatus::Failed(_)
        ));
    }

    #[test]
    fn test_config_citation_overrides_source() {
        let mut config = AuditConfig::default();
        config.citations.insert(
            RuleCode::NegativeBalance,
            Citation::new("LOCAL-1", "Compliance manual", "15 U.S.C. §1681s-2(a)(2)"),
        );
        let engine =
            AuditEngine::new(config, RuleSet::standard(), Box::new(FailingCitations)).unwrap();
        let r = report("rpt-1", Bureau::Equifax, vec![account("CHASE", "XXXX1234", -5.0)]);

        let result = engine.audit_report(&r, &SnapshotHistory::new()).unwrap();
        let citation = result.violations[0].citation.as_ref().unwrap();
        assert_eq!(citation.anchor_id, "LOCAL-1");
    }

    #[test]
    fn test_audit_id_is_stable_and_config_sensitive() {
        let r = report("rpt-1", Bureau::Equifax, vec![account("CHASE", "XXXX1234", 10.0)]);
        let engine = AuditEngine::standard().unwrap();
        let first = engine.audit_report(&r, &SnapshotHistory::new()).unwrap();
        let second = engine.audit_report(&r, &SnapshotHistory::new()).unwrap();
        assert_eq!(first.audit_id, second.audit_id);

        let other = AuditEngine::new(
            AuditConfig {
                reporting_window_years: 8,
                ..AuditConfig::default()
            },
            RuleSet::standard(),
            Box::new(StaticCitationTable::standard()),
        )
        .unwrap();
        let third = other.audit_report(&r, &SnapshotHistory::new()).unwrap();
        assert_ne!(first.audit_id, third.audit_id);
    }

    #[test]
    fn test_discrepancy_attached_to_every_involved_bureau() {
        let engine = AuditEngine::standard().unwrap();
        let eq = report("rpt-eq", Bureau::Equifax, vec![account("CHASE", "XXXX1234", 100.0)]);
        let tu = report("rpt-tu", Bureau::TransUnion, vec![account("CHASE", "XXXX1234", 900.0)]);

        let results = engine.audit(&AuditInput::new(vec![tu, eq])).unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].bureau, Bureau::Equifax);
        assert_eq!(results[1].bureau, Bureau::TransUnion);
        for result in &results {
            assert_eq!(result.discrepancies.len(), 1);
            assert!(result.clean_account_ids.is_empty());
        }
    }
}
