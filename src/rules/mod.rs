// 📏 Rule Set - Independent checks over one normalized report
//
// Every rule sees the same precomputed context (resolved codes, furnisher
// role, OC pairing) and returns its own violations. No rule reads another
// rule's output, so the set can be evaluated in any order and new rules
// are added by registering one more struct.

mod balance;
mod furnisher;
mod identity;
mod inquiry;
mod lifecycle;
mod public_record;
mod schema;
mod sequence;
mod temporal;

pub use balance::{
    BalanceCeilingRule, NegativeBalanceRule, PaidStatusBalanceRule, TransferredBalanceRule,
};
pub use furnisher::{CoexistenceRule, OriginalCreditorDisclosureRule};
pub use identity::{AccountBeforeBirthRule, ConsumerIdentityRule};
pub use inquiry::InquiryRule;
pub use lifecycle::{DelinquencyLifecycleRule, ReportingWindowRule};
pub use public_record::PublicRecordRule;
pub use schema::FieldCodeRule;
pub use sequence::{DofdHistoryRule, HistoryStatusRule, PaymentHistoryRule};
pub use temporal::DateConsistencyRule;

use crate::coexistence::{determine_role, pair_accounts, RoleAssignment};
use crate::config::AuditConfig;
use crate::entities::{Account, NormalizedReport};
use crate::schema::{ResolvedFields, SchemaValidator};
use crate::temporal::SnapshotHistory;
use crate::violation::{Evidence, RuleCode, RuleFamily, Severity, Violation};
use chrono::NaiveDate;
use serde::Serialize;

// ============================================================================
// CONTEXT
// ============================================================================

/// One account with everything the rules need precomputed
#[derive(Debug, Clone)]
pub struct AuditedAccount<'a> {
    pub index: usize,
    pub account: &'a Account,
    pub account_id: String,
    pub fingerprint: String,
    pub fields: ResolvedFields,
    pub role: RoleAssignment,

    /// Index of the OC tradeline a downstream account was paired with
    pub counterpart: Option<usize>,
}

impl<'a> AuditedAccount<'a> {
    /// Start a violation attributed to this account
    pub fn violation(
        &self,
        ctx: &ReportContext<'_>,
        rule_code: RuleCode,
        severity: Severity,
        description: impl Into<String>,
        evidence: Evidence,
    ) -> Violation {
        ctx.violation(rule_code, severity, description, evidence)
            .for_account(self.account_id.clone(), self.account.creditor_name.clone())
    }
}

/// Read-only view of one report under audit
pub struct ReportContext<'a> {
    pub report: &'a NormalizedReport,
    pub report_date: NaiveDate,
    pub config: &'a AuditConfig,
    pub validator: &'a SchemaValidator,
    pub history: &'a SnapshotHistory,
    pub accounts: Vec<AuditedAccount<'a>>,
}

impl<'a> ReportContext<'a> {
    /// Resolve codes, roles and OC pairings for every account of the report
    pub fn build(
        report: &'a NormalizedReport,
        report_date: NaiveDate,
        config: &'a AuditConfig,
        validator: &'a SchemaValidator,
        history: &'a SnapshotHistory,
    ) -> Self {
        let fields: Vec<ResolvedFields> = report
            .accounts
            .iter()
            .map(|account| validator.validate_account(account))
            .collect();

        let roles: Vec<RoleAssignment> = report
            .accounts
            .iter()
            .zip(&fields)
            .map(|(account, fields)| determine_role(account, &fields.account_type_code()))
            .collect();

        let pairs = pair_accounts(&report.accounts, &roles);

        let accounts = report
            .accounts
            .iter()
            .zip(fields)
            .zip(roles)
            .zip(pairs)
            .enumerate()
            .map(|(index, (((account, fields), role), counterpart))| AuditedAccount {
                index,
                account,
                account_id: account.account_id(),
                fingerprint: account.fingerprint(),
                fields,
                role,
                counterpart,
            })
            .collect();

        ReportContext {
            report,
            report_date,
            config,
            validator,
            history,
            accounts,
        }
    }

    /// Start a report-level violation
    pub fn violation(
        &self,
        rule_code: RuleCode,
        severity: Severity,
        description: impl Into<String>,
        evidence: Evidence,
    ) -> Violation {
        Violation::new(
            rule_code,
            severity,
            self.report.report_id.clone(),
            self.report.bureau,
            description,
            evidence,
        )
    }

    pub fn account(&self, index: usize) -> Option<&AuditedAccount<'a>> {
        self.accounts.get(index)
    }
}

// ============================================================================
// RULE TRAITS
// ============================================================================

/// A check over a single account
pub trait AccountRule: Send + Sync {
    fn id(&self) -> &'static str;
    fn evaluate(&self, account: &AuditedAccount<'_>, ctx: &ReportContext<'_>) -> Vec<Violation>;
}

/// A check over report-level data (identity, inquiries, public records)
pub trait ReportRule: Send + Sync {
    fn id(&self) -> &'static str;
    fn evaluate(&self, ctx: &ReportContext<'_>) -> Vec<Violation>;
}

// ============================================================================
// RULE SET
// ============================================================================

#[derive(Default)]
pub struct RuleSet {
    account_rules: Vec<Box<dyn AccountRule>>,
    report_rules: Vec<Box<dyn ReportRule>>,
}

impl RuleSet {
    pub fn empty() -> Self {
        RuleSet::default()
    }

    /// Every built-in rule
    pub fn standard() -> Self {
        RuleSet::empty()
            .with_account_rule(FieldCodeRule)
            .with_account_rule(DelinquencyLifecycleRule)
            .with_account_rule(ReportingWindowRule)
            .with_account_rule(DateConsistencyRule)
            .with_account_rule(PaymentHistoryRule)
            .with_account_rule(HistoryStatusRule)
            .with_account_rule(DofdHistoryRule)
            .with_account_rule(PaidStatusBalanceRule)
            .with_account_rule(TransferredBalanceRule)
            .with_account_rule(NegativeBalanceRule)
            .with_account_rule(BalanceCeilingRule)
            .with_account_rule(OriginalCreditorDisclosureRule)
            .with_account_rule(CoexistenceRule)
            .with_account_rule(AccountBeforeBirthRule)
            .with_report_rule(ConsumerIdentityRule)
            .with_report_rule(PublicRecordRule)
            .with_report_rule(InquiryRule)
    }

    pub fn with_account_rule(mut self, rule: impl AccountRule + 'static) -> Self {
        self.account_rules.push(Box::new(rule));
        self
    }

    pub fn with_report_rule(mut self, rule: impl ReportRule + 'static) -> Self {
        self.report_rules.push(Box::new(rule));
        self
    }

    pub fn len(&self) -> usize {
        self.account_rules.len() + self.report_rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn rule_ids(&self) -> Vec<&'static str> {
        self.account_rules
            .iter()
            .map(|r| r.id())
            .chain(self.report_rules.iter().map(|r| r.id()))
            .collect()
    }

    /// Run every rule over the report. Output is unsorted.
    pub fn evaluate(&self, ctx: &ReportContext<'_>) -> Vec<Violation> {
        let mut violations = Vec::new();

        for account in &ctx.accounts {
            for rule in &self.account_rules {
                violations.extend(rule.evaluate(account, ctx));
            }
        }

        for rule in &self.report_rules {
            violations.extend(rule.evaluate(ctx));
        }

        violations
    }
}

// ============================================================================
// CATALOG
// ============================================================================

/// One line of the published rule catalog
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CatalogEntry {
    pub rule_code: RuleCode,
    pub family: RuleFamily,
    pub default_severity: Severity,
}

pub fn catalog() -> Vec<CatalogEntry> {
    RuleCode::ALL
        .iter()
        .map(|code| CatalogEntry {
            rule_code: *code,
            family: code.family(),
            default_severity: code.default_severity(),
        })
        .collect()
}

// ============================================================================
// TEST FIXTURES
// ============================================================================


#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;
    use crate::coexistence::FurnisherRole;

    fn run(report: &NormalizedReport) -> Vec<Violation> {
        let config = AuditConfig::default();
        let validator = config.schema_validator();
        let history = SnapshotHistory::new();
        let ctx = ReportContext::build(report, date(2024, 6, 1), &config, &validator, &history);
        RuleSet::standard().evaluate(&ctx)
    }

    #[test]
    fn test_clean_report_has_no_violations() {
        let report = report_with(vec![clean_account("CHASE BANK", "XXXX1234")]);
        assert!(run(&report).is_empty(), "{:#?}", run(&report));
    }

    #[test]
    fn test_context_pairs_collector_with_oc() {
        let oc = clean_account("CAPITAL ONE", "XXXX5555");
        let mut collector = clean_account("MIDLAND CREDIT", "XXXX9999");
        collector.account_type_code = "48".to_string();
        collector.original_creditor = Some("CAPITAL ONE".to_string());
        let report = report_with(vec![oc, collector]);

        let config = AuditConfig::default();
        let validator = config.schema_validator();
        let history = SnapshotHistory::new();
        let ctx = ReportContext::build(&report, date(2024, 6, 1), &config, &validator, &history);

        assert_eq!(ctx.accounts[1].role.role, FurnisherRole::Collector);
        assert_eq!(ctx.accounts[1].counterpart, Some(0));
        assert_eq!(ctx.accounts[0].counterpart, None);
    }

    #[test]
    fn test_standard_rule_ids_are_unique() {
        let rules = RuleSet::standard();
        let mut ids = rules.rule_ids();
        let count = ids.len();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), count);
        assert_eq!(count, rules.len());
    }

    #[test]
    fn test_catalog_covers_every_code() {
        let entries = catalog();
        assert_eq!(entries.len(), RuleCode::ALL.len());
        let reaging = entries
            .iter()
            .find(|e| e.rule_code == RuleCode::StatusRegressionReaging)
            .unwrap();
        assert_eq!(reaging.default_severity, Severity::Critical);
        assert_eq!(reaging.family, RuleFamily::Lifecycle);
    }

    #[test]
    fn test_empty_rule_set_finds_nothing() {
        let mut account = clean_account("CHASE BANK", "XXXX1234");
        account.current_balance = -50.0;
        let report = report_with(vec![account]);

        let config = AuditConfig::default();
        let validator = config.schema_validator();
        let history = SnapshotHistory::new();
        let ctx = ReportContext::build(&report, date(2024, 6, 1), &config, &validator, &history);
        assert!(RuleSet::empty().evaluate(&ctx).is_empty());
    }
}
