// Furnisher rules: original-creditor disclosure and OC/collector coexistence

use super::{AccountRule, AuditedAccount, ReportContext};
use crate::coexistence::{classify, upstream_creditor_name, Coexistence, RoleSignal};
use crate::violation::{Evidence, RuleCode, Severity, Violation};

/// Collectors and debt buyers must name the creditor the debt came from
pub struct OriginalCreditorDisclosureRule;

impl AccountRule for OriginalCreditorDisclosureRule {
    fn id(&self) -> &'static str {
        "furnisher.original_creditor"
    }

    fn evaluate(&self, account: &AuditedAccount<'_>, ctx: &ReportContext<'_>) -> Vec<Violation> {
        if !account.role.role.is_downstream() || upstream_creditor_name(account.account).is_some() {
            return Vec::new();
        }

        let detail = match account.role.signal {
            RoleSignal::TypeCode => "furnisher or account type",
            RoleSignal::AssignmentSegment => "assignment segment",
            RoleSignal::StatusText => "payment status text",
            RoleSignal::Default => "default",
        };

        vec![account.violation(
            ctx,
            RuleCode::CollectorMissingOriginalCreditor,
            Severity::Medium,
            format!(
                "{} reports as a collector but does not name the original creditor",
                account.account.creditor_name
            ),
            Evidence::Identity {
                field: "original_creditor".to_string(),
                detail: Some(format!("role identified by {}", detail)),
            },
        )]
    }
}

/// Classify a collector against the OC tradeline it was paired with
///
/// Evaluated on the collector side only so each pair reports once.
pub struct CoexistenceRule;

impl AccountRule for CoexistenceRule {
    fn id(&self) -> &'static str {
        "furnisher.coexistence"
    }

    fn evaluate(&self, account: &AuditedAccount<'_>, ctx: &ReportContext<'_>) -> Vec<Violation> {
        if !account.role.role.is_downstream() {
            return Vec::new();
        }
        let Some(oc) = account.counterpart.and_then(|i| ctx.account(i)) else {
            return Vec::new();
        };

        let result = classify(Some(oc.account), Some(account.account));
        let Some(severity) = result.severity else {
            return Vec::new();
        };

        let oc_balance = oc.account.current_balance;
        let collector_balance = account.account.current_balance;

        let (rule_code, description) = match result.classification {
            Coexistence::DoubleBalanceViolation => (
                RuleCode::DoubleBalance,
                format!(
                    "Both {} ({:.2}) and {} ({:.2}) report a balance for the same debt",
                    oc.account.creditor_name,
                    oc_balance,
                    account.account.creditor_name,
                    collector_balance
                ),
            ),
            Coexistence::OwnershipConflict => (
                RuleCode::OwnershipConflict,
                format!(
                    "{} still reports a balance of {:.2} while {} reports the debt as its own with none",
                    oc.account.creditor_name, oc_balance, account.account.creditor_name
                ),
            ),
            _ => return Vec::new(),
        };

        let violation = account
            .violation(
                ctx,
                rule_code,
                severity,
                description,
                Evidence::Ownership {
                    classification: result.classification,
                    original_creditor: oc.account.creditor_name.clone(),
                    collector: account.account.creditor_name.clone(),
                    original_creditor_balance: oc_balance,
                    collector_balance,
                    escalate: result.escalate,
                    demand_documentation: result.demand_documentation,
                },
            )
            .with_values(
                "exactly one furnisher reports a balance",
                format!("OC {:.2}, collector {:.2}", oc_balance, collector_balance),
            );

        vec![violation]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AuditConfig;
    use crate::entities::Account;
    use crate::rules::fixtures::*;
    use crate::temporal::SnapshotHistory;

    fn pair(oc_balance: f64, collector_balance: f64) -> (Account, Account) {
        let mut oc = clean_account("CAPITAL ONE", "XXXX5555");
        oc.account_status = "97".to_string();
        oc.date_of_first_delinquency = Some(date(2022, 1, 15));
        oc.current_balance = oc_balance;

        let mut collector = clean_account("MIDLAND CREDIT", "XXXX9999");
        collector.account_type_code = "48".to_string();
        collector.original_creditor = Some("Capital One, N.A.".to_string());
        collector.payment_history.clear();
        collector.current_balance = collector_balance;
        (oc, collector)
    }

    fn run(rule: &dyn AccountRule, accounts: Vec<Account>) -> Vec<Violation> {
        let report = report_with(accounts);
        let config = AuditConfig::default();
        let validator = config.schema_validator();
        let history = SnapshotHistory::new();
        let ctx = ReportContext::build(&report, date(2024, 6, 1), &config, &validator, &history);
        ctx.accounts
            .iter()
            .flat_map(|account| rule.evaluate(account, &ctx))
            .collect()
    }

    #[test]
    fn test_double_balance_raised_once_on_collector() {
        let (oc, collector) = pair(1200.0, 1200.0);
        let collector_id = collector.account_id();

        let violations = run(&CoexistenceRule, vec![oc, collector]);
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].rule_code, RuleCode::DoubleBalance);
        assert_eq!(violations[0].severity, Severity::High);
        assert_eq!(violations[0].account_id.as_deref(), Some(collector_id.as_str()));
        match &violations[0].evidence {
            Evidence::Ownership { escalate, .. } => assert!(*escalate),
            other => panic!("unexpected evidence {:?}", other),
        }
    }

    #[test]
    fn test_ownership_conflict_demands_documentation() {
        let (oc, collector) = pair(900.0, 0.0);
        let violations = run(&CoexistenceRule, vec![oc, collector]);
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].rule_code, RuleCode::OwnershipConflict);
        match &violations[0].evidence {
            Evidence::Ownership {
                demand_documentation,
                ..
            } => assert!(*demand_documentation),
            other => panic!("unexpected evidence {:?}", other),
        }
    }

    #[test]
    fn test_valid_and_resolved_pairs_are_clean() {
        let (oc, collector) = pair(0.0, 700.0);
        assert!(run(&CoexistenceRule, vec![oc, collector]).is_empty());

        let (oc, collector) = pair(0.0, 0.0);
        assert!(run(&CoexistenceRule, vec![oc, collector]).is_empty());
    }

    #[test]
    fn test_collector_without_original_creditor() {
        let (_, mut collector) = pair(0.0, 700.0);
        collector.original_creditor = None;

        let violations = run(&OriginalCreditorDisclosureRule, vec![collector]);
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].rule_code, RuleCode::CollectorMissingOriginalCreditor);
    }
}
