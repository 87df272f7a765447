// Payment-history rules: the guardrail plus history/status consistency

use super::{AccountRule, AuditedAccount, ReportContext};
use crate::attributes::{AccountStatus, FieldName, COLLECTION_AGENCY_TYPE, DEBT_BUYER_TYPE};
use crate::coexistence::FurnisherRole;
use crate::payment_history::{self, delinquency_level, implied_dofd, HistoryIssue};
use crate::schema::ValidationMode;
use crate::violation::{Evidence, RuleCode, Severity, Violation};
use chrono::{Datelike, NaiveDate};

/// Reporter eligibility, symbol alphabet, length and ladder
pub struct PaymentHistoryRule;

impl AccountRule for PaymentHistoryRule {
    fn id(&self) -> &'static str {
        "sequence.payment_history"
    }

    fn evaluate(&self, account: &AuditedAccount<'_>, ctx: &ReportContext<'_>) -> Vec<Violation> {
        let symbols = account.fields.history_symbols();
        let account_type = effective_account_type(account);
        let mode = ctx.validator.modes().mode(FieldName::PaymentHistory);

        let result = payment_history::validate(
            &symbols,
            account.account.date_opened,
            ctx.report_date,
            &account_type,
            account.account.has_ownership_gap,
            &ctx.config.history,
        );

        result
            .issues
            .iter()
            .filter_map(|issue| {
                let severity = match (issue, mode) {
                    (HistoryIssue::InvalidSymbol { .. }, ValidationMode::Disabled) => return None,
                    (HistoryIssue::InvalidSymbol { .. }, ValidationMode::Warn) => Severity::Low,
                    _ => issue.severity(),
                };

                let position = match issue {
                    HistoryIssue::InvalidSymbol { position, .. }
                    | HistoryIssue::LadderInversion { position, .. } => Some(*position),
                    _ => None,
                };

                let evidence = Evidence::Sequence {
                    length: symbols.len(),
                    allowed_length: result.allowed_length,
                    position,
                    symbols: symbols.clone(),
                };

                let violation =
                    account.violation(ctx, issue.rule_code(), severity, issue.describe(), evidence);

                Some(match issue {
                    HistoryIssue::ExceedsAccountAge { length, allowed, .. } => violation
                        .with_values(format!("at most {} months", allowed), format!("{} months", length)),
                    _ => violation,
                })
            })
            .collect()
    }
}

/// Account type the guardrail should judge the account as
///
/// Any debt buyer is held to the 0C rules. A collector identified by another
/// signal is held to the 48 rules when the type code is missing.
fn effective_account_type(account: &AuditedAccount<'_>) -> String {
    let code = account.fields.account_type_code();
    match account.role.role {
        FurnisherRole::DebtBuyer => DEBT_BUYER_TYPE.to_string(),
        FurnisherRole::Collector if code.is_empty() => COLLECTION_AGENCY_TYPE.to_string(),
        _ => code,
    }
}

/// "Current" status over a delinquent most-recent month
pub struct HistoryStatusRule;

impl AccountRule for HistoryStatusRule {
    fn id(&self) -> &'static str {
        "sequence.history_status"
    }

    fn evaluate(&self, account: &AuditedAccount<'_>, ctx: &ReportContext<'_>) -> Vec<Violation> {
        if account.fields.status() != Some(AccountStatus::Current) {
            return Vec::new();
        }

        let symbols = account.fields.history_symbols();
        let Some(newest) = symbols.first() else {
            return Vec::new();
        };
        let Some(level) = delinquency_level(newest).filter(|l| *l >= 1) else {
            return Vec::new();
        };

        vec![account
            .violation(
                ctx,
                RuleCode::HistoryStatusConflict,
                Severity::Medium,
                format!(
                    "Status is current but the most recent month shows delinquency level {}",
                    level
                ),
                Evidence::Sequence {
                    length: symbols.len(),
                    allowed_length: None,
                    position: Some(0),
                    symbols: symbols.clone(),
                },
            )
            .with_values("0", newest.clone())]
    }
}

/// Reported DOFD disagrees with the DOFD the payment grid implies
pub struct DofdHistoryRule;

impl AccountRule for DofdHistoryRule {
    fn id(&self) -> &'static str {
        "sequence.dofd_history"
    }

    fn evaluate(&self, account: &AuditedAccount<'_>, ctx: &ReportContext<'_>) -> Vec<Violation> {
        let Some(reported) = account.account.date_of_first_delinquency else {
            return Vec::new();
        };
        let symbols = account.fields.history_symbols();
        let Some(implied) = implied_dofd(&symbols, ctx.report_date) else {
            return Vec::new();
        };

        let gap = month_index(reported).abs_diff(month_index(implied));
        if gap <= u64::from(ctx.config.dofd_history_tolerance_months) {
            return Vec::new();
        }

        vec![account
            .violation(
                ctx,
                RuleCode::DofdHistoryMismatch,
                Severity::Low,
                format!(
                    "Reported DOFD {} is {} months from the {} implied by the payment history",
                    reported, gap, implied
                ),
                Evidence::Temporal {
                    field: "date_of_first_delinquency".to_string(),
                    reported: Some(reported),
                    reference_field: "payment_history".to_string(),
                    reference: Some(implied),
                    delta_days: Some((reported - implied).num_days()),
                },
            )
            .with_values(implied.to_string(), reported.to_string())]
    }
}

fn month_index(date: NaiveDate) -> i64 {
    i64::from(date.year()) * 12 + i64::from(date.month0())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AuditConfig;
    use crate::entities::Account;
    use crate::rules::fixtures::*;
    use crate::schema::FieldModes;
    use crate::temporal::SnapshotHistory;

    fn symbols(s: &[&str]) -> Vec<String> {
        s.iter().map(|v| v.to_string()).collect()
    }

    fn run_with(rule: &dyn AccountRule, account: Account, config: AuditConfig) -> Vec<Violation> {
        let report = report_with(vec![account]);
        let validator = config.schema_validator();
        let history = SnapshotHistory::new();
        let ctx = ReportContext::build(&report, date(2024, 6, 1), &config, &validator, &history);
        rule.evaluate(&ctx.accounts[0], &ctx)
    }

    fn run(rule: &dyn AccountRule, account: Account) -> Vec<Violation> {
        run_with(rule, account, AuditConfig::default())
    }

    #[test]
    fn test_collector_may_not_report_history() {
        let mut account = clean_account("MIDLAND CREDIT", "XXXX9999");
        account.account_type_code = "48".to_string();
        account.portfolio_type = "O".to_string();

        let violations = run(&PaymentHistoryRule, account);
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].rule_code, RuleCode::HistoryProhibitedForFurnisher);
        assert_eq!(violations[0].severity, Severity::High);
    }

    #[test]
    fn test_collector_by_assignment_segment_without_type_code() {
        let mut account = clean_account("MIDLAND CREDIT", "XXXX9999");
        account.account_type_code = String::new();
        account.original_creditor = Some("CAPITAL ONE".to_string());

        let violations = run(&PaymentHistoryRule, account);
        assert!(violations
            .iter()
            .any(|v| v.rule_code == RuleCode::HistoryProhibitedForFurnisher));
    }

    #[test]
    fn test_history_longer_than_account_age_is_critical() {
        let mut account = clean_account("CHASE BANK", "XXXX1234");
        account.date_opened = Some(date(2023, 12, 1));
        account.payment_history = vec!["0".to_string(); 12];

        let violations = run(&PaymentHistoryRule, account);
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].rule_code, RuleCode::HistoryExceedsAccountAge);
        assert_eq!(violations[0].severity, Severity::Critical);
        assert_eq!(violations[0].expected.as_deref(), Some("at most 9 months"));
    }

    #[test]
    fn test_invalid_symbol_severity_follows_mode() {
        let mut account = clean_account("CHASE BANK", "XXXX1234");
        account.payment_history = symbols(&["0", "Q", "0"]);

        let coerce = run(&PaymentHistoryRule, account.clone());
        assert_eq!(coerce.len(), 1);
        assert_eq!(coerce[0].rule_code, RuleCode::InvalidHistorySymbol);
        assert_eq!(coerce[0].severity, Severity::Medium);

        let warn = AuditConfig {
            validation_modes: FieldModes::uniform(ValidationMode::Warn),
            ..AuditConfig::default()
        };
        let warned = run_with(&PaymentHistoryRule, account.clone(), warn);
        assert_eq!(warned[0].severity, Severity::Low);

        let disabled = AuditConfig {
            validation_modes: FieldModes::uniform(ValidationMode::Disabled),
            ..AuditConfig::default()
        };
        assert!(run_with(&PaymentHistoryRule, account, disabled).is_empty());
    }

    #[test]
    fn test_ladder_skip_reported_with_position() {
        let mut account = clean_account("CHASE BANK", "XXXX1234");
        account.payment_history = symbols(&["0", "2", "5", "0"]);

        let violations = run(&PaymentHistoryRule, account);
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].rule_code, RuleCode::LadderInversion);
        match &violations[0].evidence {
            Evidence::Sequence { position, .. } => assert_eq!(*position, Some(2)),
            other => panic!("unexpected evidence {:?}", other),
        }
    }

    #[test]
    fn test_current_status_over_late_month() {
        let mut account = clean_account("CHASE BANK", "XXXX1234");
        account.payment_history = symbols(&["2", "1", "0"]);

        let violations = run(&HistoryStatusRule, account);
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].rule_code, RuleCode::HistoryStatusConflict);
        assert_eq!(violations[0].actual.as_deref(), Some("2"));
    }

    #[test]
    fn test_dofd_far_from_history_is_flagged() {
        let mut account = clean_account("CHASE BANK", "XXXX1234");
        account.account_status = "78".to_string();
        account.payment_history = symbols(&["2", "1", "0", "0"]);
        account.date_of_first_delinquency = Some(date(2023, 1, 10));

        let violations = run(&DofdHistoryRule, account);
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].rule_code, RuleCode::DofdHistoryMismatch);
        assert_eq!(violations[0].expected.as_deref(), Some("2024-04-01"));
    }

    #[test]
    fn test_dofd_within_tolerance_is_clean() {
        let mut account = clean_account("CHASE BANK", "XXXX1234");
        account.account_status = "78".to_string();
        account.payment_history = symbols(&["2", "1", "0", "0"]);
        account.date_of_first_delinquency = Some(date(2024, 3, 20));

        assert!(run(&DofdHistoryRule, account).is_empty());
    }
}
