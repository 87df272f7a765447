// Delinquency lifecycle rules: DOFD lock, re-aging and the reporting window

use super::{AccountRule, AuditedAccount, ReportContext};
use crate::coexistence::FurnisherRole;
use crate::temporal::{
    check_timeline, infer_event, prior_snapshots, replay, DelinquencySnapshot, LifecycleFinding,
    TimelineIssue,
};
use crate::violation::{Evidence, RuleCode, Severity, Violation};

/// Replays prior snapshots plus the current report through the state machine
pub struct DelinquencyLifecycleRule;

impl AccountRule for DelinquencyLifecycleRule {
    fn id(&self) -> &'static str {
        "lifecycle.delinquency"
    }

    fn evaluate(&self, account: &AuditedAccount<'_>, ctx: &ReportContext<'_>) -> Vec<Violation> {
        // An unresolvable status is already a schema violation
        let Some(status) = account.fields.status() else {
            return Vec::new();
        };

        let current = DelinquencySnapshot::new(
            ctx.report_date,
            status,
            account.account.date_of_first_delinquency,
        )
        .with_event(infer_event(
            &account.fields.history_symbols(),
            account.account.date_closed,
            ctx.report_date,
        ));

        let mut snapshots =
            prior_snapshots(ctx.history, &account.fingerprint, &account.account_id).to_vec();
        snapshots.push(current);

        let debt_buyer = account.role.role == FurnisherRole::DebtBuyer;
        let (_, findings) = replay(&snapshots, debt_buyer);

        findings
            .into_iter()
            .map(|finding| finding_violation(finding, account, ctx))
            .collect()
    }
}

fn finding_violation(
    finding: LifecycleFinding,
    account: &AuditedAccount<'_>,
    ctx: &ReportContext<'_>,
) -> Violation {
    let evidence = Evidence::Lifecycle {
        as_of: finding.as_of,
        from_state: finding.from_state,
        to_state: finding.to_state,
        status: finding.status.code().to_string(),
        locked_dofd: finding.locked_dofd,
        reported_dofd: finding.reported_dofd,
    };

    let violation = account.violation(
        ctx,
        finding.rule_code,
        finding.severity,
        finding.description,
        evidence,
    );

    match (finding.locked_dofd, finding.reported_dofd) {
        (Some(locked), Some(reported)) if finding.rule_code == RuleCode::DofdModifiedAfterLock => {
            violation.with_values(locked.to_string(), reported.to_string())
        }
        _ => violation,
    }
}

/// DOFD before the open date, and delinquencies past the reporting window
pub struct ReportingWindowRule;

impl AccountRule for ReportingWindowRule {
    fn id(&self) -> &'static str {
        "lifecycle.reporting_window"
    }

    fn evaluate(&self, account: &AuditedAccount<'_>, ctx: &ReportContext<'_>) -> Vec<Violation> {
        let window = ctx.config.reporting_window_years;

        check_timeline(
            account.account.date_of_first_delinquency,
            account.account.date_opened,
            ctx.report_date,
            window,
        )
        .into_iter()
        .map(|issue| match issue {
            TimelineIssue::DofdBeforeOpened { dofd, date_opened } => account.violation(
                ctx,
                RuleCode::DofdBeforeDateOpened,
                Severity::High,
                format!(
                    "Date of first delinquency {} is before the account was opened on {}",
                    dofd, date_opened
                ),
                Evidence::Temporal {
                    field: "date_of_first_delinquency".to_string(),
                    reported: Some(dofd),
                    reference_field: "date_opened".to_string(),
                    reference: Some(date_opened),
                    delta_days: Some((date_opened - dofd).num_days()),
                },
            ),
            TimelineIssue::ObsoleteReporting {
                dofd,
                expires,
                report_date,
            } => account
                .violation(
                    ctx,
                    RuleCode::ObsoleteReporting,
                    Severity::High,
                    format!(
                        "Delinquency with DOFD {} passed its {}-year reporting window on {}",
                        dofd, window, expires
                    ),
                    Evidence::Temporal {
                        field: "date_of_first_delinquency".to_string(),
                        reported: Some(dofd),
                        reference_field: "report_date".to_string(),
                        reference: Some(report_date),
                        delta_days: Some((report_date - expires).num_days()),
                    },
                )
                .with_values(format!("removed by {}", expires), "still reported"),
        })
        .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attributes::AccountStatus;
    use crate::config::AuditConfig;
    use crate::entities::Account;
    use crate::rules::fixtures::*;
    use crate::temporal::SnapshotHistory;
    use chrono::NaiveDate;

    fn run_rule(
        rule: &dyn AccountRule,
        account: Account,
        history: &SnapshotHistory,
        report_date: NaiveDate,
    ) -> Vec<Violation> {
        let report = report_with(vec![account]);
        let config = AuditConfig::default();
        let validator = config.schema_validator();
        let ctx = ReportContext::build(&report, report_date, &config, &validator, history);
        rule.evaluate(&ctx.accounts[0], &ctx)
    }

    fn charged_off() -> Account {
        let mut account = clean_account("CAPITAL ONE", "XXXX5555");
        account.account_status = "97".to_string();
        account.date_of_first_delinquency = Some(date(2022, 1, 15));
        account.payment_history = vec!["L".to_string(); 6];
        account
    }

    #[test]
    fn test_reaging_detected_from_history() {
        let account = charged_off();
        let mut history = SnapshotHistory::new();
        history.insert(
            account.fingerprint(),
            vec![DelinquencySnapshot::new(
                date(2023, 6, 1),
                AccountStatus::ChargeOff,
                Some(date(2022, 1, 15)),
            )],
        );

        let mut reaged = account;
        reaged.account_status = "11".to_string();
        reaged.date_of_first_delinquency = Some(date(2023, 9, 1));
        reaged.payment_history = vec!["0".to_string(); 6];

        let violations =
            run_rule(&DelinquencyLifecycleRule, reaged, &history, date(2024, 6, 1));
        let codes: Vec<RuleCode> = violations.iter().map(|v| v.rule_code).collect();

        assert!(codes.contains(&RuleCode::StatusRegressionReaging));
        assert!(codes.contains(&RuleCode::DofdModifiedAfterLock));
        let modified = violations
            .iter()
            .find(|v| v.rule_code == RuleCode::DofdModifiedAfterLock)
            .unwrap();
        assert_eq!(modified.expected.as_deref(), Some("2022-01-15"));
        assert_eq!(modified.actual.as_deref(), Some("2023-09-01"));
    }

    #[test]
    fn test_history_found_by_short_id() {
        let account = charged_off();
        let mut history = SnapshotHistory::new();
        history.insert(
            account.account_id(),
            vec![DelinquencySnapshot::new(
                date(2023, 6, 1),
                AccountStatus::ChargeOff,
                Some(date(2021, 12, 1)),
            )],
        );

        let violations = run_rule(&DelinquencyLifecycleRule, account, &history, date(2024, 6, 1));
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].rule_code, RuleCode::DofdModifiedAfterLock);
    }

    #[test]
    fn test_charge_off_without_dofd() {
        let mut account = charged_off();
        account.date_of_first_delinquency = None;

        let violations = run_rule(
            &DelinquencyLifecycleRule,
            account,
            &SnapshotHistory::new(),
            date(2024, 6, 1),
        );
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].rule_code, RuleCode::DofdMissing);
        assert_eq!(violations[0].severity, Severity::High);
    }

    #[test]
    fn test_obsolete_reporting_after_window() {
        let mut account = charged_off();
        account.date_opened = Some(date(2012, 1, 1));
        account.date_of_first_delinquency = Some(date(2016, 5, 1));

        let violations = run_rule(
            &ReportingWindowRule,
            account,
            &SnapshotHistory::new(),
            date(2024, 6, 1),
        );
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].rule_code, RuleCode::ObsoleteReporting);
    }

    #[test]
    fn test_window_boundary_day_is_still_reportable() {
        let mut account = charged_off();
        account.date_opened = Some(date(2012, 1, 1));
        account.date_of_first_delinquency = Some(date(2017, 6, 1));

        let violations = run_rule(
            &ReportingWindowRule,
            account,
            &SnapshotHistory::new(),
            date(2024, 6, 1),
        );
        assert!(violations.is_empty());
    }

    #[test]
    fn test_dofd_before_opened() {
        let mut account = charged_off();
        account.date_of_first_delinquency = Some(date(2020, 1, 1));

        let violations = run_rule(
            &ReportingWindowRule,
            account,
            &SnapshotHistory::new(),
            date(2024, 6, 1),
        );
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].rule_code, RuleCode::DofdBeforeDateOpened);
    }
}
