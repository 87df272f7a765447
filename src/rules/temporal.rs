// Account date ordering against each other and the report date

use super::{AccountRule, AuditedAccount, ReportContext};
use crate::violation::{Evidence, RuleCode, Severity, Violation};
use chrono::NaiveDate;

pub struct DateConsistencyRule;

impl AccountRule for DateConsistencyRule {
    fn id(&self) -> &'static str {
        "temporal.date_consistency"
    }

    fn evaluate(&self, account: &AuditedAccount<'_>, ctx: &ReportContext<'_>) -> Vec<Violation> {
        let a = account.account;
        let mut violations = Vec::new();

        if let (Some(opened), Some(closed)) = (a.date_opened, a.date_closed) {
            if closed < opened {
                violations.push(account.violation(
                    ctx,
                    RuleCode::DateClosedBeforeOpened,
                    Severity::High,
                    format!("Account closed on {} before it was opened on {}", closed, opened),
                    evidence("date_closed", closed, "date_opened", opened),
                ));
            }
        }

        if let Some(opened) = a.date_opened {
            if opened > ctx.report_date {
                violations.push(account.violation(
                    ctx,
                    RuleCode::DateOpenedAfterReport,
                    Severity::Medium,
                    format!(
                        "Account opened on {}, after the report date {}",
                        opened, ctx.report_date
                    ),
                    evidence("date_opened", opened, "report_date", ctx.report_date),
                ));
            }
        }

        if let Some(reported) = a.date_reported {
            if reported > ctx.report_date {
                violations.push(account.violation(
                    ctx,
                    RuleCode::DateReportedAfterReport,
                    Severity::Low,
                    format!(
                        "Furnisher reporting date {} is after the report date {}",
                        reported, ctx.report_date
                    ),
                    evidence("date_reported", reported, "report_date", ctx.report_date),
                ));
            }
        }

        violations
    }
}

fn evidence(field: &str, reported: NaiveDate, reference_field: &str, reference: NaiveDate) -> Evidence {
    Evidence::Temporal {
        field: field.to_string(),
        reported: Some(reported),
        reference_field: reference_field.to_string(),
        reference: Some(reference),
        delta_days: Some((reported - reference).num_days()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AuditConfig;
    use crate::rules::fixtures::*;
    use crate::temporal::SnapshotHistory;

    #[test]
    fn test_date_ordering() {
        let mut account = clean_account("CHASE BANK", "XXXX1234");
        account.date_closed = Some(date(2020, 1, 1));
        account.date_reported = Some(date(2024, 6, 20));
        let report = report_with(vec![account]);

        let config = AuditConfig::default();
        let validator = config.schema_validator();
        let history = SnapshotHistory::new();
        let ctx = ReportContext::build(&report, date(2024, 6, 1), &config, &validator, &history);
        let violations = DateConsistencyRule.evaluate(&ctx.accounts[0], &ctx);

        let codes: Vec<RuleCode> = violations.iter().map(|v| v.rule_code).collect();
        assert_eq!(
            codes,
            vec![RuleCode::DateClosedBeforeOpened, RuleCode::DateReportedAfterReport]
        );
        match &violations[1].evidence {
            Evidence::Temporal { delta_days, .. } => assert_eq!(*delta_days, Some(19)),
            other => panic!("unexpected evidence {:?}", other),
        }
    }
}
