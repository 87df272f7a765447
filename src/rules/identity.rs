// Consumer identity rules

use super::{AccountRule, AuditedAccount, ReportContext, ReportRule};
use crate::violation::{Evidence, RuleCode, Severity, Violation};

/// Identifying fields every file must carry
pub struct ConsumerIdentityRule;

impl ReportRule for ConsumerIdentityRule {
    fn id(&self) -> &'static str {
        "identity.consumer"
    }

    fn evaluate(&self, ctx: &ReportContext<'_>) -> Vec<Violation> {
        let consumer = &ctx.report.consumer;
        let mut violations = Vec::new();

        let mut missing = |code: RuleCode, severity: Severity, field: &str, label: &str| {
            violations.push(ctx.violation(
                code,
                severity,
                format!("Consumer {} is missing from the file", label),
                Evidence::Identity {
                    field: field.to_string(),
                    detail: None,
                },
            ));
        };

        if consumer.name.trim().is_empty() {
            missing(RuleCode::ConsumerNameMissing, Severity::High, "name", "name");
        }

        let ssn_present = consumer
            .ssn_last4
            .as_deref()
            .map_or(false, |s| !s.trim().is_empty());
        if !ssn_present {
            missing(RuleCode::SsnMissing, Severity::Medium, "ssn_last4", "SSN");
        }

        if consumer.date_of_birth.is_none() {
            missing(
                RuleCode::DateOfBirthMissing,
                Severity::Low,
                "date_of_birth",
                "date of birth",
            );
        }

        if consumer.addresses.iter().all(|a| a.trim().is_empty()) {
            missing(RuleCode::AddressMissing, Severity::Low, "addresses", "address");
        }

        violations
    }
}

/// An account opened before the consumer was born belongs to someone else
pub struct AccountBeforeBirthRule;

impl AccountRule for AccountBeforeBirthRule {
    fn id(&self) -> &'static str {
        "identity.opened_before_birth"
    }

    fn evaluate(&self, account: &AuditedAccount<'_>, ctx: &ReportContext<'_>) -> Vec<Violation> {
        let (Some(birth), Some(opened)) =
            (ctx.report.consumer.date_of_birth, account.account.date_opened)
        else {
            return Vec::new();
        };
        if opened >= birth {
            return Vec::new();
        }

        vec![account.violation(
            ctx,
            RuleCode::AccountOpenedBeforeBirth,
            Severity::High,
            format!(
                "Account opened on {}, before the consumer's date of birth {}; possible mixed file",
                opened, birth
            ),
            Evidence::Temporal {
                field: "date_opened".to_string(),
                reported: Some(opened),
                reference_field: "date_of_birth".to_string(),
                reference: Some(birth),
                delta_days: Some((opened - birth).num_days()),
            },
        )]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AuditConfig;
    use crate::rules::fixtures::*;
    use crate::temporal::SnapshotHistory;

    #[test]
    fn test_missing_identity_fields() {
        let mut report = report_with(vec![clean_account("CHASE BANK", "XXXX1234")]);
        report.consumer.name = "  ".to_string();
        report.consumer.ssn_last4 = None;
        report.consumer.addresses.clear();

        let config = AuditConfig::default();
        let validator = config.schema_validator();
        let history = SnapshotHistory::new();
        let ctx = ReportContext::build(&report, date(2024, 6, 1), &config, &validator, &history);

        let violations = ConsumerIdentityRule.evaluate(&ctx);
        let codes: Vec<RuleCode> = violations.iter().map(|v| v.rule_code).collect();
        assert_eq!(
            codes,
            vec![
                RuleCode::ConsumerNameMissing,
                RuleCode::SsnMissing,
                RuleCode::AddressMissing
            ]
        );
        assert!(violations.iter().all(|v| v.account_id.is_none()));
    }

    #[test]
    fn test_account_before_birth() {
        let mut account = clean_account("SEARS", "XXXX0001");
        account.date_opened = Some(date(1979, 4, 1));
        let report = report_with(vec![account]);

        let config = AuditConfig::default();
        let validator = config.schema_validator();
        let history = SnapshotHistory::new();
        let ctx = ReportContext::build(&report, date(2024, 6, 1), &config, &validator, &history);

        let violations = AccountBeforeBirthRule.evaluate(&ctx.accounts[0], &ctx);
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].severity, Severity::High);
    }
}
