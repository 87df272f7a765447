// Inquiry rules

use super::{ReportContext, ReportRule};
use crate::entities::{normalize_name, Inquiry, InquiryKind};
use crate::violation::{Evidence, RuleCode, Severity, Violation};
use chrono::{Months, NaiveDate};
use std::collections::BTreeSet;

/// Future-dated, expired and duplicated inquiries
///
/// Duplicates are hard inquiries from the same creditor on the same day;
/// the first one stands and each repeat is flagged.
pub struct InquiryRule;

impl ReportRule for InquiryRule {
    fn id(&self) -> &'static str {
        "inquiry.retention"
    }

    fn evaluate(&self, ctx: &ReportContext<'_>) -> Vec<Violation> {
        let retention = ctx.config.inquiry_retention_months;
        let cutoff = ctx.report_date.checked_sub_months(Months::new(retention));

        let mut violations = Vec::new();
        let mut seen: BTreeSet<(String, NaiveDate)> = BTreeSet::new();

        for inquiry in &ctx.report.inquiries {
            let Some(date) = inquiry.date else {
                continue;
            };

            if date > ctx.report_date {
                violations.push(ctx.violation(
                    RuleCode::InquiryDateAfterReport,
                    Severity::Medium,
                    format!(
                        "Inquiry by {} dated {}, after the report date {}",
                        inquiry.creditor_name, date, ctx.report_date
                    ),
                    evidence(inquiry, None, None),
                ));
            }

            if let Some(cutoff) = cutoff {
                if date < cutoff {
                    violations.push(
                        ctx.violation(
                            RuleCode::InquiryObsolete,
                            Severity::Low,
                            format!(
                                "Inquiry by {} on {} is older than {} months",
                                inquiry.creditor_name, date, retention
                            ),
                            evidence(inquiry, Some(retention), None),
                        )
                        .with_values(format!("on or after {}", cutoff), date.to_string()),
                    );
                }
            }

            if inquiry.kind == InquiryKind::Hard
                && !seen.insert((normalize_name(&inquiry.creditor_name), date))
            {
                violations.push(ctx.violation(
                    RuleCode::DuplicateInquiry,
                    Severity::Low,
                    format!(
                        "Inquiry by {} on {} appears more than once",
                        inquiry.creditor_name, date
                    ),
                    evidence(inquiry, None, Some(inquiry.creditor_name.clone())),
                ));
            }
        }

        violations
    }
}

fn evidence(inquiry: &Inquiry, retention_months: Option<u32>, counterpart: Option<String>) -> Evidence {
    Evidence::Record {
        record_type: match inquiry.kind {
            InquiryKind::Hard => "HARD_INQUIRY".to_string(),
            InquiryKind::Soft => "SOFT_INQUIRY".to_string(),
        },
        date: inquiry.date,
        // the window is in months; whole years only when it divides evenly
        window_years: retention_months.filter(|m| m % 12 == 0).map(|m| m / 12),
        counterpart,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AuditConfig;
    use crate::rules::fixtures::*;
    use crate::temporal::SnapshotHistory;

    fn inquiry(name: &str, date: NaiveDate, kind: InquiryKind) -> Inquiry {
        Inquiry {
            creditor_name: name.to_string(),
            date: Some(date),
            kind,
        }
    }

    fn run(inquiries: Vec<Inquiry>) -> Vec<Violation> {
        let mut report = report_with(vec![clean_account("CHASE BANK", "XXXX1234")]);
        report.inquiries = inquiries;
        let config = AuditConfig::default();
        let validator = config.schema_validator();
        let history = SnapshotHistory::new();
        let ctx = ReportContext::build(&report, date(2024, 6, 1), &config, &validator, &history);
        InquiryRule.evaluate(&ctx)
    }

    #[test]
    fn test_duplicate_hard_inquiry_flagged_once() {
        let violations = run(vec![
            inquiry("DISCOVER", date(2024, 2, 3), InquiryKind::Hard),
            inquiry("Discover Inc.", date(2024, 2, 3), InquiryKind::Hard),
            inquiry("DISCOVER", date(2024, 2, 4), InquiryKind::Hard),
        ]);
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].rule_code, RuleCode::DuplicateInquiry);
    }

    #[test]
    fn test_soft_inquiries_never_duplicate() {
        let violations = run(vec![
            inquiry("DISCOVER", date(2024, 2, 3), InquiryKind::Soft),
            inquiry("DISCOVER", date(2024, 2, 3), InquiryKind::Soft),
        ]);
        assert!(violations.is_empty());
    }

    #[test]
    fn test_retention_and_future_dates() {
        let violations = run(vec![
            inquiry("AMEX", date(2022, 5, 31), InquiryKind::Hard),
            inquiry("AMEX", date(2022, 6, 1), InquiryKind::Hard),
            inquiry("CITI", date(2024, 7, 1), InquiryKind::Hard),
        ]);
        let codes: Vec<RuleCode> = violations.iter().map(|v| v.rule_code).collect();
        assert_eq!(
            codes,
            vec![RuleCode::InquiryObsolete, RuleCode::InquiryDateAfterReport]
        );
    }
}
