// Public record rules

use super::{ReportContext, ReportRule};
use crate::entities::{PublicRecord, PublicRecordKind};
use crate::temporal::reporting_expiry;
use crate::violation::{Evidence, RuleCode, Severity, Violation};

/// Reportable record types, filing dates and the reporting window
///
/// Civil judgments and tax liens are no longer carried by the bureaus at all.
/// Bankruptcies run for the bankruptcy window from filing, every other
/// record for the general public-record window.
pub struct PublicRecordRule;

impl ReportRule for PublicRecordRule {
    fn id(&self) -> &'static str {
        "public_record.reportability"
    }

    fn evaluate(&self, ctx: &ReportContext<'_>) -> Vec<Violation> {
        ctx.report
            .public_records
            .iter()
            .flat_map(|record| check_record(record, ctx))
            .collect()
    }
}

fn check_record(record: &PublicRecord, ctx: &ReportContext<'_>) -> Vec<Violation> {
    let mut violations = Vec::new();
    let label = record_label(record);
    let window = if record.kind.is_bankruptcy() {
        ctx.config.bankruptcy_window_years
    } else {
        ctx.config.public_record_window_years
    };

    let evidence = |window_years: Option<u32>| Evidence::Record {
        record_type: record.kind.as_str().to_string(),
        date: record.filing_date,
        window_years,
        counterpart: record.reference_number.clone(),
    };

    if matches!(
        record.kind,
        PublicRecordKind::CivilJudgment | PublicRecordKind::TaxLien
    ) {
        violations.push(ctx.violation(
            RuleCode::PublicRecordNotReportable,
            Severity::High,
            format!("{} may not appear on a consumer report", label),
            evidence(None),
        ));
    }

    let Some(filed) = record.filing_date else {
        violations.push(ctx.violation(
            RuleCode::PublicRecordMissingFilingDate,
            Severity::Medium,
            format!("{} has no filing date", label),
            evidence(None),
        ));
        return violations;
    };

    if let Some(expires) = reporting_expiry(filed, window) {
        if ctx.report_date > expires {
            violations.push(
                ctx.violation(
                    RuleCode::PublicRecordObsolete,
                    Severity::High,
                    format!(
                        "{} filed {} passed its {}-year reporting window on {}",
                        label, filed, window, expires
                    ),
                    evidence(Some(window)),
                )
                .with_values(format!("removed by {}", expires), "still reported"),
            );
        }
    }

    violations
}

fn record_label(record: &PublicRecord) -> String {
    match record.reference_number.as_deref().map(str::trim) {
        Some(reference) if !reference.is_empty() => {
            format!("{} {}", record.kind.as_str(), reference)
        }
        _ => record.kind.as_str().to_string(),
    }
}
