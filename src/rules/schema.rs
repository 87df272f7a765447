// Coded-field rule: turns failed FieldValidations into violations

use super::{AccountRule, AuditedAccount, ReportContext};
use crate::schema::{FieldValidation, SchemaErrorCode, ValidationLevel};
use crate::violation::{Evidence, RuleCode, Severity, Violation};

/// Invalid, unrecognized and obsolete codes on the scalar fields
///
/// Payment-history symbols are reported by the guardrail with their position,
/// not here.
pub struct FieldCodeRule;

impl AccountRule for FieldCodeRule {
    fn id(&self) -> &'static str {
        "schema.field_codes"
    }

    fn evaluate(&self, account: &AuditedAccount<'_>, ctx: &ReportContext<'_>) -> Vec<Violation> {
        account
            .fields
            .scalar_fields()
            .into_iter()
            .filter_map(|validation| field_violation(validation, account, ctx))
            .collect()
    }
}

fn field_violation(
    validation: &FieldValidation,
    account: &AuditedAccount<'_>,
    ctx: &ReportContext<'_>,
) -> Option<Violation> {
    let error_code = validation.error_code?;

    let (rule_code, severity) = if validation.is_obsolete() {
        (RuleCode::ObsoleteFieldCode, Severity::Medium)
    } else {
        match validation.level {
            ValidationLevel::Error => (RuleCode::InvalidFieldCode, Severity::Medium),
            ValidationLevel::Warning => (RuleCode::UnrecognizedFieldCode, Severity::Low),
            ValidationLevel::Ok => return None,
        }
    };

    let description = match error_code {
        SchemaErrorCode::EmptyValue => format!("{} is empty", validation.field),
        SchemaErrorCode::UnknownCode => format!(
            "{} value '{}' is not a recognized code",
            validation.field, validation.raw_value
        ),
        SchemaErrorCode::ObsoleteCode => format!(
            "{} value '{}' is a retired code",
            validation.field, validation.raw_value
        ),
    };

    let evidence = Evidence::Schema {
        field: validation.field,
        raw_value: validation.raw_value.clone(),
        corrected_value: validation.corrected_value.clone(),
        error_code,
        mode: validation.mode,
    };

    let violation = account.violation(ctx, rule_code, severity, description, evidence);
    Some(match &validation.corrected_value {
        Some(corrected) => violation.with_values(corrected.clone(), validation.raw_value.clone()),
        None => violation,
    })
}
