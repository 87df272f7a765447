// Balance rules

use super::{AccountRule, AuditedAccount, ReportContext};
use crate::attributes::AccountStatus;
use crate::entities::BALANCE_EPSILON;
use crate::violation::{Evidence, RuleCode, Severity, Violation};

fn balance_evidence(
    account: &AuditedAccount<'_>,
    reference_field: &str,
    reference_amount: Option<f64>,
) -> Evidence {
    Evidence::Balance {
        current_balance: account.account.current_balance,
        reference_field: reference_field.to_string(),
        reference_amount,
    }
}

/// A paid status cannot carry a balance
pub struct PaidStatusBalanceRule;

impl AccountRule for PaidStatusBalanceRule {
    fn id(&self) -> &'static str {
        "balance.paid_status"
    }

    fn evaluate(&self, account: &AuditedAccount<'_>, ctx: &ReportContext<'_>) -> Vec<Violation> {
        let Some(status) = account.fields.status() else {
            return Vec::new();
        };
        if !status.is_paid() || !account.account.has_balance() {
            return Vec::new();
        }

        vec![account
            .violation(
                ctx,
                RuleCode::PaidStatusWithBalance,
                Severity::High,
                format!(
                    "Status {} reports the account paid but the balance is {:.2}",
                    status, account.account.current_balance
                ),
                balance_evidence(account, "account_status", Some(0.0)),
            )
            .with_values("0.00", format!("{:.2}", account.account.current_balance))]
    }
}

/// A transferred or sold account belongs to the new owner's balance
pub struct TransferredBalanceRule;

impl AccountRule for TransferredBalanceRule {
    fn id(&self) -> &'static str {
        "balance.transferred"
    }

    fn evaluate(&self, account: &AuditedAccount<'_>, ctx: &ReportContext<'_>) -> Vec<Violation> {
        if account.fields.status() != Some(AccountStatus::Transferred)
            || !account.account.has_balance()
        {
            return Vec::new();
        }

        vec![account
            .violation(
                ctx,
                RuleCode::TransferredWithBalance,
                Severity::High,
                format!(
                    "Account reported as transferred still carries a balance of {:.2}",
                    account.account.current_balance
                ),
                balance_evidence(account, "account_status", Some(0.0)),
            )
            .with_values("0.00", format!("{:.2}", account.account.current_balance))]
    }
}

pub struct NegativeBalanceRule;

impl AccountRule for NegativeBalanceRule {
    fn id(&self) -> &'static str {
        "balance.negative"
    }

    fn evaluate(&self, account: &AuditedAccount<'_>, ctx: &ReportContext<'_>) -> Vec<Violation> {
        let balance = account.account.current_balance;
        if balance >= -BALANCE_EPSILON {
            return Vec::new();
        }

        vec![account.violation(
            ctx,
            RuleCode::NegativeBalance,
            Severity::Medium,
            format!("Balance is negative ({:.2})", balance),
            balance_evidence(account, "current_balance", None),
        )]
    }
}

/// Balance above the amount it can legitimately reach
///
/// Collectors and debt buyers may not report more than the original amount
/// owed. Closed revolving accounts may not exceed their last credit limit.
pub struct BalanceCeilingRule;

impl AccountRule for BalanceCeilingRule {
    fn id(&self) -> &'static str {
        "balance.ceiling"
    }

    fn evaluate(&self, account: &AuditedAccount<'_>, ctx: &ReportContext<'_>) -> Vec<Violation> {
        let a = account.account;
        let mut violations = Vec::new();

        if account.role.role.is_downstream() {
            if let Some(original) = a.high_credit.filter(|v| *v > BALANCE_EPSILON) {
                if a.current_balance > original + BALANCE_EPSILON {
                    violations.push(
                        account
                            .violation(
                                ctx,
                                RuleCode::CollectionBalanceExceedsOriginal,
                                Severity::Medium,
                                format!(
                                    "Collection balance {:.2} exceeds the original amount {:.2}",
                                    a.current_balance, original
                                ),
                                balance_evidence(account, "high_credit", Some(original)),
                            )
                            .with_values(
                                format!("<= {:.2}", original),
                                format!("{:.2}", a.current_balance),
                            ),
                    );
                }
            }
        }

        let revolving = account.fields.portfolio_type_code() == Some("R");
        if a.is_closed() && revolving {
            if let Some(limit) = a.credit_limit.filter(|v| *v > BALANCE_EPSILON) {
                if a.current_balance > limit + BALANCE_EPSILON {
                    violations.push(account.violation(
                        ctx,
                        RuleCode::BalanceExceedsCreditLimit,
                        Severity::Low,
                        format!(
                            "Closed revolving account balance {:.2} exceeds its credit limit {:.2}",
                            a.current_balance, limit
                        ),
                        balance_evidence(account, "credit_limit", Some(limit)),
                    ));
                }
            }
        }

        violations
    }
}
