// ⚖️ Cross-Bureau Reconciliation - The same tradeline must read the same everywhere
//
// For every matched group the same fields are compared across bureaus:
//
//   Field                      | Tolerance        | Severity
//   ---------------------------+------------------+---------
//   BALANCE                    | ± $10            | MEDIUM
//   ACCOUNT_STATUS             | same status class| HIGH
//   DATE_OF_FIRST_DELINQUENCY  | ± 30 days        | HIGH
//   ACCOUNT_TYPE (portfolio)   | exact            | LOW
//   DATE_OPENED                | ± 31 days        | LOW
//
// A disagreement is reported with EVERY participating bureau's value, not
// just the outlier: which bureau is wrong is for the dispute to settle.

use crate::deduplication::MatchedGroup;
use crate::entities::{Account, Bureau, NormalizedReport};
use crate::schema::SchemaValidator;
use crate::violation::{Evidence, Severity};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

// ============================================================================
// FIELDS & TOLERANCES
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DiscrepancyField {
    Balance,
    AccountStatus,
    DateOfFirstDelinquency,
    AccountType,
    DateOpened,
}

impl DiscrepancyField {
    pub fn as_str(&self) -> &'static str {
        match self {
            DiscrepancyField::Balance => "BALANCE",
            DiscrepancyField::AccountStatus => "ACCOUNT_STATUS",
            DiscrepancyField::DateOfFirstDelinquency => "DATE_OF_FIRST_DELINQUENCY",
            DiscrepancyField::AccountType => "ACCOUNT_TYPE",
            DiscrepancyField::DateOpened => "DATE_OPENED",
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            DiscrepancyField::Balance => Severity::Medium,
            DiscrepancyField::AccountStatus => Severity::High,
            DiscrepancyField::DateOfFirstDelinquency => Severity::High,
            DiscrepancyField::AccountType => Severity::Low,
            DiscrepancyField::DateOpened => Severity::Low,
        }
    }
}

impl fmt::Display for DiscrepancyField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscrepancyTolerances {
    /// Dollars
    pub balance: f64,
    pub dofd_days: i64,
    pub date_opened_days: i64,
}

impl Default for DiscrepancyTolerances {
    fn default() -> Self {
        DiscrepancyTolerances {
            balance: 10.0,
            dofd_days: 30,
            date_opened_days: 31,
        }
    }
}

// ============================================================================
// DISCREPANCY
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrossBureauDiscrepancy {
    pub group_id: String,
    pub field: DiscrepancyField,
    pub severity: Severity,

    /// Every participating bureau's value (None = not reported)
    pub values: BTreeMap<Bureau, Option<String>>,

    pub account_ids: BTreeMap<Bureau, String>,
    pub creditor_name: String,
    pub description: String,
    pub evidence: Evidence,
}

impl CrossBureauDiscrepancy {
    pub fn involves(&self, bureau: Bureau) -> bool {
        self.values.contains_key(&bureau)
    }
}

// ============================================================================
// DISCREPANCY RULES
// ============================================================================

pub struct DiscrepancyRules {
    pub tolerances: DiscrepancyTolerances,
    validator: SchemaValidator,
}

impl DiscrepancyRules {
    pub fn new(tolerances: DiscrepancyTolerances, validator: SchemaValidator) -> Self {
        DiscrepancyRules {
            tolerances,
            validator,
        }
    }

    /// Compare every matched group; output ordered by (group id, field)
    pub fn find_discrepancies(
        &self,
        groups: &[MatchedGroup],
        reports: &BTreeMap<Bureau, &NormalizedReport>,
    ) -> Vec<CrossBureauDiscrepancy> {
        let mut found: Vec<CrossBureauDiscrepancy> = groups
            .iter()
            .flat_map(|group| self.check_group(group, reports))
            .collect();
        found.sort_by(|a, b| (&a.group_id, a.field).cmp(&(&b.group_id, b.field)));
        found
    }

    fn check_group(
        &self,
        group: &MatchedGroup,
        reports: &BTreeMap<Bureau, &NormalizedReport>,
    ) -> Vec<CrossBureauDiscrepancy> {
        let accounts: BTreeMap<Bureau, &Account> = group
            .members
            .iter()
            .filter_map(|(bureau, member)| {
                let account = reports.get(bureau)?.accounts.get(member.index)?;
                Some((*bureau, account))
            })
            .collect();
        if accounts.len() < 2 {
            return Vec::new();
        }

        let mut found = Vec::new();
        let mut push = |field: DiscrepancyField, values, tolerance: Option<String>, spread| {
            found.push(self.discrepancy(group, field, values, tolerance, spread));
        };

        // BALANCE
        let balances: BTreeMap<Bureau, f64> =
            accounts.iter().map(|(b, a)| (*b, a.current_balance)).collect();
        if let Some(spread) = spread_f64(balances.values().copied()) {
            if spread > self.tolerances.balance {
                push(
                    DiscrepancyField::Balance,
                    balances.iter().map(|(b, v)| (*b, Some(format!("{:.2}", v)))).collect(),
                    Some(format!("{:.2}", self.tolerances.balance)),
                    Some(format!("{:.2}", spread)),
                );
            }
        }

        // ACCOUNT_STATUS
        let statuses: BTreeMap<Bureau, (Option<String>, Option<_>)> = accounts
            .iter()
            .map(|(b, a)| {
                let status = self.validator.validate_account(a).status();
                let shown = status
                    .map(|s| s.code().to_string())
                    .or_else(|| non_empty(&a.account_status));
                (*b, (shown, status.map(|s| s.class())))
            })
            .collect();
        let classes: BTreeSet<_> = statuses.values().filter_map(|(_, c)| *c).collect();
        if classes.len() > 1 {
            push(
                DiscrepancyField::AccountStatus,
                statuses.iter().map(|(b, (shown, _))| (*b, shown.clone())).collect(),
                None,
                None,
            );
        }

        // DATE_OF_FIRST_DELINQUENCY
        let dofds: BTreeMap<Bureau, Option<NaiveDate>> = accounts
            .iter()
            .map(|(b, a)| (*b, a.date_of_first_delinquency))
            .collect();
        let present = dofds.values().filter(|d| d.is_some()).count();
        if present > 0 {
            let spread = spread_days(dofds.values().flatten().copied());
            let presence_mismatch = present < dofds.len();
            if presence_mismatch || spread.map_or(false, |s| s > self.tolerances.dofd_days) {
                push(
                    DiscrepancyField::DateOfFirstDelinquency,
                    date_values(&dofds),
                    Some(format!("{} days", self.tolerances.dofd_days)),
                    spread.map(|s| format!("{} days", s)),
                );
            }
        }

        // ACCOUNT_TYPE
        let portfolio: BTreeMap<Bureau, Option<String>> = accounts
            .iter()
            .map(|(b, a)| {
                let resolved = self.validator.validate_account(a);
                let shown = resolved
                    .portfolio_type_code()
                    .map(str::to_string)
                    .or_else(|| non_empty(&a.portfolio_type));
                (*b, shown)
            })
            .collect();
        let distinct: BTreeSet<&String> = portfolio.values().flatten().collect();
        if distinct.len() > 1 {
            push(DiscrepancyField::AccountType, portfolio.clone(), None, None);
        }

        // DATE_OPENED
        let opened: BTreeMap<Bureau, Option<NaiveDate>> =
            accounts.iter().map(|(b, a)| (*b, a.date_opened)).collect();
        if let Some(spread) = spread_days(opened.values().flatten().copied()) {
            if spread > self.tolerances.date_opened_days {
                push(
                    DiscrepancyField::DateOpened,
                    date_values(&opened),
                    Some(format!("{} days", self.tolerances.date_opened_days)),
                    Some(format!("{} days", spread)),
                );
            }
        }

        found
    }

    fn discrepancy(
        &self,
        group: &MatchedGroup,
        field: DiscrepancyField,
        values: BTreeMap<Bureau, Option<String>>,
        tolerance: Option<String>,
        spread: Option<String>,
    ) -> CrossBureauDiscrepancy {
        let creditor_name = group
            .members
            .values()
            .next()
            .map(|m| m.creditor_name.clone())
            .unwrap_or_default();

        let listing = values
            .iter()
            .map(|(b, v)| format!("{}={}", b, v.as_deref().unwrap_or("not reported")))
            .collect::<Vec<_>>()
            .join(", ");

        CrossBureauDiscrepancy {
            group_id: group.group_id.clone(),
            field,
            severity: field.severity(),
            account_ids: group
                .members
                .iter()
                .map(|(b, m)| (*b, m.account_id.clone()))
                .collect(),
            description: format!("{} differs across bureaus for {}: {}", field, creditor_name, listing),
            creditor_name,
            values,
            evidence: Evidence::CrossBureau {
                field: field.as_str().to_string(),
                tolerance,
                spread,
            },
        }
    }
}

fn non_empty(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

fn date_values(dates: &BTreeMap<Bureau, Option<NaiveDate>>) -> BTreeMap<Bureau, Option<String>> {
    dates.iter().map(|(b, d)| (*b, d.map(|d| d.to_string()))).collect()
}

/// max - min, None when fewer than two values
fn spread_f64(values: impl Iterator<Item = f64>) -> Option<f64> {
    let values: Vec<f64> = values.collect();
    if values.len() < 2 {
        return None;
    }
    let max = values.iter().copied().fold(f64::MIN, f64::max);
    let min = values.iter().copied().fold(f64::MAX, f64::min);
    Some(max - min)
}

fn spread_days(values: impl Iterator<Item = NaiveDate>) -> Option<i64> {
    let values: Vec<NaiveDate> = values.collect();
    if values.len() < 2 {
        return None;
    }
    let max = values.iter().max()?;
    let min = values.iter().min()?;
    Some((*max - *min).num_days())
}

// ============================================================================
// TESTS
// ============================================================================
