// ⏰ Delinquency Lifecycle - The protected date of first delinquency
//
// "Identity persists. Values change." The tradeline (fingerprint) is the
// identity; every report snapshot is one value of it. The DOFD is the one value
// that must NOT change once a derogatory status has locked it.
//
// States:
//   CURRENT ──late──▶ DELINQUENT ──dofd──▶ DOFD_SET ──▶ CHARGEOFF / COLLECTION
//                                                        │
//                                                        ▼
//                                                  PAID_DEROGATORY
//
// Nothing is terminal: the derogatory states absorb the locked DOFD but the
// account can still close. Going straight from a derogatory state back to
// CURRENT without a cure event is re-aging.

use crate::attributes::AccountStatus;
use crate::violation::{RuleCode, Severity};
use chrono::{Months, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

// ============================================================================
// STATES & EVENTS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DelinquencyState {
    Current,
    Delinquent,
    DofdSet,
    ChargeOff,
    Collection,
    PaidDerogatory,
}

impl DelinquencyState {
    pub fn as_str(&self) -> &'static str {
        match self {
            DelinquencyState::Current => "CURRENT",
            DelinquencyState::Delinquent => "DELINQUENT",
            DelinquencyState::DofdSet => "DOFD_SET",
            DelinquencyState::ChargeOff => "CHARGEOFF",
            DelinquencyState::Collection => "COLLECTION",
            DelinquencyState::PaidDerogatory => "PAID_DEROGATORY",
        }
    }

    /// States from which a plain return to CURRENT is re-aging
    pub fn is_derogatory(&self) -> bool {
        matches!(
            self,
            DelinquencyState::ChargeOff
                | DelinquencyState::Collection
                | DelinquencyState::PaidDerogatory
        )
    }

    /// State reached when `status` is reported with `dofd`
    ///
    /// Statuses that say nothing about delinquency (transfer, delete) keep
    /// the current state.
    pub fn next(self, status: AccountStatus, dofd: Option<NaiveDate>) -> DelinquencyState {
        if status.requires_zero_filled_dofd() {
            DelinquencyState::Current
        } else if status.is_late() {
            if dofd.is_some() {
                DelinquencyState::DofdSet
            } else {
                DelinquencyState::Delinquent
            }
        } else if status == AccountStatus::Collection {
            DelinquencyState::Collection
        } else if status.is_major_derogatory() {
            DelinquencyState::ChargeOff
        } else if status.is_paid_derogatory() {
            DelinquencyState::PaidDerogatory
        } else {
            self
        }
    }
}

impl fmt::Display for DelinquencyState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SnapshotEvent {
    #[default]
    Reported,

    /// The consumer brought the account current (explicit cure)
    Cure,

    /// The account closed on or before this snapshot. Closing is not a cure.
    Closed,
}

// ============================================================================
// SNAPSHOTS
// ============================================================================

/// One observation of a tradeline's delinquency fields
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelinquencySnapshot {
    pub as_of: NaiveDate,
    pub status: AccountStatus,

    /// None = empty / zero-filled
    #[serde(default)]
    pub dofd: Option<NaiveDate>,

    #[serde(default)]
    pub event: SnapshotEvent,
}

impl DelinquencySnapshot {
    pub fn new(as_of: NaiveDate, status: AccountStatus, dofd: Option<NaiveDate>) -> Self {
        DelinquencySnapshot {
            as_of,
            status,
            dofd,
            event: SnapshotEvent::Reported,
        }
    }

    pub fn with_event(self, event: SnapshotEvent) -> Self {
        DelinquencySnapshot { event, ..self }
    }
}

/// Prior snapshots supplied by the caller, keyed by account fingerprint
/// (or by the 16-char account id)
pub type SnapshotHistory = BTreeMap<String, Vec<DelinquencySnapshot>>;

/// Look up prior snapshots for an account by full fingerprint, then by short id
pub fn prior_snapshots<'a>(
    history: &'a SnapshotHistory,
    fingerprint: &str,
    account_id: &str,
) -> &'a [DelinquencySnapshot] {
    history
        .get(fingerprint)
        .or_else(|| history.get(account_id))
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

/// Infer the event of the current snapshot
///
/// A cure wins: the newest history month (newest first) is current ("0" /
/// "E") and the month before it was a numeric delinquency bucket. Otherwise a
/// close date on or before `as_of` makes it a closing snapshot.
pub fn infer_event(
    history: &[String],
    date_closed: Option<NaiveDate>,
    as_of: NaiveDate,
) -> SnapshotEvent {
    let newest = history.first().map(|s| s.trim());
    let previous = history.get(1).and_then(|s| s.trim().parse::<u8>().ok());

    match (newest, previous) {
        (Some("0") | Some("E"), Some(bucket)) if (1..=6).contains(&bucket) => SnapshotEvent::Cure,
        _ if date_closed.map_or(false, |closed| closed <= as_of) => SnapshotEvent::Closed,
        _ => SnapshotEvent::Reported,
    }
}

// ============================================================================
// LIFECYCLE STATE
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LifecycleState {
    pub state: DelinquencyState,

    /// DOFD frozen by the first locking status
    pub locked_dofd: Option<NaiveDate>,
    pub lock_date: Option<NaiveDate>,
    pub locking_status: Option<AccountStatus>,

    /// First non-empty DOFD ever observed (debt-buyer invariant)
    pub first_observed_dofd: Option<NaiveDate>,
}

impl Default for LifecycleState {
    fn default() -> Self {
        LifecycleState {
            state: DelinquencyState::Current,
            locked_dofd: None,
            lock_date: None,
            locking_status: None,
            first_observed_dofd: None,
        }
    }
}

impl LifecycleState {
    pub fn is_locked(&self) -> bool {
        self.locked_dofd.is_some()
    }
}

/// Something wrong with one transition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LifecycleFinding {
    pub rule_code: RuleCode,
    pub severity: Severity,
    pub as_of: NaiveDate,
    pub from_state: DelinquencyState,
    pub to_state: DelinquencyState,
    pub status: AccountStatus,
    pub locked_dofd: Option<NaiveDate>,
    pub reported_dofd: Option<NaiveDate>,
    pub description: String,
}

// ============================================================================
// STATE MACHINE
// ============================================================================

/// Per-account tracker, fed snapshots in chronological order
#[derive(Debug, Clone)]
pub struct DelinquencyStateMachine {
    state: LifecycleState,
    debt_buyer: bool,
    findings: Vec<LifecycleFinding>,
}

impl DelinquencyStateMachine {
    pub fn new(debt_buyer: bool) -> Self {
        DelinquencyStateMachine {
            state: LifecycleState::default(),
            debt_buyer,
            findings: Vec::new(),
        }
    }

    pub fn state(&self) -> &LifecycleState {
        &self.state
    }

    pub fn findings(&self) -> &[LifecycleFinding] {
        &self.findings
    }

    /// Apply one snapshot: check it against the current state, then transition
    pub fn apply(&mut self, snapshot: &DelinquencySnapshot) {
        let from = self.state.state;
        let to = from.next(snapshot.status, snapshot.dofd);
        let status = snapshot.status;
        let reported = snapshot.dofd;

        if status.requires_dofd() && reported.is_none() {
            self.record(
                snapshot,
                to,
                RuleCode::DofdMissing,
                Severity::High,
                format!(
                    "Status {} as of {} requires a date of first delinquency, but none was reported",
                    status, snapshot.as_of
                ),
            );
        }

        if status.requires_zero_filled_dofd() {
            if let Some(dofd) = reported {
                self.record(
                    snapshot,
                    to,
                    RuleCode::DofdNotZeroFilled,
                    Severity::Medium,
                    format!(
                        "Status {} as of {} must report an empty date of first delinquency, found {}",
                        status, snapshot.as_of, dofd
                    ),
                );
            }
        }

        let mut modified_after_lock = false;
        if let (Some(locked), Some(dofd)) = (self.state.locked_dofd, reported) {
            if locked != dofd {
                modified_after_lock = true;
                self.record(
                    snapshot,
                    to,
                    RuleCode::DofdModifiedAfterLock,
                    Severity::Critical,
                    format!(
                        "Date of first delinquency changed from locked {} to {} as of {}",
                        locked, dofd, snapshot.as_of
                    ),
                );
            }
        }

        if self.debt_buyer && !modified_after_lock {
            if let (Some(first), Some(dofd)) = (self.state.first_observed_dofd, reported) {
                if first != dofd {
                    self.record(
                        snapshot,
                        to,
                        RuleCode::DebtBuyerDofdChanged,
                        Severity::Critical,
                        format!(
                            "Debt buyer reported date of first delinquency {} as of {}, originally observed as {}",
                            dofd, snapshot.as_of, first
                        ),
                    );
                }
            }
        }

        if from.is_derogatory()
            && to == DelinquencyState::Current
            && snapshot.event != SnapshotEvent::Cure
        {
            self.record(
                snapshot,
                to,
                RuleCode::StatusRegressionReaging,
                Severity::Critical,
                format!(
                    "Status moved from {} straight back to {} as of {} without a cure",
                    from, to, snapshot.as_of
                ),
            );
        }

        self.transition(snapshot, to);
    }

    fn transition(&mut self, snapshot: &DelinquencySnapshot, to: DelinquencyState) {
        if self.state.first_observed_dofd.is_none() {
            self.state.first_observed_dofd = snapshot.dofd;
        }

        if !self.state.is_locked() && snapshot.status.locks_dofd() {
            if let Some(dofd) = snapshot.dofd {
                self.state.locked_dofd = Some(dofd);
                self.state.lock_date = Some(snapshot.as_of);
                self.state.locking_status = Some(snapshot.status);
            }
        }

        self.state.state = to;
    }

    fn record(
        &mut self,
        snapshot: &DelinquencySnapshot,
        to: DelinquencyState,
        rule_code: RuleCode,
        severity: Severity,
        description: String,
    ) {
        self.findings.push(LifecycleFinding {
            rule_code,
            severity,
            as_of: snapshot.as_of,
            from_state: self.state.state,
            to_state: to,
            status: snapshot.status,
            locked_dofd: self.state.locked_dofd,
            reported_dofd: snapshot.dofd,
            description,
        });
    }

    pub fn finish(self) -> (LifecycleState, Vec<LifecycleFinding>) {
        (self.state, self.findings)
    }
}

/// Replay a snapshot sequence from a fresh state
///
/// Snapshots are stably sorted by date first; equal dates keep caller order.
pub fn replay(
    snapshots: &[DelinquencySnapshot],
    debt_buyer: bool,
) -> (LifecycleState, Vec<LifecycleFinding>) {
    let mut ordered: Vec<&DelinquencySnapshot> = snapshots.iter().collect();
    ordered.sort_by_key(|s| s.as_of);

    let mut machine = DelinquencyStateMachine::new(debt_buyer);
    for snapshot in ordered {
        machine.apply(snapshot);
    }
    machine.finish()
}

// ============================================================================
// TIMELINE CHECK
// ============================================================================

/// DOFD problems visible from a single snapshot's dates alone
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimelineIssue {
    /// DOFD precedes the date the account was opened
    DofdBeforeOpened { dofd: NaiveDate, date_opened: NaiveDate },

    /// The reporting window has run out
    ObsoleteReporting {
        dofd: NaiveDate,
        expires: NaiveDate,
        report_date: NaiveDate,
    },
}

/// Last date an item with this DOFD may be reported
pub fn reporting_expiry(dofd: NaiveDate, window_years: u32) -> Option<NaiveDate> {
    dofd.checked_add_months(Months::new(window_years.saturating_mul(12)))
}

pub fn check_timeline(
    dofd: Option<NaiveDate>,
    date_opened: Option<NaiveDate>,
    report_date: NaiveDate,
    window_years: u32,
) -> Vec<TimelineIssue> {
    let mut issues = Vec::new();
    let Some(dofd) = dofd else {
        return issues;
    };

    if let Some(opened) = date_opened {
        if dofd < opened {
            issues.push(TimelineIssue::DofdBeforeOpened {
                dofd,
                date_opened: opened,
            });
        }
    }

    if let Some(expires) = reporting_expiry(dofd, window_years) {
        if report_date > expires {
            issues.push(TimelineIssue::ObsoleteReporting {
                dofd,
                expires,
                report_date,
            });
        }
    }

    issues
}

// ============================================================================
// TESTS
// ============================================================================
