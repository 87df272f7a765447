// 🔍 Cross-Bureau Matcher - Find the same tradeline at every bureau
//
// Bureaus mask account numbers differently and abbreviate creditor names
// differently, so there is no shared key. Accounts are matched on a weighted
// score over three signals:
//   - creditor name (normalized Levenshtein ratio)
//   - visible account-number digits
//   - date opened proximity
//
// Below the threshold nothing is forced: unmatched accounts simply stay out
// of the cross-bureau checks.

use crate::entities::{normalize_name, Account, Bureau, NormalizedReport};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, BTreeSet};

// ============================================================================
// WEIGHTS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchWeights {
    pub name: f64,
    pub account_number: f64,
    pub date_opened: f64,
}

impl MatchWeights {
    pub fn total(&self) -> f64 {
        self.name + self.account_number + self.date_opened
    }
}

impl Default for MatchWeights {
    fn default() -> Self {
        MatchWeights {
            name: 0.5,
            account_number: 0.3,
            date_opened: 0.2,
        }
    }
}

pub const DEFAULT_MATCH_THRESHOLD: f64 = 0.80;

// ============================================================================
// MATCH RESULTS
// ============================================================================

/// One account inside one bureau's report
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AccountRef {
    pub bureau: Bureau,
    pub index: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MatchScore {
    pub name: f64,
    pub account_number: f64,
    pub date_opened: f64,
    pub combined: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GroupMember {
    pub index: usize,
    pub account_id: String,
    pub creditor_name: String,
}

/// The same underlying tradeline as reported by two or more bureaus
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchedGroup {
    pub group_id: String,

    /// At most one account per bureau
    pub members: BTreeMap<Bureau, GroupMember>,
}

impl MatchedGroup {
    pub fn bureaus(&self) -> impl Iterator<Item = &Bureau> {
        self.members.keys()
    }

    pub fn contains(&self, bureau: Bureau, index: usize) -> bool {
        self.members.get(&bureau).map_or(false, |m| m.index == index)
    }
}

// ============================================================================
// MATCHER
// ============================================================================

#[derive(Debug, Clone)]
pub struct CrossBureauMatcher {
    /// Minimum combined score for two accounts to be the same tradeline (default: 0.80)
    ///
    /// Inclusive: a pair scoring exactly the threshold matches.
    pub threshold: f64,

    pub weights: MatchWeights,
}

impl CrossBureauMatcher {
    pub fn new(threshold: f64, weights: MatchWeights) -> Self {
        CrossBureauMatcher { threshold, weights }
    }

    pub fn score(&self, a: &Account, b: &Account) -> MatchScore {
        let name = name_similarity(&a.creditor_name, &b.creditor_name);
        let account_number = account_number_score(a, b);
        let date_opened = date_opened_score(a, b);

        MatchScore {
            name,
            account_number,
            date_opened,
            combined: name * self.weights.name
                + account_number * self.weights.account_number
                + date_opened * self.weights.date_opened,
        }
    }

    /// Group accounts across reports
    ///
    /// Reports are taken in bureau order whatever order they arrive in.
    /// Edges at or above the threshold are applied best-first; two groups
    /// only merge when they share no bureau.
    pub fn match_reports(&self, reports: &[&NormalizedReport]) -> Vec<MatchedGroup> {
        let mut ordered: Vec<&NormalizedReport> = reports.to_vec();
        ordered.sort_by_key(|r| r.bureau);

        let mut edges: Vec<(f64, AccountRef, AccountRef)> = Vec::new();
        for (i, left) in ordered.iter().enumerate() {
            for right in &ordered[i + 1..] {
                if left.bureau == right.bureau {
                    continue;
                }
                for (li, la) in left.accounts.iter().enumerate() {
                    for (ri, ra) in right.accounts.iter().enumerate() {
                        let score = self.score(la, ra);
                        if score.combined >= self.threshold {
                            edges.push((
                                score.combined,
                                AccountRef { bureau: left.bureau, index: li },
                                AccountRef { bureau: right.bureau, index: ri },
                            ));
                        }
                    }
                }
            }
        }

        edges.sort_by(|x, y| {
            y.0.total_cmp(&x.0)
                .then_with(|| x.1.cmp(&y.1))
                .then_with(|| x.2.cmp(&y.2))
        });

        let mut group_of: BTreeMap<AccountRef, usize> = BTreeMap::new();
        let mut groups: Vec<BTreeSet<AccountRef>> = Vec::new();

        for (_, a, b) in edges {
            match (group_of.get(&a).copied(), group_of.get(&b).copied()) {
                (None, None) => {
                    groups.push(BTreeSet::from([a, b]));
                    group_of.insert(a, groups.len() - 1);
                    group_of.insert(b, groups.len() - 1);
                }
                (Some(g), None) => {
                    if !has_bureau(&groups[g], b.bureau) {
                        groups[g].insert(b);
                        group_of.insert(b, g);
                    }
                }
                (None, Some(g)) => {
                    if !has_bureau(&groups[g], a.bureau) {
                        groups[g].insert(a);
                        group_of.insert(a, g);
                    }
                }
                (Some(ga), Some(gb)) if ga != gb => {
                    let disjoint = groups[gb].iter().all(|m| !has_bureau(&groups[ga], m.bureau));
                    if disjoint {
                        let moved = std::mem::take(&mut groups[gb]);
                        for member in &moved {
                            group_of.insert(*member, ga);
                        }
                        groups[ga].extend(moved);
                    }
                }
                _ => {}
            }
        }

        let by_bureau: BTreeMap<Bureau, &NormalizedReport> =
            ordered.iter().map(|r| (r.bureau, *r)).collect();

        let mut matched: Vec<MatchedGroup> = groups
            .into_iter()
            .filter(|g| g.len() >= 2)
            .filter_map(|g| build_group(&g, &by_bureau))
            .collect();
        matched.sort_by(|a, b| a.members.iter().next().cmp(&b.members.iter().next()));
        matched
    }
}

impl Default for CrossBureauMatcher {
    fn default() -> Self {
        Self::new(DEFAULT_MATCH_THRESHOLD, MatchWeights::default())
    }
}

fn has_bureau(group: &BTreeSet<AccountRef>, bureau: Bureau) -> bool {
    group.iter().any(|m| m.bureau == bureau)
}

fn build_group(
    refs: &BTreeSet<AccountRef>,
    reports: &BTreeMap<Bureau, &NormalizedReport>,
) -> Option<MatchedGroup> {
    let mut members = BTreeMap::new();
    let mut fingerprints = Vec::new();

    for r in refs {
        let account = reports.get(&r.bureau)?.accounts.get(r.index)?;
        fingerprints.push(account.fingerprint());
        members.insert(
            r.bureau,
            GroupMember {
                index: r.index,
                account_id: account.account_id(),
                creditor_name: account.creditor_name.clone(),
            },
        );
    }

    fingerprints.sort();
    let mut hasher = Sha256::new();
    hasher.update(fingerprints.join("|").as_bytes());
    let digest = format!("{:x}", hasher.finalize());

    Some(MatchedGroup {
        group_id: digest[..16].to_string(),
        members,
    })
}

// ============================================================================
// SIGNALS
// ============================================================================

/// Similarity of two creditor names in [0, 1]
///
/// Names are normalized first, so "Capital One, N.A." and "CAPITAL ONE" are 1.0.
pub fn name_similarity(a: &str, b: &str) -> f64 {
    let a = normalize_name(a);
    let b = normalize_name(b);
    let longest = a.chars().count().max(b.chars().count());
    if longest == 0 {
        return 0.0;
    }
    1.0 - levenshtein_distance(&a, &b) as f64 / longest as f64
}

/// Agree 1.0, conflict 0.0, unknown (nothing visible on one side) 0.5
fn account_number_score(a: &Account, b: &Account) -> f64 {
    let sa = a.visible_suffix();
    let sb = b.visible_suffix();
    if sa.is_empty() || sb.is_empty() {
        return 0.5;
    }
    if sa.ends_with(&sb) || sb.ends_with(&sa) {
        1.0
    } else {
        0.0
    }
}

fn date_opened_score(a: &Account, b: &Account) -> f64 {
    match (a.date_opened, b.date_opened) {
        (Some(da), Some(db)) => match (da - db).num_days().abs() {
            0..=31 => 1.0,
            32..=90 => 0.5,
            _ => 0.0,
        },
        _ => 0.5,
    }
}

/// Minimum number of single-character edits (insertions, deletions,
/// substitutions) to turn one string into the other
pub fn levenshtein_distance(s1: &str, s2: &str) -> usize {
    let s1: Vec<char> = s1.chars().collect();
    let s2: Vec<char> = s2.chars().collect();

    if s1.is_empty() {
        return s2.len();
    }
    if s2.is_empty() {
        return s1.len();
    }

    let mut previous: Vec<usize> = (0..=s2.len()).collect();
    let mut current = vec![0; s2.len() + 1];

    for (i, c1) in s1.iter().enumerate() {
        current[0] = i + 1;
        for (j, c2) in s2.iter().enumerate() {
            let cost = if c1 == c2 { 0 } else { 1 };
            current[j + 1] = (previous[j + 1] + 1)
                .min(current[j] + 1)
                .min(previous[j] + cost);
        }
        std::mem::swap(&mut previous, &mut current);
    }

    previous[s2.len()]
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn create_test_account(name: &str, number: &str, opened: Option<NaiveDate>) -> Account {
        let mut account = Account::new(name, number);
        account.date_opened = opened;
        account
    }

    fn report(bureau: Bureau, accounts: Vec<Account>) -> NormalizedReport {
        let mut r = NormalizedReport::new(format!("r-{}", bureau), bureau, date(2024, 6, 1));
        r.accounts = accounts;
        r
    }

    #[test]
    fn test_levenshtein_distance() {
        assert_eq!(levenshtein_distance("kitten", "sitting"), 3);
        assert_eq!(levenshtein_distance("", "abc"), 3);
        assert_eq!(levenshtein_distance("same", "same"), 0);
    }

    #[test]
    fn test_name_similarity_ignores_formatting() {
        assert_eq!(name_similarity("Capital One, N.A.", "CAPITAL ONE"), 1.0);
        assert!(name_similarity("CAPITAL ONE", "DISCOVER") < 0.5);
        assert_eq!(name_similarity("", ""), 0.0);
    }

    #[test]
    fn test_score_components() {
        let matcher = CrossBureauMatcher::default();
        let a = create_test_account("CAPITAL ONE", "XXXX1234", Some(date(2019, 5, 1)));
        let b = create_test_account("Capital One NA", "****1234", Some(date(2019, 5, 20)));

        let score = matcher.score(&a, &b);
        assert_eq!(score.name, 1.0);
        assert_eq!(score.account_number, 1.0);
        assert_eq!(score.date_opened, 1.0);
        assert!((score.combined - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_conflicting_numbers_block_match() {
        let matcher = CrossBureauMatcher::default();
        let a = create_test_account("CAPITAL ONE", "XXXX1234", Some(date(2019, 5, 1)));
        let b = create_test_account("CAPITAL ONE", "XXXX9876", Some(date(2019, 5, 1)));

        // 0.5 + 0 + 0.2 = 0.7
        assert!(matcher.score(&a, &b).combined < matcher.threshold);
    }

    #[test]
    fn test_score_equal_to_threshold_matches() {
        // same name and number, opened a year apart: 0.5 + 0.3 + 0
        let a = create_test_account("CAPITAL ONE", "XXXX1234", Some(date(2019, 5, 1)));
        let b = create_test_account("CAPITAL ONE", "XXXX1234", Some(date(2020, 5, 1)));
        let combined = CrossBureauMatcher::default().score(&a, &b).combined;

        let matcher = CrossBureauMatcher::new(combined, MatchWeights::default());
        let eq = report(Bureau::Equifax, vec![a]);
        let ex = report(Bureau::Experian, vec![b]);
        assert_eq!(matcher.match_reports(&[&eq, &ex]).len(), 1);

        let stricter = CrossBureauMatcher::new(combined + 1e-9, MatchWeights::default());
        assert!(stricter.match_reports(&[&eq, &ex]).is_empty());
    }

    #[test]
    fn test_groups_one_account_per_bureau() {
        let matcher = CrossBureauMatcher::default();
        let opened = Some(date(2019, 5, 1));

        let eq = report(
            Bureau::Equifax,
            vec![
                create_test_account("CAPITAL ONE", "XXXX1234", opened),
                create_test_account("DISCOVER", "XXXX5555", opened),
            ],
        );
        let ex = report(
            Bureau::Experian,
            vec![create_test_account("CAPITAL ONE BANK", "1234", opened)],
        );
        let tu = report(
            Bureau::TransUnion,
            vec![
                create_test_account("DISCOVER FINANCIAL", "XXXX7777", None),
                create_test_account("CAP ONE", "XXXX1234", opened),
            ],
        );

        let groups = matcher.match_reports(&[&eq, &ex, &tu]);
        assert_eq!(groups.len(), 1);

        let group = &groups[0];
        assert_eq!(group.members.len(), 3);
        assert!(group.contains(Bureau::Equifax, 0));
        assert!(group.contains(Bureau::Experian, 0));
        assert!(group.contains(Bureau::TransUnion, 1));
        assert_eq!(group.group_id.len(), 16);
    }

    #[test]
    fn test_report_order_does_not_change_groups() {
        let matcher = CrossBureauMatcher::default();
        let opened = Some(date(2020, 1, 1));

        let eq = report(Bureau::Equifax, vec![create_test_account("CHASE", "XXXX1111", opened)]);
        let tu = report(Bureau::TransUnion, vec![create_test_account("Chase, N.A.", "1111", opened)]);

        let forward = matcher.match_reports(&[&eq, &tu]);
        let backward = matcher.match_reports(&[&tu, &eq]);
        assert_eq!(forward, backward);
        assert_eq!(forward.len(), 1);
    }
}
