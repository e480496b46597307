//! Cross-join search over the two groups' team lists under the shared
//! budget. The scan is exhaustive over the admissible cross-product — the
//! sorted inputs make good pairs show up early but never cut the scan short
//! (output fidelity over speed). Merged balance is always recomputed from
//! the full combined point list; group variances do not add.

use std::cmp::Ordering;

use rayon::prelude::*;
use serde::Serialize;

use crate::data::pool::{Rider, RiderPool};
use crate::optimizer::balance::{balanced_score, points_spread};
use crate::optimizer::generator::GroupTeam;
use crate::optimizer::{CancelToken, SelectionError};

/// Budget-feasible union of one team per group. The sole success output of
/// a selection run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FinalRoster {
    pub members: Vec<Rider>,
    pub total_cost: u64,
    pub total_score: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub merged_balanced_score: Option<f64>,
}

/// Best admissible pair seen so far. Indices double as the deterministic
/// last-resort tie-break so partitioned scans agree with the sequential one.
#[derive(Debug, Clone, Copy)]
struct BestPair {
    outer: usize,
    inner: usize,
    key: f64,
    spent: u64,
}

/// Scan the full admissible cross-product of `outer_teams` x `inner_teams`.
///
/// Both lists must already be sorted descending by their active score key
/// (generator invariant, consumed not re-verified). Among equal top scores
/// the pair spending more of the budget wins. The cancel token, when given,
/// is checked between outer-loop iterations; a cancelled run returns
/// [SelectionError::Cancelled] and never a partial roster.
pub fn select(
    pool: &RiderPool,
    outer_teams: &[GroupTeam],
    inner_teams: &[GroupTeam],
    budget: u64,
    balance_factor: Option<f64>,
    cancel: Option<&CancelToken>,
) -> Result<FinalRoster, SelectionError> {
    let mut best: Option<BestPair> = None;
    for (outer_index, outer) in outer_teams.iter().enumerate() {
        if let Some(token) = cancel {
            if token.is_cancelled() {
                return Err(SelectionError::Cancelled);
            }
        }
        let row_best = best_for_outer(pool, outer_index, outer, inner_teams, budget, balance_factor);
        best = merge_best(best, row_best);
    }
    finish(pool, outer_teams, inner_teams, balance_factor, best)
}

/// Parallel twin of [select]: the outer loop is partitioned across workers
/// and reduced with the same ordering (plus the index tie-break), so the
/// chosen roster is identical for any worker count.
pub fn select_parallel(
    pool: &RiderPool,
    outer_teams: &[GroupTeam],
    inner_teams: &[GroupTeam],
    budget: u64,
    balance_factor: Option<f64>,
    cancel: Option<&CancelToken>,
) -> Result<FinalRoster, SelectionError> {
    let best = outer_teams
        .par_iter()
        .enumerate()
        .map(|(outer_index, outer)| {
            if let Some(token) = cancel {
                if token.is_cancelled() {
                    return Err(SelectionError::Cancelled);
                }
            }
            Ok(best_for_outer(
                pool,
                outer_index,
                outer,
                inner_teams,
                budget,
                balance_factor,
            ))
        })
        .try_reduce(|| None, |left, right| Ok(merge_best(left, right)))?;
    finish(pool, outer_teams, inner_teams, balance_factor, best)
}

fn best_for_outer(
    pool: &RiderPool,
    outer_index: usize,
    outer: &GroupTeam,
    inner_teams: &[GroupTeam],
    budget: u64,
    balance_factor: Option<f64>,
) -> Option<BestPair> {
    let remaining = budget.checked_sub(outer.cost)?;
    let mut best: Option<BestPair> = None;
    for (inner_index, inner) in inner_teams.iter().enumerate() {
        if inner.cost > remaining {
            continue;
        }
        let challenger = BestPair {
            outer: outer_index,
            inner: inner_index,
            key: merged_key(pool, outer, inner, balance_factor),
            spent: outer.cost + inner.cost,
        };
        best = merge_best(best, Some(challenger));
    }
    best
}

/// Score key of a merged pair: raw summed score, balance-penalized over the
/// full combined point distribution when a factor is active.
fn merged_key(
    pool: &RiderPool,
    outer: &GroupTeam,
    inner: &GroupTeam,
    balance_factor: Option<f64>,
) -> f64 {
    let merged_score = outer.score + inner.score;
    match balance_factor {
        Some(factor) => {
            let spread = points_spread(&combined_points(pool, outer, inner));
            balanced_score(merged_score, spread.std_dev, factor)
        }
        None => merged_score,
    }
}

fn combined_points(pool: &RiderPool, outer: &GroupTeam, inner: &GroupTeam) -> Vec<f64> {
    let riders = pool.riders();
    outer
        .members
        .iter()
        .chain(inner.members.iter())
        .map(|&index| riders[index].primary_points)
        .collect()
}

fn merge_best(left: Option<BestPair>, right: Option<BestPair>) -> Option<BestPair> {
    match (left, right) {
        (Some(incumbent), Some(challenger)) => {
            if beats(&challenger, &incumbent) {
                Some(challenger)
            } else {
                Some(incumbent)
            }
        }
        (Some(pair), None) | (None, Some(pair)) => Some(pair),
        (None, None) => None,
    }
}

/// Descending by score key, then by budget spent; the lowest scan position
/// wins full ties, matching what the sequential loop would have kept.
fn beats(challenger: &BestPair, incumbent: &BestPair) -> bool {
    challenger
        .key
        .total_cmp(&incumbent.key)
        .then_with(|| challenger.spent.cmp(&incumbent.spent))
        .then_with(|| {
            (incumbent.outer, incumbent.inner).cmp(&(challenger.outer, challenger.inner))
        })
        == Ordering::Greater
}

fn finish(
    pool: &RiderPool,
    outer_teams: &[GroupTeam],
    inner_teams: &[GroupTeam],
    balance_factor: Option<f64>,
    best: Option<BestPair>,
) -> Result<FinalRoster, SelectionError> {
    let best = best.ok_or(SelectionError::NoFeasibleTeam)?;
    let outer = &outer_teams[best.outer];
    let inner = &inner_teams[best.inner];
    let riders = pool.riders();

    let members: Vec<Rider> = outer
        .members
        .iter()
        .chain(inner.members.iter())
        .map(|&index| riders[index].clone())
        .collect();
    let total_score = outer.score + inner.score;
    let merged_balanced_score = balance_factor.map(|factor| {
        let spread = points_spread(&combined_points(pool, outer, inner));
        balanced_score(total_score, spread.std_dev, factor)
    });

    Ok(FinalRoster {
        members,
        total_cost: best.spent,
        total_score,
        merged_balanced_score,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::pool::{RiderPool, ScoreWeights};
    use crate::data::rider::{Group, RiderRecord};
    use crate::optimizer::generator::generate_teams;

    fn rider(name: &str, cost: i64, group: Group, points: f64) -> RiderRecord {
        RiderRecord {
            name: name.to_string(),
            cost,
            primary_points: points,
            group,
            secondary_points: 0.0,
            unavailable: false,
        }
    }

    fn teams(
        pool: &RiderPool,
        group: Group,
        required: usize,
        budget: u64,
        balance_factor: Option<f64>,
    ) -> Vec<GroupTeam> {
        generate_teams(pool, group, required, budget, balance_factor, None).teams
    }

    #[test]
    fn equal_scores_prefer_fuller_budget_use() {
        // Same points, different costs: both pairings score identically,
        // the more expensive one must win.
        let records = vec![
            rider("Cheap", 100, Group::Male, 50.0),
            rider("Dear", 120, Group::Male, 50.0),
            rider("Only", 50, Group::Female, 30.0),
        ];
        let pool = RiderPool::build(&records, ScoreWeights::default()).unwrap();
        let women = teams(&pool, Group::Female, 1, 300, None);
        let men = teams(&pool, Group::Male, 1, 300, None);

        let roster = select(&pool, &women, &men, 300, None, None).unwrap();
        assert_eq!(roster.total_cost, 170);
        assert!(roster.members.iter().any(|r| r.name == "Dear"));
    }

    #[test]
    fn infeasible_cross_product_is_reported() {
        let records = vec![
            rider("M1", 200, Group::Male, 50.0),
            rider("F1", 150, Group::Female, 30.0),
        ];
        let pool = RiderPool::build(&records, ScoreWeights::default()).unwrap();
        let women = teams(&pool, Group::Female, 1, 300, None);
        let men = teams(&pool, Group::Male, 1, 300, None);
        assert!(!women.is_empty());
        assert!(!men.is_empty());

        // Each side fits alone but never together.
        let err = select(&pool, &women, &men, 300, None, None).unwrap_err();
        assert_eq!(err, SelectionError::NoFeasibleTeam);
    }

    #[test]
    fn merged_balance_is_recomputed_over_the_union() {
        // Two degenerate groups of one rider each: per-group std dev is 0,
        // but the union of 10 and 90 points is spread out.
        let records = vec![
            rider("M", 100, Group::Male, 90.0),
            rider("F", 100, Group::Female, 10.0),
        ];
        let pool = RiderPool::build(&records, ScoreWeights::default()).unwrap();
        let factor = 1.5;
        let women = teams(&pool, Group::Female, 1, 300, Some(factor));
        let men = teams(&pool, Group::Male, 1, 300, Some(factor));
        assert_eq!(women[0].balance.unwrap().std_dev, 0.0);
        assert_eq!(men[0].balance.unwrap().std_dev, 0.0);

        let roster = select(&pool, &women, &men, 300, Some(factor), None).unwrap();
        let merged = roster.merged_balanced_score.unwrap();
        // union mean 50, population std dev 40
        let expected = roster.total_score - 40.0 / factor;
        assert!((merged - expected).abs() < 1e-12);
        assert!(merged < roster.total_score);
    }

    #[test]
    fn parallel_selection_matches_sequential() {
        let records: Vec<RiderRecord> = (0..10)
            .map(|i| {
                rider(
                    &format!("M{i}"),
                    60 + 11 * i,
                    Group::Male,
                    10.0 + (i as f64 * 7.3) % 50.0,
                )
            })
            .chain((0..6).map(|i| {
                rider(
                    &format!("F{i}"),
                    40 + 13 * i,
                    Group::Female,
                    8.0 + (i as f64 * 5.1) % 30.0,
                )
            }))
            .collect();
        let pool = RiderPool::build(&records, ScoreWeights::default()).unwrap();

        for balance in [None, Some(30.0)] {
            let women = teams(&pool, Group::Female, 2, 500, balance);
            let men = teams(&pool, Group::Male, 3, 500, balance);
            let sequential = select(&pool, &women, &men, 500, balance, None).unwrap();
            let parallel = select_parallel(&pool, &women, &men, 500, balance, None).unwrap();
            assert_eq!(sequential, parallel);
        }
    }

    #[test]
    fn cancelled_token_aborts_before_an_answer() {
        let records = vec![
            rider("M", 100, Group::Male, 50.0),
            rider("F", 100, Group::Female, 30.0),
        ];
        let pool = RiderPool::build(&records, ScoreWeights::default()).unwrap();
        let women = teams(&pool, Group::Female, 1, 300, None);
        let men = teams(&pool, Group::Male, 1, 300, None);

        let token = CancelToken::new();
        token.cancel();
        let err = select(&pool, &women, &men, 300, None, Some(&token)).unwrap_err();
        assert_eq!(err, SelectionError::Cancelled);
        let err = select_parallel(&pool, &women, &men, 300, None, Some(&token)).unwrap_err();
        assert_eq!(err, SelectionError::Cancelled);
    }
}
