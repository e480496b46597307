//! Per-group team generation: enumerate every fixed-size combination of a
//! group's eligible riders, prune on cost, attach balance metrics, sort.
//!
//! The cost prune keeps only combinations strictly under the overall budget
//! ceiling. It is a necessary condition, deliberately weak (the other
//! group's cost is unknown here) and must not be tightened.

use rayon::prelude::*;
use serde::Serialize;

use crate::data::pool::RiderPool;
use crate::data::rider::Group;
use crate::optimizer::balance::{balanced_score, points_spread};
use crate::optimizer::combinations::CombinationIndices;
use crate::parallel::batch_ranges;

/// Lists at or under this length are never trimmed by the top-percent prune.
const PRUNE_FLOOR: usize = 20;

/// Leading-index partitions used by the parallel enumeration path.
const GENERATION_BATCHES: usize = 32;

/// Balance metrics attached to a team when a balance factor is active.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TeamBalance {
    pub mean_points: f64,
    pub std_dev: f64,
    pub coefficient_of_variation: f64,
    pub balanced_score: f64,
}

/// One fixed-size combination of riders from a single group.
/// `members` are indices into the pool's rider list.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupTeam {
    pub members: Vec<usize>,
    pub cost: u64,
    pub score: f64,
    pub balance: Option<TeamBalance>,
}

impl GroupTeam {
    /// Active sort key: balanced score in balance mode, raw score otherwise.
    pub fn sort_key(&self) -> f64 {
        self.balance.map_or(self.score, |balance| balance.balanced_score)
    }
}

/// Generation output plus observational counts. The counts feed boundary
/// diagnostics and are not part of the selection contract.
#[derive(Debug, Clone)]
pub struct GeneratedTeams {
    pub teams: Vec<GroupTeam>,
    pub examined: usize,
    pub retained: usize,
}

/// Enumerate, prune and sort all size-`required` teams of `group`.
///
/// In balance mode the list is sorted descending by balanced score,
/// otherwise by raw score; ties keep generation (input) order. When
/// `keep_top_percent` is set and more than [PRUNE_FLOOR] teams survive the
/// cost prune, only the top `max(20, floor(len * pct / 100))` are retained —
/// a documented lossy approximation.
pub fn generate_teams(
    pool: &RiderPool,
    group: Group,
    required: usize,
    budget: u64,
    balance_factor: Option<f64>,
    keep_top_percent: Option<f64>,
) -> GeneratedTeams {
    let candidates = eligible_indices(pool, group);
    let mut teams = Vec::new();
    let mut examined = 0usize;
    let mut combos = CombinationIndices::new(candidates.len(), required);
    while combos.advance() {
        examined += 1;
        if let Some(team) = build_team(pool, &candidates, combos.current(), budget, balance_factor)
        {
            teams.push(team);
        }
    }
    finish(teams, examined, keep_top_percent)
}

/// Parallel twin of [generate_teams]: the enumeration is partitioned by
/// leading candidate index across workers, partial lists are concatenated in
/// partition order and the identical sort/truncation is applied, so the
/// output matches the sequential path exactly.
pub fn generate_teams_parallel(
    pool: &RiderPool,
    group: Group,
    required: usize,
    budget: u64,
    balance_factor: Option<f64>,
    keep_top_percent: Option<f64>,
) -> GeneratedTeams {
    let candidates = eligible_indices(pool, group);
    let count = candidates.len();
    if required == 0 || required > count {
        return generate_teams(pool, group, required, budget, balance_factor, keep_top_percent);
    }

    let leading = count - required + 1;
    let parts: Vec<(Vec<GroupTeam>, usize)> = batch_ranges(leading, GENERATION_BATCHES)
        .into_par_iter()
        .map(|(start, end)| {
            let mut teams = Vec::new();
            let mut examined = 0usize;
            let mut combo = vec![0usize; required];
            for first in start..end {
                combo[0] = first;
                let mut suffix = CombinationIndices::new(count - first - 1, required - 1);
                while suffix.advance() {
                    examined += 1;
                    for (slot, &offset) in suffix.current().iter().enumerate() {
                        combo[slot + 1] = first + 1 + offset;
                    }
                    if let Some(team) =
                        build_team(pool, &candidates, &combo, budget, balance_factor)
                    {
                        teams.push(team);
                    }
                }
            }
            (teams, examined)
        })
        .collect();

    let mut teams = Vec::new();
    let mut examined = 0usize;
    for (part, part_examined) in parts {
        teams.extend(part);
        examined += part_examined;
    }
    finish(teams, examined, keep_top_percent)
}

fn eligible_indices(pool: &RiderPool, group: Group) -> Vec<usize> {
    pool.riders()
        .iter()
        .enumerate()
        .filter(|(_, rider)| rider.eligible && rider.group == group)
        .map(|(index, _)| index)
        .collect()
}

fn build_team(
    pool: &RiderPool,
    candidates: &[usize],
    combo: &[usize],
    budget: u64,
    balance_factor: Option<f64>,
) -> Option<GroupTeam> {
    let riders = pool.riders();
    let mut cost = 0u64;
    let mut score = 0.0;
    for &slot in combo {
        let rider = &riders[candidates[slot]];
        cost += rider.cost;
        score += rider.score;
    }
    if cost >= budget {
        return None;
    }

    let balance = balance_factor.map(|factor| {
        let points: Vec<f64> = combo
            .iter()
            .map(|&slot| riders[candidates[slot]].primary_points)
            .collect();
        let spread = points_spread(&points);
        TeamBalance {
            mean_points: spread.mean,
            std_dev: spread.std_dev,
            coefficient_of_variation: spread.coefficient_of_variation,
            balanced_score: balanced_score(score, spread.std_dev, factor),
        }
    });

    Some(GroupTeam {
        members: combo.iter().map(|&slot| candidates[slot]).collect(),
        cost,
        score,
        balance,
    })
}

fn finish(
    mut teams: Vec<GroupTeam>,
    examined: usize,
    keep_top_percent: Option<f64>,
) -> GeneratedTeams {
    // Stable sort: equal keys keep generation order, which is input order.
    teams.sort_by(|left, right| right.sort_key().total_cmp(&left.sort_key()));
    if let Some(percent) = keep_top_percent {
        if teams.len() > PRUNE_FLOOR {
            let keep = ((teams.len() as f64 * percent / 100.0).floor() as usize).max(PRUNE_FLOOR);
            teams.truncate(keep);
        }
    }
    let retained = teams.len();
    GeneratedTeams {
        teams,
        examined,
        retained,
    }
}
