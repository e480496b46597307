//! Rider pool normalization and eligibility.
//!
//! Normalization maxima are computed once at build time from the eligible
//! riders and never change afterwards; every rider in one pool is scored
//! against the same maxima. Input order is preserved so that later stable
//! sorts break ties by it.

use std::fmt;

use serde::Serialize;

use crate::data::rider::{Group, RiderRecord};

/// Weights applied to the normalized primary/secondary point contributions.
#[derive(Debug, Clone, Copy)]
pub struct ScoreWeights {
    pub primary: f64,
    pub secondary: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            primary: 1.0,
            secondary: 1.0 / 1.5,
        }
    }
}

/// Largest primary/secondary point totals observed across the eligible pool.
/// A maximum of zero is substituted with 1 so normalization never divides by zero.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct PoolMaxima {
    pub primary: f64,
    pub secondary: f64,
}

/// A normalized rider candidate. Immutable once the pool is built.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Rider {
    pub name: String,
    pub cost: u64,
    pub group: Group,
    pub primary_points: f64,
    pub secondary_points: f64,
    /// Composite score against the pool maxima.
    pub score: f64,
    /// Cost efficiency, informational only; never used by selection.
    pub cost_per_score: f64,
    /// False when the rider was flagged unavailable or scores zero primary points.
    pub eligible: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PoolError {
    InvalidRecord { field: &'static str, value: String },
}

impl fmt::Display for PoolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidRecord { field, value } => {
                write!(f, "invalid rider record: {field} = {value}")
            }
        }
    }
}

impl std::error::Error for PoolError {}

#[derive(Debug, Clone)]
pub struct RiderPool {
    riders: Vec<Rider>,
    maxima: PoolMaxima,
}

impl RiderPool {
    /// Validate records and derive normalized candidates.
    ///
    /// Rejects negative cost or points with [PoolError::InvalidRecord].
    /// Eligibility requires the rider to be available and to contribute a
    /// non-zero normalized primary score; ineligible riders stay in the pool
    /// (flagged) but never enter generation.
    pub fn build(records: &[RiderRecord], weights: ScoreWeights) -> Result<Self, PoolError> {
        for record in records {
            if record.cost < 0 {
                return Err(PoolError::InvalidRecord {
                    field: "cost",
                    value: record.cost.to_string(),
                });
            }
            if record.primary_points < 0.0 {
                return Err(PoolError::InvalidRecord {
                    field: "points",
                    value: record.primary_points.to_string(),
                });
            }
            if record.secondary_points < 0.0 {
                return Err(PoolError::InvalidRecord {
                    field: "uci_points",
                    value: record.secondary_points.to_string(),
                });
            }
        }

        let maxima = PoolMaxima {
            primary: observed_max(records, |record| record.primary_points),
            secondary: observed_max(records, |record| record.secondary_points),
        };

        let riders = records
            .iter()
            .map(|record| {
                let score = weights.primary * record.primary_points / maxima.primary
                    + weights.secondary * record.secondary_points / maxima.secondary;
                let cost_per_score = if score > 0.0 {
                    record.cost as f64 / score
                } else {
                    0.0
                };
                Rider {
                    name: record.name.clone(),
                    cost: record.cost as u64,
                    group: record.group,
                    primary_points: record.primary_points,
                    secondary_points: record.secondary_points,
                    score,
                    cost_per_score,
                    eligible: is_eligible(record),
                }
            })
            .collect();

        Ok(Self { riders, maxima })
    }

    /// All riders in input order, eligible or not.
    pub fn riders(&self) -> &[Rider] {
        &self.riders
    }

    pub fn maxima(&self) -> PoolMaxima {
        self.maxima
    }

    /// How many riders of `group` may enter generation.
    pub fn eligible_count(&self, group: Group) -> usize {
        self.riders
            .iter()
            .filter(|rider| rider.eligible && rider.group == group)
            .count()
    }
}

fn is_eligible(record: &RiderRecord) -> bool {
    !record.unavailable && record.primary_points > 0.0
}

fn observed_max(records: &[RiderRecord], points: impl Fn(&RiderRecord) -> f64) -> f64 {
    let max = records
        .iter()
        .filter(|record| is_eligible(record))
        .map(&points)
        .fold(0.0, f64::max);
    if max > 0.0 {
        max
    } else {
        1.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(name: &str, cost: i64, group: Group, primary: f64, secondary: f64) -> RiderRecord {
        RiderRecord {
            name: name.to_string(),
            cost,
            primary_points: primary,
            group,
            secondary_points: secondary,
            unavailable: false,
        }
    }

    #[test]
    fn scores_are_normalized_against_eligible_maxima() {
        let records = vec![
            record("A", 100, Group::Male, 50.0, 0.0),
            record("B", 100, Group::Male, 100.0, 200.0),
            record("C", 100, Group::Female, 25.0, 100.0),
        ];
        let pool = RiderPool::build(&records, ScoreWeights::default()).unwrap();

        assert_eq!(pool.maxima().primary, 100.0);
        assert_eq!(pool.maxima().secondary, 200.0);
        let riders = pool.riders();
        assert!((riders[0].score - 0.5).abs() < 1e-12);
        assert!((riders[1].score - (1.0 + 1.0 / 1.5)).abs() < 1e-12);
        assert!((riders[2].score - (0.25 + 0.5 / 1.5)).abs() < 1e-12);
    }

    #[test]
    fn injured_and_pointless_riders_are_ineligible() {
        let mut injured = record("Hurt", 100, Group::Male, 80.0, 10.0);
        injured.unavailable = true;
        let records = vec![
            injured,
            record("Zero", 100, Group::Male, 0.0, 50.0),
            record("Fit", 100, Group::Male, 40.0, 0.0),
        ];
        let pool = RiderPool::build(&records, ScoreWeights::default()).unwrap();

        assert!(!pool.riders()[0].eligible);
        assert!(!pool.riders()[1].eligible);
        assert!(pool.riders()[2].eligible);
        assert_eq!(pool.eligible_count(Group::Male), 1);
        // The injured rider's 80 points must not leak into the maxima.
        assert_eq!(pool.maxima().primary, 40.0);
    }

    #[test]
    fn zero_maxima_are_substituted_with_one() {
        let records = vec![record("Solo", 100, Group::Male, 10.0, 0.0)];
        let pool = RiderPool::build(&records, ScoreWeights::default()).unwrap();
        assert_eq!(pool.maxima().secondary, 1.0);
        assert!((pool.riders()[0].score - 1.0).abs() < 1e-12);
    }

    #[test]
    fn negative_cost_is_rejected() {
        let records = vec![record("Bad", -5, Group::Male, 10.0, 0.0)];
        let err = RiderPool::build(&records, ScoreWeights::default()).unwrap_err();
        assert_eq!(
            err,
            PoolError::InvalidRecord {
                field: "cost",
                value: "-5".to_string()
            }
        );
    }

    #[test]
    fn negative_points_are_rejected() {
        let records = vec![record("Bad", 5, Group::Female, -1.0, 0.0)];
        assert!(matches!(
            RiderPool::build(&records, ScoreWeights::default()),
            Err(PoolError::InvalidRecord { field: "points", .. })
        ));
    }

    #[test]
    fn input_order_is_preserved() {
        let records = vec![
            record("First", 1, Group::Male, 1.0, 0.0),
            record("Second", 2, Group::Female, 2.0, 0.0),
            record("Third", 3, Group::Male, 3.0, 0.0),
        ];
        let pool = RiderPool::build(&records, ScoreWeights::default()).unwrap();
        let names: Vec<&str> = pool.riders().iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["First", "Second", "Third"]);
    }

    #[test]
    fn cost_per_score_is_zero_when_score_is_zero() {
        let records = vec![record("Zero", 500, Group::Male, 0.0, 0.0)];
        let pool = RiderPool::build(&records, ScoreWeights::default()).unwrap();
        assert_eq!(pool.riders()[0].cost_per_score, 0.0);
    }
}
