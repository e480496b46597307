//! Budget-constrained roster selection over a rider pool.
//!
//! The pipeline is eligibility gate → per-group combination generation
//! ([generator]) → cross-join selection ([selector]). Configuration is an
//! explicit immutable value passed into every call; there is no
//! process-wide state. All failure modes are terminal for a run — the core
//! returns a complete roster or a structured error, never a partial answer.

pub mod balance;
pub mod combinations;
pub mod generator;
pub mod report;
pub mod selector;

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::Serialize;

use crate::data::pool::{RiderPool, ScoreWeights};
use crate::data::rider::Group;

pub use generator::{generate_teams, generate_teams_parallel, GeneratedTeams, GroupTeam};
pub use selector::{select, select_parallel, FinalRoster};

/// Default total budget, shared across both groups.
pub const DEFAULT_BUDGET: u64 = 1_500_000;

/// Required roster size per group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RosterRequirements {
    pub male: usize,
    pub female: usize,
}

impl RosterRequirements {
    pub fn required_for(&self, group: Group) -> usize {
        match group {
            Group::Male => self.male,
            Group::Female => self.female,
        }
    }
}

impl Default for RosterRequirements {
    fn default() -> Self {
        Self { male: 4, female: 2 }
    }
}

/// One selection run's explicit configuration.
///
/// `balance_factor` unset runs the plain score-maximizing variant;
/// `keep_top_percent` unset keeps every generated team (exact search).
#[derive(Debug, Clone, Copy)]
pub struct SelectionConfig {
    pub budget: u64,
    pub required: RosterRequirements,
    pub weights: ScoreWeights,
    pub balance_factor: Option<f64>,
    pub keep_top_percent: Option<f64>,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            budget: DEFAULT_BUDGET,
            required: RosterRequirements::default(),
            weights: ScoreWeights::default(),
            balance_factor: None,
            keep_top_percent: None,
        }
    }
}

impl SelectionConfig {
    /// Reject out-of-range parameters before any enumeration work.
    pub fn validate(&self) -> Result<(), SelectionError> {
        if self.budget == 0 {
            return Err(SelectionError::InvalidParameter {
                name: "budget",
                value: self.budget.to_string(),
            });
        }
        for group in Group::ALL {
            let required = self.required.required_for(group);
            if required == 0 {
                return Err(SelectionError::InvalidParameter {
                    name: "required_count",
                    value: format!("{group}: {required}"),
                });
            }
        }
        if let Some(factor) = self.balance_factor {
            if !(factor > 0.0) {
                return Err(SelectionError::InvalidParameter {
                    name: "balance_factor",
                    value: factor.to_string(),
                });
            }
        }
        if let Some(percent) = self.keep_top_percent {
            if !(percent > 0.0 && percent <= 100.0) {
                return Err(SelectionError::InvalidParameter {
                    name: "keep_top_percent",
                    value: percent.to_string(),
                });
            }
        }
        Ok(())
    }
}

/// Cooperative cancellation flag, checked between selector outer-loop
/// iterations. Cloning shares the underlying flag.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SelectionError {
    InvalidParameter {
        name: &'static str,
        value: String,
    },
    InsufficientRoster {
        group: Group,
        available: usize,
        required: usize,
    },
    NoFeasibleTeam,
    Cancelled,
}

impl fmt::Display for SelectionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidParameter { name, value } => {
                write!(f, "invalid parameter {name} = {value}")
            }
            Self::InsufficientRoster {
                group,
                available,
                required,
            } => write!(
                f,
                "not enough eligible {group} riders: {available} available, {required} required"
            ),
            Self::NoFeasibleTeam => write!(f, "no team fits the budget and roster constraints"),
            Self::Cancelled => write!(f, "selection cancelled"),
        }
    }
}

impl std::error::Error for SelectionError {}

/// Per-group generation counts, surfaced for boundary diagnostics only.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct GenerationCounts {
    pub examined: usize,
    pub retained: usize,
}

impl From<&GeneratedTeams> for GenerationCounts {
    fn from(generated: &GeneratedTeams) -> Self {
        Self {
            examined: generated.examined,
            retained: generated.retained,
        }
    }
}

/// A completed run: the roster plus observational generation counts.
#[derive(Debug, Clone)]
pub struct SelectionOutcome {
    pub roster: FinalRoster,
    pub male_counts: GenerationCounts,
    pub female_counts: GenerationCounts,
}

/// Run the full pipeline sequentially.
pub fn select_roster(
    pool: &RiderPool,
    config: &SelectionConfig,
) -> Result<SelectionOutcome, SelectionError> {
    run_selection(pool, config, false, None)
}

/// Run the full pipeline with generation and the selector outer loop
/// partitioned across rayon workers. Results are identical to
/// [select_roster] for any worker count.
pub fn select_roster_parallel(
    pool: &RiderPool,
    config: &SelectionConfig,
) -> Result<SelectionOutcome, SelectionError> {
    run_selection(pool, config, true, None)
}

/// Like [select_roster], aborting with [SelectionError::Cancelled] once the
/// token fires. Cancellation never yields a partial roster.
pub fn select_roster_with_cancel(
    pool: &RiderPool,
    config: &SelectionConfig,
    cancel: &CancelToken,
) -> Result<SelectionOutcome, SelectionError> {
    run_selection(pool, config, false, Some(cancel))
}

fn run_selection(
    pool: &RiderPool,
    config: &SelectionConfig,
    parallel: bool,
    cancel: Option<&CancelToken>,
) -> Result<SelectionOutcome, SelectionError> {
    config.validate()?;

    // Gate before any enumeration: every group must be able to fill its slots.
    for group in Group::ALL {
        let available = pool.eligible_count(group);
        let required = config.required.required_for(group);
        if available < required {
            return Err(SelectionError::InsufficientRoster {
                group,
                available,
                required,
            });
        }
    }

    let generate = if parallel {
        generate_teams_parallel
    } else {
        generate_teams
    };
    let men = generate(
        pool,
        Group::Male,
        config.required.male,
        config.budget,
        config.balance_factor,
        config.keep_top_percent,
    );
    let women = generate(
        pool,
        Group::Female,
        config.required.female,
        config.budget,
        config.balance_factor,
        config.keep_top_percent,
    );

    let pick = if parallel { select_parallel } else { select };
    let roster = pick(
        pool,
        &women.teams,
        &men.teams,
        config.budget,
        config.balance_factor,
        cancel,
    )?;

    Ok(SelectionOutcome {
        roster,
        male_counts: GenerationCounts::from(&men),
        female_counts: GenerationCounts::from(&women),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(SelectionConfig::default().validate().is_ok());
    }

    #[test]
    fn out_of_range_parameters_are_rejected() {
        let mut config = SelectionConfig {
            budget: 0,
            ..SelectionConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(SelectionError::InvalidParameter { name: "budget", .. })
        ));

        config.budget = 100;
        config.required.female = 0;
        assert!(matches!(
            config.validate(),
            Err(SelectionError::InvalidParameter {
                name: "required_count",
                ..
            })
        ));

        config.required.female = 2;
        config.balance_factor = Some(0.0);
        assert!(matches!(
            config.validate(),
            Err(SelectionError::InvalidParameter {
                name: "balance_factor",
                ..
            })
        ));

        config.balance_factor = Some(1.5);
        config.keep_top_percent = Some(0.0);
        assert!(matches!(
            config.validate(),
            Err(SelectionError::InvalidParameter {
                name: "keep_top_percent",
                ..
            })
        ));

        config.keep_top_percent = Some(100.5);
        assert!(config.validate().is_err());

        config.keep_top_percent = Some(100.0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn cancel_token_is_shared_between_clones() {
        let token = CancelToken::new();
        let clone = token.clone();
        assert!(!clone.is_cancelled());
        token.cancel();
        assert!(clone.is_cancelled());
    }
}
