//! Command-line boundary: argument dispatch, env overrides, exit codes.
//! All I/O and printing lives here; the core stays purely functional.

use std::env;

use crate::data::extract::extract_athletes_from_file;
use crate::data::pool::{RiderPool, ScoreWeights};
use crate::data::rider::{load_riders_csv, write_riders_csv};
use crate::data::uci::{load_ranking_file, merge_series_points};
use crate::optimizer::report::{render_table, RosterReport};
use crate::optimizer::{
    select_roster, select_roster_parallel, RosterRequirements, SelectionConfig, DEFAULT_BUDGET,
};
use crate::parallel::WorkerPool;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Select,
    Extract,
    MergeUci,
}

pub fn parse_command(args: &[String]) -> Option<Command> {
    match args.get(1).map(String::as_str) {
        Some("select") => Some(Command::Select),
        Some("extract") => Some(Command::Extract),
        Some("merge-uci") => Some(Command::MergeUci),
        _ => None,
    }
}

pub fn run_with_args(args: &[String]) -> i32 {
    match parse_command(args) {
        Some(Command::Select) => handle_select(args),
        Some(Command::Extract) => handle_extract(args),
        Some(Command::MergeUci) => handle_merge_uci(args),
        None => {
            eprintln!("usage: holeshot <select|extract|merge-uci>");
            2
        }
    }
}

fn handle_select(args: &[String]) -> i32 {
    let Some(path) = args.get(2) else {
        eprintln!(
            "usage: holeshot select <riders.csv> [balance_factor] [keep_top_percent] [--table] [--plain]"
        );
        return 2;
    };
    let as_table = args.iter().any(|arg| arg == "--table");
    let plain = args.iter().any(|arg| arg == "--plain");
    let positional: Vec<&String> = args[3..].iter().filter(|arg| !arg.starts_with("--")).collect();

    // --plain runs the score-only variant: no balance penalty, no pruning.
    let (balance_factor, keep_top_percent) = if plain {
        (None, None)
    } else {
        (
            Some(parse_f64_arg(positional.first().copied(), "balance_factor", 30.0)),
            Some(parse_f64_arg(positional.get(1).copied(), "keep_top_percent", 30.0)),
        )
    };

    let records = match load_riders_csv(path) {
        Ok(records) => records,
        Err(err) => {
            eprintln!("select failed: {err}");
            return 1;
        }
    };

    let weights = ScoreWeights::default();
    let pool = match RiderPool::build(&records, weights) {
        Ok(pool) => pool,
        Err(err) => {
            eprintln!("select failed: {err}");
            return 1;
        }
    };

    let defaults = RosterRequirements::default();
    let config = SelectionConfig {
        budget: env_u64("HOLESHOT_BUDGET", DEFAULT_BUDGET),
        required: RosterRequirements {
            male: env_usize("HOLESHOT_MALE_COUNT", defaults.male),
            female: env_usize("HOLESHOT_FEMALE_COUNT", defaults.female),
        },
        weights,
        balance_factor,
        keep_top_percent,
    };

    let workers = env_usize("HOLESHOT_WORKERS", 0);
    let outcome = if workers > 0 {
        WorkerPool::with_workers(workers).install(|| select_roster_parallel(&pool, &config))
    } else {
        select_roster(&pool, &config)
    };
    let outcome = match outcome {
        Ok(outcome) => outcome,
        Err(err) => {
            eprintln!("select failed: {err}");
            return 1;
        }
    };

    eprintln!(
        "men: examined {} combinations, kept {}",
        outcome.male_counts.examined, outcome.male_counts.retained
    );
    eprintln!(
        "women: examined {} combinations, kept {}",
        outcome.female_counts.examined, outcome.female_counts.retained
    );

    let report = RosterReport::from_roster(&outcome.roster);
    if as_table {
        print!("{}", render_table(&report));
        0
    } else {
        match serde_json::to_string_pretty(&report) {
            Ok(payload) => {
                println!("{payload}");
                0
            }
            Err(err) => {
                eprintln!("failed to serialize roster: {err}");
                1
            }
        }
    }
}

fn handle_extract(args: &[String]) -> i32 {
    let Some(path) = args.get(2) else {
        eprintln!("usage: holeshot extract <page.html> [output.csv]");
        return 2;
    };
    let output = args.get(3).map(String::as_str).unwrap_or("riders.csv");

    let records = match extract_athletes_from_file(path) {
        Ok(records) => records,
        Err(err) => {
            eprintln!("extract failed: {err}");
            return 1;
        }
    };
    match write_riders_csv(output, &records) {
        Ok(()) => {
            println!("extracted {} riders to {output}", records.len());
            0
        }
        Err(err) => {
            eprintln!("extract failed: {err}");
            1
        }
    }
}

fn handle_merge_uci(args: &[String]) -> i32 {
    let (Some(riders_path), Some(men_path), Some(women_path)) =
        (args.get(2), args.get(3), args.get(4))
    else {
        eprintln!("usage: holeshot merge-uci <riders.csv> <men.html> <women.html> [output.csv]");
        return 2;
    };
    let output = args.get(5).map(String::as_str).unwrap_or("riders_with_uci.csv");

    let mut records = match load_riders_csv(riders_path) {
        Ok(records) => records,
        Err(err) => {
            eprintln!("merge-uci failed: {err}");
            return 1;
        }
    };
    let men = match load_ranking_file(men_path) {
        Ok(ranking) => ranking,
        Err(err) => {
            eprintln!("merge-uci failed: {err}");
            return 1;
        }
    };
    let women = match load_ranking_file(women_path) {
        Ok(ranking) => ranking,
        Err(err) => {
            eprintln!("merge-uci failed: {err}");
            return 1;
        }
    };

    let report = merge_series_points(&mut records, &men, &women);
    for name in &report.unmatched {
        eprintln!("warning: no series match for '{name}'");
    }
    match write_riders_csv(output, &records) {
        Ok(()) => {
            println!(
                "merged series points into {output}: {} matched, {} fuzzy, {} unmatched",
                report.matched,
                report.fuzzy_matched,
                report.unmatched.len()
            );
            0
        }
        Err(err) => {
            eprintln!("merge-uci failed: {err}");
            1
        }
    }
}

fn parse_f64_arg(raw: Option<&String>, name: &str, default: f64) -> f64 {
    raw.and_then(|value| value.parse::<f64>().ok())
        .unwrap_or_else(|| {
            if let Some(value) = raw {
                eprintln!("invalid {name} '{value}', defaulting to {default}");
            }
            default
        })
}

fn env_u64(name: &str, default: u64) -> u64 {
    env::var(name)
        .ok()
        .and_then(|value| value.parse::<u64>().ok())
        .unwrap_or(default)
}

fn env_usize(name: &str, default: usize) -> usize {
    env::var(name)
        .ok()
        .and_then(|value| value.parse::<usize>().ok())
        .unwrap_or(default)
}
