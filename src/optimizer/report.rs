//! Presentation of a selected roster. Pure formatting over a
//! [FinalRoster]; nothing here mutates or re-scores the selection.

use std::fmt::Write as _;

use serde::Serialize;

use crate::data::pool::Rider;
use crate::data::rider::Group;
use crate::optimizer::selector::FinalRoster;

/// Display-ready view of a roster: members grouped and sorted descending by
/// cost, with the aggregate totals surfaced for output.
#[derive(Debug, Clone, Serialize)]
pub struct RosterReport {
    pub men: Vec<Rider>,
    pub women: Vec<Rider>,
    pub total_cost: u64,
    pub total_score: f64,
    pub total_primary_points: f64,
    pub total_secondary_points: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub merged_balanced_score: Option<f64>,
}

impl RosterReport {
    pub fn from_roster(roster: &FinalRoster) -> Self {
        let mut men: Vec<Rider> = members_of(roster, Group::Male);
        let mut women: Vec<Rider> = members_of(roster, Group::Female);
        men.sort_by(|left, right| right.cost.cmp(&left.cost));
        women.sort_by(|left, right| right.cost.cmp(&left.cost));

        Self {
            men,
            women,
            total_cost: roster.total_cost,
            total_score: roster.total_score,
            total_primary_points: roster.members.iter().map(|r| r.primary_points).sum(),
            total_secondary_points: roster.members.iter().map(|r| r.secondary_points).sum(),
            merged_balanced_score: roster.merged_balanced_score,
        }
    }
}

fn members_of(roster: &FinalRoster, group: Group) -> Vec<Rider> {
    roster
        .members
        .iter()
        .filter(|rider| rider.group == group)
        .cloned()
        .collect()
}

/// Render the aligned text table: one row per rider (men first), then the
/// aggregate totals.
pub fn render_table(report: &RosterReport) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Selected roster (total spent: {}):", report.total_cost);
    let _ = writeln!(
        out,
        "{:<25} {:<8} {:>10} {:>8} {:>8} {:>8} {:>10}",
        "Name", "Group", "Cost", "Points", "Series", "Score", "Cost/Score"
    );
    let _ = writeln!(out, "{}", "-".repeat(84));
    for rider in report.men.iter().chain(report.women.iter()) {
        let _ = writeln!(
            out,
            "{:<25} {:<8} {:>10} {:>8} {:>8} {:>8.2} {:>10.5}",
            rider.name,
            rider.group.to_string(),
            rider.cost,
            rider.primary_points,
            rider.secondary_points,
            rider.score,
            rider.cost_per_score
        );
    }
    let _ = writeln!(out, "{}", "-".repeat(84));
    let _ = writeln!(out, "Total score: {:.4}", report.total_score);
    let _ = writeln!(out, "Total points: {}", report.total_primary_points);
    let _ = writeln!(out, "Total series points: {}", report.total_secondary_points);
    if let Some(balanced) = report.merged_balanced_score {
        let _ = writeln!(out, "Balanced score: {balanced:.4}");
    }
    out
}
