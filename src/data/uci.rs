//! Merge series points from a saved rankings page into rider records.
//!
//! The rankings page carries one table per discipline; rider names sit in an
//! `<h3>` inside each row and the points column is found by header text.
//! Riders are matched by normalized name first, then by a similarity ratio,
//! so punctuation and minor spelling differences between the two feeds still
//! line up. Unmatched riders keep zero points and are reported, not dropped.

use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::Path;

use crate::data::rider::{Group, RiderRecord};

/// Similarity floor for the fuzzy fallback.
const FUZZY_THRESHOLD: f64 = 0.6;

#[derive(Debug)]
pub enum MergeError {
    Read(std::io::Error),
    NoTable,
    NoPointsColumn,
}

impl fmt::Display for MergeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Read(err) => write!(f, "failed to read rankings page: {err}"),
            Self::NoTable => write!(f, "could not find a rankings table in the page"),
            Self::NoPointsColumn => write!(f, "rankings table has no points column"),
        }
    }
}

impl std::error::Error for MergeError {}

/// Points per normalized rider name for one group's ranking table.
/// `names` keeps table order so fuzzy ties resolve to the higher-ranked rider.
#[derive(Debug, Clone)]
pub struct SeriesRanking {
    points_by_name: HashMap<String, f64>,
    names: Vec<String>,
}

impl SeriesRanking {
    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    fn lookup(&self, normalized: &str) -> Option<f64> {
        self.points_by_name.get(normalized).copied()
    }
}

/// Outcome counts for boundary diagnostics.
#[derive(Debug, Clone, Default)]
pub struct MergeReport {
    pub matched: usize,
    pub fuzzy_matched: usize,
    pub unmatched: Vec<String>,
}

/// Read and parse a saved rankings page.
pub fn load_ranking_file(path: impl AsRef<Path>) -> Result<SeriesRanking, MergeError> {
    let html = fs::read_to_string(path.as_ref()).map_err(MergeError::Read)?;
    parse_ranking_table(&html)
}

/// Parse the first table in the page into a ranking.
pub fn parse_ranking_table(html: &str) -> Result<SeriesRanking, MergeError> {
    let table = slice_table(html).ok_or(MergeError::NoTable)?;
    let rows = table_rows(table);
    let mut rows = rows.into_iter();

    let header = rows.next().ok_or(MergeError::NoPointsColumn)?;
    let points_column = cell_texts(header)
        .iter()
        .position(|cell| cell.to_lowercase().contains("points"))
        .ok_or(MergeError::NoPointsColumn)?;

    let mut points_by_name = HashMap::new();
    let mut names = Vec::new();
    for row in rows {
        // Collapsed duplicate rows are marked x-show in the markup; skip them.
        if row.contains("x-show") {
            continue;
        }
        let Some(name) = h3_text(row) else { continue };
        let cells = cell_texts(row);
        let Some(raw_points) = cells.get(points_column) else {
            continue;
        };
        let points = raw_points.trim().parse::<f64>().unwrap_or(0.0);
        let normalized = normalize_name(&name);
        if points_by_name.insert(normalized.clone(), points).is_none() {
            names.push(normalized);
        }
    }

    Ok(SeriesRanking {
        points_by_name,
        names,
    })
}

/// Fill `secondary_points` on each record from the ranking matching its
/// group. Matching is exact on normalized names, then fuzzy above
/// [FUZZY_THRESHOLD]; unmatched riders keep zero points.
pub fn merge_series_points(
    records: &mut [RiderRecord],
    men: &SeriesRanking,
    women: &SeriesRanking,
) -> MergeReport {
    let mut report = MergeReport::default();
    for record in records {
        let ranking = match record.group {
            Group::Male => men,
            Group::Female => women,
        };
        let normalized = normalize_name(&record.name);
        if let Some(points) = ranking.lookup(&normalized) {
            record.secondary_points = points;
            report.matched += 1;
        } else if let Some(close) = fuzzy_best_match(&normalized, &ranking.names) {
            record.secondary_points = ranking.lookup(close).unwrap_or(0.0);
            report.fuzzy_matched += 1;
        } else {
            record.secondary_points = 0.0;
            report.unmatched.push(record.name.clone());
        }
    }
    report
}

/// Lowercase and keep ascii alphanumerics only, so "Bruni, Loïc" and
/// "loic bruni" collapse to comparable keys.
pub fn normalize_name(name: &str) -> String {
    name.to_lowercase()
        .chars()
        .filter(|ch| ch.is_ascii_alphanumeric())
        .collect()
}

fn fuzzy_best_match<'a>(target: &str, candidates: &'a [String]) -> Option<&'a String> {
    let mut best: Option<(&'a String, f64)> = None;
    for candidate in candidates {
        let ratio = similarity(target, candidate);
        if ratio < FUZZY_THRESHOLD {
            continue;
        }
        // Strict greater-than keeps the first (higher-ranked) of equals.
        if best.map_or(true, |(_, best_ratio)| ratio > best_ratio) {
            best = Some((candidate, ratio));
        }
    }
    best.map(|(candidate, _)| candidate)
}

/// Similarity in [0, 1]: doubled length of the recursively matched blocks
/// over the combined length.
fn similarity(a: &str, b: &str) -> f64 {
    let total = a.len() + b.len();
    if total == 0 {
        return 1.0;
    }
    2.0 * matched_len(a.as_bytes(), b.as_bytes()) as f64 / total as f64
}

fn matched_len(a: &[u8], b: &[u8]) -> usize {
    let (a_start, b_start, len) = longest_common_run(a, b);
    if len == 0 {
        return 0;
    }
    len + matched_len(&a[..a_start], &b[..b_start])
        + matched_len(&a[a_start + len..], &b[b_start + len..])
}

fn longest_common_run(a: &[u8], b: &[u8]) -> (usize, usize, usize) {
    let mut best = (0usize, 0usize, 0usize);
    let mut run_lengths = vec![0usize; b.len() + 1];
    for (ai, &a_byte) in a.iter().enumerate() {
        // Walk b backwards so each cell still holds the previous row's value.
        for bi in (0..b.len()).rev() {
            run_lengths[bi + 1] = if b[bi] == a_byte { run_lengths[bi] + 1 } else { 0 };
            let len = run_lengths[bi + 1];
            if len > best.2 {
                best = (ai + 1 - len, bi + 1 - len, len);
            }
        }
    }
    best
}

fn slice_table(html: &str) -> Option<&str> {
    let start = html.find("<table")?;
    let body = &html[start..];
    let end = body.find("</table>")?;
    Some(&body[..end])
}

fn table_rows(table: &str) -> Vec<&str> {
    let mut rows = Vec::new();
    let mut rest = table;
    while let Some(start) = rest.find("<tr") {
        let after = &rest[start..];
        let Some(end) = after.find("</tr>") else { break };
        rows.push(&after[..end]);
        rest = &after[end + "</tr>".len()..];
    }
    rows
}

fn cell_texts(row: &str) -> Vec<String> {
    let mut cells = Vec::new();
    let mut rest = row;
    loop {
        let td = rest.find("<td");
        let th = rest.find("<th");
        let (start, close_tag) = match (td, th) {
            (Some(td), Some(th)) if td < th => (td, "</td>"),
            (Some(td), None) => (td, "</td>"),
            (_, Some(th)) => (th, "</th>"),
            (None, None) => break,
        };
        let after = &rest[start..];
        let Some(content_start) = after.find('>') else { break };
        let content = &after[content_start + 1..];
        let end = content.find(close_tag).unwrap_or(content.len());
        cells.push(strip_tags(&content[..end]));
        rest = &content[end..];
    }
    cells
}

fn h3_text(row: &str) -> Option<String> {
    let start = row.find("<h3")?;
    let after = &row[start..];
    let content_start = after.find('>')?;
    let content = &after[content_start + 1..];
    let end = content.find("</h3>")?;
    Some(strip_tags(&content[..end]))
}

/// Drop markup and collapse whitespace; decodes the handful of entities the
/// feed actually uses.
fn strip_tags(fragment: &str) -> String {
    let mut text = String::with_capacity(fragment.len());
    let mut in_tag = false;
    for ch in fragment.chars() {
        match ch {
            '<' => in_tag = true,
            '>' => in_tag = false,
            _ if !in_tag => text.push(ch),
            _ => {}
        }
    }
    let text = text
        .replace("&amp;", "&")
        .replace("&nbsp;", " ")
        .replace("&#39;", "'");
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
