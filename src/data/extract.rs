//! Extract the embedded athlete payload from a saved fantasy roster page.
//!
//! The page defines `let aAthletesKeyed = {...};` inline. The object is
//! sliced out with brace matching (string-aware, so braces inside values do
//! not confuse it), trailing commas are dropped, and the remainder parses as
//! JSON. Athletes are keyed by id; output follows key order, so repeated
//! extractions of the same page agree byte for byte.

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::Path;

use serde::Deserialize;
use serde_json::Value;

use crate::data::rider::{Group, RiderRecord};

const PAYLOAD_MARKER: &str = "aAthletesKeyed";

#[derive(Debug)]
pub enum ExtractError {
    Read(std::io::Error),
    MissingPayload,
    Parse(serde_json::Error),
}

impl fmt::Display for ExtractError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Read(err) => write!(f, "failed to read roster page: {err}"),
            Self::MissingPayload => {
                write!(f, "could not find the {PAYLOAD_MARKER} payload in the page")
            }
            Self::Parse(err) => write!(f, "failed to parse athlete payload: {err}"),
        }
    }
}

impl std::error::Error for ExtractError {}

/// One athlete entry as found in the payload. The export is loosely typed:
/// numbers arrive as strings or numbers depending on the page build.
#[derive(Debug, Deserialize)]
struct AthleteEntry {
    #[serde(default)]
    firstname: String,
    #[serde(default)]
    lastname: String,
    #[serde(default)]
    value: Option<Value>,
    #[serde(default)]
    totalpoints: Option<Value>,
    #[serde(default)]
    gender: Option<Value>,
    #[serde(default)]
    injury: Option<Value>,
}

/// Read a saved roster page and extract its rider records.
pub fn extract_athletes_from_file(path: impl AsRef<Path>) -> Result<Vec<RiderRecord>, ExtractError> {
    let html = fs::read_to_string(path.as_ref()).map_err(ExtractError::Read)?;
    extract_athletes(&html)
}

/// Extract rider records from the page markup.
pub fn extract_athletes(html: &str) -> Result<Vec<RiderRecord>, ExtractError> {
    let payload = payload_slice(html).ok_or(ExtractError::MissingPayload)?;
    let cleaned = strip_trailing_commas(payload);
    let keyed: BTreeMap<String, AthleteEntry> =
        serde_json::from_str(&cleaned).map_err(ExtractError::Parse)?;

    Ok(keyed.values().map(athlete_to_record).collect())
}

fn athlete_to_record(athlete: &AthleteEntry) -> RiderRecord {
    let name = format!("{} {}", athlete.firstname.trim(), athlete.lastname.trim())
        .trim()
        .to_string();
    RiderRecord {
        name,
        cost: loose_number(&athlete.value) as i64,
        primary_points: loose_number(&athlete.totalpoints),
        group: gender_of(&athlete.gender),
        secondary_points: 0.0,
        unavailable: is_truthy(&athlete.injury),
    }
}

/// Locate the payload object after the marker and slice it out by matching
/// braces outside of string literals.
fn payload_slice(html: &str) -> Option<&str> {
    let marker = html.find(PAYLOAD_MARKER)?;
    let after = &html[marker + PAYLOAD_MARKER.len()..];
    let assign = after.find('=')?;
    let body = &after[assign + 1..];
    let open = body.find('{')?;

    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    for (offset, ch) in body[open..].char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&body[open..open + offset + ch.len_utf8()]);
                }
            }
            _ => {}
        }
    }
    None
}

/// Drop commas that directly precede a closing brace/bracket (legal in JS,
/// not in JSON). String contents are left untouched.
fn strip_trailing_commas(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut in_string = false;
    let mut escaped = false;
    let chars: Vec<char> = raw.chars().collect();
    for (index, &ch) in chars.iter().enumerate() {
        if in_string {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
            }
            out.push(ch);
            continue;
        }
        if ch == '"' {
            in_string = true;
            out.push(ch);
            continue;
        }
        if ch == ',' {
            let next = chars[index + 1..].iter().find(|c| !c.is_whitespace());
            if matches!(next, Some('}') | Some(']')) {
                continue;
            }
        }
        out.push(ch);
    }
    out
}

/// Numeric coercion over the loosely typed export: strings parse, anything
/// else reads as 0.
fn loose_number(value: &Option<Value>) -> f64 {
    match value {
        Some(Value::Number(number)) => number.as_f64().unwrap_or(0.0),
        Some(Value::String(raw)) => raw.trim().parse::<f64>().unwrap_or(0.0),
        _ => 0.0,
    }
}

/// Gender code `2` (string or number) marks a female athlete.
fn gender_of(value: &Option<Value>) -> Group {
    let is_female = match value {
        Some(Value::String(raw)) => raw.trim() == "2",
        Some(Value::Number(number)) => number.as_i64() == Some(2),
        _ => false,
    };
    if is_female {
        Group::Female
    } else {
        Group::Male
    }
}

fn is_truthy(value: &Option<Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Bool(flag)) => *flag,
        Some(Value::Number(number)) => number.as_f64().map_or(false, |n| n != 0.0),
        Some(Value::String(raw)) => !raw.is_empty(),
        Some(Value::Array(items)) => !items.is_empty(),
        Some(Value::Object(entries)) => !entries.is_empty(),
    }
}
