//! Independent detectors over lowercased question text.
//!
//! Each matcher is a pure function returning at most one filter. Matchers
//! report faults (a pattern that failed to compile, an out-of-range number)
//! as errors; [`collect_filters`] logs them and treats the matcher as silent.

use chrono::{Datelike, Days, NaiveDate};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use crate::error::{CompileError, Result};
use crate::intent::{Action, FilterOp, FilterSpec};
use crate::normalize::Normalized;

pub(crate) type LazyPattern = Lazy<std::result::Result<Regex, regex::Error>>;

/// Borrow a lazily compiled pattern, surfacing a compile failure as a fault.
pub(crate) fn compiled<'a>(pattern: &'a LazyPattern, name: &str) -> Result<&'a Regex> {
    pattern
        .as_ref()
        .map_err(|e| CompileError::InternalFault(format!("{name} pattern: {e}")))
}

pub(crate) fn parse_count(digits: &str) -> Result<u64> {
    digits
        .parse()
        .map_err(|e| CompileError::InternalFault(format!("number {digits} out of range: {e}")))
}

// ============================================================================
// Intent
// ============================================================================

/// Checked in order; COUNT-family phrases outrank SELECT-family ones.
const INTENT_KEYWORDS: &[(Action, &[&str])] = &[
    (
        Action::Count,
        &["count", "how many", "total number", "number of"],
    ),
    (
        Action::Select,
        &[
            "show", "display", "find", "search", "list", "get", "what", "which", "analyze",
            "top", "most", "track", "monitor",
        ],
    ),
];

pub fn match_intent(input: &Normalized) -> Action {
    INTENT_KEYWORDS
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|k| input.mentions(k)))
        .map(|(action, _)| *action)
        .unwrap_or(Action::Select)
}

// ============================================================================
// Numeric comparisons
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Metric {
    Stars,
    Forks,
}

impl Metric {
    pub const ALL: [Metric; 2] = [Metric::Stars, Metric::Forks];

    pub fn column(self) -> &'static str {
        match self {
            Metric::Stars => "stars",
            Metric::Forks => "forks",
        }
    }
}

static STARS: LazyPattern = Lazy::new(|| Regex::new(&quantity_pattern("stars")));
static FORKS: LazyPattern = Lazy::new(|| Regex::new(&quantity_pattern("forks")));
static STARS_BETWEEN: LazyPattern = Lazy::new(|| Regex::new(&between_pattern("stars")));
static FORKS_BETWEEN: LazyPattern = Lazy::new(|| Regex::new(&between_pattern("forks")));

const GREATER: &str = r"(?:more|greater|higher)\s+than|over|above|at\s+least";
const LESS: &str = r"(?:less|fewer|lower)\s+than|under|below|at\s+most";
const EXACT: &str = r"exactly|equal\s+to";
/// Plain digits or comma-grouped thousands ("1,000").
const NUMBER: &str = r"\d{1,3}(?:,\d{3})+|\d+";

fn quantity_pattern(metric: &str) -> String {
    format!(r"(?:\b(?P<gt>{GREATER})\s+|\b(?P<lt>{LESS})\s+|\b(?P<eq>{EXACT})\s+)?(?P<n>{NUMBER})\s*{metric}\b")
}

fn between_pattern(metric: &str) -> String {
    format!(r"\bbetween\s+(?P<lo>{NUMBER})\s+and\s+(?P<hi>{NUMBER})\s*{metric}\b")
}

fn parse_quantity(digits: &str) -> Result<u64> {
    parse_count(&digits.replace(',', ""))
}

/// First match whose `group` is a whole number, not the tail of "1,0000".
fn first_whole<'t>(pattern: &Regex, text: &'t str, group: &str) -> Option<Captures<'t>> {
    pattern.captures_iter(text).find(|caps| {
        caps.name(group).is_some_and(|m| {
            !text[..m.start()].ends_with(|c: char| c == ',' || c.is_ascii_digit())
        })
    })
}

/// Direction stated right before the number, else anywhere in the question.
fn direction(caps: &Captures, text: &str) -> FilterOp {
    if caps.name("gt").is_some() {
        FilterOp::Gte
    } else if caps.name("lt").is_some() {
        FilterOp::Lte
    } else if caps.name("eq").is_some() {
        FilterOp::Eq
    } else if text.contains("more than") || text.contains("greater than") {
        FilterOp::Gte
    } else if text.contains("less than") {
        FilterOp::Lte
    } else {
        FilterOp::Eq
    }
}

/// `<number> stars|forks` with an optional directional phrase, or a
/// `between <lo> and <hi>` range.
pub fn match_comparison(text: &str, metric: Metric) -> Result<Option<FilterSpec>> {
    let (quantity, between) = match metric {
        Metric::Stars => (&STARS, &STARS_BETWEEN),
        Metric::Forks => (&FORKS, &FORKS_BETWEEN),
    };
    let column = metric.column();

    if let Some(caps) = first_whole(compiled(between, column)?, text, "lo") {
        let lo = parse_quantity(&caps["lo"])?;
        let hi = parse_quantity(&caps["hi"])?;
        return Ok(Some(FilterSpec::between(column, lo.min(hi), lo.max(hi))));
    }

    let Some(caps) = first_whole(compiled(quantity, column)?, text, "n") else {
        return Ok(None);
    };
    let n = parse_quantity(&caps["n"])?;
    Ok(Some(FilterSpec::number(column, direction(&caps, text), n)))
}

// ============================================================================
// Time windows
// ============================================================================

/// Column time-window filters target unless the entity names another one.
pub const DEFAULT_TIME_COLUMN: &str = "created_at";

static NAMED_WINDOW: LazyPattern =
    Lazy::new(|| Regex::new(r"\b(?:today|yesterday|(?:this|last)\s+(?:week|month|year))\b"));
static RELATIVE_WINDOW: LazyPattern =
    Lazy::new(|| Regex::new(r"\b(?P<n>\d+)\s*(?P<unit>day|week|month|year)s?\b(?:\s+ago\b)?"));

/// Resolve a time phrase into a `created_at >= <date>` cutoff relative to `today`.
///
/// Months and years are approximated as 30 and 365 days.
pub fn match_time_window(text: &str, today: NaiveDate) -> Result<Option<FilterSpec>> {
    let cutoff = if let Some(m) = compiled(&NAMED_WINDOW, "time window")?.find(text) {
        let phrase: Vec<&str> = m.as_str().split_whitespace().collect();
        named_cutoff(&phrase, today)?
    } else if let Some(caps) = compiled(&RELATIVE_WINDOW, "relative time")?.captures(text) {
        let n = parse_count(&caps["n"])?;
        let per_unit = match &caps["unit"] {
            "day" => 1,
            "week" => 7,
            "month" => 30,
            _ => 365,
        };
        let days = n
            .checked_mul(per_unit)
            .ok_or_else(|| CompileError::InternalFault(format!("{n} {} overflows", &caps["unit"])))?;
        days_before(today, days)?
    } else {
        return Ok(None);
    };
    Ok(Some(FilterSpec::date(DEFAULT_TIME_COLUMN, cutoff)))
}

fn named_cutoff(phrase: &[&str], today: NaiveDate) -> Result<NaiveDate> {
    let weekday = u64::from(today.weekday().num_days_from_monday());
    match phrase {
        ["today"] => Ok(today),
        ["yesterday"] => days_before(today, 1),
        ["this", "week"] => days_before(today, weekday),
        ["last", "week"] => days_before(today, weekday + 7),
        ["this", "month"] => first_of_month(today.year(), today.month()),
        ["last", "month"] => match today.month() {
            1 => first_of_month(today.year() - 1, 12),
            m => first_of_month(today.year(), m - 1),
        },
        ["this", "year"] => first_of_month(today.year(), 1),
        ["last", "year"] => first_of_month(today.year() - 1, 1),
        other => Err(CompileError::InternalFault(format!(
            "unhandled time phrase {}",
            other.join(" ")
        ))),
    }
}

fn days_before(today: NaiveDate, days: u64) -> Result<NaiveDate> {
    today
        .checked_sub_days(Days::new(days))
        .ok_or_else(|| CompileError::InternalFault(format!("{days} days before {today} is out of range")))
}

fn first_of_month(year: i32, month: u32) -> Result<NaiveDate> {
    NaiveDate::from_ymd_opt(year, month, 1)
        .ok_or_else(|| CompileError::InternalFault(format!("invalid month {year}-{month}")))
}

// ============================================================================
// Status
// ============================================================================

static STATUS: LazyPattern = Lazy::new(|| Regex::new(r"\b(open|closed|merged|pending)\b"));

pub fn match_status(text: &str) -> Result<Option<FilterSpec>> {
    Ok(compiled(&STATUS, "status")?
        .captures(text)
        .map(|caps| FilterSpec::text("state", FilterOp::Eq, &caps[1])))
}

// ============================================================================
// Collection
// ============================================================================

/// Run every matcher; each fault only silences the matcher that raised it.
pub fn collect_filters(text: &str, today: NaiveDate) -> Vec<FilterSpec> {
    let mut filters = Vec::new();
    for metric in Metric::ALL {
        filters.extend(soft(metric.column(), match_comparison(text, metric)));
    }
    filters.extend(soft("time window", match_time_window(text, today)));
    filters.extend(soft("status", match_status(text)));
    filters
}

fn soft(matcher: &str, outcome: Result<Option<FilterSpec>>) -> Option<FilterSpec> {
    match outcome {
        Ok(found) => found,
        Err(e) => {
            tracing::warn!(matcher = %matcher, error = %e, "matcher failed, ignoring it");
            None
        }
    }
}
