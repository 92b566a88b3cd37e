//! Exercise-log query engine: predicate assembly, projection, date display.
//!
//! A query runs in a fixed order: filter by the date predicate, slice to the
//! first N survivors, then render each date as a calendar day. The order is
//! part of the contract; the limit is positional over the filtered sequence,
//! never "most recent N".

use crate::error::{Error, Result};
use crate::model::{LogEntry, User};
use chrono::{DateTime, Duration, Local, NaiveDate, NaiveTime, Utc};
use serde::Serialize;

/// Typed query parameters. The HTTP boundary parses the raw strings into
/// this; the engine itself never sees a string.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogQuery {
    /// Inclusive lower bound.
    pub from: Option<NaiveDate>,
    /// Inclusive upper bound.
    pub to: Option<NaiveDate>,
    /// Keep only the first N filtered entries.
    pub limit: Option<usize>,
}

impl LogQuery {
    /// Parse raw query strings. Empty strings mean "unbounded". An
    /// unparsable limit also means "unbounded" (deliberate leniency,
    /// mirroring the behavior this service replaces), while an unparsable
    /// date is rejected outright.
    pub fn parse(from: Option<&str>, to: Option<&str>, limit: Option<&str>) -> Result<Self> {
        Ok(Self {
            from: parse_bound("from", from)?,
            to: parse_bound("to", to)?,
            limit: limit
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .and_then(|s| s.parse::<usize>().ok()),
        })
    }
}

fn parse_bound(field: &str, raw: Option<&str>) -> Result<Option<NaiveDate>> {
    match raw.map(str::trim) {
        None => Ok(None),
        Some("") => Ok(None),
        Some(s) => parse_date(field, s).map(Some),
    }
}

fn parse_date(field: &str, raw: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|_| {
        Error::InvalidArgument(format!("invalid {field} date '{raw}', expected YYYY-MM-DD"))
    })
}

/// Date for a new entry: empty means "now", otherwise a calendar date taken
/// as midnight UTC.
pub fn parse_entry_date(raw: &str) -> Result<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(Utc::now());
    }
    parse_date("date", raw).map(day_start)
}

/// The instant a date-only value denotes.
fn day_start(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::MIN).and_utc()
}

/// AND-combination of date-bound clauses over stored instants. No clauses
/// means accept-all; there is no OR mode and no exclusive bound.
pub struct EntryFilter {
    clauses: Vec<Box<dyn Fn(&LogEntry) -> bool + Send + Sync>>,
}

impl EntryFilter {
    /// Each present bound contributes one inclusive conjunctive clause.
    /// Comparison is on the stored instant; display normalization happens
    /// later and separately.
    pub fn from_bounds(from: Option<NaiveDate>, to: Option<NaiveDate>) -> Self {
        let mut clauses: Vec<Box<dyn Fn(&LogEntry) -> bool + Send + Sync>> = Vec::new();
        if let Some(from) = from {
            let min = day_start(from);
            clauses.push(Box::new(move |e: &LogEntry| e.date >= min));
        }
        if let Some(to) = to {
            let max = day_start(to);
            clauses.push(Box::new(move |e: &LogEntry| e.date <= max));
        }
        Self { clauses }
    }

    pub fn accepts(&self, entry: &LogEntry) -> bool {
        self.clauses.iter().all(|clause| clause(entry))
    }
}

/// A log entry rendered for a response payload.
#[derive(Debug, PartialEq, Serialize)]
pub struct ProjectedEntry {
    pub description: String,
    pub duration: u32,
    pub date: String,
}

/// One user's filtered, sliced, display-normalized log view.
#[derive(Debug, Serialize)]
pub struct LogView {
    #[serde(rename = "_id")]
    pub id: String,
    pub username: String,
    /// Length of `log` below, recomputed per response.
    pub count: usize,
    pub log: Vec<ProjectedEntry>,
}

/// Project one user's log through the pipeline: filter, positional limit,
/// calendar-day display. Exactly one user's view per call.
pub fn project(user: &User, query: &LogQuery) -> LogView {
    let filter = EntryFilter::from_bounds(query.from, query.to);
    let mut entries: Vec<&LogEntry> = user.log.iter().filter(|e| filter.accepts(e)).collect();
    if let Some(limit) = query.limit {
        entries.truncate(limit);
    }
    let log: Vec<ProjectedEntry> = entries
        .into_iter()
        .map(|e| ProjectedEntry {
            description: e.description.clone(),
            duration: e.duration,
            date: calendar_day(e.date),
        })
        .collect();
    LogView {
        id: user.id.clone(),
        username: user.username.clone(),
        count: log.len(),
        log,
    }
}

/// Calendar-day rendering, e.g. `Tue Jan 01 2019`. Bulk query responses use
/// the stored UTC instant as-is.
fn calendar_day(instant: DateTime<Utc>) -> String {
    instant.format("%a %b %d %Y").to_string()
}

/// Calendar day for the single-append confirmation. The stored instant is
/// first shifted forward by one hour plus the host's UTC offset, which
/// cancels the day rollback seen on hosts behind UTC. The bulk query path
/// above deliberately does not apply this shift; the two render paths
/// disagree by one calendar day near midnight and that asymmetry is kept.
pub fn confirmation_day(instant: DateTime<Utc>) -> String {
    shifted_day(instant, local_offset_hours())
}

fn shifted_day(instant: DateTime<Utc>, offset_hours: i64) -> String {
    calendar_day(instant + Duration::hours(1 + offset_hours))
}

/// Hours the host clock lags UTC: 0 on UTC hosts, 5 on UTC-5, -2 on UTC+2.
fn local_offset_hours() -> i64 {
    let east_seconds = Local::now().offset().local_minus_utc() as i64;
    -east_seconds / 3600
}
