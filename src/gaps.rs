//! Hourly gap detection and coverage reporting.
//!
//! A gap is an hour-aligned slot in a closed `[start, end]` range with no
//! persisted reading for a source. Existing timestamps are compared at hour
//! granularity, so a provider row stamped 14:23:05 covers the 14:00 slot.

use std::collections::{BTreeMap, HashSet};

use chrono::{Duration, NaiveDate, NaiveDateTime, Timelike};
use serde::Serialize;

use crate::error::{Error, Result};
use crate::models::Source;
use crate::synth::truncate_to_hour;

// ---

/// Maximal run of consecutive missing hours.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GapRun {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub hours: usize,
}

/// Hours present for one calendar day of the range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DayCoverage {
    pub date: NaiveDate,
    pub expected: usize,
    pub present: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Coverage {
    pub source: Source,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub expected_hours: usize,
    pub actual_hours: usize,
    pub missing_hours: usize,
    pub coverage_percent: f64,
    pub earliest: Option<NaiveDateTime>,
    pub latest: Option<NaiveDateTime>,
    pub runs: Vec<GapRun>,
    pub days: Vec<DayCoverage>,
}

/// Widest range accepted by default: five years of hourly slots.
pub const DEFAULT_MAX_RANGE_HOURS: u32 = 5 * 366 * 24;

/// Reject ranges that cannot describe any hourly window, that end in the
/// last representable hour, or that span more than `max_hours`.
pub fn validate_range(start: NaiveDateTime, end: NaiveDateTime, max_hours: u32) -> Result<()> {
    // ---
    if start > end {
        return Err(Error::InvalidInput(format!(
            "range start {start} is after end {end}"
        )));
    }
    if next_hour(truncate_to_hour(end)).is_none() {
        return Err(Error::InvalidInput(format!(
            "range end {end} is outside the supported calendar"
        )));
    }
    let span = (end - start).num_hours();
    if span > i64::from(max_hours) {
        return Err(Error::InvalidInput(format!(
            "range spans {span} hours, the limit is {max_hours}"
        )));
    }
    Ok(())
}

/// The following hour, or `None` past the end of the calendar.
pub fn next_hour(ts: NaiveDateTime) -> Option<NaiveDateTime> {
    ts.checked_add_signed(Duration::hours(1))
}

/// Every hour-aligned timestamp in `[start, end]`, ascending.
///
/// The first slot is `start` rounded up to the hour so that no slot falls
/// before `start`. An inverted range yields nothing.
pub fn hourly_slots(start: NaiveDateTime, end: NaiveDateTime) -> Vec<NaiveDateTime> {
    // ---
    let mut next = Some(truncate_to_hour(start));
    if next.is_some_and(|first| first < start) {
        next = next.and_then(next_hour);
    }

    let mut slots = Vec::new();
    while let Some(current) = next.filter(|slot| *slot <= end) {
        slots.push(current);
        next = next_hour(current);
    }
    slots
}

/// Normalize stored timestamps to their hour bucket.
pub fn hour_buckets<I>(timestamps: I) -> HashSet<NaiveDateTime>
where
    I: IntoIterator<Item = NaiveDateTime>,
{
    timestamps.into_iter().map(truncate_to_hour).collect()
}

/// Ordered hourly slots of `[start, end]` with no existing reading for
/// `source`. Timestamps outside the range are ignored.
pub fn missing_slots(
    source: Source,
    start: NaiveDateTime,
    end: NaiveDateTime,
    existing: &HashSet<NaiveDateTime>,
) -> Vec<NaiveDateTime> {
    // ---
    let present = hour_buckets(existing.iter().copied());
    let missing: Vec<NaiveDateTime> = hourly_slots(start, end)
        .into_iter()
        .filter(|slot| !present.contains(slot))
        .collect();

    tracing::debug!(
        source = %source,
        %start,
        %end,
        missing = missing.len(),
        "computed missing slots"
    );
    missing
}

/// Group ascending slots into maximal runs; neighbours exactly one hour
/// apart share a run.
pub fn group_runs(slots: &[NaiveDateTime]) -> Vec<GapRun> {
    // ---
    let mut runs: Vec<GapRun> = Vec::new();
    for &slot in slots {
        match runs.last_mut() {
            Some(run) if slot - run.end == Duration::hours(1) => {
                run.end = slot;
                run.hours += 1;
            }
            _ => runs.push(GapRun {
                start: slot,
                end: slot,
                hours: 1,
            }),
        }
    }
    runs
}

/// Coverage summary for a source over `[start, end]`.
pub fn coverage(
    source: Source,
    start: NaiveDateTime,
    end: NaiveDateTime,
    existing: &HashSet<NaiveDateTime>,
) -> Coverage {
    // ---
    let slots = hourly_slots(start, end);
    let present = hour_buckets(existing.iter().copied());

    let mut days: BTreeMap<NaiveDate, DayCoverage> = BTreeMap::new();
    let mut missing = Vec::new();
    let mut earliest = None;
    let mut latest = None;

    for &slot in &slots {
        let day = days.entry(slot.date()).or_insert(DayCoverage {
            date: slot.date(),
            expected: 0,
            present: 0,
        });
        day.expected += 1;

        if present.contains(&slot) {
            day.present += 1;
            earliest = earliest.or(Some(slot));
            latest = Some(slot);
        } else {
            missing.push(slot);
        }
    }

    let expected_hours = slots.len();
    let missing_hours = missing.len();
    let actual_hours = expected_hours - missing_hours;
    let coverage_percent = if expected_hours > 0 {
        actual_hours as f64 / expected_hours as f64 * 100.0
    } else {
        0.0
    };

    Coverage {
        source,
        start,
        end,
        expected_hours,
        actual_hours,
        missing_hours,
        coverage_percent,
        earliest,
        latest,
        runs: group_runs(&missing),
        days: days.into_values().collect(),
    }
}

impl Coverage {
    pub fn is_complete(&self) -> bool {
        self.missing_hours == 0
    }

    /// Days with at least one missing hour.
    pub fn incomplete_days(&self) -> impl Iterator<Item = &DayCoverage> {
        self.days.iter().filter(|d| d.present < d.expected)
    }
}

/// One-line description of a run for log output.
pub fn describe_run(run: &GapRun) -> String {
    // ---
    if run.hours == 1 {
        format!("single hour {}", run.start)
    } else {
        format!(
            "{} to {} ({} hours, {:02}:00-{:02}:00)",
            run.start,
            run.end,
            run.hours,
            run.start.hour(),
            run.end.hour()
        )
    }
}
