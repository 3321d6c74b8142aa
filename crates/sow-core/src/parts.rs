//! Time of day in parts: eighteen 80-minute parts counted from sunrise.

use chrono::{NaiveTime, Timelike};
use serde::Serialize;

use crate::error::{CalendarError, CalendarResult};

pub const PARTS_PER_DAY: u32 = 18;
pub const MINUTES_PER_PART: u32 = 80;
pub const MINUTES_PER_DAY: f64 = 1440.0;

const DEGREES_PER_PART: f64 = 360.0 / PARTS_PER_DAY as f64;
const HAND_ORIGIN_DEGREES: f64 = 90.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CreatorTime {
    pub part: u32,
    /// 1-based minute within the part.
    pub minute: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PartReading {
    pub time: CreatorTime,
    pub elapsed_minutes: f64,
    pub progress: f64,
    pub hand_angle: f64,
    pub display_text: String,
}

pub fn minutes_of_day(time: NaiveTime) -> f64 {
    f64::from(time.num_seconds_from_midnight()) / 60.0 + f64::from(time.nanosecond()) / 60e9
}

/// Fractional minutes since the most recent sunrise, in `[0, 1440)`.
pub fn minutes_since_sunrise(local: NaiveTime, sunrise: NaiveTime) -> f64 {
    let elapsed = (minutes_of_day(local) - minutes_of_day(sunrise)).rem_euclid(MINUTES_PER_DAY);
    // rem_euclid can round up to the modulus itself
    if elapsed >= MINUTES_PER_DAY { 0.0 } else { elapsed }
}

#[tracing::instrument(level = "trace")]
pub fn creator_time(local: NaiveTime, sunrise: NaiveTime) -> PartReading {
    reading_for(minutes_since_sunrise(local, sunrise))
}

/// Reading for an explicit number of minutes since sunrise.
pub fn creator_time_from_elapsed(elapsed_minutes: f64) -> CalendarResult<PartReading> {
    if !elapsed_minutes.is_finite() || !(0.0..MINUTES_PER_DAY).contains(&elapsed_minutes) {
        return Err(CalendarError::OutOfRange {
            what: "minutes since sunrise",
            value: elapsed_minutes,
        });
    }
    Ok(reading_for(elapsed_minutes))
}

fn reading_for(elapsed: f64) -> PartReading {
    let per_part = f64::from(MINUTES_PER_PART);
    let part = ((elapsed / per_part).floor() as u32 + 1).min(PARTS_PER_DAY);
    let offset = elapsed - f64::from(part - 1) * per_part;
    let minute = (offset.floor() as u32 + 1).min(MINUTES_PER_PART);
    let time = CreatorTime { part, minute };

    PartReading {
        time,
        elapsed_minutes: elapsed,
        progress: elapsed / MINUTES_PER_DAY,
        hand_angle: hand_angle(part, offset),
        display_text: format!("{} part {} min", ordinal(part), ordinal(minute)),
    }
}

/// Anti-clockwise clock-hand angle; part 1 starts at 90 degrees and each
/// part sweeps 20 degrees.
pub fn hand_angle(part: u32, minute_offset: f64) -> f64 {
    let swept = f64::from(part.saturating_sub(1)) * DEGREES_PER_PART
        + (minute_offset / f64::from(MINUTES_PER_PART)) * DEGREES_PER_PART;
    HAND_ORIGIN_DEGREES - swept
}

pub fn ordinal(n: u32) -> String {
    let suffix = match (n % 10, n % 100) {
        (_, 11..=13) => "th",
        (1, _) => "st",
        (2, _) => "nd",
        (3, _) => "rd",
        _ => "th",
    };
    format!("{n}{suffix}")
}
