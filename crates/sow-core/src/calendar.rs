//! Epoch date conversion: Gregorian instants to creator calendar dates.
//!
//! The creator year starts on the Gregorian date 2025-03-20 (year 6028,
//! month 1, day 1) and is made of twelve fixed-length months. Days begin at
//! local sunrise rather than midnight.

use std::fmt;
use std::str::FromStr;

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use chrono_tz::Tz;
use serde::Serialize;

use crate::error::{CalendarError, CalendarResult};

pub const EPOCH_YEAR: i64 = 6028;

pub const EPOCH_DATE: NaiveDate = match NaiveDate::from_ymd_opt(2025, 3, 20) {
    Some(date) => date,
    None => panic!("epoch date must be valid"),
};

pub const DEFAULT_SUNRISE: NaiveTime = match NaiveTime::from_hms_opt(5, 20, 0) {
    Some(time) => time,
    None => panic!("default sunrise must be valid"),
};

pub const MONTH_LENGTHS: [u32; 12] = [30, 30, 31, 30, 30, 31, 30, 30, 31, 30, 30, 31];

/// Days covered by the month table.
pub const CIVIL_YEAR_DAYS: u32 = 364;

/// Day-of-year 1 lands on the 4th day of the week.
const WEEKDAY_OFFSET: u32 = 3;

pub const SABBATH: u32 = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum YearRule {
    /// 364-day years, every day inside the month table.
    #[default]
    Civil364,
    /// 365-day years; the final day of each year is an overflow day.
    Solar365,
}

impl YearRule {
    pub fn days(self) -> u32 {
        match self {
            Self::Civil364 => CIVIL_YEAR_DAYS,
            Self::Solar365 => CIVIL_YEAR_DAYS + 1,
        }
    }
}

impl FromStr for YearRule {
    type Err = CalendarError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "364" | "civil" => Ok(Self::Civil364),
            "365" | "solar" => Ok(Self::Solar365),
            other => Err(CalendarError::InvalidSetting {
                key: "calendar.year_rule".to_string(),
                value: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for YearRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.days())
    }
}

/// Parses an `HH:MM` sunrise setting.
pub fn parse_sunrise(raw: &str) -> CalendarResult<NaiveTime> {
    NaiveTime::parse_from_str(raw.trim(), "%H:%M").map_err(|_| CalendarError::InvalidSetting {
        key: "calendar.sunrise".to_string(),
        value: raw.to_string(),
    })
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CalendarSettings {
    pub timezone: Tz,
    pub sunrise: NaiveTime,
    pub year_rule: YearRule,
}

impl Default for CalendarSettings {
    fn default() -> Self {
        Self {
            timezone: chrono_tz::UTC,
            sunrise: DEFAULT_SUNRISE,
            year_rule: YearRule::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DayKind {
    Regular,
    Overflow,
}

impl fmt::Display for DayKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Regular => f.write_str("regular"),
            Self::Overflow => f.write_str("overflow"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CreatorDate {
    pub year: i64,
    pub month: u32,
    pub day: u32,
    pub week_day: u32,
    pub day_of_year: u32,
    pub kind: DayKind,
}

impl CreatorDate {
    pub fn is_sabbath(&self) -> bool {
        self.week_day == SABBATH
    }
}

/// Gregorian date whose sunrise opens the creator day containing `local`.
pub fn effective_date(local: NaiveDateTime, sunrise: NaiveTime) -> CalendarResult<NaiveDate> {
    let date = local.date();
    if local.time() >= sunrise {
        return Ok(date);
    }
    date.pred_opt()
        .ok_or_else(|| CalendarError::InvalidInstant(format!("no day precedes {date}")))
}

#[tracing::instrument(level = "trace", skip(settings))]
pub fn creator_date(
    local: NaiveDateTime,
    settings: &CalendarSettings,
) -> CalendarResult<CreatorDate> {
    let date = effective_date(local, settings.sunrise)?;
    let total_days = date.signed_duration_since(EPOCH_DATE).num_days();
    if total_days < 0 {
        return Err(CalendarError::BeforeEpoch { date });
    }
    from_day_count(total_days, settings.year_rule)
}

/// Converts a count of whole days since the epoch into a creator date.
pub fn from_day_count(total_days: i64, rule: YearRule) -> CalendarResult<CreatorDate> {
    if total_days < 0 {
        return Err(CalendarError::OutOfRange {
            what: "day count",
            value: total_days as f64,
        });
    }

    let year_length = i64::from(rule.days());
    let year = EPOCH_YEAR + total_days / year_length;
    let remaining = (total_days % year_length) as u32;

    if remaining >= CIVIL_YEAR_DAYS {
        let day_of_year = remaining + 1;
        return Ok(CreatorDate {
            year,
            month: 12,
            day: MONTH_LENGTHS[11],
            week_day: week_day(day_of_year),
            day_of_year,
            kind: DayKind::Overflow,
        });
    }

    let (month, day) = month_day(remaining + 1).ok_or(CalendarError::OutOfRange {
        what: "day of year",
        value: f64::from(remaining + 1),
    })?;

    Ok(CreatorDate {
        year,
        month,
        day,
        week_day: week_day(remaining + 1),
        day_of_year: remaining + 1,
        kind: DayKind::Regular,
    })
}

pub fn week_day(day_of_year: u32) -> u32 {
    ((day_of_year - 1 + WEEKDAY_OFFSET) % 7) + 1
}

/// Splits a 1-based day of year into `(month, day)` via the month table.
pub fn month_day(day_of_year: u32) -> Option<(u32, u32)> {
    if day_of_year == 0 {
        return None;
    }
    let mut left = day_of_year;
    for (idx, len) in MONTH_LENGTHS.iter().enumerate() {
        if left <= *len {
            return Some((idx as u32 + 1, left));
        }
        left -= len;
    }
    None
}

pub fn day_of_year(month: u32, day: u32) -> Option<u32> {
    let idx = usize::try_from(month.checked_sub(1)?).ok()?;
    let len = *MONTH_LENGTHS.get(idx)?;
    if day == 0 || day > len {
        return None;
    }
    Some(MONTH_LENGTHS[..idx].iter().sum::<u32>() + day)
}

/// Gregorian date on whose sunrise the given creator day begins.
pub fn gregorian_date(year: i64, day_of_year: u32, rule: YearRule) -> CalendarResult<NaiveDate> {
    if year < EPOCH_YEAR {
        return Err(CalendarError::OutOfRange {
            what: "creator year",
            value: year as f64,
        });
    }
    if day_of_year == 0 || day_of_year > rule.days() {
        return Err(CalendarError::OutOfRange {
            what: "day of year",
            value: f64::from(day_of_year),
        });
    }

    let offset = (year - EPOCH_YEAR)
        .checked_mul(i64::from(rule.days()))
        .and_then(|days| days.checked_add(i64::from(day_of_year - 1)))
        .and_then(Duration::try_days)
        .ok_or(CalendarError::OutOfRange {
            what: "creator year",
            value: year as f64,
        })?;

    EPOCH_DATE
        .checked_add_signed(offset)
        .ok_or(CalendarError::OutOfRange {
            what: "creator year",
            value: year as f64,
        })
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, NaiveDateTime};

    use super::*;

    fn at(y: i32, m: u32, d: u32, hh: u32, mm: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .and_then(|date| date.and_hms_opt(hh, mm, 0))
            .expect("valid test datetime")
    }

    #[test]
    fn month_table_covers_civil_year() {
        assert_eq!(MONTH_LENGTHS.iter().sum::<u32>(), CIVIL_YEAR_DAYS);
    }

    #[test]
    fn epoch_after_sunrise_is_first_day() {
        let date = creator_date(at(2025, 3, 20, 5, 21), &CalendarSettings::default())
            .expect("epoch converts");
        assert_eq!(
            date,
            CreatorDate {
                year: 6028,
                month: 1,
                day: 1,
                week_day: 4,
                day_of_year: 1,
                kind: DayKind::Regular,
            }
        );
    }

    #[test]
    fn first_day_of_year_is_fourth_weekday() {
        assert_eq!(week_day(1), 4);
        assert_eq!(week_day(4), 7);
        assert_eq!(week_day(5), 1);
        for doy in 1..=357 {
            assert_eq!(week_day(doy), week_day(doy + 7));
        }
    }

    #[test]
    fn year_rolls_over_after_364_days() {
        let settings = CalendarSettings::default();
        let date = creator_date(at(2026, 3, 19, 12, 0), &settings).expect("rollover");
        assert_eq!(date.year, 6029);
        assert_eq!(date.month, 1);
        assert_eq!(date.day, 1);
        assert_eq!(date.day_of_year, 1);

        let last = creator_date(at(2026, 3, 18, 12, 0), &settings).expect("last day");
        assert_eq!((last.year, last.month, last.day), (6028, 12, 31));
        assert_eq!(last.day_of_year, 364);
    }

    #[test]
    fn day_boundary_is_sunrise_not_midnight() {
        let settings = CalendarSettings::default();
        let before = creator_date(at(2025, 4, 2, 4, 59), &settings).expect("before sunrise");
        let after = creator_date(at(2025, 4, 2, 5, 20), &settings).expect("at sunrise");
        assert_eq!(after.day_of_year, before.day_of_year + 1);

        let midnight = creator_date(at(2025, 4, 2, 0, 0), &settings).expect("midnight");
        assert_eq!(midnight, before);
    }

    #[test]
    fn alternate_sunrise_moves_boundary() {
        let settings = CalendarSettings {
            sunrise: parse_sunrise("05:13").expect("sunrise"),
            ..CalendarSettings::default()
        };
        let date = creator_date(at(2025, 3, 21, 5, 15), &settings).expect("converts");
        assert_eq!(date.day_of_year, 2);

        let canonical =
            creator_date(at(2025, 3, 21, 5, 15), &CalendarSettings::default()).expect("converts");
        assert_eq!(canonical.day_of_year, 1);
    }

    #[test]
    fn rejects_instants_before_epoch() {
        let err = creator_date(at(2025, 3, 20, 5, 0), &CalendarSettings::default())
            .expect_err("day before epoch");
        assert!(matches!(err, CalendarError::BeforeEpoch { .. }));
        assert!(err.is_client_error());
    }

    #[test]
    fn solar_rule_adds_overflow_day() {
        let overflow = from_day_count(364, YearRule::Solar365).expect("overflow day");
        assert_eq!(overflow.kind, DayKind::Overflow);
        assert_eq!(overflow.day_of_year, 365);
        assert_eq!(overflow.year, 6028);

        let next = from_day_count(365, YearRule::Solar365).expect("next year");
        assert_eq!((next.year, next.day_of_year), (6029, 1));
        assert_eq!(next.kind, DayKind::Regular);
    }

    #[test]
    fn sweep_stays_in_table_and_advances() {
        let settings = CalendarSettings::default();
        let mut previous: Option<CreatorDate> = None;
        for offset in 0..(364 * 3) {
            let local = (EPOCH_DATE + Duration::days(offset))
                .and_hms_opt(9, 0, 0)
                .expect("valid");
            let date = creator_date(local, &settings).expect("converts");

            assert!((1..=12).contains(&date.month));
            assert!((1..=CIVIL_YEAR_DAYS).contains(&date.day_of_year));
            assert_eq!(day_of_year(date.month, date.day), Some(date.day_of_year));
            assert_eq!(
                gregorian_date(date.year, date.day_of_year, settings.year_rule),
                Ok(local.date())
            );

            if let Some(prev) = previous {
                if prev.year == date.year {
                    assert_eq!(date.day_of_year, prev.day_of_year + 1);
                } else {
                    assert_eq!((date.year, date.day_of_year), (prev.year + 1, 1));
                }
            }
            previous = Some(date);
        }
    }

    #[test]
    fn conversion_is_idempotent() {
        let settings = CalendarSettings::default();
        let local = at(2027, 11, 5, 17, 42);
        assert_eq!(
            creator_date(local, &settings),
            creator_date(local, &settings)
        );
    }

    #[test]
    fn parses_year_rules() {
        assert_eq!("364".parse::<YearRule>(), Ok(YearRule::Civil364));
        assert_eq!("solar".parse::<YearRule>(), Ok(YearRule::Solar365));
        assert!("366".parse::<YearRule>().is_err());
    }
}
