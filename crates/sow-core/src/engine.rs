//! One call of the calendar pipeline: instant → date → parts → wheel → labels.

use anyhow::Context;
use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
use sow_wire::{CalendarDto, CalendarPayload, DayKindDto, SummaryPayload, TimeDto, WheelDto};
use tracing::debug;

use crate::calendar::{self, CalendarSettings, CreatorDate, DayKind, YearRule};
use crate::config::Config;
use crate::datetime;
use crate::display::display_lines;
use crate::error::CalendarResult;
use crate::parts::{self, PartReading};
use crate::wheel::{WheelAngles, wheel_angles};

impl CalendarSettings {
    /// Reads `calendar.*` keys, falling back to the canonical constants.
    #[tracing::instrument(skip(cfg))]
    pub fn from_config(cfg: &Config) -> anyhow::Result<Self> {
        let sunrise = match cfg.get("calendar.sunrise") {
            Some(raw) => calendar::parse_sunrise(&raw)?,
            None => calendar::DEFAULT_SUNRISE,
        };
        let year_rule = match cfg.get("calendar.year_rule") {
            Some(raw) => raw.parse::<YearRule>()?,
            None => YearRule::default(),
        };
        let timezone = datetime::resolve_timezone(cfg.get("calendar.timezone").as_deref());

        debug!(%timezone, %sunrise, %year_rule, "resolved calendar settings");
        Ok(Self {
            timezone,
            sunrise,
            year_rule,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CalendarSnapshot {
    pub instant: DateTime<Utc>,
    pub local: NaiveDateTime,
    pub timezone: chrono_tz::Tz,
    pub date: CreatorDate,
    pub reading: PartReading,
    pub wheel: WheelAngles,
    pub lines: [String; 3],
}

#[derive(Debug, Clone, Default)]
pub struct CreatorCalendar {
    settings: CalendarSettings,
}

impl CreatorCalendar {
    pub fn new(settings: CalendarSettings) -> Self {
        Self { settings }
    }

    pub fn from_config(cfg: &Config) -> anyhow::Result<Self> {
        let settings =
            CalendarSettings::from_config(cfg).context("invalid calendar configuration")?;
        Ok(Self::new(settings))
    }

    pub fn settings(&self) -> &CalendarSettings {
        &self.settings
    }

    #[tracing::instrument(level = "debug", skip(self), fields(tz = %self.settings.timezone))]
    pub fn snapshot(&self, instant: DateTime<Utc>) -> CalendarResult<CalendarSnapshot> {
        let local = instant
            .with_timezone(&self.settings.timezone)
            .naive_local();
        let date = calendar::creator_date(local, &self.settings)?;
        let reading = parts::creator_time(local.time(), self.settings.sunrise);
        let wheel = wheel_angles(date.day_of_year, reading.progress)?;
        let lines = display_lines(&date, &reading.time, reading.progress);

        debug!(
            year = date.year,
            day_of_year = date.day_of_year,
            part = reading.time.part,
            "computed calendar snapshot"
        );

        Ok(CalendarSnapshot {
            instant,
            local,
            timezone: self.settings.timezone,
            date,
            reading,
            wheel,
            lines,
        })
    }

    pub fn snapshot_at_millis(&self, millis: f64) -> CalendarResult<CalendarSnapshot> {
        self.snapshot(datetime::instant_from_unix_millis(millis)?)
    }

    /// Resolves an instant expression against `now` in the calendar's
    /// timezone, then snapshots it.
    pub fn snapshot_expr(
        &self,
        expr: &str,
        now: DateTime<Utc>,
    ) -> CalendarResult<CalendarSnapshot> {
        let instant = datetime::parse_instant_expr(
            expr,
            now,
            &self.settings.timezone,
            self.settings.sunrise,
        )?;
        self.snapshot(instant)
    }
}

impl CalendarSnapshot {
    pub fn timestamp(&self) -> String {
        self.instant.to_rfc3339_opts(SecondsFormat::Millis, true)
    }

    pub fn to_payload(&self) -> CalendarPayload {
        CalendarPayload {
            timestamp: self.timestamp(),
            timezone: self.timezone.name().to_string(),
            calendar: CalendarDto {
                year: self.date.year,
                month: self.date.month,
                day: self.date.day,
                week_day: self.date.week_day,
                day_of_year: self.date.day_of_year,
                kind: match self.date.kind {
                    DayKind::Regular => DayKindDto::Regular,
                    DayKind::Overflow => DayKindDto::Overflow,
                },
                is_sabbath: self.date.is_sabbath(),
            },
            time: TimeDto {
                part: self.reading.time.part,
                minute: self.reading.time.minute,
                display_text: self.reading.display_text.clone(),
                progress: self.reading.progress,
                hand_angle: self.reading.hand_angle,
            },
            wheel: WheelDto {
                sun_rot: self.wheel.sun,
                leader_rot: self.wheel.leader,
                civil_rot: self.wheel.civil,
                week_rot: self.wheel.week,
                lunar_rot: self.wheel.lunar,
                part_rot: self.wheel.part,
            },
            display_lines: self.lines.to_vec(),
        }
    }

    pub fn to_summary(&self) -> SummaryPayload {
        SummaryPayload {
            timestamp: self.timestamp(),
            year: self.date.year,
            day_of_year: self.date.day_of_year,
            unix: self.instant.timestamp(),
            timezone: self.timezone.name().to_string(),
        }
    }
}
