use std::fs;
use std::path::{
  Path,
  PathBuf
};

use chrono::{
  DateTime,
  Duration,
  LocalResult,
  NaiveDate,
  NaiveDateTime,
  NaiveTime,
  TimeZone,
  Utc
};
use chrono_tz::Tz;
use regex::Regex;
use serde::Deserialize;

use crate::error::{
  CalendarError,
  CalendarResult
};

const TIMEZONE_CONFIG_FILE: &str =
  "sow-time.toml";
const TIMEZONE_ENV_VAR: &str =
  "SOW_TIMEZONE";
const TIMEZONE_CONFIG_ENV_VAR: &str =
  "SOW_TIME_CONFIG";
const DEFAULT_TIMEZONE: Tz =
  chrono_tz::UTC;

#[derive(Debug, Deserialize)]
struct TimezoneConfig {
  timezone: Option<String>,
  time:     Option<TimezoneSection>
}

#[derive(Debug, Deserialize)]
struct TimezoneSection {
  timezone: Option<String>
}

/// Picks the timezone local calendar time is read in: the env var, then
/// the configured key, then `sow-time.toml`, then UTC.
#[tracing::instrument]
pub fn resolve_timezone(
  configured: Option<&str>
) -> Tz {
  pick_timezone(
    std::env::var(TIMEZONE_ENV_VAR)
      .ok()
      .as_deref(),
    configured,
    timezone_config_path().as_deref()
  )
}

fn pick_timezone(
  from_env: Option<&str>,
  configured: Option<&str>,
  config_file: Option<&Path>
) -> Tz {
  if let Some(raw) = from_env
    && let Some(tz) = parse_timezone(
      raw,
      TIMEZONE_ENV_VAR
    )
  {
    return tz;
  }

  if let Some(raw) = configured
    && let Some(tz) = parse_timezone(
      raw,
      "calendar.timezone"
    )
  {
    return tz;
  }

  if let Some(path) = config_file
    && let Some(tz) =
      load_timezone_from_file(path)
  {
    return tz;
  }

  tracing::debug!(
    timezone = %DEFAULT_TIMEZONE,
    "no timezone configured; using default"
  );
  DEFAULT_TIMEZONE
}

fn timezone_config_path()
-> Option<PathBuf> {
  if let Ok(raw) = std::env::var(
    TIMEZONE_CONFIG_ENV_VAR
  ) {
    let trimmed = raw.trim();
    if !trimmed.is_empty() {
      return Some(PathBuf::from(
        trimmed
      ));
    }
  }

  std::env::current_dir().ok().map(
    |dir| {
      dir.join(TIMEZONE_CONFIG_FILE)
    }
  )
}

fn load_timezone_from_file(
  path: &Path
) -> Option<Tz> {
  if !path.exists() {
    tracing::debug!(
      file = %path.display(),
      "timezone config file not found"
    );
    return None;
  }

  let raw = match fs::read_to_string(
    path
  ) {
    | Ok(raw) => raw,
    | Err(err) => {
      tracing::error!(
        file = %path.display(),
        error = %err,
        "failed reading timezone config file"
      );
      return None;
    }
  };

  let parsed = match toml::from_str::<
    TimezoneConfig
  >(&raw)
  {
    | Ok(parsed) => parsed,
    | Err(err) => {
      tracing::error!(
        file = %path.display(),
        error = %err,
        "failed parsing timezone config file"
      );
      return None;
    }
  };

  let timezone =
    parsed.timezone.or_else(|| {
      parsed.time.and_then(|section| {
        section.timezone
      })
    });
  let Some(timezone) = timezone else {
    tracing::warn!(
      file = %path.display(),
      "timezone config had no timezone field"
    );
    return None;
  };

  parse_timezone(
    timezone.as_str(),
    &format!("file:{}", path.display())
  )
}

fn parse_timezone(
  raw: &str,
  source: &str
) -> Option<Tz> {
  let trimmed = raw.trim();
  if trimmed.is_empty() {
    tracing::warn!(
      source,
      "timezone source was empty"
    );
    return None;
  }

  match trimmed.parse::<Tz>() {
    | Ok(tz) => {
      tracing::info!(
        source,
        timezone = %trimmed,
        "configured calendar timezone"
      );
      Some(tz)
    }
    | Err(err) => {
      tracing::error!(
        source,
        timezone = %trimmed,
        error = %err,
        "failed to parse timezone id"
      );
      None
    }
  }
}

pub fn to_utc_from_local(
  local_naive: NaiveDateTime,
  tz: &Tz,
  context: &str
) -> CalendarResult<DateTime<Utc>> {
  match tz
    .from_local_datetime(&local_naive)
  {
    | LocalResult::Single(local_dt) => {
      Ok(local_dt.with_timezone(&Utc))
    }
    | LocalResult::Ambiguous(
      first,
      second
    ) => {
      tracing::warn!(
        context,
        first = %first,
        second = %second,
        "ambiguous local datetime; using earliest"
      );
      let chosen = if first <= second {
        first
      } else {
        second
      };
      Ok(chosen.with_timezone(&Utc))
    }
    | LocalResult::None => {
      Err(CalendarError::InvalidInstant(
        format!(
          "{local_naive} does not \
           exist in {tz} ({context})"
        )
      ))
    }
  }
}

/// Converts unix milliseconds, possibly fractional, into an instant.
pub fn instant_from_unix_millis(
  millis: f64
) -> CalendarResult<DateTime<Utc>> {
  if !millis.is_finite() {
    return Err(
      CalendarError::InvalidInstant(
        format!(
          "unix milliseconds must be \
           finite, got {millis}"
        )
      )
    );
  }

  let secs = (millis / 1000.0).floor();
  let nanos = ((millis - secs * 1000.0)
    * 1_000_000.0)
    .round()
    .clamp(0.0, 999_999_999.0);

  if secs < i64::MIN as f64
    || secs > i64::MAX as f64
  {
    return Err(
      CalendarError::InvalidInstant(
        format!(
          "unix milliseconds out of \
           range: {millis}"
        )
      )
    );
  }

  DateTime::from_timestamp(
    secs as i64,
    nanos as u32
  )
  .ok_or_else(|| {
    CalendarError::InvalidInstant(
      format!(
        "unix milliseconds out of \
         range: {millis}"
      )
    )
  })
}

/// Resolves an instant expression. Date-only forms (`today`,
/// `tomorrow`, `yesterday`, `YYYY-MM-DD`) land on the local `sunrise`
/// of that date, the moment its creator day begins.
#[tracing::instrument(skip(now, tz, sunrise), fields(input = input))]
pub fn parse_instant_expr(
  input: &str,
  now: DateTime<Utc>,
  tz: &Tz,
  sunrise: NaiveTime
) -> CalendarResult<DateTime<Utc>> {
  let token = input.trim();
  let lower =
    token.to_ascii_lowercase();

  let day_offset = match lower.as_str()
  {
    | "now" => return Ok(now),
    | "today" => Some(0),
    | "tomorrow" => Some(1),
    | "yesterday" => Some(-1),
    | _ => None
  };
  if let Some(offset) = day_offset {
    let date = now
      .with_timezone(tz)
      .date_naive()
      .checked_add_signed(
        Duration::days(offset)
      )
      .ok_or_else(|| {
        CalendarError::InvalidInstant(
          format!(
            "date out of range: {input}"
          )
        )
      })?;
    return local_sunrise(
      date, tz, sunrise, &lower
    );
  }

  let rel_re = Regex::new(r"^(?P<sign>[+-])(?P<num>\d+)(?P<unit>[dhm])$")
        .map_err(|e| CalendarError::InvalidInstant(format!("internal regex compile failure: {e}")))?;

  if let Some(caps) =
    rel_re.captures(token)
  {
    let sign = caps
      .name("sign")
      .map(|m| m.as_str())
      .unwrap_or("+");
    let num: i64 = caps
      .name("num")
      .map(|m| m.as_str())
      .unwrap_or_default()
      .parse()
      .map_err(|_| {
        CalendarError::InvalidInstant(
          format!(
            "invalid relative \
             amount: {input}"
          )
        )
      })?;
    let unit = caps
      .name("unit")
      .map(|m| m.as_str())
      .unwrap_or_default();

    let duration = match unit {
      | "d" => Duration::try_days(num),
      | "h" => Duration::try_hours(num),
      | "m" => {
        Duration::try_minutes(num)
      }
      | _ => None
    }
    .ok_or_else(|| {
      CalendarError::InvalidInstant(
        format!(
          "relative offset out of \
           range: {input}"
        )
      )
    })?;

    let shifted = if sign == "-" {
      now.checked_sub_signed(duration)
    } else {
      now.checked_add_signed(duration)
    };
    return shifted.ok_or_else(|| {
      CalendarError::InvalidInstant(
        format!(
          "relative offset out of \
           range: {input}"
        )
      )
    });
  }

  if let Ok(dt) =
    DateTime::parse_from_rfc3339(token)
  {
    return Ok(dt.with_timezone(&Utc));
  }

  if let Ok(date) =
    NaiveDate::parse_from_str(
      token, "%Y-%m-%d"
    )
  {
    return local_sunrise(
      date, tz, sunrise, "date"
    );
  }

  for fmt in [
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M"
  ] {
    if let Ok(ndt) =
      NaiveDateTime::parse_from_str(
        token, fmt
      )
    {
      return to_utc_from_local(
        ndt, tz, fmt
      );
    }
  }

  if looks_numeric(&lower) {
    if let Ok(millis) =
      lower.parse::<f64>()
    {
      return instant_from_unix_millis(
        millis
      );
    }
  }

  Err(CalendarError::InvalidInstant(
    format!(
      "unrecognized instant \
       expression: {input} (supported: \
       now/today/tomorrow/yesterday, \
       +Nd/+Nh/+Nm, RFC3339, \
       YYYY-MM-DD, YYYY-MM-DD HH:MM, \
       unix milliseconds)"
    )
  ))
}

fn local_sunrise(
  date: NaiveDate,
  tz: &Tz,
  sunrise: NaiveTime,
  context: &str
) -> CalendarResult<DateTime<Utc>> {
  to_utc_from_local(
    date.and_time(sunrise),
    tz,
    context
  )
}

fn looks_numeric(token: &str) -> bool {
  matches!(token, "nan" | "inf" | "-inf" | "+inf" | "infinity")
    || (!token.is_empty()
      && token.chars().all(|c| {
        c.is_ascii_digit()
          || matches!(
            c,
            '.' | '-' | '+' | 'e'
          )
      }))
}

#[cfg(test)]
mod tests {
  use std::fs;

  use chrono::{
    NaiveDate,
    TimeZone,
    Utc
  };
  use chrono_tz::Tz;
  use tempfile::tempdir;

  use super::{
    instant_from_unix_millis,
    parse_instant_expr,
    pick_timezone,
    to_utc_from_local
  };
  use crate::calendar::DEFAULT_SUNRISE;
  use crate::error::CalendarError;

  fn now() -> chrono::DateTime<Utc> {
    Utc
      .with_ymd_and_hms(
        2026, 2, 17, 12, 0, 0
      )
      .single()
      .expect("valid now")
  }

  fn parse_utc(
    input: &str
  ) -> String {
    parse_instant_expr(
      input,
      now(),
      &chrono_tz::UTC,
      DEFAULT_SUNRISE
    )
    .expect("parse expression")
    .format("%Y-%m-%dT%H:%M")
    .to_string()
  }

  #[test]
  fn parses_local_date_in_timezone() {
    let tz: Tz = "Africa/Johannesburg"
      .parse()
      .expect("tz");
    let parsed = parse_instant_expr(
      "2025-03-20 06:00",
      now(),
      &tz,
      DEFAULT_SUNRISE
    )
    .expect("parse local datetime");
    assert_eq!(
      parsed
        .format("%Y-%m-%dT%H:%M")
        .to_string(),
      "2025-03-20T04:00"
    );
  }

  #[test]
  fn date_only_forms_start_at_sunrise() {
    assert_eq!(
      parse_utc("2025-03-20"),
      "2025-03-20T05:20"
    );
    assert_eq!(
      parse_utc("today"),
      "2026-02-17T05:20"
    );
    assert_eq!(
      parse_utc("Tomorrow"),
      "2026-02-18T05:20"
    );
    assert_eq!(
      parse_utc("yesterday"),
      "2026-02-16T05:20"
    );
    assert_eq!(
      parse_utc("now"),
      "2026-02-17T12:00"
    );
  }

  #[test]
  fn date_only_forms_use_local_date() {
    let tz: Tz = "Pacific/Auckland"
      .parse()
      .expect("tz");
    // 12:00 UTC is already 2026-02-18 01:00 in Auckland (UTC+13)
    let parsed = parse_instant_expr(
      "today",
      now(),
      &tz,
      DEFAULT_SUNRISE
    )
    .expect("today");
    assert_eq!(
      parsed
        .format("%Y-%m-%dT%H:%M")
        .to_string(),
      "2026-02-17T16:20"
    );
  }

  #[test]
  fn parses_relative_offsets() {
    assert_eq!(
      parse_utc("-2d"),
      "2026-02-15T12:00"
    );
    assert_eq!(
      parse_utc("+90m"),
      "2026-02-17T13:30"
    );
  }

  #[test]
  fn parses_unix_millis() {
    let parsed = parse_instant_expr(
      "1742450400000",
      now(),
      &chrono_tz::UTC,
      DEFAULT_SUNRISE
    )
    .expect("parse millis");
    assert_eq!(
      parsed.to_rfc3339(),
      "2025-03-20T06:00:00+00:00"
    );

    let fractional =
      instant_from_unix_millis(1500.5)
        .expect("fractional");
    assert_eq!(
      fractional.timestamp_subsec_micros(),
      500_500
    );
  }

  #[test]
  fn rejects_non_finite_millis() {
    let err = parse_instant_expr(
      "NaN",
      now(),
      &chrono_tz::UTC,
      DEFAULT_SUNRISE
    )
    .expect_err("nan is invalid");
    assert!(matches!(
      err,
      CalendarError::InvalidInstant(_)
    ));
    assert!(
      instant_from_unix_millis(
        f64::INFINITY
      )
      .is_err()
    );
  }

  #[test]
  fn rejects_garbage() {
    assert!(
      parse_instant_expr(
        "next full moon",
        now(),
        &chrono_tz::UTC,
        DEFAULT_SUNRISE
      )
      .is_err()
    );
  }

  #[test]
  fn ambiguous_local_time_takes_earliest() {
    let tz = chrono_tz::America::New_York;
    let local = NaiveDate::from_ymd_opt(
      2025, 11, 2
    )
    .and_then(|d| {
      d.and_hms_opt(1, 30, 0)
    })
    .expect("valid local");

    let utc = to_utc_from_local(
      local, &tz, "test"
    )
    .expect("ambiguous resolves");
    // 01:30 EDT (UTC-4) comes before 01:30 EST (UTC-5)
    assert_eq!(
      utc.to_rfc3339(),
      "2025-11-02T05:30:00+00:00"
    );
  }

  #[test]
  fn nonexistent_local_time_is_invalid() {
    let tz = chrono_tz::America::New_York;
    let local = NaiveDate::from_ymd_opt(
      2025, 3, 9
    )
    .and_then(|d| {
      d.and_hms_opt(2, 30, 0)
    })
    .expect("valid local");

    let err = to_utc_from_local(
      local, &tz, "test"
    )
    .expect_err("skipped by dst");
    assert!(matches!(
      err,
      CalendarError::InvalidInstant(_)
    ));
  }

  #[test]
  fn timezone_sources_in_order() {
    let dir =
      tempdir().expect("tempdir");
    let file =
      dir.path().join("sow-time.toml");
    fs::write(
      &file,
      "[time]\ntimezone = \"Africa/Johannesburg\"\n"
    )
    .expect("write tz file");
    let missing =
      dir.path().join("missing.toml");

    assert_eq!(
      pick_timezone(
        Some("Asia/Tokyo"),
        Some("Europe/Berlin"),
        Some(file.as_path())
      ),
      chrono_tz::Asia::Tokyo
    );
    assert_eq!(
      pick_timezone(
        Some("Not/AZone"),
        Some("Europe/Berlin"),
        Some(file.as_path())
      ),
      chrono_tz::Europe::Berlin
    );
    assert_eq!(
      pick_timezone(
        None,
        Some("  "),
        Some(file.as_path())
      ),
      chrono_tz::Africa::Johannesburg
    );
    assert_eq!(
      pick_timezone(
        None,
        None,
        Some(missing.as_path())
      ),
      chrono_tz::UTC
    );
  }

  #[test]
  fn timezone_file_accepts_top_level_key() {
    let dir =
      tempdir().expect("tempdir");
    let file =
      dir.path().join("sow-time.toml");
    fs::write(
      &file,
      "timezone = \"America/New_York\"\n"
    )
    .expect("write tz file");

    assert_eq!(
      pick_timezone(None, None, Some(file.as_path())),
      chrono_tz::America::New_York
    );
  }
}
