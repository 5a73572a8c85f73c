use std::fs;
use std::path::PathBuf;
use std::sync::OnceLock;

use anyhow::{
  Context,
  anyhow
};
use chrono::{
  DateTime,
  Datelike,
  Duration,
  FixedOffset,
  Local,
  NaiveDate,
  NaiveDateTime,
  Utc,
  Weekday
};
use chrono_tz::Tz;
use regex::Regex;
use serde::Deserialize;

const TIMEZONE_CONFIG_FILE: &str =
  "catfeeder-time.toml";
const TIMEZONE_ENV_VAR: &str =
  "CATFEEDER_TIMEZONE";
const TIMEZONE_CONFIG_ENV_VAR: &str =
  "CATFEEDER_TIME_CONFIG";

/// Wall-clock time written with a `Z`
/// suffix, so the `YYYY-MM-DD` prefix is
/// always the local calendar day.
const LOCAL_TIMESTAMP_FORMAT: &str =
  "%Y-%m-%dT%H:%M:%S%.3fZ";

#[derive(Debug, Deserialize)]
struct TimezoneConfig {
  timezone: Option<String>,
  time:     Option<TimezoneSection>
}

#[derive(Debug, Deserialize)]
struct TimezoneSection {
  timezone: Option<String>
}

#[derive(Debug, Clone, Copy)]
pub enum LocalZone {
  Named(Tz),
  System
}

pub fn local_zone() -> &'static LocalZone
{
  static LOCAL_ZONE: OnceLock<
    LocalZone
  > = OnceLock::new();
  LOCAL_ZONE
    .get_or_init(resolve_local_zone)
}

/// Current time in the configured zone.
#[must_use]
pub fn local_now() -> DateTime<FixedOffset>
{
  match local_zone() {
    | LocalZone::Named(tz) => {
      Utc::now()
        .with_timezone(tz)
        .fixed_offset()
    }
    | LocalZone::System => {
      Local::now().fixed_offset()
    }
  }
}

#[must_use]
pub fn local_timestamp(
  now: &DateTime<FixedOffset>
) -> String {
  now
    .naive_local()
    .format(LOCAL_TIMESTAMP_FORMAT)
    .to_string()
}

/// Reads a stored creation timestamp
/// back onto the naive local axis.
pub fn parse_timestamp(
  raw: &str
) -> Option<NaiveDateTime> {
  let token = raw.trim();
  if let Ok(dt) =
    DateTime::parse_from_rfc3339(token)
  {
    return Some(dt.naive_utc());
  }

  for fmt in [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M"
  ] {
    if let Ok(ndt) =
      NaiveDateTime::parse_from_str(
        token, fmt
      )
    {
      return Some(ndt);
    }
  }

  parse_calendar_date(token)
}

/// `YYYY-MM-DD` at midnight.
pub fn parse_calendar_date(
  raw: &str
) -> Option<NaiveDateTime> {
  NaiveDate::parse_from_str(
    raw.trim(),
    "%Y-%m-%d"
  )
  .ok()
  .and_then(|date| {
    date.and_hms_opt(0, 0, 0)
  })
}

fn resolve_local_zone() -> LocalZone {
  if let Ok(raw) =
    std::env::var(TIMEZONE_ENV_VAR)
    && let Some(tz) = parse_timezone(
      &raw,
      TIMEZONE_ENV_VAR
    )
  {
    return LocalZone::Named(tz);
  }

  if let Some(path) =
    timezone_config_path()
    && let Some(tz) =
      load_timezone_from_file(&path)
  {
    return LocalZone::Named(tz);
  }

  tracing::debug!(
    "no timezone configured; using \
     system local offset"
  );
  LocalZone::System
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
  path: &PathBuf
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
        "configured local timezone"
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

/// Resolves a user-typed day relative
/// to `today`.
#[tracing::instrument(skip(today), fields(input = input))]
pub fn parse_date_expr(
  input: &str,
  today: NaiveDate
) -> anyhow::Result<NaiveDate> {
  let token = input.trim();
  let lower =
    token.to_ascii_lowercase();

  match lower.as_str() {
    | "today" | "now" => {
      return Ok(today);
    }
    | "tomorrow" => {
      return shift_days(today, 1);
    }
    | "yesterday" => {
      return shift_days(today, -1);
    }
    | _ => {}
  }

  if let Some(target_weekday) =
    parse_weekday_name(&lower)
  {
    return Ok(next_weekday_date(
      today,
      target_weekday
    ));
  }

  let rel_re = Regex::new(r"^(?P<sign>[+-])(?P<num>\d+)(?P<unit>[dw])$")
        .map_err(|e| anyhow!("internal regex compile failure: {e}"))?;

  if let Some(caps) =
    rel_re.captures(&lower)
  {
    let sign = caps
      .name("sign")
      .map(|m| m.as_str())
      .ok_or_else(|| {
        anyhow!("missing relative sign")
      })?;
    let num: i64 = caps
      .name("num")
      .map(|m| m.as_str())
      .ok_or_else(|| {
        anyhow!(
          "missing relative amount"
        )
      })?
      .parse()
      .context(
        "invalid relative number"
      )?;
    let unit = caps
      .name("unit")
      .map(|m| m.as_str())
      .ok_or_else(|| {
        anyhow!("missing relative unit")
      })?;

    let days = match unit {
      | "d" => num,
      | "w" => num.saturating_mul(7),
      | _ => {
        return Err(anyhow!(
          "unknown relative unit: \
           {unit}"
        ));
      }
    };

    return shift_days(
      today,
      if sign == "-" { -days } else { days }
    );
  }

  if let Ok(date) =
    NaiveDate::parse_from_str(
      token, "%Y-%m-%d"
    )
  {
    return Ok(date);
  }

  Err(anyhow!(
    "unrecognized date expression: \
     {input}"
  ))
  .with_context(|| {
    "supported formats: \
     today/tomorrow/yesterday, \
     weekday names (e.g. monday), \
     +Nd/-Nd/+Nw, YYYY-MM-DD"
  })
}

/// Resolves a month for calendar
/// navigation: `YYYY-MM` or a month name
/// within `today`'s year.
pub fn parse_month_expr(
  input: &str,
  today: NaiveDate
) -> anyhow::Result<(i32, u32)> {
  let token = input.trim();
  let lower =
    token.to_ascii_lowercase();

  if let Some(month) =
    parse_month_name(&lower)
  {
    return Ok((today.year(), month));
  }

  let month_re = Regex::new(r"^(?P<year>\d{4})-(?P<month>\d{1,2})$")
        .map_err(|e| anyhow!("internal regex compile failure: {e}"))?;
  let caps = month_re
    .captures(token)
    .ok_or_else(|| {
      anyhow!(
        "unrecognized month \
         expression: {input} \
         (expected YYYY-MM or a \
         month name)"
      )
    })?;

  let year: i32 = caps["year"]
    .parse()
    .context("invalid year")?;
  let month: u32 = caps["month"]
    .parse()
    .context("invalid month")?;
  if !(1..=12).contains(&month) {
    return Err(anyhow!(
      "month out of range: {month}"
    ));
  }
  Ok((year, month))
}

/// Normalizes `8:05`, `08:05`, `3:23pm`
/// to `HH:MM`.
pub fn parse_clock_expr(
  input: &str
) -> anyhow::Result<String> {
  let (hour, minute) =
    parse_clock_time(input)
      .ok_or_else(|| {
        anyhow!(
          "unrecognized time: {input} \
           (expected HH:MM or h:mmam/pm)"
        )
      })?;
  Ok(format!("{hour:02}:{minute:02}"))
}

fn shift_days(
  date: NaiveDate,
  days: i64
) -> anyhow::Result<NaiveDate> {
  Duration::try_days(days)
    .and_then(|delta| {
      date.checked_add_signed(delta)
    })
    .ok_or_else(|| {
      anyhow!(
        "date out of range: {date} \
         {days:+} days"
      )
    })
}

fn parse_weekday_name(
  token: &str
) -> Option<Weekday> {
  match token.trim() {
    | "monday" | "mon" => {
      Some(Weekday::Mon)
    }
    | "tuesday" | "tue" | "tues" => {
      Some(Weekday::Tue)
    }
    | "wednesday" | "wed" => {
      Some(Weekday::Wed)
    }
    | "thursday" | "thu" | "thur"
    | "thurs" => Some(Weekday::Thu),
    | "friday" | "fri" => {
      Some(Weekday::Fri)
    }
    | "saturday" | "sat" => {
      Some(Weekday::Sat)
    }
    | "sunday" | "sun" => {
      Some(Weekday::Sun)
    }
    | _ => None
  }
}

fn next_weekday_date(
  from: NaiveDate,
  target: Weekday
) -> NaiveDate {
  let from_idx = from
    .weekday()
    .num_days_from_monday()
    as i64;
  let target_idx = target
    .num_days_from_monday()
    as i64;
  let mut delta =
    (7 + target_idx - from_idx) % 7;
  if delta == 0 {
    delta = 7;
  }
  Duration::try_days(delta)
    .and_then(|step| {
      from.checked_add_signed(step)
    })
    .unwrap_or(from)
}

fn parse_clock_time(
  token: &str
) -> Option<(u32, u32)> {
  let clock_re = Regex::new(
    r"(?i)^(?P<hour>\d{1,2}):(?P<minute>\d{2})\s*(?P<ampm>[ap]m)?$",
  )
  .ok()?;
  let captures =
    clock_re.captures(token.trim())?;

  let raw_hour = captures
    .name("hour")?
    .as_str()
    .parse::<u32>()
    .ok()?;
  let minute = captures
    .name("minute")?
    .as_str()
    .parse::<u32>()
    .ok()?;
  if minute > 59 {
    return None;
  }

  let hour = if let Some(ampm_match) =
    captures.name("ampm")
  {
    let ampm = ampm_match
      .as_str()
      .to_ascii_lowercase();
    if raw_hour == 0 || raw_hour > 12 {
      return None;
    }
    match ampm.as_str() {
      | "am" => {
        if raw_hour == 12 {
          0
        } else {
          raw_hour
        }
      }
      | "pm" => {
        if raw_hour == 12 {
          12
        } else {
          raw_hour + 12
        }
      }
      | _ => return None
    }
  } else {
    if raw_hour > 23 {
      return None;
    }
    raw_hour
  };

  Some((hour, minute))
}

fn parse_month_name(
  token: &str
) -> Option<u32> {
  match token.trim() {
    | "january" | "jan" => Some(1),
    | "february" | "feb" => Some(2),
    | "march" | "mar" => Some(3),
    | "april" | "apr" => Some(4),
    | "may" => Some(5),
    | "june" | "jun" => Some(6),
    | "july" | "jul" => Some(7),
    | "august" | "aug" => Some(8),
    | "september" | "sep" | "sept" => {
      Some(9)
    }
    | "october" | "oct" => Some(10),
    | "november" | "nov" => Some(11),
    | "december" | "dec" => Some(12),
    | _ => None
  }
}

#[cfg(test)]
mod tests {
  use chrono::{
    FixedOffset,
    NaiveDate,
    TimeZone
  };

  use super::{
    local_timestamp,
    parse_clock_expr,
    parse_date_expr,
    parse_month_expr,
    parse_timestamp
  };

  fn day(
    y: i32,
    m: u32,
    d: u32
  ) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d)
      .expect("valid date")
  }

  #[test]
  fn timestamp_keeps_local_day_late_in_the_evening()
  {
    let offset =
      FixedOffset::west_opt(5 * 3600)
        .expect("valid offset");
    let now = offset
      .with_ymd_and_hms(
        2024, 3, 15, 23, 30, 0
      )
      .single()
      .expect("valid now");
    let stamp = local_timestamp(&now);
    assert_eq!(
      stamp,
      "2024-03-15T23:30:00.000Z"
    );
    assert!(
      stamp.starts_with("2024-03-15")
    );
  }

  #[test]
  fn parses_stored_timestamp_as_wall_time()
  {
    let parsed = parse_timestamp(
      "2024-03-15T08:00:00.000Z"
    )
    .expect("parse timestamp");
    assert_eq!(
      parsed,
      day(2024, 3, 15)
        .and_hms_opt(8, 0, 0)
        .expect("valid time")
    );
    assert!(
      parse_timestamp("not a date")
        .is_none()
    );
  }

  #[test]
  fn parses_weekday_name() {
    let parsed = parse_date_expr(
      "wednesday",
      day(2026, 2, 17)
    )
    .expect("parse weekday");
    assert_eq!(parsed, day(2026, 2, 18));
  }

  #[test]
  fn parses_relative_days() {
    assert_eq!(
      parse_date_expr(
        "+5d",
        day(2024, 2, 27)
      )
      .expect("parse +5d"),
      day(2024, 3, 3)
    );
    assert_eq!(
      parse_date_expr(
        "-1w",
        day(2024, 1, 3)
      )
      .expect("parse -1w"),
      day(2023, 12, 27)
    );
  }

  #[test]
  fn huge_relative_offsets_are_errors()
  {
    let today = day(2024, 3, 15);
    assert!(
      parse_date_expr(
        "+99999999999999d",
        today
      )
      .is_err()
    );
    assert!(
      parse_date_expr(
        "-99999999999999w",
        today
      )
      .is_err()
    );
    assert!(
      parse_date_expr(
        "+9999999999d",
        today
      )
      .is_err()
    );
  }

  #[test]
  fn rejects_garbage_date() {
    assert!(
      parse_date_expr(
        "someday",
        day(2024, 1, 1)
      )
      .is_err()
    );
  }

  #[test]
  fn parses_month_forms() {
    let today = day(2024, 6, 10);
    assert_eq!(
      parse_month_expr("2023-12", today)
        .expect("parse YYYY-MM"),
      (2023, 12)
    );
    assert_eq!(
      parse_month_expr("feb", today)
        .expect("parse month name"),
      (2024, 2)
    );
    assert!(
      parse_month_expr("2024-13", today)
        .is_err()
    );
  }

  #[test]
  fn normalizes_clock_times() {
    assert_eq!(
      parse_clock_expr("8:05")
        .expect("parse 8:05"),
      "08:05"
    );
    assert_eq!(
      parse_clock_expr("3:23pm")
        .expect("parse 3:23pm"),
      "15:23"
    );
    assert!(
      parse_clock_expr("25:00").is_err()
    );
  }
}
