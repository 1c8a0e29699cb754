//! Cutoff expression resolution
//!
//! A cutoff is the instant commits are compared against. Expressions accept:
//!
//! - `now`
//! - `@<unix seconds>`
//! - RFC 3339 (`2023-06-01T12:00:00+02:00`) and RFC 2822 (`Thu, 01 Jun 2023 12:00:00 +0200`)
//! - a calendar form `YYYY[-MM[-DD]][ HH:MM[:SS]][Z|+HH:MM]`, where `/` and `.` may separate
//!   the date and `T` may separate date and time
//!
//! Components the calendar form leaves out are taken from a default instant, which is
//! the current time under [`DefaultPolicy::Inherit`] and today's midnight under
//! [`DefaultPolicy::Midnight`]. So with `Inherit`, `2023-06` run on the 15th at 14:00
//! means 2023-06-15 14:00.

use chrono::{
    DateTime, Datelike, FixedOffset, Local, LocalResult, NaiveDate, NaiveDateTime, NaiveTime,
    TimeZone, Timelike,
};
use regex::{Captures, Regex};
use std::sync::LazyLock;
use thiserror::Error;

const CALENDAR_REGEX: &str = r"(?i)^(?P<year>\d{4})(?:[-/.](?P<month>\d{1,2})(?:[-/.](?P<day>\d{1,2}))?)?(?:[ T](?P<hour>\d{1,2}):(?P<minute>\d{2})(?::(?P<second>\d{2}))?)?\s*(?P<offset>Z|[+-]\d{2}:?\d{2})?$";

static CALENDAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(CALENDAR_REGEX).expect("valid calendar regex"));

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CutoffError {
    #[error("unable to parse cutoff '{expression}': {reason}")]
    Parse { expression: String, reason: String },
}

/// Where omitted calendar components come from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DefaultPolicy {
    /// The current instant
    #[default]
    Inherit,
    /// Today at 00:00, so that a bare date means the start of that day
    Midnight,
}

/// Resolves cutoff expressions in a time zone.
///
/// Expressions without an explicit offset are wall-clock times in `Tz`, localised with the
/// zone's rules for the requested date rather than the offset in force today.
#[derive(Debug, Clone)]
pub struct CutoffResolver<Tz: TimeZone = Local> {
    zone: Tz,
    now: DateTime<Tz>,
    policy: DefaultPolicy,
}

impl CutoffResolver<Local> {
    /// Resolver anchored at the local wall clock
    pub fn from_clock(policy: DefaultPolicy) -> Self {
        Self::new(Local::now(), policy)
    }
}

impl<Tz: TimeZone> CutoffResolver<Tz> {
    pub fn new(now: DateTime<Tz>, policy: DefaultPolicy) -> Self {
        CutoffResolver {
            zone: now.timezone(),
            now,
            policy,
        }
    }

    /// Resolve an expression, or the current instant when there is none
    pub fn resolve(&self, expression: Option<&str>) -> Result<DateTime<FixedOffset>, CutoffError> {
        let Some(expression) = expression.map(str::trim) else {
            return Ok(self.now.fixed_offset());
        };
        let parse_error = |reason: &str| CutoffError::Parse {
            expression: expression.to_string(),
            reason: reason.to_string(),
        };

        if expression.is_empty() {
            return Err(parse_error("empty expression"));
        }
        if expression.eq_ignore_ascii_case("now") {
            return Ok(self.now.fixed_offset());
        }
        if let Some(seconds) = expression.strip_prefix('@') {
            let seconds = seconds
                .parse::<i64>()
                .map_err(|_| parse_error("expected unix seconds after '@'"))?;
            return DateTime::from_timestamp(seconds, 0)
                .map(|instant| instant.with_timezone(&self.zone).fixed_offset())
                .ok_or_else(|| parse_error("unix timestamp out of range"));
        }
        if let Ok(instant) = DateTime::parse_from_rfc3339(expression) {
            return Ok(instant);
        }
        if let Ok(instant) = DateTime::parse_from_rfc2822(expression) {
            return Ok(instant);
        }

        let captures = CALENDAR
            .captures(expression)
            .ok_or_else(|| parse_error("unrecognised date format"))?;

        self.resolve_calendar(&captures)
            .map_err(|reason| parse_error(&reason))
    }

    /// The instant supplying components an expression omits
    pub fn default_instant(&self) -> DateTime<Tz> {
        match self.policy {
            DefaultPolicy::Inherit => self.now.clone(),
            DefaultPolicy::Midnight => {
                let midnight = self.now.date_naive().and_time(NaiveTime::MIN);
                self.zone
                    .from_local_datetime(&midnight)
                    .earliest()
                    .unwrap_or_else(|| self.now.clone())
            }
        }
    }

    fn resolve_calendar(&self, captures: &Captures) -> Result<DateTime<FixedOffset>, String> {
        let default = self.default_instant();
        let number = |name: &str| -> Result<Option<u32>, String> {
            captures
                .name(name)
                .map(|m| m.as_str().parse::<u32>().map_err(|e| format!("{name}: {e}")))
                .transpose()
        };

        let year = number("year")?.ok_or("missing year")? as i32;
        let month = number("month")?.unwrap_or(default.month());
        let day = match number("day")? {
            Some(day) => day,
            // an inherited day may not exist in the requested month
            None => default.day().min(days_in_month(year, month)?),
        };
        let date = NaiveDate::from_ymd_opt(year, month, day)
            .ok_or_else(|| format!("no such date {year:04}-{month:02}-{day:02}"))?;

        let time = match number("hour")? {
            Some(hour) => {
                let minute = number("minute")?.unwrap_or(0);
                let (second, nano) = match number("second")? {
                    Some(second) => (second, 0),
                    None => (default.second(), default.nanosecond()),
                };
                NaiveTime::from_hms_nano_opt(hour, minute, second, nano)
                    .ok_or_else(|| format!("no such time {hour:02}:{minute:02}:{second:02}"))?
            }
            None => default.time(),
        };

        let local = date.and_time(time);
        match captures.name("offset") {
            Some(offset) => parse_offset(offset.as_str())?
                .from_local_datetime(&local)
                .single()
                .ok_or_else(|| format!("{local} is out of range")),
            None => self.localise(&local),
        }
    }

    /// Wall-clock time in the resolver's zone, using the offset in force on that date
    fn localise(&self, local: &NaiveDateTime) -> Result<DateTime<FixedOffset>, String> {
        match self.zone.from_local_datetime(local) {
            LocalResult::Single(instant) => Ok(instant.fixed_offset()),
            // clocks went back and the wall time occurred twice: take the first occurrence
            LocalResult::Ambiguous(earliest, _) => Ok(earliest.fixed_offset()),
            LocalResult::None => Err(format!(
                "{local} is skipped by a daylight saving change in the local time zone"
            )),
        }
    }
}

fn days_in_month(year: i32, month: u32) -> Result<u32, String> {
    let first = NaiveDate::from_ymd_opt(year, month, 1).ok_or_else(|| format!("no such month {month}"))?;
    let next = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)
    }
    .ok_or_else(|| format!("year {year} out of range"))?;

    Ok(next.signed_duration_since(first).num_days() as u32)
}

fn parse_offset(offset: &str) -> Result<FixedOffset, String> {
    if offset.eq_ignore_ascii_case("z") {
        return Ok(FixedOffset::east_opt(0).ok_or("invalid offset")?);
    }

    let sign = if offset.starts_with('-') { -1 } else { 1 };
    let digits = offset[1..].replace(':', "");
    let hours = digits[..2].parse::<i32>().map_err(|e| e.to_string())?;
    let minutes = digits[2..].parse::<i32>().map_err(|e| e.to_string())?;
    if minutes >= 60 {
        return Err(format!("invalid offset {offset}"));
    }

    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
        .ok_or_else(|| format!("invalid offset {offset}"))
}
