use std::sync::OnceLock;

use anyhow::{
  Context,
  anyhow
};
use chrono::{
  Datelike,
  Duration,
  NaiveDate,
  NaiveTime,
  Weekday
};
use regex::Regex;

fn clock_re() -> Option<&'static Regex> {
  static CLOCK_RE: OnceLock<
    Option<Regex>
  > = OnceLock::new();
  CLOCK_RE
    .get_or_init(|| {
      Regex::new(
        r"(?i)^(?P<hour>\d{1,2})(?::(?P<minute>\d{2})(?::(?P<second>\d{2}))?)?\s*(?P<ampm>[ap]m)?$",
      )
      .ok()
    })
    .as_ref()
}

fn offset_re() -> Option<&'static Regex> {
  static OFFSET_RE: OnceLock<
    Option<Regex>
  > = OnceLock::new();
  OFFSET_RE
    .get_or_init(|| {
      Regex::new(
        r"(?i)^\+(?P<n>\d+)(?P<unit>[dw])$"
      )
      .ok()
    })
    .as_ref()
}

/// Resolves an event date expression relative to `today`.
#[tracing::instrument(skip(today), fields(input = input))]
pub fn parse_event_date(
  input: &str,
  today: NaiveDate
) -> anyhow::Result<NaiveDate> {
  let token = input.trim();
  let lower =
    token.to_ascii_lowercase();

  match lower.as_str() {
    | "today" => return Ok(today),
    | "tomorrow" => {
      return shift_days(today, 1);
    }
    | "yesterday" => {
      return shift_days(today, -1);
    }
    | _ => {}
  }

  if let Some(target) =
    parse_weekday_name(&lower)
  {
    return Ok(next_weekday_date(
      today, target
    ));
  }

  if let Some(captures) = offset_re()
    .and_then(|re| re.captures(&lower))
  {
    let n: i64 = captures["n"]
      .parse()
      .context("invalid day offset")?;
    let days = match &captures["unit"] {
      | "w" => n.saturating_mul(7),
      | _ => n
    };
    return shift_days(today, days);
  }

  NaiveDate::parse_from_str(
    token, "%Y-%m-%d"
  )
  .map_err(|_| {
    anyhow!(
      "unrecognized date '{token}': \
       use YYYY-MM-DD, today, \
       tomorrow, yesterday, a weekday \
       name, or +Nd/+Nw"
    )
  })
}

/// Parses `HH:MM`, `HH:MM:SS`, `H:MM am|pm` or `Ham|pm`.
pub fn parse_clock_time(
  input: &str
) -> anyhow::Result<NaiveTime> {
  let token = input.trim();
  let unrecognized = || {
    anyhow!(
      "unrecognized time '{token}': \
       use HH:MM, H:MM am/pm or Ham/pm"
    )
  };

  let captures = clock_re()
    .and_then(|re| re.captures(token))
    .ok_or_else(unrecognized)?;

  let raw_hour: u32 = captures
    ["hour"]
    .parse()
    .map_err(|_| unrecognized())?;
  let field = |name: &str| {
    match captures.name(name) {
      | Some(m) => m
        .as_str()
        .parse::<u32>()
        .map_err(|_| unrecognized()),
      | None => Ok(0)
    }
  };
  let minute = field("minute")?;
  let second = field("second")?;
  if captures.name("minute").is_none()
    && captures.name("ampm").is_none()
  {
    return Err(unrecognized());
  }

  let hour = match captures
    .name("ampm")
    .map(|m| {
      m.as_str().to_ascii_lowercase()
    }) {
    | Some(ampm) => {
      if raw_hour == 0 || raw_hour > 12
      {
        return Err(unrecognized());
      }
      match (ampm.as_str(), raw_hour) {
        | ("am", 12) => 0,
        | ("am", h) => h,
        | ("pm", 12) => 12,
        | (_, h) => h + 12
      }
    }
    | None => raw_hour
  };

  NaiveTime::from_hms_opt(
    hour, minute, second
  )
  .ok_or_else(unrecognized)
}

fn shift_days(
  from: NaiveDate,
  days: i64
) -> anyhow::Result<NaiveDate> {
  Duration::try_days(days)
    .and_then(|delta| {
      from.checked_add_signed(delta)
    })
    .ok_or_else(|| {
      anyhow!(
        "date offset of {days} days is \
         out of range"
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
  let from_idx = i64::from(
    from.weekday().num_days_from_monday()
  );
  let target_idx = i64::from(
    target.num_days_from_monday()
  );
  let mut delta =
    (7 + target_idx - from_idx) % 7;
  if delta == 0 {
    delta = 7;
  }
  from
    .checked_add_signed(Duration::days(
      delta
    ))
    .unwrap_or(from)
}

#[cfg(test)]
mod tests {
  use chrono::{
    NaiveDate,
    NaiveTime
  };

  use super::{
    parse_clock_time,
    parse_event_date
  };

  fn day(
    y: i32,
    m: u32,
    d: u32
  ) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d)
      .unwrap()
  }

  #[test]
  fn relative_and_absolute_dates() {
    // 2025-01-20 is a Monday.
    let today = day(2025, 1, 20);

    assert_eq!(
      parse_event_date("today", today)
        .unwrap(),
      today
    );
    assert_eq!(
      parse_event_date(
        "Tomorrow", today
      )
      .unwrap(),
      day(2025, 1, 21)
    );
    assert_eq!(
      parse_event_date("sat", today)
        .unwrap(),
      day(2025, 1, 25)
    );
    assert_eq!(
      parse_event_date(
        "monday", today
      )
      .unwrap(),
      day(2025, 1, 27)
    );
    assert_eq!(
      parse_event_date("+2w", today)
        .unwrap(),
      day(2025, 2, 3)
    );
    assert_eq!(
      parse_event_date(
        "2025-02-15",
        today
      )
      .unwrap(),
      day(2025, 2, 15)
    );
    assert!(
      parse_event_date(
        "next spring",
        today
      )
      .is_err()
    );
  }

  #[test]
  fn clock_times() {
    assert_eq!(
      parse_clock_time("09:00")
        .unwrap(),
      NaiveTime::from_hms_opt(9, 0, 0)
        .unwrap()
    );
    assert_eq!(
      parse_clock_time("1:30pm")
        .unwrap(),
      NaiveTime::from_hms_opt(
        13, 30, 0
      )
      .unwrap()
    );
    assert_eq!(
      parse_clock_time("12:15 AM")
        .unwrap(),
      NaiveTime::from_hms_opt(0, 15, 0)
        .unwrap()
    );
    assert_eq!(
      parse_clock_time("9am").unwrap(),
      NaiveTime::from_hms_opt(9, 0, 0)
        .unwrap()
    );
    assert!(
      parse_clock_time("9").is_err()
    );
    assert!(
      parse_clock_time("25:00").is_err()
    );
    assert!(
      parse_clock_time("13:00pm")
        .is_err()
    );
    assert!(
      parse_clock_time("noon").is_err()
    );
  }
}
