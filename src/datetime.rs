// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! Civil date-time helpers: flexible parsing, week numbering relative to a
//! configurable week start, and signed ordinal day resolution.

use jiff::Span;
use jiff::civil::{Date, DateTime, Time};

use crate::rule::WeekDay;

/// NOTE: Used to derive recurrence identifiers, so it must be stable across
/// runs and releases.
pub(crate) const STABLE_FORMAT_COMPACT: &str = "%Y%m%dT%H%M%S";

/// Renders the stable identifier for an occurrence start.
pub(crate) fn format_recurrence_id(dt: DateTime) -> String {
    dt.strftime(STABLE_FORMAT_COMPACT).to_string()
}

/// Parses a date-time in either iCalendar basic format
/// (`YYYYMMDD[THHMMSS[Z]]`) or ISO 8601 extended (`YYYY-MM-DD[THH:MM:SS]`).
/// Date-only values resolve to midnight.
pub(crate) fn parse_date_time(src: &str) -> Option<DateTime> {
    let src = src.trim().trim_end_matches(['Z', 'z']);
    if let Ok(dt) = src.parse::<DateTime>() {
        return Some(dt);
    }
    if let Ok(d) = src.parse::<Date>() {
        return Some(d.at(0, 0, 0, 0));
    }
    if let Ok(dt) = DateTime::strptime(STABLE_FORMAT_COMPACT, src) {
        return Some(dt);
    }
    if let Ok(d) = Date::strptime("%Y%m%d", src) {
        return Some(d.at(0, 0, 0, 0));
    }
    None
}

pub(crate) fn add_days(d: Date, n: i64) -> Option<Date> {
    Span::new()
        .try_days(n)
        .ok()
        .and_then(|s| d.checked_add(s).ok())
}

/// The start of the week containing `d`, per `wkst`.
pub(crate) fn week_start(d: Date, wkst: WeekDay) -> Date {
    let off = WeekDay::from(d.weekday()).offset_from(wkst);
    add_days(d, -i64::from(off)).unwrap_or(d)
}

/// The start of week 1 of `year` per `wkst`: the first week with at least
/// four of its days inside the year. `None` past the calendar's range.
pub(crate) fn week_one_start(year: i16, wkst: WeekDay) -> Option<Date> {
    let jan1 = Date::new(year, 1, 1).ok()?;
    let back = WeekDay::from(jan1.weekday()).offset_from(wkst);
    let start = add_days(jan1, -i64::from(back)).unwrap_or(jan1);
    if back <= 3 {
        Some(start)
    } else {
        add_days(start, 7)
    }
}

/// The number of numbered weeks in `year` per `wkst` (52 or 53).
pub(crate) fn weeks_in_year(year: i16, wkst: WeekDay) -> i8 {
    let Some(a) = week_one_start(year, wkst) else {
        return 52;
    };
    let Some(b) = week_one_start(year.saturating_add(1), wkst) else {
        return 52;
    };
    let days = a.until(b).map(|s| s.get_days()).unwrap_or(364);
    (days / 7) as i8
}

/// Resolves a signed day-of-year ordinal within `year`; `-1` is the last day.
pub(crate) fn year_day(year: i16, ordinal: i16) -> Option<Date> {
    let first = Date::new(year, 1, 1).ok()?;
    let total = first.days_in_year();
    let n = if ordinal > 0 {
        ordinal
    } else {
        total + ordinal + 1
    };
    if (1..=total).contains(&n) {
        add_days(first, i64::from(n) - 1)
    } else {
        None
    }
}

/// Resolves a signed day-of-month ordinal within `year`/`month`; `-1` is the
/// last day. Days that do not exist in the month (e.g. February 30th) resolve
/// to `None` rather than clamping.
pub(crate) fn month_day(year: i16, month: i8, ordinal: i8) -> Option<Date> {
    let first = Date::new(year, month, 1).ok()?;
    let total = first.days_in_month();
    let n = if ordinal > 0 {
        ordinal
    } else {
        total + ordinal + 1
    };
    if (1..=total).contains(&n) {
        Date::new(year, month, n).ok()
    } else {
        None
    }
}

/// The nth `weekday` of the month containing `d`; negative ordinals count
/// from the month's end.
pub(crate) fn nth_weekday_of_month(d: Date, ordinal: i8, weekday: WeekDay) -> Option<Date> {
    if ordinal == 0 {
        return None;
    }
    let found = if ordinal > 0 {
        let first = d.first_of_month();
        let fwd = weekday.offset_from(WeekDay::from(first.weekday()));
        add_days(first, i64::from(fwd) + 7 * (i64::from(ordinal) - 1))?
    } else {
        let last = d.last_of_month();
        let back = WeekDay::from(last.weekday()).offset_from(weekday);
        add_days(last, -(i64::from(back) + 7 * (i64::from(-ordinal) - 1)))?
    };
    (found.year() == d.year() && found.month() == d.month()).then_some(found)
}

/// The nth `weekday` of the year containing `d`; negative ordinals count from
/// the year's end.
pub(crate) fn nth_weekday_of_year(d: Date, ordinal: i8, weekday: WeekDay) -> Option<Date> {
    if ordinal == 0 {
        return None;
    }
    let found = if ordinal > 0 {
        let first = d.first_of_year();
        let fwd = weekday.offset_from(WeekDay::from(first.weekday()));
        add_days(first, i64::from(fwd) + 7 * (i64::from(ordinal) - 1))?
    } else {
        let last = d.last_of_year();
        let back = WeekDay::from(last.weekday()).offset_from(weekday);
        add_days(last, -(i64::from(back) + 7 * (i64::from(-ordinal) - 1)))?
    };
    (found.year() == d.year()).then_some(found)
}

/// All dates in the month containing `d` falling on `weekday`.
pub(crate) fn weekdays_of_month(d: Date, weekday: WeekDay) -> Vec<Date> {
    let first = d.first_of_month();
    let fwd = weekday.offset_from(WeekDay::from(first.weekday()));
    let mut out = Vec::with_capacity(5);
    let mut cur = add_days(first, i64::from(fwd));
    while let Some(day) = cur {
        if day.month() != d.month() || day.year() != d.year() {
            break;
        }
        out.push(day);
        cur = add_days(day, 7);
    }
    out
}

/// All dates in the year containing `d` falling on `weekday`.
pub(crate) fn weekdays_of_year(d: Date, weekday: WeekDay) -> Vec<Date> {
    let first = d.first_of_year();
    let fwd = weekday.offset_from(WeekDay::from(first.weekday()));
    let mut out = Vec::with_capacity(53);
    let mut cur = add_days(first, i64::from(fwd));
    while let Some(day) = cur {
        if day.year() != d.year() {
            break;
        }
        out.push(day);
        cur = add_days(day, 7);
    }
    out
}

pub(crate) fn with_hour(dt: DateTime, hour: i8) -> Option<DateTime> {
    let t = dt.time();
    Time::new(hour, t.minute(), t.second(), t.subsec_nanosecond())
        .ok()
        .map(|t| DateTime::from_parts(dt.date(), t))
}

pub(crate) fn with_minute(dt: DateTime, minute: i8) -> Option<DateTime> {
    let t = dt.time();
    Time::new(t.hour(), minute, t.second(), t.subsec_nanosecond())
        .ok()
        .map(|t| DateTime::from_parts(dt.date(), t))
}

pub(crate) fn with_second(dt: DateTime, second: i8) -> Option<DateTime> {
    let t = dt.time();
    Time::new(t.hour(), t.minute(), second, t.subsec_nanosecond())
        .ok()
        .map(|t| DateTime::from_parts(dt.date(), t))
}
