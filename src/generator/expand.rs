// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! Per-period candidate expansion.
//!
//! One frequency period (the year, month, week, day... containing the
//! cursor) expands through the frequency's ordered expansion sets; within a
//! set each enabled field produces its own candidate list and the set keeps
//! the intersection. Limitation fields then accept or reject each survivor,
//! and `BYSETPOS` finally selects by position within the ordered result.

use jiff::civil::{Date, DateTime};

use crate::datetime::{
    add_days, month_day, nth_weekday_of_month, nth_weekday_of_year, week_one_start, week_start,
    weekdays_of_month, weekdays_of_year, weeks_in_year, with_hour, with_minute, with_second,
    year_day,
};
use crate::rule::{Frequency, RecurrenceRule, RuleField, WeekDay};

/// The calendar scope day-selecting fields expand within.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DayScope {
    Week,
    Month,
    Year,
}

fn day_scope(rule: &RecurrenceRule) -> DayScope {
    if rule.frequency() == Frequency::Weekly || !rule.by_week_no().is_empty() {
        DayScope::Week
    } else if rule.frequency() == Frequency::Monthly || !rule.by_month().is_empty() {
        DayScope::Month
    } else {
        DayScope::Year
    }
}

/// Expands the period containing `cursor` into its sorted, de-duplicated
/// candidate instants. An empty result means the period is barren.
pub(super) fn expand_period(
    rule: &RecurrenceRule,
    anchor_start: DateTime,
    cursor: DateTime,
) -> Vec<DateTime> {
    let mut candidates = vec![cursor];
    for set in rule.expansion_sets() {
        let enabled: Vec<RuleField> = set
            .iter()
            .copied()
            .filter(|&f| rule.field_enabled(f))
            .collect();
        if enabled.is_empty() {
            continue;
        }
        let mut next = Vec::new();
        for &candidate in &candidates {
            let mut merged: Option<Vec<DateTime>> = None;
            for &field in &enabled {
                let mut list = expand_field(rule, anchor_start, candidate, field);
                list.sort_unstable();
                list.dedup();
                merged = Some(match merged {
                    None => list,
                    Some(prev) => intersect(&prev, &list),
                });
            }
            if let Some(list) = merged {
                next.extend(list);
            }
        }
        if next.is_empty() {
            return Vec::new();
        }
        candidates = next;
    }

    candidates.sort_unstable();
    candidates.dedup();
    candidates.retain(|&c| passes_limits(rule, c));
    apply_set_pos(rule.by_set_pos(), candidates)
}

fn expand_field(
    rule: &RecurrenceRule,
    anchor_start: DateTime,
    candidate: DateTime,
    field: RuleField,
) -> Vec<DateTime> {
    match field {
        RuleField::ByMonth => expand_by_month(rule, candidate),
        RuleField::ByWeekNo => expand_by_week_no(rule, anchor_start, candidate),
        RuleField::ByYearDay => expand_by_year_day(rule, candidate),
        RuleField::ByMonthDay => expand_by_month_day(rule, candidate),
        RuleField::ByDay => expand_by_day(rule, candidate),
        RuleField::ByHour => rule
            .by_hour()
            .iter()
            .filter_map(|&h| with_hour(candidate, h))
            .collect(),
        RuleField::ByMinute => rule
            .by_minute()
            .iter()
            .filter_map(|&m| with_minute(candidate, m))
            .collect(),
        RuleField::BySecond => rule
            .by_second()
            .iter()
            .filter_map(|&s| with_second(candidate, s))
            .collect(),
    }
}

fn at_time(date: Date, candidate: DateTime) -> DateTime {
    DateTime::from_parts(date, candidate.time())
}

/// The cursor's day in each selected month; months too short for the day
/// produce nothing rather than clamping.
fn expand_by_month(rule: &RecurrenceRule, candidate: DateTime) -> Vec<DateTime> {
    rule.by_month()
        .iter()
        .filter_map(|&m| Date::new(candidate.year(), m, candidate.day()).ok())
        .map(|d| at_time(d, candidate))
        .collect()
}

/// The anchor's weekday within each selected week. Day-selecting fields in
/// the following set re-expand the whole week, so the weekday choice only
/// matters when the rule stops here.
fn expand_by_week_no(
    rule: &RecurrenceRule,
    anchor_start: DateTime,
    candidate: DateTime,
) -> Vec<DateTime> {
    let wkst = rule.week_start();
    let year = candidate.year();
    let total = weeks_in_year(year, wkst);
    let anchor_offset = WeekDay::from(anchor_start.weekday()).offset_from(wkst);
    rule.by_week_no()
        .iter()
        .filter_map(|&w| {
            let n = if w > 0 { w } else { total + w + 1 };
            if !(1..=total).contains(&n) {
                return None;
            }
            let ws = add_days(week_one_start(year, wkst)?, 7 * (i64::from(n) - 1))?;
            add_days(ws, i64::from(anchor_offset))
        })
        .map(|d| at_time(d, candidate))
        .collect()
}

fn expand_by_year_day(rule: &RecurrenceRule, candidate: DateTime) -> Vec<DateTime> {
    let scope = day_scope(rule);
    let wkst = rule.week_start();
    rule.by_year_day()
        .iter()
        .filter_map(|&v| year_day(candidate.year(), v))
        .filter(|&d| match scope {
            DayScope::Week => week_start(d, wkst) == week_start(candidate.date(), wkst),
            DayScope::Month => d.month() == candidate.month(),
            DayScope::Year => true,
        })
        .map(|d| at_time(d, candidate))
        .collect()
}

fn expand_by_month_day(rule: &RecurrenceRule, candidate: DateTime) -> Vec<DateTime> {
    let days = match day_scope(rule) {
        DayScope::Week => {
            let ws = week_start(candidate.date(), rule.week_start());
            (0..7)
                .filter_map(|i| add_days(ws, i))
                .filter(|d| {
                    rule.by_month_day()
                        .iter()
                        .any(|&v| matches_month_day(*d, v))
                })
                .collect()
        }
        DayScope::Month => rule
            .by_month_day()
            .iter()
            .filter_map(|&v| month_day(candidate.year(), candidate.month(), v))
            .collect(),
        DayScope::Year => {
            let mut out = Vec::new();
            for m in 1..=12 {
                out.extend(
                    rule.by_month_day()
                        .iter()
                        .filter_map(|&v| month_day(candidate.year(), m, v)),
                );
            }
            out
        }
    };
    days.into_iter().map(|d| at_time(d, candidate)).collect()
}

/// Ordinals index into the month or year; in week scope they are meaningless
/// and ignored.
fn expand_by_day(rule: &RecurrenceRule, candidate: DateTime) -> Vec<DateTime> {
    let mut days = Vec::new();
    match day_scope(rule) {
        DayScope::Week => {
            let ws = week_start(candidate.date(), rule.week_start());
            for day in rule.by_day() {
                let offset = day.weekday.offset_from(rule.week_start());
                days.extend(add_days(ws, i64::from(offset)));
            }
        }
        DayScope::Month => {
            for day in rule.by_day() {
                match day.ordinal {
                    Some(n) => {
                        days.extend(nth_weekday_of_month(candidate.date(), n, day.weekday));
                    }
                    None => days.extend(weekdays_of_month(candidate.date(), day.weekday)),
                }
            }
        }
        DayScope::Year => {
            for day in rule.by_day() {
                match day.ordinal {
                    Some(n) => {
                        days.extend(nth_weekday_of_year(candidate.date(), n, day.weekday));
                    }
                    None => days.extend(weekdays_of_year(candidate.date(), day.weekday)),
                }
            }
        }
    }
    days.into_iter().map(|d| at_time(d, candidate)).collect()
}

fn intersect(a: &[DateTime], b: &[DateTime]) -> Vec<DateTime> {
    a.iter().copied().filter(|x| b.contains(x)).collect()
}

fn matches_year_day(d: Date, v: i16) -> bool {
    let n = if v > 0 { v } else { d.days_in_year() + v + 1 };
    d.day_of_year() == n
}

fn matches_month_day(d: Date, v: i8) -> bool {
    let n = if v > 0 { v } else { d.days_in_month() + v + 1 };
    d.day() == n
}

/// Whether the candidate passes every enabled limitation field for the
/// rule's frequency.
pub(super) fn passes_limits(rule: &RecurrenceRule, dt: DateTime) -> bool {
    rule.limitations()
        .iter()
        .filter(|&&f| rule.field_enabled(f))
        .all(|&field| match field {
            RuleField::ByMonth => rule.by_month().contains(&dt.month()),
            RuleField::ByWeekNo => true,
            RuleField::ByYearDay => rule
                .by_year_day()
                .iter()
                .any(|&v| matches_year_day(dt.date(), v)),
            RuleField::ByMonthDay => rule
                .by_month_day()
                .iter()
                .any(|&v| matches_month_day(dt.date(), v)),
            RuleField::ByDay => rule
                .by_day()
                .iter()
                .any(|d| d.weekday == WeekDay::from(dt.weekday())),
            RuleField::ByHour => rule.by_hour().contains(&dt.hour()),
            RuleField::ByMinute => rule.by_minute().contains(&dt.minute()),
            RuleField::BySecond => rule.by_second().contains(&dt.second()),
        })
}

fn apply_set_pos(positions: &[i16], candidates: Vec<DateTime>) -> Vec<DateTime> {
    if positions.is_empty() {
        return candidates;
    }
    let len = candidates.len() as i64;
    let mut indices: Vec<usize> = positions
        .iter()
        .filter_map(|&p| {
            let i = if p > 0 { i64::from(p) - 1 } else { len + i64::from(p) };
            usize::try_from(i).ok().filter(|&i| i < candidates.len())
        })
        .collect();
    indices.sort_unstable();
    indices.dedup();
    indices
        .into_iter()
        .filter_map(|i| candidates.get(i).copied())
        .collect()
}
