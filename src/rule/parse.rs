// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! Rule string parsing and validation.
//!
//! A rule string is a `;`-joined sequence of `KEY=VALUE` parts with
//! case-insensitive keys. Parsing is table-driven: every key maps to one
//! branch of a fixed dispatch, and any malformed part invalidates the whole
//! rule.

use std::str::FromStr;

use jiff::SignedDuration;
use jiff::civil::DateTime;

use crate::datetime::parse_date_time;
use crate::error::{ParseError, ValidationError};
use crate::keyword::{
    KW_RRULE_BYDAY, KW_RRULE_BYHOUR, KW_RRULE_BYMINUTE, KW_RRULE_BYMONTH, KW_RRULE_BYMONTHDAY,
    KW_RRULE_BYSECOND, KW_RRULE_BYSETPOS, KW_RRULE_BYWEEKNO, KW_RRULE_BYYEARDAY, KW_RRULE_COUNT,
    KW_RRULE_INTERVAL,
};
use crate::rule::{ExtraDate, Frequency, RecurrenceRule, WeekDay, WeekDayNum};

/// Recognized rule keys, matched case-insensitively.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::EnumString)]
#[strum(serialize_all = "UPPERCASE", ascii_case_insensitive)]
enum RuleKey {
    Freq,
    Interval,
    Count,
    Until,
    Wkst,
    ByMonth,
    ByWeekNo,
    ByYearDay,
    ByMonthDay,
    ByDay,
    ByHour,
    ByMinute,
    BySecond,
    BySetPos,
    RDate,
    ExDate,
}

/// Builds a [`RecurrenceRule`] from structured parameters, a rule string, or
/// a mix of both. Explicitly set parameters win over later rule-string parts.
#[derive(Debug, Clone, Default)]
pub struct RuleBuilder {
    frequency: Option<Frequency>,
    interval: Option<u32>,
    count: Option<u32>,
    until: Option<DateTime>,
    week_start: Option<WeekDay>,
    by_month: Vec<i8>,
    by_week_no: Vec<i8>,
    by_year_day: Vec<i16>,
    by_month_day: Vec<i8>,
    by_day: Vec<WeekDayNum>,
    by_hour: Vec<i8>,
    by_minute: Vec<i8>,
    by_second: Vec<i8>,
    by_set_pos: Vec<i16>,
    rdate: Vec<ExtraDate>,
    exdate: Vec<DateTime>,
}

impl RuleBuilder {
    /// An empty builder.
    #[must_use]
    pub fn new() -> Self {
        RuleBuilder::default()
    }

    /// Sets the frequency.
    #[must_use]
    pub fn frequency(mut self, frequency: Frequency) -> Self {
        self.frequency = Some(frequency);
        self
    }

    /// Sets the interval between frequency periods.
    #[must_use]
    pub fn interval(mut self, interval: u32) -> Self {
        self.interval = Some(interval);
        self
    }

    /// Bounds the recurrence to a number of occurrences.
    #[must_use]
    pub fn count(mut self, count: u32) -> Self {
        self.count = Some(count);
        self
    }

    /// Bounds the recurrence to an inclusive end instant.
    #[must_use]
    pub fn until(mut self, until: DateTime) -> Self {
        self.until = Some(until);
        self
    }

    /// Sets the day weeks start on.
    #[must_use]
    pub fn week_start(mut self, week_start: WeekDay) -> Self {
        self.week_start = Some(week_start);
        self
    }

    /// Selects months of the year (`±1..=12`, negatives count from December).
    #[must_use]
    pub fn by_month(mut self, values: Vec<i8>) -> Self {
        self.by_month = values;
        self
    }

    /// Selects week numbers (`±1..=53`), meaningful only for yearly rules.
    #[must_use]
    pub fn by_week_no(mut self, values: Vec<i8>) -> Self {
        self.by_week_no = values;
        self
    }

    /// Selects days of the year (`±1..=366`).
    #[must_use]
    pub fn by_year_day(mut self, values: Vec<i16>) -> Self {
        self.by_year_day = values;
        self
    }

    /// Selects days of the month (`±1..=31`).
    #[must_use]
    pub fn by_month_day(mut self, values: Vec<i8>) -> Self {
        self.by_month_day = values;
        self
    }

    /// Selects weekdays, with optional ordinals.
    #[must_use]
    pub fn by_day(mut self, values: Vec<WeekDayNum>) -> Self {
        self.by_day = values;
        self
    }

    /// Selects hours of the day (`0..=23`).
    #[must_use]
    pub fn by_hour(mut self, values: Vec<i8>) -> Self {
        self.by_hour = values;
        self
    }

    /// Selects minutes of the hour (`0..=59`).
    #[must_use]
    pub fn by_minute(mut self, values: Vec<i8>) -> Self {
        self.by_minute = values;
        self
    }

    /// Selects seconds of the minute (`0..=59`).
    #[must_use]
    pub fn by_second(mut self, values: Vec<i8>) -> Self {
        self.by_second = values;
        self
    }

    /// Keeps only the given positions of each expanded candidate set
    /// (`±1..=366`, negatives count from the end).
    #[must_use]
    pub fn by_set_pos(mut self, values: Vec<i16>) -> Self {
        self.by_set_pos = values;
        self
    }

    /// Adds explicit extra occurrences.
    #[must_use]
    pub fn rdate(mut self, values: Vec<ExtraDate>) -> Self {
        self.rdate = values;
        self
    }

    /// Adds explicit exclusions.
    #[must_use]
    pub fn exdate(mut self, values: Vec<DateTime>) -> Self {
        self.exdate = values;
        self
    }

    /// Merges a `;`-joined `KEY=VALUE` rule string into the builder. Parts
    /// whose key was already set are ignored.
    ///
    /// ## Errors
    ///
    /// Returns the first malformed part encountered.
    pub fn merge_rule_str(mut self, src: &str) -> Result<Self, ParseError> {
        for part in src.split(';') {
            let part = part.trim();
            if part.is_empty() {
                continue;
            }
            let Some((key, value)) = part.split_once('=') else {
                return Err(ParseError::MissingValue(part.to_owned()));
            };
            let Ok(key) = RuleKey::from_str(key.trim()) else {
                return Err(ParseError::UnknownKey(key.trim().to_owned()));
            };
            self.merge_part(key, value.trim())?;
        }
        Ok(self)
    }

    fn merge_part(&mut self, key: RuleKey, value: &str) -> Result<(), ParseError> {
        match key {
            RuleKey::Freq => {
                if self.frequency.is_none() {
                    self.frequency = Some(
                        Frequency::parse(value)
                            .ok_or_else(|| ParseError::InvalidFrequency(value.to_owned()))?,
                    );
                }
            }
            RuleKey::Interval => {
                if self.interval.is_none() {
                    self.interval = Some(parse_int(KW_RRULE_INTERVAL, value)?);
                }
            }
            RuleKey::Count => {
                if self.count.is_none() {
                    self.count = Some(parse_int(KW_RRULE_COUNT, value)?);
                }
            }
            RuleKey::Until => {
                if self.until.is_none() {
                    self.until = Some(
                        parse_date_time(value)
                            .ok_or_else(|| ParseError::InvalidDateTime(value.to_owned()))?,
                    );
                }
            }
            RuleKey::Wkst => {
                if self.week_start.is_none() {
                    self.week_start = Some(
                        WeekDay::parse(value)
                            .ok_or_else(|| ParseError::InvalidWeekday(value.to_owned()))?,
                    );
                }
            }
            RuleKey::ByMonth => merge_int_list(&mut self.by_month, KW_RRULE_BYMONTH, value)?,
            RuleKey::ByWeekNo => merge_int_list(&mut self.by_week_no, KW_RRULE_BYWEEKNO, value)?,
            RuleKey::ByYearDay => merge_int_list(&mut self.by_year_day, KW_RRULE_BYYEARDAY, value)?,
            RuleKey::ByMonthDay => {
                merge_int_list(&mut self.by_month_day, KW_RRULE_BYMONTHDAY, value)?;
            }
            RuleKey::ByDay => {
                if self.by_day.is_empty() {
                    self.by_day = value
                        .split(',')
                        .map(|v| parse_weekday_num(v.trim()))
                        .collect::<Result<_, _>>()?;
                }
            }
            RuleKey::ByHour => merge_int_list(&mut self.by_hour, KW_RRULE_BYHOUR, value)?,
            RuleKey::ByMinute => merge_int_list(&mut self.by_minute, KW_RRULE_BYMINUTE, value)?,
            RuleKey::BySecond => merge_int_list(&mut self.by_second, KW_RRULE_BYSECOND, value)?,
            RuleKey::BySetPos => merge_int_list(&mut self.by_set_pos, KW_RRULE_BYSETPOS, value)?,
            RuleKey::RDate => {
                if self.rdate.is_empty() {
                    self.rdate = value
                        .split(',')
                        .map(|v| parse_extra_date(v.trim()))
                        .collect::<Result<_, _>>()?;
                }
            }
            RuleKey::ExDate => {
                if self.exdate.is_empty() {
                    self.exdate = value
                        .split(',')
                        .map(|v| {
                            parse_date_time(v.trim())
                                .ok_or_else(|| ParseError::InvalidDateTime(v.trim().to_owned()))
                        })
                        .collect::<Result<_, _>>()?;
                }
            }
        }
        Ok(())
    }

    /// Validates the collected parameters and freezes them into a rule.
    ///
    /// ## Errors
    ///
    /// Returns the first violated invariant: missing frequency, zero
    /// interval, `COUNT`/`UNTIL` together, out-of-range by-unit values, or a
    /// by-unit filter forbidden for the frequency.
    pub fn build(self) -> Result<RecurrenceRule, ValidationError> {
        let frequency = self.frequency.ok_or(ValidationError::MissingFrequency)?;
        let interval = self.interval.unwrap_or(1);
        if interval == 0 {
            return Err(ValidationError::ZeroInterval);
        }
        if self.count.is_some() && self.until.is_some() {
            return Err(ValidationError::CountUntilExclusive);
        }

        check_signed(KW_RRULE_BYMONTH, &self.by_month, 12)?;
        check_signed(KW_RRULE_BYWEEKNO, &self.by_week_no, 53)?;
        check_signed(KW_RRULE_BYYEARDAY, &self.by_year_day, 366)?;
        check_signed(KW_RRULE_BYMONTHDAY, &self.by_month_day, 31)?;
        check_signed(KW_RRULE_BYSETPOS, &self.by_set_pos, 366)?;
        check_unsigned(KW_RRULE_BYHOUR, &self.by_hour, 23)?;
        check_unsigned(KW_RRULE_BYMINUTE, &self.by_minute, 59)?;
        check_unsigned(KW_RRULE_BYSECOND, &self.by_second, 59)?;
        for day in &self.by_day {
            if let Some(ordinal) = day.ordinal {
                check_signed(KW_RRULE_BYDAY, &[ordinal], 53)?;
            }
        }

        if !self.by_week_no.is_empty() && frequency != Frequency::Yearly {
            return Err(ValidationError::ForbiddenWithFrequency {
                key: KW_RRULE_BYWEEKNO,
                freq: frequency.as_str(),
            });
        }
        if !self.by_year_day.is_empty()
            && matches!(
                frequency,
                Frequency::Daily | Frequency::Weekly | Frequency::Monthly
            )
        {
            return Err(ValidationError::ForbiddenWithFrequency {
                key: KW_RRULE_BYYEARDAY,
                freq: frequency.as_str(),
            });
        }
        if !self.by_month_day.is_empty() && frequency == Frequency::Weekly {
            return Err(ValidationError::ForbiddenWithFrequency {
                key: KW_RRULE_BYMONTHDAY,
                freq: frequency.as_str(),
            });
        }

        let week_start = self.week_start.unwrap_or(WeekDay::Monday);
        let weekday_order =
            std::array::from_fn(|i| WeekDay::from_monday_zero(week_start.to_monday_zero() + i as i8));

        // Negative months count from December: -1 is December, -12 January.
        let mut by_month: Vec<i8> = self
            .by_month
            .iter()
            .map(|&m| if m < 0 { 13 + m } else { m })
            .collect();
        by_month.sort_unstable();
        by_month.dedup();

        let mut rdate = self.rdate;
        rdate.sort_unstable_by_key(ExtraDate::start);
        rdate.dedup_by_key(|r| r.start());
        let mut exdate = self.exdate;
        exdate.sort_unstable();
        exdate.dedup();

        Ok(RecurrenceRule {
            frequency,
            interval,
            count: self.count,
            until: self.until,
            week_start,
            by_month,
            by_week_no: sorted(self.by_week_no),
            by_year_day: sorted(self.by_year_day),
            by_month_day: sorted(self.by_month_day),
            by_day: dedup_in_order(self.by_day),
            by_hour: sorted(self.by_hour),
            by_minute: sorted(self.by_minute),
            by_second: sorted(self.by_second),
            by_set_pos: sorted(self.by_set_pos),
            rdate,
            exdate,
            weekday_order,
        })
    }
}

fn parse_int<T: lexical::FromLexical>(key: &'static str, value: &str) -> Result<T, ParseError> {
    let digits = value.strip_prefix('+').unwrap_or(value);
    lexical::parse(digits).map_err(|_| ParseError::InvalidNumber {
        key,
        value: value.to_owned(),
    })
}

fn merge_int_list<T: lexical::FromLexical>(
    dst: &mut Vec<T>,
    key: &'static str,
    value: &str,
) -> Result<(), ParseError> {
    if dst.is_empty() {
        *dst = value
            .split(',')
            .map(|v| parse_int(key, v.trim()))
            .collect::<Result<_, _>>()?;
    }
    Ok(())
}

fn parse_weekday_num(src: &str) -> Result<WeekDayNum, ParseError> {
    if src.len() < 2 || !src.is_ascii() {
        return Err(ParseError::InvalidWeekday(src.to_owned()));
    }
    let (ordinal, code) = src.split_at(src.len() - 2);
    let weekday =
        WeekDay::parse(code).ok_or_else(|| ParseError::InvalidWeekday(src.to_owned()))?;
    if ordinal.is_empty() {
        Ok(WeekDayNum::every(weekday))
    } else {
        Ok(WeekDayNum::nth(parse_int(KW_RRULE_BYDAY, ordinal)?, weekday))
    }
}

/// Parses an extra date: a bare instant, or an iCalendar period in the
/// `start/end` or `start/duration` form.
fn parse_extra_date(src: &str) -> Result<ExtraDate, ParseError> {
    let Some((start, tail)) = src.split_once('/') else {
        return parse_date_time(src)
            .map(ExtraDate::new)
            .ok_or_else(|| ParseError::InvalidDateTime(src.to_owned()));
    };
    let start =
        parse_date_time(start).ok_or_else(|| ParseError::InvalidDateTime(start.to_owned()))?;
    if tail.starts_with(['P', 'p']) {
        let duration = tail
            .parse::<SignedDuration>()
            .map_err(|_| ParseError::InvalidDuration(tail.to_owned()))?;
        Ok(ExtraDate::new(start).with_duration(duration))
    } else {
        let end =
            parse_date_time(tail).ok_or_else(|| ParseError::InvalidDateTime(tail.to_owned()))?;
        Ok(ExtraDate::new(start).with_end(end))
    }
}

/// Checks a list of signed ordinals: `|v|` in `1..=max`, zero excluded.
fn check_signed<T: Copy + Into<i64>>(
    key: &'static str,
    values: &[T],
    max: i64,
) -> Result<(), ValidationError> {
    for &v in values {
        let v = v.into();
        if v == 0 {
            return Err(ValidationError::ZeroValue { key });
        }
        if v.abs() > max {
            return Err(ValidationError::OutOfRange {
                key,
                value: v,
                min: -max,
                max,
            });
        }
    }
    Ok(())
}

/// Checks a list of time components in `0..=max`.
fn check_unsigned(key: &'static str, values: &[i8], max: i64) -> Result<(), ValidationError> {
    for &v in values {
        let v = i64::from(v);
        if !(0..=max).contains(&v) {
            return Err(ValidationError::OutOfRange {
                key,
                value: v,
                min: 0,
                max,
            });
        }
    }
    Ok(())
}

fn sorted<T: Ord>(mut values: Vec<T>) -> Vec<T> {
    values.sort_unstable();
    values.dedup();
    values
}

fn dedup_in_order(values: Vec<WeekDayNum>) -> Vec<WeekDayNum> {
    let mut out = Vec::with_capacity(values.len());
    for v in values {
        if !out.contains(&v) {
            out.push(v);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use jiff::civil::date;

    use super::*;
    use crate::error::RuleError;

    fn parse(src: &str) -> Result<RecurrenceRule, RuleError> {
        RecurrenceRule::parse(src)
    }

    #[test]
    fn parses_a_full_rule_string() {
        let rule = parse("FREQ=WEEKLY;INTERVAL=2;BYDAY=MO,FR;COUNT=5").unwrap();
        assert_eq!(rule.frequency(), Frequency::Weekly);
        assert_eq!(rule.interval(), 2);
        assert_eq!(rule.count(), Some(5));
        assert_eq!(
            rule.by_day(),
            &[
                WeekDayNum::every(WeekDay::Monday),
                WeekDayNum::every(WeekDay::Friday)
            ]
        );
    }

    #[test]
    fn keys_are_case_insensitive_and_defaults_apply() {
        let rule = parse("freq=daily").unwrap();
        assert_eq!(rule.frequency(), Frequency::Daily);
        assert_eq!(rule.interval(), 1);
        assert_eq!(rule.week_start(), WeekDay::Monday);
        assert_eq!(rule.count(), None);
        assert_eq!(rule.until(), None);
    }

    #[test]
    fn parses_signed_ordinals_in_byday() {
        let rule = parse("FREQ=MONTHLY;BYDAY=-1FR,+2MO").unwrap();
        assert_eq!(
            rule.by_day(),
            &[
                WeekDayNum::nth(-1, WeekDay::Friday),
                WeekDayNum::nth(2, WeekDay::Monday)
            ]
        );
    }

    #[test]
    fn parses_until_in_both_date_time_shapes() {
        let expected = Some(date(2024, 6, 30).at(0, 0, 0, 0));
        assert_eq!(parse("FREQ=DAILY;UNTIL=20240630").unwrap().until(), expected);
        assert_eq!(
            parse("FREQ=DAILY;UNTIL=2024-06-30").unwrap().until(),
            expected
        );
        assert_eq!(
            parse("FREQ=DAILY;UNTIL=20240630T000000Z").unwrap().until(),
            expected
        );
    }

    #[test]
    fn normalizes_negative_months() {
        let rule = parse("FREQ=YEARLY;BYMONTH=-1,-12,6").unwrap();
        assert_eq!(rule.by_month(), &[1, 6, 12]);
    }

    #[test]
    fn first_key_wins_on_duplicates() {
        let rule = parse("FREQ=DAILY;INTERVAL=2;INTERVAL=9").unwrap();
        assert_eq!(rule.interval(), 2);
    }

    #[test]
    fn explicit_builder_parameters_win_over_rule_strings() {
        let rule = RecurrenceRule::builder()
            .interval(3)
            .merge_rule_str("FREQ=DAILY;INTERVAL=7")
            .unwrap()
            .build()
            .unwrap();
        assert_eq!(rule.interval(), 3);
    }

    #[test]
    fn rejects_syntax_errors() {
        assert!(matches!(
            parse("FREQ=DAILY;NOPE=1"),
            Err(RuleError::Parse(ParseError::UnknownKey(_)))
        ));
        assert!(matches!(
            parse("FREQ=DAILY;COUNT"),
            Err(RuleError::Parse(ParseError::MissingValue(_)))
        ));
        assert!(matches!(
            parse("FREQ=DAILY;COUNT=abc"),
            Err(RuleError::Parse(ParseError::InvalidNumber { .. }))
        ));
        assert!(matches!(
            parse("FREQ=FORTNIGHTLY"),
            Err(RuleError::Parse(ParseError::InvalidFrequency(_)))
        ));
        assert!(matches!(
            parse("FREQ=WEEKLY;BYDAY=XX"),
            Err(RuleError::Parse(ParseError::InvalidWeekday(_)))
        ));
        assert!(matches!(
            parse("FREQ=DAILY;UNTIL=tomorrow"),
            Err(RuleError::Parse(ParseError::InvalidDateTime(_)))
        ));
    }

    #[test]
    fn rejects_invariant_violations() {
        assert!(matches!(
            parse("INTERVAL=2"),
            Err(RuleError::Validation(ValidationError::MissingFrequency))
        ));
        assert!(matches!(
            parse("FREQ=DAILY;INTERVAL=0"),
            Err(RuleError::Validation(ValidationError::ZeroInterval))
        ));
        assert!(matches!(
            parse("FREQ=DAILY;COUNT=3;UNTIL=20240630"),
            Err(RuleError::Validation(ValidationError::CountUntilExclusive))
        ));
        assert!(matches!(
            parse("FREQ=YEARLY;BYMONTH=13"),
            Err(RuleError::Validation(ValidationError::OutOfRange { .. }))
        ));
        assert!(matches!(
            parse("FREQ=YEARLY;BYMONTH=0"),
            Err(RuleError::Validation(ValidationError::ZeroValue { .. }))
        ));
        assert!(matches!(
            parse("FREQ=DAILY;BYHOUR=24"),
            Err(RuleError::Validation(ValidationError::OutOfRange { .. }))
        ));
    }

    #[test]
    fn rejects_filters_forbidden_for_the_frequency() {
        assert!(matches!(
            parse("FREQ=MONTHLY;BYWEEKNO=20"),
            Err(RuleError::Validation(
                ValidationError::ForbiddenWithFrequency { .. }
            ))
        ));
        assert!(matches!(
            parse("FREQ=WEEKLY;BYMONTHDAY=15"),
            Err(RuleError::Validation(
                ValidationError::ForbiddenWithFrequency { .. }
            ))
        ));
        assert!(matches!(
            parse("FREQ=MONTHLY;BYYEARDAY=100"),
            Err(RuleError::Validation(
                ValidationError::ForbiddenWithFrequency { .. }
            ))
        ));
        // Yearly rules accept all three.
        assert!(parse("FREQ=YEARLY;BYWEEKNO=20;BYYEARDAY=100").is_ok());
    }

    #[test]
    fn parses_rdate_and_exdate_lists() {
        let rule = parse("FREQ=WEEKLY;RDATE=20240105T090000,20240102T090000;EXDATE=20240108T090000")
            .unwrap();
        assert_eq!(rule.rdate().len(), 2);
        // Sorted by start.
        assert_eq!(rule.rdate()[0].start(), date(2024, 1, 2).at(9, 0, 0, 0));
        assert_eq!(rule.exdate(), &[date(2024, 1, 8).at(9, 0, 0, 0)]);
    }

    #[test]
    fn parses_rdate_period_forms() {
        let rule = parse(
            "FREQ=DAILY;COUNT=1;RDATE=20240102T090000/20240102T110000,20240103T090000/PT3H",
        )
        .unwrap();
        assert_eq!(rule.rdate()[0].end(), Some(date(2024, 1, 2).at(11, 0, 0, 0)));
        assert_eq!(rule.rdate()[1].duration(), Some(SignedDuration::from_hours(3)));

        assert!(matches!(
            parse("FREQ=DAILY;RDATE=20240102T090000/PTX"),
            Err(RuleError::Parse(ParseError::InvalidDuration(_)))
        ));
    }
}
