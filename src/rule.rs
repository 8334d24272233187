// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! Recurrence rule model: an immutable, validated description of a repeating
//! pattern (RFC 5545 §3.3.10), plus the closed enumerations it is built from.

use std::fmt::{self, Display};

use jiff::SignedDuration;
use jiff::civil::DateTime;

use crate::error::RuleError;
use crate::keyword::{
    KW_DAY_FR, KW_DAY_MO, KW_DAY_SA, KW_DAY_SU, KW_DAY_TH, KW_DAY_TU, KW_DAY_WE, KW_RRULE_BYDAY,
    KW_RRULE_BYHOUR, KW_RRULE_BYMINUTE, KW_RRULE_BYMONTH, KW_RRULE_BYMONTHDAY, KW_RRULE_BYSECOND,
    KW_RRULE_BYSETPOS, KW_RRULE_BYWEEKNO, KW_RRULE_BYYEARDAY, KW_RRULE_COUNT, KW_RRULE_EXDATE,
    KW_RRULE_FREQ, KW_RRULE_FREQ_DAILY, KW_RRULE_FREQ_HOURLY, KW_RRULE_FREQ_MINUTELY,
    KW_RRULE_FREQ_MONTHLY, KW_RRULE_FREQ_SECONDLY, KW_RRULE_FREQ_WEEKLY, KW_RRULE_FREQ_YEARLY,
    KW_RRULE_INTERVAL, KW_RRULE_RDATE, KW_RRULE_UNTIL, KW_RRULE_WKST,
};

mod field;
mod parse;

pub(crate) use field::RuleField;
pub use parse::RuleBuilder;

/// Recurrence frequency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[expect(missing_docs)]
pub enum Frequency {
    Secondly,
    Minutely,
    Hourly,
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

impl Frequency {
    /// Returns the keyword representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Frequency::Secondly => KW_RRULE_FREQ_SECONDLY,
            Frequency::Minutely => KW_RRULE_FREQ_MINUTELY,
            Frequency::Hourly => KW_RRULE_FREQ_HOURLY,
            Frequency::Daily => KW_RRULE_FREQ_DAILY,
            Frequency::Weekly => KW_RRULE_FREQ_WEEKLY,
            Frequency::Monthly => KW_RRULE_FREQ_MONTHLY,
            Frequency::Yearly => KW_RRULE_FREQ_YEARLY,
        }
    }

    /// Parses a frequency keyword (case-insensitive).
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        Some(match s.to_ascii_uppercase().as_str() {
            KW_RRULE_FREQ_SECONDLY => Frequency::Secondly,
            KW_RRULE_FREQ_MINUTELY => Frequency::Minutely,
            KW_RRULE_FREQ_HOURLY => Frequency::Hourly,
            KW_RRULE_FREQ_DAILY => Frequency::Daily,
            KW_RRULE_FREQ_WEEKLY => Frequency::Weekly,
            KW_RRULE_FREQ_MONTHLY => Frequency::Monthly,
            KW_RRULE_FREQ_YEARLY => Frequency::Yearly,
            _ => return None,
        })
    }

    /// Whether the frequency steps in units finer than one day.
    #[must_use]
    pub const fn is_sub_daily(self) -> bool {
        matches!(
            self,
            Frequency::Secondly | Frequency::Minutely | Frequency::Hourly
        )
    }
}

impl Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Day of the week.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[expect(missing_docs)]
pub enum WeekDay {
    Sunday,
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
}

impl WeekDay {
    /// Returns the two-letter code.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            WeekDay::Sunday => KW_DAY_SU,
            WeekDay::Monday => KW_DAY_MO,
            WeekDay::Tuesday => KW_DAY_TU,
            WeekDay::Wednesday => KW_DAY_WE,
            WeekDay::Thursday => KW_DAY_TH,
            WeekDay::Friday => KW_DAY_FR,
            WeekDay::Saturday => KW_DAY_SA,
        }
    }

    /// The full English name, used by the text formatter.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            WeekDay::Sunday => "Sunday",
            WeekDay::Monday => "Monday",
            WeekDay::Tuesday => "Tuesday",
            WeekDay::Wednesday => "Wednesday",
            WeekDay::Thursday => "Thursday",
            WeekDay::Friday => "Friday",
            WeekDay::Saturday => "Saturday",
        }
    }

    /// Parses a two-letter weekday code (case-insensitive).
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        Some(match s.to_ascii_uppercase().as_str() {
            KW_DAY_SU => WeekDay::Sunday,
            KW_DAY_MO => WeekDay::Monday,
            KW_DAY_TU => WeekDay::Tuesday,
            KW_DAY_WE => WeekDay::Wednesday,
            KW_DAY_TH => WeekDay::Thursday,
            KW_DAY_FR => WeekDay::Friday,
            KW_DAY_SA => WeekDay::Saturday,
            _ => return None,
        })
    }

    /// Days since Monday, in `0..=6`.
    pub(crate) const fn to_monday_zero(self) -> i8 {
        match self {
            WeekDay::Monday => 0,
            WeekDay::Tuesday => 1,
            WeekDay::Wednesday => 2,
            WeekDay::Thursday => 3,
            WeekDay::Friday => 4,
            WeekDay::Saturday => 5,
            WeekDay::Sunday => 6,
        }
    }

    pub(crate) const fn from_monday_zero(n: i8) -> Self {
        match n.rem_euclid(7) {
            0 => WeekDay::Monday,
            1 => WeekDay::Tuesday,
            2 => WeekDay::Wednesday,
            3 => WeekDay::Thursday,
            4 => WeekDay::Friday,
            5 => WeekDay::Saturday,
            _ => WeekDay::Sunday,
        }
    }

    /// Days from the week start `wkst` to `self`, in `0..=6`.
    pub(crate) const fn offset_from(self, wkst: WeekDay) -> i8 {
        (self.to_monday_zero() - wkst.to_monday_zero()).rem_euclid(7)
    }
}

impl Display for WeekDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl From<jiff::civil::Weekday> for WeekDay {
    fn from(day: jiff::civil::Weekday) -> Self {
        match day {
            jiff::civil::Weekday::Sunday => WeekDay::Sunday,
            jiff::civil::Weekday::Monday => WeekDay::Monday,
            jiff::civil::Weekday::Tuesday => WeekDay::Tuesday,
            jiff::civil::Weekday::Wednesday => WeekDay::Wednesday,
            jiff::civil::Weekday::Thursday => WeekDay::Thursday,
            jiff::civil::Weekday::Friday => WeekDay::Friday,
            jiff::civil::Weekday::Saturday => WeekDay::Saturday,
        }
    }
}

/// Weekday with an optional signed ordinal.
///
/// `MO` is every Monday; `2FR` the second Friday of the month or year;
/// `-1FR` the last Friday.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WeekDayNum {
    /// Occurrence within the month or year (`-53..=53`, never 0).
    pub ordinal: Option<i8>,
    /// The day of the week.
    pub weekday: WeekDay,
}

impl WeekDayNum {
    /// A weekday without an ordinal.
    #[must_use]
    pub const fn every(weekday: WeekDay) -> Self {
        WeekDayNum {
            ordinal: None,
            weekday,
        }
    }

    /// A weekday with an ordinal.
    #[must_use]
    pub const fn nth(ordinal: i8, weekday: WeekDay) -> Self {
        WeekDayNum {
            ordinal: Some(ordinal),
            weekday,
        }
    }
}

impl Display for WeekDayNum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(n) = self.ordinal {
            write!(f, "{n}")?;
        }
        write!(f, "{}", self.weekday)
    }
}

/// An explicit extra occurrence (`RDATE`), with its own optional end or
/// duration overriding the anchor's.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtraDate {
    start: DateTime,
    end: Option<DateTime>,
    duration: Option<SignedDuration>,
}

impl ExtraDate {
    /// An extra occurrence inheriting the anchor's duration.
    #[must_use]
    pub const fn new(start: DateTime) -> Self {
        ExtraDate {
            start,
            end: None,
            duration: None,
        }
    }

    /// Sets an explicit end.
    #[must_use]
    pub const fn with_end(mut self, end: DateTime) -> Self {
        self.end = Some(end);
        self
    }

    /// Sets an explicit duration. Takes priority over an explicit end.
    #[must_use]
    pub const fn with_duration(mut self, duration: SignedDuration) -> Self {
        self.duration = Some(duration);
        self
    }

    /// The start instant.
    #[must_use]
    pub const fn start(&self) -> DateTime {
        self.start
    }

    /// The explicit end, if any.
    #[must_use]
    pub const fn end(&self) -> Option<DateTime> {
        self.end
    }

    /// The explicit duration, if any.
    #[must_use]
    pub const fn duration(&self) -> Option<SignedDuration> {
        self.duration
    }
}

/// A validated, immutable recurrence rule.
///
/// Built once through [`RuleBuilder`] or [`RecurrenceRule::parse`] and never
/// mutated afterwards; safe to share between a generator, the collision
/// detector, and the text formatter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecurrenceRule {
    frequency: Frequency,
    interval: u32,
    count: Option<u32>,
    until: Option<DateTime>,
    week_start: WeekDay,
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
    weekday_order: [WeekDay; 7],
}

impl RecurrenceRule {
    /// Parses a `;`-joined `KEY=VALUE` rule string, e.g.
    /// `FREQ=WEEKLY;INTERVAL=2;BYDAY=MO,FR;COUNT=5`.
    ///
    /// ## Errors
    ///
    /// Any single malformed part or violated invariant invalidates the whole
    /// rule; there is no partial-success state.
    pub fn parse(src: &str) -> Result<Self, RuleError> {
        Ok(RuleBuilder::new().merge_rule_str(src)?.build()?)
    }

    /// Starts building a rule from structured parameters.
    #[must_use]
    pub fn builder() -> RuleBuilder {
        RuleBuilder::new()
    }

    /// The recurrence frequency.
    #[must_use]
    pub const fn frequency(&self) -> Frequency {
        self.frequency
    }

    /// The interval between frequency periods, at least 1.
    #[must_use]
    pub const fn interval(&self) -> u32 {
        self.interval
    }

    /// The occurrence count bound, mutually exclusive with `until`.
    #[must_use]
    pub const fn count(&self) -> Option<u32> {
        self.count
    }

    /// The inclusive end of the recurrence, mutually exclusive with `count`.
    #[must_use]
    pub const fn until(&self) -> Option<DateTime> {
        self.until
    }

    /// The day weeks start on, Monday unless specified otherwise.
    #[must_use]
    pub const fn week_start(&self) -> WeekDay {
        self.week_start
    }

    /// Months selected by the rule, normalized to `1..=12`.
    #[must_use]
    pub fn by_month(&self) -> &[i8] {
        &self.by_month
    }

    /// Week numbers selected by the rule (`±1..=53`).
    #[must_use]
    pub fn by_week_no(&self) -> &[i8] {
        &self.by_week_no
    }

    /// Days of the year selected by the rule (`±1..=366`).
    #[must_use]
    pub fn by_year_day(&self) -> &[i16] {
        &self.by_year_day
    }

    /// Days of the month selected by the rule (`±1..=31`).
    #[must_use]
    pub fn by_month_day(&self) -> &[i8] {
        &self.by_month_day
    }

    /// Weekdays selected by the rule, with optional ordinals.
    #[must_use]
    pub fn by_day(&self) -> &[WeekDayNum] {
        &self.by_day
    }

    /// Hours selected by the rule (`0..=23`).
    #[must_use]
    pub fn by_hour(&self) -> &[i8] {
        &self.by_hour
    }

    /// Minutes selected by the rule (`0..=59`).
    #[must_use]
    pub fn by_minute(&self) -> &[i8] {
        &self.by_minute
    }

    /// Seconds selected by the rule (`0..=59`).
    #[must_use]
    pub fn by_second(&self) -> &[i8] {
        &self.by_second
    }

    /// Positions within one fully expanded candidate set (`±1..=366`).
    #[must_use]
    pub fn by_set_pos(&self) -> &[i16] {
        &self.by_set_pos
    }

    /// Explicit extra occurrences, sorted by start.
    #[must_use]
    pub fn rdate(&self) -> &[ExtraDate] {
        &self.rdate
    }

    /// Explicitly excluded instants, sorted.
    #[must_use]
    pub fn exdate(&self) -> &[DateTime] {
        &self.exdate
    }

    /// The seven weekdays rotated so the sequence begins at `week_start`.
    #[must_use]
    pub const fn weekday_order(&self) -> &[WeekDay; 7] {
        &self.weekday_order
    }

    /// The ordered expansion sets for this rule's frequency.
    pub(crate) fn expansion_sets(&self) -> &'static [&'static [RuleField]] {
        field::expansion_sets(self.frequency)
    }

    /// The limitation fields for this rule's frequency.
    pub(crate) fn limitations(&self) -> &'static [RuleField] {
        field::limitations(self.frequency)
    }

    /// Whether the given by-unit filter carries any values.
    pub(crate) fn field_enabled(&self, field: RuleField) -> bool {
        match field {
            RuleField::ByMonth => !self.by_month.is_empty(),
            RuleField::ByWeekNo => !self.by_week_no.is_empty(),
            RuleField::ByYearDay => !self.by_year_day.is_empty(),
            RuleField::ByMonthDay => !self.by_month_day.is_empty(),
            RuleField::ByDay => !self.by_day.is_empty(),
            RuleField::ByHour => !self.by_hour.is_empty(),
            RuleField::ByMinute => !self.by_minute.is_empty(),
            RuleField::BySecond => !self.by_second.is_empty(),
        }
    }

    /// Whether any by-unit filter selects the day. When one does, cursor
    /// advancement leaves day resolution to the expansion step rather than
    /// clamping into short months.
    pub(crate) fn has_day_selector(&self) -> bool {
        !self.by_week_no.is_empty()
            || !self.by_year_day.is_empty()
            || !self.by_month_day.is_empty()
            || !self.by_day.is_empty()
    }
}

fn push_list<T: Display>(parts: &mut Vec<String>, key: &str, values: &[T]) {
    if !values.is_empty() {
        let s: Vec<_> = values.iter().map(ToString::to_string).collect();
        parts.push(format!("{key}={}", s.join(",")));
    }
}

/// Renders an extra date as a bare instant, or as an iCalendar period
/// (`start/end` or `start/duration`) when the entry overrides the event end.
fn render_extra_date(extra: &ExtraDate) -> String {
    let start = extra.start().strftime(crate::datetime::STABLE_FORMAT_COMPACT);
    match (extra.duration(), extra.end()) {
        (Some(duration), _) => format!("{start}/{duration}"),
        (None, Some(end)) => format!(
            "{start}/{}",
            end.strftime(crate::datetime::STABLE_FORMAT_COMPACT)
        ),
        (None, None) => start.to_string(),
    }
}

impl Display for RecurrenceRule {
    /// Renders the normalized rule string: fixed key order, defaults omitted.
    /// Parsing the output yields an equal rule.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = vec![format!("{KW_RRULE_FREQ}={}", self.frequency)];

        if self.interval != 1 {
            parts.push(format!("{KW_RRULE_INTERVAL}={}", self.interval));
        }
        if let Some(count) = self.count {
            parts.push(format!("{KW_RRULE_COUNT}={count}"));
        }
        if let Some(until) = self.until {
            parts.push(format!(
                "{KW_RRULE_UNTIL}={}",
                until.strftime(crate::datetime::STABLE_FORMAT_COMPACT)
            ));
        }
        if self.week_start != WeekDay::Monday {
            parts.push(format!("{KW_RRULE_WKST}={}", self.week_start));
        }

        push_list(&mut parts, KW_RRULE_BYMONTH, &self.by_month);
        push_list(&mut parts, KW_RRULE_BYWEEKNO, &self.by_week_no);
        push_list(&mut parts, KW_RRULE_BYYEARDAY, &self.by_year_day);
        push_list(&mut parts, KW_RRULE_BYMONTHDAY, &self.by_month_day);
        push_list(&mut parts, KW_RRULE_BYDAY, &self.by_day);
        push_list(&mut parts, KW_RRULE_BYHOUR, &self.by_hour);
        push_list(&mut parts, KW_RRULE_BYMINUTE, &self.by_minute);
        push_list(&mut parts, KW_RRULE_BYSECOND, &self.by_second);
        push_list(&mut parts, KW_RRULE_BYSETPOS, &self.by_set_pos);

        if !self.rdate.is_empty() {
            let s: Vec<_> = self.rdate.iter().map(render_extra_date).collect();
            parts.push(format!("{KW_RRULE_RDATE}={}", s.join(",")));
        }
        if !self.exdate.is_empty() {
            let s: Vec<_> = self
                .exdate
                .iter()
                .map(|d| {
                    d.strftime(crate::datetime::STABLE_FORMAT_COMPACT)
                        .to_string()
                })
                .collect();
            parts.push(format!("{KW_RRULE_EXDATE}={}", s.join(",")));
        }

        write!(f, "{}", parts.join(";"))
    }
}

#[cfg(test)]
mod tests {
    use jiff::civil::date;

    use super::*;

    #[test]
    fn parses_frequency_keywords() {
        assert_eq!(Frequency::parse("DAILY"), Some(Frequency::Daily));
        assert_eq!(Frequency::parse("weekly"), Some(Frequency::Weekly));
        assert_eq!(Frequency::parse("ANNUALLY"), None);
    }

    #[test]
    fn classifies_sub_daily_frequencies() {
        assert!(Frequency::Secondly.is_sub_daily());
        assert!(Frequency::Minutely.is_sub_daily());
        assert!(Frequency::Hourly.is_sub_daily());
        assert!(!Frequency::Daily.is_sub_daily());
        assert!(!Frequency::Yearly.is_sub_daily());
    }

    #[test]
    fn parses_weekday_codes() {
        assert_eq!(WeekDay::parse("MO"), Some(WeekDay::Monday));
        assert_eq!(WeekDay::parse("fr"), Some(WeekDay::Friday));
        assert_eq!(WeekDay::parse("XX"), None);
    }

    #[test]
    fn computes_weekday_offsets() {
        assert_eq!(WeekDay::Monday.offset_from(WeekDay::Monday), 0);
        assert_eq!(WeekDay::Sunday.offset_from(WeekDay::Monday), 6);
        assert_eq!(WeekDay::Monday.offset_from(WeekDay::Sunday), 1);
        assert_eq!(WeekDay::Saturday.offset_from(WeekDay::Sunday), 6);
    }

    #[test]
    fn rotates_weekday_order_at_week_start() {
        let rule = RecurrenceRule::parse("FREQ=WEEKLY;WKST=SU").unwrap();
        assert_eq!(rule.weekday_order()[0], WeekDay::Sunday);
        assert_eq!(rule.weekday_order()[1], WeekDay::Monday);
        assert_eq!(rule.weekday_order()[6], WeekDay::Saturday);
    }

    #[test]
    fn displays_weekday_num() {
        assert_eq!(WeekDayNum::every(WeekDay::Monday).to_string(), "MO");
        assert_eq!(WeekDayNum::nth(-1, WeekDay::Friday).to_string(), "-1FR");
        assert_eq!(WeekDayNum::nth(2, WeekDay::Tuesday).to_string(), "2TU");
    }

    #[test]
    fn displays_normalized_rule() {
        let rule = RecurrenceRule::parse("byday=fr,mo;freq=weekly;interval=2;count=5").unwrap();
        assert_eq!(rule.to_string(), "FREQ=WEEKLY;INTERVAL=2;COUNT=5;BYDAY=FR,MO");
    }

    #[test]
    fn display_round_trips() {
        let sources = [
            "FREQ=WEEKLY;INTERVAL=2;BYDAY=MO,FR;COUNT=5",
            "FREQ=MONTHLY;BYMONTHDAY=31",
            "FREQ=YEARLY;BYMONTH=2;BYMONTHDAY=29",
            "FREQ=DAILY;UNTIL=20240103T000000",
            "FREQ=MONTHLY;BYDAY=MO,TU,WE,TH,FR;BYSETPOS=-1",
            "FREQ=WEEKLY;WKST=SU;BYDAY=SA,SU",
        ];
        for src in sources {
            let rule = RecurrenceRule::parse(src).unwrap();
            let normalized = rule.to_string();
            let reparsed = RecurrenceRule::parse(&normalized).unwrap();
            assert_eq!(rule, reparsed, "rule mismatch for {src}");
            assert_eq!(normalized, reparsed.to_string(), "unstable for {src}");
        }
    }

    #[test]
    fn displays_rdate_overrides_as_periods() {
        let rule = RecurrenceRule::builder()
            .frequency(Frequency::Daily)
            .count(1)
            .rdate(vec![
                ExtraDate::new(date(2024, 1, 2).at(9, 0, 0, 0))
                    .with_end(date(2024, 1, 2).at(11, 0, 0, 0)),
                ExtraDate::new(date(2024, 1, 3).at(9, 0, 0, 0))
                    .with_duration(SignedDuration::from_hours(3)),
            ])
            .build()
            .unwrap();

        let rendered = rule.to_string();
        assert!(
            rendered.contains("RDATE=20240102T090000/20240102T110000,20240103T090000/"),
            "missing period forms in {rendered}"
        );
        let reparsed = RecurrenceRule::parse(&rendered).unwrap();
        assert_eq!(rule, reparsed);
        assert_eq!(
            reparsed.rdate()[1].duration(),
            Some(SignedDuration::from_hours(3))
        );
    }
}
