// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! Forward-only occurrence generation.
//!
//! [`OccurrenceIter`] walks a validated rule from its anchor, one frequency
//! period at a time, expanding each period into a sorted batch of candidate
//! instants and yielding them on demand. All mutable state lives in one
//! private [`GeneratorState`]; `next` and `reset` are the only operations
//! that touch it.

use std::collections::VecDeque;
use std::num::NonZeroU32;

use jiff::Span;
use jiff::civil::{Date, DateTime};

use crate::datetime::week_start;
use crate::event::{Boundary, EventAnchor, Occurrence};
use crate::rule::{ExtraDate, Frequency, RecurrenceRule};

mod expand;

/// Consecutive barren periods tolerated before generation aborts. Guards
/// against combinations that can never match, e.g. `BYMONTH=2;BYMONTHDAY=30`.
pub const DEFAULT_STEP_LIMIT: u32 = 1000;

/// A candidate awaiting emission; explicit extras carry their own end.
#[derive(Debug, Clone, Copy)]
struct Pending {
    start: DateTime,
    extra: Option<ExtraDate>,
}

/// The generator's private cursor state. Advances strictly forward; the
/// terminal `done` flag never clears except through [`OccurrenceIter::reset`].
#[derive(Debug, Clone)]
struct GeneratorState {
    /// Periods stepped so far; the cursor is always recomputed as
    /// `anchor + period * interval` units so clamping never accumulates.
    period: u64,
    pending: VecDeque<Pending>,
    /// Index of the first unconsumed `rdate`.
    rdate_idx: usize,
    emitted: u32,
    next_sequence: u32,
    last: Option<DateTime>,
    barren: u32,
    done: bool,
}

impl GeneratorState {
    fn new() -> Self {
        GeneratorState {
            period: 0,
            pending: VecDeque::new(),
            rdate_idx: 0,
            emitted: 0,
            next_sequence: 1,
            last: None,
            barren: 0,
            done: false,
        }
    }
}

/// A stateful iterator over the occurrences of one rule and anchor.
///
/// Occurrences come out in strictly ascending start order, honoring
/// `count`/`until`, `rdate`/`exdate`, and any pruning hints. Not meant to be
/// shared: every logical query should hold its own iterator (or call
/// [`reset`](OccurrenceIter::reset)) over the same immutable rule.
#[derive(Debug, Clone)]
pub struct OccurrenceIter {
    rule: RecurrenceRule,
    anchor: EventAnchor,
    after: Option<DateTime>,
    before: Option<DateTime>,
    step_limit: u32,
    state: GeneratorState,
}

impl OccurrenceIter {
    /// An iterator over every occurrence of `rule` from `anchor`.
    #[must_use]
    pub fn new(rule: RecurrenceRule, anchor: EventAnchor) -> Self {
        OccurrenceIter {
            rule,
            anchor,
            after: None,
            before: None,
            step_limit: DEFAULT_STEP_LIMIT,
            state: GeneratorState::new(),
        }
    }

    /// An iterator pruned to the boundary window.
    #[must_use]
    pub fn between(rule: RecurrenceRule, anchor: EventAnchor, boundary: &Boundary) -> Self {
        Self::new(rule, anchor)
            .after(boundary.start())
            .before(boundary.end())
    }

    /// Skips occurrences starting before the hint.
    #[must_use]
    pub fn after(mut self, after: DateTime) -> Self {
        self.after = Some(after);
        self
    }

    /// Stops at occurrences starting after the hint.
    #[must_use]
    pub fn before(mut self, before: DateTime) -> Self {
        self.before = Some(before);
        self
    }

    /// Overrides the barren-period safety ceiling.
    #[must_use]
    pub fn with_step_limit(mut self, step_limit: u32) -> Self {
        self.step_limit = step_limit.max(1);
        self
    }

    /// Rewinds to the initial state; the next `next()` call restarts the
    /// sequence from the beginning.
    pub fn reset(&mut self) {
        self.state = GeneratorState::new();
    }

    /// The rule this iterator walks.
    #[must_use]
    pub const fn rule(&self) -> &RecurrenceRule {
        &self.rule
    }

    /// The anchor this iterator starts from.
    #[must_use]
    pub const fn anchor(&self) -> &EventAnchor {
        &self.anchor
    }

    /// The upper start bound, from `until` and the `before` hint.
    fn limit(&self) -> Option<DateTime> {
        match (self.rule.until(), self.before) {
            (Some(u), Some(b)) => Some(u.min(b)),
            (Some(u), None) => Some(u),
            (None, b) => b,
        }
    }

    /// The cursor for period `k`, or `None` past the calendar's range.
    fn cursor(&self, k: u64) -> Option<DateTime> {
        let start = self.anchor.start();
        let n = i64::try_from(k)
            .ok()?
            .checked_mul(i64::from(self.rule.interval()))?;
        match self.rule.frequency() {
            Frequency::Secondly => start.checked_add(Span::new().try_seconds(n).ok()?).ok(),
            Frequency::Minutely => start.checked_add(Span::new().try_minutes(n).ok()?).ok(),
            Frequency::Hourly => start.checked_add(Span::new().try_hours(n).ok()?).ok(),
            Frequency::Daily => start.checked_add(Span::new().try_days(n).ok()?).ok(),
            Frequency::Weekly => start
                .checked_add(Span::new().try_days(n.checked_mul(7)?).ok()?)
                .ok(),
            Frequency::Monthly => {
                let months =
                    i64::from(start.year()) * 12 + i64::from(start.month()) - 1 + n;
                let year = i16::try_from(months.div_euclid(12)).ok()?;
                let month = i8::try_from(months.rem_euclid(12) + 1).ok()?;
                self.day_in(year, month, start)
            }
            Frequency::Yearly => {
                let year = i16::try_from(i64::from(start.year()).checked_add(n)?).ok()?;
                self.day_in(year, start.month(), start)
            }
        }
    }

    /// Places the cursor day within the target month: a placeholder when a
    /// day-selecting by-rule will resolve it, a clamped anchor day otherwise.
    fn day_in(&self, year: i16, month: i8, start: DateTime) -> Option<DateTime> {
        let first = Date::new(year, month, 1).ok()?;
        let day = if self.rule.has_day_selector() {
            1
        } else {
            start.day().min(first.days_in_month())
        };
        Date::new(year, month, day)
            .ok()
            .map(|d| DateTime::from_parts(d, start.time()))
    }

    /// The earliest instant the cursor's period can produce, used against
    /// the `until`/`before` limit so a late anchor day cannot cut off
    /// earlier in-period candidates.
    fn period_floor(&self, cursor: DateTime) -> DateTime {
        let date = match self.rule.frequency() {
            Frequency::Yearly => cursor.date().first_of_year(),
            Frequency::Monthly => cursor.date().first_of_month(),
            Frequency::Weekly => week_start(cursor.date(), self.rule.week_start()),
            _ => return cursor,
        };
        date.at(0, 0, 0, 0)
    }

    fn excluded(&self, start: DateTime) -> bool {
        self.rule.exdate().binary_search(&start).is_ok()
    }

    /// Queues all remaining `rdate`s; used when rule stepping is over but
    /// explicit extras are still owed.
    fn flush_rdates(&mut self) {
        while let Some(&extra) = self.rule.rdate().get(self.state.rdate_idx) {
            self.state.rdate_idx += 1;
            if self.excluded(extra.start()) {
                continue;
            }
            if self.state.last.is_some_and(|last| extra.start() <= last) {
                continue;
            }
            self.state.pending.push_back(Pending {
                start: extra.start(),
                extra: Some(extra),
            });
        }
        self.state.done = true;
    }

    /// Steps periods until a non-empty batch is queued or the sequence ends.
    fn refill(&mut self) {
        let limit = self.limit();
        loop {
            if self.state.barren >= self.step_limit {
                tracing::debug!(
                    barren = self.state.barren,
                    "no matching occurrence within the step ceiling, aborting"
                );
                self.state.done = true;
                return;
            }

            let k = self.state.period;
            self.state.period += 1;
            let Some(cursor) = self.cursor(k) else {
                self.flush_rdates();
                return;
            };
            if let Some(limit) = limit
                && self.period_floor(cursor) > limit
            {
                self.flush_rdates();
                return;
            }

            let mut dates = expand::expand_period(&self.rule, self.anchor.start(), cursor);
            dates.retain(|&d| {
                d >= self.anchor.start()
                    && self.after.is_none_or(|a| d >= a)
                    && limit.is_none_or(|l| d <= l)
                    && self.state.last.is_none_or(|last| d > last)
                    && !self.excluded(d)
            });
            tracing::trace!(period = k, %cursor, candidates = dates.len(), "expanded period");
            if dates.is_empty() {
                self.state.barren += 1;
                continue;
            }
            self.state.barren = 0;

            let mut batch: Vec<Pending> = dates
                .into_iter()
                .map(|start| Pending { start, extra: None })
                .collect();
            // Extras due up to the newest rule date join the batch and win
            // over a coincident rule date.
            let newest = batch.last().map(|p| p.start);
            while let Some(&extra) = self.rule.rdate().get(self.state.rdate_idx) {
                if newest.is_some_and(|n| extra.start() > n) {
                    break;
                }
                self.state.rdate_idx += 1;
                if self.excluded(extra.start())
                    || self.state.last.is_some_and(|last| extra.start() <= last)
                {
                    continue;
                }
                batch.retain(|p| p.start != extra.start());
                batch.push(Pending {
                    start: extra.start(),
                    extra: Some(extra),
                });
            }
            batch.sort_by_key(|p| p.start);
            self.state.pending = batch.into();
            return;
        }
    }

    fn emit(&mut self, pending: Pending) -> Occurrence {
        let end = match pending.extra {
            Some(extra) => match (extra.duration(), extra.end()) {
                (Some(d), _) => pending.start.saturating_add(d),
                (None, Some(end)) => end,
                (None, None) => pending.start.saturating_add(self.anchor.duration()),
            },
            None => pending.start.saturating_add(self.anchor.duration()),
        };
        let sequence = if self.state.emitted == 0 && pending.start == self.anchor.start() {
            None
        } else {
            let n = NonZeroU32::new(self.state.next_sequence);
            self.state.next_sequence = self.state.next_sequence.saturating_add(1);
            n
        };
        self.state.emitted += 1;
        self.state.last = Some(pending.start);
        Occurrence::new(pending.start, end, sequence)
    }
}

impl Iterator for OccurrenceIter {
    type Item = Occurrence;

    fn next(&mut self) -> Option<Occurrence> {
        if self
            .rule
            .count()
            .is_some_and(|count| self.state.emitted >= count)
        {
            return None;
        }
        loop {
            if let Some(pending) = self.state.pending.pop_front() {
                return Some(self.emit(pending));
            }
            if self.state.done {
                return None;
            }
            self.refill();
            if self.state.pending.is_empty() && self.state.done {
                return None;
            }
        }
    }
}

impl std::iter::FusedIterator for OccurrenceIter {}

#[cfg(test)]
mod tests {
    use jiff::SignedDuration;
    use jiff::civil::date;

    use super::*;

    fn starts(iter: OccurrenceIter, cap: usize) -> Vec<DateTime> {
        iter.take(cap).map(|o| o.start()).collect()
    }

    fn rule(src: &str) -> RecurrenceRule {
        RecurrenceRule::parse(src).unwrap()
    }

    #[test]
    fn weekly_byday_skips_the_off_pattern_anchor() {
        // 1980-05-14 is a Wednesday, so the anchor itself never occurs.
        let anchor = EventAnchor::at(date(1980, 5, 14).at(0, 0, 0, 0));
        let iter = OccurrenceIter::new(rule("FREQ=WEEKLY;INTERVAL=1;BYDAY=MO,FR;COUNT=4"), anchor);
        assert_eq!(
            starts(iter, 10),
            vec![
                date(1980, 5, 16).at(0, 0, 0, 0),
                date(1980, 5, 19).at(0, 0, 0, 0),
                date(1980, 5, 23).at(0, 0, 0, 0),
                date(1980, 5, 26).at(0, 0, 0, 0),
            ]
        );
    }

    #[test]
    fn monthly_day_31_skips_short_months() {
        let anchor = EventAnchor::at(date(2021, 1, 31).at(0, 0, 0, 0));
        let iter = OccurrenceIter::new(rule("FREQ=MONTHLY;BYMONTHDAY=31"), anchor);
        assert_eq!(
            starts(iter, 5),
            vec![
                date(2021, 1, 31).at(0, 0, 0, 0),
                date(2021, 3, 31).at(0, 0, 0, 0),
                date(2021, 5, 31).at(0, 0, 0, 0),
                date(2021, 7, 31).at(0, 0, 0, 0),
                date(2021, 8, 31).at(0, 0, 0, 0),
            ]
        );
    }

    #[test]
    fn leap_day_rules_wait_for_leap_years() {
        let anchor = EventAnchor::at(date(2020, 2, 29).at(0, 0, 0, 0));
        let iter = OccurrenceIter::new(rule("FREQ=YEARLY;BYMONTH=2;BYMONTHDAY=29"), anchor);
        assert_eq!(
            starts(iter, 3),
            vec![
                date(2020, 2, 29).at(0, 0, 0, 0),
                date(2024, 2, 29).at(0, 0, 0, 0),
                date(2028, 2, 29).at(0, 0, 0, 0),
            ]
        );
    }

    #[test]
    fn until_and_exdate_bound_the_sequence() {
        let anchor = EventAnchor::at(date(2024, 1, 1).at(0, 0, 0, 0));
        let iter = OccurrenceIter::new(
            rule("FREQ=DAILY;UNTIL=20240103;EXDATE=20240102"),
            anchor,
        );
        assert_eq!(
            starts(iter, 10),
            vec![
                date(2024, 1, 1).at(0, 0, 0, 0),
                date(2024, 1, 3).at(0, 0, 0, 0)
            ]
        );
    }

    #[test]
    fn count_is_exact_then_exhausted() {
        let anchor = EventAnchor::at(date(2024, 1, 1).at(9, 0, 0, 0));
        let mut iter = OccurrenceIter::new(rule("FREQ=DAILY;COUNT=3"), anchor);
        assert_eq!(iter.by_ref().count(), 3);
        assert!(iter.next().is_none());
    }

    #[test]
    fn starts_are_strictly_increasing() {
        let anchor = EventAnchor::at(date(2024, 1, 1).at(9, 0, 0, 0));
        let all = starts(
            OccurrenceIter::new(rule("FREQ=MONTHLY;BYDAY=MO,FR;BYSETPOS=1,-1"), anchor),
            40,
        );
        assert!(all.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn sequence_starts_counting_after_the_anchor() {
        let anchor = EventAnchor::at(date(2024, 1, 1).at(9, 0, 0, 0));
        let mut iter = OccurrenceIter::new(rule("FREQ=DAILY;COUNT=3"), anchor);
        let first = iter.next().unwrap();
        assert_eq!(first.sequence(), None);
        assert_eq!(iter.next().unwrap().sequence(), NonZeroU32::new(1));
        assert_eq!(iter.next().unwrap().sequence(), NonZeroU32::new(2));
    }

    #[test]
    fn off_anchor_first_occurrence_gets_a_sequence() {
        // Anchor is a Wednesday; the first emitted Friday is sequence 1.
        let anchor = EventAnchor::at(date(1980, 5, 14).at(0, 0, 0, 0));
        let mut iter = OccurrenceIter::new(rule("FREQ=WEEKLY;BYDAY=FR;COUNT=1"), anchor);
        assert_eq!(iter.next().unwrap().sequence(), NonZeroU32::new(1));
    }

    #[test]
    fn rdate_wins_over_a_coincident_rule_date() {
        let anchor = EventAnchor::with_duration(
            date(2024, 1, 1).at(9, 0, 0, 0),
            SignedDuration::from_hours(1),
        )
        .unwrap();
        let rule = RecurrenceRule::builder()
            .frequency(Frequency::Daily)
            .count(2)
            .rdate(vec![
                ExtraDate::new(date(2024, 1, 2).at(9, 0, 0, 0))
                    .with_duration(SignedDuration::from_hours(3)),
            ])
            .build()
            .unwrap();
        let occs: Vec<_> = OccurrenceIter::new(rule, anchor).take(3).collect();
        assert_eq!(occs.len(), 2);
        assert_eq!(occs[1].start(), date(2024, 1, 2).at(9, 0, 0, 0));
        // The extra's own duration, not the anchor's hour.
        assert_eq!(occs[1].end(), date(2024, 1, 2).at(12, 0, 0, 0));
    }

    #[test]
    fn trailing_rdates_survive_until() {
        let anchor = EventAnchor::at(date(2024, 1, 1).at(0, 0, 0, 0));
        let iter = OccurrenceIter::new(
            rule("FREQ=DAILY;UNTIL=20240102;RDATE=20240110T000000"),
            anchor,
        );
        assert_eq!(
            starts(iter, 10),
            vec![
                date(2024, 1, 1).at(0, 0, 0, 0),
                date(2024, 1, 2).at(0, 0, 0, 0),
                date(2024, 1, 10).at(0, 0, 0, 0),
            ]
        );
    }

    #[test]
    fn impossible_rules_hit_the_step_ceiling() {
        let anchor = EventAnchor::at(date(2024, 1, 1).at(0, 0, 0, 0));
        let mut iter = OccurrenceIter::new(rule("FREQ=YEARLY;BYMONTH=2;BYMONTHDAY=30"), anchor)
            .with_step_limit(50);
        assert!(iter.next().is_none());
        assert!(iter.next().is_none());
    }

    #[test]
    fn reset_replays_the_same_sequence() {
        let anchor = EventAnchor::at(date(2024, 1, 1).at(9, 0, 0, 0));
        let mut iter = OccurrenceIter::new(rule("FREQ=WEEKLY;BYDAY=MO,FR;COUNT=6"), anchor);
        let first: Vec<_> = iter.by_ref().map(|o| o.start()).collect();
        iter.reset();
        let second: Vec<_> = iter.map(|o| o.start()).collect();
        assert_eq!(first, second);
    }

    #[test]
    fn between_prunes_to_the_window() {
        let anchor = EventAnchor::at(date(2024, 1, 1).at(9, 0, 0, 0));
        let boundary = Boundary::new(
            date(2024, 1, 10).at(0, 0, 0, 0),
            date(2024, 1, 12).at(23, 59, 59, 0),
        )
        .unwrap();
        let iter = OccurrenceIter::between(rule("FREQ=DAILY"), anchor, &boundary);
        assert_eq!(
            starts(iter, 10),
            vec![
                date(2024, 1, 10).at(9, 0, 0, 0),
                date(2024, 1, 11).at(9, 0, 0, 0),
                date(2024, 1, 12).at(9, 0, 0, 0),
            ]
        );
    }

    #[test]
    fn month_end_anchors_clamp_without_drifting() {
        // Jan 31 + 1 month clamps to Feb 29, but +2 months is computed from
        // the anchor and lands back on Mar 31.
        let anchor = EventAnchor::at(date(2024, 1, 31).at(0, 0, 0, 0));
        let iter = OccurrenceIter::new(rule("FREQ=MONTHLY;COUNT=3"), anchor);
        assert_eq!(
            starts(iter, 3),
            vec![
                date(2024, 1, 31).at(0, 0, 0, 0),
                date(2024, 2, 29).at(0, 0, 0, 0),
                date(2024, 3, 31).at(0, 0, 0, 0),
            ]
        );
    }

    #[test]
    fn hourly_byminute_expands_within_each_hour() {
        // 09:00 falls before the anchor and is dropped from the first hour.
        let anchor = EventAnchor::at(date(2024, 1, 1).at(9, 15, 0, 0));
        let iter = OccurrenceIter::new(rule("FREQ=HOURLY;BYMINUTE=0,30;COUNT=4"), anchor);
        assert_eq!(
            starts(iter, 10),
            vec![
                date(2024, 1, 1).at(9, 30, 0, 0),
                date(2024, 1, 1).at(10, 0, 0, 0),
                date(2024, 1, 1).at(10, 30, 0, 0),
                date(2024, 1, 1).at(11, 0, 0, 0),
            ]
        );
    }

    #[test]
    fn minutely_interval_steps_between_occurrences() {
        let anchor = EventAnchor::at(date(2024, 1, 1).at(9, 0, 0, 0));
        let iter = OccurrenceIter::new(rule("FREQ=MINUTELY;INTERVAL=15;COUNT=3"), anchor);
        assert_eq!(
            starts(iter, 5),
            vec![
                date(2024, 1, 1).at(9, 0, 0, 0),
                date(2024, 1, 1).at(9, 15, 0, 0),
                date(2024, 1, 1).at(9, 30, 0, 0),
            ]
        );
    }

    #[test]
    fn secondly_steps_carry_across_midnight() {
        let anchor = EventAnchor::at(date(2024, 1, 1).at(23, 59, 30, 0));
        let iter = OccurrenceIter::new(rule("FREQ=SECONDLY;INTERVAL=20;COUNT=3"), anchor);
        assert_eq!(
            starts(iter, 5),
            vec![
                date(2024, 1, 1).at(23, 59, 30, 0),
                date(2024, 1, 1).at(23, 59, 50, 0),
                date(2024, 1, 2).at(0, 0, 10, 0),
            ]
        );
    }
}
