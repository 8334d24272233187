// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! Human-readable rule descriptions.
//!
//! Pure function of a validated rule. Fragments compose in a fixed order
//! (interval phrase, month/week/day clauses, bound clause) and join with
//! single spaces; an "(approximately)" qualifier marks rules whose sub-day
//! or positional parts the sentence cannot summarize exactly.

use crate::rule::{Frequency, RecurrenceRule};

/// Renders the rule as a natural-language phrase, e.g.
/// `every 2 weeks on Monday and Friday 5 times`.
#[must_use]
pub fn describe(rule: &RecurrenceRule) -> String {
    let mut parts = vec![interval_phrase(rule)];

    if !rule.by_month().is_empty() {
        let months: Vec<String> = rule
            .by_month()
            .iter()
            .map(|&m| month_name(m).to_owned())
            .collect();
        parts.push(format!("in {}", join_and(&months)));
    }
    if !rule.by_week_no().is_empty() {
        let weeks: Vec<String> = rule.by_week_no().iter().map(|w| w.to_string()).collect();
        parts.push(format!("in week {} of the year", join_and(&weeks)));
    }
    if !rule.by_year_day().is_empty() {
        let days: Vec<String> = rule.by_year_day().iter().map(|&d| ordinal(d)).collect();
        parts.push(format!("on the {} day of the year", join_and(&days)));
    }
    if !rule.by_month_day().is_empty() {
        let days: Vec<String> = rule
            .by_month_day()
            .iter()
            .map(|&d| ordinal(i16::from(d)))
            .collect();
        parts.push(format!("on the {} day of the month", join_and(&days)));
    }
    if !rule.by_day().is_empty() {
        let days: Vec<String> = rule
            .by_day()
            .iter()
            .map(|d| match d.ordinal {
                Some(n) => format!("the {} {}", ordinal(i16::from(n)), d.weekday.name()),
                None => d.weekday.name().to_owned(),
            })
            .collect();
        parts.push(format!("on {}", join_and(&days)));
    }

    if let Some(until) = rule.until() {
        parts.push(format!("until {}", until.strftime("%B %-d, %Y")));
    }
    if let Some(count) = rule.count() {
        parts.push(if count == 1 {
            "once".to_owned()
        } else {
            format!("{count} times")
        });
    }

    if is_approximate(rule) {
        parts.push("(approximately)".to_owned());
    }
    parts.join(" ")
}

/// Sub-day selectors and positional selection have no phrase of their own.
fn is_approximate(rule: &RecurrenceRule) -> bool {
    !rule.by_hour().is_empty()
        || !rule.by_minute().is_empty()
        || !rule.by_second().is_empty()
        || !rule.by_set_pos().is_empty()
}

fn interval_phrase(rule: &RecurrenceRule) -> String {
    let unit = match rule.frequency() {
        Frequency::Secondly => "second",
        Frequency::Minutely => "minute",
        Frequency::Hourly => "hour",
        Frequency::Daily => "day",
        Frequency::Weekly => "week",
        Frequency::Monthly => "month",
        Frequency::Yearly => "year",
    };
    match rule.interval() {
        1 => format!("every {unit}"),
        n => format!("every {n} {unit}s"),
    }
}

/// `1st`, `2nd`, `3rd`, `11th`; `-1` is `last`, `-2` is `2nd to the last`.
fn ordinal(n: i16) -> String {
    if n == -1 {
        return "last".to_owned();
    }
    if n < 0 {
        return format!("{} to the last", ordinal(-n));
    }
    let suffix = match n % 100 {
        11..=13 => "th",
        _ => match n % 10 {
            1 => "st",
            2 => "nd",
            3 => "rd",
            _ => "th",
        },
    };
    format!("{n}{suffix}")
}

/// Two items join with `and`; three or more with commas and a trailing `and`.
fn join_and(items: &[String]) -> String {
    match items {
        [] => String::new(),
        [a] => a.clone(),
        [a, b] => format!("{a} and {b}"),
        [init @ .., last] => format!("{}, and {last}", init.join(", ")),
    }
}

fn month_name(m: i8) -> &'static str {
    match m {
        1 => "January",
        2 => "February",
        3 => "March",
        4 => "April",
        5 => "May",
        6 => "June",
        7 => "July",
        8 => "August",
        9 => "September",
        10 => "October",
        11 => "November",
        _ => "December",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn describe_str(src: &str) -> String {
        describe(&RecurrenceRule::parse(src).unwrap())
    }

    #[test]
    fn renders_ordinals() {
        assert_eq!(ordinal(1), "1st");
        assert_eq!(ordinal(2), "2nd");
        assert_eq!(ordinal(3), "3rd");
        assert_eq!(ordinal(4), "4th");
        assert_eq!(ordinal(11), "11th");
        assert_eq!(ordinal(12), "12th");
        assert_eq!(ordinal(21), "21st");
        assert_eq!(ordinal(53), "53rd");
        assert_eq!(ordinal(-1), "last");
        assert_eq!(ordinal(-2), "2nd to the last");
    }

    #[test]
    fn joins_lists_with_conjunctions() {
        let items: Vec<String> = ["a", "b", "c"].iter().map(|s| (*s).to_owned()).collect();
        assert_eq!(join_and(&items[..1]), "a");
        assert_eq!(join_and(&items[..2]), "a and b");
        assert_eq!(join_and(&items), "a, b, and c");
    }

    #[test]
    fn describes_weekly_rules() {
        assert_eq!(
            describe_str("FREQ=WEEKLY;INTERVAL=2;BYDAY=MO,FR;COUNT=5"),
            "every 2 weeks on Monday and Friday 5 times"
        );
        assert_eq!(describe_str("FREQ=WEEKLY"), "every week");
    }

    #[test]
    fn describes_monthly_rules() {
        assert_eq!(
            describe_str("FREQ=MONTHLY;BYMONTHDAY=31"),
            "every month on the 31st day of the month"
        );
        assert_eq!(
            describe_str("FREQ=MONTHLY;BYDAY=-1FR"),
            "every month on the last Friday"
        );
    }

    #[test]
    fn describes_yearly_rules() {
        assert_eq!(
            describe_str("FREQ=YEARLY;BYMONTH=2;BYMONTHDAY=29"),
            "every year in February on the 29th day of the month"
        );
        assert_eq!(
            describe_str("FREQ=YEARLY;BYWEEKNO=20"),
            "every year in week 20 of the year"
        );
        assert_eq!(
            describe_str("FREQ=YEARLY;BYYEARDAY=100"),
            "every year on the 100th day of the year"
        );
    }

    #[test]
    fn describes_bounds() {
        assert_eq!(
            describe_str("FREQ=DAILY;UNTIL=20240630"),
            "every day until June 30, 2024"
        );
        assert_eq!(describe_str("FREQ=DAILY;COUNT=1"), "every day once");
    }

    #[test]
    fn marks_inexact_summaries() {
        assert_eq!(
            describe_str("FREQ=DAILY;BYHOUR=9"),
            "every day (approximately)"
        );
        assert_eq!(
            describe_str("FREQ=MONTHLY;BYDAY=MO,TU,WE,TH,FR;BYSETPOS=-1"),
            "every month on Monday, Tuesday, Wednesday, Thursday, and Friday (approximately)"
        );
    }
}
