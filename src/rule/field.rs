// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! The EXPAND/LIMIT taxonomy of by-unit filters (RFC 5545 §3.3.10).
//!
//! For each frequency, expansion sets are applied in order and, within one
//! set, the enabled fields' candidate lists are intersected. Limitation
//! fields only accept or reject candidates the frequency step produced.

use super::Frequency;

/// A by-unit rule field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RuleField {
    ByMonth,
    ByWeekNo,
    ByYearDay,
    ByMonthDay,
    ByDay,
    ByHour,
    ByMinute,
    BySecond,
}

use RuleField::{
    ByDay, ByHour, ByMinute, ByMonth, ByMonthDay, BySecond, ByWeekNo, ByYearDay,
};

const YEARLY_SETS: &[&[RuleField]] = &[
    &[ByMonth],
    &[ByWeekNo],
    &[ByYearDay, ByMonthDay, ByDay],
    &[ByHour],
    &[ByMinute],
    &[BySecond],
];
const MONTHLY_SETS: &[&[RuleField]] = &[
    &[ByMonthDay, ByDay],
    &[ByHour],
    &[ByMinute],
    &[BySecond],
];
const WEEKLY_SETS: &[&[RuleField]] = &[&[ByDay], &[ByHour], &[ByMinute], &[BySecond]];
const DAILY_SETS: &[&[RuleField]] = &[&[ByHour], &[ByMinute], &[BySecond]];
const HOURLY_SETS: &[&[RuleField]] = &[&[ByMinute], &[BySecond]];
const MINUTELY_SETS: &[&[RuleField]] = &[&[BySecond]];
const SECONDLY_SETS: &[&[RuleField]] = &[];

const YEARLY_LIMITS: &[RuleField] = &[];
const MONTHLY_LIMITS: &[RuleField] = &[ByMonth];
const WEEKLY_LIMITS: &[RuleField] = &[ByMonth];
const DAILY_LIMITS: &[RuleField] = &[ByMonth, ByMonthDay, ByDay];
const HOURLY_LIMITS: &[RuleField] = &[ByMonth, ByYearDay, ByMonthDay, ByDay, ByHour];
const MINUTELY_LIMITS: &[RuleField] = &[ByMonth, ByYearDay, ByMonthDay, ByDay, ByHour, ByMinute];
const SECONDLY_LIMITS: &[RuleField] = &[
    ByMonth, ByYearDay, ByMonthDay, ByDay, ByHour, ByMinute, BySecond,
];

/// The ordered expansion sets for a frequency.
pub(crate) const fn expansion_sets(freq: Frequency) -> &'static [&'static [RuleField]] {
    match freq {
        Frequency::Yearly => YEARLY_SETS,
        Frequency::Monthly => MONTHLY_SETS,
        Frequency::Weekly => WEEKLY_SETS,
        Frequency::Daily => DAILY_SETS,
        Frequency::Hourly => HOURLY_SETS,
        Frequency::Minutely => MINUTELY_SETS,
        Frequency::Secondly => SECONDLY_SETS,
    }
}

/// The limitation fields for a frequency.
pub(crate) const fn limitations(freq: Frequency) -> &'static [RuleField] {
    match freq {
        Frequency::Yearly => YEARLY_LIMITS,
        Frequency::Monthly => MONTHLY_LIMITS,
        Frequency::Weekly => WEEKLY_LIMITS,
        Frequency::Daily => DAILY_LIMITS,
        Frequency::Hourly => HOURLY_LIMITS,
        Frequency::Minutely => MINUTELY_LIMITS,
        Frequency::Secondly => SECONDLY_LIMITS,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn yearly_expands_in_documented_order() {
        let sets = expansion_sets(Frequency::Yearly);
        assert_eq!(sets.first(), Some(&[ByMonth].as_slice()));
        assert_eq!(sets.get(2), Some(&[ByYearDay, ByMonthDay, ByDay].as_slice()));
        assert!(limitations(Frequency::Yearly).is_empty());
    }

    #[test]
    fn daily_limits_day_selectors() {
        assert!(!expansion_sets(Frequency::Daily)
            .iter()
            .any(|s| s.contains(&ByDay)));
        assert!(limitations(Frequency::Daily).contains(&ByDay));
        assert!(limitations(Frequency::Daily).contains(&ByMonthDay));
    }

    #[test]
    fn secondly_has_no_expansions() {
        assert!(expansion_sets(Frequency::Secondly).is_empty());
        assert!(limitations(Frequency::Secondly).contains(&BySecond));
    }
}
