// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! Error taxonomy: syntax, validation, and anchor errors are all detected at
//! construction time; generation itself never fails, it only exhausts.

use jiff::civil::DateTime;
use thiserror::Error;

/// Malformed key/value syntax in a rule string.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// A key that is not part of the rule grammar.
    #[error("unrecognized rule key: {0:?}")]
    UnknownKey(String),

    /// A rule part without a `=` separator.
    #[error("rule part {0:?} is missing a value")]
    MissingValue(String),

    /// A value that does not parse as an integer.
    #[error("invalid integer {value:?} for {key}")]
    InvalidNumber {
        /// The rule key the value belongs to.
        key: &'static str,
        /// The offending value.
        value: String,
    },

    /// An unrecognized frequency token.
    #[error("invalid frequency: {0:?}")]
    InvalidFrequency(String),

    /// An unrecognized weekday code.
    #[error("invalid weekday: {0:?}")]
    InvalidWeekday(String),

    /// A date-time that is neither basic (`YYYYMMDDTHHMMSS`) nor ISO 8601.
    #[error("invalid date-time: {0:?}")]
    InvalidDateTime(String),

    /// A period duration that is not an ISO 8601 duration.
    #[error("invalid duration: {0:?}")]
    InvalidDuration(String),
}

/// A value out of range or a forbidden combination of rule parts.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Every rule needs a frequency.
    #[error("FREQ is required")]
    MissingFrequency,

    /// `COUNT` and `UNTIL` bound the same thing and cannot coexist.
    #[error("COUNT and UNTIL are mutually exclusive")]
    CountUntilExclusive,

    /// `INTERVAL` must be a positive integer.
    #[error("INTERVAL must be at least 1")]
    ZeroInterval,

    /// A by-unit value outside its documented range.
    #[error("{key}={value} is out of range ({min}..={max})")]
    OutOfRange {
        /// The rule key the value belongs to.
        key: &'static str,
        /// The offending value.
        value: i64,
        /// Lower bound of the documented range.
        min: i64,
        /// Upper bound of the documented range.
        max: i64,
    },

    /// Zero is excluded from every signed by-unit range.
    #[error("{key} must not contain zero")]
    ZeroValue {
        /// The rule key the value belongs to.
        key: &'static str,
    },

    /// A by-unit filter that is meaningless for the rule's frequency.
    #[error("{key} is not allowed with FREQ={freq}")]
    ForbiddenWithFrequency {
        /// The rule key of the filter.
        key: &'static str,
        /// The frequency it clashes with.
        freq: &'static str,
    },
}

/// Missing or contradictory event anchor or boundary fields.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AnchorError {
    /// The event's end precedes its start.
    #[error("event end {end} precedes start {start}")]
    EndBeforeStart {
        /// The anchor start.
        start: DateTime,
        /// The offending end.
        end: DateTime,
    },

    /// The event's duration is negative.
    #[error("event duration must not be negative")]
    NegativeDuration,

    /// The boundary window's end precedes its start.
    #[error("boundary end {end} precedes start {start}")]
    InvertedBoundary {
        /// The window start.
        start: DateTime,
        /// The offending end.
        end: DateTime,
    },
}

/// Umbrella error for [`RecurrenceRule::parse`](crate::RecurrenceRule::parse):
/// a rule fails as a whole, either at the syntax or at the validation stage.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuleError {
    /// The rule string could not be parsed.
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// The parsed rule violates an invariant.
    #[error(transparent)]
    Validation(#[from] ValidationError),
}
