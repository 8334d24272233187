// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! The event anchor a rule recurs from, the boundary window queries ask
//! about, and the concrete occurrences the generator emits.

use std::num::NonZeroU32;

use jiff::SignedDuration;
use jiff::civil::DateTime;
use jiff::tz::TimeZone;

use crate::datetime::format_recurrence_id;
use crate::error::AnchorError;

/// The base event a recurrence expands from: a start instant and exactly one
/// of an end instant or a duration.
///
/// Recurrence arithmetic is civil (local-time) per RFC 5545; the optional
/// time zone is carried through for callers, never consulted by the engine.
#[derive(Debug, Clone)]
pub struct EventAnchor {
    start: DateTime,
    end: Option<DateTime>,
    duration: Option<SignedDuration>,
    time_zone: Option<TimeZone>,
}

impl EventAnchor {
    /// An anchor bounded by an explicit end instant.
    ///
    /// ## Errors
    ///
    /// Rejects an end that precedes the start.
    pub fn with_end(start: DateTime, end: DateTime) -> Result<Self, AnchorError> {
        if end < start {
            return Err(AnchorError::EndBeforeStart { start, end });
        }
        Ok(EventAnchor {
            start,
            end: Some(end),
            duration: None,
            time_zone: None,
        })
    }

    /// An anchor bounded by a duration.
    ///
    /// ## Errors
    ///
    /// Rejects a negative duration.
    pub fn with_duration(start: DateTime, duration: SignedDuration) -> Result<Self, AnchorError> {
        if duration.is_negative() {
            return Err(AnchorError::NegativeDuration);
        }
        Ok(EventAnchor {
            start,
            end: None,
            duration: Some(duration),
            time_zone: None,
        })
    }

    /// A zero-length anchor, for callers that only track instants.
    #[must_use]
    pub const fn at(start: DateTime) -> Self {
        EventAnchor {
            start,
            end: None,
            duration: None,
            time_zone: None,
        }
    }

    /// Attaches the event's time zone.
    #[must_use]
    pub fn in_time_zone(mut self, time_zone: TimeZone) -> Self {
        self.time_zone = Some(time_zone);
        self
    }

    /// The anchor start.
    #[must_use]
    pub const fn start(&self) -> DateTime {
        self.start
    }

    /// The anchor end, derived from the duration when no explicit end is set.
    #[must_use]
    pub fn end(&self) -> DateTime {
        match (self.end, self.duration) {
            (Some(end), _) => end,
            (None, Some(d)) => self.start.saturating_add(d),
            (None, None) => self.start,
        }
    }

    /// The anchor duration, derived from the end when no explicit duration
    /// is set.
    #[must_use]
    pub fn duration(&self) -> SignedDuration {
        match self.duration {
            Some(d) => d,
            None => self.start.duration_until(self.end()),
        }
    }

    /// The event's time zone, if the caller supplied one.
    #[must_use]
    pub const fn time_zone(&self) -> Option<&TimeZone> {
        self.time_zone.as_ref()
    }
}

/// An inclusive query window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Boundary {
    start: DateTime,
    end: DateTime,
}

impl Boundary {
    /// A window from `start` to `end`, both inclusive.
    ///
    /// ## Errors
    ///
    /// Rejects an inverted window.
    pub fn new(start: DateTime, end: DateTime) -> Result<Self, AnchorError> {
        if end < start {
            return Err(AnchorError::InvertedBoundary { start, end });
        }
        Ok(Boundary { start, end })
    }

    /// The window start.
    #[must_use]
    pub const fn start(&self) -> DateTime {
        self.start
    }

    /// The window end.
    #[must_use]
    pub const fn end(&self) -> DateTime {
        self.end
    }

    /// Whether the instant falls inside the window.
    #[must_use]
    pub fn contains(&self, instant: DateTime) -> bool {
        self.start <= instant && instant <= self.end
    }

    /// The window's length.
    #[must_use]
    pub fn duration(&self) -> SignedDuration {
        self.start.duration_until(self.end)
    }
}

/// One concrete instance of a recurring event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Occurrence {
    start: DateTime,
    end: DateTime,
    sequence: Option<NonZeroU32>,
}

impl Occurrence {
    pub(crate) const fn new(start: DateTime, end: DateTime, sequence: Option<NonZeroU32>) -> Self {
        Occurrence {
            start,
            end,
            sequence,
        }
    }

    /// The occurrence start.
    #[must_use]
    pub const fn start(&self) -> DateTime {
        self.start
    }

    /// The occurrence end.
    #[must_use]
    pub const fn end(&self) -> DateTime {
        self.end
    }

    /// The 1-based position within the recurrence. `None` for the very first
    /// occurrence when it coincides with the anchor start.
    #[must_use]
    pub const fn sequence(&self) -> Option<NonZeroU32> {
        self.sequence
    }

    /// A stable identifier derived from the start instant, suitable for
    /// deduplication (e.g. an ICS `RECURRENCE-ID`).
    #[must_use]
    pub fn recurrence_id(&self) -> String {
        format_recurrence_id(self.start)
    }
}

#[cfg(test)]
mod tests {
    use jiff::civil::date;

    use super::*;

    #[test]
    fn derives_end_from_duration_and_duration_from_end() {
        let start = date(2024, 1, 30).at(23, 0, 0, 0);
        let end = date(2024, 2, 1).at(1, 0, 0, 0);

        let by_end = EventAnchor::with_end(start, end).unwrap();
        assert_eq!(by_end.end(), end);
        assert_eq!(by_end.duration(), SignedDuration::from_hours(26));

        let by_duration =
            EventAnchor::with_duration(start, SignedDuration::from_hours(26)).unwrap();
        assert_eq!(by_duration.end(), end);

        let instant = EventAnchor::at(start);
        assert_eq!(instant.end(), start);
        assert_eq!(instant.duration(), SignedDuration::ZERO);
    }

    #[test]
    fn rejects_contradictory_anchors() {
        let start = date(2024, 1, 2).at(9, 0, 0, 0);
        let end = date(2024, 1, 1).at(9, 0, 0, 0);
        assert!(matches!(
            EventAnchor::with_end(start, end),
            Err(AnchorError::EndBeforeStart { .. })
        ));
        assert!(matches!(
            EventAnchor::with_duration(start, SignedDuration::from_secs(-1)),
            Err(AnchorError::NegativeDuration)
        ));
    }

    #[test]
    fn rejects_inverted_boundaries() {
        let a = date(2024, 1, 1).at(0, 0, 0, 0);
        let b = date(2024, 1, 2).at(0, 0, 0, 0);
        assert!(Boundary::new(a, b).is_ok());
        assert!(matches!(
            Boundary::new(b, a),
            Err(AnchorError::InvertedBoundary { .. })
        ));
    }

    #[test]
    fn boundary_contains_is_inclusive() {
        let a = date(2024, 1, 1).at(0, 0, 0, 0);
        let b = date(2024, 1, 2).at(0, 0, 0, 0);
        let boundary = Boundary::new(a, b).unwrap();
        assert!(boundary.contains(a));
        assert!(boundary.contains(b));
        assert!(!boundary.contains(date(2024, 1, 2).at(0, 0, 1, 0)));
    }

    #[test]
    fn renders_stable_recurrence_ids() {
        let occ = Occurrence::new(
            date(2024, 1, 2).at(9, 30, 0, 0),
            date(2024, 1, 2).at(10, 30, 0, 0),
            None,
        );
        assert_eq!(occ.recurrence_id(), "20240102T093000");
    }
}
