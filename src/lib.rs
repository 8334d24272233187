// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! A recurrence engine: parse and validate recurrence rules, generate their
//! occurrences, test rule patterns against query windows, and describe rules
//! in plain language.
//!
//! The [`RecurrenceRule`] is immutable once validated and shared by three
//! independent consumers: [`OccurrenceIter`] enumerates concrete
//! [`Occurrence`]s in ascending order, [`boundary::intersects`] answers
//! window queries from the rule's pattern without enumeration, and
//! [`describe`] renders the rule as a sentence.

#![warn(
    trivial_casts,
    trivial_numeric_casts,
    missing_copy_implementations,
    missing_debug_implementations,
    missing_docs,
    unsafe_code,
    unstable_features,
    unused_import_braces,
    unused_qualifications,
    clippy::dbg_macro,
    clippy::indexing_slicing,
    clippy::pedantic
)]
// Allow certain clippy lints that are too restrictive for this crate
#![allow(
    clippy::option_option,
    clippy::similar_names,
    clippy::single_match_else,
    clippy::match_bool
)]

pub mod boundary;
mod datetime;
mod describe;
pub mod error;
mod event;
mod generator;
pub mod keyword;
mod rule;

pub use crate::boundary::{Collision, MatchKind};
pub use crate::describe::describe;
pub use crate::error::{AnchorError, ParseError, RuleError, ValidationError};
pub use crate::event::{Boundary, EventAnchor, Occurrence};
pub use crate::generator::{DEFAULT_STEP_LIMIT, OccurrenceIter};
pub use crate::rule::{
    ExtraDate, Frequency, RecurrenceRule, RuleBuilder, WeekDay, WeekDayNum,
};
