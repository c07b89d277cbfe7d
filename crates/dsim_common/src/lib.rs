//! Shared foundational types used across the Deltasim kernel crates.
//!
//! This crate provides interned identifiers, dense ID-indexed arenas, 4-state
//! logic values, packed logic vectors, simulation time with delta cycles, and
//! frequency values for clock generation.

#![warn(missing_docs)]

pub mod arena;
pub mod frequency;
pub mod ident;
pub mod logic;
pub mod logic_vec;
pub mod time;

pub use arena::{Arena, ArenaId};
pub use frequency::{Frequency, ParseFrequencyError};
pub use ident::{Ident, Interner};
pub use logic::Logic;
pub use logic_vec::LogicVec;
pub use time::{ParseTimeError, SimTime};
