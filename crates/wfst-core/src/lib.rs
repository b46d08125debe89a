//! Shared leaf types for the `wfst` engine.
//!
//! This crate holds the pieces every other part of the workspace speaks in:
//! label and state identifiers, the [`Arc`] edge record, and the semiring
//! weights ([`TropicalWeight`], [`LogWeight`]) that arcs and final states carry.
//!
//! # Architecture
//!
//! - [`semiring`] -- the `Semiring` trait and its tropical / log implementations
//! - [`arc`] -- the `Arc` record (input label, output label, weight, destination)

pub mod arc;
pub mod semiring;

pub use arc::Arc;
pub use semiring::{
    KDELTA, LogWeight, NaturalOrder, ParseWeightError, Semiring, SemiringKind, TropicalWeight,
};

/// Integer code of a symbol on an arc.
pub type Label = u32;

/// Dense identifier of a state within one automaton.
pub type StateId = usize;

/// The reserved "no symbol consumed / emitted" label.
pub const EPSILON: Label = 0;

/// Sentinel label used by matchers for the implicit self-loop of a state.
///
/// It never appears on a stored arc.
pub const NO_LABEL: Label = Label::MAX;
