//! Weighted finite-state transducer engine.
//!
//! This crate provides a mutable vector-backed automaton, symbol tables,
//! composition with pluggable label matchers (standard, sigma, rho, phi), and
//! the classic algorithms built on top: epsilon removal, shortest path,
//! string conversion, symbol relabeling, verification and a binary format.
//!
//! # Architecture
//!
//! - [`fst`] -- `Fst` / `ExpandedFst` / `MutableFst` traits
//! - [`vector`] -- `VectorFst`, the mutable automaton
//! - [`properties`] -- structural property flags and their computation
//! - [`symbols`] -- text <-> label symbol tables
//! - [`matcher`] -- label matching strategies used by composition
//! - [`compose`] -- lazy / eager composition (`ComposeFst`)
//! - [`algorithms`] -- epsilon removal, shortest path, strings, relabeling, ...
//! - [`io`] -- binary read / write
//!
//! # Threading
//!
//! Everything here is synchronous. Mutation requires `&mut`, so a single
//! automaton is never mutated from two places at once. `VectorFst` keeps its
//! property cache in a `Cell`; it is `Send` but not `Sync`, and a host that
//! shares automata across threads wraps each one in its own lock.
//!
//! Symbol tables are shared, not owned: an automaton holds a
//! [`SharedSymbols`] (`std::sync::Arc<SymbolTable>`) and attaching one copies
//! the pointer. A shared table is immutable, so no holder ever observes
//! another holder's edits. To change a table, fork it with `Arc::make_mut`
//! (or clone the `SymbolTable` out) and re-attach the result with
//! `set_input_symbols` / `set_output_symbols` on each automaton that should
//! see it. [`SymbolTable::version`] tells the revisions apart.

pub mod algorithms;
pub mod compose;
pub mod fst;
pub mod io;
pub mod matcher;
pub mod properties;
pub mod symbols;
pub mod vector;

pub use wfst_core::{
    Arc, EPSILON, KDELTA, Label, LogWeight, NO_LABEL, NaturalOrder, Semiring, SemiringKind,
    StateId, TropicalWeight,
};

pub use compose::{ComposeDriver, ComposeFst, ComposeOptions, compose, compose_with_options};
pub use fst::{ExpandedFst, Fst, MutableFst};
pub use matcher::{MatchType, Matcher, MatcherConfig, RewriteMode, SpecialMatch};
pub use properties::FstProperties;
pub use symbols::{SharedSymbols, SymbolTable};
pub use vector::VectorFst;

/// Vector automaton over the tropical semiring.
pub type StdVectorFst = VectorFst<TropicalWeight>;

/// Vector automaton over the log semiring.
pub type LogVectorFst = VectorFst<LogWeight>;

/// Which side of an arc a label lives on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LabelSide {
    Input,
    Output,
}

impl std::fmt::Display for LabelSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LabelSide::Input => f.write_str("input"),
            LabelSide::Output => f.write_str("output"),
        }
    }
}

/// Error type for every fallible operation of the engine.
#[derive(Debug, thiserror::Error)]
pub enum FstError {
    #[error("invalid state {state} (automaton has {num_states} states)")]
    InvalidState { state: StateId, num_states: usize },
    #[error("invalid arc index {index} at state {state} (state has {num_arcs} arcs)")]
    InvalidArc {
        state: StateId,
        index: usize,
        num_arcs: usize,
    },
    #[error("symbol {symbol:?} is already bound to key {key}")]
    DuplicateSymbol { symbol: String, key: Label },
    #[error("cannot bind {symbol:?} to key {key}: {reason}")]
    SymbolConflict {
        symbol: String,
        key: Label,
        reason: String,
    },
    #[error("symbol {0:?} not found")]
    SymbolNotFound(String),
    #[error("key {0} not found")]
    KeyNotFound(Label),
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error("verification failed: {0}")]
    Verification(String),
    #[error("automaton is not a single linear path: {0}")]
    AmbiguousPath(String),
    #[error("label {label} does not encode text")]
    LabelNotText { label: Label },
    #[error("unknown {side} symbol for label {label} on arc {arc} of state {state}")]
    UnknownSymbol {
        state: StateId,
        arc: usize,
        label: Label,
        side: LabelSide,
    },
    #[error("epsilon cycle through state {state} carries a non-one weight")]
    EpsilonCycle { state: StateId },
    #[error("malformed automaton data: {0}")]
    Format(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, FstError>;
