// Automaton traits: read-only access, expanded (counted) access, mutation.

use std::ops::Range;

use crate::properties::FstProperties;
use crate::symbols::SharedSymbols;
use crate::{Arc, EPSILON, FstError, Result, Semiring, StateId};

/// Read-only view of an automaton.
///
/// Accessors that take a state id fail with [`FstError::InvalidState`] when
/// the id does not name a state.
pub trait Fst<W: Semiring> {
    /// The start state, if one has been designated.
    fn start(&self) -> Option<StateId>;

    /// Final weight of `state`, or `None` when the state is not final.
    fn final_weight(&self, state: StateId) -> Result<Option<W>>;

    /// Outgoing arcs of `state`, in insertion order.
    fn arcs(&self, state: StateId) -> Result<&[Arc<W>]>;

    fn input_symbols(&self) -> Option<&SharedSymbols>;

    fn output_symbols(&self) -> Option<&SharedSymbols>;

    /// Structural properties intersected with `mask`.
    ///
    /// When some requested property is not known yet, it is computed only if
    /// `compute` is set; otherwise only the known subset is returned.
    fn properties(&self, mask: FstProperties, compute: bool) -> FstProperties;

    fn is_final(&self, state: StateId) -> Result<bool> {
        Ok(self.final_weight(state)?.is_some())
    }

    fn num_arcs(&self, state: StateId) -> Result<usize> {
        Ok(self.arcs(state)?.len())
    }

    /// Random access to the `index`-th arc of `state`.
    fn get_arc(&self, state: StateId, index: usize) -> Result<&Arc<W>> {
        let arcs = self.arcs(state)?;
        arcs.get(index).ok_or(FstError::InvalidArc {
            state,
            index,
            num_arcs: arcs.len(),
        })
    }

    fn num_input_epsilons(&self, state: StateId) -> Result<usize> {
        Ok(self
            .arcs(state)?
            .iter()
            .filter(|a| a.ilabel == EPSILON)
            .count())
    }

    fn num_output_epsilons(&self, state: StateId) -> Result<usize> {
        Ok(self
            .arcs(state)?
            .iter()
            .filter(|a| a.olabel == EPSILON)
            .count())
    }
}

/// An automaton whose states are all known up front.
pub trait ExpandedFst<W: Semiring>: Fst<W> {
    fn num_states(&self) -> usize;

    /// State ids in increasing order. The range is lazy and can be
    /// restarted by calling `states()` again.
    fn states(&self) -> Range<StateId> {
        0..self.num_states()
    }

    fn is_valid_state(&self, state: StateId) -> bool {
        state < self.num_states()
    }

    /// Total number of arcs over all states.
    fn num_arcs_total(&self) -> usize {
        self.states()
            .map(|s| self.arcs(s).map_or(0, <[Arc<W>]>::len))
            .sum()
    }
}

/// An automaton that can be built and edited in place.
///
/// Every mutation clears the cached properties.
pub trait MutableFst<W: Semiring>: ExpandedFst<W> {
    /// Append a new state and return its id (ids start at 0 and increase).
    fn add_state(&mut self) -> StateId;

    fn add_states(&mut self, n: usize) -> Range<StateId> {
        let first = self.num_states();
        for _ in 0..n {
            self.add_state();
        }
        first..first + n
    }

    fn set_start(&mut self, state: StateId) -> Result<()>;

    /// Set the final weight. `W::zero()` clears final status.
    fn set_final(&mut self, state: StateId, weight: W) -> Result<()>;

    fn delete_final(&mut self, state: StateId) -> Result<()> {
        self.set_final(state, W::zero())
    }

    /// Append an arc leaving `state`. Both `state` and `arc.nextstate`
    /// must exist.
    fn add_arc(&mut self, state: StateId, arc: Arc<W>) -> Result<()>;

    /// Mutable access to the arcs of `state` (labels, weights, order).
    fn arcs_mut(&mut self, state: StateId) -> Result<&mut [Arc<W>]>;

    /// Replace every arc of `state`.
    fn set_arcs(&mut self, state: StateId, arcs: Vec<Arc<W>>) -> Result<()>;

    fn delete_arcs(&mut self, state: StateId) -> Result<()>;

    /// Remove the listed states, renumbering the survivors in order and
    /// dropping arcs into removed states.
    fn delete_states(&mut self, states: &[StateId]) -> Result<()>;

    fn delete_all_states(&mut self);

    /// Attach (share, not copy) an input symbol table.
    fn set_input_symbols(&mut self, symbols: Option<SharedSymbols>);

    fn set_output_symbols(&mut self, symbols: Option<SharedSymbols>);

    fn take_input_symbols(&mut self) -> Option<SharedSymbols>;

    fn take_output_symbols(&mut self) -> Option<SharedSymbols>;
}
