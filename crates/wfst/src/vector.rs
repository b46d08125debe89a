// VectorFst: the mutable, vector-backed automaton.

use std::cell::Cell;
use std::fmt;
use std::path::Path;

use crate::fst::{ExpandedFst, Fst, MutableFst};
use crate::properties::{FstProperties, PropertyCache, compute_properties};
use crate::symbols::SharedSymbols;
use crate::{Arc, FstError, Result, Semiring, StateId, io};

#[derive(Debug, Clone)]
struct VectorState<W> {
    final_weight: Option<W>,
    arcs: Vec<Arc<W>>,
}

impl<W> Default for VectorState<W> {
    fn default() -> Self {
        Self {
            final_weight: None,
            arcs: Vec::new(),
        }
    }
}

/// Mutable automaton storing each state's arcs in a `Vec`.
///
/// Symbol tables are shared by pointer; cloning a `VectorFst` clones its
/// states and arcs but keeps pointing at the same tables.
#[derive(Debug, Clone)]
pub struct VectorFst<W> {
    states: Vec<VectorState<W>>,
    start: Option<StateId>,
    isymbols: Option<SharedSymbols>,
    osymbols: Option<SharedSymbols>,
    properties: Cell<PropertyCache>,
}

impl<W: Semiring> Default for VectorFst<W> {
    fn default() -> Self {
        Self::new()
    }
}

impl<W: Semiring> VectorFst<W> {
    /// An automaton with no states.
    pub fn new() -> Self {
        Self {
            states: Vec::new(),
            start: None,
            isymbols: None,
            osymbols: None,
            properties: Cell::new(PropertyCache::default()),
        }
    }

    #[inline]
    fn invalidate(&mut self) {
        self.properties.set(PropertyCache::default());
    }

    #[inline]
    fn check_state(&self, state: StateId) -> Result<()> {
        if state < self.states.len() {
            Ok(())
        } else {
            Err(FstError::InvalidState {
                state,
                num_states: self.states.len(),
            })
        }
    }

    fn state(&self, state: StateId) -> Result<&VectorState<W>> {
        self.check_state(state)?;
        Ok(&self.states[state])
    }

    fn state_mut(&mut self, state: StateId) -> Result<&mut VectorState<W>> {
        self.check_state(state)?;
        self.invalidate();
        Ok(&mut self.states[state])
    }

    /// Reserve room for `n` more states.
    pub fn reserve_states(&mut self, n: usize) {
        self.states.reserve(n);
    }

    /// Reserve room for `n` more arcs at `state`.
    pub fn reserve_arcs(&mut self, state: StateId, n: usize) -> Result<()> {
        self.state_mut(state)?.arcs.reserve(n);
        Ok(())
    }

    /// Shorthand for `add_arc(state, Arc::new(..))`.
    pub fn emplace_arc(
        &mut self,
        state: StateId,
        ilabel: crate::Label,
        olabel: crate::Label,
        weight: W,
        nextstate: StateId,
    ) -> Result<()> {
        self.add_arc(state, Arc::new(ilabel, olabel, weight, nextstate))
    }

    /// Write this automaton to `path` in the binary format.
    pub fn write(&self, path: impl AsRef<Path>) -> Result<()> {
        io::write_path(self, path.as_ref())
    }

    /// Read an automaton from `path`.
    pub fn read(path: impl AsRef<Path>) -> Result<Self> {
        io::read_path(path.as_ref())
    }

    /// Serialize to the binary format.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        io::to_bytes(self)
    }

    /// Parse the binary format.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        io::from_bytes(data)
    }

    /// Replace `self` with the automaton stored at `path`. On failure `self`
    /// is left untouched.
    pub fn read_into(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let fst = Self::read(path)?;
        *self = fst;
        Ok(())
    }
}

impl<W: Semiring> Fst<W> for VectorFst<W> {
    fn start(&self) -> Option<StateId> {
        self.start
    }

    fn final_weight(&self, state: StateId) -> Result<Option<W>> {
        Ok(self.state(state)?.final_weight)
    }

    fn arcs(&self, state: StateId) -> Result<&[Arc<W>]> {
        Ok(&self.state(state)?.arcs)
    }

    fn input_symbols(&self) -> Option<&SharedSymbols> {
        self.isymbols.as_ref()
    }

    fn output_symbols(&self) -> Option<&SharedSymbols> {
        self.osymbols.as_ref()
    }

    fn properties(&self, mask: FstProperties, compute: bool) -> FstProperties {
        let mut cache = self.properties.get();
        let props = cache.query(mask, compute, || compute_properties(self));
        self.properties.set(cache);
        props
    }
}

impl<W: Semiring> ExpandedFst<W> for VectorFst<W> {
    fn num_states(&self) -> usize {
        self.states.len()
    }
}

impl<W: Semiring> MutableFst<W> for VectorFst<W> {
    fn add_state(&mut self) -> StateId {
        self.invalidate();
        self.states.push(VectorState::default());
        self.states.len() - 1
    }

    fn set_start(&mut self, state: StateId) -> Result<()> {
        self.check_state(state)?;
        self.invalidate();
        self.start = Some(state);
        Ok(())
    }

    fn set_final(&mut self, state: StateId, weight: W) -> Result<()> {
        let st = self.state_mut(state)?;
        st.final_weight = if weight.is_zero() { None } else { Some(weight) };
        Ok(())
    }

    fn add_arc(&mut self, state: StateId, arc: Arc<W>) -> Result<()> {
        self.check_state(arc.nextstate)?;
        self.state_mut(state)?.arcs.push(arc);
        Ok(())
    }

    fn arcs_mut(&mut self, state: StateId) -> Result<&mut [Arc<W>]> {
        Ok(&mut self.state_mut(state)?.arcs)
    }

    fn set_arcs(&mut self, state: StateId, arcs: Vec<Arc<W>>) -> Result<()> {
        self.check_state(state)?;
        for arc in &arcs {
            self.check_state(arc.nextstate)?;
        }
        self.state_mut(state)?.arcs = arcs;
        Ok(())
    }

    fn delete_arcs(&mut self, state: StateId) -> Result<()> {
        self.state_mut(state)?.arcs.clear();
        Ok(())
    }

    fn delete_states(&mut self, states: &[StateId]) -> Result<()> {
        for &s in states {
            self.check_state(s)?;
        }
        self.invalidate();

        const DELETED: StateId = StateId::MAX;
        let mut new_id = vec![0; self.states.len()];
        for &s in states {
            new_id[s] = DELETED;
        }
        let mut next = 0;
        for id in new_id.iter_mut() {
            if *id != DELETED {
                *id = next;
                next += 1;
            }
        }

        let old = std::mem::take(&mut self.states);
        for (s, mut state) in old.into_iter().enumerate() {
            if new_id[s] == DELETED {
                continue;
            }
            state.arcs.retain(|a| new_id[a.nextstate] != DELETED);
            for arc in &mut state.arcs {
                arc.nextstate = new_id[arc.nextstate];
            }
            self.states.push(state);
        }
        self.start = self
            .start
            .and_then(|s| (new_id[s] != DELETED).then_some(new_id[s]));
        Ok(())
    }

    fn delete_all_states(&mut self) {
        self.invalidate();
        self.states.clear();
        self.start = None;
    }

    fn set_input_symbols(&mut self, symbols: Option<SharedSymbols>) {
        self.isymbols = symbols;
    }

    fn set_output_symbols(&mut self, symbols: Option<SharedSymbols>) {
        self.osymbols = symbols;
    }

    fn take_input_symbols(&mut self) -> Option<SharedSymbols> {
        self.isymbols.take()
    }

    fn take_output_symbols(&mut self) -> Option<SharedSymbols> {
        self.osymbols.take()
    }
}

/// AT&T text layout: one `src dst ilabel olabel [weight]` line per arc and one
/// `state [weight]` line per final state, start state first.
impl<W: Semiring> fmt::Display for VectorFst<W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Some(start) = self.start else {
            return Ok(());
        };
        let order = std::iter::once(start).chain((0..self.states.len()).filter(|&s| s != start));
        for s in order {
            let state = &self.states[s];
            for arc in &state.arcs {
                write!(f, "{}\t{}\t{}\t{}", s, arc.nextstate, arc.ilabel, arc.olabel)?;
                if !arc.weight.is_one() {
                    write!(f, "\t{}", arc.weight)?;
                }
                writeln!(f)?;
            }
            if let Some(w) = state.final_weight {
                if w.is_one() {
                    writeln!(f, "{s}")?;
                } else {
                    writeln!(f, "{s}\t{w}")?;
                }
            }
        }
        Ok(())
    }
}
