// Composition of two transducers, expanded lazily on demand.
//
// Composite states are (s1, s2, filter) tuples kept in an arena and memoized
// in a hash map; an expanded state's arcs are cached for the lifetime of the
// ComposeFst. The filter is the sequence epsilon filter: when both operands
// could take an epsilon move, the left one moves first, so every epsilon path
// is generated once.
//
// Which operand is enumerated and which is queried can change from state to
// state: an operand state with special-labelled arcs must be queried.

use hashbrown::HashMap;
use serde::{Deserialize, Serialize};

use crate::algorithms::connect::connect;
use crate::fst::{Fst, MutableFst};
use crate::matcher::{MatchType, Matcher, MatcherConfig};
use crate::symbols::SharedSymbols;
use crate::vector::VectorFst;
use crate::{Arc, EPSILON, FstError, NO_LABEL, Result, Semiring, StateId};

/// Which operand's arcs are enumerated while the other one is queried.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComposeDriver {
    /// Decided per composite state: an operand state with special-labelled
    /// arcs is queried and the other one enumerated; otherwise left.
    #[default]
    Auto,
    /// Always enumerate the left operand.
    Left,
    /// Always enumerate the right operand.
    Right,
}

/// Options for [`ComposeFst`] and [`compose_with_options`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComposeOptions {
    /// Matcher over the left operand; matches on output labels.
    pub left: MatcherConfig,
    /// Matcher over the right operand; matches on input labels.
    pub right: MatcherConfig,
    pub driver: ComposeDriver,
    /// Trim eagerly composed results to useful states.
    pub connect: bool,
}

impl Default for ComposeOptions {
    fn default() -> Self {
        Self {
            left: MatcherConfig::standard(MatchType::Output),
            right: MatcherConfig::standard(MatchType::Input),
            driver: ComposeDriver::Auto,
            connect: true,
        }
    }
}

/// A composite state: one state of each operand plus the filter state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StateTuple {
    pub s1: StateId,
    pub s2: StateId,
    pub filter: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    Left,
    Right,
}

/// The enumerated side, fixed or chosen when a state is expanded.
#[derive(Debug, Clone, Copy)]
enum Driver {
    Fixed(Side),
    PerState,
}

#[derive(Debug)]
struct CachedState<W> {
    final_weight: Option<W>,
    arcs: Vec<Arc<W>>,
}

/// Sequence filter for one composite state.
struct SequenceFilter {
    state: u8,
    /// Every arc of s1 has an epsilon output and s1 is not final.
    alleps1: bool,
    /// s1 has no output-epsilon arcs.
    noeps1: bool,
}

impl SequenceFilter {
    fn filter_arc<W>(&self, arc1: &Arc<W>, arc2: &Arc<W>) -> Option<u8> {
        if arc1.olabel == NO_LABEL {
            // left stays put while the right operand reads an epsilon
            if self.alleps1 {
                None
            } else if self.noeps1 {
                Some(0)
            } else {
                Some(1)
            }
        } else if arc2.ilabel == NO_LABEL {
            (self.state == 0).then_some(0)
        } else if arc1.olabel == EPSILON {
            None
        } else {
            Some(0)
        }
    }
}

/// Lazy composition of `fst1` and `fst2`.
///
/// States are numbered in first-visit order. Expanding a state (asking for
/// its arcs or final weight) may discover new states.
pub struct ComposeFst<'a, W, F1: ?Sized, F2: ?Sized> {
    fst1: &'a F1,
    fst2: &'a F2,
    matcher1: Matcher<'a, W, F1>,
    matcher2: Matcher<'a, W, F2>,
    driver: Driver,
    tuples: Vec<StateTuple>,
    ids: HashMap<StateTuple, StateId>,
    cache: Vec<Option<CachedState<W>>>,
    start: Option<Option<StateId>>,
}

impl<'a, W, F1, F2> ComposeFst<'a, W, F1, F2>
where
    W: Semiring,
    F1: Fst<W> + ?Sized,
    F2: Fst<W> + ?Sized,
{
    /// Compose with standard matchers.
    pub fn new(fst1: &'a F1, fst2: &'a F2) -> Result<Self> {
        Self::with_options(fst1, fst2, &ComposeOptions::default())
    }

    pub fn with_options(fst1: &'a F1, fst2: &'a F2, opts: &ComposeOptions) -> Result<Self> {
        if opts.left.match_type == MatchType::Input {
            return Err(FstError::Config(
                "left matcher must match on output labels".to_string(),
            ));
        }
        if opts.right.match_type == MatchType::Output {
            return Err(FstError::Config(
                "right matcher must match on input labels".to_string(),
            ));
        }
        let left_queryable = opts.left.match_type != MatchType::None;
        let right_queryable = opts.right.match_type != MatchType::None;
        let driver = match opts.driver {
            ComposeDriver::Left => Driver::Fixed(Side::Left),
            ComposeDriver::Right => Driver::Fixed(Side::Right),
            ComposeDriver::Auto => match (left_queryable, right_queryable) {
                (true, true) => Driver::PerState,
                (false, true) => Driver::Fixed(Side::Left),
                (true, false) => Driver::Fixed(Side::Right),
                (false, false) => {
                    return Err(FstError::Config(
                        "neither matcher can be queried".to_string(),
                    ));
                }
            },
        };
        if let Driver::Fixed(side) = driver {
            let (queried, enumerated, name) = match side {
                Side::Left => (&opts.right, &opts.left, "left"),
                Side::Right => (&opts.left, &opts.right, "right"),
            };
            if queried.match_type == MatchType::None {
                return Err(FstError::Config(
                    "queried matcher has match type none".to_string(),
                ));
            }
            if enumerated.has_special() {
                return Err(FstError::Config(format!(
                    "the {name} operand is always enumerated, so its matcher cannot use special labels"
                )));
            }
        }
        if let (Some(out1), Some(in2)) = (fst1.output_symbols(), fst2.input_symbols()) {
            if !SharedSymbols::ptr_eq(out1, in2) && !out1.is_compatible(in2) {
                return Err(FstError::Config(format!(
                    "output symbols {:?} of the left operand do not match input symbols {:?} of the right operand",
                    out1.name(),
                    in2.name()
                )));
            }
        }

        let matcher1 = Matcher::new(fst1, &opts.left)?;
        let matcher2 = Matcher::new(fst2, &opts.right)?;
        log::debug!("composing with {driver:?} driver");
        Ok(Self {
            fst1,
            fst2,
            matcher1,
            matcher2,
            driver,
            tuples: Vec::new(),
            ids: HashMap::new(),
            cache: Vec::new(),
            start: None,
        })
    }

    pub fn input_symbols(&self) -> Option<&'a SharedSymbols> {
        let fst1: &'a F1 = self.fst1;
        fst1.input_symbols()
    }

    pub fn output_symbols(&self) -> Option<&'a SharedSymbols> {
        let fst2: &'a F2 = self.fst2;
        fst2.output_symbols()
    }

    fn find_or_insert(&mut self, tuple: StateTuple) -> StateId {
        if let Some(&id) = self.ids.get(&tuple) {
            return id;
        }
        let id = self.tuples.len();
        self.tuples.push(tuple);
        self.cache.push(None);
        self.ids.insert(tuple, id);
        id
    }

    fn check_state(&self, state: StateId) -> Result<()> {
        if state < self.tuples.len() {
            Ok(())
        } else {
            Err(FstError::InvalidState {
                state,
                num_states: self.tuples.len(),
            })
        }
    }

    /// The composite start state, `None` if either operand has no start.
    pub fn start(&mut self) -> Option<StateId> {
        if let Some(start) = self.start {
            return start;
        }
        let start = match (self.fst1.start(), self.fst2.start()) {
            (Some(s1), Some(s2)) => Some(self.find_or_insert(StateTuple { s1, s2, filter: 0 })),
            _ => None,
        };
        self.start = Some(start);
        start
    }

    /// Number of composite states discovered so far.
    pub fn num_known_states(&self) -> usize {
        self.tuples.len()
    }

    pub fn is_expanded(&self, state: StateId) -> bool {
        self.cache.get(state).is_some_and(Option::is_some)
    }

    /// The operand states behind a composite state.
    pub fn tuple(&self, state: StateId) -> Result<StateTuple> {
        self.check_state(state)?;
        Ok(self.tuples[state])
    }

    pub fn final_weight(&mut self, state: StateId) -> Result<Option<W>> {
        Ok(self.expand(state)?.final_weight)
    }

    pub fn arcs(&mut self, state: StateId) -> Result<&[Arc<W>]> {
        Ok(&self.expand(state)?.arcs)
    }

    pub fn num_arcs(&mut self, state: StateId) -> Result<usize> {
        Ok(self.expand(state)?.arcs.len())
    }

    fn expand(&mut self, state: StateId) -> Result<&CachedState<W>> {
        self.check_state(state)?;
        if self.cache[state].is_none() {
            let computed = self.compute(state)?;
            self.cache[state] = Some(computed);
        }
        self.cache[state]
            .as_ref()
            .ok_or(FstError::InvalidState {
                state,
                num_states: self.tuples.len(),
            })
    }

    fn compute(&mut self, state: StateId) -> Result<CachedState<W>> {
        let tuple = self.tuples[state];
        let (fst1, fst2) = (self.fst1, self.fst2);

        let final1 = fst1.final_weight(tuple.s1)?;
        let final2 = fst2.final_weight(tuple.s2)?;
        let final_weight = match (final1, final2) {
            (Some(w1), Some(w2)) => Some(w1.times(&w2)).filter(|w| !w.is_zero()),
            _ => None,
        };

        let arcs1 = fst1.arcs(tuple.s1)?;
        let output_eps = arcs1.iter().filter(|a| a.olabel == EPSILON).count();
        let filter = SequenceFilter {
            state: tuple.filter,
            alleps1: output_eps == arcs1.len() && final1.is_none(),
            noeps1: output_eps == 0,
        };

        let side = match self.driver {
            Driver::Fixed(side) => side,
            Driver::PerState => match (
                self.matcher1.has_special_arcs(tuple.s1)?,
                self.matcher2.has_special_arcs(tuple.s2)?,
            ) {
                (true, true) => {
                    return Err(FstError::Config(format!(
                        "composite state {state}: operand states {} and {} both carry special-labelled arcs",
                        tuple.s1, tuple.s2
                    )));
                }
                (true, false) => Side::Right,
                _ => Side::Left,
            },
        };

        let mut matched = Vec::new();
        match side {
            Side::Left => {
                let loop1 = Arc::new(EPSILON, NO_LABEL, W::one(), tuple.s1);
                for arc1 in std::iter::once(&loop1).chain(arcs1) {
                    for arc2 in self.matcher2.find(tuple.s2, arc1.olabel)? {
                        if let Some(fs) = filter.filter_arc(arc1, &arc2) {
                            matched.push((*arc1, arc2, fs));
                        }
                    }
                }
            }
            Side::Right => {
                let loop2 = Arc::new(NO_LABEL, EPSILON, W::one(), tuple.s2);
                for arc2 in std::iter::once(&loop2).chain(fst2.arcs(tuple.s2)?) {
                    for arc1 in self.matcher1.find(tuple.s1, arc2.ilabel)? {
                        if let Some(fs) = filter.filter_arc(&arc1, arc2) {
                            matched.push((arc1, *arc2, fs));
                        }
                    }
                }
            }
        }

        let mut arcs = Vec::with_capacity(matched.len());
        for (arc1, arc2, fs) in matched {
            let next = self.find_or_insert(StateTuple {
                s1: arc1.nextstate,
                s2: arc2.nextstate,
                filter: fs,
            });
            arcs.push(Arc::new(
                arc1.ilabel,
                arc2.olabel,
                arc1.weight.times(&arc2.weight),
                next,
            ));
        }
        log::trace!(
            "expanded composite state {state} = ({}, {}, {}): {} arcs",
            tuple.s1,
            tuple.s2,
            tuple.filter,
            arcs.len()
        );
        Ok(CachedState { final_weight, arcs })
    }

    /// Expand every reachable composite state into a [`VectorFst`].
    ///
    /// Composite state ids carry over unchanged.
    pub fn to_vector_fst(&mut self) -> Result<VectorFst<W>> {
        let mut fst = VectorFst::new();
        fst.set_input_symbols(self.input_symbols().cloned());
        fst.set_output_symbols(self.output_symbols().cloned());
        let Some(start) = self.start() else {
            return Ok(fst);
        };

        let mut state = 0;
        while state < self.tuples.len() {
            self.expand(state)?;
            state += 1;
        }

        let num_states = self.tuples.len();
        fst.reserve_states(num_states);
        fst.add_states(num_states);
        fst.set_start(start)?;
        for (s, cached) in self.cache.iter().enumerate() {
            let Some(cached) = cached else { continue };
            if let Some(w) = cached.final_weight {
                fst.set_final(s, w)?;
            }
            fst.set_arcs(s, cached.arcs.clone())?;
        }
        log::debug!(
            "composition expanded to {} states, {} arcs",
            num_states,
            self.cache.iter().flatten().map(|c| c.arcs.len()).sum::<usize>()
        );
        Ok(fst)
    }
}

/// Compose `fst1` with `fst2` using standard matchers, trimming the result.
pub fn compose<W, F1, F2>(fst1: &F1, fst2: &F2) -> Result<VectorFst<W>>
where
    W: Semiring,
    F1: Fst<W> + ?Sized,
    F2: Fst<W> + ?Sized,
{
    compose_with_options(fst1, fst2, &ComposeOptions::default())
}

/// Eager composition with explicit matcher and driver options.
pub fn compose_with_options<W, F1, F2>(
    fst1: &F1,
    fst2: &F2,
    opts: &ComposeOptions,
) -> Result<VectorFst<W>>
where
    W: Semiring,
    F1: Fst<W> + ?Sized,
    F2: Fst<W> + ?Sized,
{
    let mut lazy = ComposeFst::with_options(fst1, fst2, opts)?;
    let mut fst = lazy.to_vector_fst()?;
    if opts.connect {
        connect(&mut fst)?;
    }
    Ok(fst)
}
