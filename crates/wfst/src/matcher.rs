// Label matchers: given a state and a label, which arcs match?
//
// A matcher is bound to one automaton and one side of its arcs. Special
// layers (sigma, rho, phi) wrap the exact-match lookup, outermost first.

use std::marker::PhantomData;

use hashbrown::HashSet;
use serde::{Deserialize, Serialize};

use crate::fst::Fst;
use crate::properties::FstProperties;
use crate::{Arc, EPSILON, FstError, Label, NO_LABEL, Result, Semiring, StateId};

/// Which arc label a matcher compares against the query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchType {
    #[default]
    Input,
    Output,
    /// The matcher cannot be queried.
    None,
}

/// Whether special labels are replaced by the query label in returned arcs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RewriteMode {
    /// Rewrite both sides when the automaton is an acceptor, otherwise only
    /// the matched side.
    #[default]
    Auto,
    Always,
    Never,
}

/// A wildcard label layered over exact matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpecialMatch {
    /// Matches every non-epsilon label, alongside exact matches.
    Sigma(Label),
    /// Matches every non-epsilon label that has no exact match.
    Rho(Label),
    /// Failure transition: when nothing matches, retry at its destination.
    Phi(Label),
}

impl SpecialMatch {
    pub fn label(self) -> Label {
        match self {
            SpecialMatch::Sigma(l) | SpecialMatch::Rho(l) | SpecialMatch::Phi(l) => l,
        }
    }

    fn name(self) -> &'static str {
        match self {
            SpecialMatch::Sigma(_) => "sigma",
            SpecialMatch::Rho(_) => "rho",
            SpecialMatch::Phi(_) => "phi",
        }
    }
}

/// How to build a [`Matcher`].
///
/// ```
/// use wfst::{MatcherConfig, SpecialMatch};
///
/// // rho outermost, then sigma, then phi over exact matching
/// let config = MatcherConfig::rho(7)
///     .with_layer(SpecialMatch::Sigma(8))
///     .with_layer(SpecialMatch::Phi(9));
/// assert_eq!(config.layers.len(), 3);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatcherConfig {
    pub match_type: MatchType,
    /// Special layers, outermost first.
    pub layers: Vec<SpecialMatch>,
    pub rewrite: RewriteMode,
    /// Treat a phi self-loop as a rho arc instead of a dead end.
    pub phi_loop: bool,
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            match_type: MatchType::Input,
            layers: Vec::new(),
            rewrite: RewriteMode::Auto,
            phi_loop: true,
        }
    }
}

impl MatcherConfig {
    /// Exact matching on `match_type`.
    pub fn standard(match_type: MatchType) -> Self {
        Self {
            match_type,
            ..Self::default()
        }
    }

    /// Input-side sigma matching.
    pub fn sigma(label: Label) -> Self {
        Self::default().with_layer(SpecialMatch::Sigma(label))
    }

    /// Input-side rho matching.
    pub fn rho(label: Label) -> Self {
        Self::default().with_layer(SpecialMatch::Rho(label))
    }

    /// Input-side phi matching.
    pub fn phi(label: Label) -> Self {
        Self::default().with_layer(SpecialMatch::Phi(label))
    }

    /// Add an inner layer below the existing ones.
    pub fn with_layer(mut self, layer: SpecialMatch) -> Self {
        self.layers.push(layer);
        self
    }

    pub fn with_match_type(mut self, match_type: MatchType) -> Self {
        self.match_type = match_type;
        self
    }

    pub fn with_rewrite(mut self, rewrite: RewriteMode) -> Self {
        self.rewrite = rewrite;
        self
    }

    pub fn with_phi_loop(mut self, phi_loop: bool) -> Self {
        self.phi_loop = phi_loop;
        self
    }

    pub fn has_special(&self) -> bool {
        !self.layers.is_empty()
    }
}

/// Arc lookup by label on one side of one automaton.
pub struct Matcher<'f, W, F: ?Sized> {
    fst: &'f F,
    match_type: MatchType,
    layers: Vec<SpecialMatch>,
    phi_loop: bool,
    rewrite_both: bool,
    sorted: bool,
    _weight: PhantomData<W>,
}

impl<'f, W, F> Matcher<'f, W, F>
where
    W: Semiring,
    F: Fst<W> + ?Sized,
{
    pub fn new(fst: &'f F, config: &MatcherConfig) -> Result<Self> {
        for layer in &config.layers {
            let label = layer.label();
            if label == EPSILON || label == NO_LABEL {
                return Err(FstError::Config(format!(
                    "{} label {label} is reserved",
                    layer.name()
                )));
            }
        }
        if config.match_type == MatchType::None && config.has_special() {
            return Err(FstError::Config(
                "special matching needs an input or output match type".to_string(),
            ));
        }

        let sorted = match config.match_type {
            MatchType::Input => fst
                .properties(FstProperties::I_LABEL_SORTED, true)
                .contains(FstProperties::I_LABEL_SORTED),
            MatchType::Output => fst
                .properties(FstProperties::O_LABEL_SORTED, true)
                .contains(FstProperties::O_LABEL_SORTED),
            MatchType::None => false,
        };
        let rewrite_both = match config.rewrite {
            RewriteMode::Always => true,
            RewriteMode::Never => false,
            RewriteMode::Auto => fst
                .properties(FstProperties::ACCEPTOR, true)
                .contains(FstProperties::ACCEPTOR),
        };

        Ok(Self {
            fst,
            match_type: config.match_type,
            layers: config.layers.clone(),
            phi_loop: config.phi_loop,
            rewrite_both,
            sorted,
            _weight: PhantomData,
        })
    }

    pub fn fst(&self) -> &'f F {
        self.fst
    }

    pub fn match_type(&self) -> MatchType {
        self.match_type
    }

    pub fn has_special(&self) -> bool {
        !self.layers.is_empty()
    }

    /// Whether an arc of `state` carries one of the special labels on the
    /// matched side. Such a state has to be queried, never enumerated.
    pub fn has_special_arcs(&self, state: StateId) -> Result<bool> {
        if self.layers.is_empty() {
            return Ok(false);
        }
        let arcs = self.fst.arcs(state)?;
        Ok(arcs.iter().any(|arc| {
            let label = self.side(arc);
            self.layers.iter().any(|layer| layer.label() == label)
        }))
    }

    /// The implicit "stay here" arc: `NO_LABEL` on the matched side,
    /// epsilon on the other, weight one.
    pub fn loop_arc(&self, state: StateId) -> Arc<W> {
        match self.match_type {
            MatchType::Output => Arc::new(EPSILON, NO_LABEL, W::one(), state),
            _ => Arc::new(NO_LABEL, EPSILON, W::one(), state),
        }
    }

    /// Arcs leaving `state` that match `label`.
    ///
    /// Querying with [`EPSILON`] also yields [`loop_arc`](Self::loop_arc);
    /// querying with [`NO_LABEL`] yields the real epsilon arcs only.
    pub fn find(&self, state: StateId, label: Label) -> Result<Vec<Arc<W>>> {
        if self.match_type == MatchType::None {
            return Err(FstError::Config(
                "matcher with match type none cannot be queried".to_string(),
            ));
        }
        let mut out = Vec::new();
        self.find_layer(0, state, label, &mut out)?;
        Ok(out)
    }

    #[inline]
    fn side(&self, arc: &Arc<W>) -> Label {
        match self.match_type {
            MatchType::Output => arc.olabel,
            _ => arc.ilabel,
        }
    }

    fn find_layer(
        &self,
        depth: usize,
        state: StateId,
        label: Label,
        out: &mut Vec<Arc<W>>,
    ) -> Result<()> {
        let Some(&layer) = self.layers.get(depth) else {
            return self.find_exact(state, label, out);
        };
        if label == EPSILON || label == NO_LABEL {
            return self.find_layer(depth + 1, state, label, out);
        }
        let special = layer.label();
        if label == special {
            return Err(FstError::Config(format!(
                "cannot query a {} matcher with its own label {label}",
                layer.name()
            )));
        }

        match layer {
            SpecialMatch::Sigma(_) => {
                self.find_layer(depth + 1, state, label, out)?;
                let first = out.len();
                self.find_layer(depth + 1, state, special, out)?;
                for arc in &mut out[first..] {
                    self.rewrite(arc, special, label);
                }
            }
            SpecialMatch::Rho(_) => {
                let first = out.len();
                self.find_layer(depth + 1, state, label, out)?;
                if out.len() == first {
                    self.find_layer(depth + 1, state, special, out)?;
                    for arc in &mut out[first..] {
                        self.rewrite(arc, special, label);
                    }
                }
            }
            SpecialMatch::Phi(_) => self.find_phi(depth, state, label, special, out)?,
        }
        Ok(())
    }

    fn find_phi(
        &self,
        depth: usize,
        state: StateId,
        label: Label,
        phi: Label,
        out: &mut Vec<Arc<W>>,
    ) -> Result<()> {
        let mut current = state;
        let mut weight = W::one();
        let mut visited = HashSet::new();
        visited.insert(state);
        loop {
            let first = out.len();
            self.find_layer(depth + 1, current, label, out)?;
            if out.len() > first {
                for arc in &mut out[first..] {
                    arc.weight = weight.times(&arc.weight);
                }
                return Ok(());
            }

            let mut phis = Vec::new();
            self.find_layer(depth + 1, current, phi, &mut phis)?;
            let phi_arc = match phis.as_slice() {
                [] => return Ok(()),
                [arc] => *arc,
                _ => {
                    return Err(FstError::Config(format!(
                        "state {current} has {} phi arcs labelled {phi}",
                        phis.len()
                    )));
                }
            };
            if phi_arc.nextstate == current {
                if self.phi_loop {
                    let mut arc = phi_arc;
                    arc.weight = weight.times(&arc.weight);
                    self.rewrite(&mut arc, phi, label);
                    out.push(arc);
                }
                return Ok(());
            }
            weight = weight.times(&phi_arc.weight);
            current = phi_arc.nextstate;
            if !visited.insert(current) {
                log::trace!("phi cycle through state {current} for label {label}");
                return Ok(());
            }
        }
    }

    fn rewrite(&self, arc: &mut Arc<W>, special: Label, label: Label) {
        match self.match_type {
            MatchType::Output => {
                arc.olabel = label;
                if self.rewrite_both && arc.ilabel == special {
                    arc.ilabel = label;
                }
            }
            _ => {
                arc.ilabel = label;
                if self.rewrite_both && arc.olabel == special {
                    arc.olabel = label;
                }
            }
        }
    }

    fn find_exact(&self, state: StateId, label: Label, out: &mut Vec<Arc<W>>) -> Result<()> {
        let arcs = self.fst.arcs(state)?;
        let wanted = if label == NO_LABEL { EPSILON } else { label };
        if label == EPSILON {
            out.push(self.loop_arc(state));
        }
        if self.sorted {
            let lo = arcs.partition_point(|a| self.side(a) < wanted);
            out.extend(arcs[lo..].iter().take_while(|a| self.side(a) == wanted));
        } else {
            out.extend(arcs.iter().filter(|a| self.side(a) == wanted));
        }
        Ok(())
    }
}
