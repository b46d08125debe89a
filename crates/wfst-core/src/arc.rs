// Arc: one labeled, weighted edge of an automaton.

use crate::semiring::Semiring;
use crate::{EPSILON, Label, StateId};

/// An edge owned by its source state.
///
/// `ilabel` is consumed, `olabel` is emitted, `weight` is multiplied into the
/// path weight and `nextstate` is the destination.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Arc<W> {
    pub ilabel: Label,
    pub olabel: Label,
    pub weight: W,
    pub nextstate: StateId,
}

impl<W: Semiring> Arc<W> {
    pub fn new(ilabel: Label, olabel: Label, weight: W, nextstate: StateId) -> Self {
        Self {
            ilabel,
            olabel,
            weight,
            nextstate,
        }
    }

    /// Both sides are epsilon.
    #[inline]
    pub fn is_epsilon(&self) -> bool {
        self.ilabel == EPSILON && self.olabel == EPSILON
    }

    /// Compare two arcs, allowing `delta` slack on the weight.
    pub fn approx_eq(&self, other: &Self, delta: f32) -> bool {
        self.ilabel == other.ilabel
            && self.olabel == other.olabel
            && self.nextstate == other.nextstate
            && self.weight.approx_eq(&other.weight, delta)
    }
}
