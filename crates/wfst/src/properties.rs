// Structural property flags and their computation.
//
// Properties come in positive / negative pairs so that "unknown" can be told
// apart from "false": a property is known when either bit of its pair is set.

use std::fmt;
use std::ops::{BitAnd, BitAndAssign, BitOr, BitOrAssign, Not};

use hashbrown::HashSet;

use crate::fst::ExpandedFst;
use crate::{EPSILON, Semiring, StateId};

/// Bitset of structural properties.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct FstProperties(u64);

impl FstProperties {
    pub const ACCEPTOR: Self = Self(1 << 0);
    pub const NOT_ACCEPTOR: Self = Self(1 << 1);
    pub const I_DETERMINISTIC: Self = Self(1 << 2);
    pub const NON_I_DETERMINISTIC: Self = Self(1 << 3);
    pub const O_DETERMINISTIC: Self = Self(1 << 4);
    pub const NON_O_DETERMINISTIC: Self = Self(1 << 5);
    pub const EPSILONS: Self = Self(1 << 6);
    pub const NO_EPSILONS: Self = Self(1 << 7);
    pub const I_EPSILONS: Self = Self(1 << 8);
    pub const NO_I_EPSILONS: Self = Self(1 << 9);
    pub const O_EPSILONS: Self = Self(1 << 10);
    pub const NO_O_EPSILONS: Self = Self(1 << 11);
    pub const I_LABEL_SORTED: Self = Self(1 << 12);
    pub const NOT_I_LABEL_SORTED: Self = Self(1 << 13);
    pub const O_LABEL_SORTED: Self = Self(1 << 14);
    pub const NOT_O_LABEL_SORTED: Self = Self(1 << 15);
    pub const WEIGHTED: Self = Self(1 << 16);
    pub const UNWEIGHTED: Self = Self(1 << 17);
    pub const CYCLIC: Self = Self(1 << 18);
    pub const ACYCLIC: Self = Self(1 << 19);
    pub const ACCESSIBLE: Self = Self(1 << 20);
    pub const NOT_ACCESSIBLE: Self = Self(1 << 21);
    pub const COACCESSIBLE: Self = Self(1 << 22);
    pub const NOT_COACCESSIBLE: Self = Self(1 << 23);

    /// Every property bit, positive and negative.
    pub const ALL: Self = Self((1 << 24) - 1);

    const POSITIVE: u64 = 0x55_5555;

    pub const fn empty() -> Self {
        Self(0)
    }

    pub const fn bits(self) -> u64 {
        self.0
    }

    /// Keep only bits this crate defines.
    pub const fn from_bits_truncate(bits: u64) -> Self {
        Self(bits & Self::ALL.0)
    }

    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub const fn intersects(self, other: Self) -> bool {
        self.0 & other.0 != 0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Expand every bit to its full positive / negative pair.
    pub const fn pairs(self) -> Self {
        let positive = self.0 & Self::POSITIVE;
        let negative = (self.0 >> 1) & Self::POSITIVE;
        let both = positive | negative;
        Self(both | (both << 1))
    }
}

impl BitOr for FstProperties {
    type Output = Self;
    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for FstProperties {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl BitAnd for FstProperties {
    type Output = Self;
    fn bitand(self, rhs: Self) -> Self {
        Self(self.0 & rhs.0)
    }
}

impl BitAndAssign for FstProperties {
    fn bitand_assign(&mut self, rhs: Self) {
        self.0 &= rhs.0;
    }
}

impl Not for FstProperties {
    type Output = Self;
    fn not(self) -> Self {
        Self(!self.0 & Self::ALL.0)
    }
}

const NAMES: [&str; 24] = [
    "acceptor",
    "not-acceptor",
    "i-deterministic",
    "non-i-deterministic",
    "o-deterministic",
    "non-o-deterministic",
    "epsilons",
    "no-epsilons",
    "i-epsilons",
    "no-i-epsilons",
    "o-epsilons",
    "no-o-epsilons",
    "i-label-sorted",
    "not-i-label-sorted",
    "o-label-sorted",
    "not-o-label-sorted",
    "weighted",
    "unweighted",
    "cyclic",
    "acyclic",
    "accessible",
    "not-accessible",
    "coaccessible",
    "not-coaccessible",
];

impl fmt::Debug for FstProperties {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let set: Vec<&str> = NAMES
            .iter()
            .enumerate()
            .filter(|(i, _)| self.0 & (1 << i) != 0)
            .map(|(_, name)| *name)
            .collect();
        write!(f, "FstProperties({})", set.join(" | "))
    }
}

/// Property cache stored inside an automaton.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct PropertyCache {
    pub known: FstProperties,
    pub value: FstProperties,
}

impl PropertyCache {
    /// Answer `mask` from the cache, computing everything when needed.
    pub(crate) fn query(
        &mut self,
        mask: FstProperties,
        compute: bool,
        fresh: impl FnOnce() -> FstProperties,
    ) -> FstProperties {
        let wanted = mask.pairs();
        if self.known.contains(wanted) || !compute {
            return self.value & self.known & mask;
        }
        self.value = fresh();
        self.known = FstProperties::ALL;
        self.value & mask
    }
}

/// Compute every property of `fst` in O(states + arcs).
pub fn compute_properties<W, F>(fst: &F) -> FstProperties
where
    W: Semiring,
    F: ExpandedFst<W> + ?Sized,
{
    let mut acceptor = true;
    let mut i_det = true;
    let mut o_det = true;
    let mut epsilons = false;
    let mut i_eps = false;
    let mut o_eps = false;
    let mut i_sorted = true;
    let mut o_sorted = true;
    let mut weighted = false;

    let mut seen_i = HashSet::new();
    let mut seen_o = HashSet::new();

    for state in fst.states() {
        let arcs = fst.arcs(state).unwrap_or_default();
        seen_i.clear();
        seen_o.clear();
        let mut prev: Option<(u32, u32)> = None;
        for arc in arcs {
            if arc.ilabel != arc.olabel {
                acceptor = false;
            }
            if !seen_i.insert(arc.ilabel) {
                i_det = false;
            }
            if !seen_o.insert(arc.olabel) {
                o_det = false;
            }
            if arc.ilabel == EPSILON {
                i_eps = true;
            }
            if arc.olabel == EPSILON {
                o_eps = true;
            }
            if arc.is_epsilon() {
                epsilons = true;
            }
            if !arc.weight.is_one() && !arc.weight.is_zero() {
                weighted = true;
            }
            if let Some((pi, po)) = prev {
                if arc.ilabel < pi {
                    i_sorted = false;
                }
                if arc.olabel < po {
                    o_sorted = false;
                }
            }
            prev = Some((arc.ilabel, arc.olabel));
        }
        if let Ok(Some(w)) = fst.final_weight(state) {
            if !w.is_one() {
                weighted = true;
            }
        }
    }

    let pick = |flag: bool, yes: FstProperties, no: FstProperties| if flag { yes } else { no };
    let mut props = FstProperties::empty();
    props |= pick(acceptor, FstProperties::ACCEPTOR, FstProperties::NOT_ACCEPTOR);
    props |= pick(
        i_det,
        FstProperties::I_DETERMINISTIC,
        FstProperties::NON_I_DETERMINISTIC,
    );
    props |= pick(
        o_det,
        FstProperties::O_DETERMINISTIC,
        FstProperties::NON_O_DETERMINISTIC,
    );
    props |= pick(epsilons, FstProperties::EPSILONS, FstProperties::NO_EPSILONS);
    props |= pick(i_eps, FstProperties::I_EPSILONS, FstProperties::NO_I_EPSILONS);
    props |= pick(o_eps, FstProperties::O_EPSILONS, FstProperties::NO_O_EPSILONS);
    props |= pick(
        i_sorted,
        FstProperties::I_LABEL_SORTED,
        FstProperties::NOT_I_LABEL_SORTED,
    );
    props |= pick(
        o_sorted,
        FstProperties::O_LABEL_SORTED,
        FstProperties::NOT_O_LABEL_SORTED,
    );
    props |= pick(weighted, FstProperties::WEIGHTED, FstProperties::UNWEIGHTED);
    props |= pick(is_cyclic(fst), FstProperties::CYCLIC, FstProperties::ACYCLIC);

    let (accessible, coaccessible) = reachability(fst);
    props |= pick(
        accessible.iter().all(|&b| b),
        FstProperties::ACCESSIBLE,
        FstProperties::NOT_ACCESSIBLE,
    );
    props |= pick(
        coaccessible.iter().all(|&b| b),
        FstProperties::COACCESSIBLE,
        FstProperties::NOT_COACCESSIBLE,
    );
    props
}

/// Iterative three-color DFS over every state.
fn is_cyclic<W, F>(fst: &F) -> bool
where
    W: Semiring,
    F: ExpandedFst<W> + ?Sized,
{
    const WHITE: u8 = 0;
    const GREY: u8 = 1;
    const BLACK: u8 = 2;

    let n = fst.num_states();
    let mut color = vec![WHITE; n];
    let mut stack: Vec<(StateId, usize)> = Vec::new();

    for root in 0..n {
        if color[root] != WHITE {
            continue;
        }
        color[root] = GREY;
        stack.push((root, 0));
        while let Some(top) = stack.last_mut() {
            let state = top.0;
            let arcs = fst.arcs(state).unwrap_or_default();
            if top.1 < arcs.len() {
                let dest = arcs[top.1].nextstate;
                top.1 += 1;
                match color.get(dest).copied() {
                    Some(GREY) => return true,
                    Some(WHITE) => {
                        color[dest] = GREY;
                        stack.push((dest, 0));
                    }
                    _ => {}
                }
            } else {
                color[state] = BLACK;
                stack.pop();
            }
        }
    }
    false
}

/// Per-state accessibility (reachable from start) and coaccessibility
/// (reaches a final state).
pub fn reachability<W, F>(fst: &F) -> (Vec<bool>, Vec<bool>)
where
    W: Semiring,
    F: ExpandedFst<W> + ?Sized,
{
    let n = fst.num_states();
    let mut accessible = vec![false; n];
    if let Some(start) = fst.start().filter(|&s| s < n) {
        let mut stack = vec![start];
        accessible[start] = true;
        while let Some(state) = stack.pop() {
            for arc in fst.arcs(state).unwrap_or_default() {
                if arc.nextstate < n && !accessible[arc.nextstate] {
                    accessible[arc.nextstate] = true;
                    stack.push(arc.nextstate);
                }
            }
        }
    }

    let mut reverse: Vec<Vec<StateId>> = vec![Vec::new(); n];
    for state in 0..n {
        for arc in fst.arcs(state).unwrap_or_default() {
            if arc.nextstate < n {
                reverse[arc.nextstate].push(state);
            }
        }
    }
    let mut coaccessible = vec![false; n];
    let mut stack: Vec<StateId> = (0..n)
        .filter(|&s| matches!(fst.final_weight(s), Ok(Some(_))))
        .collect();
    for &s in &stack {
        coaccessible[s] = true;
    }
    while let Some(state) = stack.pop() {
        for &prev in &reverse[state] {
            if !coaccessible[prev] {
                coaccessible[prev] = true;
                stack.push(prev);
            }
        }
    }
    (accessible, coaccessible)
}
