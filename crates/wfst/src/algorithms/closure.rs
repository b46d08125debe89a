// Kleene closure.

use crate::fst::MutableFst;
use crate::{Arc, EPSILON, Result, Semiring};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ClosureType {
    /// Zero or more repetitions.
    #[default]
    Star,
    /// One or more repetitions.
    Plus,
}

/// Replace the language L by L* or L+ in place.
///
/// Every final state gets an epsilon arc back to the start carrying its final
/// weight. For `Star` a new start state, final with weight one, is placed in
/// front of the old one so the empty string is accepted without making the
/// old start final. An automaton without a start state is left alone for
/// `Plus` and becomes the empty-string acceptor for `Star`.
pub fn closure<W, F>(fst: &mut F, closure_type: ClosureType) -> Result<()>
where
    W: Semiring,
    F: MutableFst<W> + ?Sized,
{
    let Some(start) = fst.start() else {
        if closure_type == ClosureType::Star {
            let s = fst.add_state();
            fst.set_start(s)?;
            fst.set_final(s, W::one())?;
        }
        return Ok(());
    };

    for s in fst.states() {
        if let Some(weight) = fst.final_weight(s)? {
            fst.add_arc(s, Arc::new(EPSILON, EPSILON, weight, start))?;
        }
    }
    if closure_type == ClosureType::Star {
        let new_start = fst.add_state();
        fst.set_final(new_start, W::one())?;
        fst.add_arc(new_start, Arc::new(EPSILON, EPSILON, W::one(), start))?;
        fst.set_start(new_start)?;
    }
    Ok(())
}

/// Shorthand for `closure(fst, ClosureType::Star)`.
pub fn closure_star<W: Semiring, F: MutableFst<W> + ?Sized>(fst: &mut F) -> Result<()> {
    closure(fst, ClosureType::Star)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fst::{ExpandedFst, Fst};
    use crate::{TropicalWeight, VectorFst};

    fn single_arc() -> VectorFst<TropicalWeight> {
        let mut fst = VectorFst::new();
        fst.add_states(2);
        fst.set_start(0).unwrap();
        fst.emplace_arc(0, 1, 1, TropicalWeight(1.0), 1).unwrap();
        fst.set_final(1, TropicalWeight(0.5)).unwrap();
        fst
    }

    #[test]
    fn star_adds_new_start_and_loop_back() {
        let mut fst = single_arc();
        closure_star(&mut fst).unwrap();
        assert_eq!(fst.num_states(), 3);
        assert_eq!(fst.start(), Some(2));
        assert_eq!(fst.final_weight(2).unwrap(), Some(TropicalWeight::one()));
        assert!(!fst.is_final(0).unwrap());
        let back = fst.get_arc(1, 0).unwrap();
        assert_eq!((back.ilabel, back.olabel, back.nextstate), (0, 0, 0));
        assert_eq!(back.weight, TropicalWeight(0.5));
        assert_eq!(fst.get_arc(2, 0).unwrap().nextstate, 0);
    }

    #[test]
    fn plus_keeps_start() {
        let mut fst = single_arc();
        closure(&mut fst, ClosureType::Plus).unwrap();
        assert_eq!(fst.num_states(), 2);
        assert_eq!(fst.start(), Some(0));
        assert!(!fst.is_final(0).unwrap());
        assert_eq!(fst.num_arcs(1).unwrap(), 1);
    }

    #[test]
    fn star_of_empty_accepts_epsilon() {
        let mut fst = VectorFst::<TropicalWeight>::new();
        closure_star(&mut fst).unwrap();
        assert_eq!(fst.num_states(), 1);
        assert!(fst.is_final(0).unwrap());
    }
}
