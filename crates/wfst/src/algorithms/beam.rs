// Beam search over a lazily expanded composition.
//
// Only the states that make it into the beam are ever expanded, so this can
// decode compositions far too large to build eagerly.

use std::cmp::Ordering;

use hashbrown::HashMap;
use hashbrown::hash_map::Entry;

use crate::compose::ComposeFst;
use crate::fst::Fst;
use crate::{Arc, EPSILON, FstError, Label, NaturalOrder, Result, StateId};

/// The best accepting path found by [`beam_search`].
#[derive(Debug, Clone, PartialEq)]
pub struct BeamPath<W> {
    /// Composite states from the start to the final state.
    pub states: Vec<StateId>,
    /// Non-epsilon input labels along the path.
    pub ilabels: Vec<Label>,
    /// Non-epsilon output labels along the path.
    pub olabels: Vec<Label>,
    /// Path weight including the final weight.
    pub weight: W,
}

struct Admitted<W> {
    cost: W,
    back: Option<(StateId, Arc<W>)>,
}

fn order<W: NaturalOrder>(a: &W, b: &W) -> Ordering {
    if a.natural_less(b) {
        Ordering::Less
    } else if b.natural_less(a) {
        Ordering::Greater
    } else {
        Ordering::Equal
    }
}

/// Level-by-level beam search from the composite start state.
///
/// At each level the successors of the current beam are collected, each
/// state keeping its cheapest incoming path, and the `beam_width` cheapest
/// states not admitted before form the next beam. Returns the cheapest
/// accepting path seen, or `None` if the search never reaches a final state.
pub fn beam_search<W, F1, F2>(
    compose: &mut ComposeFst<'_, W, F1, F2>,
    beam_width: usize,
) -> Result<Option<BeamPath<W>>>
where
    W: NaturalOrder,
    F1: Fst<W> + ?Sized,
    F2: Fst<W> + ?Sized,
{
    if beam_width == 0 {
        return Err(FstError::Config("beam width must be at least 1".to_string()));
    }
    let Some(start) = compose.start() else {
        return Ok(None);
    };

    let mut admitted: HashMap<StateId, Admitted<W>> = HashMap::new();
    admitted.insert(
        start,
        Admitted {
            cost: W::one(),
            back: None,
        },
    );
    let mut beam = vec![start];
    let mut best: Option<(W, StateId)> = None;
    let mut level = 0;

    while !beam.is_empty() {
        let mut candidates: HashMap<StateId, (W, StateId, Arc<W>)> = HashMap::new();
        for &state in &beam {
            let Some(cost) = admitted.get(&state).map(|a| a.cost) else {
                continue;
            };
            if let Some(f) = compose.final_weight(state)? {
                let total = cost.times(&f);
                if best.is_none_or(|(b, _)| total.natural_less(&b)) {
                    best = Some((total, state));
                }
            }
            for arc in compose.arcs(state)? {
                if admitted.contains_key(&arc.nextstate) {
                    continue;
                }
                let next_cost = cost.times(&arc.weight);
                match candidates.entry(arc.nextstate) {
                    Entry::Occupied(mut slot) => {
                        if next_cost.natural_less(&slot.get().0) {
                            slot.insert((next_cost, state, *arc));
                        }
                    }
                    Entry::Vacant(slot) => {
                        slot.insert((next_cost, state, *arc));
                    }
                }
            }
        }

        let mut ranked: Vec<_> = candidates.into_iter().collect();
        ranked.sort_by(|(sa, (ca, ..)), (sb, (cb, ..))| order(ca, cb).then(sa.cmp(sb)));
        beam.clear();
        for (state, (cost, prev, arc)) in ranked.into_iter().take(beam_width) {
            admitted.insert(
                state,
                Admitted {
                    cost,
                    back: Some((prev, arc)),
                },
            );
            beam.push(state);
        }
        level += 1;
        log::trace!("beam level {level}: {} states", beam.len());
    }
    log::debug!(
        "beam search: {} levels, {} states admitted, {} composite states known",
        level,
        admitted.len(),
        compose.num_known_states()
    );

    let Some((weight, last)) = best else {
        return Ok(None);
    };
    let mut states = vec![last];
    let mut arcs = Vec::new();
    let mut cursor = last;
    while let Some((prev, arc)) = admitted.get(&cursor).and_then(|a| a.back) {
        arcs.push(arc);
        states.push(prev);
        cursor = prev;
    }
    states.reverse();
    arcs.reverse();
    Ok(Some(BeamPath {
        states,
        ilabels: arcs.iter().map(|a| a.ilabel).filter(|&l| l != EPSILON).collect(),
        olabels: arcs.iter().map(|a| a.olabel).filter(|&l| l != EPSILON).collect(),
        weight,
    }))
}
