// Structural sanity check.

use crate::fst::ExpandedFst;
use crate::properties::{FstProperties, compute_properties};
use crate::symbols::SharedSymbols;
use crate::{EPSILON, FstError, Label, LabelSide, NO_LABEL, Result, Semiring, StateId};

/// Check that `fst` is well formed, reporting the first violation as
/// [`FstError::Verification`]. Nothing is repaired.
///
/// Checked: the start state and every arc destination exist; no arc carries
/// the internal `NO_LABEL` sentinel; arc and final weights are members of the
/// semiring; non-epsilon labels are bound in the symbol table attached to
/// their side; cached properties agree with freshly computed ones.
pub fn verify<W, F>(fst: &F) -> Result<()>
where
    W: Semiring,
    F: ExpandedFst<W> + ?Sized,
{
    let num_states = fst.num_states();
    if let Some(start) = fst.start() {
        if start >= num_states {
            return Err(FstError::Verification(format!(
                "start state {start} out of range ({num_states} states)"
            )));
        }
    }

    for s in fst.states() {
        if let Some(w) = fst.final_weight(s)? {
            if !w.is_member() {
                return Err(FstError::Verification(format!(
                    "state {s} has invalid final weight {w}"
                )));
            }
        }
        for (i, arc) in fst.arcs(s)?.iter().enumerate() {
            if arc.nextstate >= num_states {
                return Err(FstError::Verification(format!(
                    "arc {i} of state {s} points to missing state {}",
                    arc.nextstate
                )));
            }
            if !arc.weight.is_member() {
                return Err(FstError::Verification(format!(
                    "arc {i} of state {s} has invalid weight {}",
                    arc.weight
                )));
            }
            check_label(fst.input_symbols(), s, i, arc.ilabel, LabelSide::Input)?;
            check_label(fst.output_symbols(), s, i, arc.olabel, LabelSide::Output)?;
        }
    }

    let cached = fst.properties(FstProperties::ALL, false);
    let fresh = compute_properties(fst);
    if !fresh.contains(cached) {
        return Err(FstError::Verification(format!(
            "cached properties {cached:?} disagree with computed {fresh:?}"
        )));
    }
    Ok(())
}

fn check_label(
    symbols: Option<&SharedSymbols>,
    state: StateId,
    index: usize,
    label: Label,
    side: LabelSide,
) -> Result<()> {
    if label == NO_LABEL {
        return Err(FstError::Verification(format!(
            "arc {index} of state {state} carries the reserved {side} label {label}"
        )));
    }
    match symbols {
        Some(table) if label != EPSILON && !table.contains_key(label) => {
            Err(FstError::Verification(format!(
                "{side} label {label} on arc {index} of state {state} is not in symbol table {:?}",
                table.name()
            )))
        }
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fst::{Fst, MutableFst};
    use crate::{Arc, SymbolTable, TropicalWeight, VectorFst};

    fn valid() -> VectorFst<TropicalWeight> {
        let mut fst = VectorFst::new();
        fst.add_states(2);
        fst.set_start(0).unwrap();
        fst.emplace_arc(0, 1, 2, TropicalWeight(0.5), 1).unwrap();
        fst.set_final(1, TropicalWeight::one()).unwrap();
        fst
    }

    #[test]
    fn accepts_valid_automata() {
        verify(&valid()).unwrap();
        verify(&VectorFst::<TropicalWeight>::new()).unwrap();
        let fst = valid();
        fst.properties(FstProperties::ALL, true);
        verify(&fst).unwrap();
    }

    #[test]
    fn rejects_bad_weights() {
        let mut fst = valid();
        fst.arcs_mut(0).unwrap()[0].weight = TropicalWeight(f32::NAN);
        assert!(matches!(verify(&fst), Err(FstError::Verification(_))));

        let mut fst = valid();
        fst.set_final(1, TropicalWeight(f32::NEG_INFINITY)).unwrap();
        assert!(matches!(verify(&fst), Err(FstError::Verification(_))));
    }

    #[test]
    fn rejects_reserved_label() {
        let mut fst = valid();
        fst.add_arc(0, Arc::new(NO_LABEL, 1, TropicalWeight::one(), 1))
            .unwrap();
        assert!(matches!(verify(&fst), Err(FstError::Verification(_))));
    }

    #[test]
    fn checks_symbol_tables() {
        let mut fst = valid();
        let mut isyms = SymbolTable::with_epsilon("in");
        isyms.add_symbol("a").unwrap();
        fst.set_input_symbols(Some(SharedSymbols::new(isyms)));
        verify(&fst).unwrap();

        let osyms = SymbolTable::with_epsilon("out");
        fst.set_output_symbols(Some(SharedSymbols::new(osyms)));
        let err = verify(&fst).unwrap_err();
        assert!(err.to_string().contains("output label 2"), "{err}");
    }
}
