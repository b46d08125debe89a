// Structural equality.

use crate::fst::ExpandedFst;
use crate::{Result, Semiring};

/// Whether `a` and `b` have the same start, states, final weights and arcs
/// (in order), comparing weights within `delta`.
///
/// Symbol tables are not compared.
pub fn equal<W, A, B>(a: &A, b: &B, delta: f32) -> Result<bool>
where
    W: Semiring,
    A: ExpandedFst<W> + ?Sized,
    B: ExpandedFst<W> + ?Sized,
{
    if a.start() != b.start() || a.num_states() != b.num_states() {
        return Ok(false);
    }
    for s in a.states() {
        let same_final = match (a.final_weight(s)?, b.final_weight(s)?) {
            (None, None) => true,
            (Some(x), Some(y)) => x.approx_eq(&y, delta),
            _ => false,
        };
        if !same_final {
            return Ok(false);
        }
        let (arcs_a, arcs_b) = (a.arcs(s)?, b.arcs(s)?);
        if arcs_a.len() != arcs_b.len()
            || !arcs_a.iter().zip(arcs_b).all(|(x, y)| x.approx_eq(y, delta))
        {
            return Ok(false);
        }
    }
    Ok(true)
}
