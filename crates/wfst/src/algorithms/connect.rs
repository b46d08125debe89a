// Trim: keep only states on some start-to-final path.

use crate::fst::MutableFst;
use crate::properties::reachability;
use crate::{Result, Semiring, StateId};

/// Delete every state that is not both accessible and coaccessible.
///
/// Surviving states keep their relative order. If the start state itself is
/// useless the result has no states.
pub fn connect<W, F>(fst: &mut F) -> Result<()>
where
    W: Semiring,
    F: MutableFst<W> + ?Sized,
{
    let (accessible, coaccessible) = reachability(&*fst);
    let dead: Vec<StateId> = fst
        .states()
        .filter(|&s| !(accessible[s] && coaccessible[s]))
        .collect();
    if !dead.is_empty() {
        log::debug!("connect: removing {} of {} states", dead.len(), fst.num_states());
        fst.delete_states(&dead)?;
    }
    Ok(())
}
