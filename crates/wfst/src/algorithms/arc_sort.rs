// Stable per-state arc sorting.

use crate::fst::MutableFst;
use crate::{Result, Semiring};

/// Sort key for [`arc_sort`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArcSortType {
    /// By input label, then output label.
    ByInput,
    /// By output label, then input label.
    ByOutput,
}

/// Sort the arcs of every state. Equal keys keep their insertion order.
///
/// Sorting on the matched side lets [`Matcher`](crate::Matcher) use binary
/// search.
pub fn arc_sort<W, F>(fst: &mut F, sort_type: ArcSortType) -> Result<()>
where
    W: Semiring,
    F: MutableFst<W> + ?Sized,
{
    for s in fst.states() {
        let arcs = fst.arcs_mut(s)?;
        match sort_type {
            ArcSortType::ByInput => arcs.sort_by_key(|a| (a.ilabel, a.olabel)),
            ArcSortType::ByOutput => arcs.sort_by_key(|a| (a.olabel, a.ilabel)),
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fst::Fst;
    use crate::{FstProperties, TropicalWeight, VectorFst};

    #[test]
    fn sorts_and_sets_property() {
        let mut fst = VectorFst::<TropicalWeight>::new();
        fst.add_states(2);
        fst.set_start(0).unwrap();
        for (i, o) in [(3, 1), (1, 3), (2, 2)] {
            fst.emplace_arc(0, i, o, TropicalWeight::one(), 1).unwrap();
        }
        assert!(
            fst.properties(FstProperties::I_LABEL_SORTED, true)
                .is_empty()
        );

        arc_sort(&mut fst, ArcSortType::ByInput).unwrap();
        let ilabels: Vec<_> = fst.arcs(0).unwrap().iter().map(|a| a.ilabel).collect();
        assert_eq!(ilabels, vec![1, 2, 3]);
        assert!(
            fst.properties(FstProperties::I_LABEL_SORTED, true)
                .contains(FstProperties::I_LABEL_SORTED)
        );

        arc_sort(&mut fst, ArcSortType::ByOutput).unwrap();
        let olabels: Vec<_> = fst.arcs(0).unwrap().iter().map(|a| a.olabel).collect();
        assert_eq!(olabels, vec![1, 2, 3]);
    }
}
