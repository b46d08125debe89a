// Projection of a transducer onto one of its sides.

use crate::fst::MutableFst;
use crate::{Result, Semiring};

/// Which side survives a projection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProjectType {
    Input,
    Output,
}

/// Copy the kept side's label onto the other side of every arc, turning the
/// automaton into an acceptor. The symbol table of the kept side is attached
/// to both sides.
pub fn project<W, F>(fst: &mut F, project_type: ProjectType) -> Result<()>
where
    W: Semiring,
    F: MutableFst<W> + ?Sized,
{
    for s in fst.states() {
        for arc in fst.arcs_mut(s)? {
            match project_type {
                ProjectType::Input => arc.olabel = arc.ilabel,
                ProjectType::Output => arc.ilabel = arc.olabel,
            }
        }
    }
    match project_type {
        ProjectType::Input => {
            let symbols = fst.input_symbols().cloned();
            fst.set_output_symbols(symbols);
        }
        ProjectType::Output => {
            let symbols = fst.output_symbols().cloned();
            fst.set_input_symbols(symbols);
        }
    }
    Ok(())
}

pub fn project_input<W: Semiring, F: MutableFst<W> + ?Sized>(fst: &mut F) -> Result<()> {
    project(fst, ProjectType::Input)
}

pub fn project_output<W: Semiring, F: MutableFst<W> + ?Sized>(fst: &mut F) -> Result<()> {
    project(fst, ProjectType::Output)
}
