// Move arc labels from one symbol table's id space to another's.

use crate::fst::MutableFst;
use crate::symbols::{SharedSymbols, SymbolTable};
use crate::{EPSILON, FstError, Label, LabelSide, Result, Semiring, StateId};

/// Re-key the labels of `fst` through `table`.
///
/// Each non-epsilon label on a converted side is looked up as text in the
/// table currently attached to that side, then resolved to its key in
/// `table`. On success `table` is attached to every converted side.
///
/// The conversion is all-or-nothing: if any label has no text in the source
/// table or no key in `table`, the automaton is left untouched and the first
/// offending label is reported as [`FstError::UnknownSymbol`]. A converted
/// side without an attached table is a [`FstError::Config`] error.
///
/// Tables are attached by pointer, so the automaton stays bound to the
/// revision of `table` its labels were resolved against; the debug log
/// names every table involved together with its [`SymbolTable::version`].
pub fn convert_symbols<W, F>(
    fst: &mut F,
    table: &SharedSymbols,
    convert_input: bool,
    convert_output: bool,
) -> Result<()>
where
    W: Semiring,
    F: MutableFst<W> + ?Sized,
{
    let source = |symbols: Option<&SharedSymbols>, side: LabelSide| {
        symbols.cloned().ok_or_else(|| {
            FstError::Config(format!("no {side} symbol table to convert from"))
        })
    };
    let isource = if convert_input {
        Some(source(fst.input_symbols(), LabelSide::Input)?)
    } else {
        None
    };
    let osource = if convert_output {
        Some(source(fst.output_symbols(), LabelSide::Output)?)
    } else {
        None
    };

    // resolve everything before touching a single arc
    let mut relabeled: Vec<Vec<(Label, Label)>> = Vec::with_capacity(fst.num_states());
    for s in fst.states() {
        let arcs = fst.arcs(s)?;
        let mut labels = Vec::with_capacity(arcs.len());
        for (index, arc) in arcs.iter().enumerate() {
            let ilabel = match &isource {
                Some(src) => map_label(src, table, s, index, arc.ilabel, LabelSide::Input)?,
                None => arc.ilabel,
            };
            let olabel = match &osource {
                Some(src) => map_label(src, table, s, index, arc.olabel, LabelSide::Output)?,
                None => arc.olabel,
            };
            labels.push((ilabel, olabel));
        }
        relabeled.push(labels);
    }

    for (s, labels) in relabeled.into_iter().enumerate() {
        for (arc, (ilabel, olabel)) in fst.arcs_mut(s)?.iter_mut().zip(labels) {
            arc.ilabel = ilabel;
            arc.olabel = olabel;
        }
    }
    if convert_input {
        fst.set_input_symbols(Some(table.clone()));
    }
    if convert_output {
        fst.set_output_symbols(Some(table.clone()));
    }
    let describe = |src: &SharedSymbols| format!("{:?}@v{}", src.name(), src.version());
    log::debug!(
        "converted labels to symbol table {:?}@v{} (input from {}, output from {})",
        table.name(),
        table.version(),
        isource.as_ref().map_or_else(|| "-".to_string(), describe),
        osource.as_ref().map_or_else(|| "-".to_string(), describe),
    );
    Ok(())
}

fn map_label(
    source: &SymbolTable,
    target: &SymbolTable,
    state: StateId,
    arc: usize,
    label: Label,
    side: LabelSide,
) -> Result<Label> {
    if label == EPSILON {
        return Ok(EPSILON);
    }
    source
        .find_symbol(label)
        .and_then(|text| target.find_key(text))
        .map_err(|_| FstError::UnknownSymbol {
            state,
            arc,
            label,
            side,
        })
}
