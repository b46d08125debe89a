// Strings <-> linear automata.
//
// Byte strings use one label per byte; wide strings use one label per
// Unicode scalar value. Label 0 is epsilon, so NUL cannot be represented.

use hashbrown::HashSet;

use crate::fst::{Fst, MutableFst};
use crate::{Arc, EPSILON, FstError, Label, LabelSide, Result, Semiring, StateId};

/// Add a path reading `ilabels` and writing `olabels` from the start state
/// (created if there is none) to a new final state with `weight`.
///
/// The shorter side is padded with epsilons. Earlier paths are kept, so
/// repeated calls build a union. Returns the final state of the new path.
pub fn add_labels<W, F>(fst: &mut F, ilabels: &[Label], olabels: &[Label], weight: W) -> Result<StateId>
where
    W: Semiring,
    F: MutableFst<W> + ?Sized,
{
    let start = match fst.start() {
        Some(s) => s,
        None => {
            let s = fst.add_state();
            fst.set_start(s)?;
            s
        }
    };
    let len = ilabels.len().max(olabels.len());
    if len == 0 {
        let weight = match fst.final_weight(start)? {
            Some(existing) => existing.plus(&weight),
            None => weight,
        };
        fst.set_final(start, weight)?;
        return Ok(start);
    }

    let mut prev = start;
    for i in 0..len {
        let next = fst.add_state();
        let ilabel = ilabels.get(i).copied().unwrap_or(EPSILON);
        let olabel = olabels.get(i).copied().unwrap_or(EPSILON);
        fst.add_arc(prev, Arc::new(ilabel, olabel, W::one(), next))?;
        prev = next;
    }
    fst.set_final(prev, weight)?;
    Ok(prev)
}

fn byte_labels(s: &str) -> Vec<Label> {
    s.bytes().map(Label::from).collect()
}

fn char_labels(s: &str) -> Vec<Label> {
    s.chars().map(Label::from).collect()
}

/// Add an acceptor path for the bytes of `s`.
pub fn add_string<W: Semiring, F: MutableFst<W> + ?Sized>(fst: &mut F, s: &str) -> Result<StateId> {
    let labels = byte_labels(s);
    add_labels(fst, &labels, &labels, W::one())
}

/// Add an acceptor path for the characters of `s`.
pub fn add_wstring<W: Semiring, F: MutableFst<W> + ?Sized>(fst: &mut F, s: &str) -> Result<StateId> {
    let labels = char_labels(s);
    add_labels(fst, &labels, &labels, W::one())
}

/// Add a path rewriting the bytes of `input` to the bytes of `output`.
pub fn add_translation<W, F>(fst: &mut F, input: &str, output: &str, weight: W) -> Result<StateId>
where
    W: Semiring,
    F: MutableFst<W> + ?Sized,
{
    add_labels(fst, &byte_labels(input), &byte_labels(output), weight)
}

/// Labels along the single accepting path, epsilons skipped.
///
/// Every state on the path must have exactly one way forward: one arc and
/// not final, or final and no arcs.
fn linear_path<W, F>(fst: &F, side: LabelSide) -> Result<Vec<Label>>
where
    W: Semiring,
    F: Fst<W> + ?Sized,
{
    let mut state = fst
        .start()
        .ok_or_else(|| FstError::AmbiguousPath("no start state".to_string()))?;
    let mut visited = HashSet::new();
    let mut labels = Vec::new();
    loop {
        if !visited.insert(state) {
            return Err(FstError::AmbiguousPath(format!("cycle through state {state}")));
        }
        let arcs = fst.arcs(state)?;
        let is_final = fst.is_final(state)?;
        match (arcs, is_final) {
            ([], true) => return Ok(labels),
            ([], false) => {
                return Err(FstError::AmbiguousPath(format!(
                    "state {state} is a dead end"
                )));
            }
            ([arc], false) => {
                let label = match side {
                    LabelSide::Input => arc.ilabel,
                    LabelSide::Output => arc.olabel,
                };
                if label != EPSILON {
                    labels.push(label);
                }
                state = arc.nextstate;
            }
            (arcs, _) => {
                return Err(FstError::AmbiguousPath(format!(
                    "state {state} branches ({} arcs{})",
                    arcs.len(),
                    if is_final { ", final" } else { "" }
                )));
            }
        }
    }
}

fn labels_to_bytes(labels: &[Label]) -> Result<String> {
    let bytes = labels
        .iter()
        .map(|&label| u8::try_from(label).map_err(|_| FstError::LabelNotText { label }))
        .collect::<Result<Vec<u8>>>()?;
    String::from_utf8(bytes).map_err(|e| {
        let bad = e.utf8_error().valid_up_to();
        FstError::LabelNotText {
            label: Label::from(e.as_bytes()[bad]),
        }
    })
}

fn labels_to_chars(labels: &[Label]) -> Result<String> {
    labels
        .iter()
        .map(|&label| char::from_u32(label).ok_or(FstError::LabelNotText { label }))
        .collect()
}

/// Read back the byte string of a linear automaton's input side.
pub fn get_string<W: Semiring, F: Fst<W> + ?Sized>(fst: &F) -> Result<String> {
    labels_to_bytes(&linear_path(fst, LabelSide::Input)?)
}

/// Read back the wide string of a linear automaton's input side.
pub fn wget_string<W: Semiring, F: Fst<W> + ?Sized>(fst: &F) -> Result<String> {
    labels_to_chars(&linear_path(fst, LabelSide::Input)?)
}

/// Read back the byte string of a linear automaton's output side.
pub fn get_output_string<W: Semiring, F: Fst<W> + ?Sized>(fst: &F) -> Result<String> {
    labels_to_bytes(&linear_path(fst, LabelSide::Output)?)
}
