// Binary automaton format: header, optional symbol tables, state table, arc table.
//
// All multi-byte fields are little-endian; records are read with bytemuck
// from (possibly unaligned) byte slices.

use std::path::Path;

use bytemuck::{Pod, Zeroable};

use crate::fst::{ExpandedFst, MutableFst};
use crate::symbols::{SharedSymbols, SymbolTable};
use crate::vector::VectorFst;
use crate::{Arc, FstError, Label, Result, Semiring, SemiringKind, StateId};

/// File magic ("WFST" read as a big-endian word).
const MAGIC: u32 = 0x5746_5354;

/// Current format version.
const VERSION: u32 = 1;

/// Size of [`FileHeader`] in bytes.
pub const HEADER_SIZE: usize = 32;

/// `start` value meaning "no start state".
const NO_START: u32 = u32::MAX;

const FLAG_INPUT_SYMBOLS: u32 = 1 << 0;
const FLAG_OUTPUT_SYMBOLS: u32 = 1 << 1;

/// Fixed 32-byte file header.
///
/// - bytes 0..4: magic
/// - bytes 4..8: format version
/// - bytes 8..12: semiring tag (see [`SemiringKind::tag`])
/// - bytes 12..16: flags (bit 0 input symbols, bit 1 output symbols)
/// - bytes 16..20: start state, `u32::MAX` for none
/// - bytes 20..24: number of states
/// - bytes 24..32: total number of arcs
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Pod, Zeroable)]
pub struct FileHeader {
    pub magic: u32,
    pub version: u32,
    pub semiring: u32,
    pub flags: u32,
    pub start: u32,
    pub num_states: u32,
    pub num_arcs: u64,
}

/// Per-state record (8 bytes). A final weight of `+inf` means "not final".
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct StateRecord {
    pub final_weight: f32,
    pub num_arcs: u32,
}

/// Per-arc record (16 bytes), stored grouped by source state.
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct ArcRecord {
    pub ilabel: u32,
    pub olabel: u32,
    pub weight: f32,
    pub nextstate: u32,
}

/// Parse and validate the header, returning it with the semiring it names.
pub fn parse_header(data: &[u8]) -> Result<(FileHeader, SemiringKind)> {
    let mut reader = ByteReader::new(data);
    let header: FileHeader = reader.read_pod()?;
    if header.magic != MAGIC {
        return Err(FstError::Format("invalid magic number".to_string()));
    }
    if header.version != VERSION {
        return Err(FstError::Format(format!(
            "unsupported format version {}",
            header.version
        )));
    }
    let kind = SemiringKind::from_tag(header.semiring).ok_or_else(|| {
        FstError::Format(format!("unknown semiring tag {}", header.semiring))
    })?;
    Ok((header, kind))
}

/// Report which semiring a serialized automaton uses.
pub fn peek_semiring(data: &[u8]) -> Result<SemiringKind> {
    parse_header(data).map(|(_, kind)| kind)
}

fn to_u32(value: usize, what: &str) -> Result<u32> {
    u32::try_from(value)
        .map_err(|_| FstError::Format(format!("{what} {value} does not fit in 32 bits")))
}

/// Serialize any expanded automaton.
pub fn to_bytes<W, F>(fst: &F) -> Result<Vec<u8>>
where
    W: Semiring,
    F: ExpandedFst<W>,
{
    let num_states = fst.num_states();
    let mut states = Vec::with_capacity(num_states);
    let mut arcs = Vec::new();
    for s in fst.states() {
        let state_arcs = fst.arcs(s)?;
        states.push(StateRecord {
            final_weight: fst.final_weight(s)?.unwrap_or_else(W::zero).value(),
            num_arcs: to_u32(state_arcs.len(), "arc count")?,
        });
        for arc in state_arcs {
            arcs.push(ArcRecord {
                ilabel: arc.ilabel,
                olabel: arc.olabel,
                weight: arc.weight.value(),
                nextstate: to_u32(arc.nextstate, "state id")?,
            });
        }
    }

    let mut flags = 0;
    if fst.input_symbols().is_some() {
        flags |= FLAG_INPUT_SYMBOLS;
    }
    if fst.output_symbols().is_some() {
        flags |= FLAG_OUTPUT_SYMBOLS;
    }
    let header = FileHeader {
        magic: MAGIC,
        version: VERSION,
        semiring: W::KIND.tag(),
        flags,
        start: match fst.start() {
            Some(s) => to_u32(s, "start state")?,
            None => NO_START,
        },
        num_states: to_u32(num_states, "state count")?,
        num_arcs: arcs.len() as u64,
    };

    let mut out = Vec::with_capacity(
        HEADER_SIZE
            + states.len() * size_of::<StateRecord>()
            + arcs.len() * size_of::<ArcRecord>(),
    );
    out.extend_from_slice(bytemuck::bytes_of(&header));
    if let Some(table) = fst.input_symbols() {
        write_symbol_table(&mut out, table)?;
    }
    if let Some(table) = fst.output_symbols() {
        write_symbol_table(&mut out, table)?;
    }
    out.extend_from_slice(bytemuck::cast_slice(&states));
    out.extend_from_slice(bytemuck::cast_slice(&arcs));
    Ok(out)
}

fn write_symbol_table(out: &mut Vec<u8>, table: &SymbolTable) -> Result<()> {
    write_string(out, table.name())?;
    out.extend_from_slice(&table.available_key().to_le_bytes());
    out.extend_from_slice(&to_u32(table.num_symbols(), "symbol count")?.to_le_bytes());
    for (key, symbol) in table.iter() {
        out.extend_from_slice(&key.to_le_bytes());
        write_string(out, symbol)?;
    }
    Ok(())
}

fn write_string(out: &mut Vec<u8>, s: &str) -> Result<()> {
    out.extend_from_slice(&to_u32(s.len(), "string length")?.to_le_bytes());
    out.extend_from_slice(s.as_bytes());
    Ok(())
}

/// Parse a serialized automaton. The semiring stored in the file must be `W`.
pub fn from_bytes<W: Semiring>(data: &[u8]) -> Result<VectorFst<W>> {
    let (header, kind) = parse_header(data)?;
    if kind != W::KIND {
        return Err(FstError::Format(format!(
            "file holds a {kind} automaton, expected {}",
            W::KIND
        )));
    }
    let mut reader = ByteReader::new(data);
    reader.skip(HEADER_SIZE)?;

    let isymbols = if header.flags & FLAG_INPUT_SYMBOLS != 0 {
        Some(read_symbol_table(&mut reader)?)
    } else {
        None
    };
    let osymbols = if header.flags & FLAG_OUTPUT_SYMBOLS != 0 {
        Some(read_symbol_table(&mut reader)?)
    } else {
        None
    };

    let num_states = header.num_states as usize;
    let states: Vec<StateRecord> = reader.read_pod_vec(num_states)?;
    let declared_arcs: u64 = states.iter().map(|s| u64::from(s.num_arcs)).sum();
    if declared_arcs != header.num_arcs {
        return Err(FstError::Format(format!(
            "header declares {} arcs, state table declares {declared_arcs}",
            header.num_arcs
        )));
    }
    let num_arcs = usize::try_from(header.num_arcs)
        .map_err(|_| FstError::Format("arc count overflows usize".to_string()))?;
    let arcs: Vec<ArcRecord> = reader.read_pod_vec(num_arcs)?;
    if !reader.is_empty() {
        return Err(FstError::Format(format!(
            "{} trailing bytes after arc table",
            reader.remaining()
        )));
    }

    let mut fst = VectorFst::<W>::new();
    fst.reserve_states(num_states);
    fst.add_states(num_states);
    let mut next_arc = 0;
    for (s, record) in states.iter().enumerate() {
        let weight =
            decode_weight::<W>(record.final_weight, || format!("final weight of state {s}"))?;
        if !weight.is_zero() {
            fst.set_final(s, weight)?;
        }
        let count = record.num_arcs as usize;
        fst.reserve_arcs(s, count)?;
        for rec in &arcs[next_arc..next_arc + count] {
            let nextstate = rec.nextstate as StateId;
            if nextstate >= num_states {
                return Err(FstError::Format(format!(
                    "arc of state {s} points to state {nextstate}, only {num_states} exist"
                )));
            }
            let weight = decode_weight::<W>(rec.weight, || format!("arc weight at state {s}"))?;
            fst.add_arc(s, Arc::new(rec.ilabel, rec.olabel, weight, nextstate))?;
        }
        next_arc += count;
    }
    if header.start != NO_START {
        let start = header.start as StateId;
        if start >= num_states {
            return Err(FstError::Format(format!(
                "start state {start} out of range ({num_states} states)"
            )));
        }
        fst.set_start(start)?;
    }
    fst.set_input_symbols(isymbols.map(SharedSymbols::new));
    fst.set_output_symbols(osymbols.map(SharedSymbols::new));

    log::debug!(
        "parsed {} automaton: {} states, {} arcs, {} bytes",
        W::KIND,
        num_states,
        num_arcs,
        data.len()
    );
    Ok(fst)
}

fn decode_weight<W: Semiring>(value: f32, what: impl FnOnce() -> String) -> Result<W> {
    let weight = W::new(value);
    if weight.is_member() {
        Ok(weight)
    } else {
        Err(FstError::Format(format!("{} is not a valid weight: {value}", what())))
    }
}

fn read_symbol_table(reader: &mut ByteReader<'_>) -> Result<SymbolTable> {
    let name = reader.read_string()?;
    let available_key: Label = reader.read_u32()?;
    let count = reader.read_u32()?;
    let mut table = SymbolTable::new(name);
    for _ in 0..count {
        let key = reader.read_u32()?;
        let symbol = reader.read_string()?;
        table
            .add_symbol_with_key(symbol, key)
            .map_err(|e| FstError::Format(format!("symbol table {:?}: {e}", table.name())))?;
    }
    if available_key < table.available_key() {
        return Err(FstError::Format(format!(
            "symbol table {:?}: available key {available_key} below bound keys",
            table.name()
        )));
    }
    table.raise_available_key(available_key);
    Ok(table)
}

/// Write `fst` to `path`.
pub fn write_path<W, F>(fst: &F, path: &Path) -> Result<()>
where
    W: Semiring,
    F: ExpandedFst<W>,
{
    let bytes = to_bytes(fst)?;
    std::fs::write(path, &bytes)?;
    log::debug!("wrote {} bytes to {}", bytes.len(), path.display());
    Ok(())
}

/// Read an automaton from `path`.
pub fn read_path<W: Semiring>(path: &Path) -> Result<VectorFst<W>> {
    let data = std::fs::read(path)?;
    from_bytes(&data)
}

/// Bounds-checked cursor over a byte slice.
struct ByteReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8]> {
        if len > self.remaining() {
            return Err(FstError::Format(format!(
                "truncated data: need {len} bytes at offset {}, {} available",
                self.pos,
                self.remaining()
            )));
        }
        let bytes = &self.data[self.pos..self.pos + len];
        self.pos += len;
        Ok(bytes)
    }

    fn skip(&mut self, len: usize) -> Result<()> {
        self.take(len).map(|_| ())
    }

    fn read_u32(&mut self) -> Result<u32> {
        let bytes = self.take(4)?;
        Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    fn read_pod<T: Pod>(&mut self) -> Result<T> {
        Ok(bytemuck::pod_read_unaligned(self.take(size_of::<T>())?))
    }

    /// Copy `count` records into an aligned `Vec`.
    fn read_pod_vec<T: Pod>(&mut self, count: usize) -> Result<Vec<T>> {
        let len = count
            .checked_mul(size_of::<T>())
            .ok_or_else(|| FstError::Format(format!("record count {count} overflows")))?;
        let bytes = self.take(len)?;
        let mut records = vec![T::zeroed(); count];
        bytemuck::cast_slice_mut::<T, u8>(&mut records).copy_from_slice(bytes);
        Ok(records)
    }

    fn read_string(&mut self) -> Result<String> {
        let len = self.read_u32()? as usize;
        let bytes = self.take(len)?;
        std::str::from_utf8(bytes)
            .map(str::to_string)
            .map_err(|_| FstError::Format(format!("invalid UTF-8 at offset {}", self.pos - len)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fst::Fst;
    use crate::{LogWeight, TropicalWeight};

    fn sample() -> VectorFst<TropicalWeight> {
        let mut fst = VectorFst::new();
        fst.add_states(3);
        fst.set_start(0).unwrap();
        fst.emplace_arc(0, 1, 2, TropicalWeight(0.5), 1).unwrap();
        fst.emplace_arc(0, 3, 3, TropicalWeight::one(), 2).unwrap();
        fst.emplace_arc(1, 0, 0, TropicalWeight(1.25), 2).unwrap();
        fst.set_final(2, TropicalWeight(2.0)).unwrap();
        fst
    }

    #[test]
    fn record_sizes() {
        assert_eq!(size_of::<FileHeader>(), HEADER_SIZE);
        assert_eq!(size_of::<StateRecord>(), 8);
        assert_eq!(size_of::<ArcRecord>(), 16);
    }

    #[test]
    fn header_fields() {
        let bytes = to_bytes(&sample()).unwrap();
        let (header, kind) = parse_header(&bytes).unwrap();
        assert_eq!(kind, SemiringKind::Tropical);
        assert_eq!(header.num_states, 3);
        assert_eq!(header.num_arcs, 3);
        assert_eq!(header.start, 0);
        assert_eq!(header.flags, 0);
        assert_eq!(bytes.len(), HEADER_SIZE + 3 * 8 + 3 * 16);
    }

    #[test]
    fn round_trip_preserves_structure() {
        let fst = sample();
        let back: VectorFst<TropicalWeight> = from_bytes(&to_bytes(&fst).unwrap()).unwrap();
        assert_eq!(back.start(), Some(0));
        assert_eq!(back.num_states(), 3);
        assert_eq!(back.arcs(0).unwrap(), fst.arcs(0).unwrap());
        assert_eq!(back.arcs(1).unwrap(), fst.arcs(1).unwrap());
        assert_eq!(back.final_weight(2).unwrap(), Some(TropicalWeight(2.0)));
        assert_eq!(back.final_weight(0).unwrap(), None);
    }

    #[test]
    fn round_trip_symbol_tables() {
        let mut fst = sample();
        let mut isyms = SymbolTable::with_epsilon("in");
        isyms.add_symbol("a").unwrap();
        isyms.add_symbol_with_key("c", 3).unwrap();
        let mut osyms = SymbolTable::with_epsilon("out");
        osyms.add_symbol_with_key("b", 2).unwrap();
        osyms.add_symbol_with_key("c", 3).unwrap();
        fst.set_input_symbols(Some(SharedSymbols::new(isyms.clone())));
        fst.set_output_symbols(Some(SharedSymbols::new(osyms.clone())));

        let back: VectorFst<TropicalWeight> = from_bytes(&to_bytes(&fst).unwrap()).unwrap();
        assert_eq!(**back.input_symbols().unwrap(), isyms);
        assert_eq!(**back.output_symbols().unwrap(), osyms);
        assert_eq!(back.input_symbols().unwrap().find_symbol(0).unwrap(), "<eps>");
    }

    #[test]
    fn empty_automaton_round_trips() {
        let fst = VectorFst::<LogWeight>::new();
        let back: VectorFst<LogWeight> = from_bytes(&to_bytes(&fst).unwrap()).unwrap();
        assert_eq!(back.num_states(), 0);
        assert_eq!(back.start(), None);
    }

    #[test]
    fn rejects_wrong_semiring() {
        let bytes = to_bytes(&sample()).unwrap();
        assert_eq!(peek_semiring(&bytes).unwrap(), SemiringKind::Tropical);
        let err = from_bytes::<LogWeight>(&bytes).unwrap_err();
        assert!(matches!(err, FstError::Format(msg) if msg.contains("tropical")));
    }

    #[test]
    fn rejects_truncation_at_every_length() {
        let bytes = to_bytes(&sample()).unwrap();
        for len in 0..bytes.len() {
            let err = from_bytes::<TropicalWeight>(&bytes[..len]).unwrap_err();
            assert!(matches!(err, FstError::Format(_)), "len {len}: {err}");
        }
    }

    #[test]
    fn rejects_corruption() {
        let mut bytes = to_bytes(&sample()).unwrap();
        bytes[0] ^= 0xFF;
        assert!(matches!(
            from_bytes::<TropicalWeight>(&bytes),
            Err(FstError::Format(msg)) if msg.contains("magic")
        ));

        let mut bytes = to_bytes(&sample()).unwrap();
        bytes.push(0);
        assert!(matches!(
            from_bytes::<TropicalWeight>(&bytes),
            Err(FstError::Format(msg)) if msg.contains("trailing")
        ));

        // point the first arc past the end of the state table
        let mut bytes = to_bytes(&sample()).unwrap();
        let first_arc = HEADER_SIZE + 3 * size_of::<StateRecord>();
        bytes[first_arc + 12..first_arc + 16].copy_from_slice(&99u32.to_le_bytes());
        assert!(matches!(
            from_bytes::<TropicalWeight>(&bytes),
            Err(FstError::Format(_))
        ));

        // weights outside the semiring
        for bad in [f32::NAN, f32::NEG_INFINITY] {
            let mut bytes = to_bytes(&sample()).unwrap();
            bytes[HEADER_SIZE..HEADER_SIZE + 4].copy_from_slice(&bad.to_le_bytes());
            assert!(matches!(
                from_bytes::<TropicalWeight>(&bytes),
                Err(FstError::Format(msg)) if msg.contains("final weight of state 0")
            ));
            let mut bytes = to_bytes(&sample()).unwrap();
            bytes[first_arc + 8..first_arc + 12].copy_from_slice(&bad.to_le_bytes());
            assert!(matches!(
                from_bytes::<TropicalWeight>(&bytes),
                Err(FstError::Format(msg)) if msg.contains("arc weight")
            ));
        }

        // start state out of range
        let mut bytes = to_bytes(&sample()).unwrap();
        bytes[16..20].copy_from_slice(&7u32.to_le_bytes());
        assert!(matches!(
            from_bytes::<TropicalWeight>(&bytes),
            Err(FstError::Format(msg)) if msg.contains("start")
        ));
    }
}
