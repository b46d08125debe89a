// Symbol table: bidirectional text <-> label mapping.
//
// Tables are independent id spaces. Two tables may give the same text
// different keys; `algorithms::relabel::convert_symbols` moves an automaton
// from one space to another.

use std::collections::BTreeMap;
use std::io::{BufRead, Write};

use hashbrown::HashMap;

use crate::{FstError, Label, Result};

/// Conventional text bound to the epsilon label.
pub const EPSILON_SYMBOL: &str = "<eps>";

/// A symbol table shared between automata. Attaching a table to an automaton
/// clones the pointer, never the table.
pub type SharedSymbols = std::sync::Arc<SymbolTable>;

/// Bijective mapping between symbol texts and integer keys.
///
/// `available_key` is the key the next [`add_symbol`](Self::add_symbol) will
/// hand out; it only grows. `version` counts successful mutations, so two
/// revisions of a table forked with `Arc::make_mut` can be told apart;
/// [`convert_symbols`](crate::algorithms::convert_symbols) logs it for every
/// table it reads or attaches.
#[derive(Debug, Clone, Default)]
pub struct SymbolTable {
    name: String,
    by_key: BTreeMap<Label, String>,
    by_symbol: HashMap<String, Label>,
    available_key: Label,
    version: u64,
}

impl SymbolTable {
    /// An empty table.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// A table with [`EPSILON_SYMBOL`] bound to 0.
    pub fn with_epsilon(name: impl Into<String>) -> Self {
        let mut table = Self::new(name);
        table.bind(EPSILON_SYMBOL.to_string(), 0);
        table
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
        self.version += 1;
    }

    pub fn num_symbols(&self) -> usize {
        self.by_key.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_key.is_empty()
    }

    /// The key the next `add_symbol` call will assign.
    pub fn available_key(&self) -> Label {
        self.available_key
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    /// Bind `symbol` to the next unused key.
    ///
    /// Fails with [`FstError::DuplicateSymbol`] if `symbol` is already bound.
    pub fn add_symbol(&mut self, symbol: impl Into<String>) -> Result<Label> {
        let symbol = symbol.into();
        if let Some(&key) = self.by_symbol.get(&symbol) {
            return Err(FstError::DuplicateSymbol { symbol, key });
        }
        let mut key = self.available_key;
        while self.by_key.contains_key(&key) {
            let Some(next) = key.checked_add(1) else {
                return Err(FstError::SymbolConflict {
                    symbol,
                    key,
                    reason: "key space exhausted".to_string(),
                });
            };
            key = next;
        }
        self.bind(symbol, key);
        Ok(key)
    }

    /// Bind `symbol` to a caller-chosen `key`.
    ///
    /// Re-adding an existing identical binding is a no-op. Fails with
    /// [`FstError::SymbolConflict`] when either side is already bound to
    /// something else.
    pub fn add_symbol_with_key(&mut self, symbol: impl Into<String>, key: Label) -> Result<Label> {
        let symbol = symbol.into();
        match (self.by_symbol.get(&symbol), self.by_key.get(&key)) {
            (Some(&existing), _) if existing == key => Ok(key),
            (Some(&existing), _) => Err(FstError::SymbolConflict {
                reason: format!("symbol is already bound to key {existing}"),
                symbol,
                key,
            }),
            (None, Some(other)) => Err(FstError::SymbolConflict {
                reason: format!("key is already bound to {other:?}"),
                symbol,
                key,
            }),
            (None, None) => {
                self.bind(symbol, key);
                Ok(key)
            }
        }
    }

    fn bind(&mut self, symbol: String, key: Label) {
        self.by_symbol.insert(symbol.clone(), key);
        self.by_key.insert(key, symbol);
        if key >= self.available_key {
            self.available_key = key.saturating_add(1);
        }
        self.version += 1;
    }

    /// Raise `available_key` to at least `key`.
    pub(crate) fn raise_available_key(&mut self, key: Label) {
        if key > self.available_key {
            self.available_key = key;
            self.version += 1;
        }
    }

    /// Key bound to `symbol`.
    pub fn find_key(&self, symbol: &str) -> Result<Label> {
        self.by_symbol
            .get(symbol)
            .copied()
            .ok_or_else(|| FstError::SymbolNotFound(symbol.to_string()))
    }

    /// Text bound to `key`.
    pub fn find_symbol(&self, key: Label) -> Result<&str> {
        self.by_key
            .get(&key)
            .map(String::as_str)
            .ok_or(FstError::KeyNotFound(key))
    }

    pub fn contains_symbol(&self, symbol: &str) -> bool {
        self.by_symbol.contains_key(symbol)
    }

    pub fn contains_key(&self, key: Label) -> bool {
        self.by_key.contains_key(&key)
    }

    /// Bindings in ascending key order.
    pub fn iter(&self) -> impl Iterator<Item = (Label, &str)> + '_ {
        self.by_key.iter().map(|(&k, s)| (k, s.as_str()))
    }

    /// Whether both tables hold exactly the same bindings (names may differ).
    pub fn is_compatible(&self, other: &SymbolTable) -> bool {
        self.by_key == other.by_key
    }

    /// Read the text form: one `symbol<whitespace>key` pair per line.
    pub fn read_text<R: BufRead>(reader: R, name: impl Into<String>) -> Result<Self> {
        let mut table = Self::new(name);
        for (lineno, line) in reader.lines().enumerate() {
            let line = line?;
            let line = line.trim_end_matches(['\r', '\n']);
            if line.trim().is_empty() {
                continue;
            }
            let mut fields = line.split_whitespace();
            let (Some(symbol), Some(key), None) = (fields.next(), fields.next(), fields.next())
            else {
                return Err(FstError::Format(format!(
                    "symbol table line {}: expected `symbol key`, got {line:?}",
                    lineno + 1
                )));
            };
            let key: Label = key.parse().map_err(|_| {
                FstError::Format(format!(
                    "symbol table line {}: bad key {key:?}",
                    lineno + 1
                ))
            })?;
            table.add_symbol_with_key(symbol, key)?;
        }
        Ok(table)
    }

    /// Write the text form read by [`read_text`](Self::read_text).
    pub fn write_text<Wr: Write>(&self, mut writer: Wr) -> Result<()> {
        for (key, symbol) in self.iter() {
            writeln!(writer, "{symbol}\t{key}")?;
        }
        Ok(())
    }
}

impl PartialEq for SymbolTable {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.available_key == other.available_key
            && self.by_key == other.by_key
    }
}

impl Eq for SymbolTable {}
