// Symbol table: bidirectional label-to-name mapping with binary I/O.

use std::io::{Read, Write};

use hashbrown::HashMap;
use weft_core::Label;

use crate::format::{
    read_i32, read_i64, read_string, write_i32, write_i64, write_string, SYMBOL_TABLE_MAGIC,
};
use crate::FstError;

/// Maps labels to symbol names and back.
///
/// Entries keep their insertion order, which is also the serialization
/// order. Keys need not be dense; `add_symbol` without an explicit key
/// assigns the next available one.
#[derive(Debug, Clone, PartialEq)]
pub struct SymbolTable {
    name: String,
    available_key: Label,
    by_key: HashMap<Label, String>,
    by_name: HashMap<String, Label>,
    order: Vec<Label>,
}

impl SymbolTable {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            available_key: 0,
            by_key: HashMap::new(),
            by_name: HashMap::new(),
            order: Vec::new(),
        }
    }

    /// Table name (usually the source file or a description).
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Insert a symbol under an explicit key. Re-adding an existing pair is
    /// a no-op; an existing name keeps its first key.
    pub fn add_symbol_key(&mut self, symbol: &str, key: Label) -> Label {
        if let Some(&existing) = self.by_name.get(symbol) {
            return existing;
        }
        self.by_key.insert(key, symbol.to_string());
        self.by_name.insert(symbol.to_string(), key);
        self.order.push(key);
        if key >= self.available_key {
            self.available_key = key + 1;
        }
        key
    }

    /// Insert a symbol under the next available key.
    pub fn add_symbol(&mut self, symbol: &str) -> Label {
        if let Some(&existing) = self.by_name.get(symbol) {
            return existing;
        }
        let key = self.available_key;
        self.add_symbol_key(symbol, key)
    }

    /// Name of a label, if present.
    pub fn find(&self, key: Label) -> Option<&str> {
        self.by_key.get(&key).map(String::as_str)
    }

    /// Label of a name, if present.
    pub fn find_key(&self, symbol: &str) -> Option<Label> {
        self.by_name.get(symbol).copied()
    }

    /// Keys in insertion order.
    pub fn keys(&self) -> impl Iterator<Item = Label> + '_ {
        self.order.iter().copied()
    }

    pub fn write<W: Write>(&self, writer: &mut W) -> Result<(), FstError> {
        write_i32(writer, SYMBOL_TABLE_MAGIC)?;
        write_string(writer, &self.name)?;
        write_i64(writer, self.available_key as i64)?;
        write_i64(writer, self.order.len() as i64)?;
        for &key in &self.order {
            write_string(writer, &self.by_key[&key])?;
            write_i64(writer, key as i64)?;
        }
        Ok(())
    }

    pub fn read<R: Read>(reader: &mut R) -> Result<Self, FstError> {
        if read_i32(reader)? != SYMBOL_TABLE_MAGIC {
            return Err(FstError::BadMagic("symbol table"));
        }
        let name = read_string(reader)?;
        let available_key = read_i64(reader)? as Label;
        let count = read_i64(reader)?;
        if count < 0 {
            return Err(FstError::Invalid {
                kind: "symbol table",
                reason: format!("negative symbol count {count}"),
            });
        }
        let mut table = SymbolTable::new(name);
        for _ in 0..count {
            let symbol = read_string(reader)?;
            let key = read_i64(reader)? as Label;
            table.add_symbol_key(&symbol, key);
        }
        table.available_key = available_key;
        Ok(table)
    }
}
