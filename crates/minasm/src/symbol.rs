//! Manages symbols (labels) and their corresponding addresses.
//!
//! The `SymbolTable` is filled by the layout pass of the assembler and is only
//! read afterwards, when label references are resolved.
use std::collections::HashMap;

use crate::error::{AssemblerError, SourceLocation};

/// Represents a symbol defined in the assembly code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Symbol {
    /// The name of the symbol (label).
    name: String,
    /// The address associated with the symbol.
    address: u32,
    /// Where the symbol was defined.
    defined_at: SourceLocation,
}

impl Symbol {
    /// Creates a new symbol entry.
    pub fn new(name: String, address: u32, defined_at: SourceLocation) -> Self {
        Symbol {
            name,
            address,
            defined_at,
        }
    }

    /// Returns the name of the symbol.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the address of the symbol.
    pub fn address(&self) -> u32 {
        self.address
    }

    /// Returns the location of the definition.
    pub fn defined_at(&self) -> SourceLocation {
        self.defined_at
    }
}

/// Stores and manages symbols defined in the assembly source.
///
/// Names are case-sensitive and unique.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SymbolTable {
    table: HashMap<String, Symbol>,
}

impl SymbolTable {
    /// Creates a new, empty symbol table.
    pub fn new() -> Self {
        SymbolTable::default()
    }

    /// Defines a new symbol.
    ///
    /// # Returns
    /// * `Ok(())` - If the symbol was successfully defined.
    /// * `Err(AssemblerError::SymbolError)` - If a symbol with the same name already exists.
    pub fn define(
        &mut self,
        name: String,
        address: u32,
        loc: SourceLocation,
    ) -> Result<(), AssemblerError> {
        if self.table.contains_key(&name) {
            return Err(AssemblerError::SymbolError {
                message: format!("Label '{}' already defined", name),
                loc,
            });
        }

        let symbol = Symbol::new(name.clone(), address, loc);
        self.table.insert(name, symbol);
        Ok(())
    }

    /// Looks up a symbol by its name.
    pub fn lookup(&self, name: &str) -> Option<&Symbol> {
        self.table.get(name)
    }

    /// Address of `name`, if defined.
    pub fn address_of(&self, name: &str) -> Option<u32> {
        self.table.get(name).map(Symbol::address)
    }

    /// Checks if a symbol with the given name is defined.
    pub fn is_defined(&self, name: &str) -> bool {
        self.table.contains_key(name)
    }

    /// Returns an iterator over the symbols in the table.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Symbol)> {
        self.table.iter()
    }

    /// Symbols ordered by address, then name.
    pub fn sorted(&self) -> Vec<&Symbol> {
        let mut symbols: Vec<&Symbol> = self.table.values().collect();
        symbols.sort_by(|a, b| a.address.cmp(&b.address).then_with(|| a.name.cmp(&b.name)));
        symbols
    }

    /// Returns the total number of defined symbols.
    pub fn len(&self) -> usize {
        self.table.len()
    }

    /// Checks if the symbol table is empty.
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}
