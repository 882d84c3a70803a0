//! Per-object sorted symbol tables
//!
//! One `ObjectSymbols` owns the `(address, name)` table of a single object
//! file, sorted by effective address. Names are stored mangled; demangling
//! happens at lookup time in the resolver.

use std::fs;
use std::path::Path;

use log::debug;
use object::{Object, ObjectSymbol};

use crate::domain::errors::ResolveError;

pub struct ObjectSymbols {
    /// Sorted ascending by address.
    symbols: Vec<(u64, String)>,
}

impl ObjectSymbols {
    /// Load the symbol table of one object file.
    ///
    /// The static table is tried first; when it is empty (stripped binary)
    /// the dynamic table is used instead. An object with neither is
    /// `NoSymbols`.
    pub fn load(path: &Path) -> Result<Self, ResolveError> {
        let display = path.display().to_string();
        let data = fs::read(path).map_err(|source| ResolveError::OpenFileFailed {
            path: display.clone(),
            source,
        })?;
        let obj = object::File::parse(&*data).map_err(|source| ResolveError::CheckFormat {
            path: display.clone(),
            source,
        })?;

        let mut symbols = collect_symbols(obj.symbols(), &display)?;
        if symbols.is_empty() {
            symbols = collect_symbols(obj.dynamic_symbols(), &display)?;
        }
        if symbols.is_empty() {
            return Err(ResolveError::NoSymbols { path: display });
        }
        symbols.sort_by(|a, b| a.0.cmp(&b.0));
        debug!("loaded {} symbols from {display}", symbols.len());
        Ok(ObjectSymbols { symbols })
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    /// Nearest symbol at or below `pc`: the entry with the largest address
    /// not exceeding it. `None` when `pc` lies below the first entry.
    pub fn nearest(&self, pc: u64) -> Option<(u64, &str)> {
        let below = self.symbols.partition_point(|&(addr, _)| addr <= pc);
        below
            .checked_sub(1)
            .map(|i| (self.symbols[i].0, self.symbols[i].1.as_str()))
    }
}

fn collect_symbols(
    iter: object::SymbolIterator<'_, '_>,
    path: &str,
) -> Result<Vec<(u64, String)>, ResolveError> {
    let mut out = Vec::new();
    for sym in iter {
        if !sym.is_definition() {
            continue;
        }
        let name = sym
            .name()
            .map_err(|source| ResolveError::ReadSymbolsFailed {
                path: path.to_string(),
                source,
            })?;
        if name.is_empty() {
            continue;
        }
        out.push((sym.address(), name.to_string()));
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> ObjectSymbols {
        ObjectSymbols {
            symbols: vec![
                (0x10, "alpha".to_string()),
                (0x20, "beta".to_string()),
                (0x30, "gamma".to_string()),
            ],
        }
    }

    #[test]
    fn nearest_picks_the_enclosing_symbol() {
        let table = table();
        assert_eq!(table.nearest(0x25), Some((0x20, "beta")));
        assert_eq!(table.nearest(0x1F), Some((0x10, "alpha")));
    }

    #[test]
    fn nearest_on_exact_address_is_that_symbol() {
        assert_eq!(table().nearest(0x20), Some((0x20, "beta")));
    }

    #[test]
    fn nearest_past_the_last_symbol_is_the_last() {
        assert_eq!(table().nearest(0x1000), Some((0x30, "gamma")));
    }

    #[test]
    fn nearest_below_the_first_symbol_is_none() {
        assert_eq!(table().nearest(0xF), None);
    }

    #[test]
    fn missing_object_file_is_open_failed() {
        assert!(matches!(
            ObjectSymbols::load(Path::new("no/such/object")),
            Err(ResolveError::OpenFileFailed { .. })
        ));
    }
}
