//! Address-to-symbol resolution
//!
//! `ObjectSymbolLocator` loads the program's symbol table eagerly and the
//! table of each referenced shared library lazily, on first lookup. A batch
//! rebuilds the maps index up front (re-reading `/proc/self/maps` in
//! self-analysis mode so long-lived resolvers see libraries loaded after
//! construction), then classifies each address: inside a known library range
//! it is relocated by the library's load base and resolved against that
//! library's table, otherwise against the program's table.

use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::{Arc, RwLock};

use log::warn;

use crate::domain::errors::ResolveError;
use crate::symbolization::memory_maps::{parse_maps_text, DynamicLibMappings};
use crate::symbolization::object_symbols::ObjectSymbols;

const SELF_EXE_PATH: &str = "/proc/self/exe";
const SELF_MAPS_PATH: &str = "/proc/self/maps";

/// A resolved address. An empty `symbol_name` means unresolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolInfo {
    pub address: u64,
    pub symbol_name: String,
}

/// The seam between profile transformation and symbol lookup.
pub trait SymbolLocator: Send + Sync {
    /// Resolve a batch of (deduplicated) addresses.
    ///
    /// Per-address failures are absorbed into the result as entries with an
    /// empty symbol name; the batch itself fails only on empty input or an
    /// unreadable live maps file.
    fn search_symbols(&self, addrs: &[u64]) -> Result<HashMap<u64, SymbolInfo>, ResolveError>;
}

/// State the lock protects: the maps content, the index rebuilt from it per
/// batch, and the per-library table cache. Tables are handed out as `Arc`
/// clones so lookups never hold the lock while searching.
struct ResolverShared {
    maps_content: String,
    mappings: DynamicLibMappings,
    lib_tables: HashMap<String, Arc<ObjectSymbols>>,
}

/// Object-file backed implementation of [`SymbolLocator`].
pub struct ObjectSymbolLocator {
    program_symbols: ObjectSymbols,
    self_analysis: bool,
    shared: RwLock<ResolverShared>,
}

impl ObjectSymbolLocator {
    /// Offline analysis: a program path plus the maps content captured with
    /// the profile (may be empty when the profile carried no maps block).
    pub fn with_maps(
        program_path: impl AsRef<Path>,
        maps_content: impl Into<String>,
    ) -> Result<Self, ResolveError> {
        let program_symbols = ObjectSymbols::load(program_path.as_ref())?;
        Ok(ObjectSymbolLocator {
            program_symbols,
            self_analysis: false,
            shared: RwLock::new(ResolverShared {
                maps_content: maps_content.into(),
                mappings: DynamicLibMappings::default(),
                lib_tables: HashMap::new(),
            }),
        })
    }

    /// Analyze the running process: symbols from `/proc/self/exe`, maps from
    /// `/proc/self/maps`, re-read on every batch.
    pub fn for_current_process() -> Result<Self, ResolveError> {
        let maps_content = read_maps_file(SELF_MAPS_PATH)?;
        let mut locator = Self::with_maps(SELF_EXE_PATH, maps_content)?;
        locator.self_analysis = true;
        Ok(locator)
    }

    /// Resolve one address against the current maps index.
    pub fn search_symbol(&self, addr: u64) -> Result<SymbolInfo, ResolveError> {
        let matched = {
            let shared = self.shared.read().expect("resolver lock poisoned");
            shared
                .mappings
                .find_matched_lib(addr)
                .map(|lib| (lib.path.clone(), lib.base))
        };
        if let Some((path, base)) = matched.filter(|(path, _)| !path.is_empty()) {
            // Dynamic address: index the library's table with the address
            // relative to its load base.
            let table = self.lib_table(&path)?;
            let relocated = addr - base;
            let (_, name) = table
                .nearest(relocated)
                .ok_or(ResolveError::SymbolNotFound { addr: relocated })?;
            return Ok(SymbolInfo {
                address: relocated,
                symbol_name: demangle_name(name),
            });
        }
        let (_, name) = self
            .program_symbols
            .nearest(addr)
            .ok_or(ResolveError::SymbolNotFound { addr })?;
        Ok(SymbolInfo {
            address: addr,
            symbol_name: demangle_name(name),
        })
    }

    /// Fetch or load the symbol table of one shared library.
    ///
    /// Double-checked: shared-lock probe, then exclusive re-check before the
    /// load so two racing threads cannot both read the object file.
    fn lib_table(&self, path: &str) -> Result<Arc<ObjectSymbols>, ResolveError> {
        {
            let shared = self.shared.read().expect("resolver lock poisoned");
            if let Some(table) = shared.lib_tables.get(path) {
                return Ok(Arc::clone(table));
            }
        }
        let mut shared = self.shared.write().expect("resolver lock poisoned");
        if let Some(table) = shared.lib_tables.get(path) {
            return Ok(Arc::clone(table));
        }
        let table = Arc::new(ObjectSymbols::load(Path::new(path))?);
        shared.lib_tables.insert(path.to_string(), Arc::clone(&table));
        Ok(table)
    }
}

impl SymbolLocator for ObjectSymbolLocator {
    fn search_symbols(&self, addrs: &[u64]) -> Result<HashMap<u64, SymbolInfo>, ResolveError> {
        if addrs.is_empty() {
            return Err(ResolveError::NoAddr);
        }
        {
            let mut shared = self.shared.write().expect("resolver lock poisoned");
            if self.self_analysis {
                shared.maps_content = read_maps_file(SELF_MAPS_PATH)?;
            }
            let rebuilt = parse_maps_text(&shared.maps_content).mappings;
            shared.mappings = rebuilt;
        }
        let mut mapping = HashMap::with_capacity(addrs.len());
        for &addr in addrs {
            let info = self.search_symbol(addr).unwrap_or_else(|err| {
                warn!("symbol lookup failed for {addr:#x}: {err}");
                SymbolInfo {
                    address: addr,
                    symbol_name: String::new(),
                }
            });
            mapping.insert(addr, info);
        }
        Ok(mapping)
    }
}

/// Demangle a symbol name; a name that does not demangle passes through.
pub fn demangle_name(name: &str) -> String {
    format!("{:#}", rustc_demangle::demangle(name))
}

fn read_maps_file(path: &str) -> Result<String, ResolveError> {
    fs::read_to_string(path).map_err(|source| ResolveError::OpenFileFailed {
        path: path.to_string(),
        source,
    })
}
