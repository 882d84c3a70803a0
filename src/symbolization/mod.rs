//! # Symbol Resolution and Address Translation
//!
//! Converts raw program-counter addresses from a captured profile into
//! demangled symbol names using on-disk object files plus the process memory
//! map recorded with the profile.
//!
//! ## Address translation
//!
//! 1. Parse the maps block into per-library address ranges (`memory_maps`)
//! 2. Classify each address: inside a library range it is relocated by the
//!    library's load base, otherwise it belongs to the main program
//! 3. Look the (possibly relocated) address up in the right object file's
//!    sorted symbol table (`object_symbols`)
//! 4. Demangle the hit, falling back to the raw name

pub mod memory_maps;
pub mod object_symbols;
pub mod resolver;

pub use memory_maps::{parse_maps_text, DynamicLibMappings, MapsText, ProcLibMapping, ProcMapItem};
pub use object_symbols::ObjectSymbols;
pub use resolver::{demangle_name, ObjectSymbolLocator, SymbolInfo, SymbolLocator};
