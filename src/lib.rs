//! # profscope - gperftools CPU-profile reader and symbolizer
//!
//! profscope parses the binary CPU profiles gperftools writes, resolves their
//! raw instruction-pointer stacks to demangled symbol names using on-disk
//! object files plus the process memory map captured with the profile, and
//! re-emits the symbol-annotated "raw" profile downstream pprof tooling
//! consumes. It is strictly an offline post-processor: profiles are captured
//! elsewhere and read here.
//!
//! ## Pipeline
//!
//! ```text
//! profile bytes ──▶ codec::SlotReader ──▶ profile::CpuProfile
//!                        (autodetects         │
//!                     endianness + word       │ maps block
//!                          size)              ▼
//!                                     symbolization::memory_maps
//!                                             │ address ranges
//!                                             ▼
//!   stack addresses ─────────────▶ symbolization::ObjectSymbolLocator
//!                                             │ nearest symbols
//!                                             ▼
//!   CpuProfile::generate_raw_profile ──▶ symbol section + re-encoded
//!        (via codec::SlotWriter)         binary stacks ("--- profile")
//! ```
//!
//! ## Modules
//!
//! - [`codec`]: the slot-stream reader and writer. The reader detects the
//!   profile's word size and byte order from the header invariants; the
//!   writer re-emits a bit-faithful stream under chosen metadata.
//! - [`profile`]: the parsed model (header, call stacks, totals, maps lines)
//!   and the raw-profile transform with its two dialects.
//! - [`symbolization`]: maps-block parsing with `$build` expansion, the
//!   per-object sorted symbol tables, and the thread-safe resolver that
//!   classifies addresses as program- or library-relative.
//! - [`domain`]: wire metadata shared across components and the structured
//!   error types.
//!
//! ## Binaries
//!
//! - `profile_printer <PROFILE>`: human-readable dump of a parsed profile.
//! - `addr2symbol --exe <PATH> [--proc-mapping <PATH>] --addr <HEX>`:
//!   one-shot address lookup against an executable and optional maps file.

pub mod codec;
pub mod domain;
pub mod profile;
pub mod symbolization;

pub use domain::errors::{ProfileError, ReadError, ResolveError, WriteError};
pub use domain::types::{BinaryHeader, Endianness, ProfileMeta, WordSize};
pub use profile::model::{CallStack, CpuProfile};
pub use profile::raw::{RawProfileKind, RawProfileMeta};
pub use symbolization::resolver::{ObjectSymbolLocator, SymbolInfo, SymbolLocator};
