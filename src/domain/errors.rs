//! Structured error types for profscope
//!
//! One enum per subsystem, using thiserror for Display and source chaining.
//! Errors bubble up to the nearest component boundary unchanged; the only
//! intentionally non-fatal condition (a profile without a usable maps block)
//! is modeled as state on `CpuProfile`, not as an error.

use thiserror::Error;

/// Failures of the binary profile reader.
#[derive(Error, Debug)]
pub enum ReadError {
    #[error("profile stream is not readable")]
    InvalidStream(#[source] std::io::Error),

    #[error("short read inside a profile slot")]
    ReadFailed(#[source] std::io::Error),

    #[error("profile stream exhausted at a slot boundary")]
    EndOfFile,

    #[error("cannot determine profile byte order from header")]
    InvalidUnpackType,
}

/// Failures of the binary profile writer.
#[derive(Error, Debug)]
pub enum WriteError {
    #[error("failed to write profile stream")]
    WriteFailed(#[from] std::io::Error),

    #[error("slot value {0:#x} does not fit a 32-bit profile word")]
    Convert(u64),
}

/// Failures of profile-level operations (parse and raw-profile generation).
#[derive(Error, Debug)]
pub enum ProfileError {
    #[error("profile contains no call stacks")]
    EmptyStack,

    #[error("symbol search failed")]
    SearchSymbolFailed(#[source] ResolveError),

    #[error("no program path provided for raw profile")]
    NoProgramPath,

    #[error("failed to re-encode binary profile")]
    GenProfileFailed(#[source] WriteError),

    #[error(transparent)]
    Read(#[from] ReadError),
}

/// Failures of the symbol resolver.
#[derive(Error, Debug)]
pub enum ResolveError {
    #[error("failed to open object file {path}")]
    OpenFileFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("unrecognized object format in {path}")]
    CheckFormat {
        path: String,
        #[source]
        source: object::Error,
    },

    #[error("no symbols in {path}")]
    NoSymbols { path: String },

    #[error("failed to read symbol table of {path}")]
    ReadSymbolsFailed {
        path: String,
        #[source]
        source: object::Error,
    },

    #[error("no symbol found for address {addr:#x}")]
    SymbolNotFound { addr: u64 },

    #[error("no addresses provided")]
    NoAddr,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn convert_error_display() {
        let err = WriteError::Convert(0x1_0000_0000);
        assert_eq!(
            err.to_string(),
            "slot value 0x100000000 does not fit a 32-bit profile word"
        );
    }

    #[test]
    fn symbol_not_found_display() {
        let err = ResolveError::SymbolNotFound { addr: 0x40_1000 };
        assert!(err.to_string().contains("0x401000"));
    }
}
