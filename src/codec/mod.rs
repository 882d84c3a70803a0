//! Binary slot codec for gperftools CPU profiles
//!
//! The wire format is a flat sequence of fixed-width unsigned integers
//! ("slots"), 4 or 8 bytes each, in either byte order. [`reader`] autodetects
//! both parameters from the header and hands out slots lazily; [`writer`]
//! re-emits a bit-faithful stream under caller-chosen metadata.

pub mod reader;
pub mod writer;

pub use reader::SlotReader;
pub use writer::SlotWriter;
