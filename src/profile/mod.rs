//! Profile model, parser, and raw-profile transform
//!
//! [`model`] owns the parsed representation; [`raw`] turns it back into the
//! symbol-annotated raw form downstream tools read.

pub mod model;
pub mod raw;

pub use model::{CallStack, CpuProfile};
pub use raw::{RawProfileKind, RawProfileMeta};
