//! Slot writer: serializes a profile stream under fixed metadata.
//!
//! The five header slots go out at construction; the caller then appends the
//! stack records and trailer slot by slot, and optionally a trailing maps
//! text block.

use std::io::Write;

use crate::domain::errors::WriteError;
use crate::domain::types::{BinaryHeader, Endianness, ProfileMeta, WordSize};

pub struct SlotWriter<W> {
    out: W,
    meta: ProfileMeta,
}

impl<W: Write> SlotWriter<W> {
    /// Create a writer and emit the binary header.
    pub fn new(out: W, header: &BinaryHeader, meta: ProfileMeta) -> Result<Self, WriteError> {
        let mut writer = SlotWriter { out, meta };
        writer.append_slot(header.hdr_count)?;
        writer.append_slot(header.hdr_words)?;
        writer.append_slot(header.version)?;
        writer.append_slot(header.sampling_period)?;
        writer.append_slot(header.padding)?;
        Ok(writer)
    }

    /// Serialize one slot per the writer's metadata.
    ///
    /// On the 4-byte wire a value wider than `u32` cannot be represented and
    /// is rejected as `Convert`.
    pub fn append_slot(&mut self, val: u64) -> Result<(), WriteError> {
        match self.meta.word_size {
            WordSize::Four => {
                let v = u32::try_from(val).map_err(|_| WriteError::Convert(val))?;
                let buf = match self.meta.endianness {
                    Endianness::Little => v.to_le_bytes(),
                    Endianness::Big => v.to_be_bytes(),
                };
                self.out.write_all(&buf)?;
            }
            WordSize::Eight => {
                let buf = match self.meta.endianness {
                    Endianness::Little => val.to_le_bytes(),
                    Endianness::Big => val.to_be_bytes(),
                };
                self.out.write_all(&buf)?;
            }
        }
        Ok(())
    }

    /// Append the ASCII maps block after the trailer.
    pub fn append_maps_text(&mut self, text: &str) -> Result<(), WriteError> {
        self.out.write_all(text.as_bytes())?;
        Ok(())
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}
