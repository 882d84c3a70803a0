//! Lazy slot reader with endianness and word-size autodetection.
//!
//! Detection relies on two format invariants: slot 0 (`hdr_count`) is zero,
//! and slot 1 (`hdr_words`) is a small integer, so the high half of its wire
//! representation is zero. An all-zero first 8 bytes therefore means 8-byte
//! slots; the position of the zero half of `hdr_words` gives the byte order.

use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::Path;

use crate::domain::errors::ReadError;
use crate::domain::types::{Endianness, WordSize};

/// Streaming reader that decodes profile slots on demand.
///
/// Consumed slots are buffered, so `get_slot` is O(1) for any index at or
/// below the high-water mark.
pub struct SlotReader<R> {
    input: R,
    endianness: Endianness,
    word_size: WordSize,
    slots: Vec<u64>,
}

impl SlotReader<BufReader<File>> {
    /// Open a profile file. An unopenable path is `InvalidStream`.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ReadError> {
        let file = File::open(path.as_ref()).map_err(ReadError::InvalidStream)?;
        Self::new(BufReader::new(file))
    }
}

impl<R: Read> SlotReader<R> {
    /// Construct a reader, consuming the first one or two slots to detect the
    /// stream's word size and byte order.
    pub fn new(mut input: R) -> Result<Self, ReadError> {
        let mut head = [0u8; 8];
        if read_full(&mut input, &mut head).map_err(ReadError::ReadFailed)? != head.len() {
            return Err(ReadError::ReadFailed(unexpected_eof()));
        }

        let word_size;
        let endianness;
        let hdr_words;
        if u64::from_le_bytes(head) == 0 {
            // hdr_count occupies all 8 bytes: a 64-bit profile. The next slot
            // is hdr_words; the zero half tells us the byte order.
            word_size = WordSize::Eight;
            let mut second = [0u8; 8];
            if read_full(&mut input, &mut second).map_err(ReadError::ReadFailed)? != second.len() {
                return Err(ReadError::ReadFailed(unexpected_eof()));
            }
            if second[..4] == [0; 4] {
                endianness = Endianness::Big;
                hdr_words = u64::from_be_bytes(second);
            } else if second[4..] == [0; 4] {
                endianness = Endianness::Little;
                hdr_words = u64::from_le_bytes(second);
            } else {
                return Err(ReadError::InvalidUnpackType);
            }
        } else {
            // 32-bit profile: the 8 bytes already read hold hdr_count and
            // hdr_words as two 4-byte slots.
            word_size = WordSize::Four;
            let mut second = [0u8; 4];
            second.copy_from_slice(&head[4..]);
            if second[..2] == [0; 2] {
                endianness = Endianness::Big;
                hdr_words = u64::from(u32::from_be_bytes(second));
            } else if second[2..] == [0; 2] {
                endianness = Endianness::Little;
                hdr_words = u64::from(u32::from_le_bytes(second));
            } else {
                return Err(ReadError::InvalidUnpackType);
            }
        }

        Ok(SlotReader {
            input,
            endianness,
            word_size,
            slots: vec![0, hdr_words],
        })
    }

    pub fn endianness(&self) -> Endianness {
        self.endianness
    }

    pub fn word_size(&self) -> WordSize {
        self.word_size
    }

    /// Return slot `index`, reading forward as far as necessary.
    pub fn get_slot(&mut self, index: usize) -> Result<u64, ReadError> {
        while self.slots.len() <= index {
            self.next_slot()?;
        }
        Ok(self.slots[index])
    }

    /// Drain everything after the last consumed slot as text.
    ///
    /// The trailing region of a profile is the ASCII maps block; an empty
    /// string means the stream ended exactly at the last slot.
    pub fn read_left_content(&mut self) -> Result<String, ReadError> {
        let mut rest = Vec::new();
        self.input
            .read_to_end(&mut rest)
            .map_err(ReadError::ReadFailed)?;
        Ok(String::from_utf8_lossy(&rest).into_owned())
    }

    fn next_slot(&mut self) -> Result<(), ReadError> {
        let val = match self.word_size {
            WordSize::Four => {
                let mut buf = [0u8; 4];
                self.fill_slot(&mut buf)?;
                u64::from(match self.endianness {
                    Endianness::Little => u32::from_le_bytes(buf),
                    Endianness::Big => u32::from_be_bytes(buf),
                })
            }
            WordSize::Eight => {
                let mut buf = [0u8; 8];
                self.fill_slot(&mut buf)?;
                match self.endianness {
                    Endianness::Little => u64::from_le_bytes(buf),
                    Endianness::Big => u64::from_be_bytes(buf),
                }
            }
        };
        self.slots.push(val);
        Ok(())
    }

    /// Read exactly one slot's worth of bytes. Zero bytes at the boundary is
    /// `EndOfFile`; a partial slot is `ReadFailed`.
    fn fill_slot(&mut self, buf: &mut [u8]) -> Result<(), ReadError> {
        match read_full(&mut self.input, buf) {
            Ok(0) => Err(ReadError::EndOfFile),
            Ok(n) if n == buf.len() => Ok(()),
            Ok(_) => Err(ReadError::ReadFailed(unexpected_eof())),
            Err(e) => Err(ReadError::ReadFailed(e)),
        }
    }
}

/// Read until `buf` is full or the stream ends; returns the bytes read.
fn read_full<R: Read>(input: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match input.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

fn unexpected_eof() -> io::Error {
    io::Error::from(io::ErrorKind::UnexpectedEof)
}
