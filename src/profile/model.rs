//! In-memory model and parser for a captured CPU profile
//!
//! The stream is five header slots, then records of
//! `(sample_count, num_pcs, pc[0], pc[1], ...)`, a `(0, 1, 0)` trailer, and
//! an optional ASCII maps block.

use std::collections::HashSet;
use std::fmt;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use log::debug;

use crate::codec::SlotReader;
use crate::domain::errors::ReadError;
use crate::domain::types::BinaryHeader;
use crate::symbolization::memory_maps::parse_maps_text;

/// One sampled call chain: the leaf pc first, return addresses walking
/// outward, plus how many samples hit it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallStack {
    pub sample_count: u64,
    pub pcs: Vec<u64>,
}

/// A fully parsed CPU profile.
#[derive(Debug)]
pub struct CpuProfile {
    header: BinaryHeader,
    stacks: Vec<CallStack>,
    total_sample_count: u64,
    record_count: u64,
    pc_count: u64,
    maps_lines: Vec<String>,
    maps_text: String,
}

impl CpuProfile {
    /// Parse a profile from any byte source.
    ///
    /// A profile whose maps block is missing or holds no mapping lines still
    /// parses; `has_maps` reports the difference. That case is routine for
    /// re-encoded profiles, which drop the maps block.
    pub fn parse<R: Read>(input: R) -> Result<Self, ReadError> {
        let mut reader = SlotReader::new(input)?;
        let header = BinaryHeader {
            hdr_count: reader.get_slot(0)?,
            hdr_words: reader.get_slot(1)?,
            version: reader.get_slot(2)?,
            sampling_period: reader.get_slot(3)?,
            padding: reader.get_slot(4)?,
        };

        let mut stacks = Vec::new();
        let mut total_sample_count = 0;
        let mut record_count = 0;
        let mut pc_count = 0;
        let mut index = 5;
        loop {
            let sample_count = reader.get_slot(index)?;
            let num_pcs = reader.get_slot(index + 1)?;
            let pc0 = reader.get_slot(index + 2)?;
            index += 3;
            if pc0 == 0 {
                // The trailer's first pc slot. The record path has consumed
                // all three trailer slots; a future trailer with a nonzero
                // first slot would be misread as a record, which matches the
                // writer and is kept for format compatibility.
                break;
            }
            let mut pcs = vec![pc0];
            for _ in 1..num_pcs {
                pcs.push(reader.get_slot(index)?);
                index += 1;
            }
            total_sample_count += sample_count;
            record_count += 1;
            pc_count += pcs.len() as u64;
            stacks.push(CallStack { sample_count, pcs });
        }

        let maps_text = reader.read_left_content()?;
        let maps = parse_maps_text(&maps_text);
        let (maps_lines, maps_text) = if maps.lines.is_empty() {
            (Vec::new(), String::new())
        } else {
            (maps.lines, maps_text)
        };

        debug!(
            "parsed profile: {record_count} records, {pc_count} pcs, {} maps lines",
            maps_lines.len()
        );
        Ok(CpuProfile {
            header,
            stacks,
            total_sample_count,
            record_count,
            pc_count,
            maps_lines,
            maps_text,
        })
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ReadError> {
        let file = File::open(path.as_ref()).map_err(ReadError::InvalidStream)?;
        Self::parse(BufReader::new(file))
    }

    pub fn header(&self) -> BinaryHeader {
        self.header
    }

    pub fn stacks(&self) -> &[CallStack] {
        &self.stacks
    }

    pub fn total_sample_count(&self) -> u64 {
        self.total_sample_count
    }

    pub fn record_count(&self) -> u64 {
        self.record_count
    }

    pub fn pc_count(&self) -> u64 {
        self.pc_count
    }

    /// Post-substitution mapping lines from the maps block.
    pub fn maps_lines(&self) -> &[String] {
        &self.maps_lines
    }

    /// The raw maps block, suitable for feeding a resolver.
    pub fn maps_text(&self) -> &str {
        &self.maps_text
    }

    pub fn has_maps(&self) -> bool {
        !self.maps_lines.is_empty()
    }
}

impl fmt::Display for CpuProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "---------------Header:")?;
        writeln!(f, "hdr_count: {}", self.header.hdr_count)?;
        writeln!(f, "hdr_words: {}", self.header.hdr_words)?;
        writeln!(f, "version: {}", self.header.version)?;
        writeln!(f, "sampling_period: {}", self.header.sampling_period)?;
        writeln!(f, "padding: {}", self.header.padding)?;
        writeln!(
            f,
            "profile num: {}, total sample num: {}, call stack num: {}, ptr num: {}",
            self.record_count,
            self.total_sample_count,
            self.stacks.len(),
            self.pc_count
        )?;
        writeln!(f, "---------------Stacks:")?;
        let mut distinct = HashSet::new();
        for stack in &self.stacks {
            for &pc in &stack.pcs {
                write!(f, "{pc:#018x} ")?;
                distinct.insert(pc);
            }
            writeln!(f)?;
        }
        writeln!(f, "distinct ptr num: {}", distinct.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::SlotWriter;
    use crate::domain::types::ProfileMeta;

    fn sample_profile_bytes(maps_text: &str) -> Vec<u8> {
        let header = BinaryHeader {
            sampling_period: 1000,
            ..BinaryHeader::default()
        };
        let mut writer = SlotWriter::new(Vec::new(), &header, ProfileMeta::default()).unwrap();
        for slot in [10, 4, 0x1, 0x20, 0x30, 0x40] {
            writer.append_slot(slot).unwrap();
        }
        for slot in [1, 1, 0] {
            writer.append_slot(slot).unwrap();
        }
        writer.append_maps_text(maps_text).unwrap();
        writer.into_inner()
    }

    #[test]
    fn parse_recovers_header_stacks_and_maps() {
        let maps = "build=/p/b\n40000000-40015000 r-xp 00000000 03:01 12845071   /lib/ld.so\n";
        let bytes = sample_profile_bytes(maps);
        let profile = CpuProfile::parse(bytes.as_slice()).unwrap();

        assert_eq!(profile.header().hdr_count, 0);
        assert_eq!(profile.header().hdr_words, 3);
        assert_eq!(profile.header().sampling_period, 1000);
        assert_eq!(
            profile.stacks(),
            &[CallStack {
                sample_count: 10,
                pcs: vec![0x1, 0x20, 0x30, 0x40],
            }]
        );
        assert_eq!(profile.record_count(), 1);
        assert_eq!(profile.total_sample_count(), 10);
        assert_eq!(profile.pc_count(), 4);
        assert!(profile.has_maps());
        assert_eq!(profile.maps_lines().len(), 1);
        assert!(profile.maps_lines()[0].contains("/lib/ld.so"));
    }

    #[test]
    fn profile_without_maps_block_still_parses() {
        let bytes = sample_profile_bytes("");
        let profile = CpuProfile::parse(bytes.as_slice()).unwrap();
        assert_eq!(profile.record_count(), 1);
        assert!(!profile.has_maps());
        assert!(profile.maps_text().is_empty());
    }

    #[test]
    fn maps_block_with_only_build_lines_counts_as_missing() {
        let bytes = sample_profile_bytes("build=/p/b\n");
        let profile = CpuProfile::parse(bytes.as_slice()).unwrap();
        assert!(!profile.has_maps());
        assert!(profile.maps_text().is_empty());
    }

    #[test]
    fn truncated_record_section_fails() {
        let bytes = sample_profile_bytes("");
        // Cut the stream inside the trailer.
        let profile = CpuProfile::parse(&bytes[..bytes.len() - 8]);
        assert!(matches!(profile, Err(ReadError::EndOfFile)));
    }

    #[test]
    fn display_reports_totals_and_distinct_pcs() {
        let bytes = sample_profile_bytes("");
        let profile = CpuProfile::parse(bytes.as_slice()).unwrap();
        let dump = profile.to_string();
        assert!(dump.contains("sampling_period: 1000"));
        assert!(dump.contains("profile num: 1, total sample num: 10, call stack num: 1, ptr num: 4"));
        assert!(dump.contains("0x0000000000000020"));
        assert!(dump.contains("distinct ptr num: 4"));
    }
}
