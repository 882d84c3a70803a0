//! Raw textual profile generation
//!
//! Re-emits a parsed profile in the layout downstream pprof tooling consumes:
//! a symbol section listing each resolved address, then the re-encoded binary
//! stack section (64-bit little-endian, no maps block) behind a
//! `--- profile` marker.

use std::collections::{BTreeMap, HashSet};

use crate::codec::SlotWriter;
use crate::domain::errors::ProfileError;
use crate::domain::types::ProfileMeta;
use crate::profile::model::CpuProfile;
use crate::symbolization::resolver::SymbolLocator;

/// Output dialect of the raw profile.
///
/// Return addresses point one past their call instruction; pprof expects them
/// pre-decremented, while the fixed dialect keeps them as captured.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RawProfileKind {
    /// Stacks re-encoded exactly as captured; marker `--- symbol_fixed`.
    FixedRaw,
    /// Caller pcs decremented onto the call instruction; marker `--- symbol`.
    PProfCompatible,
}

/// Parameters for [`CpuProfile::generate_raw_profile`].
#[derive(Debug, Clone)]
pub struct RawProfileMeta {
    pub profile_type: RawProfileKind,
    pub program_path: String,
}

impl CpuProfile {
    /// Produce the raw profile: symbol section, separator, and re-encoded
    /// binary stacks. Bytes, because the binary section is not UTF-8.
    pub fn generate_raw_profile(
        &self,
        meta: &RawProfileMeta,
        locator: &dyn SymbolLocator,
    ) -> Result<Vec<u8>, ProfileError> {
        if meta.program_path.is_empty() {
            return Err(ProfileError::NoProgramPath);
        }
        let mut out = Vec::with_capacity(4096);
        out.extend_from_slice(match meta.profile_type {
            RawProfileKind::FixedRaw => b"--- symbol_fixed\n".as_slice(),
            RawProfileKind::PProfCompatible => b"--- symbol\n".as_slice(),
        });
        out.extend_from_slice(format!("binary={}\n", meta.program_path).as_bytes());
        if !self.stacks().is_empty() {
            for (addr, name) in self.generate_symbol_mapping(locator)? {
                let line = if name.is_empty() {
                    format!("{addr:#018x} {addr:#018x}\n")
                } else {
                    format!("{addr:#018x} {name}\n")
                };
                out.extend_from_slice(line.as_bytes());
            }
        }
        out.extend_from_slice(b"---\n");
        out.extend_from_slice(b"--- profile\n");
        let binary = self.generate_binary_profile(meta.profile_type)?;
        out.extend_from_slice(&binary);
        Ok(out)
    }

    /// Resolve every distinct address the stacks reference, in one batch.
    ///
    /// Leaf pcs are submitted as captured; caller pcs are return addresses
    /// and are decremented onto the call instruction first. Results are keyed
    /// by the submitted address.
    fn generate_symbol_mapping(
        &self,
        locator: &dyn SymbolLocator,
    ) -> Result<BTreeMap<u64, String>, ProfileError> {
        if self.stacks().is_empty() {
            return Err(ProfileError::EmptyStack);
        }
        let mut addrs = HashSet::new();
        for stack in self.stacks() {
            let Some((&leaf, callers)) = stack.pcs.split_first() else {
                continue;
            };
            addrs.insert(leaf);
            for &pc in callers {
                addrs.insert(pc.wrapping_sub(1));
            }
        }
        let addrs: Vec<u64> = addrs.into_iter().collect();
        let mapping = locator
            .search_symbols(&addrs)
            .map_err(ProfileError::SearchSymbolFailed)?;
        Ok(mapping
            .into_iter()
            .map(|(addr, info)| (addr, info.symbol_name))
            .collect())
    }

    /// Re-encode the stack section with the original header, default
    /// metadata, and no maps block.
    fn generate_binary_profile(&self, kind: RawProfileKind) -> Result<Vec<u8>, ProfileError> {
        let mut buf = Vec::new();
        let mut writer = SlotWriter::new(&mut buf, &self.header(), ProfileMeta::default())
            .map_err(ProfileError::GenProfileFailed)?;
        for stack in self.stacks() {
            writer
                .append_slot(stack.sample_count)
                .map_err(ProfileError::GenProfileFailed)?;
            writer
                .append_slot(stack.pcs.len() as u64)
                .map_err(ProfileError::GenProfileFailed)?;
            writer
                .append_slot(stack.pcs[0])
                .map_err(ProfileError::GenProfileFailed)?;
            for &pc in &stack.pcs[1..] {
                let val = match kind {
                    RawProfileKind::PProfCompatible => pc.wrapping_sub(1),
                    RawProfileKind::FixedRaw => pc,
                };
                writer.append_slot(val).map_err(ProfileError::GenProfileFailed)?;
            }
        }
        for slot in [0, 1, 0] {
            writer.append_slot(slot).map_err(ProfileError::GenProfileFailed)?;
        }
        drop(writer);
        Ok(buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::SlotWriter;
    use crate::domain::errors::ResolveError;
    use crate::domain::types::BinaryHeader;
    use crate::symbolization::resolver::SymbolInfo;
    use std::collections::HashMap;

    /// Locator stub mapping fixed addresses to fixed names.
    struct StubLocator {
        names: HashMap<u64, &'static str>,
    }

    impl SymbolLocator for StubLocator {
        fn search_symbols(
            &self,
            addrs: &[u64],
        ) -> Result<HashMap<u64, SymbolInfo>, ResolveError> {
            if addrs.is_empty() {
                return Err(ResolveError::NoAddr);
            }
            Ok(addrs
                .iter()
                .map(|&addr| {
                    let name = self.names.get(&addr).copied().unwrap_or("");
                    (
                        addr,
                        SymbolInfo {
                            address: addr,
                            symbol_name: name.to_string(),
                        },
                    )
                })
                .collect())
        }
    }

    fn sample_profile() -> CpuProfile {
        let mut writer =
            SlotWriter::new(Vec::new(), &BinaryHeader::default(), ProfileMeta::default()).unwrap();
        for slot in [5, 3, 0xA, 0xB, 0xC, 0, 1, 0] {
            writer.append_slot(slot).unwrap();
        }
        CpuProfile::parse(writer.into_inner().as_slice()).unwrap()
    }

    // The batch resolves {0xA, 0xB-1, 0xC-1} = {0xA, 0xB}: the leaf shares
    // its address with the first call site.
    fn stub() -> StubLocator {
        StubLocator {
            names: [(0xA, "leaf_fn"), (0xB, "caller_fn")].into_iter().collect(),
        }
    }

    fn section_after_profile_marker(raw: &[u8]) -> &[u8] {
        let marker = b"--- profile\n";
        let pos = raw
            .windows(marker.len())
            .position(|w| w == marker)
            .expect("profile marker present");
        &raw[pos + marker.len()..]
    }

    #[test]
    fn pprof_dialect_decrements_caller_pcs() {
        let profile = sample_profile();
        let meta = RawProfileMeta {
            profile_type: RawProfileKind::PProfCompatible,
            program_path: "./prog".to_string(),
        };
        let raw = profile.generate_raw_profile(&meta, &stub()).unwrap();

        let text = String::from_utf8_lossy(&raw);
        assert!(text.starts_with("--- symbol\nbinary=./prog\n"));
        assert!(text.contains("0x000000000000000a leaf_fn\n"));
        assert!(text.contains("0x000000000000000b caller_fn\n"));

        let reparsed = CpuProfile::parse(section_after_profile_marker(&raw)).unwrap();
        assert_eq!(reparsed.stacks()[0].pcs, vec![0xA, 0xA, 0xB]);
        assert_eq!(reparsed.stacks()[0].sample_count, 5);
    }

    #[test]
    fn fixed_dialect_keeps_caller_pcs() {
        let profile = sample_profile();
        let meta = RawProfileMeta {
            profile_type: RawProfileKind::FixedRaw,
            program_path: "./prog".to_string(),
        };
        let raw = profile.generate_raw_profile(&meta, &stub()).unwrap();

        let text = String::from_utf8_lossy(&raw);
        assert!(text.starts_with("--- symbol_fixed\nbinary=./prog\n"));
        // Symbolization still resolves call-site addresses.
        assert!(text.contains("0x000000000000000b caller_fn\n"));

        let reparsed = CpuProfile::parse(section_after_profile_marker(&raw)).unwrap();
        assert_eq!(reparsed.stacks()[0].pcs, vec![0xA, 0xB, 0xC]);
    }

    #[test]
    fn unresolved_addresses_repeat_the_address_column() {
        let profile = sample_profile();
        let meta = RawProfileMeta {
            profile_type: RawProfileKind::FixedRaw,
            program_path: "./prog".to_string(),
        };
        let empty = StubLocator { names: HashMap::new() };
        let raw = profile.generate_raw_profile(&meta, &empty).unwrap();
        let text = String::from_utf8_lossy(&raw);
        assert!(text.contains("0x000000000000000a 0x000000000000000a\n"));
    }

    #[test]
    fn missing_program_path_is_rejected() {
        let profile = sample_profile();
        let meta = RawProfileMeta {
            profile_type: RawProfileKind::FixedRaw,
            program_path: String::new(),
        };
        assert!(matches!(
            profile.generate_raw_profile(&meta, &stub()),
            Err(ProfileError::NoProgramPath)
        ));
    }
}
