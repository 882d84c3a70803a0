//! Memory-map parsing for address classification
//!
//! Parses the textual maps block found after a profile's binary trailer (or a
//! raw `/proc/<pid>/maps` dump), expands the `$build` placeholder, and builds
//! an index of dynamic libraries by address range so a sampled address can be
//! attributed to the library that owns it.

use log::debug;

/// One mapping record from the maps block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcMapItem {
    pub start: u64,
    pub end: u64,
    pub perms: String,
    pub offset: u64,
    pub dev_major: u32,
    pub dev_minor: u32,
}

impl ProcMapItem {
    pub fn contains(&self, addr: u64) -> bool {
        addr >= self.start && addr < self.end
    }
}

/// All mapping records of one shared library, aggregated by inode.
///
/// A library is usually mapped several times (text, rodata, data...); `base`
/// is the lowest start and `upper_bound` the highest end over all items.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcLibMapping {
    pub inode: u64,
    pub path: String,
    pub base: u64,
    pub upper_bound: u64,
    pub items: Vec<ProcMapItem>,
}

/// Index of every dynamic library mapped by the profiled process.
#[derive(Debug, Clone)]
pub struct DynamicLibMappings {
    lower_bound: u64,
    upper_bound: u64,
    libs: Vec<ProcLibMapping>,
}

impl Default for DynamicLibMappings {
    fn default() -> Self {
        DynamicLibMappings {
            lower_bound: u64::MAX,
            upper_bound: 0,
            libs: Vec::new(),
        }
    }
}

impl DynamicLibMappings {
    /// Find the library whose mapped ranges cover `addr`.
    ///
    /// The global bounds reject most misses cheaply; library counts are small
    /// enough that the per-library scan stays linear.
    pub fn find_matched_lib(&self, addr: u64) -> Option<&ProcLibMapping> {
        if addr < self.lower_bound || addr >= self.upper_bound {
            return None;
        }
        self.libs.iter().find(|lib| {
            addr >= lib.base
                && addr < lib.upper_bound
                && lib.items.iter().any(|item| item.contains(addr))
        })
    }

    /// Distinct library paths, in first-seen order.
    pub fn lib_paths(&self) -> Vec<&str> {
        self.libs.iter().map(|lib| lib.path.as_str()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.libs.is_empty()
    }

    pub fn len(&self) -> usize {
        self.libs.len()
    }

    fn add_item(&mut self, inode: u64, path: &str, item: ProcMapItem) {
        self.lower_bound = self.lower_bound.min(item.start);
        self.upper_bound = self.upper_bound.max(item.end);
        match self.libs.iter_mut().find(|lib| lib.inode == inode) {
            Some(lib) => {
                lib.base = lib.base.min(item.start);
                lib.upper_bound = lib.upper_bound.max(item.end);
                lib.items.push(item);
            }
            None => self.libs.push(ProcLibMapping {
                inode,
                path: path.to_string(),
                base: item.start,
                upper_bound: item.end,
                items: vec![item],
            }),
        }
    }
}

/// Result of parsing one maps block: the post-substitution mapping lines and
/// the dynamic-library index built from them.
#[derive(Debug, Default)]
pub struct MapsText {
    pub lines: Vec<String>,
    pub mappings: DynamicLibMappings,
}

/// Parse a maps block.
///
/// `build=<path>` lines update the build path used for `$build` expansion and
/// emit nothing. Every other non-empty line is kept (post-substitution); the
/// ones that parse as mapping records for an absolute `.so` path additionally
/// feed the address index.
pub fn parse_maps_text(text: &str) -> MapsText {
    let mut build = String::new();
    let mut maps = MapsText::default();
    for line in text.lines() {
        if line.is_empty() {
            continue;
        }
        if let Some(path) = line.strip_prefix("build=") {
            build = path.to_string();
            continue;
        }
        let line = replace_build_specifier(line, &build);
        if let Some((item, inode, path)) = parse_mapping_line(&line) {
            if path.starts_with('/') && path.contains(".so") {
                maps.mappings.add_item(inode, path, item);
            }
        }
        maps.lines.push(line);
    }
    debug!(
        "parsed maps block: {} lines, {} dynamic libs",
        maps.lines.len(),
        maps.mappings.len()
    );
    maps
}

/// Replace each `$build` not followed by a word character (`[A-Za-z0-9_]`)
/// with `build`; end-of-line counts as a non-word boundary.
pub fn replace_build_specifier(line: &str, build: &str) -> String {
    const PLACEHOLDER: &str = "$build";
    let mut out = String::with_capacity(line.len());
    let mut rest = line;
    while let Some(pos) = rest.find(PLACEHOLDER) {
        let after = &rest[pos + PLACEHOLDER.len()..];
        let followed_by_word = after
            .bytes()
            .next()
            .is_some_and(|b| b.is_ascii_alphanumeric() || b == b'_');
        out.push_str(&rest[..pos]);
        out.push_str(if followed_by_word { PLACEHOLDER } else { build });
        rest = after;
    }
    out.push_str(rest);
    out
}

/// Parse `<start>-<end> <perms> <offset> <maj>:<min> <inode> <path>`.
/// Returns the item plus the inode and path fields on a full match.
fn parse_mapping_line(line: &str) -> Option<(ProcMapItem, u64, &str)> {
    let mut fields = line.split_whitespace();
    let range = fields.next()?;
    let (start, end) = range.split_once('-')?;
    let start = u64::from_str_radix(start, 16).ok()?;
    let end = u64::from_str_radix(end, 16).ok()?;
    let perms: String = fields.next()?.chars().take(4).collect();
    let offset = u64::from_str_radix(fields.next()?, 16).ok()?;
    let (maj, min) = fields.next()?.split_once(':')?;
    let dev_major = u32::from_str_radix(maj, 16).ok()?;
    let dev_minor = u32::from_str_radix(min, 16).ok()?;
    let inode = fields.next()?.parse().ok()?;
    let path = fields.next()?;
    Some((
        ProcMapItem {
            start,
            end,
            perms,
            offset,
            dev_major,
            dev_minor,
        },
        inode,
        path,
    ))
}
