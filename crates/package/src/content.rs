//! Locating the encrypted payload inside a package archive
//!
//! Archives produced by different tool versions name and nest the payload
//! differently, so several heuristics are tried in a fixed order.

use std::fmt;

/// Payload names produced by known packaging tool versions
const WELL_KNOWN_NAMES: &[&str] = &[
    "IntunePackage.intunewin",
    "Content.intunewin",
    "IntunePackage.dat",
];

/// Nested `.intunewin` entries at or below this size are metadata, not payload
pub const MIN_NESTED_PAYLOAD_SIZE: u64 = 4096;

/// Extensions tried when deriving a payload name from the manifest's file name
const DERIVED_EXTENSIONS: &[&str] = &["intunewin", "dat", "bin", "enc"];

/// One archive entry, as far as payload detection is concerned
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryInfo {
    pub index: usize,
    pub name: String,
    pub size: u64,
    pub is_dir: bool,
}

impl EntryInfo {
    fn file_name(&self) -> &str {
        self.name
            .rsplit(['/', '\\'])
            .next()
            .unwrap_or(&self.name)
    }

    fn has_extension(&self, ext: &str) -> bool {
        self.file_name()
            .rsplit_once('.')
            .is_some_and(|(_, e)| e.eq_ignore_ascii_case(ext))
    }
}

/// Which heuristic located the payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentMatch {
    WellKnownName,
    NestedPackage,
    DatFile,
    LargestEntry,
    DerivedName,
}

impl fmt::Display for ContentMatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::WellKnownName => "well-known name",
            Self::NestedPackage => "nested package",
            Self::DatFile => "dat file",
            Self::LargestEntry => "largest entry",
            Self::DerivedName => "derived from manifest file name",
        };
        f.write_str(s)
    }
}

/// Pick the payload entry, or `None` when every heuristic fails
///
/// `manifest_index` is the detection.xml entry, which is never a candidate.
#[must_use]
pub fn locate<'a>(
    entries: &'a [EntryInfo],
    manifest_index: usize,
    declared_name: Option<&str>,
) -> Option<(&'a EntryInfo, ContentMatch)> {
    let files: Vec<&EntryInfo> = entries
        .iter()
        .filter(|e| !e.is_dir && e.index != manifest_index)
        .collect();

    let by_name = |name: &str| {
        files
            .iter()
            .copied()
            .find(|e| e.file_name().eq_ignore_ascii_case(name))
    };

    if let Some(entry) = WELL_KNOWN_NAMES.iter().find_map(|name| by_name(name)) {
        return Some((entry, ContentMatch::WellKnownName));
    }

    if let Some(entry) = files
        .iter()
        .copied()
        .filter(|e| e.has_extension("intunewin") && e.size > MIN_NESTED_PAYLOAD_SIZE)
        .max_by_key(|e| e.size)
    {
        return Some((entry, ContentMatch::NestedPackage));
    }

    if let Some(entry) = files.iter().copied().find(|e| e.has_extension("dat")) {
        return Some((entry, ContentMatch::DatFile));
    }

    if let Some(entry) = files
        .iter()
        .copied()
        .filter(|e| !e.has_extension("xml") && e.size > 0)
        .max_by_key(|e| e.size)
    {
        return Some((entry, ContentMatch::LargestEntry));
    }

    let declared = declared_name?;
    let stem = declared
        .rsplit_once('.')
        .map_or(declared, |(stem, _)| stem);
    std::iter::once(declared.to_string())
        .chain(DERIVED_EXTENSIONS.iter().map(|ext| format!("{stem}.{ext}")))
        .find_map(|name| by_name(&name))
        .map(|entry| (entry, ContentMatch::DerivedName))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(index: usize, name: &str, size: u64) -> EntryInfo {
        EntryInfo {
            index,
            name: name.to_string(),
            size,
            is_dir: name.ends_with('/'),
        }
    }

    #[test]
    fn test_well_known_name_wins() {
        let entries = vec![
            entry(0, "IntuneWinPackage/Metadata/Detection.xml", 900),
            entry(1, "IntuneWinPackage/Contents/huge.bin", 90_000),
            entry(2, "IntuneWinPackage/Contents/IntunePackage.intunewin", 10_000),
        ];
        let (found, how) = locate(&entries, 0, None).unwrap();
        assert_eq!(found.index, 2);
        assert_eq!(how, ContentMatch::WellKnownName);
    }

    #[test]
    fn test_nested_package_respects_threshold() {
        let entries = vec![
            entry(0, "detection.xml", 900),
            entry(1, "meta.intunewin", 100),
            entry(2, "payload.intunewin", 50_000),
        ];
        let (found, how) = locate(&entries, 0, None).unwrap();
        assert_eq!(found.index, 2);
        assert_eq!(how, ContentMatch::NestedPackage);
    }

    #[test]
    fn test_dat_before_largest() {
        let entries = vec![
            entry(0, "detection.xml", 900),
            entry(1, "other.bin", 90_000),
            entry(2, "CONTENT.DAT", 10),
        ];
        let (found, how) = locate(&entries, 0, None).unwrap();
        assert_eq!(found.index, 2);
        assert_eq!(how, ContentMatch::DatFile);
    }

    #[test]
    fn test_largest_non_xml_entry() {
        let entries = vec![
            entry(0, "detection.xml", 900),
            entry(1, "dir/", 0),
            entry(2, "notes.xml", 100_000),
            entry(3, "a.bin", 10),
            entry(4, "b.bin", 20),
        ];
        let (found, how) = locate(&entries, 0, None).unwrap();
        assert_eq!(found.index, 4);
        assert_eq!(how, ContentMatch::LargestEntry);
    }

    #[test]
    fn test_derived_name() {
        let entries = vec![
            entry(0, "detection.xml", 900),
            entry(1, "other.xml", 0),
            entry(2, "setup.enc", 0),
        ];
        assert!(locate(&entries, 0, None).is_none());
        let (found, how) = locate(&entries, 0, Some("setup.msi")).unwrap();
        assert_eq!(found.index, 2);
        assert_eq!(how, ContentMatch::DerivedName);
    }

    #[test]
    fn test_manifest_entry_is_never_payload() {
        let entries = vec![entry(0, "detection.xml", 900)];
        assert!(locate(&entries, 0, Some("detection.xml")).is_none());
    }
}
