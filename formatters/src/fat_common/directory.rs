// Directory entry decoding for FAT12/16/32
// Short (8.3) entries only; long-name entries are skipped.

use byteorder::{ByteOrder, LittleEndian};
use fatkit_core::FatVariant;
use serde::Serialize;
use super::constants::*;

/// Directory entry attributes
pub mod attributes {
    pub const ATTR_READ_ONLY: u8 = 0x01;
    pub const ATTR_HIDDEN: u8 = 0x02;
    pub const ATTR_SYSTEM: u8 = 0x04;
    pub const ATTR_VOLUME_ID: u8 = 0x08;
    pub const ATTR_DIRECTORY: u8 = 0x10;
    pub const ATTR_ARCHIVE: u8 = 0x20;
    pub const ATTR_LONG_NAME: u8 = 0x0F;
}

use attributes::*;

const ATTRIBUTE_FLAGS: [(u8, char); 6] = [
    (ATTR_READ_ONLY, 'R'),
    (ATTR_HIDDEN, 'H'),
    (ATTR_SYSTEM, 'S'),
    (ATTR_VOLUME_ID, 'V'),
    (ATTR_DIRECTORY, 'D'),
    (ATTR_ARCHIVE, 'A'),
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DirEntry {
    pub name: String,
    pub attributes: u8,
    pub first_cluster: u32,
    pub size: u32,
}

impl DirEntry {
    pub fn is_directory(&self) -> bool {
        self.attributes & ATTR_DIRECTORY != 0
    }

    pub fn is_volume_label(&self) -> bool {
        self.attributes & ATTR_VOLUME_ID != 0
    }

    pub fn flags(&self) -> String {
        attribute_flags(self.attributes)
    }
}

/// Attribute bits as letters in the order R, H, S, V, D, A.
pub fn attribute_flags(attr: u8) -> String {
    ATTRIBUTE_FLAGS
        .iter()
        .filter(|(bit, _)| attr & bit != 0)
        .map(|&(_, letter)| letter)
        .collect()
}

/// Decode the 11-byte name field: base trimmed of trailing spaces, then
/// `.ext` when the extension is not blank.
pub fn parse_83_name(raw: &[u8]) -> String {
    let mut base: Vec<u8> = raw[DIR_NAME..DIR_EXT].to_vec();
    if base[0] == DIR_ENTRY_KANJI_E5 {
        base[0] = DIR_ENTRY_DELETED;
    }
    let base: String = base.iter().map(|&b| b as char).collect();
    let ext: String = raw[DIR_EXT..DIR_EXT + 3].iter().map(|&b| b as char).collect();

    let base = base.trim_end_matches(' ');
    let ext = ext.trim_end_matches(' ');
    if ext.is_empty() {
        base.to_string()
    } else {
        format!("{}.{}", base, ext)
    }
}

/// Decode the entries of a directory region.
///
/// Stops at the first slot starting with 0x00; later slots are never
/// looked at. Deleted slots and long-name slots are skipped.
pub fn parse_directory(region: &[u8], variant: FatVariant) -> Vec<DirEntry> {
    let mut entries = Vec::new();
    for slot in region.chunks_exact(DIR_ENTRY_SIZE) {
        if slot[0] == DIR_ENTRY_END {
            break;
        }
        let attributes = slot[DIR_ATTR];
        if slot[0] == DIR_ENTRY_DELETED || attributes == ATTR_LONG_NAME {
            continue;
        }

        let low = LittleEndian::read_u16(&slot[DIR_FST_CLUS_LO..]) as u32;
        let first_cluster = if variant == FatVariant::Fat32 {
            let high = LittleEndian::read_u16(&slot[DIR_FST_CLUS_HI..]) as u32;
            (high << 16) | low
        } else {
            low
        };

        entries.push(DirEntry {
            name: parse_83_name(slot),
            attributes,
            first_cluster,
            size: LittleEndian::read_u32(&slot[DIR_FILE_SIZE..]),
        });
    }
    entries
}

#[cfg(test)]
pub(crate) fn raw_entry(name: &[u8; 11], attributes: u8, cluster: u32, size: u32) -> [u8; DIR_ENTRY_SIZE] {
    let mut slot = [0u8; DIR_ENTRY_SIZE];
    slot[..11].copy_from_slice(name);
    slot[DIR_ATTR] = attributes;
    LittleEndian::write_u16(&mut slot[DIR_FST_CLUS_HI..], (cluster >> 16) as u16);
    LittleEndian::write_u16(&mut slot[DIR_FST_CLUS_LO..], cluster as u16);
    LittleEndian::write_u32(&mut slot[DIR_FILE_SIZE..], size);
    slot
}

#[cfg(test)]
mod tests {
    use super::*;

    fn region(slots: &[[u8; DIR_ENTRY_SIZE]]) -> Vec<u8> {
        slots.iter().flat_map(|s| s.iter().copied()).collect()
    }

    #[test]
    fn test_parse_83_name() {
        assert_eq!(parse_83_name(b"README  TXT"), "README.TXT");
        assert_eq!(parse_83_name(b"FOLDER     "), "FOLDER");
        assert_eq!(parse_83_name(b"TEST    C  "), "TEST.C");
        assert_eq!(parse_83_name(b".          "), ".");
        assert_eq!(parse_83_name(b"..         "), "..");
    }

    #[test]
    fn test_leading_05_decodes_as_e5() {
        let name = parse_83_name(b"\x05ABC    TXT");
        assert_eq!(name.chars().next(), Some('\u{E5}'));
        assert!(name.ends_with("ABC.TXT"));
    }

    #[test]
    fn test_attribute_flags() {
        assert_eq!(attribute_flags(0x00), "");
        assert_eq!(attribute_flags(ATTR_ARCHIVE), "A");
        assert_eq!(attribute_flags(ATTR_DIRECTORY | ATTR_HIDDEN), "HD");
        assert_eq!(attribute_flags(0x3F), "RHSVDA");
    }

    #[test]
    fn test_zero_first_byte_stops_parsing() {
        let bytes = region(&[
            raw_entry(b"FIRST   TXT", ATTR_ARCHIVE, 2, 10),
            [0u8; DIR_ENTRY_SIZE],
            raw_entry(b"HIDDEN  TXT", ATTR_ARCHIVE, 3, 20),
        ]);
        let entries = parse_directory(&bytes, FatVariant::Fat16);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].name, "FIRST.TXT");
    }

    #[test]
    fn test_deleted_entry_is_skipped() {
        let mut deleted = raw_entry(b"GONE    TXT", ATTR_ARCHIVE, 2, 10);
        deleted[0] = DIR_ENTRY_DELETED;
        let bytes = region(&[deleted, raw_entry(b"KEPT    TXT", ATTR_ARCHIVE, 3, 20)]);

        let entries = parse_directory(&bytes, FatVariant::Fat16);
        assert_eq!(
            entries,
            vec![DirEntry {
                name: "KEPT.TXT".to_string(),
                attributes: ATTR_ARCHIVE,
                first_cluster: 3,
                size: 20,
            }]
        );
    }

    #[test]
    fn test_long_name_entry_is_skipped() {
        let lfn = raw_entry(b"Ax\0y\0z\0\0\0\0\0", ATTR_LONG_NAME, 0, 0);
        let bytes = region(&[lfn, raw_entry(b"XYZ        ", ATTR_DIRECTORY, 7, 0)]);
        let entries = parse_directory(&bytes, FatVariant::Fat12);
        assert_eq!(entries.len(), 1);
        assert!(entries[0].is_directory());
        assert_eq!(entries[0].first_cluster, 7);
    }

    #[test]
    fn test_high_cluster_word_only_for_fat32() {
        let bytes = region(&[raw_entry(b"BIG     BIN", ATTR_ARCHIVE, 0x0003_0005, 1)]);
        assert_eq!(parse_directory(&bytes, FatVariant::Fat32)[0].first_cluster, 0x0003_0005);
        assert_eq!(parse_directory(&bytes, FatVariant::Fat16)[0].first_cluster, 5);
    }

    #[test]
    fn test_volume_label_is_listed() {
        let bytes = region(&[raw_entry(b"MYDISK     ", ATTR_VOLUME_ID, 0, 0)]);
        let entries = parse_directory(&bytes, FatVariant::Fat16);
        assert!(entries[0].is_volume_label());
        assert_eq!(entries[0].flags(), "V");
    }

    #[test]
    fn test_partial_trailing_slot_is_ignored() {
        let mut bytes = region(&[raw_entry(b"ONE     TXT", ATTR_ARCHIVE, 2, 1)]);
        bytes.extend_from_slice(&[b'X'; 10]);
        assert_eq!(parse_directory(&bytes, FatVariant::Fat16).len(), 1);
    }

    #[test]
    fn test_empty_region() {
        assert!(parse_directory(&[0u8; 512], FatVariant::Fat16).is_empty());
        assert!(parse_directory(&[], FatVariant::Fat16).is_empty());
    }
}
