use serde::{Deserialize, Serialize};
use std::fmt;

/// Largest cluster count a FAT12 volume may have.
pub const FAT12_MAX_CLUSTERS: u32 = 4084;
pub const FAT16_MIN_CLUSTERS: u32 = 4085;
pub const FAT16_MAX_CLUSTERS: u32 = 65524;
pub const FAT32_MIN_CLUSTERS: u32 = 65525;
/// 28-bit cluster numbers, minus the reserved and sentinel values.
pub const FAT32_MAX_CLUSTERS: u32 = 0x0FFF_FFF5;

/// The FAT width a volume uses.
///
/// The variant of an existing volume is decided from its BPB and cluster count,
/// never by the filesystem type string in the boot sector.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum FatVariant {
    Fat12,
    Fat16,
    Fat32,
}

impl FatVariant {
    pub fn from_cluster_count(clusters: u32) -> Self {
        if clusters <= FAT12_MAX_CLUSTERS {
            FatVariant::Fat12
        } else if clusters <= FAT16_MAX_CLUSTERS {
            FatVariant::Fat16
        } else {
            FatVariant::Fat32
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            FatVariant::Fat12 => "FAT12",
            FatVariant::Fat16 => "FAT16",
            FatVariant::Fat32 => "FAT32",
        }
    }

    /// Mask applied to a raw entry before it is interpreted as a cluster link.
    pub fn entry_mask(&self) -> u32 {
        match self {
            FatVariant::Fat12 => 0x0FFF,
            FatVariant::Fat16 => 0xFFFF,
            FatVariant::Fat32 => 0x0FFF_FFFF,
        }
    }

    /// Entries at or above this value terminate a chain.
    pub fn end_of_chain(&self) -> u32 {
        match self {
            FatVariant::Fat12 => 0x0FF8,
            FatVariant::Fat16 => 0xFFF8,
            FatVariant::Fat32 => 0x0FFF_FFF8,
        }
    }

    pub fn bad_cluster(&self) -> u32 {
        match self {
            FatVariant::Fat12 => 0x0FF7,
            FatVariant::Fat16 => 0xFFF7,
            FatVariant::Fat32 => 0x0FFF_FFF7,
        }
    }

    /// Valid cluster count range, inclusive.
    pub fn cluster_range(&self) -> (u32, u32) {
        match self {
            FatVariant::Fat12 => (1, FAT12_MAX_CLUSTERS),
            FatVariant::Fat16 => (FAT16_MIN_CLUSTERS, FAT16_MAX_CLUSTERS),
            FatVariant::Fat32 => (FAT32_MIN_CLUSTERS, FAT32_MAX_CLUSTERS),
        }
    }

    /// Bytes needed to store `entries` FAT entries.
    pub fn table_bytes(&self, entries: u64) -> u64 {
        match self {
            FatVariant::Fat12 => (entries * 3 + 1) / 2,
            FatVariant::Fat16 => entries * 2,
            FatVariant::Fat32 => entries * 4,
        }
    }

    /// The space-padded type string stored in the extended BPB.
    pub const fn fs_type_label(self) -> &'static [u8; 8] {
        match self {
            FatVariant::Fat12 => b"FAT12   ",
            FatVariant::Fat16 => b"FAT16   ",
            FatVariant::Fat32 => b"FAT32   ",
        }
    }
}

impl fmt::Display for FatVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
