// FAT table codec for FAT12, FAT16 and FAT32
// Entry lookup and store for every width, the reserved header written at
// format time, and the cluster chain walk used when reading.

use byteorder::{ByteOrder, LittleEndian};
use fatkit_core::{FatError, FatVariant};
use log::trace;
use std::collections::HashSet;
use super::constants::SECTOR_SIZE;

/// In-memory copy of one FAT.
#[derive(Debug, Clone)]
pub struct FatTable {
    variant: FatVariant,
    data: Vec<u8>,
}

impl FatTable {
    pub fn new(variant: FatVariant, data: Vec<u8>) -> Self {
        Self { variant, data }
    }

    pub fn variant(&self) -> FatVariant {
        self.variant
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Number of entries the table can hold.
    pub fn capacity(&self) -> u32 {
        let len = self.data.len() as u64;
        let entries = match self.variant {
            FatVariant::Fat12 => len * 2 / 3,
            FatVariant::Fat16 => len / 2,
            FatVariant::Fat32 => len / 4,
        };
        entries.min(u32::MAX as u64) as u32
    }

    fn out_of_table(&self, cluster: u32) -> FatError {
        FatError::corrupt_chain(
            cluster,
            format!("entry lies beyond the {} byte FAT", self.data.len()),
        )
    }

    /// Raw entry bits, without the FAT32 reserved-nibble mask.
    pub fn raw_entry(&self, cluster: u32) -> Result<u32, FatError> {
        let n = cluster as usize;
        match self.variant {
            FatVariant::Fat12 => {
                let o = n + n / 2;
                if o + 1 >= self.data.len() {
                    return Err(self.out_of_table(cluster));
                }
                let value = if n & 1 == 1 {
                    (self.data[o] as u32 >> 4) | ((self.data[o + 1] as u32) << 4)
                } else {
                    self.data[o] as u32 | ((self.data[o + 1] as u32 & 0x0F) << 8)
                };
                Ok(value & 0x0FFF)
            }
            FatVariant::Fat16 => {
                let o = n * 2;
                if o + 2 > self.data.len() {
                    return Err(self.out_of_table(cluster));
                }
                Ok(LittleEndian::read_u16(&self.data[o..]) as u32)
            }
            FatVariant::Fat32 => {
                let o = n * 4;
                if o + 4 > self.data.len() {
                    return Err(self.out_of_table(cluster));
                }
                Ok(LittleEndian::read_u32(&self.data[o..]))
            }
        }
    }

    /// Entry value as a cluster link (FAT32 drops the top four bits).
    pub fn entry(&self, cluster: u32) -> Result<u32, FatError> {
        Ok(self.raw_entry(cluster)? & self.variant.entry_mask())
    }

    /// Store raw entry bits. FAT12 and FAT16 values are cut to their width.
    pub fn set_raw_entry(&mut self, cluster: u32, value: u32) -> Result<(), FatError> {
        let n = cluster as usize;
        match self.variant {
            FatVariant::Fat12 => {
                let o = n + n / 2;
                if o + 1 >= self.data.len() {
                    return Err(self.out_of_table(cluster));
                }
                let value = value & 0x0FFF;
                if n & 1 == 1 {
                    self.data[o] = (self.data[o] & 0x0F) | ((value & 0x0F) << 4) as u8;
                    self.data[o + 1] = (value >> 4) as u8;
                } else {
                    self.data[o] = value as u8;
                    self.data[o + 1] = (self.data[o + 1] & 0xF0) | ((value >> 8) & 0x0F) as u8;
                }
            }
            FatVariant::Fat16 => {
                let o = n * 2;
                if o + 2 > self.data.len() {
                    return Err(self.out_of_table(cluster));
                }
                LittleEndian::write_u16(&mut self.data[o..o + 2], value as u16);
            }
            FatVariant::Fat32 => {
                let o = n * 4;
                if o + 4 > self.data.len() {
                    return Err(self.out_of_table(cluster));
                }
                LittleEndian::write_u32(&mut self.data[o..o + 4], value);
            }
        }
        Ok(())
    }

    /// Store a cluster link, keeping the FAT32 reserved top nibble intact.
    pub fn set_entry(&mut self, cluster: u32, value: u32) -> Result<(), FatError> {
        let mask = self.variant.entry_mask();
        let value = if self.variant == FatVariant::Fat32 {
            (self.raw_entry(cluster)? & !mask) | (value & mask)
        } else {
            value & mask
        };
        self.set_raw_entry(cluster, value)
    }

    /// Follow a chain from `start` until an end-of-chain entry.
    ///
    /// `cluster_count` is the number of data clusters on the volume; valid
    /// links are `2..cluster_count + 2`. Every cluster may appear once, so a
    /// corrupt table that loops is reported instead of walked forever.
    pub fn cluster_chain(&self, start: u32, cluster_count: u32) -> Result<Vec<u32>, FatError> {
        let last_cluster = cluster_count.saturating_add(1);
        let end_of_chain = self.variant.end_of_chain();
        let bad_cluster = self.variant.bad_cluster();

        let mut chain = Vec::new();
        let mut visited = HashSet::new();
        let mut current = start;
        loop {
            if current < 2 || current > last_cluster {
                return Err(FatError::corrupt_chain(
                    current,
                    format!("link outside the data clusters 2..={}", last_cluster),
                ));
            }
            if !visited.insert(current) {
                return Err(FatError::corrupt_chain(
                    current,
                    format!("chain from cluster {} loops after {} clusters", start, chain.len()),
                ));
            }
            chain.push(current);

            let next = self.entry(current)?;
            trace!("FAT[{}] = {:#x}", current, next);
            if next >= end_of_chain {
                break;
            }
            if next == bad_cluster {
                return Err(FatError::corrupt_chain(current, "chain runs into a bad cluster"));
            }
            current = next;
        }
        Ok(chain)
    }
}

/// First sector of a fresh FAT: entry 0 carries the media descriptor with
/// every other bit set, entry 1 is all ones. FAT32 also ends the root
/// directory chain.
pub fn reserved_header(
    variant: FatVariant,
    media_descriptor: u8,
    root_cluster: Option<u32>,
) -> Result<[u8; SECTOR_SIZE], FatError> {
    let all_ones: u32 = match variant {
        FatVariant::Fat12 => 0x0FFF,
        FatVariant::Fat16 => 0xFFFF,
        FatVariant::Fat32 => 0xFFFF_FFFF,
    };

    let mut table = FatTable::new(variant, vec![0u8; SECTOR_SIZE]);
    table.set_raw_entry(0, (all_ones & !0xFF) | media_descriptor as u32)?;
    table.set_raw_entry(1, all_ones)?;
    if let Some(root) = root_cluster {
        table.set_raw_entry(root, variant.entry_mask())?;
    }

    let mut sector = [0u8; SECTOR_SIZE];
    sector.copy_from_slice(table.as_bytes());
    Ok(sector)
}
