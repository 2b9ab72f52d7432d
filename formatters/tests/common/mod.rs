// Shared helpers for image-level tests

#![allow(dead_code)]

use byteorder::{ByteOrder, LittleEndian};
use fatkit_core::FatVariant;
use fatkit_formatters::FatTable;
use std::io::Write;
use tempfile::NamedTempFile;

pub const ATTR_READ_ONLY: u8 = 0x01;
pub const ATTR_HIDDEN: u8 = 0x02;
pub const ATTR_VOLUME_ID: u8 = 0x08;
pub const ATTR_DIRECTORY: u8 = 0x10;
pub const ATTR_ARCHIVE: u8 = 0x20;
pub const ATTR_LONG_NAME: u8 = 0x0F;

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn dir_entry(name: &[u8; 11], attributes: u8, cluster: u32, size: u32) -> [u8; 32] {
    let mut slot = [0u8; 32];
    slot[..11].copy_from_slice(name);
    slot[11] = attributes;
    LittleEndian::write_u16(&mut slot[20..22], (cluster >> 16) as u16);
    LittleEndian::write_u16(&mut slot[26..28], cluster as u16);
    LittleEndian::write_u32(&mut slot[28..32], size);
    slot
}

/// A 1.44 MB floppy laid out by hand: 512-byte sectors, one sector per
/// cluster, two 9-sector FATs, 224 root entries, data from sector 33.
pub struct FloppyImage {
    pub bytes: Vec<u8>,
    fat: FatTable,
    root_slots: usize,
}

impl FloppyImage {
    pub const TOTAL_SECTORS: usize = 2880;
    pub const FAT_SECTORS: usize = 9;
    pub const ROOT_SECTOR: usize = 19;
    pub const DATA_SECTOR: usize = 33;

    pub fn new() -> Self {
        let mut bytes = vec![0u8; Self::TOTAL_SECTORS * 512];
        let bs = &mut bytes[..512];
        bs[0..3].copy_from_slice(&[0xEB, 0x3C, 0x90]);
        bs[3..11].copy_from_slice(b"MSDOS5.0");
        LittleEndian::write_u16(&mut bs[11..13], 512);
        bs[13] = 1;
        LittleEndian::write_u16(&mut bs[14..16], 1);
        bs[16] = 2;
        LittleEndian::write_u16(&mut bs[17..19], 224);
        LittleEndian::write_u16(&mut bs[19..21], Self::TOTAL_SECTORS as u16);
        bs[21] = 0xF0;
        LittleEndian::write_u16(&mut bs[22..24], Self::FAT_SECTORS as u16);
        LittleEndian::write_u16(&mut bs[24..26], 18);
        LittleEndian::write_u16(&mut bs[26..28], 2);
        bs[38] = 0x29;
        LittleEndian::write_u32(&mut bs[39..43], 0x1234_ABCD);
        bs[43..54].copy_from_slice(b"FLOPPY     ");
        bs[54..62].copy_from_slice(b"FAT12   ");
        bs[510] = 0x55;
        bs[511] = 0xAA;

        let mut fat = FatTable::new(FatVariant::Fat12, vec![0u8; Self::FAT_SECTORS * 512]);
        fat.set_raw_entry(0, 0xFF0).unwrap();
        fat.set_raw_entry(1, 0xFFF).unwrap();

        let mut image = Self { bytes, fat, root_slots: 0 };
        image.sync_fat();
        image
    }

    pub fn cluster_offset(cluster: u32) -> usize {
        (Self::DATA_SECTOR + cluster as usize - 2) * 512
    }

    pub fn add_root_entry(&mut self, slot: [u8; 32]) {
        let offset = Self::ROOT_SECTOR * 512 + self.root_slots * 32;
        self.bytes[offset..offset + 32].copy_from_slice(&slot);
        self.root_slots += 1;
    }

    pub fn put_entry(&mut self, cluster: u32, index: usize, slot: [u8; 32]) {
        let offset = Self::cluster_offset(cluster) + index * 32;
        self.bytes[offset..offset + 32].copy_from_slice(&slot);
    }

    /// Chain `clusters` in order and fill them with `data`.
    pub fn write_chain(&mut self, clusters: &[u32], data: &[u8]) {
        for (i, &cluster) in clusters.iter().enumerate() {
            let next = clusters.get(i + 1).copied().unwrap_or(0xFFF);
            self.fat.set_entry(cluster, next).unwrap();
        }
        for (chunk, &cluster) in data.chunks(512).zip(clusters) {
            let offset = Self::cluster_offset(cluster);
            self.bytes[offset..offset + chunk.len()].copy_from_slice(chunk);
        }
        self.sync_fat();
    }

    pub fn set_fat(&mut self, cluster: u32, value: u32) {
        self.fat.set_entry(cluster, value).unwrap();
        self.sync_fat();
    }

    fn sync_fat(&mut self) {
        let len = Self::FAT_SECTORS * 512;
        for copy in 0..2 {
            let offset = 512 + copy * len;
            self.bytes[offset..offset + len].copy_from_slice(self.fat.as_bytes());
        }
    }

    pub fn to_temp_file(&self) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(&self.bytes).unwrap();
        file.flush().unwrap();
        file
    }
}

/// Root holds a label, a deleted slot, a long-name slot, a two-cluster text
/// file, a binary file, an empty file and the GAMES directory.
pub fn sample_floppy() -> FloppyImage {
    let mut image = FloppyImage::new();
    image.add_root_entry(dir_entry(b"FLOPPY     ", ATTR_VOLUME_ID, 0, 0));

    let mut deleted = dir_entry(b"OLD     TXT", ATTR_ARCHIVE, 9, 10);
    deleted[0] = 0xE5;
    image.add_root_entry(deleted);
    image.add_root_entry(dir_entry(b"Ar\0e\0a\0d\0m\0", ATTR_LONG_NAME, 0, 0xFFFF_FFFF));

    image.add_root_entry(dir_entry(b"README  TXT", ATTR_ARCHIVE, 2, readme().len() as u32));
    image.write_chain(&[2, 3], &readme());

    image.add_root_entry(dir_entry(b"GAMES      ", ATTR_DIRECTORY, 4, 0));
    image.put_entry(4, 0, dir_entry(b".          ", ATTR_DIRECTORY, 4, 0));
    image.put_entry(4, 1, dir_entry(b"..         ", ATTR_DIRECTORY, 0, 0));
    image.put_entry(4, 2, dir_entry(b"TETRIS  DOC", ATTR_READ_ONLY | ATTR_ARCHIVE, 6, 11));
    image.write_chain(&[4], &[]);
    image.write_chain(&[6], b"Block game\n");

    image.add_root_entry(dir_entry(b"LOGO    BIN", ATTR_HIDDEN | ATTR_ARCHIVE, 5, 4));
    image.write_chain(&[5], &[0x89, b'P', b'N', b'G']);

    image.add_root_entry(dir_entry(b"EMPTY   TXT", ATTR_ARCHIVE, 0, 0));
    image
}

/// 600 bytes of text, so the file spans two clusters.
pub fn readme() -> Vec<u8> {
    let mut text = b"FAT12 floppy test image.\n".repeat(24);
    text.truncate(600);
    text
}
