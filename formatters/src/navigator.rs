// FAT12/16/32 image navigator
// Read-only session over an existing image with a current directory.
//
// `cd ..` always returns to the root: there is no parent tracking, so from
// a nested directory it jumps straight to `/`.

use fatkit_core::{FatError, FatVariant};
use log::{debug, info};
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;
use crate::fat_common::cluster_io::{read_block, read_cluster_chain};
use crate::fat_common::{parse_directory, BiosParameterBlock, DirEntry, FatTable, FsInfo, SECTOR_SIZE};

/// File data as handed back by [`FatNavigator::read_file`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileContents {
    Text(String),
    Binary(Vec<u8>),
}

impl FileContents {
    /// ASCII data becomes text, anything else stays raw.
    pub fn from_bytes(data: Vec<u8>) -> Self {
        match String::from_utf8(data) {
            Ok(text) if text.is_ascii() => FileContents::Text(text),
            Ok(text) => FileContents::Binary(text.into_bytes()),
            Err(e) => FileContents::Binary(e.into_bytes()),
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        match self {
            FileContents::Text(text) => text.as_bytes(),
            FileContents::Binary(data) => data,
        }
    }

    pub fn len(&self) -> usize {
        self.as_bytes().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

pub struct FatNavigator<R> {
    reader: R,
    bpb: BiosParameterBlock,
    variant: FatVariant,
    fat: FatTable,
    /// `None` is the root directory
    current: Option<u32>,
    path: String,
}

impl FatNavigator<File> {
    pub fn open(path: &Path) -> Result<Self, FatError> {
        if !path.exists() {
            return Err(FatError::MissingImage(path.to_path_buf()));
        }
        info!("Opening FAT image {}", path.display());
        Self::from_reader(File::open(path)?)
    }
}

impl<R: Read + Seek> FatNavigator<R> {
    pub fn from_reader(mut reader: R) -> Result<Self, FatError> {
        let image_len = reader.seek(SeekFrom::End(0))?;
        let sector = read_block(&mut reader, 0, SECTOR_SIZE)?;
        let bpb = BiosParameterBlock::parse(&sector)?;
        check_usable(&bpb, image_len)?;

        let variant = bpb.variant();
        let bps = bpb.bytes_per_sector as u64;
        let fat_len = bpb.sectors_per_fat() as u64 * bps;
        let fat = FatTable::new(variant, read_block(&mut reader, bpb.fat_start_sector() * bps, fat_len as usize)?);
        if (fat.capacity() as u64) < bpb.cluster_count() as u64 + 2 {
            return Err(FatError::InvalidBootSector(format!(
                "a {} sector FAT holds {} entries, the volume has {} clusters",
                bpb.sectors_per_fat(),
                fat.capacity(),
                bpb.cluster_count()
            )));
        }

        info!(
            "{} volume: {} clusters of {} sectors, label {:?}",
            variant,
            bpb.cluster_count(),
            bpb.sectors_per_cluster,
            bpb.volume_label_str()
        );

        Ok(Self {
            reader,
            bpb,
            variant,
            fat,
            current: None,
            path: "/".to_string(),
        })
    }

    pub fn boot_sector(&self) -> &BiosParameterBlock {
        &self.bpb
    }

    pub fn variant(&self) -> FatVariant {
        self.variant
    }

    pub fn current_path(&self) -> &str {
        &self.path
    }

    pub fn current_cluster(&self) -> Option<u32> {
        self.current
    }

    /// FSInfo of a FAT32 volume, `None` for other variants.
    pub fn fs_info(&mut self) -> Result<Option<FsInfo>, FatError> {
        if self.variant != FatVariant::Fat32 || self.bpb.fs_info_sector == 0 {
            return Ok(None);
        }
        let offset = self.bpb.fs_info_sector as u64 * self.bpb.bytes_per_sector as u64;
        let sector = read_block(&mut self.reader, offset, SECTOR_SIZE)?;
        Ok(Some(FsInfo::parse(&sector)?))
    }

    /// Entries of the current directory.
    pub fn list(&mut self) -> Result<Vec<DirEntry>, FatError> {
        let region = self.directory_region(self.current)?;
        Ok(parse_directory(&region, self.variant))
    }

    /// Enter the directory called `name` (any case), or `..` for the root.
    ///
    /// Returns `false` and leaves the state alone when nothing matches.
    pub fn change_dir(&mut self, name: &str) -> Result<bool, FatError> {
        if name == ".." {
            self.current = None;
            self.path = "/".to_string();
            return Ok(true);
        }

        let entries = self.list()?;
        let Some(entry) = entries
            .into_iter()
            .find(|e| e.is_directory() && e.name.eq_ignore_ascii_case(name))
        else {
            debug!("cd {}: no such directory in {}", name, self.path);
            return Ok(false);
        };

        self.current = (entry.first_cluster != 0).then_some(entry.first_cluster);
        self.path.push_str(&entry.name);
        self.path.push('/');
        debug!("cd {}: now at {} (cluster {:?})", name, self.path, self.current);
        Ok(true)
    }

    /// Contents of the file called `name` (any case) in the current directory.
    pub fn read_file(&mut self, name: &str) -> Result<Option<FileContents>, FatError> {
        let entries = self.list()?;
        let Some(entry) = entries
            .into_iter()
            .find(|e| !e.is_directory() && e.name.eq_ignore_ascii_case(name))
        else {
            debug!("type {}: no such file in {}", name, self.path);
            return Ok(None);
        };

        let mut data = if entry.first_cluster == 0 {
            Vec::new()
        } else {
            self.read_chain(entry.first_cluster)?
        };
        data.truncate(entry.size as usize);
        Ok(Some(FileContents::from_bytes(data)))
    }

    /// Data of every cluster in the chain starting at `start`.
    pub fn read_chain(&mut self, start: u32) -> Result<Vec<u8>, FatError> {
        let chain = self.fat.cluster_chain(start, self.bpb.cluster_count())?;
        debug!("Chain from cluster {}: {} clusters", start, chain.len());
        let bps = self.bpb.bytes_per_sector as u32;
        read_cluster_chain(
            &mut self.reader,
            &chain,
            self.bpb.sectors_per_cluster as u32,
            bps,
            self.bpb.data_start_sector() * bps as u64,
        )
    }

    fn directory_region(&mut self, cluster: Option<u32>) -> Result<Vec<u8>, FatError> {
        match cluster {
            Some(cluster) => self.read_chain(cluster),
            None if self.variant == FatVariant::Fat32 => self.read_chain(self.bpb.root_cluster),
            None => {
                let bps = self.bpb.bytes_per_sector as u64;
                let offset = self.bpb.root_dir_start_sector() * bps;
                let len = self.bpb.root_dir_sectors() as u64 * bps;
                read_block(&mut self.reader, offset, len as usize)
            }
        }
    }
}

/// Reject geometry the navigator cannot compute offsets from.
fn check_usable(bpb: &BiosParameterBlock, image_len: u64) -> Result<(), FatError> {
    if bpb.bytes_per_sector == 0 {
        return Err(FatError::InvalidBootSector("bytes per sector is zero".to_string()));
    }
    if bpb.sectors_per_cluster == 0 {
        return Err(FatError::InvalidBootSector("sectors per cluster is zero".to_string()));
    }
    if bpb.num_fats == 0 || bpb.sectors_per_fat() == 0 {
        return Err(FatError::InvalidBootSector("volume has no FAT".to_string()));
    }
    let data_start = bpb.data_start_sector() * bpb.bytes_per_sector as u64;
    if data_start > image_len {
        return Err(FatError::InvalidBootSector(format!(
            "system area ends at byte {} but the image is {} bytes",
            data_start, image_len
        )));
    }
    Ok(())
}
