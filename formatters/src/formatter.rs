// FAT16/FAT32 image formatter
// Lays a fresh, empty volume over a sparse image file.

use fatkit_core::{FatError, FatVariant, FormatOptions, FormatReport};
use log::{debug, info};
use std::fs::OpenOptions;
use std::io::{Seek, Write};
use std::path::Path;
use crate::fat_common::cluster_io::{cluster_to_offset, write_block};
use crate::fat_common::{
    build_boot_sector, build_fsinfo_sector, calculate_geometry, reserved_header, BootSectorParams,
    VolumeGeometry, FAT32_BACKUP_BOOT_SECTOR, FAT32_FS_INFO_SECTOR, FSINFO_UNKNOWN, SECTOR_SIZE,
};

pub struct FatFormatter {
    variant: FatVariant,
}

impl FatFormatter {
    pub fn new(variant: FatVariant) -> Self {
        Self { variant }
    }

    pub fn variant(&self) -> FatVariant {
        self.variant
    }

    pub fn name(&self) -> &'static str {
        match self.variant {
            FatVariant::Fat12 => "FAT12 image",
            FatVariant::Fat16 => "FAT16 image",
            FatVariant::Fat32 => "FAT32 image",
        }
    }

    pub fn validate_options(&self, options: &FormatOptions) -> Result<(), FatError> {
        if options.variant != self.variant {
            return Err(FatError::InvalidInput(format!(
                "{} options given to the {} formatter",
                options.variant,
                self.name()
            )));
        }
        options.volume_label_bytes()?;
        options.oem_name_bytes()?;
        Ok(())
    }

    /// Work out the layout without touching any file.
    pub fn dry_run(&self, options: &FormatOptions) -> Result<FormatReport, FatError> {
        let (params, report) = self.prepare(options)?;
        debug!("Dry run for {}: {:?}", self.name(), params.geometry);
        Ok(report)
    }

    /// Create (or truncate) `path` and format it.
    pub fn format(&self, path: &Path, options: &FormatOptions) -> Result<FormatReport, FatError> {
        // Geometry errors must surface before the file is touched
        let (params, report) = self.prepare(options)?;

        info!("Creating {} at {}", self.name(), path.display());
        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)?;

        write_volume(&mut file, &params)?;
        file.sync_all()?;

        info!("{} formatted: {} clusters of {} bytes", self.name(), report.cluster_count, params.geometry.bytes_per_cluster());
        Ok(report)
    }

    /// Format into any seekable writer.
    pub fn write_image<W: Write + Seek>(&self, writer: &mut W, options: &FormatOptions) -> Result<FormatReport, FatError> {
        let (params, report) = self.prepare(options)?;
        write_volume(writer, &params)?;
        writer.flush()?;
        Ok(report)
    }

    fn prepare(&self, options: &FormatOptions) -> Result<(BootSectorParams, FormatReport), FatError> {
        self.validate_options(options)?;
        let geometry = calculate_geometry(self.variant, options.size_mb)?;
        let params = BootSectorParams {
            oem_name: options.oem_name_bytes()?,
            volume_serial: options.resolve_serial(),
            volume_label: options.volume_label_bytes()?,
            geometry,
        };
        let report = build_report(options.size_mb, &params);
        Ok((params, report))
    }
}

fn build_report(size_mb: u32, params: &BootSectorParams) -> FormatReport {
    let g = &params.geometry;
    FormatReport {
        variant: g.variant,
        size_mb,
        total_sectors: g.total_sectors,
        sectors_per_cluster: g.sectors_per_cluster,
        cluster_count: g.cluster_count,
        sectors_per_fat: g.sectors_per_fat,
        reserved_sectors: g.reserved_sectors,
        root_entries: g.root_entries,
        root_dir_sectors: g.root_dir_sectors(),
        data_start_sector: g.data_start_sector(),
        volume_serial: params.volume_serial,
        volume_label: String::from_utf8_lossy(&params.volume_label).trim_end().to_string(),
    }
}

fn sector_offset(sector: u64) -> u64 {
    sector * SECTOR_SIZE as u64
}

/// The ordered write sequence. Regions not written stay zero because the
/// image starts out empty and is extended sparsely.
fn write_volume<W: Write + Seek>(writer: &mut W, params: &BootSectorParams) -> Result<(), FatError> {
    let geometry = &params.geometry;
    let variant = geometry.variant;

    // 1. Extend to the full size with a single byte at the end
    debug!("Extending image to {} bytes", geometry.total_bytes());
    write_block(writer, geometry.total_bytes() - 1, &[0u8])?;

    // 2. Boot sector
    let boot_sector = build_boot_sector(params)?;
    debug!("Writing boot sector");
    write_block(writer, 0, &boot_sector)?;

    // 3. FSInfo and the backup copies
    if variant == FatVariant::Fat32 {
        let fsinfo = build_fsinfo_sector(FSINFO_UNKNOWN, FSINFO_UNKNOWN);
        debug!("Writing FSInfo at sector {}", FAT32_FS_INFO_SECTOR);
        write_block(writer, sector_offset(FAT32_FS_INFO_SECTOR as u64), &fsinfo)?;

        let backup = FAT32_BACKUP_BOOT_SECTOR as u64;
        debug!("Writing backup boot sector at sector {}", backup);
        write_block(writer, sector_offset(backup), &boot_sector)?;
        write_block(writer, sector_offset(backup + 1), &fsinfo)?;
    }

    // 4. Reserved entries at the head of every FAT copy
    let root_cluster = (variant == FatVariant::Fat32).then_some(geometry.root_cluster);
    let fat_header = reserved_header(variant, geometry.media_descriptor, root_cluster)?;
    for copy in 0..geometry.num_fats as u64 {
        let sector = geometry.fat_start_sector() + copy * geometry.sectors_per_fat as u64;
        debug!("Writing FAT {} header at sector {}", copy + 1, sector);
        write_block(writer, sector_offset(sector), &fat_header)?;
    }

    // 5. Empty root directory
    let (root_offset, root_sectors) = root_dir_region(geometry);
    debug!("Zeroing {} root directory sectors at {:#x}", root_sectors, root_offset);
    let zero = [0u8; SECTOR_SIZE];
    for i in 0..root_sectors {
        write_block(writer, root_offset + i * SECTOR_SIZE as u64, &zero)?;
    }

    Ok(())
}

fn root_dir_region(geometry: &VolumeGeometry) -> (u64, u64) {
    match geometry.variant {
        FatVariant::Fat32 => {
            let offset = cluster_to_offset(
                geometry.root_cluster,
                geometry.sectors_per_cluster as u32,
                geometry.bytes_per_sector as u32,
                sector_offset(geometry.data_start_sector()),
            );
            (offset, geometry.sectors_per_cluster as u64)
        }
        _ => (
            sector_offset(geometry.root_dir_start_sector()),
            geometry.root_dir_sectors() as u64,
        ),
    }
}
