// Geometry calculation for new FAT volumes
// Picks sectors/cluster and settles the FAT size against the cluster count

use fatkit_core::{FatError, FatVariant};
use log::{debug, info};
use super::constants::*;

/// Upper bound on FAT-size recomputation passes.
pub const MAX_CONVERGENCE_PASSES: usize = 16;

const FAT16_CLUSTER_CANDIDATES: &[u8] = &[1, 2, 4, 8, 16, 32, 64];
const FAT32_CLUSTER_CANDIDATES: &[u8] = &[1, 2, 4, 8, 16, 32, 64, 128];

/// Layout of a volume, fixed once calculated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VolumeGeometry {
    pub variant: FatVariant,
    pub bytes_per_sector: u16,
    pub sectors_per_cluster: u8,
    pub reserved_sectors: u16,
    pub num_fats: u8,
    pub sectors_per_fat: u32,
    pub total_sectors: u64,
    /// 0 for FAT32
    pub root_entries: u16,
    /// Only meaningful for FAT32
    pub root_cluster: u32,
    pub media_descriptor: u8,
    pub cluster_count: u32,
}

impl VolumeGeometry {
    pub fn root_dir_sectors(&self) -> u32 {
        let bps = self.bytes_per_sector as u32;
        (self.root_entries as u32 * DIR_ENTRY_SIZE as u32 + bps - 1) / bps
    }

    pub fn fat_start_sector(&self) -> u64 {
        self.reserved_sectors as u64
    }

    pub fn root_dir_start_sector(&self) -> u64 {
        self.fat_start_sector() + self.num_fats as u64 * self.sectors_per_fat as u64
    }

    pub fn data_start_sector(&self) -> u64 {
        self.root_dir_start_sector() + self.root_dir_sectors() as u64
    }

    pub fn data_sectors(&self) -> u64 {
        self.total_sectors.saturating_sub(self.data_start_sector())
    }

    pub fn bytes_per_cluster(&self) -> u32 {
        self.bytes_per_sector as u32 * self.sectors_per_cluster as u32
    }

    pub fn total_bytes(&self) -> u64 {
        self.total_sectors * self.bytes_per_sector as u64
    }

    /// Check the invariants every formatted volume must satisfy.
    pub fn validate(&self) -> Result<(), String> {
        let overhead = self.data_start_sector();
        if overhead > self.total_sectors {
            return Err(format!(
                "system area of {} sectors exceeds the {} sector volume",
                overhead, self.total_sectors
            ));
        }
        let data_sectors = self.total_sectors - overhead;
        debug_assert_eq!(
            self.reserved_sectors as u64
                + self.num_fats as u64 * self.sectors_per_fat as u64
                + self.root_dir_sectors() as u64
                + data_sectors,
            self.total_sectors
        );

        let clusters = data_sectors / self.sectors_per_cluster as u64;
        if clusters != self.cluster_count as u64 {
            return Err(format!(
                "cluster count {} does not match the {} data sectors",
                self.cluster_count, data_sectors
            ));
        }

        let (min, max) = self.variant.cluster_range();
        if self.cluster_count < min || self.cluster_count > max {
            return Err(format!(
                "{} clusters is outside the {} range {}..={}",
                self.cluster_count, self.variant, min, max
            ));
        }

        let needed = self.variant.table_bytes(self.cluster_count as u64 + 2);
        let available = self.sectors_per_fat as u64 * self.bytes_per_sector as u64;
        if needed > available {
            return Err(format!(
                "a FAT of {} sectors cannot hold {} clusters",
                self.sectors_per_fat, self.cluster_count
            ));
        }
        Ok(())
    }
}

struct VariantLayout {
    reserved_sectors: u16,
    root_entries: u16,
    root_cluster: u32,
    candidates: &'static [u8],
}

fn layout_for(variant: FatVariant) -> Option<VariantLayout> {
    match variant {
        FatVariant::Fat16 => Some(VariantLayout {
            reserved_sectors: FAT16_RESERVED_SECTORS,
            root_entries: FAT16_ROOT_ENTRIES,
            root_cluster: 0,
            candidates: FAT16_CLUSTER_CANDIDATES,
        }),
        FatVariant::Fat32 => Some(VariantLayout {
            reserved_sectors: FAT32_RESERVED_SECTORS,
            root_entries: 0,
            root_cluster: FAT32_ROOT_CLUSTER,
            candidates: FAT32_CLUSTER_CANDIDATES,
        }),
        FatVariant::Fat12 => None,
    }
}

/// Calculate the geometry of a new `variant` volume of `size_mb` MiB.
///
/// The smallest sectors/cluster whose settled cluster count is valid for the
/// variant wins.
pub fn calculate_geometry(variant: FatVariant, size_mb: u32) -> Result<VolumeGeometry, FatError> {
    calculate_geometry_with(variant, size_mb, MAX_CONVERGENCE_PASSES)
}

fn calculate_geometry_with(variant: FatVariant, size_mb: u32, max_passes: usize) -> Result<VolumeGeometry, FatError> {
    let layout = layout_for(variant)
        .ok_or_else(|| FatError::geometry(variant, size_mb, "formatting is not supported for this variant"))?;

    if size_mb == 0 {
        return Err(FatError::geometry(variant, size_mb, "capacity must be at least 1 MiB"));
    }

    let total_sectors = size_mb as u64 * 1024 * 1024 / SECTOR_SIZE as u64;
    if total_sectors > u32::MAX as u64 {
        return Err(FatError::geometry(
            variant,
            size_mb,
            format!("{} sectors do not fit the 32-bit sector count", total_sectors),
        ));
    }

    let root_dir_sectors =
        (layout.root_entries as u64 * DIR_ENTRY_SIZE as u64 + SECTOR_SIZE as u64 - 1) / SECTOR_SIZE as u64;
    let fixed_sectors = layout.reserved_sectors as u64 + root_dir_sectors;
    let (min, max) = variant.cluster_range();

    let mut last_reason = String::from("no candidate cluster size");
    for &spc in layout.candidates {
        let (sectors_per_fat, cluster_count) = match settle_fat_size(variant, total_sectors, fixed_sectors, spc, max_passes) {
            Ok(settled) => settled,
            Err(reason) => {
                last_reason = reason;
                continue;
            }
        };

        if (cluster_count as u64) < min as u64 || cluster_count as u64 > max as u64 {
            debug!(
                "{}: {} sectors/cluster gives {} clusters, outside {}..={}",
                variant, spc, cluster_count, min, max
            );
            last_reason = format!("{} sectors/cluster gives {} clusters", spc, cluster_count);
            continue;
        }

        let geometry = VolumeGeometry {
            variant,
            bytes_per_sector: STANDARD_BYTES_PER_SECTOR,
            sectors_per_cluster: spc,
            reserved_sectors: layout.reserved_sectors,
            num_fats: NUM_FATS,
            sectors_per_fat: sectors_per_fat as u32,
            total_sectors,
            root_entries: layout.root_entries,
            root_cluster: layout.root_cluster,
            media_descriptor: MEDIA_FIXED,
            cluster_count: cluster_count as u32,
        };
        geometry
            .validate()
            .map_err(|reason| FatError::geometry(variant, size_mb, reason))?;

        info!(
            "{} geometry: {} MiB, {} sectors, {} sectors/cluster, {} clusters, {} sectors/FAT",
            variant, size_mb, total_sectors, spc, cluster_count, sectors_per_fat
        );
        return Ok(geometry);
    }

    Err(FatError::geometry(
        variant,
        size_mb,
        format!(
            "no sectors/cluster in {:?} yields {}..={} clusters (last: {})",
            layout.candidates, min, max, last_reason
        ),
    ))
}

/// Fixed-point search for the FAT size.
///
/// The FAT size depends on the cluster count and the cluster count on the
/// FAT size. The first estimate ignores the FATs entirely; each pass then
/// recomputes.
fn settle_fat_size(
    variant: FatVariant,
    total_sectors: u64,
    fixed_sectors: u64,
    sectors_per_cluster: u8,
    max_passes: usize,
) -> Result<(u64, u64), String> {
    if fixed_sectors >= total_sectors {
        return Err(format!(
            "reserved and root directory regions need {} of {} sectors",
            fixed_sectors, total_sectors
        ));
    }

    let clusters_for = |sectors_per_fat: u64| -> u64 {
        total_sectors.saturating_sub(fixed_sectors + NUM_FATS as u64 * sectors_per_fat)
            / sectors_per_cluster as u64
    };
    let fat_size_for = |clusters: u64| -> u64 {
        let bytes = variant.table_bytes(clusters + 2);
        (bytes + SECTOR_SIZE as u64 - 1) / SECTOR_SIZE as u64
    };

    let start = fat_size_for(clusters_for(0));
    let (sectors_per_fat, passes) =
        settle_fixed_point(start, max_passes, |spf| fat_size_for(clusters_for(spf))).ok_or_else(|| {
            format!(
                "FAT size did not settle within {} passes ({} sectors/cluster)",
                max_passes, sectors_per_cluster
            )
        })?;

    debug!(
        "{}: FAT size settled at {} sectors after {} passes ({} sectors/cluster)",
        variant, sectors_per_fat, passes, sectors_per_cluster
    );
    Ok((sectors_per_fat, clusters_for(sectors_per_fat)))
}

/// Apply `step` from `start` until it returns its input or flips back to the
/// value before. Of a flipping pair the larger wins, since only it covers
/// every cluster. `None` once `max_passes` run out.
fn settle_fixed_point(start: u64, max_passes: usize, step: impl Fn(u64) -> u64) -> Option<(u64, usize)> {
    let mut current = start;
    let mut previous = None;
    for pass in 1..=max_passes {
        let next = step(current);
        if next == current || previous == Some(next) {
            return Some((current.max(next), pass));
        }
        previous = Some(current);
        current = next;
    }
    None
}
