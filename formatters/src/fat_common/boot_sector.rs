// Boot sector codec for FAT volumes
// Encoding is table driven: each variant is a list of (offset, width, value)
// fields laid over a zeroed sector. Decoding reads whatever bytes are there.

use byteorder::{ByteOrder, LittleEndian};
use fatkit_core::{FatError, FatVariant};
use log::debug;
use super::cluster_calc::VolumeGeometry;
use super::constants::*;

/// Inputs to the boot sector encoder.
#[derive(Debug, Clone)]
pub struct BootSectorParams {
    pub geometry: VolumeGeometry,
    pub oem_name: [u8; 8],
    pub volume_serial: u32,
    pub volume_label: [u8; 11],
}

/// Where the bytes of a field come from.
#[derive(Clone, Copy)]
pub enum FieldValue {
    /// Same on every volume of the variant
    Constant(u64),
    Computed(fn(&BootSectorParams) -> u64),
    Raw(&'static [u8]),
    Text(fn(&BootSectorParams) -> &[u8]),
}

#[derive(Clone, Copy)]
pub struct BpbField {
    pub name: &'static str,
    pub offset: usize,
    pub width: usize,
    pub value: FieldValue,
}

const fn field(name: &'static str, offset: usize, width: usize, value: FieldValue) -> BpbField {
    BpbField { name, offset, width, value }
}

fn bytes_per_sector(p: &BootSectorParams) -> u64 {
    p.geometry.bytes_per_sector as u64
}

fn sectors_per_cluster(p: &BootSectorParams) -> u64 {
    p.geometry.sectors_per_cluster as u64
}

fn reserved_sectors(p: &BootSectorParams) -> u64 {
    p.geometry.reserved_sectors as u64
}

fn num_fats(p: &BootSectorParams) -> u64 {
    p.geometry.num_fats as u64
}

fn root_entries(p: &BootSectorParams) -> u64 {
    p.geometry.root_entries as u64
}

fn media_descriptor(p: &BootSectorParams) -> u64 {
    p.geometry.media_descriptor as u64
}

// The 16-bit count is used only when it fits and the layout is not FAT32.
fn total_sectors_16(p: &BootSectorParams) -> u64 {
    let total = p.geometry.total_sectors;
    if p.geometry.variant != FatVariant::Fat32 && total < 0x10000 {
        total
    } else {
        0
    }
}

fn total_sectors_32(p: &BootSectorParams) -> u64 {
    if total_sectors_16(p) == 0 {
        p.geometry.total_sectors
    } else {
        0
    }
}

fn fat_size_16(p: &BootSectorParams) -> u64 {
    match p.geometry.variant {
        FatVariant::Fat32 => 0,
        _ => p.geometry.sectors_per_fat as u64,
    }
}

fn fat_size_32(p: &BootSectorParams) -> u64 {
    p.geometry.sectors_per_fat as u64
}

fn root_cluster(p: &BootSectorParams) -> u64 {
    p.geometry.root_cluster as u64
}

fn volume_serial(p: &BootSectorParams) -> u64 {
    p.volume_serial as u64
}

fn oem_name(p: &BootSectorParams) -> &[u8] {
    &p.oem_name
}

fn volume_label(p: &BootSectorParams) -> &[u8] {
    &p.volume_label
}

/// Offsets 0..36 plus the trailing signature, shared by every variant.
pub static COMMON_FIELDS: &[BpbField] = &[
    field("oem_name", BS_OEM_NAME, 8, FieldValue::Text(oem_name)),
    field("bytes_per_sector", BPB_BYTES_PER_SEC, 2, FieldValue::Computed(bytes_per_sector)),
    field("sectors_per_cluster", BPB_SEC_PER_CLUS, 1, FieldValue::Computed(sectors_per_cluster)),
    field("reserved_sectors", BPB_RSVD_SEC_CNT, 2, FieldValue::Computed(reserved_sectors)),
    field("num_fats", BPB_NUM_FATS, 1, FieldValue::Computed(num_fats)),
    field("root_entries", BPB_ROOT_ENT_CNT, 2, FieldValue::Computed(root_entries)),
    field("total_sectors_16", BPB_TOT_SEC16, 2, FieldValue::Computed(total_sectors_16)),
    field("media", BPB_MEDIA, 1, FieldValue::Computed(media_descriptor)),
    field("fat_size_16", BPB_FAT_SZ16, 2, FieldValue::Computed(fat_size_16)),
    field("sectors_per_track", BPB_SEC_PER_TRK, 2, FieldValue::Constant(FAKE_SECTORS_PER_TRACK as u64)),
    field("num_heads", BPB_NUM_HEADS, 2, FieldValue::Constant(FAKE_NUM_HEADS as u64)),
    field("hidden_sectors", BPB_HIDD_SEC, 4, FieldValue::Constant(0)),
    field("total_sectors_32", BPB_TOT_SEC32, 4, FieldValue::Computed(total_sectors_32)),
    field("signature", BOOT_SIGNATURE_OFFSET, 2, FieldValue::Raw(&BOOT_SIGNATURE)),
];

pub static FAT16_FIELDS: &[BpbField] = &[
    field("jump", BS_JMP_BOOT, 3, FieldValue::Raw(&FAT16_JUMP)),
    field("drive_number", BS16_DRV_NUM, 1, FieldValue::Constant(DRIVE_NUMBER_HARD_DISK as u64)),
    field("boot_signature", BS16_BOOT_SIG, 1, FieldValue::Constant(EXTENDED_BOOT_SIGNATURE as u64)),
    field("volume_id", BS16_VOL_ID, 4, FieldValue::Computed(volume_serial)),
    field("volume_label", BS16_VOL_LAB, 11, FieldValue::Text(volume_label)),
    field("fs_type", BS16_FIL_SYS_TYPE, 8, FieldValue::Raw(FatVariant::Fat16.fs_type_label())),
];

pub static FAT32_FIELDS: &[BpbField] = &[
    field("jump", BS_JMP_BOOT, 3, FieldValue::Raw(&FAT32_JUMP)),
    field("fat_size_32", BPB_FAT_SZ32, 4, FieldValue::Computed(fat_size_32)),
    field("ext_flags", BPB_EXT_FLAGS, 2, FieldValue::Constant(0)),
    field("fs_version", BPB_FS_VER, 2, FieldValue::Constant(0)),
    field("root_cluster", BPB_ROOT_CLUS, 4, FieldValue::Computed(root_cluster)),
    field("fs_info", BPB_FS_INFO, 2, FieldValue::Constant(FAT32_FS_INFO_SECTOR as u64)),
    field("backup_boot_sector", BPB_BK_BOOT_SEC, 2, FieldValue::Constant(FAT32_BACKUP_BOOT_SECTOR as u64)),
    field("drive_number", BS32_DRV_NUM, 1, FieldValue::Constant(DRIVE_NUMBER_HARD_DISK as u64)),
    field("boot_signature", BS32_BOOT_SIG, 1, FieldValue::Constant(EXTENDED_BOOT_SIGNATURE as u64)),
    field("volume_id", BS32_VOL_ID, 4, FieldValue::Computed(volume_serial)),
    field("volume_label", BS32_VOL_LAB, 11, FieldValue::Text(volume_label)),
    field("fs_type", BS32_FIL_SYS_TYPE, 8, FieldValue::Raw(FatVariant::Fat32.fs_type_label())),
];

/// Variant-specific field table, `None` for variants we never format.
pub fn variant_fields(variant: FatVariant) -> Option<&'static [BpbField]> {
    match variant {
        FatVariant::Fat16 => Some(FAT16_FIELDS),
        FatVariant::Fat32 => Some(FAT32_FIELDS),
        FatVariant::Fat12 => None,
    }
}

fn write_field(sector: &mut [u8; SECTOR_SIZE], field: &BpbField, params: &BootSectorParams) -> Result<(), FatError> {
    let target = &mut sector[field.offset..field.offset + field.width];
    match field.value {
        FieldValue::Constant(value) => write_number(target, field, value),
        FieldValue::Computed(compute) => write_number(target, field, compute(params)),
        FieldValue::Raw(bytes) => write_bytes(target, field, bytes),
        FieldValue::Text(text) => write_bytes(target, field, text(params)),
    }
}

fn write_number(target: &mut [u8], field: &BpbField, value: u64) -> Result<(), FatError> {
    if field.width < 8 && value >> (field.width * 8) != 0 {
        return Err(FatError::InvalidInput(format!(
            "{} = {} does not fit in {} bytes",
            field.name, value, field.width
        )));
    }
    LittleEndian::write_uint(target, value, field.width);
    Ok(())
}

fn write_bytes(target: &mut [u8], field: &BpbField, bytes: &[u8]) -> Result<(), FatError> {
    if bytes.len() != field.width {
        return Err(FatError::InvalidInput(format!(
            "{} is {} bytes, expected {}",
            field.name,
            bytes.len(),
            field.width
        )));
    }
    target.copy_from_slice(bytes);
    Ok(())
}

/// Encode a boot sector for `params.geometry.variant`.
pub fn build_boot_sector(params: &BootSectorParams) -> Result<[u8; SECTOR_SIZE], FatError> {
    let variant = params.geometry.variant;
    let fields = variant_fields(variant)
        .ok_or_else(|| FatError::InvalidInput(format!("No boot sector layout for {}", variant)))?;

    let mut sector = [0u8; SECTOR_SIZE];
    for field in COMMON_FIELDS.iter().chain(fields) {
        write_field(&mut sector, field, params)?;
    }

    debug!("{} boot sector head: {}", variant, hex::encode(&sector[..0x24]));
    Ok(sector)
}

/// Encode an FSInfo sector.
pub fn build_fsinfo_sector(free_count: u32, next_free: u32) -> [u8; SECTOR_SIZE] {
    let mut fsinfo = [0u8; SECTOR_SIZE];
    fsinfo[FSINFO_LEAD_SIG_OFFSET..FSINFO_LEAD_SIG_OFFSET + 4].copy_from_slice(FSINFO_LEAD_SIG);
    fsinfo[FSINFO_STRUC_SIG_OFFSET..FSINFO_STRUC_SIG_OFFSET + 4].copy_from_slice(FSINFO_STRUC_SIG);
    LittleEndian::write_u32(&mut fsinfo[FSINFO_FREE_COUNT..FSINFO_FREE_COUNT + 4], free_count);
    LittleEndian::write_u32(&mut fsinfo[FSINFO_NXT_FREE..FSINFO_NXT_FREE + 4], next_free);
    fsinfo[BOOT_SIGNATURE_OFFSET..].copy_from_slice(&BOOT_SIGNATURE);
    fsinfo
}

/// Decoded FSInfo sector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FsInfo {
    pub lead_signature_ok: bool,
    pub struct_signature_ok: bool,
    pub free_count: u32,
    pub next_free: u32,
}

impl FsInfo {
    pub fn parse(sector: &[u8]) -> Result<Self, FatError> {
        if sector.len() < SECTOR_SIZE {
            return Err(FatError::InvalidBootSector(format!(
                "FSInfo sector is {} bytes",
                sector.len()
            )));
        }
        Ok(Self {
            lead_signature_ok: &sector[FSINFO_LEAD_SIG_OFFSET..FSINFO_LEAD_SIG_OFFSET + 4] == FSINFO_LEAD_SIG,
            struct_signature_ok: &sector[FSINFO_STRUC_SIG_OFFSET..FSINFO_STRUC_SIG_OFFSET + 4] == FSINFO_STRUC_SIG,
            free_count: LittleEndian::read_u32(&sector[FSINFO_FREE_COUNT..]),
            next_free: LittleEndian::read_u32(&sector[FSINFO_NXT_FREE..]),
        })
    }
}

/// Boot parameter block as read from an existing volume.
///
/// Parsing never rejects a sector because of its signature or the values
/// it holds; callers decide what geometry they can work with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BiosParameterBlock {
    pub oem_name: [u8; 8],
    pub bytes_per_sector: u16,
    pub sectors_per_cluster: u8,
    pub reserved_sectors: u16,
    pub num_fats: u8,
    pub root_entries: u16,
    pub total_sectors_16: u16,
    pub media: u8,
    pub sectors_per_fat_16: u16,
    pub sectors_per_track: u16,
    pub num_heads: u16,
    pub hidden_sectors: u32,
    pub total_sectors_32: u32,
    // FAT32 only
    pub sectors_per_fat_32: u32,
    pub root_cluster: u32,
    pub fs_info_sector: u16,
    pub backup_boot_sector: u16,
    // Extended BPB, at the FAT16 or FAT32 position
    pub drive_number: u8,
    pub boot_signature: u8,
    pub volume_serial: u32,
    pub volume_label: [u8; 11],
    pub fs_type: [u8; 8],
    pub signature: [u8; 2],
}

impl BiosParameterBlock {
    pub fn parse(sector: &[u8]) -> Result<Self, FatError> {
        if sector.len() < SECTOR_SIZE {
            return Err(FatError::InvalidBootSector(format!(
                "boot sector is {} bytes, expected {}",
                sector.len(),
                SECTOR_SIZE
            )));
        }

        let sectors_per_fat_16 = LittleEndian::read_u16(&sector[BPB_FAT_SZ16..]);
        let fat32_layout = sectors_per_fat_16 == 0;
        let (sectors_per_fat_32, root_cluster, fs_info_sector, backup_boot_sector) = if fat32_layout {
            (
                LittleEndian::read_u32(&sector[BPB_FAT_SZ32..]),
                LittleEndian::read_u32(&sector[BPB_ROOT_CLUS..]),
                LittleEndian::read_u16(&sector[BPB_FS_INFO..]),
                LittleEndian::read_u16(&sector[BPB_BK_BOOT_SEC..]),
            )
        } else {
            (0, 0, 0, 0)
        };
        let (drv, sig, vol_id, vol_lab, fs_type) = if fat32_layout {
            (BS32_DRV_NUM, BS32_BOOT_SIG, BS32_VOL_ID, BS32_VOL_LAB, BS32_FIL_SYS_TYPE)
        } else {
            (BS16_DRV_NUM, BS16_BOOT_SIG, BS16_VOL_ID, BS16_VOL_LAB, BS16_FIL_SYS_TYPE)
        };

        let mut bpb = Self {
            oem_name: [0; 8],
            bytes_per_sector: LittleEndian::read_u16(&sector[BPB_BYTES_PER_SEC..]),
            sectors_per_cluster: sector[BPB_SEC_PER_CLUS],
            reserved_sectors: LittleEndian::read_u16(&sector[BPB_RSVD_SEC_CNT..]),
            num_fats: sector[BPB_NUM_FATS],
            root_entries: LittleEndian::read_u16(&sector[BPB_ROOT_ENT_CNT..]),
            total_sectors_16: LittleEndian::read_u16(&sector[BPB_TOT_SEC16..]),
            media: sector[BPB_MEDIA],
            sectors_per_fat_16,
            sectors_per_track: LittleEndian::read_u16(&sector[BPB_SEC_PER_TRK..]),
            num_heads: LittleEndian::read_u16(&sector[BPB_NUM_HEADS..]),
            hidden_sectors: LittleEndian::read_u32(&sector[BPB_HIDD_SEC..]),
            total_sectors_32: LittleEndian::read_u32(&sector[BPB_TOT_SEC32..]),
            sectors_per_fat_32,
            root_cluster,
            fs_info_sector,
            backup_boot_sector,
            drive_number: sector[drv],
            boot_signature: sector[sig],
            volume_serial: LittleEndian::read_u32(&sector[vol_id..]),
            volume_label: [0; 11],
            fs_type: [0; 8],
            signature: [sector[BOOT_SIGNATURE_OFFSET], sector[BOOT_SIGNATURE_OFFSET + 1]],
        };
        bpb.oem_name.copy_from_slice(&sector[BS_OEM_NAME..BS_OEM_NAME + 8]);
        bpb.volume_label.copy_from_slice(&sector[vol_lab..vol_lab + 11]);
        bpb.fs_type.copy_from_slice(&sector[fs_type..fs_type + 8]);

        debug!(
            "Decoded BPB: {} bytes/sector, {} sectors/cluster, {} reserved, {} FATs of {} sectors, {} total sectors",
            bpb.bytes_per_sector,
            bpb.sectors_per_cluster,
            bpb.reserved_sectors,
            bpb.num_fats,
            bpb.sectors_per_fat(),
            bpb.total_sectors()
        );
        Ok(bpb)
    }

    pub fn total_sectors(&self) -> u64 {
        if self.total_sectors_16 != 0 {
            self.total_sectors_16 as u64
        } else {
            self.total_sectors_32 as u64
        }
    }

    pub fn sectors_per_fat(&self) -> u32 {
        if self.sectors_per_fat_16 != 0 {
            self.sectors_per_fat_16 as u32
        } else {
            self.sectors_per_fat_32
        }
    }

    pub fn has_boot_signature(&self) -> bool {
        self.signature == BOOT_SIGNATURE
    }

    pub fn root_dir_sectors(&self) -> u32 {
        let bps = self.bytes_per_sector as u32;
        if bps == 0 {
            return 0;
        }
        (self.root_entries as u32 * DIR_ENTRY_SIZE as u32 + bps - 1) / bps
    }

    pub fn fat_start_sector(&self) -> u64 {
        self.reserved_sectors as u64
    }

    pub fn root_dir_start_sector(&self) -> u64 {
        self.fat_start_sector() + self.num_fats as u64 * self.sectors_per_fat() as u64
    }

    pub fn data_start_sector(&self) -> u64 {
        self.root_dir_start_sector() + self.root_dir_sectors() as u64
    }

    pub fn cluster_count(&self) -> u32 {
        if self.sectors_per_cluster == 0 {
            return 0;
        }
        let data_sectors = self.total_sectors().saturating_sub(self.data_start_sector());
        (data_sectors / self.sectors_per_cluster as u64).min(u32::MAX as u64) as u32
    }

    /// Variant by cluster count; a FAT32-shaped BPB is always FAT32.
    pub fn variant(&self) -> FatVariant {
        if self.sectors_per_fat_16 == 0 && self.root_entries == 0 {
            FatVariant::Fat32
        } else {
            FatVariant::from_cluster_count(self.cluster_count())
        }
    }

    pub fn to_geometry(&self) -> VolumeGeometry {
        VolumeGeometry {
            variant: self.variant(),
            bytes_per_sector: self.bytes_per_sector,
            sectors_per_cluster: self.sectors_per_cluster,
            reserved_sectors: self.reserved_sectors,
            num_fats: self.num_fats,
            sectors_per_fat: self.sectors_per_fat(),
            total_sectors: self.total_sectors(),
            root_entries: self.root_entries,
            root_cluster: self.root_cluster,
            media_descriptor: self.media,
            cluster_count: self.cluster_count(),
        }
    }

    pub fn oem_name_str(&self) -> String {
        String::from_utf8_lossy(&self.oem_name).trim_end().to_string()
    }

    pub fn volume_label_str(&self) -> String {
        String::from_utf8_lossy(&self.volume_label).trim_end().to_string()
    }

    pub fn fs_type_str(&self) -> String {
        String::from_utf8_lossy(&self.fs_type).trim_end().to_string()
    }
}
