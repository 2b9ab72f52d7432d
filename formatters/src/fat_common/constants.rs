// FAT on-disk constants shared by the formatter and the navigator

use static_assertions::const_assert_eq;

// Boot sector offsets
pub const BS_JMP_BOOT: usize = 0x00;
pub const BS_OEM_NAME: usize = 0x03;
pub const BPB_BYTES_PER_SEC: usize = 0x0B;
pub const BPB_SEC_PER_CLUS: usize = 0x0D;
pub const BPB_RSVD_SEC_CNT: usize = 0x0E;
pub const BPB_NUM_FATS: usize = 0x10;
pub const BPB_ROOT_ENT_CNT: usize = 0x11;
pub const BPB_TOT_SEC16: usize = 0x13;
pub const BPB_MEDIA: usize = 0x15;
pub const BPB_FAT_SZ16: usize = 0x16;
pub const BPB_SEC_PER_TRK: usize = 0x18;
pub const BPB_NUM_HEADS: usize = 0x1A;
pub const BPB_HIDD_SEC: usize = 0x1C;
pub const BPB_TOT_SEC32: usize = 0x20;

// FAT12/16 extended BPB (starts at 36)
pub const BS16_DRV_NUM: usize = 0x24;
pub const BS16_BOOT_SIG: usize = 0x26;
pub const BS16_VOL_ID: usize = 0x27;
pub const BS16_VOL_LAB: usize = 0x2B;
pub const BS16_FIL_SYS_TYPE: usize = 0x36;

// FAT32 extended BPB (starts at 36)
pub const BPB_FAT_SZ32: usize = 0x24;
pub const BPB_EXT_FLAGS: usize = 0x28;
pub const BPB_FS_VER: usize = 0x2A;
pub const BPB_ROOT_CLUS: usize = 0x2C;
pub const BPB_FS_INFO: usize = 0x30;
pub const BPB_BK_BOOT_SEC: usize = 0x32;
pub const BS32_DRV_NUM: usize = 0x40;
pub const BS32_BOOT_SIG: usize = 0x42;
pub const BS32_VOL_ID: usize = 0x43;
pub const BS32_VOL_LAB: usize = 0x47;
pub const BS32_FIL_SYS_TYPE: usize = 0x52;

// Boot sector signature
pub const BOOT_SIGNATURE: [u8; 2] = [0x55, 0xAA];
pub const BOOT_SIGNATURE_OFFSET: usize = 0x1FE;

// FSInfo sector
pub const FSINFO_LEAD_SIG: &[u8; 4] = b"RRaA";
pub const FSINFO_STRUC_SIG: &[u8; 4] = b"rrAa";
pub const FSINFO_LEAD_SIG_OFFSET: usize = 0;
pub const FSINFO_STRUC_SIG_OFFSET: usize = 484;
pub const FSINFO_FREE_COUNT: usize = 488;
pub const FSINFO_NXT_FREE: usize = 492;
pub const FSINFO_UNKNOWN: u32 = 0xFFFF_FFFF;

// Jump stubs
pub const FAT16_JUMP: [u8; 3] = [0xEB, 0x3C, 0x90];
pub const FAT32_JUMP: [u8; 3] = [0xEB, 0x58, 0x90];

// Standard values
pub const SECTOR_SIZE: usize = 512;
pub const STANDARD_BYTES_PER_SECTOR: u16 = 512;
pub const NUM_FATS: u8 = 2;
pub const MEDIA_FIXED: u8 = 0xF8;
pub const FAKE_SECTORS_PER_TRACK: u16 = 63;
pub const FAKE_NUM_HEADS: u16 = 255;
pub const DRIVE_NUMBER_HARD_DISK: u8 = 0x80;
pub const EXTENDED_BOOT_SIGNATURE: u8 = 0x29;

pub const FAT16_RESERVED_SECTORS: u16 = 1;
pub const FAT16_ROOT_ENTRIES: u16 = 512;
pub const FAT32_RESERVED_SECTORS: u16 = 32;
pub const FAT32_ROOT_CLUSTER: u32 = 2;
pub const FAT32_FS_INFO_SECTOR: u16 = 1;
pub const FAT32_BACKUP_BOOT_SECTOR: u16 = 6;

// Directory entries
pub const DIR_ENTRY_SIZE: usize = 32;
pub const DIR_ENTRY_END: u8 = 0x00;
pub const DIR_ENTRY_DELETED: u8 = 0xE5;
/// A leading 0x05 stands for a real 0xE5 name byte.
pub const DIR_ENTRY_KANJI_E5: u8 = 0x05;
pub const DIR_NAME: usize = 0;
pub const DIR_EXT: usize = 8;
pub const DIR_ATTR: usize = 11;
pub const DIR_FST_CLUS_HI: usize = 20;
pub const DIR_FST_CLUS_LO: usize = 26;
pub const DIR_FILE_SIZE: usize = 28;

const_assert_eq!(SECTOR_SIZE, STANDARD_BYTES_PER_SECTOR as usize);
const_assert_eq!(SECTOR_SIZE % DIR_ENTRY_SIZE, 0);
const_assert_eq!(BOOT_SIGNATURE_OFFSET + 2, SECTOR_SIZE);
