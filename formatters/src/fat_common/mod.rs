// Shared FAT building blocks: on-disk constants, geometry, and the boot
// sector, FAT and directory codecs.

pub mod boot_sector;
pub mod cluster_calc;
pub mod cluster_io;
pub mod constants;
pub mod directory;
pub mod fat_table;

pub use boot_sector::{build_boot_sector, build_fsinfo_sector, BiosParameterBlock, BootSectorParams, FsInfo};
pub use cluster_calc::{calculate_geometry, VolumeGeometry};
pub use constants::*;
pub use directory::{attribute_flags, parse_directory, DirEntry};
pub use fat_table::{reserved_header, FatTable};
