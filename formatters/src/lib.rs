pub mod fat_common;
pub mod formatter;
pub mod navigator;

pub use fat_common::{BiosParameterBlock, DirEntry, FatTable, FsInfo, VolumeGeometry};
pub use formatter::FatFormatter;
pub use navigator::{FatNavigator, FileContents};
