// Human-readable renderings for the one-shot commands

use fatkit_core::FormatReport;
use fatkit_formatters::{BiosParameterBlock, DirEntry};
use std::io::{self, Write};

pub fn format_serial(serial: u32) -> String {
    format!("{:04X}-{:04X}", serial >> 16, serial & 0xFFFF)
}

pub fn write_report<W: Write>(out: &mut W, image: &str, report: &FormatReport) -> io::Result<()> {
    writeln!(out, "Formatted {} as {} ({} MiB)", image, report.variant, report.size_mb)?;
    writeln!(out, "  Total sectors:       {}", report.total_sectors)?;
    writeln!(out, "  Sectors per cluster: {}", report.sectors_per_cluster)?;
    writeln!(out, "  Clusters:            {}", report.cluster_count)?;
    writeln!(out, "  Sectors per FAT:     {}", report.sectors_per_fat)?;
    writeln!(out, "  Reserved sectors:    {}", report.reserved_sectors)?;
    if report.root_entries > 0 {
        writeln!(out, "  Root entries:        {} ({} sectors)", report.root_entries, report.root_dir_sectors)?;
    }
    writeln!(out, "  Data starts at:      sector {}", report.data_start_sector)?;
    writeln!(out, "  Volume serial:       {}", format_serial(report.volume_serial))?;
    writeln!(out, "  Volume label:        {}", report.volume_label)?;
    Ok(())
}

/// Root listing in the style of `mdir`.
pub fn write_listing<W: Write>(out: &mut W, image: &str, entries: &[DirEntry]) -> io::Result<()> {
    writeln!(out, " Directory of {}", image)?;
    writeln!(out)?;
    for entry in entries {
        writeln!(out, "{:12} {:6} {:8} bytes", entry.name, entry.flags(), entry.size)?;
    }
    writeln!(out)?;
    writeln!(out, "{} file(s)", entries.len())?;
    Ok(())
}

pub fn write_boot_sector<W: Write>(out: &mut W, image: &str, bpb: &BiosParameterBlock) -> io::Result<()> {
    writeln!(out, "{}: {} volume", image, bpb.variant())?;
    writeln!(out, "  OEM name:            {}", bpb.oem_name_str())?;
    writeln!(out, "  Bytes per sector:    {}", bpb.bytes_per_sector)?;
    writeln!(out, "  Sectors per cluster: {}", bpb.sectors_per_cluster)?;
    writeln!(out, "  Reserved sectors:    {}", bpb.reserved_sectors)?;
    writeln!(out, "  FATs:                {} x {} sectors", bpb.num_fats, bpb.sectors_per_fat())?;
    writeln!(out, "  Root entries:        {}", bpb.root_entries)?;
    writeln!(out, "  Total sectors:       {}", bpb.total_sectors())?;
    writeln!(out, "  Media descriptor:    {:#04X}", bpb.media)?;
    writeln!(out, "  Clusters:            {}", bpb.cluster_count())?;
    writeln!(out, "  Data starts at:      sector {}", bpb.data_start_sector())?;
    if bpb.root_cluster != 0 {
        writeln!(out, "  Root cluster:        {}", bpb.root_cluster)?;
        writeln!(out, "  FSInfo sector:       {}", bpb.fs_info_sector)?;
        writeln!(out, "  Backup boot sector:  {}", bpb.backup_boot_sector)?;
    }
    writeln!(out, "  Volume serial:       {}", format_serial(bpb.volume_serial))?;
    writeln!(out, "  Volume label:        {}", bpb.volume_label_str())?;
    writeln!(out, "  File system type:    {}", bpb.fs_type_str())?;
    if !bpb.has_boot_signature() {
        writeln!(out, "  Warning: boot signature 0x55AA missing")?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(name: &str, attributes: u8, size: u32) -> DirEntry {
        DirEntry {
            name: name.to_string(),
            attributes,
            first_cluster: 2,
            size,
        }
    }

    #[test]
    fn test_serial_format() {
        assert_eq!(format_serial(0x1234_ABCD), "1234-ABCD");
        assert_eq!(format_serial(0x0000_00FF), "0000-00FF");
    }

    #[test]
    fn test_listing() {
        let mut out = Vec::new();
        let entries = [entry("README.TXT", 0x21, 600), entry("GAMES", 0x10, 0)];
        write_listing(&mut out, "disk.img", &entries).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(
            text,
            " Directory of disk.img\n\n\
             README.TXT   RA          600 bytes\n\
             GAMES        D             0 bytes\n\
             \n2 file(s)\n"
        );
    }

    #[test]
    fn test_empty_listing() {
        let mut out = Vec::new();
        write_listing(&mut out, "empty.img", &[]).unwrap();
        assert!(String::from_utf8(out).unwrap().ends_with("\n0 file(s)\n"));
    }
}
