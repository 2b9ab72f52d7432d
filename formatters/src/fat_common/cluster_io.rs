// Positioned reads and writes against an image
// Every transfer seeks first, so callers never depend on the cursor.

use fatkit_core::FatError;
use log::trace;
use std::io::{Read, Seek, SeekFrom, Write};

/// Byte offset of a cluster in the data region (clusters start at 2).
pub fn cluster_to_offset(
    cluster: u32,
    sectors_per_cluster: u32,
    bytes_per_sector: u32,
    data_start_offset: u64,
) -> u64 {
    let cluster_offset = (cluster - 2) as u64 * sectors_per_cluster as u64 * bytes_per_sector as u64;
    data_start_offset + cluster_offset
}

/// Read `len` bytes at `offset`.
pub fn read_block<R: Read + Seek>(reader: &mut R, offset: u64, len: usize) -> Result<Vec<u8>, FatError> {
    reader.seek(SeekFrom::Start(offset))?;
    let mut buffer = vec![0u8; len];
    reader.read_exact(&mut buffer)?;
    Ok(buffer)
}

pub fn write_block<W: Write + Seek>(writer: &mut W, offset: u64, data: &[u8]) -> Result<(), FatError> {
    writer.seek(SeekFrom::Start(offset))?;
    writer.write_all(data)?;
    Ok(())
}

/// Read a single cluster.
pub fn read_cluster<R: Read + Seek>(
    reader: &mut R,
    cluster: u32,
    sectors_per_cluster: u32,
    bytes_per_sector: u32,
    data_start_offset: u64,
) -> Result<Vec<u8>, FatError> {
    if cluster < 2 {
        return Err(FatError::corrupt_chain(cluster, "not a data cluster"));
    }

    let offset = cluster_to_offset(cluster, sectors_per_cluster, bytes_per_sector, data_start_offset);
    let cluster_size = sectors_per_cluster * bytes_per_sector;

    trace!("Reading cluster {} at offset {:#x}, size: {} bytes", cluster, offset, cluster_size);
    read_block(reader, offset, cluster_size as usize)
}

/// Read and concatenate the clusters of a chain.
pub fn read_cluster_chain<R: Read + Seek>(
    reader: &mut R,
    clusters: &[u32],
    sectors_per_cluster: u32,
    bytes_per_sector: u32,
    data_start_offset: u64,
) -> Result<Vec<u8>, FatError> {
    let cluster_size = (sectors_per_cluster * bytes_per_sector) as usize;
    let mut result = Vec::with_capacity(clusters.len() * cluster_size);

    for &cluster in clusters {
        let data = read_cluster(reader, cluster, sectors_per_cluster, bytes_per_sector, data_start_offset)?;
        result.extend_from_slice(&data);
    }

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_cluster_to_offset() {
        let offset = cluster_to_offset(2, 8, 512, 0x100000);
        assert_eq!(offset, 0x100000);

        let offset = cluster_to_offset(3, 8, 512, 0x100000);
        assert_eq!(offset, 0x101000);
    }

    #[test]
    fn test_read_cluster_chain_concatenates_in_chain_order() {
        let mut image = vec![0u8; 4 * 512];
        image[512..1024].fill(b'a'); // cluster 3
        image[1024..1536].fill(b'b'); // cluster 4
        let mut cursor = Cursor::new(image);

        let data = read_cluster_chain(&mut cursor, &[4, 3], 1, 512, 0).unwrap();
        assert_eq!(data.len(), 1024);
        assert!(data[..512].iter().all(|&b| b == b'b'));
        assert!(data[512..].iter().all(|&b| b == b'a'));
    }

    #[test]
    fn test_reserved_cluster_is_rejected() {
        let mut cursor = Cursor::new(vec![0u8; 1024]);
        assert!(read_cluster(&mut cursor, 1, 1, 512, 0).is_err());
    }

    #[test]
    fn test_read_past_end_is_io_error() {
        let mut cursor = Cursor::new(vec![0u8; 100]);
        assert!(matches!(read_block(&mut cursor, 64, 64), Err(FatError::IoError(_))));
    }
}
