// Filesystem geometry as seen by the sector mapper
// The FAT driver implements this; tests use a table-backed mock

use crate::{FatsectError, Result};

/// The only sector size the mapper accepts
pub const SECTOR_SIZE: u64 = 512;

/// Reject any geometry whose sectors are not 512 bytes
pub fn check_sector_size<G: ClusterGeometry + ?Sized>(geometry: &G) -> Result<()> {
    match geometry.bytes_per_sector() {
        512 => Ok(()),
        other => Err(FatsectError::UnsupportedSectorSize(other)),
    }
}

/// Cluster layout of an opened filesystem.
///
/// Addresses are byte offsets relative to the start of the filesystem, not
/// the start of the disk image. The disk origin is applied separately by the
/// mapper.
pub trait ClusterGeometry {
    /// Bytes per sector as reported by the boot sector
    fn bytes_per_sector(&self) -> u16;

    /// Sectors per cluster (always at least 1)
    fn sectors_per_cluster(&self) -> u32;

    /// Byte offset of the first byte of `cluster` in the data region
    fn data_cluster_address(&self, cluster: u32) -> u64;
}

impl<G: ClusterGeometry + ?Sized> ClusterGeometry for &G {
    fn bytes_per_sector(&self) -> u16 {
        (**self).bytes_per_sector()
    }

    fn sectors_per_cluster(&self) -> u32 {
        (**self).sectors_per_cluster()
    }

    fn data_cluster_address(&self, cluster: u32) -> u64 {
        (**self).data_cluster_address(cluster)
    }
}
