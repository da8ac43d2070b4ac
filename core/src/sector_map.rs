// Cluster chain to absolute sector expansion

use crate::geometry::check_sector_size;
use crate::{ClusterGeometry, FatsectError, Result, SECTOR_SIZE};
use log::debug;

/// Expand a cluster chain into the absolute sectors it occupies.
///
/// Sectors come out in chain order, then in increasing order within each
/// cluster. `origin_sectors` is added to every sector so the result is
/// relative to the start of the disk image rather than the filesystem.
pub fn map_sectors<G>(chain: &[u32], geometry: &G, origin_sectors: u64) -> Result<Vec<u64>>
where
    G: ClusterGeometry + ?Sized,
{
    check_sector_size(geometry)?;

    let per_cluster = geometry.sectors_per_cluster() as u64;
    let mut sectors = Vec::with_capacity(chain.len().saturating_mul(per_cluster as usize));

    for &cluster in chain {
        let address = geometry.data_cluster_address(cluster);
        if address % SECTOR_SIZE != 0 {
            return Err(FatsectError::MisalignedCluster { cluster, address });
        }

        // The last sector of the cluster must still fit in a u64
        let base = (address / SECTOR_SIZE)
            .checked_add(origin_sectors)
            .filter(|base| base.checked_add(per_cluster.saturating_sub(1)).is_some())
            .ok_or(FatsectError::SectorOverflow { cluster, origin_sectors })?;
        sectors.extend((0..per_cluster).map(|i| base + i));
    }

    debug!(
        "Mapped {} clusters to {} sectors (origin {})",
        chain.len(),
        sectors.len(),
        origin_sectors
    );
    Ok(sectors)
}
