// Test utilities for the sector resolution pipeline

use crate::ClusterGeometry;
use std::collections::HashMap;

/// Geometry backed by an explicit cluster -> byte address table.
///
/// Clusters missing from the table fall back to the usual FAT layout
/// (`data_start + (cluster - 2) * cluster_bytes`).
pub struct MockGeometry {
    pub bytes_per_sector: u16,
    pub sectors_per_cluster: u32,
    pub data_start: u64,
    pub addresses: HashMap<u32, u64>,
}

impl MockGeometry {
    pub fn new(sectors_per_cluster: u32) -> Self {
        Self {
            bytes_per_sector: 512,
            sectors_per_cluster,
            data_start: 0,
            addresses: HashMap::new(),
        }
    }

    pub fn with_address(mut self, cluster: u32, address: u64) -> Self {
        self.addresses.insert(cluster, address);
        self
    }

    pub fn with_sector_size(mut self, bytes_per_sector: u16) -> Self {
        self.bytes_per_sector = bytes_per_sector;
        self
    }

    /// Geometry used by the worked scenarios: 4 sectors per cluster,
    /// cluster 2 at sector 100, cluster 3 at 104, cluster 5 at 120
    pub fn scenario() -> Self {
        Self::new(4)
            .with_address(2, 51200)
            .with_address(3, 53248)
            .with_address(5, 61440)
    }
}

impl ClusterGeometry for MockGeometry {
    fn bytes_per_sector(&self) -> u16 {
        self.bytes_per_sector
    }

    fn sectors_per_cluster(&self) -> u32 {
        self.sectors_per_cluster
    }

    fn data_cluster_address(&self, cluster: u32) -> u64 {
        match self.addresses.get(&cluster) {
            Some(&address) => address,
            None => {
                let cluster_bytes = self.bytes_per_sector as u64 * self.sectors_per_cluster as u64;
                self.data_start + (cluster as u64).saturating_sub(2) * cluster_bytes
            }
        }
    }
}
