// FAT Cluster Chain Management
// Following a file's allocation from its first cluster to end-of-chain

use super::{FatEntry, FatType};
use fatsect_core::{FatsectError, Result};
use log::debug;
use std::collections::HashSet;

/// Something that can look up FAT entries
pub trait FatEntrySource {
    fn fat_type(&self) -> FatType;

    /// Highest valid cluster number
    fn max_cluster(&self) -> u32;

    /// Raw FAT entry for `cluster`, masked to the variant's width
    fn read_fat_entry(&mut self, cluster: u32) -> Result<u32>;

    /// Check if cluster number is valid
    fn is_valid_cluster(&self, cluster: u32) -> bool {
        cluster >= 2 && cluster <= self.max_cluster()
    }
}

/// Read a complete cluster chain.
///
/// A start cluster of 0 is an empty file and yields an empty chain. Cycles,
/// links to free/bad/reserved entries and out-of-range clusters are
/// reported as `CorruptChain`.
pub fn read_cluster_chain<F>(fat: &mut F, start_cluster: u32) -> Result<Vec<u32>>
where
    F: FatEntrySource + ?Sized,
{
    let mut chain = Vec::new();
    if start_cluster == 0 {
        return Ok(chain);
    }

    let fat_type = fat.fat_type();
    let mut current = start_cluster;

    // Prevent infinite loops
    let mut visited = HashSet::new();

    loop {
        if !fat.is_valid_cluster(current) {
            return Err(FatsectError::CorruptChain(format!(
                "cluster {} is outside 2..={}",
                current,
                fat.max_cluster()
            )));
        }

        if !visited.insert(current) {
            return Err(FatsectError::CorruptChain(format!(
                "cluster {} appears twice in the chain starting at {}",
                current, start_cluster
            )));
        }

        chain.push(current);

        match fat_type.classify(fat.read_fat_entry(current)?) {
            FatEntry::EndOfChain => break,
            FatEntry::Next(next) => current = next,
            other => {
                return Err(FatsectError::CorruptChain(format!(
                    "cluster {} links to a {:?} entry",
                    current, other
                )));
            }
        }
    }

    debug!("Cluster chain from {}: {} clusters", start_cluster, chain.len());
    Ok(chain)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct MockFat {
        fat_type: FatType,
        entries: Vec<u32>,
    }

    impl MockFat {
        fn fat32(links: &[(u32, u32)]) -> Self {
            let mut entries = vec![0u32; 64];
            for &(cluster, next) in links {
                entries[cluster as usize] = next;
            }
            Self { fat_type: FatType::Fat32, entries }
        }
    }

    impl FatEntrySource for MockFat {
        fn fat_type(&self) -> FatType { self.fat_type }
        fn max_cluster(&self) -> u32 { self.entries.len() as u32 - 1 }

        fn read_fat_entry(&mut self, cluster: u32) -> Result<u32> {
            Ok(self.entries[cluster as usize])
        }
    }

    const EOC: u32 = 0x0FFF_FFFF;

    #[test]
    fn test_cluster_chain_reading() {
        // Create a simple chain: 2 -> 3 -> 4 -> END
        let mut fat = MockFat::fat32(&[(2, 3), (3, 4), (4, EOC)]);
        assert_eq!(read_cluster_chain(&mut fat, 2).unwrap(), vec![2, 3, 4]);
    }

    #[test]
    fn test_fragmented_chain_keeps_link_order() {
        let mut fat = MockFat::fat32(&[(10, 3), (3, 40), (40, 11), (11, EOC)]);
        assert_eq!(read_cluster_chain(&mut fat, 10).unwrap(), vec![10, 3, 40, 11]);
    }

    #[test]
    fn test_single_cluster_file() {
        let mut fat = MockFat::fat32(&[(7, EOC)]);
        assert_eq!(read_cluster_chain(&mut fat, 7).unwrap(), vec![7]);
    }

    #[test]
    fn test_empty_file() {
        let mut fat = MockFat::fat32(&[]);
        assert!(read_cluster_chain(&mut fat, 0).unwrap().is_empty());
    }

    #[test]
    fn test_cycle_detected() {
        let mut fat = MockFat::fat32(&[(2, 3), (3, 4), (4, 2)]);
        assert!(matches!(
            read_cluster_chain(&mut fat, 2),
            Err(FatsectError::CorruptChain(_))
        ));
    }

    #[test]
    fn test_link_to_free_cluster() {
        let mut fat = MockFat::fat32(&[(2, 3)]);
        assert!(matches!(
            read_cluster_chain(&mut fat, 2),
            Err(FatsectError::CorruptChain(_))
        ));
    }

    #[test]
    fn test_out_of_range_link() {
        let mut fat = MockFat::fat32(&[(2, 500)]);
        assert!(matches!(
            read_cluster_chain(&mut fat, 2),
            Err(FatsectError::CorruptChain(_))
        ));
    }

    #[test]
    fn test_invalid_start_cluster() {
        let mut fat = MockFat::fat32(&[]);
        assert!(read_cluster_chain(&mut fat, 1).is_err());
    }

    #[test]
    fn test_bad_cluster_link() {
        let mut fat = MockFat::fat32(&[(2, 0x0FFF_FFF7)]);
        assert!(matches!(
            read_cluster_chain(&mut fat, 2),
            Err(FatsectError::CorruptChain(_))
        ));
    }
}
