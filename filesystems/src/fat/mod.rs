// FAT Filesystem Family
// Read-only access to FAT12, FAT16 and FAT32 images

pub mod boot_sector;
pub mod cluster_chain;
pub mod constants;
pub mod directory;
pub mod path_resolver;
pub mod volume;

pub use boot_sector::BootSector;
pub use cluster_chain::{read_cluster_chain, FatEntrySource};
pub use directory::{parse_directory, DirEntry};
pub use path_resolver::{FileEntry, PathResolver};
pub use volume::FatVolume;

use constants::{FAT12_MAX_CLUSTERS, FAT16_MAX_CLUSTERS};
use std::fmt;

/// FAT variant, decided from the BPB
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FatType {
    Fat12,
    Fat16,
    Fat32,
}

/// Meaning of a single FAT entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FatEntry {
    Free,
    Reserved,
    Bad,
    EndOfChain,
    Next(u32),
}

impl FatType {
    pub fn name(&self) -> &'static str {
        match self {
            FatType::Fat12 => "FAT12",
            FatType::Fat16 => "FAT16",
            FatType::Fat32 => "FAT32",
        }
    }

    /// Pick the variant from the data cluster count
    pub fn from_cluster_count(cluster_count: u32) -> Self {
        match cluster_count {
            0..=FAT12_MAX_CLUSTERS => FatType::Fat12,
            n if n <= FAT16_MAX_CLUSTERS => FatType::Fat16,
            _ => FatType::Fat32,
        }
    }

    /// Marker written into the FAT for the last cluster of a chain
    pub fn end_of_chain(&self) -> u32 {
        match self {
            FatType::Fat12 => 0x0FFF,
            FatType::Fat16 => 0xFFFF,
            FatType::Fat32 => 0x0FFF_FFFF,
        }
    }

    /// Size in bytes of a FAT holding `entries` entries
    pub fn table_bytes(&self, entries: u32) -> u64 {
        let entries = entries as u64;
        match self {
            FatType::Fat12 => (entries * 3 + 1) / 2,
            FatType::Fat16 => entries * 2,
            FatType::Fat32 => entries * 4,
        }
    }

    /// Decode a raw FAT entry (already masked to the variant's width)
    pub fn classify(&self, entry: u32) -> FatEntry {
        let (reserved_from, bad, eoc_from) = match self {
            FatType::Fat12 => (0x0FF0, 0x0FF7, 0x0FF8),
            FatType::Fat16 => (0xFFF0, 0xFFF7, 0xFFF8),
            FatType::Fat32 => (0x0FFF_FFF0, 0x0FFF_FFF7, 0x0FFF_FFF8),
        };

        match entry {
            0 => FatEntry::Free,
            1 => FatEntry::Reserved,
            e if e >= eoc_from => FatEntry::EndOfChain,
            e if e == bad => FatEntry::Bad,
            e if e >= reserved_from => FatEntry::Reserved,
            e => FatEntry::Next(e),
        }
    }
}

impl fmt::Display for FatType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
