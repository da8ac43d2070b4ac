// FAT volume reader over any seekable byte source
// The filesystem may start at an arbitrary byte offset (partition origin)

use super::boot_sector::BootSector;
use super::cluster_chain::{read_cluster_chain, FatEntrySource};
use super::directory::{parse_directory, DirEntry};
use super::path_resolver::{FileEntry, PathResolver};
use super::FatType;
use byteorder::{LittleEndian, ReadBytesExt};
use fatsect_core::{ClusterGeometry, FatsectError, Result};
use log::{debug, info};
use std::collections::HashMap;
use std::io::{Read, Seek, SeekFrom};

/// An opened, read-only FAT filesystem
pub struct FatVolume<R> {
    reader: R,
    origin: u64,
    boot: BootSector,

    // Cache
    fat_cache: HashMap<u32, u32>, // cluster -> raw FAT entry
}

impl<R: Read + Seek> FatVolume<R> {
    /// Open the filesystem whose boot sector sits at byte `origin` of `reader`
    pub fn open(mut reader: R, origin: u64) -> Result<Self> {
        reader
            .seek(SeekFrom::Start(origin))
            .map_err(|e| {
                FatsectError::OpenError(format!("cannot seek to byte {}: {}", origin, e))
            })?;

        let mut sector = [0u8; 512];
        reader
            .read_exact(&mut sector)
            .map_err(|e| {
                let msg = format!("cannot read boot sector at byte {}: {}", origin, e);
                FatsectError::OpenError(msg)
            })?;

        let boot = BootSector::parse(&sector)?;

        info!("{} filesystem at byte {}:", boot.fat_type, origin);
        info!("  Bytes per sector: {}", boot.bytes_per_sector);
        info!("  Sectors per cluster: {}", boot.sectors_per_cluster);
        info!("  First data sector: {}", boot.first_data_sector);
        info!("  Total clusters: {}", boot.cluster_count);
        if let Some(label) = &boot.volume_label {
            info!("  Volume label: '{}'", label);
        }

        Ok(Self {
            reader,
            origin,
            boot,
            fat_cache: HashMap::new(),
        })
    }

    pub fn boot_sector(&self) -> &BootSector {
        &self.boot
    }

    pub fn fat_type(&self) -> FatType {
        self.boot.fat_type
    }

    /// Byte offset of the filesystem inside the underlying reader
    pub fn origin(&self) -> u64 {
        self.origin
    }

    pub fn root_entry(&self) -> FileEntry {
        FileEntry::root(self.boot.root_cluster)
    }

    /// Read `len` bytes at `offset`, relative to the filesystem start
    fn read_at(&mut self, offset: u64, len: usize) -> Result<Vec<u8>> {
        self.reader.seek(SeekFrom::Start(self.origin + offset))?;
        let mut buf = vec![0u8; len];
        self.reader.read_exact(&mut buf)?;
        Ok(buf)
    }

    /// Follow cluster chain to get all clusters for a file/directory
    pub fn cluster_chain(&mut self, start_cluster: u32) -> Result<Vec<u32>> {
        read_cluster_chain(self, start_cluster)
    }

    /// Read data from a cluster
    pub fn read_cluster(&mut self, cluster: u32) -> Result<Vec<u8>> {
        if !self.is_valid_cluster(cluster) {
            return Err(FatsectError::CorruptChain(format!("invalid cluster number: {}", cluster)));
        }

        let address = self.boot.cluster_address(cluster);
        let len = self.boot.cluster_bytes() as usize;
        self.read_at(address, len)
    }

    /// Read and parse the entries of a directory
    pub fn read_directory(&mut self, dir: &FileEntry) -> Result<Vec<DirEntry>> {
        let data = if dir.is_root && self.boot.fat_type != FatType::Fat32 {
            // Fixed root directory region after the FATs
            let start = self.boot.root_dir_start_byte();
            let len = self.boot.root_dir_bytes() as usize;
            self.read_at(start, len)?
        } else {
            let clusters = self.cluster_chain(dir.first_cluster)?;
            let mut data = Vec::with_capacity(clusters.len() * self.boot.cluster_bytes() as usize);
            for cluster in clusters {
                data.extend_from_slice(&self.read_cluster(cluster)?);
            }
            data
        };

        let entries = parse_directory(&data, self.boot.fat_type);
        debug!("Directory '{}': {} entries", dir.path, entries.len());
        Ok(entries)
    }

    /// Resolve a `/`-separated path to its directory entry
    pub fn resolve_path(&mut self, path: &str) -> Result<FileEntry> {
        PathResolver::new(self).resolve(path)
    }
}

impl<R: Read + Seek> FatEntrySource for FatVolume<R> {
    fn fat_type(&self) -> FatType {
        self.boot.fat_type
    }

    fn max_cluster(&self) -> u32 {
        self.boot.max_cluster()
    }

    fn read_fat_entry(&mut self, cluster: u32) -> Result<u32> {
        if let Some(&entry) = self.fat_cache.get(&cluster) {
            return Ok(entry);
        }

        let fat_start = self.origin + self.boot.fat_start_byte();
        let cluster_offset = cluster as u64;

        let entry = match self.boot.fat_type {
            FatType::Fat12 => {
                // 12-bit entries, two packed into every three bytes
                self.reader
                    .seek(SeekFrom::Start(fat_start + cluster_offset + cluster_offset / 2))?;
                let packed = self.reader.read_u16::<LittleEndian>()?;
                if cluster & 1 == 1 {
                    (packed >> 4) as u32
                } else {
                    (packed & 0x0FFF) as u32
                }
            }
            FatType::Fat16 => {
                self.reader.seek(SeekFrom::Start(fat_start + cluster_offset * 2))?;
                self.reader.read_u16::<LittleEndian>()? as u32
            }
            FatType::Fat32 => {
                self.reader.seek(SeekFrom::Start(fat_start + cluster_offset * 4))?;
                // Only 28 bits are used
                self.reader.read_u32::<LittleEndian>()? & 0x0FFF_FFFF
            }
        };

        self.fat_cache.insert(cluster, entry);
        Ok(entry)
    }
}

impl<R> ClusterGeometry for FatVolume<R> {
    fn bytes_per_sector(&self) -> u16 {
        self.boot.bytes_per_sector
    }

    fn sectors_per_cluster(&self) -> u32 {
        self.boot.sectors_per_cluster as u32
    }

    fn data_cluster_address(&self, cluster: u32) -> u64 {
        self.boot.cluster_address(cluster)
    }
}
