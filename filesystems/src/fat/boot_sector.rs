// FAT boot sector (BPB) parsing and region layout

use super::constants::*;
use super::FatType;
use byteorder::{ByteOrder, LittleEndian};
use fatsect_core::{FatsectError, Result};

/// Parsed BIOS Parameter Block plus the layout derived from it
#[derive(Debug, Clone)]
pub struct BootSector {
    pub bytes_per_sector: u16,
    pub sectors_per_cluster: u8,
    pub reserved_sectors: u16,
    pub num_fats: u8,
    pub root_entry_count: u16,
    pub total_sectors: u32,
    pub sectors_per_fat: u32,
    /// First cluster of the root directory (FAT32 only, 0 otherwise)
    pub root_cluster: u32,
    pub volume_label: Option<String>,
    pub fat_type: FatType,

    pub root_dir_sectors: u32,
    pub first_data_sector: u32,
    pub cluster_count: u32,
}

fn invalid(msg: impl Into<String>) -> FatsectError {
    FatsectError::OpenError(msg.into())
}

impl BootSector {
    /// Parse the first sector of a FAT filesystem.
    ///
    /// Any sector size that is a power of two between 512 and 4096 is
    /// accepted here; restricting it to 512 is the sector mapper's job.
    pub fn parse(bpb: &[u8]) -> Result<Self> {
        if bpb.len() < 512 {
            return Err(invalid("boot sector is truncated"));
        }

        if bpb[BOOT_SIGNATURE_OFFSET..BOOT_SIGNATURE_OFFSET + 2] != BOOT_SIGNATURE {
            return Err(invalid("missing 0x55AA boot signature"));
        }

        let bytes_per_sector = LittleEndian::read_u16(&bpb[BPB_BYTES_PER_SEC..]);
        if !bytes_per_sector.is_power_of_two() || !(512..=4096).contains(&bytes_per_sector) {
            return Err(invalid(format!("invalid bytes per sector: {}", bytes_per_sector)));
        }

        let sectors_per_cluster = bpb[BPB_SEC_PER_CLUS];
        if sectors_per_cluster == 0 || !sectors_per_cluster.is_power_of_two() {
            return Err(invalid(format!("invalid sectors per cluster: {}", sectors_per_cluster)));
        }

        let reserved_sectors = LittleEndian::read_u16(&bpb[BPB_RSVD_SEC_CNT..]);
        let num_fats = bpb[BPB_NUM_FATS];
        if reserved_sectors == 0 || num_fats == 0 {
            return Err(invalid("reserved sector count and FAT count must be non-zero"));
        }

        let root_entry_count = LittleEndian::read_u16(&bpb[BPB_ROOT_ENT_CNT..]);

        let total_sectors_16 = LittleEndian::read_u16(&bpb[BPB_TOT_SEC16..]);
        let total_sectors = if total_sectors_16 != 0 {
            total_sectors_16 as u32
        } else {
            LittleEndian::read_u32(&bpb[BPB_TOT_SEC32..])
        };

        let sectors_per_fat_16 = LittleEndian::read_u16(&bpb[BPB_FAT_SZ16..]);
        let sectors_per_fat = if sectors_per_fat_16 != 0 {
            sectors_per_fat_16 as u32
        } else {
            LittleEndian::read_u32(&bpb[BPB_FAT_SZ32..])
        };
        if sectors_per_fat == 0 {
            return Err(invalid("sectors per FAT is zero"));
        }

        let bps = bytes_per_sector as u32;
        let root_dir_sectors = (root_entry_count as u32 * DIR_ENTRY_SIZE as u32).div_ceil(bps);
        let first_data_sector = reserved_sectors as u64
            + num_fats as u64 * sectors_per_fat as u64
            + root_dir_sectors as u64;

        if first_data_sector >= total_sectors as u64 {
            return Err(invalid(format!(
                "data region starts at sector {} but volume has only {} sectors",
                first_data_sector, total_sectors
            )));
        }
        let first_data_sector = first_data_sector as u32;
        let cluster_count = (total_sectors - first_data_sector) / sectors_per_cluster as u32;

        // A zero 16-bit FAT size with no fixed root directory is a FAT32 BPB,
        // whatever the cluster count says
        let fat_type = if sectors_per_fat_16 == 0 && root_entry_count == 0 {
            FatType::Fat32
        } else {
            FatType::from_cluster_count(cluster_count)
        };

        let root_cluster = if fat_type == FatType::Fat32 {
            LittleEndian::read_u32(&bpb[BPB_ROOT_CLUS..])
        } else {
            0
        };

        let label_offset = if fat_type == FatType::Fat32 { BS32_VOL_LAB } else { BS16_VOL_LAB };
        let label = String::from_utf8_lossy(&bpb[label_offset..label_offset + 11])
            .trim()
            .to_string();
        let volume_label = if label.is_empty() || label == "NO NAME" {
            None
        } else {
            Some(label)
        };

        Ok(Self {
            bytes_per_sector,
            sectors_per_cluster,
            reserved_sectors,
            num_fats,
            root_entry_count,
            total_sectors,
            sectors_per_fat,
            root_cluster,
            volume_label,
            fat_type,
            root_dir_sectors,
            first_data_sector,
            cluster_count,
        })
    }

    pub fn cluster_bytes(&self) -> u64 {
        self.bytes_per_sector as u64 * self.sectors_per_cluster as u64
    }

    /// Highest valid cluster number
    pub fn max_cluster(&self) -> u32 {
        self.cluster_count + 1
    }

    /// Byte offset of the first FAT, relative to the filesystem start
    pub fn fat_start_byte(&self) -> u64 {
        self.reserved_sectors as u64 * self.bytes_per_sector as u64
    }

    /// Byte offset of the fixed FAT12/16 root directory region
    pub fn root_dir_start_byte(&self) -> u64 {
        let sector =
            self.reserved_sectors as u64 + self.num_fats as u64 * self.sectors_per_fat as u64;
        sector * self.bytes_per_sector as u64
    }

    pub fn root_dir_bytes(&self) -> u64 {
        self.root_entry_count as u64 * DIR_ENTRY_SIZE as u64
    }

    /// Byte offset of a data cluster, relative to the filesystem start
    pub fn cluster_address(&self, cluster: u32) -> u64 {
        let index = cluster.saturating_sub(2) as u64;
        let sector = self.first_data_sector as u64 + index * self.sectors_per_cluster as u64;
        sector * self.bytes_per_sector as u64
    }
}
