// Test helpers for FAT image testing
// Builds small FAT12/16/32 images in memory with caller-chosen cluster layouts

use crate::fat::constants::*;
use crate::fat::directory::lfn_checksum;
use crate::fat::FatType;
use byteorder::{ByteOrder, LittleEndian};

/// Region layout of a built image, in sectors of `bytes_per_sector`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FatLayout {
    pub reserved_sectors: u32,
    pub sectors_per_fat: u32,
    pub root_entry_count: u32,
    pub root_dir_sectors: u32,
    pub first_data_sector: u32,
    pub total_sectors: u32,
    pub cluster_count: u32,
}

struct Node {
    path: String,
    clusters: Vec<u32>,
    size: u32,
    is_directory: bool,
}

/// Builder for FAT images with explicit cluster chains.
///
/// Every file and directory is given the exact clusters it occupies, in
/// chain order, so tests can lay out contiguous and fragmented files.
pub struct FatImageBuilder {
    fat_type: FatType,
    bytes_per_sector: u16,
    sectors_per_cluster: u8,
    cluster_count: u32,
    label: Option<String>,
    root_clusters: Vec<u32>,
    nodes: Vec<Node>,
}

impl FatImageBuilder {
    /// Defaults keep each variant as small as its cluster-count rules allow
    pub fn new(fat_type: FatType) -> Self {
        let (sectors_per_cluster, cluster_count) = match fat_type {
            FatType::Fat12 => (4, 1000),
            FatType::Fat16 => (1, 4200),
            FatType::Fat32 => (1, 512),
        };

        Self {
            fat_type,
            bytes_per_sector: 512,
            sectors_per_cluster,
            cluster_count,
            label: None,
            root_clusters: if fat_type == FatType::Fat32 { vec![2] } else { Vec::new() },
            nodes: Vec::new(),
        }
    }

    pub fn bytes_per_sector(mut self, bytes_per_sector: u16) -> Self {
        self.bytes_per_sector = bytes_per_sector;
        self
    }

    pub fn sectors_per_cluster(mut self, sectors_per_cluster: u8) -> Self {
        self.sectors_per_cluster = sectors_per_cluster;
        self
    }

    pub fn cluster_count(mut self, cluster_count: u32) -> Self {
        self.cluster_count = cluster_count;
        self
    }

    pub fn label(mut self, label: &str) -> Self {
        self.label = Some(label.to_string());
        self
    }

    /// Clusters of the FAT32 root directory (default `[2]`)
    pub fn root_clusters(mut self, clusters: &[u32]) -> Self {
        assert_eq!(self.fat_type, FatType::Fat32, "only FAT32 keeps its root in clusters");
        self.root_clusters = clusters.to_vec();
        self
    }

    pub fn directory(mut self, path: &str, clusters: &[u32]) -> Self {
        assert!(!clusters.is_empty(), "directory {} needs at least one cluster", path);
        self.nodes.push(Node {
            path: path.trim_matches('/').to_string(),
            clusters: clusters.to_vec(),
            size: 0,
            is_directory: true,
        });
        self
    }

    /// Add a file; an empty `clusters` slice makes a zero-length file
    pub fn file(mut self, path: &str, clusters: &[u32], size: u32) -> Self {
        self.nodes.push(Node {
            path: path.trim_matches('/').to_string(),
            clusters: clusters.to_vec(),
            size,
            is_directory: false,
        });
        self
    }

    pub fn layout(&self) -> FatLayout {
        let bps = self.bytes_per_sector as u64;
        let (reserved_sectors, root_entry_count) = match self.fat_type {
            FatType::Fat32 => (32, 0),
            _ => (1, 512),
        };

        let table_bytes = self.fat_type.table_bytes(self.cluster_count + 2);
        let sectors_per_fat = table_bytes.div_ceil(bps) as u32;
        let root_dir_bytes = root_entry_count as u64 * DIR_ENTRY_SIZE as u64;
        let root_dir_sectors = root_dir_bytes.div_ceil(bps) as u32;
        let first_data_sector = reserved_sectors + 2 * sectors_per_fat + root_dir_sectors;
        let total_sectors =
            first_data_sector + self.cluster_count * self.sectors_per_cluster as u32;

        FatLayout {
            reserved_sectors,
            sectors_per_fat,
            root_entry_count,
            root_dir_sectors,
            first_data_sector,
            total_sectors,
            cluster_count: self.cluster_count,
        }
    }

    /// Filesystem-relative sector (in `bytes_per_sector` units) of a cluster
    pub fn cluster_sector(&self, cluster: u32) -> u64 {
        let layout = self.layout();
        layout.first_data_sector as u64 + (cluster as u64 - 2) * self.sectors_per_cluster as u64
    }

    pub fn build(&self) -> Vec<u8> {
        let layout = self.layout();
        let bps = self.bytes_per_sector as usize;
        let mut image = vec![0u8; layout.total_sectors as usize * bps];

        self.write_boot_sector(&mut image, &layout);
        self.write_fats(&mut image, &layout);
        self.write_directories(&mut image, &layout);

        image
    }

    fn write_boot_sector(&self, image: &mut [u8], layout: &FatLayout) {
        let bpb = &mut image[..512];
        let is_fat32 = self.fat_type == FatType::Fat32;

        let jump: [u8; 3] = if is_fat32 { [0xEB, 0x58, 0x90] } else { [0xEB, 0x3C, 0x90] };
        bpb[BS_JMP_BOOT..BS_JMP_BOOT + 3].copy_from_slice(&jump);
        bpb[BS_OEM_NAME..BS_OEM_NAME + 8].copy_from_slice(b"FATSECT ");
        LittleEndian::write_u16(&mut bpb[BPB_BYTES_PER_SEC..], self.bytes_per_sector);
        bpb[BPB_SEC_PER_CLUS] = self.sectors_per_cluster;
        LittleEndian::write_u16(&mut bpb[BPB_RSVD_SEC_CNT..], layout.reserved_sectors as u16);
        bpb[BPB_NUM_FATS] = 2;
        LittleEndian::write_u16(&mut bpb[BPB_ROOT_ENT_CNT..], layout.root_entry_count as u16);
        bpb[BPB_MEDIA] = 0xF8;

        if !is_fat32 && layout.total_sectors < 0x10000 {
            LittleEndian::write_u16(&mut bpb[BPB_TOT_SEC16..], layout.total_sectors as u16);
        } else {
            LittleEndian::write_u32(&mut bpb[BPB_TOT_SEC32..], layout.total_sectors);
        }

        let label = self.label.as_deref().unwrap_or("NO NAME");
        let mut label_bytes = [b' '; 11];
        let len = label.len().min(11);
        label_bytes[..len].copy_from_slice(&label.as_bytes()[..len]);

        if is_fat32 {
            LittleEndian::write_u32(&mut bpb[BPB_FAT_SZ32..], layout.sectors_per_fat);
            let root_cluster = self.root_clusters.first().copied().unwrap_or(0);
            LittleEndian::write_u32(&mut bpb[BPB_ROOT_CLUS..], root_cluster);
            LittleEndian::write_u16(&mut bpb[BPB_FS_INFO..], 1);
            LittleEndian::write_u16(&mut bpb[BPB_BK_BOOT_SEC..], 6);
            bpb[BS32_BOOT_SIG] = 0x29;
            bpb[BS32_VOL_LAB..BS32_VOL_LAB + 11].copy_from_slice(&label_bytes);
            bpb[BS32_FIL_SYS_TYPE..BS32_FIL_SYS_TYPE + 8].copy_from_slice(b"FAT32   ");
        } else {
            LittleEndian::write_u16(&mut bpb[BPB_FAT_SZ16..], layout.sectors_per_fat as u16);
            bpb[BS16_BOOT_SIG] = 0x29;
            bpb[BS16_VOL_LAB..BS16_VOL_LAB + 11].copy_from_slice(&label_bytes);
            let fs_type: &[u8; 8] = match self.fat_type {
                FatType::Fat12 => b"FAT12   ",
                _ => b"FAT16   ",
            };
            bpb[BS16_FIL_SYS_TYPE..BS16_FIL_SYS_TYPE + 8].copy_from_slice(fs_type);
        }

        bpb[BOOT_SIGNATURE_OFFSET..BOOT_SIGNATURE_OFFSET + 2].copy_from_slice(&BOOT_SIGNATURE);
    }

    fn chains(&self) -> impl Iterator<Item = &[u32]> + '_ {
        std::iter::once(self.root_clusters.as_slice())
            .chain(self.nodes.iter().map(|node| node.clusters.as_slice()))
            .filter(|chain| !chain.is_empty())
    }

    fn write_fats(&self, image: &mut [u8], layout: &FatLayout) {
        let end_of_chain = self.fat_type.end_of_chain();
        let mut entries = vec![0u32; layout.cluster_count as usize + 2];
        entries[0] = end_of_chain & !0xFF | 0xF8;
        entries[1] = end_of_chain;

        for chain in self.chains() {
            for (i, &cluster) in chain.iter().enumerate() {
                assert!(
                    cluster >= 2 && cluster <= layout.cluster_count + 1,
                    "cluster {} is outside the image",
                    cluster
                );
                assert_eq!(entries[cluster as usize], 0, "cluster {} is used twice", cluster);
                entries[cluster as usize] = chain.get(i + 1).copied().unwrap_or(end_of_chain);
            }
        }

        let bps = self.bytes_per_sector as usize;
        let fat_bytes = layout.sectors_per_fat as usize * bps;
        let mut table = vec![0u8; fat_bytes];
        for (cluster, &value) in entries.iter().enumerate() {
            match self.fat_type {
                FatType::Fat12 => {
                    let offset = cluster + cluster / 2;
                    if cluster & 1 == 1 {
                        table[offset] = (table[offset] & 0x0F) | ((value << 4) as u8 & 0xF0);
                        table[offset + 1] = (value >> 4) as u8;
                    } else {
                        table[offset] = value as u8;
                        table[offset + 1] =
                            (table[offset + 1] & 0xF0) | ((value >> 8) as u8 & 0x0F);
                    }
                }
                FatType::Fat16 => LittleEndian::write_u16(&mut table[cluster * 2..], value as u16),
                FatType::Fat32 => LittleEndian::write_u32(&mut table[cluster * 4..], value),
            }
        }

        for copy in 0..2 {
            let fat_sector = copy * layout.sectors_per_fat as usize;
            let start = (layout.reserved_sectors as usize + fat_sector) * bps;
            image[start..start + fat_bytes].copy_from_slice(&table);
        }
    }

    fn write_directories(&self, image: &mut [u8], layout: &FatLayout) {
        let bps = self.bytes_per_sector as usize;

        // Root directory
        let root_data = self.directory_data("", None);
        if self.fat_type == FatType::Fat32 {
            self.write_clusters(image, &self.root_clusters, &root_data);
        } else {
            let capacity = layout.root_entry_count as usize * DIR_ENTRY_SIZE;
            assert!(root_data.len() <= capacity, "root directory overflow");
            let start = (layout.reserved_sectors + 2 * layout.sectors_per_fat) as usize * bps;
            image[start..start + root_data.len()].copy_from_slice(&root_data);
        }

        for node in self.nodes.iter().filter(|node| node.is_directory) {
            let data = self.directory_data(&node.path, Some(node));
            self.write_clusters(image, &node.clusters, &data);
        }
    }

    fn write_clusters(&self, image: &mut [u8], clusters: &[u32], data: &[u8]) {
        let cluster_bytes = self.bytes_per_sector as usize * self.sectors_per_cluster as usize;
        assert!(
            data.len() <= clusters.len() * cluster_bytes,
            "directory does not fit its clusters"
        );

        for (chunk, &cluster) in data.chunks(cluster_bytes).zip(clusters) {
            let start = self.cluster_sector(cluster) as usize * self.bytes_per_sector as usize;
            image[start..start + chunk.len()].copy_from_slice(chunk);
        }
    }

    fn parent_of(path: &str) -> &str {
        path.rsplit_once('/').map(|(parent, _)| parent).unwrap_or("")
    }

    fn first_cluster_of(&self, path: &str) -> u32 {
        if path.is_empty() {
            // ".." pointing at the root is always 0
            return 0;
        }
        self.nodes
            .iter()
            .find(|node| node.path == path)
            .and_then(|node| node.clusters.first().copied())
            .unwrap_or(0)
    }

    fn directory_data(&self, path: &str, own: Option<&Node>) -> Vec<u8> {
        let mut data = Vec::new();

        if path.is_empty() && self.label.is_some() {
            let mut raw = [b' '; 11];
            let label = self.label.as_deref().unwrap_or_default();
            let len = label.len().min(11);
            raw[..len].copy_from_slice(&label.as_bytes()[..len]);
            data.extend_from_slice(&short_entry(&raw, ATTR_VOLUME_ID, 0, 0));
        }

        if let Some(node) = own {
            let own_cluster = node.clusters.first().copied().unwrap_or(0);
            data.extend_from_slice(&short_entry(b".          ", ATTR_DIRECTORY, own_cluster, 0));
            let parent_cluster = self.first_cluster_of(Self::parent_of(&node.path));
            data.extend_from_slice(&short_entry(b"..         ", ATTR_DIRECTORY, parent_cluster, 0));
        }

        let mut generated = 0usize;
        for child in self.nodes.iter().filter(|node| Self::parent_of(&node.path) == path) {
            let name = child.path.rsplit('/').next().unwrap_or(&child.path);
            let attributes = if child.is_directory { ATTR_DIRECTORY } else { ATTR_ARCHIVE };
            let cluster = child.clusters.first().copied().unwrap_or(0);

            match plain_short_name(name) {
                Some(raw) => {
                    data.extend_from_slice(&short_entry(&raw, attributes, cluster, child.size))
                }
                None => {
                    generated += 1;
                    let raw = generated_short_name(name, generated);
                    for entry in long_name_entries(name, lfn_checksum(&raw)) {
                        data.extend_from_slice(&entry);
                    }
                    data.extend_from_slice(&short_entry(&raw, attributes, cluster, child.size));
                }
            }
        }

        data
    }
}

fn is_short_char(c: char) -> bool {
    c.is_ascii_uppercase() || c.is_ascii_digit() || "$%'-_@~`!(){}^#&".contains(c)
}

fn split_name(name: &str) -> (&str, &str) {
    name.rsplit_once('.').unwrap_or((name, ""))
}

/// The 8.3 form of `name` if it needs no long name
fn plain_short_name(name: &str) -> Option<[u8; 11]> {
    let (base, ext) = split_name(name);
    if base.is_empty()
        || base.len() > 8
        || ext.len() > 3
        || !base.chars().all(is_short_char)
        || !ext.chars().all(is_short_char)
    {
        return None;
    }

    let mut raw = [b' '; 11];
    raw[..base.len()].copy_from_slice(base.as_bytes());
    raw[8..8 + ext.len()].copy_from_slice(ext.as_bytes());
    Some(raw)
}

/// `BASENA~N.EXT` style alias for a long name
fn generated_short_name(name: &str, index: usize) -> [u8; 11] {
    let upper = name.to_ascii_uppercase();
    let (base, ext) = split_name(&upper);
    let clean = |s: &str| -> String {
        s.chars().filter(|&c| is_short_char(c) && c != '~').collect()
    };

    let tail = format!("~{}", index);
    let mut short_base: String = clean(base).chars().take(8 - tail.len()).collect();
    short_base.push_str(&tail);
    let short_ext: String = clean(ext).chars().take(3).collect();

    let mut raw = [b' '; 11];
    raw[..short_base.len()].copy_from_slice(short_base.as_bytes());
    raw[8..8 + short_ext.len()].copy_from_slice(short_ext.as_bytes());
    raw
}

fn short_entry(name: &[u8; 11], attributes: u8, cluster: u32, size: u32) -> [u8; DIR_ENTRY_SIZE] {
    let mut entry = [0u8; DIR_ENTRY_SIZE];
    entry[..11].copy_from_slice(name);
    entry[DIR_ATTR] = attributes;
    LittleEndian::write_u16(&mut entry[DIR_FST_CLUS_HI..], (cluster >> 16) as u16);
    LittleEndian::write_u16(&mut entry[DIR_FST_CLUS_LO..], cluster as u16);
    LittleEndian::write_u32(&mut entry[DIR_FILE_SIZE..], size);
    entry
}

/// LFN entries for `name`, in on-disk order (highest sequence first)
fn long_name_entries(name: &str, checksum: u8) -> Vec<[u8; DIR_ENTRY_SIZE]> {
    const OFFSETS: [usize; LFN_CHARS_PER_ENTRY] = [1, 3, 5, 7, 9, 14, 16, 18, 20, 22, 24, 28, 30];

    let mut units: Vec<u16> = name.encode_utf16().collect();
    if units.len() % LFN_CHARS_PER_ENTRY != 0 {
        units.push(0);
    }
    let count = units.len().div_ceil(LFN_CHARS_PER_ENTRY);
    units.resize(count * LFN_CHARS_PER_ENTRY, 0xFFFF);

    (0..count)
        .rev()
        .map(|index| {
            let mut entry = [0u8; DIR_ENTRY_SIZE];
            entry[0] = (index as u8 + 1) | if index + 1 == count { LFN_LAST_ENTRY } else { 0 };
            entry[DIR_ATTR] = ATTR_LONG_NAME;
            entry[LDIR_CHKSUM] = checksum;
            let part = &units[index * LFN_CHARS_PER_ENTRY..(index + 1) * LFN_CHARS_PER_ENTRY];
            for (unit, offset) in part.iter().zip(OFFSETS) {
                LittleEndian::write_u16(&mut entry[offset..], *unit);
            }
            entry
        })
        .collect()
}
