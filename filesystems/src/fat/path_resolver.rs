// FAT Path Resolution Module
// Walks directories from the root, matching long and short names

use super::directory::DirEntry;
use super::volume::FatVolume;
use fatsect_core::{FatsectError, Result};
use log::debug;
use std::io::{Read, Seek};

/// A resolved file or directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    pub name: String,
    pub path: String,
    /// First cluster of the data; 0 for empty files and the FAT12/16 root
    pub first_cluster: u32,
    pub size: u32,
    pub is_directory: bool,
    pub is_root: bool,
}

impl FileEntry {
    pub fn root(root_cluster: u32) -> Self {
        Self {
            name: String::new(),
            path: "/".to_string(),
            first_cluster: root_cluster,
            size: 0,
            is_directory: true,
            is_root: true,
        }
    }

    fn child(parent: &FileEntry, entry: DirEntry) -> Self {
        let path = if parent.is_root {
            format!("/{}", entry.name)
        } else {
            format!("{}/{}", parent.path, entry.name)
        };

        Self {
            is_directory: entry.is_directory(),
            name: entry.name,
            path,
            first_cluster: entry.first_cluster,
            size: entry.size,
            is_root: false,
        }
    }
}

/// Split a path into components, folding away `.` and `..`
pub fn normalize_path(path: &str) -> Vec<&str> {
    let mut components = Vec::new();
    for component in path.split('/') {
        match component {
            "" | "." => {}
            ".." => {
                components.pop();
            }
            name => components.push(name),
        }
    }
    components
}

/// Path resolver borrowing an open volume
pub struct PathResolver<'a, R> {
    volume: &'a mut FatVolume<R>,
}

impl<'a, R: Read + Seek> PathResolver<'a, R> {
    pub fn new(volume: &'a mut FatVolume<R>) -> Self {
        Self { volume }
    }

    /// Resolve a path to its entry; `NotFound` if any component is missing
    pub fn resolve(&mut self, path: &str) -> Result<FileEntry> {
        let mut current = self.volume.root_entry();

        for component in normalize_path(path) {
            if !current.is_directory {
                return Err(FatsectError::NotFound(format!("{} (not a directory)", current.path)));
            }

            let entry = self
                .volume
                .read_directory(&current)?
                .into_iter()
                .find(|entry| entry.matches(component));

            current = match entry {
                Some(entry) => FileEntry::child(&current, entry),
                None => {
                    let missing = if current.is_root {
                        format!("/{}", component)
                    } else {
                        format!("{}/{}", current.path, component)
                    };
                    return Err(FatsectError::NotFound(missing));
                }
            };

            debug!("Resolved '{}' -> cluster {}", current.path, current.first_cluster);
        }

        Ok(current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fat::FatType;
    use crate::test_helpers::FatImageBuilder;
    use std::io::Cursor;

    fn volume(builder: FatImageBuilder) -> FatVolume<Cursor<Vec<u8>>> {
        FatVolume::open(Cursor::new(builder.build()), 0).unwrap()
    }

    #[test]
    fn test_normalize_path() {
        assert_eq!(normalize_path("/EFI/BOOT/BOOTX64.EFI"), vec!["EFI", "BOOT", "BOOTX64.EFI"]);
        assert_eq!(normalize_path("EFI//BOOT/"), vec!["EFI", "BOOT"]);
        assert_eq!(normalize_path("/a/./b/../c"), vec!["a", "c"]);
        assert_eq!(normalize_path("/../a"), vec!["a"]);
        assert!(normalize_path("/").is_empty());
    }

    #[test]
    fn test_resolve_root() {
        let mut volume = volume(FatImageBuilder::new(FatType::Fat32));
        let root = volume.resolve_path("/").unwrap();
        assert!(root.is_root);
        assert!(root.is_directory);
        assert_eq!(root.first_cluster, 2);
    }

    #[test]
    fn test_resolve_nested_fat16() {
        let mut volume = volume(
            FatImageBuilder::new(FatType::Fat16)
                .directory("EFI", &[3])
                .directory("EFI/LINUX", &[4])
                .file("EFI/LINUX/ARCH.EFI", &[10, 11, 12], 3000),
        );

        let entry = volume.resolve_path("/EFI/LINUX/ARCH.EFI").unwrap();
        assert_eq!(entry.first_cluster, 10);
        assert_eq!(entry.size, 3000);
        assert_eq!(entry.path, "/EFI/LINUX/ARCH.EFI");
        assert!(!entry.is_directory);
    }

    #[test]
    fn test_resolve_is_case_insensitive() {
        let mut volume = volume(
            FatImageBuilder::new(FatType::Fat12)
                .directory("BOOT", &[3])
                .file("BOOT/KERNEL.BIN", &[5], 100),
        );
        assert_eq!(volume.resolve_path("boot/kernel.bin").unwrap().first_cluster, 5);
    }

    #[test]
    fn test_resolve_long_name() {
        let mut volume = volume(
            FatImageBuilder::new(FatType::Fat32)
                .directory("loader", &[3])
                .file("loader/vmlinuz-linux-lts.efi", &[7, 8], 4000),
        );
        let entry = volume.resolve_path("/loader/vmlinuz-linux-lts.efi").unwrap();
        assert_eq!(entry.name, "vmlinuz-linux-lts.efi");
        assert_eq!(entry.first_cluster, 7);
    }

    #[test]
    fn test_resolve_missing() {
        let mut volume = volume(FatImageBuilder::new(FatType::Fat16).directory("EFI", &[3]));
        match volume.resolve_path("/EFI/MISSING.EFI") {
            Err(FatsectError::NotFound(path)) => assert_eq!(path, "/EFI/MISSING.EFI"),
            other => panic!("expected NotFound, got {:?}", other),
        }
    }

    #[test]
    fn test_resolve_through_file_fails() {
        let mut volume = volume(FatImageBuilder::new(FatType::Fat12).file("KERNEL.BIN", &[3], 1));
        assert!(matches!(
            volume.resolve_path("/KERNEL.BIN/OTHER"),
            Err(FatsectError::NotFound(_))
        ));
    }

    #[test]
    fn test_resolve_directory_spanning_clusters() {
        // 1 sector per cluster holds 16 entries; 20 files push the directory
        // into its second cluster
        let mut builder = FatImageBuilder::new(FatType::Fat16).directory("MANY", &[3, 4]);
        for i in 0..20u32 {
            builder = builder.file(&format!("MANY/F{}.BIN", i), &[100 + i], 1);
        }
        let mut volume = volume(builder);
        assert_eq!(volume.resolve_path("/MANY/F19.BIN").unwrap().first_cluster, 119);
    }

    #[test]
    fn test_resolve_in_fat32_root_spanning_clusters() {
        let mut builder = FatImageBuilder::new(FatType::Fat32)
            .cluster_count(1024)
            .root_clusters(&[2, 900]);
        for i in 0..20u32 {
            builder = builder.file(&format!("ROOT{}.BIN", i), &[300 + i], 1);
        }
        let mut volume = volume(builder);

        assert_eq!(volume.boot_sector().cluster_count, 1024);
        assert_eq!(volume.cluster_chain(2).unwrap(), vec![2, 900]);
        assert_eq!(volume.resolve_path("/ROOT19.BIN").unwrap().first_cluster, 319);
    }
}
