// Disk image access
// Opens an image file and mounts the FAT filesystem at a given origin

use crate::fat::FatVolume;
use fatsect_core::{FatsectError, Result};
use log::debug;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// Open the FAT filesystem whose boot sector is `origin_bytes` into `path`
pub fn open_image(path: impl AsRef<Path>, origin_bytes: u64) -> Result<FatVolume<BufReader<File>>> {
    let path = path.as_ref();
    let file = File::open(path)
        .map_err(|e| FatsectError::OpenError(format!("{}: {}", path.display(), e)))?;

    debug!("Opened image {} ({} byte origin)", path.display(), origin_bytes);
    FatVolume::open(BufReader::new(file), origin_bytes)
}
