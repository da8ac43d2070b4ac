// FAT filesystem driver
// Opens disk images and turns paths into cluster chains

pub mod fat;
pub mod image;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_helpers;

pub use fat::{FatType, FatVolume, FileEntry};
pub use image::open_image;
