pub mod error;
pub mod geometry;
pub mod ranges;
pub mod resolve;
pub mod sector_map;
pub mod window;

#[cfg(test)]
pub(crate) mod test_utils;

pub use error::{FatsectError, Result};
pub use geometry::{check_sector_size, ClusterGeometry, SECTOR_SIZE};
pub use ranges::{coalesce, expand, slice_ranges, Coalesce, SectorRange};
pub use resolve::{resolve, resolve_with_options, ResolveOptions};
pub use sector_map::map_sectors;
pub use window::ExtentWindow;
