// Sector resolution pipeline
// chain -> sectors -> window -> runs

use crate::ranges::{coalesce, slice_ranges, SectorRange};
use crate::sector_map::map_sectors;
use crate::{ClusterGeometry, ExtentWindow, Result};
use log::debug;
use serde::{Deserialize, Serialize};

/// Options controlling a resolution
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolveOptions {
    /// Disk origin of the filesystem, in 512-byte sectors
    pub origin_sectors: u64,
    /// Positional window over the mapped sector sequence
    pub window: ExtentWindow,
    /// Optional file-relative section, applied to the windowed run list
    pub section: Option<SectorRange>,
}

/// Resolve a cluster chain into the minimal list of contiguous sector runs.
///
/// Errors from the mapper (sector size, alignment) are returned unchanged;
/// nothing is produced on failure.
pub fn resolve<G>(
    chain: &[u32],
    geometry: &G,
    origin_sectors: u64,
    window: ExtentWindow,
) -> Result<Vec<SectorRange>>
where
    G: ClusterGeometry + ?Sized,
{
    let mapped = map_sectors(chain, geometry, origin_sectors)?;
    let windowed = window.select(&mapped);
    let ranges: Vec<SectorRange> = coalesce(windowed.iter().copied()).collect();

    debug!(
        "Resolved {} of {} sectors into {} runs",
        windowed.len(),
        mapped.len(),
        ranges.len()
    );
    Ok(ranges)
}

/// Resolve with all options, including section slicing
pub fn resolve_with_options<G>(
    chain: &[u32],
    geometry: &G,
    options: &ResolveOptions,
) -> Result<Vec<SectorRange>>
where
    G: ClusterGeometry + ?Sized,
{
    let ranges = resolve(chain, geometry, options.origin_sectors, options.window)?;

    Ok(match options.section {
        Some(section) => slice_ranges(&ranges, section),
        None => ranges,
    })
}
