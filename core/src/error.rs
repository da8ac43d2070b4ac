use thiserror::Error;

#[derive(Debug, Error)]
pub enum FatsectError {
    #[error("Unsupported sector size: {0} bytes (only 512 is supported)")]
    UnsupportedSectorSize(u16),

    #[error("Cluster {cluster} starts at byte {address}, which is not sector aligned")]
    MisalignedCluster { cluster: u32, address: u64 },

    #[error("Cluster {cluster} maps past the last addressable sector (origin {origin_sectors})")]
    SectorOverflow { cluster: u32, origin_sectors: u64 },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Cannot open image: {0}")]
    OpenError(String),

    #[error("Invalid window: {0}")]
    InvalidWindow(String),

    #[error("Corrupt cluster chain: {0}")]
    CorruptChain(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, FatsectError>;
