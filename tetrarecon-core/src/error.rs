//! Error types for tetrarecon

use thiserror::Error;

/// Main error type for tetrarecon operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    
    #[error("Malformed input: {0}")]
    MalformedInput(String),
    
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),
    
    #[error("Degenerate neighborhood: {0}")]
    DegenerateNeighborhood(String),
    
    #[error("Unsupported query: {0}")]
    UnsupportedQuery(String),
    
    #[error("Point cloud is empty")]
    EmptyPointCloud,
    
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    
    #[error("Spatial index error: {0}")]
    SpatialIndex(String),
    
    #[error("Algorithm error: {0}")]
    Algorithm(String),
}

/// Result type alias for tetrarecon operations
pub type Result<T> = std::result::Result<T, Error>;
