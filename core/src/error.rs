use crate::FatVariant;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FatError {
    #[error("Cannot lay out a {variant} volume of {size_mb} MiB: {reason}")]
    Geometry {
        variant: FatVariant,
        size_mb: u32,
        reason: String,
    },

    #[error("Image not found: {}", .0.display())]
    MissingImage(PathBuf),

    #[error("Invalid boot sector: {0}")]
    InvalidBootSector(String),

    #[error("Corrupt cluster chain at cluster {cluster}: {reason}")]
    CorruptChain { cluster: u32, reason: String },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

impl FatError {
    pub fn geometry(variant: FatVariant, size_mb: u32, reason: impl Into<String>) -> Self {
        FatError::Geometry {
            variant,
            size_mb,
            reason: reason.into(),
        }
    }

    pub fn corrupt_chain(cluster: u32, reason: impl Into<String>) -> Self {
        FatError::CorruptChain {
            cluster,
            reason: reason.into(),
        }
    }
}
