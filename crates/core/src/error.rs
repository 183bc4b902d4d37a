use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum RefineError {
    #[error("failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("malformed archive {path}: {source}")]
    Archive {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("failed to load image {path}: {source}")]
    Image {
        path: PathBuf,
        source: image::ImageError,
    },
    #[error("data contract violated: {0}")]
    DataContract(String),
    #[error("spherical harmonics system is singular; normals lack directional diversity")]
    SingularLighting,
    #[error("voxel {voxel} has a zero TSDF gradient; its normal is undefined")]
    DegenerateGradient { voxel: usize },
    #[error("loss became non-finite at epoch {epoch}")]
    NonFiniteLoss { epoch: usize },
}

pub type Result<T> = std::result::Result<T, RefineError>;

pub(crate) fn contract(message: impl Into<String>) -> RefineError {
    RefineError::DataContract(message.into())
}
