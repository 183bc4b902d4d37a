mod adam;
mod archive;
mod association;
mod camera;
mod config;
mod dataset;
mod error;
mod grid;
mod lighting;
mod objective;
mod optimizer;
mod parallel;
mod pipeline;
mod progress;
mod projector;
mod selection;
mod surface;

#[cfg(test)]
mod fixtures;

pub use adam::Adam;
pub use archive::{
    read_archive, write_archive, AssociationArchive, RefinedVoxelArchive, SelectionArchive,
    SpatialArchive, VoxelArchive, ASSOCIATION_FILE, INPUT_VOXELS_FILE, OUTPUT_VOXELS_FILE,
    SELECTION_FILE, SPATIAL_FILE,
};
pub use association::Association;
pub use camera::{pose_from_rows, DepthImage, Intrinsics, Keyframe, DEPTH_SCALE};
pub use config::RefineConfig;
pub use dataset::{load_keyframes, KeyframeEntry, KeyframeManifest, KEYFRAME_MANIFEST};
pub use error::{RefineError, Result};
pub use grid::{Direction, NeighborSlots, VoxelGrid};
pub use lighting::{
    eval_sh, fit_sh, intensities_from_colors, intensity_from_color, sh_basis, ShCoeffs,
    SH_COEFF_COUNT,
};
pub use objective::{
    chroma_kernel, chromaticity, DataStencils, Evaluation, Gradients, LossTerms, LossWeights,
    Objective, Scene,
};
pub use optimizer::{JointOptimizer, Phase, RefineOutput};
pub use pipeline::{load_scene, refine_dataset, save_output, RefinePaths};
pub use progress::{ProgressEvent, ProgressSink};
pub use projector::{Projection, Projector};
pub use selection::{ChromaEdges, DataSelection, EdgeSet, LaplacianStencil, Selection};
pub use surface::{try_normal, SurfaceEstimator, SurfaceSamples, SurfaceStencil};
