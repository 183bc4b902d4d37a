use std::path::PathBuf;

use tracing::info;

use crate::archive::{
    read_archive, write_archive, AssociationArchive, RefinedVoxelArchive, SelectionArchive,
    SpatialArchive, VoxelArchive, ASSOCIATION_FILE, INPUT_VOXELS_FILE, OUTPUT_VOXELS_FILE,
    SELECTION_FILE, SPATIAL_FILE,
};
use crate::config::RefineConfig;
use crate::dataset::{load_keyframes, KEYFRAME_MANIFEST};
use crate::error::Result;
use crate::objective::Scene;
use crate::optimizer::{JointOptimizer, RefineOutput};
use crate::progress::ProgressSink;

/// File locations of one refinement run.
#[derive(Debug, Clone, PartialEq)]
pub struct RefinePaths {
    pub dataset: PathBuf,
    pub spatial: PathBuf,
    pub selection: PathBuf,
    pub association: PathBuf,
    pub input: PathBuf,
    pub output: PathBuf,
    /// Relative to `dataset`.
    pub keyframes: PathBuf,
}

impl RefinePaths {
    pub fn with_defaults(dataset: impl Into<PathBuf>) -> Self {
        Self {
            dataset: dataset.into(),
            spatial: PathBuf::from(SPATIAL_FILE),
            selection: PathBuf::from(SELECTION_FILE),
            association: PathBuf::from(ASSOCIATION_FILE),
            input: PathBuf::from(INPUT_VOXELS_FILE),
            output: PathBuf::from(OUTPUT_VOXELS_FILE),
            keyframes: PathBuf::from(KEYFRAME_MANIFEST),
        }
    }
}

pub fn load_scene(paths: &RefinePaths) -> Result<Scene> {
    let grid = read_archive::<SpatialArchive>(&paths.spatial)?.into_grid()?;
    let selection = read_archive::<SelectionArchive>(&paths.selection)?.into_selection()?;
    let association = read_archive::<AssociationArchive>(&paths.association)?.into();
    let voxels: VoxelArchive = read_archive(&paths.input)?;
    let keyframes = load_keyframes(&paths.dataset, &paths.keyframes)?;
    let scene = Scene {
        grid,
        selection,
        association,
        keyframes,
        tsdf: voxels.voxel_tsdf,
        colors: voxels.voxel_color,
    };
    scene.validate()?;
    info!(
        voxels = scene.grid.len(),
        keyframes = scene.keyframes.len(),
        "scene loaded"
    );
    Ok(scene)
}

pub fn save_output(paths: &RefinePaths, output: &RefineOutput) -> Result<()> {
    let archive = RefinedVoxelArchive {
        voxel_tsdf: output.tsdf.clone(),
        voxel_albedo: output.albedo.clone(),
        voxel_color: output.colors.clone(),
    };
    write_archive(&paths.output, &archive)?;
    info!(path = %paths.output.display(), "refined voxels written");
    Ok(())
}

/// Load, refine, write.
pub fn refine_dataset(
    paths: &RefinePaths,
    config: &RefineConfig,
    progress: Option<ProgressSink>,
) -> Result<RefineOutput> {
    let scene = load_scene(paths)?;
    let output = JointOptimizer::new(scene, config)?.run(progress)?;
    save_output(paths, &output)?;
    Ok(output)
}

#[cfg(test)]
mod tests {
    use std::path::{Path, PathBuf};

    use super::{load_scene, refine_dataset, RefinePaths};
    use crate::archive::{
        read_archive, write_archive, AssociationArchive, RefinedVoxelArchive, SelectionArchive,
        SpatialArchive, VoxelArchive,
    };
    use crate::camera::DepthImage;
    use crate::config::RefineConfig;
    use crate::dataset::{KeyframeEntry, KeyframeManifest};
    use crate::error::RefineError;
    use crate::fixtures::{perturbed_tsdf, planar_scene, TEST_LIGHT, TRUNCATION};

    fn write_fixture(dir: &Path) -> RefinePaths {
        let fixture = planar_scene();
        let keyframe = &fixture.keyframes[0];
        keyframe.color.save(dir.join("color.png")).unwrap();
        let depth: &DepthImage = &keyframe.depth;
        depth.save(dir.join("depth.png")).unwrap();
        let rows = keyframe.pose.transpose().to_cols_array_2d();
        write_archive(
            &dir.join("keyframes.json"),
            &KeyframeManifest {
                keyframes: vec![KeyframeEntry {
                    color: PathBuf::from("color.png"),
                    depth: PathBuf::from("depth.png"),
                    pose: rows,
                }],
            },
        )
        .unwrap();

        let mut paths = RefinePaths::with_defaults(dir);
        paths.spatial = dir.join("spatial.json");
        paths.selection = dir.join("selection.json");
        paths.association = dir.join("association.json");
        paths.input = dir.join("input.json");
        paths.output = dir.join("output.json");
        write_archive(&paths.spatial, &SpatialArchive::from_grid(&fixture.grid)).unwrap();
        write_archive(&paths.selection, &SelectionArchive::from_selection(&fixture.selection))
            .unwrap();
        write_archive(&paths.association, &AssociationArchive::from(&fixture.association))
            .unwrap();
        write_archive(
            &paths.input,
            &VoxelArchive {
                voxel_tsdf: perturbed_tsdf(&fixture.grid),
                voxel_color: fixture.colors.clone(),
            },
        )
        .unwrap();
        paths
    }

    #[test]
    fn refines_archives_on_disk() {
        let dir = std::env::temp_dir().join(format!("voxshade-pipeline-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let paths = write_fixture(&dir);
        let config = RefineConfig {
            intrinsics: planar_scene().intrinsics,
            truncation: TRUNCATION,
            iterations: 3,
            sh_coefficients: Some(TEST_LIGHT),
            ..RefineConfig::default()
        };

        let output = refine_dataset(&paths, &config, None).unwrap();
        let written: RefinedVoxelArchive = read_archive(&paths.output).unwrap();
        assert_eq!(written.voxel_tsdf, output.tsdf);
        assert_eq!(written.voxel_albedo, output.albedo);
        assert_eq!(written.voxel_color, planar_scene().colors);
        assert_eq!(output.history.len(), 3);
        std::fs::remove_dir_all(dir).ok();
    }

    #[test]
    fn association_row_mismatch_fails_at_load() {
        let dir = std::env::temp_dir().join(format!("voxshade-pipeline-bad-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let paths = write_fixture(&dir);
        let mut association: AssociationArchive = read_archive(&paths.association).unwrap();
        association.association_mask[0].pop();
        write_archive(&paths.association, &association).unwrap();

        let err = load_scene(&paths).err().unwrap();
        assert!(matches!(err, RefineError::DataContract(_)));
        std::fs::remove_dir_all(dir).ok();
    }
}
