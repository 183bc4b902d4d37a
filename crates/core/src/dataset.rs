use std::path::{Path, PathBuf};

use image::DynamicImage;
use serde::{Deserialize, Serialize};

use crate::archive::read_archive;
use crate::camera::{pose_from_rows, DepthImage, Keyframe};
use crate::error::{contract, RefineError, Result};

pub const KEYFRAME_MANIFEST: &str = "keyframes.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyframeEntry {
    pub color: PathBuf,
    pub depth: PathBuf,
    /// Camera-to-world, row-major.
    pub pose: [[f64; 4]; 4],
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyframeManifest {
    pub keyframes: Vec<KeyframeEntry>,
}

fn open_image(path: &Path) -> Result<DynamicImage> {
    image::open(path).map_err(|source| RefineError::Image {
        path: path.to_path_buf(),
        source,
    })
}

fn load_depth(path: &Path) -> Result<DepthImage> {
    match open_image(path)? {
        DynamicImage::ImageLuma16(depth) => Ok(depth),
        other => Err(contract(format!(
            "depth image {} must be 16-bit grayscale, found {:?}",
            path.display(),
            other.color()
        ))),
    }
}

/// Loads keyframes in manifest order. Image paths are relative to `dataset`.
pub fn load_keyframes(dataset: &Path, manifest: &Path) -> Result<Vec<Keyframe>> {
    let manifest: KeyframeManifest = read_archive(&dataset.join(manifest))?;
    let mut keyframes = Vec::with_capacity(manifest.keyframes.len());
    for entry in manifest.keyframes {
        let color = open_image(&dataset.join(&entry.color))?.to_rgb8();
        let depth = load_depth(&dataset.join(&entry.depth))?;
        keyframes.push(Keyframe::new(color, depth, pose_from_rows(entry.pose))?);
    }
    tracing::debug!(count = keyframes.len(), dataset = %dataset.display(), "keyframes loaded");
    Ok(keyframes)
}

#[cfg(test)]
mod tests {
    use std::path::{Path, PathBuf};

    use glam::DVec3;
    use image::{GrayImage, ImageBuffer, Luma, Rgb, RgbImage};

    use super::{load_keyframes, KeyframeEntry, KeyframeManifest, KEYFRAME_MANIFEST};
    use crate::archive::write_archive;
    use crate::camera::DepthImage;
    use crate::error::RefineError;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("voxshade-{name}-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn write_manifest(dir: &Path, depth: &str) {
        let manifest = KeyframeManifest {
            keyframes: vec![KeyframeEntry {
                color: PathBuf::from("color.png"),
                depth: PathBuf::from(depth),
                pose: [
                    [1.0, 0.0, 0.0, 0.25],
                    [0.0, 1.0, 0.0, 0.0],
                    [0.0, 0.0, 1.0, -1.0],
                    [0.0, 0.0, 0.0, 1.0],
                ],
            }],
        };
        write_archive(&dir.join(KEYFRAME_MANIFEST), &manifest).unwrap();
    }

    #[test]
    fn loads_color_depth_and_pose() {
        let dir = scratch_dir("dataset");
        let color: RgbImage = ImageBuffer::from_pixel(6, 4, Rgb([10, 20, 30]));
        color.save(dir.join("color.png")).unwrap();
        let depth: DepthImage = ImageBuffer::from_pixel(6, 4, Luma([1234u16]));
        depth.save(dir.join("depth.png")).unwrap();
        write_manifest(&dir, "depth.png");

        let keyframes = load_keyframes(&dir, Path::new(KEYFRAME_MANIFEST)).unwrap();
        assert_eq!(keyframes.len(), 1);
        let keyframe = &keyframes[0];
        assert_eq!(keyframe.dimensions(), (6, 4));
        assert_eq!(keyframe.color.get_pixel(5, 3).0, [10, 20, 30]);
        assert!((keyframe.depth_meters(2, 2) - 1.234).abs() < 1.0e-12);
        assert_eq!(
            keyframe.pose.transform_point3(DVec3::ZERO),
            DVec3::new(0.25, 0.0, -1.0)
        );
        std::fs::remove_dir_all(dir).ok();
    }

    #[test]
    fn eight_bit_depth_is_rejected() {
        let dir = scratch_dir("dataset-8bit");
        let color: RgbImage = ImageBuffer::from_pixel(2, 2, Rgb([0, 0, 0]));
        color.save(dir.join("color.png")).unwrap();
        let depth: GrayImage = ImageBuffer::from_pixel(2, 2, Luma([9u8]));
        depth.save(dir.join("depth8.png")).unwrap();
        write_manifest(&dir, "depth8.png");

        let err = load_keyframes(&dir, Path::new(KEYFRAME_MANIFEST)).err().unwrap();
        assert!(matches!(err, RefineError::DataContract(_)));
        std::fs::remove_dir_all(dir).ok();
    }
}
