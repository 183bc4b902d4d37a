use glam::{DMat4, DVec2, DVec3};
use image::{ImageBuffer, Luma, RgbImage};
use serde::{Deserialize, Serialize};

use crate::error::{contract, Result};

pub type DepthImage = ImageBuffer<Luma<u16>, Vec<u16>>;

pub const DEPTH_SCALE: f64 = 1000.0;

/// Pinhole intrinsics of the color camera.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Intrinsics {
    pub fx: f64,
    pub fy: f64,
    pub cx: f64,
    pub cy: f64,
}

impl Default for Intrinsics {
    fn default() -> Self {
        Self {
            fx: 525.0,
            fy: 525.0,
            cx: 319.5,
            cy: 239.5,
        }
    }
}

impl Intrinsics {
    /// Continuous pixel coordinates of a camera-space point.
    pub fn project(&self, p: DVec3) -> DVec2 {
        DVec2::new(
            (self.fx * p.x + self.cx * p.z) / p.z,
            (self.fy * p.y + self.cy * p.z) / p.z,
        )
    }
}

#[derive(Debug, Clone)]
pub struct Keyframe {
    pub color: RgbImage,
    pub depth: DepthImage,
    /// Camera-to-world transform.
    pub pose: DMat4,
}

impl Keyframe {
    pub fn new(color: RgbImage, depth: DepthImage, pose: DMat4) -> Result<Self> {
        if color.dimensions() != depth.dimensions() {
            return Err(contract(format!(
                "color is {:?} but depth is {:?}",
                color.dimensions(),
                depth.dimensions()
            )));
        }
        if !pose.is_finite() {
            return Err(contract("keyframe pose is not finite"));
        }
        Ok(Self { color, depth, pose })
    }

    pub fn world_to_camera(&self) -> DMat4 {
        self.pose.inverse()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.color.dimensions()
    }

    pub fn depth_meters(&self, u: u32, v: u32) -> f64 {
        self.depth.get_pixel(u, v).0[0] as f64 / DEPTH_SCALE
    }
}

/// Row-major 4x4 as stored in keyframe manifests.
pub fn pose_from_rows(rows: [[f64; 4]; 4]) -> DMat4 {
    DMat4::from_cols_array_2d(&rows).transpose()
}

#[cfg(test)]
mod tests {
    use glam::{DMat4, DVec3, DVec4};
    use image::{ImageBuffer, RgbImage};

    use super::{pose_from_rows, DepthImage, Intrinsics, Keyframe};

    #[test]
    fn principal_point_for_optical_axis() {
        let intrinsics = Intrinsics::default();
        let px = intrinsics.project(DVec3::new(0.0, 0.0, 2.0));
        assert_eq!(px.x, 319.5);
        assert_eq!(px.y, 239.5);
    }

    #[test]
    fn rows_become_translation_column() {
        let pose = pose_from_rows([
            [1.0, 0.0, 0.0, 1.0],
            [0.0, 1.0, 0.0, 2.0],
            [0.0, 0.0, 1.0, 3.0],
            [0.0, 0.0, 0.0, 1.0],
        ]);
        assert_eq!(pose.w_axis, DVec4::new(1.0, 2.0, 3.0, 1.0));
        assert_eq!(
            pose.transform_point3(DVec3::ZERO),
            DVec3::new(1.0, 2.0, 3.0)
        );
    }

    #[test]
    fn mismatched_depth_is_rejected() {
        let color: RgbImage = ImageBuffer::new(4, 4);
        let depth: DepthImage = ImageBuffer::new(4, 3);
        assert!(Keyframe::new(color, depth, DMat4::IDENTITY).is_err());
    }
}
