use glam::DVec3;

use crate::camera::{Intrinsics, Keyframe};
use crate::lighting::intensity_from_color;
use crate::parallel;

/// Per-point visibility and observed intensity in one keyframe.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Projection {
    pub valid: Vec<bool>,
    pub intensity: Vec<f64>,
}

impl Projection {
    pub fn len(&self) -> usize {
        self.valid.len()
    }

    pub fn is_empty(&self) -> bool {
        self.valid.is_empty()
    }
}

/// Read-only lookup of observed intensities. Nothing here participates in the
/// backward pass; callers hand in detached surface points.
///
/// The sampled depth is only tested for being non-zero. It is not compared
/// against the point's own camera-space depth.
#[derive(Debug, Clone, Copy)]
pub struct Projector {
    intrinsics: Intrinsics,
}

impl Projector {
    pub fn new(intrinsics: Intrinsics) -> Self {
        Self { intrinsics }
    }

    pub fn project(&self, points: &[DVec3], keyframe: &Keyframe) -> Projection {
        let world_to_camera = keyframe.world_to_camera();
        let (width, height) = keyframe.dimensions();
        let samples = parallel::map_indexed(points.len(), |idx| {
            let camera = world_to_camera.transform_point3(points[idx]);
            let pixel = self.intrinsics.project(camera);
            if !pixel.is_finite() {
                return None;
            }
            let u = pixel.x.round_ties_even();
            let v = pixel.y.round_ties_even();
            if u < 0.0 || v < 0.0 || u >= width as f64 || v >= height as f64 {
                return None;
            }
            let (u, v) = (u as u32, v as u32);
            if keyframe.depth_meters(u, v) == 0.0 {
                return None;
            }
            let [r, g, b] = keyframe.color.get_pixel(u, v).0;
            Some(intensity_from_color([r as f64, g as f64, b as f64]) / 255.0)
        });

        let mut projection = Projection {
            valid: Vec::with_capacity(samples.len()),
            intensity: Vec::with_capacity(samples.len()),
        };
        for sample in samples {
            projection.valid.push(sample.is_some());
            projection.intensity.push(sample.unwrap_or(0.0));
        }
        projection
    }
}
