use glam::DVec3;

use crate::error::{contract, Result};
use crate::grid::{Direction, VoxelGrid};
use crate::parallel;

/// A selection resolved against the neighbor tables: for every entry, the voxel
/// itself and its `+`/`-` neighbor on each axis.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SurfaceStencil {
    pub voxels: Vec<usize>,
    pub plus: [Vec<usize>; 3],
    pub minus: [Vec<usize>; 3],
}

impl SurfaceStencil {
    pub fn resolve(grid: &VoxelGrid, voxels: &[usize], what: &str) -> Result<Self> {
        let mut plus: [Vec<usize>; 3] = Default::default();
        let mut minus: [Vec<usize>; 3] = Default::default();
        for &voxel in voxels {
            grid.check_index(voxel, what)?;
            for axis in 0..3 {
                let (p, m) = Direction::axis_pair(axis);
                let (Some(p_id), Some(m_id)) = (grid.neighbor(voxel, p), grid.neighbor(voxel, m))
                else {
                    return Err(contract(format!(
                        "{what} voxel {voxel} lacks a {}/{} neighbor pair",
                        p.label(),
                        m.label()
                    )));
                };
                plus[axis].push(p_id);
                minus[axis].push(m_id);
            }
        }
        Ok(Self {
            voxels: voxels.to_vec(),
            plus,
            minus,
        })
    }

    pub fn len(&self) -> usize {
        self.voxels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.voxels.is_empty()
    }

    /// Central difference of the TSDF at a stencil entry, without the center sample.
    pub fn gradient(&self, tsdf: &[f64], entry: usize) -> DVec3 {
        DVec3::new(
            tsdf[self.plus[0][entry]] - tsdf[self.minus[0][entry]],
            tsdf[self.plus[1][entry]] - tsdf[self.minus[1][entry]],
            tsdf[self.plus[2][entry]] - tsdf[self.minus[2][entry]],
        )
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SurfaceSamples {
    pub points: Vec<DVec3>,
    pub normals: Vec<DVec3>,
    pub gradient_norms: Vec<f64>,
}

impl SurfaceSamples {
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

pub fn try_normal(gradient: DVec3) -> Option<DVec3> {
    let norm = gradient.length();
    if norm > 0.0 && norm.is_finite() {
        Some(gradient / norm)
    } else {
        None
    }
}

#[derive(Debug, Clone, Copy)]
pub struct SurfaceEstimator<'a> {
    coords: &'a [DVec3],
    truncation: f64,
}

impl<'a> SurfaceEstimator<'a> {
    pub fn new(coords: &'a [DVec3], truncation: f64) -> Self {
        Self { coords, truncation }
    }

    /// Zero-crossing points and unit normals for every stencil entry.
    ///
    /// A zero gradient is a caller precondition: the normal and point come out
    /// non-finite rather than being patched.
    pub fn estimate(&self, tsdf: &[f64], stencil: &SurfaceStencil) -> SurfaceSamples {
        let samples = parallel::map_indexed(stencil.len(), |entry| {
            let voxel = stencil.voxels[entry];
            let gradient = stencil.gradient(tsdf, entry);
            let norm = gradient.length();
            let normal = gradient / norm;
            let point = self.coords[voxel] - normal * (tsdf[voxel] * self.truncation);
            (point, normal, norm)
        });

        let mut out = SurfaceSamples {
            points: Vec::with_capacity(samples.len()),
            normals: Vec::with_capacity(samples.len()),
            gradient_norms: Vec::with_capacity(samples.len()),
        };
        for (point, normal, norm) in samples {
            out.points.push(point);
            out.normals.push(normal);
            out.gradient_norms.push(norm);
        }
        out
    }

    pub fn first_degenerate(&self, tsdf: &[f64], stencil: &SurfaceStencil) -> Option<usize> {
        (0..stencil.len())
            .find(|entry| try_normal(stencil.gradient(tsdf, *entry)).is_none())
            .map(|entry| stencil.voxels[entry])
    }
}
