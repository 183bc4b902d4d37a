use glam::DVec3;
use serde::{Deserialize, Serialize};

use crate::association::Association;
use crate::camera::{Intrinsics, Keyframe};
use crate::error::Result;
use crate::grid::{Direction, VoxelGrid};
use crate::lighting::{eval_sh, intensity_from_color, ShCoeffs};
use crate::parallel;
use crate::projector::{Projection, Projector};
use crate::selection::{DataSelection, Selection};
use crate::surface::{SurfaceEstimator, SurfaceSamples, SurfaceStencil};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LossWeights {
    pub data: f64,
    pub stability: f64,
    pub laplacian: f64,
    pub albedo: f64,
}

impl Default for LossWeights {
    fn default() -> Self {
        Self {
            data: 1000.0,
            stability: 0.1,
            laplacian: 0.01,
            albedo: 0.1,
        }
    }
}

/// Weighted loss terms of one evaluation; `total` is their sum.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct LossTerms {
    pub total: f64,
    pub data: f64,
    pub stability: f64,
    pub laplacian: f64,
    pub albedo: f64,
}

impl LossTerms {
    pub fn is_finite(&self) -> bool {
        self.total.is_finite()
            && self.data.is_finite()
            && self.stability.is_finite()
            && self.laplacian.is_finite()
            && self.albedo.is_finite()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Gradients {
    pub tsdf: Vec<f64>,
    pub albedo: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    pub terms: LossTerms,
    pub gradients: Gradients,
    pub residuals: usize,
}

/// Fixed inputs of the refinement. Everything here is read-only while the
/// optimizer runs.
#[derive(Debug, Clone)]
pub struct Scene {
    pub grid: VoxelGrid,
    pub selection: Selection,
    pub association: Association,
    pub keyframes: Vec<Keyframe>,
    pub tsdf: Vec<f64>,
    pub colors: Vec<[f64; 3]>,
}

impl Scene {
    pub fn validate(&self) -> Result<()> {
        let count = self.grid.len();
        if self.tsdf.len() != count || self.colors.len() != count {
            return Err(crate::error::contract(format!(
                "voxel fields have {} tsdf and {} color entries, grid has {count} voxels",
                self.tsdf.len(),
                self.colors.len()
            )));
        }
        self.selection.validate(&self.grid)?;
        self.association
            .validate(self.keyframes.len(), self.selection.data.len())
    }
}

pub fn chromaticity(colors: &[[f64; 3]]) -> Vec<DVec3> {
    colors
        .iter()
        .map(|rgb| DVec3::from_array(*rgb) / intensity_from_color(*rgb))
        .collect()
}

/// Robust tone-similarity kernel, `1 / (1 + d)^3`.
pub fn chroma_kernel(distance: f64) -> f64 {
    1.0 / (1.0 + distance).powi(3)
}

/// The four surface probes of the data term, resolved once.
#[derive(Debug, Clone, PartialEq)]
pub struct DataStencils {
    pub center: SurfaceStencil,
    pub offsets: [SurfaceStencil; 3],
}

impl DataStencils {
    pub fn resolve(grid: &VoxelGrid, data: &DataSelection) -> Result<Self> {
        Ok(Self {
            center: SurfaceStencil::resolve(grid, &data.center, "index_data_c")?,
            offsets: [
                SurfaceStencil::resolve(grid, &data.x_plus, "index_data_xp")?,
                SurfaceStencil::resolve(grid, &data.y_plus, "index_data_yp")?,
                SurfaceStencil::resolve(grid, &data.z_plus, "index_data_zp")?,
            ],
        })
    }

    pub fn all(&self) -> [&SurfaceStencil; 4] {
        [
            &self.center,
            &self.offsets[0],
            &self.offsets[1],
            &self.offsets[2],
        ]
    }
}

/// Differentiable side of the refinement: forward losses and their analytic
/// gradients with respect to TSDF and albedo.
#[derive(Debug, Clone)]
pub struct Objective {
    stencils: DataStencils,
    edge_weights: [Vec<f64>; 6],
    lighting: ShCoeffs,
    weights: LossWeights,
    truncation: f64,
    projector: Projector,
}

impl Objective {
    pub fn new(
        scene: &Scene,
        stencils: DataStencils,
        lighting: ShCoeffs,
        weights: LossWeights,
        truncation: f64,
        intrinsics: Intrinsics,
    ) -> Self {
        let chroma = chromaticity(&scene.colors);
        let edge_weights = Direction::ALL.map(|direction| {
            scene
                .selection
                .chroma_edges
                .get(direction)
                .pairs()
                .map(|(s, n)| chroma_kernel((chroma[s] - chroma[n]).length()))
                .collect()
        });
        Self {
            stencils,
            edge_weights,
            lighting,
            weights,
            truncation,
            projector: Projector::new(intrinsics),
        }
    }

    pub fn lighting(&self) -> ShCoeffs {
        self.lighting
    }

    pub fn stencils(&self) -> &DataStencils {
        &self.stencils
    }

    pub fn evaluate(&self, scene: &Scene, tsdf: &[f64], albedo: &[f64]) -> Evaluation {
        let count = scene.grid.len();
        let mut gradients = Gradients {
            tsdf: vec![0.0; count],
            albedo: vec![0.0; count],
        };

        let (data, residuals) = self.data_term(scene, tsdf, albedo, &mut gradients);
        let stability = self.stability_term(&scene.tsdf, tsdf, &mut gradients);
        let laplacian = self.laplacian_term(&scene.selection, tsdf, &mut gradients);
        let albedo_reg = self.albedo_term(&scene.selection, albedo, &mut gradients);

        let terms = LossTerms {
            total: data + stability + laplacian + albedo_reg,
            data,
            stability,
            laplacian,
            albedo: albedo_reg,
        };
        Evaluation {
            terms,
            gradients,
            residuals,
        }
    }

    fn data_term(
        &self,
        scene: &Scene,
        tsdf: &[f64],
        albedo: &[f64],
        gradients: &mut Gradients,
    ) -> (f64, usize) {
        let estimator = SurfaceEstimator::new(&scene.grid.coords, self.truncation);
        let samples = self
            .stencils
            .all()
            .map(|stencil| estimator.estimate(tsdf, stencil));
        let shading = samples
            .each_ref()
            .map(|probe| eval_sh(&self.lighting, &probe.normals));

        // dL/d(shade * albedo) per probe and selection entry.
        let mut upstream = samples.each_ref().map(|probe| vec![0.0f64; probe.len()]);
        let mut loss = 0.0;
        let mut residuals = 0usize;

        for (kf, keyframe) in scene.keyframes.iter().enumerate() {
            let entries: Vec<(usize, f64)> = scene.association.entries(kf).collect();
            if entries.is_empty() {
                continue;
            }
            let projections = samples
                .each_ref()
                .map(|probe| self.project_entries(probe, &entries, keyframe));

            let mut kf_loss = 0.0;
            let mut kf_residuals = 0usize;
            for (k, &(entry, weight)) in entries.iter().enumerate() {
                if !projections.iter().all(|projection| projection.valid[k]) {
                    continue;
                }
                let b_center =
                    shading[0][entry] * albedo[self.stencils.center.voxels[entry]];
                let observed_center = projections[0].intensity[k];
                let mut center_upstream = 0.0;
                for axis in 0..3 {
                    let probe = axis + 1;
                    let voxel = self.stencils.offsets[axis].voxels[entry];
                    let b_offset = shading[probe][entry] * albedo[voxel];
                    let d_observed = projections[probe].intensity[k] - observed_center;
                    let residual = (b_offset - b_center) - d_observed;
                    kf_loss += weight * residual * residual;

                    let g = 2.0 * weight * residual * self.weights.data;
                    upstream[probe][entry] += g;
                    center_upstream -= g;
                }
                upstream[0][entry] += center_upstream;
                kf_residuals += 1;
            }
            tracing::debug!(
                keyframe = kf,
                associated = entries.len(),
                residuals = kf_residuals,
                loss = kf_loss,
                "photometric residuals"
            );
            loss += kf_loss;
            residuals += kf_residuals;
        }

        for (probe, stencil) in self.stencils.all().into_iter().enumerate() {
            self.backprop_probe(
                stencil,
                &samples[probe],
                &shading[probe],
                &upstream[probe],
                albedo,
                gradients,
            );
        }

        (self.weights.data * loss, residuals)
    }

    fn project_entries(
        &self,
        probe: &SurfaceSamples,
        entries: &[(usize, f64)],
        keyframe: &Keyframe,
    ) -> Projection {
        let points: Vec<DVec3> = entries
            .iter()
            .map(|(entry, _)| probe.points[*entry])
            .collect();
        self.projector.project(&points, keyframe)
    }

    /// Pushes `dL/db` through `b = shade(n) * a` and `n = g / |g|` into the
    /// albedo of the probed voxel and the six TSDF samples of its gradient.
    fn backprop_probe(
        &self,
        stencil: &SurfaceStencil,
        probe: &SurfaceSamples,
        shading: &[f64],
        upstream: &[f64],
        albedo: &[f64],
        gradients: &mut Gradients,
    ) {
        for (entry, &db) in upstream.iter().enumerate() {
            if db == 0.0 {
                continue;
            }
            let voxel = stencil.voxels[entry];
            gradients.albedo[voxel] += db * shading[entry];

            let normal = probe.normals[entry];
            let d_normal = self.lighting.shade_gradient(normal) * (db * albedo[voxel]);
            let d_gradient =
                (d_normal - normal * normal.dot(d_normal)) / probe.gradient_norms[entry];
            for axis in 0..3 {
                gradients.tsdf[stencil.plus[axis][entry]] += d_gradient[axis];
                gradients.tsdf[stencil.minus[axis][entry]] -= d_gradient[axis];
            }
        }
    }

    fn stability_term(&self, original: &[f64], tsdf: &[f64], gradients: &mut Gradients) -> f64 {
        let lambda = self.weights.stability;
        parallel::for_each_indexed_mut(&mut gradients.tsdf, |idx, grad| {
            *grad += 2.0 * lambda * (tsdf[idx] - original[idx]);
        });
        let loss: f64 = tsdf
            .iter()
            .zip(original)
            .map(|(t, t0)| (t - t0) * (t - t0))
            .sum();
        lambda * loss
    }

    fn laplacian_term(&self, selection: &Selection, tsdf: &[f64], gradients: &mut Gradients) -> f64 {
        let stencil = &selection.laplacian;
        let lambda = self.weights.laplacian;
        let mut loss = 0.0;
        for (entry, &center) in stencil.center.iter().enumerate() {
            let mut sum = -6.0 * tsdf[center];
            for direction in Direction::ALL {
                sum += tsdf[stencil.arm(direction)[entry]];
            }
            loss += sum * sum;

            let g = 2.0 * lambda * sum;
            for direction in Direction::ALL {
                gradients.tsdf[stencil.arm(direction)[entry]] += g;
            }
            gradients.tsdf[center] -= 6.0 * g;
        }
        lambda * loss
    }

    fn albedo_term(&self, selection: &Selection, albedo: &[f64], gradients: &mut Gradients) -> f64 {
        let lambda = self.weights.albedo;
        let mut loss = 0.0;
        for direction in Direction::ALL {
            let edges = selection.chroma_edges.get(direction);
            let weights = &self.edge_weights[direction.slot()];
            for ((s, n), kernel) in edges.pairs().zip(weights) {
                let diff = albedo[s] - albedo[n];
                loss += kernel * diff * diff;
                let g = 2.0 * lambda * kernel * diff;
                gradients.albedo[s] += g;
                gradients.albedo[n] -= g;
            }
        }
        lambda * loss
    }
}
