use tracing::{info, warn};

use crate::adam::Adam;
use crate::config::RefineConfig;
use crate::error::{RefineError, Result};
use crate::lighting::{fit_sh, intensity_from_color, ShCoeffs};
use crate::objective::{DataStencils, LossTerms, Objective, Scene};
use crate::progress::{self, ProgressEvent, ProgressSink};
use crate::surface::SurfaceEstimator;

/// Lifecycle after construction; [`JointOptimizer::new`] is the initializing
/// phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// `epoch` is the next epoch to run.
    Iterating { epoch: usize },
    Terminated,
}

#[derive(Debug, Clone)]
pub struct RefineOutput {
    pub tsdf: Vec<f64>,
    pub albedo: Vec<f64>,
    pub colors: Vec<[f64; 3]>,
    pub lighting: ShCoeffs,
    pub history: Vec<LossTerms>,
}

/// Gradient-descent refinement of TSDF and albedo under fixed SH lighting.
pub struct JointOptimizer {
    scene: Scene,
    objective: Objective,
    tsdf: Vec<f64>,
    albedo: Vec<f64>,
    tsdf_adam: Adam,
    albedo_adam: Adam,
    iterations: usize,
    abort_on_non_finite: bool,
    phase: Phase,
    history: Vec<LossTerms>,
}

impl JointOptimizer {
    pub fn new(scene: Scene, config: &RefineConfig) -> Result<Self> {
        scene.validate()?;
        let stencils = DataStencils::resolve(&scene.grid, &scene.selection.data)?;

        let estimator = SurfaceEstimator::new(&scene.grid.coords, config.truncation);
        for stencil in stencils.all() {
            if let Some(voxel) = estimator.first_degenerate(&scene.tsdf, stencil) {
                return Err(RefineError::DegenerateGradient { voxel });
            }
        }

        let count = scene.grid.len();
        let albedo = vec![config.initial_albedo; count];
        let lighting = match config.sh_coefficients {
            Some(coeffs) => coeffs,
            None => {
                let center = &stencils.center;
                let samples = estimator.estimate(&scene.tsdf, center);
                let intensities: Vec<f64> = center
                    .voxels
                    .iter()
                    .map(|voxel| intensity_from_color(scene.colors[*voxel]))
                    .collect();
                let albedos: Vec<f64> = center.voxels.iter().map(|voxel| albedo[*voxel]).collect();
                fit_sh(&samples.normals, &intensities, &albedos)?
            }
        };

        info!(
            voxels = count,
            selected = scene.selection.data.len(),
            keyframes = scene.keyframes.len(),
            fitted = config.sh_coefficients.is_none(),
            lighting = ?lighting.0,
            "refinement initialized"
        );

        let objective = Objective::new(
            &scene,
            stencils,
            lighting,
            config.weights,
            config.truncation,
            config.intrinsics,
        );
        let phase = if config.iterations == 0 {
            Phase::Terminated
        } else {
            Phase::Iterating { epoch: 0 }
        };
        Ok(Self {
            tsdf: scene.tsdf.clone(),
            tsdf_adam: Adam::new(config.learning_rate, count),
            albedo_adam: Adam::new(config.learning_rate, count),
            albedo,
            scene,
            objective,
            iterations: config.iterations,
            abort_on_non_finite: config.abort_on_non_finite,
            phase,
            history: Vec::with_capacity(config.iterations),
        })
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn lighting(&self) -> ShCoeffs {
        self.objective.lighting()
    }

    pub fn tsdf(&self) -> &[f64] {
        &self.tsdf
    }

    pub fn albedo(&self) -> &[f64] {
        &self.albedo
    }

    pub fn history(&self) -> &[LossTerms] {
        &self.history
    }

    /// Runs one epoch. The returned losses belong to the parameters before the
    /// update. Returns `None` once all epochs have run.
    pub fn step(&mut self) -> Result<Option<LossTerms>> {
        let epoch = match self.phase {
            Phase::Iterating { epoch } => epoch,
            Phase::Terminated => return Ok(None),
        };

        let eval = self.objective.evaluate(&self.scene, &self.tsdf, &self.albedo);
        let terms = eval.terms;
        info!(
            epoch,
            total = terms.total,
            data = terms.data,
            stability = terms.stability,
            laplacian = terms.laplacian,
            albedo = terms.albedo,
            residuals = eval.residuals,
            "epoch"
        );
        if !terms.is_finite() {
            if self.abort_on_non_finite {
                self.phase = Phase::Terminated;
                return Err(RefineError::NonFiniteLoss { epoch });
            }
            warn!(epoch, total = terms.total, "loss is not finite");
        }

        self.tsdf_adam.step(&mut self.tsdf, &eval.gradients.tsdf);
        self.albedo_adam.step(&mut self.albedo, &eval.gradients.albedo);
        self.history.push(terms);

        let next = epoch + 1;
        self.phase = if next >= self.iterations {
            Phase::Terminated
        } else {
            Phase::Iterating { epoch: next }
        };
        Ok(Some(terms))
    }

    pub fn run(mut self, sink: Option<ProgressSink>) -> Result<RefineOutput> {
        let _guard = progress::set_progress_sink(sink);
        progress::report(ProgressEvent::Start {
            iterations: self.iterations,
        });
        while let Some(_terms) = self.step()? {
            let epoch = self.history.len();
            progress::report(ProgressEvent::Advance {
                epoch: epoch - 1,
                fraction: epoch as f32 / self.iterations as f32,
            });
        }
        progress::report(ProgressEvent::Finish {
            epochs: self.history.len(),
        });
        if let Some(last) = self.history.last() {
            info!(epochs = self.history.len(), total = last.total, "refinement finished");
        }
        Ok(self.finish())
    }

    pub fn finish(self) -> RefineOutput {
        RefineOutput {
            lighting: self.objective.lighting(),
            tsdf: self.tsdf,
            albedo: self.albedo,
            colors: self.scene.colors,
            history: self.history,
        }
    }
}
