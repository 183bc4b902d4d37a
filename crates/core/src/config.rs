use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::camera::Intrinsics;
use crate::error::{RefineError, Result};
use crate::lighting::ShCoeffs;
use crate::objective::LossWeights;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RefineConfig {
    pub intrinsics: Intrinsics,
    /// TSDF truncation distance in metres.
    pub truncation: f64,
    pub iterations: usize,
    pub learning_rate: f64,
    pub initial_albedo: f64,
    pub weights: LossWeights,
    /// Fixed lighting; fitted from the initial surface when absent.
    pub sh_coefficients: Option<ShCoeffs>,
    pub abort_on_non_finite: bool,
    pub log_level: String,
}

impl Default for RefineConfig {
    fn default() -> Self {
        Self {
            intrinsics: Intrinsics::default(),
            truncation: 0.04,
            iterations: 50,
            learning_rate: 1.0e-3,
            initial_albedo: 0.6,
            weights: LossWeights::default(),
            sh_coefficients: None,
            abort_on_non_finite: false,
            log_level: "info".to_string(),
        }
    }
}

impl RefineConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path).map_err(|source| RefineError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_slice(&bytes).map_err(|source| RefineError::Archive {
            path: path.to_path_buf(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::RefineConfig;

    #[test]
    fn partial_json_keeps_defaults() {
        let config: RefineConfig = serde_json::from_str(
            r#"{ "iterations": 5, "weights": { "data": 10.0 }, "sh_coefficients": [1,0,0,0,0,0,0,0,0] }"#,
        )
        .unwrap();
        assert_eq!(config.iterations, 5);
        assert_eq!(config.weights.data, 10.0);
        assert_eq!(config.weights.laplacian, 0.01);
        assert_eq!(config.truncation, 0.04);
        assert_eq!(config.intrinsics.fx, 525.0);
        assert_eq!(config.sh_coefficients.map(|c| c.0[0]), Some(1.0));
        assert!(!config.abort_on_non_finite);
    }
}
