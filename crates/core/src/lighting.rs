use glam::DVec3;
use serde::{Deserialize, Serialize};

use crate::error::{contract, RefineError, Result};

pub const SH_COEFF_COUNT: usize = 9;

const LUMA_R: f64 = 0.2126;
const LUMA_G: f64 = 0.7152;
const LUMA_B: f64 = 0.0722;

const PIVOT_EPS: f64 = 1.0e-12;

pub fn intensity_from_color(rgb: [f64; 3]) -> f64 {
    LUMA_R * rgb[0] + LUMA_G * rgb[1] + LUMA_B * rgb[2]
}

pub fn intensities_from_colors(colors: &[[f64; 3]]) -> Vec<f64> {
    colors.iter().copied().map(intensity_from_color).collect()
}

/// Second-order real SH basis at a unit direction.
///
/// Column order: `1, y, z, x, xy, yz, 2z²-x²-y², xz, x²-y²`. Both the fit and
/// the forward evaluation go through this function.
pub fn sh_basis(n: DVec3) -> [f64; SH_COEFF_COUNT] {
    let x = n.x;
    let y = n.y;
    let z = n.z;
    [
        1.0,
        y,
        z,
        x,
        x * y,
        y * z,
        2.0 * z * z - x * x - y * y,
        x * z,
        x * x - y * y,
    ]
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ShCoeffs(pub [f64; SH_COEFF_COUNT]);

impl ShCoeffs {
    pub fn shade(&self, n: DVec3) -> f64 {
        sh_basis(n)
            .iter()
            .zip(self.0.iter())
            .map(|(basis, coeff)| basis * coeff)
            .sum()
    }

    /// Partial derivatives of [`ShCoeffs::shade`] with respect to the normal components.
    pub fn shade_gradient(&self, n: DVec3) -> DVec3 {
        let l = &self.0;
        let x = n.x;
        let y = n.y;
        let z = n.z;
        DVec3::new(
            l[3] + l[4] * y - 2.0 * l[6] * x + l[7] * z + 2.0 * l[8] * x,
            l[1] + l[4] * x + l[5] * z - 2.0 * l[6] * y - 2.0 * l[8] * y,
            l[2] + l[5] * y + 4.0 * l[6] * z + l[7] * x,
        )
    }
}

pub fn eval_sh(coeffs: &ShCoeffs, normals: &[DVec3]) -> Vec<f64> {
    normals.iter().map(|n| coeffs.shade(*n)).collect()
}

/// Least-squares lighting fit through the normal equations `(AᵀA) l = Aᵀ(I / a)`.
pub fn fit_sh(normals: &[DVec3], intensities: &[f64], albedos: &[f64]) -> Result<ShCoeffs> {
    if normals.len() != intensities.len() || normals.len() != albedos.len() {
        return Err(contract(format!(
            "lighting fit needs aligned inputs, got {} normals, {} intensities, {} albedos",
            normals.len(),
            intensities.len(),
            albedos.len()
        )));
    }

    let mut ata = [[0.0f64; SH_COEFF_COUNT]; SH_COEFF_COUNT];
    let mut atb = [0.0f64; SH_COEFF_COUNT];
    for ((n, intensity), albedo) in normals.iter().zip(intensities).zip(albedos) {
        let row = sh_basis(*n);
        let target = intensity / albedo;
        for i in 0..SH_COEFF_COUNT {
            atb[i] += row[i] * target;
            for j in 0..SH_COEFF_COUNT {
                ata[i][j] += row[i] * row[j];
            }
        }
    }

    solve_square(ata, atb)
        .map(ShCoeffs)
        .ok_or(RefineError::SingularLighting)
}

#[allow(clippy::needless_range_loop)]
fn solve_square<const N: usize>(matrix: [[f64; N]; N], rhs: [f64; N]) -> Option<[f64; N]> {
    let mut a = matrix;
    let mut b = rhs;
    let scale = a
        .iter()
        .flatten()
        .fold(0.0f64, |acc, value| acc.max(value.abs()));
    if scale == 0.0 || !scale.is_finite() {
        return None;
    }

    for i in 0..N {
        let mut pivot = i;
        let mut max = a[i][i].abs();
        for r in (i + 1)..N {
            let value = a[r][i].abs();
            if value > max {
                max = value;
                pivot = r;
            }
        }
        if !max.is_finite() || max <= scale * PIVOT_EPS {
            return None;
        }
        if pivot != i {
            a.swap(i, pivot);
            b.swap(i, pivot);
        }

        let inv = 1.0 / a[i][i];
        for r in (i + 1)..N {
            let factor = a[r][i] * inv;
            if factor == 0.0 {
                continue;
            }
            for c in i..N {
                a[r][c] -= factor * a[i][c];
            }
            b[r] -= factor * b[i];
        }
    }

    let mut x = [0.0f64; N];
    for i in (0..N).rev() {
        let mut sum = b[i];
        for c in (i + 1)..N {
            sum -= a[i][c] * x[c];
        }
        x[i] = sum / a[i][i];
    }
    if x.iter().any(|value| !value.is_finite()) {
        return None;
    }
    Some(x)
}
