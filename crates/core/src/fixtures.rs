//! Synthetic scenes shared by unit tests.

use glam::{DMat4, DVec3, DVec4};
use image::{ImageBuffer, Luma, Rgb};

use crate::association::Association;
use crate::camera::{DepthImage, Intrinsics, Keyframe};
use crate::grid::{Direction, NeighborSlots, VoxelGrid};
use crate::lighting::ShCoeffs;
use crate::objective::Scene;
use crate::selection::{ChromaEdges, DataSelection, EdgeSet, LaplacianStencil, Selection};

pub const GRID_DIM: usize = 5;
pub const VOXEL_SIZE: f64 = 0.01;
pub const TRUNCATION: f64 = 0.04;
pub const PLANE_Z: f64 = 0.02;
pub const CAMERA_HEIGHT: f64 = 0.5;
pub const IMAGE_SIZE: u32 = 64;
pub const GRAY_LEVEL: u8 = 128;

pub const TEST_LIGHT: ShCoeffs =
    ShCoeffs([0.6, 0.05, 0.3, -0.1, 0.02, -0.03, 0.04, 0.01, -0.02]);

pub struct PlanarScene {
    pub grid: VoxelGrid,
    pub selection: Selection,
    pub association: Association,
    pub keyframes: Vec<Keyframe>,
    pub tsdf: Vec<f64>,
    pub colors: Vec<[f64; 3]>,
    pub intrinsics: Intrinsics,
}

impl PlanarScene {
    pub fn scene(&self) -> Scene {
        Scene {
            grid: self.grid.clone(),
            selection: self.selection.clone(),
            association: self.association.clone(),
            keyframes: self.keyframes.clone(),
            tsdf: self.tsdf.clone(),
            colors: self.colors.clone(),
        }
    }

    pub fn voxel(&self, i: usize, j: usize, k: usize) -> usize {
        voxel_id(i, j, k)
    }
}

pub fn voxel_id(i: usize, j: usize, k: usize) -> usize {
    (k * GRID_DIM + j) * GRID_DIM + i
}

fn step(i: usize, j: usize, k: usize, direction: Direction) -> Option<usize> {
    let (di, dj, dk): (isize, isize, isize) = match direction {
        Direction::XPlus => (1, 0, 0),
        Direction::XMinus => (-1, 0, 0),
        Direction::YPlus => (0, 1, 0),
        Direction::YMinus => (0, -1, 0),
        Direction::ZPlus => (0, 0, 1),
        Direction::ZMinus => (0, 0, -1),
    };
    let range = 0..GRID_DIM as isize;
    let (ni, nj, nk) = (i as isize + di, j as isize + dj, k as isize + dk);
    if range.contains(&ni) && range.contains(&nj) && range.contains(&nk) {
        Some(voxel_id(ni as usize, nj as usize, nk as usize))
    } else {
        None
    }
}

fn cells() -> impl Iterator<Item = (usize, usize, usize)> {
    (0..GRID_DIM).flat_map(|k| (0..GRID_DIM).flat_map(move |j| (0..GRID_DIM).map(move |i| (i, j, k))))
}

pub fn cube_grid() -> VoxelGrid {
    let mut coords = Vec::new();
    let mut neighbors: Vec<NeighborSlots> = Vec::new();
    for (i, j, k) in cells() {
        coords.push(DVec3::new(i as f64, j as f64, k as f64) * VOXEL_SIZE);
        neighbors.push(Direction::ALL.map(|direction| step(i, j, k, direction)));
    }
    VoxelGrid::new(coords, neighbors).expect("cube grid is consistent")
}

pub fn cube_selection() -> Selection {
    let mut data = DataSelection::default();
    let mut laplacian = LaplacianStencil::default();
    let mut edges = ChromaEdges::default();
    for (i, j, k) in cells() {
        let id = voxel_id(i, j, k);
        let interior = |lo: usize, hi: usize| {
            (lo..=hi).contains(&i) && (lo..=hi).contains(&j) && (lo..=hi).contains(&k)
        };
        if interior(1, GRID_DIM - 3) {
            data.center.push(id);
            data.x_plus.push(voxel_id(i + 1, j, k));
            data.y_plus.push(voxel_id(i, j + 1, k));
            data.z_plus.push(voxel_id(i, j, k + 1));
        }
        if interior(1, GRID_DIM - 2) {
            laplacian.center.push(id);
            laplacian.x_plus.push(voxel_id(i + 1, j, k));
            laplacian.x_minus.push(voxel_id(i - 1, j, k));
            laplacian.y_plus.push(voxel_id(i, j + 1, k));
            laplacian.y_minus.push(voxel_id(i, j - 1, k));
            laplacian.z_plus.push(voxel_id(i, j, k + 1));
            laplacian.z_minus.push(voxel_id(i, j, k - 1));
        }
        for direction in Direction::ALL {
            if let Some(nb) = step(i, j, k, direction) {
                let set: &mut EdgeSet = match direction {
                    Direction::XPlus => &mut edges.x_plus,
                    Direction::XMinus => &mut edges.x_minus,
                    Direction::YPlus => &mut edges.y_plus,
                    Direction::YMinus => &mut edges.y_minus,
                    Direction::ZPlus => &mut edges.z_plus,
                    Direction::ZMinus => &mut edges.z_minus,
                };
                set.self_ids.push(id);
                set.neighbor_ids.push(nb);
            }
        }
    }
    Selection {
        data,
        laplacian,
        chroma_edges: edges,
    }
}

pub fn planar_tsdf(grid: &VoxelGrid) -> Vec<f64> {
    grid.coords
        .iter()
        .map(|c| (c.z - PLANE_Z) / TRUNCATION)
        .collect()
}

/// Planar TSDF with a deterministic ripple, so normals vary between voxels.
pub fn perturbed_tsdf(grid: &VoxelGrid) -> Vec<f64> {
    grid.coords
        .iter()
        .map(|c| (c.z - PLANE_Z) / TRUNCATION + 0.04 * (113.0 * c.x + 71.0 * c.y + 37.0 * c.z).sin())
        .collect()
}

pub fn varied_albedo(count: usize) -> Vec<f64> {
    (0..count)
        .map(|idx| 0.5 + 0.02 * ((idx * 7) % 11) as f64)
        .collect()
}

/// Camera above the plane looking straight down (-z), OpenCV axes.
pub fn overhead_pose() -> DMat4 {
    let center = VOXEL_SIZE * (GRID_DIM as f64 - 1.0) * 0.5;
    DMat4::from_cols(
        DVec4::new(1.0, 0.0, 0.0, 0.0),
        DVec4::new(0.0, -1.0, 0.0, 0.0),
        DVec4::new(0.0, 0.0, -1.0, 0.0),
        DVec4::new(center, center, PLANE_Z + CAMERA_HEIGHT, 1.0),
    )
}

pub fn test_intrinsics() -> Intrinsics {
    Intrinsics {
        fx: 500.0,
        fy: 500.0,
        cx: IMAGE_SIZE as f64 * 0.5,
        cy: IMAGE_SIZE as f64 * 0.5,
    }
}

pub fn uniform_keyframe(gray: u8, depth_mm: u16) -> Keyframe {
    let color = ImageBuffer::from_pixel(IMAGE_SIZE, IMAGE_SIZE, Rgb([gray, gray, gray]));
    let depth: DepthImage = ImageBuffer::from_pixel(IMAGE_SIZE, IMAGE_SIZE, Luma([depth_mm]));
    Keyframe::new(color, depth, overhead_pose()).expect("matching image sizes")
}

pub fn planar_scene() -> PlanarScene {
    let grid = cube_grid();
    let selection = cube_selection();
    let tsdf = planar_tsdf(&grid);
    let colors = vec![[0.5, 0.5, 0.5]; grid.len()];
    let selected = selection.data.len();
    PlanarScene {
        association: Association {
            mask: vec![vec![true; selected]],
            weight: vec![vec![1.0; selected]],
        },
        keyframes: vec![uniform_keyframe(GRAY_LEVEL, 500)],
        intrinsics: test_intrinsics(),
        grid,
        selection,
        tsdf,
        colors,
    }
}

/// Roughly uniform unit directions on the sphere.
pub fn fibonacci_directions(count: usize) -> Vec<DVec3> {
    let golden = std::f64::consts::PI * (3.0 - 5.0f64.sqrt());
    (0..count)
        .map(|idx| {
            let y = 1.0 - 2.0 * (idx as f64 + 0.5) / count as f64;
            let radius = (1.0 - y * y).sqrt();
            let theta = golden * idx as f64;
            DVec3::new(radius * theta.cos(), y, radius * theta.sin())
        })
        .collect()
}
