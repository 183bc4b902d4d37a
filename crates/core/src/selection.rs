use crate::error::{contract, Result};
use crate::grid::{Direction, VoxelGrid};

/// Voxels probed by the photometric term. Entry `j` of each offset array is the
/// +axis neighbor of `center[j]`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DataSelection {
    pub center: Vec<usize>,
    pub x_plus: Vec<usize>,
    pub y_plus: Vec<usize>,
    pub z_plus: Vec<usize>,
}

impl DataSelection {
    pub fn len(&self) -> usize {
        self.center.len()
    }

    pub fn is_empty(&self) -> bool {
        self.center.is_empty()
    }

    pub fn offsets(&self) -> [&[usize]; 3] {
        [&self.x_plus, &self.y_plus, &self.z_plus]
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LaplacianStencil {
    pub center: Vec<usize>,
    pub x_plus: Vec<usize>,
    pub x_minus: Vec<usize>,
    pub y_plus: Vec<usize>,
    pub y_minus: Vec<usize>,
    pub z_plus: Vec<usize>,
    pub z_minus: Vec<usize>,
}

impl LaplacianStencil {
    pub fn len(&self) -> usize {
        self.center.len()
    }

    pub fn is_empty(&self) -> bool {
        self.center.is_empty()
    }

    pub fn arm(&self, direction: Direction) -> &[usize] {
        match direction {
            Direction::XPlus => &self.x_plus,
            Direction::XMinus => &self.x_minus,
            Direction::YPlus => &self.y_plus,
            Direction::YMinus => &self.y_minus,
            Direction::ZPlus => &self.z_plus,
            Direction::ZMinus => &self.z_minus,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct EdgeSet {
    pub self_ids: Vec<usize>,
    pub neighbor_ids: Vec<usize>,
}

impl EdgeSet {
    pub fn len(&self) -> usize {
        self.self_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.self_ids.is_empty()
    }

    pub fn pairs(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.self_ids
            .iter()
            .copied()
            .zip(self.neighbor_ids.iter().copied())
    }
}

/// Albedo smoothness edges, one set per axial direction.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChromaEdges {
    pub x_plus: EdgeSet,
    pub x_minus: EdgeSet,
    pub y_plus: EdgeSet,
    pub y_minus: EdgeSet,
    pub z_plus: EdgeSet,
    pub z_minus: EdgeSet,
}

impl ChromaEdges {
    pub fn get(&self, direction: Direction) -> &EdgeSet {
        match direction {
            Direction::XPlus => &self.x_plus,
            Direction::XMinus => &self.x_minus,
            Direction::YPlus => &self.y_plus,
            Direction::YMinus => &self.y_minus,
            Direction::ZPlus => &self.z_plus,
            Direction::ZMinus => &self.z_minus,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Selection {
    pub data: DataSelection,
    pub laplacian: LaplacianStencil,
    pub chroma_edges: ChromaEdges,
}

impl Selection {
    pub fn validate(&self, grid: &VoxelGrid) -> Result<()> {
        let data_len = self.data.len();
        for (name, ids) in [
            ("index_data_xp", &self.data.x_plus),
            ("index_data_yp", &self.data.y_plus),
            ("index_data_zp", &self.data.z_plus),
        ] {
            expect_len(name, ids.len(), data_len)?;
        }
        check_ids(grid, "index_data_c", &self.data.center)?;
        for (axis, ids) in self.data.offsets().into_iter().enumerate() {
            let (plus, _) = Direction::axis_pair(axis);
            check_ids(grid, &format!("index_data_{}", plus.label()), ids)?;
        }

        let lap_len = self.laplacian.len();
        check_ids(grid, "index_lap_c", &self.laplacian.center)?;
        for direction in Direction::ALL {
            let name = format!("index_lap_{}", direction.label());
            let arm = self.laplacian.arm(direction);
            expect_len(&name, arm.len(), lap_len)?;
            check_ids(grid, &name, arm)?;
        }

        for direction in Direction::ALL {
            let edges = self.chroma_edges.get(direction);
            let label = direction.label();
            expect_len(
                &format!("index_{label}_nb"),
                edges.neighbor_ids.len(),
                edges.self_ids.len(),
            )?;
            check_ids(grid, &format!("index_{label}_self"), &edges.self_ids)?;
            check_ids(grid, &format!("index_{label}_nb"), &edges.neighbor_ids)?;
        }
        Ok(())
    }
}

fn expect_len(name: &str, actual: usize, expected: usize) -> Result<()> {
    if actual == expected {
        Ok(())
    } else {
        Err(contract(format!(
            "{name} has {actual} entries, expected {expected}"
        )))
    }
}

fn check_ids(grid: &VoxelGrid, name: &str, ids: &[usize]) -> Result<()> {
    ids.iter()
        .try_for_each(|voxel| grid.check_index(*voxel, name))
}
