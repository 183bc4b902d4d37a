use glam::DVec3;

use crate::error::{contract, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    XPlus,
    XMinus,
    YPlus,
    YMinus,
    ZPlus,
    ZMinus,
}

impl Direction {
    pub const ALL: [Direction; 6] = [
        Direction::XPlus,
        Direction::XMinus,
        Direction::YPlus,
        Direction::YMinus,
        Direction::ZPlus,
        Direction::ZMinus,
    ];

    pub fn slot(self) -> usize {
        match self {
            Direction::XPlus => 0,
            Direction::XMinus => 1,
            Direction::YPlus => 2,
            Direction::YMinus => 3,
            Direction::ZPlus => 4,
            Direction::ZMinus => 5,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Direction::XPlus => "xp",
            Direction::XMinus => "xm",
            Direction::YPlus => "yp",
            Direction::YMinus => "ym",
            Direction::ZPlus => "zp",
            Direction::ZMinus => "zm",
        }
    }

    /// `(plus, minus)` pair along an axis index `0..3`.
    pub fn axis_pair(axis: usize) -> (Direction, Direction) {
        match axis {
            0 => (Direction::XPlus, Direction::XMinus),
            1 => (Direction::YPlus, Direction::YMinus),
            _ => (Direction::ZPlus, Direction::ZMinus),
        }
    }
}

pub type NeighborSlots = [Option<usize>; 6];

/// Sparse voxel grid: coordinates plus the six axial neighbor ids of each voxel.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VoxelGrid {
    pub coords: Vec<DVec3>,
    pub neighbors: Vec<NeighborSlots>,
}

impl VoxelGrid {
    pub fn new(coords: Vec<DVec3>, neighbors: Vec<NeighborSlots>) -> Result<Self> {
        if coords.len() != neighbors.len() {
            return Err(contract(format!(
                "grid has {} coordinates but {} neighbor entries",
                coords.len(),
                neighbors.len()
            )));
        }
        let count = coords.len();
        for (voxel, slots) in neighbors.iter().enumerate() {
            for (slot, neighbor) in slots.iter().enumerate() {
                if let Some(id) = neighbor {
                    if *id >= count {
                        return Err(contract(format!(
                            "voxel {voxel} neighbor {} points at {id}, grid has {count} voxels",
                            Direction::ALL[slot].label()
                        )));
                    }
                }
            }
        }
        Ok(Self { coords, neighbors })
    }

    pub fn len(&self) -> usize {
        self.coords.len()
    }

    pub fn is_empty(&self) -> bool {
        self.coords.is_empty()
    }

    pub fn neighbor(&self, voxel: usize, direction: Direction) -> Option<usize> {
        self.neighbors
            .get(voxel)
            .and_then(|slots| slots[direction.slot()])
    }

    pub fn check_index(&self, voxel: usize, what: &str) -> Result<()> {
        if voxel < self.len() {
            Ok(())
        } else {
            Err(contract(format!(
                "{what} references voxel {voxel}, grid has {} voxels",
                self.len()
            )))
        }
    }
}
