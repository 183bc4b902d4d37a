//! JSON archives exchanged with the fusion pipeline. Key names are part of the
//! file format and stay fixed.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use glam::DVec3;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::association::Association;
use crate::error::{contract, RefineError, Result};
use crate::grid::{Direction, NeighborSlots, VoxelGrid};
use crate::selection::{ChromaEdges, DataSelection, EdgeSet, LaplacianStencil, Selection};

pub const SPATIAL_FILE: &str = "voxels_spatial.json";
pub const SELECTION_FILE: &str = "tsdf_selection.json";
pub const ASSOCIATION_FILE: &str = "tsdf_association.json";
pub const INPUT_VOXELS_FILE: &str = "colored_voxels_fine.json";
pub const OUTPUT_VOXELS_FILE: &str = "colored_voxels_refined.json";

pub fn read_archive<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let bytes = std::fs::read(path).map_err(|source| RefineError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_slice(&bytes).map_err(|source| RefineError::Archive {
        path: path.to_path_buf(),
        source,
    })
}

pub fn write_archive<T: Serialize>(path: &Path, archive: &T) -> Result<()> {
    let io_err = |source| RefineError::Io {
        path: path.to_path_buf(),
        source,
    };
    let file = File::create(path).map_err(io_err)?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer(&mut writer, archive).map_err(|source| RefineError::Archive {
        path: path.to_path_buf(),
        source,
    })?;
    writer.flush().map_err(io_err)
}

fn to_ids(name: &str, raw: &[i64]) -> Result<Vec<usize>> {
    raw.iter()
        .enumerate()
        .map(|(entry, id)| {
            usize::try_from(*id)
                .map_err(|_| contract(format!("{name}[{entry}] holds negative voxel id {id}")))
        })
        .collect()
}

fn from_ids(ids: &[usize]) -> Vec<i64> {
    ids.iter().map(|id| *id as i64).collect()
}

fn to_slot(id: i64) -> Option<usize> {
    usize::try_from(id).ok()
}

fn from_slot(slot: Option<usize>) -> i64 {
    slot.map_or(-1, |id| id as i64)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpatialArchive {
    pub voxel_coords: Vec<[f64; 3]>,
    pub index_xp: Vec<i64>,
    pub index_xm: Vec<i64>,
    pub index_yp: Vec<i64>,
    pub index_ym: Vec<i64>,
    pub index_zp: Vec<i64>,
    pub index_zm: Vec<i64>,
}

impl SpatialArchive {
    fn table(&self, direction: Direction) -> &[i64] {
        match direction {
            Direction::XPlus => &self.index_xp,
            Direction::XMinus => &self.index_xm,
            Direction::YPlus => &self.index_yp,
            Direction::YMinus => &self.index_ym,
            Direction::ZPlus => &self.index_zp,
            Direction::ZMinus => &self.index_zm,
        }
    }

    pub fn into_grid(self) -> Result<VoxelGrid> {
        let count = self.voxel_coords.len();
        for direction in Direction::ALL {
            let len = self.table(direction).len();
            if len != count {
                return Err(contract(format!(
                    "index_{} has {len} entries, voxel_coords has {count}",
                    direction.label()
                )));
            }
        }
        let neighbors: Vec<NeighborSlots> = (0..count)
            .map(|voxel| Direction::ALL.map(|direction| to_slot(self.table(direction)[voxel])))
            .collect();
        let coords = self.voxel_coords.into_iter().map(DVec3::from_array).collect();
        VoxelGrid::new(coords, neighbors)
    }

    pub fn from_grid(grid: &VoxelGrid) -> Self {
        let table = |direction: Direction| -> Vec<i64> {
            grid.neighbors
                .iter()
                .map(|slots| from_slot(slots[direction.slot()]))
                .collect()
        };
        Self {
            voxel_coords: grid.coords.iter().map(|c| c.to_array()).collect(),
            index_xp: table(Direction::XPlus),
            index_xm: table(Direction::XMinus),
            index_yp: table(Direction::YPlus),
            index_ym: table(Direction::YMinus),
            index_zp: table(Direction::ZPlus),
            index_zm: table(Direction::ZMinus),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectionArchive {
    pub index_data_c: Vec<i64>,
    pub index_data_xp: Vec<i64>,
    pub index_data_yp: Vec<i64>,
    pub index_data_zp: Vec<i64>,
    pub index_lap_c: Vec<i64>,
    pub index_lap_xp: Vec<i64>,
    pub index_lap_xm: Vec<i64>,
    pub index_lap_yp: Vec<i64>,
    pub index_lap_ym: Vec<i64>,
    pub index_lap_zp: Vec<i64>,
    pub index_lap_zm: Vec<i64>,
    pub index_xp_self: Vec<i64>,
    pub index_xp_nb: Vec<i64>,
    pub index_xm_self: Vec<i64>,
    pub index_xm_nb: Vec<i64>,
    pub index_yp_self: Vec<i64>,
    pub index_yp_nb: Vec<i64>,
    pub index_ym_self: Vec<i64>,
    pub index_ym_nb: Vec<i64>,
    pub index_zp_self: Vec<i64>,
    pub index_zp_nb: Vec<i64>,
    pub index_zm_self: Vec<i64>,
    pub index_zm_nb: Vec<i64>,
}

fn edge_set(self_name: &str, self_ids: &[i64], nb_name: &str, nb_ids: &[i64]) -> Result<EdgeSet> {
    Ok(EdgeSet {
        self_ids: to_ids(self_name, self_ids)?,
        neighbor_ids: to_ids(nb_name, nb_ids)?,
    })
}

impl SelectionArchive {
    /// Converts ids; range and length checks happen in [`Selection::validate`].
    pub fn into_selection(self) -> Result<Selection> {
        Ok(Selection {
            data: DataSelection {
                center: to_ids("index_data_c", &self.index_data_c)?,
                x_plus: to_ids("index_data_xp", &self.index_data_xp)?,
                y_plus: to_ids("index_data_yp", &self.index_data_yp)?,
                z_plus: to_ids("index_data_zp", &self.index_data_zp)?,
            },
            laplacian: LaplacianStencil {
                center: to_ids("index_lap_c", &self.index_lap_c)?,
                x_plus: to_ids("index_lap_xp", &self.index_lap_xp)?,
                x_minus: to_ids("index_lap_xm", &self.index_lap_xm)?,
                y_plus: to_ids("index_lap_yp", &self.index_lap_yp)?,
                y_minus: to_ids("index_lap_ym", &self.index_lap_ym)?,
                z_plus: to_ids("index_lap_zp", &self.index_lap_zp)?,
                z_minus: to_ids("index_lap_zm", &self.index_lap_zm)?,
            },
            chroma_edges: ChromaEdges {
                x_plus: edge_set("index_xp_self", &self.index_xp_self, "index_xp_nb", &self.index_xp_nb)?,
                x_minus: edge_set("index_xm_self", &self.index_xm_self, "index_xm_nb", &self.index_xm_nb)?,
                y_plus: edge_set("index_yp_self", &self.index_yp_self, "index_yp_nb", &self.index_yp_nb)?,
                y_minus: edge_set("index_ym_self", &self.index_ym_self, "index_ym_nb", &self.index_ym_nb)?,
                z_plus: edge_set("index_zp_self", &self.index_zp_self, "index_zp_nb", &self.index_zp_nb)?,
                z_minus: edge_set("index_zm_self", &self.index_zm_self, "index_zm_nb", &self.index_zm_nb)?,
            },
        })
    }

    pub fn from_selection(selection: &Selection) -> Self {
        let data = &selection.data;
        let lap = &selection.laplacian;
        let edges = &selection.chroma_edges;
        Self {
            index_data_c: from_ids(&data.center),
            index_data_xp: from_ids(&data.x_plus),
            index_data_yp: from_ids(&data.y_plus),
            index_data_zp: from_ids(&data.z_plus),
            index_lap_c: from_ids(&lap.center),
            index_lap_xp: from_ids(&lap.x_plus),
            index_lap_xm: from_ids(&lap.x_minus),
            index_lap_yp: from_ids(&lap.y_plus),
            index_lap_ym: from_ids(&lap.y_minus),
            index_lap_zp: from_ids(&lap.z_plus),
            index_lap_zm: from_ids(&lap.z_minus),
            index_xp_self: from_ids(&edges.x_plus.self_ids),
            index_xp_nb: from_ids(&edges.x_plus.neighbor_ids),
            index_xm_self: from_ids(&edges.x_minus.self_ids),
            index_xm_nb: from_ids(&edges.x_minus.neighbor_ids),
            index_yp_self: from_ids(&edges.y_plus.self_ids),
            index_yp_nb: from_ids(&edges.y_plus.neighbor_ids),
            index_ym_self: from_ids(&edges.y_minus.self_ids),
            index_ym_nb: from_ids(&edges.y_minus.neighbor_ids),
            index_zp_self: from_ids(&edges.z_plus.self_ids),
            index_zp_nb: from_ids(&edges.z_plus.neighbor_ids),
            index_zm_self: from_ids(&edges.z_minus.self_ids),
            index_zm_nb: from_ids(&edges.z_minus.neighbor_ids),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssociationArchive {
    pub association_mask: Vec<Vec<bool>>,
    pub association_weight: Vec<Vec<f64>>,
}

impl From<AssociationArchive> for Association {
    fn from(archive: AssociationArchive) -> Self {
        Association {
            mask: archive.association_mask,
            weight: archive.association_weight,
        }
    }
}

impl From<&Association> for AssociationArchive {
    fn from(association: &Association) -> Self {
        AssociationArchive {
            association_mask: association.mask.clone(),
            association_weight: association.weight.clone(),
        }
    }
}

/// Fused voxel fields before refinement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoxelArchive {
    pub voxel_tsdf: Vec<f64>,
    pub voxel_color: Vec<[f64; 3]>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RefinedVoxelArchive {
    pub voxel_tsdf: Vec<f64>,
    pub voxel_albedo: Vec<f64>,
    pub voxel_color: Vec<[f64; 3]>,
}
