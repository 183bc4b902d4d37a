use crate::error::{contract, Result};

/// Per-keyframe visibility of the data selection, with confidence weights.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Association {
    pub mask: Vec<Vec<bool>>,
    pub weight: Vec<Vec<f64>>,
}

impl Association {
    pub fn keyframe_count(&self) -> usize {
        self.mask.len()
    }

    pub fn validate(&self, keyframes: usize, selected: usize) -> Result<()> {
        if self.mask.len() != keyframes || self.weight.len() != keyframes {
            return Err(contract(format!(
                "association covers {} mask rows and {} weight rows, expected {keyframes} keyframes",
                self.mask.len(),
                self.weight.len()
            )));
        }
        for (kf, (mask, weight)) in self.mask.iter().zip(&self.weight).enumerate() {
            if mask.len() != selected || weight.len() != selected {
                return Err(contract(format!(
                    "association row {kf} has {} mask and {} weight entries, expected {selected}",
                    mask.len(),
                    weight.len()
                )));
            }
            if let Some(entry) = mask
                .iter()
                .zip(weight)
                .position(|(on, w)| *on && !(w.is_finite() && *w >= 0.0))
            {
                return Err(contract(format!(
                    "association row {kf} entry {entry} has invalid weight {}",
                    weight[entry]
                )));
            }
        }
        Ok(())
    }

    /// `(selection entry, weight)` pairs associated with a keyframe.
    pub fn entries(&self, keyframe: usize) -> impl Iterator<Item = (usize, f64)> + '_ {
        let mask = self.mask.get(keyframe).map(Vec::as_slice).unwrap_or(&[]);
        let weight = self.weight.get(keyframe).map(Vec::as_slice).unwrap_or(&[]);
        mask.iter()
            .zip(weight)
            .enumerate()
            .filter(|(_, (on, _))| **on)
            .map(|(entry, (_, w))| (entry, *w))
    }
}
