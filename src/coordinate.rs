//! Conversion between a linear sequence index and a position in the
//! multi-dimensional experiment.
//!
//! The loop sizes of an [`Experiment`]'s levels act as the radices of a
//! mixed-radix number. The first declared level is the outermost loop and so
//! the most significant digit, the last declared level varies fastest.
use std::fmt::Display;

use thiserror::Error;

use crate::meta::{Experiment, LoopKind};

/// A position in the experiment, one coordinate per [`LoopKind`].
///
/// A dimension the experiment does not loop over is always at 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ExperimentCoordinates {
    pub time: u32,
    pub multipoint: u32,
    pub z: u32,
    pub other: u32,
}

impl ExperimentCoordinates {
    pub const fn new(time: u32, multipoint: u32, z: u32, other: u32) -> Self {
        Self {
            time,
            multipoint,
            z,
            other,
        }
    }

    pub const fn get(&self, kind: LoopKind) -> u32 {
        match kind {
            LoopKind::Time => self.time,
            LoopKind::MultiPoint => self.multipoint,
            LoopKind::Z => self.z,
            LoopKind::Other => self.other,
        }
    }

    pub fn set(&mut self, kind: LoopKind, value: u32) {
        match kind {
            LoopKind::Time => self.time = value,
            LoopKind::MultiPoint => self.multipoint = value,
            LoopKind::Z => self.z = value,
            LoopKind::Other => self.other = value,
        }
    }

    /// The coordinates as `[time, multipoint, z, other]`
    pub const fn to_array(&self) -> [u32; 4] {
        [self.time, self.multipoint, self.z, self.other]
    }
}

impl From<[u32; 4]> for ExperimentCoordinates {
    fn from(value: [u32; 4]) -> Self {
        Self::new(value[0], value[1], value[2], value[3])
    }
}

impl From<ExperimentCoordinates> for [u32; 4] {
    fn from(value: ExperimentCoordinates) -> Self {
        value.to_array()
    }
}

impl Display for ExperimentCoordinates {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "(t={}, m={}, z={}, o={})",
            self.time, self.multipoint, self.z, self.other
        )
    }
}

/// A requested position lies outside of the experiment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum OutOfRangeError {
    #[error("The {kind} coordinate {value} is outside of a loop of size {size}")]
    Coordinate {
        kind: LoopKind,
        value: u64,
        size: u64,
    },
    #[error("The sequence index {index} is outside of a sequence of length {count}")]
    SequenceIndex { index: usize, count: usize },
}

/// Maps between sequence indices and [`ExperimentCoordinates`] for one experiment.
///
/// A kind may be declared by more than one level. Its coordinate is then itself a
/// mixed-radix number over those levels, in declaration order, so the mapping stays
/// a bijection.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CoordinateMapper {
    levels: Vec<(LoopKind, u64)>,
    sequence_count: u64,
}

impl CoordinateMapper {
    pub fn new(experiment: &Experiment) -> Self {
        let levels: Vec<(LoopKind, u64)> = experiment
            .iter()
            .map(|level| (level.kind, level.loop_size as u64))
            .collect();
        let sequence_count = levels
            .iter()
            .fold(1u64, |acc, (_, size)| acc.saturating_mul(*size));
        Self {
            levels,
            sequence_count,
        }
    }

    /// The number of frames the experiment's loops produce
    pub fn sequence_count(&self) -> usize {
        self.sequence_count as usize
    }

    /// Whether any level loops over `kind`
    pub fn has_dimension(&self, kind: LoopKind) -> bool {
        self.levels.iter().any(|(k, _)| *k == kind)
    }

    /// The number of distinct coordinates along `kind`, 1 for an absent dimension
    pub fn loop_size(&self, kind: LoopKind) -> u64 {
        self.levels
            .iter()
            .filter(|(k, _)| *k == kind)
            .fold(1u64, |acc, (_, size)| acc.saturating_mul(*size))
    }

    /// Convert `coords` into the linear sequence index of that frame.
    ///
    /// # Errors
    /// [`OutOfRangeError::Coordinate`] if any coordinate is not smaller than the
    /// loop size of its dimension.
    pub fn seq_index_from_coords(
        &self,
        coords: &ExperimentCoordinates,
    ) -> Result<usize, OutOfRangeError> {
        let mut digits = vec![0u64; self.levels.len()];
        for kind in LoopKind::ALL {
            let value = coords.get(kind) as u64;
            let size = self.loop_size(kind);
            if value >= size {
                return Err(OutOfRangeError::Coordinate { kind, value, size });
            }
            // `value < size` guarantees every level of this kind is non-empty
            let mut rest = value;
            for (digit, (_, level_size)) in digits
                .iter_mut()
                .zip(self.levels.iter())
                .rev()
                .filter(|(_, (k, _))| *k == kind)
            {
                *digit = rest % level_size;
                rest /= level_size;
            }
        }

        let index = self
            .levels
            .iter()
            .zip(digits)
            .fold(0u64, |acc, ((_, size), digit)| acc * size + digit);
        Ok(index as usize)
    }

    /// Convert a linear sequence index into the coordinates of that frame.
    ///
    /// # Errors
    /// [`OutOfRangeError::SequenceIndex`] if `index` is not smaller than
    /// [`CoordinateMapper::sequence_count`], [`OutOfRangeError::Coordinate`] if a
    /// repeated kind's combined coordinate does not fit in a `u32`.
    pub fn coords_from_seq_index(
        &self,
        index: usize,
    ) -> Result<ExperimentCoordinates, OutOfRangeError> {
        if index as u64 >= self.sequence_count {
            return Err(OutOfRangeError::SequenceIndex {
                index,
                count: self.sequence_count(),
            });
        }
        let mut rest = index as u64;
        let mut digits = vec![0u64; self.levels.len()];
        for (digit, (_, size)) in digits.iter_mut().zip(self.levels.iter()).rev() {
            *digit = rest % size;
            rest /= size;
        }

        let mut coords = ExperimentCoordinates::default();
        for ((kind, size), digit) in self.levels.iter().zip(digits) {
            let value = coords.get(*kind) as u64 * size + digit;
            let value = u32::try_from(value).map_err(|_| OutOfRangeError::Coordinate {
                kind: *kind,
                value,
                size: self.loop_size(*kind),
            })?;
            coords.set(*kind, value);
        }
        Ok(coords)
    }
}

impl From<&Experiment> for CoordinateMapper {
    fn from(value: &Experiment) -> Self {
        Self::new(value)
    }
}

/// Convert `coords` into a sequence index within `experiment`.
///
/// See [`CoordinateMapper::seq_index_from_coords`].
pub fn seq_index_from_coords(
    experiment: &Experiment,
    coords: &ExperimentCoordinates,
) -> Result<usize, OutOfRangeError> {
    CoordinateMapper::new(experiment).seq_index_from_coords(coords)
}

/// Convert a sequence index into coordinates within `experiment`.
///
/// See [`CoordinateMapper::coords_from_seq_index`].
pub fn coords_from_seq_index(
    experiment: &Experiment,
    index: usize,
) -> Result<ExperimentCoordinates, OutOfRangeError> {
    CoordinateMapper::new(experiment).coords_from_seq_index(index)
}
