use std::fmt::Display;

use thiserror::Error;

/// The maximum number of levels an experiment can declare
pub const MAX_EXPERIMENT_LEVELS: usize = 8;

/// The dimension an [`ExperimentLevel`] loops over
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum LoopKind {
    Time,
    MultiPoint,
    Z,
    Other,
}

impl LoopKind {
    /// All kinds, in the order coordinate vectors store them
    pub const ALL: [LoopKind; 4] = [Self::Time, Self::MultiPoint, Self::Z, Self::Other];

    pub const fn code(&self) -> u32 {
        match self {
            Self::Time => 0,
            Self::MultiPoint => 1,
            Self::Z => 2,
            Self::Other => 3,
        }
    }

    /// The position of this kind in a coordinate vector
    pub const fn slot(&self) -> usize {
        self.code() as usize
    }
}

impl Display for LoopKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Time => "time",
            Self::MultiPoint => "multipoint",
            Self::Z => "z",
            Self::Other => "other",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("Unknown experiment loop type {0}")]
pub struct UnknownLoopKind(pub u32);

impl TryFrom<u32> for LoopKind {
    type Error = UnknownLoopKind;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Time),
            1 => Ok(Self::MultiPoint),
            2 => Ok(Self::Z),
            3 => Ok(Self::Other),
            _ => Err(UnknownLoopKind(value)),
        }
    }
}

/// One dimension of a multi-dimensional acquisition
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ExperimentLevel {
    pub kind: LoopKind,
    /// Number of frames along this dimension
    pub loop_size: u32,
    /// Milliseconds for time loops, micrometers for z-stacks, -1.0 otherwise
    pub interval: f64,
}

impl ExperimentLevel {
    pub fn new(kind: LoopKind, loop_size: u32, interval: f64) -> Self {
        Self {
            kind,
            loop_size,
            interval,
        }
    }

    /// A level with the interval the engine reports for loops without one
    pub fn without_interval(kind: LoopKind, loop_size: u32) -> Self {
        Self::new(kind, loop_size, -1.0)
    }
}

/// The ordered loops of an acquisition.
///
/// The first level is the outermost loop. Kinds may repeat and need not
/// appear in any particular order.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Experiment {
    pub levels: Vec<ExperimentLevel>,
}

impl Experiment {
    pub fn new(levels: Vec<ExperimentLevel>) -> Self {
        Self { levels }
    }

    pub fn len(&self) -> usize {
        self.levels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ExperimentLevel> {
        self.levels.iter()
    }

    /// The loop size of the last level of the given kind, if any.
    ///
    /// When a kind is declared more than once the last declaration wins.
    pub fn last_loop_size(&self, kind: LoopKind) -> Option<u32> {
        self.levels
            .iter()
            .rev()
            .find(|level| level.kind == kind)
            .map(|level| level.loop_size)
    }
}

impl<'a> IntoIterator for &'a Experiment {
    type Item = &'a ExperimentLevel;
    type IntoIter = std::slice::Iter<'a, ExperimentLevel>;

    fn into_iter(self) -> Self::IntoIter {
        self.levels.iter()
    }
}

impl FromIterator<ExperimentLevel> for Experiment {
    fn from_iter<T: IntoIterator<Item = ExperimentLevel>>(iter: T) -> Self {
        Self::new(iter.into_iter().collect())
    }
}
