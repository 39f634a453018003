use super::{Attributes, Binaries, Experiment, LoopKind, MetadataDesc, TextInfo};

/// Every structure the decoding engine reports about a file, fetched once when
/// the file is opened.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FileMetadata {
    pub attributes: Attributes,
    pub text_info: TextInfo,
    pub description: MetadataDesc,
    pub experiment: Experiment,
    pub binaries: Binaries,
}

impl FileMetadata {
    pub fn new(
        attributes: Attributes,
        text_info: TextInfo,
        description: MetadataDesc,
        experiment: Experiment,
        binaries: Binaries,
    ) -> Self {
        Self {
            attributes,
            text_info,
            description,
            experiment,
            binaries,
        }
    }

    pub fn dimensions(&self) -> Dimensions {
        Dimensions::from_metadata(&self.attributes, &self.experiment)
    }
}

/// Convenience sizes derived from a file's [`Attributes`] and [`Experiment`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
    /// Number of components per pixel
    pub channels: u32,
    /// Loop size of the time dimension, 1 without one
    pub frames: u32,
    /// Loop size of the z dimension, 1 without one
    pub slices: u32,
}

impl Default for Dimensions {
    fn default() -> Self {
        Self {
            width: 1,
            height: 1,
            channels: 1,
            frames: 1,
            slices: 1,
        }
    }
}

impl Dimensions {
    /// Derive the sizes. If the experiment repeats the time or z kind, the
    /// last matching level supplies the count.
    pub fn from_metadata(attributes: &Attributes, experiment: &Experiment) -> Self {
        let mut dims = Self {
            width: attributes.width,
            height: attributes.height,
            channels: attributes.components,
            ..Default::default()
        };
        if let Some(frames) = experiment.last_loop_size(LoopKind::Time) {
            dims.frames = frames;
        }
        if let Some(slices) = experiment.last_loop_size(LoopKind::Z) {
            dims.slices = slices;
        }
        dims
    }

    /// Whether `sequence_count` frames can be arranged as a channels × slices × frames
    /// hyperstack without leftovers. `sequence_count` counts whole multi-component frames.
    pub fn is_hyperstack(&self, sequence_count: u32) -> bool {
        self.slices as u64 * self.frames as u64 == sequence_count as u64
            && (self.slices > 1 || self.frames > 1)
    }
}
