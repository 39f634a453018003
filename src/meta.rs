//! The data model for everything a decoding engine reports about a file, and the
//! flattening of it into a [`MetadataMap`](crate::params::MetadataMap).
pub mod attributes;
pub mod binaries;
pub mod description;
pub mod experiment;
pub mod file_metadata;
pub mod flatten;
pub mod local;
pub mod text_info;
pub mod text_mining;

pub use crate::meta::attributes::{Attributes, CompressionType};
pub use crate::meta::binaries::{Binaries, BinaryDescriptor, MAX_BINARIES};
pub use crate::meta::description::{
    ImageType, MetadataDesc, PicturePlaneDesc, RgbColor, MAX_PICTURE_PLANES,
};
pub use crate::meta::experiment::{
    Experiment, ExperimentLevel, LoopKind, UnknownLoopKind, MAX_EXPERIMENT_LEVELS,
};
pub use crate::meta::file_metadata::{Dimensions, FileMetadata};
pub use crate::meta::flatten::{flatten_metadata, flatten_structures};
pub use crate::meta::local::LocalMetadata;
pub use crate::meta::text_info::{TextInfo, LONG_TEXT_LENGTH, SHORT_TEXT_LENGTH};
pub use crate::meta::text_mining::{mine_text, mine_text_info};
