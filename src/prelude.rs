//! A set of traits and types that are commonly needed to read files
pub use crate::coordinate::{CoordinateMapper, ExperimentCoordinates};
pub use crate::io::{DecodingEngine, Nd2Error, Nd2Reader, SequenceFrame};
pub use crate::meta::{FileMetadata, LoopKind};
pub use crate::params::{MetadataMap, Value};
pub use crate::picture::{PictureLayout, PictureView};
