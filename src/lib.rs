//! `nd2data` exposes Nikon ND2 microscopy files as typed metadata and raw frame buffers.
//!
//! A [`Nd2Reader`](crate::io::Nd2Reader) drives a [`DecodingEngine`](crate::io::DecodingEngine)
//! that does the actual file decoding. With the `nd2sdk` feature that engine is Nikon's
//! nd2ReadSDK, loaded at runtime. On top of the engine this crate provides:
//!
//! - a flat, sorted [`MetadataMap`] of every structure in the file, including the
//!   settings buried in its free text ([`meta::flatten_metadata`])
//! - conversion between sequence indices and experiment coordinates ([`coordinate`])
//! - the byte layout of decoded frames and views to read samples with ([`picture`])
//!
//! ```
//! use nd2data::prelude::*;
//! use nd2data::io::{MemoryEngine, MemoryFile};
//! use nd2data::meta::{Attributes, FileMetadata};
//!
//! let attributes = Attributes {
//!     width: 2,
//!     height: 2,
//!     components: 1,
//!     bpc_in_memory: 8,
//!     sequence_count: 1,
//!     ..Default::default()
//! };
//! let metadata = FileMetadata { attributes, ..Default::default() };
//! let file = MemoryFile::new(metadata).with_frame(vec![1, 2, 0, 0, 3, 4, 0, 0], Default::default());
//!
//! let mut reader = Nd2Reader::new(MemoryEngine::new().with_file("demo.nd2", file));
//! reader.open("demo.nd2")?;
//! assert_eq!(reader.metadata()?["uiWidth"], Value::Int(2));
//! let frame = reader.read_sequence(0)?;
//! assert_eq!(frame.picture.sample(1, 1, 0), Some(4));
//! # Ok::<(), nd2data::io::Nd2Error>(())
//! ```
pub mod coordinate;
pub mod io;
pub mod meta;
pub mod params;
pub mod picture;
pub mod prelude;

pub use crate::coordinate::{CoordinateMapper, ExperimentCoordinates, OutOfRangeError};
pub use crate::io::{DecodingEngine, Nd2Error, Nd2Reader};
pub use crate::meta::{Dimensions, FileMetadata, LocalMetadata};
pub use crate::params::{MetadataMap, Value};
pub use crate::picture::{Picture, PictureLayout, PictureView};

#[cfg(feature = "nd2sdk")]
pub use crate::io::ND2Reader;
