//! Opening files and reading frames out of them through a [`DecodingEngine`].
pub mod engine;
pub mod memory;
#[cfg(feature = "nd2sdk")]
pub mod nd2sdk;
pub mod reader;

pub use crate::io::engine::{DecodingEngine, EngineOperation, ErrorCode, FileHandle};
pub use crate::io::memory::{MemoryEngine, MemoryFile};
pub use crate::io::reader::{Nd2Error, Nd2Reader, SequenceFrame};

#[cfg(feature = "nd2sdk")]
pub use crate::io::nd2sdk::{Nd2SdkLibrary, SdkEngine};
#[cfg(feature = "nd2sdk")]
pub use crate::io::reader::ND2Reader;
