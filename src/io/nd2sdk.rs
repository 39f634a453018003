//! Reading ND2 files through Nikon's nd2ReadSDK.
//!
//! The SDK is loaded at runtime, so building with the `nd2sdk` feature needs no
//! SDK present. [`Nd2SdkLibrary::load`] looks for the library named by the
//! `ND2SDK_LIBRARY` environment variable, falling back to the platform's default
//! library name on the usual search path:
//!
//! ```no_run
//! use nd2data::io::nd2sdk::{Nd2SdkLibrary, SdkEngine};
//! use nd2data::io::Nd2Reader;
//!
//! let library = Nd2SdkLibrary::load_from("/opt/nd2sdk/lib/libnd2ReadSDK.so")?;
//! let mut reader = Nd2Reader::new(SdkEngine::new(library));
//! reader.open("experiment.nd2")?;
//! let frame = reader.read_sequence(0)?;
//! println!("{:?}", frame.local);
//! # Ok::<(), nd2data::io::Nd2Error>(())
//! ```
mod engine;
pub mod ffi;

pub use engine::SdkEngine;
pub use ffi::Nd2SdkLibrary;
