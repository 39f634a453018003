//! The seam between a reading session and whatever actually decodes the file.
//!
//! An engine hands back fully populated structures and raw frame bytes. It knows
//! nothing about flattening, coordinates or buffer reuse.
use std::fmt::Display;
use std::path::Path;

use thiserror::Error;

use crate::meta::{Attributes, Binaries, Experiment, LocalMetadata, MetadataDesc, TextInfo};
use crate::picture::PictureLayout;

/// An open file as the engine identifies it. Zero is never a valid handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FileHandle(pub i32);

impl FileHandle {
    pub fn is_valid(&self) -> bool {
        self.0 != 0
    }
}

impl Display for FileHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// The status codes a decoding engine reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
pub enum ErrorCode {
    #[error("success")]
    Ok,
    #[error("unexpected failure")]
    Unexpected,
    #[error("not implemented")]
    NotImplemented,
    #[error("out of memory")]
    OutOfMemory,
    #[error("invalid argument")]
    InvalidArgument,
    #[error("no such interface")]
    NoInterface,
    #[error("invalid pointer")]
    Pointer,
    #[error("invalid handle")]
    Handle,
    #[error("operation aborted")]
    Abort,
    #[error("generic failure")]
    Fail,
    #[error("access denied")]
    AccessDenied,
    #[error("operating system failure")]
    OsFail,
    #[error("not initialized")]
    NotInitialized,
    #[error("not found")]
    NotFound,
    #[error("implementation failed")]
    ImplementationFailed,
    #[error("canceled by the user")]
    UserCanceled,
    #[error("backend processing failed")]
    BackendProcessingFailed,
    #[error("out of range")]
    OutOfRange,
    #[error("insufficient privileges")]
    Privileges,
    #[error("version mismatch")]
    Version,
    #[error("unknown status code {0}")]
    Unknown(i32),
}

impl ErrorCode {
    pub const fn from_code(code: i32) -> Self {
        match code {
            0 => Self::Ok,
            -1 => Self::Unexpected,
            -2 => Self::NotImplemented,
            -3 => Self::OutOfMemory,
            -4 => Self::InvalidArgument,
            -5 => Self::NoInterface,
            -6 => Self::Pointer,
            -7 => Self::Handle,
            -8 => Self::Abort,
            -9 => Self::Fail,
            -10 => Self::AccessDenied,
            -11 => Self::OsFail,
            -12 => Self::NotInitialized,
            -13 => Self::NotFound,
            -14 => Self::ImplementationFailed,
            -15 => Self::UserCanceled,
            -16 => Self::BackendProcessingFailed,
            -17 => Self::OutOfRange,
            -18 => Self::Privileges,
            -19 => Self::Version,
            _ => Self::Unknown(code),
        }
    }

    pub const fn code(&self) -> i32 {
        match self {
            Self::Ok => 0,
            Self::Unexpected => -1,
            Self::NotImplemented => -2,
            Self::OutOfMemory => -3,
            Self::InvalidArgument => -4,
            Self::NoInterface => -5,
            Self::Pointer => -6,
            Self::Handle => -7,
            Self::Abort => -8,
            Self::Fail => -9,
            Self::AccessDenied => -10,
            Self::OsFail => -11,
            Self::NotInitialized => -12,
            Self::NotFound => -13,
            Self::ImplementationFailed => -14,
            Self::UserCanceled => -15,
            Self::BackendProcessingFailed => -16,
            Self::OutOfRange => -17,
            Self::Privileges => -18,
            Self::Version => -19,
            Self::Unknown(code) => *code,
        }
    }

    /// Negative status codes are failures, anything else is success
    pub const fn check(code: i32) -> Result<(), ErrorCode> {
        if code < 0 {
            Err(Self::from_code(code))
        } else {
            Ok(())
        }
    }
}

/// The engine primitive a failure came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EngineOperation {
    OpenFile,
    CloseFile,
    GetAttributes,
    GetTextInfo,
    GetMetadata,
    GetExperiment,
    GetBinaryDescriptors,
    InitPicture,
    GetImageData,
}

impl Display for EngineOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::OpenFile => "open file",
            Self::CloseFile => "close file",
            Self::GetAttributes => "get attributes",
            Self::GetTextInfo => "get text info",
            Self::GetMetadata => "get metadata",
            Self::GetExperiment => "get experiment",
            Self::GetBinaryDescriptors => "get binary descriptors",
            Self::InitPicture => "init picture",
            Self::GetImageData => "get image data",
        };
        f.write_str(name)
    }
}

/// The primitives a reading session needs from a decoding engine.
///
/// Implementations are not expected to be thread safe, a session calls them
/// one at a time. An engine holds at most one picture buffer, set up by
/// [`DecodingEngine::init_picture`] and released by [`DecodingEngine::destroy_picture`].
///
/// Engines do not convert between sequence indices and coordinates, that is done
/// by [`CoordinateMapper`](crate::coordinate::CoordinateMapper) from the fetched
/// [`Experiment`].
pub trait DecodingEngine {
    /// Open `path` for reading, returning `None` if no valid handle could be obtained
    fn open_file(&mut self, path: &Path) -> Option<FileHandle>;

    fn close_file(&mut self, handle: FileHandle) -> Result<(), ErrorCode>;

    fn attributes(&mut self, handle: FileHandle) -> Result<Attributes, ErrorCode>;

    fn text_info(&mut self, handle: FileHandle) -> Result<TextInfo, ErrorCode>;

    fn metadata_desc(&mut self, handle: FileHandle) -> Result<MetadataDesc, ErrorCode>;

    fn experiment(&mut self, handle: FileHandle) -> Result<Experiment, ErrorCode>;

    fn binary_descriptors(&mut self, handle: FileHandle) -> Result<Binaries, ErrorCode>;

    /// Prepare the engine's picture buffer, returning the layout it settled on
    fn init_picture(
        &mut self,
        width: u32,
        height: u32,
        bits_per_component: u32,
        components: u32,
    ) -> Result<PictureLayout, ErrorCode>;

    fn destroy_picture(&mut self);

    /// Decode sequence `seq_index` into `buffer`, which is at least as long as the
    /// layout returned by [`DecodingEngine::init_picture`] requires
    fn image_data(
        &mut self,
        handle: FileHandle,
        seq_index: u32,
        buffer: &mut [u8],
    ) -> Result<LocalMetadata, ErrorCode>;
}

impl<T: DecodingEngine + ?Sized> DecodingEngine for Box<T> {
    fn open_file(&mut self, path: &Path) -> Option<FileHandle> {
        (**self).open_file(path)
    }

    fn close_file(&mut self, handle: FileHandle) -> Result<(), ErrorCode> {
        (**self).close_file(handle)
    }

    fn attributes(&mut self, handle: FileHandle) -> Result<Attributes, ErrorCode> {
        (**self).attributes(handle)
    }

    fn text_info(&mut self, handle: FileHandle) -> Result<TextInfo, ErrorCode> {
        (**self).text_info(handle)
    }

    fn metadata_desc(&mut self, handle: FileHandle) -> Result<MetadataDesc, ErrorCode> {
        (**self).metadata_desc(handle)
    }

    fn experiment(&mut self, handle: FileHandle) -> Result<Experiment, ErrorCode> {
        (**self).experiment(handle)
    }

    fn binary_descriptors(&mut self, handle: FileHandle) -> Result<Binaries, ErrorCode> {
        (**self).binary_descriptors(handle)
    }

    fn init_picture(
        &mut self,
        width: u32,
        height: u32,
        bits_per_component: u32,
        components: u32,
    ) -> Result<PictureLayout, ErrorCode> {
        (**self).init_picture(width, height, bits_per_component, components)
    }

    fn destroy_picture(&mut self) {
        (**self).destroy_picture()
    }

    fn image_data(
        &mut self,
        handle: FileHandle,
        seq_index: u32,
        buffer: &mut [u8],
    ) -> Result<LocalMetadata, ErrorCode> {
        (**self).image_data(handle, seq_index, buffer)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_error_codes() {
        for code in 0..=19 {
            assert_eq!(ErrorCode::from_code(-code).code(), -code);
        }
        assert_eq!(ErrorCode::from_code(-7), ErrorCode::Handle);
        assert_eq!(ErrorCode::from_code(-42), ErrorCode::Unknown(-42));
        assert_eq!(ErrorCode::check(0), Ok(()));
        assert_eq!(ErrorCode::check(3), Ok(()));
        assert_eq!(ErrorCode::check(-17), Err(ErrorCode::OutOfRange));
        assert_eq!(ErrorCode::OutOfRange.to_string(), "out of range");
    }
}
