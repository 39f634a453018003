//! Raw bindings to the nd2ReadSDK shared library, resolved at runtime with
//! `libloading`.
#![allow(non_snake_case)]
use std::ffi::OsStr;
use std::os::raw::{c_int, c_uint, c_void};

use bytemuck::Zeroable;
use libloading::Library;

use crate::io::reader::Nd2Error;
use crate::meta::{
    LONG_TEXT_LENGTH, MAX_BINARIES, MAX_EXPERIMENT_LEVELS, MAX_PICTURE_PLANES, SHORT_TEXT_LENGTH,
};

/// The SDK's wide character, `wchar_t`
#[cfg(windows)]
pub type WChar = u16;
#[cfg(not(windows))]
pub type WChar = u32;

pub type LimFileHandle = c_int;
pub type LimResult = c_int;

/// Encode `text` as a NUL-terminated wide string
pub fn to_wide(text: &str) -> Vec<WChar> {
    #[cfg(windows)]
    let mut wide: Vec<WChar> = text.encode_utf16().collect();
    #[cfg(not(windows))]
    let mut wide: Vec<WChar> = text.chars().map(|c| c as WChar).collect();
    wide.push(0);
    wide
}

/// Decode a wide string buffer up to its first NUL
pub fn from_wide(buffer: &[WChar]) -> String {
    let end = buffer.iter().position(|c| *c == 0).unwrap_or(buffer.len());
    let buffer = &buffer[..end];
    #[cfg(windows)]
    {
        String::from_utf16_lossy(buffer)
    }
    #[cfg(not(windows))]
    {
        buffer
            .iter()
            .map(|c| char::from_u32(*c).unwrap_or(char::REPLACEMENT_CHARACTER))
            .collect()
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub struct LimAttributes {
    pub uiWidth: c_uint,
    pub uiWidthBytes: c_uint,
    pub uiHeight: c_uint,
    pub uiComp: c_uint,
    pub uiBpcInMemory: c_uint,
    pub uiBpcSignificant: c_uint,
    pub uiSequenceCount: c_uint,
    pub uiTileWidth: c_uint,
    pub uiTileHeight: c_uint,
    pub uiCompression: c_uint,
    pub uiQuality: c_uint,
}

unsafe impl Zeroable for LimAttributes {}

#[repr(C)]
#[derive(Clone, Copy)]
pub struct LimPicturePlaneDesc {
    pub uiCompCount: c_uint,
    pub uiColorRGB: c_uint,
    pub wszName: [WChar; SHORT_TEXT_LENGTH],
    pub wszOCName: [WChar; SHORT_TEXT_LENGTH],
    pub dEmissionWL: f64,
}

unsafe impl Zeroable for LimPicturePlaneDesc {}

#[repr(C)]
#[derive(Clone, Copy)]
pub struct LimMetadataDesc {
    pub dTimeStart: f64,
    pub dAngle: f64,
    pub dCalibration: f64,
    pub dAspect: f64,
    pub wszObjectiveName: [WChar; SHORT_TEXT_LENGTH],
    pub dObjectiveMag: f64,
    pub dObjectiveNA: f64,
    pub dRefractIndex1: f64,
    pub dRefractIndex2: f64,
    pub dPinholeRadius: f64,
    pub dZoom: f64,
    pub dProjectiveMag: f64,
    pub uiImageType: c_uint,
    pub uiPlaneCount: c_uint,
    pub uiComponentCount: c_uint,
    pub pPlanes: [LimPicturePlaneDesc; MAX_PICTURE_PLANES],
}

unsafe impl Zeroable for LimMetadataDesc {}

#[repr(C)]
#[derive(Clone, Copy)]
pub struct LimTextInfo {
    pub wszImageID: [WChar; SHORT_TEXT_LENGTH],
    pub wszType: [WChar; SHORT_TEXT_LENGTH],
    pub wszGroup: [WChar; SHORT_TEXT_LENGTH],
    pub wszSampleID: [WChar; SHORT_TEXT_LENGTH],
    pub wszAuthor: [WChar; SHORT_TEXT_LENGTH],
    pub wszDescription: [WChar; LONG_TEXT_LENGTH],
    pub wszCapturing: [WChar; LONG_TEXT_LENGTH],
    pub wszSampling: [WChar; SHORT_TEXT_LENGTH],
    pub wszLocation: [WChar; SHORT_TEXT_LENGTH],
    pub wszDate: [WChar; SHORT_TEXT_LENGTH],
    pub wszConclusion: [WChar; SHORT_TEXT_LENGTH],
    pub wszInfo1: [WChar; SHORT_TEXT_LENGTH],
    pub wszInfo2: [WChar; SHORT_TEXT_LENGTH],
    pub wszOptics: [WChar; SHORT_TEXT_LENGTH],
}

unsafe impl Zeroable for LimTextInfo {}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub struct LimExperimentLevel {
    pub uiExpType: c_uint,
    pub uiLoopSize: c_uint,
    pub dInterval: f64,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub struct LimExperiment {
    pub uiLevelCount: c_uint,
    pub pAllocatedLevels: [LimExperimentLevel; MAX_EXPERIMENT_LEVELS],
}

unsafe impl Zeroable for LimExperiment {}

#[repr(C)]
#[derive(Clone, Copy)]
pub struct LimBinaryDescriptor {
    pub wszName: [WChar; SHORT_TEXT_LENGTH],
    pub wszCompName: [WChar; SHORT_TEXT_LENGTH],
    pub uiColorRGB: c_uint,
}

#[repr(C)]
#[derive(Clone, Copy)]
pub struct LimBinaries {
    pub uiCount: c_uint,
    pub pDescriptors: [LimBinaryDescriptor; MAX_BINARIES],
}

unsafe impl Zeroable for LimBinaries {}

/// The SDK-owned frame buffer. `pImageData` is allocated by `Lim_InitPicture`
/// and must be released with `Lim_DestroyPicture`.
#[repr(C)]
#[derive(Debug)]
pub struct LimPicture {
    pub uiWidth: c_uint,
    pub uiHeight: c_uint,
    pub uiBitsPerComp: c_uint,
    pub uiComponents: c_uint,
    pub uiWidthBytes: c_uint,
    pub uiSize: usize,
    pub pImageData: *mut c_void,
}

unsafe impl Zeroable for LimPicture {}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub struct LimLocalMetadata {
    pub dTimeMSec: f64,
    pub dXPos: f64,
    pub dYPos: f64,
    pub dZPos: f64,
}

unsafe impl Zeroable for LimLocalMetadata {}

pub type FileOpenForReadFn = unsafe extern "C" fn(*const WChar) -> LimFileHandle;
pub type FileCloseFn = unsafe extern "C" fn(LimFileHandle) -> LimResult;
pub type FileGetAttributesFn = unsafe extern "C" fn(LimFileHandle, *mut LimAttributes) -> LimResult;
pub type FileGetMetadataFn = unsafe extern "C" fn(LimFileHandle, *mut LimMetadataDesc) -> LimResult;
pub type FileGetTextinfoFn = unsafe extern "C" fn(LimFileHandle, *mut LimTextInfo) -> LimResult;
pub type FileGetExperimentFn = unsafe extern "C" fn(LimFileHandle, *mut LimExperiment) -> LimResult;
pub type FileGetBinaryDescriptorsFn =
    unsafe extern "C" fn(LimFileHandle, *mut LimBinaries) -> LimResult;
pub type InitPictureFn =
    unsafe extern "C" fn(*mut LimPicture, c_uint, c_uint, c_uint, c_uint) -> usize;
pub type DestroyPictureFn = unsafe extern "C" fn(*mut LimPicture);
pub type FileGetImageDataFn = unsafe extern "C" fn(
    LimFileHandle,
    c_uint,
    *mut LimPicture,
    *mut LimLocalMetadata,
) -> LimResult;

/// The loaded SDK and the entry points this crate uses.
///
/// The function pointers are only valid while `_library` is loaded, which is
/// as long as this value lives.
pub struct Nd2SdkLibrary {
    pub(crate) file_open_for_read: FileOpenForReadFn,
    pub(crate) file_close: FileCloseFn,
    pub(crate) file_get_attributes: FileGetAttributesFn,
    pub(crate) file_get_metadata: FileGetMetadataFn,
    pub(crate) file_get_textinfo: FileGetTextinfoFn,
    pub(crate) file_get_experiment: FileGetExperimentFn,
    pub(crate) file_get_binary_descriptors: FileGetBinaryDescriptorsFn,
    pub(crate) init_picture: InitPictureFn,
    pub(crate) destroy_picture: DestroyPictureFn,
    pub(crate) file_get_image_data: FileGetImageDataFn,
    _library: Library,
}

impl std::fmt::Debug for Nd2SdkLibrary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Nd2SdkLibrary").finish_non_exhaustive()
    }
}

impl Nd2SdkLibrary {
    /// The environment variable naming the shared library to load
    pub const ENV_VAR: &'static str = "ND2SDK_LIBRARY";

    #[cfg(target_os = "windows")]
    pub const DEFAULT_NAME: &'static str = "nd2ReadSDK.dll";
    #[cfg(target_os = "macos")]
    pub const DEFAULT_NAME: &'static str = "libnd2ReadSDK.dylib";
    #[cfg(not(any(target_os = "windows", target_os = "macos")))]
    pub const DEFAULT_NAME: &'static str = "libnd2ReadSDK.so";

    /// Load the library named by [`Nd2SdkLibrary::ENV_VAR`], falling back to
    /// [`Nd2SdkLibrary::DEFAULT_NAME`] on the platform's search path
    pub fn load() -> Result<Self, Nd2Error> {
        match std::env::var_os(Self::ENV_VAR) {
            Some(path) if !path.is_empty() => Self::load_from(path),
            _ => Self::load_from(Self::DEFAULT_NAME),
        }
    }

    pub fn load_from<P: AsRef<OsStr>>(path: P) -> Result<Self, Nd2Error> {
        let path = path.as_ref();
        let unavailable = |e: libloading::Error| {
            Nd2Error::LibraryUnavailable(format!("{}: {e}", path.to_string_lossy()))
        };

        // Safety: loading runs the library's initializers, and each symbol is read
        // with the signature the SDK header declares for it.
        unsafe {
            let library = Library::new(path).map_err(unavailable)?;
            let this = Self {
                file_open_for_read: *library
                    .get::<FileOpenForReadFn>(b"Lim_FileOpenForRead\0")
                    .map_err(unavailable)?,
                file_close: *library
                    .get::<FileCloseFn>(b"Lim_FileClose\0")
                    .map_err(unavailable)?,
                file_get_attributes: *library
                    .get::<FileGetAttributesFn>(b"Lim_FileGetAttributes\0")
                    .map_err(unavailable)?,
                file_get_metadata: *library
                    .get::<FileGetMetadataFn>(b"Lim_FileGetMetadata\0")
                    .map_err(unavailable)?,
                file_get_textinfo: *library
                    .get::<FileGetTextinfoFn>(b"Lim_FileGetTextinfo\0")
                    .map_err(unavailable)?,
                file_get_experiment: *library
                    .get::<FileGetExperimentFn>(b"Lim_FileGetExperiment\0")
                    .map_err(unavailable)?,
                file_get_binary_descriptors: *library
                    .get::<FileGetBinaryDescriptorsFn>(b"Lim_FileGetBinaryDescriptors\0")
                    .map_err(unavailable)?,
                init_picture: *library
                    .get::<InitPictureFn>(b"Lim_InitPicture\0")
                    .map_err(unavailable)?,
                destroy_picture: *library
                    .get::<DestroyPictureFn>(b"Lim_DestroyPicture\0")
                    .map_err(unavailable)?,
                file_get_image_data: *library
                    .get::<FileGetImageDataFn>(b"Lim_FileGetImageData\0")
                    .map_err(unavailable)?,
                _library: library,
            };
            log::debug!("Loaded the ND2 SDK from {}", path.to_string_lossy());
            Ok(this)
        }
    }
}
