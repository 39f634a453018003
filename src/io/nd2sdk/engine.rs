use std::path::Path;
use std::ptr;

use bytemuck::allocation::zeroed_box;
use bytemuck::Zeroable;
use log::{debug, warn};

use super::ffi::{
    from_wide, to_wide, LimAttributes, LimBinaries, LimExperiment, LimLocalMetadata,
    LimMetadataDesc, LimPicture, LimTextInfo, Nd2SdkLibrary,
};
use crate::io::engine::{DecodingEngine, ErrorCode, FileHandle};
use crate::io::reader::Nd2Error;
use crate::meta::{
    Attributes, Binaries, BinaryDescriptor, CompressionType, Experiment, ExperimentLevel,
    ImageType, LocalMetadata, LoopKind, MetadataDesc, PicturePlaneDesc, RgbColor, TextInfo,
    MAX_BINARIES, MAX_EXPERIMENT_LEVELS, MAX_PICTURE_PLANES,
};
use crate::picture::PictureLayout;

impl From<&LimAttributes> for Attributes {
    fn from(value: &LimAttributes) -> Self {
        Self {
            width: value.uiWidth,
            width_bytes: value.uiWidthBytes,
            height: value.uiHeight,
            components: value.uiComp,
            bpc_in_memory: value.uiBpcInMemory,
            bpc_significant: value.uiBpcSignificant,
            sequence_count: value.uiSequenceCount,
            tile_width: value.uiTileWidth,
            tile_height: value.uiTileHeight,
            compression: CompressionType::from_code(value.uiCompression),
            quality: value.uiQuality,
        }
    }
}

impl From<&LimMetadataDesc> for MetadataDesc {
    fn from(value: &LimMetadataDesc) -> Self {
        let n = (value.uiPlaneCount as usize).min(MAX_PICTURE_PLANES);
        let planes = value.pPlanes[..n]
            .iter()
            .map(|plane| PicturePlaneDesc {
                component_count: plane.uiCompCount,
                color: RgbColor(plane.uiColorRGB),
                name: from_wide(&plane.wszName),
                oc_name: from_wide(&plane.wszOCName),
                emission_wavelength: plane.dEmissionWL,
            })
            .collect();
        Self {
            time_start: value.dTimeStart,
            angle: value.dAngle,
            calibration: value.dCalibration,
            aspect: value.dAspect,
            objective_name: from_wide(&value.wszObjectiveName),
            objective_magnification: value.dObjectiveMag,
            objective_na: value.dObjectiveNA,
            refractive_index1: value.dRefractIndex1,
            refractive_index2: value.dRefractIndex2,
            pinhole_radius: value.dPinholeRadius,
            zoom: value.dZoom,
            projective_magnification: value.dProjectiveMag,
            image_type: ImageType::from_code(value.uiImageType),
            component_count: value.uiComponentCount,
            planes,
        }
    }
}

impl From<&LimTextInfo> for TextInfo {
    fn from(value: &LimTextInfo) -> Self {
        Self {
            image_id: from_wide(&value.wszImageID),
            image_type: from_wide(&value.wszType),
            group: from_wide(&value.wszGroup),
            sample_id: from_wide(&value.wszSampleID),
            author: from_wide(&value.wszAuthor),
            description: from_wide(&value.wszDescription),
            capturing: from_wide(&value.wszCapturing),
            sampling: from_wide(&value.wszSampling),
            location: from_wide(&value.wszLocation),
            date: from_wide(&value.wszDate),
            conclusion: from_wide(&value.wszConclusion),
            info1: from_wide(&value.wszInfo1),
            info2: from_wide(&value.wszInfo2),
            optics: from_wide(&value.wszOptics),
        }
    }
}

impl From<&LimExperiment> for Experiment {
    fn from(value: &LimExperiment) -> Self {
        let n = (value.uiLevelCount as usize).min(MAX_EXPERIMENT_LEVELS);
        value.pAllocatedLevels[..n]
            .iter()
            .map(|level| {
                let kind = LoopKind::try_from(level.uiExpType).unwrap_or_else(|e| {
                    warn!("{e}, treating it as a custom loop");
                    LoopKind::Other
                });
                ExperimentLevel::new(kind, level.uiLoopSize, level.dInterval)
            })
            .collect()
    }
}

impl From<&LimBinaries> for Binaries {
    fn from(value: &LimBinaries) -> Self {
        let n = (value.uiCount as usize).min(MAX_BINARIES);
        Binaries::new(
            value.pDescriptors[..n]
                .iter()
                .map(|binary| {
                    BinaryDescriptor::new(
                        from_wide(&binary.wszName),
                        from_wide(&binary.wszCompName),
                        RgbColor(binary.uiColorRGB),
                    )
                })
                .collect(),
        )
    }
}

impl From<&LimLocalMetadata> for LocalMetadata {
    fn from(value: &LimLocalMetadata) -> Self {
        LocalMetadata::new(value.dTimeMSec, value.dXPos, value.dYPos, value.dZPos)
    }
}

/// A [`DecodingEngine`] calling into Nikon's nd2ReadSDK.
///
/// The SDK decodes into a buffer it owns, so each frame is copied out of it
/// into the caller's buffer. Not safe to share between threads.
#[derive(Debug)]
pub struct SdkEngine {
    library: Nd2SdkLibrary,
    picture: Box<LimPicture>,
    picture_ready: bool,
}

impl SdkEngine {
    pub fn new(library: Nd2SdkLibrary) -> Self {
        Self {
            library,
            picture: zeroed_box(),
            picture_ready: false,
        }
    }

    /// Load the SDK with [`Nd2SdkLibrary::load`]
    pub fn load() -> Result<Self, Nd2Error> {
        Ok(Self::new(Nd2SdkLibrary::load()?))
    }
}

impl DecodingEngine for SdkEngine {
    fn open_file(&mut self, path: &Path) -> Option<FileHandle> {
        let wide = to_wide(&path.to_string_lossy());
        // Safety: `wide` is NUL-terminated and outlives the call
        let handle = unsafe { (self.library.file_open_for_read)(wide.as_ptr()) };
        if handle == 0 {
            debug!("The SDK could not open {}", path.display());
            None
        } else {
            Some(FileHandle(handle))
        }
    }

    fn close_file(&mut self, handle: FileHandle) -> Result<(), ErrorCode> {
        ErrorCode::check(unsafe { (self.library.file_close)(handle.0) })
    }

    fn attributes(&mut self, handle: FileHandle) -> Result<Attributes, ErrorCode> {
        let mut raw = LimAttributes::zeroed();
        ErrorCode::check(unsafe { (self.library.file_get_attributes)(handle.0, &mut raw) })?;
        Ok(Attributes::from(&raw))
    }

    fn text_info(&mut self, handle: FileHandle) -> Result<TextInfo, ErrorCode> {
        let mut raw: Box<LimTextInfo> = zeroed_box();
        ErrorCode::check(unsafe { (self.library.file_get_textinfo)(handle.0, &mut *raw) })?;
        Ok(TextInfo::from(&*raw))
    }

    fn metadata_desc(&mut self, handle: FileHandle) -> Result<MetadataDesc, ErrorCode> {
        let mut raw: Box<LimMetadataDesc> = zeroed_box();
        ErrorCode::check(unsafe { (self.library.file_get_metadata)(handle.0, &mut *raw) })?;
        Ok(MetadataDesc::from(&*raw))
    }

    fn experiment(&mut self, handle: FileHandle) -> Result<Experiment, ErrorCode> {
        let mut raw = LimExperiment::zeroed();
        ErrorCode::check(unsafe { (self.library.file_get_experiment)(handle.0, &mut raw) })?;
        Ok(Experiment::from(&raw))
    }

    fn binary_descriptors(&mut self, handle: FileHandle) -> Result<Binaries, ErrorCode> {
        let mut raw: Box<LimBinaries> = zeroed_box();
        ErrorCode::check(unsafe {
            (self.library.file_get_binary_descriptors)(handle.0, &mut *raw)
        })?;
        Ok(Binaries::from(&*raw))
    }

    fn init_picture(
        &mut self,
        width: u32,
        height: u32,
        bits_per_component: u32,
        components: u32,
    ) -> Result<PictureLayout, ErrorCode> {
        self.destroy_picture();
        let size = unsafe {
            (self.library.init_picture)(
                &mut *self.picture,
                width,
                height,
                bits_per_component,
                components,
            )
        };
        self.picture_ready = true;
        if self.picture.pImageData.is_null() && size > 0 {
            self.destroy_picture();
            return Err(ErrorCode::OutOfMemory);
        }
        let picture = &*self.picture;
        Ok(PictureLayout {
            width: picture.uiWidth,
            height: picture.uiHeight,
            bits_per_component: picture.uiBitsPerComp,
            components: picture.uiComponents,
            width_bytes: picture.uiWidthBytes as usize,
            size: picture.uiSize,
        })
    }

    fn destroy_picture(&mut self) {
        if self.picture_ready {
            unsafe { (self.library.destroy_picture)(&mut *self.picture) };
            *self.picture = LimPicture::zeroed();
            self.picture_ready = false;
        }
    }

    fn image_data(
        &mut self,
        handle: FileHandle,
        seq_index: u32,
        buffer: &mut [u8],
    ) -> Result<LocalMetadata, ErrorCode> {
        if !self.picture_ready {
            return Err(ErrorCode::NotInitialized);
        }
        let mut local = LimLocalMetadata::zeroed();
        ErrorCode::check(unsafe {
            (self.library.file_get_image_data)(handle.0, seq_index, &mut *self.picture, &mut local)
        })?;
        let source = self.picture.pImageData as *const u8;
        if source.is_null() {
            return Err(ErrorCode::Pointer);
        }
        let n = self.picture.uiSize.min(buffer.len());
        if n < self.picture.uiSize {
            warn!(
                "Truncating sequence {seq_index} from {} to {n} bytes",
                self.picture.uiSize
            );
        }
        // Safety: the SDK keeps `uiSize` bytes at `pImageData` until the picture is destroyed
        unsafe { ptr::copy_nonoverlapping(source, buffer.as_mut_ptr(), n) };
        Ok(LocalMetadata::from(&local))
    }
}

impl Drop for SdkEngine {
    fn drop(&mut self) {
        self.destroy_picture();
    }
}
