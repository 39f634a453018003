use chrono::{DateTime, Utc};

/// The maximum number of picture planes a file can describe
pub const MAX_PICTURE_PLANES: usize = 256;

/// The Julian day number of the Unix epoch, 1970-01-01T00:00:00Z
const UNIX_EPOCH_JDN: f64 = 2440587.5;
const MILLISECONDS_PER_DAY: f64 = 86_400_000.0;

/// A display color packed as `0xBBGGRR`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RgbColor(pub u32);

impl RgbColor {
    pub const fn red(&self) -> u8 {
        (self.0 & 0xFF) as u8
    }

    pub const fn green(&self) -> u8 {
        ((self.0 >> 8) & 0xFF) as u8
    }

    pub const fn blue(&self) -> u8 {
        ((self.0 >> 16) & 0xFF) as u8
    }

    pub const fn rgb(&self) -> (u8, u8, u8) {
        (self.red(), self.green(), self.blue())
    }

    pub const fn packed(&self) -> u32 {
        self.0
    }
}

impl From<u32> for RgbColor {
    fn from(value: u32) -> Self {
        Self(value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ImageType {
    #[default]
    Normal,
    Spectral,
}

impl ImageType {
    pub const fn code(&self) -> u32 {
        match self {
            Self::Normal => 0,
            Self::Spectral => 1,
        }
    }

    pub fn from_code(code: u32) -> Self {
        match code {
            1 => Self::Spectral,
            _ => Self::Normal,
        }
    }
}

/// One logical imaging plane, which may group several physical components
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PicturePlaneDesc {
    /// Number of physical components in this plane
    pub component_count: u32,
    pub color: RgbColor,
    /// Name for display
    pub name: String,
    /// Name of the optical configuration
    pub oc_name: String,
    /// Emission wavelength
    pub emission_wavelength: f64,
}

/// Acquisition-level metadata describing how the images were captured.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MetadataDesc {
    /// Absolute acquisition start time as a Julian day number
    pub time_start: f64,
    /// Camera angle
    pub angle: f64,
    /// Micrometers per pixel, 0.0 when uncalibrated
    pub calibration: f64,
    /// Pixel aspect ratio
    pub aspect: f64,
    pub objective_name: String,
    pub objective_magnification: f64,
    pub objective_na: f64,
    pub refractive_index1: f64,
    pub refractive_index2: f64,
    pub pinhole_radius: f64,
    pub zoom: f64,
    pub projective_magnification: f64,
    pub image_type: ImageType,
    /// Number of physical components, the same as [`Attributes::components`](crate::meta::Attributes::components)
    pub component_count: u32,
    /// The logical planes, never more than [`MetadataDesc::component_count`]
    pub planes: Vec<PicturePlaneDesc>,
}

impl MetadataDesc {
    pub fn plane_count(&self) -> usize {
        self.planes.len()
    }

    pub fn is_calibrated(&self) -> bool {
        self.calibration > 0.0
    }

    /// Convert [`MetadataDesc::time_start`] into a calendar timestamp.
    ///
    /// Returns `None` if the timestamp was never set.
    pub fn acquisition_start(&self) -> Option<DateTime<Utc>> {
        if !self.time_start.is_finite() || self.time_start <= 0.0 {
            return None;
        }
        let millis = ((self.time_start - UNIX_EPOCH_JDN) * MILLISECONDS_PER_DAY).round();
        DateTime::from_timestamp_millis(millis as i64)
    }

    /// Check that there are no more planes than components
    pub fn has_valid_planes(&self) -> bool {
        self.planes.len() <= self.component_count as usize
    }
}
