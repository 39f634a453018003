use std::fmt::Display;

/// How the pixel data of a file was compressed when it was written
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CompressionType {
    Lossless,
    Lossy,
    #[default]
    None,
}

impl CompressionType {
    /// The numeric code the decoding engine uses for this compression mode
    pub const fn code(&self) -> u32 {
        match self {
            Self::Lossless => 0,
            Self::Lossy => 1,
            Self::None => 2,
        }
    }

    /// Unrecognized codes are treated as uncompressed
    pub fn from_code(code: u32) -> Self {
        match code {
            0 => Self::Lossless,
            1 => Self::Lossy,
            2 => Self::None,
            _ => {
                log::warn!("Unknown compression code {code}, treating as uncompressed");
                Self::None
            }
        }
    }
}

impl Display for CompressionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// The global properties shared by every image in a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Attributes {
    /// Width of images, in pixels
    pub width: u32,
    /// Length of one image row in bytes, 4-byte aligned
    pub width_bytes: u32,
    /// Height of images, in pixels
    pub height: u32,
    /// Number of components per pixel
    pub components: u32,
    /// Bits per component as stored in memory: 8, 16 or 32 (float images)
    pub bpc_in_memory: u32,
    /// Bits per component actually carrying signal, 8 through 16, or 32 (float images)
    pub bpc_significant: u32,
    /// Number of images in the sequence
    pub sequence_count: u32,
    /// Width of a tile or strip, zero when the image is not tiled
    pub tile_width: u32,
    /// Height of a tile or strip, zero when the image is not tiled
    pub tile_height: u32,
    pub compression: CompressionType,
    /// 0 (worst) to 100 (best)
    pub quality: u32,
}

impl Attributes {
    pub fn bytes_per_component(&self) -> u32 {
        self.bpc_in_memory.div_ceil(8)
    }

    pub fn is_tiled(&self) -> bool {
        self.tile_width != 0 && self.tile_height != 0
    }

    /// Check that [`Attributes::width_bytes`] is 4-byte aligned and large enough to
    /// hold a full row of pixels.
    pub fn has_valid_stride(&self) -> bool {
        let row = self.width as u64 * self.components as u64 * self.bytes_per_component() as u64;
        self.width_bytes % 4 == 0 && self.width_bytes as u64 >= row
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_stride_invariant() {
        let mut attrs = Attributes {
            width: 5,
            width_bytes: 32,
            height: 2,
            components: 3,
            bpc_in_memory: 16,
            bpc_significant: 12,
            sequence_count: 1,
            ..Default::default()
        };
        assert_eq!(attrs.bytes_per_component(), 2);
        assert!(attrs.has_valid_stride());
        attrs.width_bytes = 30;
        assert!(!attrs.has_valid_stride());
        attrs.width_bytes = 28;
        assert!(!attrs.has_valid_stride());
    }

    #[test]
    fn test_compression_codes() {
        for c in [
            CompressionType::Lossless,
            CompressionType::Lossy,
            CompressionType::None,
        ] {
            assert_eq!(CompressionType::from_code(c.code()), c);
        }
        assert_eq!(CompressionType::from_code(9), CompressionType::None);
    }
}
