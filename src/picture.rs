//! The byte layout of a decoded frame and views for reading samples out of it.
//!
//! Samples are interleaved: all components of a pixel are adjacent, pixels run
//! left to right, and each row is padded to a multiple of 4 bytes. Multi-byte
//! samples are little-endian.
use std::borrow::Cow;
use std::mem;

use bytemuck::Pod;
use num_traits::AsPrimitive;
use thiserror::Error;

use crate::meta::Attributes;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PictureError {
    #[error("Pixel ({x}, {y}) component {component} is outside of the picture")]
    OutOfBounds { x: u32, y: u32, component: u32 },
    #[error("Row {0} is outside of the picture")]
    RowOutOfBounds(u32),
    #[error("The buffer holds {actual} bytes but the layout requires {required}")]
    BufferTooSmall { required: usize, actual: usize },
    #[error("Requested {requested}-byte samples from a picture with {stored}-byte samples")]
    SampleWidthMismatch { requested: usize, stored: usize },
    #[error("Samples cannot be cast in place on a big-endian host")]
    BigEndianHost,
    #[error("Failed to cast picture bytes: {0:?}")]
    CastError(bytemuck::PodCastError),
}

impl From<bytemuck::PodCastError> for PictureError {
    fn from(value: bytemuck::PodCastError) -> Self {
        Self::CastError(value)
    }
}

/// The geometry of one frame buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PictureLayout {
    pub width: u32,
    pub height: u32,
    /// 8 through 16 for intensity images, 32 for float images and binary masks
    pub bits_per_component: u32,
    pub components: u32,
    /// The padded length of one row, in bytes
    pub width_bytes: usize,
    /// The length of the whole buffer, in bytes
    pub size: usize,
}

impl PictureLayout {
    /// Compute the layout of a frame. The stride is the smallest multiple of 4
    /// that holds a full row.
    pub fn new(width: u32, height: u32, bits_per_component: u32, components: u32) -> Self {
        let row_bytes =
            width as usize * components as usize * bits_per_component.div_ceil(8) as usize;
        let width_bytes = (row_bytes + 3) & !3;
        Self {
            width,
            height,
            bits_per_component,
            components,
            width_bytes,
            size: width_bytes * height as usize,
        }
    }

    pub fn from_attributes(attributes: &Attributes) -> Self {
        Self::new(
            attributes.width,
            attributes.height,
            attributes.bpc_in_memory,
            attributes.components,
        )
    }

    pub fn bytes_per_component(&self) -> usize {
        self.bits_per_component.div_ceil(8) as usize
    }

    /// The length of one row without padding
    pub fn row_bytes(&self) -> usize {
        self.width as usize * self.components as usize * self.bytes_per_component()
    }

    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// The byte offset of component `component` of the pixel at (`x`, `y`), or `None`
    /// if that lies outside of the frame
    pub fn offset_of(&self, x: u32, y: u32, component: u32) -> Option<usize> {
        if x >= self.width || y >= self.height || component >= self.components {
            return None;
        }
        let sample = x as usize * self.components as usize + component as usize;
        Some(y as usize * self.width_bytes + sample * self.bytes_per_component())
    }
}

fn decode_le(bytes: &[u8]) -> u32 {
    bytes
        .iter()
        .rev()
        .fold(0u32, |acc, b| (acc << 8) | *b as u32)
}

/// A reusable frame buffer, sized to its layout
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Picture {
    layout: PictureLayout,
    data: Vec<u8>,
}

impl Picture {
    pub fn new(layout: PictureLayout) -> Self {
        Self::with_capacity(layout, layout.size)
    }

    /// Allocate at least `size` bytes, for engines that report a larger buffer than
    /// the layout needs
    pub fn with_capacity(layout: PictureLayout, size: usize) -> Self {
        Self {
            layout,
            data: vec![0; size.max(layout.size)],
        }
    }

    pub fn layout(&self) -> &PictureLayout {
        &self.layout
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.data
    }

    pub fn view(&self) -> PictureView<'_> {
        PictureView {
            layout: self.layout,
            data: &self.data,
        }
    }
}

/// A borrowed frame, read according to its [`PictureLayout`].
#[derive(Debug, Clone, Copy)]
pub struct PictureView<'a> {
    layout: PictureLayout,
    data: &'a [u8],
}

impl<'a> PictureView<'a> {
    pub fn new(layout: PictureLayout, data: &'a [u8]) -> Result<Self, PictureError> {
        if data.len() < layout.size {
            return Err(PictureError::BufferTooSmall {
                required: layout.size,
                actual: data.len(),
            });
        }
        Ok(Self { layout, data })
    }

    pub fn layout(&self) -> &PictureLayout {
        &self.layout
    }

    /// The raw bytes of the frame, including row padding
    pub fn bytes(&self) -> &'a [u8] {
        &self.data[..self.layout.size]
    }

    /// The bytes of row `y`, without padding
    pub fn row(&self, y: u32) -> Option<&'a [u8]> {
        if y >= self.layout.height {
            return None;
        }
        let start = y as usize * self.layout.width_bytes;
        self.data.get(start..start + self.layout.row_bytes())
    }

    fn sample_bytes(&self, x: u32, y: u32, component: u32) -> Option<&'a [u8]> {
        let offset = self.layout.offset_of(x, y, component)?;
        self.data
            .get(offset..offset + self.layout.bytes_per_component())
    }

    /// Read one sample as an unsigned integer
    pub fn sample(&self, x: u32, y: u32, component: u32) -> Option<u32> {
        self.sample_bytes(x, y, component).map(decode_le)
    }

    /// Read one sample of a 32-bit float image
    pub fn sample_f32(&self, x: u32, y: u32, component: u32) -> Option<f32> {
        if self.layout.bytes_per_component() != 4 {
            return None;
        }
        self.sample_bytes(x, y, component)
            .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    /// Like [`PictureView::sample`], reporting which coordinate was out of bounds
    pub fn try_sample(&self, x: u32, y: u32, component: u32) -> Result<u32, PictureError> {
        self.sample(x, y, component)
            .ok_or(PictureError::OutOfBounds { x, y, component })
    }

    /// Copy one component of every pixel out into a row-major plane
    pub fn channel(&self, component: u32) -> Result<Vec<u32>, PictureError> {
        if component >= self.layout.components {
            return Err(PictureError::OutOfBounds {
                x: 0,
                y: 0,
                component,
            });
        }
        let mut plane = Vec::with_capacity(self.layout.pixel_count());
        for y in 0..self.layout.height {
            for x in 0..self.layout.width {
                plane.push(self.try_sample(x, y, component)?);
            }
        }
        Ok(plane)
    }

    /// Copy one component into a plane of `T`, converting each sample with `as`
    pub fn channel_as<T: Copy + 'static>(&self, component: u32) -> Result<Vec<T>, PictureError>
    where
        u32: AsPrimitive<T>,
    {
        Ok(self
            .channel(component)?
            .into_iter()
            .map(|v| v.as_())
            .collect())
    }

    /// View row `y` as samples of `T`, without copying when the row is suitably
    /// aligned. `T` must be exactly as wide as the stored samples.
    pub fn row_as<T: Pod>(&self, y: u32) -> Result<Cow<'a, [T]>, PictureError> {
        let stored = self.layout.bytes_per_component();
        let requested = mem::size_of::<T>();
        if stored != requested {
            return Err(PictureError::SampleWidthMismatch { requested, stored });
        }
        if cfg!(target_endian = "big") && requested > 1 {
            return Err(PictureError::BigEndianHost);
        }
        let row = self.row(y).ok_or(PictureError::RowOutOfBounds(y))?;
        match bytemuck::try_cast_slice(row) {
            Ok(samples) => Ok(Cow::Borrowed(samples)),
            Err(bytemuck::PodCastError::TargetAlignmentGreaterAndInputNotAligned) => {
                Ok(Cow::Owned(bytemuck::pod_collect_to_vec(row)))
            }
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_layout_stride() {
        let layout = PictureLayout::new(5, 4, 16, 3);
        assert_eq!(layout.bytes_per_component(), 2);
        assert_eq!(layout.row_bytes(), 30);
        assert_eq!(layout.width_bytes, 32);
        assert_eq!(layout.size, 128);
        assert_eq!(layout.offset_of(2, 0, 1), Some(14));
        assert_eq!(layout.offset_of(0, 1, 0), Some(32));
        assert_eq!(layout.offset_of(5, 0, 0), None);
        assert_eq!(layout.offset_of(0, 0, 3), None);

        // 12 significant bits are still stored in 2 bytes
        assert_eq!(PictureLayout::new(3, 1, 12, 1).width_bytes, 8);
        assert_eq!(PictureLayout::new(4, 2, 8, 1).width_bytes, 4);
        assert_eq!(PictureLayout::new(1, 1, 32, 1).width_bytes, 4);
    }

    fn gradient() -> (PictureLayout, Vec<u8>) {
        let layout = PictureLayout::new(5, 4, 16, 3);
        let mut data = vec![0xAAu8; layout.size];
        for y in 0..layout.height {
            for x in 0..layout.width {
                for c in 0..layout.components {
                    let value = (y * 1000 + x * 10 + c) as u16;
                    let offset = layout.offset_of(x, y, c).unwrap();
                    data[offset..offset + 2].copy_from_slice(&value.to_le_bytes());
                }
            }
        }
        (layout, data)
    }

    #[test_log::test]
    fn test_samples() {
        let (layout, data) = gradient();
        let view = PictureView::new(layout, &data).unwrap();
        assert_eq!(view.sample(2, 0, 1), Some(21));
        assert_eq!(view.sample(4, 3, 2), Some(3042));
        assert_eq!(view.sample(5, 3, 2), None);
        assert!(view.sample_f32(0, 0, 0).is_none());
        assert_eq!(
            view.try_sample(0, 4, 0),
            Err(PictureError::OutOfBounds {
                x: 0,
                y: 4,
                component: 0
            })
        );

        let plane = view.channel(1).unwrap();
        assert_eq!(plane.len(), 20);
        assert_eq!(plane[0], 1);
        assert_eq!(plane[6], 1011);
        let plane: Vec<f64> = view.channel_as(2).unwrap();
        assert_eq!(plane[19], 3042.0);
        assert!(view.channel(3).is_err());

        assert_eq!(view.row(1).unwrap().len(), 30);
        assert!(view.row(4).is_none());
        let row = view.row_as::<u16>(1).unwrap();
        assert_eq!(&row[..4], &[1000, 1001, 1002, 1010]);
        assert!(matches!(
            view.row_as::<u32>(1),
            Err(PictureError::SampleWidthMismatch {
                requested: 4,
                stored: 2
            })
        ));
    }

    #[test]
    fn test_float_samples() {
        let layout = PictureLayout::new(2, 1, 32, 1);
        let mut data = Vec::new();
        data.extend(1.5f32.to_le_bytes());
        data.extend((-2.25f32).to_le_bytes());
        let view = PictureView::new(layout, &data).unwrap();
        assert_eq!(view.sample_f32(1, 0, 0), Some(-2.25));
        assert_eq!(view.sample(0, 0, 0), Some(1.5f32.to_bits()));
    }

    #[test]
    fn test_buffer_too_small() {
        let layout = PictureLayout::new(5, 4, 16, 3);
        let data = vec![0u8; 100];
        assert_eq!(
            PictureView::new(layout, &data).unwrap_err(),
            PictureError::BufferTooSmall {
                required: 128,
                actual: 100
            }
        );
        let picture = Picture::with_capacity(layout, 64);
        assert_eq!(picture.len(), 128);
        assert_eq!(picture.view().bytes().len(), 128);
    }
}
