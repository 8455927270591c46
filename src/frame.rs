//! Owned frame buffers.
//!
//! A `Frame` is an RGB8 pixel buffer with its dimensions. Frames are moved
//! from a source into the pipeline and cloned whenever they cross an
//! asynchronous boundary (the persistence queue), so a clone is always an
//! independent copy of the pixels.

use anyhow::{anyhow, Result};
use image::RgbImage;

/// Bytes per pixel for the RGB8 layout used throughout the crate.
pub const CHANNELS: usize = 3;

/// Frame dimensions in pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FrameShape {
    pub width: u32,
    pub height: u32,
}

impl FrameShape {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Expected RGB8 byte length for this shape, if it fits in memory.
    pub fn byte_len(&self) -> Option<usize> {
        (self.width as usize)
            .checked_mul(self.height as usize)
            .and_then(|v| v.checked_mul(CHANNELS))
    }
}

/// Packed RGB8 frame.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Frame {
    data: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

impl Frame {
    /// Wrap a packed RGB8 buffer. The length must match `width * height * 3`.
    pub fn new(data: Vec<u8>, width: u32, height: u32) -> Result<Self> {
        let expected = FrameShape::new(width, height)
            .byte_len()
            .ok_or_else(|| anyhow!("frame dimensions overflow"))?;
        if data.len() != expected {
            return Err(anyhow!(
                "expected {} RGB bytes for {}x{}, received {}",
                expected,
                width,
                height,
                data.len()
            ));
        }
        Ok(Self {
            data,
            width,
            height,
        })
    }

    /// Copy a frame out of a buffer whose rows are `stride` bytes apart.
    ///
    /// Drivers and decoders often pad each row; the padding is dropped.
    pub fn from_strided(data: &[u8], width: u32, height: u32, stride: usize) -> Result<Self> {
        let row_bytes = (width as usize)
            .checked_mul(CHANNELS)
            .ok_or_else(|| anyhow!("frame dimensions overflow"))?;
        if stride < row_bytes {
            return Err(anyhow!(
                "row stride {} is shorter than {} bytes of pixels",
                stride,
                row_bytes
            ));
        }
        if stride == row_bytes {
            let len = FrameShape::new(width, height)
                .byte_len()
                .ok_or_else(|| anyhow!("frame dimensions overflow"))?;
            let pixels = data.get(..len).ok_or_else(|| {
                anyhow!("short frame: expected {} bytes, received {}", len, data.len())
            })?;
            return Self::new(pixels.to_vec(), width, height);
        }

        let mut pixels = Vec::with_capacity(row_bytes * height as usize);
        for row in 0..height as usize {
            let start = row * stride;
            let line = data
                .get(start..start + row_bytes)
                .ok_or_else(|| anyhow!("short frame: row {} is out of bounds", row))?;
            pixels.extend_from_slice(line);
        }
        Self::new(pixels, width, height)
    }

    /// A frame of one solid color.
    pub fn filled(width: u32, height: u32, rgb: [u8; 3]) -> Self {
        let pixel_count = width as usize * height as usize;
        let mut data = Vec::with_capacity(pixel_count * CHANNELS);
        for _ in 0..pixel_count {
            data.extend_from_slice(&rgb);
        }
        Self {
            data,
            width,
            height,
        }
    }

    pub fn shape(&self) -> FrameShape {
        FrameShape::new(self.width, self.height)
    }

    pub fn pixels(&self) -> &[u8] {
        &self.data
    }

    pub fn pixels_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    pub fn to_rgb_image(&self) -> Result<RgbImage> {
        RgbImage::from_raw(self.width, self.height, self.data.clone())
            .ok_or_else(|| anyhow!("frame buffer does not match its dimensions"))
    }
}

impl From<RgbImage> for Frame {
    fn from(image: RgbImage) -> Self {
        let (width, height) = image.dimensions();
        Self {
            data: image.into_raw(),
            width,
            height,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_mismatched_buffer() {
        assert!(Frame::new(vec![0u8; 10], 2, 2).is_err());
        assert!(Frame::new(vec![0u8; 12], 2, 2).is_ok());
    }

    #[test]
    fn clone_is_an_independent_copy() {
        let original = Frame::filled(4, 4, [10, 20, 30]);
        let mut copy = original.clone();
        copy.pixels_mut()[0] = 255;
        assert_eq!(original.pixels()[0], 10);
        assert_eq!(copy.pixels()[0], 255);
    }

    #[test]
    fn strided_rows_drop_padding() -> Result<()> {
        // 2x2 frame, 6 pixel bytes per row padded to 8.
        let data = [
            1, 2, 3, 4, 5, 6, 0xEE, 0xEE, //
            7, 8, 9, 10, 11, 12, 0xEE, 0xEE,
        ];
        let frame = Frame::from_strided(&data, 2, 2, 8)?;
        assert_eq!(frame.pixels(), &[1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12]);
        Ok(())
    }

    #[test]
    fn packed_rows_ignore_trailing_bytes() -> Result<()> {
        let data = [5u8; 20];
        let frame = Frame::from_strided(&data, 2, 2, 6)?;
        assert_eq!(frame.pixels().len(), 12);
        Ok(())
    }

    #[test]
    fn strided_rejects_short_buffers_and_strides() {
        assert!(Frame::from_strided(&[0u8; 14], 2, 2, 8).is_err());
        assert!(Frame::from_strided(&[0u8; 16], 2, 2, 4).is_err());
    }

    #[test]
    fn converts_from_rgb_image() -> Result<()> {
        let image = RgbImage::from_pixel(3, 2, image::Rgb([1, 2, 3]));
        let frame = Frame::from(image);
        assert_eq!(frame.shape(), FrameShape::new(3, 2));
        assert_eq!(&frame.pixels()[..3], &[1, 2, 3]);
        assert_eq!(frame.to_rgb_image()?.dimensions(), (3, 2));
        Ok(())
    }
}
