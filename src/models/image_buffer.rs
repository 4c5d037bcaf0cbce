use crate::error::ImageError;
use crate::utils::grayscale::{invert_luma, rgba_to_luma};

/// Channel layout of an [`ImageBuffer`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelLayout {
    /// 4 bytes per pixel: R, G, B, A
    Rgba,
    /// 1 byte per pixel: luminance
    Luma,
}

impl PixelLayout {
    /// Bytes per pixel
    pub fn channels(&self) -> usize {
        match self {
            PixelLayout::Rgba => 4,
            PixelLayout::Luma => 1,
        }
    }
}

/// Owned pixel grid handed to the decode worker.
///
/// Every decode attempt works on its own buffer: variants such as the
/// enhanced or inverted image are fresh allocations, and [`Clone`] is the
/// only way to share pixels between attempts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageBuffer {
    width: usize,
    height: usize,
    layout: PixelLayout,
    data: Vec<u8>,
}

impl ImageBuffer {
    fn new(
        width: usize,
        height: usize,
        layout: PixelLayout,
        data: Vec<u8>,
    ) -> Result<Self, ImageError> {
        if width == 0 || height == 0 {
            return Err(ImageError::ZeroSize { width, height });
        }
        let expected = width * height * layout.channels();
        if data.len() != expected {
            return Err(ImageError::LengthMismatch {
                expected,
                actual: data.len(),
            });
        }
        Ok(Self {
            width,
            height,
            layout,
            data,
        })
    }

    /// Wrap raw RGBA bytes (4 bytes per pixel)
    pub fn from_rgba(width: usize, height: usize, data: Vec<u8>) -> Result<Self, ImageError> {
        Self::new(width, height, PixelLayout::Rgba, data)
    }

    /// Wrap raw RGB bytes, expanding to RGBA with an opaque alpha channel
    pub fn from_rgb(width: usize, height: usize, rgb: &[u8]) -> Result<Self, ImageError> {
        let expected = width * height * 3;
        if rgb.len() != expected {
            return Err(ImageError::LengthMismatch {
                expected,
                actual: rgb.len(),
            });
        }
        let mut rgba = Vec::with_capacity(width * height * 4);
        for px in rgb.chunks_exact(3) {
            rgba.extend_from_slice(&[px[0], px[1], px[2], 255]);
        }
        Self::new(width, height, PixelLayout::Rgba, rgba)
    }

    /// Wrap a luminance plane (1 byte per pixel)
    pub fn from_luma(width: usize, height: usize, data: Vec<u8>) -> Result<Self, ImageError> {
        Self::new(width, height, PixelLayout::Luma, data)
    }

    /// Convert a decoded `image` raster, keeping single-channel images as luminance
    pub fn from_dynamic(img: image::DynamicImage) -> Result<Self, ImageError> {
        let (width, height) = (img.width() as usize, img.height() as usize);
        match img {
            image::DynamicImage::ImageLuma8(luma) => Self::from_luma(width, height, luma.into_raw()),
            other => Self::from_rgba(width, height, other.to_rgba8().into_raw()),
        }
    }

    /// Image width in pixels
    pub fn width(&self) -> usize {
        self.width
    }

    /// Image height in pixels
    pub fn height(&self) -> usize {
        self.height
    }

    /// Channel layout
    pub fn layout(&self) -> PixelLayout {
        self.layout
    }

    /// Raw pixel bytes, row-major
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Mutable pixel bytes. Dimensions and layout cannot change through this.
    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Number of pixels
    pub fn pixel_count(&self) -> usize {
        self.width * self.height
    }

    /// Luminance plane (BT.601 weights) as handed to a decode capability
    pub fn to_luma(&self) -> Vec<u8> {
        match self.layout {
            PixelLayout::Luma => self.data.clone(),
            PixelLayout::Rgba => rgba_to_luma(&self.data, self.width, self.height),
        }
    }

    /// Photometric negative as a luminance image
    pub fn inverted(&self) -> ImageBuffer {
        let mut luma = self.to_luma();
        invert_luma(&mut luma);
        ImageBuffer {
            width: self.width,
            height: self.height,
            layout: PixelLayout::Luma,
            data: luma,
        }
    }

    /// Convert back into an `image` raster (used for writing diagnostics)
    pub fn to_dynamic(&self) -> Option<image::DynamicImage> {
        let (w, h) = (self.width as u32, self.height as u32);
        match self.layout {
            PixelLayout::Luma => image::GrayImage::from_raw(w, h, self.data.clone())
                .map(image::DynamicImage::ImageLuma8),
            PixelLayout::Rgba => image::RgbaImage::from_raw(w, h, self.data.clone())
                .map(image::DynamicImage::ImageRgba8),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_zero_size() {
        assert_eq!(
            ImageBuffer::from_luma(0, 4, Vec::new()),
            Err(ImageError::ZeroSize {
                width: 0,
                height: 4
            })
        );
    }

    #[test]
    fn test_rejects_length_mismatch() {
        let err = ImageBuffer::from_rgba(2, 2, vec![0u8; 15]).unwrap_err();
        assert_eq!(
            err,
            ImageError::LengthMismatch {
                expected: 16,
                actual: 15
            }
        );
    }

    #[test]
    fn test_rgb_expands_with_opaque_alpha() {
        let img = ImageBuffer::from_rgb(2, 1, &[10, 20, 30, 40, 50, 60]).unwrap();
        assert_eq!(img.layout(), PixelLayout::Rgba);
        assert_eq!(img.as_bytes(), &[10, 20, 30, 255, 40, 50, 60, 255]);
    }

    #[test]
    fn test_inverted_is_negative_luma() {
        let img = ImageBuffer::from_luma(3, 1, vec![0, 100, 255]).unwrap();
        let inv = img.inverted();
        assert_eq!(inv.as_bytes(), &[255, 155, 0]);
        // source untouched
        assert_eq!(img.as_bytes(), &[0, 100, 255]);
    }

    #[test]
    fn test_dynamic_round_trip_keeps_layout() {
        let gray = image::GrayImage::from_raw(2, 2, vec![1, 2, 3, 4]).unwrap();
        let img = ImageBuffer::from_dynamic(image::DynamicImage::ImageLuma8(gray)).unwrap();
        assert_eq!(img.layout(), PixelLayout::Luma);
        assert_eq!(img.to_dynamic().unwrap().to_luma8().into_raw(), vec![1, 2, 3, 4]);
    }
}
