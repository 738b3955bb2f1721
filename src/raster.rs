/*!
Decoded raster handed to the descriptors.

Only two pixel layouts are kept: 8-bit grayscale and 8-bit RGB. Anything else
the decoder yields is converted to the closest of the two.
 */
use std::borrow::Cow;
use std::path::Path;

use image::{DynamicImage, GrayImage, Luma, RgbImage};

use crate::error::{ExtractError, Result};
use crate::features::Capability;

#[derive(Debug, Clone)]
pub enum PixelSource {
    Gray(GrayImage),
    Rgb(RgbImage),
}

impl PixelSource {
    /// Decode an image file from disk.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let decoded = image::open(path).map_err(|err| ExtractError::Decode {
            path: path.to_path_buf(),
            reason: err.to_string(),
        })?;
        Ok(Self::from_dynamic(decoded))
    }

    pub fn from_dynamic(image: DynamicImage) -> Self {
        match image {
            DynamicImage::ImageLuma8(gray) => PixelSource::Gray(gray),
            DynamicImage::ImageLumaA8(_)
            | DynamicImage::ImageLuma16(_)
            | DynamicImage::ImageLumaA16(_) => PixelSource::Gray(image.to_luma8()),
            DynamicImage::ImageRgb8(rgb) => PixelSource::Rgb(rgb),
            other => PixelSource::Rgb(other.to_rgb8()),
        }
    }

    pub fn width(&self) -> u32 {
        match self {
            PixelSource::Gray(img) => img.width(),
            PixelSource::Rgb(img) => img.width(),
        }
    }

    pub fn height(&self) -> u32 {
        match self {
            PixelSource::Gray(img) => img.height(),
            PixelSource::Rgb(img) => img.height(),
        }
    }

    pub fn pixel_count(&self) -> usize {
        self.width() as usize * self.height() as usize
    }

    /// The pixel format of this image, as matched against a capability set.
    pub fn format(&self) -> Capability {
        match self {
            PixelSource::Gray(_) => Capability::Gray8,
            PixelSource::Rgb(_) => Capability::Rgb8,
        }
    }

    /// Sample of `channel` (0 = red, 1 = green, 2 = blue) at (x, y).
    /// Grayscale images report the same value for every channel.
    pub fn sample(&self, x: u32, y: u32, channel: usize) -> u8 {
        match self {
            PixelSource::Gray(img) => img.get_pixel(x, y)[0],
            PixelSource::Rgb(img) => img.get_pixel(x, y)[channel],
        }
    }

    /**
    Single channel view of the image.

    Color pixels are reduced with the unweighted mean `(r + g + b) / 3`,
    so every channel contributes equally.
     */
    pub fn to_gray(&self) -> Cow<'_, GrayImage> {
        match self {
            PixelSource::Gray(img) => Cow::Borrowed(img),
            PixelSource::Rgb(img) => Cow::Owned(GrayImage::from_fn(img.width(), img.height(), |x, y| {
                let [r, g, b] = img.get_pixel(x, y).0;
                Luma([((r as u32 + g as u32 + b as u32) / 3) as u8])
            })),
        }
    }
}

impl From<GrayImage> for PixelSource {
    fn from(image: GrayImage) -> Self {
        PixelSource::Gray(image)
    }
}

impl From<RgbImage> for PixelSource {
    fn from(image: RgbImage) -> Self {
        PixelSource::Rgb(image)
    }
}
