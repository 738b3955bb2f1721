/*!
Trajkovic-Hedley corner detector, 4-neighbour variant.

Two passes:
1. On a copy downscaled by `scale`, every interior pixel gets the simple
   cornerness `min(rA, rB)`; pixels scoring at least `threshold1` become
   candidates.
2. Each candidate is mapped back to full resolution (`x * scale`,
   `y * scale`). If the simple cornerness there reaches `threshold2`, the
   interpixel cornerness is computed and the point is kept when it also
   reaches `threshold2`.

Neighbours sit at offset `distance`: A1 below, A2 above, B1 right, B2 left.
No non-maximum suppression is applied, adjacent points may all be reported.

Reference: M. Trajkovic, M. Hedley, "Fast corner detection",
Image and Vision Computing 16 (1998).
 */
use std::time::Duration;

use image::imageops::{self, FilterType};
use image::GrayImage;

use crate::error::{ExtractError, Result};
use crate::features::{
    integer_arg, Capabilities, Capability, DescriptorState, Lifecycle, Point, PointDetector, ProgressListener,
};
use crate::raster::PixelSource;

const NAME: &str = "TrajkovicHedley4N";

pub const DEFAULT_DISTANCE: u32 = 1;
pub const DEFAULT_THRESHOLD: i64 = 500;
pub const DEFAULT_SCALE: u32 = 2;

#[derive(Debug)]
pub struct TrajkovicHedley4N {
    distance: u32,
    threshold1: i64,
    threshold2: i64,
    scale: u32,
    lifecycle: Lifecycle,
    corners: Vec<Point>,
}

impl Default for TrajkovicHedley4N {
    fn default() -> Self {
        TrajkovicHedley4N {
            distance: DEFAULT_DISTANCE,
            threshold1: DEFAULT_THRESHOLD,
            threshold2: DEFAULT_THRESHOLD,
            scale: DEFAULT_SCALE,
            lifecycle: Lifecycle::new(NAME),
            corners: Vec::new(),
        }
    }
}

/// Center sample and its four axis-aligned neighbours.
#[derive(Debug, Clone, Copy)]
struct Cross {
    c: i64,
    a1: i64,
    a2: i64,
    b1: i64,
    b2: i64,
}

impl Cross {
    /// Caller guarantees `(x, y)` is at least `d` pixels away from every border.
    fn at(image: &GrayImage, x: u32, y: u32, d: u32) -> Self {
        let px = |x: u32, y: u32| image.get_pixel(x, y)[0] as i64;
        Cross {
            c: px(x, y),
            a1: px(x, y + d),
            a2: px(x, y - d),
            b1: px(x + d, y),
            b2: px(x - d, y),
        }
    }

    fn r_a(&self) -> i64 {
        (self.a1 - self.c).pow(2) + (self.a2 - self.c).pow(2)
    }

    fn r_b(&self) -> i64 {
        (self.b1 - self.c).pow(2) + (self.b2 - self.c).pow(2)
    }

    fn simple(&self) -> i64 {
        self.r_a().min(self.r_b())
    }

    fn interpixel(&self) -> i64 {
        let Cross { c, a1, a2, b1, b2 } = *self;
        let r_a = self.r_a();
        let r_b = self.r_b();
        let b1_ = (b1 - a1) * (a1 - c) + (b2 - a2) * (a2 - c);
        let b2_ = (b1 - a2) * (a2 - c) + (b2 - a1) * (a1 - c);
        let b = b1_.min(b2_);
        let a = r_b - r_a - 2 * b;

        if b < 0 && a + b > 0 {
            r_a - (b * b) / a
        } else {
            r_a.min(r_b)
        }
    }
}

impl TrajkovicHedley4N {
    /**
    Create a detector.

    # Arguments
    * `distance` - offset of the four neighbours, at least 1
    * `threshold1` - minimum cornerness on the downscaled image, at least 1
    * `threshold2` - minimum cornerness on the full image, at least 1
    * `scale` - downscaling factor of the first pass, at least 1
     */
    pub fn new(distance: i64, threshold1: i64, threshold2: i64, scale: i64) -> Result<Self> {
        if distance < 1 {
            return Err(ExtractError::InvalidArgument(format!("distance must be at least 1, got {}", distance)));
        }
        if scale < 1 {
            return Err(ExtractError::InvalidArgument(format!("scale must be at least 1, got {}", scale)));
        }
        if threshold1 < 1 || threshold2 < 1 {
            return Err(ExtractError::InvalidArgument(format!(
                "thresholds must be at least 1, got {} and {}",
                threshold1, threshold2
            )));
        }
        let distance = u32::try_from(distance)
            .map_err(|_| ExtractError::InvalidArgument(format!("distance {} is too large", distance)))?;
        let scale =
            u32::try_from(scale).map_err(|_| ExtractError::InvalidArgument(format!("scale {} is too large", scale)))?;
        Ok(TrajkovicHedley4N {
            distance,
            threshold1,
            threshold2,
            scale,
            ..Default::default()
        })
    }

    pub fn distance(&self) -> u32 {
        self.distance
    }

    pub fn thresholds(&self) -> (i64, i64) {
        (self.threshold1, self.threshold2)
    }

    pub fn scale(&self) -> u32 {
        self.scale
    }

    fn interior(&self, len: u32) -> std::ops::Range<u32> {
        self.distance..len.saturating_sub(self.distance)
    }

    fn detect(&mut self, full: &GrayImage, listener: &mut dyn ProgressListener) {
        let low_width = full.width() / self.scale;
        let low_height = full.height() / self.scale;
        if low_width == 0 || low_height == 0 {
            return;
        }
        let low = imageops::resize(full, low_width, low_height, FilterType::Triangle);

        let columns = self.interior(low_width);
        let rows = self.interior(low_height);
        let span = columns.len().max(1);
        let mut candidates = vec![false; low_width as usize * low_height as usize];
        let index = |x: u32, y: u32| y as usize * low_width as usize + x as usize;

        for (done, x) in columns.clone().enumerate() {
            for y in rows.clone() {
                candidates[index(x, y)] = Cross::at(&low, x, y, self.distance).simple() >= self.threshold1;
            }
            self.lifecycle.advance(((done + 1) * 50 / span) as u8, listener);
        }

        for (done, x) in columns.clone().enumerate() {
            for y in rows.clone() {
                if !candidates[index(x, y)] {
                    continue;
                }
                let (orig_x, orig_y) = (x * self.scale, y * self.scale);
                let cross = Cross::at(full, orig_x, orig_y, self.distance);
                if cross.simple() >= self.threshold2 && cross.interpixel() >= self.threshold2 {
                    self.corners.push(Point::new(orig_x, orig_y));
                }
            }
            self.lifecycle.advance((50 + (done + 1) * 50 / span) as u8, listener);
        }
    }
}

impl PointDetector for TrajkovicHedley4N {
    fn name(&self) -> &'static str {
        NAME
    }

    fn supports(&self) -> Capabilities {
        Capabilities::new(&[Capability::NoChanges, Capability::Gray8])
    }

    fn run(&mut self, image: &PixelSource, listener: &mut dyn ProgressListener) -> Result<()> {
        self.corners.clear();
        self.lifecycle.begin(listener);
        let gray = image.to_gray();
        self.detect(&gray, listener);
        self.lifecycle.finish(listener);
        Ok(())
    }

    fn points(&self) -> Result<&[Point]> {
        if self.lifecycle.is_calculated() {
            Ok(&self.corners)
        } else {
            Err(ExtractError::NotCalculated(NAME))
        }
    }

    fn progress(&self) -> u8 {
        self.lifecycle.progress()
    }

    fn state(&self) -> DescriptorState {
        self.lifecycle.state()
    }

    fn elapsed(&self) -> Option<Duration> {
        self.lifecycle.elapsed()
    }

    fn set_configuration(&mut self, args: &[f64]) -> Result<()> {
        let configured = match args {
            [] => TrajkovicHedley4N::default(),
            [distance, threshold1, threshold2, scale] => TrajkovicHedley4N::new(
                integer_arg(*distance, "distance")?,
                integer_arg(*threshold1, "threshold1")?,
                integer_arg(*threshold2, "threshold2")?,
                integer_arg(*scale, "scale")?,
            )?,
            _ => {
                return Err(ExtractError::InvalidArgument(format!(
                    "{} takes 0 or 4 arguments (distance, threshold1, threshold2, scale), got {}",
                    NAME,
                    args.len()
                )))
            }
        };
        self.distance = configured.distance;
        self.threshold1 = configured.threshold1;
        self.threshold2 = configured.threshold2;
        self.scale = configured.scale;
        Ok(())
    }
}
