/*!
Centroid of the foreground, i.e. of every pixel that differs from the
background value. Output is `[x, y]`.
 */
use std::time::Duration;

use crate::error::{ExtractError, Result};
use crate::features::{
    integer_arg, percent, Capabilities, Descriptor, DescriptorState, FeatureVector, Lifecycle,
    ProgressListener,
};
use crate::raster::PixelSource;

const NAME: &str = "CentroidFeature";

#[derive(Debug)]
pub struct CentroidFeature {
    background: u8,
    lifecycle: Lifecycle,
    features: Option<FeatureVector>,
}

impl Default for CentroidFeature {
    fn default() -> Self {
        CentroidFeature {
            background: 0,
            lifecycle: Lifecycle::new(NAME),
            features: None,
        }
    }
}

impl CentroidFeature {
    pub fn with_background(background: u8) -> Self {
        CentroidFeature {
            background,
            ..Default::default()
        }
    }

    pub fn background(&self) -> u8 {
        self.background
    }

    /// Centroid x of the last run.
    pub fn x(&self) -> Option<f64> {
        self.features.as_ref().map(|f| f[0])
    }

    /// Centroid y of the last run.
    pub fn y(&self) -> Option<f64> {
        self.features.as_ref().map(|f| f[1])
    }
}

impl Descriptor for CentroidFeature {
    fn name(&self) -> &'static str {
        NAME
    }

    fn supports(&self) -> Capabilities {
        Capabilities::ALL
    }

    fn run(&mut self, image: &PixelSource, listener: &mut dyn ProgressListener) -> Result<()> {
        self.features = None;
        self.lifecycle.begin(listener);

        let gray = image.to_gray();
        let rows = gray.height() as usize;
        let (mut sum_x, mut sum_y, mut k) = (0u64, 0u64, 0u64);
        for (y, row) in gray.rows().enumerate() {
            for (x, pixel) in row.enumerate() {
                if pixel[0] != self.background {
                    sum_x += x as u64;
                    sum_y += y as u64;
                    k += 1;
                }
            }
            self.lifecycle.advance(percent(y + 1, rows), listener);
        }

        if k == 0 {
            self.lifecycle.fail();
            return Err(ExtractError::DegenerateInput {
                descriptor: NAME,
                reason: format!("every pixel has the background value {}", self.background),
            });
        }

        let k = k as f64;
        self.features = Some(FeatureVector::from(vec![sum_x as f64 / k, sum_y as f64 / k]));
        self.lifecycle.finish(listener);
        Ok(())
    }

    fn features(&self) -> Result<&FeatureVector> {
        self.features.as_ref().ok_or(ExtractError::NotCalculated(NAME))
    }

    fn description(&self) -> Vec<String> {
        vec!["x".to_string(), "y".to_string()]
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
        self.background = match args {
            [] => 0,
            [background] => {
                let background = integer_arg(*background, "background color")?;
                u8::try_from(background).map_err(|_| {
                    ExtractError::InvalidArgument(format!("background color must be in 0..=255, got {}", background))
                })?
            }
            _ => {
                return Err(ExtractError::InvalidArgument(format!(
                    "{} takes at most 1 argument, got {}",
                    NAME,
                    args.len()
                )))
            }
        };
        Ok(())
    }
}
