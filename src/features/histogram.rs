/*!
Per-channel color histogram.

Each channel is histogrammed on its own by weighting the two other channels
to zero, the output is laid out as `[red bins | green bins | blue bins]`.
 */
use std::time::Duration;

use crate::error::{ExtractError, Result};
use crate::features::{
    integer_arg, percent, Capabilities, Capability, Descriptor, DescriptorState, FeatureVector, Lifecycle,
    ProgressListener,
};
use crate::raster::PixelSource;

const NAME: &str = "RGBHistogram";
const CHANNELS: usize = 3;
const CHANNEL_NAMES: [&str; CHANNELS] = ["red", "green", "blue"];
const MAX_TONAL_VALUES: usize = 256;

/// One-hot channel weights used to isolate red, green and blue.
const MASKS: [[u32; CHANNELS]; CHANNELS] = [[1, 0, 0], [0, 1, 0], [0, 0, 1]];

#[derive(Debug)]
pub struct RgbHistogram {
    tonal_values: usize,
    lifecycle: Lifecycle,
    features: Option<FeatureVector>,
}

impl Default for RgbHistogram {
    fn default() -> Self {
        RgbHistogram {
            tonal_values: MAX_TONAL_VALUES,
            lifecycle: Lifecycle::new(NAME),
            features: None,
        }
    }
}

impl RgbHistogram {
    /**
    Histogram with `tonal_values` bins per channel.

    With 256 bins a sample lands in the bin equal to its value. With fewer
    bins the 256 levels are split linearly: `bin = value * tonal_values / 256`.
     */
    pub fn new(tonal_values: usize) -> Result<Self> {
        if tonal_values == 0 || tonal_values > MAX_TONAL_VALUES {
            return Err(ExtractError::InvalidArgument(format!(
                "tonal values must be in 1..={}, got {}",
                MAX_TONAL_VALUES, tonal_values
            )));
        }
        Ok(RgbHistogram {
            tonal_values,
            ..Default::default()
        })
    }

    pub fn tonal_values(&self) -> usize {
        self.tonal_values
    }

    fn bin(&self, value: u8) -> usize {
        value as usize * self.tonal_values / MAX_TONAL_VALUES
    }

    /// Histogram of the weighted channel sum, clamped to the 8-bit range.
    fn weighted_histogram(&self, image: &PixelSource, weights: [u32; CHANNELS]) -> Vec<u64> {
        let mut bins = vec![0u64; self.tonal_values];
        for y in 0..image.height() {
            for x in 0..image.width() {
                let value = (0..CHANNELS)
                    .map(|c| weights[c] * image.sample(x, y, c) as u32)
                    .sum::<u32>()
                    .min(255) as u8;
                bins[self.bin(value)] += 1;
            }
        }
        bins
    }
}

impl Descriptor for RgbHistogram {
    fn name(&self) -> &'static str {
        NAME
    }

    fn supports(&self) -> Capabilities {
        Capabilities::new(&[Capability::NoChanges, Capability::Gray8, Capability::Rgb8])
    }

    fn run(&mut self, image: &PixelSource, listener: &mut dyn ProgressListener) -> Result<()> {
        self.features = None;
        self.lifecycle.begin(listener);

        let mut values = Vec::with_capacity(CHANNELS * self.tonal_values);
        for (done, weights) in MASKS.iter().enumerate() {
            let bins = self.weighted_histogram(image, *weights);
            values.extend(bins.into_iter().map(|count| count as f64));
            self.lifecycle.advance(percent(done + 1, CHANNELS), listener);
        }

        self.features = Some(FeatureVector::from(values));
        self.lifecycle.finish(listener);
        Ok(())
    }

    fn features(&self) -> Result<&FeatureVector> {
        self.features.as_ref().ok_or(ExtractError::NotCalculated(NAME))
    }

    fn description(&self) -> Vec<String> {
        CHANNEL_NAMES
            .iter()
            .flat_map(|channel| (0..self.tonal_values).map(move |bin| format!("{}_{}", channel, bin)))
            .collect()
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
        let tonal_values = match args {
            [] => MAX_TONAL_VALUES,
            [bins] => {
                let bins = integer_arg(*bins, "tonal values")?;
                if bins < 1 || bins > MAX_TONAL_VALUES as i64 {
                    return Err(ExtractError::InvalidArgument(format!(
                        "tonal values must be in 1..={}, got {}",
                        MAX_TONAL_VALUES, bins
                    )));
                }
                bins as usize
            }
            _ => {
                return Err(ExtractError::InvalidArgument(format!(
                    "{} takes at most 1 argument, got {}",
                    NAME,
                    args.len()
                )))
            }
        };
        self.tonal_values = tonal_values;
        Ok(())
    }
}
