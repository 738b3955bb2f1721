/*!
First four statistical moments of the pixel population.

Output order is `[mean, std_dev, skewness, kurtosis]`.

- `std_dev` uses the `n - 1` divisor and is 0 for a single pixel.
- `skewness` and `kurtosis` use population moments; `kurtosis` is the excess
  kurtosis (normal distribution = 0).
- A constant image has zero variance, its skewness and kurtosis are reported
  as 0.

Color images are reduced to gray with the channel mean first.
 */
use std::time::Duration;

use crate::error::{ExtractError, Result};
use crate::features::{percent, Capabilities, Descriptor, DescriptorState, FeatureVector, Lifecycle, ProgressListener};
use crate::raster::PixelSource;

const NAME: &str = "Moments";
const LABELS: [&str; 4] = ["mean", "std_dev", "skewness", "kurtosis"];

#[derive(Debug)]
pub struct Moments {
    lifecycle: Lifecycle,
    features: Option<FeatureVector>,
}

impl Default for Moments {
    fn default() -> Self {
        Moments {
            lifecycle: Lifecycle::new(NAME),
            features: None,
        }
    }
}

/// Running mean and centred sums `m2..m4`, updated one sample at a time
/// (Terriberry's extension of Welford's update). No raw power sums are kept.
#[derive(Debug, Default)]
struct CentredMoments {
    n: f64,
    mean: f64,
    m2: f64,
    m3: f64,
    m4: f64,
}

impl CentredMoments {
    fn add(&mut self, v: f64) {
        let n1 = self.n;
        self.n += 1.0;
        let n = self.n;
        let delta = v - self.mean;
        let delta_n = delta / n;
        let delta_n2 = delta_n * delta_n;
        let term1 = delta * delta_n * n1;

        self.mean += delta_n;
        // m4 and m3 read the previous m2/m3, order matters
        self.m4 += term1 * delta_n2 * (n * n - 3.0 * n + 3.0) + 6.0 * delta_n2 * self.m2 - 4.0 * delta_n * self.m3;
        self.m3 += term1 * delta_n * (n - 2.0) - 3.0 * delta_n * self.m2;
        self.m2 += term1;
    }

    fn moments(&self) -> [f64; 4] {
        let n = self.n;
        let std_dev = if n > 1.0 { (self.m2 / (n - 1.0)).sqrt() } else { 0.0 };

        if self.m2 <= 0.0 {
            return [self.mean, std_dev, 0.0, 0.0];
        }
        let skewness = n.sqrt() * self.m3 / self.m2.powf(1.5);
        let kurtosis = n * self.m4 / (self.m2 * self.m2) - 3.0;

        [self.mean, std_dev, skewness, kurtosis]
    }
}

impl Descriptor for Moments {
    fn name(&self) -> &'static str {
        NAME
    }

    fn supports(&self) -> Capabilities {
        Capabilities::ALL
    }

    fn run(&mut self, image: &PixelSource, listener: &mut dyn ProgressListener) -> Result<()> {
        self.features = None;
        self.lifecycle.begin(listener);

        if image.pixel_count() == 0 {
            self.lifecycle.fail();
            return Err(ExtractError::DegenerateInput {
                descriptor: NAME,
                reason: "image has no pixels".to_string(),
            });
        }

        let gray = image.to_gray();
        let mut acc = CentredMoments::default();
        let rows = gray.height() as usize;
        for (y, row) in gray.rows().enumerate() {
            for pixel in row {
                acc.add(pixel[0] as f64);
            }
            self.lifecycle.advance(percent(y + 1, rows), listener);
        }

        self.features = Some(FeatureVector::from(acc.moments().to_vec()));
        self.lifecycle.finish(listener);
        Ok(())
    }

    fn features(&self) -> Result<&FeatureVector> {
        self.features.as_ref().ok_or(ExtractError::NotCalculated(NAME))
    }

    fn description(&self) -> Vec<String> {
        LABELS.iter().map(|label| label.to_string()).collect()
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
        if !args.is_empty() {
            return Err(ExtractError::InvalidArgument(format!(
                "{} takes no arguments, got {}",
                NAME,
                args.len()
            )));
        }
        Ok(())
    }
}
