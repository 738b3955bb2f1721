/*!
Descriptor contract and the data it produces.

A descriptor maps one image to one fixed-length [`FeatureVector`]. A point
detector maps one image to an ordered list of [`Point`]s. Both go through the
same lifecycle (`Uninitialized -> Running -> Calculated`) and report it to a
[`ProgressListener`] passed into `run`.
 */
pub mod centroid;
pub mod corners;
pub mod histogram;
pub mod moments;

use std::fmt;
use std::ops::Deref;
use std::time::{Duration, Instant};

use crate::error::{ExtractError, Result};
use crate::raster::PixelSource;

pub use self::centroid::CentroidFeature;
pub use self::corners::TrajkovicHedley4N;
pub use self::histogram::RgbHistogram;
pub use self::moments::Moments;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    /// 8-bit single channel input
    Gray8,
    /// 8-bit per channel RGB input
    Rgb8,
    /// The algorithm does not modify the geometry of its source
    NoChanges,
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Capability::Gray8 => "8-bit gray",
            Capability::Rgb8 => "8-bit RGB",
            Capability::NoChanges => "no changes",
        };
        f.write_str(name)
    }
}

/// Capability set declared by a descriptor. Backed by a static slice so it
/// cannot change once a descriptor exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities(&'static [Capability]);

impl Capabilities {
    pub const ALL: Capabilities = Capabilities(&[Capability::Gray8, Capability::Rgb8, Capability::NoChanges]);

    pub const fn new(set: &'static [Capability]) -> Self {
        Capabilities(set)
    }

    pub fn contains(&self, capability: Capability) -> bool {
        self.0.contains(&capability)
    }

    pub fn iter(&self) -> impl Iterator<Item = Capability> + '_ {
        self.0.iter().copied()
    }

    /// Fails with [`ExtractError::Unsupported`] if `image` has a pixel format
    /// outside this set.
    pub fn check(&self, descriptor: &'static str, image: &PixelSource) -> Result<()> {
        let format = image.format();
        if self.contains(format) {
            Ok(())
        } else {
            Err(ExtractError::Unsupported {
                descriptor,
                format: format.to_string(),
            })
        }
    }
}

impl fmt::Display for Capabilities {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names = self.iter().map(|c| c.to_string()).collect::<Vec<_>>();
        f.write_str(&names.join(", "))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DescriptorState {
    #[default]
    Uninitialized,
    Running,
    Calculated,
}

/// Output of one descriptor run. Immutable once built.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FeatureVector(Vec<f64>);

impl FeatureVector {
    pub fn values(&self) -> &[f64] {
        &self.0
    }

    pub fn into_inner(self) -> Vec<f64> {
        self.0
    }
}

impl From<Vec<f64>> for FeatureVector {
    fn from(values: Vec<f64>) -> Self {
        FeatureVector(values)
    }
}

impl Deref for FeatureVector {
    type Target = [f64];

    fn deref(&self) -> &[f64] {
        &self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Point {
    pub x: u32,
    pub y: u32,
}

impl Point {
    pub fn new(x: u32, y: u32) -> Self {
        Point { x, y }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressEvent {
    pub descriptor: &'static str,
    pub state: DescriptorState,
    /// Percentage in `[0, 100]`.
    pub progress: u8,
}

/**
Receiver of lifecycle notifications.

Delivery is synchronous, on the thread calling `run`. The first event of every
run carries the state the descriptor was in before the run started.
 */
pub trait ProgressListener {
    fn notify(&mut self, event: &ProgressEvent);
}

impl<F: FnMut(&ProgressEvent)> ProgressListener for F {
    fn notify(&mut self, event: &ProgressEvent) {
        self(event)
    }
}

/// Listener that drops every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct Silent;

impl ProgressListener for Silent {
    fn notify(&mut self, _event: &ProgressEvent) {}
}

pub trait Descriptor: Send {
    fn name(&self) -> &'static str;

    fn supports(&self) -> Capabilities;

    /// Compute the feature vector of `image`. A second call recomputes from
    /// scratch; nothing accumulates across runs except configuration.
    fn run(&mut self, image: &PixelSource, listener: &mut dyn ProgressListener) -> Result<()>;

    /// The last computed vector, or [`ExtractError::NotCalculated`].
    fn features(&self) -> Result<&FeatureVector>;

    /// One label per output dimension.
    fn description(&self) -> Vec<String>;

    fn progress(&self) -> u8;

    fn state(&self) -> DescriptorState;

    /// Duration of the last successful run.
    fn elapsed(&self) -> Option<Duration>;

    /// Positional numeric configuration. An empty slice restores the defaults.
    fn set_configuration(&mut self, args: &[f64]) -> Result<()>;
}

pub trait PointDetector: Send {
    fn name(&self) -> &'static str;

    fn supports(&self) -> Capabilities;

    fn run(&mut self, image: &PixelSource, listener: &mut dyn ProgressListener) -> Result<()>;

    /// Points found by the last run, in detection order.
    fn points(&self) -> Result<&[Point]>;

    fn progress(&self) -> u8;

    fn state(&self) -> DescriptorState;

    fn elapsed(&self) -> Option<Duration>;

    fn set_configuration(&mut self, args: &[f64]) -> Result<()>;
}

/// State, progress and timing bookkeeping shared by every implementation.
#[derive(Debug)]
pub(crate) struct Lifecycle {
    name: &'static str,
    state: DescriptorState,
    progress: u8,
    started: Option<Instant>,
    elapsed: Option<Duration>,
}

impl Lifecycle {
    pub(crate) fn new(name: &'static str) -> Self {
        Lifecycle {
            name,
            state: DescriptorState::Uninitialized,
            progress: 0,
            started: None,
            elapsed: None,
        }
    }

    pub(crate) fn state(&self) -> DescriptorState {
        self.state
    }

    pub(crate) fn progress(&self) -> u8 {
        self.progress
    }

    pub(crate) fn elapsed(&self) -> Option<Duration> {
        self.elapsed
    }

    pub(crate) fn is_calculated(&self) -> bool {
        self.state == DescriptorState::Calculated
    }

    fn emit(&self, listener: &mut dyn ProgressListener) {
        listener.notify(&ProgressEvent {
            descriptor: self.name,
            state: self.state,
            progress: self.progress,
        });
    }

    pub(crate) fn begin(&mut self, listener: &mut dyn ProgressListener) {
        self.emit(listener);
        self.state = DescriptorState::Running;
        self.progress = 0;
        self.started = Some(Instant::now());
        self.elapsed = None;
        self.emit(listener);
    }

    /// Move progress forward to `percent`. Never moves backwards and only
    /// notifies when the value changes.
    pub(crate) fn advance(&mut self, percent: u8, listener: &mut dyn ProgressListener) {
        let percent = percent.min(100);
        if percent > self.progress {
            self.progress = percent;
            self.emit(listener);
        }
    }

    pub(crate) fn finish(&mut self, listener: &mut dyn ProgressListener) {
        self.state = DescriptorState::Calculated;
        self.progress = 100;
        self.elapsed = self.started.take().map(|start| start.elapsed());
        self.emit(listener);
    }

    pub(crate) fn fail(&mut self) {
        self.state = DescriptorState::Uninitialized;
        self.started = None;
    }
}

/// Percentage of `done` out of `total` units, rounded down.
pub(crate) fn percent(done: usize, total: usize) -> u8 {
    if total == 0 {
        return 100;
    }
    ((done.min(total) * 100) / total) as u8
}

/// Read a positional argument that must hold an integer.
pub(crate) fn integer_arg(value: f64, what: &str) -> Result<i64> {
    if !value.is_finite() || value.fract() != 0.0 {
        return Err(ExtractError::InvalidArgument(format!("{} must be an integer, got {}", what, value)));
    }
    Ok(value as i64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lifecycle_fires_current_state_first() {
        let mut events = Vec::new();
        let mut listener = |e: &ProgressEvent| events.push((e.state, e.progress));
        let mut lifecycle = Lifecycle::new("test");
        lifecycle.begin(&mut listener);
        lifecycle.advance(40, &mut listener);
        lifecycle.advance(40, &mut listener);
        lifecycle.advance(10, &mut listener);
        lifecycle.finish(&mut listener);

        assert_eq!(
            events,
            vec![
                (DescriptorState::Uninitialized, 0),
                (DescriptorState::Running, 0),
                (DescriptorState::Running, 40),
                (DescriptorState::Calculated, 100),
            ]
        );
        assert!(lifecycle.elapsed().is_some());
    }

    #[test]
    fn test_capability_check() {
        const GRAY_ONLY: Capabilities = Capabilities::new(&[Capability::Gray8]);
        let rgb = PixelSource::from(image::RgbImage::new(2, 2));
        let gray = PixelSource::from(image::GrayImage::new(2, 2));
        assert!(GRAY_ONLY.check("gray-only", &gray).is_ok());
        assert!(matches!(
            GRAY_ONLY.check("gray-only", &rgb),
            Err(ExtractError::Unsupported { .. })
        ));
        assert!(Capabilities::ALL.check("all", &rgb).is_ok());
    }

    #[test]
    fn test_integer_arg() {
        assert_eq!(integer_arg(4.0, "bins").unwrap(), 4);
        assert!(integer_arg(4.5, "bins").is_err());
        assert!(integer_arg(f64::NAN, "bins").is_err());
    }

    #[test]
    fn test_percent() {
        assert_eq!(percent(0, 3), 0);
        assert_eq!(percent(1, 3), 33);
        assert_eq!(percent(3, 3), 100);
        assert_eq!(percent(0, 0), 100);
    }
}
