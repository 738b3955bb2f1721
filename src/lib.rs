/*!
Feature extraction from raster images.

Descriptors turn one image into a fixed-length vector of numbers, point
detectors turn it into a list of points. The batch driver runs one of them
over a directory of images and writes the results to a single table.
 */
pub mod args;
pub mod batch;
pub mod error;
pub mod features;
pub mod logger;
pub mod raster;
pub mod registry;

pub use batch::{run_batch, BatchConfig, BatchSummary};
pub use error::{ExtractError, Result};
pub use raster::PixelSource;
pub use registry::{DescriptorKind, Extractor};
