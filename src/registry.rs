/*!
Name based lookup of the available extractors.

The set of algorithms is closed ([`DescriptorKind`]); the registry only maps
user supplied names onto it. Lookup ignores case.
 */
use std::collections::BTreeMap;
use std::time::Duration;

use crate::error::{ExtractError, Result};
use crate::features::{
    Capabilities, CentroidFeature, Descriptor, FeatureVector, Moments, PointDetector, RgbHistogram, Silent,
    TrajkovicHedley4N,
};
use crate::raster::PixelSource;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DescriptorKind {
    RgbHistogram,
    Moments,
    Centroid,
    TrajkovicHedley,
}

lazy_static::lazy_static! {
    static ref REGISTRY: BTreeMap<String, DescriptorKind> = {
        let mut map = BTreeMap::new();
        for kind in DescriptorKind::ALL {
            map.insert(kind.name().to_lowercase(), kind);
        }
        map
    };
}

impl DescriptorKind {
    pub const ALL: [DescriptorKind; 4] = [
        DescriptorKind::RgbHistogram,
        DescriptorKind::Moments,
        DescriptorKind::Centroid,
        DescriptorKind::TrajkovicHedley,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            DescriptorKind::RgbHistogram => "RGBHistogram",
            DescriptorKind::Moments => "Moments",
            DescriptorKind::Centroid => "CentroidFeature",
            DescriptorKind::TrajkovicHedley => "TrajkovicHedley4N",
        }
    }

    /// Resolve a registered name. Unknown names are a configuration error.
    pub fn resolve(name: &str) -> Result<Self> {
        REGISTRY.get(&name.trim().to_lowercase()).copied().ok_or_else(|| {
            ExtractError::Configuration(format!(
                "unknown descriptor {:?}, expected one of: {}",
                name,
                DescriptorKind::ALL.map(|k| k.name()).join(", ")
            ))
        })
    }

    /// Fresh, configured instance. `args` goes to `set_configuration`.
    pub fn build(&self, args: &[f64]) -> Result<Extractor> {
        let mut extractor = match self {
            DescriptorKind::RgbHistogram => Extractor::Descriptor(Box::<RgbHistogram>::default()),
            DescriptorKind::Moments => Extractor::Descriptor(Box::<Moments>::default()),
            DescriptorKind::Centroid => Extractor::Descriptor(Box::<CentroidFeature>::default()),
            DescriptorKind::TrajkovicHedley => Extractor::Detector(Box::<TrajkovicHedley4N>::default()),
        };
        extractor.set_configuration(args)?;
        Ok(extractor)
    }
}

/**
One instance of either contract, as driven by the batch.

Descriptors yield one vector per image. Point detectors yield one `[x, y]`
vector per detected point, possibly none.
 */
pub enum Extractor {
    Descriptor(Box<dyn Descriptor>),
    Detector(Box<dyn PointDetector>),
}

impl Extractor {
    pub fn name(&self) -> &'static str {
        match self {
            Extractor::Descriptor(d) => d.name(),
            Extractor::Detector(d) => d.name(),
        }
    }

    pub fn supports(&self) -> Capabilities {
        match self {
            Extractor::Descriptor(d) => d.supports(),
            Extractor::Detector(d) => d.supports(),
        }
    }

    fn set_configuration(&mut self, args: &[f64]) -> Result<()> {
        match self {
            Extractor::Descriptor(d) => d.set_configuration(args),
            Extractor::Detector(d) => d.set_configuration(args),
        }
    }

    /// Column labels of the vectors produced by [`Extractor::extract`].
    pub fn labels(&self) -> Vec<String> {
        match self {
            Extractor::Descriptor(d) => d.description(),
            Extractor::Detector(_) => vec!["x".to_string(), "y".to_string()],
        }
    }

    pub fn elapsed(&self) -> Option<Duration> {
        match self {
            Extractor::Descriptor(d) => d.elapsed(),
            Extractor::Detector(d) => d.elapsed(),
        }
    }

    /// Check capabilities, run, and collect the resulting rows.
    pub fn extract(&mut self, image: &PixelSource) -> Result<Vec<FeatureVector>> {
        self.supports().check(self.name(), image)?;
        match self {
            Extractor::Descriptor(d) => {
                d.run(image, &mut Silent)?;
                Ok(vec![d.features()?.clone()])
            }
            Extractor::Detector(d) => {
                d.run(image, &mut Silent)?;
                Ok(d
                    .points()?
                    .iter()
                    .map(|p| FeatureVector::from(vec![p.x as f64, p.y as f64]))
                    .collect())
            }
        }
    }
}
