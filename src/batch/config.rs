//! Batch run configuration

use std::fs::OpenOptions;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::{ExtractError, Result};
use crate::registry::DescriptorKind;

pub const DEFAULT_SEPARATOR: &str = ", ";
pub const DEFAULT_OUTPUT: &str = "features.csv";
pub const DEFAULT_EXTENSIONS: [&str; 10] = ["jpg", "jpeg", "png", "gif", "bmp", "tif", "tiff", "pnm", "pgm", "ppm"];
/// Upper bound on the wait for outstanding tasks once every file is submitted.
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(100 * 24 * 60 * 60);

/// Everything one batch run needs. Build it with [`BatchConfig::builder`].
#[derive(Debug, Clone)]
pub struct BatchConfig {
    /// Directory scanned for images
    pub directory: PathBuf,
    /// Descend into subdirectories
    pub recursive: bool,
    /// Output table
    pub output: PathBuf,
    /// Append to `output` instead of truncating it
    pub append: bool,
    /// Never write the header row
    pub omit_header: bool,
    pub descriptor: DescriptorKind,
    /// Positional configuration handed to every descriptor instance
    pub descriptor_args: Vec<f64>,
    /// Optional first column, same value on every row
    pub class_label: Option<String>,
    /// Worker count, `None` lets rayon pick one per core
    pub threads: Option<usize>,
    pub separator: String,
    /// Lower case extension allow-list, without the dot
    pub extensions: Vec<String>,
    /// Header uses descriptor labels instead of column indices
    pub labels: bool,
    pub shutdown_timeout: Duration,
}

impl BatchConfig {
    pub fn builder(descriptor: DescriptorKind) -> BatchConfigBuilder {
        BatchConfigBuilder {
            descriptor,
            ..Default::default()
        }
    }

    /**
    Check everything that can be checked before work starts.

    The output file is created if missing but never truncated here.
     */
    pub fn validate(&self) -> Result<()> {
        if self.threads == Some(0) {
            return Err(ExtractError::Configuration("thread count must be at least 1".to_string()));
        }
        if !self.directory.is_dir() {
            return Err(ExtractError::Configuration(format!(
                "the directory {:?} does not exist or is not a directory",
                self.directory
            )));
        }
        if let Err(err) = std::fs::read_dir(&self.directory) {
            return Err(ExtractError::Configuration(format!(
                "the directory {:?} cannot be read: {}",
                self.directory, err
            )));
        }
        if self.output.is_dir() {
            return Err(ExtractError::Configuration(format!(
                "the output {:?} is a directory",
                self.output
            )));
        }
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.output)
            .map_err(|err| {
                ExtractError::Configuration(format!(
                    "the output file {:?} cannot be created or written: {}",
                    self.output, err
                ))
            })?;
        if let Some(label) = &self.class_label {
            if !is_valid_class_label(label) {
                return Err(ExtractError::Configuration(format!(
                    "the image class {:?} must only contain word characters",
                    label
                )));
            }
        }
        if self.separator.is_empty() {
            return Err(ExtractError::Configuration("the separator must not be empty".to_string()));
        }
        if self.extensions.is_empty() {
            return Err(ExtractError::Configuration("no image extensions given".to_string()));
        }
        self.descriptor
            .build(&self.descriptor_args)
            .map_err(|err| ExtractError::Configuration(format!("{}: {}", self.descriptor.name(), err)))?;
        Ok(())
    }
}

/// `^\w+$` over ASCII: letters, digits and underscore.
pub fn is_valid_class_label(label: &str) -> bool {
    !label.is_empty() && label.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Builder for BatchConfig
pub struct BatchConfigBuilder {
    descriptor: DescriptorKind,
    directory: Option<PathBuf>,
    recursive: Option<bool>,
    output: Option<PathBuf>,
    append: Option<bool>,
    omit_header: Option<bool>,
    descriptor_args: Option<Vec<f64>>,
    class_label: Option<String>,
    threads: Option<usize>,
    separator: Option<String>,
    extensions: Option<Vec<String>>,
    labels: Option<bool>,
    shutdown_timeout: Option<Duration>,
}

impl Default for BatchConfigBuilder {
    fn default() -> Self {
        BatchConfigBuilder {
            descriptor: DescriptorKind::Moments,
            directory: None,
            recursive: None,
            output: None,
            append: None,
            omit_header: None,
            descriptor_args: None,
            class_label: None,
            threads: None,
            separator: None,
            extensions: None,
            labels: None,
            shutdown_timeout: None,
        }
    }
}

impl BatchConfigBuilder {
    pub fn directory<P: Into<PathBuf>>(mut self, directory: P) -> Self {
        self.directory = Some(directory.into());
        self
    }

    pub fn recursive(mut self, recursive: bool) -> Self {
        self.recursive = Some(recursive);
        self
    }

    pub fn output<P: Into<PathBuf>>(mut self, output: P) -> Self {
        self.output = Some(output.into());
        self
    }

    pub fn append(mut self, append: bool) -> Self {
        self.append = Some(append);
        self
    }

    pub fn omit_header(mut self, omit: bool) -> Self {
        self.omit_header = Some(omit);
        self
    }

    pub fn descriptor_args(mut self, args: Vec<f64>) -> Self {
        self.descriptor_args = Some(args);
        self
    }

    pub fn class_label(mut self, label: Option<String>) -> Self {
        self.class_label = label;
        self
    }

    pub fn threads(mut self, threads: Option<usize>) -> Self {
        self.threads = threads;
        self
    }

    pub fn separator<S: Into<String>>(mut self, separator: S) -> Self {
        self.separator = Some(separator.into());
        self
    }

    pub fn extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.extensions = Some(
            extensions
                .into_iter()
                .map(|e| e.as_ref().trim().trim_start_matches('.').to_lowercase())
                .filter(|e| !e.is_empty())
                .collect(),
        );
        self
    }

    pub fn labels(mut self, labels: bool) -> Self {
        self.labels = Some(labels);
        self
    }

    pub fn shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = Some(timeout);
        self
    }

    pub fn build(self) -> BatchConfig {
        BatchConfig {
            directory: self.directory.unwrap_or_else(|| PathBuf::from(".")),
            recursive: self.recursive.unwrap_or(false),
            output: self.output.unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT)),
            append: self.append.unwrap_or(false),
            omit_header: self.omit_header.unwrap_or(false),
            descriptor: self.descriptor,
            descriptor_args: self.descriptor_args.unwrap_or_default(),
            class_label: self.class_label,
            threads: self.threads,
            separator: self.separator.unwrap_or_else(|| DEFAULT_SEPARATOR.to_string()),
            extensions: self
                .extensions
                .unwrap_or_else(|| DEFAULT_EXTENSIONS.iter().map(|e| e.to_string()).collect()),
            labels: self.labels.unwrap_or(false),
            shutdown_timeout: self.shutdown_timeout.unwrap_or(DEFAULT_SHUTDOWN_TIMEOUT),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_defaults() {
        let config = BatchConfig::builder(DescriptorKind::Centroid).build();
        assert_eq!(config.directory, PathBuf::from("."));
        assert_eq!(config.output, PathBuf::from(DEFAULT_OUTPUT));
        assert_eq!(config.separator, ", ");
        assert_eq!(config.descriptor, DescriptorKind::Centroid);
        assert!(!config.append && !config.omit_header && !config.recursive);
        assert!(config.extensions.contains(&"png".to_string()));
        assert_eq!(config.shutdown_timeout, DEFAULT_SHUTDOWN_TIMEOUT);
    }

    #[test]
    fn test_extensions_are_normalised() {
        let config = BatchConfig::builder(DescriptorKind::Moments)
            .extensions([".PNG", " jpg ", ""])
            .build();
        assert_eq!(config.extensions, vec!["png".to_string(), "jpg".to_string()]);
    }

    #[test]
    fn test_class_label() {
        assert!(is_valid_class_label("cat"));
        assert!(is_valid_class_label("class_2"));
        assert!(!is_valid_class_label(""));
        assert!(!is_valid_class_label("two words"));
        assert!(!is_valid_class_label("a,b"));
    }

    #[test]
    fn test_validate_rejects_missing_directory() {
        let scratch = tempfile::tempdir().unwrap();
        let config = BatchConfig::builder(DescriptorKind::Moments)
            .directory(scratch.path().join("missing"))
            .output(scratch.path().join("out.csv"))
            .build();
        assert!(matches!(config.validate(), Err(ExtractError::Configuration(_))));
    }

    #[test]
    fn test_validate_rejects_bad_label_and_args() {
        let scratch = tempfile::tempdir().unwrap();
        let base = BatchConfig::builder(DescriptorKind::RgbHistogram)
            .directory(scratch.path())
            .output(scratch.path().join("out.csv"));

        let bad_label = base.class_label(Some("not ok".to_string())).build();
        assert!(matches!(bad_label.validate(), Err(ExtractError::Configuration(_))));

        let mut bad_args = bad_label.clone();
        bad_args.class_label = None;
        bad_args.descriptor_args = vec![1.0, 2.0];
        assert!(matches!(bad_args.validate(), Err(ExtractError::Configuration(_))));

        bad_args.descriptor_args = vec![16.0];
        assert!(bad_args.validate().is_ok());
        assert!(scratch.path().join("out.csv").exists());
    }

    #[test]
    fn test_validate_rejects_zero_threads() {
        let scratch = tempfile::tempdir().unwrap();
        let config = BatchConfig::builder(DescriptorKind::Moments)
            .directory(scratch.path())
            .output(scratch.path().join("out.csv"))
            .threads(Some(0))
            .build();
        assert!(config.validate().is_err());
    }
}
