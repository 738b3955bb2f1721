use std::path::PathBuf;

use clap::Parser;

use crate::batch::{BatchConfig, DEFAULT_OUTPUT, DEFAULT_SEPARATOR};
use crate::error::{ExtractError, Result};
use crate::registry::DescriptorKind;

/// Extract feature vectors from a directory of images into one table
#[derive(Debug, Parser, Clone)]
#[clap(name = "feature-extractor")]
pub struct Args {
    /// Thread count :
    /// the number of worker threads,
    /// if not specified, one per available core
    #[clap(short, long)]
    pub threads: Option<usize>,
    /// Directory containing the images
    #[clap(short, long, default_value = ".")]
    pub directory: PathBuf,
    /// Recursively descend into subdirectories
    #[clap(short, long)]
    pub recursive: bool,
    /// Output file
    #[clap(short, long, default_value = DEFAULT_OUTPUT)]
    pub output: PathBuf,
    /// Append to the output file instead of overwriting it
    #[clap(long)]
    pub append: bool,
    /// Omit the header line
    #[clap(short = 'n', long)]
    pub omit_header: bool,
    /// Descriptor to use (see --list)
    #[clap(short = 'D', long, required_unless_present = "list")]
    pub descriptor: Option<String>,
    /// Image class written as first column of every row
    #[clap(short, long = "class")]
    pub class: Option<String>,
    /// Descriptor arguments :
    /// comma separated numbers passed to the descriptor, e.g. `--args 64` for a 64 bin histogram
    #[clap(short, long, value_delimiter = ',', allow_hyphen_values = true)]
    pub args: Vec<f64>,
    /// Column separator
    #[clap(long, default_value = DEFAULT_SEPARATOR)]
    pub separator: String,
    /// Comma separated list of image extensions to pick up
    #[clap(long, value_delimiter = ',')]
    pub extensions: Option<Vec<String>>,
    /// Name header columns after the descriptor's labels instead of their index
    #[clap(long)]
    pub labels: bool,
    /// List the available descriptors and exit
    #[clap(long)]
    pub list: bool,
    /// verbose :
    /// if specified, will print more information
    #[clap(short, long)]
    pub verbose: bool,
}

impl std::fmt::Display for Args {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Args:\n\tdescriptor: {:?}\n\tdirectory: {:?}\n\toutput: {:?}\n\tappend: {}\n\tthreads: {:?}",
            self.descriptor, self.directory, self.output, self.append, self.threads
        )
    }
}

impl Args {
    /// Resolve the descriptor name and assemble the batch configuration.
    pub fn into_config(self) -> Result<BatchConfig> {
        let name = self
            .descriptor
            .as_deref()
            .ok_or_else(|| ExtractError::Configuration("no descriptor given".to_string()))?;
        let descriptor = DescriptorKind::resolve(name)?;

        let mut builder = BatchConfig::builder(descriptor)
            .directory(self.directory)
            .recursive(self.recursive)
            .output(self.output)
            .append(self.append)
            .omit_header(self.omit_header)
            .descriptor_args(self.args)
            .class_label(self.class)
            .threads(self.threads)
            .separator(self.separator)
            .labels(self.labels);
        if let Some(extensions) = self.extensions {
            builder = builder.extensions(extensions);
        }
        Ok(builder.build())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_command_line() {
        let args = Args::try_parse_from([
            "feature-extractor",
            "-D",
            "RGBHistogram",
            "-d",
            "images",
            "-r",
            "-o",
            "out.csv",
            "--append",
            "-n",
            "-c",
            "cats",
            "--args",
            "64",
            "--threads",
            "3",
            "--extensions",
            "png,jpg",
        ])
        .unwrap();
        let config = args.into_config().unwrap();

        assert_eq!(config.descriptor, DescriptorKind::RgbHistogram);
        assert_eq!(config.directory, PathBuf::from("images"));
        assert!(config.recursive && config.append && config.omit_header);
        assert_eq!(config.output, PathBuf::from("out.csv"));
        assert_eq!(config.class_label.as_deref(), Some("cats"));
        assert_eq!(config.descriptor_args, vec![64.0]);
        assert_eq!(config.threads, Some(3));
        assert_eq!(config.extensions, vec!["png".to_string(), "jpg".to_string()]);
    }

    #[test]
    fn test_defaults() {
        let config = Args::try_parse_from(["feature-extractor", "-D", "Moments"])
            .unwrap()
            .into_config()
            .unwrap();
        assert_eq!(config.output, PathBuf::from(DEFAULT_OUTPUT));
        assert_eq!(config.separator, DEFAULT_SEPARATOR);
        assert_eq!(config.threads, None);
        assert!(!config.append);
    }

    #[test]
    fn test_descriptor_is_required_unless_listing() {
        assert!(Args::try_parse_from(["feature-extractor"]).is_err());
        assert!(Args::try_parse_from(["feature-extractor", "--list"]).is_ok());
    }

    #[test]
    fn test_unknown_descriptor() {
        let args = Args::try_parse_from(["feature-extractor", "-D", "Sift"]).unwrap();
        assert!(matches!(args.into_config(), Err(ExtractError::Configuration(_))));
    }
}
