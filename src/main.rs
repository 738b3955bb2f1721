use std::process::exit;

use clap::Parser;
use jfeature_extraction::args::Args;
use jfeature_extraction::{logger, run_batch, DescriptorKind};
use log::{debug, error, info};

fn list_descriptors() {
    for kind in DescriptorKind::ALL {
        match kind.build(&[]) {
            Ok(extractor) => println!("{:<20} {}", kind.name(), extractor.supports()),
            Err(err) => println!("{:<20} unavailable : {}", kind.name(), err),
        }
    }
}

fn main() {
    let args = Args::parse();
    logger::init(args.verbose);
    debug!("{}", args);

    if args.list {
        list_descriptors();
        return;
    }

    let config = match args.into_config() {
        Ok(config) => config,
        Err(err) => {
            error!("{}", err);
            exit(1);
        }
    };

    match run_batch(&config) {
        Ok(summary) => info!(
            "Done : {} rows from {} files, {} skipped",
            summary.rows, summary.processed, summary.skipped
        ),
        Err(err) => {
            error!("{}", err);
            exit(1);
        }
    }
}
