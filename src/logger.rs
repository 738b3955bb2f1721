use log::LevelFilter;

/// Install the pretty_env_logger backend.
///
/// `RUST_LOG` wins when set; otherwise the level is `info`, or `debug` with `verbose`.
pub fn init(verbose: bool) {
    let mut builder = pretty_env_logger::formatted_builder();
    builder.filter_level(if verbose { LevelFilter::Debug } else { LevelFilter::Info });
    if let Ok(filters) = std::env::var("RUST_LOG") {
        builder.parse_filters(&filters);
    }
    if let Err(err) = builder.try_init() {
        eprintln!("Couldn't initialise logging : {}", err);
    }
}
