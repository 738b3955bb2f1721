/*!
Batch extraction over a directory of images.

One task per file runs on a fixed size rayon pool. Every task decodes its
image, builds its own extractor and hands the rows to the shared
[`TableWriter`], which sits behind a mutex so only one task writes at a time.
A failing file is logged and skipped, it never stops the other tasks.
 */
mod config;
mod table;

pub use config::{
    is_valid_class_label, BatchConfig, BatchConfigBuilder, DEFAULT_EXTENSIONS, DEFAULT_OUTPUT, DEFAULT_SEPARATOR,
    DEFAULT_SHUTDOWN_TIMEOUT,
};
pub use table::{TableFormat, TableWriter};

use std::collections::HashSet;
use std::fs::File;
use std::io::BufWriter;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::{mpsc, Arc, Mutex, MutexGuard};
use std::time::Instant;

use log::{debug, error, info, warn};

use crate::error::{ExtractError, Result};
use crate::raster::PixelSource;
use crate::registry::DescriptorKind;

type SharedTable = Arc<Mutex<TableWriter<BufWriter<File>>>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BatchSummary {
    /// Files found in the input directory
    pub files: usize,
    /// Files whose rows made it into the table
    pub processed: usize,
    pub skipped: usize,
    pub rows: usize,
}

impl BatchSummary {
    fn record(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::Written(rows) => {
                self.processed += 1;
                self.rows += rows;
            }
            Outcome::Skipped => self.skipped += 1,
        }
    }

    fn pending(&self) -> usize {
        self.files - self.processed - self.skipped
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Written(usize),
    Skipped,
}

/// Lists the files below `directory` whose extension is in `extensions`,
/// sorted by path.
///
/// Symlinked directories are followed, but every directory is read at most
/// once, keyed by its canonical path, so link cycles terminate.
pub fn list_images(directory: &Path, recursive: bool, extensions: &[String]) -> Result<Vec<PathBuf>> {
    let mut found = Vec::new();
    let mut visited = HashSet::new();
    let mut pending = vec![directory.to_path_buf()];
    let mut top = true;

    while let Some(dir) = pending.pop() {
        match dir.canonicalize() {
            Ok(canonical) => {
                if !visited.insert(canonical) {
                    debug!("Already listed {:?}, skipping", dir);
                    continue;
                }
            }
            Err(err) if top => {
                return Err(ExtractError::Configuration(format!("cannot read {:?}: {}", dir, err)));
            }
            Err(err) => {
                warn!("Skipping unresolvable directory {:?} : {}", dir, err);
                continue;
            }
        }
        let entries = match std::fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(err) if top => {
                return Err(ExtractError::Configuration(format!("cannot read {:?}: {}", dir, err)));
            }
            Err(err) => {
                warn!("Skipping unreadable directory {:?} : {}", dir, err);
                continue;
            }
        };
        top = false;

        for entry in entries {
            let path = match entry {
                Ok(entry) => entry.path(),
                Err(err) => {
                    warn!("Skipping entry in {:?} : {}", dir, err);
                    continue;
                }
            };
            if path.is_dir() {
                if recursive {
                    pending.push(path);
                }
                continue;
            }
            let matches = path
                .extension()
                .and_then(|e| e.to_str())
                .map(|e| extensions.iter().any(|allowed| allowed.eq_ignore_ascii_case(e)))
                .unwrap_or(false);
            if matches {
                found.push(path);
            }
        }
    }

    found.sort();
    Ok(found)
}

fn lock(table: &SharedTable) -> MutexGuard<'_, TableWriter<BufWriter<File>>> {
    // a task that panicked while holding the lock leaves the writer usable:
    // writes are a single write_all of a fully formatted block
    table.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Runs `job`, turning a panic into a skipped file.
fn guarded(path: &Path, kind: DescriptorKind, job: impl FnOnce() -> Outcome) -> Outcome {
    panic::catch_unwind(AssertUnwindSafe(job)).unwrap_or_else(|_| {
        error!("Extraction of {} ({}) panicked", file_name(path), kind.name());
        Outcome::Skipped
    })
}

fn process_file(path: &Path, kind: DescriptorKind, args: &[f64], table: &SharedTable) -> Outcome {
    let name = file_name(path);
    debug!("Processing file {}", name);

    let extracted = PixelSource::open(path).and_then(|image| {
        let mut extractor = kind.build(args)?;
        let rows = extractor.extract(&image)?;
        if let Some(elapsed) = extractor.elapsed() {
            debug!("{} on {} took {:.3}ms", kind.name(), name, elapsed.as_secs_f64() * 1000.0);
        }
        Ok(rows)
    });

    let rows = match extracted {
        Ok(rows) => rows,
        Err(err) => {
            warn!("Skipping {} ({}) : {}", name, kind.name(), err);
            return Outcome::Skipped;
        }
    };

    match lock(table).write_rows(&name, &rows) {
        Ok(written) => Outcome::Written(written),
        Err(err) => {
            error!("Couldn't write rows of {} ({}) : {}", name, kind.name(), err);
            Outcome::Skipped
        }
    }
}

/**
Run one batch as described by `config`.

Fails before any work with [`ExtractError::Configuration`] when the config is
invalid, and with [`ExtractError::Shutdown`] when the submitted tasks do not
all finish within `config.shutdown_timeout`.
 */
pub fn run_batch(config: &BatchConfig) -> Result<BatchSummary> {
    config.validate()?;
    let start = Instant::now();

    let files = list_images(&config.directory, config.recursive, &config.extensions)?;
    info!(
        "Extracting {} from {} files in {:?}",
        config.descriptor.name(),
        files.len(),
        config.directory
    );

    let labels = if config.labels {
        Some(config.descriptor.build(&config.descriptor_args)?.labels())
    } else {
        None
    };
    let format = TableFormat {
        separator: config.separator.clone(),
        class_label: config.class_label.clone(),
        write_header: !config.omit_header,
        labels,
    };
    let table: SharedTable = Arc::new(Mutex::new(TableWriter::open(&config.output, config.append, format)?));

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(config.threads.unwrap_or(0))
        .thread_name(|i| format!("extractor-{}", i))
        .build()
        .map_err(|err| ExtractError::Configuration(format!("couldn't build the thread pool : {}", err)))?;
    debug!("Worker pool started with {} threads", pool.current_num_threads());

    let (done, finished) = mpsc::channel::<Outcome>();
    for path in &files {
        let path = path.clone();
        let table = Arc::clone(&table);
        let args = config.descriptor_args.clone();
        let kind = config.descriptor;
        let done = done.clone();
        pool.spawn(move || {
            let outcome = guarded(&path, kind, || process_file(&path, kind, &args, &table));
            drop(table);
            // the receiver only goes away after a shutdown timeout
            let _ = done.send(outcome);
        });
    }
    drop(done);

    let mut summary = BatchSummary {
        files: files.len(),
        ..Default::default()
    };
    let deadline = Instant::now() + config.shutdown_timeout;
    for _ in 0..files.len() {
        let remaining = deadline.saturating_duration_since(Instant::now());
        match finished.recv_timeout(remaining) {
            Ok(outcome) => summary.record(outcome),
            Err(mpsc::RecvTimeoutError::Timeout) => {
                return Err(ExtractError::Shutdown(format!(
                    "{} of {} tasks still running after {:?}",
                    summary.pending(),
                    files.len(),
                    config.shutdown_timeout
                )));
            }
            Err(mpsc::RecvTimeoutError::Disconnected) => {
                return Err(ExtractError::Shutdown("worker pool stopped before all tasks reported".to_string()));
            }
        }
    }

    lock(&table).flush()?;
    info!(
        "Wrote {} rows for {} of {} files ({} skipped) to {:?} in {:.3}s",
        summary.rows,
        summary.processed,
        summary.files,
        summary.skipped,
        config.output,
        start.elapsed().as_secs_f64()
    );
    Ok(summary)
}
