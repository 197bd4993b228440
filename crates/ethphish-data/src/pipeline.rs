//! Batched input pipeline over record files
//!
//! The pipeline reads one or more record files, optionally repeats and
//! shuffles them (training), decodes records on a fixed pool of worker
//! threads and yields batches. It is an iterator of `Result<Batch>`:
//! `None` means the data is exhausted, `Some(Err(_))` is a real failure.

use crate::decoder::decode_record;
use crate::schema::RecordSchema;
use ethphish_core::{Batch, Error, Record, Result};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use std::fs::File;
use std::io::{BufRead, BufReader, Lines};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// Path of a run-specific input file: `<template>.<suffix>`
pub fn suffixed_path(template: impl AsRef<Path>, suffix: &str) -> PathBuf {
    let mut path = template.as_ref().as_os_str().to_owned();
    path.push(".");
    path.push(suffix);
    PathBuf::from(path)
}

/// Options controlling how records are read and batched
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    /// Repeat and shuffle the input
    pub is_training: bool,

    /// Number of passes over the input when training
    pub epochs: usize,

    /// Shuffle buffer capacity when training (0 disables shuffling)
    pub shuffle_buffer: usize,

    /// Records per batch; the last batch may be smaller
    pub batch_size: usize,

    /// Decode worker threads
    pub num_workers: usize,

    /// Seed of the shuffle RNG
    pub seed: u64,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            is_training: false,
            epochs: 1,
            shuffle_buffer: 100,
            batch_size: 256,
            num_workers: 4,
            seed: 12345,
        }
    }
}

impl PipelineOptions {
    /// Options for a training pass
    pub fn training(epochs: usize, batch_size: usize) -> Self {
        Self {
            is_training: true,
            epochs,
            batch_size,
            ..Default::default()
        }
    }

    /// Options for a single, ordered evaluation pass
    pub fn evaluation(batch_size: usize) -> Self {
        Self {
            is_training: false,
            epochs: 1,
            batch_size,
            ..Default::default()
        }
    }

    pub fn with_workers(mut self, num_workers: usize) -> Self {
        self.num_workers = num_workers;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_shuffle_buffer(mut self, shuffle_buffer: usize) -> Self {
        self.shuffle_buffer = shuffle_buffer;
        self
    }
}

/// An undecoded record and where it came from
#[derive(Debug, Clone)]
struct RawRecord {
    source: Arc<PathBuf>,
    line_no: usize,
    text: String,
}

/// Non-blank lines of the input files, repeated `passes` times
struct LineSource {
    files: Vec<Arc<PathBuf>>,
    passes_left: usize,
    file_idx: usize,
    current: Option<(Arc<PathBuf>, Lines<BufReader<File>>, usize)>,
}

impl LineSource {
    fn new(files: Vec<PathBuf>, passes: usize) -> Self {
        Self {
            files: files.into_iter().map(Arc::new).collect(),
            passes_left: passes,
            file_idx: 0,
            current: None,
        }
    }

    fn next_line(&mut self) -> Option<Result<RawRecord>> {
        loop {
            if let Some((source, lines, line_no)) = self.current.as_mut() {
                match lines.next() {
                    Some(Ok(text)) => {
                        *line_no += 1;
                        if text.trim().is_empty() {
                            continue;
                        }
                        return Some(Ok(RawRecord {
                            source: Arc::clone(source),
                            line_no: *line_no,
                            text,
                        }));
                    }
                    Some(Err(e)) => {
                        let msg = format!("failed to read {}: {}", source.display(), e);
                        return Some(Err(Error::data(msg)));
                    }
                    None => self.current = None,
                }
            }

            if self.file_idx >= self.files.len() {
                if self.passes_left <= 1 || self.files.is_empty() {
                    self.passes_left = 0;
                    return None;
                }
                self.passes_left -= 1;
                self.file_idx = 0;
                debug!("Starting next pass, {} remaining", self.passes_left);
            }

            if self.passes_left == 0 {
                return None;
            }

            let path = Arc::clone(&self.files[self.file_idx]);
            self.file_idx += 1;

            debug!("Opening record file {}", path.display());
            let file = match File::open(path.as_ref()) {
                Ok(file) => file,
                Err(e) => {
                    let msg = format!("failed to open {}: {}", path.display(), e);
                    return Some(Err(Error::data(msg)));
                }
            };
            self.current = Some((path, BufReader::new(file).lines(), 0));
        }
    }
}

/// Iterator of decoded batches over record files
pub struct InputPipeline {
    schema: Arc<RecordSchema>,
    options: PipelineOptions,
    lines: LineSource,
    shuffle: Vec<RawRecord>,
    source_done: bool,
    rng: StdRng,
    pool: ThreadPool,
    finished: bool,
}

impl InputPipeline {
    /// Create a pipeline over the given files
    pub fn open(files: Vec<PathBuf>, schema: RecordSchema, options: PipelineOptions) -> Result<Self> {
        if options.batch_size == 0 {
            return Err(Error::config("batch_size must be at least 1"));
        }
        if options.num_workers == 0 {
            return Err(Error::config("num_workers must be at least 1"));
        }

        let passes = if options.is_training { options.epochs } else { 1 };
        let rng = StdRng::seed_from_u64(options.seed);
        let pool = ThreadPoolBuilder::new()
            .num_threads(options.num_workers)
            .thread_name(|i| format!("ethphish-decode-{}", i))
            .build()
            .map_err(|e| Error::data(format!("failed to start decode workers: {}", e)))?;

        Ok(Self {
            schema: Arc::new(schema),
            lines: LineSource::new(files, passes),
            shuffle: Vec::with_capacity(options.shuffle_buffer),
            source_done: false,
            rng,
            pool,
            finished: false,
            options,
        })
    }

    fn shuffling(&self) -> bool {
        self.options.is_training && self.options.shuffle_buffer > 0
    }

    fn next_raw(&mut self) -> Option<Result<RawRecord>> {
        if !self.shuffling() {
            return self.lines.next_line();
        }

        while self.shuffle.len() < self.options.shuffle_buffer && !self.source_done {
            match self.lines.next_line() {
                Some(Ok(raw)) => self.shuffle.push(raw),
                Some(Err(e)) => return Some(Err(e)),
                None => self.source_done = true,
            }
        }

        if self.shuffle.is_empty() {
            return None;
        }

        let idx = self.rng.gen_range(0..self.shuffle.len());
        Some(Ok(self.shuffle.swap_remove(idx)))
    }

    fn next_batch(&mut self) -> Option<Result<Batch>> {
        let mut raw = Vec::with_capacity(self.options.batch_size);
        while raw.len() < self.options.batch_size {
            match self.next_raw() {
                Some(Ok(record)) => raw.push(record),
                Some(Err(e)) => return Some(Err(e)),
                None => break,
            }
        }

        if raw.is_empty() {
            return None;
        }

        let schema = self.schema.as_ref();
        let decoded = self.pool.install(|| {
            raw.par_iter()
                .map(|r| decode_raw(r, schema))
                .collect::<Result<Vec<Record>>>()
        });
        Some(decoded.map(Batch::new))
    }
}

impl Iterator for InputPipeline {
    type Item = Result<Batch>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        let item = self.next_batch();
        if !matches!(item, Some(Ok(_))) {
            self.finished = true;
        }
        item
    }
}

fn decode_raw(raw: &RawRecord, schema: &RecordSchema) -> Result<Record> {
    decode_record(&raw.text, schema)
        .map_err(|e| Error::decode(format!("{}:{}: {}", raw.source.display(), raw.line_no, e)))
}
