//! Batch sizing and batch production.

use std::io;
use std::io::prelude::*;

use log;
use rayon;
use rayon::iter::IntoParallelIterator;
use sysinfo::System;

/// Batch size lower bound applied to memory derived batch sizes.
pub const MIN_BATCH_SIZE: usize = 100_000;

/// Number of records constituting one in-memory batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchSize(usize);

impl BatchSize {
    /// Creates an explicit batch size. The value is used as-is, without the [`MIN_BATCH_SIZE`] floor.
    /// Returns [`None`] if the size is zero.
    pub fn new(size: usize) -> Option<Self> {
        (size > 0).then(|| BatchSize(size))
    }

    /// Derives a batch size from the amount of available memory.
    ///
    /// Roughly one thousandth of available memory bytes is taken as a record count budget. The result is
    /// never less than [`MIN_BATCH_SIZE`].
    pub fn from_available_memory(available_memory_bytes: u64) -> Self {
        let derived = usize::try_from(available_memory_bytes / 10 / 100).unwrap_or(usize::MAX);
        BatchSize(derived.max(MIN_BATCH_SIZE))
    }

    /// Queries the system available memory and derives a batch size from it.
    pub fn detect() -> Self {
        let mut system = System::new();
        system.refresh_memory();
        let available_memory = system.available_memory();

        let batch_size = Self::from_available_memory(available_memory);
        log::info!(
            "available memory: {} bytes, batch size: {} records",
            available_memory,
            batch_size.get()
        );

        return batch_size;
    }

    pub fn get(&self) -> usize {
        self.0
    }
}

/// Lines batch.
pub struct Batch {
    /// Batch sequence number within the input.
    seq: usize,
    lines: Vec<String>,
}

impl Batch {
    pub fn new(seq: usize, lines: Vec<String>) -> Self {
        Batch { seq, lines }
    }

    pub fn seq(&self) -> usize {
        self.seq
    }

    /// Returns batch length
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

impl IntoIterator for Batch {
    type Item = String;
    type IntoIter = <Vec<String> as IntoIterator>::IntoIter;

    fn into_iter(self) -> Self::IntoIter {
        self.lines.into_iter()
    }
}

impl IntoParallelIterator for Batch {
    type Item = String;
    type Iter = rayon::vec::IntoIter<String>;

    fn into_par_iter(self) -> Self::Iter {
        self.lines.into_par_iter()
    }
}

/// Batch producer.
/// Reads the input line by line and groups lines into batches of up to `batch_size` lines.
/// The last batch may be shorter. Only the batch being filled is held in memory.
pub struct BatchProducer<R: BufRead> {
    lines: io::Lines<R>,
    batch_size: BatchSize,
    next_seq: usize,
    done: bool,
}

impl<R: BufRead> BatchProducer<R> {
    pub fn new(reader: R, batch_size: BatchSize) -> Self {
        BatchProducer {
            lines: reader.lines(),
            batch_size,
            next_seq: 0,
            done: false,
        }
    }
}

impl<R: BufRead> Iterator for BatchProducer<R> {
    type Item = io::Result<Batch>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let mut lines = Vec::with_capacity(self.batch_size.get().min(MIN_BATCH_SIZE));
        while lines.len() < self.batch_size.get() {
            match self.lines.next() {
                Some(Ok(line)) => lines.push(line),
                Some(Err(err)) => {
                    self.done = true;
                    return Some(Err(err));
                }
                None => {
                    self.done = true;
                    break;
                }
            }
        }

        if lines.is_empty() {
            return None;
        }

        let batch = Batch::new(self.next_seq, lines);
        self.next_seq += 1;

        return Some(Ok(batch));
    }
}

/// Partitions the input into sequential batches.
pub fn produce_batches<R: BufRead>(reader: R, batch_size: BatchSize) -> BatchProducer<R> {
    BatchProducer::new(reader, batch_size)
}
