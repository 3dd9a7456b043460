//! Sorted batch spill files.

use std::fs;
use std::io;
use std::io::prelude::*;
use std::path::{Path, PathBuf};

use log;
use rayon::prelude::*;
use tempfile;

use crate::batch::Batch;
use crate::record::KeyedLine;
use crate::sort::SortError;

/// Spill file name prefix.
const SPILL_PREFIX: &str = "batch_";
/// Spill file name suffix.
const SPILL_SUFFIX: &str = ".txt";

/// A file holding one sorted batch, one record per line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpillFile {
    path: PathBuf,
    lines: usize,
}

impl SpillFile {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the number of lines written to the file.
    pub fn lines(&self) -> usize {
        self.lines
    }

    /// Opens the spill file for sequential reading.
    pub fn open(&self, buf_size: Option<usize>) -> Result<SpillReader, SortError> {
        SpillReader::open(&self.path, buf_size)
    }
}

/// Sorts batch lines and writes them to a new uniquely named file in `dir`.
///
/// The batch is sorted by the record sort key using the current rayon thread pool. Spill files are not
/// removed once written, their lifecycle belongs to the caller.
///
/// # Arguments
/// * `batch` - Batch to be sorted
/// * `dir` - Directory the spill file is created in
/// * `buf_size` - Spill file write buffer size
pub fn sort_and_spill(batch: Batch, dir: &Path, buf_size: Option<usize>) -> Result<SpillFile, SortError> {
    let seq = batch.seq();

    let mut lines = batch
        .into_par_iter()
        .map(KeyedLine::parse)
        .collect::<Result<Vec<KeyedLine>, _>>()?;

    log::debug!("sorting batch {} ({} lines) ...", seq, lines.len());
    lines.par_sort_unstable();

    let (file, path) = tempfile::Builder::new()
        .prefix(SPILL_PREFIX)
        .suffix(SPILL_SUFFIX)
        .tempfile_in(dir)
        .and_then(|file| file.keep().map_err(|err| err.error))
        .map_err(SortError::TempDir)?;

    let mut writer = match buf_size {
        Some(buf_size) => io::BufWriter::with_capacity(buf_size, file),
        None => io::BufWriter::new(file),
    };
    dump(&mut writer, &lines)?;
    writer.flush()?;

    log::debug!("batch {} saved to {}", seq, path.display());

    return Ok(SpillFile {
        path,
        lines: lines.len(),
    });
}

fn dump(writer: &mut impl Write, lines: &[KeyedLine]) -> io::Result<()> {
    for line in lines {
        writer.write_all(line.line().as_bytes())?;
        writer.write_all(b"\n")?;
    }

    return Ok(());
}

/// Sequential spill file reader.
/// Yields spill file lines together with their parsed sort keys.
pub struct SpillReader {
    lines: io::Lines<io::BufReader<fs::File>>,
}

impl SpillReader {
    pub fn open(path: &Path, buf_size: Option<usize>) -> Result<Self, SortError> {
        let file = fs::File::open(path)?;
        let reader = match buf_size {
            Some(buf_size) => io::BufReader::with_capacity(buf_size, file),
            None => io::BufReader::new(file),
        };

        return Ok(SpillReader { lines: reader.lines() });
    }
}

impl Iterator for SpillReader {
    type Item = Result<KeyedLine, SortError>;

    fn next(&mut self) -> Option<Self::Item> {
        let line = match self.lines.next()? {
            Ok(line) => line,
            Err(err) => return Some(Err(SortError::IO(err))),
        };

        Some(KeyedLine::parse(line).map_err(SortError::MalformedRecord))
    }
}
