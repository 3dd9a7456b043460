//! Binary heap merger.

use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::error::Error;
use std::io::prelude::*;

use log;

use crate::cancel::CancellationToken;
use crate::record::KeyedLine;
use crate::sort::SortError;
use crate::spill::SpillFile;

/// Binary heap merger implementation.
/// Merges multiple sorted inputs into a single sorted output.
/// Time complexity is *m* \* log(*n*) in worst case where *m* is the number of items,
/// *n* is the number of chunks (inputs).
///
/// The heap holds exactly one pending item per non-exhausted input. Items comparing equal are emitted in
/// input order. The first input error is returned and the merger yields nothing after it.
pub struct BinaryHeapMerger<T, E, C>
where
    T: Ord,
    E: Error,
    C: IntoIterator<Item = Result<T, E>>,
{
    // binary heap is max-heap by default so we reverse it to convert it to min-heap
    items: BinaryHeap<Reverse<(T, usize)>>,
    chunks: Vec<C::IntoIter>,
    initiated: bool,
    failed: bool,
}

impl<T, E, C> BinaryHeapMerger<T, E, C>
where
    T: Ord,
    E: Error,
    C: IntoIterator<Item = Result<T, E>>,
{
    /// Creates an instance of a binary heap merger using chunks as inputs.
    /// Chunk items should be sorted in ascending order otherwise the result is undefined.
    ///
    /// # Arguments
    /// * `chunks` - Chunks to be merged in a single sorted one
    pub fn new<I>(chunks: I) -> Self
    where
        I: IntoIterator<Item = C>,
    {
        let chunks = Vec::from_iter(chunks.into_iter().map(|c| c.into_iter()));
        let items = BinaryHeap::with_capacity(chunks.len());

        return BinaryHeapMerger {
            chunks,
            items,
            initiated: false,
            failed: false,
        };
    }

    fn fail(&mut self, err: E) -> Option<Result<T, E>> {
        self.failed = true;
        self.items.clear();
        return Some(Err(err));
    }
}

impl<T, E, C> Iterator for BinaryHeapMerger<T, E, C>
where
    T: Ord,
    E: Error,
    C: IntoIterator<Item = Result<T, E>>,
{
    type Item = Result<T, E>;

    /// Returns the next item from the inputs in ascending order.
    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }

        if !self.initiated {
            self.initiated = true;
            for idx in 0..self.chunks.len() {
                if let Some(item) = self.chunks[idx].next() {
                    match item {
                        Ok(item) => self.items.push(Reverse((item, idx))),
                        Err(err) => return self.fail(err),
                    }
                }
            }
        }

        let Reverse((result, idx)) = self.items.pop()?;
        if let Some(item) = self.chunks[idx].next() {
            match item {
                Ok(item) => self.items.push(Reverse((item, idx))),
                Err(err) => return self.fail(err),
            }
        }

        return Some(Ok(result));
    }
}

/// Merges sorted spill files into `output`, one line per record.
/// Returns the number of written lines.
///
/// All spill readers are closed when the function returns, whatever the outcome.
///
/// # Arguments
/// * `spill_files` - Sorted spill files to be merged
/// * `output` - Output stream the merged lines are written to
/// * `buf_size` - Spill files read buffer size
/// * `cancellation` - Token checked before every emitted line
pub fn merge_sorted_files<W: Write>(
    spill_files: &[SpillFile],
    output: &mut W,
    buf_size: Option<usize>,
    cancellation: &CancellationToken,
) -> Result<u64, SortError> {
    let readers = spill_files
        .iter()
        .map(|spill| spill.open(buf_size))
        .collect::<Result<Vec<_>, _>>()?;

    log::debug!("merging {} spill files ...", readers.len());

    let mut written: u64 = 0;
    for line in BinaryHeapMerger::new(readers) {
        if cancellation.is_cancelled() {
            return Err(SortError::Cancelled);
        }

        let line: KeyedLine = line?;
        output.write_all(line.line().as_bytes())?;
        output.write_all(b"\n")?;
        written += 1;
    }

    log::debug!("merged {} lines", written);

    return Ok(written);
}
