//! `record-sort` sorts text files too large to fit in memory.
//!
//! Every input line is a record of the form `<number>. <text>`. Records are ordered by their text first
//! (byte-wise comparison) and by their number second, so `7. apple` goes before `100. apple`, and both go
//! before `42. banana`.
//!
//! Sorting is done by the external merge sort algorithm. The input is split into batches of records,
//! each batch is sorted in memory and spilled into a temporary file, then all the spill files are merged
//! into the output with a k-way merge. For more information see
//! [External Sorting](https://en.wikipedia.org/wiki/External_sorting).
//!
//! # Overview
//!
//! * **Memory aware batches:**
//!   batch size is derived from the amount of available memory, but can be set explicitly.
//! * **Multithreading support:**
//!   batches are sorted in parallel, each one by a parallel sort, utilizing all CPU cores.
//! * **Streaming merge:**
//!   the merge phase keeps only one pending record per spill file in memory.
//!
//! Spill files are left in the temporary directory once sorting is done; removing them is up to the caller.
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//!
//! use env_logger;
//! use log;
//!
//! use record_sort::FileSorterBuilder;
//!
//! fn main() {
//!     env_logger::Builder::new().filter_level(log::LevelFilter::Debug).init();
//!
//!     let sorter = FileSorterBuilder::new()
//!         .with_threads_number(4)
//!         .with_batch_size(1_000_000)
//!         .build()
//!         .unwrap();
//!
//!     sorter
//!         .sort_large_file(Path::new("input.txt"), Path::new("output.txt"), Path::new("./temp_batches"))
//!         .unwrap();
//! }
//! ```

pub mod batch;
pub mod cancel;
pub mod merger;
pub mod record;
pub mod sort;
pub mod spill;
pub mod time;

pub use batch::{produce_batches, Batch, BatchProducer, BatchSize, MIN_BATCH_SIZE};
pub use cancel::CancellationToken;
pub use merger::{merge_sorted_files, BinaryHeapMerger};
pub use record::{compare_lines, KeyedLine, Record, RecordError};
pub use sort::{sort_large_file, FileSorter, FileSorterBuilder, SortError};
pub use spill::{sort_and_spill, SpillFile, SpillReader};
pub use time::{LogTimeTracker, NoopTimeTracker, TimeTracker};
