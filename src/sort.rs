//! Large file sorter.

use log;
use std::error::Error;
use std::fmt;
use std::fmt::Display;
use std::fs;
use std::io;
use std::io::prelude::*;
use std::path::Path;
use std::sync::Arc;

use rayon::prelude::*;

use crate::batch::{BatchProducer, BatchSize};
use crate::cancel::CancellationToken;
use crate::merger::merge_sorted_files;
use crate::record::RecordError;
use crate::spill::{sort_and_spill, SpillFile};
use crate::time::{LogTimeTracker, TimeTracker};

/// Operation name reported to the time tracker.
const OPERATION_NAME: &str = "File Sorting";

/// Sorting error.
#[derive(Debug)]
pub enum SortError {
    /// Temporary directory or file creation error.
    TempDir(io::Error),
    /// Workers thread pool initialization error.
    ThreadPoolBuildError(rayon::ThreadPoolBuildError),
    /// Common I/O error.
    IO(io::Error),
    /// Input or spill file line is not a valid record.
    MalformedRecord(RecordError),
    /// Configured batch size is not usable.
    InvalidBatchSize(usize),
    /// Sorting was cancelled by the caller.
    Cancelled,
}

impl Error for SortError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match &self {
            SortError::TempDir(err) => Some(err),
            SortError::ThreadPoolBuildError(err) => Some(err),
            SortError::IO(err) => Some(err),
            SortError::MalformedRecord(err) => Some(err),
            SortError::InvalidBatchSize(_) | SortError::Cancelled => None,
        }
    }
}

impl Display for SortError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self {
            SortError::TempDir(err) => write!(f, "temporary directory or file not created: {}", err),
            SortError::ThreadPoolBuildError(err) => write!(f, "thread pool initialization failed: {}", err),
            SortError::IO(err) => write!(f, "I/O operation failed: {}", err),
            SortError::MalformedRecord(err) => write!(f, "malformed record: {}", err),
            SortError::InvalidBatchSize(size) => write!(f, "invalid batch size: {}", size),
            SortError::Cancelled => write!(f, "sorting cancelled"),
        }
    }
}

impl From<io::Error> for SortError {
    fn from(err: io::Error) -> Self {
        SortError::IO(err)
    }
}

impl From<RecordError> for SortError {
    fn from(err: RecordError) -> Self {
        SortError::MalformedRecord(err)
    }
}

/// File sorter builder. Provides methods for [`FileSorter`] initialization.
#[derive(Clone, Default)]
pub struct FileSorterBuilder {
    /// Number of threads to be used to sort data in parallel.
    threads_number: Option<usize>,
    /// Number of records in one batch.
    batch_size: Option<usize>,
    /// Input, output and spill file read/write buffer size.
    rw_buf_size: Option<usize>,
    /// Caller cancellation token.
    cancellation: Option<CancellationToken>,
    /// Sort duration tracker.
    time_tracker: Option<Arc<dyn TimeTracker>>,
}

impl FileSorterBuilder {
    /// Creates an instance of a builder with default parameters.
    pub fn new() -> Self {
        FileSorterBuilder::default()
    }

    /// Builds a [`FileSorter`] instance using provided configuration.
    pub fn build(self) -> Result<FileSorter, SortError> {
        let batch_size = match self.batch_size {
            Some(batch_size) => BatchSize::new(batch_size).ok_or(SortError::InvalidBatchSize(batch_size))?,
            None => BatchSize::detect(),
        };

        FileSorter::new(
            self.threads_number,
            batch_size,
            self.rw_buf_size,
            self.cancellation.unwrap_or_default(),
            self.time_tracker.unwrap_or_else(|| Arc::new(LogTimeTracker::new())),
        )
    }

    /// Sets number of threads to be used to sort data in parallel.
    pub fn with_threads_number(mut self, threads_number: usize) -> FileSorterBuilder {
        self.threads_number = Some(threads_number);
        return self;
    }

    /// Sets the number of records sorted together in memory.
    /// The value is used as-is, it is not derived from available memory.
    pub fn with_batch_size(mut self, batch_size: usize) -> FileSorterBuilder {
        self.batch_size = Some(batch_size);
        return self;
    }

    /// Sets file read/write buffer size.
    pub fn with_rw_buf_size(mut self, buf_size: usize) -> FileSorterBuilder {
        self.rw_buf_size = Some(buf_size);
        return self;
    }

    /// Sets cancellation token.
    pub fn with_cancellation_token(mut self, cancellation: CancellationToken) -> FileSorterBuilder {
        self.cancellation = Some(cancellation);
        return self;
    }

    /// Sets time tracker.
    pub fn with_time_tracker(mut self, time_tracker: Arc<dyn TimeTracker>) -> FileSorterBuilder {
        self.time_tracker = Some(time_tracker);
        return self;
    }
}

/// Large file sorter.
///
/// Splits the input file into batches, sorts batches in parallel, spills them into a temporary directory
/// and merges the spill files into the output file.
pub struct FileSorter {
    /// Sorting thread pool.
    thread_pool: rayon::ThreadPool,
    /// Number of records in one batch.
    batch_size: BatchSize,
    /// Input, output and spill file read/write buffer size.
    rw_buf_size: Option<usize>,
    /// Caller cancellation token.
    cancellation: CancellationToken,
    /// Sort duration tracker.
    time_tracker: Arc<dyn TimeTracker>,
}

impl FileSorter {
    /// Creates a new file sorter instance.
    ///
    /// # Arguments
    /// * `threads_number` - Number of threads to be used to sort data in parallel. If the parameter is [`None`]
    ///   threads number will be selected based on available CPU core number.
    /// * `batch_size` - Number of records sorted together in memory.
    /// * `rw_buf_size` - Input, output and spill file read/write buffer size.
    /// * `cancellation` - Token the sorter checks at batch boundaries and merge steps.
    /// * `time_tracker` - Tracker the whole sort operation is reported to.
    pub fn new(
        threads_number: Option<usize>,
        batch_size: BatchSize,
        rw_buf_size: Option<usize>,
        cancellation: CancellationToken,
        time_tracker: Arc<dyn TimeTracker>,
    ) -> Result<Self, SortError> {
        log::info!("using batch size of {} records", batch_size.get());

        return Ok(FileSorter {
            thread_pool: Self::init_thread_pool(threads_number)?,
            batch_size,
            rw_buf_size,
            cancellation,
            time_tracker,
        });
    }

    fn init_thread_pool(threads_number: Option<usize>) -> Result<rayon::ThreadPool, SortError> {
        let mut thread_pool_builder = rayon::ThreadPoolBuilder::new();

        if let Some(threads_number) = threads_number {
            log::info!("initializing thread-pool (threads: {})", threads_number);
            thread_pool_builder = thread_pool_builder.num_threads(threads_number);
        } else {
            log::info!("initializing thread-pool (threads: default)");
        }
        let thread_pool = thread_pool_builder
            .build()
            .map_err(|err| SortError::ThreadPoolBuildError(err))?;

        return Ok(thread_pool);
    }

    fn init_tmp_directory(tmp_dir: &Path) -> Result<(), SortError> {
        fs::create_dir_all(tmp_dir).map_err(|err| SortError::TempDir(err))?;

        log::info!("using {} as a temporary directory", tmp_dir.display());

        return Ok(());
    }

    pub fn batch_size(&self) -> BatchSize {
        self.batch_size
    }

    /// Sorts the input file into the output file.
    ///
    /// The temporary directory is created if it doesn't exist. Spill files are left in it once the call
    /// returns, successfully or not; removing them is up to the caller. If the call fails the output file
    /// content is undefined.
    ///
    /// # Arguments
    /// * `input` - File to be sorted
    /// * `output` - File the sorted records are written to
    /// * `tmp_dir` - Directory to be used to store spill files
    pub fn sort_large_file(&self, input: &Path, output: &Path, tmp_dir: &Path) -> Result<(), SortError> {
        self.time_tracker.start();
        log::info!("sorting {} into {} ...", input.display(), output.display());

        Self::init_tmp_directory(tmp_dir)?;
        let spill_files = self.split_and_sort_batches(input, tmp_dir)?;
        log::debug!("external sort preparation done ({} spill files)", spill_files.len());

        let written = self.merge_batches(&spill_files, output)?;
        log::info!("sorting done ({} records)", written);

        self.time_tracker.stop(OPERATION_NAME);

        return Ok(());
    }

    fn split_and_sort_batches(&self, input: &Path, tmp_dir: &Path) -> Result<Vec<SpillFile>, SortError> {
        let input_file = fs::File::open(input)?;
        let reader = match self.rw_buf_size {
            Some(buf_size) => io::BufReader::with_capacity(buf_size, input_file),
            None => io::BufReader::new(input_file),
        };

        let batches = BatchProducer::new(reader, self.batch_size);
        let mut spill_files = self.thread_pool.install(|| {
            batches
                .par_bridge()
                .map(|batch| -> Result<(usize, SpillFile), SortError> {
                    let batch = batch?;
                    if self.cancellation.is_cancelled() {
                        log::warn!("sorting cancelled before batch {}", batch.seq());
                        return Err(SortError::Cancelled);
                    }

                    let seq = batch.seq();
                    let spill_file = sort_and_spill(batch, tmp_dir, self.rw_buf_size)?;

                    return Ok((seq, spill_file));
                })
                .collect::<Result<Vec<_>, SortError>>()
        })?;

        // merge sources follow the input order
        spill_files.sort_unstable_by_key(|(seq, _)| *seq);

        return Ok(spill_files.into_iter().map(|(_, spill_file)| spill_file).collect());
    }

    fn merge_batches(&self, spill_files: &[SpillFile], output: &Path) -> Result<u64, SortError> {
        if self.cancellation.is_cancelled() {
            return Err(SortError::Cancelled);
        }

        let output_file = fs::File::create(output)?;
        let mut writer = match self.rw_buf_size {
            Some(buf_size) => io::BufWriter::with_capacity(buf_size, output_file),
            None => io::BufWriter::new(output_file),
        };

        let written = merge_sorted_files(spill_files, &mut writer, self.rw_buf_size, &self.cancellation)?;
        writer.flush()?;

        return Ok(written);
    }
}

/// Sorts the input file into the output file using the default sorter configuration.
/// See [`FileSorter::sort_large_file`].
pub fn sort_large_file(input: &Path, output: &Path, tmp_dir: &Path) -> Result<(), SortError> {
    FileSorterBuilder::new().build()?.sort_large_file(input, output, tmp_dir)
}

#[cfg(test)]
mod test {
    use std::fs;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use rand::seq::SliceRandom;
    use rstest::*;

    use super::{FileSorter, FileSorterBuilder, SortError};
    use crate::cancel::CancellationToken;
    use crate::time::TimeTracker;

    #[fixture]
    fn tmp_dir() -> tempfile::TempDir {
        tempfile::tempdir_in("./").unwrap()
    }

    fn build_sorter(batch_size: usize) -> FileSorter {
        FileSorterBuilder::new()
            .with_batch_size(batch_size)
            .with_threads_number(2)
            .build()
            .unwrap()
    }

    #[rstest]
    #[case(1)]
    #[case(8)]
    #[case(1000)]
    fn test_file_sorter(tmp_dir: tempfile::TempDir, #[case] batch_size: usize) {
        let texts = ["apple", "banana", "cherry", "Date", "apple pie. with cream"];
        let input_sorted: Vec<String> = texts
            .iter()
            .copied()
            .collect::<std::collections::BTreeSet<_>>()
            .into_iter()
            .flat_map(|text| (1..20).map(move |number| format!("{}. {}", number, text)))
            .collect();

        let mut input_shuffled = input_sorted.clone();
        input_shuffled.shuffle(&mut rand::thread_rng());

        let input = tmp_dir.path().join("input.txt");
        let output = tmp_dir.path().join("output.txt");
        fs::write(&input, input_shuffled.join("\n") + "\n").unwrap();

        build_sorter(batch_size)
            .sort_large_file(&input, &output, &tmp_dir.path().join("batches"))
            .unwrap();

        let actual_result: Vec<String> = fs::read_to_string(&output)
            .unwrap()
            .lines()
            .map(String::from)
            .collect();

        assert_eq!(actual_result, input_sorted);
    }

    #[rstest]
    fn test_file_sorter_scenario(tmp_dir: tempfile::TempDir) {
        let input = tmp_dir.path().join("input.txt");
        let output = tmp_dir.path().join("output.txt");
        fs::write(&input, "42. banana\n7. apple\n100. apple\n").unwrap();

        build_sorter(2)
            .sort_large_file(&input, &output, &tmp_dir.path().join("batches"))
            .unwrap();

        assert_eq!(fs::read_to_string(&output).unwrap(), "7. apple\n100. apple\n42. banana\n");
    }

    #[rstest]
    fn test_file_sorter_keeps_spill_files(tmp_dir: tempfile::TempDir) {
        let input = tmp_dir.path().join("input.txt");
        let output = tmp_dir.path().join("output.txt");
        let batches = tmp_dir.path().join("nested").join("batches");
        let lines: Vec<String> = (0..10).map(|i| format!("{}. text", i)).collect();
        fs::write(&input, lines.join("\n")).unwrap();

        build_sorter(3).sort_large_file(&input, &output, &batches).unwrap();

        assert_eq!(fs::read_dir(&batches).unwrap().count(), 4);
        assert_eq!(fs::read_to_string(&output).unwrap(), lines.join("\n") + "\n");
    }

    #[rstest]
    fn test_file_sorter_empty_input(tmp_dir: tempfile::TempDir) {
        let input = tmp_dir.path().join("input.txt");
        let output = tmp_dir.path().join("output.txt");
        fs::write(&input, "").unwrap();

        build_sorter(10)
            .sort_large_file(&input, &output, &tmp_dir.path().join("batches"))
            .unwrap();

        assert_eq!(fs::read_to_string(&output).unwrap(), "");
    }

    #[rstest]
    fn test_file_sorter_tmp_dir_is_file(tmp_dir: tempfile::TempDir) {
        let input = tmp_dir.path().join("input.txt");
        let not_a_dir = tmp_dir.path().join("batches");
        fs::write(&input, "1. a\n").unwrap();
        fs::write(&not_a_dir, "").unwrap();

        let result = build_sorter(10).sort_large_file(&input, &tmp_dir.path().join("output.txt"), &not_a_dir);
        assert!(matches!(result, Err(SortError::TempDir(_))));
    }

    #[rstest]
    fn test_file_sorter_missing_input(tmp_dir: tempfile::TempDir) {
        let result = build_sorter(10).sort_large_file(
            &tmp_dir.path().join("missing.txt"),
            &tmp_dir.path().join("output.txt"),
            &tmp_dir.path().join("batches"),
        );
        assert!(matches!(result, Err(SortError::IO(_))));
    }

    #[rstest]
    fn test_file_sorter_cancelled(tmp_dir: tempfile::TempDir) {
        let input = tmp_dir.path().join("input.txt");
        fs::write(&input, "2. b\n1. a\n").unwrap();

        let cancellation = CancellationToken::new();
        let sorter = FileSorterBuilder::new()
            .with_batch_size(1)
            .with_cancellation_token(cancellation.clone())
            .build()
            .unwrap();
        cancellation.cancel();

        let result = sorter.sort_large_file(&input, &tmp_dir.path().join("output.txt"), &tmp_dir.path().join("batches"));
        assert!(matches!(result, Err(SortError::Cancelled)));
    }

    #[test]
    fn test_invalid_batch_size() {
        let result = FileSorterBuilder::new().with_batch_size(0).build();
        assert!(matches!(result, Err(SortError::InvalidBatchSize(0))));
    }

    #[derive(Default)]
    struct CountingTimeTracker {
        started: AtomicUsize,
        stopped: AtomicUsize,
    }

    impl TimeTracker for CountingTimeTracker {
        fn start(&self) {
            self.started.fetch_add(1, Ordering::SeqCst);
        }

        fn stop(&self, operation_name: &str) {
            assert_eq!(operation_name, "File Sorting");
            self.stopped.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[rstest]
    fn test_file_sorter_time_tracker(tmp_dir: tempfile::TempDir) {
        let input = tmp_dir.path().join("input.txt");
        fs::write(&input, "1. a\n").unwrap();

        let tracker = Arc::new(CountingTimeTracker::default());
        let sorter = FileSorterBuilder::new()
            .with_batch_size(10)
            .with_time_tracker(tracker.clone())
            .build()
            .unwrap();

        sorter
            .sort_large_file(&input, &tmp_dir.path().join("output.txt"), &tmp_dir.path().join("batches"))
            .unwrap();

        assert_eq!(tracker.started.load(Ordering::SeqCst), 1);
        assert_eq!(tracker.stopped.load(Ordering::SeqCst), 1);
    }
}
