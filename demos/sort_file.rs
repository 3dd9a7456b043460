use std::env;
use std::path::PathBuf;
use std::process;

use env_logger;
use log;

use record_sort::FileSorterBuilder;

const DEFAULT_OUTPUT: &str = "sorted_output.txt";
const DEFAULT_TMP_DIR: &str = "temp_batches";

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let mut args = env::args_os().skip(1);
    let input = match args.next() {
        Some(input) => PathBuf::from(input),
        None => {
            log::error!("usage: sort_file <input> [output] [tmp_dir]");
            process::exit(1);
        }
    };
    let output = args.next().map(PathBuf::from).unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT));
    let tmp_dir = args.next().map(PathBuf::from).unwrap_or_else(|| PathBuf::from(DEFAULT_TMP_DIR));

    let sorter = match FileSorterBuilder::new().build() {
        Ok(sorter) => sorter,
        Err(err) => {
            log::error!("sorter initialization error: {}", err);
            process::exit(1);
        }
    };

    if let Err(err) = sorter.sort_large_file(&input, &output, &tmp_dir) {
        log::error!("data sorting error: {}", err);
        process::exit(1);
    }
}
