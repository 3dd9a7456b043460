use std::fs;
use std::io::{self, BufRead, BufReader, Write};
use std::path::Path;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const SAMPLE_STRINGS: [&str; 8] = [
    "Apple",
    "Banana is yellow",
    "Cherry is the best",
    "Something something something",
    "apple",
    "dots. in. the. text",
    "Zebra",
    "",
];

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Writes `lines` random records to `path`. The same seed gives the same file.
#[allow(dead_code)]
pub fn generate_file(path: &Path, lines: usize, seed: u64) -> io::Result<()> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut writer = io::BufWriter::new(fs::File::create(path)?);

    for _ in 0..lines {
        let number = rng.gen_range(1..100_000);
        let text = SAMPLE_STRINGS[rng.gen_range(0..SAMPLE_STRINGS.len())];
        writeln!(writer, "{}. {}", number, text)?;
    }

    writer.flush()
}

pub fn read_lines(path: &Path) -> io::Result<Vec<String>> {
    BufReader::new(fs::File::open(path)?).lines().collect()
}

/// Sort key computed independently from the crate under test.
#[allow(dead_code)]
pub fn sort_key(line: &str) -> (String, i32) {
    let dot = line.find('.').unwrap();
    (line[dot + 2..].to_string(), line[..dot].parse().unwrap())
}
