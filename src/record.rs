//! Record line codec.
//!
//! Every line of an input file has the form `<number>. <text>`: a non-negative integer, a dot, a single space
//! and the text up to the end of the line. The text may itself contain further dots, only the first one
//! separates the fields.
//!
//! Records are ordered by text first (byte-wise comparison) and by number second.

use std::cmp::Ordering;
use std::error::Error;
use std::fmt;
use std::fmt::Display;
use std::num::ParseIntError;
use std::str::FromStr;

/// Field separator dot.
const DOT: char = '.';
/// Separator length (the dot and the following space).
const SEPARATOR_LEN: usize = 2;

/// Record parsing error.
#[derive(Debug)]
pub enum RecordError {
    /// Line doesn't contain a dot.
    MissingSeparator(String),
    /// The first dot is not followed by a space.
    MissingSpace(String),
    /// Number prefix is not a valid integer.
    InvalidNumber(String, ParseIntError),
    /// Number prefix is negative.
    NegativeNumber(String),
}

impl Error for RecordError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match &self {
            RecordError::InvalidNumber(_, err) => Some(err),
            _ => None,
        }
    }
}

impl Display for RecordError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self {
            RecordError::MissingSeparator(line) => write!(f, "record separator not found: {:?}", line),
            RecordError::MissingSpace(line) => write!(f, "record separator must be followed by a space: {:?}", line),
            RecordError::InvalidNumber(line, err) => write!(f, "record number is invalid ({}): {:?}", err, line),
            RecordError::NegativeNumber(line) => write!(f, "record number is negative: {:?}", line),
        }
    }
}

/// Splits a line into its number and the byte offset the text starts at.
fn split_line(line: &str) -> Result<(i32, usize), RecordError> {
    let dot = line
        .find(DOT)
        .ok_or_else(|| RecordError::MissingSeparator(line.to_string()))?;

    if line.as_bytes().get(dot + 1) != Some(&b' ') {
        return Err(RecordError::MissingSpace(line.to_string()));
    }

    let number: i32 = line[..dot]
        .parse()
        .map_err(|err| RecordError::InvalidNumber(line.to_string(), err))?;
    if number < 0 {
        return Err(RecordError::NegativeNumber(line.to_string()));
    }

    return Ok((number, dot + SEPARATOR_LEN));
}

/// A single parsed record.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Record {
    pub number: i32,
    pub text: String,
}

impl Record {
    pub fn new(number: i32, text: impl Into<String>) -> Self {
        Record {
            number,
            text: text.into(),
        }
    }

    /// Parses a record from a line (without the line terminator).
    pub fn parse(line: &str) -> Result<Self, RecordError> {
        let (number, text_offset) = split_line(line)?;

        return Ok(Record {
            number,
            text: line[text_offset..].to_string(),
        });
    }

    /// Formats the record as a line (without the line terminator).
    pub fn format(&self) -> String {
        self.to_string()
    }
}

impl FromStr for Record {
    type Err = RecordError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Record::parse(s)
    }
}

impl Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{} {}", self.number, DOT, self.text)
    }
}

impl PartialOrd for Record {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Record {
    fn cmp(&self, other: &Self) -> Ordering {
        self.text.cmp(&other.text).then(self.number.cmp(&other.number))
    }
}

/// An input line together with its parsed sort key.
///
/// The line is kept verbatim so that it is written out exactly as it was read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyedLine {
    line: String,
    number: i32,
    text_offset: usize,
}

impl KeyedLine {
    pub fn parse(line: String) -> Result<Self, RecordError> {
        let (number, text_offset) = split_line(&line)?;

        return Ok(KeyedLine {
            line,
            number,
            text_offset,
        });
    }

    pub fn number(&self) -> i32 {
        self.number
    }

    pub fn text(&self) -> &str {
        &self.line[self.text_offset..]
    }

    pub fn line(&self) -> &str {
        &self.line
    }

    pub fn into_line(self) -> String {
        self.line
    }

    /// Compares sort keys only: text first, number second.
    pub fn compare_key(&self, other: &Self) -> Ordering {
        self.text().cmp(other.text()).then(self.number.cmp(&other.number))
    }
}

impl PartialOrd for KeyedLine {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

// ties on the sort key fall back to the raw line ("007. a" before "7. a")
impl Ord for KeyedLine {
    fn cmp(&self, other: &Self) -> Ordering {
        self.compare_key(other).then_with(|| self.line.cmp(&other.line))
    }
}

/// Compares two raw lines by their sort key.
pub fn compare_lines(a: &str, b: &str) -> Result<Ordering, RecordError> {
    let (a_number, a_offset) = split_line(a)?;
    let (b_number, b_offset) = split_line(b)?;

    return Ok(a[a_offset..].cmp(&b[b_offset..]).then(a_number.cmp(&b_number)));
}
