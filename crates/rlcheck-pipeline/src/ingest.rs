//! Input ingestion
//!
//! Reads indicator rows from a delimited file with a header row. The header
//! must contain `ThreatType` and `Indicator`; every other column is carried
//! through to the outputs untouched.

use rlcheck_core::types::fields;
use rlcheck_core::{Error, IndicatorRecord, Result};
use std::borrow::Cow;
use std::fs::File;
use std::path::Path;

/// Lazy, finite iterator over the records of one input file
pub struct IndicatorReader {
    reader: csv::Reader<File>,
    headers: Vec<String>,
    row: csv::ByteRecord,
}

impl IndicatorReader {
    /// Open an input file and validate its header row
    pub fn open(path: impl AsRef<Path>, delimiter: char) -> Result<Self> {
        let path = path.as_ref();
        let mut reader = reader_builder(delimiter)?
            .from_path(path)
            .map_err(|e| Error::input(format!("cannot read {}: {}", path.display(), e)))?;

        let headers: Vec<String> = reader
            .byte_headers()?
            .iter()
            .map(|h| String::from_utf8_lossy(h).trim_start_matches('\u{feff}').to_string())
            .collect();

        for required in fields::REQUIRED {
            if !headers.iter().any(|h| h == required) {
                return Err(Error::input(format!(
                    "{} has no {} column",
                    path.display(),
                    required
                )));
            }
        }

        Ok(Self {
            reader,
            headers,
            row: csv::ByteRecord::new(),
        })
    }

    /// Count data rows without building records
    pub fn count(path: impl AsRef<Path>, delimiter: char) -> Result<u64> {
        let mut reader = reader_builder(delimiter)?.from_path(path.as_ref())?;
        let mut row = csv::ByteRecord::new();
        let mut count = 0;
        while reader.read_byte_record(&mut row)? {
            count += 1;
        }
        Ok(count)
    }

    /// Column names of the input
    pub fn headers(&self) -> &[String] {
        &self.headers
    }
}

fn reader_builder(delimiter: char) -> Result<csv::ReaderBuilder> {
    if !delimiter.is_ascii() {
        return Err(Error::config(format!("input delimiter {:?} is not ASCII", delimiter)));
    }
    let mut builder = csv::ReaderBuilder::new();
    builder.delimiter(delimiter as u8).flexible(true);
    Ok(builder)
}

impl Iterator for IndicatorReader {
    type Item = Result<IndicatorRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.reader.read_byte_record(&mut self.row) {
            Ok(true) => {
                // Undecodable bytes become U+FFFD; the row still reaches an output
                let values: Vec<Cow<'_, str>> = self.row.iter().map(String::from_utf8_lossy).collect();
                Some(Ok(IndicatorRecord::from_row(self.headers.as_slice(), values.as_slice())))
            }
            Ok(false) => None,
            Err(e) => Some(Err(Error::input(format!(
                "unreadable row near line {}: {}",
                e.position().map(|p| p.line()).unwrap_or_default(),
                e
            )))),
        }
    }
}
