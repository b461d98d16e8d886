//! Moving sampled curves to and from CSV files

use ::csv::{ReaderBuilder, StringRecord, WriterBuilder};
use serde::{de::DeserializeOwned, Serialize};
use std::{fs::File, marker::PhantomData, path::Path};

pub use ::csv::{Error, Result};

/// Common configuration for reading and writing to CSV files
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Config<FileName: AsRef<Path>> {
    /// Name of the CSV file to be accessed
    pub file_name: FileName,

    /// Field delimiter, defaults to a comma
    pub delimiter: Option<u8>,
}
//
impl<FileName: AsRef<Path>> Config<FileName> {
    fn delimiter(&self) -> u8 {
        self.delimiter.unwrap_or(b',')
    }
}

/// Mechanism to write rows of samples into a CSV file
pub struct Writer {
    /// Underlying CSV writer
    inner: ::csv::Writer<File>,

    /// Number of rows written so far, excluding the header
    rows: usize,
}
//
impl Writer {
    /// Create or truncate a file, then write down the column names
    pub fn create<Column: AsRef<[u8]>>(
        config: Config<impl AsRef<Path>>,
        header: impl IntoIterator<Item = Column>,
    ) -> Result<Self> {
        let mut inner = WriterBuilder::new()
            .delimiter(config.delimiter())
            .has_headers(false)
            .from_path(config.file_name)?;
        inner.write_record(header)?;
        Ok(Self { inner, rows: 0 })
    }

    /// Write a new row, either a struct or a sequence of values
    pub fn write(&mut self, row: impl Serialize) -> Result<()> {
        self.inner.serialize(row)?;
        self.rows += 1;
        Ok(())
    }

    /// Number of rows written so far, excluding the header
    pub fn num_rows(&self) -> usize {
        self.rows
    }

    /// Flush the file to the underlying storage medium and close it
    ///
    /// This should automatically happen on Drop, but doing it manually allows
    /// you to catch and handle errors, instead of silently ignoring them.
    pub fn close(mut self) -> Result<()> {
        self.inner.flush()?;
        Ok(())
    }
}

/// Mechanism to read rows of samples back from a CSV file
pub struct Reader<Row: DeserializeOwned> {
    /// Underlying CSV reader
    inner: ::csv::Reader<File>,

    /// Column names
    header: StringRecord,

    /// Type of rows being read
    row: PhantomData<Row>,
}
//
impl<Row: DeserializeOwned> Reader<Row> {
    /// Open an existing file and read its column names
    pub fn open(config: Config<impl AsRef<Path>>) -> Result<Self> {
        let mut inner = ReaderBuilder::new()
            .delimiter(config.delimiter())
            .from_path(config.file_name)?;
        let header = inner.headers()?.clone();
        Ok(Self {
            inner,
            header,
            row: PhantomData,
        })
    }

    /// Column names
    pub fn header(&self) -> impl Iterator<Item = &str> + '_ {
        self.header.iter()
    }

    /// Read the next row, if any
    ///
    /// You can equivalently treat this reader as an iterator of rows.
    pub fn read(&mut self) -> Option<Result<Row>> {
        let mut record = StringRecord::new();
        match self.inner.read_record(&mut record) {
            Ok(true) => Some(record.deserialize(Some(&self.header))),
            Ok(false) => None,
            Err(e) => Some(Err(e)),
        }
    }
}
//
impl<Row: DeserializeOwned> Iterator for Reader<Row> {
    type Item = Result<Row>;

    fn next(&mut self) -> Option<Self::Item> {
        self.read()
    }
}
