//! Record sources.
//!
//! A source yields a lazy, finite sequence of [`Record`]s. The first row of
//! the stream is a header that the orchestrator discards through
//! [`RecordSource::skip_header`] before pulling data rows.

use crate::{Record, SourceError};
use std::io;

/// A lazy, finite sequence of records read from an input stream.
///
/// Each item is either a well-formed [`Record`] or a [`SourceError`] for a row
/// that could not be read. `None` signals end-of-stream. A source that has
/// reported a malformed row must still be able to continue with the next one.
pub trait RecordSource: Iterator<Item = Result<Record, SourceError>> {
    /// Consumes and discards the header row, whatever its width.
    ///
    /// Returns `Ok(false)` if the stream is empty.
    ///
    /// # Errors
    /// - Returns an error if the header row could not be read.
    fn skip_header(&mut self) -> Result<bool, SourceError>;
}

/// A [`RecordSource`] over delimited text.
///
/// Field counts are validated here rather than by the CSV reader, so that a
/// row of the wrong width surfaces as [`SourceError::FieldCount`] and the next
/// row is still readable.
pub struct CsvSource<R> {
    reader: csv::Reader<R>,
    row: csv::StringRecord,
    exhausted: bool,
}

impl<R: io::Read> CsvSource<R> {
    /// Creates a comma-delimited source over `rdr`.
    ///
    /// The reader is internally buffered; there is no need to wrap `rdr` in a
    /// `BufReader`.
    pub fn new(rdr: R) -> Self {
        Self::with_delimiter(rdr, b',')
    }

    /// Creates a source using `delimiter` between fields.
    pub fn with_delimiter(rdr: R, delimiter: u8) -> Self {
        let reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .delimiter(delimiter)
            .from_reader(rdr);

        Self {
            reader,
            row: csv::StringRecord::new(),
            exhausted: false,
        }
    }

    fn read_row(&mut self) -> Option<Result<&csv::StringRecord, SourceError>> {
        if self.exhausted {
            return None;
        }

        match self.reader.read_record(&mut self.row) {
            Ok(true) => Some(Ok(&self.row)),
            Ok(false) => {
                self.exhausted = true;
                None
            }
            Err(e) => {
                // An I/O failure would repeat on every read; report it once and
                // end the stream.
                if e.is_io_error() {
                    self.exhausted = true;
                }
                Some(Err(SourceError::Csv(e)))
            }
        }
    }
}

impl<R: io::Read> Iterator for CsvSource<R> {
    type Item = Result<Record, SourceError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.read_row().map(|row| row.and_then(Record::try_from))
    }
}

impl<R: io::Read> RecordSource for CsvSource<R> {
    fn skip_header(&mut self) -> Result<bool, SourceError> {
        match self.read_row() {
            Some(Ok(_)) => Ok(true),
            Some(Err(e)) => Err(e),
            None => Ok(false),
        }
    }
}
