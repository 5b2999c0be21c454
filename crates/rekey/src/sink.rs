//! The shared output sink.
//!
//! Workers never see the underlying writer. They get a [`RowSink`] whose only
//! operations are a guarded single-row append and a flush. Every call takes
//! the sink's lock for its own duration and releases it on return, whether the
//! write succeeded or not, so at most one write is in flight and rows never
//! interleave.
//!
//! A row is encoded in full before the lock is taken and reaches the shared
//! stream as one contiguous byte run. A write that fails before any of its
//! bytes were accepted loses only that row. A write that fails after part of
//! its row was accepted leaves a fragment in the stream; the sink is then
//! [torn](SinkError::Torn) and rejects everything that follows.

use crate::{
    SinkError,
    mutex::{Mutex, MutexGuard},
};
use std::io::{self, Write};

/// Capacity of the scratch buffer each row is encoded into.
const ROW_BUFFER_CAPACITY: usize = 512;

/// A single logical append-only destination shared by all workers.
pub trait RowSink: Send + Sync {
    /// Appends one row while holding the sink's lock.
    ///
    /// # Errors
    /// - Returns an error if the row could not be encoded or written, or if the
    ///   lock is poisoned.
    fn write_row(&self, row: &[&str]) -> Result<(), SinkError>;

    /// Makes every previously accepted row visible in the underlying stream.
    ///
    /// # Errors
    /// - Returns an error if the underlying stream fails to flush, or if the
    ///   lock is poisoned.
    fn flush(&self) -> Result<(), SinkError>;
}

/// A [`RowSink`] writing delimited text. No header row is written.
///
/// Output is buffered; nothing reaches `W` reliably until [`RowSink::flush`]
/// is called.
pub struct CsvSink<W: io::Write> {
    encoder: csv::WriterBuilder,
    output: Mutex<Output<W>>,
}

struct Output<W: io::Write> {
    writer: io::BufWriter<W>,
    torn: bool,
}

impl<W: io::Write> Output<W> {
    /// Writes one encoded row, tracking whether a failure left part of it
    /// behind.
    fn append(&mut self, bytes: &[u8]) -> Result<(), SinkError> {
        if self.torn {
            return Err(SinkError::Torn);
        }

        let mut accepted = 0;
        while accepted < bytes.len() {
            match self.writer.write(&bytes[accepted..]) {
                Ok(0) => return Err(self.fail(accepted, io::ErrorKind::WriteZero.into())),
                Ok(n) => accepted += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(self.fail(accepted, e)),
            }
        }
        Ok(())
    }

    fn fail(&mut self, accepted: usize, e: io::Error) -> SinkError {
        if accepted > 0 {
            self.torn = true;
        }
        SinkError::Io(e)
    }
}

impl<W: io::Write> CsvSink<W> {
    /// Creates a comma-delimited sink over `wtr`.
    pub fn new(wtr: W) -> Self {
        Self::with_delimiter(wtr, b',')
    }

    /// Creates a sink using `delimiter` between fields.
    pub fn with_delimiter(wtr: W, delimiter: u8) -> Self {
        let mut encoder = csv::WriterBuilder::new();
        encoder
            .has_headers(false)
            .delimiter(delimiter)
            .buffer_capacity(ROW_BUFFER_CAPACITY);

        Self {
            encoder,
            output: Mutex::new(Output {
                writer: io::BufWriter::new(wtr),
                torn: false,
            }),
        }
    }

    fn encode(&self, row: &[&str]) -> Result<Vec<u8>, SinkError> {
        let mut wtr = self
            .encoder
            .from_writer(Vec::with_capacity(ROW_BUFFER_CAPACITY));
        wtr.write_record(row)?;
        wtr.into_inner().map_err(|e| SinkError::Io(e.into_error()))
    }

    fn lock(&self) -> Result<MutexGuard<'_, Output<W>>, SinkError> {
        #[cfg(feature = "parking-lot")]
        let guard = self.output.lock();
        #[cfg(not(feature = "parking-lot"))]
        let guard = self.output.lock()?;
        Ok(guard)
    }

    /// Flushes and returns the underlying writer.
    ///
    /// # Errors
    /// - Returns an error if the final flush fails or the lock is poisoned.
    pub fn into_inner(self) -> Result<W, SinkError> {
        #[cfg(feature = "parking-lot")]
        let output = self.output.into_inner();
        #[cfg(not(feature = "parking-lot"))]
        let output = self
            .output
            .into_inner()
            .map_err(|_| SinkError::LockPoisoned)?;

        output
            .writer
            .into_inner()
            .map_err(|e| SinkError::Io(e.into_error()))
    }
}

impl<W: io::Write + Send> RowSink for CsvSink<W> {
    fn write_row(&self, row: &[&str]) -> Result<(), SinkError> {
        let bytes = self.encode(row)?;
        self.lock()?.append(&bytes)
    }

    fn flush(&self) -> Result<(), SinkError> {
        let mut output = self.lock()?;
        output.writer.flush()?;
        if output.torn {
            return Err(SinkError::Torn);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FIELD_COUNT;
    use std::sync::Arc;
    use std::thread::scope;

    /// A writer that fails every write.
    struct BrokenPipe;
    impl io::Write for BrokenPipe {
        fn write(&mut self, _: &[u8]) -> io::Result<usize> {
            Err(io::Error::from(io::ErrorKind::BrokenPipe))
        }

        fn flush(&mut self) -> io::Result<()> {
            Err(io::Error::from(io::ErrorKind::BrokenPipe))
        }
    }

    /// A writer that rejects its first write outright, then accepts everything.
    #[derive(Default)]
    struct FailsOnce {
        failed: bool,
        buf: Vec<u8>,
    }

    impl io::Write for FailsOnce {
        fn write(&mut self, data: &[u8]) -> io::Result<usize> {
            if !self.failed {
                self.failed = true;
                return Err(io::Error::from(io::ErrorKind::ConnectionReset));
            }
            self.buf.write(data)
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    /// A writer that accepts a few bytes of its first write, fails the next,
    /// then accepts everything.
    #[derive(Default)]
    struct ShortThenFail {
        calls: usize,
        buf: Vec<u8>,
    }

    impl io::Write for ShortThenFail {
        fn write(&mut self, data: &[u8]) -> io::Result<usize> {
            self.calls += 1;
            match self.calls {
                1 => self.buf.write(&data[..data.len().min(10)]),
                2 => Err(io::Error::from(io::ErrorKind::ConnectionReset)),
                _ => self.buf.write(data),
            }
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn parse(bytes: &[u8]) -> Vec<csv::StringRecord> {
        csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(bytes)
            .records()
            .collect::<Result<_, _>>()
            .unwrap()
    }

    #[test]
    fn writes_rows_without_header() {
        let sink = CsvSink::new(Vec::new());
        sink.write_row(&["1", "A", "B", "a@b.com", "Addr", "City", "Country"])
            .unwrap();
        sink.flush().unwrap();

        let out = sink.into_inner().unwrap();
        assert_eq!(out, b"1,A,B,a@b.com,Addr,City,Country\n");
    }

    #[test]
    fn quotes_fields_that_need_it() {
        let sink = CsvSink::new(Vec::new());
        sink.write_row(&["1", "A", "B", "a@b.com", "1 Main St, Apt 2", "City", "\"Q\""])
            .unwrap();

        let rows = parse(&sink.into_inner().unwrap());
        assert_eq!(rows.len(), 1);
        assert_eq!(&rows[0][4], "1 Main St, Apt 2");
        assert_eq!(&rows[0][6], "\"Q\"");
    }

    #[test]
    fn concurrent_writes_never_interleave() {
        const THREADS: usize = 8;
        const ROWS_PER_THREAD: usize = 2_000;

        let sink = Arc::new(CsvSink::new(Vec::new()));
        // Long fields force the csv buffer to spill mid-row.
        let padding = "x".repeat(700);

        scope(|s| {
            for t in 0..THREADS {
                let sink = Arc::clone(&sink);
                let padding = padding.as_str();
                s.spawn(move || {
                    for i in 0..ROWS_PER_THREAD {
                        let id = format!("{t}-{i}");
                        sink.write_row(&[id.as_str(), padding, padding, "e", padding, "c", "k"])
                            .unwrap();
                    }
                });
            }
        });

        let sink = Arc::into_inner(sink).unwrap();
        let rows = parse(&sink.into_inner().unwrap());
        assert_eq!(rows.len(), THREADS * ROWS_PER_THREAD);
        for row in &rows {
            assert_eq!(row.len(), FIELD_COUNT);
            assert_eq!(&row[1], padding);
            assert_eq!(&row[6], "k");
        }
    }

    #[test]
    fn write_failures_are_reported_and_release_the_lock() {
        let sink = CsvSink::new(BrokenPipe);
        let long = "y".repeat(64 * 1024);

        assert!(sink.write_row(&[long.as_str()]).is_err());
        // The lock was released on the error path.
        assert!(sink.write_row(&[long.as_str()]).is_err());
        assert!(matches!(sink.flush(), Err(SinkError::Io(_))));
    }

    #[test]
    fn failed_write_does_not_leak_into_the_next_row() {
        let sink = CsvSink::new(FailsOnce::default());
        // Larger than the output buffer, so the row goes straight to the
        // writer and hits the failure.
        let address = "z".repeat(20 * 1024);

        let first = ["1", "A", "B", "a@b.com", address.as_str(), "City", "Country"];
        assert!(matches!(sink.write_row(&first), Err(SinkError::Io(_))));
        sink.write_row(&["2", "C", "D", "c@d.com", "Addr", "City", "Country"])
            .unwrap();
        sink.flush().unwrap();

        let rows = parse(&sink.into_inner().unwrap().buf);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].len(), FIELD_COUNT);
        assert_eq!(&rows[0][0], "2");
    }

    #[test]
    fn partially_written_row_tears_the_sink() {
        let sink = CsvSink::new(ShortThenFail::default());
        let address = "z".repeat(20 * 1024);

        let first = ["1", "A", "B", "a@b.com", address.as_str(), "City", "Country"];
        assert!(matches!(sink.write_row(&first), Err(SinkError::Io(_))));
        assert!(matches!(
            sink.write_row(&["2", "C", "D", "c@d.com", "Addr", "City", "Country"]),
            Err(SinkError::Torn)
        ));
        assert!(matches!(sink.flush(), Err(SinkError::Torn)));

        // Only the fragment of the first row ever reached the writer.
        let out = sink.into_inner().unwrap().buf;
        assert_eq!(out, b"1,A,B,a@b.");
    }
}
