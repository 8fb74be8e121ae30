use alloc::string::ToString;
use std::io;

use vc_schema::error::DataError;

pub(crate) fn io_error(err: io::Error) -> DataError {
    match err.kind() {
        io::ErrorKind::UnexpectedEof => DataError::truncated(err.to_string()),
        _ => DataError::io(err.to_string()),
    }
}

// -----------------------------------------------------------------------------
// Counted

/// A writer that remembers how many bytes went through it.
pub(crate) struct Counted<W> {
    inner: W,
    count: usize,
}

impl<W> Counted<W> {
    #[inline]
    pub fn new(inner: W) -> Self {
        Self { inner, count: 0 }
    }

    #[inline]
    pub fn count(&self) -> usize {
        self.count
    }
}

impl<W: io::Write> io::Write for Counted<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let written = self.inner.write(buf)?;
        self.count += written;
        Ok(written)
    }

    #[inline]
    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

// -----------------------------------------------------------------------------
// Tests
