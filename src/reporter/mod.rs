//! Progress-reporting body wrapper.
//!
//! [`ReadReporter`] wraps a byte source and calls a callback with the size of
//! every read, including the final zero-length read at end of input. It is
//! meant to be handed to a connection as an upload body.

use bytes::Bytes;
use std::fmt;
use std::io::{self, Read, Seek, SeekFrom};
use tracing::trace;

/// Callback receiving the number of bytes returned by each read.
pub type ReadCallback = Box<dyn FnMut(usize) + Send>;

/// Reader that reports every read to a callback.
///
/// Errors from the wrapped source are passed through unchanged and are not
/// reported.
pub struct ReadReporter<R> {
    inner: R,
    callback: Option<ReadCallback>,
}

impl<R> ReadReporter<R> {
    /// Wrap a source without a callback.
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            callback: None,
        }
    }

    /// Wrap a source and report reads to `callback`.
    pub fn with_callback(inner: R, callback: impl FnMut(usize) + Send + 'static) -> Self {
        Self {
            inner,
            callback: Some(Box::new(callback)),
        }
    }

    /// Replace the callback.
    pub fn set_callback(&mut self, callback: impl FnMut(usize) + Send + 'static) {
        self.callback = Some(Box::new(callback));
    }

    /// Remove the callback.
    pub fn clear_callback(&mut self) {
        self.callback = None;
    }

    /// Reference to the wrapped source.
    pub fn get_ref(&self) -> &R {
        &self.inner
    }

    /// Mutable reference to the wrapped source. Reads through it are not reported.
    pub fn get_mut(&mut self) -> &mut R {
        &mut self.inner
    }

    /// Unwrap the source.
    pub fn into_inner(self) -> R {
        self.inner
    }

    /// Release the source.
    pub fn close(self) {
        trace!("ReadReporter closed");
    }

    fn report(&mut self, bytes_read: usize) {
        trace!(bytes_read = bytes_read, "read");
        if let Some(callback) = self.callback.as_mut() {
            callback(bytes_read);
        }
    }
}

impl<R: Read> ReadReporter<R> {
    /// Read up to `size` bytes, or everything remaining when `size` is `None`.
    ///
    /// Fewer than `size` bytes are returned only at end of input. The
    /// callback sees one call with the total length returned.
    pub fn read_chunk(&mut self, size: Option<usize>) -> io::Result<Bytes> {
        let mut data = Vec::new();
        match size {
            Some(size) => {
                data.reserve(size);
                (&mut self.inner).take(size as u64).read_to_end(&mut data)?;
            }
            None => {
                self.inner.read_to_end(&mut data)?;
            }
        }
        self.report(data.len());
        Ok(Bytes::from(data))
    }

    /// Iterate over successive chunks of `size` bytes until the source is empty.
    pub fn chunks(&mut self, size: usize) -> Chunks<'_, R> {
        Chunks {
            reporter: self,
            size: size.max(1),
            done: false,
        }
    }
}

impl<R: Read> Read for ReadReporter<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.report(n);
        Ok(n)
    }
}

impl<R: Seek> ReadReporter<R> {
    /// Current position in the source.
    pub fn tell(&mut self) -> io::Result<u64> {
        self.inner.stream_position()
    }
}

impl<R: Seek> Seek for ReadReporter<R> {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        trace!(pos = ?pos, "seek");
        self.inner.seek(pos)
    }
}

impl<R> fmt::Debug for ReadReporter<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReadReporter")
            .field("has_callback", &self.callback.is_some())
            .finish_non_exhaustive()
    }
}

/// Iterator over the chunks of a [`ReadReporter`].
pub struct Chunks<'a, R> {
    reporter: &'a mut ReadReporter<R>,
    size: usize,
    done: bool,
}

impl<R: Read> Iterator for Chunks<'_, R> {
    type Item = io::Result<Bytes>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.reporter.read_chunk(Some(self.size)) {
            Ok(chunk) if chunk.is_empty() => {
                self.done = true;
                None
            }
            Ok(chunk) => Some(Ok(chunk)),
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use std::sync::{Arc, Mutex};

    fn recording() -> (Arc<Mutex<Vec<usize>>>, impl FnMut(usize) + Send + 'static) {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&calls);
        (calls, move |n| sink.lock().unwrap().push(n))
    }

    #[test]
    fn test_read_reports_each_read_and_final_zero() {
        let (calls, callback) = recording();
        let mut reporter = ReadReporter::with_callback(Cursor::new(vec![7u8; 10]), callback);

        let mut buf = [0u8; 4];
        let mut total = 0;
        loop {
            let n = reporter.read(&mut buf).unwrap();
            if n == 0 {
                break;
            }
            total += n;
        }

        assert_eq!(total, 10);
        assert_eq!(*calls.lock().unwrap(), vec![4, 4, 2, 0]);
    }

    #[test]
    fn test_chunks_sum_to_source_length() {
        let (calls, callback) = recording();
        let data: Vec<u8> = (0..=255).collect();
        let mut reporter = ReadReporter::with_callback(Cursor::new(data.clone()), callback);

        let chunks: Vec<Bytes> = reporter.chunks(100).collect::<io::Result<_>>().unwrap();
        let joined: Vec<u8> = chunks.iter().flat_map(|c| c.iter().copied()).collect();

        assert_eq!(joined, data);
        let calls = calls.lock().unwrap();
        assert_eq!(*calls, vec![100, 100, 56, 0]);
        assert_eq!(calls.iter().sum::<usize>(), 256);
    }

    #[test]
    fn test_read_chunk_without_size_reads_all() {
        let (calls, callback) = recording();
        let mut reporter = ReadReporter::with_callback(Cursor::new(b"hello".to_vec()), callback);

        assert_eq!(reporter.read_chunk(None).unwrap(), Bytes::from_static(b"hello"));
        assert!(reporter.read_chunk(None).unwrap().is_empty());
        assert_eq!(*calls.lock().unwrap(), vec![5, 0]);
    }

    #[test]
    fn test_set_callback_swaps_target() {
        let (first, callback) = recording();
        let mut reporter = ReadReporter::with_callback(Cursor::new(b"abcdef".to_vec()), callback);
        reporter.read_chunk(Some(2)).unwrap();

        let (second, callback) = recording();
        reporter.set_callback(callback);
        reporter.read_chunk(Some(3)).unwrap();

        assert_eq!(*first.lock().unwrap(), vec![2]);
        assert_eq!(*second.lock().unwrap(), vec![3]);
    }

    #[test]
    fn test_seek_and_tell() {
        let mut reporter = ReadReporter::new(Cursor::new(b"0123456789".to_vec()));
        reporter.seek(SeekFrom::Start(6)).unwrap();
        assert_eq!(reporter.tell().unwrap(), 6);
        assert_eq!(reporter.read_chunk(None).unwrap(), Bytes::from_static(b"6789"));
        assert_eq!(reporter.tell().unwrap(), 10);
    }

    #[test]
    fn test_errors_pass_through() {
        struct Broken;
        impl Read for Broken {
            fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
                Err(io::Error::new(io::ErrorKind::PermissionDenied, "nope"))
            }
        }

        let (calls, callback) = recording();
        let mut reporter = ReadReporter::with_callback(Broken, callback);
        let err = reporter.read(&mut [0u8; 8]).unwrap_err();

        assert_eq!(err.kind(), io::ErrorKind::PermissionDenied);
        assert!(calls.lock().unwrap().is_empty());

        let mut chunks = reporter.chunks(4);
        assert!(matches!(chunks.next(), Some(Err(_))));
        assert!(chunks.next().is_none());
    }
}
