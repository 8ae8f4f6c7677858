use std::fmt;
use std::fs::File;
use std::io::{self, Cursor, ErrorKind, Read, Seek, SeekFrom, Write};

use bytes::{Bytes, BytesMut};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, trace};

use crate::ensure;
use crate::protocol::{InvalidArgument, StreamError};
use crate::stream::AccessMode;

/// Upper bound of a single [`ByteStream::read`] allocation.
const MAX_READ_CHUNK: usize = 64 * 1024;

/// The I/O handle a [`ByteStream`] takes ownership of.
///
/// Every `Read + Write + Seek + Send` type is a handle. Handles that only
/// support a subset of those operations are wrapped, see [`Pipe`].
pub trait Handle: Read + Write + Seek + Send {}

impl<T: Read + Write + Seek + Send> Handle for T {}

/// Adapts a one-directional reader (a child process pipe, a socket half)
/// into a [`Handle`] that refuses writes and seeks.
#[derive(Debug)]
pub struct Pipe<R> {
    reader: R,
}

impl<R> Pipe<R> {
    pub fn new(reader: R) -> Self {
        Self { reader }
    }

    pub fn into_inner(self) -> R {
        self.reader
    }
}

impl<R: Read> Read for Pipe<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.reader.read(buf)
    }
}

impl<R> Write for Pipe<R> {
    fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
        Err(io::Error::new(ErrorKind::Unsupported, "pipe is read only"))
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<R> Seek for Pipe<R> {
    fn seek(&mut self, _pos: SeekFrom) -> io::Result<u64> {
        Err(io::Error::new(ErrorKind::Unsupported, "pipe is not seekable"))
    }
}

/// Descriptive metadata of an open [`ByteStream`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StreamMetadata {
    pub mode: String,
    pub readable: bool,
    pub writable: bool,
    pub seekable: bool,
    pub pipe: bool,
    pub eof: bool,
    pub uri: Option<String>,
}

/// A readable, writable and seekable sequence of bytes with an explicit
/// open/closed lifecycle.
///
/// The stream exclusively owns its handle. [`close`](ByteStream::close)
/// drops it, [`detach`](ByteStream::detach) gives it back to the caller;
/// either way the stream becomes inert and every I/O operation afterwards
/// fails with [`StreamError::Detached`].
pub struct ByteStream {
    handle: Option<Box<dyn Handle>>,
    mode: AccessMode,
    seekable: bool,
    pipe: bool,
    uri: Option<String>,
    size: Option<u64>,
    eof: bool,
}

impl ByteStream {
    /// Wraps an open handle whose capabilities are described by the fopen
    /// style `mode` string.
    pub fn new<H: Handle + 'static>(handle: H, mode: &str) -> Result<Self, InvalidArgument> {
        Ok(Self::from_parts(Box::new(handle), AccessMode::parse(mode)?, true, false))
    }

    /// Wraps an open file, recording `path` as the stream's source locator.
    pub fn from_file(file: File, mode: &str, path: impl Into<String>) -> Result<Self, InvalidArgument> {
        let size = file.metadata().ok().map(|metadata| metadata.len());
        let mut stream = Self::new(file, mode)?.with_uri(path);
        stream.size = size;
        Ok(stream)
    }

    /// An empty read-write stream backed by memory.
    pub fn memory() -> Self {
        let handle = Box::new(Cursor::new(Vec::new()));
        Self::from_parts(handle, AccessMode::read_write("w+b"), true, false).with_uri("memory")
    }

    /// A read-write memory stream pre-filled with `bytes`, positioned at the start.
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        let bytes = bytes.into();
        let size = bytes.len() as u64;
        let handle = Box::new(Cursor::new(bytes));
        let mut stream = Self::from_parts(handle, AccessMode::read_write("r+b"), true, false).with_uri("memory");
        stream.size = Some(size);
        stream
    }

    /// Wraps a non-seekable reader. The size of a pipe is never known.
    pub fn pipe<R: Read + Send + 'static>(reader: R) -> Self {
        Self::from_parts(Box::new(Pipe::new(reader)), AccessMode::read_only("r"), false, true)
    }

    fn from_parts(handle: Box<dyn Handle>, mode: AccessMode, seekable: bool, pipe: bool) -> Self {
        Self { handle: Some(handle), mode, seekable, pipe, uri: None, size: None, eof: false }
    }

    /// Sets the source locator reported by [`metadata`](ByteStream::metadata).
    pub fn with_uri(mut self, uri: impl Into<String>) -> Self {
        self.uri = Some(uri.into());
        self
    }

    /// Marks the handle as not seekable even though its type implements `Seek`.
    pub fn unseekable(mut self) -> Self {
        self.seekable = false;
        self
    }

    /// Closes the stream, releasing the handle. Closing twice is a no-op.
    pub fn close(&mut self) {
        if let Some(mut handle) = self.handle.take() {
            if let Err(e) = handle.flush() {
                debug!(cause = %e, "flush failed while closing stream");
            }
            trace!(uri = ?self.uri, "stream closed");
        }
        self.reset();
    }

    /// Separates the underlying handle from the stream and returns it.
    ///
    /// The stream is unusable afterwards. Returns `None` if already detached.
    pub fn detach(&mut self) -> Option<Box<dyn Handle>> {
        let handle = self.handle.take();
        if handle.is_some() {
            trace!(uri = ?self.uri, "stream detached");
        }
        self.reset();
        handle
    }

    fn reset(&mut self) {
        self.size = None;
        self.eof = true;
    }

    #[inline]
    pub fn is_detached(&self) -> bool {
        self.handle.is_none()
    }

    #[inline]
    pub fn is_readable(&self) -> bool {
        !self.is_detached() && self.mode.is_readable()
    }

    #[inline]
    pub fn is_writable(&self) -> bool {
        !self.is_detached() && self.mode.is_writable()
    }

    #[inline]
    pub fn is_seekable(&self) -> bool {
        !self.is_detached() && self.seekable
    }

    #[inline]
    pub fn is_pipe(&self) -> bool {
        self.pipe
    }

    fn handle(&mut self) -> Result<&mut (dyn Handle + 'static), StreamError> {
        match self.handle.as_deref_mut() {
            Some(handle) => Ok(handle),
            None => Err(StreamError::Detached),
        }
    }

    /// Returns the total size in bytes, or `None` when it can't be known.
    pub fn size(&mut self) -> Result<Option<u64>, StreamError> {
        ensure!(!self.is_detached(), StreamError::Detached);
        if self.size.is_some() || !self.seekable {
            return Ok(self.size);
        }

        let handle = self.handle()?;
        let current = handle.stream_position()?;
        let end = handle.seek(SeekFrom::End(0))?;
        handle.seek(SeekFrom::Start(current))?;

        self.size = Some(end);
        Ok(self.size)
    }

    /// Returns the current position of the read/write pointer.
    pub fn position(&mut self) -> Result<u64, StreamError> {
        ensure!(!self.is_detached(), StreamError::Detached);
        ensure!(self.seekable, StreamError::Unseekable);
        Ok(self.handle()?.stream_position()?)
    }

    /// Returns true once a read has hit the end of the stream.
    pub fn at_end(&self) -> Result<bool, StreamError> {
        ensure!(!self.is_detached(), StreamError::Detached);
        Ok(self.eof)
    }

    /// Moves the read/write pointer, returning the new position.
    pub fn seek(&mut self, pos: SeekFrom) -> Result<u64, StreamError> {
        ensure!(!self.is_detached(), StreamError::Detached);
        ensure!(self.seekable, StreamError::Unseekable);
        let position = self.handle()?.seek(pos)?;
        self.eof = false;
        Ok(position)
    }

    pub fn rewind(&mut self) -> Result<(), StreamError> {
        self.seek(SeekFrom::Start(0)).map(|_| ())
    }

    /// Writes `buf`, returning the number of bytes written.
    pub fn write(&mut self, buf: &[u8]) -> Result<usize, StreamError> {
        ensure!(!self.is_detached(), StreamError::Detached);
        ensure!(self.mode.is_writable(), StreamError::Unwritable);
        let written = self.handle()?.write(buf)?;
        self.size = None;
        Ok(written)
    }

    /// Reads up to `max_len` bytes.
    ///
    /// The result may be shorter than requested; it is empty only at the end
    /// of the stream or when `max_len` is zero.
    pub fn read(&mut self, max_len: usize) -> Result<Bytes, StreamError> {
        ensure!(!self.is_detached(), StreamError::Detached);
        ensure!(self.mode.is_readable(), StreamError::Unreadable);
        if max_len == 0 {
            return Ok(Bytes::new());
        }

        let mut buf = BytesMut::zeroed(max_len.min(MAX_READ_CHUNK));
        let handle = self.handle()?;
        let read = loop {
            match handle.read(&mut buf) {
                Ok(n) => break n,
                Err(e) if e.kind() == ErrorKind::Interrupted => {}
                Err(e) => return Err(e.into()),
            }
        };

        if read == 0 {
            self.eof = true;
        }
        buf.truncate(read);
        Ok(buf.freeze())
    }

    /// Reads everything from the current position to the end of the stream.
    pub fn read_all(&mut self) -> Result<Bytes, StreamError> {
        ensure!(!self.is_detached(), StreamError::Detached);
        ensure!(self.mode.is_readable(), StreamError::Unreadable);
        let mut buf = Vec::new();
        self.handle()?.read_to_end(&mut buf)?;
        self.eof = true;
        Ok(Bytes::from(buf))
    }

    pub fn metadata(&self) -> Result<StreamMetadata, StreamError> {
        ensure!(!self.is_detached(), StreamError::Detached);
        Ok(StreamMetadata {
            mode: self.mode.to_string(),
            readable: self.mode.is_readable(),
            writable: self.mode.is_writable(),
            seekable: self.seekable,
            pipe: self.pipe,
            eof: self.eof,
            uri: self.uri.clone(),
        })
    }

    /// Returns a single metadata entry, `None` for unknown keys.
    pub fn metadata_value(&self, key: &str) -> Result<Option<Value>, StreamError> {
        let metadata = self.metadata()?;
        let value = match key {
            "mode" => Value::from(metadata.mode),
            "readable" => Value::from(metadata.readable),
            "writable" => Value::from(metadata.writable),
            "seekable" => Value::from(metadata.seekable),
            "pipe" => Value::from(metadata.pipe),
            "eof" => Value::from(metadata.eof),
            "uri" => metadata.uri.map_or(Value::Null, Value::from),
            _ => return Ok(None),
        };
        Ok(Some(value))
    }

    /// Renders the whole stream as text, from the start when seekable.
    ///
    /// Failures yield an empty string; use [`read_all`](ByteStream::read_all)
    /// to observe errors.
    pub fn text(&mut self) -> String {
        match self.read_text() {
            Ok(text) => text,
            Err(e) => {
                debug!(cause = %e, "rendering stream as text failed");
                String::new()
            }
        }
    }

    fn read_text(&mut self) -> Result<String, StreamError> {
        if self.is_seekable() {
            self.rewind()?;
        }
        let bytes = self.read_all()?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

impl fmt::Debug for ByteStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ByteStream")
            .field("mode", &self.mode.as_str())
            .field("seekable", &self.seekable)
            .field("pipe", &self.pipe)
            .field("uri", &self.uri)
            .field("detached", &self.is_detached())
            .finish_non_exhaustive()
    }
}

impl From<Bytes> for ByteStream {
    fn from(bytes: Bytes) -> Self {
        Self::from_bytes(Vec::from(bytes))
    }
}

impl From<Vec<u8>> for ByteStream {
    fn from(bytes: Vec<u8>) -> Self {
        Self::from_bytes(bytes)
    }
}

impl From<String> for ByteStream {
    fn from(text: String) -> Self {
        Self::from_bytes(text.into_bytes())
    }
}

impl From<&str> for ByteStream {
    fn from(text: &str) -> Self {
        Self::from_bytes(text.as_bytes())
    }
}
