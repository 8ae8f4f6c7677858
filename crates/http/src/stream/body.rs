use std::fmt;
use std::pin::Pin;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::task::{Context, Poll};

use bytes::Bytes;
use http_body::{Frame, SizeHint};
use triomphe::Arc;

use crate::protocol::StreamError;
use crate::stream::ByteStream;

/// Chunk size used by [`Body::frames`] when none is given.
pub const DEFAULT_FRAME_SIZE: usize = 8 * 1024;

/// The body of a message: a shared handle to a [`ByteStream`].
///
/// Cloning a message clones the handle, not the stream, so every message
/// derived from another one reads and writes the same underlying bytes.
/// Two bodies compare equal when they point at the same stream.
#[derive(Clone)]
pub struct Body {
    stream: Arc<Mutex<ByteStream>>,
}

impl Body {
    pub fn new(stream: ByteStream) -> Self {
        Self { stream: Arc::new(Mutex::new(stream)) }
    }

    /// A body over a fresh, empty memory stream.
    pub fn empty() -> Self {
        Self::new(ByteStream::memory())
    }

    /// Locks the stream for reading, writing or seeking.
    pub fn lock(&self) -> MutexGuard<'_, ByteStream> {
        self.stream.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns true if both handles point at the same stream.
    pub fn ptr_eq(&self, other: &Body) -> bool {
        Arc::ptr_eq(&self.stream, &other.stream)
    }

    /// Streams the remaining content as `http_body` frames of at most
    /// `chunk_size` bytes.
    pub fn frames(&self, chunk_size: usize) -> BodyFrames {
        BodyFrames { body: self.clone(), chunk_size: chunk_size.max(1), done: false }
    }
}

impl Default for Body {
    fn default() -> Self {
        Self::empty()
    }
}

impl PartialEq for Body {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl Eq for Body {}

impl fmt::Debug for Body {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.stream.try_lock() {
            Ok(stream) => f.debug_tuple("Body").field(&*stream).finish(),
            Err(_) => f.write_str("Body(<locked>)"),
        }
    }
}

/// Renders the whole stream, see [`ByteStream::text`].
impl fmt::Display for Body {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.lock().text())
    }
}

impl From<ByteStream> for Body {
    fn from(stream: ByteStream) -> Self {
        Self::new(stream)
    }
}

impl From<Bytes> for Body {
    fn from(bytes: Bytes) -> Self {
        Self::new(bytes.into())
    }
}

impl From<Vec<u8>> for Body {
    fn from(bytes: Vec<u8>) -> Self {
        Self::new(bytes.into())
    }
}

impl From<String> for Body {
    fn from(text: String) -> Self {
        Self::new(text.into())
    }
}

impl From<&str> for Body {
    fn from(text: &str) -> Self {
        Self::new(text.into())
    }
}

/// An [`http_body::Body`] reading a [`Body`] from its current position.
///
/// Reads are synchronous, every poll is immediately ready. Intended for
/// emitters that write a message out through an `http_body` based stack.
#[derive(Debug)]
pub struct BodyFrames {
    body: Body,
    chunk_size: usize,
    done: bool,
}

impl http_body::Body for BodyFrames {
    type Data = Bytes;
    type Error = StreamError;

    fn poll_frame(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        let this = self.get_mut();
        if this.done {
            return Poll::Ready(None);
        }

        let result = this.body.lock().read(this.chunk_size);
        match result {
            Ok(bytes) if bytes.is_empty() => {
                this.done = true;
                Poll::Ready(None)
            }
            Ok(bytes) => Poll::Ready(Some(Ok(Frame::data(bytes)))),
            Err(e) => {
                this.done = true;
                Poll::Ready(Some(Err(e)))
            }
        }
    }

    fn is_end_stream(&self) -> bool {
        self.done
    }

    fn size_hint(&self) -> SizeHint {
        let mut stream = self.body.lock();
        if !stream.is_seekable() {
            return SizeHint::default();
        }
        match (stream.size(), stream.position()) {
            (Ok(Some(size)), Ok(position)) => SizeHint::with_exact(size.saturating_sub(position)),
            _ => SizeHint::default(),
        }
    }
}
