use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum HttpError {
    #[error("invalid argument: {source}")]
    InvalidArgument {
        #[from]
        source: InvalidArgument,
    },

    #[error("stream error: {source}")]
    Stream {
        #[from]
        source: StreamError,
    },
}

/// A caller supplied value violates a documented grammar or domain constraint.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InvalidArgument {
    #[error("invalid http protocol version: {0:?}")]
    ProtocolVersion(String),

    #[error("invalid header name: {name:?}")]
    HeaderName { name: String },

    #[error("invalid value for header {name}: {reason}")]
    HeaderValue { name: String, reason: String },

    #[error("invalid http method: {0:?}")]
    Method(String),

    #[error("invalid request target {0:?}: whitespace is not allowed")]
    RequestTarget(String),

    #[error("unsupported uri scheme: {0:?}")]
    Scheme(String),

    #[error("invalid port {0}: must be between 1 and 65535")]
    Port(String),

    #[error("invalid uri path {0:?}: must not contain a query string or fragment")]
    Path(String),

    #[error("invalid uri {uri:?}: {reason}")]
    Uri { uri: String, reason: String },

    #[error("invalid parsed body: {reason}")]
    ParsedBody { reason: String },

    #[error("invalid uploaded file at {path}: {reason}")]
    UploadedFile { path: String, reason: String },

    #[error("invalid status code {0}: must be between 100 and 599")]
    StatusCode(u16),

    #[error("invalid reason phrase {0:?}")]
    ReasonPhrase(String),

    #[error("invalid stream mode {0:?}")]
    StreamMode(String),
}

impl InvalidArgument {
    pub fn header_name<S: ToString>(name: S) -> Self {
        Self::HeaderName { name: name.to_string() }
    }

    pub fn header_value<N: ToString, R: ToString>(name: N, reason: R) -> Self {
        Self::HeaderValue { name: name.to_string(), reason: reason.to_string() }
    }

    pub fn uri<U: ToString, R: ToString>(uri: U, reason: R) -> Self {
        Self::Uri { uri: uri.to_string(), reason: reason.to_string() }
    }

    pub fn parsed_body<S: ToString>(reason: S) -> Self {
        Self::ParsedBody { reason: reason.to_string() }
    }

    pub fn uploaded_file<P: ToString, R: ToString>(path: P, reason: R) -> Self {
        Self::UploadedFile { path: path.to_string(), reason: reason.to_string() }
    }
}

/// An I/O-shaped failure raised by a [`ByteStream`](crate::stream::ByteStream).
#[derive(Error, Debug)]
pub enum StreamError {
    #[error("stream is detached")]
    Detached,

    #[error("stream is not seekable")]
    Unseekable,

    #[error("stream is not readable")]
    Unreadable,

    #[error("stream is not writable")]
    Unwritable,

    #[error("io error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },
}

impl StreamError {
    /// Returns true if the stream had been closed or detached.
    pub fn is_detached(&self) -> bool {
        matches!(self, StreamError::Detached)
    }
}
