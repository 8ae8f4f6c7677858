//! Byte streams carried as message bodies.
//!
//! - [`ByteStream`]: owns an I/O handle and exposes read/write/seek with an
//!   explicit open/closed lifecycle
//! - [`AccessMode`]: fopen-style mode string the capabilities are derived from
//! - [`Body`]: the shared handle a message keeps on its stream
//! - [`BodyFrames`]: `http_body::Body` adapter for streaming a body out

mod body;
mod byte_stream;
mod mode;

pub use body::Body;
pub use body::BodyFrames;
pub use body::DEFAULT_FRAME_SIZE;
pub use byte_stream::ByteStream;
pub use byte_stream::Handle;
pub use byte_stream::Pipe;
pub use byte_stream::StreamMetadata;
pub use mode::AccessMode;
