//! HTTP message value types.
//!
//! Every message is an immutable value: the `with_*` transformations take the
//! message by value and hand back the updated one. Messages are built by
//! composition rather than inheritance:
//!
//! - [`Message`]: protocol version, [`Headers`] and body
//! - [`Request`]: a message plus method, [`Uri`](crate::uri::Uri) and
//!   request-target
//! - [`IncomingRequest`]: a request plus server params, cookies, query params,
//!   parsed body, [`UploadedFiles`] and attributes
//! - [`Response`]: a message plus status code and reason phrase
//!
//! Capabilities are exposed through two sealed traits so that code can be
//! generic over what it needs:
//!
//! - [`HttpMessage`]: headers, body and protocol version, implemented by all
//!   message types
//! - [`HttpRequest`]: method, URI and request-target, implemented by
//!   [`Request`] and [`IncomingRequest`]
//!
//! Invalid input is rejected with [`InvalidArgument`] at the offending call,
//! stream failures surface as [`StreamError`], and [`HttpError`] unifies both.

mod error;
pub use error::HttpError;
pub use error::InvalidArgument;
pub use error::StreamError;

mod header;
pub use header::Headers;
pub use header::IntoHeaderValues;
pub use header::ToHeaderValue;

mod message;
pub use message::HttpMessage;
pub use message::Message;
pub use message::SUPPORTED_VERSIONS;

mod request;
pub use request::HttpRequest;
pub use request::Request;

mod response;
pub use response::Response;

mod upload;
pub use upload::UploadStatus;
pub use upload::UploadedFile;
pub use upload::UploadedFiles;

mod server_request;
pub use server_request::IncomingRequest;
pub use server_request::Params;
pub use server_request::ParsedBody;
