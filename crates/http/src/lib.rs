//! An immutable HTTP message value model
//!
//! This crate provides requests, responses, their headers, URIs and body
//! streams as plain values that HTTP-processing code (servers, middleware,
//! clients) can pass around without tying itself to a transport. Parsing
//! bytes off the wire and writing them back is left to the transport; this
//! crate starts from already split header fields, request lines and open
//! byte handles.
//!
//! # Features
//!
//! - Immutable `with_*` transformations that return new values
//! - Case-insensitive, casing-preserving, insertion-ordered headers
//! - Header name and value validation following RFC 7230
//! - URI parsing, normalization and rendering following RFC 3986
//! - Byte streams over files, memory and pipes with an explicit lifecycle
//! - Conversion from `httparse` and `http` request heads
//! - Bodies exposed as `http_body::Body` frames for streaming emitters
//!
//! # Example
//!
//! ```
//! use micro_message::protocol::{HttpMessage, HttpRequest, IncomingRequest, Request};
//! use micro_message::uri::Uri;
//!
//! let mut headers = [httparse::EMPTY_HEADER; 16];
//! let mut parsed = httparse::Request::new(&mut headers);
//! let head = b"POST /users?active=1 HTTP/1.1\r\nHost: example.com\r\nContent-Type: application/json\r\n\r\n";
//! parsed.parse(head).unwrap();
//!
//! let request = Request::try_from(parsed).unwrap().with_body(r#"{"name":"micro"}"#);
//! let request = IncomingRequest::from(request).with_attribute("request_id", 7u64);
//!
//! assert_eq!(request.method(), "POST");
//! assert_eq!(request.uri().map(Uri::host), Some("example.com"));
//! assert_eq!(request.query_params()["active"], "1");
//! assert_eq!(request.content_type(), Some(mime::APPLICATION_JSON));
//! assert_eq!(request.body().to_string(), r#"{"name":"micro"}"#);
//! ```
//!
//! # Architecture
//!
//! The crate is organized into three modules:
//!
//! - [`stream`]: [`ByteStream`](stream::ByteStream) and the shared
//!   [`Body`](stream::Body) handle messages keep on it
//! - [`uri`]: the [`Uri`](uri::Uri) value and its percent-encoding rules
//! - [`protocol`]: headers, messages, requests, responses, uploaded files
//!   and the error types
//!
//! # Error Handling
//!
//! - [`protocol::InvalidArgument`]: a value violates a grammar or domain rule
//! - [`protocol::StreamError`]: a stream is detached, lacks a capability, or
//!   the underlying I/O failed
//! - [`protocol::HttpError`]: top-level error type wrapping both
//!
//! # Limitations
//!
//! - Stream I/O is synchronous, bodies are meant to be small or already
//!   buffered by the transport
//! - Only the `http` and `https` schemes (or none) are accepted in URIs
//! - Protocol versions are limited to 1.0, 1.1 and 2

pub mod protocol;
pub mod stream;
pub mod uri;

mod utils;
pub(crate) use utils::ensure;
