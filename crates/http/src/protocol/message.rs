//! The immutable message base shared by requests and responses.
//!
//! A [`Message`] holds a protocol version, a [`Headers`] collection and a
//! [`Body`]. The header algebra is exposed through the [`HttpMessage`]
//! capability trait, implemented by every message type in this crate, so
//! consumers that only care about headers and bodies can stay generic.
//!
//! All transformations take the receiver by value and return the updated
//! value; clone first to keep the original around:
//!
//! ```
//! use micro_message::protocol::{HttpMessage, Message};
//!
//! let original = Message::default();
//! let updated = original.clone().with_header("X-Trace", "abc").unwrap();
//!
//! assert!(!original.has_header("x-trace"));
//! assert_eq!(updated.header_line("x-trace"), "abc");
//! ```

use http::Version;
use mime::Mime;

use crate::protocol::{Headers, IntoHeaderValues, InvalidArgument};
use crate::stream::Body;

/// Protocol version tokens a message may carry.
pub static SUPPORTED_VERSIONS: [(&str, Version); 3] =
    [("1.0", Version::HTTP_10), ("1.1", Version::HTTP_11), ("2", Version::HTTP_2)];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub(crate) version: Version,
    pub(crate) headers: Headers,
    pub(crate) body: Body,
}

impl Message {
    pub fn new(body: impl Into<Body>) -> Self {
        Self { version: Version::HTTP_11, headers: Headers::new(), body: body.into() }
    }
}

impl Default for Message {
    fn default() -> Self {
        Self::new(Body::empty())
    }
}

pub(crate) mod sealed {
    use crate::protocol::Message;

    pub trait Sealed {
        fn message(&self) -> &Message;

        fn message_mut(&mut self) -> &mut Message;
    }
}

/// Header-bearing and body-bearing capability of a message.
pub trait HttpMessage: sealed::Sealed + Sized {
    /// The protocol version token: `1.0`, `1.1` or `2`.
    fn protocol_version(&self) -> &'static str {
        let version = self.message().version;
        SUPPORTED_VERSIONS.iter().find(|(_, v)| *v == version).map_or("1.1", |(token, _)| *token)
    }

    fn version(&self) -> Version {
        self.message().version
    }

    /// # Errors
    ///
    /// Fails unless `version` is one of `1.0`, `1.1` or `2`.
    fn with_protocol_version(mut self, version: &str) -> Result<Self, InvalidArgument> {
        let (_, parsed) = SUPPORTED_VERSIONS
            .iter()
            .find(|(token, _)| *token == version)
            .ok_or_else(|| InvalidArgument::ProtocolVersion(version.to_string()))?;
        self.message_mut().version = *parsed;
        Ok(self)
    }

    fn headers(&self) -> &Headers {
        &self.message().headers
    }

    fn has_header(&self, name: &str) -> bool {
        self.message().headers.contains(name)
    }

    /// Values of a header in insertion order, empty when absent.
    fn header(&self, name: &str) -> &[String] {
        self.message().headers.get(name)
    }

    /// Values of a header joined by `,`, empty when absent.
    fn header_line(&self, name: &str) -> String {
        self.message().headers.line(name)
    }

    /// Replaces the header, whatever casing it was stored with.
    ///
    /// # Errors
    ///
    /// Fails when `name` is not a token, when no value is given, or when a
    /// value contains control characters or line breaks.
    fn with_header(mut self, name: &str, values: impl IntoHeaderValues) -> Result<Self, InvalidArgument> {
        self.message_mut().headers.set(name, values)?;
        Ok(self)
    }

    /// Appends values to the header, keeping its stored casing. Same as
    /// [`with_header`](HttpMessage::with_header) for a header not present.
    ///
    /// # Errors
    ///
    /// Same as [`with_header`](HttpMessage::with_header).
    fn with_added_header(mut self, name: &str, values: impl IntoHeaderValues) -> Result<Self, InvalidArgument> {
        self.message_mut().headers.append(name, values)?;
        Ok(self)
    }

    fn without_header(mut self, name: &str) -> Self {
        self.message_mut().headers.remove(name);
        self
    }

    fn body(&self) -> &Body {
        &self.message().body
    }

    fn with_body(mut self, body: impl Into<Body>) -> Self {
        self.message_mut().body = body.into();
        self
    }

    /// The `Content-Type` header parsed as a media type.
    fn content_type(&self) -> Option<Mime> {
        self.header("content-type").first().and_then(|value| value.parse().ok())
    }
}

impl sealed::Sealed for Message {
    fn message(&self) -> &Message {
        self
    }

    fn message_mut(&mut self) -> &mut Message {
        self
    }
}

impl HttpMessage for Message {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_message() {
        let message = Message::default();
        assert_eq!(message.protocol_version(), "1.1");
        assert!(message.headers().is_empty());
        assert_eq!(message.body().to_string(), "");
    }

    #[test]
    fn protocol_versions() {
        for token in ["1.0", "1.1", "2"] {
            let message = Message::default().with_protocol_version(token).unwrap();
            assert_eq!(message.protocol_version(), token);
        }
        assert_eq!(Message::default().with_protocol_version("2").unwrap().version(), Version::HTTP_2);

        for token in ["", "1", "2.0", "3", "HTTP/1.1", "1.1 "] {
            assert_eq!(
                Message::default().with_protocol_version(token),
                Err(InvalidArgument::ProtocolVersion(token.to_string()))
            );
        }
    }

    #[test]
    fn with_header_leaves_receiver_untouched() {
        let original = Message::default().with_header("X-Foo", "a").unwrap();
        let updated = original.clone().with_header("x-foo", "b").unwrap();

        assert_eq!(original.header("X-Foo"), ["a"]);
        assert_eq!(updated.header("X-Foo"), ["b"]);
        assert_eq!(updated.headers().original_name("x-foo"), Some("x-foo"));
    }

    #[test]
    fn with_header_then_header() {
        let message = Message::default().with_header("Accept", ["text/html", "application/json"]).unwrap();
        assert_eq!(message.header("accept"), ["text/html", "application/json"]);
        assert!(message.has_header("ACCEPT"));
        assert_eq!(message.header_line("Accept"), "text/html,application/json");
    }

    #[test]
    fn added_header_on_fresh_name_equals_with_header() {
        let body = Body::empty();
        let added = Message::new(body.clone()).with_added_header("X-Foo", ["a", "b"]).unwrap();
        let set = Message::new(body).with_header("X-Foo", ["a", "b"]).unwrap();
        assert_eq!(added, set);
    }

    #[test]
    fn added_header_concatenates() {
        let message = Message::default().with_header("X-Foo", ["a", "b"]).unwrap();
        let message = message.with_added_header("x-foo", "c").unwrap();
        assert_eq!(message.header("X-Foo"), ["a", "b", "c"]);

        let names: Vec<_> = message.headers().iter().map(|(name, _)| name).collect();
        assert_eq!(names, ["X-Foo"]);
    }

    #[test]
    fn without_absent_header_is_unchanged() {
        let message = Message::default().with_header("X-Foo", "a").unwrap();
        assert_eq!(message.clone().without_header("X-Bar"), message);
        assert_eq!(message.header_line("X-Bar"), "");
        assert!(message.header("X-Bar").is_empty());
    }

    #[test]
    fn without_header_any_casing() {
        let message = Message::default().with_header("X-Foo", "a").unwrap().without_header("x-FOO");
        assert!(!message.has_header("X-Foo"));
        assert!(message.headers().original_name("x-foo").is_none());
    }

    #[test]
    fn invalid_header_leaves_no_trace() {
        let message = Message::default();
        assert!(matches!(message.clone().with_header("Bad Name", "v"), Err(InvalidArgument::HeaderName { .. })));
        assert!(matches!(message.clone().with_header("X-Foo", "a\nb"), Err(InvalidArgument::HeaderValue { .. })));
        let no_values = message.with_added_header("X-Foo", Vec::<&str>::new());
        assert!(matches!(no_values, Err(InvalidArgument::HeaderValue { .. })));
    }

    #[test]
    fn with_body_replaces_stream() {
        let message = Message::default();
        let updated = message.clone().with_body("payload");
        assert_ne!(message.body(), updated.body());
        assert_eq!(updated.body().to_string(), "payload");
    }

    #[test]
    fn content_type() {
        let message = Message::default().with_header("Content-Type", "application/json; charset=utf-8").unwrap();
        let mime = message.content_type().unwrap();
        assert_eq!(mime.essence_str(), "application/json");
        assert_eq!(mime.get_param(mime::CHARSET), Some(mime::UTF_8));

        assert!(Message::default().content_type().is_none());
    }
}
