//! HTTP request message.
//!
//! [`Request`] extends [`Message`] with a method, a target [`Uri`] and an
//! optional request-target override. The [`HttpRequest`] capability trait
//! carries the request algebra so that [`IncomingRequest`] shares it.
//!
//! [`IncomingRequest`]: crate::protocol::IncomingRequest

use http::Method;
use http::uri::Authority;
use tracing::trace;

use crate::ensure;
use crate::protocol::message::sealed::Sealed as MessageSealed;
use crate::protocol::{HttpMessage, InvalidArgument, Message};
use crate::uri::Uri;

/// Represents an outgoing or parsed HTTP request.
///
/// A request built with a host-bearing [`Uri`] carries a matching `Host`
/// header:
///
/// ```
/// use micro_message::protocol::{HttpMessage, HttpRequest, Request};
/// use micro_message::uri::Uri;
///
/// let request = Request::new("GET", Some(Uri::parse("http://example.com:8080/x?y=1").unwrap())).unwrap();
/// assert_eq!(request.header_line("host"), "example.com:8080");
/// assert_eq!(request.request_target(), "/x?y=1");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    message: Message,
    method: Method,
    uri: Option<Uri>,
    request_target: Option<String>,
}

impl Request {
    /// # Errors
    ///
    /// Fails when `method` is not a method token, or when the URI host can't
    /// be used as a `Host` header value.
    pub fn new(method: &str, uri: Option<Uri>) -> Result<Self, InvalidArgument> {
        let request =
            Self { message: Message::default(), method: parse_method(method)?, uri: None, request_target: None };
        match uri {
            Some(uri) => request.with_uri(uri, false),
            None => Ok(request),
        }
    }

    /// Replaces every `Host` header by `host[:port]` of the current URI.
    fn sync_host(&mut self) -> Result<(), InvalidArgument> {
        let Some(uri) = &self.uri else {
            return Ok(());
        };
        if uri.host().is_empty() {
            return Ok(());
        }

        let host = match uri.port() {
            Some(port) => format!("{}:{}", uri.host(), port),
            None => uri.host().to_string(),
        };
        self.message.headers.set_first("Host", host)
    }
}

impl Default for Request {
    fn default() -> Self {
        Self { message: Message::default(), method: Method::GET, uri: None, request_target: None }
    }
}

fn parse_method(method: &str) -> Result<Method, InvalidArgument> {
    Method::from_bytes(method.as_bytes()).ok().ok_or_else(|| InvalidArgument::Method(method.to_string()))
}

pub(crate) mod sealed {
    use crate::protocol::Request;

    pub trait Sealed {
        fn request(&self) -> &Request;

        fn request_mut(&mut self) -> &mut Request;
    }
}

/// URI-bearing capability of a request.
pub trait HttpRequest: HttpMessage + sealed::Sealed {
    /// The method, with its casing preserved.
    fn method(&self) -> &Method {
        &self.request().method
    }

    /// # Errors
    ///
    /// Fails unless `method` is a non-empty HTTP token.
    fn with_method(mut self, method: &str) -> Result<Self, InvalidArgument> {
        self.request_mut().method = parse_method(method)?;
        Ok(self)
    }

    fn uri(&self) -> Option<&Uri> {
        self.request().uri.as_ref()
    }

    /// Replaces the URI and synchronizes the `Host` header with it.
    ///
    /// The `Host` header is left untouched when the new URI has no host, or
    /// when `preserve_host` is set and a `Host` header is already present.
    ///
    /// # Errors
    ///
    /// Fails when the URI host can't be used as a `Host` header value.
    fn with_uri(mut self, uri: Uri, preserve_host: bool) -> Result<Self, InvalidArgument> {
        let keep_host = preserve_host && self.has_header("host");
        let request = self.request_mut();
        request.uri = Some(uri);
        if !keep_host {
            request.sync_host()?;
        }
        Ok(self)
    }

    /// The request-target for the request line.
    ///
    /// Without an explicit override this is the URI path and query,
    /// defaulting to `/`.
    fn request_target(&self) -> String {
        let request = self.request();
        if let Some(target) = &request.request_target {
            return target.clone();
        }

        let Some(uri) = &request.uri else {
            return "/".to_string();
        };

        let mut target = if uri.path().is_empty() { "/".to_string() } else { uri.path().to_string() };
        if !uri.query().is_empty() {
            target.push('?');
            target.push_str(uri.query());
        }
        target
    }

    /// Overrides the request-target, e.g. with `*` or an authority-form target.
    ///
    /// # Errors
    ///
    /// Fails when `target` contains whitespace.
    fn with_request_target(mut self, target: &str) -> Result<Self, InvalidArgument> {
        ensure!(!target.contains(char::is_whitespace), InvalidArgument::RequestTarget(target.to_string()));
        self.request_mut().request_target = Some(target.to_string());
        Ok(self)
    }
}

impl MessageSealed for Request {
    fn message(&self) -> &Message {
        &self.message
    }

    fn message_mut(&mut self) -> &mut Message {
        &mut self.message
    }
}

impl sealed::Sealed for Request {
    fn request(&self) -> &Request {
        self
    }

    fn request_mut(&mut self) -> &mut Request {
        self
    }
}

impl HttpMessage for Request {}

impl HttpRequest for Request {}

/// Builds a request from the fields of an already parsed request head.
///
/// - origin-form (`/path?query`) targets become the path and query of the
///   URI, absolute-form targets are parsed as a whole; a missing authority
///   is taken from the `Host` header
/// - asterisk-form and authority-form targets become the request-target
///   override and leave the URI empty
/// - header fields are added in wire order, repeated names accumulate
impl<'headers, 'buf> TryFrom<httparse::Request<'headers, 'buf>> for Request {
    type Error = InvalidArgument;

    fn try_from(req: httparse::Request<'headers, 'buf>) -> Result<Self, Self::Error> {
        let method = req.method.ok_or_else(|| InvalidArgument::Method(String::new()))?;
        let target = req.path.ok_or_else(|| InvalidArgument::RequestTarget(String::new()))?;
        let version = match req.version {
            Some(0) => "1.0",
            Some(1) => "1.1",
            // httparse only understands HTTP/1.x
            other => return Err(InvalidArgument::ProtocolVersion(format!("{other:?}"))),
        };

        let mut request = Request::new(method, None)?.with_protocol_version(version)?;
        for header in req.headers.iter() {
            let value =
                std::str::from_utf8(header.value).map_err(|e| InvalidArgument::header_value(header.name, e))?;
            request = request.with_added_header(header.name, value)?;
        }

        let uri = if target.starts_with('/') {
            let (path, query) = target.split_once('?').unwrap_or((target, ""));
            Some(Uri::default().with_path(path)?.with_query(query))
        } else if target.contains("://") {
            Some(Uri::parse(target)?)
        } else {
            None
        };

        request = match uri {
            Some(uri) if uri.host().is_empty() => {
                let uri = authority_from_host(uri, &request)?;
                request.with_uri(uri, true)?
            }
            Some(uri) => request.with_uri(uri, true)?,
            None => request.with_request_target(target)?,
        };

        trace!(method, target, header_count = req.headers.len(), "converted parsed request");
        Ok(request)
    }
}

/// Fills host and port of `uri` from the `Host` header, if there is one.
fn authority_from_host(uri: Uri, request: &Request) -> Result<Uri, InvalidArgument> {
    let Some(host) = request.header("host").first().filter(|host| !host.is_empty()) else {
        return Ok(uri);
    };

    let authority: Authority = host.parse().map_err(|e| InvalidArgument::header_value("Host", e))?;
    uri.with_host(authority.host()).with_port(authority.port_u16().map(u32::from))
}

/// Converts a bodyless `http` crate request, keeping its header order.
impl TryFrom<http::Request<()>> for Request {
    type Error = InvalidArgument;

    fn try_from(value: http::Request<()>) -> Result<Self, Self::Error> {
        let (parts, ()) = value.into_parts();
        let version = match parts.version {
            http::Version::HTTP_10 => "1.0",
            http::Version::HTTP_11 => "1.1",
            http::Version::HTTP_2 => "2",
            other => return Err(InvalidArgument::ProtocolVersion(format!("{other:?}"))),
        };

        let mut request = Request::new(parts.method.as_str(), None)?.with_protocol_version(version)?;
        for (name, value) in &parts.headers {
            let value = value.to_str().map_err(|e| InvalidArgument::header_value(name, e))?;
            request = request.with_added_header(name.as_str(), value)?;
        }
        request.with_uri(Uri::try_from(&parts.uri)?, true)
    }
}
