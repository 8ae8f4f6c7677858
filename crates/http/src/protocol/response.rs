//! HTTP response message.

use http::StatusCode;

use crate::ensure;
use crate::protocol::message::sealed::Sealed;
use crate::protocol::{HttpMessage, InvalidArgument, Message};
use crate::utils::is_field_value;

/// A response: a [`Message`] with a status code and a reason phrase.
///
/// ```
/// use micro_message::protocol::{HttpMessage, Response};
///
/// let response = Response::new(404).unwrap().with_header("Content-Type", "text/plain").unwrap();
/// assert_eq!(response.status(), 404);
/// assert_eq!(response.reason_phrase(), "Not Found");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    message: Message,
    status: StatusCode,
    reason: String,
}

impl Response {
    /// A response with the canonical reason phrase of `status`.
    ///
    /// # Errors
    ///
    /// Fails unless `status` is within `100..=599`.
    pub fn new(status: u16) -> Result<Self, InvalidArgument> {
        Self::default().with_status(status, "")
    }

    pub fn status(&self) -> u16 {
        self.status.as_u16()
    }

    pub fn status_code(&self) -> StatusCode {
        self.status
    }

    /// May be empty for codes without a canonical phrase.
    pub fn reason_phrase(&self) -> &str {
        &self.reason
    }

    /// Sets the status and reason phrase. An empty `reason` selects the
    /// canonical phrase for `code`, if there is one.
    ///
    /// # Errors
    ///
    /// Fails when `code` is outside `100..=599` or when `reason` contains
    /// line breaks or control characters.
    pub fn with_status(mut self, code: u16, reason: &str) -> Result<Self, InvalidArgument> {
        ensure!((100..=599).contains(&code), InvalidArgument::StatusCode(code));
        let status = StatusCode::from_u16(code).ok().ok_or(InvalidArgument::StatusCode(code))?;
        ensure!(is_field_value(reason), InvalidArgument::ReasonPhrase(reason.to_string()));

        self.reason = match reason {
            "" => status.canonical_reason().unwrap_or_default().to_string(),
            reason => reason.to_string(),
        };
        self.status = status;
        Ok(self)
    }
}

impl Default for Response {
    fn default() -> Self {
        Self { message: Message::default(), status: StatusCode::OK, reason: "OK".to_string() }
    }
}

impl Sealed for Response {
    fn message(&self) -> &Message {
        &self.message
    }

    fn message_mut(&mut self) -> &mut Message {
        &mut self.message
    }
}

impl HttpMessage for Response {}

/// Converts a bodyless `http` crate response, keeping its header order.
impl TryFrom<http::Response<()>> for Response {
    type Error = InvalidArgument;

    fn try_from(value: http::Response<()>) -> Result<Self, Self::Error> {
        let (parts, ()) = value.into_parts();
        let mut response = Response::new(parts.status.as_u16())?;
        for (name, value) in &parts.headers {
            let value = value.to_str().map_err(|e| InvalidArgument::header_value(name, e))?;
            response = response.with_added_header(name.as_str(), value)?;
        }
        Ok(response)
    }
}
