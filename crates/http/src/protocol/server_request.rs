//! Server-side view of a request.
//!
//! [`IncomingRequest`] wraps a [`Request`] with what the server learned while
//! receiving it: environment parameters, cookies, query parameters, the
//! parsed body, uploaded files, and attributes that processing stages use to
//! hand computed state to each other.

use std::any::Any;
use std::borrow::Cow;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use crate::protocol::message::sealed::Sealed as MessageSealed;
use crate::protocol::request::sealed::Sealed as RequestSealed;
use crate::protocol::{HttpMessage, HttpRequest, InvalidArgument, Message, Request, UploadedFiles};
use crate::uri::Uri;

/// Ordered string parameters: server params, cookies and query params.
pub type Params = IndexMap<String, String>;

type Attribute = Arc<dyn Any + Send + Sync>;

/// The shapes a parsed request body may take.
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedBody {
    Array(Vec<Value>),
    Object(serde_json::Map<String, Value>),
}

impl ParsedBody {
    /// Deserializes the body into a typed value.
    ///
    /// # Errors
    ///
    /// Fails when the body does not match the shape of `T`.
    pub fn deserialize<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        T::deserialize(Value::from(self.clone()))
    }
}

impl From<ParsedBody> for Value {
    fn from(body: ParsedBody) -> Self {
        match body {
            ParsedBody::Array(items) => Value::Array(items),
            ParsedBody::Object(fields) => Value::Object(fields),
        }
    }
}

/// A request as received by a server.
///
/// ```
/// use micro_message::protocol::{HttpRequest, IncomingRequest};
/// use micro_message::uri::Uri;
///
/// let uri = Uri::parse("http://example.com/search?q=rust&page=2").unwrap();
/// let request = IncomingRequest::new("GET", Some(uri), [("REMOTE_ADDR", "127.0.0.1")]).unwrap()
///     .with_attribute("user_id", 42u64);
///
/// assert_eq!(request.query_params()["q"], "rust");
/// assert_eq!(request.attribute::<u64>("user_id"), Some(&42));
/// assert_eq!(request.server_params()["REMOTE_ADDR"], "127.0.0.1");
/// ```
#[derive(Clone, Default)]
pub struct IncomingRequest {
    request: Request,
    server_params: Params,
    cookie_params: Params,
    query_params: Option<Params>,
    parsed_body: Option<ParsedBody>,
    uploaded_files: UploadedFiles,
    attributes: HashMap<String, Attribute>,
}

impl IncomingRequest {
    /// # Errors
    ///
    /// Same as [`Request::new`].
    pub fn new<K, V>(
        method: &str,
        uri: Option<Uri>,
        server_params: impl IntoIterator<Item = (K, V)>,
    ) -> Result<Self, InvalidArgument>
    where
        K: Into<String>,
        V: Into<String>,
    {
        Ok(Self::from_request(Request::new(method, uri)?, server_params))
    }

    pub fn from_request<K, V>(request: Request, server_params: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self { request, server_params: collect_params(server_params), ..Self::default() }
    }

    /// The underlying request, without the server-side context.
    pub fn into_request(self) -> Request {
        self.request
    }

    pub fn server_params(&self) -> &Params {
        &self.server_params
    }

    pub fn cookie_params(&self) -> &Params {
        &self.cookie_params
    }

    /// Replaces all cookies.
    #[must_use]
    pub fn with_cookie_params<K, V>(mut self, cookies: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.cookie_params = collect_params(cookies);
        self
    }

    /// Query parameters set with [`with_query_params`](Self::with_query_params),
    /// or else the ones decoded from the URI query string.
    pub fn query_params(&self) -> Cow<'_, Params> {
        if let Some(params) = &self.query_params {
            return Cow::Borrowed(params);
        }

        let query = self.uri().map(Uri::query).unwrap_or_default();
        match serde_urlencoded::from_str::<Vec<(String, String)>>(query) {
            Ok(pairs) => Cow::Owned(pairs.into_iter().collect()),
            Err(e) => {
                debug!(query, cause = %e, "undecodable query string, using no query params");
                Cow::Owned(Params::new())
            }
        }
    }

    /// Replaces all query parameters. The URI is left untouched.
    #[must_use]
    pub fn with_query_params<K, V>(mut self, params: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.query_params = Some(collect_params(params));
        self
    }

    pub fn uploaded_files(&self) -> &UploadedFiles {
        &self.uploaded_files
    }

    /// Replaces the uploaded-file tree.
    ///
    /// # Errors
    ///
    /// Fails on the first leaf that doesn't honor the
    /// [`UploadedFile`](crate::protocol::UploadedFile) contract.
    pub fn with_uploaded_files(mut self, files: UploadedFiles) -> Result<Self, InvalidArgument> {
        files.validate()?;
        self.uploaded_files = files;
        Ok(self)
    }

    pub fn parsed_body(&self) -> Option<&ParsedBody> {
        self.parsed_body.as_ref()
    }

    /// Replaces the parsed body. `None` and JSON `null` clear it.
    ///
    /// # Errors
    ///
    /// Fails unless `data` is an array, an object or absent.
    pub fn with_parsed_body(mut self, data: Option<Value>) -> Result<Self, InvalidArgument> {
        self.parsed_body = match data {
            None | Some(Value::Null) => None,
            Some(Value::Array(items)) => Some(ParsedBody::Array(items)),
            Some(Value::Object(fields)) => Some(ParsedBody::Object(fields)),
            Some(other) => {
                let reason = format!("expected an array, an object or nothing, got {other}");
                return Err(InvalidArgument::parsed_body(reason));
            }
        };
        Ok(self)
    }

    /// Typed lookup of an attribute; `None` when absent or of another type.
    pub fn attribute<T: Any>(&self, name: &str) -> Option<&T> {
        self.attributes.get(name).and_then(|value| value.downcast_ref())
    }

    pub fn attribute_or<'a, T: Any>(&'a self, name: &str, default: &'a T) -> &'a T {
        self.attribute(name).unwrap_or(default)
    }

    pub fn has_attribute(&self, name: &str) -> bool {
        self.attributes.contains_key(name)
    }

    pub fn attribute_names(&self) -> impl Iterator<Item = &str> {
        self.attributes.keys().map(String::as_str)
    }

    #[must_use]
    pub fn with_attribute<T: Any + Send + Sync>(mut self, name: &str, value: T) -> Self {
        self.attributes.insert(name.to_string(), Arc::new(value));
        self
    }

    #[must_use]
    pub fn without_attribute(mut self, name: &str) -> Self {
        self.attributes.remove(name);
        self
    }
}

fn collect_params<K: Into<String>, V: Into<String>>(params: impl IntoIterator<Item = (K, V)>) -> Params {
    params.into_iter().map(|(k, v)| (k.into(), v.into())).collect()
}

impl From<Request> for IncomingRequest {
    fn from(request: Request) -> Self {
        Self::from_request(request, Params::new())
    }
}

impl fmt::Debug for IncomingRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut attributes: Vec<_> = self.attributes.keys().collect();
        attributes.sort();

        f.debug_struct("IncomingRequest")
            .field("request", &self.request)
            .field("server_params", &self.server_params)
            .field("cookie_params", &self.cookie_params)
            .field("query_params", &self.query_params)
            .field("parsed_body", &self.parsed_body)
            .field("uploaded_files", &self.uploaded_files)
            .field("attributes", &attributes)
            .finish()
    }
}

impl MessageSealed for IncomingRequest {
    fn message(&self) -> &Message {
        self.request.message()
    }

    fn message_mut(&mut self) -> &mut Message {
        self.request.message_mut()
    }
}

impl RequestSealed for IncomingRequest {
    fn request(&self) -> &Request {
        &self.request
    }

    fn request_mut(&mut self) -> &mut Request {
        &mut self.request
    }
}

impl HttpMessage for IncomingRequest {}

impl HttpRequest for IncomingRequest {}

#[cfg(test)]
mod tests {
    use indexmap::IndexMap;
    use serde::Deserialize;
    use serde_json::json;

    use super::*;
    use crate::protocol::UploadStatus;
    use crate::protocol::upload::tests::FakeUpload;

    fn request(uri: &str) -> IncomingRequest {
        IncomingRequest::new("GET", Some(Uri::parse(uri).unwrap()), [("SERVER_NAME", "example.com")]).unwrap()
    }

    #[test]
    fn server_params_are_kept() {
        let request = request("http://example.com/");
        assert_eq!(request.server_params().get("SERVER_NAME").map(String::as_str), Some("example.com"));
        assert!(request.cookie_params().is_empty());
        assert!(request.parsed_body().is_none());
        assert_eq!(request.uploaded_files().file_count(), 0);
    }

    #[test]
    fn shares_request_algebra() {
        let request = request("http://example.com:8080/a?b=1").with_header("Accept", "*/*").unwrap();
        assert_eq!(request.header_line("host"), "example.com:8080");
        assert_eq!(request.request_target(), "/a?b=1");

        let request = request.with_method("POST").unwrap();
        assert_eq!(request.method().as_str(), "POST");
        assert_eq!(request.server_params().len(), 1);
        assert_eq!(request.into_request().header_line("accept"), "*/*");
    }

    #[test]
    fn cookies_are_replaced_wholesale() {
        let original = request("http://example.com/").with_cookie_params([("a", "1"), ("b", "2")]);
        let replaced = original.clone().with_cookie_params([("c", "3")]);

        assert_eq!(original.cookie_params().len(), 2);
        assert_eq!(replaced.cookie_params().keys().collect::<Vec<_>>(), ["c"]);
    }

    #[test]
    fn query_params_from_uri() {
        let request = request("http://example.com/?name=J%C3%BCrgen&tag=a+b&empty=");
        let params = request.query_params();
        assert!(matches!(params, Cow::Owned(_)));
        assert_eq!(params["name"], "J\u{fc}rgen");
        assert_eq!(params["tag"], "a b");
        assert_eq!(params["empty"], "");
    }

    #[test]
    fn explicit_query_params_win() {
        let request = request("http://example.com/?from=uri").with_query_params([("from", "explicit")]);
        assert_eq!(request.query_params()["from"], "explicit");
        assert!(matches!(request.query_params(), Cow::Borrowed(_)));
        assert_eq!(request.uri().unwrap().query(), "from=uri");

        let cleared = request.with_query_params(Vec::<(String, String)>::new());
        assert!(cleared.query_params().is_empty());
    }

    #[test]
    fn no_uri_no_query_params() {
        assert!(IncomingRequest::default().query_params().is_empty());
    }

    #[test]
    fn parsed_body_shapes() {
        let request = request("http://example.com/");

        let with_object = request.clone().with_parsed_body(Some(json!({"name": "micro"}))).unwrap();
        assert!(matches!(with_object.parsed_body(), Some(ParsedBody::Object(fields)) if fields["name"] == "micro"));

        let with_array = request.clone().with_parsed_body(Some(json!([1, 2]))).unwrap();
        assert_eq!(with_array.parsed_body(), Some(&ParsedBody::Array(vec![json!(1), json!(2)])));

        assert!(with_array.clone().with_parsed_body(None).unwrap().parsed_body().is_none());
        assert!(with_array.with_parsed_body(Some(Value::Null)).unwrap().parsed_body().is_none());

        for scalar in [json!("text"), json!(1), json!(true)] {
            assert!(matches!(request.clone().with_parsed_body(Some(scalar)), Err(InvalidArgument::ParsedBody { .. })));
        }
    }

    #[test]
    fn typed_parsed_body() {
        #[derive(Deserialize)]
        struct Login {
            user: String,
            remember: bool,
        }

        let body = json!({"user": "ann", "remember": true});
        let request = request("http://example.com/").with_parsed_body(Some(body)).unwrap();
        let login: Login = request.parsed_body().unwrap().deserialize().unwrap();
        assert_eq!(login.user, "ann");
        assert!(login.remember);
    }

    #[test]
    fn uploaded_files() {
        let files = UploadedFiles::Map(IndexMap::from([
            ("avatar".to_string(), UploadedFiles::file(FakeUpload::ok("png"))),
            ("missing".to_string(), UploadedFiles::file(FakeUpload::failed(UploadStatus::NoFile))),
        ]));

        let request = request("http://example.com/").with_uploaded_files(files).unwrap();
        assert_eq!(request.uploaded_files().file_count(), 2);

        let bad = UploadedFiles::List(vec![UploadedFiles::file(FakeUpload::without_size("x"))]);
        let error = request.clone().with_uploaded_files(bad).unwrap_err();
        assert!(matches!(error, InvalidArgument::UploadedFile { path, .. } if path == "0"));
        assert_eq!(request.uploaded_files().file_count(), 2);
    }

    #[test]
    fn attributes() {
        let original = request("http://example.com/");
        let request = original.clone().with_attribute("user_id", 7u32).with_attribute("role", "admin".to_string());

        assert_eq!(request.attribute::<u32>("user_id"), Some(&7));
        assert_eq!(request.attribute::<String>("role").map(String::as_str), Some("admin"));
        assert_eq!(request.attribute::<u64>("user_id"), None);
        assert_eq!(request.attribute_or("missing", &0u32), &0);
        assert!(request.has_attribute("role"));
        assert!(!original.has_attribute("role"));

        let mut names: Vec<_> = request.attribute_names().collect();
        names.sort_unstable();
        assert_eq!(names, ["role", "user_id"]);

        let request = request.without_attribute("role").without_attribute("unknown");
        assert!(!request.has_attribute("role"));
        assert_eq!(request.attribute::<u32>("user_id"), Some(&7));
    }

    #[test]
    fn debug_lists_attribute_names() {
        let request = IncomingRequest::default().with_attribute("b", 1).with_attribute("a", 2);
        let debug = format!("{request:?}");
        assert!(debug.contains(r#"attributes: ["a", "b"]"#), "{debug}");
    }
}
