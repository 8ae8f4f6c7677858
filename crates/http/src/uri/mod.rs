//! Immutable URI value (RFC 3986).
//!
//! A [`Uri`] is built either by [`Uri::parse`] or by chaining the `with_*`
//! builders on [`Uri::default`]. Every builder validates and normalizes
//! exactly one component and leaves the others untouched:
//!
//! - scheme and host are lower-cased, the scheme must be `http`, `https` or empty
//! - user-info, path, query and fragment are percent-encoded, keeping
//!   existing `%XX` triplets
//! - the port must be within `1..=65535`
//!
//! # Example
//!
//! ```
//! use micro_message::uri::Uri;
//!
//! let uri = Uri::default()
//!     .with_scheme("http").unwrap()
//!     .with_host("Example.com")
//!     .with_path("/a b").unwrap();
//!
//! assert_eq!(uri.to_string(), "http://example.com/a%20b");
//! ```

mod encode;
mod parse;

use std::fmt;
use std::str::FromStr;

use crate::ensure;
use crate::protocol::InvalidArgument;

/// Schemes a [`Uri`] accepts, with their standard port.
pub const SUPPORTED_SCHEMES: [(&str, Option<u16>); 3] = [("", None), ("http", Some(80)), ("https", Some(443))];

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Uri {
    scheme: String,
    user: String,
    password: String,
    host: String,
    port: Option<u16>,
    path: String,
    query: String,
    fragment: String,
}

impl Uri {
    /// Parses a URI reference and normalizes each component the way the
    /// corresponding `with_*` builder does.
    pub fn parse(input: &str) -> Result<Self, InvalidArgument> {
        let raw = parse::split(input)?;

        let mut uri = Uri::default().with_path(raw.path)?;
        if let Some(scheme) = raw.scheme {
            uri = uri.with_scheme(scheme)?;
        }
        if let Some(user_info) = raw.user_info {
            uri = match user_info.split_once(':') {
                Some((user, password)) => uri.with_user_info(user, Some(password)),
                None => uri.with_user_info(user_info, None),
            };
        }
        if let Some(host) = raw.host {
            uri = uri.with_host(host);
        }
        uri = uri.with_port(raw.port)?;
        if let Some(query) = raw.query {
            uri.query = encode::encode_query(query);
        }
        if let Some(fragment) = raw.fragment {
            uri.fragment = encode::encode_query(fragment);
        }
        Ok(uri)
    }

    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    /// `[user-info "@"] host [":" port]`, empty when there is no host.
    pub fn authority(&self) -> String {
        if self.host.is_empty() {
            return String::new();
        }

        let mut authority = String::new();
        let user_info = self.user_info();
        if !user_info.is_empty() {
            authority.push_str(&user_info);
            authority.push('@');
        }
        authority.push_str(&self.host);
        if let Some(port) = self.port() {
            authority.push(':');
            authority.push_str(&port.to_string());
        }
        authority
    }

    /// `user [":" password]`, empty when there is no user.
    pub fn user_info(&self) -> String {
        if self.user.is_empty() {
            String::new()
        } else if self.password.is_empty() {
            self.user.clone()
        } else {
            format!("{}:{}", self.user, self.password)
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    /// The port, or `None` when absent or standard for the scheme.
    pub fn port(&self) -> Option<u16> {
        self.port.filter(|port| !self.is_standard_port(*port))
    }

    fn is_standard_port(&self, port: u16) -> bool {
        SUPPORTED_SCHEMES.iter().any(|(scheme, standard)| *scheme == self.scheme && *standard == Some(port))
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn fragment(&self) -> &str {
        &self.fragment
    }

    /// Returns the value with the scheme replaced.
    ///
    /// # Errors
    ///
    /// Fails when the lower-cased scheme is not one of [`SUPPORTED_SCHEMES`].
    pub fn with_scheme(mut self, scheme: &str) -> Result<Self, InvalidArgument> {
        let scheme = scheme.to_ascii_lowercase();
        ensure!(
            SUPPORTED_SCHEMES.iter().any(|(supported, _)| *supported == scheme),
            InvalidArgument::Scheme(scheme)
        );
        self.scheme = scheme;
        Ok(self)
    }

    pub fn with_user_info(mut self, user: &str, password: Option<&str>) -> Self {
        self.user = encode::encode_user_info(user);
        self.password = password.map(encode::encode_user_info).unwrap_or_default();
        self
    }

    pub fn with_host(mut self, host: &str) -> Self {
        self.host = host.to_ascii_lowercase();
        self
    }

    /// Returns the value with the port replaced, `None` removes it.
    ///
    /// # Errors
    ///
    /// Fails for ports outside `1..=65535`.
    pub fn with_port(mut self, port: Option<u32>) -> Result<Self, InvalidArgument> {
        self.port = match port {
            None => None,
            Some(port) => {
                let valid = u16::try_from(port).ok().filter(|port| *port != 0);
                Some(valid.ok_or_else(|| InvalidArgument::Port(port.to_string()))?)
            }
        };
        Ok(self)
    }

    /// Returns the value with the path replaced.
    ///
    /// # Errors
    ///
    /// Fails when the path contains a literal `?` or `#`.
    pub fn with_path(mut self, path: &str) -> Result<Self, InvalidArgument> {
        ensure!(!path.contains(['?', '#']), InvalidArgument::Path(path.to_string()));
        self.path = encode::encode_path(path);
        Ok(self)
    }

    /// Returns the value with the query replaced, a leading `?` is dropped.
    pub fn with_query(mut self, query: &str) -> Self {
        self.query = encode::encode_query(query.strip_prefix('?').unwrap_or(query));
        self
    }

    /// Returns the value with the fragment replaced, a leading `#` is dropped.
    pub fn with_fragment(mut self, fragment: &str) -> Self {
        self.fragment = encode::encode_query(fragment.strip_prefix('#').unwrap_or(fragment));
        self
    }
}

impl fmt::Display for Uri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let authority = self.authority();

        if !self.scheme.is_empty() {
            write!(f, "{}:", self.scheme)?;
        }
        if !authority.is_empty() || self.scheme == "file" {
            write!(f, "//{authority}")?;
        }

        // keep the path from being read as an authority, or glued to one
        if !authority.is_empty() && !self.path.is_empty() && !self.path.starts_with('/') {
            write!(f, "/{}", self.path)?;
        } else if authority.is_empty() && self.path.starts_with("//") {
            write!(f, "/{}", self.path.trim_start_matches('/'))?;
        } else {
            f.write_str(&self.path)?;
        }

        if !self.query.is_empty() {
            write!(f, "?{}", self.query)?;
        }
        if !self.fragment.is_empty() {
            write!(f, "#{}", self.fragment)?;
        }
        Ok(())
    }
}

impl FromStr for Uri {
    type Err = InvalidArgument;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<&str> for Uri {
    type Error = InvalidArgument;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl TryFrom<String> for Uri {
    type Error = InvalidArgument;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl TryFrom<&http::Uri> for Uri {
    type Error = InvalidArgument;

    fn try_from(value: &http::Uri) -> Result<Self, Self::Error> {
        Self::parse(&value.to_string())
    }
}
