//! Percent-encoding of URI components (RFC 3986 section 2.1).
//!
//! Characters outside a component's allowed set are encoded as UTF-8
//! `%XX` triplets. A `%` that already starts a valid triplet is kept, so
//! normalizing a normalized component is a no-op.

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};

/// `unreserved / sub-delims`
const USER_INFO: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~')
    .remove(b'!')
    .remove(b'$')
    .remove(b'&')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')')
    .remove(b'*')
    .remove(b'+')
    .remove(b',')
    .remove(b';')
    .remove(b'=');

/// `pchar / "/"`
const PATH: &AsciiSet = &USER_INFO.remove(b':').remove(b'@').remove(b'/');

/// `pchar / "/" / "?"`, shared by query and fragment.
const QUERY: &AsciiSet = &PATH.remove(b'?');

pub(crate) fn encode_user_info(input: &str) -> String {
    encode(input, USER_INFO)
}

/// Also encodes `:` in the first segment of a rootless path, which would
/// otherwise render as a scheme.
pub(crate) fn encode_path(input: &str) -> String {
    let encoded = encode(input, PATH);
    if encoded.starts_with('/') {
        return encoded;
    }

    let end = encoded.find('/').unwrap_or(encoded.len());
    if !encoded[..end].contains(':') {
        return encoded;
    }
    let mut output = encoded[..end].replace(':', "%3A");
    output.push_str(&encoded[end..]);
    output
}

pub(crate) fn encode_query(input: &str) -> String {
    encode(input, QUERY)
}

fn encode(input: &str, set: &'static AsciiSet) -> String {
    let bytes = input.as_bytes();
    let mut output = String::with_capacity(input.len());

    let mut start = 0;
    let mut i = 0;
    while i < bytes.len() {
        if is_pct_encoded(&bytes[i..]) {
            output.extend(utf8_percent_encode(&input[start..i], set));
            output.push_str(&input[i..i + 3]);
            i += 3;
            start = i;
        } else {
            i += 1;
        }
    }
    output.extend(utf8_percent_encode(&input[start..], set));
    output
}

#[inline]
fn is_pct_encoded(bytes: &[u8]) -> bool {
    matches!(bytes, [b'%', hi, lo, ..] if hi.is_ascii_hexdigit() && lo.is_ascii_hexdigit())
}
