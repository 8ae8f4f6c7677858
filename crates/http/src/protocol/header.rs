//! Header collection with case-insensitive lookup and case-preserving storage.
//!
//! Header names are matched without regard to ASCII case (RFC 7230 section
//! 3.2), but the casing a header was first set with is what gets emitted.
//! [`Headers`] keeps two maps in lockstep:
//!
//! - a casing index from the lower-cased name to the original name
//! - an insertion-ordered map from the original name to its values

use std::collections::HashMap;

use indexmap::IndexMap;

use crate::ensure;
use crate::protocol::InvalidArgument;
use crate::utils::{is_field_value, is_token};

/// Ordered multi-valued header map, see the [module docs](self).
///
/// Two collections are equal when they hold the same names, casings and
/// values in the same order.
#[derive(Debug, Clone, Default)]
pub struct Headers {
    names: HashMap<String, String>,
    values: IndexMap<String, Vec<String>>,
}

impl Headers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of distinct header names.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Case-insensitive membership test.
    pub fn contains(&self, name: &str) -> bool {
        self.names.contains_key(&name.to_ascii_lowercase())
    }

    /// Returns the values of a header, empty when absent.
    pub fn get(&self, name: &str) -> &[String] {
        self.original_name(name).and_then(|original| self.values.get(original)).map(Vec::as_slice).unwrap_or_default()
    }

    /// Returns the values of a header joined by `,`, empty when absent.
    pub fn line(&self, name: &str) -> String {
        self.get(name).join(",")
    }

    /// Returns the casing a header is stored under.
    pub fn original_name(&self, name: &str) -> Option<&str> {
        self.names.get(&name.to_ascii_lowercase()).map(String::as_str)
    }

    /// Iterates headers in insertion order, with their original casing.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.values.iter().map(|(name, values)| (name.as_str(), values.as_slice()))
    }

    /// Replaces any header matching `name`; the new casing wins and the
    /// header moves to the end.
    pub(crate) fn set(&mut self, name: &str, values: impl IntoHeaderValues) -> Result<(), InvalidArgument> {
        let values = validate(name, values)?;
        self.remove(name);
        self.names.insert(name.to_ascii_lowercase(), name.to_string());
        self.values.insert(name.to_string(), values);
        Ok(())
    }

    /// Like [`set`](Headers::set), but places the header first.
    pub(crate) fn set_first(&mut self, name: &str, values: impl IntoHeaderValues) -> Result<(), InvalidArgument> {
        let values = validate(name, values)?;
        self.remove(name);
        self.names.insert(name.to_ascii_lowercase(), name.to_string());
        self.values.shift_insert(0, name.to_string(), values);
        Ok(())
    }

    /// Appends values to a header, keeping the casing already on record.
    pub(crate) fn append(&mut self, name: &str, values: impl IntoHeaderValues) -> Result<(), InvalidArgument> {
        let values = validate(name, values)?;
        match self.names.get(&name.to_ascii_lowercase()) {
            Some(original) => {
                self.values.entry(original.clone()).or_default().extend(values);
            }
            None => {
                self.names.insert(name.to_ascii_lowercase(), name.to_string());
                self.values.insert(name.to_string(), values);
            }
        }
        Ok(())
    }

    /// Removes a header and its casing entry, returns false if absent.
    pub(crate) fn remove(&mut self, name: &str) -> bool {
        match self.names.remove(&name.to_ascii_lowercase()) {
            Some(original) => {
                self.values.shift_remove(&original);
                true
            }
            None => false,
        }
    }
}

impl PartialEq for Headers {
    fn eq(&self, other: &Self) -> bool {
        self.values.iter().eq(other.values.iter())
    }
}

impl Eq for Headers {}

impl<'a> IntoIterator for &'a Headers {
    type Item = (&'a String, &'a Vec<String>);
    type IntoIter = indexmap::map::Iter<'a, String, Vec<String>>;

    fn into_iter(self) -> Self::IntoIter {
        self.values.iter()
    }
}

fn validate(name: &str, values: impl IntoHeaderValues) -> Result<Vec<String>, InvalidArgument> {
    ensure!(is_token(name), InvalidArgument::header_name(name));

    let values = values.into_header_values();
    ensure!(!values.is_empty(), InvalidArgument::header_value(name, "at least one value is required"));

    values
        .into_iter()
        .map(|value| {
            let value = value.trim_matches([' ', '\t']);
            ensure!(
                is_field_value(value),
                InvalidArgument::header_value(name, format!("{value:?} contains control characters"))
            );
            Ok(value.to_string())
        })
        .collect()
}

/// A single header value: a string or a number.
pub trait ToHeaderValue {
    fn to_header_value(&self) -> String;
}

/// One or more header values.
///
/// Implemented for strings, numbers and collections of them. Any other type
/// is rejected at compile time.
pub trait IntoHeaderValues {
    fn into_header_values(self) -> Vec<String>;
}

macro_rules! impl_header_value {
    ($($ty:ty),* $(,)?) => {
        $(
            impl ToHeaderValue for $ty {
                fn to_header_value(&self) -> String {
                    self.to_string()
                }
            }

            impl IntoHeaderValues for $ty {
                fn into_header_values(self) -> Vec<String> {
                    vec![self.to_header_value()]
                }
            }
        )*
    };
}

impl_header_value!(&str, String, &String, i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize, f32, f64);

impl<T: ToHeaderValue> IntoHeaderValues for Vec<T> {
    fn into_header_values(self) -> Vec<String> {
        self.iter().map(ToHeaderValue::to_header_value).collect()
    }
}

impl<T: ToHeaderValue> IntoHeaderValues for &[T] {
    fn into_header_values(self) -> Vec<String> {
        self.iter().map(ToHeaderValue::to_header_value).collect()
    }
}

impl<T: ToHeaderValue, const N: usize> IntoHeaderValues for [T; N] {
    fn into_header_values(self) -> Vec<String> {
        self.iter().map(ToHeaderValue::to_header_value).collect()
    }
}
