use std::collections::HashMap;

use derive_more::From;
use serde::{Deserialize, Serialize};

/// User attributes supplied by the caller at evaluation time.
///
/// Keys are attribute names. The context is never persisted by the core.
///
/// # Examples
/// ```
/// # use abby_core::{UserContext, AttributeValue};
/// let context = [
///     ("age".to_owned(), 30.0.into()),
///     ("is_premium_member".to_owned(), true.into()),
///     ("username".to_owned(), "john_doe".into()),
/// ].into_iter().collect::<UserContext>();
/// ```
pub type UserContext = HashMap<String, AttributeValue>;

/// Possible values of a user attribute.
///
/// Conveniently implements `From` conversions for `String`, `&str`, `f64`, and `bool` types.
#[derive(Debug, Serialize, Deserialize, PartialEq, PartialOrd, From, Clone)]
#[serde(untagged)]
pub enum AttributeValue {
    /// A string value.
    String(String),
    /// A numerical value.
    Number(f64),
    /// A boolean value.
    Boolean(bool),
    /// A null value or absence of value.
    Null,
}

impl AttributeValue {
    /// Returns the string value, if this is a string attribute.
    pub fn as_str(&self) -> Option<&str> {
        if let AttributeValue::String(s) = self {
            Some(s.as_str())
        } else {
            None
        }
    }

    /// Returns the numeric value, if this is a number attribute.
    pub fn as_number(&self) -> Option<f64> {
        if let AttributeValue::Number(n) = self {
            Some(*n)
        } else {
            None
        }
    }
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_owned())
    }
}
