//! Cache Key Module
//!
//! Turns application keys into canonical store keys.

use std::fmt;

use serde_json::Value;

use crate::error::CacheError;

// == Cache Key ==
/// An application key: text, or an integer of any fixed width.
///
/// Integers of equal value produce the same canonical text whatever their
/// original width or signedness; text is used verbatim, so `"42"` and `42`
/// also meet in the store.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheKey {
    Text(String),
    Signed(i64),
    Unsigned(u64),
}

impl CacheKey {
    /// Canonical text of the key, without prefix.
    pub fn to_key_string(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheKey::Text(s) => f.write_str(s),
            CacheKey::Signed(n) => write!(f, "{n}"),
            CacheKey::Unsigned(n) => write!(f, "{n}"),
        }
    }
}

impl From<&str> for CacheKey {
    fn from(s: &str) -> Self {
        CacheKey::Text(s.to_string())
    }
}

impl From<String> for CacheKey {
    fn from(s: String) -> Self {
        CacheKey::Text(s)
    }
}

impl From<&String> for CacheKey {
    fn from(s: &String) -> Self {
        CacheKey::Text(s.clone())
    }
}

macro_rules! impl_from_signed {
    ($($t:ty),*) => {
        $(impl From<$t> for CacheKey {
            fn from(n: $t) -> Self {
                CacheKey::Signed(n as i64)
            }
        })*
    };
}

macro_rules! impl_from_unsigned {
    ($($t:ty),*) => {
        $(impl From<$t> for CacheKey {
            fn from(n: $t) -> Self {
                CacheKey::Unsigned(n as u64)
            }
        })*
    };
}

impl_from_signed!(i8, i16, i32, i64, isize);
impl_from_unsigned!(u8, u16, u32, u64, usize);

impl TryFrom<i128> for CacheKey {
    type Error = CacheError;

    fn try_from(n: i128) -> Result<Self, Self::Error> {
        i64::try_from(n)
            .map(CacheKey::Signed)
            .or_else(|_| u64::try_from(n).map(CacheKey::Unsigned))
            .map_err(|_| CacheError::InvalidKeyKind(format!("i128 out of range: {n}")))
    }
}

impl TryFrom<u128> for CacheKey {
    type Error = CacheError;

    fn try_from(n: u128) -> Result<Self, Self::Error> {
        u64::try_from(n)
            .map(CacheKey::Unsigned)
            .map_err(|_| CacheError::InvalidKeyKind(format!("u128 out of range: {n}")))
    }
}

impl TryFrom<&Value> for CacheKey {
    type Error = CacheError;

    /// Accepts strings and integer numbers; everything else is rejected.
    fn try_from(value: &Value) -> Result<Self, Self::Error> {
        match value {
            Value::String(s) => Ok(CacheKey::Text(s.clone())),
            Value::Number(n) => {
                if let Some(u) = n.as_u64() {
                    Ok(CacheKey::Unsigned(u))
                } else if let Some(i) = n.as_i64() {
                    Ok(CacheKey::Signed(i))
                } else {
                    Err(CacheError::InvalidKeyKind(format!("float {n}")))
                }
            }
            Value::Null => Err(CacheError::InvalidKeyKind("null".to_string())),
            Value::Bool(_) => Err(CacheError::InvalidKeyKind("bool".to_string())),
            Value::Array(_) => Err(CacheError::InvalidKeyKind("array".to_string())),
            Value::Object(_) => Err(CacheError::InvalidKeyKind("object".to_string())),
        }
    }
}

impl TryFrom<Value> for CacheKey {
    type Error = CacheError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        CacheKey::try_from(&value)
    }
}

// == Normalization ==
/// `prefix.key`, or just `key` when the prefix is empty.
pub fn normalize(prefix: &str, key: &CacheKey) -> String {
    if prefix.is_empty() {
        key.to_key_string()
    } else {
        format!("{prefix}.{key}")
    }
}

/// Store namespaces use `.` where callers may write `/`.
pub fn normalize_namespace(namespace: &str) -> String {
    namespace.replace('/', ".")
}
