//! Parameter values.
//!
//! Every placeholder a statement emits is bound to one [`SqlValue`]. Values
//! reach the SQL text only through [`SqlValue::literal`], which is used for
//! the fixed terms of a join's ON clause.

use std::fmt::{self, Write as _};

/// A value bound to a `?` placeholder.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    /// SQL `NULL`.
    Null,
    /// Boolean, bound as MySQL `TINYINT(1)`.
    Bool(bool),
    /// Signed integer.
    Int(i64),
    /// Unsigned integer, for ids and `UNSIGNED` columns.
    UInt(u64),
    /// Floating point number.
    Float(f64),
    /// Text.
    Text(String),
    /// Binary data.
    Blob(Vec<u8>),
    /// JSON document, bound as its serialized text.
    Json(serde_json::Value),
}

impl SqlValue {
    /// MySQL literal for this value. Quotes and backslashes in text are
    /// escaped.
    #[must_use]
    pub fn literal(&self) -> String {
        match self {
            Self::Null => String::from("NULL"),
            Self::Bool(true) => String::from("TRUE"),
            Self::Bool(false) => String::from("FALSE"),
            Self::Int(_) | Self::UInt(_) | Self::Float(_) => self.to_string(),
            Self::Text(s) => quoted(s),
            Self::Json(doc) => quoted(&doc.to_string()),
            Self::Blob(bytes) => {
                let mut out = String::with_capacity(bytes.len() * 2 + 3);
                out.push_str("X'");
                for byte in bytes {
                    let _ = write!(out, "{byte:02X}");
                }
                out.push('\'');
                out
            }
        }
    }

    /// Returns true for [`SqlValue::Null`].
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }
}

fn quoted(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('\'');
    for c in s.chars() {
        match c {
            '\'' => out.push_str("''"),
            '\\' => out.push_str("\\\\"),
            c => out.push(c),
        }
    }
    out.push('\'');
    out
}

/// Raw form for debug rendering: unquoted and unescaped.
impl fmt::Display for SqlValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("NULL"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(n) => write!(f, "{n}"),
            Self::UInt(n) => write!(f, "{n}"),
            Self::Float(n) => write!(f, "{n}"),
            Self::Text(s) => f.write_str(s),
            Self::Json(doc) => write!(f, "{doc}"),
            Self::Blob(bytes) => bytes.iter().try_for_each(|b| write!(f, "{b:02X}")),
        }
    }
}

/// Conversion into a bound value.
pub trait ToSqlValue {
    /// Converts the value into a [`SqlValue`]. `None` becomes
    /// [`SqlValue::Null`].
    fn to_sql_value(self) -> SqlValue;
}

macro_rules! to_sql_value {
    ($variant:ident($target:ty): $($source:ty),+) => {
        $(
            impl ToSqlValue for $source {
                fn to_sql_value(self) -> SqlValue {
                    SqlValue::$variant(<$target>::from(self))
                }
            }
        )+
    };
}

to_sql_value!(Bool(bool): bool);
to_sql_value!(Int(i64): i8, i16, i32, i64);
to_sql_value!(UInt(u64): u8, u16, u32, u64);
to_sql_value!(Float(f64): f32, f64);
to_sql_value!(Text(String): String, &str);
to_sql_value!(Blob(Vec<u8>): Vec<u8>, &[u8]);
to_sql_value!(Json(serde_json::Value): serde_json::Value);

impl ToSqlValue for SqlValue {
    fn to_sql_value(self) -> SqlValue {
        self
    }
}

impl ToSqlValue for &String {
    fn to_sql_value(self) -> SqlValue {
        SqlValue::Text(self.clone())
    }
}

impl<T: ToSqlValue> ToSqlValue for Option<T> {
    fn to_sql_value(self) -> SqlValue {
        self.map_or(SqlValue::Null, ToSqlValue::to_sql_value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_literals() {
        assert_eq!(SqlValue::Null.literal(), "NULL");
        assert_eq!(SqlValue::Bool(false).literal(), "FALSE");
        assert_eq!(SqlValue::Int(-3).literal(), "-3");
        assert_eq!(SqlValue::UInt(42).literal(), "42");
        assert_eq!(SqlValue::Blob(vec![0xCA, 0xFE]).literal(), "X'CAFE'");
        assert_eq!(
            SqlValue::Json(serde_json::json!({"k": "v"})).literal(),
            r#"'{"k":"v"}'"#
        );
    }

    #[test]
    fn test_literal_escapes_quotes_and_backslashes() {
        assert_eq!("O'Brien".to_sql_value().literal(), "'O''Brien'");
        assert_eq!(r"C:\tmp".to_sql_value().literal(), r"'C:\\tmp'");
    }

    #[test]
    fn test_display_is_raw() {
        assert_eq!("it's".to_sql_value().to_string(), "it's");
        assert_eq!(SqlValue::Blob(vec![1, 255]).to_string(), "01FF");
        assert_eq!(SqlValue::Float(0.5).to_string(), "0.5");
    }

    #[test]
    fn test_conversions() {
        assert_eq!(7_i8.to_sql_value(), SqlValue::Int(7));
        assert_eq!(7_u16.to_sql_value(), SqlValue::UInt(7));
        assert_eq!(1.5_f32.to_sql_value(), SqlValue::Float(1.5));
        assert_eq!(String::from("x").to_sql_value(), SqlValue::Text(String::from("x")));
        assert_eq!(b"ab".as_slice().to_sql_value(), SqlValue::Blob(vec![b'a', b'b']));
        assert!(None::<i64>.to_sql_value().is_null());
        assert_eq!(Some(true).to_sql_value(), SqlValue::Bool(true));
    }
}
