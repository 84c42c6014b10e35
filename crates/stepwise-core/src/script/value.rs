//! Runtime values of the block language.

use std::cmp::Ordering;
use std::fmt;

use serde::Serialize;

use super::error::ScriptError;

/// A value stored in the namespace or produced by an expression.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    /// The absent value, written `none`.
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl Value {
    /// Name of the value's kind, used in type errors.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::None => "none",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "str",
        }
    }

    /// Coerce this value to a boolean.
    pub fn truthy(&self) -> bool {
        match self {
            Value::None => false,
            Value::Bool(b) => *b,
            Value::Int(n) => *n != 0,
            Value::Float(n) => *n != 0.0 && !n.is_nan(),
            Value::Str(s) => !s.is_empty(),
        }
    }

    /// Numeric view of the value. Booleans count as 0 and 1.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            Value::Int(n) => Some(*n as f64),
            Value::Float(n) => Some(*n),
            _ => None,
        }
    }

    /// Integer view of the value, without truncating floats.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Bool(b) => Some(i64::from(*b)),
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }

    pub fn is_number(&self) -> bool {
        matches!(self, Value::Bool(_) | Value::Int(_) | Value::Float(_))
    }

    /// Order two values. Numbers compare across kinds, strings lexicographically.
    pub fn compare(&self, other: &Value) -> Result<Ordering, ScriptError> {
        match (self, other) {
            (Value::Str(a), Value::Str(b)) => Ok(a.cmp(b)),
            (a, b) if a.is_number() && b.is_number() => {
                if let (Some(x), Some(y)) = (a.as_i64(), b.as_i64()) {
                    return Ok(x.cmp(&y));
                }
                let (x, y) = (a.as_f64().unwrap_or(f64::NAN), b.as_f64().unwrap_or(f64::NAN));
                x.partial_cmp(&y)
                    .ok_or_else(|| ScriptError::Type("cannot order NaN".into()))
            }
            (a, b) => Err(ScriptError::Type(format!(
                "cannot compare {} with {}",
                a.type_name(),
                b.type_name()
            ))),
        }
    }

    /// Equality as the `==` operator sees it: numbers compare by value.
    pub fn loose_eq(&self, other: &Value) -> bool {
        if self.is_number() && other.is_number() {
            return matches!(self.compare(other), Ok(Ordering::Equal));
        }
        self == other
    }
}

/// Integral floats keep one decimal (`32.0`) so they stay distinguishable from ints.
fn format_float(n: f64) -> String {
    if n.is_nan() {
        "nan".to_string()
    } else if n.is_infinite() {
        if n > 0.0 { "inf" } else { "-inf" }.to_string()
    } else if n == n.trunc() && n.abs() < 1e16 {
        format!("{:.1}", n)
    } else {
        format!("{}", n)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::None => write!(f, "none"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(n) => write!(f, "{}", n),
            Value::Float(n) => write!(f, "{}", format_float(*n)),
            Value::Str(s) => write!(f, "{}", s),
        }
    }
}

impl Default for Value {
    fn default() -> Self {
        Value::None
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Float(n)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_integral_float_keeps_decimal() {
        assert_eq!(Value::Float(32.0).to_string(), "32.0");
        assert_eq!(Value::Float(31.2).to_string(), "31.2");
        assert_eq!(Value::Float(-0.5).to_string(), "-0.5");
    }

    #[test]
    fn test_display_other_kinds() {
        assert_eq!(Value::Int(9).to_string(), "9");
        assert_eq!(Value::Bool(true).to_string(), "true");
        assert_eq!(Value::None.to_string(), "none");
        assert_eq!(Value::from("text").to_string(), "text");
        assert_eq!(Value::Float(f64::INFINITY).to_string(), "inf");
    }

    #[test]
    fn test_compare_mixed_numbers() {
        assert_eq!(Value::Int(3).compare(&Value::Float(3.5)), Ok(Ordering::Less));
        assert!(Value::Int(2).loose_eq(&Value::Float(2.0)));
        assert!(!Value::Int(2).loose_eq(&Value::from("2")));
    }

    #[test]
    fn test_compare_incompatible_kinds() {
        let err = Value::from("a").compare(&Value::Int(1)).unwrap_err();
        assert!(matches!(err, ScriptError::Type(_)));
    }

    #[test]
    fn test_truthiness() {
        assert!(!Value::None.truthy());
        assert!(!Value::Int(0).truthy());
        assert!(Value::from("x").truthy());
        assert!(!Value::from("").truthy());
    }
}
