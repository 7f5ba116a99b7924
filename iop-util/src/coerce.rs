// Copyright (c) Facebook, Inc. and its affiliates.
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// A loosely typed value as found in benchmark logs.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Int(i64),
    Float(f64),
    Str(String),
}

impl Default for Value {
    fn default() -> Self {
        Self::Null
    }
}

impl Value {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(v) => Some(*v as f64),
            Self::Float(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            Self::Float(v) if v.fract() == 0.0 => Some(*v as i64),
            _ => None,
        }
    }

    /// Boolean-like flags are reported as "true"/"false" strings.
    pub fn is_true(&self) -> bool {
        match self {
            Self::Str(v) => v.trim().eq_ignore_ascii_case("true"),
            Self::Int(v) => *v != 0,
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Null => write!(f, "null"),
            Self::Int(v) => write!(f, "{}", v),
            Self::Float(v) => write!(f, "{}", v),
            Self::Str(v) => write!(f, "{}", v),
        }
    }
}

impl From<&serde_json::Value> for Value {
    /// Non-string JSON values keep their type. Strings are kept as-is,
    /// coercion is up to the caller.
    fn from(json: &serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Self::Null,
            serde_json::Value::Bool(v) => Self::Str(v.to_string()),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(v) => Self::Int(v),
                None => n.as_f64().map(Self::Float).unwrap_or(Self::Null),
            },
            serde_json::Value::String(v) => Self::Str(v.clone()),
            other => Self::Str(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
#[error("invalid number {input:?}")]
pub struct InvalidNumberError {
    pub input: String,
}

impl InvalidNumberError {
    fn new(input: &str) -> Self {
        Self {
            input: input.to_string(),
        }
    }
}

pub type Converter = fn(&str) -> Result<Value, InvalidNumberError>;

pub const INT_FLOAT: &[Converter] = &[to_int, to_float];
pub const INT_FLOAT_DECIMAL: &[Converter] = &[to_int, to_float, decimal_suffix];
pub const INT_FLOAT_BINARY: &[Converter] = &[to_int, to_float, binary_suffix];

lazy_static::lazy_static! {
    static ref DECIMAL_RE: Regex = Regex::new(r"^\s*([0-9.]+)\s*([TBMK])\s*$").unwrap();
    static ref BINARY_RE: Regex =
        Regex::new(r"^\s*([0-9.]+)\s*([PTGMKptgmk])i?[Bb]?\s*$").unwrap();
}

pub fn to_int(input: &str) -> Result<Value, InvalidNumberError> {
    input
        .trim()
        .parse::<i64>()
        .map(Value::Int)
        .map_err(|_| InvalidNumberError::new(input))
}

pub fn to_float(input: &str) -> Result<Value, InvalidNumberError> {
    input
        .trim()
        .parse::<f64>()
        .map(Value::Float)
        .map_err(|_| InvalidNumberError::new(input))
}

fn scale(input: &str, number: &str, mult: u64) -> Result<Value, InvalidNumberError> {
    match coerce(number, INT_FLOAT) {
        Value::Int(v) => v
            .checked_mul(mult as i64)
            .map(Value::Int)
            .ok_or_else(|| InvalidNumberError::new(input)),
        Value::Float(v) => Ok(Value::Float(v * mult as f64)),
        _ => Err(InvalidNumberError::new(input)),
    }
}

/// Parses "4K", "1.5M", "2B" and "3T" with power-of-1000 multipliers.
pub fn decimal_suffix(input: &str) -> Result<Value, InvalidNumberError> {
    let caps = DECIMAL_RE
        .captures(input)
        .ok_or_else(|| InvalidNumberError::new(input))?;
    let exp = match &caps[2] {
        "K" => 1,
        "M" => 2,
        "B" => 3,
        "T" => 4,
        _ => return Err(InvalidNumberError::new(input)),
    };
    scale(input, &caps[1], 1000u64.pow(exp))
}

/// Parses "4K", "2Mi", "16KiB", "1g" and friends with power-of-1024
/// multipliers.
pub fn binary_suffix(input: &str) -> Result<Value, InvalidNumberError> {
    let caps = BINARY_RE
        .captures(input)
        .ok_or_else(|| InvalidNumberError::new(input))?;
    let shift = match caps[2].to_ascii_uppercase().as_str() {
        "K" => 10,
        "M" => 20,
        "G" => 30,
        "T" => 40,
        "P" => 50,
        _ => return Err(InvalidNumberError::new(input)),
    };
    scale(input, &caps[1], 1u64 << shift)
}

/// Tries each converter in order and returns the first success. If none
/// succeeds, the input is returned unchanged as a string.
pub fn coerce(input: &str, attempts: &[Converter]) -> Value {
    for conv in attempts.iter() {
        if let Ok(v) = conv(input) {
            return v;
        }
    }
    Value::Str(input.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coerce() {
        for (input, attempts, expected) in &[
            ("4K", INT_FLOAT_DECIMAL, Value::Int(4000)),
            ("1.5M", INT_FLOAT_DECIMAL, Value::Float(1_500_000.0)),
            ("3B", INT_FLOAT_DECIMAL, Value::Int(3_000_000_000)),
            ("2T", INT_FLOAT_DECIMAL, Value::Int(2_000_000_000_000)),
            ("2Mi", INT_FLOAT_BINARY, Value::Int(2097152)),
            ("16KiB", INT_FLOAT_BINARY, Value::Int(16384)),
            ("1g", INT_FLOAT_BINARY, Value::Int(1 << 30)),
            ("42", INT_FLOAT, Value::Int(42)),
            (" 7 ", INT_FLOAT, Value::Int(7)),
            ("0.25", INT_FLOAT, Value::Float(0.25)),
            ("abc", INT_FLOAT, Value::Str("abc".into())),
            ("4K", INT_FLOAT, Value::Str("4K".into())),
            ("4X", INT_FLOAT_DECIMAL, Value::Str("4X".into())),
            ("", INT_FLOAT_DECIMAL, Value::Str("".into())),
        ] {
            assert_eq!(&coerce(input, attempts), expected, "input {:?}", input);
        }
    }

    #[test]
    fn test_suffix_errors() {
        assert_eq!(
            decimal_suffix("4G"),
            Err(InvalidNumberError { input: "4G".into() })
        );
        assert!(decimal_suffix("4Kx").is_err());
        assert!(decimal_suffix("1.2.3K").is_err());
        assert!(binary_suffix("4Q").is_err());
        assert!(binary_suffix("4KiBs").is_err());
    }

    #[test]
    fn test_value_accessors() {
        assert_eq!(Value::Int(3).as_f64(), Some(3.0));
        assert_eq!(Value::Float(3.0).as_i64(), Some(3));
        assert_eq!(Value::Float(3.5).as_i64(), None);
        assert_eq!(Value::Str("x".into()).as_f64(), None);
        assert!(Value::Str("true".into()).is_true());
        assert!(!Value::Str("false".into()).is_true());
    }

    #[test]
    fn test_from_json() {
        let json: serde_json::Value =
            serde_json::from_str(r#"{"a": 1, "b": 2.5, "c": "x", "d": true, "e": null}"#)
                .unwrap();
        assert_eq!(Value::from(&json["a"]), Value::Int(1));
        assert_eq!(Value::from(&json["b"]), Value::Float(2.5));
        assert_eq!(Value::from(&json["c"]), Value::Str("x".into()));
        assert_eq!(Value::from(&json["d"]), Value::Str("true".into()));
        assert_eq!(Value::from(&json["e"]), Value::Null);
    }
}
