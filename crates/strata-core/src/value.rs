//! Typed value codec
//!
//! Values are always stored as strings. A key may additionally carry a
//! declared type, in which case its string form is converted on demand:
//!
//! - `list`: comma separated, trimmed, `""` is the empty list
//! - `bool`: `yes/on/true/enabled/enable` and `no/off/false/disabled/disable`
//! - `size`: unsigned integer with an optional `k`, `M`, `G` or `T` suffix
//! - `sequence`: an ordered list spread over `key-<n>` slots, see [`crate::sequence`]

use serde::Serialize;
use std::fmt;
use std::str::FromStr;

use crate::error::ConversionError;

const TRUE_WORDS: &[&str] = &["yes", "on", "true", "enabled", "enable"];
const FALSE_WORDS: &[&str] = &["no", "off", "false", "disabled", "disable"];
const SIZE_SUFFIXES: &[char] = &['k', 'M', 'G', 'T'];

/// Declared type of a configuration key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TypeTag {
    Str,
    List,
    Bool,
    Size,
    Sequence,
}

impl TypeTag {
    /// Name used in typed aliases (`paths_list`) and descriptor files
    pub fn as_str(&self) -> &'static str {
        match self {
            TypeTag::Str => "str",
            TypeTag::List => "list",
            TypeTag::Bool => "bool",
            TypeTag::Size => "size",
            TypeTag::Sequence => "sequence",
        }
    }

    /// Types whose typed form is an ordered list of strings
    pub fn is_list_like(&self) -> bool {
        matches!(self, TypeTag::List | TypeTag::Sequence)
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TypeTag {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "str" => Ok(TypeTag::Str),
            "list" => Ok(TypeTag::List),
            "bool" => Ok(TypeTag::Bool),
            "size" => Ok(TypeTag::Size),
            "sequence" => Ok(TypeTag::Sequence),
            other => Err(ConversionError::UnknownType {
                name: other.to_string(),
            }),
        }
    }
}

/// A configuration value, either raw or in its typed form
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Str(String),
    List(Vec<String>),
    Bool(bool),
    Size(u64),
    Sequence(Vec<String>),
}

impl Value {
    pub fn type_tag(&self) -> TypeTag {
        match self {
            Value::Str(_) => TypeTag::Str,
            Value::List(_) => TypeTag::List,
            Value::Bool(_) => TypeTag::Bool,
            Value::Size(_) => TypeTag::Size,
            Value::Sequence(_) => TypeTag::Sequence,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Elements of a list or sequence value
    pub fn as_list(&self) -> Option<&[String]> {
        match self {
            Value::List(items) | Value::Sequence(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_size(&self) -> Option<u64> {
        match self {
            Value::Size(n) => Some(*n),
            _ => None,
        }
    }

    pub fn into_list(self) -> Option<Vec<String>> {
        match self {
            Value::List(items) | Value::Sequence(items) => Some(items),
            _ => None,
        }
    }

    /// Wrap a list of strings in the list-like variant matching `tag`
    pub fn list_of(tag: TypeTag, items: Vec<String>) -> Self {
        match tag {
            TypeTag::Sequence => Value::Sequence(items),
            _ => Value::List(items),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<u64> for Value {
    fn from(n: u64) -> Self {
        Value::Size(n)
    }
}

/// String <-> typed conversion for single-key types
pub trait Codec {
    type Typed;

    fn decode(raw: &str) -> Result<Self::Typed, ConversionError>;
    fn encode(value: &Self::Typed) -> String;
}

pub struct ListCodec;
pub struct BoolCodec;
pub struct SizeCodec;

impl Codec for ListCodec {
    type Typed = Vec<String>;

    fn decode(raw: &str) -> Result<Vec<String>, ConversionError> {
        let mut items: Vec<String> = raw.split(',').map(|s| s.trim().to_string()).collect();
        if items.last().is_some_and(|last| last.is_empty()) {
            items.pop();
        }
        Ok(items)
    }

    fn encode(value: &Vec<String>) -> String {
        value.join(", ")
    }
}

impl Codec for BoolCodec {
    type Typed = bool;

    fn decode(raw: &str) -> Result<bool, ConversionError> {
        let word = raw.trim().to_lowercase();
        if TRUE_WORDS.contains(&word.as_str()) {
            Ok(true)
        } else if FALSE_WORDS.contains(&word.as_str()) {
            Ok(false)
        } else {
            Err(ConversionError::StrToBool {
                value: raw.to_string(),
            })
        }
    }

    fn encode(value: &bool) -> String {
        let word = if *value { "yes" } else { "no" };
        word.to_string()
    }
}

impl Codec for SizeCodec {
    type Typed = u64;

    fn decode(raw: &str) -> Result<u64, ConversionError> {
        let bad = || ConversionError::StrToSize {
            value: raw.to_string(),
        };
        let (digits, exponent) = match raw.chars().last() {
            Some(c) if SIZE_SUFFIXES.contains(&c) => {
                let exponent = SIZE_SUFFIXES.iter().position(|s| *s == c).unwrap_or(0) + 1;
                (&raw[..raw.len() - 1], exponent as u32)
            }
            _ => (raw, 0),
        };
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(bad());
        }
        let mantissa: u64 = digits.parse().map_err(|_| bad())?;
        1024u64
            .checked_pow(exponent)
            .and_then(|factor| mantissa.checked_mul(factor))
            .ok_or_else(bad)
    }

    /// Largest suffix that keeps the mantissa an exact integer
    fn encode(value: &u64) -> String {
        let mut mantissa = *value;
        let mut suffix = None;
        for s in SIZE_SUFFIXES {
            if mantissa == 0 || mantissa % 1024 != 0 {
                break;
            }
            mantissa /= 1024;
            suffix = Some(*s);
        }
        match suffix {
            Some(s) => format!("{}{}", mantissa, s),
            None => mantissa.to_string(),
        }
    }
}

/// Convert `value` between its string form and a single-key typed form.
///
/// Exactly one of `from`/`to` must be [`TypeTag::Str`]. Sequences span
/// several keys and are converted with [`crate::sequence`] instead.
pub fn convert(from: TypeTag, to: TypeTag, value: &Value) -> Result<Value, ConversionError> {
    let bad_type = || ConversionError::BadType { from, to };
    if (from == TypeTag::Str) == (to == TypeTag::Str) || value.type_tag() != from {
        return Err(bad_type());
    }
    match (from, to, value) {
        (TypeTag::Str, TypeTag::List, Value::Str(s)) => ListCodec::decode(s).map(Value::List),
        (TypeTag::Str, TypeTag::Bool, Value::Str(s)) => BoolCodec::decode(s).map(Value::Bool),
        (TypeTag::Str, TypeTag::Size, Value::Str(s)) => SizeCodec::decode(s).map(Value::Size),
        (TypeTag::List, TypeTag::Str, Value::List(items)) => {
            Ok(Value::Str(ListCodec::encode(items)))
        }
        (TypeTag::Bool, TypeTag::Str, Value::Bool(b)) => Ok(Value::Str(BoolCodec::encode(b))),
        (TypeTag::Size, TypeTag::Str, Value::Size(n)) => Ok(Value::Str(SizeCodec::encode(n))),
        _ => Err(bad_type()),
    }
}
