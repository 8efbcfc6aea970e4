//! Dynamic values carried across the frame boundary.

use std::collections::BTreeMap;
use std::fmt;

/// A value produced by the player runtime.
///
/// Mirrors what a script can hand to `console.log` or throw, including the
/// kinds that plain JSON loses (`undefined`, non-finite numbers, dates,
/// regular expressions, errors, functions, symbols, maps, sets and cycles).
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    #[default]
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    Array(Vec<Value>),
    Object(BTreeMap<String, Value>),
    /// Milliseconds since the Unix epoch.
    Date(f64),
    RegExp {
        source: String,
        flags: String,
    },
    Error {
        name: String,
        message: String,
        stack: Option<String>,
    },
    Function {
        name: String,
    },
    Symbol {
        description: Option<String>,
    },
    Map(Vec<(Value, Value)>),
    Set(Vec<Value>),
    /// Back-reference to an enclosing value.
    Circular,
}

impl Value {
    /// Look up a key on an object value.
    pub fn get(&self, key: &str) -> Option<&Value> {
        match self {
            Self::Object(map) => map.get(key),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Self::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn is_undefined(&self) -> bool {
        matches!(self, Self::Undefined)
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    fn fmt_inspect(&self, f: &mut fmt::Formatter<'_>, nested: bool) -> fmt::Result {
        match self {
            Self::Undefined => f.write_str("undefined"),
            Self::Null => f.write_str("null"),
            Self::Bool(b) => write!(f, "{}", b),
            Self::Number(n) => fmt_number(*n, f),
            Self::String(s) if nested => write!(f, "'{}'", s.replace('\'', "\\'")),
            Self::String(s) => f.write_str(s),
            Self::Array(items) => {
                if items.is_empty() {
                    return f.write_str("[]");
                }
                f.write_str("[ ")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    item.fmt_inspect(f, true)?;
                }
                f.write_str(" ]")
            }
            Self::Object(map) => {
                if map.is_empty() {
                    return f.write_str("{}");
                }
                f.write_str("{ ")?;
                for (i, (key, value)) in map.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    if is_identifier(key) {
                        write!(f, "{}: ", key)?;
                    } else {
                        write!(f, "'{}': ", key)?;
                    }
                    value.fmt_inspect(f, true)?;
                }
                f.write_str(" }")
            }
            Self::Date(ms) => {
                f.write_str("Date(")?;
                fmt_number(*ms, f)?;
                f.write_str(")")
            }
            Self::RegExp { source, flags } => write!(f, "/{}/{}", source, flags),
            Self::Error { name, message, .. } if message.is_empty() => f.write_str(name),
            Self::Error { name, message, .. } => write!(f, "{}: {}", name, message),
            Self::Function { name } if name.is_empty() => f.write_str("[Function (anonymous)]"),
            Self::Function { name } => write!(f, "[Function: {}]", name),
            Self::Symbol { description } => {
                write!(f, "Symbol({})", description.as_deref().unwrap_or_default())
            }
            Self::Map(entries) => {
                write!(f, "Map({})", entries.len())?;
                if entries.is_empty() {
                    return f.write_str(" {}");
                }
                f.write_str(" { ")?;
                for (i, (key, value)) in entries.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    key.fmt_inspect(f, true)?;
                    f.write_str(" => ")?;
                    value.fmt_inspect(f, true)?;
                }
                f.write_str(" }")
            }
            Self::Set(values) => {
                write!(f, "Set({})", values.len())?;
                if values.is_empty() {
                    return f.write_str(" {}");
                }
                f.write_str(" { ")?;
                for (i, value) in values.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    value.fmt_inspect(f, true)?;
                }
                f.write_str(" }")
            }
            Self::Circular => f.write_str("[Circular]"),
        }
    }
}

/// Renders the value the way a browser console prints a single argument.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fmt_inspect(f, false)
    }
}

/// Join console arguments the way `console.log(a, b, c)` prints them.
pub fn format_args(values: &[Value]) -> String {
    values
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" ")
}

fn fmt_number(n: f64, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    if n.is_nan() {
        f.write_str("NaN")
    } else if n == f64::INFINITY {
        f.write_str("Infinity")
    } else if n == f64::NEG_INFINITY {
        f.write_str("-Infinity")
    } else if n != 0.0 && (n.abs() >= 1e21 || n.abs() < 1e-6) {
        let formatted = format!("{:e}", n);
        match formatted.split_once('e') {
            Some((mantissa, exponent)) if !exponent.starts_with('-') => {
                write!(f, "{}e+{}", mantissa, exponent)
            }
            _ => f.write_str(&formatted),
        }
    } else {
        write!(f, "{}", n)
    }
}

fn is_identifier(key: &str) -> bool {
    let mut chars = key.chars();
    match chars.next() {
        Some(c) if c.is_alphabetic() || c == '_' || c == '$' => {}
        _ => return false,
    }
    chars.all(|c| c.is_alphanumeric() || c == '_' || c == '$')
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Self::Array(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_special_numbers() {
        assert_eq!(Value::Number(f64::NAN).to_string(), "NaN");
        assert_eq!(Value::Number(f64::INFINITY).to_string(), "Infinity");
        assert_eq!(Value::Number(f64::NEG_INFINITY).to_string(), "-Infinity");
        assert_eq!(Value::Number(-0.0).to_string(), "-0");
        assert_eq!(Value::Number(42.0).to_string(), "42");
        assert_eq!(Value::Number(1.5).to_string(), "1.5");
    }

    #[test]
    fn test_display_exponent_numbers() {
        assert_eq!(Value::Number(1e21).to_string(), "1e+21");
        assert_eq!(Value::Number(-2.5e30).to_string(), "-2.5e+30");
        assert_eq!(Value::Number(1.5e-7).to_string(), "1.5e-7");
        assert_eq!(Value::Number(1e20).to_string(), "100000000000000000000");
        assert_eq!(Value::Number(0.000001).to_string(), "0.000001");
    }

    #[test]
    fn test_display_nested_strings_are_quoted() {
        let value = Value::Array(vec![Value::from("a"), Value::Undefined, Value::Null]);
        assert_eq!(value.to_string(), "[ 'a', undefined, null ]");
        assert_eq!(Value::from("top").to_string(), "top");
    }

    #[test]
    fn test_display_object_keys() {
        let mut map = BTreeMap::new();
        map.insert("a".to_string(), Value::Number(1.0));
        map.insert("b-c".to_string(), Value::Bool(true));
        assert_eq!(Value::Object(map).to_string(), "{ a: 1, 'b-c': true }");
    }

    #[test]
    fn test_display_runtime_kinds() {
        let err = Value::Error {
            name: "TypeError".to_string(),
            message: "x is not a function".to_string(),
            stack: None,
        };
        assert_eq!(err.to_string(), "TypeError: x is not a function");
        assert_eq!(
            Value::Function { name: String::new() }.to_string(),
            "[Function (anonymous)]"
        );
        assert_eq!(
            Value::Set(vec![Value::Number(1.0)]).to_string(),
            "Set(1) { 1 }"
        );
        assert_eq!(Value::Map(vec![]).to_string(), "Map(0) {}");
    }

    #[test]
    fn test_format_args() {
        let args = vec![Value::from("count:"), Value::Number(3.0), Value::from("x")];
        assert_eq!(format_args(&args), "count: 3 x");
    }
}
