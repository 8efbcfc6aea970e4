//! Extended JSON codec.
//!
//! Plain JSON plus tagged objects for values JSON cannot represent. A tagged
//! object carries a `"__type"` key naming the kind:
//!
//! ```text
//! undefined            {"__type":"undefined"}
//! NaN / ±Infinity / -0 {"__type":"number","value":"NaN"}
//! Date                 {"__type":"date","value":1700000000000}
//! RegExp               {"__type":"regexp","source":"a+","flags":"g"}
//! Error                {"__type":"error","name":"TypeError","message":"..","stack":".."}
//! Function             {"__type":"function","name":"render"}
//! Symbol               {"__type":"symbol","description":"id"}
//! Map / Set            {"__type":"map","entries":[[k,v]]} / {"__type":"set","values":[..]}
//! cycle                {"__type":"circular"}
//! object with __type   {"__type":"object","value":{..}}
//! ```

mod value;

pub use value::{Value, format_args};

use std::collections::BTreeMap;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Number};

use crate::error::{Error, Result};

/// Key that marks a tagged object.
pub const TYPE_TAG: &str = "__type";

/// Largest integer an f64 holds exactly; integral numbers below it encode without a fraction.
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;

/// Decode extended JSON text.
pub fn parse(text: &str) -> Result<Value> {
    let json: serde_json::Value = serde_json::from_str(text)?;
    from_json(json)
}

/// Encode a value as extended JSON text.
pub fn stringify(value: &Value) -> String {
    to_json(value).to_string()
}

/// Lower a value into plain JSON.
pub fn to_json(value: &Value) -> serde_json::Value {
    use serde_json::Value as Json;

    match value {
        Value::Undefined => tagged("undefined", Map::new()),
        Value::Null => Json::Null,
        Value::Bool(b) => Json::Bool(*b),
        Value::Number(n) => number_to_json(*n),
        Value::String(s) => Json::String(s.clone()),
        Value::Array(items) => Json::Array(items.iter().map(to_json).collect()),
        Value::Object(map) => {
            let object: Map<String, Json> =
                map.iter().map(|(k, v)| (k.clone(), to_json(v))).collect();
            if map.contains_key(TYPE_TAG) {
                let mut fields = Map::new();
                fields.insert("value".to_string(), Json::Object(object));
                tagged("object", fields)
            } else {
                Json::Object(object)
            }
        }
        Value::Date(ms) => {
            let mut fields = Map::new();
            fields.insert("value".to_string(), number_to_json(*ms));
            tagged("date", fields)
        }
        Value::RegExp { source, flags } => {
            let mut fields = Map::new();
            fields.insert("source".to_string(), Json::String(source.clone()));
            fields.insert("flags".to_string(), Json::String(flags.clone()));
            tagged("regexp", fields)
        }
        Value::Error {
            name,
            message,
            stack,
        } => {
            let mut fields = Map::new();
            fields.insert("name".to_string(), Json::String(name.clone()));
            fields.insert("message".to_string(), Json::String(message.clone()));
            if let Some(stack) = stack {
                fields.insert("stack".to_string(), Json::String(stack.clone()));
            }
            tagged("error", fields)
        }
        Value::Function { name } => {
            let mut fields = Map::new();
            fields.insert("name".to_string(), Json::String(name.clone()));
            tagged("function", fields)
        }
        Value::Symbol { description } => {
            let mut fields = Map::new();
            if let Some(description) = description {
                fields.insert("description".to_string(), Json::String(description.clone()));
            }
            tagged("symbol", fields)
        }
        Value::Map(entries) => {
            let entries = entries
                .iter()
                .map(|(k, v)| Json::Array(vec![to_json(k), to_json(v)]))
                .collect();
            let mut fields = Map::new();
            fields.insert("entries".to_string(), Json::Array(entries));
            tagged("map", fields)
        }
        Value::Set(values) => {
            let mut fields = Map::new();
            fields.insert(
                "values".to_string(),
                Json::Array(values.iter().map(to_json).collect()),
            );
            tagged("set", fields)
        }
        Value::Circular => tagged("circular", Map::new()),
    }
}

/// Raise plain JSON into a value, reviving tagged objects.
pub fn from_json(json: serde_json::Value) -> Result<Value> {
    use serde_json::Value as Json;

    Ok(match json {
        Json::Null => Value::Null,
        Json::Bool(b) => Value::Bool(b),
        Json::Number(n) => Value::Number(n.as_f64().unwrap_or(f64::NAN)),
        Json::String(s) => Value::String(s),
        Json::Array(items) => Value::Array(
            items
                .into_iter()
                .map(from_json)
                .collect::<Result<Vec<_>>>()?,
        ),
        Json::Object(mut object) => match object.remove(TYPE_TAG) {
            None => Value::Object(plain_object(object)?),
            Some(Json::String(tag)) => revive(&tag, object)?,
            Some(other) => {
                return Err(Error::Codec(format!(
                    "type tag must be a string, got {}",
                    other
                )));
            }
        },
    })
}

fn revive(tag: &str, mut fields: Map<String, serde_json::Value>) -> Result<Value> {
    Ok(match tag {
        "undefined" => Value::Undefined,
        "circular" => Value::Circular,
        "number" => {
            let text = take_string(&mut fields, tag, "value")?;
            Value::Number(special_number(&text)?)
        }
        "date" => match fields.remove("value") {
            Some(json) => match from_json(json)? {
                Value::Number(ms) => Value::Date(ms),
                other => return Err(malformed(tag, &format!("non-numeric value {:?}", other))),
            },
            None => return Err(malformed(tag, "missing value")),
        },
        "regexp" => Value::RegExp {
            source: take_string(&mut fields, tag, "source")?,
            flags: take_optional_string(&mut fields, tag, "flags")?.unwrap_or_default(),
        },
        "error" => Value::Error {
            name: take_optional_string(&mut fields, tag, "name")?
                .unwrap_or_else(|| "Error".to_string()),
            message: take_optional_string(&mut fields, tag, "message")?.unwrap_or_default(),
            stack: take_optional_string(&mut fields, tag, "stack")?,
        },
        "function" => Value::Function {
            name: take_optional_string(&mut fields, tag, "name")?.unwrap_or_default(),
        },
        "symbol" => Value::Symbol {
            description: take_optional_string(&mut fields, tag, "description")?,
        },
        "map" => {
            let entries = take_array(&mut fields, tag, "entries")?;
            let mut pairs = Vec::with_capacity(entries.len());
            for entry in entries {
                match entry {
                    serde_json::Value::Array(pair) if pair.len() == 2 => {
                        let mut pair = pair.into_iter();
                        let (Some(key), Some(value)) = (pair.next(), pair.next()) else {
                            return Err(malformed(tag, "entry is not a pair"));
                        };
                        pairs.push((from_json(key)?, from_json(value)?));
                    }
                    _ => return Err(malformed(tag, "entry is not a pair")),
                }
            }
            Value::Map(pairs)
        }
        "set" => Value::Set(
            take_array(&mut fields, tag, "values")?
                .into_iter()
                .map(from_json)
                .collect::<Result<Vec<_>>>()?,
        ),
        "object" => match fields.remove("value") {
            Some(serde_json::Value::Object(object)) => Value::Object(plain_object(object)?),
            _ => return Err(malformed(tag, "value is not an object")),
        },
        unknown => return Err(Error::Codec(format!("unknown type tag '{}'", unknown))),
    })
}

fn plain_object(object: Map<String, serde_json::Value>) -> Result<BTreeMap<String, Value>> {
    object
        .into_iter()
        .map(|(k, v)| Ok((k, from_json(v)?)))
        .collect()
}

fn tagged(tag: &str, mut fields: Map<String, serde_json::Value>) -> serde_json::Value {
    fields.insert(TYPE_TAG.to_string(), serde_json::Value::String(tag.to_string()));
    serde_json::Value::Object(fields)
}

fn number_to_json(n: f64) -> serde_json::Value {
    let special = if n.is_nan() {
        Some("NaN")
    } else if n == f64::INFINITY {
        Some("Infinity")
    } else if n == f64::NEG_INFINITY {
        Some("-Infinity")
    } else if n == 0.0 && n.is_sign_negative() {
        Some("-0")
    } else {
        None
    };

    if let Some(text) = special {
        let mut fields = Map::new();
        fields.insert("value".to_string(), serde_json::Value::String(text.to_string()));
        return tagged("number", fields);
    }

    if n.fract() == 0.0 && n.abs() <= MAX_SAFE_INTEGER {
        return serde_json::Value::Number(Number::from(n as i64));
    }

    // Finite by construction, so from_f64 always succeeds.
    Number::from_f64(n)
        .map(serde_json::Value::Number)
        .unwrap_or(serde_json::Value::Null)
}

fn special_number(text: &str) -> Result<f64> {
    match text {
        "NaN" => Ok(f64::NAN),
        "Infinity" => Ok(f64::INFINITY),
        "-Infinity" => Ok(f64::NEG_INFINITY),
        "-0" => Ok(-0.0),
        other => Err(malformed("number", &format!("unsupported value '{}'", other))),
    }
}

fn take_string(fields: &mut Map<String, serde_json::Value>, tag: &str, key: &str) -> Result<String> {
    take_optional_string(fields, tag, key)?
        .ok_or_else(|| malformed(tag, &format!("missing {}", key)))
}

fn take_optional_string(
    fields: &mut Map<String, serde_json::Value>,
    tag: &str,
    key: &str,
) -> Result<Option<String>> {
    match fields.remove(key) {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(serde_json::Value::String(s)) => Ok(Some(s)),
        Some(_) => Err(malformed(tag, &format!("{} is not a string", key))),
    }
}

fn take_array(
    fields: &mut Map<String, serde_json::Value>,
    tag: &str,
    key: &str,
) -> Result<Vec<serde_json::Value>> {
    match fields.remove(key) {
        Some(serde_json::Value::Array(items)) => Ok(items),
        _ => Err(malformed(tag, &format!("{} is not an array", key))),
    }
}

fn malformed(tag: &str, detail: &str) -> Error {
    Error::Codec(format!("malformed '{}' value: {}", tag, detail))
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        to_json(self).serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let json = serde_json::Value::deserialize(deserializer)?;
        from_json(json).map_err(D::Error::custom)
    }
}
