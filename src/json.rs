use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use serde_json::{json, Map, Value as Json};

use crate::types::Value;

impl Value {
    /// Render as JSON without losing type information.
    ///
    /// Shapes JSON has no native form for are wrapped in single-key marker
    /// objects: `{"@bi": "<decimal>"}` for big integers, `{"@b": "<base64>"}`
    /// for non-UTF-8 bytes, `{"@t": [...]}` for tuples and
    /// `{"@d": [[k, v], ...]}` for dicts whose keys are not all text.
    pub fn to_json(&self) -> Json {
        match self {
            Value::None => Json::Null,
            Value::Bool(b) => Json::Bool(*b),
            Value::Int(i) => json!(*i),
            // Store as string to avoid precision loss
            Value::BigInt(bi) => json!({"@bi": bi.to_string()}),
            Value::Float(f) => serde_json::Number::from_f64(*f)
                .map(Json::Number)
                .unwrap_or(Json::Null),
            Value::Bytes(b) => match std::str::from_utf8(b) {
                Ok(s) => Json::String(s.to_string()),
                Err(_) => json!({"@b": BASE64.encode(b)}),
            },
            Value::List(items) => Json::Array(items.iter().map(Value::to_json).collect()),
            Value::Tuple(items) => {
                let arr: Vec<Json> = items.iter().map(Value::to_json).collect();
                json!({"@t": arr})
            }
            Value::Dict(pairs) => {
                let text_keys: Option<Vec<&str>> = pairs.iter().map(|(k, _)| k.as_str()).collect();
                match text_keys {
                    Some(keys) => {
                        let mut map = Map::new();
                        for (key, (_, v)) in keys.into_iter().zip(pairs) {
                            map.insert(key.to_string(), v.to_json());
                        }
                        Json::Object(map)
                    }
                    None => {
                        // Non-text keys: use array-of-pairs representation
                        let arr: Vec<Json> = pairs
                            .iter()
                            .map(|(k, v)| json!([k.to_json(), v.to_json()]))
                            .collect();
                        json!({"@d": arr})
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use num_bigint::BigInt;

    #[test]
    fn test_scalars() {
        assert_eq!(Value::None.to_json(), Json::Null);
        assert_eq!(Value::Int(-3).to_json(), json!(-3));
        assert_eq!(Value::Float(f64::NAN).to_json(), Json::Null);
        let big: BigInt = "9876543210987654321098".parse().unwrap();
        assert_eq!(
            Value::BigInt(big).to_json(),
            json!({"@bi": "9876543210987654321098"})
        );
    }

    #[test]
    fn test_bytes_text_or_base64() {
        assert_eq!(Value::from("test").to_json(), json!("test"));
        assert_eq!(Value::Bytes(vec![0xff, 0x00]).to_json(), json!({"@b": "/wA="}));
    }

    #[test]
    fn test_dict_string_keys() {
        let val = Value::Dict(vec![
            (Value::from("a"), Value::Int(1)),
            (Value::from("b"), Value::Tuple(vec![Value::Bool(true)])),
        ]);
        assert_eq!(val.to_json(), json!({"a": 1, "b": {"@t": [true]}}));
    }

    #[test]
    fn test_dict_nonstring_keys() {
        let val = Value::Dict(vec![
            (Value::from("test1"), Value::Int(1)),
            (Value::Int(0), Value::Int(2)),
        ]);
        assert_eq!(val.to_json(), json!({"@d": [["test1", 1], [0, 2]]}));
    }
}
