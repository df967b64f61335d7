use serde::Serialize;
use serde_json::Value;

/// Stable serialization: object keys sorted lexicographically at every depth,
/// arrays in order, no whitespace. Two values that differ only in key
/// insertion order serialize to the same bytes.
pub fn stable_json_bytes(value: &Value) -> Vec<u8> {
    stable_json_string(value).into_bytes()
}

/// String form of [`stable_json_bytes`].
pub fn stable_json_string(value: &Value) -> String {
    let mut out = String::new();
    write_value(&mut out, value);
    out
}

/// Serialize any `Serialize` value through [`stable_json_string`].
pub fn stable_stringify<T: Serialize>(value: &T) -> serde_json::Result<String> {
    let value = serde_json::to_value(value)?;
    Ok(stable_json_string(&value))
}

fn write_value(out: &mut String, value: &Value) {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            out.push('{');
            for (i, key) in keys.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_scalar(out, &Value::String(key.clone()));
                out.push(':');
                write_value(out, &map[key]);
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_value(out, item);
            }
            out.push(']');
        }
        scalar => write_scalar(out, scalar),
    }
}

fn write_scalar(out: &mut String, value: &Value) {
    // Scalars never fail to serialize; Display on Value is compact JSON.
    out.push_str(&value.to_string());
}
