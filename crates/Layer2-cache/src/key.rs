//! Cache key derivation
//!
//! A key is `operation + ":" + canonical(args)`. Arguments are encoded as
//! compact JSON with object keys sorted at every depth, so equal values always
//! produce the same key regardless of how the caller built the objects.

use serde_json::Value;

/// Separator between operation name and encoded arguments
pub const KEY_SEPARATOR: char = ':';

/// Build the cache key for an operation and its argument list
///
/// Empty `args` encode to the empty string, giving `"operation:"`.
pub fn make_key(operation: &str, args: &[Value]) -> String {
    let mut key = String::with_capacity(operation.len() + 1 + args.len() * 8);
    key.push_str(operation);
    key.push(KEY_SEPARATOR);

    if !args.is_empty() {
        key.push('[');
        let encoded: Vec<String> = args.iter().map(canonical_json).collect();
        key.push_str(&encoded.join(","));
        key.push(']');
    }

    key
}

/// Canonical compact JSON for a single value
pub fn canonical_json(value: &Value) -> String {
    let mut out = String::new();
    write_canonical(value, &mut out);
    out
}

fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Object(obj) => {
            out.push('{');
            // Sort keys for a stable encoding
            let mut keys: Vec<_> = obj.keys().collect();
            keys.sort();
            for (i, key) in keys.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&Value::String(key.clone()).to_string());
                out.push(':');
                if let Some(v) = obj.get(key) {
                    write_canonical(v, out);
                }
            }
            out.push('}');
        }
        Value::Array(arr) => {
            out.push('[');
            for (i, item) in arr.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        // Scalars already have a single compact form
        scalar => out.push_str(&scalar.to_string()),
    }
}
