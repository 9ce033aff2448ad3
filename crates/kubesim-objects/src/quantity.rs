//! Resource quantities (`10Gi`, `500M`, `1.5T`).

use serde_json::Value;

const SUFFIXES: &[(&str, f64)] = &[
    ("Ki", 1024.0),
    ("Mi", 1024.0 * 1024.0),
    ("Gi", 1024.0 * 1024.0 * 1024.0),
    ("Ti", 1024.0 * 1024.0 * 1024.0 * 1024.0),
    ("Pi", 1024.0 * 1024.0 * 1024.0 * 1024.0 * 1024.0),
    ("k", 1e3),
    ("K", 1e3),
    ("M", 1e6),
    ("G", 1e9),
    ("T", 1e12),
    ("P", 1e15),
];

/// Parse a quantity into base units. Numbers are accepted as-is.
pub fn parse(quantity: &Value) -> Option<f64> {
    match quantity {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => parse_str(s),
        _ => None,
    }
}

fn parse_str(s: &str) -> Option<f64> {
    let s = s.trim();
    // Two-letter binary suffixes must be tried before their decimal prefix.
    for (suffix, factor) in SUFFIXES {
        if let Some(number) = s.strip_suffix(suffix) {
            return number.parse::<f64>().ok().map(|n| n * factor);
        }
    }
    s.parse().ok()
}

/// Storage size at `pointer`, e.g. `/spec/capacity/storage`.
pub fn storage_at(obj: &Value, pointer: &str) -> Option<f64> {
    obj.pointer(pointer).and_then(parse)
}
