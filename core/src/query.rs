//! Query-string serialization.

use std::fmt::Display;

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde_json::{Map, Value};

/// Everything except `A-Z a-z 0-9 - _ . ! ~ * ' ( )` is escaped, the same
/// set a browser's `encodeURIComponent` leaves alone.
const COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// Percent-encode a single key or value.
pub fn encode_component(input: &str) -> String {
    utf8_percent_encode(input, COMPONENT).to_string()
}

/// Join `key=value` pairs with `&`, encoding both sides, in iteration order.
///
/// ```
/// let query = ajax_core::query::serialize([("foo", "123"), ("bar", "toto")]);
/// assert_eq!(query, "foo=123&bar=toto");
/// ```
pub fn serialize<I, K, V>(params: I) -> String
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: Display,
{
    params
        .into_iter()
        .map(|(key, value)| {
            format!(
                "{}={}",
                encode_component(key.as_ref()),
                encode_component(&value.to_string())
            )
        })
        .collect::<Vec<_>>()
        .join("&")
}

/// Serialize a JSON object, rendering each value the way a browser
/// stringifies it: strings verbatim, arrays as their elements joined with
/// commas, objects as `[object Object]`, everything else as its JSON text.
pub fn serialize_value(params: &Map<String, Value>) -> String {
    serialize(params.iter().map(|(key, value)| (key, value_text(value))))
}

fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => match n.as_f64() {
            Some(f) if n.is_f64() && f.fract() == 0.0 && f.abs() < 1e21 => format!("{f:.0}"),
            _ => n.to_string(),
        },
        Value::Array(items) => items
            .iter()
            .map(|item| match item {
                Value::Null => String::new(),
                other => value_text(other),
            })
            .collect::<Vec<_>>()
            .join(","),
        Value::Object(_) => "[object Object]".to_string(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn object(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected an object"),
        }
    }

    #[test]
    fn values_are_percent_encoded_in_order() {
        let params = object(json!({ "a": 1, "b": "x y" }));
        assert_eq!(serialize_value(&params), "a=1&b=x%20y");
    }

    #[test]
    fn insertion_order_is_kept() {
        let params = object(json!({ "zeta": 1, "alpha": 2 }));
        assert_eq!(serialize_value(&params), "zeta=1&alpha=2");
    }

    #[test]
    fn empty_mapping_is_empty_string() {
        assert_eq!(serialize_value(&Map::new()), "");
        assert_eq!(serialize(Vec::<(&str, &str)>::new()), "");
    }

    #[test]
    fn arrays_render_as_comma_joined_elements() {
        let params = object(json!({ "a": [1, 2], "b": [["x", null], true], "c": [] }));
        assert_eq!(serialize_value(&params), "a=1%2C2&b=x%2C%2Ctrue&c=");
    }

    #[test]
    fn objects_and_whole_floats_render_like_a_browser() {
        let params = object(json!({ "o": { "k": 1 }, "f": 2.0, "g": 2.5 }));
        assert_eq!(serialize_value(&params), "o=%5Bobject%20Object%5D&f=2&g=2.5");
    }

    #[test]
    fn keys_are_encoded_too() {
        assert_eq!(serialize([("a b", "c&d")]), "a%20b=c%26d");
    }

    #[test]
    fn component_leaves_unreserved_marks() {
        assert_eq!(encode_component("-_.!~*'()"), "-_.!~*'()");
        assert_eq!(encode_component("é/?="), "%C3%A9%2F%3F%3D");
    }
}
