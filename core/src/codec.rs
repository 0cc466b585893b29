//! JSON body encoding and decoding.

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::RequestError;
use crate::http::TransportResult;

pub fn encode_json<T: Serialize + ?Sized>(value: &T) -> Result<String, RequestError> {
    serde_json::to_string(value).map_err(RequestError::Encode)
}

/// Parse the response body of `result` as JSON.
///
/// A malformed body rejects with the parse error, not with the transport
/// result.
pub fn decode_json<T: DeserializeOwned>(result: &TransportResult) -> Result<T, RequestError> {
    serde_json::from_str(&result.body).map_err(RequestError::Decode)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::ReadyState;
    use serde_json::{json, Value};

    fn result(body: &str) -> TransportResult {
        TransportResult {
            status: 200,
            ready_state: ReadyState::Done,
            body: body.to_string(),
        }
    }

    #[test]
    fn decode_object() {
        let value: Value = decode_json(&result(r#"{"a":1}"#)).unwrap();
        assert_eq!(value, json!({ "a": 1 }));
    }

    #[test]
    fn decode_into_typed_struct() {
        #[derive(serde::Deserialize, Debug, PartialEq)]
        struct Person {
            name: String,
            age: u32,
        }
        let person: Person = decode_json(&result(r#"{"name":"Jerome","age":20}"#)).unwrap();
        assert_eq!(
            person,
            Person {
                name: "Jerome".to_string(),
                age: 20
            }
        );
    }

    #[test]
    fn decode_rejects_with_parse_error() {
        let err = decode_json::<Value>(&result("not json")).unwrap_err();
        assert!(matches!(err, RequestError::Decode(_)));
        assert!(err.result().is_none());
    }

    #[test]
    fn encode_nested() {
        let text = encode_json(&json!({ "foo": 123, "arr": [1, 2, 3] })).unwrap();
        assert_eq!(text, r#"{"foo":123,"arr":[1,2,3]}"#);
    }
}
