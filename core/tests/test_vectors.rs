//! Verify query serialization and status filters against JSON test vectors
//! stored in `test-vectors/`.

use ajax_core::{query, success, ConfigError, ReadyState, RequestError, StatusFilter, TransportResult};

// ---------------------------------------------------------------------------
// Query serialization
// ---------------------------------------------------------------------------

#[test]
fn serialize_test_vectors() {
    let raw = include_str!("../../test-vectors/serialize.json");
    let vectors: serde_json::Value = serde_json::from_str(raw).unwrap();

    for case in vectors["cases"].as_array().unwrap() {
        let name = case["name"].as_str().unwrap();
        let input = case["input"].as_object().unwrap();
        let expected = case["expected"].as_str().unwrap();
        assert_eq!(query::serialize_value(input), expected, "{name}");
    }
}

// ---------------------------------------------------------------------------
// Status filters
// ---------------------------------------------------------------------------

fn filter_for(validator: &serde_json::Value) -> StatusFilter {
    match validator.as_str() {
        Some("success") => success().clone(),
        _ => StatusFilter::from_value(validator).unwrap(),
    }
}

#[test]
fn filter_test_vectors() {
    let raw = include_str!("../../test-vectors/filter.json");
    let vectors: serde_json::Value = serde_json::from_str(raw).unwrap();

    for case in vectors["cases"].as_array().unwrap() {
        let name = case["name"].as_str().unwrap();
        let filter = filter_for(&case["validator"]);
        let result = TransportResult {
            status: case["status"].as_u64().unwrap() as u16,
            ready_state: ReadyState::Done,
            body: name.to_string(),
        };

        match (filter.check(result.clone()), case["accepted"].as_bool().unwrap()) {
            (Ok(passed), true) => assert_eq!(passed, result, "{name}: result must be unchanged"),
            (Err(RequestError::Status(rejected)), false) => {
                assert_eq!(rejected, result, "{name}: rejection must carry the unchanged result")
            }
            (outcome, accepted) => panic!("{name}: expected accepted={accepted}, got {outcome:?}"),
        }
    }
}

#[test]
fn unsupported_validator_vectors() {
    let raw = include_str!("../../test-vectors/filter.json");
    let vectors: serde_json::Value = serde_json::from_str(raw).unwrap();

    for validator in vectors["unsupported_validators"].as_array().unwrap() {
        let err = StatusFilter::from_value(validator).unwrap_err();
        assert!(
            matches!(err, ConfigError::UnsupportedValidator(_)),
            "{validator}: expected UnsupportedValidator"
        );
    }
}
