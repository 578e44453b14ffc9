//! Tests for domain error construction and serialisation.

use super::*;
use rstest::rstest;
use serde_json::json;

#[rstest]
#[case(Error::invalid_request("bad"), ErrorCode::InvalidRequest)]
#[case(Error::unauthorized("who"), ErrorCode::Unauthorized)]
#[case(Error::forbidden("no"), ErrorCode::Forbidden)]
#[case(Error::not_found("gone"), ErrorCode::NotFound)]
#[case(Error::conflict("clash"), ErrorCode::Conflict)]
#[case(Error::service_unavailable("later"), ErrorCode::ServiceUnavailable)]
#[case(Error::internal("boom"), ErrorCode::InternalError)]
fn constructors_set_codes(#[case] error: Error, #[case] expected: ErrorCode) {
    assert_eq!(error.code(), expected);
}

#[rstest]
#[case("")]
#[case("   ")]
fn try_new_rejects_blank_messages(#[case] message: &str) {
    let err = Error::try_new(ErrorCode::InternalError, message).expect_err("blank message");
    assert_eq!(err, ErrorValidationError::EmptyMessage);
}

#[rstest]
fn serialises_with_camel_case_and_skips_missing_details() {
    let value = serde_json::to_value(Error::not_found("missing")).expect("serialise");
    assert_eq!(value, json!({ "code": "not_found", "message": "missing" }));
}

#[rstest]
fn deserialisation_rejects_blank_messages() {
    let payload = json!({ "code": "conflict", "message": " " });
    let result: Result<Error, _> = serde_json::from_value(payload);
    assert!(result.is_err());
}

#[rstest]
fn details_survive_serialisation() {
    let error = Error::conflict("clash").with_details(json!({ "expected": 143 }));
    let value = serde_json::to_value(&error).expect("serialise");
    let parsed: Error = serde_json::from_value(value).expect("deserialise");
    assert_eq!(parsed, error);
}

#[rstest]
#[case(Error::service_unavailable("later"), true)]
#[case(Error::conflict("clash"), true)]
#[case(Error::internal("boom"), false)]
#[case(Error::unauthorized("who"), false)]
fn retryable_codes(#[case] error: Error, #[case] retryable: bool) {
    assert_eq!(error.is_retryable(), retryable);
}
