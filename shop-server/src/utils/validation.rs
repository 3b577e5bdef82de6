//! Request validation helpers
//!
//! DTOs derive [`validator::Validate`]; handlers call [`validate_payload`]
//! to turn field errors into a `ValidationFailed` [`AppError`].

use validator::{Validate, ValidationErrors};

use crate::utils::AppError;

/// Recipient names, voucher codes
pub const MAX_NAME_LEN: u64 = 200;

/// Shipping addresses
pub const MAX_ADDRESS_LEN: u64 = 500;

/// Delivery notes
pub const MAX_NOTE_LEN: u64 = 500;

/// Phone numbers
pub const MAX_PHONE_LEN: u64 = 20;

/// Validate a DTO, collecting field errors into the error details
pub fn validate_payload<T: Validate>(payload: &T) -> Result<(), AppError> {
    payload.validate().map_err(into_app_error)
}

fn into_app_error(errors: ValidationErrors) -> AppError {
    // errors() covers plain fields as well as nested structs and lists
    let mut fields: Vec<String> = errors.errors().keys().map(|f| f.to_string()).collect();
    fields.sort();

    let message = format!("Invalid fields: {}", fields.join(", "));
    AppError::validation(message).with_detail("fields", fields)
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::error::ErrorCode;

    #[derive(Validate)]
    struct Sample {
        #[validate(length(min = 1, max = 5))]
        name: String,
        #[validate(range(min = 1))]
        quantity: i64,
    }

    #[test]
    fn test_valid_payload_passes() {
        let ok = Sample {
            name: "abc".into(),
            quantity: 2,
        };
        assert!(validate_payload(&ok).is_ok());
    }

    #[test]
    fn test_invalid_fields_are_listed() {
        let bad = Sample {
            name: String::new(),
            quantity: 0,
        };
        let err = validate_payload(&bad).unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationFailed);
        assert!(err.message.contains("name"));
        assert!(err.message.contains("quantity"));
        let details = err.details.unwrap();
        assert_eq!(details["fields"], serde_json::json!(["name", "quantity"]));
    }
}
