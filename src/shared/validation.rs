//! Validation Utilities

use validator::{ValidationError, ValidationErrors};

use crate::domain::validate_room;

/// `validator` hook for room name fields.
pub fn room_name(name: &str) -> Result<(), ValidationError> {
    if validate_room(name) {
        Ok(())
    } else {
        Err(ValidationError::new("room_name")
            .with_message("Room name must be 3-30 characters of letters, digits, '-' or '_'".into()))
    }
}

/// Flatten validation errors into the first human-readable message.
pub fn first_message(errors: &ValidationErrors) -> String {
    errors
        .field_errors()
        .iter()
        .flat_map(|(field, errs)| {
            errs.iter().map(move |e| match &e.message {
                Some(message) => message.to_string(),
                None => format!("{}: invalid value", field),
            })
        })
        .next()
        .unwrap_or_else(|| "Validation failed".into())
}
