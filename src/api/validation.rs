use validator::Validate;

use crate::api::errors::ApiError;

/// Runs `validator` derive rules and maps failures to a 400 detail.
pub(crate) fn check(payload: &impl Validate) -> Result<(), ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))
}

/// Canvas instance URLs must be http(s) and carry a host.
pub(crate) fn validate_instance_url(raw: &str) -> Result<(), ApiError> {
    let trimmed = raw.trim();
    let valid = (trimmed.starts_with("https://") || trimmed.starts_with("http://"))
        && trimmed.split_once("://").map(|(_, rest)| !rest.is_empty()).unwrap_or(false);
    if valid {
        Ok(())
    } else {
        Err(ApiError::BadRequest(format!("'{trimmed}' is not a valid Canvas instance URL")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn instance_url_requires_scheme_and_host() {
        assert!(validate_instance_url("https://canvas.instructure.com").is_ok());
        assert!(validate_instance_url("http://localhost:3000").is_ok());
        assert!(validate_instance_url("canvas.instructure.com").is_err());
        assert!(validate_instance_url("https://").is_err());
    }
}
