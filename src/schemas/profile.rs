use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::core::time::format_primitive;
use crate::db::models::Profile;

#[derive(Debug, Serialize)]
pub(crate) struct ProfileResponse {
    pub(crate) teacher_id: String,
    pub(crate) canvas_instance_url: String,
    /// Fingerprint only; the raw token never leaves the server.
    pub(crate) canvas_token_fingerprint: String,
    pub(crate) school_name: Option<String>,
    pub(crate) connection_verified_at: Option<String>,
    pub(crate) updated_at: String,
}

impl ProfileResponse {
    pub(crate) fn from_db(profile: Profile) -> Self {
        Self {
            teacher_id: profile.teacher_id,
            canvas_instance_url: profile.canvas_instance_url,
            canvas_token_fingerprint: crate::core::security::token_fingerprint(
                &profile.canvas_access_token,
            ),
            school_name: profile.school_name,
            connection_verified_at: profile.connection_verified_at.map(format_primitive),
            updated_at: format_primitive(profile.updated_at),
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct CanvasSetupRequest {
    #[validate(length(min = 1, message = "instance_url must not be empty"))]
    pub(crate) instance_url: String,
    #[validate(length(min = 1, message = "access_token must not be empty"))]
    pub(crate) access_token: String,
    #[serde(default)]
    pub(crate) school_name: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct CanvasTestRequest {
    #[validate(length(min = 1, message = "instance_url must not be empty"))]
    pub(crate) instance_url: String,
    #[validate(length(min = 1, message = "access_token must not be empty"))]
    pub(crate) access_token: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct CanvasTestResponse {
    pub(crate) connected: bool,
    pub(crate) canvas_user_name: Option<String>,
}
