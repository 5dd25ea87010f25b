use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::PrimitiveDateTime;

/// One row per teacher; written only by the Canvas-setup flow after a
/// successful connection test.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct Profile {
    pub(crate) id: String,
    pub(crate) teacher_id: String,
    pub(crate) canvas_instance_url: String,
    pub(crate) canvas_access_token: String,
    pub(crate) school_name: Option<String>,
    pub(crate) connection_verified_at: Option<PrimitiveDateTime>,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
}
