use sqlx::PgPool;
use time::PrimitiveDateTime;

use crate::db::models::Profile;

const COLUMNS: &str = "\
    id, teacher_id, canvas_instance_url, canvas_access_token, school_name, \
    connection_verified_at, created_at, updated_at";

pub(crate) async fn find_by_teacher_id(
    pool: &PgPool,
    teacher_id: &str,
) -> Result<Option<Profile>, sqlx::Error> {
    sqlx::query_as::<_, Profile>(&format!("SELECT {COLUMNS} FROM profiles WHERE teacher_id = $1"))
        .bind(teacher_id)
        .fetch_optional(pool)
        .await
}

pub(crate) struct UpsertProfile<'a> {
    pub id: &'a str,
    pub teacher_id: &'a str,
    pub canvas_instance_url: &'a str,
    pub canvas_access_token: &'a str,
    pub school_name: Option<&'a str>,
    pub connection_verified_at: PrimitiveDateTime,
    pub now: PrimitiveDateTime,
}

pub(crate) async fn upsert(pool: &PgPool, params: UpsertProfile<'_>) -> Result<Profile, sqlx::Error> {
    sqlx::query_as::<_, Profile>(&format!(
        "INSERT INTO profiles (
            id, teacher_id, canvas_instance_url, canvas_access_token, school_name,
            connection_verified_at, created_at, updated_at
        ) VALUES ($1,$2,$3,$4,$5,$6,$7,$7)
        ON CONFLICT (teacher_id) DO UPDATE SET
            canvas_instance_url = EXCLUDED.canvas_instance_url,
            canvas_access_token = EXCLUDED.canvas_access_token,
            school_name = EXCLUDED.school_name,
            connection_verified_at = EXCLUDED.connection_verified_at,
            updated_at = EXCLUDED.updated_at
        RETURNING {COLUMNS}",
    ))
    .bind(params.id)
    .bind(params.teacher_id)
    .bind(params.canvas_instance_url)
    .bind(params.canvas_access_token)
    .bind(params.school_name)
    .bind(params.connection_verified_at)
    .bind(params.now)
    .fetch_one(pool)
    .await
}
