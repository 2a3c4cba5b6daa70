use chrono::Utc;
use sqlx::SqlitePool;
use std::collections::BTreeMap;

use super::models::UserSetting;

pub async fn get_setting(pool: &SqlitePool, userid: i64, name: &str) -> sqlx::Result<Option<String>> {
    let value: Option<(String,)> = sqlx::query_as("SELECT value FROM settings WHERE userid = $1 AND name = $2")
        .bind(userid)
        .bind(name)
        .fetch_optional(pool)
        .await?;

    Ok(value.map(|(v,)| v))
}

pub async fn set_setting(pool: &SqlitePool, userid: i64, name: &str, value: &str) -> sqlx::Result<UserSetting> {
    sqlx::query_as::<_, UserSetting>(
        "INSERT INTO settings (userid, name, value, timemodified)
         VALUES ($1, $2, $3, $4)
         ON CONFLICT (userid, name) DO UPDATE SET value = excluded.value, timemodified = excluded.timemodified
         RETURNING *",
    )
    .bind(userid)
    .bind(name)
    .bind(value)
    .bind(Utc::now())
    .fetch_one(pool)
    .await
}

pub async fn get_all_settings(pool: &SqlitePool, userid: i64) -> sqlx::Result<BTreeMap<String, String>> {
    let rows: Vec<(String, String)> = sqlx::query_as("SELECT name, value FROM settings WHERE userid = $1")
        .bind(userid)
        .fetch_all(pool)
        .await?;

    Ok(rows.into_iter().collect())
}
