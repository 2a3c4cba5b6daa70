use chrono::Utc;
use sqlx::SqlitePool;

use super::models::{Chat, Message, MessageMetadata, Role};

pub const HISTORY_LIMIT: i64 = 50;
const TITLE_MAX_CHARS: usize = 50;

pub async fn create_chat(
    pool: &SqlitePool,
    userid: i64,
    theme: &str,
    title: Option<&str>,
) -> sqlx::Result<Chat> {
    let now = Utc::now();
    sqlx::query_as::<_, Chat>(
        "INSERT INTO chats (userid, theme, title, timecreated, timemodified)
         VALUES ($1, $2, $3, $4, $5)
         RETURNING *",
    )
    .bind(userid)
    .bind(theme)
    .bind(title.filter(|t| !t.is_empty()))
    .bind(now)
    .bind(now)
    .fetch_one(pool)
    .await
}

/// Appends a message, bumps the chat's `timemodified` and, for a user
/// message, fills in the title if the chat has none yet.
pub async fn add_message(
    pool: &SqlitePool,
    chatid: i64,
    role: Role,
    content: &str,
    metadata: &MessageMetadata,
) -> sqlx::Result<Message> {
    let now = Utc::now();
    let metadata_json = serde_json::to_string(metadata).map_err(|e| sqlx::Error::Encode(Box::new(e)))?;

    let mut tx = pool.begin().await?;

    let message = sqlx::query_as::<_, Message>(
        "INSERT INTO messages (chatid, role, content, metadata, timecreated)
         VALUES ($1, $2, $3, $4, $5)
         RETURNING *",
    )
    .bind(chatid)
    .bind(role)
    .bind(content)
    .bind(metadata_json)
    .bind(now)
    .fetch_one(&mut *tx)
    .await?;

    sqlx::query("UPDATE chats SET timemodified = $1 WHERE id = $2")
        .bind(now)
        .bind(chatid)
        .execute(&mut *tx)
        .await?;

    if role == Role::User {
        sqlx::query("UPDATE chats SET title = $1 WHERE id = $2 AND (title IS NULL OR title = '')")
            .bind(generate_title(content))
            .bind(chatid)
            .execute(&mut *tx)
            .await?;
    }

    tx.commit().await?;

    Ok(message)
}

pub async fn get_messages(pool: &SqlitePool, chatid: i64) -> sqlx::Result<Vec<Message>> {
    sqlx::query_as::<_, Message>(
        "SELECT * FROM messages WHERE chatid = $1 ORDER BY timecreated ASC, id ASC",
    )
    .bind(chatid)
    .fetch_all(pool)
    .await
}

pub async fn get_user_chats(pool: &SqlitePool, userid: i64, limit: i64) -> sqlx::Result<Vec<Chat>> {
    sqlx::query_as::<_, Chat>(
        "SELECT * FROM chats WHERE userid = $1 ORDER BY timemodified DESC, id DESC LIMIT $2",
    )
    .bind(userid)
    .bind(limit)
    .fetch_all(pool)
    .await
}

pub async fn get_chat(pool: &SqlitePool, chatid: i64) -> sqlx::Result<Option<Chat>> {
    sqlx::query_as::<_, Chat>("SELECT * FROM chats WHERE id = $1")
        .bind(chatid)
        .fetch_optional(pool)
        .await
}

/// Removes the chat and its messages. Returns whether a chat row was deleted.
pub async fn delete_chat(pool: &SqlitePool, chatid: i64) -> sqlx::Result<bool> {
    let mut tx = pool.begin().await?;

    sqlx::query("DELETE FROM messages WHERE chatid = $1")
        .bind(chatid)
        .execute(&mut *tx)
        .await?;

    let deleted = sqlx::query("DELETE FROM chats WHERE id = $1")
        .bind(chatid)
        .execute(&mut *tx)
        .await?
        .rows_affected();

    tx.commit().await?;

    Ok(deleted > 0)
}

pub fn generate_title(content: &str) -> String {
    let stripped = strip_tags(content);
    let mut title: String = stripped.chars().take(TITLE_MAX_CHARS).collect();
    if stripped.chars().count() > TITLE_MAX_CHARS {
        title.push_str("...");
    }
    title
}

fn strip_tags(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_tag = false;
    for c in text.chars() {
        match c {
            '<' => in_tag = true,
            '>' if in_tag => in_tag = false,
            _ if !in_tag => out.push(c),
            _ => {}
        }
    }
    out
}
