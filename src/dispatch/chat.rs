use serde_json::{Map, Value, json};

use super::form::ActionForm;
use super::validation::validate_theme;
use crate::AppState;
use crate::auth::RequestContext;
use crate::db::chats::{self, HISTORY_LIMIT};
use crate::db::models::{Chat, MessageMetadata, Role};
use crate::error::AppError;

/// Stores the user's turn, asks the backend for a reply and stores that too.
///
/// The chat and user message are committed before the backend is called and
/// stay in place if the call fails.
pub async fn send_message(
    state: &AppState,
    ctx: &RequestContext,
    form: &ActionForm,
    chat: Option<Chat>,
) -> Result<Value, AppError> {
    let message = form.required("message")?;
    let pool = &state.db_pool;

    // The theme only matters when the chat is created
    let chat_id = match chat {
        Some(chat) => chat.id,
        None => {
            let theme = validate_theme(form.get("theme"), &state.settings.default_theme)?;
            let chat = chats::create_chat(pool, ctx.user_id, &theme, None).await?;
            tracing::info!("Created chat {} for user {}", chat.id, ctx.user_id);
            chat.id
        }
    };

    chats::add_message(pool, chat_id, Role::User, message, &MessageMetadata::default()).await?;

    let history = chats::get_messages(pool, chat_id).await?;

    let user_age = if state.settings.enable_age_responses { ctx.age } else { None };

    let reply = state
        .backend
        .chat(message, &history, user_age)
        .await
        .inspect_err(|e| {
            tracing::warn!("Chat {} left without an assistant reply: {}", chat_id, e);
        })?;

    let metadata = MessageMetadata {
        sources: reply.sources.clone(),
        model: reply.model.clone(),
        extra: Map::new(),
    };
    chats::add_message(pool, chat_id, Role::Assistant, &reply.content, &metadata).await?;

    Ok(json!({
        "success": true,
        "chatid": chat_id,
        "response": reply,
    }))
}

pub async fn get_history(state: &AppState, ctx: &RequestContext) -> Result<Value, AppError> {
    let chats = chats::get_user_chats(&state.db_pool, ctx.user_id, HISTORY_LIMIT).await?;

    Ok(json!({
        "success": true,
        "chats": chats,
    }))
}

pub async fn get_messages(state: &AppState, chat: Chat) -> Result<Value, AppError> {
    let messages = chats::get_messages(&state.db_pool, chat.id).await?;

    Ok(json!({
        "success": true,
        "messages": messages,
        "chat": chat,
    }))
}

pub async fn delete_chat(state: &AppState, chat: Chat) -> Result<Value, AppError> {
    chats::delete_chat(&state.db_pool, chat.id).await?;
    tracing::info!("Deleted chat {} for user {}", chat.id, chat.userid);

    Ok(json!({ "success": true }))
}
