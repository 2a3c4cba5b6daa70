//! The single `POST /api` endpoint.
//!
//! Every call carries an `action` and the session's `sesskey`. The action's
//! [`Policy`] is checked before its handler runs; failures of any kind come
//! back as `{"success": false, "error": ...}`.

use axum::{Json, extract::State};
use serde_json::Value;

use crate::{AppState, auth::RequestContext, error::AppError};

pub mod chat;
pub mod documents;
pub mod form;
pub mod policy;
pub mod settings;
pub mod validation;

pub use form::ActionForm;
pub use policy::{Action, Ownership, Policy};

pub async fn api_handler(
    State(state): State<AppState>,
    ctx: RequestContext,
    mut form: ActionForm,
) -> Result<Json<Value>, AppError> {
    ctx.verify_sesskey(form.get("sesskey"))?;

    let action: Action = form.required("action")?.parse()?;
    let chat = action.policy().authorize(&state.db_pool, &ctx, &form).await?;

    tracing::info!("Action {} | {}", action.as_str(), ctx);

    let body = match action {
        Action::Chat => chat::send_message(&state, &ctx, &form, chat).await?,
        Action::GetHistory => chat::get_history(&state, &ctx).await?,
        Action::GetMessages => chat::get_messages(&state, owned(chat)?).await?,
        Action::DeleteChat => chat::delete_chat(&state, owned(chat)?).await?,
        Action::SetSetting => settings::set_setting(&state, &ctx, &form).await?,
        Action::GetSettings => settings::get_settings(&state, &ctx).await?,
        Action::UploadDocument => documents::upload_document(&state, &ctx, &mut form).await?,
        Action::AddUrl => documents::add_url(&state, &ctx, &form).await?,
        Action::ListDocuments => documents::list_documents(&state).await?,
        Action::DeleteDocument => documents::delete_document(&state, &form).await?,
    };

    Ok(Json(body))
}

// Policies with `Ownership::Chat` always yield a chat.
fn owned<T>(chat: Option<T>) -> Result<T, AppError> {
    chat.ok_or(AppError::NoPermission)
}
