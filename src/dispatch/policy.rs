use sqlx::SqlitePool;
use std::str::FromStr;

use super::form::ActionForm;
use crate::auth::{Capability, RequestContext};
use crate::db::{chats, models::Chat};
use crate::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Chat,
    GetHistory,
    GetMessages,
    DeleteChat,
    SetSetting,
    GetSettings,
    UploadDocument,
    AddUrl,
    ListDocuments,
    DeleteDocument,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ownership {
    None,
    /// `chatid` is required and must belong to the caller.
    Chat,
    /// Same as `Chat`, but 0 or absent means "no chat yet".
    ChatIfPresent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Policy {
    pub capability: Capability,
    pub ownership: Ownership,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Chat => "chat",
            Action::GetHistory => "get_history",
            Action::GetMessages => "get_messages",
            Action::DeleteChat => "delete_chat",
            Action::SetSetting => "set_setting",
            Action::GetSettings => "get_settings",
            Action::UploadDocument => "upload_document",
            Action::AddUrl => "add_url",
            Action::ListDocuments => "list_documents",
            Action::DeleteDocument => "delete_document",
        }
    }

    pub fn policy(&self) -> Policy {
        use Capability::{ManageContent, Use};

        let (capability, ownership) = match self {
            Action::Chat => (Use, Ownership::ChatIfPresent),
            Action::GetHistory => (Use, Ownership::None),
            Action::GetMessages => (Use, Ownership::Chat),
            Action::DeleteChat => (Use, Ownership::Chat),
            Action::SetSetting => (Use, Ownership::None),
            Action::GetSettings => (Use, Ownership::None),
            Action::UploadDocument => (ManageContent, Ownership::None),
            Action::AddUrl => (ManageContent, Ownership::None),
            Action::ListDocuments => (ManageContent, Ownership::None),
            Action::DeleteDocument => (ManageContent, Ownership::None),
        };

        Policy { capability, ownership }
    }
}

impl FromStr for Action {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let action = match s.trim() {
            "chat" => Action::Chat,
            "get_history" => Action::GetHistory,
            "get_messages" => Action::GetMessages,
            "delete_chat" => Action::DeleteChat,
            "set_setting" => Action::SetSetting,
            "get_settings" => Action::GetSettings,
            "upload_document" => Action::UploadDocument,
            "add_url" => Action::AddUrl,
            "list_documents" => Action::ListDocuments,
            "delete_document" => Action::DeleteDocument,
            other => return Err(AppError::validation(format!("Invalid action: {}", other))),
        };
        Ok(action)
    }
}

impl Policy {
    /// Checks capability and ownership. Returns the caller's chat when the
    /// policy names one.
    pub async fn authorize(
        &self,
        pool: &SqlitePool,
        ctx: &RequestContext,
        form: &ActionForm,
    ) -> Result<Option<Chat>, AppError> {
        ctx.require(self.capability)?;

        let chat_id = match self.ownership {
            Ownership::None => return Ok(None),
            Ownership::Chat => form.required_id("chatid")?,
            Ownership::ChatIfPresent => match form.optional_id("chatid")? {
                0 => return Ok(None),
                id => id,
            },
        };

        match chats::get_chat(pool, chat_id).await? {
            Some(chat) if chat.userid == ctx.user_id => Ok(Some(chat)),
            _ => Err(AppError::NoPermission),
        }
    }
}
