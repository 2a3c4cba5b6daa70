use serde_json::{Value, json};

use super::form::ActionForm;
use super::validation::validate_setting_name;
use crate::AppState;
use crate::auth::RequestContext;
use crate::db::user_settings;
use crate::error::AppError;

pub async fn set_setting(state: &AppState, ctx: &RequestContext, form: &ActionForm) -> Result<Value, AppError> {
    let name = validate_setting_name(form.required("name")?)?;
    let value = form.get("value").unwrap_or("").trim();

    user_settings::set_setting(&state.db_pool, ctx.user_id, name, value).await?;

    Ok(json!({ "success": true }))
}

pub async fn get_settings(state: &AppState, ctx: &RequestContext) -> Result<Value, AppError> {
    let settings = user_settings::get_all_settings(&state.db_pool, ctx.user_id).await?;

    Ok(json!({
        "success": true,
        "settings": settings,
    }))
}
