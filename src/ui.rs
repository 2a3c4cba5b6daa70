use axum::{
    extract::{Query, State},
    response::Html,
};
use serde::{Deserialize, Serialize};

use crate::auth::{Capability, RequestContext};
use crate::config::THEMES;
use crate::db::user_settings;
use crate::dispatch::validation::validate_theme;
use crate::{AppState, error::AppError};

#[derive(Debug, Default, Deserialize)]
pub struct IndexQuery {
    #[serde(default)]
    pub chatid: Option<i64>,
    #[serde(default)]
    pub theme: Option<String>,
}

/// Handed to the browser module on load.
#[derive(Debug, Serialize)]
pub struct InitConfig {
    pub userid: i64,
    pub chatid: i64,
    pub theme: String,
    pub backendurl: String,
    pub sesskey: String,
}

pub async fn index(
    State(state): State<AppState>,
    ctx: RequestContext,
    Query(query): Query<IndexQuery>,
) -> Result<Html<String>, AppError> {
    ctx.require(Capability::Use)?;

    let theme = match query.theme.as_deref().filter(|t| !t.is_empty()) {
        Some(theme) => validate_theme(Some(theme), &state.settings.default_theme)?,
        None => user_settings::get_setting(&state.db_pool, ctx.user_id, "theme")
            .await?
            .unwrap_or_else(|| state.settings.default_theme.clone()),
    };

    let config = InitConfig {
        userid: ctx.user_id,
        chatid: query.chatid.filter(|id| *id > 0).unwrap_or(0),
        theme,
        backendurl: state.settings.backend_url.clone(),
        sesskey: ctx.sesskey.clone(),
    };

    Ok(Html(render_page(&config)))
}

fn render_page(config: &InitConfig) -> String {
    // `</` must not appear inside the script element
    let config_json = serde_json::to_string(config)
        .unwrap_or_else(|_| "{}".to_string())
        .replace("</", "<\\/");

    let options: String = THEMES
        .iter()
        .map(|theme| {
            let selected = if *theme == config.theme { " selected" } else { "" };
            format!("<option value=\"{theme}\"{selected}>{}</option>", capitalize(theme))
        })
        .collect();

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>AI Assistant</title>
</head>
<body>
<div class="aiassistant-controls">
  <div class="aiassistant-theme-selector">
    <label for="theme-select">Theme</label>
    <select id="theme-select" name="theme" class="custom-select">{options}</select>
  </div>
  <button id="new-chat-btn" class="btn btn-primary">New chat</button>
</div>
<div class="aiassistant-container theme-{theme}">
  <div class="aiassistant-sidebar">
    <h3>Chat history</h3>
    <div id="chat-history" class="chat-history-list"></div>
  </div>
  <div class="aiassistant-chat-area">
    <div id="chat-messages" class="chat-messages"></div>
    <div class="chat-input-area">
      <textarea id="chat-input" placeholder="Type a message..." rows="3"></textarea>
      <button id="send-btn" class="btn btn-primary">Send</button>
    </div>
  </div>
</div>
<script type="application/json" id="aiassistant-config">{config_json}</script>
</body>
</html>
"#,
        theme = html_escape(&config.theme),
    )
}

fn capitalize(value: &str) -> String {
    let mut chars = value.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn html_escape(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode, header};
    use tower::ServiceExt;

    use crate::auth::{issue_session, test_claims};
    use crate::{app, test_state};

    async fn fetch(state: &AppState, userid: i64, uri: &str) -> (StatusCode, String) {
        let claims = test_claims(userid, &[Capability::Use]);
        let request = Request::get(uri)
            .header(header::AUTHORIZATION, format!("Bearer {}", issue_session(&claims, "test-secret")))
            .body(Body::empty())
            .unwrap();
        let response = app(state.clone()).oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    #[test]
    fn test_render_marks_selected_theme() {
        let html = render_page(&InitConfig {
            userid: 1,
            chatid: 0,
            theme: "ocean".to_string(),
            backendurl: "http://localhost:8000".to_string(),
            sesskey: "abc".to_string(),
        });
        assert!(html.contains(r#"<option value="ocean" selected>Ocean</option>"#));
        assert!(html.contains("theme-ocean"));
        assert!(html.contains(r#""sesskey":"abc""#));
    }

    #[tokio::test]
    async fn test_index_uses_stored_theme() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state("http://127.0.0.1:1", dir.path()).await;

        let (status, html) = fetch(&state, 1, "/").await;
        assert_eq!(status, StatusCode::OK);
        assert!(html.contains(r#""theme":"default""#));

        user_settings::set_setting(&state.db_pool, 1, "theme", "jungle").await.unwrap();
        let (_, html) = fetch(&state, 1, "/?chatid=12").await;
        assert!(html.contains(r#""theme":"jungle""#));
        assert!(html.contains(r#""chatid":12"#));
        assert!(html.contains(r#""userid":1"#));

        let (_, html) = fetch(&state, 1, "/?theme=space").await;
        assert!(html.contains(r#""theme":"space""#));
    }
}
