use bytes::Bytes;
use reqwest::Url;
use uuid::Uuid;

use crate::error::AppError;

pub const MAX_FILE_SIZE: usize = 50 * 1024 * 1024; // 50MB
const ALLOWED_EXTENSIONS: &[&str] = &["pdf"];
const MAX_THEME_LEN: usize = 32;
const MAX_SETTING_NAME_LEN: usize = 64;

pub fn validate_file(file_name: &str, file_data: &Bytes) -> Result<(), AppError> {
    if file_data.len() > MAX_FILE_SIZE {
        return Err(AppError::validation("File size exceeds maximum allowed size of 50MB"));
    }

    if file_data.is_empty() {
        return Err(AppError::validation("File is empty"));
    }

    let extension = file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_lowercase())
        .unwrap_or_default();

    if !ALLOWED_EXTENSIONS.contains(&extension.as_str()) {
        return Err(AppError::validation("File type not supported. Allowed: PDF"));
    }

    Ok(())
}

/// `{uuid}_{basename}` with anything outside `[A-Za-z0-9._-]` replaced.
pub fn stored_file_name(original: &str) -> String {
    let base = original.rsplit(['/', '\\']).next().unwrap_or("");
    let mut safe: String = base
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') { c } else { '_' })
        .collect();
    if safe.trim_matches('.').is_empty() {
        safe = "upload.pdf".to_string();
    }
    format!("{}_{}", Uuid::new_v4().simple(), safe)
}

pub fn validate_url(raw: &str) -> Result<String, AppError> {
    let url = Url::parse(raw.trim()).map_err(|_| AppError::validation("Invalid URL"))?;

    if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
        return Err(AppError::validation("Invalid URL"));
    }

    Ok(raw.trim().to_string())
}

/// Blank falls back to `default`; otherwise letters only.
pub fn validate_theme(raw: Option<&str>, default: &str) -> Result<String, AppError> {
    match raw.map(str::trim) {
        None | Some("") => Ok(default.to_string()),
        Some(theme) if theme.len() <= MAX_THEME_LEN && theme.chars().all(|c| c.is_ascii_alphabetic()) => {
            Ok(theme.to_string())
        }
        Some(_) => Err(AppError::validation("Invalid parameter: theme")),
    }
}

pub fn validate_setting_name(name: &str) -> Result<&str, AppError> {
    let name = name.trim();
    if name.is_empty()
        || name.len() > MAX_SETTING_NAME_LEN
        || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
    {
        return Err(AppError::validation("Invalid parameter: name"));
    }
    Ok(name)
}
