use axum::{
    Form,
    extract::{FromRequest, Multipart, Request},
    http::header::CONTENT_TYPE,
};
use bytes::Bytes;
use std::collections::HashMap;

use crate::error::AppError;

#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub file_name: String,
    pub content_type: String,
    pub data: Bytes,
}

/// Action parameters, from either a urlencoded or a multipart body.
#[derive(Debug, Default)]
pub struct ActionForm {
    fields: HashMap<String, String>,
    file: Option<UploadedFile>,
}

impl ActionForm {
    #[cfg(test)]
    pub(crate) fn from_fields<I, K, V>(fields: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            fields: fields.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
            file: None,
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    /// Present and non-blank.
    pub fn required(&self, name: &str) -> Result<&str, AppError> {
        self.get(name)
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| AppError::validation(format!("Missing parameter: {}", name)))
    }

    /// Absent or empty reads as 0.
    pub fn optional_id(&self, name: &str) -> Result<i64, AppError> {
        match self.get(name).map(str::trim) {
            None | Some("") => Ok(0),
            Some(raw) => parse_id(name, raw),
        }
    }

    pub fn required_id(&self, name: &str) -> Result<i64, AppError> {
        let id = parse_id(name, self.required(name)?.trim())?;
        if id == 0 {
            return Err(AppError::validation(format!("Missing parameter: {}", name)));
        }
        Ok(id)
    }

    pub fn take_file(&mut self) -> Option<UploadedFile> {
        self.file.take()
    }
}

fn parse_id(name: &str, raw: &str) -> Result<i64, AppError> {
    raw.parse::<i64>()
        .ok()
        .filter(|id| *id >= 0)
        .ok_or_else(|| AppError::validation(format!("Invalid parameter: {}", name)))
}

impl<S> FromRequest<S> for ActionForm
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let is_multipart = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.starts_with("multipart/form-data"));

        if !is_multipart {
            let Form(fields) = Form::<HashMap<String, String>>::from_request(req, state)
                .await
                .map_err(|e| AppError::validation(format!("Invalid form data: {}", e)))?;
            return Ok(Self { fields, file: None });
        }

        let mut multipart = Multipart::from_request(req, state)
            .await
            .map_err(|e| AppError::validation(format!("Failed to read multipart: {}", e)))?;

        let mut form = ActionForm::default();

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| AppError::validation(format!("Failed to read multipart: {}", e)))?
        {
            let name = field.name().unwrap_or("").to_string();

            if name == "file" {
                let file_name = field.file_name().unwrap_or("unknown").to_string();
                let content_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::validation(format!("Failed to read file: {}", e)))?;

                form.file = Some(UploadedFile { file_name, content_type, data });
            } else {
                let value = field
                    .text()
                    .await
                    .map_err(|e| AppError::validation(format!("Failed to read field {}: {}", name, e)))?;
                form.fields.insert(name, value);
            }
        }

        Ok(form)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_required() {
        let form = ActionForm::from_fields([("message", "Hello"), ("blank", "   ")]);
        assert_eq!(form.required("message").unwrap(), "Hello");
        assert!(form.required("blank").is_err());
        assert!(form.required("absent").is_err());
    }

    #[test]
    fn test_ids() {
        let form = ActionForm::from_fields([("a", "0"), ("b", "12"), ("c", "-3"), ("d", "x"), ("e", "")]);
        assert_eq!(form.optional_id("a").unwrap(), 0);
        assert_eq!(form.optional_id("b").unwrap(), 12);
        assert_eq!(form.optional_id("e").unwrap(), 0);
        assert_eq!(form.optional_id("absent").unwrap(), 0);
        assert!(form.optional_id("c").is_err());
        assert!(form.optional_id("d").is_err());

        assert_eq!(form.required_id("b").unwrap(), 12);
        assert!(form.required_id("a").is_err());
        assert!(form.required_id("absent").is_err());
    }
}
