use serde_json::{Value, json};

use super::form::ActionForm;
use super::validation::{stored_file_name, validate_file, validate_url};
use crate::AppState;
use crate::auth::RequestContext;
use crate::backend::IngestSource;
use crate::db::documents::{self, NewDocument};
use crate::db::models::{DocumentStatus, SourceType};
use crate::error::AppError;

pub async fn upload_document(
    state: &AppState,
    ctx: &RequestContext,
    form: &mut ActionForm,
) -> Result<Value, AppError> {
    let title = form.required("title")?.trim().to_string();
    let file = form
        .take_file()
        .ok_or_else(|| AppError::validation("No file uploaded"))?;

    validate_file(&file.file_name, &file.data)?;

    let upload_dir = state.settings.upload_dir();
    tokio::fs::create_dir_all(&upload_dir).await?;

    let path = upload_dir.join(stored_file_name(&file.file_name));
    tokio::fs::write(&path, &file.data).await?;

    tracing::info!(
        "Stored upload {} ({}, {} bytes) at {}",
        file.file_name,
        file.content_type,
        file.data.len(),
        path.display()
    );

    let path_str = path.to_string_lossy().to_string();
    let document = match documents::add_document(
        &state.db_pool,
        &NewDocument {
            title: &title,
            sourcetype: SourceType::Pdf,
            uploaderid: ctx.user_id,
            sourceurl: None,
            filepath: Some(&path_str),
        },
    )
    .await
    {
        Ok(document) => document,
        Err(e) => {
            // No record will ever point at the file
            if let Err(rm) = tokio::fs::remove_file(&path).await {
                tracing::warn!("Could not remove orphaned upload {}: {}", path.display(), rm);
            }
            return Err(e.into());
        }
    };

    ingest(state, document.id, &IngestSource::Pdf(path)).await?;

    Ok(json!({
        "success": true,
        "documentid": document.id,
    }))
}

pub async fn add_url(state: &AppState, ctx: &RequestContext, form: &ActionForm) -> Result<Value, AppError> {
    let title = form.required("title")?.trim().to_string();
    let url = validate_url(form.required("url")?)?;

    let document = documents::add_document(
        &state.db_pool,
        &NewDocument {
            title: &title,
            sourcetype: SourceType::Url,
            uploaderid: ctx.user_id,
            sourceurl: Some(&url),
            filepath: None,
        },
    )
    .await?;

    ingest(state, document.id, &IngestSource::Url(url)).await?;

    Ok(json!({
        "success": true,
        "documentid": document.id,
    }))
}

pub async fn list_documents(state: &AppState) -> Result<Value, AppError> {
    let documents = documents::get_all_documents(&state.db_pool).await?;
    let stats = documents::get_statistics(&state.db_pool).await?;

    Ok(json!({
        "success": true,
        "documents": documents,
        "stats": stats,
    }))
}

pub async fn delete_document(state: &AppState, form: &ActionForm) -> Result<Value, AppError> {
    let document_id = form.required_id("documentid")?;
    let deleted = documents::delete_document(&state.db_pool, document_id).await?;

    Ok(json!({
        "success": true,
        "deleted": deleted,
    }))
}

// Applies the backend's synchronous answer to the document's status.
async fn ingest(state: &AppState, document_id: i64, source: &IngestSource) -> Result<(), AppError> {
    let reply = state.backend.ingest(document_id, source).await.inspect_err(|e| {
        tracing::warn!("Document {} left pending: {}", document_id, e);
    })?;

    if reply.success {
        let chunks = reply.chunks.unwrap_or(0);
        documents::update_status(&state.db_pool, document_id, DocumentStatus::Completed, chunks).await?;
        tracing::info!("Document {} ingested into {} chunks", document_id, chunks);
    } else {
        documents::update_status(&state.db_pool, document_id, DocumentStatus::Failed, 0).await?;
        tracing::warn!(
            "Backend could not ingest document {}: {}",
            document_id,
            reply.error.as_deref().unwrap_or("no reason given")
        );
    }

    Ok(())
}
