use chrono::Utc;
use sqlx::SqlitePool;

use super::models::{Document, DocumentStats, DocumentStatus, SourceType};

#[derive(Debug, Clone)]
pub struct NewDocument<'a> {
    pub title: &'a str,
    pub sourcetype: SourceType,
    pub uploaderid: i64,
    pub sourceurl: Option<&'a str>,
    pub filepath: Option<&'a str>,
}

pub async fn add_document(pool: &SqlitePool, doc: &NewDocument<'_>) -> sqlx::Result<Document> {
    let now = Utc::now();
    sqlx::query_as::<_, Document>(
        "INSERT INTO documents (title, sourcetype, sourceurl, filepath, status, chunks, uploaderid, timecreated, timemodified)
         VALUES ($1, $2, $3, $4, $5, 0, $6, $7, $8)
         RETURNING *",
    )
    .bind(doc.title)
    .bind(doc.sourcetype)
    .bind(doc.sourceurl)
    .bind(doc.filepath)
    .bind(DocumentStatus::Pending)
    .bind(doc.uploaderid)
    .bind(now)
    .bind(now)
    .fetch_one(pool)
    .await
}

pub async fn update_status(
    pool: &SqlitePool,
    document_id: i64,
    status: DocumentStatus,
    chunks: i64,
) -> sqlx::Result<()> {
    sqlx::query("UPDATE documents SET status = $1, chunks = $2, timemodified = $3 WHERE id = $4")
        .bind(status)
        .bind(chunks)
        .bind(Utc::now())
        .bind(document_id)
        .execute(pool)
        .await?;

    Ok(())
}

pub async fn get_all_documents(pool: &SqlitePool) -> sqlx::Result<Vec<Document>> {
    sqlx::query_as::<_, Document>("SELECT * FROM documents ORDER BY timecreated DESC, id DESC")
        .fetch_all(pool)
        .await
}

pub async fn get_document(pool: &SqlitePool, document_id: i64) -> sqlx::Result<Option<Document>> {
    sqlx::query_as::<_, Document>("SELECT * FROM documents WHERE id = $1")
        .bind(document_id)
        .fetch_optional(pool)
        .await
}

/// Deletes the record and its backing file. A missing record is not an error;
/// the return value says whether anything was deleted.
pub async fn delete_document(pool: &SqlitePool, document_id: i64) -> sqlx::Result<bool> {
    let Some(document) = get_document(pool, document_id).await? else {
        return Ok(false);
    };

    if let Some(path) = document.filepath.as_deref().filter(|p| !p.is_empty()) {
        match tokio::fs::remove_file(path).await {
            Ok(()) => tracing::info!("Removed file {} for document {}", path, document_id),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!("Could not remove file {} for document {}: {}", path, document_id, e),
        }
    }

    let deleted = sqlx::query("DELETE FROM documents WHERE id = $1")
        .bind(document_id)
        .execute(pool)
        .await?
        .rows_affected();

    Ok(deleted > 0)
}

pub async fn get_statistics(pool: &SqlitePool) -> sqlx::Result<DocumentStats> {
    let rows: Vec<(DocumentStatus, i64)> =
        sqlx::query_as("SELECT status, COUNT(*) FROM documents GROUP BY status")
            .fetch_all(pool)
            .await?;

    let mut stats = DocumentStats::default();
    for (status, count) in rows {
        stats.total += count;
        match status {
            DocumentStatus::Pending => stats.pending = count,
            DocumentStatus::Processing => stats.processing = count,
            DocumentStatus::Completed => stats.completed = count,
            DocumentStatus::Failed => stats.failed = count,
        }
    }

    Ok(stats)
}
