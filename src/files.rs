//! Browse, download and delete handlers.

use axum::body::Body as AxumBody;
use axum::extract::{Extension, Json, Path as AxumPath};
use axum::http::{HeaderMap, HeaderValue, StatusCode, header};
use axum::response::{Html, IntoResponse, Json as JsonResponse, Response};
use httpdate::fmt_http_date;
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::sync::Arc;
use tokio::fs::{self, File};
use tokio_util::io::ReaderStream;
use tracing::{info, warn};

use crate::error::ApiError;
use crate::page;
use crate::storage::{Storage, StorageError};

#[derive(Deserialize)]
pub(crate) struct DeleteRequest {
    pub filename: String,
}

#[derive(Serialize)]
pub(crate) struct DeleteResponse {
    pub message: String,
}

/// `GET /` and `GET /files`: listing page for the root.
pub async fn browse_root(Extension(storage): Extension<Arc<Storage>>) -> Html<String> {
    render_listing(&storage, "").await
}

/// `GET /files/{*path}`: listing page for a subdirectory.
pub async fn browse_dir(
    AxumPath(path): AxumPath<String>,
    Extension(storage): Extension<Arc<Storage>>,
) -> Html<String> {
    render_listing(&storage, &path).await
}

/// Failures render as page bodies rather than transport errors; the browsing
/// page is the consumer and shows them inline.
async fn render_listing(storage: &Storage, relative: &str) -> Html<String> {
    match storage.list_dir(relative).await {
        Ok(entries) => {
            info!(path = relative, count = entries.len(), "list files");
            Html(page::listing_page(relative, &entries))
        }
        Err(StorageError::PathEscape) => {
            warn!(path = relative, "listing rejected, path escapes root");
            Html("<h3>Access denied</h3>".to_string())
        }
        Err(StorageError::Io(_)) => Html("<h3>Folder not found</h3>".to_string()),
    }
}

/// `GET /download/{*path}`: streams the exact file bytes as an attachment.
pub async fn download_file(
    AxumPath(path): AxumPath<String>,
    Extension(storage): Extension<Arc<Storage>>,
) -> Result<Response, ApiError> {
    let target = storage.resolve(&path)?;
    let metadata = match fs::metadata(&target).await {
        Ok(metadata) => metadata,
        Err(err) if err.kind() == ErrorKind::NotFound => {
            return Err(ApiError::NotFound("File Not Found".into()));
        }
        Err(err) => return Err(ApiError::Internal(err.to_string())),
    };
    if metadata.is_dir() {
        return Err(ApiError::NotFound("File Not Found".into()));
    }

    let basename = target
        .file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_else(|| "download".to_string());
    let mime = mime_guess::from_path(&target).first_or_octet_stream();

    let mut response_headers = HeaderMap::new();
    response_headers.insert(
        header::CONTENT_DISPOSITION,
        HeaderValue::from_str(&format!("attachment; filename=\"{basename}\""))
            .map_err(|_| ApiError::Internal("invalid header value".into()))?,
    );
    response_headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_str(mime.essence_str())
            .map_err(|_| ApiError::Internal("invalid MIME type".into()))?,
    );
    response_headers.insert(
        header::CONTENT_LENGTH,
        HeaderValue::from_str(&metadata.len().to_string())
            .map_err(|_| ApiError::Internal("invalid header value".into()))?,
    );
    if let Ok(modified) = metadata.modified() {
        let value = fmt_http_date(modified);
        response_headers.insert(
            header::LAST_MODIFIED,
            HeaderValue::from_str(&value)
                .map_err(|_| ApiError::Internal("invalid header value".into()))?,
        );
    }

    let file = File::open(&target)
        .await
        .map_err(|err| ApiError::Internal(err.to_string()))?;
    info!(path, size = metadata.len(), "download file");
    let stream = ReaderStream::new(file);
    Ok((
        StatusCode::OK,
        response_headers,
        AxumBody::from_stream(stream),
    )
        .into_response())
}

/// `POST /delete`: removes a file or an empty directory.
///
/// Every outcome except a path escape answers 200 with the status message in
/// the JSON payload; the page script reads `message` either way, so a
/// refused non-empty directory is a payload message, not a transport error.
pub async fn delete_entry(
    Extension(storage): Extension<Arc<Storage>>,
    Json(payload): Json<DeleteRequest>,
) -> Response {
    // The page script sends the percent-encoded relative path it renders
    // into the listing links.
    let filename = urlencoding::decode(&payload.filename)
        .map(|value| value.into_owned())
        .unwrap_or_else(|_| payload.filename.clone());
    match storage.delete(&filename).await {
        Ok(message) => {
            info!(filename, outcome = message, "delete");
            (StatusCode::OK, JsonResponse(DeleteResponse { message })).into_response()
        }
        Err(StorageError::PathEscape) => {
            warn!(filename, "delete rejected, path escapes root");
            (
                StatusCode::FORBIDDEN,
                JsonResponse(DeleteResponse {
                    message: "Access denied".to_string(),
                }),
            )
                .into_response()
        }
        Err(StorageError::Io(err)) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            JsonResponse(DeleteResponse {
                message: err.to_string(),
            }),
        )
            .into_response(),
    }
}
