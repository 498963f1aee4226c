//! Embedded static pages.

use axum::body::Body as AxumBody;
use axum::http::{HeaderMap, HeaderValue, header};
use axum::response::{IntoResponse, Response};
use rust_embed::RustEmbed;

use crate::error::ApiError;

#[derive(RustEmbed)]
#[folder = "assets"]
struct StaticAssets;

/// `GET /upload`: the static upload form page.
pub async fn upload_form() -> Result<Response, ApiError> {
    load_asset("upload.html")
}

fn load_asset(path: &str) -> Result<Response, ApiError> {
    let asset = StaticAssets::get(path).ok_or_else(|| ApiError::NotFound("not found".into()))?;
    let mime = mime_guess::from_path(path).first_or_octet_stream();
    let mut headers = HeaderMap::new();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_str(mime.essence_str())
            .map_err(|_| ApiError::Internal("invalid MIME type".into()))?,
    );
    Ok((headers, AxumBody::from(asset.data.into_owned())).into_response())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    #[tokio::test]
    async fn upload_form_is_served_as_html() {
        let response = upload_form()
            .await
            .unwrap_or_else(|_| panic!("upload form missing"));
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response
                .headers()
                .get(header::CONTENT_TYPE)
                .and_then(|value| value.to_str().ok()),
            Some("text/html")
        );
    }
}
