//! Multipart upload: hand-rolled line-oriented parser and the POST handler.
//!
//! The parser reconstructs file bytes from a streaming multipart body without
//! a general-purpose multipart library. It handles exactly one file part per
//! request; any further parts in the same body are ignored, which matches the
//! upload page sending one file per request. Additional headers inside a part
//! beyond `Content-Disposition` and `Content-Type` are not supported either.

use axum::body::Body as AxumBody;
use axum::extract::Extension;
use axum::http::{HeaderMap, StatusCode, header};
use futures_util::TryStreamExt;
use http_body_util::BodyExt;
use std::io;
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio_util::io::StreamReader;
use tracing::{debug, info};

use crate::atomic::AtomicFile;
use crate::error::ApiError;
use crate::storage::Storage;

#[derive(Debug)]
pub enum UploadError {
    /// Opening line of the body did not contain the boundary token.
    MissingBoundary,
    /// No usable `filename=` attribute on the Content-Disposition line.
    MissingFilename,
    /// Declared body length was exhausted (or the stream ended) before the
    /// closing boundary appeared.
    UnexpectedEnd,
    Io(io::Error),
}

impl From<io::Error> for UploadError {
    fn from(err: io::Error) -> Self {
        UploadError::Io(err)
    }
}

/// Streaming state for one multipart body: the boundary token from the
/// request's content type and the remaining declared body length.
///
/// Lines are consumed one at a time and the declared length is decremented as
/// they go, so the parser never blocks reading past the end of a truncated
/// body. While copying file content it keeps exactly one pending line behind
/// a look-ahead line: the boundary is only ever seen in the look-ahead, which
/// is what lets it strip the line terminator the multipart framing added to
/// the file's true final line, and nothing else. Terminators inside the file
/// content pass through verbatim, so binary payloads stay byte-exact.
pub struct MultipartParser {
    boundary: Vec<u8>,
    remaining: u64,
}

impl MultipartParser {
    pub fn new(boundary: Vec<u8>, declared_len: u64) -> Self {
        Self {
            boundary,
            remaining: declared_len,
        }
    }

    /// Consumes the opening boundary line and the part headers, returning the
    /// destination filename reduced to its final path component.
    pub async fn read_part_header<R>(&mut self, reader: &mut R) -> Result<String, UploadError>
    where
        R: AsyncBufRead + Unpin,
    {
        let opening = self.read_line(reader).await?;
        if !contains_token(&opening, &self.boundary) {
            return Err(UploadError::MissingBoundary);
        }

        let disposition = self.read_line(reader).await?;
        let filename = disposition_filename(&disposition).ok_or(UploadError::MissingFilename)?;

        // Fixed two-line skip: the part's Content-Type line and the blank
        // separator before the content.
        self.read_line(reader).await?;
        self.read_line(reader).await?;

        Ok(filename)
    }

    /// Streams the file content into `dest` until the closing boundary,
    /// returning the number of content bytes written.
    pub async fn copy_file_body<R, W>(
        &mut self,
        reader: &mut R,
        dest: &mut W,
    ) -> Result<u64, UploadError>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut pending = self.read_line(reader).await?;
        if contains_token(&pending, &self.boundary) {
            // The part body was immediately the closing boundary: empty file.
            return Ok(0);
        }

        let mut written: u64 = 0;
        while self.remaining > 0 {
            let line = self.read_line(reader).await?;
            if line.is_empty() {
                break;
            }
            if contains_token(&line, &self.boundary) {
                strip_line_terminator(&mut pending);
                dest.write_all(&pending).await?;
                written += pending.len() as u64;
                return Ok(written);
            }
            dest.write_all(&pending).await?;
            written += pending.len() as u64;
            pending = line;
        }

        Err(UploadError::UnexpectedEnd)
    }

    /// Reads one terminator-inclusive line and charges it against the
    /// remaining declared length. Returns an empty buffer at end of stream.
    async fn read_line<R>(&mut self, reader: &mut R) -> Result<Vec<u8>, UploadError>
    where
        R: AsyncBufRead + Unpin,
    {
        let mut line = Vec::new();
        reader.read_until(b'\n', &mut line).await?;
        self.remaining = self.remaining.saturating_sub(line.len() as u64);
        Ok(line)
    }
}

/// Extracts the boundary token from a `multipart/form-data` content type.
pub fn boundary_token(content_type: &str) -> Option<String> {
    let (_, raw) = content_type.split_once("boundary=")?;
    let token = raw.trim().trim_matches('"');
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}

/// Pulls the quoted `filename=` value out of a Content-Disposition line and
/// discards any directory segments, so an uploaded name can never place the
/// file anywhere but directly under the root.
fn disposition_filename(line: &[u8]) -> Option<String> {
    let text = String::from_utf8_lossy(line);
    let (_, rest) = text.split_once("filename=")?;
    let value = rest.trim().trim_matches('"');
    let basename = value.rsplit(['/', '\\']).next()?;
    if basename.is_empty() {
        None
    } else {
        Some(basename.to_string())
    }
}

fn contains_token(line: &[u8], token: &[u8]) -> bool {
    !token.is_empty()
        && line.len() >= token.len()
        && line.windows(token.len()).any(|window| window == token)
}

/// Strips the framing line terminator (`\r\n`, or a bare `\n` / `\r`) from
/// the final content line.
fn strip_line_terminator(line: &mut Vec<u8>) {
    if line.last() == Some(&b'\n') {
        line.pop();
    }
    if line.last() == Some(&b'\r') {
        line.pop();
    }
}

/// Accepts a single-file multipart upload and stores it under the root.
///
/// The file streams through a temp file and is renamed into place only after
/// the closing boundary was seen, so a malformed body never leaves a partial
/// upload behind under its final name.
pub async fn receive_upload(
    headers: HeaderMap,
    Extension(storage): Extension<Arc<Storage>>,
    body: AxumBody,
) -> Result<StatusCode, ApiError> {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default();
    if !content_type.starts_with("multipart/form-data") {
        return Err(ApiError::BadRequest("expected multipart/form-data".into()));
    }
    let boundary = boundary_token(content_type)
        .ok_or_else(|| ApiError::BadRequest("boundary missing in content type".into()))?;
    let declared_len = headers
        .get(header::CONTENT_LENGTH)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.parse::<u64>().ok())
        .ok_or_else(|| ApiError::BadRequest("Content-Length is required".into()))?;

    let stream = BodyExt::into_data_stream(body).map_err(io::Error::other);
    let mut reader = BufReader::new(StreamReader::new(stream));

    let mut parser = MultipartParser::new(boundary.into_bytes(), declared_len);
    let filename = parser.read_part_header(&mut reader).await?;
    let target = storage.resolve(&filename)?;
    debug!(filename, declared_len, "upload started");

    let mut atomic = AtomicFile::create(&target)
        .await
        .map_err(|err| ApiError::Internal(err.to_string()))?;
    match parser.copy_file_body(&mut reader, atomic.file_mut()).await {
        Ok(bytes_written) => {
            atomic
                .finalize()
                .await
                .map_err(|err| ApiError::Internal(err.to_string()))?;
            info!(filename, bytes = bytes_written, "upload complete");
            Ok(StatusCode::OK)
        }
        Err(err) => {
            atomic.cleanup().await;
            Err(err.into())
        }
    }
}
