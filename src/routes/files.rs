use axum::{
    extract::{Path, State},
    http::{
        header::{CONTENT_DISPOSITION, CONTENT_TYPE},
        HeaderMap, HeaderValue,
    },
};

use crate::{
    error::{AppError, AppResult},
    state::AppState,
    storage::sanitize_key,
};

/// Only these storage prefixes are reachable over HTTP.
const SERVABLE_PREFIXES: &[&str] = &["profile/", "attach/"];

pub async fn serve_file(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> AppResult<(HeaderMap, Vec<u8>)> {
    if !SERVABLE_PREFIXES.iter().any(|prefix| key.starts_with(prefix)) {
        return Err(AppError::not_found());
    }
    sanitize_key(&key).map_err(|_| AppError::not_found())?;

    let bytes = state
        .storage
        .get_object(&key)
        .await
        .map_err(|_| AppError::not_found())?;

    let mime = mime_guess::from_path(&key).first_or_octet_stream();

    let mut headers = HeaderMap::new();
    headers.insert(
        CONTENT_TYPE,
        HeaderValue::from_str(mime.as_ref())
            .unwrap_or_else(|_| HeaderValue::from_static("application/octet-stream")),
    );
    if let Some(disposition) = inline_content_disposition(&key) {
        if let Ok(value) = HeaderValue::from_str(&disposition) {
            headers.insert(CONTENT_DISPOSITION, value);
        }
    }

    Ok((headers, bytes))
}

fn inline_content_disposition(key: &str) -> Option<String> {
    let filename = key.rsplit('/').next().unwrap_or(key);
    if filename.is_empty() {
        return None;
    }

    let sanitized: String = filename
        .chars()
        .map(|ch| match ch {
            '"' | '\\' => '_',
            _ => ch,
        })
        .collect();

    let encoded =
        percent_encoding::utf8_percent_encode(&sanitized, percent_encoding::NON_ALPHANUMERIC);
    Some(format!(
        "inline; filename=\"{}\"; filename*=UTF-8''{}",
        sanitized, encoded
    ))
}
