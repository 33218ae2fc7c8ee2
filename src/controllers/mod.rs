pub mod health;
pub mod playback;
pub mod section;
pub mod session;

use axum::{
    body::Body,
    http::{header, HeaderMap, HeaderValue, StatusCode},
};

use crate::error::{AppError, AppResult};

/// Headers for a file download. The name is percent-encoded so Korean titles survive.
pub(crate) fn attachment(
    file_name: &str,
    content_type: &'static str,
    body: impl Into<Body>,
) -> AppResult<(StatusCode, HeaderMap, Body)> {
    let disposition = format!(
        "attachment; filename*=UTF-8''{}",
        urlencoding::encode(file_name)
    );

    let mut headers = HeaderMap::new();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(content_type));
    headers.insert(
        header::CONTENT_DISPOSITION,
        HeaderValue::from_str(&disposition)
            .map_err(|e| AppError::Internal(format!("Invalid download name: {}", e)))?,
    );

    Ok((StatusCode::OK, headers, body.into()))
}
