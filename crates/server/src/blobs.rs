use std::path::{Path as FsPath, PathBuf};

use axum::Json;
use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::Response;
use futures::StreamExt;
use marquee_core::error::ApiError;
use marquee_core::types::StoredBlob;
use marquee_core::upload::{UploadKind, UploadRejection, check_mime, check_upload, mime_essence};
use marquee_db::repo::blobs::{NewBlob, get_blob, insert_blob};
use sha2::{Digest, Sha256};
use tokio::io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt};
use tracing::{info, warn};

use crate::auth::AdminUser;
use crate::error::AppError;
use crate::state::AppState;

/// A single byte range. Only `bytes=start-end`, `bytes=start-` and
/// `bytes=-suffix` are supported.
#[derive(Debug)]
pub struct ByteRange {
    pub start: u64,
    pub end_inclusive: u64,
}

/// Parse a `Range` header against a blob of `size` bytes.
///
/// `Ok(None)` means the header should be ignored and the full body served:
/// it is malformed, uses another unit, or asks for several ranges. `Err` is
/// reserved for a well-formed range that cannot be satisfied.
pub fn parse_range_header(range_str: &str, size: u64) -> Result<Option<ByteRange>, ApiError> {
    let Some(range_set) = range_str.trim().strip_prefix("bytes=") else {
        return Ok(None);
    };
    if range_set.contains(',') {
        return Ok(None);
    }
    let Some((start_s, end_s)) = range_set.trim().split_once('-') else {
        return Ok(None);
    };

    if start_s.is_empty() {
        let Ok(suffix) = end_s.parse::<u64>() else {
            return Ok(None);
        };
        if suffix == 0 || size == 0 {
            return Err(unsatisfiable(size));
        }
        return Ok(Some(ByteRange {
            start: size.saturating_sub(suffix),
            end_inclusive: size - 1,
        }));
    }

    let Ok(start) = start_s.parse::<u64>() else {
        return Ok(None);
    };
    let end = if end_s.is_empty() {
        None
    } else {
        match end_s.parse::<u64>() {
            Ok(end) if end >= start => Some(end),
            _ => return Ok(None),
        }
    };

    if start >= size {
        return Err(unsatisfiable(size));
    }
    let end_inclusive = end.map_or(size - 1, |end| end.min(size - 1));

    Ok(Some(ByteRange {
        start,
        end_inclusive,
    }))
}

fn unsatisfiable(size: u64) -> ApiError {
    ApiError::BadRequest(format!("range not satisfiable for blob of {size} bytes"))
}

/// Store an uploaded payload.
/// POST /api/v1/blobs/{kind}, raw body, `Content-Type` required.
pub async fn upload_blob(
    admin: AdminUser,
    State(state): State<AppState>,
    Path(kind): Path<String>,
    headers: HeaderMap,
    body: Body,
) -> Result<(StatusCode, Json<StoredBlob>), AppError> {
    let kind = UploadKind::from_str(&kind)
        .ok_or_else(|| ApiError::NotFound(format!("unknown blob kind: {kind}")))?;

    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");
    check_mime(kind, content_type).map_err(ApiError::from)?;

    // Refuse a declared oversize body before reading any of it.
    if let Some(declared) = headers
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<u64>().ok())
    {
        check_upload(kind, declared, content_type).map_err(ApiError::from)?;
    }

    tokio::fs::create_dir_all(&state.blob_dir)
        .await
        .map_err(|e| ApiError::Internal(format!("blob dir error: {e}")))?;

    let id = uuid::Uuid::new_v4().to_string();
    let path = state.blob_dir.join(&id);

    let written = match write_limited(body, &path, kind).await {
        Ok(written) => written,
        Err(e) => {
            if let Err(rm) = tokio::fs::remove_file(&path).await {
                warn!(blob_id = %id, error = %rm, "failed to remove partial blob");
            }
            return Err(e);
        }
    };

    if let Err(rejection) = check_upload(kind, written.size, content_type) {
        let _ = tokio::fs::remove_file(&path).await;
        return Err(ApiError::from(rejection).into());
    }

    let essence = mime_essence(content_type);
    let path_str = path.to_string_lossy().into_owned();
    insert_blob(
        &state.db,
        &NewBlob {
            id: &id,
            kind: kind.as_str(),
            content_type: &essence,
            size_bytes: written.size as i64,
            sha256: &written.sha256,
            path: &path_str,
            owner_id: Some(&admin.account_id),
        },
    )
    .await?;

    info!(blob_id = %id, %kind, size = written.size, "blob stored");

    Ok((
        StatusCode::CREATED,
        Json(StoredBlob {
            download_url: state.download_url(&id),
            id,
            content_type: essence,
            size_bytes: written.size,
        }),
    ))
}

struct Written {
    size: u64,
    sha256: String,
}

/// Stream `body` to `path`, hashing as it goes and aborting as soon as the
/// size limit for `kind` is exceeded.
async fn write_limited(body: Body, path: &FsPath, kind: UploadKind) -> Result<Written, AppError> {
    let mut file = tokio::fs::File::create(path)
        .await
        .map_err(|e| ApiError::Internal(format!("blob create error: {e}")))?;
    let mut hasher = Sha256::new();
    let mut size: u64 = 0;
    let limit = kind.max_bytes();

    let mut stream = body.into_data_stream();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| ApiError::BadRequest(format!("upload interrupted: {e}")))?;
        size += chunk.len() as u64;
        if size > limit {
            return Err(ApiError::from(UploadRejection::TooLarge { kind, size, limit }).into());
        }
        hasher.update(&chunk);
        file.write_all(&chunk)
            .await
            .map_err(|e| ApiError::Internal(format!("blob write error: {e}")))?;
    }

    file.flush()
        .await
        .map_err(|e| ApiError::Internal(format!("blob write error: {e}")))?;

    Ok(Written {
        size,
        sha256: hex::encode(hasher.finalize()),
    })
}

/// Serve a stored blob with single-range support.
/// GET /blobs/{id}
pub async fn download_blob(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let blob = get_blob(&state.db, &id)
        .await?
        .ok_or_else(|| ApiError::NotFound("blob not found".into()))?;

    let file_path = PathBuf::from(&blob.path);
    let size = blob.size_bytes as u64;

    let mut file = tokio::fs::File::open(&file_path)
        .await
        .map_err(|_| ApiError::NotFound("blob payload missing".into()))?;

    let builder = Response::builder()
        .header(header::CONTENT_TYPE, &blob.content_type)
        .header(header::ACCEPT_RANGES, "bytes")
        .header(header::ETAG, format!("\"{}\"", blob.sha256));

    let requested = match headers.get(header::RANGE).and_then(|v| v.to_str().ok()) {
        Some(range_header) => match parse_range_header(range_header, size) {
            Ok(range) => range,
            Err(_) => {
                return build(
                    Response::builder()
                        .status(StatusCode::RANGE_NOT_SATISFIABLE)
                        .header(header::CONTENT_RANGE, format!("bytes */{size}")),
                    Body::empty(),
                );
            }
        },
        None => None,
    };

    match requested {
        Some(range) => {
            let content_length = range.end_inclusive - range.start + 1;
            file.seek(std::io::SeekFrom::Start(range.start))
                .await
                .map_err(|e| ApiError::Internal(format!("seek error: {e}")))?;
            let stream = tokio_util::io::ReaderStream::new(file.take(content_length));

            build(
                builder
                    .status(StatusCode::PARTIAL_CONTENT)
                    .header(header::CONTENT_LENGTH, content_length.to_string())
                    .header(
                        header::CONTENT_RANGE,
                        format!("bytes {}-{}/{size}", range.start, range.end_inclusive),
                    ),
                Body::from_stream(stream),
            )
        }
        None => build(
            builder
                .status(StatusCode::OK)
                .header(header::CONTENT_LENGTH, size.to_string()),
            Body::from_stream(tokio_util::io::ReaderStream::new(file)),
        ),
    }
}

fn build(builder: axum::http::response::Builder, body: Body) -> Result<Response, AppError> {
    builder
        .body(body)
        .map_err(|e| ApiError::Internal(format!("response build error: {e}")).into())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn range(header: &str, size: u64) -> (u64, u64) {
        let r = parse_range_header(header, size).unwrap().unwrap();
        (r.start, r.end_inclusive)
    }

    #[test]
    fn parse_range_basic() {
        assert_eq!(range("bytes=0-999", 5000), (0, 999));
    }

    #[test]
    fn parse_range_open_end() {
        assert_eq!(range("bytes=1000-", 5000), (1000, 4999));
    }

    #[test]
    fn parse_range_suffix() {
        assert_eq!(range("bytes=-500", 5000), (4500, 4999));
    }

    #[test]
    fn parse_range_clamps_end() {
        assert_eq!(range("bytes=0-99999", 5000).1, 4999);
    }

    #[test]
    fn parse_range_ignores_what_it_cannot_parse() {
        for header in [
            "items=0-1",
            "bytes=0-100, 200-300",
            "bytes=abc-",
            "bytes=5",
            "bytes=300-100",
        ] {
            assert!(parse_range_header(header, 5000).unwrap().is_none(), "{header}");
        }
    }

    #[test]
    fn parse_range_rejects_unsatisfiable() {
        assert!(parse_range_header("bytes=5000-", 5000).is_err());
        assert!(parse_range_header("bytes=0-1", 0).is_err());
        assert!(parse_range_header("bytes=-0", 5000).is_err());
    }
}
