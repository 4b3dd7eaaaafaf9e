use crate::AppState;
use crate::api::error::AppError;
use crate::services::image_ingest::ALLOWED_EXTENSIONS;
use axum::{
    extract::{Multipart, Path, State, multipart::MultipartRejection},
    http::{HeaderValue, StatusCode, header},
    response::IntoResponse,
};
use bytes::Bytes;

const TEXT_PLAIN: &str = "text/plain; charset=utf-8";

/// Multipart field carrying the upload.
pub const IMAGE_FIELD: &str = "image";

/// Stored images are named `{40 hex chars}.{png|jpg}`.
pub fn is_valid_image_name(file_name: &str) -> bool {
    let Some((stem, extension)) = file_name.split_once('.') else {
        return false;
    };

    stem.len() == 40
        && stem.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
        && ALLOWED_EXTENSIONS.contains(&extension)
}

fn content_type_for(file_name: &str) -> &'static str {
    if file_name.ends_with(".png") {
        "image/png"
    } else {
        "image/jpeg"
    }
}

#[utoipa::path(
    put,
    path = "/me/image",
    request_body(content = Object, description = "Image file in the `image` field", content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Name of the stored image", body = String, content_type = "text/plain"),
        (status = 400, description = "No image found or wrong file format"),
        (status = 500, description = "Image could not be processed or stored")
    ),
    tag = "profiles"
)]
pub async fn put_image(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<impl IntoResponse, AppError> {
    let upload = match multipart {
        Ok(multipart) => read_image_field(multipart).await?,
        // Not a multipart request, so there is no image in it
        Err(_) => None,
    };

    let stored = state.images.ingest(upload).await?;

    Ok((
        [(header::CONTENT_TYPE, HeaderValue::from_static(TEXT_PLAIN))],
        stored.file_name,
    ))
}

async fn read_image_field(mut multipart: Multipart) -> Result<Option<Bytes>, AppError> {
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() == Some(IMAGE_FIELD) {
            let data = field.bytes().await.map_err(multipart_error)?;
            return Ok(Some(data));
        }
    }
    Ok(None)
}

fn multipart_error(e: axum::extract::multipart::MultipartError) -> AppError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge(e.body_text())
    } else {
        AppError::BadRequest(e.body_text())
    }
}

#[utoipa::path(
    get,
    path = "/images/{file_name}",
    params(
        ("file_name" = String, Path, description = "Content-addressed image name")
    ),
    responses(
        (status = 200, description = "Image bytes"),
        (status = 404, description = "Image not found")
    ),
    tag = "profiles"
)]
pub async fn get_image(
    State(state): State<AppState>,
    Path(file_name): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    if !is_valid_image_name(&file_name) {
        return Err(AppError::NotFound("Image not found".to_string()));
    }

    let data = state.images.store().read(&file_name).await.map_err(|e| {
        tracing::debug!("Image {} unavailable: {:#}", file_name, e);
        AppError::NotFound("Image not found".to_string())
    })?;

    Ok((
        [
            (header::CONTENT_TYPE, content_type_for(&file_name)),
            // Names are content hashes, so a name never changes meaning
            (header::CACHE_CONTROL, "public, max-age=31536000, immutable"),
        ],
        data,
    ))
}
