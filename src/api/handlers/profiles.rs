use crate::AppState;
use crate::api::error::AppError;
use crate::api::middleware::session::CurrentUser;
use crate::entities::users;
use crate::services::directory::{ProfileExtras, fetch_profile_extras};
use axum::{
    Extension, Json,
    extract::{Path, State},
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use utoipa::ToSchema;

/// Key set in the profile document once the owner agreed to profile creation.
pub const CONSENT_KEY: &str = "profile_creation_consented";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ProfileResponse {
    pub id: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote_id: Option<String>,
    #[schema(value_type = Object)]
    pub data: Value,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MeResponse {
    #[serde(flatten)]
    pub profile: ProfileResponse,
    pub extra: ProfileExtras,
}

pub fn format_user(user: users::Model) -> ProfileResponse {
    ProfileResponse {
        id: user.id,
        remote_id: Some(user.remote_id),
        data: user.data,
        created_at: user.created_at,
    }
}

/// Like `format_user`, but only the owner gets to see the directory id.
pub fn format_user_safe(viewer: Option<&users::Model>, user: users::Model) -> ProfileResponse {
    let is_owner = viewer.is_some_and(|v| v.id == user.id);
    let mut profile = format_user(user);
    if !is_owner {
        profile.remote_id = None;
    }
    profile
}

#[utoipa::path(
    get,
    path = "/me",
    responses(
        (status = 200, description = "Own profile with directory details", body = MeResponse),
        (status = 403, description = "No valid session"),
        (status = 500, description = "Directory lookup failed; the session cookie is cleared")
    ),
    security(
        ("session" = [])
    ),
    tag = "profiles"
)]
pub async fn get_me(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> Result<Json<MeResponse>, Response> {
    let extra = fetch_profile_extras(state.directory.as_ref(), &user.remote_id)
        .await
        .map_err(|e| {
            let mut response = AppError::Directory(e).into_response();
            // Force a fresh login rather than serving a half-built profile
            if let Ok(cookie) = HeaderValue::from_str(&state.sessions.clear_cookie()) {
                response.headers_mut().insert(header::SET_COOKIE, cookie);
            }
            response
        })?;

    Ok(Json(MeResponse {
        profile: format_user(user),
        extra,
    }))
}

#[utoipa::path(
    put,
    path = "/me",
    request_body(content = Object, description = "Replacement profile document"),
    responses(
        (status = 200, description = "Profile replaced"),
        (status = 400, description = "Body is not a JSON object"),
        (status = 403, description = "No valid session")
    ),
    security(
        ("session" = [])
    ),
    tag = "profiles"
)]
pub async fn put_me(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Json(payload): Json<Value>,
) -> Result<StatusCode, AppError> {
    if !payload.is_object() {
        return Err(AppError::BadRequest(
            "Profile data must be a JSON object".to_string(),
        ));
    }

    state.users.update_data(user.id, payload).await?;
    tracing::info!("Profile {} replaced", user.id);

    Ok(StatusCode::OK)
}

#[utoipa::path(
    post,
    path = "/me/consent",
    responses(
        (status = 200, description = "Consent recorded"),
        (status = 403, description = "No valid session"),
        (status = 409, description = "Profile kept changing while recording consent")
    ),
    security(
        ("session" = [])
    ),
    tag = "profiles"
)]
pub async fn consent(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> Result<StatusCode, AppError> {
    state
        .users
        .patch_data(user.id, |data| {
            if !data.is_object() {
                *data = Value::Object(Map::new());
            }
            data[CONSENT_KEY] = Value::Bool(true);
        })
        .await?;
    tracing::info!("Profile {} consented to profile creation", user.id);

    Ok(StatusCode::OK)
}

#[utoipa::path(
    get,
    path = "/profiles",
    responses(
        (status = 200, description = "All profiles", body = [ProfileResponse])
    ),
    tag = "profiles"
)]
pub async fn list_profiles(
    State(state): State<AppState>,
) -> Result<Json<Vec<ProfileResponse>>, AppError> {
    let users = state.users.find_all().await?;
    Ok(Json(users.into_iter().map(format_user).collect()))
}

#[utoipa::path(
    get,
    path = "/profiles/{id}",
    params(
        ("id" = i32, Path, description = "Profile id")
    ),
    responses(
        (status = 200, description = "The profile; `remote_id` only for its owner", body = ProfileResponse),
        (status = 404, description = "Profile not found")
    ),
    tag = "profiles"
)]
pub async fn get_profile(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<ProfileResponse>, AppError> {
    let not_found = || AppError::NotFound("Profile not found".to_string());

    let id: i32 = id.parse().map_err(|_| not_found())?;
    let user = state.users.find_by_id(id).await?.ok_or_else(not_found)?;

    // Anonymous viewers are fine here
    let viewer = state.sessions.user_for_session(&headers).await.ok();

    Ok(Json(format_user_safe(viewer.as_ref(), user)))
}
