use crate::AppState;
use crate::api::error::AppError;
use crate::entities::users;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

/// The user owning the request's session, inserted by `session_middleware`.
#[derive(Clone, Debug)]
pub struct CurrentUser(pub users::Model);

pub async fn session_middleware(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let user = state.sessions.user_for_session(req.headers()).await?;
    req.extensions_mut().insert(CurrentUser(user));
    Ok(next.run(req).await)
}
