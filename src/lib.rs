pub mod api;
pub mod config;
pub mod entities;
pub mod infrastructure;
pub mod services;
pub mod utils;

use crate::config::AppConfig;
use crate::services::blob_store::BlobStore;
use crate::services::directory::DirectoryClient;
use crate::services::image_ingest::ImageIngestService;
use crate::services::session::SessionResolver;
use crate::services::user_store::UserStore;
use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::HeaderValue,
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post, put},
};
use sea_orm::DatabaseConnection;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    paths(
        api::handlers::profiles::get_me,
        api::handlers::profiles::put_me,
        api::handlers::profiles::consent,
        api::handlers::profiles::list_profiles,
        api::handlers::profiles::get_profile,
        api::handlers::images::put_image,
        api::handlers::images::get_image,
        api::handlers::health::health_check,
    ),
    components(
        schemas(
            api::handlers::profiles::ProfileResponse,
            api::handlers::profiles::MeResponse,
            services::directory::ProfileExtras,
            api::handlers::health::HealthResponse,
        )
    ),
    tags(
        (name = "profiles", description = "Profile endpoints"),
        (name = "system", description = "Operational endpoints")
    )
)]
pub struct ApiDoc;

#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub users: UserStore,
    pub sessions: Arc<SessionResolver>,
    pub directory: Arc<dyn DirectoryClient>,
    pub images: Arc<ImageIngestService>,
    pub config: AppConfig,
}

impl AppState {
    pub fn new(
        db: DatabaseConnection,
        directory: Arc<dyn DirectoryClient>,
        blob_store: Arc<dyn BlobStore>,
        config: AppConfig,
    ) -> Self {
        let users = UserStore::new(db.clone());
        let sessions = Arc::new(SessionResolver::new(
            users.clone(),
            config.session_secret.clone(),
            config.session_cookie_name.clone(),
        ));
        let images = Arc::new(ImageIngestService::new(blob_store, config.max_image_width));

        Self {
            db,
            users,
            sessions,
            directory,
            images,
            config,
        }
    }
}

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let allow_origin = if allowed_origins.iter().any(|origin| origin == "*") {
        AllowOrigin::any()
    } else {
        AllowOrigin::list(
            allowed_origins
                .iter()
                .filter_map(|origin| origin.parse::<HeaderValue>().ok()),
        )
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods(Any)
        .allow_headers(Any)
}

pub fn create_app(state: AppState) -> Router {
    let session = || from_fn_with_state(state.clone(), api::middleware::session::session_middleware);

    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .route("/health", get(api::handlers::health::health_check))
        .route(
            "/me",
            get(api::handlers::profiles::get_me)
                .put(api::handlers::profiles::put_me)
                .layer(session()),
        )
        .route(
            "/me/consent",
            post(api::handlers::profiles::consent).layer(session()),
        )
        .route(
            "/me/image",
            put(api::handlers::images::put_image)
                .layer(DefaultBodyLimit::max(state.config.max_upload_size)),
        )
        .route("/profiles", get(api::handlers::profiles::list_profiles))
        .route("/profiles/:id", get(api::handlers::profiles::get_profile))
        .route("/images/:file_name", get(api::handlers::images::get_image))
        .layer(from_fn(api::middleware::request_id::request_id_middleware))
        .layer(cors_layer(&state.config.allowed_origins))
        .with_state(state)
}
