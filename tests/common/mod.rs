#![allow(dead_code)]

use async_trait::async_trait;
use axum::{
    Router,
    body::Body,
    http::{HeaderMap, Request, StatusCode},
};
use bytes::Bytes;
use http_body_util::BodyExt;
use image::{DynamicImage, ImageBuffer, ImageOutputFormat, Rgb};
use profile_service::config::AppConfig;
use profile_service::entities::users;
use profile_service::infrastructure::database;
use profile_service::services::blob_store::LocalBlobStore;
use profile_service::services::directory::{DirectoryClient, DirectoryError, EmploymentExtras};
use profile_service::utils::auth::create_jwt;
use profile_service::{AppState, create_app};
use sea_orm::DatabaseConnection;
use std::io::Cursor;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tempfile::TempDir;
use tower::ServiceExt;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

pub const BOUNDARY: &str = "---------------------------123456789012345678901234567";

pub fn init_tracing() {
    let _ = tracing_subscriber::registry()
        .with(EnvFilter::new("profile_service=debug"))
        .with(fmt::layer().with_test_writer())
        .try_init();
}

pub async fn setup_test_db() -> DatabaseConnection {
    let db = database::setup_database(&AppConfig::development())
        .await
        .unwrap();
    database::run_migrations(&db).await.unwrap();
    db
}

/// Canned directory answers; `fail` makes every lookup error.
#[derive(Default)]
pub struct MockDirectory {
    pub first_name: Option<String>,
    pub nick_name: Option<String>,
    pub employment: EmploymentExtras,
    pub fail: bool,
    pub calls: Arc<AtomicUsize>,
}

impl MockDirectory {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    fn lookup(&self) -> Result<(), DirectoryError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(DirectoryError::Other("sebacon unavailable".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl DirectoryClient for MockDirectory {
    async fn get_user_first_name(&self, _: &str) -> Result<Option<String>, DirectoryError> {
        self.lookup()?;
        Ok(self.first_name.clone())
    }

    async fn get_user_nick_name(&self, _: &str) -> Result<Option<String>, DirectoryError> {
        self.lookup()?;
        Ok(self.nick_name.clone())
    }

    async fn get_user_employment_extras(
        &self,
        _: &str,
    ) -> Result<EmploymentExtras, DirectoryError> {
        self.lookup()?;
        Ok(self.employment.clone())
    }
}

pub struct TestApp {
    pub app: Router,
    pub state: AppState,
    pub images_dir: TempDir,
}

impl TestApp {
    pub async fn new(directory: MockDirectory) -> Self {
        init_tracing();

        let db = setup_test_db().await;
        let images_dir = tempfile::tempdir().unwrap();
        let mut config = AppConfig::development();
        config.user_images_path = images_dir.path().to_path_buf();

        let store = Arc::new(LocalBlobStore::new(images_dir.path()));
        let state = AppState::new(db, Arc::new(directory), store, config);

        Self {
            app: create_app(state.clone()),
            state,
            images_dir,
        }
    }

    pub async fn create_user(&self, remote_id: &str, data: serde_json::Value) -> users::Model {
        self.state.users.create(remote_id, data).await.unwrap()
    }

    pub fn session_cookie(&self, user: &users::Model) -> String {
        let token = create_jwt(user.id, &self.state.config.session_secret).unwrap();
        format!("{}={}", self.state.config.session_cookie_name, token)
    }

    pub async fn send(&self, request: Request<Body>) -> (StatusCode, HeaderMap, Bytes) {
        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.into_body().collect().await.unwrap().to_bytes();
        (status, headers, body)
    }

    /// Names of everything currently in the image directory.
    pub fn stored_files(&self) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(self.images_dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }
}

pub fn gradient(width: u32, height: u32) -> DynamicImage {
    DynamicImage::ImageRgb8(ImageBuffer::from_fn(width, height, |x, y| {
        Rgb([(x % 256) as u8, (y % 256) as u8, ((x + y) % 256) as u8])
    }))
}

pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let mut buf = Vec::new();
    gradient(width, height)
        .write_to(&mut Cursor::new(&mut buf), ImageOutputFormat::Png)
        .unwrap();
    buf
}

pub fn jpeg_bytes(width: u32, height: u32) -> Vec<u8> {
    let mut buf = Vec::new();
    gradient(width, height)
        .write_to(&mut Cursor::new(&mut buf), ImageOutputFormat::Jpeg(90))
        .unwrap();
    buf
}

/// JPEG carrying an EXIF APP1 segment with the given Orientation tag.
pub fn jpeg_with_orientation(width: u32, height: u32, orientation: u16) -> Vec<u8> {
    let jpeg = jpeg_bytes(width, height);
    assert_eq!(&jpeg[..2], &[0xFF, 0xD8]);

    // Big-endian TIFF with a single IFD entry: 0x0112 SHORT x1
    let mut tiff = vec![b'M', b'M', 0x00, 0x2A, 0x00, 0x00, 0x00, 0x08];
    tiff.extend_from_slice(&[0x00, 0x01]);
    tiff.extend_from_slice(&[0x01, 0x12, 0x00, 0x03, 0x00, 0x00, 0x00, 0x01]);
    tiff.extend_from_slice(&orientation.to_be_bytes());
    tiff.extend_from_slice(&[0x00, 0x00]);
    tiff.extend_from_slice(&[0x00, 0x00, 0x00, 0x00]);

    let mut payload = b"Exif\0\0".to_vec();
    payload.extend_from_slice(&tiff);
    let length = (payload.len() + 2) as u16;

    let mut out = vec![0xFF, 0xD8, 0xFF, 0xE1];
    out.extend_from_slice(&length.to_be_bytes());
    out.extend_from_slice(&payload);
    out.extend_from_slice(&jpeg[2..]);
    out
}

pub fn multipart_body(field: &str, file_name: &str, content_type: &str, data: &[u8]) -> Vec<u8> {
    let mut body = format!(
        "--{boundary}\r\n\
        Content-Disposition: form-data; name=\"{field}\"; filename=\"{file_name}\"\r\n\
        Content-Type: {content_type}\r\n\r\n",
        boundary = BOUNDARY,
    )
    .into_bytes();
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{}--\r\n", BOUNDARY).as_bytes());
    body
}

pub fn image_upload_request(body: Vec<u8>) -> Request<Body> {
    Request::builder()
        .method("PUT")
        .uri("/me/image")
        .header(
            "Content-Type",
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(body))
        .unwrap()
}

pub fn upload_image(field: &str, file_name: &str, data: &[u8]) -> Request<Body> {
    image_upload_request(multipart_body(
        field,
        file_name,
        "application/octet-stream",
        data,
    ))
}
