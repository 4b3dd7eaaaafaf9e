use std::env;
use std::path::PathBuf;

/// Runtime configuration for the profile service
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Database connection string (default: local SQLite file)
    pub database_url: String,

    /// Directory that receives normalized profile images
    pub user_images_path: PathBuf,

    /// Widest allowed profile image in pixels (default: 1024)
    pub max_image_width: u32,

    /// Maximum request body size for uploads in bytes (default: 10 MB)
    pub max_upload_size: usize,

    /// HMAC secret used to validate session tokens
    pub session_secret: String,

    /// Cookie carrying the session token (default: "session")
    pub session_cookie_name: String,

    /// Base URL of the sebacon directory service
    pub directory_base_url: String,

    /// Per-request timeout for directory lookups in seconds (default: 10)
    pub directory_timeout_secs: u64,

    /// Allowed CORS Origins (comma separated)
    pub allowed_origins: Vec<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_url: "sqlite://profiles.db?mode=rwc".to_string(),
            user_images_path: PathBuf::from("./data/user-images"),
            max_image_width: 1024,
            max_upload_size: 10 * 1024 * 1024, // 10 MB
            session_secret: "secret".to_string(),
            session_cookie_name: "session".to_string(),
            directory_base_url: "http://127.0.0.1:8081".to_string(),
            directory_timeout_secs: 10,
            allowed_origins: vec![
                "http://localhost:3000".to_string(),
                "http://127.0.0.1:3000".to_string(),
            ],
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let default = Self::default();

        Self {
            database_url: env::var("DATABASE_URL").unwrap_or(default.database_url),

            user_images_path: env::var("USER_IMAGES_PATH")
                .map(PathBuf::from)
                .unwrap_or(default.user_images_path),

            max_image_width: env::var("MAX_IMAGE_WIDTH")
                .ok()
                .and_then(|v| v.parse().ok())
                .filter(|w| *w > 0)
                .unwrap_or(default.max_image_width),

            max_upload_size: env::var("MAX_UPLOAD_SIZE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default.max_upload_size),

            session_secret: env::var("SESSION_SECRET").unwrap_or(default.session_secret),

            session_cookie_name: env::var("SESSION_COOKIE_NAME")
                .unwrap_or(default.session_cookie_name),

            directory_base_url: env::var("SEBACON_URL").unwrap_or(default.directory_base_url),

            directory_timeout_secs: env::var("SEBACON_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default.directory_timeout_secs),

            allowed_origins: env::var("ALLOWED_ORIGINS")
                .ok()
                .map(|v| v.split(',').map(|s| s.trim().to_string()).collect())
                .unwrap_or(default.allowed_origins),
        }
    }

    /// Create config for tests and local development
    pub fn development() -> Self {
        Self {
            database_url: "sqlite::memory:".to_string(),
            session_secret: "development_secret".to_string(),
            directory_timeout_secs: 2,
            ..Self::default()
        }
    }
}
