//! Configuration module
//!
//! Everything is read once from the process environment (after loading `.env`)
//! and then passed around as immutable values. Nothing in the pipeline reads
//! ambient global tables.

use std::collections::HashMap;
use std::env;
use std::str::FromStr;

use crate::models::FileCategory;
use crate::storage_types::StorageBackend;

const MB: u64 = 1024 * 1024;

const SERVER_PORT: u16 = 3000;
const MAX_CONNECTIONS: u32 = 10;
const CONNECTION_TIMEOUT_SECS: u64 = 30;
const STORAGE_TIMEOUT_SECS: u64 = 30;
const DATABASE_TIMEOUT_SECS: u64 = 10;
const THUMBNAIL_WIDTH: u32 = 300;
const THUMBNAIL_HEIGHT: u32 = 300;
const THUMBNAIL_QUALITY: u8 = 80;
const ORPHAN_SWEEP_MIN_AGE_SECS: u64 = 300;
const HTTP_CONCURRENCY_LIMIT: usize = 10_000;

const DEFAULT_MAX_FILE_SIZE_MB: u64 = 50;
const IMAGE_MAX_FILE_SIZE_MB: u64 = 10;
const VIDEO_MAX_FILE_SIZE_MB: u64 = 100;
const AUDIO_MAX_FILE_SIZE_MB: u64 = 50;
const DOCUMENT_MAX_FILE_SIZE_MB: u64 = 25;
const ARCHIVE_MAX_FILE_SIZE_MB: u64 = 50;

const IMAGE_CONTENT_TYPES: &str = "image/jpeg,image/png,image/gif,image/webp";
const VIDEO_CONTENT_TYPES: &str = "video/mp4,video/mpeg,video/quicktime,video/webm";
const AUDIO_CONTENT_TYPES: &str = "audio/mpeg,audio/wav,audio/ogg,audio/mp3";
const DOCUMENT_CONTENT_TYPES: &str = "application/pdf,application/msword,application/vnd.openxmlformats-officedocument.wordprocessingml.document,text/plain,text/csv";
const ARCHIVE_CONTENT_TYPES: &str = "application/zip,application/x-rar-compressed,application/gzip";

/// How stored names are generated.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NamingStrategy {
    /// `{random uuid}.{ext}`
    Uuid,
    /// `{millisecond timestamp}_{6 base-36 chars}.{ext}`
    Timestamp,
}

impl FromStr for NamingStrategy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "uuid" => Ok(NamingStrategy::Uuid),
            "timestamp" => Ok(NamingStrategy::Timestamp),
            _ => Err(anyhow::anyhow!("Invalid stored name strategy: {}", s)),
        }
    }
}

/// Per-category ceilings and allow-lists, as configured.
///
/// A category missing from `max_file_sizes` falls back to
/// `default_max_file_size`; a category missing from `allowed_content_types`
/// accepts any content type.
#[derive(Clone, Debug, PartialEq)]
pub struct PolicyConfig {
    pub default_max_file_size: u64,
    pub max_file_sizes: HashMap<FileCategory, u64>,
    pub allowed_content_types: HashMap<FileCategory, Vec<String>>,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        let max_file_sizes = HashMap::from([
            (FileCategory::Image, IMAGE_MAX_FILE_SIZE_MB * MB),
            (FileCategory::Video, VIDEO_MAX_FILE_SIZE_MB * MB),
            (FileCategory::Audio, AUDIO_MAX_FILE_SIZE_MB * MB),
            (FileCategory::Document, DOCUMENT_MAX_FILE_SIZE_MB * MB),
            (FileCategory::Archive, ARCHIVE_MAX_FILE_SIZE_MB * MB),
        ]);

        let allowed_content_types = HashMap::from([
            (FileCategory::Image, parse_list(IMAGE_CONTENT_TYPES)),
            (FileCategory::Video, parse_list(VIDEO_CONTENT_TYPES)),
            (FileCategory::Audio, parse_list(AUDIO_CONTENT_TYPES)),
            (FileCategory::Document, parse_list(DOCUMENT_CONTENT_TYPES)),
            (FileCategory::Archive, parse_list(ARCHIVE_CONTENT_TYPES)),
        ]);

        PolicyConfig {
            default_max_file_size: DEFAULT_MAX_FILE_SIZE_MB * MB,
            max_file_sizes,
            allowed_content_types,
        }
    }
}

impl PolicyConfig {
    /// Largest size any category accepts; bounds request bodies.
    pub fn largest_ceiling(&self) -> u64 {
        self.max_file_sizes
            .values()
            .copied()
            .fold(self.default_max_file_size, u64::max)
    }

    /// Ceiling for `category`, falling back to the default ceiling.
    pub fn max_file_size(&self, category: FileCategory) -> u64 {
        self.max_file_sizes
            .get(&category)
            .copied()
            .unwrap_or(self.default_max_file_size)
    }

    fn from_env() -> Result<Self, anyhow::Error> {
        let mut policy = PolicyConfig::default();

        policy.default_max_file_size = megabytes(
            "DEFAULT_MAX_FILE_SIZE_MB",
            env_parse("DEFAULT_MAX_FILE_SIZE_MB", DEFAULT_MAX_FILE_SIZE_MB),
        )?;

        for category in FileCategory::ALL {
            let prefix = category.as_str();
            let size_key = format!("{}_MAX_FILE_SIZE_MB", prefix);

            if let Some(mb) = env::var(&size_key)
                .ok()
                .and_then(|s| s.trim().parse::<u64>().ok())
            {
                policy
                    .max_file_sizes
                    .insert(category, megabytes(&size_key, mb)?);
            }

            if let Ok(list) = env::var(format!("{}_ALLOWED_CONTENT_TYPES", prefix)) {
                let types = parse_list(&list);
                if types.is_empty() {
                    policy.allowed_content_types.remove(&category);
                } else {
                    policy.allowed_content_types.insert(category, types);
                }
            }
        }

        Ok(policy)
    }

    fn validate(&self) -> Result<(), anyhow::Error> {
        if self.default_max_file_size == 0 || self.max_file_sizes.values().any(|&max| max == 0) {
            return Err(anyhow::anyhow!("*_MAX_FILE_SIZE_MB must be greater than zero"));
        }

        // The largest ceiling becomes the request body limit.
        if usize::try_from(self.largest_ceiling()).is_err() {
            return Err(anyhow::anyhow!("*_MAX_FILE_SIZE_MB is too large"));
        }

        Ok(())
    }
}

/// Convert a configured megabyte count to bytes, rejecting values that overflow.
fn megabytes(key: &str, mb: u64) -> Result<u64, anyhow::Error> {
    mb.checked_mul(MB)
        .ok_or_else(|| anyhow::anyhow!("{} is too large: {} MB", key, mb))
}

/// Settings for the S3-compatible hosted backend.
#[derive(Clone, Debug)]
pub struct HostedStorageConfig {
    pub region: String,
    /// Custom endpoint for S3-compatible providers (MinIO, etc.)
    pub endpoint: Option<String>,
    /// Base of the public URLs handed back to clients.
    pub public_url: Option<String>,
    pub bucket_image: String,
    pub bucket_video: String,
    pub bucket_audio: String,
    pub bucket_document: String,
    pub bucket_default: String,
}

impl HostedStorageConfig {
    pub fn bucket_for(&self, category: FileCategory) -> &str {
        match category {
            FileCategory::Image => &self.bucket_image,
            FileCategory::Video => &self.bucket_video,
            FileCategory::Audio => &self.bucket_audio,
            FileCategory::Document => &self.bucket_document,
            FileCategory::Archive | FileCategory::Other => &self.bucket_default,
        }
    }
}

impl Default for HostedStorageConfig {
    fn default() -> Self {
        HostedStorageConfig {
            region: "us-east-1".to_string(),
            endpoint: None,
            public_url: None,
            bucket_image: "images".to_string(),
            bucket_video: "videos".to_string(),
            bucket_audio: "audio".to_string(),
            bucket_document: "documents".to_string(),
            bucket_default: "files".to_string(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct FiledockConfig {
    pub environment: String,
    pub server_host: String,
    pub server_port: u16,
    pub database_url: String,
    pub db_max_connections: u32,
    pub db_timeout_seconds: u64,
    pub storage_backend: StorageBackend,
    pub local_storage_path: String,
    pub hosted: HostedStorageConfig,
    pub policy: PolicyConfig,
    pub naming_strategy: NamingStrategy,
    pub thumbnail_width: u32,
    pub thumbnail_height: u32,
    pub thumbnail_quality: u8,
    pub storage_timeout_secs: u64,
    pub database_timeout_secs: u64,
    /// 0 disables the periodic sweep; the on-demand endpoint is always mounted.
    pub orphan_sweep_interval_secs: u64,
    pub orphan_sweep_min_age_secs: u64,
    pub log_format: String,
    pub cors_origins: Vec<String>,
    pub http_concurrency_limit: usize,
}

impl FiledockConfig {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        let environment = env::var("ENVIRONMENT")
            .or_else(|_| env::var("APP_ENV"))
            .unwrap_or_else(|_| "development".to_string());

        let storage_backend = match env::var("STORAGE_BACKEND") {
            Ok(value) => value.parse::<StorageBackend>()?,
            Err(_) => StorageBackend::Local,
        };

        let naming_strategy = match env::var("STORED_NAME_STRATEGY") {
            Ok(value) => value.parse::<NamingStrategy>()?,
            Err(_) => NamingStrategy::Uuid,
        };

        let hosted = HostedStorageConfig {
            region: env::var("HOSTED_STORAGE_REGION")
                .or_else(|_| env::var("AWS_REGION"))
                .unwrap_or_else(|_| "us-east-1".to_string()),
            endpoint: env::var("HOSTED_STORAGE_ENDPOINT")
                .ok()
                .filter(|s| !s.is_empty()),
            public_url: env::var("HOSTED_STORAGE_PUBLIC_URL")
                .ok()
                .filter(|s| !s.is_empty()),
            bucket_image: env::var("HOSTED_BUCKET_IMAGE").unwrap_or_else(|_| "images".to_string()),
            bucket_video: env::var("HOSTED_BUCKET_VIDEO").unwrap_or_else(|_| "videos".to_string()),
            bucket_audio: env::var("HOSTED_BUCKET_AUDIO").unwrap_or_else(|_| "audio".to_string()),
            bucket_document: env::var("HOSTED_BUCKET_DOCUMENT")
                .unwrap_or_else(|_| "documents".to_string()),
            bucket_default: env::var("HOSTED_BUCKET_DEFAULT")
                .unwrap_or_else(|_| "files".to_string()),
        };

        let config = FiledockConfig {
            environment,
            server_host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            server_port: env::var("PORT")
                .unwrap_or_else(|_| SERVER_PORT.to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("PORT must be a valid number"))?,
            database_url: env::var("DATABASE_URL")
                .map_err(|_| anyhow::anyhow!("DATABASE_URL must be set"))?,
            db_max_connections: env_parse("DB_MAX_CONNECTIONS", MAX_CONNECTIONS),
            db_timeout_seconds: env_parse("DB_TIMEOUT_SECONDS", CONNECTION_TIMEOUT_SECS),
            storage_backend,
            local_storage_path: env::var("LOCAL_STORAGE_PATH")
                .unwrap_or_else(|_| "public".to_string()),
            hosted,
            policy: PolicyConfig::from_env()?,
            naming_strategy,
            thumbnail_width: env_parse("THUMBNAIL_WIDTH", THUMBNAIL_WIDTH),
            thumbnail_height: env_parse("THUMBNAIL_HEIGHT", THUMBNAIL_HEIGHT),
            thumbnail_quality: env_parse("THUMBNAIL_QUALITY", THUMBNAIL_QUALITY),
            storage_timeout_secs: env_parse("STORAGE_TIMEOUT_SECS", STORAGE_TIMEOUT_SECS),
            database_timeout_secs: env_parse("DATABASE_TIMEOUT_SECS", DATABASE_TIMEOUT_SECS),
            orphan_sweep_interval_secs: env_parse("ORPHAN_SWEEP_INTERVAL_SECS", 0),
            orphan_sweep_min_age_secs: env_parse(
                "ORPHAN_SWEEP_MIN_AGE_SECS",
                ORPHAN_SWEEP_MIN_AGE_SECS,
            ),
            log_format: env::var("LOG_FORMAT")
                .unwrap_or_else(|_| "pretty".to_string())
                .to_lowercase(),
            cors_origins: env::var("CORS_ORIGINS")
                .unwrap_or_else(|_| "*".to_string())
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
            http_concurrency_limit: env_parse("HTTP_CONCURRENCY_LIMIT", HTTP_CONCURRENCY_LIMIT),
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if !self.database_url.starts_with("postgres://")
            && !self.database_url.starts_with("postgresql://")
        {
            return Err(anyhow::anyhow!(
                "DATABASE_URL must be a valid PostgreSQL connection string"
            ));
        }

        match self.storage_backend {
            StorageBackend::Local => {
                if self.local_storage_path.trim().is_empty() {
                    return Err(anyhow::anyhow!(
                        "LOCAL_STORAGE_PATH must be set when using local storage backend"
                    ));
                }
            }
            StorageBackend::Hosted => {
                if self.hosted.public_url.is_none() {
                    return Err(anyhow::anyhow!(
                        "HOSTED_STORAGE_PUBLIC_URL must be set when using hosted storage backend"
                    ));
                }
            }
        }

        if self.thumbnail_width == 0 || self.thumbnail_height == 0 {
            return Err(anyhow::anyhow!(
                "THUMBNAIL_WIDTH and THUMBNAIL_HEIGHT must be greater than zero"
            ));
        }

        if self.thumbnail_quality == 0 || self.thumbnail_quality > 100 {
            return Err(anyhow::anyhow!("THUMBNAIL_QUALITY must be between 1 and 100"));
        }

        let production = matches!(self.environment.to_lowercase().as_str(), "production" | "prod");
        if production && self.cors_origins.iter().any(|o| o == "*") {
            return Err(anyhow::anyhow!(
                "CORS_ORIGINS must list specific origins in production"
            ));
        }

        if self.storage_timeout_secs == 0 || self.database_timeout_secs == 0 {
            return Err(anyhow::anyhow!(
                "STORAGE_TIMEOUT_SECS and DATABASE_TIMEOUT_SECS must be greater than zero"
            ));
        }

        if self.http_concurrency_limit == 0 {
            return Err(anyhow::anyhow!("HTTP_CONCURRENCY_LIMIT must be greater than zero"));
        }

        self.policy.validate()
    }
}

/// Shared, cheaply clonable configuration handle.
#[derive(Clone, Debug)]
pub struct Config(pub Box<FiledockConfig>);

impl Config {
    fn inner(&self) -> &FiledockConfig {
        &self.0
    }

    pub fn from_env() -> Result<Self, anyhow::Error> {
        let config = FiledockConfig::from_env()?;
        Ok(Config(Box::new(config)))
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        self.inner().validate()
    }

    /// Check if the application is running in production mode
    pub fn is_production(&self) -> bool {
        let env = self.inner().environment.to_lowercase();
        env == "production" || env == "prod"
    }

    pub fn server_host(&self) -> &str {
        &self.inner().server_host
    }

    pub fn server_port(&self) -> u16 {
        self.inner().server_port
    }

    pub fn database_url(&self) -> &str {
        &self.inner().database_url
    }

    pub fn db_max_connections(&self) -> u32 {
        self.inner().db_max_connections
    }

    pub fn db_timeout_seconds(&self) -> u64 {
        self.inner().db_timeout_seconds
    }

    pub fn storage_backend(&self) -> StorageBackend {
        self.inner().storage_backend
    }

    pub fn local_storage_path(&self) -> &str {
        &self.inner().local_storage_path
    }

    pub fn hosted(&self) -> &HostedStorageConfig {
        &self.inner().hosted
    }

    pub fn policy(&self) -> &PolicyConfig {
        &self.inner().policy
    }

    pub fn naming_strategy(&self) -> NamingStrategy {
        self.inner().naming_strategy
    }

    pub fn thumbnail_box(&self) -> (u32, u32) {
        (self.inner().thumbnail_width, self.inner().thumbnail_height)
    }

    pub fn thumbnail_quality(&self) -> u8 {
        self.inner().thumbnail_quality
    }

    pub fn storage_timeout_secs(&self) -> u64 {
        self.inner().storage_timeout_secs
    }

    pub fn database_timeout_secs(&self) -> u64 {
        self.inner().database_timeout_secs
    }

    pub fn orphan_sweep_interval_secs(&self) -> u64 {
        self.inner().orphan_sweep_interval_secs
    }

    pub fn orphan_sweep_min_age_secs(&self) -> u64 {
        self.inner().orphan_sweep_min_age_secs
    }

    pub fn log_format(&self) -> &str {
        &self.inner().log_format
    }

    pub fn cors_origins(&self) -> &[String] {
        &self.inner().cors_origins
    }

    pub fn http_concurrency_limit(&self) -> usize {
        self.inner().http_concurrency_limit
    }
}

fn env_parse<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(default)
}

/// Split a comma-separated list into trimmed, lowercased, non-empty entries.
pub fn parse_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .collect()
}
