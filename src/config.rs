use std::env;
use std::str::FromStr;

use serde::Deserialize;

use crate::models::CourseCatalog;

const DEFAULT_CANVAS_BASE_URL: &str = "https://saratogausd.instructure.com/api/v1";
const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_OPENAI_MODEL: &str = "gpt-4o";
const DEFAULT_COURSES: &str =
    "Language Arts=1023,Math=972,Media Arts=999,Science=971,Social Studies=1005";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub canvas: CanvasConfig,
    pub openai: OpenAiConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CanvasConfig {
    /// API root, e.g. `https://school.instructure.com/api/v1` (no trailing slash).
    pub base_url: String,
    /// Static bearer token for the course API.
    pub token: String,
    /// Subjects in fetch order. Read from `CANVAS_COURSES` as `Subject=id,...`.
    pub courses: CourseCatalog,
    pub per_page: u32,
    pub timeout_seconds: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OpenAiConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub timeout_seconds: u64,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let canvas_base_url =
            env::var("CANVAS_BASE_URL").unwrap_or_else(|_| DEFAULT_CANVAS_BASE_URL.to_string());
        validate_url("CANVAS_BASE_URL", &canvas_base_url)?;

        let openai_base_url =
            env::var("OPENAI_BASE_URL").unwrap_or_else(|_| DEFAULT_OPENAI_BASE_URL.to_string());
        validate_url("OPENAI_BASE_URL", &openai_base_url)?;

        let courses = parse_course_catalog(
            &env::var("CANVAS_COURSES").unwrap_or_else(|_| DEFAULT_COURSES.to_string()),
        )?;

        Ok(Config {
            server: ServerConfig {
                host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: env::var("PORT")
                    .unwrap_or_else(|_| "8080".to_string())
                    .parse()
                    .map_err(|_| ConfigError::InvalidValue("PORT".to_string()))?,
            },
            canvas: CanvasConfig {
                base_url: canvas_base_url.trim_end_matches('/').to_string(),
                token: env::var("CANVAS_TOKEN")
                    .map_err(|_| ConfigError::MissingEnv("CANVAS_TOKEN".to_string()))?,
                courses,
                per_page: positive_env("CANVAS_PER_PAGE", "100")?,
                timeout_seconds: positive_env("CANVAS_TIMEOUT_SECONDS", "30")?,
            },
            openai: OpenAiConfig {
                api_key: env::var("OPENAI_API_KEY")
                    .map_err(|_| ConfigError::MissingEnv("OPENAI_API_KEY".to_string()))?,
                base_url: openai_base_url.trim_end_matches('/').to_string(),
                model: env::var("OPENAI_MODEL")
                    .unwrap_or_else(|_| DEFAULT_OPENAI_MODEL.to_string()),
                timeout_seconds: positive_env("OPENAI_TIMEOUT_SECONDS", "120")?,
            },
        })
    }
}

/// Read a non-zero integer from the environment, falling back to `default`
/// when the variable is unset.
fn positive_env<T>(name: &str, default: &str) -> Result<T, ConfigError>
where
    T: FromStr + PartialEq + From<u8>,
{
    let raw = env::var(name).unwrap_or_else(|_| default.to_string());
    match raw.trim().parse::<T>() {
        Ok(value) if value != T::from(0) => Ok(value),
        _ => Err(ConfigError::InvalidValue(name.to_string())),
    }
}

fn validate_url(name: &str, value: &str) -> Result<(), ConfigError> {
    match url::Url::parse(value) {
        Ok(u) if u.scheme() == "http" || u.scheme() == "https" => Ok(()),
        _ => Err(ConfigError::InvalidValue(name.to_string())),
    }
}

/// Parse `Subject=id,Subject=id` into an ordered catalog.
///
/// Subject names may contain spaces; blank entries are ignored. A repeated
/// subject is rejected since subjects key the per-course warnings.
pub fn parse_course_catalog(raw: &str) -> Result<CourseCatalog, ConfigError> {
    let mut catalog = CourseCatalog::default();

    for entry in raw.split(',').map(str::trim).filter(|e| !e.is_empty()) {
        let (subject, id) = entry
            .split_once('=')
            .ok_or_else(|| ConfigError::InvalidCourse(entry.to_string()))?;
        let subject = subject.trim();
        let id = id.trim();

        if subject.is_empty() || id.is_empty() {
            return Err(ConfigError::InvalidCourse(entry.to_string()));
        }

        if !catalog.insert(subject, id) {
            return Err(ConfigError::DuplicateSubject(subject.to_string()));
        }
    }

    if catalog.is_empty() {
        return Err(ConfigError::InvalidValue("CANVAS_COURSES".to_string()));
    }

    Ok(catalog)
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnv(String),

    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(String),

    #[error("Invalid course entry (expected Subject=id): {0}")]
    InvalidCourse(String),

    #[error("Subject listed more than once: {0}")]
    DuplicateSubject(String),
}

impl Default for Config {
    fn default() -> Self {
        Config {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 8080,
            },
            canvas: CanvasConfig {
                base_url: DEFAULT_CANVAS_BASE_URL.to_string(),
                token: String::new(),
                courses: parse_course_catalog(DEFAULT_COURSES).unwrap_or_default(),
                per_page: 100,
                timeout_seconds: 30,
            },
            openai: OpenAiConfig {
                api_key: String::new(),
                base_url: DEFAULT_OPENAI_BASE_URL.to_string(),
                model: DEFAULT_OPENAI_MODEL.to_string(),
                timeout_seconds: 120,
            },
        }
    }
}
