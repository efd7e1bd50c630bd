//! Runtime configuration for the assignment board, read from the environment.

use std::time::Duration;

use thiserror::Error;
use url::Url;

const DEFAULT_PROGRAMS_PATH: &str = "programas";
const DEFAULT_ATHLETES_PATH: &str = "atletas";
const DEFAULT_ASSIGNMENTS_PATH: &str = "asignaciones";
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
const DEFAULT_MAX_READ_RETRIES: usize = 3;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),
    #[error("invalid value for {name}: {value}")]
    Invalid { name: &'static str, value: String },
    #[error("invalid base url: {0}")]
    BaseUrl(#[from] url::ParseError),
}

/// Everything a board instance needs to talk to the backend.
#[derive(Debug, Clone)]
pub struct BoardConfig {
    pub api_base_url: Url,
    pub api_token: Option<String>,
    pub programs_path: String,
    pub athletes_path: String,
    pub assignments_path: String,
    pub request_timeout: Duration,
    pub max_read_retries: usize,
    /// Tag carried by this board's drag payloads; drops tagged with another
    /// instance id are ignored.
    pub instance_id: String,
    pub flash_on_move: bool,
}

impl BoardConfig {
    pub fn new(api_base_url: Url) -> Self {
        Self {
            api_base_url,
            api_token: None,
            programs_path: DEFAULT_PROGRAMS_PATH.to_string(),
            athletes_path: DEFAULT_ATHLETES_PATH.to_string(),
            assignments_path: DEFAULT_ASSIGNMENTS_PATH.to_string(),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            max_read_retries: DEFAULT_MAX_READ_RETRIES,
            instance_id: uuid::Uuid::new_v4().to_string(),
            flash_on_move: false,
        }
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from an arbitrary variable source. `from_env` is this with
    /// the process environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let base = lookup("BOARD_API_BASE_URL").ok_or(ConfigError::Missing("BOARD_API_BASE_URL"))?;
        let mut config = Self::new(Url::parse(&base)?);

        config.api_token = lookup("BOARD_API_TOKEN").filter(|t| !t.is_empty());
        if let Some(path) = lookup("BOARD_PROGRAMS_PATH") {
            config.programs_path = path;
        }
        if let Some(path) = lookup("BOARD_ATHLETES_PATH") {
            config.athletes_path = path;
        }
        if let Some(path) = lookup("BOARD_ASSIGNMENTS_PATH") {
            config.assignments_path = path;
        }
        if let Some(raw) = lookup("BOARD_REQUEST_TIMEOUT_SECS") {
            let secs = parse_value::<u64>("BOARD_REQUEST_TIMEOUT_SECS", raw)?;
            config.request_timeout = Duration::from_secs(secs);
        }
        if let Some(raw) = lookup("BOARD_API_MAX_RETRIES") {
            config.max_read_retries = parse_value("BOARD_API_MAX_RETRIES", raw)?;
        }
        if let Some(id) = lookup("BOARD_INSTANCE_ID").filter(|id| !id.is_empty()) {
            config.instance_id = id;
        }
        if let Some(raw) = lookup("BOARD_FLASH_ON_MOVE") {
            config.flash_on_move = parse_flag("BOARD_FLASH_ON_MOVE", raw)?;
        }

        Ok(config)
    }
}

fn parse_value<T: std::str::FromStr>(name: &'static str, raw: String) -> Result<T, ConfigError> {
    raw.trim()
        .parse()
        .map_err(|_| ConfigError::Invalid { name, value: raw })
}

fn parse_flag(name: &'static str, raw: String) -> Result<bool, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        _ => Err(ConfigError::Invalid { name, value: raw }),
    }
}
