//! Server configuration.
//!
//! Values come from the environment (a `.env` file is loaded by the binary
//! through dotenvy) and can be overridden by command-line flags.
//!
//! | Variable                        | Default   |
//! |---------------------------------|-----------|
//! | `STOCKFILTER_PORT` (or `PORT`)  | `8000`    |
//! | `STOCKFILTER_MODE`              | `lenient` |
//! | `STOCKFILTER_DEFAULT_SHEET`     | per mode  |
//! | `STOCKFILTER_DOWNLOAD_TTL_SECS` | `600`     |
//! | `STOCKFILTER_MAX_UPLOAD_BYTES`  | 20 MiB    |

use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::transform::pipeline::ConvertOptions;
use crate::transform::policy::{FilterMode, FilterPolicy};

pub const DEFAULT_PORT: u16 = 8000;
pub const DEFAULT_DOWNLOAD_TTL_SECS: u64 = 600;
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;

/// Everything the HTTP layer needs, passed explicitly through router state.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    pub mode: FilterMode,
    pub policy: FilterPolicy,
    /// Sheet used when an upload names none (`None` = first sheet).
    pub default_sheet: Option<String>,
    /// How long a converted document stays downloadable.
    pub download_ttl: Duration,
    pub max_upload_bytes: usize,
}

impl AppConfig {
    /// Defaults for a filter mode.
    pub fn for_mode(mode: FilterMode) -> Self {
        Self {
            port: DEFAULT_PORT,
            mode,
            policy: mode.policy(),
            default_sheet: mode.default_sheet(),
            download_ttl: Duration::from_secs(DEFAULT_DOWNLOAD_TTL_SECS),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }

    /// Read the configuration from environment variables.
    ///
    /// Unparsable values fall back to the default for that setting.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let parsed = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let mode = parsed("STOCKFILTER_MODE")
            .and_then(|v| v.parse::<FilterMode>().ok())
            .unwrap_or_default();
        let mut config = Self::for_mode(mode);

        if let Some(port) = parse_var(parsed("STOCKFILTER_PORT").or_else(|| parsed("PORT"))) {
            config.port = port;
        }
        if let Some(sheet) = parsed("STOCKFILTER_DEFAULT_SHEET") {
            config.default_sheet = Some(sheet.trim().to_string());
        }
        if let Some(secs) = parse_var::<u64>(parsed("STOCKFILTER_DOWNLOAD_TTL_SECS")) {
            config.download_ttl = Duration::from_secs(secs);
        }
        if let Some(bytes) = parse_var(parsed("STOCKFILTER_MAX_UPLOAD_BYTES")) {
            config.max_upload_bytes = bytes;
        }

        config
    }

    /// Switch the filter mode, resetting the policy and default sheet.
    pub fn with_mode(mut self, mode: FilterMode) -> Self {
        self.mode = mode;
        self.policy = mode.policy();
        self.default_sheet = mode.default_sheet();
        self
    }

    /// Conversion options for one upload.
    pub fn convert_options(&self, sheet_name: Option<String>) -> ConvertOptions {
        ConvertOptions {
            sheet_name,
            default_sheet: self.default_sheet.clone(),
            policy: self.policy.clone(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::for_mode(FilterMode::default())
    }
}

fn parse_var<T: FromStr>(value: Option<String>) -> Option<T> {
    value.and_then(|v| v.trim().parse().ok())
}
