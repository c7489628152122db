//! Existence filter policy.
//!
//! Decides which header is the existence column and which cell values count
//! as "in stock". Two presets exist:
//!
//! - [`FilterPolicy::lenient`] (default): four header aliases matched
//!   case-insensitively, values normalized (`" sí "` passes), and
//!   `EXISTENCIAS` synthesized from whichever alias was found.
//! - [`FilterPolicy::strict`]: `EXISTENTE` only, exact header and value
//!   match, every required column must exist verbatim, default sheet `Hoja 1`.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Header aliases for the existence column, highest priority first.
pub const DEFAULT_ALIASES: [&str; 4] = ["EXISTENTE", "EXISTENCIAS", "EXISTENCIA", "EXISTE"];

/// Normalized value of an in-stock row.
pub const IN_STOCK_VALUE: &str = "SI";

/// Sheet read by the strict variant when the upload names none.
pub const STRICT_DEFAULT_SHEET: &str = "Hoja 1";

/// How the existence column is detected and matched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterPolicy {
    /// Accepted header spellings, highest priority first.
    pub aliases: Vec<String>,

    /// Compare headers ignoring case and surrounding whitespace.
    #[serde(default)]
    pub case_insensitive: bool,

    /// Trim, uppercase and fold `Í` to `I` before comparing to `SI`.
    #[serde(default)]
    pub normalize_values: bool,

    /// Build `EXISTENCIAS` from the detected alias when it is missing.
    #[serde(default)]
    pub substitute_alias: bool,
}

impl FilterPolicy {
    pub fn lenient() -> Self {
        Self {
            aliases: DEFAULT_ALIASES.iter().map(|a| a.to_string()).collect(),
            case_insensitive: true,
            normalize_values: true,
            substitute_alias: true,
        }
    }

    pub fn strict() -> Self {
        Self {
            aliases: vec![DEFAULT_ALIASES[0].to_string()],
            case_insensitive: false,
            normalize_values: false,
            substitute_alias: false,
        }
    }

    /// Find the existence column among `headers`.
    ///
    /// Aliases are tried in priority order; the first one present wins and
    /// the actual header spelling is returned.
    pub fn detect_existence_column<'a>(&self, headers: &'a [String]) -> Option<&'a str> {
        self.aliases.iter().find_map(|alias| {
            headers
                .iter()
                .find(|header| self.header_matches(header, alias))
                .map(String::as_str)
        })
    }

    fn header_matches(&self, header: &str, alias: &str) -> bool {
        if self.case_insensitive {
            header.trim().to_lowercase() == alias.to_lowercase()
        } else {
            header == alias
        }
    }

    /// Whether an existence cell marks the row as in stock.
    ///
    /// Absent cells never pass.
    pub fn is_in_stock(&self, value: Option<&str>) -> bool {
        match value {
            Some(v) if self.normalize_values => normalize_flag(v) == IN_STOCK_VALUE,
            Some(v) => v == IN_STOCK_VALUE,
            None => false,
        }
    }
}

impl Default for FilterPolicy {
    fn default() -> Self {
        Self::lenient()
    }
}

/// Trim, uppercase, fold `Í` to `I`.
pub fn normalize_flag(value: &str) -> String {
    value.trim().to_uppercase().replace('Í', "I")
}

// =============================================================================
// Mode selection (CLI / env)
// =============================================================================

/// Named policy preset, selectable from the command line or environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum FilterMode {
    #[default]
    Lenient,
    Strict,
}

impl FilterMode {
    pub fn policy(self) -> FilterPolicy {
        match self {
            FilterMode::Lenient => FilterPolicy::lenient(),
            FilterMode::Strict => FilterPolicy::strict(),
        }
    }

    /// Sheet used when the upload does not name one (`None` = first sheet).
    pub fn default_sheet(self) -> Option<String> {
        match self {
            FilterMode::Lenient => None,
            FilterMode::Strict => Some(STRICT_DEFAULT_SHEET.to_string()),
        }
    }
}

impl FromStr for FilterMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "lenient" => Ok(FilterMode::Lenient),
            "strict" => Ok(FilterMode::Strict),
            other => Err(format!("Unknown filter mode: {}", other)),
        }
    }
}

impl fmt::Display for FilterMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterMode::Lenient => write!(f, "lenient"),
            FilterMode::Strict => write!(f, "strict"),
        }
    }
}
