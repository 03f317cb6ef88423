//! Application configuration for the masterlist pipeline.
//!
//! User config lives at `~/.masterlist/masterlist.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{MasterlistError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "masterlist.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".masterlist";

/// Program codes recognized at the end of a roster line when no list is configured.
pub const DEFAULT_PROGRAM_CODES: &[&str] = &[
    "BSCS", "BSIT", "BSECE", "BIT", "BET", "BSEE", "BSME", "BSCE", "BSA", "BSBA", "BSTM", "BSHM",
    "BSENT",
];

// ---------------------------------------------------------------------------
// Config structs (matching masterlist.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Bucket and database locations.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Roster parsing settings.
    #[serde(default)]
    pub parser: ParserSection,
}

/// `[storage]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory holding one sub-directory per bucket.
    #[serde(default = "default_buckets_root")]
    pub buckets_root: String,

    /// Bucket used when a command does not name one.
    #[serde(default = "default_bucket")]
    pub default_bucket: String,

    /// libSQL database file backing the student collections.
    #[serde(default = "default_database_path")]
    pub database_path: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            buckets_root: default_buckets_root(),
            default_bucket: default_bucket(),
            database_path: default_database_path(),
        }
    }
}

fn default_buckets_root() -> String {
    "~/.masterlist/buckets".into()
}
fn default_bucket() -> String {
    "masterlist-uploads".into()
}
fn default_database_path() -> String {
    "~/.masterlist/masterlist.db".into()
}

/// `[parser]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParserSection {
    /// Program codes that terminate a student's name on a roster line.
    #[serde(default = "default_program_codes")]
    pub program_codes: Vec<String>,

    /// Names shorter than this (in characters) are treated as noise.
    #[serde(default = "default_min_name_len")]
    pub min_name_len: usize,
}

impl Default for ParserSection {
    fn default() -> Self {
        Self {
            program_codes: default_program_codes(),
            min_name_len: default_min_name_len(),
        }
    }
}

fn default_program_codes() -> Vec<String> {
    DEFAULT_PROGRAM_CODES.iter().map(|c| c.to_string()).collect()
}
fn default_min_name_len() -> usize {
    4
}

impl StorageConfig {
    /// Bucket root with `~` expanded.
    pub fn buckets_root_path(&self) -> Result<PathBuf> {
        expand_home(&self.buckets_root)
    }

    /// Database path with `~` expanded.
    pub fn database_path_buf(&self) -> Result<PathBuf> {
        expand_home(&self.database_path)
    }
}

// ---------------------------------------------------------------------------
// Parser config (runtime, merged from config + CLI flags)
// ---------------------------------------------------------------------------

/// Runtime parser configuration.
#[derive(Debug, Clone)]
pub struct ParserConfig {
    /// Program codes, matched case-insensitively anywhere in the name remainder.
    pub program_codes: Vec<String>,
    /// Minimum accepted name length in characters.
    pub min_name_len: usize,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self::from(&AppConfig::default())
    }
}

impl From<&AppConfig> for ParserConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            program_codes: config.parser.program_codes.clone(),
            min_name_len: config.parser.min_name_len,
        }
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.masterlist/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| MasterlistError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.masterlist/masterlist.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Expand a leading `~/` to the user's home directory.
pub fn expand_home(path: &str) -> Result<PathBuf> {
    match path.strip_prefix("~/") {
        Some(rest) => {
            let home = dirs::home_dir()
                .ok_or_else(|| MasterlistError::config("could not determine home directory"))?;
            Ok(home.join(rest))
        }
        None if path == "~" => dirs::home_dir()
            .ok_or_else(|| MasterlistError::config("could not determine home directory")),
        None => Ok(PathBuf::from(path)),
    }
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| MasterlistError::io(path, e))?;

    let config: AppConfig = toml::from_str(&content).map_err(|e| {
        MasterlistError::config(format!("failed to parse {}: {e}", path.display()))
    })?;

    if config.parser.program_codes.iter().any(|c| c.trim().is_empty()) {
        return Err(MasterlistError::config(format!(
            "{}: parser.program_codes must not contain empty entries",
            path.display()
        )));
    }

    Ok(config)
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| MasterlistError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| MasterlistError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| MasterlistError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize default config");
        assert!(toml_str.contains("buckets_root"));
        assert!(toml_str.contains("BSENT"));
    }

    #[test]
    fn config_roundtrip() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize");
        let parsed: AppConfig = toml::from_str(&toml_str).expect("deserialize");
        assert_eq!(parsed.parser.min_name_len, 4);
        assert_eq!(parsed.parser.program_codes.len(), DEFAULT_PROGRAM_CODES.len());
        assert_eq!(parsed.storage.default_bucket, "masterlist-uploads");
    }

    #[test]
    fn config_with_extra_program_codes() {
        let toml_str = r#"
[parser]
program_codes = ["BSCS", "BSIT", "BSARCH"]

[storage]
database_path = "/tmp/masterlist.db"
"#;
        let config: AppConfig = toml::from_str(toml_str).expect("parse");
        assert_eq!(config.parser.program_codes, vec!["BSCS", "BSIT", "BSARCH"]);
        assert_eq!(config.parser.min_name_len, 4);
        assert_eq!(config.storage.database_path, "/tmp/masterlist.db");
        assert_eq!(config.storage.buckets_root, "~/.masterlist/buckets");
    }

    #[test]
    fn parser_config_from_app_config() {
        let mut app = AppConfig::default();
        app.parser.min_name_len = 2;
        let parser = ParserConfig::from(&app);
        assert_eq!(parser.min_name_len, 2);
        assert!(parser.program_codes.iter().any(|c| c == "BSHM"));
    }

    #[test]
    fn load_rejects_blank_program_code() {
        let path = std::env::temp_dir().join(format!(
            "masterlist_cfg_{}_{}.toml",
            std::process::id(),
            line!()
        ));
        std::fs::write(&path, "[parser]\nprogram_codes = [\"BSCS\", \"  \"]\n").unwrap();
        let result = load_config_from(&path);
        std::fs::remove_file(&path).ok();
        assert!(result.unwrap_err().to_string().contains("empty entries"));
    }

    #[test]
    fn expand_home_leaves_absolute_paths() {
        assert_eq!(
            expand_home("/var/lib/masterlist.db").unwrap(),
            PathBuf::from("/var/lib/masterlist.db")
        );
        let expanded = expand_home("~/.masterlist/buckets").unwrap();
        assert!(expanded.ends_with(".masterlist/buckets"));
        assert!(!expanded.to_string_lossy().starts_with('~'));
    }
}
