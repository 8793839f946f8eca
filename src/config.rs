/// Configuration management for tursoswap
///
/// tursoswap stores configuration in ~/.tursoswap/config.toml

use crate::rewriter::{ClientSettings, SettingsError};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Environment variable holding the Turso auth token
pub const TOKEN_ENV: &str = "TURSO_AUTH_TOKEN";

/// Environment variable overriding the Turso database URL
pub const URL_ENV: &str = "TURSO_DATABASE_URL";

const DEFAULT_URL: &str = "libsql://schoollms-mcoz30.aws-ap-south-1.turso.io";
const DEFAULT_INPUT: &str = "index (7).html";
const DEFAULT_OUTPUT: &str = "index_turso.html";

/// tursoswap configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Replacement backend settings
    #[serde(default)]
    pub turso: TursoConfig,

    /// Source and destination documents
    #[serde(default)]
    pub paths: PathsConfig,

    /// Rewrite behaviour
    #[serde(default)]
    pub rewrite: RewriteConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TursoConfig {
    /// Database URL embedded in the client block
    #[serde(default = "default_url")]
    pub url: String,

    /// Auth token embedded in the client block (prefer TURSO_AUTH_TOKEN)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_token: Option<String>,
}

impl Default for TursoConfig {
    fn default() -> Self {
        Self {
            url: default_url(),
            auth_token: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    #[serde(default = "default_input")]
    pub input: PathBuf,

    #[serde(default = "default_output")]
    pub output: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            input: default_input(),
            output: default_output(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RewriteConfig {
    /// Accept input that ends inside a drop window
    #[serde(default)]
    pub lenient: bool,

    /// Number of context lines in the dry-run preview
    #[serde(default = "default_context_lines")]
    pub context_lines: usize,
}

impl Default for RewriteConfig {
    fn default() -> Self {
        Self {
            lenient: false,
            context_lines: default_context_lines(),
        }
    }
}

// Default functions for serde
fn default_url() -> String { DEFAULT_URL.to_string() }
fn default_input() -> PathBuf { PathBuf::from(DEFAULT_INPUT) }
fn default_output() -> PathBuf { PathBuf::from(DEFAULT_OUTPUT) }
fn default_context_lines() -> usize { 2 }

/// Get the default configuration file path
pub fn config_file_path() -> Result<PathBuf> {
    let home_dir = dirs::home_dir()
        .ok_or_else(|| anyhow::anyhow!("Cannot determine home directory"))?;

    Ok(home_dir.join(".tursoswap").join("config.toml"))
}

/// Get the default configuration file content with comments
fn get_default_config_content() -> &'static str {
    r#"# tursoswap Configuration File
#
# Values set here can be overridden by environment variables and
# command-line flags.

[turso]
# Database URL written into the converted document
url = "libsql://schoollms-mcoz30.aws-ap-south-1.turso.io"

# Auth token written into the converted document.
# Prefer the TURSO_AUTH_TOKEN environment variable over storing it here.
#auth_token = ""

[paths]
# Document to convert
input = "index (7).html"

# Converted document (overwritten if it exists)
output = "index_turso.html"

[rewrite]
# Accept input that ends while lines are still being skipped (default: false)
# When false, a missing end marker is an error instead of a truncated output.
lenient = false

# Number of context lines in the --dry-run preview (default: 2, max: 10)
context_lines = 2
"#
}

/// Write the default commented configuration file
pub fn save_default_config(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create config directory: {}", parent.display()))?;
    }

    fs::write(path, get_default_config_content())
        .with_context(|| format!("Failed to write default config file: {}", path.display()))?;

    Ok(())
}

/// Load configuration from `path`
///
/// A missing file yields the defaults. A malformed file is an error, since
/// silently ignoring it could embed the wrong credentials.
pub fn load_config(path: &Path) -> Result<Config> {
    if !path.exists() {
        return Ok(Config::default());
    }

    let config_str = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&config_str)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

    validate_config(&config)?;

    Ok(config)
}

/// Absolute form of a document path, used to compare input and output
///
/// The output usually does not exist yet, so its parent directory is
/// resolved instead. Falls back to the literal path when neither resolves.
fn resolve_path(path: &Path) -> PathBuf {
    if let Ok(resolved) = path.canonicalize() {
        return resolved;
    }

    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    match (parent.canonicalize(), path.file_name()) {
        (Ok(dir), Some(name)) => dir.join(name),
        _ => path.to_path_buf(),
    }
}

/// Validate configuration values
pub fn validate_config(config: &Config) -> Result<()> {
    if config.rewrite.context_lines > 10 {
        anyhow::bail!("Invalid context_lines: {} (max 10)", config.rewrite.context_lines);
    }

    if resolve_path(&config.paths.input) == resolve_path(&config.paths.output) {
        anyhow::bail!(
            "Input and output paths are both '{}'; the source document would be overwritten",
            config.paths.input.display()
        );
    }

    Ok(())
}

impl Config {
    /// Apply TURSO_DATABASE_URL and TURSO_AUTH_TOKEN on top of the file values
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(URL_ENV).filter(|v| !v.is_empty()) {
            self.turso.url = url;
        }
        if let Some(token) = lookup(TOKEN_ENV).filter(|v| !v.is_empty()) {
            self.turso.auth_token = Some(token);
        }
    }

    /// Build validated client settings for the rewriter
    pub fn client_settings(&self) -> Result<ClientSettings> {
        let token = self.turso.auth_token.clone().unwrap_or_default();

        ClientSettings::new(self.turso.url.clone(), token).map_err(|e| {
            let hint = match e {
                SettingsError::Missing { .. } => format!(
                    "\n\nSet the {} environment variable or `auth_token` under [turso] in the config file.",
                    TOKEN_ENV
                ),
                _ => String::new(),
            };
            anyhow::anyhow!("{}{}", e, hint)
        })
    }

    /// Render the effective configuration, hiding the token
    pub fn to_display_toml(&self) -> Result<String> {
        let mut shown = self.clone();
        if shown.turso.auth_token.is_some() {
            shown.turso.auth_token = Some("********".to_string());
        }
        toml::to_string_pretty(&shown).context("Failed to serialize config")
    }
}
