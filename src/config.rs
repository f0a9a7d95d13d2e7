use serde::Deserialize;
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Default config file name, looked up in the current directory.
pub const DEFAULT_CONFIG_FILE: &str = ".pr-digest.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Top-level configuration loaded from .pr-digest.toml.
///
/// All fields are optional; the tool works with zero config as long as a
/// repository and a GITHUB_TOKEN are supplied.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub github: GitHubConfig,

    #[serde(default)]
    pub digest: DigestConfig,

    #[serde(default)]
    pub email: EmailConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GitHubConfig {
    /// GitHub API token. If None, falls back to GITHUB_TOKEN env var.
    pub token: Option<String>,
    /// REST API root, overridable for GitHub Enterprise.
    pub api_base: String,
    /// Repository in `owner/repo` form.
    pub repository: Option<String>,
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            token: None,
            api_base: "https://api.github.com".to_string(),
            repository: None,
        }
    }
}

/// Which timestamp decides whether a PR falls inside the window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WindowField {
    #[default]
    Created,
    Updated,
}

/// How rendered PR blocks are joined within a bucket.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JoinStyle {
    /// Backslash followed by `n`, written as text.
    #[default]
    Literal,
    /// A real line break.
    Newline,
    /// The text `{backslash_char}n`, matching digests sent by older runs.
    Placeholder,
}

impl JoinStyle {
    pub fn separator(self) -> &'static str {
        match self {
            JoinStyle::Literal => "\\n",
            JoinStyle::Newline => "\n",
            JoinStyle::Placeholder => "{backslash_char}n",
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DigestConfig {
    pub window_days: u32,
    pub window_field: WindowField,
    pub per_page: u8,
    pub max_pages: u32,
    pub join_style: JoinStyle,
    pub signature: String,
}

impl Default for DigestConfig {
    fn default() -> Self {
        Self {
            window_days: 7,
            window_field: WindowField::Created,
            per_page: 100,
            max_pages: 10,
            join_style: JoinStyle::Literal,
            signature: "DevOps Team".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EmailConfig {
    pub sender: Option<String>,
    pub recipient: Option<String>,
    pub smtp_host: String,
    pub smtp_port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            sender: None,
            recipient: None,
            smtp_host: "smtp.gmail.com".to_string(),
            smtp_port: 587,
            username: None,
            password: None,
        }
    }
}

impl Config {
    /// Load configuration from `path`, or from .pr-digest.toml in the
    /// current directory when no path is given. A missing default file
    /// yields the default config; a missing explicit file is an error.
    ///
    /// Environment variables then fill in secrets and addresses.
    pub fn load(path: Option<&Path>) -> Result<Config, ConfigError> {
        let mut config = match path {
            Some(path) => Self::load_from(path)?,
            None => {
                let default_path = Path::new(DEFAULT_CONFIG_FILE);
                if default_path.exists() {
                    Self::load_from(default_path)?
                } else {
                    Config::default()
                }
            }
        };

        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Load from a specific path (useful for testing).
    pub fn load_from(path: &Path) -> Result<Config, ConfigError> {
        let contents = fs::read_to_string(path)?;
        let config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Environment values override the file for secrets; addresses and the
    /// repository only fill gaps.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(token) = lookup("GITHUB_TOKEN") {
            self.github.token = Some(token);
        }
        if let Some(username) = lookup("SMTP_USERNAME") {
            self.email.username = Some(username);
        }
        if let Some(password) = lookup("SMTP_PASSWORD") {
            self.email.password = Some(password);
        }
        if self.github.repository.is_none() {
            self.github.repository = lookup("PR_DIGEST_REPOSITORY");
        }
        if self.email.sender.is_none() {
            self.email.sender = lookup("PR_DIGEST_SENDER");
        }
        if self.email.recipient.is_none() {
            self.email.recipient = lookup("PR_DIGEST_RECIPIENT");
        }
    }

    pub fn github_token(&self) -> Option<&str> {
        self.github.token.as_deref().filter(|token| !token.is_empty())
    }
}
