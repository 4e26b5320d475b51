use crate::dates::DEFAULT_DAY_BOUNDARY_HOUR;
use crate::scoring::ScoringPolicy;
use anyhow::{Context, Result, anyhow, bail};
use dirs::home_dir;
use serde::{Deserialize, Serialize};
use std::fs;
#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

const APP_DIR: &str = ".starlog";
const CONFIG_FILE: &str = "config.json";
const DEFAULT_SHEET_NAME: &str = "Data";
const DEFAULT_HTTP_TIMEOUT_SECONDS: u64 = 15;

pub const BOT_TOKEN_ENV: &str = "STARLOG_BOT_TOKEN";
pub const SHEETS_TOKEN_ENV: &str = "STARLOG_SHEETS_TOKEN";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub bot_token: Option<String>,
    pub spreadsheet_id: String,
    pub sheet_name: String,
    pub sheets_token: Option<String>,
    pub scoring_policy: ScoringPolicy,
    pub day_boundary_hour: u32,
    pub http_timeout_seconds: u64,
    pub aliases_path: PathBuf,
    pub history_path: PathBuf,
    pub reminders_path: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        let root = default_root_dir();

        Self {
            bot_token: None,
            spreadsheet_id: String::new(),
            sheet_name: DEFAULT_SHEET_NAME.to_string(),
            sheets_token: None,
            scoring_policy: ScoringPolicy::default(),
            day_boundary_hour: DEFAULT_DAY_BOUNDARY_HOUR,
            http_timeout_seconds: DEFAULT_HTTP_TIMEOUT_SECONDS,
            aliases_path: root.join("aliases.txt"),
            history_path: root.join("history.txt"),
            reminders_path: root.join("reminders.txt"),
        }
    }
}

impl Config {
    pub fn root_dir() -> PathBuf {
        default_root_dir()
    }

    pub fn config_path() -> PathBuf {
        default_root_dir().join(CONFIG_FILE)
    }

    pub fn load() -> Result<Self> {
        let config_path = Self::config_path();
        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;

        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", config_path.display()))
    }

    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path();
        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let content = serde_json::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(&config_path, content)
            .with_context(|| format!("Failed to write config file: {}", config_path.display()))?;
        set_mode_600(&config_path)?;

        Ok(())
    }

    pub fn ensure_bootstrap_files(&self) -> Result<()> {
        let root = Self::root_dir();
        fs::create_dir_all(&root)
            .with_context(|| format!("Failed to create root directory: {}", root.display()))?;

        crate::files::AliasStore::new(&self.aliases_path).ensure_sample()?;

        Ok(())
    }

    /// Secrets resolve from the environment first, then the config file.
    pub fn bot_token(&self) -> Option<String> {
        resolve_secret(BOT_TOKEN_ENV, self.bot_token.as_deref())
    }

    pub fn sheets_token(&self) -> Option<String> {
        resolve_secret(SHEETS_TOKEN_ENV, self.sheets_token.as_deref())
    }

    /// Startup gate for `service`: missing credentials are fatal here, not
    /// somewhere mid-flow.
    pub fn validate_for_service(&self) -> Result<()> {
        if self.bot_token().is_none() {
            bail!("Bot token is not configured. Run `starlog onboard` or set {BOT_TOKEN_ENV}.");
        }
        if self.spreadsheet_id.trim().is_empty() {
            bail!("spreadsheet_id is not configured. Run `starlog onboard` first.");
        }
        if self.sheets_token().is_none() {
            bail!("Sheets access token is not configured. Set {SHEETS_TOKEN_ENV} or `starlog config set sheets.token <TOKEN>`.");
        }
        Ok(())
    }

    pub fn set_value(&mut self, key: &str, value: &str) -> Result<()> {
        match normalize_config_key(key) {
            "bot_token" => {
                self.bot_token = (!value.trim().is_empty()).then(|| value.trim().to_string());
            }
            "spreadsheet_id" => {
                self.spreadsheet_id = value.trim().to_string();
            }
            "sheet_name" => {
                if value.trim().is_empty() {
                    bail!("sheet_name must not be empty");
                }
                self.sheet_name = value.trim().to_string();
            }
            "sheets_token" => {
                self.sheets_token = (!value.trim().is_empty()).then(|| value.trim().to_string());
            }
            "scoring_policy" => {
                self.scoring_policy = ScoringPolicy::parse(value)
                    .ok_or_else(|| anyhow!("scoring_policy must be direct|proportional|hours"))?;
            }
            "day_boundary_hour" => {
                self.day_boundary_hour = parse_boundary_hour(value)?;
            }
            "http_timeout_seconds" => {
                self.http_timeout_seconds = value
                    .parse::<u64>()
                    .map_err(|_| anyhow!("http_timeout_seconds must be a number"))?
                    .max(5);
            }
            _ => {
                bail!(
                    "Unsupported config key: {key}. Supported keys: \
                     bot_token|telegram.token, spreadsheet_id|sheets.spreadsheet, \
                     sheet_name|sheets.name, sheets_token|sheets.token, \
                     scoring_policy|scoring.policy, day_boundary_hour|dates.boundary_hour, \
                     http_timeout_seconds|http.timeout_seconds"
                );
            }
        }

        Ok(())
    }

    pub fn get_value(&self, key: &str) -> Option<String> {
        match normalize_config_key(key) {
            "bot_token" => Some(mask_secret(self.bot_token.as_deref())),
            "spreadsheet_id" => Some(self.spreadsheet_id.clone()),
            "sheet_name" => Some(self.sheet_name.clone()),
            "sheets_token" => Some(mask_secret(self.sheets_token.as_deref())),
            "scoring_policy" => Some(self.scoring_policy.name().to_string()),
            "day_boundary_hour" => Some(self.day_boundary_hour.to_string()),
            "http_timeout_seconds" => Some(self.http_timeout_seconds.to_string()),
            "aliases_path" => Some(self.aliases_path.display().to_string()),
            "history_path" => Some(self.history_path.display().to_string()),
            "reminders_path" => Some(self.reminders_path.display().to_string()),
            _ => None,
        }
    }
}

fn normalize_config_key(key: &str) -> &str {
    match key {
        "bot_token" | "telegram.token" => "bot_token",
        "spreadsheet_id" | "sheets.spreadsheet" => "spreadsheet_id",
        "sheet_name" | "sheets.name" => "sheet_name",
        "sheets_token" | "sheets.token" => "sheets_token",
        "scoring_policy" | "scoring.policy" => "scoring_policy",
        "day_boundary_hour" | "dates.boundary_hour" => "day_boundary_hour",
        "http_timeout_seconds" | "http.timeout_seconds" => "http_timeout_seconds",
        "aliases_path" | "files.aliases" => "aliases_path",
        "history_path" | "files.history" => "history_path",
        "reminders_path" | "files.reminders" => "reminders_path",
        _ => key,
    }
}

pub fn parse_boundary_hour(value: &str) -> Result<u32> {
    let hour = value
        .trim()
        .parse::<u32>()
        .map_err(|_| anyhow!("day_boundary_hour must be a number"))?;
    if hour > 23 {
        bail!("day_boundary_hour must be between 0 and 23");
    }
    Ok(hour)
}

fn resolve_secret(env_key: &str, configured: Option<&str>) -> Option<String> {
    std::env::var(env_key)
        .ok()
        .filter(|value| !value.trim().is_empty())
        .or_else(|| {
            configured
                .map(str::trim)
                .filter(|value| !value.is_empty())
                .map(ToOwned::to_owned)
        })
}

fn mask_secret(value: Option<&str>) -> String {
    match value {
        Some(_) => "***set***".to_string(),
        None => "not_set".to_string(),
    }
}

fn default_root_dir() -> PathBuf {
    home_dir().unwrap_or_else(|| PathBuf::from(".")).join(APP_DIR)
}

fn set_mode_600(path: &Path) -> Result<()> {
    #[cfg(unix)]
    {
        fs::set_permissions(path, fs::Permissions::from_mode(0o600))
            .with_context(|| format!("Failed to set file permissions: {}", path.display()))?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{Config, parse_boundary_hour};
    use crate::scoring::ScoringPolicy;

    #[test]
    fn set_and_get_round_trip() {
        let mut config = Config::default();

        config.set_value("sheets.spreadsheet", "abc123").unwrap();
        config.set_value("scoring.policy", "hours").unwrap();
        config.set_value("dates.boundary_hour", "4").unwrap();

        assert_eq!(config.get_value("spreadsheet_id").as_deref(), Some("abc123"));
        assert_eq!(config.scoring_policy, ScoringPolicy::Hours);
        assert_eq!(config.get_value("day_boundary_hour").as_deref(), Some("4"));
    }

    #[test]
    fn rejects_bad_values() {
        let mut config = Config::default();
        assert!(config.set_value("scoring_policy", "telepathy").is_err());
        assert!(config.set_value("day_boundary_hour", "24").is_err());
        assert!(config.set_value("sheet_name", "  ").is_err());
        assert!(config.set_value("nonsense_key", "1").is_err());
    }

    #[test]
    fn secrets_are_masked_on_get() {
        let mut config = Config::default();
        assert_eq!(config.get_value("bot_token").as_deref(), Some("not_set"));

        config.set_value("telegram.token", "123:abc").unwrap();
        assert_eq!(config.get_value("bot_token").as_deref(), Some("***set***"));
    }

    #[test]
    fn boundary_hour_limits() {
        assert_eq!(parse_boundary_hour("0").unwrap(), 0);
        assert_eq!(parse_boundary_hour("23").unwrap(), 23);
        assert!(parse_boundary_hour("24").is_err());
        assert!(parse_boundary_hour("six").is_err());
    }

    #[test]
    fn service_validation_requires_credentials() {
        let config = Config::default();
        // No token, no spreadsheet: refuse to start.
        assert!(config.validate_for_service().is_err());
    }
}
