// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow, bail};
use serde::Deserialize;
use sqlpane_api::{DEFAULT_BASE_DELAY, DEFAULT_MAX_DELAY, DEFAULT_MAX_RETRIES, ReconnectPolicy};
use sqlpane_app::{
    DEFAULT_JOB_PRUNE_AFTER, DEFAULT_PAGE_SIZE, PAGE_SIZE_CHOICES, is_valid_page_size,
};
use sqlpane_grid::DEFAULT_CLICK_DELAY;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

const CONFIG_VERSION: i64 = 1;
const DEFAULT_API_BASE_URL: &str = "http://localhost:8000/api";
const DEFAULT_API_TIMEOUT: &str = "10s";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub version: i64,
    #[serde(default)]
    pub api: Api,
    #[serde(default)]
    pub grid: Grid,
    #[serde(default)]
    pub jobs: Jobs,
    #[serde(default)]
    pub storage: Storage,
    #[serde(default)]
    pub log: Log,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            api: Api::default(),
            grid: Grid::default(),
            jobs: Jobs::default(),
            storage: Storage::default(),
            log: Log::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Api {
    pub base_url: Option<String>,
    pub timeout: Option<String>,
    pub token: Option<String>,
}

impl Default for Api {
    fn default() -> Self {
        Self {
            base_url: Some(DEFAULT_API_BASE_URL.to_owned()),
            timeout: Some(DEFAULT_API_TIMEOUT.to_owned()),
            token: None,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Grid {
    pub page_size: Option<usize>,
    pub click_delay: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Jobs {
    pub enabled: Option<bool>,
    pub base_delay: Option<String>,
    pub max_delay: Option<String>,
    pub max_retries: Option<u32>,
    pub prune_after: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Storage {
    pub db_path: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Log {
    pub path: Option<String>,
}

impl Config {
    pub fn default_path() -> Result<PathBuf> {
        if let Some(path) = env::var_os("SQLPANE_CONFIG_PATH") {
            return Ok(PathBuf::from(path));
        }

        let config_root = dirs::config_dir().ok_or_else(|| {
            anyhow!("cannot resolve config directory; set SQLPANE_CONFIG_PATH to the config file")
        })?;

        let app_dir = config_root.join(sqlpane_store::APP_NAME);
        fs::create_dir_all(&app_dir)
            .with_context(|| format!("create config directory {}", app_dir.display()))?;
        Ok(app_dir.join("config.toml"))
    }

    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let raw = fs::read_to_string(path)
            .with_context(|| format!("read config file {}", path.display()))?;
        let value: toml::Value = toml::from_str(&raw)
            .with_context(|| format!("parse TOML config {}", path.display()))?;

        let version = value
            .get("version")
            .and_then(toml::Value::as_integer)
            .ok_or_else(|| {
                anyhow!(
                    "config file {} has no version; add `version = 1` at the top",
                    path.display()
                )
            })?;

        if version != CONFIG_VERSION {
            bail!(
                "unsupported config version {} in {}; expected version = 1",
                version,
                path.display()
            );
        }

        let config: Config = value
            .try_into()
            .with_context(|| format!("decode config {}", path.display()))?;
        config.validate(path)?;
        Ok(config)
    }

    fn validate(&self, path: &Path) -> Result<()> {
        if let Some(base_url) = &self.api.base_url
            && base_url.trim().is_empty()
        {
            bail!("api.base_url in {} must not be empty", path.display());
        }

        if let Some(db_path) = &self.storage.db_path {
            sqlpane_store::validate_db_path(db_path)?;
        }

        if let Some(page_size) = self.grid.page_size
            && !is_valid_page_size(page_size)
        {
            bail!(
                "grid.page_size in {} must be one of {:?}, got {}",
                path.display(),
                PAGE_SIZE_CHOICES,
                page_size
            );
        }

        if self.jobs.max_retries == Some(0) {
            bail!(
                "jobs.max_retries in {} must be positive, got 0",
                path.display()
            );
        }

        let durations = [
            ("api.timeout", &self.api.timeout),
            ("grid.click_delay", &self.grid.click_delay),
            ("jobs.base_delay", &self.jobs.base_delay),
            ("jobs.max_delay", &self.jobs.max_delay),
            ("jobs.prune_after", &self.jobs.prune_after),
        ];
        for (name, raw) in durations {
            let Some(raw) = raw else {
                continue;
            };
            let parsed = parse_duration(raw)?;
            if parsed <= Duration::ZERO {
                bail!(
                    "{name} in {} must be positive, got {}",
                    path.display(),
                    raw
                );
            }
        }

        let policy = self.reconnect_policy()?;
        if policy.base_delay > policy.max_delay {
            bail!(
                "jobs.base_delay in {} must not exceed jobs.max_delay",
                path.display()
            );
        }

        Ok(())
    }

    pub fn db_path(&self) -> Result<PathBuf> {
        match &self.storage.db_path {
            Some(path) => Ok(PathBuf::from(path)),
            None => sqlpane_store::default_db_path(),
        }
    }

    pub fn log_path(&self) -> Result<PathBuf> {
        if let Some(path) = &self.log.path {
            return Ok(PathBuf::from(path));
        }
        let state_root = dirs::state_dir()
            .or_else(dirs::data_local_dir)
            .ok_or_else(|| anyhow!("cannot resolve a log directory; set log.path in the config"))?;
        let app_dir = state_root.join(sqlpane_store::APP_NAME);
        fs::create_dir_all(&app_dir)
            .with_context(|| format!("create log directory {}", app_dir.display()))?;
        Ok(app_dir.join("sqlpane.log"))
    }

    pub fn api_base_url(&self) -> &str {
        self.api
            .base_url
            .as_deref()
            .unwrap_or(DEFAULT_API_BASE_URL)
            .trim_end_matches('/')
    }

    pub fn api_timeout(&self) -> Result<Duration> {
        parse_duration(self.api.timeout.as_deref().unwrap_or(DEFAULT_API_TIMEOUT))
    }

    /// `SQLPANE_TOKEN` wins over `api.token`.
    pub fn api_token(&self) -> Option<String> {
        env::var("SQLPANE_TOKEN")
            .ok()
            .or_else(|| self.api.token.clone())
            .filter(|token| !token.trim().is_empty())
    }

    pub fn page_size(&self) -> usize {
        self.grid.page_size.unwrap_or(DEFAULT_PAGE_SIZE)
    }

    pub fn click_delay(&self) -> Result<Duration> {
        self.grid
            .click_delay
            .as_deref()
            .map_or(Ok(DEFAULT_CLICK_DELAY), parse_duration)
    }

    pub fn jobs_enabled(&self) -> bool {
        self.jobs.enabled.unwrap_or(true)
    }

    pub fn reconnect_policy(&self) -> Result<ReconnectPolicy> {
        Ok(ReconnectPolicy {
            base_delay: self
                .jobs
                .base_delay
                .as_deref()
                .map_or(Ok(DEFAULT_BASE_DELAY), parse_duration)?,
            max_delay: self
                .jobs
                .max_delay
                .as_deref()
                .map_or(Ok(DEFAULT_MAX_DELAY), parse_duration)?,
            max_retries: self.jobs.max_retries.unwrap_or(DEFAULT_MAX_RETRIES),
        })
    }

    pub fn job_prune_after(&self) -> Result<Duration> {
        self.jobs
            .prune_after
            .as_deref()
            .map_or(Ok(DEFAULT_JOB_PRUNE_AFTER), parse_duration)
    }

    pub fn example_config(path: &Path) -> String {
        format!(
            "# sqlpane config\n# Place this file at: {}\n\nversion = 1\n\n[api]\nbase_url = \"{}\"\ntimeout = \"{}\"\n# Prefer the SQLPANE_TOKEN environment variable over storing a token here.\n# token = \"...\"\n\n[grid]\npage_size = {}\nclick_delay = \"{}ms\"\n\n[jobs]\nenabled = true\nbase_delay = \"{}ms\"\nmax_delay = \"{}s\"\nmax_retries = {}\nprune_after = \"{}s\"\n\n[storage]\n# Optional. Default is platform data dir (for example ~/.local/share/sqlpane/sqlpane.db)\n# db_path = \"/absolute/path/to/sqlpane.db\"\n\n[log]\n# Optional. Default is platform state dir (for example ~/.local/state/sqlpane/sqlpane.log)\n# path = \"/absolute/path/to/sqlpane.log\"\n",
            path.display(),
            DEFAULT_API_BASE_URL,
            DEFAULT_API_TIMEOUT,
            DEFAULT_PAGE_SIZE,
            DEFAULT_CLICK_DELAY.as_millis(),
            DEFAULT_BASE_DELAY.as_millis(),
            DEFAULT_MAX_DELAY.as_secs(),
            DEFAULT_MAX_RETRIES,
            DEFAULT_JOB_PRUNE_AFTER.as_secs(),
        )
    }
}

fn parse_duration(raw: &str) -> Result<Duration> {
    let raw = raw.trim();
    if let Some(value) = raw.strip_suffix("ms") {
        let millis: u64 = value
            .parse()
            .with_context(|| format!("invalid duration {raw:?}"))?;
        return Ok(Duration::from_millis(millis));
    }
    if let Some(value) = raw.strip_suffix('s') {
        let secs: u64 = value
            .parse()
            .with_context(|| format!("invalid duration {raw:?}"))?;
        return Ok(Duration::from_secs(secs));
    }
    if let Some(value) = raw.strip_suffix('m') {
        let mins: u64 = value
            .parse()
            .with_context(|| format!("invalid duration {raw:?}"))?;
        return Ok(Duration::from_secs(mins.saturating_mul(60)));
    }

    bail!("invalid duration {raw:?}; use one of: <N>ms, <N>s, <N>m (for example 500ms or 5s)")
}

#[cfg(test)]
mod tests {
    use super::{Config, parse_duration};
    use anyhow::Result;
    use std::path::PathBuf;
    use std::sync::{Mutex, OnceLock};
    use std::time::Duration;

    fn write_config(content: &str) -> Result<(tempfile::TempDir, PathBuf)> {
        let temp = tempfile::tempdir()?;
        let path = temp.path().join("config.toml");
        std::fs::write(&path, content)?;
        Ok((temp, path))
    }

    fn env_lock() -> std::sync::MutexGuard<'static, ()> {
        static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();
        match ENV_LOCK.get_or_init(|| Mutex::new(())).lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    #[test]
    fn missing_config_uses_defaults() -> Result<()> {
        let temp = tempfile::tempdir()?;
        let config = Config::load(&temp.path().join("missing.toml"))?;
        assert_eq!(config.version, 1);
        assert_eq!(config.api_base_url(), "http://localhost:8000/api");
        assert_eq!(config.api_timeout()?, Duration::from_secs(10));
        assert_eq!(config.page_size(), 25);
        assert_eq!(config.click_delay()?, Duration::from_millis(250));
        assert!(config.jobs_enabled());
        let policy = config.reconnect_policy()?;
        assert_eq!(policy.max_retries, 8);
        assert_eq!(policy.base_delay, Duration::from_millis(500));
        Ok(())
    }

    #[test]
    fn unversioned_config_is_rejected_with_actionable_message() -> Result<()> {
        let (_temp, path) = write_config("[api]\nbase_url = \"http://x\"\n")?;
        let error = Config::load(&path).expect_err("unversioned config should fail");
        assert!(error.to_string().contains("add `version = 1`"));
        Ok(())
    }

    #[test]
    fn unsupported_config_version_is_rejected() -> Result<()> {
        let (_temp, path) = write_config("version = 2\n")?;
        let error = Config::load(&path).expect_err("v2 config should fail");
        assert!(error.to_string().contains("unsupported config version 2"));
        Ok(())
    }

    #[test]
    fn malformed_config_returns_parse_error() -> Result<()> {
        let (_temp, path) = write_config("{{not toml")?;
        let error = Config::load(&path).expect_err("malformed config should fail");
        assert!(error.to_string().contains("parse TOML config"));
        Ok(())
    }

    #[test]
    fn full_config_parses() -> Result<()> {
        let (_temp, path) = write_config(
            "version = 1\n[api]\nbase_url = \"https://db.example.com/api///\"\ntimeout = \"3s\"\n[grid]\npage_size = 50\nclick_delay = \"300ms\"\n[jobs]\nenabled = false\nbase_delay = \"1s\"\nmax_delay = \"1m\"\nmax_retries = 3\nprune_after = \"10s\"\n[log]\npath = \"/tmp/sqlpane-test.log\"\n",
        )?;

        let config = Config::load(&path)?;
        assert_eq!(config.api_base_url(), "https://db.example.com/api");
        assert_eq!(config.api_timeout()?, Duration::from_secs(3));
        assert_eq!(config.page_size(), 50);
        assert_eq!(config.click_delay()?, Duration::from_millis(300));
        assert!(!config.jobs_enabled());
        let policy = config.reconnect_policy()?;
        assert_eq!(policy.base_delay, Duration::from_secs(1));
        assert_eq!(policy.max_delay, Duration::from_secs(60));
        assert_eq!(policy.max_retries, 3);
        assert_eq!(config.job_prune_after()?, Duration::from_secs(10));
        assert_eq!(config.log_path()?, PathBuf::from("/tmp/sqlpane-test.log"));
        Ok(())
    }

    #[test]
    fn invalid_page_size_is_rejected() -> Result<()> {
        let (_temp, path) = write_config("version = 1\n[grid]\npage_size = 30\n")?;
        let error = Config::load(&path).expect_err("30 is not a page size choice");
        assert!(error.to_string().contains("grid.page_size"));
        Ok(())
    }

    #[test]
    fn non_positive_durations_are_rejected() -> Result<()> {
        let (_temp, path) = write_config("version = 1\n[grid]\nclick_delay = \"0ms\"\n")?;
        let error = Config::load(&path).expect_err("zero click delay should fail");
        let message = error.to_string();
        assert!(message.contains("grid.click_delay"));
        assert!(message.contains("must be positive"));
        Ok(())
    }

    #[test]
    fn base_delay_above_max_delay_is_rejected() -> Result<()> {
        let (_temp, path) =
            write_config("version = 1\n[jobs]\nbase_delay = \"2m\"\nmax_delay = \"30s\"\n")?;
        let error = Config::load(&path).expect_err("inverted delays should fail");
        assert!(error.to_string().contains("must not exceed jobs.max_delay"));
        Ok(())
    }

    #[test]
    fn zero_retries_are_rejected() -> Result<()> {
        let (_temp, path) = write_config("version = 1\n[jobs]\nmax_retries = 0\n")?;
        assert!(Config::load(&path).is_err());
        Ok(())
    }

    #[test]
    fn db_path_rejects_uri_style_storage_value() -> Result<()> {
        let (_temp, path) =
            write_config("version = 1\n[storage]\ndb_path = \"https://evil.example/sqlpane.db\"\n")?;
        let error = Config::load(&path).expect_err("URI db_path should fail validation");
        assert!(error.to_string().contains("looks like a URI"));
        Ok(())
    }

    #[test]
    fn default_path_honors_env_override() -> Result<()> {
        let _guard = env_lock();
        let temp = tempfile::tempdir()?;
        let override_path = temp.path().join("custom-config.toml");
        // SAFETY: test-only process-local env mutation.
        unsafe {
            std::env::set_var("SQLPANE_CONFIG_PATH", &override_path);
        }
        let resolved = Config::default_path()?;
        // SAFETY: test cleanup for process-local env mutation.
        unsafe {
            std::env::remove_var("SQLPANE_CONFIG_PATH");
        }
        assert_eq!(resolved, override_path);
        Ok(())
    }

    #[test]
    fn token_env_var_overrides_config_value() -> Result<()> {
        let _guard = env_lock();
        let (_temp, path) = write_config("version = 1\n[api]\ntoken = \"from-file\"\n")?;
        let config = Config::load(&path)?;

        // SAFETY: test-only process-local env mutation.
        unsafe {
            std::env::remove_var("SQLPANE_TOKEN");
        }
        assert_eq!(config.api_token().as_deref(), Some("from-file"));

        // SAFETY: test-only process-local env mutation.
        unsafe {
            std::env::set_var("SQLPANE_TOKEN", "from-env");
        }
        let token = config.api_token();
        // SAFETY: test cleanup for process-local env mutation.
        unsafe {
            std::env::remove_var("SQLPANE_TOKEN");
        }
        assert_eq!(token.as_deref(), Some("from-env"));
        Ok(())
    }

    #[test]
    fn durations_parse_ms_seconds_and_minutes() -> Result<()> {
        assert_eq!(parse_duration("500ms")?, Duration::from_millis(500));
        assert_eq!(parse_duration("5s")?, Duration::from_secs(5));
        assert_eq!(parse_duration(" 2m ")?, Duration::from_secs(120));
        assert!(parse_duration("oops").is_err());
        assert!(parse_duration("5h").is_err());
        Ok(())
    }

    #[test]
    fn example_config_loads_cleanly() -> Result<()> {
        let temp = tempfile::tempdir()?;
        let path = temp.path().join("config.toml");
        std::fs::write(&path, Config::example_config(&path))?;
        let config = Config::load(&path)?;
        assert_eq!(config.page_size(), 25);
        assert_eq!(config.reconnect_policy()?.max_delay, Duration::from_secs(30));
        Ok(())
    }
}
