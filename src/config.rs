use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub service: ServiceConfig,
    pub closure: ClosureConfig,
    pub connections: ConnectionsConfig,
    #[serde(default)]
    pub openai: OpenAiConfig,
}

/// Shared settings for the task service (lookups, database, report)
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    /// Name of the environment variable holding the service API key.
    pub api_key_env: String,
    /// Endpoint answers are submitted to.
    pub report_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

/// Bipartite closure search ("loop" task)
#[derive(Debug, Clone, Deserialize)]
pub struct ClosureConfig {
    pub task_name: String,
    pub note_url: String,
    pub people_url: String,
    pub places_url: String,
    pub target_marker: String,
    #[serde(default = "default_max_rounds")]
    pub max_rounds: usize,
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: usize,
}

/// Shortest path search ("connections" task)
#[derive(Debug, Clone, Deserialize)]
pub struct ConnectionsConfig {
    pub task_name: String,
    pub database_url: String,
    #[serde(default = "default_database_task")]
    pub database_task: String,
    #[serde(default = "default_users_query")]
    pub users_query: String,
    #[serde(default = "default_connections_query")]
    pub connections_query: String,
    pub source: String,
    pub target: String,
}

/// Chat-completion model used for seed extraction
#[derive(Debug, Clone, Deserialize)]
pub struct OpenAiConfig {
    #[serde(default = "default_openai_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_openai_model")]
    pub model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_key_env: default_openai_key_env(),
            model: default_openai_model(),
            temperature: default_temperature(),
        }
    }
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_max_rounds() -> usize {
    20
}

fn default_concurrency() -> usize {
    1
}

fn default_cache_capacity() -> usize {
    1000
}

fn default_database_task() -> String {
    "database".to_string()
}

fn default_users_query() -> String {
    "SELECT * FROM users".to_string()
}

fn default_connections_query() -> String {
    "SELECT * FROM connections".to_string()
}

fn default_openai_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}

fn default_openai_model() -> String {
    "gpt-4o".to_string()
}

fn default_temperature() -> f32 {
    0.1
}

impl Config {
    /// Load configuration from file
    ///
    /// Loads environment variables from .env file (if present) before loading config.
    /// Looks for config file in this order:
    /// 1. Path specified in RELSEARCH_CONFIG environment variable
    /// 2. ./config.toml in current directory
    pub fn load() -> Result<Self> {
        let config_path = std::env::var("RELSEARCH_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("config.toml"));
        Self::load_from(&config_path)
    }

    /// Load configuration from an explicit path (still honours .env)
    pub fn load_from(config_path: &Path) -> Result<Self> {
        // .env is optional
        let _ = dotenv::dotenv();

        let config_str = std::fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;

        let config: Config = toml::from_str(&config_str)
            .with_context(|| format!("Failed to parse {}", config_path.display()))?;

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration values
    fn validate(&self) -> Result<()> {
        let urls = [
            ("service.report_url", &self.service.report_url),
            ("closure.note_url", &self.closure.note_url),
            ("closure.people_url", &self.closure.people_url),
            ("closure.places_url", &self.closure.places_url),
            ("connections.database_url", &self.connections.database_url),
        ];
        for (key, value) in urls {
            url::Url::parse(value).with_context(|| format!("{} is not a valid URL: {}", key, value))?;
        }

        if self.service.timeout_secs == 0 {
            anyhow::bail!("service.timeout_secs must be greater than 0");
        }

        if self.closure.max_rounds == 0 {
            anyhow::bail!("closure.max_rounds must be greater than 0");
        }

        if self.closure.concurrency == 0 {
            anyhow::bail!("closure.concurrency must be greater than 0");
        }

        if self.closure.target_marker.trim().is_empty() {
            anyhow::bail!("closure.target_marker must not be empty");
        }

        std::env::var(&self.service.api_key_env).with_context(|| {
            format!(
                "Environment variable {} not set. Set it in your .env file or as an environment variable with your service API key.",
                self.service.api_key_env
            )
        })?;

        Ok(())
    }

    /// Service API key, read from the configured environment variable
    pub fn service_api_key(&self) -> Result<String> {
        std::env::var(&self.service.api_key_env)
            .with_context(|| format!("Environment variable {} not set", self.service.api_key_env))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::sync::Mutex;
    use tempfile::TempDir;

    /// Serialize config tests that mutate process-wide cwd and env so they don't race.
    static CONFIG_TEST_LOCK: Mutex<()> = Mutex::new(());

    const TEST_CONFIG: &str = r#"
[service]
api_key_env = "RELSEARCH_TEST_KEY"
report_url = "https://centrala.example.com/report"
log_level = "debug"

[closure]
task_name = "loop"
note_url = "https://centrala.example.com/dane/barbara.txt"
people_url = "https://centrala.example.com/people"
places_url = "https://centrala.example.com/places"
target_marker = "BARBARA"
max_rounds = 7

[connections]
task_name = "connections"
database_url = "https://centrala.example.com/apidb"
source = "Rafał"
target = "Barbara"
"#;

    /// Restores cwd when dropped (e.g. on panic).
    struct CwdGuard(std::path::PathBuf);
    impl Drop for CwdGuard {
        fn drop(&mut self) {
            let _ = std::env::set_current_dir(&self.0);
        }
    }

    fn with_api_key(api_key: Option<&str>, f: impl FnOnce()) {
        let original = std::env::var("RELSEARCH_TEST_KEY").ok();
        match api_key {
            Some(k) => std::env::set_var("RELSEARCH_TEST_KEY", k),
            None => std::env::remove_var("RELSEARCH_TEST_KEY"),
        }
        f();
        std::env::remove_var("RELSEARCH_TEST_KEY");
        if let Some(val) = original {
            std::env::set_var("RELSEARCH_TEST_KEY", val);
        }
    }

    fn write_config(temp_dir: &TempDir, content: &str) -> PathBuf {
        let path = temp_dir.path().join("config.toml");
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_config_load_success() {
        let _lock = CONFIG_TEST_LOCK.lock().unwrap();
        let temp_dir = TempDir::new().unwrap();
        let path = write_config(&temp_dir, TEST_CONFIG);
        with_api_key(Some("test-key"), || {
            let config = Config::load_from(&path);
            assert!(config.is_ok(), "Config::load_from() failed: {:?}", config.err());
            let config = config.unwrap();
            assert_eq!(config.service.log_level, "debug");
            assert_eq!(config.closure.max_rounds, 7);
            assert_eq!(config.connections.source, "Rafał");
        });
    }

    #[test]
    fn test_config_defaults() {
        let _lock = CONFIG_TEST_LOCK.lock().unwrap();
        let temp_dir = TempDir::new().unwrap();
        let path = write_config(&temp_dir, TEST_CONFIG);
        with_api_key(Some("test-key"), || {
            let config = Config::load_from(&path).unwrap();
            assert_eq!(config.service.timeout_secs, 30);
            assert_eq!(config.closure.concurrency, 1);
            assert_eq!(config.closure.cache_capacity, 1000);
            assert_eq!(config.connections.database_task, "database");
            assert_eq!(config.connections.users_query, "SELECT * FROM users");
            assert_eq!(config.openai.api_key_env, "OPENAI_API_KEY");
        });
    }

    #[test]
    fn test_config_missing_api_key() {
        let _lock = CONFIG_TEST_LOCK.lock().unwrap();
        let temp_dir = TempDir::new().unwrap();
        let path = write_config(&temp_dir, TEST_CONFIG);
        let original_dir = std::env::current_dir().unwrap();
        let _cwd = CwdGuard(original_dir);
        // keep a stray .env in the real cwd from supplying the key
        std::env::set_current_dir(temp_dir.path()).unwrap();
        with_api_key(None, || {
            let config = Config::load_from(&path);
            assert!(config.is_err(), "Expected missing API key error");
            assert!(config.unwrap_err().to_string().contains("RELSEARCH_TEST_KEY"));
        });
    }

    #[test]
    fn test_config_loads_key_from_env_file() {
        let _lock = CONFIG_TEST_LOCK.lock().unwrap();
        let temp_dir = TempDir::new().unwrap();
        let path = write_config(&temp_dir, TEST_CONFIG);
        fs::write(temp_dir.path().join(".env"), "RELSEARCH_TEST_KEY=from-env-file\n").unwrap();
        let original_dir = std::env::current_dir().unwrap();
        let _cwd = CwdGuard(original_dir);
        std::env::set_current_dir(temp_dir.path()).unwrap();
        with_api_key(None, || {
            let config = Config::load_from(&path);
            assert!(config.is_ok(), "Config should load with API key from .env file");
            assert_eq!(config.unwrap().service_api_key().unwrap(), "from-env-file");
        });
    }

    #[test]
    fn test_config_rejects_zero_rounds() {
        let _lock = CONFIG_TEST_LOCK.lock().unwrap();
        let temp_dir = TempDir::new().unwrap();
        let path = write_config(&temp_dir, &TEST_CONFIG.replace("max_rounds = 7", "max_rounds = 0"));
        with_api_key(Some("test-key"), || {
            let err = Config::load_from(&path).unwrap_err();
            assert!(err.to_string().contains("max_rounds"));
        });
    }

    #[test]
    fn test_config_rejects_bad_url() {
        let _lock = CONFIG_TEST_LOCK.lock().unwrap();
        let temp_dir = TempDir::new().unwrap();
        let content = TEST_CONFIG.replace("https://centrala.example.com/people", "not a url");
        let path = write_config(&temp_dir, &content);
        with_api_key(Some("test-key"), || {
            let err = Config::load_from(&path).unwrap_err();
            assert!(err.to_string().contains("closure.people_url"));
        });
    }

    #[test]
    fn test_config_invalid_path() {
        let _lock = CONFIG_TEST_LOCK.lock().unwrap();
        let config = Config::load_from(Path::new("nonexistent.toml"));
        assert!(config.is_err());
    }
}
