//! Settings read from the process environment (and `.env`).

use std::env;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

use crate::domain::client_factory::BackendType;
use crate::domain::engine::EngineConfig;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be set for the {1} backend")]
    Missing(&'static str, &'static str),

    #[error("unknown value {value:?} for {key}")]
    Invalid { key: &'static str, value: String },

    #[error("cannot read model file {path}: {message}")]
    ModelFile { path: String, message: String },

    #[error("cannot create job client: {0}")]
    Client(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    Single,
    Batch,
}

impl RunMode {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "single" => Some(RunMode::Single),
            "batch" | "multi" => Some(RunMode::Batch),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub backend: BackendType,
    pub base_url: Option<String>,
    pub api_key: Option<String>,
    pub model_file: Option<String>,
    pub run_mode: RunMode,
    pub nb_jobs: usize,
    pub max_rounds: usize,
    pub engine: EngineConfig,
    pub simulated_quota: usize,
    pub simulated_run_time: Duration,
    pub shipment_seed: u64,
}

/// Parsed value of `key`, or `default` when unset or unparseable.
fn env_or<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.trim().parse::<T>().ok())
        .unwrap_or(default)
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let backend = match env_opt("OAAS_BACKEND") {
            Some(value) => BackendType::from_str(&value).ok_or(ConfigError::Invalid {
                key: "OAAS_BACKEND",
                value,
            })?,
            None => BackendType::Simulated,
        };
        let run_mode = match env_opt("RUN_MODE") {
            Some(value) => RunMode::from_str(&value).ok_or(ConfigError::Invalid {
                key: "RUN_MODE",
                value,
            })?,
            None => RunMode::Batch,
        };

        let nb_jobs = env_or("NB_JOBS", 5usize).max(1);
        let batch = EngineConfig::for_batch(nb_jobs);
        let engine = EngineConfig {
            workers: env_or("WORKERS", batch.workers).max(1),
            poll_interval: Duration::from_secs(
                env_or("POLL_INTERVAL_SECS", batch.poll_interval.as_secs()).max(1),
            ),
            job_timeout: Duration::from_secs(env_or(
                "JOB_TIMEOUT_SECS",
                batch.job_timeout.as_secs(),
            )),
            retries: env_or("RETRY_COUNT", batch.retries),
            retry_delay: Duration::from_secs(env_or(
                "RETRY_DELAY_SECS",
                batch.retry_delay.as_secs(),
            )),
            delete_on_completion: env_or("DELETE_ON_COMPLETION", batch.delete_on_completion),
        };

        let config = AppConfig {
            backend,
            base_url: env_opt("OAAS_BASE_URL"),
            api_key: env_opt("OAAS_API_KEY"),
            model_file: env_opt("OAAS_MODEL_FILE"),
            run_mode,
            nb_jobs,
            max_rounds: env_or("MAX_ROUNDS", nb_jobs),
            engine,
            simulated_quota: env_or("SIMULATED_QUOTA", 2usize),
            simulated_run_time: Duration::from_secs(env_or("SIMULATED_RUN_SECS", 3u64)),
            shipment_seed: env_or("SHIPMENT_SEED", 1u64),
        };
        config.check()?;
        Ok(config)
    }

    #[cfg(feature = "http-backend")]
    fn check(&self) -> Result<(), ConfigError> {
        if self.backend != BackendType::Http {
            return Ok(());
        }
        if self.base_url.is_none() {
            return Err(ConfigError::Missing("OAAS_BASE_URL", "http"));
        }
        if self.api_key.is_none() {
            return Err(ConfigError::Missing("OAAS_API_KEY", "http"));
        }
        if self.model_file.is_none() {
            return Err(ConfigError::Missing("OAAS_MODEL_FILE", "http"));
        }
        Ok(())
    }

    #[cfg(not(feature = "http-backend"))]
    fn check(&self) -> Result<(), ConfigError> {
        Ok(())
    }

    /// Contents of the model file, empty when none is configured.
    pub fn load_model(&self) -> Result<Vec<u8>, ConfigError> {
        match &self.model_file {
            Some(path) => std::fs::read(path).map_err(|e| ConfigError::ModelFile {
                path: path.clone(),
                message: e.to_string(),
            }),
            None => Ok(Vec::new()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const KEYS: [&str; 16] = [
        "OAAS_BACKEND",
        "OAAS_BASE_URL",
        "OAAS_API_KEY",
        "OAAS_MODEL_FILE",
        "RUN_MODE",
        "NB_JOBS",
        "MAX_ROUNDS",
        "WORKERS",
        "POLL_INTERVAL_SECS",
        "JOB_TIMEOUT_SECS",
        "RETRY_COUNT",
        "RETRY_DELAY_SECS",
        "DELETE_ON_COMPLETION",
        "SIMULATED_QUOTA",
        "SIMULATED_RUN_SECS",
        "SHIPMENT_SEED",
    ];

    fn clear() {
        for key in KEYS {
            env::remove_var(key);
        }
    }

    #[test]
    #[serial]
    fn test_defaults_follow_batch_size() {
        clear();
        env::set_var("NB_JOBS", "3");

        let config = AppConfig::from_env().unwrap();
        assert_eq!(config.backend, BackendType::Simulated);
        assert_eq!(config.run_mode, RunMode::Batch);
        assert_eq!(config.max_rounds, 3);
        assert_eq!(config.engine.workers, 3);
        assert_eq!(config.engine.job_timeout, Duration::from_secs(180));
        assert_eq!(config.simulated_quota, 2);
        clear();
    }

    #[test]
    #[serial]
    fn test_unparseable_numbers_fall_back_to_defaults() {
        clear();
        env::set_var("RETRY_COUNT", "many");
        env::set_var("POLL_INTERVAL_SECS", "2");

        let config = AppConfig::from_env().unwrap();
        assert_eq!(config.engine.retries, 4);
        assert_eq!(config.engine.poll_interval, Duration::from_secs(2));
        assert_eq!(config.nb_jobs, 5);
        clear();
    }

    #[test]
    #[serial]
    fn test_zero_poll_interval_is_raised_to_one_second() {
        clear();
        env::set_var("POLL_INTERVAL_SECS", "0");

        let config = AppConfig::from_env().unwrap();
        assert_eq!(config.engine.poll_interval, Duration::from_secs(1));
        clear();
    }

    #[test]
    #[serial]
    fn test_huge_job_timeout_is_accepted() {
        clear();
        env::set_var("JOB_TIMEOUT_SECS", u64::MAX.to_string());

        let config = AppConfig::from_env().unwrap();
        assert_eq!(config.engine.job_timeout, Duration::from_secs(u64::MAX));
        clear();
    }

    #[test]
    #[serial]
    fn test_unknown_run_mode_is_rejected() {
        clear();
        env::set_var("RUN_MODE", "sometimes");
        assert!(matches!(
            AppConfig::from_env(),
            Err(ConfigError::Invalid { key: "RUN_MODE", .. })
        ));
        clear();
    }

    #[cfg(feature = "http-backend")]
    #[test]
    #[serial]
    fn test_http_backend_requires_credentials() {
        clear();
        env::set_var("OAAS_BACKEND", "HTTP");
        env::set_var("OAAS_BASE_URL", "http://localhost:9000/");
        assert_eq!(
            AppConfig::from_env().unwrap_err(),
            ConfigError::Missing("OAAS_API_KEY", "http")
        );
        clear();
    }

    #[test]
    #[serial]
    fn test_missing_model_file_loads_empty_blob() {
        clear();
        let config = AppConfig::from_env().unwrap();
        assert!(config.load_model().unwrap().is_empty());
        clear();
    }
}
