use std::sync::Arc;

use crate::config::{AppConfig, ConfigError};
use crate::domain::clients::SimulatedBackend;
use crate::domain::job_client::JobClient;

#[cfg(feature = "http-backend")]
use crate::domain::clients::HttpJobClient;

/// Available job service backends
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendType {
    #[cfg(feature = "http-backend")]
    Http,
    Simulated,
}

impl BackendType {
    /// Parse backend type from string (case-insensitive)
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            #[cfg(feature = "http-backend")]
            "http" => Some(BackendType::Http),
            "simulated" | "sim" => Some(BackendType::Simulated),
            _ => None,
        }
    }
}

/// Create the job client selected by the configuration
pub fn create_job_client(config: &AppConfig) -> Result<Arc<dyn JobClient>, ConfigError> {
    match config.backend {
        #[cfg(feature = "http-backend")]
        BackendType::Http => {
            let base_url = config
                .base_url
                .as_deref()
                .ok_or(ConfigError::Missing("OAAS_BASE_URL", "http"))?;
            let api_key = config
                .api_key
                .as_deref()
                .ok_or(ConfigError::Missing("OAAS_API_KEY", "http"))?;
            let client = HttpJobClient::new(base_url, api_key)
                .map_err(|e| ConfigError::Client(e.to_string()))?;
            Ok(Arc::new(client))
        }
        BackendType::Simulated => Ok(Arc::new(
            SimulatedBackend::new(config.simulated_quota).with_run_time(config.simulated_run_time),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RunMode;
    use crate::domain::engine::EngineConfig;
    use std::time::Duration;

    fn config(backend: BackendType) -> AppConfig {
        AppConfig {
            backend,
            base_url: Some("http://localhost:9000/job_manager/rest/v1/".to_string()),
            api_key: Some("key".to_string()),
            model_file: None,
            run_mode: RunMode::Single,
            nb_jobs: 1,
            max_rounds: 1,
            engine: EngineConfig::default(),
            simulated_quota: 2,
            simulated_run_time: Duration::from_secs(1),
            shipment_seed: 1,
        }
    }

    #[test]
    fn test_backend_type_from_str() {
        assert_eq!(BackendType::from_str("simulated"), Some(BackendType::Simulated));
        assert_eq!(BackendType::from_str("Simulated"), Some(BackendType::Simulated));
        #[cfg(feature = "http-backend")]
        assert_eq!(BackendType::from_str("HTTP"), Some(BackendType::Http));
        assert_eq!(BackendType::from_str("grpc"), None);
    }

    #[test]
    fn test_create_simulated_client() {
        let client = create_job_client(&config(BackendType::Simulated)).unwrap();
        assert_eq!(client.name(), "Simulated");
    }

    #[cfg(feature = "http-backend")]
    #[test]
    fn test_create_http_client() {
        let client = create_job_client(&config(BackendType::Http)).unwrap();
        assert_eq!(client.name(), "HTTP");
    }

    #[cfg(feature = "http-backend")]
    #[test]
    fn test_create_http_client_given_bad_url_should_fail() {
        let mut config = config(BackendType::Http);
        config.base_url = Some("::".to_string());
        assert!(matches!(
            create_job_client(&config),
            Err(ConfigError::Client(_))
        ));
    }
}
