use anyhow::Result;
use dotenvy::dotenv;
use serde::Deserialize;
use service_core::config::Config as CoreConfig;
use std::env;

#[derive(Debug, Deserialize, Clone)]
pub struct SubscriptionConfig {
    pub common: CoreConfig,
    pub service_name: String,
    pub log_level: String,
    pub otlp_endpoint: Option<String>,
    pub database: DatabaseConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
}

impl SubscriptionConfig {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();

        let port = env::var("SUBSCRIPTION_SERVICE_PORT")
            .unwrap_or_else(|_| "8080".to_string())
            .parse()?;

        let url = env::var("SUBSCRIPTION_DATABASE_URL")
            .map_err(|_| anyhow::anyhow!("SUBSCRIPTION_DATABASE_URL must be set"))?;
        let max_connections = env::var("SUBSCRIPTION_DB_MAX_CONNECTIONS")
            .unwrap_or_else(|_| "10".to_string())
            .parse()?;
        let min_connections = env::var("SUBSCRIPTION_DB_MIN_CONNECTIONS")
            .unwrap_or_else(|_| "1".to_string())
            .parse()?;

        let log_level = env::var("SUBSCRIPTION_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
        let otlp_endpoint = env::var("OTLP_ENDPOINT").ok();

        Ok(Self {
            common: CoreConfig { port },
            service_name: "subscription-service".to_string(),
            log_level,
            otlp_endpoint,
            database: DatabaseConfig {
                url,
                max_connections,
                min_connections,
            },
        })
    }
}
