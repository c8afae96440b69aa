use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    pub grok_api_key: String,
    pub grok_base_url: String,
    pub grok_model: String,
    pub grok_timeout_secs: u64,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let config = Self {
            database_url: std::env::var("DATABASE_URL")
                .map_err(|_| anyhow::anyhow!("DATABASE_URL environment variable required"))
                .and_then(|url| {
                    if url.trim().is_empty() {
                        anyhow::bail!("DATABASE_URL cannot be empty");
                    }
                    if !url.starts_with("postgresql://") && !url.starts_with("postgres://") {
                        anyhow::bail!("DATABASE_URL must start with postgresql:// or postgres://");
                    }
                    Ok(url)
                })?,
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "8000".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("PORT must be a valid number between 1-65535"))?,
            grok_api_key: std::env::var("GROK_API_KEY")
                .map_err(|_| anyhow::anyhow!("GROK_API_KEY environment variable required"))
                .and_then(|key| {
                    if key.trim().is_empty() {
                        anyhow::bail!("GROK_API_KEY cannot be empty");
                    }
                    Ok(key)
                })?,
            grok_base_url: std::env::var("GROK_BASE_URL")
                .unwrap_or_else(|_| "https://api.x.ai/v1".to_string()),
            grok_model: std::env::var("GROK_MODEL").unwrap_or_else(|_| "grok-beta".to_string()),
            grok_timeout_secs: std::env::var("GROK_TIMEOUT_SECS")
                .unwrap_or_else(|_| "30".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("GROK_TIMEOUT_SECS must be a positive number"))?,
        };

        if !config.grok_base_url.starts_with("http://")
            && !config.grok_base_url.starts_with("https://")
        {
            anyhow::bail!("GROK_BASE_URL must start with http:// or https://");
        }

        // Log successful configuration load (without sensitive values)
        tracing::info!("Configuration loaded successfully");
        tracing::debug!(
            "Database URL: {}...",
            &config.database_url[..20.min(config.database_url.len())]
        );
        tracing::debug!("Grok Base URL: {}", config.grok_base_url);
        tracing::debug!("Grok Model: {}", config.grok_model);
        tracing::debug!("Server Port: {}", config.port);

        Ok(config)
    }
}
