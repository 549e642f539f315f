use std::time::Duration;
use url::Url;

#[derive(Debug, Clone)]
pub struct Config {
    pub api_url: String,
    pub port: u16,
    pub poll_interval_secs: u64,
    pub request_timeout_secs: u64,
    pub customer_page_limit: u32,
    pub loan_page_limit: u32,
    pub scoring_customer_limit: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: "http://localhost:8000".to_string(),
            port: 3000,
            poll_interval_secs: 30,
            request_timeout_secs: 15,
            customer_page_limit: 500,
            loan_page_limit: 500,
            scoring_customer_limit: 100,
        }
    }
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let defaults = Self::default();
        let config = Self {
            api_url: std::env::var("DASHBOARD_API_URL")
                .or_else(|_| std::env::var("API_URL"))
                .map_err(|_| {
                    anyhow::anyhow!("DASHBOARD_API_URL or API_URL environment variable required")
                })
                .and_then(|url| validate_api_url(&url))?,
            port: std::env::var("PORT")
                .unwrap_or_else(|_| defaults.port.to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("PORT must be a valid number between 1-65535"))?,
            poll_interval_secs: positive_var("POLL_INTERVAL_SECS", defaults.poll_interval_secs)?,
            request_timeout_secs: positive_var(
                "REQUEST_TIMEOUT_SECS",
                defaults.request_timeout_secs,
            )?,
            customer_page_limit: positive_var(
                "CUSTOMER_PAGE_LIMIT",
                defaults.customer_page_limit,
            )?,
            loan_page_limit: positive_var("LOAN_PAGE_LIMIT", defaults.loan_page_limit)?,
            scoring_customer_limit: positive_var(
                "SCORING_CUSTOMER_LIMIT",
                defaults.scoring_customer_limit,
            )?,
        };

        tracing::info!("Configuration loaded successfully");
        tracing::debug!("Backend API URL: {}", config.api_url);
        tracing::debug!(
            "Poll interval: {}s, request timeout: {}s",
            config.poll_interval_secs,
            config.request_timeout_secs
        );
        tracing::debug!(
            "Page limits: customers={}, loans={}, scoring={}",
            config.customer_page_limit,
            config.loan_page_limit,
            config.scoring_customer_limit
        );
        tracing::debug!("Server Port: {}", config.port);

        Ok(config)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

fn validate_api_url(url: &str) -> anyhow::Result<String> {
    let trimmed = url.trim();
    if trimmed.is_empty() {
        anyhow::bail!("DASHBOARD_API_URL cannot be empty");
    }
    if !trimmed.starts_with("http://") && !trimmed.starts_with("https://") {
        anyhow::bail!("DASHBOARD_API_URL must start with http:// or https://");
    }
    Url::parse(trimmed)
        .map_err(|e| anyhow::anyhow!("DASHBOARD_API_URL is not a valid URL: {}", e))?;
    Ok(trimmed.trim_end_matches('/').to_string())
}

fn positive_var<T>(name: &str, default: T) -> anyhow::Result<T>
where
    T: std::str::FromStr + PartialOrd + Default + Copy,
{
    let value = match std::env::var(name) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse::<T>()
            .map_err(|_| anyhow::anyhow!("{} must be a positive number", name))?,
        _ => default,
    };
    if value <= T::default() {
        anyhow::bail!("{} must be greater than zero", name);
    }
    Ok(value)
}
