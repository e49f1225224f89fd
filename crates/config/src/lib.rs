use std::env;

/// Environment the process is running in; shapes log verbosity and whether
/// Sentry is wired up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

impl Environment {
    fn parse(raw: &str) -> Self {
        match raw.to_ascii_lowercase().as_str() {
            "staging" => Environment::Staging,
            "production" => Environment::Production,
            _ => Environment::Development,
        }
    }
}

/// Redis connection, either as one URL or as discrete host/port/db/password
/// fields. `None` means the in-memory cache backend is used instead.
#[derive(Debug, Clone, Default)]
pub struct RedisConfig {
    pub url: Option<String>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub db: Option<u8>,
    pub password: Option<String>,
}

/// Every externally-configurable knob the core reads at startup. Missing
/// optional keys degrade the relevant sensor rather than failing startup;
/// only a fully-offline deployment has every provider key unset.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub gemini_api_key: Option<String>,
    pub tavily_api_key: Option<String>,
    pub news_api_key: Option<String>,
    pub finnhub_api_key: Option<String>,
    pub polygon_api_key: Option<String>,
    pub api_key: Option<String>,
    pub redis: RedisConfig,
    pub environment: Environment,
    pub sentry_dsn: Option<String>,
    pub rate_limit_requests_per_min: u32,
    pub data_cache_ttl_secs: u64,
}

const DEFAULT_RATE_LIMIT_REQUESTS: u32 = 100;
const DEFAULT_DATA_CACHE_TTL_SECS: u64 = 3600;

impl RuntimeConfig {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let redis = RedisConfig {
            url: env::var("REDIS_URL").ok(),
            host: env::var("REDIS_HOST").ok(),
            port: env::var("REDIS_PORT").ok().and_then(|p| p.parse().ok()),
            db: env::var("REDIS_DB").ok().and_then(|d| d.parse().ok()),
            password: env::var("REDIS_PASSWORD").ok(),
        };

        let config = Self {
            gemini_api_key: env::var("GEMINI_API_KEY").ok(),
            tavily_api_key: env::var("TAVILY_API_KEY").ok(),
            news_api_key: env::var("NEWS_API_KEY").ok(),
            finnhub_api_key: env::var("FINNHUB_API_KEY").ok(),
            polygon_api_key: env::var("POLYGON_API_KEY").ok(),
            api_key: env::var("API_KEY").ok(),
            redis,
            environment: env::var("ENVIRONMENT")
                .map(|v| Environment::parse(&v))
                .unwrap_or(Environment::Development),
            sentry_dsn: env::var("SENTRY_DSN").ok(),
            rate_limit_requests_per_min: env::var("RATE_LIMIT_REQUESTS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_RATE_LIMIT_REQUESTS),
            data_cache_ttl_secs: env::var("DATA_CACHE_TTL")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_DATA_CACHE_TTL_SECS),
        };

        if config.gemini_api_key.is_none() {
            tracing::warn!("GEMINI_API_KEY not set; narrative synthesis will fall back to deterministic templates");
        }

        config
    }
}

/// Initializes the global tracing subscriber. Honors `RUST_LOG`/`RUST_LOG_FORMAT`;
/// defaults to human-readable `info`-level logs.
pub fn init_tracing() {
    let json_logging = env::var("RUST_LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    if json_logging {
        tracing_subscriber::fmt().json().with_env_filter(env_filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn environment_parse_defaults_to_development() {
        assert_eq!(Environment::parse("bogus"), Environment::Development);
        assert_eq!(Environment::parse("Production"), Environment::Production);
    }
}
