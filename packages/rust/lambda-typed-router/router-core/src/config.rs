use crate::constants::env_vars;
use crate::cors::CorsConfig;
use crate::logging::LogConfig;
use bon::Builder;
use std::collections::BTreeMap;
use std::env;

/// Cross-cutting behaviour of a [`Dispatcher`](crate::Dispatcher).
///
/// ```rust
/// use lambda_typed_router_core::{CorsConfig, LogConfig, RouterConfig};
///
/// let config = RouterConfig::builder()
///     .cors(CorsConfig::permissive())
///     .default_headers([("cache-control".to_string(), "no-store".to_string())].into())
///     .log(LogConfig::builder().log_requests(true).build())
///     .build();
/// assert!(config.cors.is_some());
/// ```
#[derive(Debug, Clone, Default, Builder)]
pub struct RouterConfig {
    /// CORS policy. No `Access-Control-*` headers are emitted without one.
    pub cors: Option<CorsConfig>,

    /// Headers merged into every response, below handler headers.
    #[builder(default)]
    pub default_headers: BTreeMap<String, String>,

    #[builder(default)]
    pub log: LogConfig,
}

fn env_flag(name: &str) -> bool {
    match env::var(name).map(|v| v.trim().to_lowercase()).as_deref() {
        Ok("true") | Ok("1") => true,
        Ok("false") | Ok("0") | Ok("") | Err(_) => false,
        Ok(value) => {
            tracing::warn!(variable = name, value, "ignoring invalid boolean in environment");
            false
        }
    }
}

impl RouterConfig {
    /// Builds a configuration from `LAMBDA_ROUTER_*` environment variables.
    ///
    /// Unset variables leave the corresponding feature disabled.
    pub fn from_env() -> Self {
        let cors = env_flag(env_vars::CORS).then(CorsConfig::permissive);
        let ignored_headers = env::var(env_vars::LOG_IGNORED_HEADERS)
            .map(|v| {
                v.split(',')
                    .map(str::trim)
                    .filter(|h| !h.is_empty())
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default();

        Self {
            cors,
            default_headers: BTreeMap::new(),
            log: LogConfig {
                log_requests: env_flag(env_vars::LOG_REQUESTS),
                log_request_body: env_flag(env_vars::LOG_REQUEST_BODY),
                ignored_headers,
            },
        }
    }
}
