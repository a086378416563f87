//! Names and defaults shared across the crate.

/// Environment variable names read by [`RouterConfig::from_env`](crate::RouterConfig::from_env)
/// and the local server.
pub mod env_vars {
    /// Set to `true` to enable the permissive CORS policy.
    pub const CORS: &str = "LAMBDA_ROUTER_CORS";

    /// Set to `true` to log every request and response.
    pub const LOG_REQUESTS: &str = "LAMBDA_ROUTER_LOG_REQUESTS";

    /// Set to `true` to include request bodies in request logs.
    pub const LOG_REQUEST_BODY: &str = "LAMBDA_ROUTER_LOG_REQUEST_BODY";

    /// Comma-separated header names left out of request logs.
    pub const LOG_IGNORED_HEADERS: &str = "LAMBDA_ROUTER_LOG_IGNORED_HEADERS";

    /// Port for the local development server.
    pub const PORT: &str = "PORT";
}

pub mod defaults {
    /// Port the local development server listens on.
    pub const LOCAL_PORT: u16 = 8081;

    /// Content type merged into every response.
    pub const CONTENT_TYPE: &str = "application/json";
}
