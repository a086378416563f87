//! CORS response headers.

use bon::Builder;
use std::collections::BTreeMap;

/// Either every value (`*`) or an explicit list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum AllowList {
    #[default]
    Any,
    List(Vec<String>),
}

impl AllowList {
    pub fn list(values: impl IntoIterator<Item = impl Into<String>>) -> Self {
        AllowList::List(values.into_iter().map(Into::into).collect())
    }

    fn header_value(&self) -> String {
        match self {
            AllowList::Any => "*".to_string(),
            AllowList::List(values) => values.join(", "),
        }
    }
}

/// Which origins may read responses.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum OriginPolicy {
    /// Always answer `*`.
    #[default]
    Any,
    /// Reflect the request's `Origin` when it is one of these.
    AllowList(Vec<String>),
}

impl OriginPolicy {
    pub fn allow_list(origins: impl IntoIterator<Item = impl Into<String>>) -> Self {
        OriginPolicy::AllowList(origins.into_iter().map(Into::into).collect())
    }
}

/// What `Access-Control-Allow-Origin` carries for an origin outside the
/// allow-list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RejectedOrigin {
    /// The literal string `null`.
    #[default]
    Null,
    /// An empty value.
    Empty,
}

/// CORS policy applied to every response when configured.
///
/// ```rust
/// use lambda_typed_router_core::{AllowList, CorsConfig, OriginPolicy};
///
/// let cors = CorsConfig::builder()
///     .allow_headers(AllowList::list(["content-type", "user-agent"]))
///     .allow_methods(AllowList::list(["PUT", "POST", "GET"]))
///     .allow_origin(OriginPolicy::allow_list(["http://localhost:8080"]))
///     .build();
///
/// let headers = cors.headers(Some("http://localhost:8080"));
/// assert_eq!(headers["Access-Control-Allow-Origin"], "http://localhost:8080");
/// assert_eq!(headers["Access-Control-Allow-Credentials"], "false");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Builder)]
pub struct CorsConfig {
    #[builder(default)]
    pub allow_credentials: bool,
    #[builder(default)]
    pub allow_headers: AllowList,
    #[builder(default)]
    pub allow_methods: AllowList,
    #[builder(default)]
    pub allow_origin: OriginPolicy,
    #[builder(default)]
    pub rejected_origin: RejectedOrigin,
}

impl CorsConfig {
    /// Allows everything, credentials included.
    pub fn permissive() -> Self {
        Self {
            allow_credentials: true,
            ..Self::default()
        }
    }

    /// The `Access-Control-Allow-*` headers for a request from `origin`.
    pub fn headers(&self, origin: Option<&str>) -> BTreeMap<String, String> {
        let allow_origin = match &self.allow_origin {
            OriginPolicy::Any => "*".to_string(),
            OriginPolicy::AllowList(allowed) => match origin {
                Some(origin) if allowed.iter().any(|a| a == origin) => origin.to_string(),
                _ => match self.rejected_origin {
                    RejectedOrigin::Null => "null".to_string(),
                    RejectedOrigin::Empty => String::new(),
                },
            },
        };

        BTreeMap::from([
            (
                "Access-Control-Allow-Headers".to_string(),
                self.allow_headers.header_value(),
            ),
            ("Access-Control-Allow-Origin".to_string(), allow_origin),
            (
                "Access-Control-Allow-Methods".to_string(),
                self.allow_methods.header_value(),
            ),
            (
                "Access-Control-Allow-Credentials".to_string(),
                self.allow_credentials.to_string(),
            ),
        ])
    }
}
