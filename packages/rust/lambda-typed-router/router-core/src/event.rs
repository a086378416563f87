use crate::query::{MultiValueQueryMap, QueryMap};
use aws_lambda_events::{
    alb::AlbTargetGroupRequest,
    apigw::{ApiGatewayProxyRequest, ApiGatewayV2httpRequest},
    http::HeaderMap,
};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;
use tracing::Span;
use tracing_opentelemetry::OpenTelemetrySpanExt;

/// The normalized request the dispatcher works on.
///
/// Every supported Lambda event type is converted into this shape before
/// routing. It can also be deserialized directly from the API Gateway REST
/// (v1) proxy payload, which it mirrors.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HttpEvent {
    pub path: String,
    pub http_method: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub headers: HashMap<String, String>,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub is_base64_encoded: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub query_string_parameters: QueryMap,
    #[serde(default, deserialize_with = "null_as_default")]
    pub multi_value_query_string_parameters: MultiValueQueryMap,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

impl HttpEvent {
    pub fn new(http_method: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            http_method: http_method.into(),
            path: path.into(),
            ..Default::default()
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Adds a query parameter to both the single- and multi-valued maps, the
    /// way API Gateway REST events carry them.
    pub fn with_query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let name = name.into();
        let value = value.into();
        self.multi_value_query_string_parameters
            .entry(name.clone())
            .or_default()
            .push(value.clone());
        self.query_string_parameters.insert(name, value);
        self
    }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// The request body with any base64 transfer encoding removed.
    pub fn decoded_body(&self) -> Result<Option<String>, String> {
        match &self.body {
            None => Ok(None),
            Some(body) if self.is_base64_encoded => {
                let bytes = BASE64
                    .decode(body)
                    .map_err(|e| format!("invalid base64 body: {}", e))?;
                String::from_utf8(bytes)
                    .map(Some)
                    .map_err(|e| format!("body is not valid UTF-8: {}", e))
            }
            Some(body) => Ok(Some(body.clone())),
        }
    }
}

fn header_map_to_strings(headers: &HeaderMap) -> HashMap<String, String> {
    headers
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|v| (name.as_str().to_string(), v.to_string()))
        })
        .collect()
}

fn single_values(query: &aws_lambda_events::query_map::QueryMap) -> QueryMap {
    query
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

fn multi_values(query: &aws_lambda_events::query_map::QueryMap) -> MultiValueQueryMap {
    let mut values = MultiValueQueryMap::new();
    for (k, v) in query.iter() {
        values.entry(k.to_string()).or_default().push(v.to_string());
    }
    values
}

fn join_query(query: &aws_lambda_events::query_map::QueryMap) -> Option<String> {
    if query.is_empty() {
        None
    } else {
        Some(
            query
                .iter()
                .map(|(k, v)| format!("{}={}", k, v))
                .collect::<Vec<_>>()
                .join("&"),
        )
    }
}

/// A Lambda event that can be routed.
///
/// Implementations expose the pieces the router needs and, through
/// [`RoutableHttpEvent::to_http_event`], a normalized [`HttpEvent`]. The
/// remaining accessors feed OpenTelemetry HTTP semantic-convention
/// attributes.
///
/// # Examples
///
/// ```rust
/// use lambda_typed_router_core::RoutableHttpEvent;
/// use std::collections::HashMap;
///
/// #[derive(Clone)]
/// struct CustomHttpEvent {
///     path: String,
///     method: String,
///     headers: HashMap<String, String>,
/// }
///
/// impl RoutableHttpEvent for CustomHttpEvent {
///     fn path(&self) -> Option<String> {
///         Some(self.path.clone())
///     }
///
///     fn http_method(&self) -> String {
///         self.method.clone()
///     }
///
///     fn headers(&self) -> HashMap<String, String> {
///         self.headers.clone()
///     }
/// }
/// ```
pub trait RoutableHttpEvent: Send + Sync + Clone + 'static {
    /// Returns the raw path of the HTTP request
    fn path(&self) -> Option<String>;

    /// Returns the HTTP method of the request
    fn http_method(&self) -> String;

    /// Request headers with lowercase names.
    fn headers(&self) -> HashMap<String, String> {
        HashMap::new()
    }

    fn body(&self) -> Option<String> {
        None
    }

    fn is_base64_encoded(&self) -> bool {
        false
    }

    fn query_string_parameters(&self) -> QueryMap {
        QueryMap::new()
    }

    fn multi_value_query_string_parameters(&self) -> MultiValueQueryMap {
        MultiValueQueryMap::new()
    }

    /// Returns the query string
    fn url_query(&self) -> Option<String> {
        None
    }

    /// Returns the client IP address
    fn client_address(&self) -> Option<String> {
        None
    }

    fn user_agent(&self) -> Option<String> {
        self.headers().remove("user-agent")
    }

    fn url_scheme(&self) -> String {
        "https".to_string()
    }

    fn server_address(&self) -> Option<String> {
        self.headers()
            .get("host")
            .map(|host| host.split(':').next().unwrap_or(host).to_string())
    }

    fn server_port(&self) -> Option<u16> {
        Some(443)
    }

    /// Converts the event into the router's normalized request.
    fn to_http_event(&self) -> HttpEvent {
        HttpEvent {
            path: self.path().unwrap_or_else(|| "/".to_string()),
            http_method: self.http_method(),
            headers: self.headers(),
            body: self.body(),
            is_base64_encoded: self.is_base64_encoded(),
            query_string_parameters: self.query_string_parameters(),
            multi_value_query_string_parameters: self.multi_value_query_string_parameters(),
        }
    }

    /// Sets the request-side OpenTelemetry semantic convention attributes on
    /// `span`. The route and response status are recorded by the dispatcher.
    fn set_otel_http_attributes(&self, span: &Span, lambda_context: &lambda_runtime::Context) {
        span.record("http.request.method", self.http_method().as_str());

        span.set_attribute("url.path", self.path().unwrap_or_else(|| "/".to_string()));
        span.set_attribute("url.scheme", self.url_scheme());
        if let Some(query) = self.url_query() {
            span.set_attribute("url.query", query);
        }

        if let Some(addr) = self.server_address() {
            span.set_attribute("server.address", addr);
        }
        if let Some(port) = self.server_port() {
            span.set_attribute("server.port", port as i64);
        }

        if let Some(addr) = self.client_address() {
            span.set_attribute("client.address", addr);
        }
        if let Some(agent) = self.user_agent() {
            span.set_attribute("user_agent.original", agent);
        }

        span.set_attribute("network.protocol.name", "http");

        span.set_attribute("faas.invocation_id", lambda_context.request_id.to_string());
        if let Some(account_id) = lambda_context.invoked_function_arn.split(':').nth(4) {
            span.set_attribute("cloud.account.id", account_id.to_string());
        }
        span.set_attribute(
            "aws.lambda.invoked_arn",
            lambda_context.invoked_function_arn.to_string(),
        );
    }
}

impl RoutableHttpEvent for HttpEvent {
    fn path(&self) -> Option<String> {
        Some(self.path.clone())
    }

    fn http_method(&self) -> String {
        self.http_method.clone()
    }

    fn headers(&self) -> HashMap<String, String> {
        self.headers
            .iter()
            .map(|(k, v)| (k.to_ascii_lowercase(), v.clone()))
            .collect()
    }

    fn url_query(&self) -> Option<String> {
        if self.query_string_parameters.is_empty() {
            None
        } else {
            Some(
                self.query_string_parameters
                    .iter()
                    .map(|(k, v)| format!("{}={}", k, v))
                    .collect::<Vec<_>>()
                    .join("&"),
            )
        }
    }

    fn to_http_event(&self) -> HttpEvent {
        self.clone()
    }
}

impl RoutableHttpEvent for ApiGatewayProxyRequest {
    fn path(&self) -> Option<String> {
        self.path.clone()
    }

    fn http_method(&self) -> String {
        self.http_method.to_string()
    }

    fn headers(&self) -> HashMap<String, String> {
        header_map_to_strings(&self.headers)
    }

    fn body(&self) -> Option<String> {
        self.body.clone()
    }

    fn is_base64_encoded(&self) -> bool {
        self.is_base64_encoded
    }

    fn query_string_parameters(&self) -> QueryMap {
        single_values(&self.query_string_parameters)
    }

    fn multi_value_query_string_parameters(&self) -> MultiValueQueryMap {
        multi_values(&self.multi_value_query_string_parameters)
    }

    fn url_query(&self) -> Option<String> {
        join_query(&self.query_string_parameters)
    }

    fn client_address(&self) -> Option<String> {
        self.request_context.identity.source_ip.clone()
    }
}

impl RoutableHttpEvent for ApiGatewayV2httpRequest {
    fn path(&self) -> Option<String> {
        self.raw_path.clone()
    }

    fn http_method(&self) -> String {
        self.request_context.http.method.to_string()
    }

    fn headers(&self) -> HashMap<String, String> {
        header_map_to_strings(&self.headers)
    }

    fn body(&self) -> Option<String> {
        self.body.clone()
    }

    fn is_base64_encoded(&self) -> bool {
        self.is_base64_encoded
    }

    /// HTTP APIs join repeated keys with commas in the parsed map, so the
    /// raw query string is preferred when present.
    fn query_string_parameters(&self) -> QueryMap {
        match self.raw_query_string.as_deref() {
            Some(raw) => url::form_urlencoded::parse(raw.as_bytes())
                .map(|(k, v)| (k.into_owned(), v.into_owned()))
                .collect(),
            None => single_values(&self.query_string_parameters),
        }
    }

    fn multi_value_query_string_parameters(&self) -> MultiValueQueryMap {
        match self.raw_query_string.as_deref() {
            Some(raw) => {
                let mut values = MultiValueQueryMap::new();
                for (k, v) in url::form_urlencoded::parse(raw.as_bytes()) {
                    values.entry(k.into_owned()).or_default().push(v.into_owned());
                }
                values
            }
            None => multi_values(&self.query_string_parameters),
        }
    }

    fn url_query(&self) -> Option<String> {
        self.raw_query_string.clone().filter(|q| !q.is_empty())
    }

    fn client_address(&self) -> Option<String> {
        self.request_context.http.source_ip.clone()
    }
}

/// ALB forwards query parameters without decoding them.
fn decode_alb_query(query: QueryMap) -> QueryMap {
    query
        .into_iter()
        .map(|(k, v)| (decode_component(&k), decode_component(&v)))
        .collect()
}

fn decode_component(raw: &str) -> String {
    let spaced = raw.replace('+', " ");
    urlencoding::decode(&spaced)
        .map(|v| v.into_owned())
        .unwrap_or(spaced)
}

impl RoutableHttpEvent for AlbTargetGroupRequest {
    fn path(&self) -> Option<String> {
        self.path.clone()
    }

    fn http_method(&self) -> String {
        self.http_method.to_string()
    }

    fn headers(&self) -> HashMap<String, String> {
        header_map_to_strings(&self.headers)
    }

    fn body(&self) -> Option<String> {
        self.body.clone()
    }

    fn is_base64_encoded(&self) -> bool {
        self.is_base64_encoded
    }

    fn query_string_parameters(&self) -> QueryMap {
        decode_alb_query(single_values(&self.query_string_parameters))
    }

    fn multi_value_query_string_parameters(&self) -> MultiValueQueryMap {
        multi_values(&self.multi_value_query_string_parameters)
            .into_iter()
            .map(|(k, values)| {
                (
                    decode_component(&k),
                    values.iter().map(|v| decode_component(v)).collect(),
                )
            })
            .collect()
    }

    fn url_query(&self) -> Option<String> {
        join_query(&self.query_string_parameters)
    }

    fn client_address(&self) -> Option<String> {
        self.headers
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok())
            .and_then(|ips| ips.split(',').next())
            .map(|ip| ip.trim().to_string())
    }
}
