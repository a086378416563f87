use crate::event::HttpEvent;
use crate::params::Params;
use crate::response::HandlerResponse;
use http::Extensions;
use opentelemetry::{Key as OtelKey, Value as OtelValue};
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;
use std::fmt;
use std::sync::Arc;
use tracing::Span;
use tracing_opentelemetry::OpenTelemetrySpanExt;

/// Request passed to route handlers: the parsed parameters and body, the
/// shared application state and the Lambda execution context.
///
/// # Examples
///
/// ```rust
/// use lambda_typed_router_core::{HandlerResponse, RouteRequest};
/// use lambda_runtime::Error;
/// use serde_json::json;
///
/// async fn handle_user(req: RouteRequest<()>) -> Result<HandlerResponse, Error> {
///     let id = req.path_params().get_i64("id").unwrap_or_default();
///     let verbose = req.query_params().get_bool("verbose").unwrap_or(false);
///
///     req.set_otel_attribute("user.id", id);
///
///     Ok(req.response(200, Some(json!({ "id": id, "verbose": verbose }))))
/// }
/// ```
pub struct RouteRequest<State> {
    /// The request path as received
    pub path: String,
    /// The HTTP method, uppercased
    pub method: String,
    /// Typed values captured from the path
    pub path_params: Params,
    /// Typed values declared by the route's query spec
    pub query_params: Params,
    /// The decoded JSON body, already validated when the route has a schema
    pub body: Option<JsonValue>,
    /// Application state shared across all requests
    pub state: Arc<State>,
    /// The normalized event
    pub event: Arc<HttpEvent>,
    /// Lambda execution context
    pub lambda_context: lambda_runtime::Context,
    /// The route pattern that matched, as registered
    pub route_pattern: String,
    /// Values inserted by middleware
    pub extensions: Extensions,
}

impl<State> fmt::Debug for RouteRequest<State> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteRequest")
            .field("path", &self.path)
            .field("method", &self.method)
            .field("path_params", &self.path_params)
            .field("query_params", &self.query_params)
            .field("body", &self.body)
            .field("route_pattern", &self.route_pattern)
            .finish_non_exhaustive()
    }
}

impl<State> RouteRequest<State> {
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn path_params(&self) -> &Params {
        &self.path_params
    }

    pub fn query_params(&self) -> &Params {
        &self.query_params
    }

    pub fn body(&self) -> Option<&JsonValue> {
        self.body.as_ref()
    }

    /// Deserializes the body into `T`. An absent body deserializes from
    /// `null`, so `Option<T>` accepts it.
    pub fn body_as<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_value(self.body.clone().unwrap_or(JsonValue::Null))
    }

    pub fn state(&self) -> &State {
        &self.state
    }

    pub fn event(&self) -> &HttpEvent {
        &self.event
    }

    pub fn lambda_context(&self) -> &lambda_runtime::Context {
        &self.lambda_context
    }

    /// The route pattern that matched this request, e.g. `/users/{id:int}`.
    pub fn route_pattern(&self) -> &str {
        &self.route_pattern
    }

    /// Case-insensitive request header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.event.header(name)
    }

    pub fn extension<T: Send + Sync + 'static>(&self) -> Option<&T> {
        self.extensions.get::<T>()
    }

    pub fn extensions_mut(&mut self) -> &mut Extensions {
        &mut self.extensions
    }

    /// Builds a handler response.
    pub fn response(&self, status_code: u16, body: Option<JsonValue>) -> HandlerResponse {
        HandlerResponse::new(status_code, body)
    }

    /// Sets a single attribute on the current OpenTelemetry span.
    ///
    /// ```rust
    /// # use lambda_typed_router_core::RouteRequest;
    /// async fn handler(req: RouteRequest<()>) {
    ///     req.set_otel_attribute("user.id", "123")
    ///        .set_otel_attribute("request.size", 1024)
    ///        .set_otel_attribute("cache.hit", true);
    /// }
    /// ```
    pub fn set_otel_attribute(
        &self,
        key: impl Into<OtelKey>,
        value: impl Into<OtelValue>,
    ) -> &Self {
        let span = Span::current();
        span.set_attribute(key, value);
        self
    }

    /// Sets the OpenTelemetry span kind for the current span.
    pub fn set_otel_span_kind(&self, kind: &str) -> &Self {
        let span = Span::current();
        span.record("otel.kind", kind);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::{ParamType, Params};
    use serde::Deserialize;
    use serde_json::json;

    fn request(body: Option<JsonValue>) -> RouteRequest<u32> {
        let path_params: Params = [(
            "id".to_string(),
            ParamType::Int.parse(&["7"]).unwrap(),
        )]
        .into_iter()
        .collect();
        RouteRequest {
            path: "/users/7".to_string(),
            method: "GET".to_string(),
            path_params,
            query_params: Params::new(),
            body,
            state: Arc::new(42),
            event: Arc::new(HttpEvent::new("GET", "/users/7").with_header("X-Api-Key", "secret")),
            lambda_context: lambda_runtime::Context::default(),
            route_pattern: "/users/{id:int}".to_string(),
            extensions: Extensions::new(),
        }
    }

    #[derive(Debug, Deserialize, PartialEq)]
    struct NewUser {
        name: String,
    }

    #[test]
    fn test_accessors() {
        let req = request(None);
        assert_eq!(req.path(), "/users/7");
        assert_eq!(req.route_pattern(), "/users/{id:int}");
        assert_eq!(req.path_params().get_i64("id"), Some(7));
        assert_eq!(*req.state(), 42);
        assert_eq!(req.header("x-api-key"), Some("secret"));
    }

    #[test]
    fn test_body_as() {
        let req = request(Some(json!({"name": "ann"})));
        assert_eq!(
            req.body_as::<NewUser>().unwrap(),
            NewUser {
                name: "ann".to_string()
            }
        );

        let empty = request(None);
        assert_eq!(empty.body_as::<Option<NewUser>>().unwrap(), None);
        assert!(empty.body_as::<NewUser>().is_err());
    }

    #[test]
    fn test_extensions() {
        #[derive(Debug, Clone, PartialEq)]
        struct UserId(String);

        let mut req = request(None);
        assert!(req.extension::<UserId>().is_none());
        req.extensions_mut().insert(UserId("u-1".to_string()));
        assert_eq!(req.extension::<UserId>(), Some(&UserId("u-1".to_string())));
    }

    #[test]
    fn test_response_helper() {
        let req = request(None);
        let response = req.response(201, Some(json!({"id": 7})));
        assert_eq!(response.status_code, 201);
        assert_eq!(response.body, Some(json!({"id": 7})));
    }
}
