use crate::body::{validate_body, BodyError};
use crate::config::RouterConfig;
use crate::constants::defaults;
use crate::event::{HttpEvent, RoutableHttpEvent};
use crate::logging::{log_request, log_response};
use crate::request::RouteRequest;
use crate::resolver::{match_request, MatchResult};
use crate::response::{merge_headers, HandlerResponse, ResponseEnvelope};
use crate::route::{RouteDefinition, RouteTable};
use futures::FutureExt;
use http::Extensions;
use lambda_runtime::{Error, LambdaEvent};
use opentelemetry::global;
use serde_json::{json, Value as JsonValue};
use std::any::Any;
use std::collections::BTreeMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::{field, Instrument, Span};
use tracing_opentelemetry::OpenTelemetrySpanExt;

/// Turns requests into response envelopes using a route table.
///
/// Every request ends in an envelope: unmatched routes become 404, parameter
/// and body problems 400, and handler errors or panics 500. The dispatcher
/// never returns an error to the Lambda runtime.
///
/// # Examples
///
/// ```rust
/// use lambda_typed_router_core::{Dispatcher, HandlerResponse, HttpEvent, RouteTable};
/// use serde_json::json;
///
/// # async fn run() -> Result<(), Box<dyn std::error::Error>> {
/// let table = RouteTable::<()>::new()
///     .get("/name/{name}/age/{age:int}")
///     .handle(|req| async move {
///         Ok(HandlerResponse::ok(req.path_params().to_json()))
///     })?;
/// let dispatcher = Dispatcher::new(table, ());
///
/// let response = dispatcher
///     .dispatch(HttpEvent::new("GET", "/name/john/age/30"), Default::default())
///     .await;
/// assert_eq!(response.status_code, 200);
/// assert_eq!(response.body, r#"{"age":30,"name":"john"}"#);
///
/// let response = dispatcher
///     .dispatch(HttpEvent::new("GET", "/name/john/age/afd"), Default::default())
///     .await;
/// assert_eq!(response.status_code, 400);
/// # Ok(())
/// # }
/// ```
pub struct Dispatcher<State> {
    table: RouteTable<State>,
    config: RouterConfig,
    state: Arc<State>,
}

impl<State> Clone for Dispatcher<State> {
    fn clone(&self) -> Self {
        Self {
            table: self.table.clone(),
            config: self.config.clone(),
            state: Arc::clone(&self.state),
        }
    }
}

fn request_span<E: RoutableHttpEvent>(
    payload: &E,
    lambda_context: &lambda_runtime::Context,
) -> Span {
    let span = tracing::info_span!(
        "http_request",
        otel.name = field::Empty,
        otel.kind = "SERVER",
        otel.status_code = field::Empty,
        otel.status_message = field::Empty,
        http.request.method = field::Empty,
        http.route = field::Empty,
    );

    let headers = payload.headers();
    let parent_cx = global::get_text_map_propagator(|propagator| propagator.extract(&headers));
    span.set_parent(parent_cx);
    payload.set_otel_http_attributes(&span, lambda_context);
    span
}

fn record_status(span: &Span, status_code: u16) {
    span.set_attribute("http.response.status_code", status_code as i64);
    // Server spans only flag 5xx as errors.
    if (500..600).contains(&status_code) {
        span.record("otel.status_code", "ERROR");
        span.record(
            "otel.status_message",
            format!("Server error {}", status_code).as_str(),
        );
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    panic
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| panic.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "handler panicked".to_string())
}

impl<State> Dispatcher<State>
where
    State: Send + Sync + 'static,
{
    pub fn new(table: RouteTable<State>, state: State) -> Self {
        Self::with_shared_state(table, Arc::new(state))
    }

    pub fn with_shared_state(table: RouteTable<State>, state: Arc<State>) -> Self {
        Self {
            table,
            config: RouterConfig::default(),
            state,
        }
    }

    pub fn with_config(mut self, config: RouterConfig) -> Self {
        self.config = config;
        self
    }

    pub fn table(&self) -> &RouteTable<State> {
        &self.table
    }

    pub fn config(&self) -> &RouterConfig {
        &self.config
    }

    pub fn state(&self) -> &State {
        &self.state
    }

    /// Lambda entry point for any supported event type.
    ///
    /// ```rust,no_run
    /// use aws_lambda_events::apigw::ApiGatewayProxyRequest;
    /// use lambda_runtime::{service_fn, Error, LambdaEvent};
    /// use lambda_typed_router_core::{Dispatcher, RouteTable};
    ///
    /// #[tokio::main]
    /// async fn main() -> Result<(), Error> {
    ///     let dispatcher = Dispatcher::new(RouteTable::<()>::new(), ());
    ///     lambda_runtime::run(service_fn(move |event: LambdaEvent<ApiGatewayProxyRequest>| {
    ///         let dispatcher = dispatcher.clone();
    ///         async move { dispatcher.handle_request(event).await }
    ///     }))
    ///     .await
    /// }
    /// ```
    pub async fn handle_request<E: RoutableHttpEvent>(
        &self,
        event: LambdaEvent<E>,
    ) -> Result<ResponseEnvelope, Error> {
        let (payload, lambda_context) = event.into_parts();
        let span = request_span(&payload, &lambda_context);
        Ok(self
            .process(payload.to_http_event(), lambda_context)
            .instrument(span)
            .await)
    }

    /// Dispatches an already normalized event.
    pub async fn dispatch(
        &self,
        event: HttpEvent,
        lambda_context: lambda_runtime::Context,
    ) -> ResponseEnvelope {
        let span = request_span(&event, &lambda_context);
        self.process(event, lambda_context).instrument(span).await
    }

    async fn process(
        &self,
        event: HttpEvent,
        lambda_context: lambda_runtime::Context,
    ) -> ResponseEnvelope {
        log_request(&self.config.log, &event);
        let event = Arc::new(event);
        let base_headers = self.base_headers(&event);

        let envelope = match match_request(&self.table, &event) {
            MatchResult::NotFound => {
                tracing::info!(
                    method = %event.http_method,
                    path = %event.path,
                    query = ?event.query_string_parameters,
                    "unresolvable route"
                );
                json_envelope(404, &json!({ "message": "Not Found" }), &base_headers)
            }
            MatchResult::BadRequest(errors) => {
                tracing::info!(
                    method = %event.http_method,
                    path = %event.path,
                    query = ?event.query_string_parameters,
                    errors = ?errors,
                    "invalid request parameters"
                );
                json_envelope(
                    400,
                    &json!({ "message": "Bad Request", "errors": errors }),
                    &base_headers,
                )
            }
            MatchResult::Matched {
                route,
                path_params,
                query_params,
            } => {
                let span = Span::current();
                span.record("http.route", route.pattern().template().as_str());
                span.record(
                    "otel.name",
                    format!("{} {}", route.method(), route.pattern().template()).as_str(),
                );

                match self.decode_body(&route, &event) {
                    Err(errors) => {
                        tracing::info!(
                            path = %event.path,
                            errors = ?errors,
                            "request body does not match the expected schema"
                        );
                        json_envelope(
                            400,
                            &json!({ "message": "Bad request", "errors": errors }),
                            &base_headers,
                        )
                    }
                    Ok(body) => {
                        let req = RouteRequest {
                            path: event.path.clone(),
                            method: event.http_method.to_uppercase(),
                            path_params,
                            query_params,
                            body,
                            state: Arc::clone(&self.state),
                            event: Arc::clone(&event),
                            lambda_context,
                            route_pattern: route.pattern().to_string(),
                            extensions: Extensions::new(),
                        };
                        self.invoke(&route, req, base_headers).await
                    }
                }
            }
        };

        record_status(&Span::current(), envelope.status_code);
        log_response(&self.config.log, &envelope);
        envelope
    }

    fn decode_body(
        &self,
        route: &RouteDefinition<State>,
        event: &HttpEvent,
    ) -> Result<Option<JsonValue>, Vec<BodyError>> {
        let validator = route.body_validator();
        let raw = match event.decoded_body() {
            Ok(raw) => raw,
            // Without a schema any body is accepted, so undecodable bytes
            // reach the handler in their transport (base64) form.
            Err(_) if validator.is_none() => event.body.clone(),
            Err(message) => return Err(vec![BodyError::new("", message)]),
        };
        validate_body(validator, raw.as_deref())
    }

    async fn invoke(
        &self,
        route: &RouteDefinition<State>,
        req: RouteRequest<State>,
        base_headers: BTreeMap<String, String>,
    ) -> ResponseEnvelope {
        let handler = Arc::clone(route.handler());
        let outcome = AssertUnwindSafe(async move { handler(req).await })
            .catch_unwind()
            .await;

        let failure = match outcome {
            Ok(Ok(response)) => return success_envelope(response, base_headers),
            Ok(Err(err)) => err.to_string(),
            Err(panic) => panic_message(panic.as_ref()),
        };

        tracing::error!(route = %route.pattern(), error = %failure, "handler failed");
        let mut headers = base_headers;
        merge_headers(&mut headers, [("content-type", "text/plain")]);
        ResponseEnvelope {
            status_code: 500,
            body: failure,
            headers,
            is_base64_encoded: false,
        }
    }

    /// CORS headers, then the JSON content type, then configured defaults.
    fn base_headers(&self, event: &HttpEvent) -> BTreeMap<String, String> {
        let mut headers = self
            .config
            .cors
            .as_ref()
            .map(|cors| cors.headers(event.header("origin")))
            .unwrap_or_default();
        merge_headers(&mut headers, [("content-type", defaults::CONTENT_TYPE)]);
        merge_headers(&mut headers, self.config.default_headers.clone());
        headers
    }
}

fn json_envelope(
    status_code: u16,
    body: &JsonValue,
    headers: &BTreeMap<String, String>,
) -> ResponseEnvelope {
    ResponseEnvelope {
        status_code,
        body: body.to_string(),
        headers: headers.clone(),
        is_base64_encoded: false,
    }
}

fn success_envelope(
    response: HandlerResponse,
    mut headers: BTreeMap<String, String>,
) -> ResponseEnvelope {
    merge_headers(&mut headers, response.headers);
    let body = match response.body {
        None | Some(JsonValue::Null) => String::new(),
        Some(body) => body.to_string(),
    };
    ResponseEnvelope {
        status_code: response.status_code,
        body,
        headers,
        is_base64_encoded: false,
    }
}
