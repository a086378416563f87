use crate::body::{BodyValidator, JsonSchemaValidator};
use crate::error::RouteError;
use crate::middleware::{wrap_all, Middleware};
use crate::pattern::UrlPattern;
use crate::request::RouteRequest;
use crate::response::HandlerResponse;
use bon::Builder;
use http::Method;
use lambda_runtime::Error;
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

pub type HandlerFuture = Pin<Box<dyn Future<Output = Result<HandlerResponse, Error>> + Send>>;

pub type BoxedHandler<State> = Arc<dyn Fn(RouteRequest<State>) -> HandlerFuture + Send + Sync>;

/// A named security scheme and the scopes a route requires from it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecurityRequirement {
    pub scheme: String,
    pub scopes: Vec<String>,
}

impl SecurityRequirement {
    pub fn new(
        scheme: impl Into<String>,
        scopes: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            scheme: scheme.into(),
            scopes: scopes.into_iter().map(Into::into).collect(),
        }
    }
}

/// Per-route metadata used for documentation and authorization.
///
/// ```rust
/// use lambda_typed_router_core::RouteConfig;
/// use serde_json::json;
///
/// let config = RouteConfig::builder()
///     .responses([(200, json!({"type": "string"}))].into())
///     .requires_auth(true)
///     .build();
/// assert!(config.requires_auth);
/// ```
#[derive(Debug, Clone, Builder)]
pub struct RouteConfig {
    /// Response body schemas keyed by status code. Documentation only.
    #[builder(default)]
    pub responses: BTreeMap<u16, JsonValue>,

    /// Require IAM (SigV4) authorization in the generated API description.
    #[builder(default = false)]
    pub requires_auth: bool,

    pub security: Option<SecurityRequirement>,
}

impl Default for RouteConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// One registered route. Immutable once it enters a [`RouteTable`].
pub struct RouteDefinition<State> {
    method: Method,
    pattern: UrlPattern,
    body: Option<Arc<dyn BodyValidator>>,
    config: RouteConfig,
    handler: BoxedHandler<State>,
}

impl<State> RouteDefinition<State> {
    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn pattern(&self) -> &UrlPattern {
        &self.pattern
    }

    pub fn body_validator(&self) -> Option<&dyn BodyValidator> {
        self.body.as_deref()
    }

    pub fn config(&self) -> &RouteConfig {
        &self.config
    }

    pub(crate) fn handler(&self) -> &BoxedHandler<State> {
        &self.handler
    }

    /// Case-insensitive method comparison.
    pub fn accepts_method(&self, method: &str) -> bool {
        self.method.as_str().eq_ignore_ascii_case(method)
    }
}

impl<State> fmt::Debug for RouteDefinition<State> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteDefinition")
            .field("method", &self.method)
            .field("pattern", &self.pattern.as_str())
            .field("has_body_schema", &self.body.is_some())
            .field("config", &self.config)
            .finish()
    }
}

struct RouteNode<State> {
    route: Arc<RouteDefinition<State>>,
    next: Option<Arc<RouteNode<State>>>,
}

/// An immutable, ordered collection of routes.
///
/// Registering a route returns a new table that shares structure with the
/// old one; nothing is ever mutated in place. Routes are kept in a prepend
/// list, so iteration (and therefore resolution) starts from the most
/// recently registered route.
///
/// # Examples
///
/// ```rust
/// use lambda_typed_router_core::{HandlerResponse, RouteTable};
/// use serde_json::json;
///
/// # fn main() -> Result<(), lambda_typed_router_core::RouteError> {
/// let table = RouteTable::<()>::new()
///     .get("/hello/{name}")
///     .handle(|req| async move {
///         let name = req.path_params().get_str("name").unwrap_or("World").to_string();
///         Ok(HandlerResponse::ok(json!({ "message": format!("Hello, {}!", name) })))
///     })?
///     .post("/accounts")
///     .body(json!({"type": "object", "required": ["username"]}))
///     .handle(|_| async move { Ok(HandlerResponse::new(201, None)) })?;
///
/// assert_eq!(table.len(), 2);
/// # Ok(())
/// # }
/// ```
pub struct RouteTable<State> {
    head: Option<Arc<RouteNode<State>>>,
    len: usize,
}

impl<State> Clone for RouteTable<State> {
    fn clone(&self) -> Self {
        Self {
            head: self.head.clone(),
            len: self.len,
        }
    }
}

impl<State> Default for RouteTable<State> {
    fn default() -> Self {
        Self { head: None, len: 0 }
    }
}

impl<State> fmt::Debug for RouteTable<State> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.iter().map(|r| format!("{} {}", r.method, r.pattern)))
            .finish()
    }
}

impl<State> RouteTable<State> {
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Routes in resolution order, most recently registered first.
    pub fn iter(&self) -> RouteIter<'_, State> {
        RouteIter {
            node: self.head.as_deref(),
        }
    }
}

impl<State> RouteTable<State>
where
    State: Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a new table with `route` in front of every existing route.
    pub fn with_route(&self, route: RouteDefinition<State>) -> Self {
        Self {
            head: Some(Arc::new(RouteNode {
                route: Arc::new(route),
                next: self.head.clone(),
            })),
            len: self.len + 1,
        }
    }

    /// Concatenates two tables. Routes of `self` take precedence over `other`.
    pub fn merge(&self, other: &RouteTable<State>) -> Self {
        let mine: Vec<_> = self.iter_shared().collect();
        let mut merged = other.clone();
        for route in mine.into_iter().rev() {
            merged = Self {
                head: Some(Arc::new(RouteNode {
                    route,
                    next: merged.head.clone(),
                })),
                len: merged.len + 1,
            };
        }
        merged
    }

    pub(crate) fn iter_shared(&self) -> impl Iterator<Item = Arc<RouteDefinition<State>>> + '_ {
        let mut node = self.head.as_deref();
        std::iter::from_fn(move || {
            let current = node?;
            node = current.next.as_deref();
            Some(Arc::clone(&current.route))
        })
    }

    pub fn route(&self, method: Method, pattern: &str) -> RouteBuilder<State> {
        RouteBuilder {
            table: self.clone(),
            method,
            pattern: pattern.to_string(),
            body: None,
            config: RouteConfig::default(),
            middleware: Vec::new(),
        }
    }

    /// Returns a new table in which every route runs behind `middleware`.
    /// Routes registered on the returned table afterwards are not affected.
    pub fn with_middleware(&self, middleware: impl Middleware<State>) -> Self {
        let middleware: Arc<dyn Middleware<State>> = Arc::new(middleware);
        let routes: Vec<_> = self.iter_shared().collect();
        routes.into_iter().rev().fold(Self::new(), |table, route| {
            table.with_route(RouteDefinition {
                method: route.method.clone(),
                pattern: route.pattern.clone(),
                body: route.body.clone(),
                config: route.config.clone(),
                handler: wrap_all(std::slice::from_ref(&middleware), Arc::clone(&route.handler)),
            })
        })
    }

    pub fn get(&self, pattern: &str) -> RouteBuilder<State> {
        self.route(Method::GET, pattern)
    }

    pub fn head(&self, pattern: &str) -> RouteBuilder<State> {
        self.route(Method::HEAD, pattern)
    }

    pub fn options(&self, pattern: &str) -> RouteBuilder<State> {
        self.route(Method::OPTIONS, pattern)
    }

    pub fn post(&self, pattern: &str) -> RouteBuilder<State> {
        self.route(Method::POST, pattern)
    }

    pub fn put(&self, pattern: &str) -> RouteBuilder<State> {
        self.route(Method::PUT, pattern)
    }

    pub fn patch(&self, pattern: &str) -> RouteBuilder<State> {
        self.route(Method::PATCH, pattern)
    }

    pub fn delete(&self, pattern: &str) -> RouteBuilder<State> {
        self.route(Method::DELETE, pattern)
    }
}

pub struct RouteIter<'a, State> {
    node: Option<&'a RouteNode<State>>,
}

impl<'a, State> Iterator for RouteIter<'a, State> {
    type Item = &'a RouteDefinition<State>;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.node?;
        self.node = current.next.as_deref();
        Some(current.route.as_ref())
    }
}

enum BodySpec {
    Schema(JsonValue),
    Validator(Arc<dyn BodyValidator>),
}

/// Collects the pieces of one route until a handler is supplied.
pub struct RouteBuilder<State> {
    table: RouteTable<State>,
    method: Method,
    pattern: String,
    body: Option<BodySpec>,
    config: RouteConfig,
    middleware: Vec<Arc<dyn Middleware<State>>>,
}

impl<State> RouteBuilder<State>
where
    State: Send + Sync + 'static,
{
    /// Validate request bodies against a JSON Schema.
    pub fn body(mut self, schema: JsonValue) -> Self {
        self.body = Some(BodySpec::Schema(schema));
        self
    }

    /// Validate request bodies with a custom validator.
    pub fn body_validator(mut self, validator: impl BodyValidator + 'static) -> Self {
        self.body = Some(BodySpec::Validator(Arc::new(validator)));
        self
    }

    pub fn config(mut self, config: RouteConfig) -> Self {
        self.config = config;
        self
    }

    /// Runs `middleware` before the handler. The first middleware added is
    /// the outermost.
    pub fn middleware(mut self, middleware: impl Middleware<State>) -> Self {
        self.middleware.push(Arc::new(middleware));
        self
    }

    /// Completes the registration and returns the new table.
    ///
    /// The pattern and body schema are validated here, so a malformed route
    /// fails at startup rather than on the first request.
    pub fn handle<F, Fut>(self, handler: F) -> Result<RouteTable<State>, RouteError>
    where
        F: Fn(RouteRequest<State>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<HandlerResponse, Error>> + Send + 'static,
    {
        let pattern = UrlPattern::parse(&self.pattern)?;

        let body = match self.body {
            None => None,
            Some(BodySpec::Validator(validator)) => Some(validator),
            Some(BodySpec::Schema(schema)) => {
                let validator =
                    JsonSchemaValidator::new(schema).map_err(|message| RouteError::InvalidSchema {
                        pattern: self.pattern.clone(),
                        message,
                    })?;
                Some(Arc::new(validator) as Arc<dyn BodyValidator>)
            }
        };

        let handler: BoxedHandler<State> =
            Arc::new(move |req| Box::pin(handler(req)) as HandlerFuture);
        let handler = wrap_all(&self.middleware, handler);

        tracing::debug!(method = %self.method, pattern = %pattern, "registered route");

        Ok(self.table.with_route(RouteDefinition {
            method: self.method,
            pattern,
            body,
            config: self.config,
            handler,
        }))
    }
}
