//! Lambda Typed Router (lambda-typed-router) is an immutable, typed routing library for AWS Lambda HTTP events.
//!
//! Routes are declared with URL patterns carrying typed placeholders. Path and query
//! parameters are converted and validated before a handler runs, JSON bodies are checked
//! against a schema, and every outcome ends in a uniform response envelope.
//!
//! # Features
//!
//! * Support for API Gateway REST (v1), HTTP API (v2) and ALB events
//! * Typed path and query parameters (`{id:int}`, `{ids:int[]}`, `{verbose?:bool}`)
//! * JSON Schema body validation
//! * Immutable route tables built by value, with deterministic precedence
//! * Middleware that can short-circuit or inject request context
//! * CORS and default headers, OpenTelemetry-aware request spans
//! * OpenAPI 3 export and a local development server
//!
//! # Quick Start
//!
//! ```rust
//! # use lambda_typed_router::{define_router, HandlerResponse, HttpEvent};
//! # use serde_json::json;
//! #
//! // Define your application state
//! struct AppState {
//!     greeting: String,
//! }
//!
//! // Set up the router type aliases
//! define_router!(state = AppState);
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let table = RouteTable::new()
//!     .get("/hello/{name}?{times?:int}")
//!     .handle(|req: RouteRequest| async move {
//!         let name = req.path_params().get_str("name").unwrap_or("World");
//!         let times = req.query_params().get_i64("times").unwrap_or(1);
//!         Ok(HandlerResponse::ok(json!({
//!             "message": format!("{}, {}!", req.state().greeting, name),
//!             "times": times,
//!         })))
//!     })?;
//!
//! let dispatcher = Dispatcher::new(table, AppState { greeting: "Hello".to_string() });
//! let response = tokio_test::block_on(
//!     dispatcher.dispatch(HttpEvent::new("GET", "/hello/lambda"), Default::default()),
//! );
//! assert_eq!(response.status_code, 200);
//! assert_eq!(response.json_body(), Some(json!({ "message": "Hello, lambda!", "times": 1 })));
//! # Ok(())
//! # }
//! ```
//!
//! # Running on Lambda
//!
//! ```rust,no_run
//! # use lambda_typed_router::{define_router, HandlerResponse, RouterConfig};
//! # use aws_lambda_events::apigw::ApiGatewayV2httpRequest;
//! # use lambda_runtime::{service_fn, Error, LambdaEvent};
//! # use serde_json::json;
//! #
//! define_router!(state = ());
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Error> {
//!     lambda_runtime::tracing::init_default_subscriber();
//!
//!     let table = RouteTable::new()
//!         .get("/health")
//!         .handle(|_req: RouteRequest| async move { Ok(HandlerResponse::ok(json!("ok"))) })?;
//!     let dispatcher = Dispatcher::new(table, ()).with_config(RouterConfig::from_env());
//!
//!     lambda_runtime::run(service_fn(move |event: LambdaEvent<ApiGatewayV2httpRequest>| {
//!         let dispatcher = dispatcher.clone();
//!         async move { dispatcher.handle_request(event).await }
//!     }))
//!     .await
//! }
//! ```

pub use lambda_typed_router_core::*;

/// Defines a router module with type aliases bound to your application state.
///
/// Every router type in this crate is generic over the shared state handed to
/// handlers. This macro fixes that parameter once so the rest of the
/// application can name the types without repeating it.
///
/// # Type Aliases
///
/// * `State` - The application state type
/// * `RouteTable` - The immutable route table
/// * `RouteBuilder` - The builder returned by `RouteTable::get`, `post`, ...
/// * `RouteRequest` - The request passed to handlers and middleware
/// * `Dispatcher` - The dispatcher serving the table
/// * `Next` - The remainder of a middleware chain
/// * `LocalServer` - The local development server
///
/// # Arguments
///
/// * `module` - The module name (optional, defaults to an internal name whose
///   items are re-exported into the calling scope)
/// * `state` - The state type for the router
///
/// # Examples
///
/// Custom module names allow several routers with different state in one
/// application:
///
/// ```rust
/// use lambda_typed_router::define_router;
///
/// pub struct Accounts;
/// pub struct Admin;
///
/// define_router!(module = accounts_router, state = Accounts);
/// define_router!(module = admin_router, state = Admin);
///
/// # fn main() {
/// let accounts = accounts_router::RouteTable::new();
/// let admin = admin_router::RouteTable::new();
/// assert!(accounts.is_empty() && admin.is_empty());
/// # }
/// ```
#[macro_export]
macro_rules! define_router {
    (module = $module:ident, state = $state_type:ty) => {
        pub mod $module {
            #[allow(unused_imports)]
            use super::*;

            pub type State = $state_type;
            pub type RouteTable = ::lambda_typed_router::RouteTable<State>;
            pub type RouteBuilder = ::lambda_typed_router::RouteBuilder<State>;
            pub type RouteRequest = ::lambda_typed_router::RouteRequest<State>;
            pub type Dispatcher = ::lambda_typed_router::Dispatcher<State>;
            pub type Next = ::lambda_typed_router::Next<State>;
            pub type LocalServer = ::lambda_typed_router::LocalServer<State>;
        }
    };

    (state = $state_type:ty) => {
        mod __lambda_typed_router_default_router {
            #[allow(unused_imports)]
            use super::*;

            pub type State = $state_type;
            pub type RouteTable = ::lambda_typed_router::RouteTable<State>;
            pub type RouteBuilder = ::lambda_typed_router::RouteBuilder<State>;
            pub type RouteRequest = ::lambda_typed_router::RouteRequest<State>;
            pub type Dispatcher = ::lambda_typed_router::Dispatcher<State>;
            pub type Next = ::lambda_typed_router::Next<State>;
            pub type LocalServer = ::lambda_typed_router::LocalServer<State>;
        }
        #[allow(unused_imports)]
        use __lambda_typed_router_default_router::*;
    };
}
