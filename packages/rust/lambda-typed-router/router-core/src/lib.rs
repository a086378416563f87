#![allow(clippy::type_complexity)]

//! Core functionality for the lambda-typed-router crate.
//!
//! **Note**: This is an implementation crate for `lambda-typed-router` and is
//! not meant to be used directly. Please use the main crate instead.
//!
//! The crate is organised along the request pipeline:
//!
//! * [`pattern`] parses route templates such as `/users/{id:int}?{verbose?:bool}`
//! * [`path`] and [`query`] match requests against them, producing typed [`Params`]
//! * [`body`] decodes and validates JSON request bodies
//! * [`resolver`] chooses the route for a request
//! * [`Dispatcher`] runs the whole pipeline and builds the [`ResponseEnvelope`]
//!
//! Route tables are immutable values: every registration returns a new
//! [`RouteTable`], and the table passed to a dispatcher is never modified.

mod config;
mod cors;
mod dispatcher;
mod error;
mod event;
mod logging;
mod request;
mod response;
mod route;

pub mod body;
pub mod constants;
pub mod local;
pub mod middleware;
pub mod openapi;
pub mod params;
pub mod path;
pub mod pattern;
pub mod query;
pub mod resolver;

pub use body::{BodyError, BodyValidator, JsonSchemaValidator};
pub use config::RouterConfig;
pub use cors::{AllowList, CorsConfig, OriginPolicy, RejectedOrigin};
pub use dispatcher::Dispatcher;
pub use error::RouteError;
pub use event::{HttpEvent, RoutableHttpEvent};
pub use local::LocalServer;
pub use logging::LogConfig;
pub use middleware::{Middleware, Next};
pub use openapi::{to_openapi, ApiInfo, IntegrationTarget, OpenApiDocument, PayloadFormat};
pub use params::{ParamError, ParamType, ParamValue, Params};
pub use pattern::UrlPattern;
pub use request::RouteRequest;
pub use resolver::MatchResult;
pub use response::{merge_headers, HandlerResponse, ResponseEnvelope};
pub use route::{
    BoxedHandler, HandlerFuture, RouteBuilder, RouteConfig, RouteDefinition, RouteIter, RouteTable,
    SecurityRequirement,
};
