//! Handler middleware.
//!
//! A middleware receives the request and a [`Next`] standing for the rest of
//! the chain. It may modify the request (typically by inserting values into
//! its extensions), call `next.run(req)`, inspect or replace the response, or
//! answer on its own without calling `next` at all.
//!
//! ```rust
//! use lambda_typed_router_core::{middleware, HandlerResponse, Next, RouteRequest, RouteTable};
//! use serde_json::json;
//!
//! #[derive(Clone)]
//! struct UserId(String);
//!
//! let auth = middleware::from_fn(|mut req: RouteRequest<()>, next: Next<()>| async move {
//!     match req.header("x-forwarded-user-id").map(str::to_string) {
//!         Some(user) => {
//!             req.extensions_mut().insert(UserId(user));
//!             next.run(req).await
//!         }
//!         None => Ok(HandlerResponse::new(401, Some(json!("Unauthorized")))),
//!     }
//! });
//!
//! let table = RouteTable::<()>::new()
//!     .get("/me")
//!     .middleware(auth)
//!     .handle(|req| async move {
//!         let user = req.extension::<UserId>().map(|u| u.0.clone());
//!         Ok(HandlerResponse::ok(json!({ "user": user })))
//!     })
//!     .unwrap();
//! assert_eq!(table.len(), 1);
//! ```

use crate::request::RouteRequest;
use crate::response::HandlerResponse;
use crate::route::{BoxedHandler, HandlerFuture};
use lambda_runtime::Error;
use std::future::Future;
use std::sync::Arc;

/// The remainder of a middleware chain, ending in the route handler.
pub struct Next<State> {
    handler: BoxedHandler<State>,
}

impl<State> Next<State> {
    pub fn run(self, req: RouteRequest<State>) -> HandlerFuture {
        (self.handler)(req)
    }
}

pub trait Middleware<State>: Send + Sync + 'static {
    fn call(&self, req: RouteRequest<State>, next: Next<State>) -> HandlerFuture;
}

/// Middleware built from an async function or closure. See [`from_fn`].
#[derive(Clone)]
pub struct FromFn<F>(F);

pub fn from_fn<F>(f: F) -> FromFn<F> {
    FromFn(f)
}

impl<State, F, Fut> Middleware<State> for FromFn<F>
where
    F: Fn(RouteRequest<State>, Next<State>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<HandlerResponse, Error>> + Send + 'static,
{
    fn call(&self, req: RouteRequest<State>, next: Next<State>) -> HandlerFuture {
        Box::pin((self.0)(req, next))
    }
}

impl<State, M> Middleware<State> for Arc<M>
where
    M: Middleware<State> + ?Sized,
{
    fn call(&self, req: RouteRequest<State>, next: Next<State>) -> HandlerFuture {
        (**self).call(req, next)
    }
}

/// Puts `middleware` in front of `handler`.
pub(crate) fn wrap<State>(
    middleware: Arc<dyn Middleware<State>>,
    handler: BoxedHandler<State>,
) -> BoxedHandler<State>
where
    State: Send + Sync + 'static,
{
    Arc::new(move |req| {
        middleware.call(
            req,
            Next {
                handler: Arc::clone(&handler),
            },
        )
    })
}

/// Wraps `handler` so that `chain[0]` runs first.
pub(crate) fn wrap_all<State>(
    chain: &[Arc<dyn Middleware<State>>],
    handler: BoxedHandler<State>,
) -> BoxedHandler<State>
where
    State: Send + Sync + 'static,
{
    chain
        .iter()
        .rev()
        .fold(handler, |inner, middleware| wrap(Arc::clone(middleware), inner))
}
