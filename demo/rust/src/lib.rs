//! Accounts API used to demonstrate the router on Lambda and locally.
//!
//! * `HEAD /accounts/{username}` answers 200 or 404 without a body
//! * `GET /accounts/{username}` returns the stored account
//! * `POST /accounts` stores an account validated against [`account_schema`]

pub mod models;
pub mod store;

use lambda_runtime::Error;
use lambda_typed_router::{define_router, middleware, HandlerResponse, RouteConfig, RouteError};
pub use models::{account_schema, Account};
pub use store::AccountStore;

define_router!(module = accounts_router, state = AccountStore);

use accounts_router::{Next, RouteRequest, RouteTable};

async fn head_account(req: RouteRequest) -> Result<HandlerResponse, Error> {
    let username = req.path_params().get_str("username").unwrap_or_default();
    let status = if req.state().exists(username) { 200 } else { 404 };
    Ok(HandlerResponse::empty(status))
}

async fn get_account(req: RouteRequest) -> Result<HandlerResponse, Error> {
    let username = req.path_params().get_str("username").unwrap_or_default();
    match req.state().get(username) {
        Some(account) => Ok(HandlerResponse::json(200, &account)?),
        None => Ok(HandlerResponse::empty(404)),
    }
}

async fn post_account(req: RouteRequest) -> Result<HandlerResponse, Error> {
    let account: Account = req.body_as()?;
    let username = req.state().save(account);
    tracing::info!(username = %username, "account saved");
    Ok(HandlerResponse::empty(201).with_header("location", format!("/accounts/{}", username)))
}

/// Tags the request span with the account being addressed.
async fn tag_username(req: RouteRequest, next: Next) -> Result<HandlerResponse, Error> {
    if let Some(username) = req.path_params().get_str("username") {
        req.set_otel_attribute("accounts.username", username.to_string());
    }
    next.run(req).await
}

/// The complete route table of the accounts API.
pub fn routes() -> Result<RouteTable, RouteError> {
    let table = RouteTable::new()
        .head("/accounts/{username}")
        .handle(head_account)?
        .get("/accounts/{username}")
        .config(
            RouteConfig::builder()
                .responses([(200, account_schema())].into())
                .build(),
        )
        .handle(get_account)?
        .post("/accounts")
        .body(account_schema())
        .handle(post_account)?;
    Ok(table.with_middleware(middleware::from_fn(tag_username)))
}
