use aws_lambda_events::apigw::ApiGatewayProxyRequest;
use demo_accounts::{routes, AccountStore};
use lambda_runtime::{service_fn, Error, LambdaEvent};
use lambda_typed_router::{Dispatcher, RouterConfig};

#[tokio::main]
async fn main() -> Result<(), Error> {
    lambda_runtime::tracing::init_default_subscriber();

    let dispatcher =
        Dispatcher::new(routes()?, AccountStore::new()).with_config(RouterConfig::from_env());

    lambda_runtime::run(service_fn(
        move |event: LambdaEvent<ApiGatewayProxyRequest>| {
            let dispatcher = dispatcher.clone();
            async move { dispatcher.handle_request(event).await }
        },
    ))
    .await
}
