use clap::Parser;
use demo_accounts::{routes, AccountStore};
use lambda_runtime::Error;
use lambda_typed_router::{local::local_port, Dispatcher, LocalServer, RouterConfig};

/// Serve the accounts API over plain HTTP for local development.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Port to listen on. Defaults to $PORT, then 8081.
    #[arg(short, long)]
    port: Option<u16>,

    /// Address to bind.
    #[arg(long, default_value = "127.0.0.1")]
    host: String,
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    lambda_runtime::tracing::init_default_subscriber();
    let args = Args::parse();
    let port = args.port.unwrap_or_else(local_port);

    let dispatcher =
        Dispatcher::new(routes()?, AccountStore::new()).with_config(RouterConfig::from_env());
    let server = LocalServer::bind((args.host.as_str(), port), dispatcher).await?;
    server.run().await?;
    Ok(())
}
