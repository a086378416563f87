use clap::{Parser, ValueEnum};
use demo_accounts::routes;
use lambda_runtime::Error;
use lambda_typed_router::{to_openapi, ApiInfo, IntegrationTarget, PayloadFormat};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    Json,
    Yaml,
}

/// Print the OpenAPI description of the accounts API.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// ARN of the Lambda function API Gateway should invoke.
    #[arg(long)]
    function_arn: String,

    /// IAM role API Gateway assumes to invoke the function.
    #[arg(long)]
    credentials_role_arn: Option<String>,

    /// Use the HTTP API 2.0 payload format.
    #[arg(long)]
    v2: bool,

    #[arg(short, long, value_enum, default_value_t = Format::Yaml)]
    format: Format,
}

fn main() -> Result<(), Error> {
    let args = Args::parse();

    let info = ApiInfo::builder()
        .title("Accounts")
        .version(env!("CARGO_PKG_VERSION"))
        .build();
    let target = IntegrationTarget::builder()
        .function_arn(args.function_arn)
        .payload_format(if args.v2 { PayloadFormat::V2 } else { PayloadFormat::V1 })
        .maybe_credentials_role_arn(args.credentials_role_arn)
        .build();

    let document = to_openapi(&routes()?, &info, &target);
    let rendered = match args.format {
        Format::Json => document.to_json()?,
        Format::Yaml => document.to_yaml()?,
    };
    println!("{}", rendered);
    Ok(())
}
