//! OpenAPI 3 export for API Gateway.
//!
//! [`to_openapi`] is a pure projection of a route table: one path item per
//! distinct route template (placeholder types stripped), one operation per
//! method, parameters from the placeholders, a request body when the route
//! declares a schema, and an `x-amazon-apigateway-integration` block pointing
//! at the Lambda function.

use crate::params::ParamType;
use crate::pattern::Placeholder;
use crate::route::{RouteDefinition, RouteTable};
use bon::Builder;
use serde_json::{json, Map, Value as JsonValue};
use std::collections::BTreeMap;

/// Name of the security scheme used for IAM-authorized routes.
pub const SIGV4_SCHEME: &str = "sigv4";

/// The `info` object plus document-level security schemes.
#[derive(Debug, Clone, Builder)]
pub struct ApiInfo {
    #[builder(into)]
    pub title: String,
    #[builder(into)]
    pub version: String,
    #[builder(into)]
    pub description: Option<String>,
    /// Extra entries for `components.securitySchemes`, keyed by name.
    #[builder(default)]
    pub security_schemes: BTreeMap<String, JsonValue>,
}

/// Lambda event payload format used by the API Gateway integration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PayloadFormat {
    /// REST APIs, or HTTP APIs with the 1.0 format.
    #[default]
    V1,
    /// HTTP APIs with the 2.0 format.
    V2,
}

impl PayloadFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            PayloadFormat::V1 => "1.0",
            PayloadFormat::V2 => "2.0",
        }
    }
}

/// The Lambda function API Gateway should invoke.
#[derive(Debug, Clone, Builder)]
pub struct IntegrationTarget {
    #[builder(into)]
    pub function_arn: String,
    #[builder(default)]
    pub payload_format: PayloadFormat,
    /// IAM role API Gateway assumes to invoke the function.
    #[builder(into)]
    pub credentials_role_arn: Option<String>,
}

impl IntegrationTarget {
    /// The integration URI. A function ARN with a region expands to the
    /// API Gateway invocation path; anything else is used as given.
    pub fn uri(&self) -> String {
        match self.function_arn.split(':').nth(3).filter(|r| !r.is_empty()) {
            Some(region) if self.function_arn.starts_with("arn:") => format!(
                "arn:aws:apigateway:{}:lambda:path/2015-03-31/functions/{}/invocations",
                region, self.function_arn
            ),
            _ => self.function_arn.clone(),
        }
    }

    fn extension(&self) -> JsonValue {
        let mut integration = json!({
            "type": "aws_proxy",
            "httpMethod": "POST",
            "uri": self.uri(),
            "payloadFormatVersion": self.payload_format.as_str(),
        });
        if let Some(role) = &self.credentials_role_arn {
            integration["credentials"] = json!(role);
        }
        integration
    }
}

/// A rendered OpenAPI document.
#[derive(Debug, Clone, PartialEq)]
pub struct OpenApiDocument(JsonValue);

impl OpenApiDocument {
    pub fn as_value(&self) -> &JsonValue {
        &self.0
    }

    pub fn into_value(self) -> JsonValue {
        self.0
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&self.0)
    }

    pub fn to_yaml(&self) -> Result<String, serde_yaml::Error> {
        serde_yaml::to_string(&self.0)
    }
}

fn schema_for(param_type: ParamType) -> JsonValue {
    let scalar = |t: ParamType| match t {
        ParamType::Int => json!({ "type": "integer" }),
        ParamType::Float => json!({ "type": "number" }),
        ParamType::Bool => json!({ "type": "boolean" }),
        _ => json!({ "type": "string" }),
    };
    if param_type.is_array() {
        json!({ "type": "array", "items": scalar(param_type.element()) })
    } else {
        scalar(param_type)
    }
}

fn parameter(placeholder: &Placeholder, location: &str, required: bool) -> JsonValue {
    let mut param = json!({
        "in": location,
        "name": placeholder.name,
        "required": required,
        "schema": schema_for(placeholder.param_type),
    });
    if location == "query" && placeholder.param_type.is_array() {
        param["style"] = json!("form");
        param["explode"] = json!(true);
    }
    param
}

fn responses<State>(route: &RouteDefinition<State>) -> JsonValue {
    let catalog = &route.config().responses;
    if catalog.is_empty() {
        return json!({ "200": { "description": "OK" } });
    }
    catalog
        .iter()
        .map(|(status, schema)| {
            let description = http::StatusCode::from_u16(*status)
                .ok()
                .and_then(|s| s.canonical_reason())
                .unwrap_or("Response");
            (
                status.to_string(),
                json!({
                    "description": description,
                    "content": { "application/json": { "schema": schema } }
                }),
            )
        })
        .collect::<Map<_, _>>()
        .into()
}

fn operation<State>(route: &RouteDefinition<State>, target: &IntegrationTarget) -> JsonValue {
    let pattern = route.pattern();
    let parameters: Vec<JsonValue> = pattern
        .path_params()
        .map(|p| parameter(p, "path", true))
        .chain(
            pattern
                .query_params()
                .iter()
                .map(|p| parameter(p, "query", !p.optional)),
        )
        .collect();

    let mut op = json!({
        "parameters": parameters,
        "responses": responses(route),
        "x-amazon-apigateway-integration": target.extension(),
    });

    if let Some(schema) = route.body_validator().and_then(|v| v.schema()) {
        op["requestBody"] = json!({
            "required": true,
            "content": { "application/json": { "schema": schema } }
        });
    }

    let config = route.config();
    if let Some(security) = &config.security {
        op["security"] = json!([{ security.scheme.clone(): security.scopes }]);
    } else if config.requires_auth {
        op["security"] = json!([{ SIGV4_SCHEME: [] }]);
    }

    op
}

/// Projects `table` onto an OpenAPI 3.0.1 document.
///
/// When several routes share a method and template, the one that wins
/// resolution is documented.
///
/// ```rust
/// use lambda_typed_router_core::{
///     to_openapi, ApiInfo, HandlerResponse, IntegrationTarget, RouteTable,
/// };
///
/// let table = RouteTable::<()>::new()
///     .get("/people/{name}/aged/{age:int}?{menOnly?:bool}")
///     .handle(|_| async { Ok(HandlerResponse::empty(204)) })
///     .unwrap();
///
/// let doc = to_openapi(
///     &table,
///     &ApiInfo::builder().title("People").version("1.0.0").build(),
///     &IntegrationTarget::builder()
///         .function_arn("arn:aws:lambda:us-east-1:123456789012:function:people")
///         .build(),
/// );
/// let op = &doc.as_value()["paths"]["/people/{name}/aged/{age}"]["get"];
/// assert_eq!(op["parameters"][1]["schema"]["type"], "integer");
/// assert_eq!(op["parameters"][2]["required"], false);
/// ```
pub fn to_openapi<State>(
    table: &RouteTable<State>,
    info: &ApiInfo,
    target: &IntegrationTarget,
) -> OpenApiDocument {
    // Sorted by template so the rendering is stable across registration orders.
    let mut paths: BTreeMap<String, Map<String, JsonValue>> = BTreeMap::new();
    for route in table.iter() {
        paths
            .entry(route.pattern().template())
            .or_default()
            .entry(route.method().as_str().to_lowercase())
            .or_insert_with(|| operation(route, target));
    }

    let mut info_object = json!({ "title": info.title, "version": info.version });
    if let Some(description) = &info.description {
        info_object["description"] = json!(description);
    }

    let mut schemes: Map<String, JsonValue> = info
        .security_schemes
        .iter()
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();
    if table.iter().any(|r| r.config().requires_auth && r.config().security.is_none()) {
        schemes.entry(SIGV4_SCHEME).or_insert_with(|| {
            json!({
                "type": "apiKey",
                "name": "Authorization",
                "in": "header",
                "x-amazon-apigateway-authtype": "awsSigv4"
            })
        });
    }

    let mut document = json!({
        "openapi": "3.0.1",
        "info": info_object,
        "paths": paths,
    });
    if !schemes.is_empty() {
        document["components"] = json!({ "securitySchemes": schemes });
    }

    OpenApiDocument(document)
}
