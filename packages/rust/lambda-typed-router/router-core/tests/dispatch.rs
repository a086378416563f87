use aws_lambda_events::alb::AlbTargetGroupRequest;
use aws_lambda_events::apigw::{ApiGatewayProxyRequest, ApiGatewayV2httpRequest};
use aws_lambda_events::http::Method;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use lambda_runtime::{Context, Error, LambdaEvent};
use lambda_typed_router_core::{
    middleware, AllowList, CorsConfig, Dispatcher, HandlerResponse, HttpEvent, Next,
    OriginPolicy, ResponseEnvelope, RouteRequest, RouteTable, RouterConfig,
};
use serde_json::{json, Value};
use std::collections::HashMap;

async fn echo(req: RouteRequest<()>) -> Result<HandlerResponse, Error> {
    Ok(HandlerResponse::ok(json!({
        "route": req.route_pattern(),
        "path": req.path_params().to_json(),
        "query": req.query_params().to_json(),
        "body": req.body().cloned(),
    })))
}

fn labelled(
    label: &'static str,
) -> impl Fn(RouteRequest<()>) -> std::future::Ready<Result<HandlerResponse, Error>> {
    move |_| std::future::ready(Ok(HandlerResponse::ok(json!(label))))
}

fn dispatcher(table: RouteTable<()>) -> Dispatcher<()> {
    Dispatcher::new(table, ())
}

async fn send(dispatcher: &Dispatcher<()>, event: HttpEvent) -> ResponseEnvelope {
    dispatcher.dispatch(event, Context::default()).await
}

fn body(response: &ResponseEnvelope) -> Value {
    response.json_body().expect("JSON body")
}

#[tokio::test]
async fn test_typed_path_params() {
    let d = dispatcher(
        RouteTable::new()
            .get("/name/{name}/age/{age:int}")
            .handle(echo)
            .unwrap(),
    );

    let response = send(&d, HttpEvent::new("GET", "/name/john/age/30")).await;
    assert_eq!(response.status_code, 200);
    assert_eq!(body(&response)["path"], json!({"name": "john", "age": 30}));

    let response = send(&d, HttpEvent::new("GET", "/name/john/age/afd")).await;
    assert_eq!(response.status_code, 400);
    assert_eq!(body(&response)["message"], "Bad Request");
}

#[tokio::test]
async fn test_float_and_bool_path_params() {
    let d = dispatcher(
        RouteTable::new()
            .get("/geo/{lat:float}/{lng:float}/exact/{exact:bool}")
            .handle(echo)
            .unwrap(),
    );

    let response = send(&d, HttpEvent::new("GET", "/geo/-33.86/151.2/exact/TRUE")).await;
    assert_eq!(response.status_code, 200);
    assert_eq!(
        body(&response)["path"],
        json!({"lat": -33.86, "lng": 151.2, "exact": true})
    );

    let response = send(&d, HttpEvent::new("GET", "/geo/north/151.2/exact/yes")).await;
    assert_eq!(response.status_code, 400);
    assert_eq!(
        body(&response)["errors"],
        json!([
            "path param `lat`: invalid float `north`",
            "path param `exact`: invalid bool `yes`"
        ])
    );
}

#[tokio::test]
async fn test_percent_encoded_path_param() {
    let d = dispatcher(RouteTable::new().get("/{userId}").handle(echo).unwrap());
    let response = send(&d, HttpEvent::new("GET", "/github%7C3257273")).await;
    assert_eq!(response.status_code, 200);
    assert_eq!(body(&response)["path"], json!({"userId": "github|3257273"}));
}

#[tokio::test]
async fn test_optional_and_required_query_params() {
    let d = dispatcher(
        RouteTable::new()
            .get("/people?{gender?}{id:int}{height?:int}")
            .handle(echo)
            .unwrap()
            .get("/genders?{gender?}")
            .handle(echo)
            .unwrap(),
    );

    let response = send(&d, HttpEvent::new("GET", "/genders")).await;
    assert_eq!(response.status_code, 200);
    assert_eq!(body(&response)["query"], json!({}));

    let event = HttpEvent::new("GET", "/people")
        .with_query("id", "7")
        .with_query("height", "180");
    let response = send(&d, event).await;
    assert_eq!(response.status_code, 200);
    assert_eq!(body(&response)["query"], json!({"id": 7, "height": 180}));

    let event = HttpEvent::new("GET", "/people").with_query("height", "180");
    let response = send(&d, event).await;
    assert_eq!(response.status_code, 400);
    assert_eq!(body(&response)["errors"], json!(["missing query param `id`"]));
}

#[tokio::test]
async fn test_array_query_params() {
    let d = dispatcher(RouteTable::new().get("/items?{ids:int[]}").handle(echo).unwrap());

    let event = HttpEvent::new("GET", "/items")
        .with_query("ids", "123")
        .with_query("ids", "321")
        .with_query("ids", "111");
    let response = send(&d, event).await;
    assert_eq!(response.status_code, 200);
    assert_eq!(body(&response)["query"], json!({"ids": [123, 321, 111]}));

    let event = HttpEvent::new("GET", "/items")
        .with_query("ids", "aaa")
        .with_query("ids", "321");
    let response = send(&d, event).await;
    assert_eq!(response.status_code, 400);
}

#[tokio::test]
async fn test_path_and_query_errors_are_reported_together() {
    let d = dispatcher(
        RouteTable::new()
            .get("/users/{id:int}?{verbose:bool}")
            .handle(echo)
            .unwrap(),
    );
    let event = HttpEvent::new("GET", "/users/abc").with_query("verbose", "maybe");
    let response = send(&d, event).await;
    assert_eq!(response.status_code, 400);
    assert_eq!(
        body(&response)["errors"],
        json!([
            "path param `id`: invalid int `abc`",
            "query param `verbose`: invalid bool `maybe`"
        ])
    );
}

#[tokio::test]
async fn test_unmatched_method_is_not_found() {
    let d = dispatcher(RouteTable::new().get("/accounts").handle(echo).unwrap());
    let response = send(&d, HttpEvent::new("PUT", "/accounts")).await;
    assert_eq!(response.status_code, 404);
    assert_eq!(response.body, r#"{"message":"Not Found"}"#);

    let response = send(&d, HttpEvent::new("GET", "/accounts/extra")).await;
    assert_eq!(response.status_code, 404);
}

#[tokio::test]
async fn test_method_matching_ignores_case() {
    let d = dispatcher(RouteTable::new().get("/accounts").handle(echo).unwrap());
    let response = send(&d, HttpEvent::new("get", "/accounts")).await;
    assert_eq!(response.status_code, 200);
}

#[tokio::test]
async fn test_last_registered_route_wins() {
    let table = RouteTable::new()
        .get("/items/{id}")
        .handle(labelled("by-id"))
        .unwrap()
        .get("/items/active")
        .handle(labelled("active"))
        .unwrap();
    let response = send(&dispatcher(table), HttpEvent::new("GET", "/items/active")).await;
    assert_eq!(response.body, r#""active""#);

    let table = RouteTable::new()
        .get("/items/active")
        .handle(labelled("active"))
        .unwrap()
        .get("/items/{id}")
        .handle(labelled("by-id"))
        .unwrap();
    let response = send(&dispatcher(table), HttpEvent::new("GET", "/items/active")).await;
    assert_eq!(response.body, r#""by-id""#);
}

#[tokio::test]
async fn test_merged_table_prefers_receiver() {
    let primary = RouteTable::new().get("/status").handle(labelled("primary")).unwrap();
    let fallback = RouteTable::new()
        .get("/status")
        .handle(labelled("fallback"))
        .unwrap()
        .get("/version")
        .handle(labelled("version"))
        .unwrap();

    let d = dispatcher(primary.merge(&fallback));
    assert_eq!(d.table().len(), 3);
    assert_eq!(send(&d, HttpEvent::new("GET", "/status")).await.body, r#""primary""#);
    assert_eq!(send(&d, HttpEvent::new("GET", "/version")).await.body, r#""version""#);
}

#[tokio::test]
async fn test_registration_leaves_original_table_untouched() {
    let base = RouteTable::new().get("/a").handle(echo).unwrap();
    let extended = base.get("/b").handle(echo).unwrap();
    assert_eq!(base.len(), 1);
    assert_eq!(extended.len(), 2);

    let response = send(&dispatcher(base), HttpEvent::new("GET", "/b")).await;
    assert_eq!(response.status_code, 404);
}

#[tokio::test]
async fn test_dispatch_is_idempotent() {
    let d = dispatcher(
        RouteTable::new()
            .post("/orders/{id:int}?{tags:string[]}")
            .handle(echo)
            .unwrap(),
    );
    let event = HttpEvent::new("POST", "/orders/9")
        .with_query("tags", "a")
        .with_query("tags", "b")
        .with_body(r#"{"qty":2}"#);

    let first = send(&d, event.clone()).await;
    let second = send(&d, event).await;
    assert_eq!(first.status_code, 200);
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_body_schema_violation() {
    let d = dispatcher(
        RouteTable::new()
            .post("/payments")
            .body(json!({
                "type": "object",
                "properties": { "creditCardNumber": { "type": "string" } },
                "required": ["creditCardNumber"]
            }))
            .handle(echo)
            .unwrap(),
    );

    let event = HttpEvent::new("POST", "/payments").with_body(r#"{"creditCard":"1234"}"#);
    let response = send(&d, event).await;
    assert_eq!(response.status_code, 400);
    assert_eq!(body(&response)["message"], "Bad request");

    let event = HttpEvent::new("POST", "/payments").with_body(r#"{"creditCardNumber":"1234"}"#);
    let response = send(&d, event).await;
    assert_eq!(response.status_code, 200);
    assert_eq!(body(&response)["body"], json!({"creditCardNumber": "1234"}));
}

#[tokio::test]
async fn test_base64_body_is_decoded_before_validation() {
    let d = dispatcher(
        RouteTable::new()
            .post("/payments")
            .body(json!({"type": "object", "required": ["amount"]}))
            .handle(echo)
            .unwrap(),
    );
    let mut event =
        HttpEvent::new("POST", "/payments").with_body(BASE64.encode(r#"{"amount":5}"#));
    event.is_base64_encoded = true;

    let response = send(&d, event).await;
    assert_eq!(response.status_code, 200);
    assert_eq!(body(&response)["body"], json!({"amount": 5}));
}

#[tokio::test]
async fn test_binary_body_passes_through_without_schema() {
    let d = dispatcher(
        RouteTable::new()
            .post("/upload")
            .handle(|req| async move {
                let received = req.body().and_then(|b| b.as_str()).unwrap_or_default();
                Ok(HandlerResponse::empty(204).with_header("x-received", received))
            })
            .unwrap(),
    );
    let jpeg = BASE64.encode([0xff, 0xd8, 0xff, 0xe0]);
    let mut event = HttpEvent::new("POST", "/upload").with_body(jpeg.clone());
    event.is_base64_encoded = true;

    let response = send(&d, event).await;
    assert_eq!(response.status_code, 204);
    assert_eq!(response.header("x-received"), Some(jpeg.as_str()));
}

#[tokio::test]
async fn test_binary_body_fails_schema_route() {
    let d = dispatcher(
        RouteTable::new()
            .post("/upload")
            .body(json!({"type": "object"}))
            .handle(echo)
            .unwrap(),
    );
    let mut event = HttpEvent::new("POST", "/upload").with_body(BASE64.encode([0xff, 0xd8]));
    event.is_base64_encoded = true;

    let response = send(&d, event).await;
    assert_eq!(response.status_code, 400);
    assert_eq!(body(&response)["message"], "Bad request");
}

#[tokio::test]
async fn test_handler_error_becomes_server_error() {
    let d = dispatcher(
        RouteTable::new()
            .get("/fail")
            .handle(|_| async move { Err::<HandlerResponse, Error>("database unavailable".into()) })
            .unwrap(),
    );
    let response = send(&d, HttpEvent::new("GET", "/fail")).await;
    assert_eq!(response.status_code, 500);
    assert_eq!(response.body, "database unavailable");
    assert_eq!(response.header("content-type"), Some("text/plain"));
}

#[tokio::test]
async fn test_handler_panic_becomes_server_error() {
    let d = dispatcher(
        RouteTable::new()
            .get("/panic")
            .handle(|_| async move {
                if true {
                    panic!("boom");
                }
                Ok(HandlerResponse::empty(204))
            })
            .unwrap(),
    );
    let response = send(&d, HttpEvent::new("GET", "/panic")).await;
    assert_eq!(response.status_code, 500);
    assert_eq!(response.body, "boom");
}

#[tokio::test]
async fn test_no_cors_headers_without_config() {
    let d = dispatcher(RouteTable::new().get("/a").handle(echo).unwrap());
    let event = HttpEvent::new("GET", "/a").with_header("Origin", "http://localhost:8080");
    let response = send(&d, event).await;
    assert!(response
        .headers
        .keys()
        .all(|name| !name.to_lowercase().starts_with("access-control-")));
}

#[tokio::test]
async fn test_cors_origin_allow_list() {
    let cors = CorsConfig::builder()
        .allow_headers(AllowList::list(["content-type", "user-agent"]))
        .allow_methods(AllowList::list(["PUT", "POST", "GET"]))
        .allow_origin(OriginPolicy::allow_list(["http://localhost:8080"]))
        .build();
    let d = dispatcher(RouteTable::new().get("/a").handle(echo).unwrap())
        .with_config(RouterConfig::builder().cors(cors).build());

    let allowed = HttpEvent::new("GET", "/a").with_header("origin", "http://localhost:8080");
    let response = send(&d, allowed).await;
    assert_eq!(
        response.header("access-control-allow-origin"),
        Some("http://localhost:8080")
    );
    assert_eq!(
        response.header("access-control-allow-methods"),
        Some("PUT, POST, GET")
    );

    let rejected = HttpEvent::new("GET", "/a").with_header("origin", "http://evil.example");
    let response = send(&d, rejected).await;
    assert_eq!(response.header("access-control-allow-origin"), Some("null"));

    // Error envelopes carry the same headers.
    let missing = HttpEvent::new("GET", "/missing").with_header("origin", "http://localhost:8080");
    let response = send(&d, missing).await;
    assert_eq!(response.status_code, 404);
    assert_eq!(
        response.header("access-control-allow-origin"),
        Some("http://localhost:8080")
    );
}

#[tokio::test]
async fn test_header_merge_precedence() {
    let config = RouterConfig::builder()
        .cors(CorsConfig::permissive())
        .default_headers(
            [
                ("Content-Type".to_string(), "application/hal+json".to_string()),
                ("Access-Control-Allow-Origin".to_string(), "https://app.example".to_string()),
                ("Cache-Control".to_string(), "no-store".to_string()),
            ]
            .into(),
        )
        .build();
    let d = dispatcher(
        RouteTable::new()
            .get("/a")
            .handle(|_| async move {
                Ok(HandlerResponse::ok(json!({})).with_header("cache-control", "max-age=60"))
            })
            .unwrap()
            .get("/b")
            .handle(echo)
            .unwrap(),
    )
    .with_config(config);

    let response = send(&d, HttpEvent::new("GET", "/a")).await;
    assert_eq!(response.header("content-type"), Some("application/hal+json"));
    assert_eq!(
        response.header("access-control-allow-origin"),
        Some("https://app.example")
    );
    assert_eq!(response.header("cache-control"), Some("max-age=60"));
    assert_eq!(
        response
            .headers
            .keys()
            .filter(|k| k.eq_ignore_ascii_case("cache-control"))
            .count(),
        1
    );

    let response = send(&d, HttpEvent::new("GET", "/b")).await;
    assert_eq!(response.header("cache-control"), Some("no-store"));
}

#[derive(Clone)]
struct UserId(String);

#[tokio::test]
async fn test_middleware_short_circuits_and_injects_context() {
    let auth = middleware::from_fn(|mut req: RouteRequest<()>, next: Next<()>| async move {
        match req.header("x-user-id").map(str::to_string) {
            Some(user) => {
                req.extensions_mut().insert(UserId(user));
                next.run(req).await
            }
            None => Ok(HandlerResponse::new(401, Some(json!({"message": "Unauthorized"})))),
        }
    });
    let d = dispatcher(
        RouteTable::new()
            .get("/me")
            .middleware(auth)
            .handle(|req| async move {
                let user = req.extension::<UserId>().map(|u| u.0.clone());
                Ok(HandlerResponse::ok(json!({ "user": user })))
            })
            .unwrap(),
    );

    let response = send(&d, HttpEvent::new("GET", "/me")).await;
    assert_eq!(response.status_code, 401);

    let response = send(&d, HttpEvent::new("GET", "/me").with_header("X-User-Id", "u-1")).await;
    assert_eq!(response.status_code, 200);
    assert_eq!(body(&response), json!({"user": "u-1"}));
}

#[tokio::test]
async fn test_middleware_order_and_table_wide_wrapping() {
    fn tag(name: &'static str) -> impl lambda_typed_router_core::Middleware<()> {
        middleware::from_fn(move |req: RouteRequest<()>, next: Next<()>| async move {
            let mut response = next.run(req).await?;
            let trail = response
                .headers
                .get("x-trail")
                .map(|t| format!("{},{}", name, t))
                .unwrap_or_else(|| name.to_string());
            response.headers.insert("x-trail".to_string(), trail);
            Ok(response)
        })
    }

    let table = RouteTable::new()
        .get("/a")
        .middleware(tag("outer"))
        .middleware(tag("inner"))
        .handle(echo)
        .unwrap()
        .get("/b")
        .handle(echo)
        .unwrap()
        .with_middleware(tag("table"));
    let d = dispatcher(table);

    let response = send(&d, HttpEvent::new("GET", "/a")).await;
    assert_eq!(response.header("x-trail"), Some("table,outer,inner"));

    let response = send(&d, HttpEvent::new("GET", "/b")).await;
    assert_eq!(response.header("x-trail"), Some("table"));
}

#[tokio::test]
async fn test_shared_state_reaches_handlers() {
    struct Greeting(&'static str);

    let table = RouteTable::<Greeting>::new()
        .get("/hello/{name}")
        .handle(|req| async move {
            let name = req.path_params().get_str("name").unwrap_or_default();
            Ok(HandlerResponse::ok(json!(format!("{} {}", req.state().0, name))))
        })
        .unwrap();
    let d = Dispatcher::new(table, Greeting("hi"));
    let response = d
        .dispatch(HttpEvent::new("GET", "/hello/bob"), Context::default())
        .await;
    assert_eq!(response.body, r#""hi bob""#);
}

#[tokio::test]
async fn test_handle_api_gateway_v1_event() {
    let d = dispatcher(RouteTable::new().get("/users/{id:int}?{page?:int}").handle(echo).unwrap());

    let mut request = ApiGatewayProxyRequest::default();
    request.path = Some("/users/42".to_string());
    request.http_method = Method::GET;
    request.query_string_parameters = HashMap::from([("page".to_string(), "3".to_string())]).into();

    let response = d
        .handle_request(LambdaEvent::new(request, Context::default()))
        .await
        .unwrap();
    assert_eq!(response.status_code, 200);
    assert_eq!(body(&response)["path"], json!({"id": 42}));
    assert_eq!(body(&response)["query"], json!({"page": 3}));
}

#[tokio::test]
async fn test_handle_api_gateway_v2_event() {
    let d = dispatcher(RouteTable::new().get("/items?{ids:int[]}").handle(echo).unwrap());

    let mut request = ApiGatewayV2httpRequest::default();
    request.raw_path = Some("/items".to_string());
    request.raw_query_string = Some("ids=1&ids=2".to_string());
    request.request_context.http.method = Method::GET;

    let response = d
        .handle_request(LambdaEvent::new(request, Context::default()))
        .await
        .unwrap();
    assert_eq!(response.status_code, 200);
    assert_eq!(body(&response)["query"], json!({"ids": [1, 2]}));
}

#[tokio::test]
async fn test_handle_alb_event() {
    let d = dispatcher(
        RouteTable::new()
            .post("/orders")
            .body(json!({"type": "object", "required": ["sku"]}))
            .handle(echo)
            .unwrap(),
    );

    let mut request = AlbTargetGroupRequest::default();
    request.path = Some("/orders".to_string());
    request.http_method = Method::POST;
    request.body = Some(r#"{"sku":"A-1"}"#.to_string());

    let response = d
        .handle_request(LambdaEvent::new(request, Context::default()))
        .await
        .unwrap();
    assert_eq!(response.status_code, 200);
    assert_eq!(body(&response)["body"], json!({"sku": "A-1"}));

    let envelope = serde_json::to_value(&response).unwrap();
    assert_eq!(envelope["statusCode"], 200);
    assert_eq!(envelope["isBase64Encoded"], false);
}
