//! Local development server.
//!
//! Serves a [`Dispatcher`] over plain HTTP/1.1 so routes can be exercised
//! with curl or a browser without deploying. Each request is buffered,
//! converted into an [`HttpEvent`] and dispatched with a default Lambda
//! context.

use crate::constants::{defaults, env_vars};
use crate::dispatcher::Dispatcher;
use crate::event::HttpEvent;
use crate::query::{MultiValueQueryMap, QueryMap};
use crate::response::ResponseEnvelope;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use std::convert::Infallible;
use std::env;
use std::io;
use std::net::SocketAddr;
use tokio::net::{TcpListener, ToSocketAddrs};

/// The port from `PORT`, or 8081.
pub fn local_port() -> u16 {
    env::var(env_vars::PORT)
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(defaults::LOCAL_PORT)
}

pub struct LocalServer<State> {
    listener: TcpListener,
    dispatcher: Dispatcher<State>,
}

impl<State> LocalServer<State>
where
    State: Send + Sync + 'static,
{
    pub async fn bind(addr: impl ToSocketAddrs, dispatcher: Dispatcher<State>) -> io::Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        Ok(Self {
            listener,
            dispatcher,
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accepts connections until the listener fails.
    pub async fn run(self) -> io::Result<()> {
        tracing::info!(address = %self.local_addr()?, "local server listening");
        loop {
            let (stream, peer) = self.listener.accept().await?;
            let dispatcher = self.dispatcher.clone();
            tokio::spawn(async move {
                let io = TokioIo::new(stream);
                let service = service_fn(move |req| {
                    let dispatcher = dispatcher.clone();
                    async move { Ok::<_, Infallible>(serve(&dispatcher, req).await) }
                });
                if let Err(err) = http1::Builder::new().serve_connection(io, service).await {
                    tracing::warn!(peer = %peer, error = %err, "connection error");
                }
            });
        }
    }
}

async fn serve<State>(
    dispatcher: &Dispatcher<State>,
    req: Request<Incoming>,
) -> Response<Full<Bytes>>
where
    State: Send + Sync + 'static,
{
    let event = match to_http_event(req).await {
        Ok(event) => event,
        Err(err) => {
            tracing::warn!(error = %err, "failed to read request body");
            return plain_response(StatusCode::BAD_REQUEST, err.to_string());
        }
    };
    let envelope = dispatcher.dispatch(event, Default::default()).await;
    to_response(envelope)
}

/// Splits a raw query string into single- and multi-valued maps. The single
/// map keeps the last value of repeated keys.
pub fn parse_query_string(query: &str) -> (QueryMap, MultiValueQueryMap) {
    let mut single = QueryMap::new();
    let mut multi = MultiValueQueryMap::new();
    for (name, value) in url::form_urlencoded::parse(query.as_bytes()) {
        single.insert(name.to_string(), value.to_string());
        multi.entry(name.into_owned()).or_default().push(value.into_owned());
    }
    (single, multi)
}

async fn to_http_event(req: Request<Incoming>) -> Result<HttpEvent, hyper::Error> {
    let (parts, body) = req.into_parts();
    let bytes = body.collect().await?.to_bytes();

    let (query_string_parameters, multi_value_query_string_parameters) = parts
        .uri
        .query()
        .map(parse_query_string)
        .unwrap_or_default();

    let headers = parts
        .headers
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|v| (name.as_str().to_string(), v.to_string()))
        })
        .collect();

    let (body, is_base64_encoded) = if bytes.is_empty() {
        (None, false)
    } else {
        match String::from_utf8(bytes.to_vec()) {
            Ok(text) => (Some(text), false),
            Err(_) => (Some(BASE64.encode(&bytes)), true),
        }
    };

    Ok(HttpEvent {
        path: parts.uri.path().to_string(),
        http_method: parts.method.to_string(),
        headers,
        body,
        is_base64_encoded,
        query_string_parameters,
        multi_value_query_string_parameters,
    })
}

fn plain_response(status: StatusCode, body: String) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(Bytes::from(body)));
    *response.status_mut() = status;
    response
}

fn to_response(envelope: ResponseEnvelope) -> Response<Full<Bytes>> {
    let status =
        StatusCode::from_u16(envelope.status_code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let mut builder = Response::builder().status(status);
    for (name, value) in &envelope.headers {
        builder = builder.header(name.as_str(), value.as_str());
    }
    builder
        .body(Full::new(Bytes::from(envelope.body.clone())))
        .unwrap_or_else(|err| {
            tracing::error!(error = %err, "invalid response header");
            plain_response(StatusCode::INTERNAL_SERVER_ERROR, envelope.body)
        })
}
