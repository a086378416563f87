//! Request and response logging.
//!
//! Logging is off by default. When enabled, each request produces a
//! `request received` event and each envelope a `response sent` event, both at
//! `info` level with structured fields.

use crate::event::HttpEvent;
use crate::response::ResponseEnvelope;
use bon::Builder;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, PartialEq, Eq, Builder)]
pub struct LogConfig {
    #[builder(default)]
    pub log_requests: bool,

    /// Include request bodies in the `request received` event.
    #[builder(default)]
    pub log_request_body: bool,

    /// Header names omitted from logged headers, compared case-insensitively.
    #[builder(default)]
    pub ignored_headers: Vec<String>,
}

impl LogConfig {
    /// The headers worth logging: everything except the ignored names.
    pub fn loggable_headers<'a, I>(&self, headers: I) -> BTreeMap<String, String>
    where
        I: IntoIterator<Item = (&'a String, &'a String)>,
    {
        headers
            .into_iter()
            .filter(|(name, _)| {
                !self
                    .ignored_headers
                    .iter()
                    .any(|ignored| ignored.eq_ignore_ascii_case(name))
            })
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect()
    }
}

pub(crate) fn log_request(config: &LogConfig, event: &HttpEvent) {
    if !config.log_requests {
        return;
    }
    let headers = config.loggable_headers(&event.headers);
    let body = if config.log_request_body {
        event.body.as_deref()
    } else {
        None
    };
    tracing::info!(
        method = %event.http_method,
        path = %event.path,
        query = ?event.query_string_parameters,
        multi_value_query = ?event.multi_value_query_string_parameters,
        headers = ?headers,
        body = ?body,
        "request received"
    );
}

pub(crate) fn log_response(config: &LogConfig, envelope: &ResponseEnvelope) {
    if !config.log_requests {
        return;
    }
    let headers = config.loggable_headers(&envelope.headers);
    tracing::info!(
        status_code = envelope.status_code,
        headers = ?headers,
        "response sent"
    );
}
