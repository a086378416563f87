use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;

/// What a route handler returns: a status code, an optional JSON body and
/// handler-specific headers. The dispatcher serializes the body and merges
/// the headers with the cross-cutting ones.
#[derive(Debug, Clone, PartialEq)]
pub struct HandlerResponse {
    pub status_code: u16,
    pub body: Option<JsonValue>,
    pub headers: BTreeMap<String, String>,
}

impl HandlerResponse {
    pub fn new(status_code: u16, body: Option<JsonValue>) -> Self {
        Self {
            status_code,
            body,
            headers: BTreeMap::new(),
        }
    }

    /// A 200 response with a JSON body.
    pub fn ok(body: JsonValue) -> Self {
        Self::new(200, Some(body))
    }

    /// A response without a body.
    pub fn empty(status_code: u16) -> Self {
        Self::new(status_code, None)
    }

    /// Serializes any value as the response body.
    pub fn json<T: Serialize>(status_code: u16, body: &T) -> Result<Self, serde_json::Error> {
        Ok(Self::new(status_code, Some(serde_json::to_value(body)?)))
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        merge_headers(&mut self.headers, [(name.into(), value.into())]);
        self
    }
}

/// The normalized response returned to the Lambda caller.
///
/// Serializes to the proxy-integration shape accepted by API Gateway (REST and
/// HTTP APIs) and ALB.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseEnvelope {
    pub status_code: u16,
    pub body: String,
    pub headers: BTreeMap<String, String>,
    #[serde(default)]
    pub is_base64_encoded: bool,
}

impl ResponseEnvelope {
    pub fn new(status_code: u16, body: impl Into<String>) -> Self {
        Self {
            status_code,
            body: body.into(),
            headers: BTreeMap::new(),
            is_base64_encoded: false,
        }
    }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// The body decoded as JSON, if it is JSON.
    pub fn json_body(&self) -> Option<JsonValue> {
        serde_json::from_str(&self.body).ok()
    }
}

/// Inserts `source` into `target`, replacing existing entries whose names
/// differ only in case. Later entries win.
pub fn merge_headers<I, K, V>(target: &mut BTreeMap<String, String>, source: I)
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<String>,
{
    for (name, value) in source {
        let name = name.into();
        target.retain(|existing, _| !existing.eq_ignore_ascii_case(&name));
        target.insert(name, value.into());
    }
}
