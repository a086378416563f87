//! Segment-wise path matching.
//!
//! The incoming path is split on `/` *before* percent-decoding, so an encoded
//! `%2F` inside a segment never introduces a new segment. Decoding is applied
//! per segment, only to compare literal text and to capture placeholder values.

use crate::params::Params;
use crate::pattern::{Segment, UrlPattern};
use std::borrow::Cow;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PathMatchError {
    /// Segment count or literal text differs; the pattern does not apply.
    #[error("path does not match the route shape")]
    ShapeMismatch,

    /// The shape matched but one or more placeholder values failed conversion.
    #[error("invalid path parameters: {}", .0.join("; "))]
    InvalidParams(Vec<String>),
}

/// Splits a raw request path into segments, dropping any query suffix.
pub fn split_path(path: &str) -> Vec<&str> {
    let path = path.split_once('?').map_or(path, |(p, _)| p);
    path.split('/').collect()
}

fn decode(segment: &str) -> Option<Cow<'_, str>> {
    urlencoding::decode(segment).ok()
}

/// Structural compatibility: equal segment count, literal segments equal after
/// decoding, placeholder segments non-empty. No value conversion happens here.
pub fn is_structural_match(pattern: &UrlPattern, incoming: &[&str]) -> bool {
    let segments = pattern.segments();
    segments.len() == incoming.len()
        && segments
            .iter()
            .zip(incoming)
            .all(|(segment, raw)| match segment {
                Segment::Literal(text) => match decode(raw) {
                    Some(decoded) => decoded == text.as_str(),
                    None => raw == text,
                },
                Segment::Param(_) => !raw.is_empty(),
            })
}

/// Matches `incoming_path` against `pattern` and converts every placeholder.
///
/// Conversion failures are accumulated across all placeholders rather than
/// stopping at the first one.
pub fn match_path(pattern: &UrlPattern, incoming_path: &str) -> Result<Params, PathMatchError> {
    let incoming = split_path(incoming_path);
    if !is_structural_match(pattern, &incoming) {
        return Err(PathMatchError::ShapeMismatch);
    }

    let mut params = Params::new();
    let mut errors = Vec::new();
    for (segment, raw) in pattern.segments().iter().zip(&incoming) {
        let Segment::Param(placeholder) = segment else {
            continue;
        };
        let Some(value) = decode(raw) else {
            errors.push(format!(
                "path param `{}`: invalid percent-encoding in `{}`",
                placeholder.name, raw
            ));
            continue;
        };
        match placeholder.param_type.parse(&[&*value]) {
            Ok(parsed) => params.insert(placeholder.name.clone(), parsed),
            Err(err) => errors.extend(
                err.errors
                    .into_iter()
                    .map(|e| format!("path param `{}`: {}", placeholder.name, e)),
            ),
        }
    }

    if errors.is_empty() {
        Ok(params)
    } else {
        Err(PathMatchError::InvalidParams(errors))
    }
}
