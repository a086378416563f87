//! Route pattern parsing.
//!
//! A pattern is a path template optionally followed by a query spec:
//!
//! ```text
//! /people/{name}/aged/{age:int}?{menOnly:bool?}&{tags:string[]}
//! ```
//!
//! Each path segment is either wholly literal or wholly one placeholder. The
//! query spec is a sequence of placeholders, optionally separated by `&`.
//! Placeholders read `{name}`, `{name:type}`, `{name?}`, `{name:type?}` or
//! `{name?:type}`; a trailing `?` marks a query parameter as optional.

use crate::error::RouteError;
use crate::params::ParamType;
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

/// A named, typed slot in a route pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placeholder {
    pub name: String,
    pub param_type: ParamType,
    pub optional: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Literal(String),
    Param(Placeholder),
}

impl Segment {
    pub fn is_placeholder(&self) -> bool {
        matches!(self, Segment::Param(_))
    }
}

/// A validated route pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlPattern {
    raw: String,
    segments: Vec<Segment>,
    query: Vec<Placeholder>,
}

impl UrlPattern {
    pub fn parse(raw: &str) -> Result<Self, RouteError> {
        let (path, query) = split_query(raw);

        if !path.starts_with('/') {
            return Err(RouteError::invalid(raw, "pattern must start with `/`"));
        }

        let pieces: Vec<&str> = path.split('/').collect();
        let is_root = path == "/";
        let mut segments = Vec::with_capacity(pieces.len());
        for (ix, piece) in pieces.iter().enumerate() {
            if piece.is_empty() && ix != 0 && !is_root {
                return Err(RouteError::invalid(raw, "empty path segment"));
            }
            segments.push(parse_segment(raw, piece)?);
        }

        let query = match query {
            Some(spec) => parse_query_spec(raw, spec)?,
            None => Vec::new(),
        };

        let mut seen = HashSet::new();
        let names = segments
            .iter()
            .filter_map(|s| match s {
                Segment::Param(p) => Some(p),
                Segment::Literal(_) => None,
            })
            .chain(query.iter())
            .map(|p| p.name.as_str());
        for name in names {
            if !seen.insert(name) {
                return Err(RouteError::DuplicateParam {
                    pattern: raw.to_string(),
                    name: name.to_string(),
                });
            }
        }

        Ok(Self {
            raw: raw.to_string(),
            segments,
            query,
        })
    }

    /// The pattern exactly as registered.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Path segments, including the empty leading segment before the first `/`.
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn path_params(&self) -> impl Iterator<Item = &Placeholder> {
        self.segments.iter().filter_map(|s| match s {
            Segment::Param(p) => Some(p),
            Segment::Literal(_) => None,
        })
    }

    /// Query placeholders in declaration order.
    pub fn query_params(&self) -> &[Placeholder] {
        &self.query
    }

    /// The path template with type annotations stripped, e.g. `/people/{name}`.
    pub fn template(&self) -> String {
        self.segments
            .iter()
            .map(|s| match s {
                Segment::Literal(text) => text.clone(),
                Segment::Param(p) => format!("{{{}}}", p.name),
            })
            .collect::<Vec<_>>()
            .join("/")
    }
}

impl FromStr for UrlPattern {
    type Err = RouteError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        UrlPattern::parse(s)
    }
}

impl fmt::Display for UrlPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

// Splits at the first `?` outside braces, so `{name:int?}` in the path stays intact.
fn split_query(raw: &str) -> (&str, Option<&str>) {
    let mut depth = 0usize;
    for (ix, ch) in raw.char_indices() {
        match ch {
            '{' => depth += 1,
            '}' => depth = depth.saturating_sub(1),
            '?' if depth == 0 => return (&raw[..ix], Some(&raw[ix + 1..])),
            _ => {}
        }
    }
    (raw, None)
}

fn parse_segment(pattern: &str, piece: &str) -> Result<Segment, RouteError> {
    if !piece.contains(['{', '}']) {
        return Ok(Segment::Literal(piece.to_string()));
    }

    let inner = piece
        .strip_prefix('{')
        .and_then(|rest| rest.strip_suffix('}'))
        .filter(|inner| !inner.contains(['{', '}']))
        .ok_or_else(|| {
            RouteError::invalid(
                pattern,
                format!("placeholder must span a whole segment, found `{}`", piece),
            )
        })?;

    parse_placeholder(pattern, inner).map(Segment::Param)
}

fn parse_query_spec(pattern: &str, spec: &str) -> Result<Vec<Placeholder>, RouteError> {
    let mut placeholders = Vec::new();
    let mut rest = spec;
    while let Some(ch) = rest.chars().next() {
        match ch {
            '&' => rest = &rest[1..],
            '{' => {
                let end = rest.find('}').ok_or_else(|| {
                    RouteError::invalid(pattern, "unterminated query placeholder")
                })?;
                placeholders.push(parse_placeholder(pattern, &rest[1..end])?);
                rest = &rest[end + 1..];
            }
            other => {
                return Err(RouteError::invalid(
                    pattern,
                    format!("unexpected `{}` in query spec", other),
                ))
            }
        }
    }
    Ok(placeholders)
}

fn parse_placeholder(pattern: &str, inner: &str) -> Result<Placeholder, RouteError> {
    let (name_part, type_part) = match inner.split_once(':') {
        Some((name, ty)) => (name, Some(ty)),
        None => (inner, None),
    };

    let mut optional = false;
    let name = match name_part.strip_suffix('?') {
        Some(name) => {
            optional = true;
            name
        }
        None => name_part,
    };

    if name.is_empty()
        || !name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        return Err(RouteError::invalid(
            pattern,
            format!("invalid placeholder name `{}`", name),
        ));
    }

    let param_type = match type_part {
        None => ParamType::default(),
        Some(tag) => {
            let tag = match tag.strip_suffix('?') {
                Some(tag) => {
                    optional = true;
                    tag
                }
                None => tag,
            };
            tag.parse::<ParamType>()
                .map_err(|e| RouteError::UnknownParamType {
                    pattern: pattern.to_string(),
                    tag: e.0,
                })?
        }
    };

    Ok(Placeholder {
        name: name.to_string(),
        param_type,
        optional,
    })
}
