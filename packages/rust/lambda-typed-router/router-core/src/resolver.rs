//! Route resolution: picks the route for a request and parses its parameters.

use crate::event::HttpEvent;
use crate::params::Params;
use crate::path::{is_structural_match, match_path, split_path, PathMatchError};
use crate::query::parse_query;
use crate::route::{RouteDefinition, RouteTable};
use std::fmt;
use std::sync::Arc;

/// Outcome of matching a request against a route table.
pub enum MatchResult<State> {
    Matched {
        route: Arc<RouteDefinition<State>>,
        path_params: Params,
        query_params: Params,
    },
    NotFound,
    BadRequest(Vec<String>),
}

impl<State> fmt::Debug for MatchResult<State> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchResult::Matched {
                route,
                path_params,
                query_params,
            } => f
                .debug_struct("Matched")
                .field("route", route)
                .field("path_params", path_params)
                .field("query_params", query_params)
                .finish(),
            MatchResult::NotFound => f.write_str("NotFound"),
            MatchResult::BadRequest(errors) => f.debug_tuple("BadRequest").field(errors).finish(),
        }
    }
}

/// Every route accepting `method` whose pattern fits the shape of `path`,
/// in resolution order.
#[cfg(test)]
fn candidates<State>(
    table: &RouteTable<State>,
    method: &str,
    path: &str,
) -> Vec<Arc<RouteDefinition<State>>>
where
    State: Send + Sync + 'static,
{
    let incoming = split_path(path);
    table
        .iter_shared()
        .filter(|route| route.accepts_method(method))
        .filter(|route| is_structural_match(route.pattern(), &incoming))
        .collect()
}

/// The first candidate route. Overlapping patterns are not ranked by
/// specificity: the most recently registered one wins.
pub fn resolve<State>(
    table: &RouteTable<State>,
    method: &str,
    path: &str,
) -> Option<Arc<RouteDefinition<State>>>
where
    State: Send + Sync + 'static,
{
    let incoming = split_path(path);
    table
        .iter_shared()
        .find(|route| {
            route.accepts_method(method) && is_structural_match(route.pattern(), &incoming)
        })
}

/// Resolves the route for `event` and parses its path and query parameters.
///
/// Path and query errors are combined, so a request with a bad path value and
/// a missing query parameter reports both.
pub fn match_request<State>(table: &RouteTable<State>, event: &HttpEvent) -> MatchResult<State>
where
    State: Send + Sync + 'static,
{
    let Some(route) = resolve(table, &event.http_method, &event.path) else {
        return MatchResult::NotFound;
    };

    let path_result = match match_path(route.pattern(), &event.path) {
        Ok(params) => Ok(params),
        Err(PathMatchError::ShapeMismatch) => return MatchResult::NotFound,
        Err(PathMatchError::InvalidParams(errors)) => Err(errors),
    };
    let query_result = parse_query(
        route.pattern().query_params(),
        &event.query_string_parameters,
        &event.multi_value_query_string_parameters,
    );

    match (path_result, query_result) {
        (Ok(path_params), Ok(query_params)) => MatchResult::Matched {
            route,
            path_params,
            query_params,
        },
        (path_result, query_result) => {
            let mut errors = path_result.err().unwrap_or_default();
            errors.extend(query_result.err().unwrap_or_default());
            MatchResult::BadRequest(errors)
        }
    }
}
