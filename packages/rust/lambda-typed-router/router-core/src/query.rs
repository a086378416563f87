//! Query-string parameter extraction.
//!
//! Every placeholder in a route's query spec is looked up, checked for
//! presence and converted independently. Failures from all placeholders are
//! collected before returning, so a client sees every problem at once.

use crate::params::Params;
use crate::pattern::Placeholder;
use std::collections::HashMap;

/// Single-valued query parameters (`queryStringParameters`).
pub type QueryMap = HashMap<String, String>;

/// Multi-valued query parameters (`multiValueQueryStringParameters`).
pub type MultiValueQueryMap = HashMap<String, Vec<String>>;

/// Raw values for one placeholder.
///
/// Array types prefer the multi-valued source, scalars the single-valued one;
/// each falls back to the other. A scalar read from the multi-valued source
/// takes the last value, matching what API Gateway puts in the single map.
fn lookup<'a>(
    placeholder: &Placeholder,
    single: &'a QueryMap,
    multi: &'a MultiValueQueryMap,
) -> Option<Vec<&'a str>> {
    let from_single = || single.get(&placeholder.name).map(|v| vec![v.as_str()]);
    let from_multi = || {
        multi
            .get(&placeholder.name)
            .filter(|values| !values.is_empty())
    };

    if placeholder.param_type.is_array() {
        from_multi()
            .map(|values| values.iter().map(String::as_str).collect())
            .or_else(from_single)
    } else {
        from_single().or_else(|| {
            from_multi()
                .and_then(|values| values.last())
                .map(|v| vec![v.as_str()])
        })
    }
}

/// Parses the query parameters declared by `spec`.
///
/// Returns `Ok` only when no placeholder produced an error. Missing optional
/// parameters are simply omitted from the result.
pub fn parse_query(
    spec: &[Placeholder],
    single: &QueryMap,
    multi: &MultiValueQueryMap,
) -> Result<Params, Vec<String>> {
    let mut params = Params::new();
    let mut errors = Vec::new();

    for placeholder in spec {
        match lookup(placeholder, single, multi) {
            None if placeholder.optional => {}
            None => errors.push(format!("missing query param `{}`", placeholder.name)),
            Some(raw) => match placeholder.param_type.parse(&raw) {
                Ok(value) => params.insert(placeholder.name.clone(), value),
                Err(err) => errors.extend(
                    err.errors
                        .into_iter()
                        .map(|e| format!("query param `{}`: {}", placeholder.name, e)),
                ),
            },
        }
    }

    if errors.is_empty() {
        Ok(params)
    } else {
        Err(errors)
    }
}
