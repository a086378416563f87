//! Typed parameter conversion.
//!
//! Placeholders in a route pattern carry an optional type tag (`{age:int}`,
//! `{ids:int[]}`). Each tag maps to one [`ParamType`] variant, and every
//! variant knows how to turn the raw string values captured from a path
//! segment or a query string into a [`ParamValue`].
//!
//! | tag        | arity | conversion                     |
//! |------------|-------|--------------------------------|
//! | `string`   | 1     | identity                       |
//! | `int`      | 1     | base-10 `i64`                  |
//! | `float`    | 1     | finite `f64`                   |
//! | `bool`     | 1     | `true` / `false` (any case)    |
//! | `string[]` | 0..n  | identity per element           |
//! | `int[]`    | 0..n  | elementwise, errors accumulate |
//! | `float[]`  | 0..n  | elementwise, errors accumulate |
//! | `bool[]`   | 0..n  | elementwise, errors accumulate |

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Conversion failure for a single parameter.
///
/// Array conversions report every failing element, so this carries a list
/// rather than a single message.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{}", .errors.join("; "))]
pub struct ParamError {
    pub errors: Vec<String>,
}

impl ParamError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            errors: vec![message.into()],
        }
    }

    fn concat(mut self, other: ParamError) -> Self {
        self.errors.extend(other.errors);
        self
    }
}

/// The closed set of placeholder types a route pattern may declare.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum ParamType {
    #[default]
    String,
    Int,
    Float,
    Bool,
    StringArray,
    IntArray,
    FloatArray,
    BoolArray,
}

impl ParamType {
    pub fn is_array(self) -> bool {
        matches!(
            self,
            ParamType::StringArray
                | ParamType::IntArray
                | ParamType::FloatArray
                | ParamType::BoolArray
        )
    }

    /// The scalar type of a single element. Scalars return themselves.
    pub fn element(self) -> ParamType {
        match self {
            ParamType::StringArray => ParamType::String,
            ParamType::IntArray => ParamType::Int,
            ParamType::FloatArray => ParamType::Float,
            ParamType::BoolArray => ParamType::Bool,
            scalar => scalar,
        }
    }

    pub fn tag(self) -> &'static str {
        match self {
            ParamType::String => "string",
            ParamType::Int => "int",
            ParamType::Float => "float",
            ParamType::Bool => "bool",
            ParamType::StringArray => "string[]",
            ParamType::IntArray => "int[]",
            ParamType::FloatArray => "float[]",
            ParamType::BoolArray => "bool[]",
        }
    }

    /// Converts the raw values captured for one parameter.
    ///
    /// Scalar types require exactly one raw value. Array types accept any
    /// number of values and fail as a whole if any element fails, reporting
    /// every failing element.
    pub fn parse<S: AsRef<str>>(self, raw: &[S]) -> Result<ParamValue, ParamError> {
        if self.is_array() {
            let element = self.element();
            let mut values = Vec::with_capacity(raw.len());
            let mut failure: Option<ParamError> = None;
            for item in raw {
                match element.parse_scalar(item.as_ref()) {
                    Ok(value) => values.push(value),
                    Err(err) => {
                        failure = Some(match failure {
                            Some(prev) => prev.concat(err),
                            None => err,
                        })
                    }
                }
            }
            return match failure {
                Some(err) => Err(err),
                None => Ok(ParamValue::Array(values)),
            };
        }

        match raw {
            [single] => self.parse_scalar(single.as_ref()),
            _ => Err(ParamError::new(format!(
                "expected a single {} value, got {}",
                self.tag(),
                raw.len()
            ))),
        }
    }

    fn parse_scalar(self, raw: &str) -> Result<ParamValue, ParamError> {
        match self {
            ParamType::String => Ok(ParamValue::String(raw.to_string())),
            ParamType::Int => raw
                .parse::<i64>()
                .map(ParamValue::Int)
                .map_err(|_| ParamError::new(format!("invalid int `{}`", raw))),
            ParamType::Float => match raw.parse::<f64>() {
                Ok(value) if value.is_finite() => Ok(ParamValue::Float(value)),
                _ => Err(ParamError::new(format!("invalid float `{}`", raw))),
            },
            ParamType::Bool => {
                if raw.eq_ignore_ascii_case("true") {
                    Ok(ParamValue::Bool(true))
                } else if raw.eq_ignore_ascii_case("false") {
                    Ok(ParamValue::Bool(false))
                } else {
                    Err(ParamError::new(format!("invalid bool `{}`", raw)))
                }
            }
            array => array.element().parse_scalar(raw),
        }
    }
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Returned when a pattern names a type tag outside the supported set.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown parameter type `{0}`")]
pub struct UnknownParamType(pub String);

impl FromStr for ParamType {
    type Err = UnknownParamType;

    fn from_str(tag: &str) -> Result<Self, Self::Err> {
        match tag {
            "string" => Ok(ParamType::String),
            "int" => Ok(ParamType::Int),
            "float" => Ok(ParamType::Float),
            "bool" => Ok(ParamType::Bool),
            "string[]" => Ok(ParamType::StringArray),
            "int[]" => Ok(ParamType::IntArray),
            "float[]" => Ok(ParamType::FloatArray),
            "bool[]" => Ok(ParamType::BoolArray),
            other => Err(UnknownParamType(other.to_string())),
        }
    }
}

/// A converted parameter value. Serializes to the matching JSON primitive.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ParamValue {
    String(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    Array(Vec<ParamValue>),
}

impl ParamValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ParamValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            ParamValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Integers widen to floats.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ParamValue::Float(f) => Some(*f),
            ParamValue::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ParamValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[ParamValue]> {
        match self {
            ParamValue::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn to_json(&self) -> JsonValue {
        serde_json::to_value(self).unwrap_or(JsonValue::Null)
    }
}

/// Parameters parsed for one request, keyed by placeholder name.
///
/// Built fresh for every request. Serializes as a JSON object, which makes it
/// convenient to echo back or to deserialize into a typed struct.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Params(BTreeMap<String, ParamValue>);

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn insert(&mut self, name: impl Into<String>, value: ParamValue) {
        self.0.insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.0.get(name)
    }

    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(ParamValue::as_str)
    }

    pub fn get_i64(&self, name: &str) -> Option<i64> {
        self.get(name).and_then(ParamValue::as_i64)
    }

    pub fn get_f64(&self, name: &str) -> Option<f64> {
        self.get(name).and_then(ParamValue::as_f64)
    }

    pub fn get_bool(&self, name: &str) -> Option<bool> {
        self.get(name).and_then(ParamValue::as_bool)
    }

    pub fn get_array(&self, name: &str) -> Option<&[ParamValue]> {
        self.get(name).and_then(ParamValue::as_array)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn to_json(&self) -> JsonValue {
        serde_json::to_value(self).unwrap_or(JsonValue::Null)
    }

    /// Deserializes the parameters into a typed struct.
    ///
    /// ```rust
    /// # use lambda_typed_router_core::Params;
    /// #[derive(serde::Deserialize)]
    /// struct Filter {
    ///     gender: Option<String>,
    /// }
    ///
    /// let filter: Filter = Params::new().deserialize().unwrap();
    /// assert!(filter.gender.is_none());
    /// ```
    pub fn deserialize<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_value(self.to_json())
    }
}

impl FromIterator<(String, ParamValue)> for Params {
    fn from_iter<I: IntoIterator<Item = (String, ParamValue)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_scalar_conversions() {
        assert_eq!(
            ParamType::String.parse(&["john"]),
            Ok(ParamValue::String("john".to_string()))
        );
        assert_eq!(ParamType::Int.parse(&["30"]), Ok(ParamValue::Int(30)));
        assert_eq!(ParamType::Float.parse(&["2.5"]), Ok(ParamValue::Float(2.5)));
        assert_eq!(ParamType::Bool.parse(&["TRUE"]), Ok(ParamValue::Bool(true)));
        assert_eq!(ParamType::Bool.parse(&["false"]), Ok(ParamValue::Bool(false)));
    }

    #[test]
    fn test_scalar_failures() {
        assert!(ParamType::Int.parse(&["afd"]).is_err());
        assert!(ParamType::Int.parse(&["99999999999999999999"]).is_err());
        assert!(ParamType::Float.parse(&["abc"]).is_err());
        assert!(ParamType::Float.parse(&["NaN"]).is_err());
        assert!(ParamType::Bool.parse(&["yes"]).is_err());
    }

    #[test]
    fn test_scalar_arity() {
        let empty: [&str; 0] = [];
        assert!(ParamType::String.parse(&empty).is_err());
        assert!(ParamType::Int.parse(&["1", "2"]).is_err());
    }

    #[test]
    fn test_array_conversion() {
        let value = ParamType::IntArray.parse(&["123", "321", "111"]).unwrap();
        assert_eq!(value.to_json(), json!([123, 321, 111]));

        let empty: [&str; 0] = [];
        assert_eq!(
            ParamType::StringArray.parse(&empty),
            Ok(ParamValue::Array(vec![]))
        );
    }

    #[test]
    fn test_array_accumulates_every_failure() {
        let err = ParamType::IntArray.parse(&["aaa", "321", "bbb"]).unwrap_err();
        assert_eq!(err.errors, vec!["invalid int `aaa`", "invalid int `bbb`"]);
    }

    #[test]
    fn test_tags_round_trip_through_from_str() {
        for ty in [
            ParamType::String,
            ParamType::Int,
            ParamType::Float,
            ParamType::Bool,
            ParamType::StringArray,
            ParamType::IntArray,
            ParamType::FloatArray,
            ParamType::BoolArray,
        ] {
            assert_eq!(ty.tag().parse::<ParamType>(), Ok(ty));
        }
        assert_eq!(
            "uuid".parse::<ParamType>(),
            Err(UnknownParamType("uuid".to_string()))
        );
    }

    #[test]
    fn test_params_deserialize() {
        #[derive(serde::Deserialize, Debug, PartialEq)]
        struct Person {
            name: String,
            age: i64,
        }

        let params: Params = [
            ("name".to_string(), ParamValue::String("john".to_string())),
            ("age".to_string(), ParamValue::Int(30)),
        ]
        .into_iter()
        .collect();

        assert_eq!(params.to_json(), json!({"name": "john", "age": 30}));
        assert_eq!(
            params.deserialize::<Person>().unwrap(),
            Person {
                name: "john".to_string(),
                age: 30
            }
        );
    }
}
