use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub username: String,
    pub password: String,
    pub firstname: String,
    pub lastname: String,
    pub birth_year: i64,
}

/// JSON Schema for [`Account`] request bodies.
pub fn account_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "username": { "type": "string" },
            "password": { "type": "string" },
            "firstname": { "type": "string" },
            "lastname": { "type": "string" },
            "birthYear": { "type": "integer" }
        },
        "required": ["username", "password", "firstname", "lastname", "birthYear"]
    })
}
