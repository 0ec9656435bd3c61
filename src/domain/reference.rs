use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// How a request points at a sportsbook or an account
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Reference {
    ById(i64),
    ByName(String),
}

impl Reference {
    /// Classify a loose string: all digits is an id, anything else a name.
    /// Empty strings and `"0"` mean "no reference".
    pub fn parse(input: &str) -> Option<Self> {
        let input = input.trim();
        if input.is_empty() {
            return None;
        }
        if input.bytes().all(|b| b.is_ascii_digit()) {
            return match input.parse::<i64>() {
                Ok(0) => None,
                Ok(id) => Some(Reference::ById(id)),
                // Too long for an id, so it can only be a name
                Err(_) => Some(Reference::ByName(input.to_string())),
            };
        }
        Some(Reference::ByName(input.to_string()))
    }

    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => n.as_i64().filter(|id| *id > 0).map(Reference::ById),
            Value::String(s) => Self::parse(s),
            _ => None,
        }
    }

    /// Text used for name/identifier lookups
    pub fn lookup_text(&self) -> String {
        match self {
            Reference::ById(id) => id.to_string(),
            Reference::ByName(name) => name.clone(),
        }
    }
}

/// `deserialize_with` helper for optional reference fields
pub fn deserialize_optional<'de, D>(deserializer: D) -> Result<Option<Reference>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(Reference::from_json))
}
