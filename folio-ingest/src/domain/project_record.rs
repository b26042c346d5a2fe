//! Project record parser.
//!
//! Project files are flat JSON objects with exactly the documented keys:
//! `{ "Name": "", "Description": "", "Url": "", "Image": "" }`.

use serde_json::Value;
use std::collections::BTreeMap;

use super::error::ParseError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ProjectField {
    Name,
    Description,
    Url,
    Image,
}

impl ProjectField {
    pub const ALL: [ProjectField; 4] = [
        ProjectField::Name,
        ProjectField::Description,
        ProjectField::Url,
        ProjectField::Image,
    ];

    /// Keys are case-sensitive.
    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            "Name" => Some(ProjectField::Name),
            "Description" => Some(ProjectField::Description),
            "Url" => Some(ProjectField::Url),
            "Image" => Some(ProjectField::Image),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ProjectField::Name => "Name",
            ProjectField::Description => "Description",
            ProjectField::Url => "Url",
            ProjectField::Image => "Image",
        }
    }
}

pub type ProjectFields = BTreeMap<ProjectField, String>;

pub fn parse(raw: &str) -> Result<ProjectFields, ParseError> {
    let value: Value = serde_json::from_str(raw)
        .map_err(|e| ParseError::malformed(format!("invalid JSON: {e}")))?;

    let Value::Object(object) = value else {
        return Err(ParseError::malformed("expected a JSON object"));
    };

    let unexpected: Vec<String> = object
        .keys()
        .filter(|key| ProjectField::from_key(key).is_none())
        .cloned()
        .collect();
    if !unexpected.is_empty() {
        return Err(ParseError::UnexpectedField(unexpected));
    }

    let mut fields = ProjectFields::new();
    for (key, value) in object {
        let Some(field) = ProjectField::from_key(&key) else {
            continue;
        };
        match value {
            Value::String(text) => {
                fields.insert(field, text);
            }
            other => {
                return Err(ParseError::malformed(format!(
                    "field `{key}` must be a string, found {}",
                    json_type_name(&other)
                )))
            }
        }
    }

    Ok(fields)
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
