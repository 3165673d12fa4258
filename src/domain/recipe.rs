use serde::Serialize;
use serde_json::{Map, Value};

/// Structured recipe pulled out of a transcript.
///
/// Every field is optional upstream: absent or `null` keys become empty
/// strings and empty lists.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RecipeRecord {
    pub recipe_name: String,
    pub ingredients: Vec<String>,
    pub instructions: Vec<String>,
    pub estimated_time: String,
    pub cuisine_type: String,
}

impl RecipeRecord {
    pub const RECIPE_NAME: &'static str = "recipe_name";
    pub const INGREDIENTS: &'static str = "ingredients";
    pub const INSTRUCTIONS: &'static str = "instructions";
    pub const ESTIMATED_TIME: &'static str = "estimated_time";
    pub const CUISINE_TYPE: &'static str = "cuisine_type";

    /// Builds a record from a decoded JSON object.
    ///
    /// Numbers are accepted where text is expected, and a lone string is
    /// accepted where a list is expected. Anything else of the wrong type is
    /// rejected. Unknown keys are ignored.
    pub fn from_json_object(object: &Map<String, Value>) -> Result<Self, RecipeFieldError> {
        Ok(Self {
            recipe_name: text_field(object, Self::RECIPE_NAME)?,
            ingredients: list_field(object, Self::INGREDIENTS)?,
            instructions: list_field(object, Self::INSTRUCTIONS)?,
            estimated_time: text_field(object, Self::ESTIMATED_TIME)?,
            cuisine_type: text_field(object, Self::CUISINE_TYPE)?,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.recipe_name.is_empty() && self.ingredients.is_empty() && self.instructions.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("field `{field}` has unexpected type: expected {expected}, found {found}")]
pub struct RecipeFieldError {
    pub field: String,
    pub expected: &'static str,
    pub found: &'static str,
}

fn text_field(object: &Map<String, Value>, key: &str) -> Result<String, RecipeFieldError> {
    match object.get(key) {
        None | Some(Value::Null) => Ok(String::new()),
        Some(value) => scalar_text(value).ok_or_else(|| RecipeFieldError {
            field: key.to_string(),
            expected: "string",
            found: type_name(value),
        }),
    }
}

fn list_field(object: &Map<String, Value>, key: &str) -> Result<Vec<String>, RecipeFieldError> {
    match object.get(key) {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::String(s)) if s.trim().is_empty() => Ok(Vec::new()),
        Some(Value::String(s)) => Ok(vec![s.clone()]),
        Some(Value::Array(items)) => items
            .iter()
            .filter(|item| !item.is_null())
            .map(|item| {
                scalar_text(item).ok_or_else(|| RecipeFieldError {
                    field: key.to_string(),
                    expected: "array of strings",
                    found: type_name(item),
                })
            })
            .collect(),
        Some(other) => Err(RecipeFieldError {
            field: key.to_string(),
            expected: "array",
            found: type_name(other),
        }),
    }
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
