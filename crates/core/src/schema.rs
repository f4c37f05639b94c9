use serde_json::{json, Map, Value};

use crate::error::ValidationError;

/// Name of the single function the model is allowed to call.
pub const FUNCTION_NAME: &str = "addReceipt";
pub const FUNCTION_DESCRIPTION: &str = "Add a new receipt.";

/// Semantic type of a function parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamType {
    String,
    Number,
}

impl ParamType {
    /// OpenAPI type name as the Gemini function-declaration schema spells it.
    pub fn schema_name(self) -> &'static str {
        match self {
            ParamType::String => "STRING",
            ParamType::Number => "NUMBER",
        }
    }

    pub fn matches(self, value: &Value) -> bool {
        match self {
            ParamType::String => value.is_string(),
            ParamType::Number => value.is_number(),
        }
    }
}

impl std::fmt::Display for ParamType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParamType::String => write!(f, "string"),
            ParamType::Number => write!(f, "number"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Parameter {
    pub name: &'static str,
    pub ty: ParamType,
    pub description: &'static str,
    pub required: bool,
}

/// The receipt parameter table. Both the outgoing function declaration and
/// the validation of returned arguments are derived from it.
pub const RECEIPT_PARAMETERS: &[Parameter] = &[
    Parameter {
        name: "date",
        ty: ParamType::String,
        description: "Receipt date in ISO8601 format, eg. 2024-02-17",
        required: true,
    },
    Parameter {
        name: "amount",
        ty: ParamType::Number,
        description: "Total amount of the receipt.",
        required: true,
    },
    Parameter {
        name: "shop",
        ty: ParamType::String,
        description: "Shop where the purchase took place.",
        required: true,
    },
    Parameter {
        name: "description",
        ty: ParamType::String,
        description: "Brief description of the purchased articles.",
        required: true,
    },
];

/// Build the `addReceipt` function declaration in Gemini's wire format.
pub fn function_declaration() -> Value {
    let properties: Map<String, Value> = RECEIPT_PARAMETERS
        .iter()
        .map(|p| {
            (
                p.name.to_string(),
                json!({ "type": p.ty.schema_name(), "description": p.description }),
            )
        })
        .collect();

    let required: Vec<&str> = RECEIPT_PARAMETERS
        .iter()
        .filter(|p| p.required)
        .map(|p| p.name)
        .collect();

    json!({
        "name": FUNCTION_NAME,
        "description": FUNCTION_DESCRIPTION,
        "parameters": {
            "type": "OBJECT",
            "properties": properties,
            "required": required,
        },
    })
}

/// Check `args` against the parameter table, in table order.
pub fn validate_args(args: &Map<String, Value>) -> Result<(), ValidationError> {
    for param in RECEIPT_PARAMETERS.iter().filter(|p| p.required) {
        let value = args
            .get(param.name)
            .ok_or_else(|| ValidationError::MissingParameter {
                name: param.name,
                args: Value::Object(args.clone()).to_string(),
            })?;

        if !param.ty.matches(value) {
            return Err(ValidationError::WrongType {
                name: param.name,
                expected: param.ty,
                found: json_kind(value),
            });
        }
    }
    Ok(())
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
