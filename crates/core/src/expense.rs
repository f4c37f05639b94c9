use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ValidationError;
use crate::response::FunctionCall;
use crate::schema;

/// A receipt as reported by the `addReceipt` function call.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Expense {
    /// Source file the receipt was read from. Supplied by the caller, never
    /// by the model.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    pub date: String,
    pub amount: f64,
    pub shop: String,
    pub description: String,
}

impl Expense {
    /// Validate `call.args` against the parameter table and map them.
    /// Fails without building anything if a single field is off.
    pub fn from_call(call: &FunctionCall) -> Result<Self, ValidationError> {
        let args = &call.args;
        schema::validate_args(args)?;

        Ok(Self {
            filename: None,
            date: string_arg(args, "date"),
            amount: args.get("amount").and_then(Value::as_f64).unwrap_or_default(),
            shop: string_arg(args, "shop"),
            description: string_arg(args, "description"),
        })
    }

    pub fn with_filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = Some(filename.into());
        self
    }
}

fn string_arg(args: &Map<String, Value>, name: &str) -> String {
    args.get(name)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn call(args: Value) -> FunctionCall {
        FunctionCall {
            name: schema::FUNCTION_NAME.into(),
            args: args.as_object().cloned().unwrap(),
        }
    }

    #[test]
    fn maps_validated_fields() {
        let expense = Expense::from_call(&call(json!({
            "date": "2023-07-01",
            "amount": 34.15,
            "shop": "Mary's Apotheke Südseite",
            "description": "Omeprazol, Artelac Lipids",
        })))
        .unwrap();

        assert_eq!(expense.date, "2023-07-01");
        assert_eq!(expense.amount, 34.15);
        assert_eq!(expense.shop, "Mary's Apotheke Südseite");
        assert!(expense.filename.is_none());
    }

    #[test]
    fn integer_amount_is_a_number() {
        let expense = Expense::from_call(&call(json!({
            "date": "2024-01-01",
            "amount": 7,
            "shop": "Kiosk",
            "description": "Newspaper",
        })))
        .unwrap();
        assert_eq!(expense.amount, 7.0);
    }

    #[test]
    fn partial_args_build_nothing() {
        let err = Expense::from_call(&call(json!({
            "date": "2024-01-01",
            "amount": 7,
            "shop": "Kiosk",
        })))
        .unwrap_err();
        assert!(matches!(err, ValidationError::MissingParameter { name: "description", .. }));
    }

    #[test]
    fn json_shape() {
        let expense = Expense {
            filename: Some("IMG_0001.jpg".into()),
            date: "2024-02-17".into(),
            amount: 9.99,
            shop: "Bakery".into(),
            description: "Bread".into(),
        };
        let v = serde_json::to_value(&expense).unwrap();
        assert_eq!(
            v,
            json!({
                "filename": "IMG_0001.jpg",
                "date": "2024-02-17",
                "amount": 9.99,
                "shop": "Bakery",
                "description": "Bread",
            })
        );
    }

    #[test]
    fn filename_omitted_when_unknown() {
        let expense = Expense {
            filename: None,
            date: "2024-02-17".into(),
            amount: 1.0,
            shop: "Bakery".into(),
            description: "Bread".into(),
        };
        let v = serde_json::to_value(&expense).unwrap();
        assert!(v.get("filename").is_none());
    }
}
