use serde_json::{Map, Value};

use crate::error::ValidationError;

/// A structured invocation returned by the model.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionCall {
    pub name: String,
    pub args: Map<String, Value>,
}

/// One content part of a candidate.
#[derive(Debug, Clone, PartialEq)]
pub enum Part {
    Text(String),
    FunctionCall(FunctionCall),
    /// Any other part kind the model may emit (inline data, code, ...).
    Other(String),
}

impl Part {
    pub fn kind(&self) -> &str {
        match self {
            Part::Text(_) => "Text",
            Part::FunctionCall(_) => "FunctionCall",
            Part::Other(kind) => kind,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Candidate {
    pub parts: Vec<Part>,
}

/// Provider-neutral view of a generate-content response.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GenerateResponse {
    pub candidates: Vec<Candidate>,
}

impl GenerateResponse {
    pub fn function_call(name: impl Into<String>, args: Map<String, Value>) -> Self {
        Self::single(Part::FunctionCall(FunctionCall { name: name.into(), args }))
    }

    pub fn text(text: impl Into<String>) -> Self {
        Self::single(Part::Text(text.into()))
    }

    fn single(part: Part) -> Self {
        Self { candidates: vec![Candidate { parts: vec![part] }] }
    }

    /// The one and only part of the one and only candidate.
    pub fn sole_part(&self) -> Result<&Part, ValidationError> {
        let [candidate] = self.candidates.as_slice() else {
            return Err(ValidationError::CandidateCount(self.candidates.len()));
        };
        let [part] = candidate.parts.as_slice() else {
            return Err(ValidationError::PartCount(candidate.parts.len()));
        };
        Ok(part)
    }

    /// Shape check for the function-calling variant: exactly one candidate
    /// with exactly one part, which must invoke `expected`.
    pub fn expect_call(&self, expected: &'static str) -> Result<&FunctionCall, ValidationError> {
        match self.sole_part()? {
            Part::FunctionCall(call) if call.name == expected => Ok(call),
            Part::FunctionCall(call) => Err(ValidationError::WrongFunction {
                expected,
                found: call.name.clone(),
            }),
            other => Err(ValidationError::PartKind {
                expected: "FunctionCall",
                found: other.kind().to_string(),
            }),
        }
    }

    /// Shape check for the textual variant.
    pub fn expect_text(&self) -> Result<&str, ValidationError> {
        match self.sole_part()? {
            Part::Text(text) => Ok(text),
            other => Err(ValidationError::PartKind {
                expected: "Text",
                found: other.kind().to_string(),
            }),
        }
    }
}
