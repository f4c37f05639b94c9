pub mod error;
pub mod expense;
pub mod legacy;
pub mod response;
pub mod schema;

pub use error::ValidationError;
pub use expense::Expense;
pub use legacy::{strip_code_fence, LegacyExpense};
pub use response::{Candidate, FunctionCall, GenerateResponse, Part};
pub use schema::{ParamType, Parameter, FUNCTION_NAME, RECEIPT_PARAMETERS};
