//! Result of a single remote call

use crate::error::FetchError;
use crate::value::Row;
use serde_json::Value;

/// Outcome of one round trip to the survey endpoint.
///
/// A call never fails with an error; every path ends in one of these
/// variants and callers match on it before trusting the shape.
#[derive(Debug, Clone, PartialEq)]
pub enum CallOutcome {
    /// Reachable server, valid JSON body (any shape)
    Ok(Value),
    /// Reachable server, body was not valid JSON
    ParseFailure { status: u16, text: String },
    /// No response reached the client
    TransportFailure { message: String },
}

impl CallOutcome {
    pub fn is_ok(&self) -> bool {
        matches!(self, CallOutcome::Ok(_))
    }

    pub fn value(&self) -> Option<&Value> {
        match self {
            CallOutcome::Ok(value) => Some(value),
            _ => None,
        }
    }

    /// Elements of a JSON array response; `None` for any other outcome.
    pub fn as_array(&self) -> Option<&Vec<Value>> {
        self.value().and_then(Value::as_array)
    }

    /// Message of an application-level failure (`{success: false, message}`).
    pub fn app_failure(&self) -> Option<String> {
        let object = self.value()?.as_object()?;
        match object.get("success") {
            Some(Value::Bool(false)) => Some(
                object
                    .get("message")
                    .and_then(Value::as_str)
                    .unwrap_or("Request failed")
                    .to_string(),
            ),
            _ => None,
        }
    }

    /// Strict view: the parsed value, or the failure as an error.
    ///
    /// `{success: false}` bodies become [`FetchError::Application`].
    pub fn into_result(self) -> Result<Value, FetchError> {
        if let Some(message) = self.app_failure() {
            return Err(FetchError::Application { message });
        }
        match self {
            CallOutcome::Ok(value) => Ok(value),
            CallOutcome::ParseFailure { status, text } => Err(FetchError::Parse { status, text }),
            CallOutcome::TransportFailure { message } => Err(FetchError::Transport { message }),
        }
    }

    /// Rows of an array response; a non-array JSON value is an error.
    pub fn into_rows(self) -> Result<Vec<Row>, FetchError> {
        match self.into_result()? {
            Value::Array(items) => Ok(Row::from_array(items)),
            _ => Err(FetchError::UnexpectedShape { expected: "array" }),
        }
    }

    /// Rows of an array response, empty for anything else.
    pub fn rows_or_empty(self) -> Vec<Row> {
        match self {
            CallOutcome::Ok(Value::Array(items)) => Row::from_array(items),
            _ => Vec::new(),
        }
    }
}
