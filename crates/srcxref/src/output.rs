//! JSON output formatting

use serde::{Deserialize, Serialize};
use srcxref_core::IndexError;

const SCHEMA_VERSION: &str = "1";

/// JSON response envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonResponse<T> {
    /// Schema version for forward compatibility
    pub schema_version: String,
    /// Command that generated this response
    pub command: String,
    /// Status: "ok" or "error"
    pub status: String,
    /// Command-specific payload
    pub data: T,
    pub issues: Vec<JsonIssue>,
}

impl<T> JsonResponse<T> {
    /// Create a successful response
    pub fn ok(command: &str, data: T) -> Self {
        Self {
            schema_version: SCHEMA_VERSION.to_string(),
            command: command.to_string(),
            status: "ok".to_string(),
            data,
            issues: vec![],
        }
    }

    /// Create an error response
    pub fn error(command: &str, data: T, issues: Vec<JsonIssue>) -> Self {
        Self {
            schema_version: SCHEMA_VERSION.to_string(),
            command: command.to_string(),
            status: "error".to_string(),
            data,
            issues,
        }
    }
}

/// Issue object structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonIssue {
    pub code: String,
    pub severity: String,
    pub message: String,
}

impl From<&IndexError> for JsonIssue {
    fn from(err: &IndexError) -> Self {
        JsonIssue {
            code: err.code().to_string(),
            severity: "error".to_string(),
            message: err.to_string(),
        }
    }
}

/// Print a successful response as pretty JSON on stdout
pub fn print_ok<T: Serialize>(command: &str, data: T) -> Result<(), IndexError> {
    let response = JsonResponse::ok(command, data);
    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(())
}
