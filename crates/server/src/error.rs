//! Structured errors for the worker host.
//!
//! Engine failures already convert through `swkit_core::Error`; these cover
//! conditions that only exist at the host boundary.

use rmcp::model::{ErrorCode, ErrorData as McpError};

#[derive(Debug, thiserror::Error)]
pub enum HostError {
    /// No worker is controlling clients yet (install never succeeded).
    #[error("NO_CONTROLLER: {0}")]
    NoController(String),

    /// Tool output could not be encoded.
    #[error("ENCODE_FAILED: {0}")]
    EncodeFailed(String),
}

impl From<HostError> for McpError {
    fn from(err: HostError) -> Self {
        let code = match &err {
            HostError::NoController(_) => -32012,
            HostError::EncodeFailed(_) => -32603,
        };

        McpError { code: ErrorCode(code), message: err.to_string().into(), data: None }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_controller_code() {
        let err: McpError = HostError::NoController("install first".into()).into();
        assert_eq!(err.code.0, -32012);
        assert!(err.message.contains("NO_CONTROLLER"));
    }
}
