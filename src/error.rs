use std::fmt::Display;

/// Extension trait for adding context to errors
pub trait ErrorContext<T> {
    /// Wrap the error as a configuration failure with the given context
    fn lab_config_err(self, msg: impl Display) -> std::result::Result<T, LabError>;

    /// Wrap the error as a transport failure with the given context
    fn lab_transport_err(self, msg: impl Display) -> std::result::Result<T, LabError>;
}

impl<T, E: Display> ErrorContext<T> for std::result::Result<T, E> {
    fn lab_config_err(self, msg: impl Display) -> std::result::Result<T, LabError> {
        self.map_err(|e| LabError::Configuration(format!("{msg}: {e}")))
    }

    fn lab_transport_err(self, msg: impl Display) -> std::result::Result<T, LabError> {
        self.map_err(|e| LabError::Transport(format!("{msg}: {e}")))
    }
}

/// Every failure the request engine can produce.
///
/// Errors are plain values: a failed pagination stream hands the same error
/// back on every subsequent call, so the type is `Clone`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LabError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("{}", http_status_message(.status, .body))]
    HttpStatus { status: u16, body: Option<String> },

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("No results: {0}")]
    EmptyResult(String),

    #[error("Output error: {0}")]
    Output(String),
}

pub type Result<T> = std::result::Result<T, LabError>;

impl LabError {
    /// Build an `HttpStatus` error, dropping blank bodies
    pub fn http_status(status: u16, body: impl Into<String>) -> Self {
        let body = body.into();
        let body = if body.trim().is_empty() {
            None
        } else {
            Some(body.trim().to_string())
        };
        LabError::HttpStatus { status, body }
    }

    pub fn is_empty_result(&self) -> bool {
        matches!(self, LabError::EmptyResult(_))
    }
}

fn http_status_message(status: &u16, body: &Option<String>) -> String {
    match body {
        Some(body) => format!("HTTP {status}: {body}"),
        None => format!("HTTP {status}"),
    }
}

impl From<url::ParseError> for LabError {
    fn from(err: url::ParseError) -> Self {
        LabError::Configuration(format!("Invalid URL: {err}"))
    }
}

impl From<std::io::Error> for LabError {
    fn from(err: std::io::Error) -> Self {
        LabError::Output(err.to_string())
    }
}

impl From<serde_json::Error> for LabError {
    fn from(err: serde_json::Error) -> Self {
        LabError::Decode(format!("Unexpected response shape: {err}"))
    }
}
