//! Application-level error carrying a process exit code.
//!
//! Exit codes:
//! - `2`: input/configuration problems (missing file, bad flags, unreadable sheet)
//! - `3`: the source loaded but produced no usable rows
//! - `4`: terminal or internal failures

use crate::io::ingest::LoadError;

#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}

impl From<LoadError> for AppError {
    fn from(err: LoadError) -> Self {
        AppError::new(2, format!("Failed to load procurement data: {err}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_errors_are_input_errors() {
        let err: AppError = LoadError::MissingHeaderRow { header_row: 2, rows: 1 }.into();
        assert_eq!(err.exit_code(), 2);
        assert!(err.message().starts_with("Failed to load procurement data"));
    }
}
