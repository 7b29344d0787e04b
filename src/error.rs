use std::process::ExitCode;

/// Errors that cause rewind to exit with a specific code.
#[derive(Debug, thiserror::Error)]
pub enum ExitError {
    #[error("config error: {0}")]
    Config(String),

    #[error("input error: {0}")]
    Input(String),
}

impl ExitError {
    pub fn exit_code(&self) -> ExitCode {
        match self {
            ExitError::Config(_) => ExitCode::from(2),
            ExitError::Input(_) => ExitCode::from(3),
        }
    }
}
