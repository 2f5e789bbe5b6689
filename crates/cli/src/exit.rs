use crate::error::CliError;
use engine_runtime::error::ChangelogError;

/// Exit codes for the CLI application.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
    Success = 0,
    GeneralError = 1,
    InvalidConfig = 2,
    /// A load or loop stopped partway; the log holds the resume point.
    OperationFailed = 3,
}

impl ExitCode {
    pub fn as_i32(self) -> i32 {
        self as i32
    }
}

impl From<&CliError> for ExitCode {
    fn from(err: &CliError) -> Self {
        match err {
            CliError::Config(_)
            | CliError::FileType(_)
            | CliError::Settings(_)
            | CliError::Changelog(ChangelogError::Config(_))
            | CliError::Changelog(ChangelogError::Validation(_))
            | CliError::Changelog(ChangelogError::UnknownChange(_)) => ExitCode::InvalidConfig,
            CliError::Load(_) | CliError::Loop(_) | CliError::Changelog(ChangelogError::Task { .. }) => {
                ExitCode::OperationFailed
            }
            _ => ExitCode::GeneralError,
        }
    }
}
