use std::error::Error;
use std::fmt::{Display, Formatter};

pub type RhorResult<T> = Result<T, RhorError>;

/// What went wrong, coarse enough to pick a process exit code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RhorErrorCategory {
    /// Spectrum, wall geometry, shell parameters or request file contents
    /// that cannot be analysed.
    InputValidationError,
    /// Reading a request, geometry or stopping table, or writing a record.
    IoSystemError,
    /// Valid input for which the fit, the wall correction or the rhoR
    /// table could not produce a result.
    ComputationError,
}

impl RhorErrorCategory {
    pub const fn exit_code(self) -> i32 {
        match self {
            Self::InputValidationError => 2,
            Self::IoSystemError => 3,
            Self::ComputationError => 4,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::InputValidationError => "InputValidationError",
            Self::IoSystemError => "IoSystemError",
            Self::ComputationError => "ComputationError",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RhorError {
    category: RhorErrorCategory,
    placeholder: &'static str,
    message: String,
}

impl RhorError {
    pub fn new(
        category: RhorErrorCategory,
        placeholder: &'static str,
        message: impl Into<String>,
    ) -> Self {
        Self {
            category,
            placeholder,
            message: message.into(),
        }
    }

    pub fn input_validation(placeholder: &'static str, message: impl Into<String>) -> Self {
        Self::new(
            RhorErrorCategory::InputValidationError,
            placeholder,
            message,
        )
    }

    pub fn io_system(placeholder: &'static str, message: impl Into<String>) -> Self {
        Self::new(RhorErrorCategory::IoSystemError, placeholder, message)
    }

    pub fn computation(placeholder: &'static str, message: impl Into<String>) -> Self {
        Self::new(RhorErrorCategory::ComputationError, placeholder, message)
    }

    pub const fn category(&self) -> RhorErrorCategory {
        self.category
    }

    pub const fn placeholder(&self) -> &'static str {
        self.placeholder
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub const fn exit_code(&self) -> i32 {
        self.category.exit_code()
    }

    /// Line printed to stderr before exiting with [`RhorError::exit_code`].
    pub fn diagnostic_line(&self) -> String {
        format!("ERROR: [{}] {}", self.placeholder, self.message)
    }
}

impl Display for RhorError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} [{}] {}",
            self.category.as_str(),
            self.placeholder,
            self.message
        )
    }
}

impl Error for RhorError {}
