use thiserror::Error;

/// Application-level error carrying the process exit code.
///
/// Exit codes:
/// - `2`: input, configuration or I/O problems
/// - `3`: not enough data to run the requested computation
/// - `4`: computation failure (projection or numerical)
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

/// A coordinate field that does not match its expected textual format.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    #[error("not a latitude/longitude in 'Dd Mm S.Ss H' format: '{0}'")]
    Angle(String),

    #[error("not a local X/Z coordinate: '{0}'")]
    Offset(String),

    #[error("{kind} {value} is outside [-{limit}, {limit}]")]
    OutOfRange {
        kind: &'static str,
        value: f64,
        limit: f64,
    },
}

/// Why a forward projection could not produce a result.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProjectionError {
    #[error("invalid projection parameters: {0}")]
    InvalidParameters(String),

    #[error("point ({latitude}, {longitude}) cannot be projected with these parameters")]
    Unprojectable { latitude: f64, longitude: f64 },

    #[error("malformed projector output: {0}")]
    MalformedOutput(String),

    #[error("projector tool failed: {0}")]
    Tool(String),
}

impl ProjectionError {
    /// Recoverable failures are priced as infinite cost during the search.
    ///
    /// A `Tool` failure means the oracle itself is unusable, so every
    /// evaluation would fail the same way.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, ProjectionError::Tool(_))
    }
}

impl From<ProjectionError> for AppError {
    fn from(err: ProjectionError) -> Self {
        AppError::new(4, format!("Projection failed: {err}"))
    }
}
