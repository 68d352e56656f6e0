use thiserror::Error;

pub type Result<T> = std::result::Result<T, CompileError>;

#[derive(Debug, Error)]
pub enum CompileError {
    #[error("could not process the input text")]
    EmptyInput,
    #[error("could not identify the table")]
    NoEntity,
    #[error("internal fault: {0}")]
    InternalFault(String),
    #[error("config error: {0}")]
    Config(String),
    #[error("catalog error: {0}")]
    Catalog(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("yaml parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Coarse classification used by callers that map errors onto responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompileErrorKind {
    EmptyInput,
    NoEntity,
    InternalFault,
    Config,
    Catalog,
}

impl CompileError {
    pub fn kind(&self) -> CompileErrorKind {
        match self {
            CompileError::EmptyInput => CompileErrorKind::EmptyInput,
            CompileError::NoEntity => CompileErrorKind::NoEntity,
            CompileError::InternalFault(_) => CompileErrorKind::InternalFault,
            CompileError::Config(_) => CompileErrorKind::Config,
            CompileError::Catalog(_) | CompileError::Io(_) | CompileError::Yaml(_) => {
                CompileErrorKind::Catalog
            }
        }
    }
}
