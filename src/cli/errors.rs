use thiserror::Error;

/// Application-specific errors for the CLI
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Missing required argument: {arg}")]
    MissingArgument { arg: String },

    #[error("No input entries given")]
    NoInputs,

    #[error(transparent)]
    Catalog(#[from] cogcat::Error),
}
