use thiserror::Error;

#[derive(Error, Debug)]
pub enum XbrlValidationError {
    #[error("Calculation validation requires inferring decimals, but infer_decimals is disabled")]
    InferDecimalsRequired,

    #[error("Invalid model object {object}: {details}")]
    InvalidModel { object: String, details: String },

    #[error("Invalid validation options: {0}")]
    InvalidOptions(String),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, XbrlValidationError>;
