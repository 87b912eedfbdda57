use thiserror::Error;

#[derive(Error, Debug)]
pub enum RankingError {
    #[error("Chain RPC error: {0}")]
    Rpc(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Missing exposure for active validator {0}")]
    MissingExposure(String),

    #[error("Unexpected chain data: {0}")]
    Decode(String),
}

impl From<subxt::Error> for RankingError {
    fn from(err: subxt::Error) -> Self {
        RankingError::Rpc(err.to_string())
    }
}

impl From<subxt::error::DecodeError> for RankingError {
    fn from(err: subxt::error::DecodeError) -> Self {
        RankingError::Decode(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, RankingError>;
