use thiserror::Error;

#[derive(Debug, Error)]
pub enum KartotekError {
    #[error("IO_FAILURE: {0}")]
    Io(String),
    #[error("CONFIG_MISSING: {0}")]
    ConfigMissing(String),
    #[error("DATA_CORRUPT: {0}")]
    Corrupt(String),
    #[error("ID_COLLISION: {0}")]
    IdCollision(String),
    #[error("INTERNAL: {0}")]
    Internal(String),
}

impl From<std::io::Error> for KartotekError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value.to_string())
    }
}

pub type KartotekResult<T> = Result<T, KartotekError>;
