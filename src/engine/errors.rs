use thiserror::Error;

/// Errors that can arise while running the simulation or talking to the character store.
#[derive(Debug, Error)]
pub enum GameError {
    /// Wrapper around sled's error type.
    #[error("sled error: {0}")]
    Sled(#[from] sled::Error),

    /// Wrapper around bincode serialization and deserialization errors.
    #[error("serialization error: {0}")]
    Bincode(#[from] bincode::Error),

    /// Wrapper around IO errors (lookup tables, directory creation, etc.).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Returned when fetching a character that is not present.
    #[error("record not found: {0}")]
    NotFound(String),

    /// A stored value could not be decoded (unparseable item string, broken record).
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Tunable constants that would make the simulation meaningless.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}
