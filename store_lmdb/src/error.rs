use thiserror::Error;

#[derive(Debug, Error)]
pub enum LmdbError {
    #[error("LMDB error: {0}")]
    Heed(#[from] heed::Error),

    #[error("database {0} is not open")]
    MissingDatabase(&'static str),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<LmdbError> for lattice_store::StoreError {
    fn from(e: LmdbError) -> Self {
        lattice_store::StoreError::Backend(e.to_string())
    }
}
