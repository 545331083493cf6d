use thiserror::Error;

use thunai_core::store::StoreError;

pub mod collection_attempt;
pub mod conversation_state;
pub mod memory;
pub mod records;

pub use collection_attempt::SqlCollectionLedger;
pub use conversation_state::SqlConversationStateStore;
pub use memory::{InMemoryCollectionLedger, InMemoryConversationStateStore};
pub use records::InMemoryRecordStore;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
}

impl From<RepositoryError> for StoreError {
    fn from(error: RepositoryError) -> Self {
        match error {
            RepositoryError::Database(source) => Self::Unavailable(source.to_string()),
            RepositoryError::Decode(message) => Self::Corrupt(message),
        }
    }
}

pub(crate) fn decode_error(error: impl std::fmt::Display) -> RepositoryError {
    RepositoryError::Decode(error.to_string())
}
