use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RelationError {
    /// Upsert with no related keys. Nothing was mutated.
    #[error("Relation list is empty: an entity cannot exist without relations")]
    EmptyRelations,
    #[error("Relation store lock poisoned")]
    LockPoisoned,
    #[error("Invariant violated: {0}")]
    InvariantViolated(String),
}

pub type Result<T> = std::result::Result<T, RelationError>;
