//! Errores de persistencia.
//! Mapea errores de Diesel / conexión a variantes semánticas, y éstas a
//! `StoreError` para cruzar el trait `ObjectStore`.

use diesel::result::{DatabaseErrorKind, Error as DieselError};
use forensic_blackboard::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("unique violation: {0}")]
    UniqueViolation(String),
    #[error("check violation: {0}")]
    CheckViolation(String),
    #[error("foreign key violation: {0}")]
    ForeignKeyViolation(String),
    #[error("not found")]
    NotFound,
    #[error("serialization conflict (retryable)")]
    SerializationConflict,
    #[error("transient IO / connection pool error: {0}")]
    TransientIo(String),
    #[error("configuration: {0}")]
    Config(String),
    #[error("unknown database error: {0}")]
    Unknown(String),
}

impl From<DieselError> for PersistenceError {
    fn from(err: DieselError) -> Self {
        match err {
            DieselError::NotFound => Self::NotFound,
            DieselError::DatabaseError(kind, info) => match kind {
                DatabaseErrorKind::UniqueViolation => Self::UniqueViolation(info.message().to_string()),
                DatabaseErrorKind::CheckViolation => Self::CheckViolation(info.message().to_string()),
                DatabaseErrorKind::ForeignKeyViolation => Self::ForeignKeyViolation(info.message().to_string()),
                DatabaseErrorKind::SerializationFailure => Self::SerializationConflict,
                DatabaseErrorKind::ClosedConnection => Self::TransientIo(info.message().to_string()),
                other => Self::Unknown(format!("db error kind {:?}: {}", other, info.message())),
            },
            DieselError::DeserializationError(e) => Self::Unknown(format!("deser: {e}")),
            DieselError::SerializationError(e) => Self::Unknown(format!("ser: {e}")),
            DieselError::BrokenTransactionManager => Self::TransientIo("broken transaction manager".into()),
            DieselError::QueryBuilderError(e) => Self::Unknown(format!("query builder: {e}")),
            other => Self::Unknown(format!("unhandled diesel error: {other:?}")),
        }
    }
}

impl From<PersistenceError> for StoreError {
    fn from(err: PersistenceError) -> Self {
        match err {
            PersistenceError::NotFound => StoreError::NotFound("row".into()),
            PersistenceError::ForeignKeyViolation(m) => StoreError::NotFound(m),
            PersistenceError::UniqueViolation(m) | PersistenceError::CheckViolation(m) => StoreError::Conflict(m),
            other => StoreError::Backend(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diesel_not_found_maps_through_to_store_error() {
        let p: PersistenceError = DieselError::NotFound.into();
        assert!(matches!(p, PersistenceError::NotFound));
        assert!(matches!(StoreError::from(p), StoreError::NotFound(_)));
    }

    #[test]
    fn violations_map_to_store_variants() {
        assert!(matches!(StoreError::from(PersistenceError::ForeignKeyViolation("fk".into())), StoreError::NotFound(_)));
        assert!(matches!(StoreError::from(PersistenceError::UniqueViolation("u".into())), StoreError::Conflict(_)));
        assert!(matches!(StoreError::from(PersistenceError::TransientIo("t".into())), StoreError::Backend(_)));
    }
}
