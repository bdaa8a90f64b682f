//! Errores del almacén de resultados.
//!
//! `StoreError` es el único error que cruza el trait `ObjectStore`; los
//! backends concretos (Postgres, memoria) traducen sus fallos a estas
//! variantes.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("object not found: {0}")]
    NotFound(String),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("unknown type: {0}")]
    UnknownType(String),
    #[error("store backend error: {0}")]
    Backend(String),
}
