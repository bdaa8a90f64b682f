//! forensic-persistence
//!
//! Backend Postgres (Diesel) del `ObjectStore` del blackboard.
//!
//! Módulos:
//! - `pg`: `PgObjectStore`, pool r2d2 y proveedor de conexiones.
//! - `migrations`: runner embebido de migraciones Diesel.
//! - `config`: carga de configuración desde .env.
//! - `schema`: tablas Diesel declaradas para compilar queries.

pub mod config;
pub mod error;
pub mod migrations;
pub mod pg;
pub mod schema;

pub use config::{init_dotenv, DbConfig};
pub use error::PersistenceError;
pub use pg::{build_pool, build_pool_from_env, ConnectionProvider, PgObjectStore, PgPool, PoolProvider};
