//! forensic-blackboard: modelo de resultados.
//!
//! - `types`: registro de tipos de artifact / atributo (built-in + custom).
//! - `artifact`: registros `Artifact` y `Attribute`.
//! - `store`: puerto `ObjectStore` y backend en memoria.
//! - `identity`: cache de ids de objetos padre (primer escritor gana).
//! - `blackboard`: fachada que combina todo lo anterior.

pub mod artifact;
pub mod blackboard;
pub mod error;
pub mod identity;
pub mod store;
pub mod types;

pub use artifact::{Artifact, Attribute, AttributeValue, ValueType};
pub use blackboard::Blackboard;
pub use error::StoreError;
pub use identity::ParentObjectCache;
pub use store::{FileStatus, InMemoryObjectStore, NewFileObject, ObjectStore};
pub use types::{ArtifactType, AttributeType, TypeDescriptor};
