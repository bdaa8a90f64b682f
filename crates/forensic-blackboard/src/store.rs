//! Almacén de objetos y resultados.
//!
//! `ObjectStore` es el puerto hacia el motor de almacenamiento transaccional
//! (archivos registrados, artifacts, atributos, módulos y estados). Todas las
//! operaciones toman `&self` y el trait exige `Send + Sync`: el almacén se
//! comparte entre los workers que procesan archivos en paralelo.

use std::collections::HashMap;
use std::sync::atomic::{AtomicI32, AtomicI64, Ordering};
use std::sync::RwLock;

use serde::{Deserialize, Serialize};

use crate::artifact::{Artifact, Attribute};
use crate::error::StoreError;

/// Estado de análisis de un archivo.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(i32)]
pub enum FileStatus {
    ReadyForAnalysis = 1,
    AnalysisInProgress = 2,
    AnalysisComplete = 3,
    AnalysisFailed = 4,
    AnalysisSkipped = 5,
}

impl FileStatus {
    pub fn code(self) -> i32 { self as i32 }

    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            1 => Some(Self::ReadyForAnalysis),
            2 => Some(Self::AnalysisInProgress),
            3 => Some(Self::AnalysisComplete),
            4 => Some(Self::AnalysisFailed),
            5 => Some(Self::AnalysisSkipped),
            _ => None,
        }
    }
}

/// Datos para registrar un objeto de archivo (archivo o directorio).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewFileObject {
    pub fs_obj_id: i64,
    /// Dirección nativa (metadata address / inode) dentro del file system.
    pub meta_addr: u64,
    pub par_obj_id: Option<i64>,
    pub name: String,
    pub size: u64,
    pub is_dir: bool,
}

/// Puerto hacia el almacén persistente.
pub trait ObjectStore: Send + Sync {
    /// Registra un objeto de archivo y devuelve su id. El estado inicial es
    /// `ReadyForAnalysis`.
    fn add_file_object(&self, obj: &NewFileObject) -> Result<i64, StoreError>;

    /// Busca el id del objeto con (fs_obj_id, meta_addr).
    fn find_object_id(&self, fs_obj_id: i64, meta_addr: u64) -> Result<Option<i64>, StoreError>;

    /// Crea un artifact asignándole un id nuevo.
    fn create_artifact(&self, object_id: i64, artifact_type_id: i32) -> Result<Artifact, StoreError>;

    fn add_attribute(&self, attribute: &Attribute) -> Result<(), StoreError>;

    /// Artifacts filtrados opcionalmente por objeto y tipo, ordenados por id.
    fn artifacts(&self, object_id: Option<i64>, artifact_type_id: Option<i32>) -> Result<Vec<Artifact>, StoreError>;

    /// Atributos filtrados opcionalmente por objeto y tipo, en orden de alta.
    fn attributes(&self, object_id: Option<i64>, attribute_type_id: Option<i32>) -> Result<Vec<Attribute>, StoreError>;

    /// Registra un módulo por nombre (idempotente) y devuelve su id.
    fn add_module(&self, name: &str, description: &str) -> Result<i32, StoreError>;

    fn set_module_status(&self, file_id: i64, module_id: i32, status: i32) -> Result<(), StoreError>;

    fn module_status(&self, file_id: i64, module_id: i32) -> Result<Option<i32>, StoreError>;

    fn update_file_status(&self, file_id: i64, status: FileStatus) -> Result<(), StoreError>;

    fn file_status(&self, file_id: i64) -> Result<Option<FileStatus>, StoreError>;
}

#[derive(Debug, Clone)]
struct FileRow {
    fs_obj_id: i64,
    meta_addr: u64,
    status: FileStatus,
}

/// Backend en memoria. Pensado para tests y para ejecuciones sin base de
/// datos configurada.
#[derive(Debug, Default)]
pub struct InMemoryObjectStore {
    next_obj_id: AtomicI64,
    next_artifact_id: AtomicI64,
    next_module_id: AtomicI32,
    files: RwLock<HashMap<i64, FileRow>>,
    artifacts: RwLock<Vec<Artifact>>,
    attributes: RwLock<Vec<Attribute>>,
    modules: RwLock<HashMap<String, i32>>,
    module_status: RwLock<HashMap<(i64, i32), i32>>,
    file_status: RwLock<HashMap<i64, FileStatus>>,
}

impl InMemoryObjectStore {
    pub fn new() -> Self { Self::default() }
}

fn poisoned<T>(_: T) -> StoreError { StoreError::Backend("in-memory store lock poisoned".into()) }

impl ObjectStore for InMemoryObjectStore {
    fn add_file_object(&self, obj: &NewFileObject) -> Result<i64, StoreError> {
        let id = self.next_obj_id.fetch_add(1, Ordering::SeqCst) + 1;
        self.files
            .write()
            .map_err(poisoned)?
            .insert(id, FileRow { fs_obj_id: obj.fs_obj_id, meta_addr: obj.meta_addr, status: FileStatus::ReadyForAnalysis });
        Ok(id)
    }

    fn find_object_id(&self, fs_obj_id: i64, meta_addr: u64) -> Result<Option<i64>, StoreError> {
        let files = self.files.read().map_err(poisoned)?;
        Ok(files.iter()
                .filter(|(_, r)| r.fs_obj_id == fs_obj_id && r.meta_addr == meta_addr)
                .map(|(id, _)| *id)
                .min())
    }

    fn create_artifact(&self, object_id: i64, artifact_type_id: i32) -> Result<Artifact, StoreError> {
        let artifact_id = self.next_artifact_id.fetch_add(1, Ordering::SeqCst) + 1;
        let artifact = Artifact { artifact_id, object_id, artifact_type_id };
        self.artifacts.write().map_err(poisoned)?.push(artifact.clone());
        Ok(artifact)
    }

    fn add_attribute(&self, attribute: &Attribute) -> Result<(), StoreError> {
        let known = self.artifacts
                        .read()
                        .map_err(poisoned)?
                        .iter()
                        .any(|a| a.artifact_id == attribute.artifact_id);
        if !known {
            return Err(StoreError::NotFound(format!("artifact {}", attribute.artifact_id)));
        }
        self.attributes.write().map_err(poisoned)?.push(attribute.clone());
        Ok(())
    }

    fn artifacts(&self, object_id: Option<i64>, artifact_type_id: Option<i32>) -> Result<Vec<Artifact>, StoreError> {
        let all = self.artifacts.read().map_err(poisoned)?;
        Ok(all.iter()
              .filter(|a| object_id.map_or(true, |o| a.object_id == o))
              .filter(|a| artifact_type_id.map_or(true, |t| a.artifact_type_id == t))
              .cloned()
              .collect())
    }

    fn attributes(&self, object_id: Option<i64>, attribute_type_id: Option<i32>) -> Result<Vec<Attribute>, StoreError> {
        let all = self.attributes.read().map_err(poisoned)?;
        Ok(all.iter()
              .filter(|a| object_id.map_or(true, |o| a.object_id == o))
              .filter(|a| attribute_type_id.map_or(true, |t| a.attribute_type_id == t))
              .cloned()
              .collect())
    }

    fn add_module(&self, name: &str, _description: &str) -> Result<i32, StoreError> {
        let mut modules = self.modules.write().map_err(poisoned)?;
        let id = *modules.entry(name.to_string())
                         .or_insert_with(|| self.next_module_id.fetch_add(1, Ordering::SeqCst) + 1);
        Ok(id)
    }

    fn set_module_status(&self, file_id: i64, module_id: i32, status: i32) -> Result<(), StoreError> {
        self.module_status.write().map_err(poisoned)?.insert((file_id, module_id), status);
        Ok(())
    }

    fn module_status(&self, file_id: i64, module_id: i32) -> Result<Option<i32>, StoreError> {
        Ok(self.module_status.read().map_err(poisoned)?.get(&(file_id, module_id)).copied())
    }

    fn update_file_status(&self, file_id: i64, status: FileStatus) -> Result<(), StoreError> {
        if let Some(row) = self.files.write().map_err(poisoned)?.get_mut(&file_id) {
            row.status = status;
            return Ok(());
        }
        // Archivos no registrados (p.ej. construidos a mano en tests) guardan
        // su estado aparte.
        self.file_status.write().map_err(poisoned)?.insert(file_id, status);
        Ok(())
    }

    fn file_status(&self, file_id: i64) -> Result<Option<FileStatus>, StoreError> {
        if let Some(row) = self.files.read().map_err(poisoned)?.get(&file_id) {
            return Ok(Some(row.status));
        }
        Ok(self.file_status.read().map_err(poisoned)?.get(&file_id).copied())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn obj(fs: i64, addr: u64) -> NewFileObject {
        NewFileObject { fs_obj_id: fs, meta_addr: addr, par_obj_id: None, name: format!("f{addr}"), size: 0, is_dir: false }
    }

    #[test]
    fn file_objects_are_found_by_native_address() {
        let s = InMemoryObjectStore::new();
        let a = s.add_file_object(&obj(1, 10)).unwrap();
        let b = s.add_file_object(&obj(2, 10)).unwrap();
        assert_ne!(a, b);
        assert_eq!(s.find_object_id(1, 10).unwrap(), Some(a));
        assert_eq!(s.find_object_id(2, 10).unwrap(), Some(b));
        assert_eq!(s.find_object_id(1, 11).unwrap(), None);
        assert_eq!(s.file_status(a).unwrap(), Some(FileStatus::ReadyForAnalysis));
    }

    #[test]
    fn attributes_require_existing_artifact() {
        let s = InMemoryObjectStore::new();
        let attr = Attribute::new(3, "m", "").with_string("x");
        assert!(matches!(s.add_attribute(&attr), Err(StoreError::NotFound(_))));
        let art = s.create_artifact(5, 1).unwrap();
        let mut attr = attr;
        attr.artifact_id = art.artifact_id;
        attr.object_id = 5;
        s.add_attribute(&attr).unwrap();
        assert_eq!(s.attributes(Some(5), Some(3)).unwrap().len(), 1);
        assert!(s.attributes(Some(6), None).unwrap().is_empty());
    }

    #[test]
    fn modules_register_once_and_track_status() {
        let s = InMemoryObjectStore::new();
        let a = s.add_module("hash", "").unwrap();
        let b = s.add_module("strings", "").unwrap();
        assert_eq!(s.add_module("hash", "").unwrap(), a);
        assert_ne!(a, b);
        s.set_module_status(7, a, 0).unwrap();
        s.set_module_status(7, a, 1).unwrap();
        assert_eq!(s.module_status(7, a).unwrap(), Some(1));
        assert_eq!(s.module_status(7, b).unwrap(), None);
    }

    #[test]
    fn file_status_for_unregistered_file() {
        let s = InMemoryObjectStore::new();
        assert_eq!(s.file_status(42).unwrap(), None);
        s.update_file_status(42, FileStatus::AnalysisSkipped).unwrap();
        assert_eq!(s.file_status(42).unwrap(), Some(FileStatus::AnalysisSkipped));
    }
}
