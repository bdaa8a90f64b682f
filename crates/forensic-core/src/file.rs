//! Archivo a analizar, tal como lo entrega la capa de acceso al file system.

use std::path::PathBuf;

use forensic_blackboard::StoreError;
use serde::{Deserialize, Serialize};

/// Inmutable durante una pasada del pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileInfo {
    /// Id único (id de objeto en el almacén).
    pub id: i64,
    pub fs_obj_id: i64,
    /// Dirección nativa (inode / metadata address).
    pub meta_addr: u64,
    pub name: String,
    /// Ruta en disco donde el contenido está disponible.
    pub path: PathBuf,
    pub size: u64,
    pub is_dir: bool,
    /// Archivos sin contenido propio (unallocated, carpetas sintéticas...).
    pub is_virtual: bool,
}

impl FileInfo {
    pub fn new(id: i64, path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
        Self { id, fs_obj_id: 0, meta_addr: 0, name, path, size: 0, is_dir: false, is_virtual: false }
    }
}

/// Resolución de archivos por id.
pub trait FileSource: Send + Sync {
    fn get_file(&self, file_id: i64) -> Result<Option<FileInfo>, StoreError>;
}

impl FileSource for std::collections::HashMap<i64, FileInfo> {
    fn get_file(&self, file_id: i64) -> Result<Option<FileInfo>, StoreError> { Ok(self.get(&file_id).cloned()) }
}
