//! Cache de identidad de objetos padre.
//!
//! Mapea (file system, dirección nativa del directorio) al id de objeto que le
//! asignó el almacén. El primer escritor gana: una segunda inserción para la
//! misma clave no reemplaza el valor. No se invalida durante una corrida.

use dashmap::DashMap;
use log::debug;

use crate::error::StoreError;
use crate::store::ObjectStore;

#[derive(Debug, Default)]
pub struct ParentObjectCache {
    // fs_obj_id -> (meta_addr -> obj_id)
    inner: DashMap<i64, DashMap<u64, i64>>,
}

impl ParentObjectCache {
    pub fn new() -> Self { Self::default() }

    /// Inserta si no existe. Devuelve el id que queda en el cache (el
    /// existente si la clave ya estaba).
    pub fn store(&self, fs_obj_id: i64, meta_addr: u64, obj_id: i64) -> i64 {
        let per_fs = self.inner.entry(fs_obj_id).or_default();
        let kept = *per_fs.entry(meta_addr).or_insert(obj_id);
        if kept != obj_id {
            debug!("parent cache: ({fs_obj_id}, {meta_addr}) already maps to {kept}, ignoring {obj_id}");
        }
        kept
    }

    pub fn get(&self, fs_obj_id: i64, meta_addr: u64) -> Option<i64> {
        self.inner.get(&fs_obj_id).and_then(|m| m.get(&meta_addr).map(|v| *v))
    }

    /// Busca en el cache y, si no está, consulta el almacén directamente. El
    /// resultado de esa consulta no se agrega al cache.
    pub fn find(&self, store: &dyn ObjectStore, fs_obj_id: i64, meta_addr: u64) -> Result<Option<i64>, StoreError> {
        if let Some(id) = self.get(fs_obj_id, meta_addr) {
            return Ok(Some(id));
        }
        store.find_object_id(fs_obj_id, meta_addr)
    }

    pub fn len(&self) -> usize { self.inner.iter().map(|m| m.len()).sum() }

    pub fn is_empty(&self) -> bool { self.len() == 0 }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{InMemoryObjectStore, NewFileObject};

    #[test]
    fn first_writer_wins() {
        let c = ParentObjectCache::new();
        assert_eq!(c.store(1, 100, 5), 5);
        assert_eq!(c.store(1, 100, 9), 5);
        assert_eq!(c.get(1, 100), Some(5));
        assert_eq!(c.get(2, 100), None);
    }

    #[test]
    fn miss_falls_back_to_store_without_caching() {
        let s = InMemoryObjectStore::new();
        let id = s.add_file_object(&NewFileObject { fs_obj_id: 3,
                                                    meta_addr: 77,
                                                    par_obj_id: None,
                                                    name: "dir".into(),
                                                    size: 0,
                                                    is_dir: true })
                  .unwrap();
        let c = ParentObjectCache::new();
        assert_eq!(c.find(&s, 3, 77).unwrap(), Some(id));
        assert!(c.is_empty());
        assert_eq!(c.find(&s, 3, 78).unwrap(), None);
    }
}
