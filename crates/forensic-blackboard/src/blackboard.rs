//! Fachada del blackboard: fábrica de registros, registro de tipos, cache de
//! identidad de padres y operaciones respaldadas por el `ObjectStore`.

use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

use log::debug;

use crate::artifact::{Artifact, Attribute, ValueType};
use crate::error::StoreError;
use crate::identity::ParentObjectCache;
use crate::store::ObjectStore;
use crate::types::{builtin_artifact_types, builtin_attribute_types, ArtifactType, TypeDescriptor, TypeTable};

pub struct Blackboard {
    store: Arc<dyn ObjectStore>,
    artifact_types: RwLock<TypeTable>,
    attribute_types: RwLock<TypeTable>,
    parents: ParentObjectCache,
}

fn poisoned<T>(_: T) -> StoreError { StoreError::Backend("type registry lock poisoned".into()) }

impl Blackboard {
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self { store,
               artifact_types: RwLock::new(TypeTable::artifacts()),
               attribute_types: RwLock::new(TypeTable::attributes()),
               parents: ParentObjectCache::new() }
    }

    pub fn store(&self) -> &Arc<dyn ObjectStore> { &self.store }

    // --- fábrica pura -----------------------------------------------------

    /// Construye un atributo sin validar nada ni tocar el almacén.
    #[allow(clippy::too_many_arguments)]
    pub fn create_attribute(artifact_id: i64,
                            attribute_type_id: i32,
                            object_id: i64,
                            module_name: &str,
                            context: &str,
                            value_type: ValueType,
                            value_int32: i32,
                            value_int64: i64,
                            value_double: f64,
                            value_string: &str,
                            value_bytes: &[u8])
                            -> Attribute {
        Attribute { artifact_id,
                    attribute_type_id,
                    object_id,
                    module_name: module_name.to_string(),
                    context: context.to_string(),
                    value_type,
                    value_int32,
                    value_int64,
                    value_double,
                    value_string: value_string.to_string(),
                    value_bytes: value_bytes.to_vec() }
    }

    pub fn create_artifact(artifact_id: i64, object_id: i64, artifact_type_id: i32) -> Artifact {
        Artifact { artifact_id, object_id, artifact_type_id }
    }

    /// Tipos de artifact built-in.
    pub fn get_all_artifact_types() -> &'static BTreeMap<i32, TypeDescriptor> { builtin_artifact_types() }

    /// Tipos de atributo built-in.
    pub fn get_all_attribute_types() -> &'static BTreeMap<i32, TypeDescriptor> { builtin_attribute_types() }

    // --- identidad de padres ---------------------------------------------

    pub fn store_par_obj_id(&self, fs_obj_id: i64, meta_addr: u64, obj_id: i64) {
        self.parents.store(fs_obj_id, meta_addr, obj_id);
    }

    pub fn find_par_obj_id(&self, fs_obj_id: i64, meta_addr: u64) -> Result<Option<i64>, StoreError> {
        self.parents.find(self.store.as_ref(), fs_obj_id, meta_addr)
    }

    pub fn parent_cache(&self) -> &ParentObjectCache { &self.parents }

    // --- registro de tipos -----------------------------------------------

    pub fn artifact_type_id(&self, name: &str) -> Result<i32, StoreError> {
        self.artifact_types.read().map_err(poisoned)?.id_of(name)
    }

    pub fn artifact_type_name(&self, id: i32) -> Result<String, StoreError> {
        self.artifact_types.read().map_err(poisoned)?.name_of(id).map(str::to_string)
    }

    pub fn artifact_type_display_name(&self, id: i32) -> Result<String, StoreError> {
        self.artifact_types.read().map_err(poisoned)?.display_name_of(id).map(str::to_string)
    }

    pub fn attribute_type_id(&self, name: &str) -> Result<i32, StoreError> {
        self.attribute_types.read().map_err(poisoned)?.id_of(name)
    }

    pub fn attribute_type_name(&self, id: i32) -> Result<String, StoreError> {
        self.attribute_types.read().map_err(poisoned)?.name_of(id).map(str::to_string)
    }

    pub fn attribute_type_display_name(&self, id: i32) -> Result<String, StoreError> {
        self.attribute_types.read().map_err(poisoned)?.display_name_of(id).map(str::to_string)
    }

    pub fn add_artifact_type(&self, name: &str, display_name: &str) -> Result<i32, StoreError> {
        let id = self.artifact_types.write().map_err(poisoned)?.register(name, display_name)?;
        debug!("artifact type {name} -> {id}");
        Ok(id)
    }

    pub fn add_attribute_type(&self, name: &str, display_name: &str) -> Result<i32, StoreError> {
        let id = self.attribute_types.write().map_err(poisoned)?.register(name, display_name)?;
        debug!("attribute type {name} -> {id}");
        Ok(id)
    }

    /// Tipos de artifact actualmente registrados (built-in + agregados).
    pub fn artifact_types(&self) -> Result<BTreeMap<i32, TypeDescriptor>, StoreError> {
        Ok(self.artifact_types.read().map_err(poisoned)?.all().clone())
    }

    pub fn attribute_types(&self) -> Result<BTreeMap<i32, TypeDescriptor>, StoreError> {
        Ok(self.attribute_types.read().map_err(poisoned)?.all().clone())
    }

    // --- operaciones sobre el almacén ------------------------------------

    /// Crea y persiste un artifact nuevo para `object_id`.
    pub fn new_artifact(&self, object_id: i64, artifact_type_id: i32) -> Result<Artifact, StoreError> {
        self.artifact_types.read().map_err(poisoned)?.name_of(artifact_type_id)?;
        self.store.create_artifact(object_id, artifact_type_id)
    }

    /// Persiste un atributo; se le asigna el artifact y su objeto dueño.
    pub fn add_attribute(&self, artifact: &Artifact, mut attribute: Attribute) -> Result<Attribute, StoreError> {
        self.attribute_types.read().map_err(poisoned)?.name_of(attribute.attribute_type_id)?;
        attribute.artifact_id = artifact.artifact_id;
        attribute.object_id = artifact.object_id;
        self.store.add_attribute(&attribute)?;
        Ok(attribute)
    }

    pub fn get_artifacts(&self, object_id: i64, artifact_type_id: i32) -> Result<Vec<Artifact>, StoreError> {
        self.store.artifacts(Some(object_id), Some(artifact_type_id))
    }

    pub fn get_artifacts_by_name(&self, object_id: i64, type_name: &str) -> Result<Vec<Artifact>, StoreError> {
        let id = self.artifact_type_id(type_name)?;
        self.get_artifacts(object_id, id)
    }

    pub fn get_attributes(&self, object_id: i64, attribute_type_id: i32) -> Result<Vec<Attribute>, StoreError> {
        self.store.attributes(Some(object_id), Some(attribute_type_id))
    }

    pub fn get_attributes_by_name(&self, object_id: i64, type_name: &str) -> Result<Vec<Attribute>, StoreError> {
        let id = self.attribute_type_id(type_name)?;
        self.get_attributes(object_id, id)
    }

    /// Agrega un atributo al artifact TSK_GEN_INFO del objeto, creándolo si
    /// todavía no existe (hay a lo sumo uno por objeto).
    pub fn add_gen_info_attribute(&self, object_id: i64, attribute: Attribute) -> Result<Attribute, StoreError> {
        let gen_info = ArtifactType::GenInfo.id();
        let artifact = match self.store.artifacts(Some(object_id), Some(gen_info))?.into_iter().next() {
            Some(a) => a,
            None => self.store.create_artifact(object_id, gen_info)?,
        };
        self.add_attribute(&artifact, attribute)
    }

    /// Atributos de los artifacts TSK_GEN_INFO del objeto.
    pub fn get_gen_info_attributes(&self, object_id: i64, attribute_type_id: i32) -> Result<Vec<Attribute>, StoreError> {
        let artifacts = self.store.artifacts(Some(object_id), Some(ArtifactType::GenInfo.id()))?;
        Ok(self.store
               .attributes(Some(object_id), Some(attribute_type_id))?
               .into_iter()
               .filter(|a| artifacts.iter().any(|art| art.artifact_id == a.artifact_id))
               .collect())
    }

    /// Tipos de atributo presentes en el almacén para un tipo de artifact.
    pub fn find_attribute_types(&self, artifact_type_id: i32) -> Result<Vec<i32>, StoreError> {
        let artifacts = self.store.artifacts(None, Some(artifact_type_id))?;
        let mut ids: Vec<i32> = self.store
                                    .attributes(None, None)?
                                    .into_iter()
                                    .filter(|a| artifacts.iter().any(|art| art.artifact_id == a.artifact_id))
                                    .map(|a| a.attribute_type_id)
                                    .collect();
        ids.sort_unstable();
        ids.dedup();
        Ok(ids)
    }
}
