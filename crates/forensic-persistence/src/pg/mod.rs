//! Implementación Postgres (Diesel) de `ObjectStore`.
//!
//! - Paridad de semántica con `InMemoryObjectStore` (mismos contratos de
//!   orden e idempotencia).
//! - Reintento con backoff corto ante errores transitorios.
//! - Las direcciones nativas (`u64`) se guardan como `BIGINT` reinterpretando
//!   los bits.

use diesel::prelude::*;
use diesel::r2d2::{self, ConnectionManager};
use forensic_blackboard::{Artifact, Attribute, FileStatus, NewFileObject, ObjectStore, StoreError, ValueType};
use log::{debug, warn};

use crate::error::PersistenceError;
use crate::migrations::run_pending_migrations;
use crate::schema::{blackboard_artifacts, blackboard_attributes, file_objects, module_status, modules};

/// Pool r2d2 de conexiones Postgres.
pub type PgPool = r2d2::Pool<ConnectionManager<PgConnection>>;

pub type PgPooledConnection = r2d2::PooledConnection<ConnectionManager<PgConnection>>;

/// Proveedor abstracto de conexiones (inyectable en tests).
pub trait ConnectionProvider: Send + Sync + 'static {
    fn connection(&self) -> Result<PgPooledConnection, PersistenceError>;
}

pub struct PoolProvider {
    pub pool: PgPool,
}

impl ConnectionProvider for PoolProvider {
    fn connection(&self) -> Result<PgPooledConnection, PersistenceError> {
        self.pool
            .get()
            .map_err(|e| PersistenceError::TransientIo(format!("pool error: {e}")))
    }
}

fn is_retryable(e: &PersistenceError) -> bool {
    match e {
        PersistenceError::SerializationConflict => true,
        PersistenceError::TransientIo(_) => true,
        PersistenceError::Unknown(msg) => {
            let m = msg.to_lowercase();
            m.contains("deadlock detected")
            || m.contains("could not serialize access due to concurrent update")
            || m.contains("terminating connection due to administrator command")
            || m.contains("connection closed")
            || m.contains("connection refused")
            || m.contains("timeout")
        }
        _ => false,
    }
}

/// Hasta 3 reintentos con backoff lineal (15ms, 30ms, 45ms).
fn with_retry<F, T>(mut f: F) -> Result<T, PersistenceError>
    where F: FnMut() -> Result<T, PersistenceError>
{
    let mut attempts = 0;
    loop {
        match f() {
            Err(e) if is_retryable(&e) && attempts < 3 => {
                let delay_ms = 15 * ((attempts + 1) as u64);
                warn!("retryable error (attempt {}): {:?} -> sleeping {}ms", attempts + 1, e, delay_ms);
                std::thread::sleep(std::time::Duration::from_millis(delay_ms));
                attempts += 1;
            }
            r => return r,
        }
    }
}

#[derive(Insertable)]
#[diesel(table_name = file_objects)]
struct NewFileRow<'a> {
    fs_obj_id: i64,
    meta_addr: i64,
    par_obj_id: Option<i64>,
    name: &'a str,
    size: i64,
    is_dir: bool,
    status: i32,
}

#[derive(Queryable, Selectable)]
#[diesel(table_name = blackboard_artifacts)]
#[diesel(check_for_backend(diesel::pg::Pg))]
struct ArtifactRow {
    artifact_id: i64,
    obj_id: i64,
    artifact_type_id: i32,
}

impl From<ArtifactRow> for Artifact {
    fn from(r: ArtifactRow) -> Self { Artifact { artifact_id: r.artifact_id, object_id: r.obj_id, artifact_type_id: r.artifact_type_id } }
}

#[derive(Insertable)]
#[diesel(table_name = blackboard_attributes)]
struct NewAttributeRow<'a> {
    artifact_id: i64,
    obj_id: i64,
    attribute_type_id: i32,
    module_name: &'a str,
    context: &'a str,
    value_type: i32,
    value_int32: i32,
    value_int64: i64,
    value_double: f64,
    value_text: &'a str,
    value_bytes: &'a [u8],
}

#[derive(Queryable, Selectable)]
#[diesel(table_name = blackboard_attributes)]
#[diesel(check_for_backend(diesel::pg::Pg))]
struct AttributeRow {
    artifact_id: i64,
    obj_id: i64,
    attribute_type_id: i32,
    module_name: String,
    context: String,
    value_type: i32,
    value_int32: i32,
    value_int64: i64,
    value_double: f64,
    value_text: String,
    value_bytes: Vec<u8>,
}

impl TryFrom<AttributeRow> for Attribute {
    type Error = StoreError;

    fn try_from(r: AttributeRow) -> Result<Self, Self::Error> {
        let value_type = ValueType::from_code(r.value_type)
            .ok_or_else(|| StoreError::Backend(format!("invalid value_type {} in attribute row", r.value_type)))?;
        Ok(Attribute { artifact_id: r.artifact_id,
                       attribute_type_id: r.attribute_type_id,
                       object_id: r.obj_id,
                       module_name: r.module_name,
                       context: r.context,
                       value_type,
                       value_int32: r.value_int32,
                       value_int64: r.value_int64,
                       value_double: r.value_double,
                       value_string: r.value_text,
                       value_bytes: r.value_bytes })
    }
}

pub struct PgObjectStore<P: ConnectionProvider> {
    provider: P,
}

impl<P: ConnectionProvider> PgObjectStore<P> {
    pub fn new(provider: P) -> Self { Self { provider } }

    fn with_conn<T, F>(&self, mut f: F) -> Result<T, StoreError>
        where F: FnMut(&mut PgConnection) -> Result<T, diesel::result::Error>
    {
        with_retry(|| {
            let mut conn = self.provider.connection()?;
            f(&mut *conn).map_err(PersistenceError::from)
        }).map_err(StoreError::from)
    }
}

impl<P: ConnectionProvider> ObjectStore for PgObjectStore<P> {
    fn add_file_object(&self, obj: &NewFileObject) -> Result<i64, StoreError> {
        let row = NewFileRow { fs_obj_id: obj.fs_obj_id,
                               meta_addr: obj.meta_addr as i64,
                               par_obj_id: obj.par_obj_id,
                               name: &obj.name,
                               size: obj.size as i64,
                               is_dir: obj.is_dir,
                               status: FileStatus::ReadyForAnalysis.code() };
        let id = self.with_conn(|conn| {
                         diesel::insert_into(file_objects::table).values(&row)
                                                                 .returning(file_objects::obj_id)
                                                                 .get_result::<i64>(conn)
                     })?;
        debug!("file object {} -> {id}", obj.name);
        Ok(id)
    }

    fn find_object_id(&self, fs_obj_id: i64, meta_addr: u64) -> Result<Option<i64>, StoreError> {
        self.with_conn(|conn| {
                file_objects::table.filter(file_objects::fs_obj_id.eq(fs_obj_id))
                                   .filter(file_objects::meta_addr.eq(meta_addr as i64))
                                   .select(file_objects::obj_id)
                                   .order(file_objects::obj_id.asc())
                                   .first::<i64>(conn)
                                   .optional()
            })
    }

    fn create_artifact(&self, object_id: i64, artifact_type_id: i32) -> Result<Artifact, StoreError> {
        let row = self.with_conn(|conn| {
                          diesel::insert_into(blackboard_artifacts::table)
                              .values((blackboard_artifacts::obj_id.eq(object_id),
                                       blackboard_artifacts::artifact_type_id.eq(artifact_type_id)))
                              .returning(ArtifactRow::as_returning())
                              .get_result::<ArtifactRow>(conn)
                      })?;
        Ok(row.into())
    }

    fn add_attribute(&self, attribute: &Attribute) -> Result<(), StoreError> {
        let row = NewAttributeRow { artifact_id: attribute.artifact_id,
                                    obj_id: attribute.object_id,
                                    attribute_type_id: attribute.attribute_type_id,
                                    module_name: &attribute.module_name,
                                    context: &attribute.context,
                                    value_type: attribute.value_type.code(),
                                    value_int32: attribute.value_int32,
                                    value_int64: attribute.value_int64,
                                    value_double: attribute.value_double,
                                    value_text: &attribute.value_string,
                                    value_bytes: &attribute.value_bytes };
        self.with_conn(|conn| diesel::insert_into(blackboard_attributes::table).values(&row).execute(conn))
            .map(|_| ())
    }

    fn artifacts(&self, object_id: Option<i64>, artifact_type_id: Option<i32>) -> Result<Vec<Artifact>, StoreError> {
        let rows = self.with_conn(|conn| {
                           let mut q = blackboard_artifacts::table.select(ArtifactRow::as_select()).into_boxed();
                           if let Some(o) = object_id {
                               q = q.filter(blackboard_artifacts::obj_id.eq(o));
                           }
                           if let Some(t) = artifact_type_id {
                               q = q.filter(blackboard_artifacts::artifact_type_id.eq(t));
                           }
                           q.order(blackboard_artifacts::artifact_id.asc()).load::<ArtifactRow>(conn)
                       })?;
        Ok(rows.into_iter().map(Artifact::from).collect())
    }

    fn attributes(&self, object_id: Option<i64>, attribute_type_id: Option<i32>) -> Result<Vec<Attribute>, StoreError> {
        let rows = self.with_conn(|conn| {
                           let mut q = blackboard_attributes::table.select(AttributeRow::as_select()).into_boxed();
                           if let Some(o) = object_id {
                               q = q.filter(blackboard_attributes::obj_id.eq(o));
                           }
                           if let Some(t) = attribute_type_id {
                               q = q.filter(blackboard_attributes::attribute_type_id.eq(t));
                           }
                           q.order(blackboard_attributes::attribute_id.asc()).load::<AttributeRow>(conn)
                       })?;
        rows.into_iter().map(Attribute::try_from).collect()
    }

    fn add_module(&self, name: &str, description: &str) -> Result<i32, StoreError> {
        self.with_conn(|conn| {
                diesel::insert_into(modules::table).values((modules::name.eq(name), modules::description.eq(description)))
                                                   .on_conflict(modules::name)
                                                   .do_nothing()
                                                   .execute(conn)?;
                modules::table.filter(modules::name.eq(name))
                              .select(modules::module_id)
                              .first::<i32>(conn)
            })
    }

    fn set_module_status(&self, file_id: i64, module_id: i32, status: i32) -> Result<(), StoreError> {
        self.with_conn(|conn| {
                diesel::insert_into(module_status::table)
                    .values((module_status::file_id.eq(file_id),
                             module_status::module_id.eq(module_id),
                             module_status::status.eq(status)))
                    .on_conflict((module_status::file_id, module_status::module_id))
                    .do_update()
                    .set(module_status::status.eq(status))
                    .execute(conn)
            })
            .map(|_| ())
    }

    fn module_status(&self, file_id: i64, module_id: i32) -> Result<Option<i32>, StoreError> {
        self.with_conn(|conn| {
                module_status::table.find((file_id, module_id))
                                    .select(module_status::status)
                                    .first::<i32>(conn)
                                    .optional()
            })
    }

    fn update_file_status(&self, file_id: i64, status: FileStatus) -> Result<(), StoreError> {
        let updated = self.with_conn(|conn| {
                              diesel::update(file_objects::table.find(file_id)).set(file_objects::status.eq(status.code()))
                                                                               .execute(conn)
                          })?;
        if updated == 0 {
            debug!("update_file_status: file {file_id} is not registered");
        }
        Ok(())
    }

    fn file_status(&self, file_id: i64) -> Result<Option<FileStatus>, StoreError> {
        let code = self.with_conn(|conn| {
                           file_objects::table.find(file_id)
                                              .select(file_objects::status)
                                              .first::<i32>(conn)
                                              .optional()
                       })?;
        Ok(code.and_then(FileStatus::from_code))
    }
}

/// Construye el pool y corre las migraciones pendientes.
///
/// Si `min_size > max_size` se usa `min_size = max_size`; un tamaño 0 se
/// toma como 1.
pub fn build_pool(database_url: &str, min_size: u32, max_size: u32) -> Result<PgPool, PersistenceError> {
    let validated_min = if min_size == 0 { 1 } else { min_size };
    let validated_max = if max_size == 0 { 1 } else { max_size };
    if validated_min > validated_max {
        warn!("min_size > max_size ({} > {}), ajustando min=max", validated_min, validated_max);
    }
    let final_min = validated_min.min(validated_max);
    let manager = ConnectionManager::<PgConnection>::new(database_url);
    let pool = r2d2::Pool::builder().min_idle(Some(final_min))
                                    .max_size(validated_max)
                                    .build(manager)
                                    .map_err(|e| PersistenceError::TransientIo(format!("pool build: {e}")))?;
    {
        let mut conn = pool.get()
                           .map_err(|e| PersistenceError::TransientIo(format!("pool get for migrations: {e}")))?;
        run_pending_migrations(&mut conn)?;
    }
    Ok(pool)
}

/// Carga `.env`, lee `DbConfig` y construye un pool ya migrado.
pub fn build_pool_from_env() -> Result<PgPool, PersistenceError> {
    let cfg = crate::config::DbConfig::from_env()?;
    build_pool(&cfg.url, cfg.min_connections, cfg.max_connections)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn retry_gives_up_after_three_attempts() {
        let calls = Cell::new(0);
        let r: Result<(), _> = with_retry(|| {
            calls.set(calls.get() + 1);
            Err(PersistenceError::TransientIo("down".into()))
        });
        assert!(r.is_err());
        assert_eq!(calls.get(), 4);
    }

    #[test]
    fn non_retryable_errors_fail_fast() {
        let calls = Cell::new(0);
        let r: Result<(), _> = with_retry(|| {
            calls.set(calls.get() + 1);
            Err(PersistenceError::UniqueViolation("dup".into()))
        });
        assert!(r.is_err());
        assert_eq!(calls.get(), 1);
        assert!(is_retryable(&PersistenceError::Unknown("Connection refused".into())));
    }
}
