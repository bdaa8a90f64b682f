use forensic_persistence::config::DbConfig;
use forensic_persistence::pg::{build_pool, PgObjectStore, PoolProvider};
use once_cell::sync::Lazy;

pub static TEST_POOL: Lazy<Option<forensic_persistence::PgPool>> = Lazy::new(|| {
    let cfg = DbConfig::from_env_opt()?;
    match build_pool(&cfg.url, 1, 2) {
        Ok(p) => Some(p),
        Err(e) => {
            eprintln!("No se pudo construir pool de test: {e}");
            None
        }
    }
});

pub fn store() -> Option<PgObjectStore<PoolProvider>> {
    TEST_POOL.as_ref().map(|p| PgObjectStore::new(PoolProvider { pool: p.clone() }))
}

/// Ids de file system únicos por corrida para no chocar con datos previos.
pub fn unique_fs_id() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    let nanos = SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_nanos()).unwrap_or(0);
    (nanos % 1_000_000_000_000) as i64 + std::process::id() as i64
}
