//! forensic-cli: piezas compartidas por los binarios `validate-pipeline` y
//! `analyze-dir`.
//!
//! - logging con `env_logger` (nivel por `RUST_LOG`, `info` por defecto)
//! - selección de almacén: Postgres si hay `DATABASE_URL`, memoria si no
//! - ingesta de un árbol de directorios como objetos de archivo

use std::fs::Metadata;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use forensic_blackboard::{Blackboard, InMemoryObjectStore, NewFileObject, ObjectStore, StoreError};
use forensic_core::{CoreError, FileInfo, FileOutcome, FileRunReport, Status};
use forensic_persistence::{build_pool, DbConfig, PersistenceError, PgObjectStore, PoolProvider};
use log::{debug, info};
use thiserror::Error;
use walkdir::WalkDir;

/// Id del único "file system" que representa el árbol ingerido.
pub const DIR_FS_OBJ_ID: i64 = 1;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] CoreError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Persistence(#[from] PersistenceError),
    #[error("walk error: {0}")]
    Walk(#[from] walkdir::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("{0}")]
    Usage(String),
}

pub fn init_logging() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).try_init();
}

pub fn open_store() -> Result<Arc<dyn ObjectStore>, CliError> {
    forensic_persistence::init_dotenv();
    match DbConfig::from_env_opt() {
        Some(cfg) => {
            let pool = build_pool(&cfg.url, cfg.min_connections, cfg.max_connections)?;
            info!("Using Postgres object store");
            Ok(Arc::new(PgObjectStore::new(PoolProvider { pool })))
        }
        None => {
            info!("DATABASE_URL not set, using in-memory object store");
            Ok(Arc::new(InMemoryObjectStore::new()))
        }
    }
}

#[cfg(unix)]
fn meta_addr(md: &Metadata, _ordinal: u64) -> u64 {
    use std::os::unix::fs::MetadataExt;
    md.ino()
}

#[cfg(not(unix))]
fn meta_addr(_md: &Metadata, ordinal: u64) -> u64 { ordinal }

/// Registra cada entrada de `root` (incluida la raíz) como objeto de archivo.
/// Los padres se resuelven por el cache de identidad, así que el recorrido
/// visita directorios antes que su contenido.
pub fn ingest_directory(blackboard: &Blackboard, root: &Path) -> Result<Vec<FileInfo>, CliError> {
    let mut files = Vec::new();
    let mut addrs: std::collections::HashMap<PathBuf, u64> = std::collections::HashMap::new();
    for (ordinal, entry) in WalkDir::new(root).sort_by_file_name().into_iter().enumerate() {
        let entry = entry?;
        let md = entry.metadata()?;
        let addr = meta_addr(&md, ordinal as u64);
        let parent = match entry.path().parent().and_then(|p| addrs.get(p)) {
            Some(&parent_addr) if entry.depth() > 0 => blackboard.find_par_obj_id(DIR_FS_OBJ_ID, parent_addr)?,
            _ => None,
        };
        let name = entry.file_name().to_string_lossy().into_owned();
        let id = blackboard.store().add_file_object(&NewFileObject { fs_obj_id: DIR_FS_OBJ_ID,
                                                                     meta_addr: addr,
                                                                     par_obj_id: parent,
                                                                     name: name.clone(),
                                                                     size: md.len(),
                                                                     is_dir: md.is_dir() })?;
        if md.is_dir() {
            blackboard.store_par_obj_id(DIR_FS_OBJ_ID, addr, id);
            addrs.insert(entry.path().to_path_buf(), addr);
        }
        debug!("Registered {} as object {id} (parent {parent:?})", entry.path().display());
        files.push(FileInfo { id,
                              fs_obj_id: DIR_FS_OBJ_ID,
                              meta_addr: addr,
                              name,
                              path: entry.path().to_path_buf(),
                              size: md.len(),
                              is_dir: md.is_dir(),
                              is_virtual: false });
    }
    Ok(files)
}

/// Conteos de una corrida de `analyze-dir`.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct AnalysisSummary {
    pub analyzed: usize,
    pub skipped: usize,
    pub not_ready: usize,
    pub module_failures: usize,
    pub errors: usize,
}

impl AnalysisSummary {
    pub fn record(&mut self, result: &Result<FileRunReport, CoreError>) {
        match result {
            Ok(report) => {
                match report.outcome {
                    FileOutcome::Analyzed => self.analyzed += 1,
                    FileOutcome::Skipped | FileOutcome::NoModules => self.skipped += 1,
                    FileOutcome::NotReady(_) => self.not_ready += 1,
                }
                self.module_failures += report.modules.iter().filter(|m| m.status == Status::Fail).count();
            }
            Err(_) => self.errors += 1,
        }
    }
}

impl std::fmt::Display for AnalysisSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f,
               "analyzed: {}, skipped: {}, not ready: {}, module failures: {}, errors: {}",
               self.analyzed, self.skipped, self.not_ready, self.module_failures, self.errors)
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use forensic_blackboard::FileStatus;
    use forensic_core::ModuleRun;

    use super::*;

    #[test]
    fn ingest_links_children_to_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        fs::write(dir.path().join("a.txt"), "aaa").unwrap();
        fs::write(dir.path().join("sub/b.txt"), "b").unwrap();
        let bb = Blackboard::new(Arc::new(InMemoryObjectStore::new()));

        let files = ingest_directory(&bb, dir.path()).unwrap();
        assert_eq!(files.len(), 4);
        assert!(files[0].is_dir);
        let sub = files.iter().find(|f| f.name == "sub").unwrap();
        let b = files.iter().find(|f| f.name == "b.txt").unwrap();
        assert_eq!(bb.find_par_obj_id(DIR_FS_OBJ_ID, sub.meta_addr).unwrap(), Some(sub.id));
        assert_eq!(bb.store().find_object_id(DIR_FS_OBJ_ID, b.meta_addr).unwrap(), Some(b.id));
        assert_eq!(files.iter().find(|f| f.name == "a.txt").unwrap().size, 3);
        assert_eq!(bb.store().file_status(b.id).unwrap(), Some(FileStatus::ReadyForAnalysis));
    }

    #[test]
    fn summary_counts_outcomes() {
        let mut s = AnalysisSummary::default();
        s.record(&Ok(FileRunReport { file_id: 1,
                                     outcome: FileOutcome::Analyzed,
                                     modules: vec![ModuleRun { module: "m".into(), status: Status::Fail }],
                                     stopped: false }));
        s.record(&Ok(FileRunReport { file_id: 2, outcome: FileOutcome::Skipped, modules: vec![], stopped: false }));
        s.record(&Err(CoreError::config("x")));
        assert_eq!(s, AnalysisSummary { analyzed: 1, skipped: 1, not_ready: 0, module_failures: 1, errors: 1 });
        assert!(s.to_string().contains("errors: 1"));
    }
}
