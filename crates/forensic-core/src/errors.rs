//! Errores del núcleo.
//!
//! Taxonomía:
//! - `Configuration`: detectado al cargar o validar; fatal para el pipeline o
//!   módulo afectado.
//! - `Launch` (`RunError`): fallo al lanzar o capturar un proceso; fatal para
//!   esa invocación del módulo.
//! - Un exit code distinto de cero NO es un error (se registra como warning).
//! - Los hallazgos de validación se acumulan en `ValidationReport`.

use std::path::PathBuf;

use forensic_blackboard::StoreError;
use thiserror::Error;

/// Fallos del runner de procesos. El exit code del hijo nunca llega acá.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("failed to launch {program}: {source}")]
    Spawn { program: PathBuf, #[source] source: std::io::Error },
    #[error("failed to create output directory {path}: {source}")]
    CreateDir { path: PathBuf, #[source] source: std::io::Error },
    #[error("failed to open output file {path}: {source}")]
    OpenOutput { path: PathBuf, #[source] source: std::io::Error },
    #[error("failed to capture output of {program}: {source}")]
    Capture { program: PathBuf, #[source] source: std::io::Error },
    #[error("failed waiting for {program}: {source}")]
    Wait { program: PathBuf, #[source] source: std::io::Error },
}

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("module launch failed: {0}")]
    Launch(#[from] RunError),
    #[error("store error: {0}")]
    Store(#[from] StoreError),
    #[error("xml error: {0}")]
    Xml(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl CoreError {
    pub fn config(msg: impl Into<String>) -> Self { Self::Configuration(msg.into()) }

    /// Errores que el pipeline absorbe como `Fail` del módulo en vez de
    /// abortar el archivo.
    pub fn is_module_failure(&self) -> bool { matches!(self, Self::Launch(_) | Self::Io(_)) }
}
