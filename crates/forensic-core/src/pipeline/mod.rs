//! Pipelines lineales de módulos.
//!
//! - `FileAnalysisPipeline`: corre los módulos sobre un archivo.
//! - `ReportPipeline`: corre los módulos una vez, al final de la ingesta.
//! - `PipelineManager`: crea pipelines a partir del archivo de configuración.

mod chain;
pub mod file_analysis;
pub mod manager;
pub mod report;

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::context::FrameworkContext;
use crate::errors::CoreError;
use crate::module::{Module, Status};

pub use file_analysis::{FileAnalysisPipeline, FileOutcome, FileRunReport};
pub use manager::PipelineManager;
pub use report::ReportPipeline;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PipelineType {
    FileAnalysis,
    Report,
}

impl PipelineType {
    /// Tag del atributo `type`. Se acepta "Report" y "Reporting".
    pub fn parse(value: &str) -> Option<Self> {
        let v = value.trim();
        if v.eq_ignore_ascii_case("FileAnalysis") {
            Some(Self::FileAnalysis)
        } else if v.eq_ignore_ascii_case("Report") || v.eq_ignore_ascii_case("Reporting") {
            Some(Self::Report)
        } else {
            None
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::FileAnalysis => "FileAnalysis",
            Self::Report => "Report",
        }
    }
}

impl fmt::Display for PipelineType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

/// Qué hacer cuando un módulo devuelve `Fail`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// Registrar y seguir con el próximo módulo.
    #[default]
    Continue,
    /// Tratarlo como `Stop` para este archivo.
    StopFile,
}

/// Resultado de un módulo dentro de una corrida.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleRun {
    pub module: String,
    pub status: Status,
}

pub trait Pipeline: Send + Sync {
    fn kind(&self) -> PipelineType;

    /// Construye los módulos y los registra en el almacén.
    fn initialize(&mut self, config: &str) -> Result<(), CoreError>;

    /// Verifica la configuración sin registrar ni ejecutar nada.
    fn validate(&self, config: &str) -> Result<(), CoreError>;

    fn modules(&self) -> &[Box<dyn Module>];

    fn is_empty(&self) -> bool { self.modules().is_empty() }
}

/// Constructor por tipo.
pub fn new_pipeline(kind: PipelineType, ctx: Arc<FrameworkContext>) -> Box<dyn Pipeline> {
    match kind {
        PipelineType::FileAnalysis => Box::new(FileAnalysisPipeline::new(ctx)),
        PipelineType::Report => Box::new(ReportPipeline::new(ctx)),
    }
}
