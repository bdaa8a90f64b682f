//! Pipeline de análisis por archivo.

use std::sync::Arc;

use forensic_blackboard::FileStatus;
use log::{debug, error, warn};
use serde::Serialize;

use super::chain::{build_modules, register_modules};
use super::{FailurePolicy, ModuleRun, Pipeline, PipelineType};
use crate::context::FrameworkContext;
use crate::errors::CoreError;
use crate::file::{FileInfo, FileSource};
use crate::module::{Module, Status};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FileOutcome {
    /// El pipeline no tiene módulos.
    NoModules,
    /// Directorio o archivo virtual.
    Skipped,
    /// El estado registrado no era `ReadyForAnalysis`.
    NotReady(FileStatus),
    Analyzed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileRunReport {
    pub file_id: i64,
    pub outcome: FileOutcome,
    pub modules: Vec<ModuleRun>,
    /// Algún módulo cortó la cadena.
    pub stopped: bool,
}

impl FileRunReport {
    fn new(file_id: i64, outcome: FileOutcome) -> Self { Self { file_id, outcome, modules: Vec::new(), stopped: false } }
}

pub struct FileAnalysisPipeline {
    ctx: Arc<FrameworkContext>,
    modules: Vec<Box<dyn Module>>,
    policy: FailurePolicy,
}

impl FileAnalysisPipeline {
    pub fn new(ctx: Arc<FrameworkContext>) -> Self { Self { ctx, modules: Vec::new(), policy: FailurePolicy::default() } }

    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Agrega un módulo ya construido al final de la cadena.
    pub fn add_module(&mut self, module: Box<dyn Module>) { self.modules.push(module); }

    /// Busca el archivo por id y lo corre.
    pub fn run_file_id(&self, file_id: i64, source: &dyn FileSource) -> Result<FileRunReport, CoreError> {
        let file = source.get_file(file_id)?
                         .ok_or_else(|| CoreError::InvalidArgument(format!("no file with id {file_id}")))?;
        self.run(&file)
    }

    pub fn run(&self, file: &FileInfo) -> Result<FileRunReport, CoreError> {
        if self.modules.is_empty() {
            return Ok(FileRunReport::new(file.id, FileOutcome::NoModules));
        }
        let store = self.ctx.store();

        if file.is_dir || file.is_virtual {
            store.update_file_status(file.id, FileStatus::AnalysisSkipped)?;
            return Ok(FileRunReport::new(file.id, FileOutcome::Skipped));
        }

        match store.file_status(file.id)? {
            None | Some(FileStatus::ReadyForAnalysis) => {}
            Some(other) => {
                debug!("file {} not ready for analysis ({other:?})", file.id);
                return Ok(FileRunReport::new(file.id, FileOutcome::NotReady(other)));
            }
        }

        store.update_file_status(file.id, FileStatus::AnalysisInProgress)?;
        let mut report = FileRunReport::new(file.id, FileOutcome::Analyzed);
        match self.run_modules(file, &mut report) {
            Ok(()) => {
                // Un módulo pudo haber cambiado el estado; sólo se cierra si
                // sigue en progreso.
                if store.file_status(file.id)? == Some(FileStatus::AnalysisInProgress) {
                    store.update_file_status(file.id, FileStatus::AnalysisComplete)?;
                }
                Ok(report)
            }
            Err(e) => {
                error!("error analyzing file {} ({}): {e}", file.id, file.path.display());
                if let Err(status_err) = store.update_file_status(file.id, FileStatus::AnalysisFailed) {
                    error!("could not mark file {} as failed: {status_err}", file.id);
                }
                Err(e)
            }
        }
    }

    fn run_modules(&self, file: &FileInfo, report: &mut FileRunReport) -> Result<(), CoreError> {
        let store = self.ctx.store();
        for module in &self.modules {
            let status = match module.run(file) {
                Ok(s) => s,
                Err(e) if e.is_module_failure() => {
                    error!("Module {} failed on file {}: {e}", module.name(), file.id);
                    Status::Fail
                }
                Err(e) => return Err(e),
            };
            store.set_module_status(file.id, module.module_id(), status.code())?;
            report.modules.push(ModuleRun { module: module.name().to_string(), status });

            match status {
                Status::Ok => {}
                Status::Fail => {
                    warn!("Module {} returned FAIL for file {}", module.name(), file.id);
                    if self.policy == FailurePolicy::StopFile {
                        report.stopped = true;
                        break;
                    }
                }
                Status::Stop => {
                    debug!("Module {} stopped the pipeline for file {}", module.name(), file.id);
                    report.stopped = true;
                    break;
                }
            }
        }
        Ok(())
    }
}

impl Pipeline for FileAnalysisPipeline {
    fn kind(&self) -> PipelineType { PipelineType::FileAnalysis }

    fn initialize(&mut self, config: &str) -> Result<(), CoreError> {
        let mut modules = build_modules(config, self.ctx.properties())?;
        register_modules(&mut modules, self.ctx.store().as_ref())?;
        self.modules = modules;
        Ok(())
    }

    fn validate(&self, config: &str) -> Result<(), CoreError> { build_modules(config, self.ctx.properties()).map(|_| ()) }

    fn modules(&self) -> &[Box<dyn Module>] { &self.modules }
}
