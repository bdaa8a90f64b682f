//! Pipeline de reporte: corre cada módulo una vez, sin archivo, al terminar
//! la ingesta.

use std::sync::Arc;

use log::{debug, error, warn};

use super::chain::{build_modules, register_modules};
use super::{ModuleRun, Pipeline, PipelineType};
use crate::constants::REPORT_FILE_ID;
use crate::context::FrameworkContext;
use crate::errors::CoreError;
use crate::module::{Module, Status};

pub struct ReportPipeline {
    ctx: Arc<FrameworkContext>,
    modules: Vec<Box<dyn Module>>,
}

impl ReportPipeline {
    pub fn new(ctx: Arc<FrameworkContext>) -> Self { Self { ctx, modules: Vec::new() } }

    pub fn add_module(&mut self, module: Box<dyn Module>) { self.modules.push(module); }

    pub fn run(&self) -> Result<Vec<ModuleRun>, CoreError> {
        let store = self.ctx.store();
        let mut runs = Vec::with_capacity(self.modules.len());
        for module in &self.modules {
            let status = match module.report() {
                Ok(s) => s,
                Err(e) if e.is_module_failure() => {
                    error!("Report module {} failed: {e}", module.name());
                    Status::Fail
                }
                Err(e) => return Err(e),
            };
            store.set_module_status(REPORT_FILE_ID, module.module_id(), status.code())?;
            runs.push(ModuleRun { module: module.name().to_string(), status });
            match status {
                Status::Ok => {}
                Status::Fail => warn!("Report module {} returned FAIL", module.name()),
                Status::Stop => {
                    debug!("Report module {} stopped the pipeline", module.name());
                    break;
                }
            }
        }
        Ok(runs)
    }
}

impl Pipeline for ReportPipeline {
    fn kind(&self) -> PipelineType { PipelineType::Report }

    fn initialize(&mut self, config: &str) -> Result<(), CoreError> {
        let mut modules = build_modules(config, self.ctx.properties())?;
        register_modules(&mut modules, self.ctx.store().as_ref())?;
        self.modules = modules;
        Ok(())
    }

    fn validate(&self, config: &str) -> Result<(), CoreError> { build_modules(config, self.ctx.properties()).map(|_| ()) }

    fn modules(&self) -> &[Box<dyn Module>] { &self.modules }
}
