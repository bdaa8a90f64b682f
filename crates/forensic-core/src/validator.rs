//! Validación de archivos de configuración de pipelines.
//!
//! Se valida cada `PIPELINE` por separado: un pipeline inválido no impide
//! revisar los siguientes. El archivo es válido sólo si hay al menos un
//! pipeline y todos se resolvieron a un tipo soportado y validaron.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::{error, info};
use serde::Serialize;

use crate::config::ConfigElement;
use crate::constants::{PIPELINE_ELEMENT, PIPELINE_TYPE_ATTR};
use crate::context::FrameworkContext;
use crate::pipeline::{new_pipeline, PipelineType};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PipelineValidation {
    /// Valor del atributo `type` tal como aparece en el archivo.
    pub pipeline_type: String,
    pub valid: bool,
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    pub config_path: Option<PathBuf>,
    pub valid: bool,
    pub pipelines: Vec<PipelineValidation>,
    /// Mensajes acumulados, en orden.
    pub messages: Vec<String>,
}

impl ValidationReport {
    fn new(config_path: Option<PathBuf>) -> Self { Self { config_path, valid: false, pipelines: Vec::new(), messages: Vec::new() } }

    fn info(&mut self, msg: String) {
        info!("{msg}");
        self.messages.push(msg);
    }

    fn error(&mut self, msg: String) {
        error!("{msg}");
        self.messages.push(msg);
    }
}

pub struct PipelineValidator {
    ctx: Arc<FrameworkContext>,
}

impl PipelineValidator {
    pub fn new(ctx: Arc<FrameworkContext>) -> Self { Self { ctx } }

    pub fn is_valid(&self, config_path: &Path) -> bool { self.validate_file(config_path).valid }

    pub fn validate_file(&self, config_path: &Path) -> ValidationReport {
        let mut report = ValidationReport::new(Some(config_path.to_path_buf()));
        let xml = match fs::read_to_string(config_path) {
            Ok(xml) => xml,
            Err(e) => {
                report.error(format!("Error opening pipeline config file: {} ({e})", config_path.display()));
                return report;
            }
        };
        let root = match ConfigElement::parse(&xml) {
            Ok(root) => root,
            Err(e) => {
                report.error(format!("Error parsing pipeline config file: {} ({e})", config_path.display()));
                return report;
            }
        };
        self.validate_document(&root, report)
    }

    /// Igual que `validate_file` pero sobre un documento en memoria.
    pub fn validate_str(&self, xml: &str) -> ValidationReport {
        let mut report = ValidationReport::new(None);
        match ConfigElement::parse(xml) {
            Ok(root) => self.validate_document(&root, report),
            Err(e) => {
                report.error(format!("Error parsing pipeline config: {e}"));
                report
            }
        }
    }

    fn validate_document(&self, root: &ConfigElement, mut report: ValidationReport) -> ValidationReport {
        let pipelines = root.find_all(PIPELINE_ELEMENT);
        if pipelines.is_empty() {
            report.error("No pipelines found.".to_string());
            return report;
        }

        let mut all_ok = true;
        for el in pipelines {
            let raw_type = el.attribute(PIPELINE_TYPE_ATTR).unwrap_or_default().to_string();
            let result = self.validate_pipeline(el, &raw_type);
            match &result {
                Ok(kind) => report.info(format!("{kind} pipeline is valid.")),
                Err(msg) => {
                    all_ok = false;
                    report.error(msg.clone());
                }
            }
            report.pipelines.push(PipelineValidation { pipeline_type: raw_type,
                                                       valid: result.is_ok(),
                                                       error: result.err() });
        }
        report.valid = all_ok;
        report
    }

    fn validate_pipeline(&self, el: &ConfigElement, raw_type: &str) -> Result<PipelineType, String> {
        let kind = PipelineType::parse(raw_type).ok_or_else(|| format!("Unsupported pipeline type: {raw_type}"))?;
        let xml = el.to_xml_string()
                    .map_err(|e| format!("Error parsing pipeline: {raw_type} ({e})"))?;
        new_pipeline(kind, Arc::clone(&self.ctx)).validate(&xml)
                                                 .map_err(|e| format!("Error parsing pipeline: {raw_type} ({e})"))?;
        Ok(kind)
    }
}
