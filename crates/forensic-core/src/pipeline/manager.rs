//! Creación de pipelines desde el archivo de configuración del framework.

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use log::info;

use super::{FileAnalysisPipeline, Pipeline, PipelineType, ReportPipeline};
use crate::config::{ConfigElement, PredefinedProperty};
use crate::constants::{DEFAULT_PIPELINE_CONFIG_FILE, PIPELINE_ELEMENT, PIPELINE_TYPE_ATTR};
use crate::context::FrameworkContext;
use crate::errors::CoreError;

pub struct PipelineManager {
    ctx: Arc<FrameworkContext>,
}

impl PipelineManager {
    pub fn new(ctx: Arc<FrameworkContext>) -> Self { Self { ctx } }

    /// PIPELINE_CONFIG_FILE (o `pipeline_config.xml`); las rutas relativas se
    /// resuelven contra CONFIG_DIR.
    pub fn config_path(&self) -> PathBuf {
        let props = self.ctx.properties();
        let configured = props.get_predefined(PredefinedProperty::PipelineConfigFile);
        let file = PathBuf::from(if configured.is_empty() { DEFAULT_PIPELINE_CONFIG_FILE.to_string() } else { configured });
        if file.is_absolute() {
            return file;
        }
        match props.dir(PredefinedProperty::ConfigDir) {
            Some(dir) => dir.join(file),
            None => file,
        }
    }

    /// XML del único pipeline de tipo `kind` en el archivo de configuración.
    pub fn pipeline_config(&self, kind: PipelineType) -> Result<String, CoreError> {
        let path = self.config_path();
        let xml = fs::read_to_string(&path).map_err(|e| {
                                               CoreError::config(format!("Error opening pipeline config file: {} ({e})",
                                                                         path.display()))
                                           })?;
        let root = ConfigElement::parse(&xml).map_err(|e| {
                                                 CoreError::config(format!("Error parsing pipeline config file: {} ({e})",
                                                                           path.display()))
                                             })?;
        let mut matching = root.find_all(PIPELINE_ELEMENT)
                               .into_iter()
                               .filter(|el| el.attribute(PIPELINE_TYPE_ATTR).and_then(PipelineType::parse) == Some(kind));
        let first = matching.next()
                            .ok_or_else(|| CoreError::config(format!("No pipeline of type {kind} found in config file.")))?;
        if matching.next().is_some() {
            return Err(CoreError::config(format!("Multiple pipelines of type {kind} found in config file.")));
        }
        first.to_xml_string()
    }

    pub fn create_file_analysis_pipeline(&self) -> Result<FileAnalysisPipeline, CoreError> {
        let mut p = FileAnalysisPipeline::new(Arc::clone(&self.ctx));
        p.initialize(&self.pipeline_config(PipelineType::FileAnalysis)?)?;
        info!("FileAnalysis pipeline loaded with {} module(s)", p.modules().len());
        Ok(p)
    }

    pub fn create_report_pipeline(&self) -> Result<ReportPipeline, CoreError> {
        let mut p = ReportPipeline::new(Arc::clone(&self.ctx));
        p.initialize(&self.pipeline_config(PipelineType::Report)?)?;
        info!("Report pipeline loaded with {} module(s)", p.modules().len());
        Ok(p)
    }

    /// Variante dinámica (por tipo).
    pub fn create_pipeline(&self, kind: PipelineType) -> Result<Box<dyn Pipeline>, CoreError> {
        let mut p = super::new_pipeline(kind, Arc::clone(&self.ctx));
        p.initialize(&self.pipeline_config(kind)?)?;
        Ok(p)
    }
}

#[cfg(all(test, unix))]
mod tests {
    use forensic_blackboard::InMemoryObjectStore;

    use super::*;
    use crate::config::SystemProperties;

    fn manager(dir: &std::path::Path, xml: &str) -> PipelineManager {
        fs::write(dir.join(DEFAULT_PIPELINE_CONFIG_FILE), xml).unwrap();
        let mut props = SystemProperties::new();
        props.set_predefined(PredefinedProperty::ConfigDir, dir.display().to_string());
        PipelineManager::new(Arc::new(FrameworkContext::new(props, Arc::new(InMemoryObjectStore::new()))))
    }

    const MODULE: &str = r#"<MODULE order="1" type="executable" location="/bin/sh" arguments="-c true"/>"#;

    #[test]
    fn creates_each_pipeline_type_from_default_file() {
        let dir = tempfile::tempdir().unwrap();
        let xml = format!(r#"<PIPELINE_CONFIG><PIPELINE type="FileAnalysis">{MODULE}</PIPELINE><PIPELINE type="Reporting">{MODULE}</PIPELINE></PIPELINE_CONFIG>"#);
        let m = manager(dir.path(), &xml);
        assert_eq!(m.config_path(), dir.path().join("pipeline_config.xml"));
        let fa = m.create_file_analysis_pipeline().unwrap();
        assert_eq!(fa.modules().len(), 1);
        assert!(fa.modules()[0].module_id() > 0);
        let rp = m.create_pipeline(PipelineType::Report).unwrap();
        assert_eq!(rp.kind(), PipelineType::Report);
    }

    #[test]
    fn duplicate_or_missing_types_are_errors() {
        let dir = tempfile::tempdir().unwrap();
        let xml = format!(r#"<C><PIPELINE type="FileAnalysis">{MODULE}</PIPELINE><PIPELINE type="FileAnalysis"/></C>"#);
        let m = manager(dir.path(), &xml);
        let err = m.create_file_analysis_pipeline().err().map(|e| e.to_string()).unwrap_or_default();
        assert!(err.contains("Multiple pipelines of type FileAnalysis"), "{err}");
        let err = m.create_report_pipeline().err().map(|e| e.to_string()).unwrap_or_default();
        assert!(err.contains("No pipeline of type Report"), "{err}");
    }

    #[test]
    fn missing_config_file_is_a_configuration_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut props = SystemProperties::new();
        props.set_predefined(PredefinedProperty::ConfigDir, dir.path().display().to_string());
        props.set_predefined(PredefinedProperty::PipelineConfigFile, "custom.xml");
        let m = PipelineManager::new(Arc::new(FrameworkContext::new(props, Arc::new(InMemoryObjectStore::new()))));
        assert_eq!(m.config_path(), dir.path().join("custom.xml"));
        assert!(matches!(m.pipeline_config(PipelineType::FileAnalysis), Err(CoreError::Configuration(_))));
    }
}
