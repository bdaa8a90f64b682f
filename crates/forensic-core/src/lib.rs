//! forensic-core: ejecución de módulos, pipelines y validación.
//!
//! Módulos:
//! - `config`: XML de configuración y propiedades de sistema.
//! - `substitution`: macros `@FILE`, `@OUT`, ... en argumentos.
//! - `process`: lanzamiento de programas y captura de stdout.
//! - `module`: contrato `Module` y `ExecutableModule`.
//! - `pipeline`: pipelines de análisis y de reporte, y su manager.
//! - `validator`: validación de archivos de configuración de pipelines.

pub mod config;
pub mod constants;
pub mod context;
pub mod errors;
pub mod file;
pub mod module;
pub mod pipeline;
pub mod process;
pub mod substitution;
pub mod validator;

pub use config::{PredefinedProperty, SystemProperties};
pub use context::FrameworkContext;
pub use errors::{CoreError, RunError};
pub use file::{FileInfo, FileSource};
pub use module::{ExecutableModule, Module, ModuleType, Status};
pub use pipeline::{FailurePolicy, FileAnalysisPipeline, FileOutcome, FileRunReport, ModuleRun, Pipeline, PipelineManager,
                   PipelineType, ReportPipeline};
pub use substitution::ParameterSubstitutor;
pub use validator::{PipelineValidation, PipelineValidator, ValidationReport};
