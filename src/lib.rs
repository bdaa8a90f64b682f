//! forensicflow
//!
//! Fachada del workspace: re-exporta el modelo de resultados
//! (`forensic-blackboard`), la ejecución de módulos y pipelines
//! (`forensic-core`) y el backend Postgres (`forensic-persistence`).

pub use forensic_blackboard as blackboard;
pub use forensic_core as engine;
pub use forensic_persistence as persistence;

/// Lo necesario para armar un contexto y correr pipelines.
pub mod prelude {
    pub use forensic_blackboard::{Artifact, ArtifactType, Attribute, AttributeType, AttributeValue, Blackboard, FileStatus,
                                  InMemoryObjectStore, NewFileObject, ObjectStore, StoreError};
    pub use forensic_core::{CoreError, FileAnalysisPipeline, FileInfo, FrameworkContext, Module, Pipeline, PipelineManager,
                            PipelineType, PipelineValidator, PredefinedProperty, ReportPipeline, Status, SystemProperties};
}
