//! Nombres fijos del formato de configuración y de las macros de sustitución.

/// Archivo de pipelines por defecto (relativo a CONFIG_DIR).
pub const DEFAULT_PIPELINE_CONFIG_FILE: &str = "pipeline_config.xml";

pub const PIPELINE_ELEMENT: &str = "PIPELINE";
pub const PIPELINE_TYPE_ATTR: &str = "type";

pub const MODULE_ELEMENT: &str = "MODULE";
pub const MODULE_TYPE_ATTR: &str = "type";
pub const MODULE_ORDER_ATTR: &str = "order";
pub const MODULE_LOCATION_ATTR: &str = "location";
pub const MODULE_ARGS_ATTR: &str = "arguments";
pub const MODULE_OUTPUT_ATTR: &str = "output";

/// Formato de @STARTTIME y @CURTIME.
pub const TIME_FORMAT: &str = "%Y_%m_%d_%H_%M_%S";

/// Id de archivo con el que se registra el estado de los módulos de reporte.
pub const REPORT_FILE_ID: i64 = 0;
