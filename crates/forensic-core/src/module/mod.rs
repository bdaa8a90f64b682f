//! Contrato de módulos de análisis.

pub mod executable;

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::errors::CoreError;
use crate::file::FileInfo;

pub use executable::{resolve_location, ExecutableModule};

/// Resultado de una invocación de módulo.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(i32)]
pub enum Status {
    Ok = 0,
    /// El módulo falló; el pipeline decide si sigue.
    Fail = 1,
    /// Cortar los módulos restantes para este archivo.
    Stop = 2,
}

impl Status {
    pub fn code(self) -> i32 { self as i32 }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
                        Status::Ok => "OK",
                        Status::Fail => "FAIL",
                        Status::Stop => "STOP",
                    })
    }
}

/// Tipos de módulo reconocidos en la configuración.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModuleType {
    Executable,
    Plugin,
}

impl ModuleType {
    pub fn parse(value: &str) -> Option<Self> {
        if value.eq_ignore_ascii_case("executable") {
            Some(Self::Executable)
        } else if value.eq_ignore_ascii_case("plugin") {
            Some(Self::Plugin)
        } else {
            None
        }
    }
}

/// Un paso de análisis. Se construye una vez al cargar el pipeline y se
/// invoca por archivo; no guarda estado entre invocaciones.
pub trait Module: Send + Sync {
    fn name(&self) -> &str;

    fn path(&self) -> &Path;

    fn arguments(&self) -> &str;

    /// Clave con la que se registra en el almacén. Dos módulos configurados
    /// distinto deben dar claves distintas.
    fn registry_key(&self) -> String { self.name().to_string() }

    /// Id asignado por el almacén al registrar el módulo (0 si no se registró).
    fn module_id(&self) -> i32;

    fn set_module_id(&mut self, id: i32);

    fn run(&self, file: &FileInfo) -> Result<Status, CoreError>;

    /// Invocación en un pipeline de reporte (sin archivo).
    fn report(&self) -> Result<Status, CoreError> { Ok(Status::Ok) }
}
