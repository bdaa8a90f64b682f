//! Propiedades de sistema del framework.
//!
//! Fuentes, en orden de precedencia creciente:
//! 1. Valores de runtime (PID, NODE, START_TIME, SESSION_ID, PROG_DIR).
//! 2. Archivo XML de configuración del framework: cada hijo directo de la
//!    raíz es una propiedad (`<OUT_DIR>/cases/1</OUT_DIR>`).
//! 3. Variables de entorno `FORENSIC_<NOMBRE>` (incluido `.env`).
//!
//! Los valores pueden referenciar otras propiedades con `#NOMBRE#`; la
//! expansión ocurre al leer, no al escribir.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::Local;
use indexmap::IndexMap;
use log::{debug, warn};
use uuid::Uuid;

use super::xml::ConfigElement;
use crate::constants::TIME_FORMAT;
use crate::errors::CoreError;

/// Prefijo de las variables de entorno que pisan propiedades.
pub const ENV_PREFIX: &str = "FORENSIC_";

const MAX_EXPANSION_DEPTH: u8 = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PredefinedProperty {
    ProgDir,
    ConfigDir,
    ModuleDir,
    OutDir,
    PipelineConfigFile,
    DbHost,
    DbPort,
    SessionId,
    CurrentTask,
    CurrentSequenceNumber,
    Node,
    Pid,
    StartTime,
    UniqueId,
}

impl PredefinedProperty {
    pub const ALL: [PredefinedProperty; 14] = [
        Self::ProgDir,
        Self::ConfigDir,
        Self::ModuleDir,
        Self::OutDir,
        Self::PipelineConfigFile,
        Self::DbHost,
        Self::DbPort,
        Self::SessionId,
        Self::CurrentTask,
        Self::CurrentSequenceNumber,
        Self::Node,
        Self::Pid,
        Self::StartTime,
        Self::UniqueId,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::ProgDir => "PROG_DIR",
            Self::ConfigDir => "CONFIG_DIR",
            Self::ModuleDir => "MODULE_DIR",
            Self::OutDir => "OUT_DIR",
            Self::PipelineConfigFile => "PIPELINE_CONFIG_FILE",
            Self::DbHost => "DB_HOST",
            Self::DbPort => "DB_PORT",
            Self::SessionId => "SESSION_ID",
            Self::CurrentTask => "CURRENT_TASK",
            Self::CurrentSequenceNumber => "CURRENT_SEQUENCE_NUMBER",
            Self::Node => "NODE",
            Self::Pid => "PID",
            Self::StartTime => "START_TIME",
            Self::UniqueId => "UNIQUE_ID",
        }
    }

    pub fn is_required(self) -> bool { matches!(self, Self::OutDir) }

    pub fn from_name(name: &str) -> Option<Self> { Self::ALL.into_iter().find(|p| p.name() == name) }
}

impl fmt::Display for PredefinedProperty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.name()) }
}

#[derive(Debug, Clone, Default)]
pub struct SystemProperties {
    values: IndexMap<String, String>,
}

impl SystemProperties {
    /// Conjunto vacío (sin valores de runtime). Útil en tests.
    pub fn new() -> Self { Self::default() }

    /// Propiedades derivadas del proceso actual.
    pub fn with_runtime_defaults() -> Self {
        let mut p = Self::new();
        p.set_predefined(PredefinedProperty::Pid, std::process::id().to_string());
        p.set_predefined(PredefinedProperty::Node, whoami::fallible::hostname().unwrap_or_else(|_| "localhost".into()));
        p.set_predefined(PredefinedProperty::StartTime, Local::now().format(TIME_FORMAT).to_string());
        p.set_predefined(PredefinedProperty::SessionId, Uuid::new_v4().to_string());
        if let Some(dir) = std::env::current_exe().ok().and_then(|exe| exe.parent().map(Path::to_path_buf)) {
            p.set_predefined(PredefinedProperty::ProgDir, dir.display().to_string());
        }
        p
    }

    /// Carga completa: `.env`, runtime, archivo (opcional) y entorno.
    pub fn load(framework_config: Option<&Path>) -> Result<Self, CoreError> {
        forensic_persistence::init_dotenv();
        let mut props = Self::with_runtime_defaults();
        if let Some(path) = framework_config {
            props.merge_xml_file(path)?;
        }
        props.apply_env_overrides();
        Ok(props)
    }

    pub fn merge_xml_file(&mut self, path: &Path) -> Result<(), CoreError> {
        let xml = fs::read_to_string(path).map_err(|e| {
                                               CoreError::config(format!("Error opening framework config file: {} ({e})",
                                                                         path.display()))
                                           })?;
        self.merge_xml(&xml)
            .map_err(|e| CoreError::config(format!("Error parsing framework config file: {} ({e})", path.display())))?;
        if self.get_raw(PredefinedProperty::ConfigDir.name()).is_none() {
            if let Some(parent) = path.parent() {
                let dir = if parent.as_os_str().is_empty() { Path::new(".") } else { parent };
                self.set_predefined(PredefinedProperty::ConfigDir, dir.display().to_string());
            }
        }
        Ok(())
    }

    /// Cada hijo directo de la raíz con texto define una propiedad.
    pub fn merge_xml(&mut self, xml: &str) -> Result<(), CoreError> {
        let root = ConfigElement::parse(xml)?;
        for el in root.child_elements() {
            let value = el.text();
            if value.is_empty() {
                debug!("framework config: ignoring empty property {}", el.name);
                continue;
            }
            self.set(el.name.to_ascii_uppercase(), value);
        }
        Ok(())
    }

    pub fn apply_env_overrides(&mut self) {
        for p in PredefinedProperty::ALL {
            if let Ok(v) = std::env::var(format!("{ENV_PREFIX}{}", p.name())) {
                debug!("property {} overridden from environment", p.name());
                self.set_predefined(p, v);
            }
        }
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) { self.values.insert(name.into(), value.into()); }

    pub fn set_predefined(&mut self, prop: PredefinedProperty, value: impl Into<String>) { self.set(prop.name(), value); }

    /// Valor sin expandir.
    pub fn get_raw(&self, name: &str) -> Option<String> {
        if let Some(v) = self.values.get(name) {
            return Some(v.clone());
        }
        if name == PredefinedProperty::UniqueId.name() {
            return Some(self.computed_unique_id());
        }
        None
    }

    /// Valor con las macros `#NOMBRE#` expandidas.
    pub fn get(&self, name: &str) -> Option<String> { self.get_raw(name).map(|v| self.expand(&v)) }

    /// Igual que `get` pero devuelve cadena vacía si la propiedad no existe.
    pub fn get_predefined(&self, prop: PredefinedProperty) -> String { self.get(prop.name()).unwrap_or_default() }

    /// Propiedad interpretada como directorio (None si está vacía).
    pub fn dir(&self, prop: PredefinedProperty) -> Option<PathBuf> {
        let v = self.get_predefined(prop);
        if v.is_empty() { None } else { Some(PathBuf::from(v)) }
    }

    pub fn expand(&self, value: &str) -> String { self.expand_depth(value, 0) }

    fn expand_depth(&self, value: &str, depth: u8) -> String {
        if depth >= MAX_EXPANSION_DEPTH {
            warn!("property expansion too deep, leaving '{value}' as is");
            return value.to_string();
        }
        let mut out = String::with_capacity(value.len());
        let mut rest = value;
        while let Some(start) = rest.find('#') {
            out.push_str(&rest[..start]);
            let after = &rest[start + 1..];
            let resolved = after.find('#').and_then(|end| {
                                               let name = &after[..end];
                                               let valid = !name.is_empty()
                                                           && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
                                               if !valid {
                                                   return None;
                                               }
                                               self.get_raw(name).map(|raw| (raw, end))
                                           });
            match resolved {
                Some((raw, end)) => {
                    out.push_str(&self.expand_depth(&raw, depth + 1));
                    rest = &after[end + 1..];
                }
                None => {
                    out.push('#');
                    rest = after;
                }
            }
        }
        out.push_str(rest);
        out
    }

    fn computed_unique_id(&self) -> String {
        let part = |p: PredefinedProperty| self.values.get(p.name()).cloned().unwrap_or_default();
        format!("{}_{}_{}_{}",
                part(PredefinedProperty::CurrentTask),
                part(PredefinedProperty::Node),
                part(PredefinedProperty::Pid),
                part(PredefinedProperty::StartTime))
    }

    /// Verifica que las propiedades obligatorias tengan valor.
    pub fn check_required(&self) -> Result<(), CoreError> {
        let missing: Vec<&str> = PredefinedProperty::ALL.iter()
                                                        .filter(|p| p.is_required() && self.get_predefined(**p).is_empty())
                                                        .map(|p| p.name())
                                                        .collect();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(CoreError::config(format!("required system properties not set: {}", missing.join(", "))))
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> { self.values.iter().map(|(k, v)| (k.as_str(), v.as_str())) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_shares_the_dotenv_state_with_persistence() {
        let props = SystemProperties::load(None).unwrap();
        assert!(!props.get_predefined(PredefinedProperty::SessionId).is_empty());
        // Misma carga de `.env`: ambos ven el mismo DATABASE_URL.
        assert_eq!(forensic_persistence::DbConfig::from_env_opt().map(|c| c.url), std::env::var("DATABASE_URL").ok());
    }

    #[test]
    fn xml_children_become_properties() {
        let mut p = SystemProperties::new();
        p.merge_xml("<FRAMEWORK><OUT_DIR>/cases/1</OUT_DIR><module_dir>#OUT_DIR#/mods</module_dir><EMPTY/></FRAMEWORK>")
         .unwrap();
        assert_eq!(p.get("OUT_DIR").as_deref(), Some("/cases/1"));
        assert_eq!(p.get_predefined(PredefinedProperty::ModuleDir), "/cases/1/mods");
        assert_eq!(p.get_raw("MODULE_DIR").as_deref(), Some("#OUT_DIR#/mods"));
        assert!(p.get("EMPTY").is_none());
    }

    #[test]
    fn unknown_or_unterminated_macros_stay_verbatim() {
        let mut p = SystemProperties::new();
        p.set("A", "x");
        assert_eq!(p.expand("#B#/#A#"), "#B#/x");
        assert_eq!(p.expand("50# of #A"), "50# of #A");
        assert_eq!(p.expand("##A#"), "#x");
        assert_eq!(p.expand("# A #"), "# A #");
    }

    #[test]
    fn self_reference_does_not_loop_forever() {
        let mut p = SystemProperties::new();
        p.set("LOOP", "#LOOP#");
        assert_eq!(p.get("LOOP").as_deref(), Some("#LOOP#"));
    }

    #[test]
    fn unique_id_combines_runtime_values() {
        let mut p = SystemProperties::new();
        p.set_predefined(PredefinedProperty::CurrentTask, "7");
        p.set_predefined(PredefinedProperty::Node, "host");
        p.set_predefined(PredefinedProperty::Pid, "42");
        p.set_predefined(PredefinedProperty::StartTime, "2024_01_02_03_04_05");
        assert_eq!(p.get_predefined(PredefinedProperty::UniqueId), "7_host_42_2024_01_02_03_04_05");
        p.set_predefined(PredefinedProperty::UniqueId, "fixed");
        assert_eq!(p.get_predefined(PredefinedProperty::UniqueId), "fixed");
    }

    #[test]
    fn out_dir_is_required() {
        let mut p = SystemProperties::new();
        assert!(matches!(p.check_required(), Err(CoreError::Configuration(_))));
        p.set_predefined(PredefinedProperty::OutDir, "/tmp/o");
        assert!(p.check_required().is_ok());
    }

    #[test]
    fn runtime_defaults_are_populated() {
        let p = SystemProperties::with_runtime_defaults();
        assert_eq!(p.get_predefined(PredefinedProperty::Pid), std::process::id().to_string());
        assert!(!p.get_predefined(PredefinedProperty::Node).is_empty());
        assert!(!p.get_predefined(PredefinedProperty::SessionId).is_empty());
    }

    #[test]
    fn config_dir_defaults_to_config_file_parent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("framework.xml");
        fs::write(&path, "<F><OUT_DIR>/o</OUT_DIR></F>").unwrap();
        let mut p = SystemProperties::new();
        p.merge_xml_file(&path).unwrap();
        assert_eq!(p.dir(PredefinedProperty::ConfigDir), Some(dir.path().to_path_buf()));
        assert!(p.merge_xml_file(&dir.path().join("missing.xml")).is_err());
    }
}
