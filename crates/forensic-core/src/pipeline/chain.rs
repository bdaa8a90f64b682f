//! Construcción de la cadena de módulos a partir del XML de un pipeline.

use std::collections::HashSet;
use std::sync::Arc;

use forensic_blackboard::ObjectStore;
use log::{debug, warn};

use crate::config::{ConfigElement, SystemProperties};
use crate::constants::{MODULE_ARGS_ATTR, MODULE_ELEMENT, MODULE_LOCATION_ATTR, MODULE_ORDER_ATTR, MODULE_OUTPUT_ATTR,
                       MODULE_TYPE_ATTR};
use crate::errors::CoreError;
use crate::module::{ExecutableModule, Module, ModuleType};

/// Parsea `config` y construye los módulos en orden de documento. El atributo
/// `order` de cada uno debe ser su posición (1..n). Las rutas de los
/// ejecutables se validan acá.
pub(crate) fn build_modules(config: &str, props: &Arc<SystemProperties>) -> Result<Vec<Box<dyn Module>>, CoreError> {
    if config.trim().is_empty() {
        return Err(CoreError::config("Pipeline configuration string is empty."));
    }
    let root = ConfigElement::parse(config).map_err(|e| CoreError::config(format!("Error parsing pipeline configuration: {e}")))?;
    let elements = root.find_all(MODULE_ELEMENT);
    if elements.is_empty() {
        warn!("No modules found in config file.");
        return Ok(Vec::new());
    }

    let mut seen = HashSet::new();
    for (index, el) in elements.iter().enumerate() {
        let raw = el.attribute(MODULE_ORDER_ATTR)
                    .ok_or_else(|| CoreError::config("Module order missing."))?;
        let order: usize = raw.trim()
                              .parse()
                              .map_err(|_| CoreError::config(format!("Module order must be a decimal number. Got: {raw}")))?;
        if !seen.insert(order) {
            return Err(CoreError::config(format!("Multiple modules with same order: {order}")));
        }
        if order != index + 1 {
            return Err(CoreError::config("Module order must start with 1 with no gaps."));
        }
    }

    elements.into_iter().map(|el| build_module(el, props)).collect()
}

fn build_module(el: &ConfigElement, props: &Arc<SystemProperties>) -> Result<Box<dyn Module>, CoreError> {
    let type_name = el.attribute(MODULE_TYPE_ATTR).unwrap_or_default();
    match ModuleType::parse(type_name) {
        Some(ModuleType::Executable) => {
            let mut m = ExecutableModule::new(Arc::clone(props));
            m.set_path(el.attribute(MODULE_LOCATION_ATTR).unwrap_or_default())?;
            m.set_arguments(el.attribute(MODULE_ARGS_ATTR).unwrap_or_default());
            m.set_output(el.attribute(MODULE_OUTPUT_ATTR).unwrap_or_default());
            debug!("built executable module {}", m.name());
            Ok(Box::new(m))
        }
        Some(ModuleType::Plugin) => Err(CoreError::config(format!("Plugin modules are not supported: {}",
                                                                 el.attribute(MODULE_LOCATION_ATTR).unwrap_or_default()))),
        None => Err(CoreError::config(format!("Unrecognized module type: '{type_name}'"))),
    }
}

/// Registra cada módulo en el almacén y le asigna su id. Un módulo repetido
/// dentro del mismo pipeline se registra con su posición para no compartir id.
pub(crate) fn register_modules(modules: &mut [Box<dyn Module>], store: &dyn ObjectStore) -> Result<(), CoreError> {
    let mut seen = HashSet::new();
    for (index, m) in modules.iter_mut().enumerate() {
        let mut key = m.registry_key();
        if !seen.insert(key.clone()) {
            key = format!("{key} #{}", index + 1);
        }
        let id = store.add_module(&key, &m.path().display().to_string())?;
        m.set_module_id(id);
    }
    Ok(())
}

#[cfg(all(test, unix))]
mod tests {
    use forensic_blackboard::InMemoryObjectStore;

    use super::*;
    use crate::module::Status;

    fn props() -> Arc<SystemProperties> { Arc::new(SystemProperties::new()) }

    fn modules_xml(orders: &[&str]) -> String {
        let body: String = orders.iter()
                                 .map(|o| format!(r#"<MODULE type="executable" location="/bin/sh" arguments="-c true" {o}/>"#))
                                 .collect();
        format!(r#"<PIPELINE type="FileAnalysis">{body}</PIPELINE>"#)
    }

    fn config_err(xml: &str) -> String {
        match build_modules(xml, &props()) {
            Err(CoreError::Configuration(msg)) => msg,
            Err(other) => panic!("unexpected error {other}"),
            Ok(_) => panic!("expected configuration error"),
        }
    }

    #[test]
    fn order_rules() {
        assert_eq!(config_err(&modules_xml(&["", ""])), "Module order missing.");
        assert!(config_err(&modules_xml(&[r#"order="one""#])).starts_with("Module order must be a decimal number."));
        assert_eq!(config_err(&modules_xml(&[r#"order="1""#, r#"order="3""#])), "Module order must start with 1 with no gaps.");
        assert_eq!(config_err(&modules_xml(&[r#"order="2""#])), "Module order must start with 1 with no gaps.");
        assert!(config_err(&modules_xml(&[r#"order="1""#, r#"order="1""#])).starts_with("Multiple modules with same order"));
    }

    #[test]
    fn modules_keep_document_order() {
        let xml = r#"<PIPELINE type="FileAnalysis">
            <MODULE order="1" type="executable" location="/bin/sh" arguments="first"/>
            <MODULE order="2" type="executable" location="/bin/sh" arguments="second"/>
        </PIPELINE>"#;
        let mods = build_modules(xml, &props()).unwrap();
        let args: Vec<&str> = mods.iter().map(|m| m.arguments()).collect();
        assert_eq!(args, vec!["first", "second"]);
    }

    #[test]
    fn out_of_document_order_is_rejected() {
        let xml = r#"<PIPELINE type="FileAnalysis">
            <MODULE order="2" type="executable" location="/bin/sh" arguments="second"/>
            <MODULE order="1" type="executable" location="/bin/sh" arguments="first"/>
        </PIPELINE>"#;
        assert_eq!(config_err(xml), "Module order must start with 1 with no gaps.");
    }

    #[test]
    fn modules_sharing_an_interpreter_get_their_own_ids() {
        let xml = r#"<PIPELINE type="FileAnalysis">
            <MODULE order="1" type="executable" location="/bin/sh" arguments="/opt/hash.sh @FILE"/>
            <MODULE order="2" type="executable" location="/bin/sh" arguments="/opt/strings.sh @FILE"/>
            <MODULE order="3" type="executable" location="/bin/sh" arguments="/opt/hash.sh @FILE"/>
        </PIPELINE>"#;
        let store = InMemoryObjectStore::new();
        let mut mods = build_modules(xml, &props()).unwrap();
        register_modules(&mut mods, &store).unwrap();
        let names: Vec<&str> = mods.iter().map(|m| m.name()).collect();
        assert_eq!(names, vec!["hash", "strings", "hash"]);
        let ids: Vec<i32> = mods.iter().map(|m| m.module_id()).collect();
        assert_ne!(ids[0], ids[1]);
        assert_ne!(ids[0], ids[2]);

        store.set_module_status(7, ids[0], Status::Ok.code()).unwrap();
        store.set_module_status(7, ids[1], Status::Fail.code()).unwrap();
        assert_eq!(store.module_status(7, ids[0]).unwrap(), Some(Status::Ok.code()));
        assert_eq!(store.module_status(7, ids[1]).unwrap(), Some(Status::Fail.code()));

        // Recargar la misma configuración reusa los ids.
        let mut again = build_modules(xml, &props()).unwrap();
        register_modules(&mut again, &store).unwrap();
        assert_eq!(again.iter().map(|m| m.module_id()).collect::<Vec<_>>(), ids);
    }

    #[test]
    fn module_types() {
        let plugin = r#"<PIPELINE><MODULE order="1" type="plugin" location="libhash.so"/></PIPELINE>"#;
        assert!(config_err(plugin).starts_with("Plugin modules are not supported"));
        let unknown = r#"<PIPELINE><MODULE order="1" type="script" location="/bin/sh"/></PIPELINE>"#;
        assert!(config_err(unknown).starts_with("Unrecognized module type"));
    }

    #[test]
    fn empty_and_moduleless_configs() {
        assert_eq!(config_err("   "), "Pipeline configuration string is empty.");
        assert!(build_modules(r#"<PIPELINE type="Report"/>"#, &props()).unwrap().is_empty());
    }
}
