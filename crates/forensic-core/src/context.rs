//! Contexto explícito del framework: propiedades + blackboard (y su almacén).
//! Se construye una vez y se comparte por `Arc` con pipelines y módulos.

use std::sync::Arc;

use forensic_blackboard::{Blackboard, ObjectStore};

use crate::config::SystemProperties;

pub struct FrameworkContext {
    properties: Arc<SystemProperties>,
    blackboard: Arc<Blackboard>,
}

impl FrameworkContext {
    pub fn new(properties: SystemProperties, store: Arc<dyn ObjectStore>) -> Self {
        Self { properties: Arc::new(properties),
               blackboard: Arc::new(Blackboard::new(store)) }
    }

    pub fn properties(&self) -> &Arc<SystemProperties> { &self.properties }

    pub fn blackboard(&self) -> &Arc<Blackboard> { &self.blackboard }

    pub fn store(&self) -> &Arc<dyn ObjectStore> { self.blackboard.store() }
}
