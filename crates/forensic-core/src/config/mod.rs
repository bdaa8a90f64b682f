//! Configuración: documento XML genérico y propiedades de sistema.
//! El `.env` lo carga `forensic_persistence::init_dotenv`.

pub mod properties;
pub mod xml;

pub use properties::{PredefinedProperty, SystemProperties};
pub use xml::{ConfigElement, ConfigNode};
